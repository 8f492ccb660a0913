//! Concurrent use of a tree through its shared handle.

use netview_int_test::test_util::{cleanup, create_test_context_with, run_test};
use netview_spatial::{BoundingBox, SpatialResult};
use std::thread;

#[test]
fn test_parallel_writers_and_readers() {
    run_test(
        || create_test_context_with(8),
        |ctx| {
            let writers: Vec<_> = (0..4i64)
                .map(|t| {
                    let tree = ctx.tree();
                    thread::spawn(move || -> SpatialResult<()> {
                        for i in 0..500 {
                            let id = t * 500 + i;
                            let x = (id % 50) as f64;
                            let y = (id / 50) as f64;
                            tree.insert(id, &BoundingBox::new(x, y, x + 0.5, y + 0.5), 0.0)?;
                        }
                        Ok(())
                    })
                })
                .collect();

            let readers: Vec<_> = (0..2)
                .map(|_| {
                    let tree = ctx.tree();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let (ids, extents) = tree.query_ids(&BoundingBox::new(10.0, 10.0, 20.0, 20.0), false);
                            assert!(ids.windows(2).all(|w| w[0] < w[1]));
                            if !ids.is_empty() {
                                assert!(BoundingBox::new(9.0, 9.0, 21.0, 21.0).contains(&extents));
                            }
                        }
                    })
                })
                .collect();

            for writer in writers {
                writer.join().expect("writer panicked")?;
            }
            for reader in readers {
                reader.join().expect("reader panicked");
            }

            let tree = ctx.tree();
            assert_eq!(tree.size(), 2000);
            let (ids, _) = tree.query_ids(&BoundingBox::new(10.0, 10.0, 20.0, 20.0), false);
            // 11 columns by 11 rows of squares touch the query
            assert_eq!(ids.len(), 121);

            let deleters: Vec<_> = (0..4i64)
                .map(|t| {
                    let tree = ctx.tree();
                    thread::spawn(move || -> SpatialResult<()> {
                        for i in (0..500).step_by(2) {
                            tree.delete(t * 500 + i)?;
                        }
                        Ok(())
                    })
                })
                .collect();
            for deleter in deleters {
                deleter.join().expect("deleter panicked")?;
            }
            assert_eq!(tree.size(), 1000);
            Ok(())
        },
        cleanup,
    )
}
