//! Snapshot round trips of a populated tree.

use super::staged_tree_test::check_depth_four;
use netview_int_test::test_util::{
    assert_entries_exist, assert_query, cleanup, create_test_context, delete_entries,
    insert_entries, run_test, SENTINEL,
};
use netview_spatial::{RTree, SharedRTree, SpatialError, SpatialIndex, SpatialResult};

const INF: f64 = f64::INFINITY;

#[test]
fn test_restored_tree_answers_identically() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.tree().write(|tree| -> SpatialResult<()> {
                insert_entries(tree, 0..28)?;
                delete_entries(tree, 10..28)?;
                insert_entries(tree, 10..28)?;
                Ok(())
            })?;

            let bytes = ctx.tree().serialize()?;
            let restored = RTree::deserialize(&bytes)?;
            check_depth_four(&restored);
            assert!(restored.check_integrity().is_valid);

            // Encoding a restored tree reproduces the same bytes
            assert_eq!(restored.serialize()?, bytes);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_small_stages_survive_restore() {
    run_test(
        create_test_context,
        |ctx| {
            let stages: [(i64, usize, &[i64], [f64; 4]); 4] = [
                (0, 0, &[], SENTINEL),
                (3, 0, &[2], [0.5, 1.0, 1.5, 2.0]),
                (4, 1, &[2, 3], [0.5, 0.5, 3.5, 2.0]),
                (10, 2, &[2, 3, 9], [-2.0, 0.5, 3.5, 2.0]),
            ];

            for (count, height, hits, extents) in stages {
                ctx.tree().clear();
                ctx.tree().write(|tree| insert_entries(tree, 0..count))?;

                let restored = RTree::deserialize(&ctx.tree().serialize()?)?;
                assert_eq!(restored.size(), count as usize);
                assert_eq!(restored.height(), height);
                assert_entries_exist(&restored, 0..count);
                assert_query(&restored, [-INF, 1.1, INF, 1.2], hits, extents);
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_restored_tree_keeps_working() {
    run_test(
        create_test_context,
        |ctx| {
            let bytes = ctx.tree().write(|tree| -> SpatialResult<Vec<u8>> {
                insert_entries(tree, 0..28)?;
                tree.serialize()
            })?;

            let restored = SharedRTree::from_tree(RTree::deserialize(&bytes)?);
            restored.write(|tree| -> SpatialResult<()> {
                delete_entries(tree, 0..28)?;
                assert_eq!(tree.size(), 0);
                assert_eq!(tree.height(), 0);
                insert_entries(tree, 0..28)?;
                check_depth_four(tree);
                Ok(())
            })
        },
        cleanup,
    )
}

#[test]
fn test_damaged_snapshot_is_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.tree().write(|tree| insert_entries(tree, 0..28))?;
            let bytes = ctx.tree().serialize()?;

            for cut in [0, 4, bytes.len() / 3, bytes.len() - 1] {
                assert!(matches!(
                    RTree::deserialize(&bytes[..cut]),
                    Err(SpatialError::Deserialization(_))
                ));
            }

            let mut flipped = bytes.clone();
            let middle = flipped.len() / 2;
            flipped[middle] ^= 0x10;
            assert!(RTree::deserialize(&flipped).is_err());

            // The source tree is untouched by failed restores
            ctx.tree().read(check_depth_four);
            Ok(())
        },
        cleanup,
    )
}
