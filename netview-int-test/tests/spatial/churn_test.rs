//! Randomized insert/delete churn checked against simple oracles.

use netview_int_test::test_util::{cleanup, create_test_context, create_test_context_with, run_test};
use netview_spatial::{BoundingBox, OrderedLongSet, RTree, SpatialIndex, SpatialResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

fn random_rect(rng: &mut StdRng) -> BoundingBox {
    let x = rng.random_range(-100.0..100.0);
    let y = rng.random_range(-100.0..100.0);
    let w = rng.random_range(0.0..8.0);
    let h = rng.random_range(0.0..8.0);
    BoundingBox::new(x, y, x + w, y + h)
}

/// Checks size, membership and a random query against the oracles.
fn verify(
    tree: &RTree,
    live: &OrderedLongSet,
    rects: &HashMap<i64, BoundingBox>,
    rng: &mut StdRng,
) {
    assert_eq!(tree.size(), live.len());

    let area = random_rect(rng);
    let query = BoundingBox::new(area.min_x, area.min_y, area.max_x + 30.0, area.max_y + 30.0);
    let expected: Vec<i64> = live
        .iter()
        .map(|k| k as i64)
        .filter(|id| rects[id].intersects(&query))
        .collect();

    let mut extents = [0.0; 4];
    let hits: Vec<i64> = tree.query_overlap(&query, Some(&mut extents), false).collect();
    assert_eq!(hits, expected);

    let mbr = expected
        .iter()
        .fold(BoundingBox::empty(), |acc, id| acc.union(&rects[id]));
    assert_eq!(extents, mbr.to_array());
}

fn random_churn(seed: u64, tree: &mut RTree) -> SpatialResult<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut live = OrderedLongSet::new();
    let mut rects = HashMap::new();

    for step in 0..20_000 {
        let id = rng.random_range(0..2_000i64);
        if live.contains(id as u64) {
            let removed = tree.delete(id)?;
            assert_eq!(Some(removed), rects.remove(&id));
            assert!(live.remove(id as u64));
        } else {
            let bbox = random_rect(&mut rng);
            tree.insert(id, &bbox, 0.0)?;
            rects.insert(id, bbox);
            assert!(live.insert(id as u64));
        }

        if step % 1_000 == 0 {
            verify(tree, &live, &rects, &mut rng);
            assert!(tree.check_integrity().is_valid, "integrity lost at step {}", step);
        }
    }

    verify(tree, &live, &rects, &mut rng);

    // Drain completely; the tree must end as a single empty leaf
    for id in live.iter().collect::<Vec<_>>() {
        tree.delete(id as i64)?;
    }
    assert_eq!(tree.size(), 0);
    assert_eq!(tree.height(), 0);
    Ok(())
}

#[test]
fn test_random_churn_small_nodes() {
    run_test(
        create_test_context,
        |ctx| ctx.tree().write(|tree| random_churn(0xC0FFEE, tree)),
        cleanup,
    )
}

#[test]
fn test_random_churn_default_nodes() {
    run_test(
        || create_test_context_with(11),
        |ctx| ctx.tree().write(|tree| random_churn(7, tree)),
        cleanup,
    )
}

#[test]
fn test_point_rectangles() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.tree().write(|tree| -> SpatialResult<()> {
                let mut rng = StdRng::seed_from_u64(99);
                for id in 0..500 {
                    let x = rng.random_range(0..20) as f64;
                    let y = rng.random_range(0..20) as f64;
                    tree.insert(id, &BoundingBox::new(x, y, x, y), 0.0)?;
                }
                let hits = tree
                    .query_overlap(&BoundingBox::new(0.0, 0.0, 19.0, 19.0), None, false)
                    .count();
                assert_eq!(hits, 500);

                let probe = tree.extents(42).unwrap_or(BoundingBox::empty());
                let at_point: Vec<i64> = tree.query_overlap(&probe, None, false).collect();
                assert!(at_point.contains(&42));
                Ok(())
            })
        },
        cleanup,
    )
}
