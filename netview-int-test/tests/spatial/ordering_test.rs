//! Enumeration order must be the same tree-wide order for every query.

use netview_int_test::test_util::{
    cleanup, create_test_context, insert_entries, query, rect, run_test, ENTRIES,
};
use netview_spatial::{ObjectKey, RTree, SpatialIndex, SpatialResult};

const INF: f64 = f64::INFINITY;

/// Subqueries from the depth four scenario with their hit counts.
const SUBQUERIES: [([f64; 4], usize); 4] = [
    ([0.0, 0.0, INF, INF], 20),
    ([-10.0, -5.0, 1.0, 4.0], 7),
    ([-99.0, -5.0, 1.0, 30.0], 14),
    ([-3.0, 4.0, 10.0, 20.0], 13),
];

fn position(all: &[ObjectKey], id: ObjectKey) -> usize {
    all.iter()
        .position(|&other| other == id)
        .unwrap_or_else(|| panic!("{} missing from full enumeration", id))
}

fn check_subqueries(tree: &RTree) {
    let (all, pending, _) = query(tree, [-INF, -INF, INF, INF], false);
    assert_eq!(pending, 28);
    assert_eq!(all.len(), 28);

    for (area, count) in SUBQUERIES {
        let (ids, pending, _) = query(tree, area, false);
        assert_eq!(pending, count, "pending count for {:?}", area);
        assert_eq!(ids.len(), count, "hits for {:?}", area);

        let positions: Vec<usize> = ids.iter().map(|&id| position(&all, id)).collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "order in subquery {:?} not preserved",
            area
        );

        let (mut reversed, pending, _) = query(tree, area, true);
        assert_eq!(pending, count);
        reversed.reverse();
        assert_eq!(reversed, ids, "reverse of {:?} is not a mirror", area);
    }
}

#[test]
fn test_order_preserving_subqueries() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.tree().write(|tree| -> SpatialResult<()> {
                insert_entries(tree, (0..28).rev())?;
                check_subqueries(tree);
                Ok(())
            })
        },
        cleanup,
    )
}

#[test]
fn test_order_keys_drive_enumeration() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.tree().write(|tree| -> SpatialResult<()> {
                // Order keys run against the keys in three bands
                for id in 0..28 {
                    let order = -((id % 3) as f64);
                    tree.insert(id, &rect(ENTRIES[id as usize]), order)?;
                }
                check_subqueries(tree);

                let (all, _, _) = query(tree, [-INF, -INF, INF, INF], false);
                let mut expected: Vec<ObjectKey> = (0..28).collect();
                expected.sort_by_key(|&id| (-(id % 3), id));
                assert_eq!(all, expected);

                let (all, _, _) = query(tree, [-INF, -INF, INF, INF], true);
                expected.reverse();
                assert_eq!(all, expected);
                Ok(())
            })
        },
        cleanup,
    )
}

#[test]
fn test_order_survives_updates() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.tree().write(|tree| -> SpatialResult<()> {
                for id in 0..28 {
                    tree.insert(id, &rect(ENTRIES[id as usize]), (27 - id) as f64)?;
                }
                // Move every other entry by deleting and reinserting it
                for id in (0..28).step_by(2) {
                    let extents = tree.delete(id)?;
                    tree.insert(id, &extents, (27 - id) as f64)?;
                }

                let (all, _, _) = query(tree, [-INF, -INF, INF, INF], false);
                let expected: Vec<ObjectKey> = (0..28).rev().collect();
                assert_eq!(all, expected);
                check_subqueries(tree);
                Ok(())
            })
        },
        cleanup,
    )
}

#[test]
fn test_partial_consumption_counts_down() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.tree().write(|tree| -> SpatialResult<()> {
                insert_entries(tree, 0..28)?;
                let mut extents = [0.0; 4];
                let mut hits = tree.query_overlap(&rect([-3.0, 4.0, 10.0, 20.0]), Some(&mut extents), false);
                assert_eq!(hits.num_remaining(), 13);
                assert_eq!(hits.next(), Some(8));
                assert_eq!(hits.next(), Some(10));
                assert_eq!(hits.num_remaining(), 11);
                drop(hits);
                // Extents cover ids 8 and 10 only
                assert_eq!(extents, [1.0, 4.0, 3.0, 7.0]);
                Ok(())
            })
        },
        cleanup,
    )
}
