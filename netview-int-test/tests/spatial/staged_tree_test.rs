//! Scenario tests for trees of depth one to four.
//!
//! Every stage is checked twice: once right after the entries are inserted
//! and once more after thousands of unrelated keys have passed through the
//! tree.

use netview_int_test::test_util::{
    assert_entries_exist, assert_query, churn, cleanup, create_test_context, delete_entries,
    insert_entries, query, SENTINEL,
};
use netview_spatial::{RTree, SpatialIndex};

const INF: f64 = f64::INFINITY;
const ALL: [f64; 4] = [-INF, -INF, INF, INF];

fn assert_missing(tree: &RTree, id: i64) {
    let mut extents = [0.0; 4];
    assert!(!tree.exists(id, Some(&mut extents)), "entry {} should not exist", id);
    assert_eq!(extents, SENTINEL);
}

#[test]
fn test_empty_tree() {
    run_stage(|tree| {
        for round in 0..2 {
            let (ids, pending, extents) = query(tree, ALL, false);
            assert_eq!(pending, 0);
            assert!(ids.is_empty());
            assert_eq!(extents, SENTINEL);
            assert_missing(tree, 0);
            assert_eq!(tree.size(), 0);
            assert_eq!(tree.height(), 0);

            if round == 0 {
                churn(tree, 0, 100)?;
            }
        }
        Ok(())
    });
}

#[test]
fn test_root_leaf() {
    run_stage(|tree| {
        insert_entries(tree, 0..3)?;

        for round in 0..2 {
            assert_entries_exist(tree, 0..3);
            assert_missing(tree, 3);
            assert_eq!(tree.size(), 3);
            assert_eq!(tree.height(), 0);

            assert_query(tree, ALL, &[0, 1, 2], [0.0, 0.0, 3.0, 3.0]);
            assert_query(tree, [1.25, 2.0, 2.1, 3.3], &[1, 2], [0.5, 1.0, 3.0, 3.0]);

            if round == 0 {
                churn(tree, 3, 100)?;
            }
        }
        Ok(())
    });
}

#[test]
fn test_root_split() {
    run_stage(|tree| {
        insert_entries(tree, 0..4)?;

        for round in 0..2 {
            assert_entries_exist(tree, 0..4);
            assert_missing(tree, 4);
            assert_eq!(tree.size(), 4);
            assert_eq!(tree.height(), 1);

            assert_query(tree, ALL, &[0, 1, 2, 3], [0.0, 0.0, 3.5, 3.0]);
            assert_query(tree, [2.0, 0.5, 2.2, 1.9], &[], SENTINEL);
            assert_query(tree, [-INF, 1.1, INF, 1.2], &[2, 3], [0.5, 0.5, 3.5, 2.0]);
            assert_query(tree, [1.0, 1.0, 1.0, 1.0], &[0, 2], [0.0, 0.0, 1.5, 2.0]);

            if round == 0 {
                churn(tree, 4, 100)?;
            }
        }
        Ok(())
    });
}

#[test]
fn test_depth_three() {
    run_stage(|tree| {
        insert_entries(tree, 0..10)?;

        for round in 0..2 {
            assert_entries_exist(tree, (0..10).rev());
            assert_missing(tree, -1);
            assert_missing(tree, 10);
            assert_eq!(tree.size(), 10);
            assert_eq!(tree.height(), 2);

            let everything: Vec<i64> = (0..10).collect();
            assert_query(tree, ALL, &everything, [-2.0, -0.25, 4.0, 7.0]);
            assert_query(tree, [1.0, 1.25, 3.0, 5.0], &[1, 2, 3, 6, 7], [0.5, 0.5, 3.75, 3.25]);
            assert_query(tree, [-1.5, 0.25, 0.25, 3.0], &[0, 5, 9], [-2.0, 0.0, 1.0, 3.5]);
            assert_query(tree, [1.5, 6.5, 1.5, 6.5], &[8], [1.0, 6.0, 2.0, 7.0]);
            assert_query(tree, [3.0, 5.0, 8.0, 9.0], &[], SENTINEL);
            assert_query(tree, [-100.0, -100.0, -99.0, -99.0], &[], SENTINEL);
            assert_query(tree, [-1.0, 0.75, 3.0, 6.0], &everything, [-2.0, -0.25, 4.0, 7.0]);

            if round == 0 {
                churn(tree, 10, 100)?;
            }
        }
        Ok(())
    });
}

#[test]
fn test_depth_four() {
    run_stage(|tree| {
        insert_entries(tree, 0..10)?;
        // Grow, shrink back and grow again before checking
        insert_entries(tree, 10..28)?;
        delete_entries(tree, 10..28)?;
        assert_eq!(tree.height(), 2);
        insert_entries(tree, 10..28)?;

        for round in 0..2 {
            check_depth_four(tree);
            if round == 0 {
                churn(tree, 28, 100)?;
            }
        }
        Ok(())
    });
}

/// Expectations for a tree holding all 28 fixture entries.
pub(super) fn check_depth_four(tree: &RTree) {
    assert_entries_exist(tree, (0..28).rev());
    assert_missing(tree, 28);
    assert_missing(tree, i64::MIN);
    assert_eq!(tree.size(), 28);
    assert_eq!(tree.height(), 3);

    let everything: Vec<i64> = (0..28).collect();
    assert_query(tree, ALL, &everything, [-4.25, -1.75, 5.0, 10.0]);
    assert_query(
        tree,
        [-2.0, 6.0, -2.0, 6.0],
        &[13, 14, 26, 27],
        [-4.25, 5.0, 2.25, 9.25],
    );
    assert_query(
        tree,
        [2.5, 3.75, 6.0, 6.0],
        &[10, 11, 12, 20, 21],
        [1.5, -1.5, 5.0, 5.5],
    );
    assert_query(tree, [1.75, -1.5, 3.25, -0.5], &[15, 22], [2.0, -1.75, 5.0, -1.0]);
    assert_query(
        tree,
        [-3.0, -5.0, 7.0, 2.75],
        &[0, 1, 2, 3, 4, 5, 6, 7, 9, 15, 16, 17, 19, 21, 22, 23],
        [-2.0, -1.75, 5.0, 5.0],
    );
    assert_query(
        tree,
        [1.0, 4.5, 3.0, 6.25],
        &[8, 10, 12, 14, 18],
        [-4.25, 3.5, 3.0, 8.25],
    );
    assert_query(tree, [0.75, 0.25, 1.5, 0.75], &[0, 17, 23], [-0.5, -0.5, 2.25, 1.25]);
    assert_query(
        tree,
        [1.75, -10.0, 1.75, 30.0],
        &[7, 8, 11, 14, 23, 25],
        [-4.25, 0.25, 3.5, 10.0],
    );
    assert_query(tree, [0.75, 3.0, 1.75, 3.5], &[], SENTINEL);
    assert_query(tree, [2.5, 1.75, 3.75, 1.75], &[], SENTINEL);
    assert_query(tree, [-2.0, -1.0, 4.25, 9.0], &everything, [-4.25, -1.75, 5.0, 10.0]);
}

fn run_stage<F>(stage: F)
where
    F: Fn(&mut RTree) -> netview_spatial::SpatialResult<()>
        + std::panic::UnwindSafe
        + std::panic::RefUnwindSafe,
{
    netview_int_test::test_util::run_test(
        create_test_context,
        |ctx| ctx.tree().write(|tree| stage(tree)),
        cleanup,
    )
}
