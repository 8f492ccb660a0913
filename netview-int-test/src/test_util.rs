use log::error;
use netview_spatial::{
    BoundingBox, ObjectKey, RTree, SharedRTree, SpatialError, SpatialIndex, SpatialResult,
};
use std::backtrace::Backtrace;
use std::time::Instant;

/// Rectangles used by the staged scenario tests, keyed by their index.
pub const ENTRIES: [[f64; 4]; 28] = [
    [0.0, 0.0, 1.0, 1.0],
    [2.0, 2.0, 3.0, 3.0],
    [0.5, 1.0, 1.5, 2.0],
    [2.5, 0.5, 3.5, 1.5],
    [3.0, -0.25, 4.0, 0.75],
    [-0.5, 2.5, 0.5, 3.5],
    [2.75, 2.25, 3.75, 3.25],
    [1.25, 1.75, 2.25, 2.75],
    [1.0, 6.0, 2.0, 7.0],
    [-2.0, 1.0, -1.0, 2.0],
    [2.0, 4.0, 3.0, 5.0],
    [1.5, 3.75, 3.5, 4.25],
    [2.5, 3.5, 3.0, 5.5],
    [-4.0, 6.0, -2.0, 8.0],
    [-4.25, 5.75, 2.25, 8.25],
    [2.0, -1.0, 2.0, -1.0],
    [-1.25, 0.5, -1.25, 3.0],
    [-0.5, -0.5, 1.5, 0.5],
    [0.25, 4.0, 1.25, 5.0],
    [4.0, 1.0, 5.0, 2.0],
    [4.0, 3.0, 5.0, 4.0],
    [4.25, -1.5, 4.75, 5.0],
    [3.0, -1.75, 5.0, -1.0],
    [1.25, 0.25, 2.25, 1.25],
    [-2.0, 9.0, -1.0, 10.0],
    [1.0, 9.0, 2.0, 10.0],
    [-2.0, 5.0, -1.0, 6.0],
    [-2.5, 5.25, -1.75, 9.25],
];

/// Extents reported for an empty result or a missing key.
pub const SENTINEL: [f64; 4] = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];

/// Runs a test, then its cleanup, reporting failures and panics with a backtrace.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> SpatialResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> SpatialResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> SpatialResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();

    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        match before() {
            Ok(ctx) => match test(ctx.clone()) {
                Ok(_) => after(ctx.clone())
                    .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                Err(e) => {
                    let _ = after(ctx.clone());
                    Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                }
            },
            Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        }
    });

    let failure = match result {
        Ok(Ok(_)) => return,
        Ok(Err((e, bt))) => (e, bt),
        Err(panic_err) => {
            let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            (format!("Panic: {}", err_msg), Backtrace::capture().to_string())
        }
    };

    error!("Test failed after {:?}: {}", start_time.elapsed(), failure.0);
    if !failure.1.is_empty() && !failure.1.contains("disabled") {
        error!("Backtrace:\n{}", failure.1);
    }
    panic!("{}", failure.0);
}

#[derive(Clone)]
pub struct TestContext {
    name: String,
    tree: SharedRTree,
}

impl TestContext {
    pub fn new(name: String, tree: SharedRTree) -> Self {
        Self { name, tree }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree(&self) -> SharedRTree {
        self.tree.clone()
    }
}

/// Context over an empty tree with branching factor 3, the smallest that
/// still gives every staged scenario its expected depth.
pub fn create_test_context() -> SpatialResult<TestContext> {
    create_test_context_with(3)
}

pub fn create_test_context_with(branching_factor: usize) -> SpatialResult<TestContext> {
    let name = format!("rtree-{}", branching_factor);
    Ok(TestContext::new(name, SharedRTree::new(branching_factor)?))
}

/// Verifies the tree is still structurally sound, then empties it.
pub fn cleanup(ctx: TestContext) -> SpatialResult<()> {
    let report = ctx.tree().read(|tree| tree.check_integrity());
    if !report.is_valid {
        return Err(SpatialError::InvalidOperation(format!(
            "{} failed integrity check: {:?}",
            ctx.name(),
            report.errors
        )));
    }
    ctx.tree().clear();
    Ok(())
}

pub fn rect(extents: [f64; 4]) -> BoundingBox {
    BoundingBox::from_array(extents)
}

/// Inserts fixture entries `ids` with order key 0.
pub fn insert_entries(
    tree: &mut RTree,
    ids: impl IntoIterator<Item = ObjectKey>,
) -> SpatialResult<()> {
    for id in ids {
        tree.insert(id, &rect(ENTRIES[id as usize]), 0.0)?;
    }
    Ok(())
}

pub fn delete_entries(
    tree: &mut RTree,
    ids: impl IntoIterator<Item = ObjectKey>,
) -> SpatialResult<()> {
    for id in ids {
        tree.delete(id)?;
    }
    Ok(())
}

/// Inserts and deletes `rounds` blocks of 1000 unit squares with keys from
/// `first_key` upwards, leaving the tree's contents as they were.
pub fn churn(tree: &mut RTree, first_key: ObjectKey, rounds: i64) -> SpatialResult<()> {
    for j in 0..rounds {
        let start = first_key + j * 1000;
        let stop = start + 1000;
        for k in start..stop {
            let x = k as f64;
            tree.insert(k, &BoundingBox::new(x, x, x + 1.0, x + 1.0), 0.0)?;
        }
        for k in start..stop {
            tree.delete(k)?;
        }
    }
    Ok(())
}

/// Runs an overlap query, returning the ids, the initial pending count and
/// the extents written while consuming it.
pub fn query(tree: &RTree, area: [f64; 4], reverse: bool) -> (Vec<ObjectKey>, usize, [f64; 4]) {
    let mut extents = [0.0; 4];
    let mut enumerator = tree.query_overlap(&rect(area), Some(&mut extents), reverse);
    let pending = enumerator.num_remaining();
    let ids: Vec<ObjectKey> = enumerator.by_ref().collect();
    drop(enumerator);
    (ids, pending, extents)
}

/// Asserts that a forward query yields exactly `expected` (ascending, since
/// every fixture entry has order key 0) with the given combined extents.
pub fn assert_query(tree: &RTree, area: [f64; 4], expected: &[ObjectKey], extents: [f64; 4]) {
    let (ids, pending, actual) = query(tree, area, false);
    assert_eq!(pending, expected.len(), "pending count for {:?}", area);
    assert_eq!(ids, expected, "hits for {:?}", area);
    assert_eq!(actual, extents, "extents for {:?}", area);
}

/// Asserts that every key in `ids` exists with its fixture extents.
pub fn assert_entries_exist(tree: &RTree, ids: impl IntoIterator<Item = ObjectKey>) {
    let mut extents = [0.0; 5];
    for id in ids {
        let out: &mut [f64; 4] = (&mut extents[1..5]).try_into().expect("four slots");
        assert!(tree.exists(id, Some(out)), "entry {} does not exist", id);
        assert_eq!(extents[1..5], ENTRIES[id as usize], "extents of {}", id);
    }
}
