use netview_spatial::{BoundingBox, RTree, SpatialIndex, SpatialResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> SpatialResult<()> {
    println!("Starting stress test...");
    let mut rng = StdRng::seed_from_u64(2024);
    let mut tree = RTree::default();

    let count = 1_000_000i64;
    let start = std::time::Instant::now();
    for id in 0..count {
        let x = rng.random_range(0.0..10_000.0);
        let y = rng.random_range(0.0..10_000.0);
        tree.insert(id, &BoundingBox::new(x, y, x + 5.0, y + 5.0), (id % 97) as f64)?;
    }
    println!("Inserted {} rectangles in {:?}", count, start.elapsed());
    println!("{:?}", tree.stats());

    let start = std::time::Instant::now();
    let mut hits = 0;
    for _ in 0..10_000 {
        let x = rng.random_range(0.0..10_000.0);
        let y = rng.random_range(0.0..10_000.0);
        hits += tree
            .query_overlap(&BoundingBox::new(x, y, x + 50.0, y + 50.0), None, false)
            .num_remaining();
    }
    println!("Ran 10000 queries with {} hits in {:?}", hits, start.elapsed());

    let start = std::time::Instant::now();
    let bytes = tree.serialize()?;
    let restored = RTree::deserialize(&bytes)?;
    println!(
        "Round-tripped {} bytes ({} entries) in {:?}",
        bytes.len(),
        restored.size(),
        start.elapsed()
    );

    let start = std::time::Instant::now();
    for id in (0..count).step_by(2) {
        tree.delete(id)?;
    }
    println!("Deleted {} rectangles in {:?}", count / 2, start.elapsed());

    let report = tree.check_integrity();
    println!(
        "Integrity: {} ({} nodes checked)",
        if report.is_valid { "ok" } else { "BROKEN" },
        report.nodes_checked
    );
    Ok(())
}
