use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use geo_types::{Coord, LineString, Rect};
use road_tessellate::{Crs, DelaunayEngine, GeometryEngine, SeedLines};

fn generate_grid(n: usize) -> Vec<LineString<f64>> {
    let mut lines = Vec::new();
    for i in 0..=n {
        // Horizontal
        lines.push(LineString::from(vec![(0.0, i as f64), (n as f64, i as f64)]));
        // Vertical
        lines.push(LineString::from(vec![(i as f64, 0.0), (i as f64, n as f64)]));
    }
    lines
}

fn bench_voronoi_and_clip(c: &mut Criterion) {
    let mut group = c.benchmark_group("voronoi");
    group.sample_size(10);

    for size in [5, 10, 20].iter() {
        group.bench_with_input(BenchmarkId::new("grid", size), size, |b, &size| {
            // Densify so each street contributes a row of generators, not just its ends.
            let seeds = SeedLines::new(generate_grid(size), Crs::UTM_10N).densified(0.25);
            let extent = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: size as f64, y: size as f64 });
            let clip = extent.to_polygon();
            let engine = DelaunayEngine;

            b.iter(|| {
                let partition = engine.voronoi(&seeds, extent).unwrap();
                for cell in partition.cells() {
                    engine.intersect(&cell.polygon, &clip).unwrap();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_voronoi_and_clip);
criterion_main!(benches);
