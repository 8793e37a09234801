use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::distr::{Distribution, Uniform};
use rand::{rngs::StdRng, SeedableRng};
use route_analytics::{
    AnalysisRequest, FeatureConfig, Point, Reducer, Reduction, RouteStore,
};
use std::time::Duration;

#[derive(Clone)]
pub struct RouteSetConfig {
    seed: u64,
    route_counts: Vec<usize>,
    points_per_route: usize,
    measurement_time: u64,
    sample_size: usize,
}

impl Default for RouteSetConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            route_counts: vec![10, 50, 200],
            points_per_route: 12,
            measurement_time: 5,
            sample_size: 20,
        }
    }
}

fn create_test_routes(n_routes: usize, points_per_route: usize, seed: u64) -> RouteStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let coord_dist = Uniform::try_from(0.0..30.0).unwrap();
    let mut store = RouteStore::new();

    for _ in 0..n_routes {
        let id = store.start_route();
        for _ in 0..points_per_route {
            store.push_point(
                id,
                Point::new(coord_dist.sample(&mut rng), coord_dist.sample(&mut rng)),
            );
        }
    }
    store
}

fn bench_feature_extraction(c: &mut Criterion) {
    let config = RouteSetConfig::default();
    let mut group = c.benchmark_group("feature_extraction");
    group.measurement_time(Duration::from_secs(config.measurement_time));
    group.sample_size(config.sample_size);

    let feature_config = FeatureConfig {
        include_middle_point: true,
        include_third_points: true,
        include_euclidean_distance: true,
    };

    for &n_routes in &config.route_counts {
        let store = create_test_routes(n_routes, config.points_per_route, config.seed);
        let snapshot = store.snapshot();
        group.bench_with_input(
            BenchmarkId::from_parameter(n_routes),
            &snapshot,
            |b, snapshot| {
                b.iter(|| route_analytics::features::extract(snapshot, &feature_config));
            },
        );
    }
    group.finish();
}

fn bench_pca_embedding(c: &mut Criterion) {
    let config = RouteSetConfig::default();
    let mut group = c.benchmark_group("pca_embedding");
    group.measurement_time(Duration::from_secs(config.measurement_time));
    group.sample_size(config.sample_size);

    for &n_routes in &config.route_counts {
        let store = create_test_routes(n_routes, config.points_per_route, config.seed);
        let snapshot = store.snapshot();
        let request = AnalysisRequest::new(Reduction::Pca, FeatureConfig::default());
        group.bench_with_input(
            BenchmarkId::from_parameter(n_routes),
            &snapshot,
            |b, snapshot| {
                b.iter(|| {
                    // fresh reducer per iteration so the cache never hits
                    let reducer = Reducer::new();
                    reducer.embed(snapshot, &request).unwrap()
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_feature_extraction, bench_pca_embedding);
criterion_main!(benches);
