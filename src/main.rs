use bvh_distance_queries::config::Config;
use bvh_distance_queries::residual::total_mean_squared_distance;
use bvh_distance_queries::{
    BBox, BatchQuery, Bvh, PointToMeshResidual, QueryError, QueryResult, Ray, TriMesh,
};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use nalgebra::{Point3, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use std::time::{Duration, Instant};

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "bvh_queries.toml".to_string());

    let config = match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> QueryResult<()> {
    if config.runtime.num_threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(config.runtime.num_threads)
            .build_global()
        {
            log::warn!("Failed to configure thread pool: {}", e);
        }
    }

    if config.meshes.is_empty() {
        return Err(QueryError::InvalidConfig {
            message: "no [[meshes]] configured".to_string(),
        });
    }

    log::info!("Loading {} meshes...", config.meshes.len());
    let stores = config
        .meshes
        .iter()
        .map(|mesh| TriMesh::load_store(&mesh.path))
        .collect::<QueryResult<Vec<_>>>()?;

    log::info!("Building hierarchies...");
    let now = Instant::now();
    let bvhs = config.builder.to_builder().build_batch(stores)?;
    let build_elapsed = now.elapsed();

    let sampling = config.queries;
    let style = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let bar = ProgressBar::new(bvhs.len() as u64)
        .with_style(style)
        .with_message("Sampling queries");

    let (points, rays): (Vec<Vec<Point3<f32>>>, Vec<Vec<Ray>>) = bvhs
        .par_iter()
        .enumerate()
        .progress_with(bar)
        .map(|(item, bvh)| {
            let mut rng = StdRng::seed_from_u64(sampling.seed.wrapping_add(item as u64));
            let region = sampling_region(bvh, sampling.padding);
            let points: Vec<Point3<f32>> = (0..sampling.points_per_mesh)
                .map(|_| sample_in(&mut rng, &region))
                .collect();
            let rays: Vec<Ray> = (0..sampling.rays_per_mesh)
                .filter_map(|_| Ray::new(sample_in(&mut rng, &region), sample_direction(&mut rng)))
                .collect();
            (points, rays)
        })
        .unzip();

    log::info!("Querying...");
    let query = BatchQuery::new(&bvhs).with_traversal(config.traversal.mode);
    let now = Instant::now();
    let nearest = query.nearest_points(&points)?;
    let hits = query.cast_rays(&rays)?;
    let residuals = PointToMeshResidual::new(&bvhs)
        .with_traversal(config.traversal.mode)
        .compute(&points)?;
    let query_elapsed = now.elapsed();

    for (item, bvh) in bvhs.iter().enumerate() {
        let max_distance = nearest[item]
            .iter()
            .map(|r| r.distance)
            .fold(0.0_f32, f32::max);
        let stats = bvh.stats();
        log::info!(
            "Item {}: {} triangles, {} nodes (depth {}), mean squared distance {:.6}, max distance {:.6}, {}/{} rays hit",
            item,
            bvh.primitive_count(),
            stats.node_count,
            stats.max_depth,
            residuals[item].mean_squared_distance(),
            max_distance,
            hits[item].iter().filter(|h| h.is_some()).count(),
            hits[item].len()
        );
    }

    log::info!(
        "Done. Build time: {:?}. Query time: {:?}. Overall mean squared distance: {:.6}",
        build_elapsed,
        query_elapsed,
        total_mean_squared_distance(&residuals)
    );
    log_rate("points", points.iter().map(Vec::len).sum(), query_elapsed);

    Ok(())
}

/// Mesh bounds grown by `padding` times their diagonal, never degenerate.
fn sampling_region(bvh: &Bvh, padding: f32) -> BBox {
    let bbox = bvh
        .root()
        .map(|node| *node.bbox())
        .unwrap_or_else(|| BBox::new(Point3::origin(), Point3::origin()));
    let pad = (bbox.get_extent().norm() * padding).max(1e-3);
    BBox::new(
        bbox.min - Vector3::repeat(pad),
        bbox.max + Vector3::repeat(pad),
    )
}

fn sample_in(rng: &mut impl Rng, region: &BBox) -> Point3<f32> {
    Point3::new(
        rng.gen_range(region.min.x..region.max.x),
        rng.gen_range(region.min.y..region.max.y),
        rng.gen_range(region.min.z..region.max.z),
    )
}

fn sample_direction(rng: &mut impl Rng) -> Vector3<f32> {
    // Rejection sampling
    loop {
        let v = Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let n2 = v.norm_squared();
        if n2 > 1e-6 && n2 < 1.0 {
            return v;
        }
    }
}

fn log_rate(what: &str, count: usize, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        log::info!("{:.0} {} per second", count as f64 / secs, what);
    }
}
