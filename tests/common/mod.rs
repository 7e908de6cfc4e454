#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use moldscope::config::{AnalysisConfig, SampleDensity, SearchConfig, ThicknessBounds};
use moldscope::math::{Point3, Vector3};
use moldscope::operations::creation::{
    MakeBox, MakeBoxWithHole, MakeCylinder, MakeSphere,
};
use moldscope::query::SolidView;
use moldscope::topology::TopologyStore;

pub fn p(x: f64, y: f64, z: f64) -> Point3 {
    Point3::new(x, y, z)
}

pub fn cube(size: f64) -> SolidView {
    let mut store = TopologyStore::new();
    let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(size, size, size))
        .execute(&mut store)
        .expect("box");
    SolidView::new(&store, solid).expect("box view")
}

pub fn split_cube(size: f64) -> SolidView {
    let mut store = TopologyStore::new();
    let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(size, size, size))
        .with_split_sides_at(0.5 * size)
        .execute(&mut store)
        .expect("split box");
    SolidView::new(&store, solid).expect("split box view")
}

pub fn ball(radius: f64) -> SolidView {
    let mut store = TopologyStore::new();
    let solid = MakeSphere::new(p(0.0, 0.0, 0.0), radius)
        .execute(&mut store)
        .expect("sphere");
    SolidView::new(&store, solid).expect("sphere view")
}

pub fn hollow_ball(outer: f64, inner: f64) -> SolidView {
    let mut store = TopologyStore::new();
    let solid = MakeSphere::new(p(0.0, 0.0, 0.0), outer)
        .with_cavity(inner)
        .execute(&mut store)
        .expect("hollow sphere");
    SolidView::new(&store, solid).expect("hollow sphere view")
}

/// 10 mm cube with a 4 mm radius 2 blind hole drilled along -X.
pub fn holed_cube() -> SolidView {
    let mut store = TopologyStore::new();
    let solid = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0), 2.0, 4.0)
        .execute(&mut store)
        .expect("holed box");
    SolidView::new(&store, solid).expect("holed box view")
}

pub fn boss(draft_deg: f64) -> SolidView {
    let mut store = TopologyStore::new();
    let solid = MakeCylinder::new(p(0.0, 0.0, 0.0), 5.0, Vector3::z(), 10.0)
        .with_draft(draft_deg)
        .execute(&mut store)
        .expect("boss");
    SolidView::new(&store, solid).expect("boss view")
}

/// Small grids and a short search so scenarios run quickly.
pub fn quick_config() -> AnalysisConfig {
    AnalysisConfig {
        sample_density: SampleDensity {
            grid: 4,
            ..SampleDensity::default()
        },
        search: SearchConfig {
            coarse_resolution: 16,
            iteration_cap: 40,
            min_step_deg: 0.5,
            ..SearchConfig::default()
        },
        thickness: ThicknessBounds {
            min: 0.1,
            max: 100.0,
            ..ThicknessBounds::default()
        },
        ..AnalysisConfig::default()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
