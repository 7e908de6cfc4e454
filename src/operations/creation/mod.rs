mod make_blind_hole;
mod make_box;
mod make_cylinder;
mod make_face;
mod make_polyhedron;
mod make_solid;
mod make_sphere;
mod make_wire;

pub use make_blind_hole::MakeBoxWithHole;
pub use make_box::MakeBox;
pub use make_cylinder::MakeCylinder;
pub use make_face::MakeFace;
pub use make_polyhedron::MakePolyhedron;
pub use make_solid::MakeSolid;
pub use make_sphere::MakeSphere;
pub use make_wire::{EdgeMap, MakeWire};

use crate::error::Result;
use crate::geometry::curve::Arc;
use crate::math::{Point3, Vector3};
use crate::topology::{
    EdgeCurve, EdgeData, EdgeId, OrientedEdge, TopologyStore, VertexData, WireData, WireId,
};

/// Adds a full-circle edge whose single vertex sits at `center + radius * ref_dir`.
fn add_circle(
    store: &mut TopologyStore,
    center: Point3,
    radius: f64,
    normal: Vector3,
    ref_dir: Vector3,
) -> Result<EdgeId> {
    let arc = Arc::full_circle(center, radius, normal, ref_dir)?;
    let vertex = store.add_vertex(VertexData::new(center + ref_dir.normalize() * radius));
    Ok(store.add_edge(EdgeData {
        start: vertex,
        end: vertex,
        curve: EdgeCurve::Arc(arc),
        t_start: 0.0,
        t_end: std::f64::consts::TAU,
    }))
}

/// Wraps a single edge into a closed wire.
fn single_edge_wire(store: &mut TopologyStore, edge: EdgeId, forward: bool) -> WireId {
    store.add_wire(WireData::closed(vec![OrientedEdge::new(edge, forward)]))
}
