//! Computed normals
//!
//! Used when a mesh has no authored normals. Face normals use Newell's
//! method so non-planar and concave polygons still get a stable direction.

use void_math::Vec3;
use void_scene::Orientation;

use super::mesh::RenderingTopology;

fn point(points: &[[f32; 3]], scene: u32) -> Vec3 {
    points
        .get(scene as usize)
        .map(|&p| Vec3::from_array(p))
        .unwrap_or(Vec3::ZERO)
}

/// Unnormalized Newell normal of one face, in rendering-vertex corners
fn face_normal(points: &[[f32; 3]], topology: &RenderingTopology, corners: &[u32]) -> Vec3 {
    let mut normal = Vec3::ZERO;
    for (k, &corner) in corners.iter().enumerate() {
        let next = corners[(k + 1) % corners.len()];
        let a = point(points, topology.rendering_to_scene[corner as usize]);
        let b = point(points, topology.rendering_to_scene[next as usize]);
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    if topology.orientation == Orientation::LeftHanded {
        -normal
    } else {
        normal
    }
}

/// Area-weighted vertex normals, one per rendering vertex
///
/// Normals are accumulated per scene point so rendering vertices split
/// from the same point share one normal.
pub fn smooth_normals(points: &[[f32; 3]], topology: &RenderingTopology) -> Vec<[f32; 3]> {
    let mut accumulated = vec![Vec3::ZERO; points.len()];
    let offsets = topology.face_offsets();

    for (face, &count) in topology.face_vertex_counts.iter().enumerate() {
        let corners = &topology.face_vertex_indices[offsets[face]..offsets[face] + count as usize];
        if corners.len() < 3 {
            continue;
        }
        let normal = face_normal(points, topology, corners);
        for &corner in corners {
            let scene = topology.rendering_to_scene[corner as usize] as usize;
            if let Some(slot) = accumulated.get_mut(scene) {
                *slot += normal;
            }
        }
    }

    topology
        .rendering_to_scene
        .iter()
        .map(|&scene| {
            accumulated
                .get(scene as usize)
                .map(|n| n.normalize_or_zero().to_array())
                .unwrap_or([0.0; 3])
        })
        .collect()
}

/// Per-face normals written to each face's corners
///
/// Only meaningful on an unshared layout; on a shared one later faces
/// overwrite shared vertices.
pub fn flat_normals(points: &[[f32; 3]], topology: &RenderingTopology) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0; 3]; topology.num_rendering_vertices()];
    let offsets = topology.face_offsets();

    for (face, &count) in topology.face_vertex_counts.iter().enumerate() {
        let corners = &topology.face_vertex_indices[offsets[face]..offsets[face] + count as usize];
        if corners.len() < 3 {
            continue;
        }
        let normal = face_normal(points, topology, corners).normalize_or_zero().to_array();
        for &corner in corners {
            normals[corner as usize] = normal;
        }
    }
    normals
}
