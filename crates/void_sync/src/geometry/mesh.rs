//! Mesh rendering topology
//!
//! Authored meshes index shared scene points. The renderer wants one vertex
//! stream per rendering vertex, so the authored layout is either:
//! - **unshared**: one rendering vertex per face corner, needed whenever a
//!   primvar varies per face or per corner, or
//! - **sorted**: scene points renumbered in first-use order, each used point
//!   appearing once.
//!
//! Both produce the `rendering_to_scene` / `scene_to_rendering` tables every
//! primvar fill goes through, plus triangle and edge index buffers.

use std::collections::HashSet;
use void_core::PrimPath;
use void_scene::{Interpolation, MeshTopology, Orientation};

/// Marks a scene point no face references
pub const INVALID_INDEX: u32 = u32::MAX;

/// Renderer-facing mesh layout
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderingTopology {
    /// Corner count per face (faces that overran the index array dropped)
    pub face_vertex_counts: Vec<u32>,
    /// Rendering vertex of every face corner
    pub face_vertex_indices: Vec<u32>,
    /// Scene point behind each rendering vertex
    pub rendering_to_scene: Vec<u32>,
    /// Rendering vertex of each scene point, `INVALID_INDEX` when unused
    pub scene_to_rendering: Vec<u32>,
    /// Faces not drawn
    pub holes: Vec<bool>,
    pub orientation: Orientation,
    /// Whether every corner has its own rendering vertex
    pub unshared: bool,
}

impl RenderingTopology {
    pub fn num_rendering_vertices(&self) -> usize {
        self.rendering_to_scene.len()
    }

    pub fn num_faces(&self) -> usize {
        self.face_vertex_counts.len()
    }

    pub fn num_corners(&self) -> usize {
        self.face_vertex_indices.len()
    }

    pub fn num_scene_points(&self) -> usize {
        self.scene_to_rendering.len()
    }

    /// Start offset of each face in the corner arrays
    pub fn face_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.face_vertex_counts.len());
        let mut offset = 0usize;
        for &count in &self.face_vertex_counts {
            offsets.push(offset);
            offset += count as usize;
        }
        offsets
    }

    fn is_hole(&self, face: usize) -> bool {
        self.holes.get(face).copied().unwrap_or(false)
    }
}

/// Whether primvars with these interpolations force an unshared layout
pub fn needs_unshare(interpolations: impl IntoIterator<Item = Interpolation>) -> bool {
    interpolations
        .into_iter()
        .any(|i| matches!(i, Interpolation::Uniform | Interpolation::FaceVarying))
}

/// Build the rendering layout of an authored mesh
///
/// `num_points` is the authored point count; indices at or beyond it (and
/// negative ones) are data errors and are clamped to point zero.
pub fn build_rendering_topology(
    topology: &MeshTopology,
    num_points: usize,
    unshare: bool,
    label: &str,
) -> RenderingTopology {
    // Faces whose corners run past the index array are dropped.
    let mut counts = Vec::with_capacity(topology.face_vertex_counts.len());
    let mut total = 0usize;
    for (face, &count) in topology.face_vertex_counts.iter().enumerate() {
        let count = if count < 0 {
            log::warn!("{}: face {} has negative vertex count", label, face);
            0
        } else {
            count as usize
        };
        if total + count > topology.face_vertex_indices.len() {
            log::warn!(
                "{}: face vertex counts exceed the {} authored indices, {} faces dropped",
                label,
                topology.face_vertex_indices.len(),
                topology.face_vertex_counts.len() - face
            );
            break;
        }
        total += count;
        counts.push(count as u32);
    }
    if total < topology.face_vertex_indices.len() {
        log::warn!(
            "{}: {} trailing face vertex indices ignored",
            label,
            topology.face_vertex_indices.len() - total
        );
    }

    let point_count = num_points.max(1);
    let mut bad_indices = 0usize;
    let scene_corners: Vec<u32> = topology.face_vertex_indices[..total]
        .iter()
        .map(|&index| {
            if index < 0 || index as usize >= point_count {
                bad_indices += 1;
                0
            } else {
                index as u32
            }
        })
        .collect();
    if bad_indices > 0 {
        log::error!(
            "{}: {} face vertex indices outside [0, {}) clamped to 0",
            label,
            bad_indices,
            num_points
        );
    }

    let mut scene_to_rendering = vec![INVALID_INDEX; point_count];
    let mut rendering_to_scene = Vec::new();
    let face_vertex_indices: Vec<u32> = if unshare {
        rendering_to_scene = scene_corners.clone();
        for (corner, &scene) in scene_corners.iter().enumerate() {
            let slot = &mut scene_to_rendering[scene as usize];
            if *slot == INVALID_INDEX {
                *slot = corner as u32;
            }
        }
        (0..scene_corners.len() as u32).collect()
    } else {
        scene_corners
            .iter()
            .map(|&scene| {
                let slot = &mut scene_to_rendering[scene as usize];
                if *slot == INVALID_INDEX {
                    *slot = rendering_to_scene.len() as u32;
                    rendering_to_scene.push(scene);
                }
                *slot
            })
            .collect()
    };
    if num_points == 0 {
        scene_to_rendering.clear();
    }

    let mut holes = vec![false; counts.len()];
    for &hole in &topology.hole_indices {
        match usize::try_from(hole).ok().and_then(|h| holes.get_mut(h)) {
            Some(flag) => *flag = true,
            None => log::warn!("{}: hole index {} out of range", label, hole),
        }
    }

    RenderingTopology {
        face_vertex_counts: counts,
        face_vertex_indices,
        rendering_to_scene,
        scene_to_rendering,
        holes,
        orientation: topology.orientation,
        unshared: unshare,
    }
}

/// Fan-triangulate the given faces (all faces when `faces` is `None`)
///
/// Holes are skipped; faces with fewer than three corners are skipped with
/// a warning. Returns the triangle index list and the number of skipped
/// degenerate faces.
pub fn triangulate(
    topology: &RenderingTopology,
    faces: Option<&[usize]>,
    label: &str,
) -> (Vec<u32>, usize) {
    let offsets = topology.face_offsets();
    let mut indices = Vec::new();
    let mut degenerate = 0usize;
    let flip = topology.orientation == Orientation::LeftHanded;

    let mut emit = |face: usize| {
        if topology.is_hole(face) {
            return;
        }
        let count = topology.face_vertex_counts[face] as usize;
        if count < 3 {
            degenerate += 1;
            return;
        }
        let corners = &topology.face_vertex_indices[offsets[face]..offsets[face] + count];
        for k in 1..count - 1 {
            if flip {
                indices.extend_from_slice(&[corners[0], corners[k + 1], corners[k]]);
            } else {
                indices.extend_from_slice(&[corners[0], corners[k], corners[k + 1]]);
            }
        }
    };

    match faces {
        Some(faces) => {
            for &face in faces {
                if face < topology.num_faces() {
                    emit(face);
                }
            }
        }
        None => (0..topology.num_faces()).for_each(&mut emit),
    }

    if degenerate > 0 {
        log::warn!("{}: {} faces with fewer than 3 vertices skipped", label, degenerate);
    }
    (indices, degenerate)
}

/// Triangles for one material binding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubsetTriangles {
    /// Material of the subset; `None` for faces no subset claims
    pub material_id: Option<PrimPath>,
    pub indices: Vec<u32>,
}

/// Triangulate per geom subset, plus one entry for unassigned faces
///
/// Without subsets a single entry covers the whole mesh. Faces claimed by
/// several subsets stay with the first.
pub fn triangulate_subsets(
    topology: &RenderingTopology,
    authored: &MeshTopology,
    label: &str,
) -> (Vec<SubsetTriangles>, usize) {
    if authored.subsets.is_empty() {
        let (indices, degenerate) = triangulate(topology, None, label);
        return (
            vec![SubsetTriangles {
                material_id: None,
                indices,
            }],
            degenerate,
        );
    }

    let mut claimed = vec![false; topology.num_faces()];
    let mut out = Vec::with_capacity(authored.subsets.len() + 1);
    let mut degenerate = 0;

    for subset in &authored.subsets {
        let faces: Vec<usize> = subset
            .face_indices
            .iter()
            .filter_map(|&f| usize::try_from(f).ok())
            .filter(|&f| f < claimed.len() && !claimed[f])
            .collect();
        for &face in &faces {
            claimed[face] = true;
        }
        let (indices, skipped) = triangulate(topology, Some(&faces), label);
        degenerate += skipped;
        out.push(SubsetTriangles {
            material_id: subset.material_id.clone(),
            indices,
        });
    }

    let unassigned: Vec<usize> = (0..claimed.len()).filter(|&f| !claimed[f]).collect();
    let (indices, skipped) = triangulate(topology, Some(&unassigned), label);
    degenerate += skipped;
    out.push(SubsetTriangles {
        material_id: None,
        indices,
    });

    (out, degenerate)
}

/// Unique edges of every non-hole face as index pairs
pub fn wireframe_edges(topology: &RenderingTopology) -> Vec<u32> {
    let offsets = topology.face_offsets();
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for face in 0..topology.num_faces() {
        if topology.is_hole(face) {
            continue;
        }
        let count = topology.face_vertex_counts[face] as usize;
        if count < 2 {
            continue;
        }
        let corners = &topology.face_vertex_indices[offsets[face]..offsets[face] + count];
        for k in 0..count {
            let a = corners[k];
            let b = corners[(k + 1) % count];
            if a == b {
                continue;
            }
            // Dedupe on scene points so unshared corners do not double edges
            let sa = topology.rendering_to_scene[a as usize];
            let sb = topology.rendering_to_scene[b as usize];
            if seen.insert((sa.min(sb), sa.max(sb))) {
                edges.extend_from_slice(&[a, b]);
            }
        }
    }
    edges
}
