//! Primvar expansion and fill
//!
//! Two jobs, both fail-soft:
//! - `interpolate_to_needed_length` grows a curve primvar to one value per
//!   control point
//! - `fill_primvar` scatters a mesh primvar into rendering-vertex order
//!
//! Values are handled as flat `f32` arrays with an explicit component
//! count so one code path serves every element type.

use void_scene::{CurveBasis, CurvesTopology, Interpolation, PrimvarValue};

use super::curves::cubic_segment_count;
use super::mesh::RenderingTopology;

/// How an expansion was resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expansion {
    /// Already the needed length
    Unchanged,
    /// Single value broadcast
    Broadcast,
    /// Per-segment varying values spread onto control points
    Varying,
    /// Unusable length; filled with the fallback value
    Fallback,
}

/// Varying element count of a curve set
///
/// Bezier curves have one varying value per segment end; bspline and
/// catmull-rom curves have `N - 2` (or `N` when periodic). Linear curves
/// vary per vertex.
pub fn varying_count(topology: &CurvesTopology) -> usize {
    topology
        .curve_vertex_counts
        .iter()
        .map(|&count| varying_count_of_curve(count.max(0) as usize, topology))
        .sum()
}

fn varying_count_of_curve(count: usize, topology: &CurvesTopology) -> usize {
    if !topology.is_cubic() {
        return count;
    }
    match topology.basis {
        CurveBasis::Bezier => {
            let segments = cubic_segment_count(count, topology.basis, topology.wrap);
            if topology.wrap.is_periodic() {
                segments
            } else if segments == 0 {
                0
            } else {
                segments + 1
            }
        }
        CurveBasis::BSpline | CurveBasis::CatmullRom => {
            if topology.wrap.is_periodic() {
                count
            } else {
                count.saturating_sub(2)
            }
        }
    }
}

/// Spread varying values onto control points, curve by curve
fn expand_varying(data: &[f32], components: usize, topology: &CurvesTopology) -> Vec<f32> {
    let mut out = Vec::with_capacity(topology.num_points() * components);
    let mut src = 0usize;
    let value = |index: usize| &data[index * components..(index + 1) * components];

    for &count in &topology.curve_vertex_counts {
        let count = count.max(0) as usize;
        let varying = varying_count_of_curve(count, topology);
        if varying == 0 {
            out.extend(core::iter::repeat(0.0).take(count * components));
            continue;
        }

        match (topology.basis, topology.wrap.is_periodic()) {
            (CurveBasis::Bezier, false) => {
                out.extend_from_slice(value(src));
                for segment in 0..varying - 1 {
                    let begin = value(src + segment);
                    let end = value(src + segment + 1);
                    out.extend_from_slice(begin);
                    out.extend_from_slice(end);
                    out.extend_from_slice(end);
                }
                // Control points past the last full segment repeat the end value
                let written = 1 + 3 * (varying - 1);
                for _ in written..count {
                    out.extend_from_slice(value(src + varying - 1));
                }
            }
            (CurveBasis::Bezier, true) => {
                for segment in 0..varying {
                    let begin = value(src + segment);
                    let end = value(src + (segment + 1) % varying);
                    out.extend_from_slice(begin);
                    out.extend_from_slice(begin);
                    out.extend_from_slice(end);
                }
                for _ in 3 * varying..count {
                    out.extend_from_slice(value(src));
                }
            }
            (_, false) => {
                // bspline / catmull-rom: duplicate the first and last sample
                out.extend_from_slice(value(src));
                for k in 0..varying {
                    out.extend_from_slice(value(src + k));
                }
                out.extend_from_slice(value(src + varying - 1));
            }
            (_, true) => {
                for k in 0..varying {
                    out.extend_from_slice(value(src + k));
                }
            }
        }
        src += varying;
    }
    out
}

/// Repeat `fallback` (padded or cut to `components`) `count` times
fn fallback_fill(fallback: &[f32], components: usize, count: usize) -> Vec<f32> {
    let mut element = vec![0.0; components];
    for (slot, &value) in element.iter_mut().zip(fallback) {
        *slot = value;
    }
    let mut out = Vec::with_capacity(components * count);
    for _ in 0..count {
        out.extend_from_slice(&element);
    }
    out
}

/// Expand a primvar to exactly `needed` elements
///
/// Length 1 broadcasts, length `needed` is returned unchanged, and the
/// curve set's varying count expands per basis. Any other length is an
/// authoring error: the result is `needed` copies of `fallback` and a
/// warning is logged.
pub fn interpolate_to_needed_length(
    value: &PrimvarValue,
    needed: usize,
    curves: Option<&CurvesTopology>,
    fallback: &[f32],
    label: &str,
) -> (PrimvarValue, Expansion) {
    let len = value.len();
    let components = value.components();

    if len == needed {
        return (value.clone(), Expansion::Unchanged);
    }

    let data = value.to_f32_vec();
    if len == 1 {
        let broadcast = fallback_fill(&data, components, needed);
        return (value.from_f32_like(&broadcast), Expansion::Broadcast);
    }

    if let Some(topology) = curves {
        if topology.is_cubic() && len > 0 && len == varying_count(topology) {
            let expanded = expand_varying(&data, components, topology);
            if expanded.len() == needed * components {
                return (value.from_f32_like(&expanded), Expansion::Varying);
            }
            log::error!(
                "{}: varying expansion produced {} elements, expected {}",
                label,
                expanded.len() / components.max(1),
                needed
            );
        }
    }

    log::warn!(
        "{}: {} has {} elements, cannot interpolate to {}; using fallback value",
        label,
        value.type_name(),
        len,
        needed
    );
    let filled = fallback_fill(fallback, components, needed);
    (value.from_f32_like(&filled), Expansion::Fallback)
}

/// Outcome of a fill, for diagnostics and stats
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Source had more elements than expected
    pub truncated: bool,
    /// Source had fewer elements than expected
    pub zero_filled: bool,
    /// Rendering vertices whose source element was out of range
    pub skipped: usize,
    /// Face-varying data was copied in one block
    pub fast_path: bool,
    /// Interpolation cannot be filled on a mesh
    pub unsupported: bool,
}

impl FillReport {
    /// Number of warnings this fill produced
    pub fn warnings(&self) -> u64 {
        self.truncated as u64
            + self.zero_filled as u64
            + (self.skipped > 0) as u64
            + self.unsupported as u64
    }
}

/// Destination of a fill: a rendering-ordered `f32` array
pub struct FillTarget<'a> {
    pub data: &'a mut [f32],
    /// Components per destination element
    pub stride: usize,
    /// First destination component written
    pub channel_offset: usize,
}

/// Scatter a mesh primvar into rendering-vertex order
///
/// `target.data` must hold `num_rendering_vertices * stride` floats; it is
/// expected to be zeroed. Only `min(src_components, stride - offset)`
/// components per element are written.
pub fn fill_primvar(
    src: &[f32],
    src_components: usize,
    interpolation: Interpolation,
    topology: &RenderingTopology,
    target: FillTarget<'_>,
    label: &str,
) -> FillReport {
    let mut report = FillReport::default();
    let FillTarget {
        data: dst,
        stride,
        channel_offset,
    } = target;

    if src_components == 0 || stride == 0 || channel_offset >= stride {
        log::error!("{}: invalid fill layout", label);
        report.unsupported = true;
        return report;
    }

    let copy = src_components.min(stride - channel_offset);
    let src_len = src.len() / src_components;
    let expected = match interpolation {
        Interpolation::Constant => 1,
        Interpolation::Vertex | Interpolation::Varying => topology.num_scene_points(),
        Interpolation::Uniform => topology.num_faces(),
        Interpolation::FaceVarying => topology.num_corners(),
        Interpolation::Instance => {
            log::warn!("{}: instance-rate primvar cannot be drawn per vertex", label);
            report.unsupported = true;
            return report;
        }
    };

    if src_len > expected {
        log::warn!(
            "{}: {} elements authored, {} expected; extra values ignored",
            label,
            src_len,
            expected
        );
        report.truncated = true;
    } else if src_len < expected {
        log::warn!(
            "{}: {} elements authored, {} expected; missing values zero-filled",
            label,
            src_len,
            expected
        );
        report.zero_filled = true;
    }
    let usable = src_len.min(expected);

    let mut write = |dst_vertex: usize, src_element: usize| {
        let from = src_element * src_components;
        let to = dst_vertex * stride + channel_offset;
        dst[to..to + copy].copy_from_slice(&src[from..from + copy]);
    };

    match interpolation {
        Interpolation::Constant => {
            if usable == 1 {
                for vertex in 0..topology.num_rendering_vertices() {
                    write(vertex, 0);
                }
            }
        }
        Interpolation::Vertex | Interpolation::Varying => {
            for (vertex, &scene) in topology.rendering_to_scene.iter().enumerate() {
                if (scene as usize) < usable {
                    write(vertex, scene as usize);
                } else {
                    report.skipped += 1;
                }
            }
            if report.skipped > 0 {
                log::warn!(
                    "{}: {} rendering vertices reference missing source values",
                    label,
                    report.skipped
                );
            }
        }
        Interpolation::Uniform => {
            let offsets = topology.face_offsets();
            for (face, &count) in topology.face_vertex_counts.iter().enumerate().take(usable) {
                let start = offsets[face];
                for corner in start..start + count as usize {
                    write(topology.face_vertex_indices[corner] as usize, face);
                }
            }
        }
        Interpolation::FaceVarying => {
            let fast = topology.unshared
                && src_components == stride
                && channel_offset == 0
                && usable == topology.num_corners();
            if fast {
                let count = usable * stride;
                dst[..count].copy_from_slice(&src[..count]);
                report.fast_path = true;
            } else {
                for corner in 0..usable {
                    write(topology.face_vertex_indices[corner] as usize, corner);
                }
            }
        }
        Interpolation::Instance => {}
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh::build_rendering_topology;
    use void_scene::{CurveType, CurveWrap, MeshTopology};

    fn bspline(counts: Vec<i32>) -> CurvesTopology {
        CurvesTopology::new(counts, CurveType::Cubic, CurveBasis::BSpline, CurveWrap::Nonperiodic)
    }

    #[test]
    fn test_constant_broadcast_to_500() {
        let value = PrimvarValue::Float3(vec![[0.25, 0.5, 0.75]]);
        let (expanded, how) = interpolate_to_needed_length(&value, 500, None, &[0.0; 3], "test");
        assert_eq!(how, Expansion::Broadcast);
        assert_eq!(expanded, PrimvarValue::Float3(vec![[0.25, 0.5, 0.75]; 500]));
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let topo = bspline(vec![6]);
        let value = PrimvarValue::Float(vec![1.0, 2.0, 3.0, 4.0]);
        let (once, how) = interpolate_to_needed_length(&value, 6, Some(&topo), &[0.0], "test");
        assert_eq!(how, Expansion::Varying);
        let (twice, how) = interpolate_to_needed_length(&once, 6, Some(&topo), &[0.0], "test");
        assert_eq!(how, Expansion::Unchanged);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_bspline_varying_duplicates_ends() {
        let topo = bspline(vec![5]);
        assert_eq!(varying_count(&topo), 3);
        let value = PrimvarValue::Float(vec![1.0, 2.0, 3.0]);
        let (expanded, _) = interpolate_to_needed_length(&value, 5, Some(&topo), &[0.0], "test");
        assert_eq!(expanded, PrimvarValue::Float(vec![1.0, 1.0, 2.0, 3.0, 3.0]));
    }

    #[test]
    fn test_bezier_varying_maps_to_two_slots() {
        let topo = CurvesTopology::new(vec![7], CurveType::Cubic, CurveBasis::Bezier, CurveWrap::Nonperiodic);
        assert_eq!(varying_count(&topo), 3);
        let value = PrimvarValue::Float(vec![1.0, 2.0, 3.0]);
        let (expanded, how) = interpolate_to_needed_length(&value, 7, Some(&topo), &[0.0], "test");
        assert_eq!(how, Expansion::Varying);
        assert_eq!(
            expanded,
            PrimvarValue::Float(vec![1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0])
        );
    }

    #[test]
    fn test_bad_length_uses_fallback() {
        let value = PrimvarValue::Float2(vec![[1.0, 1.0], [2.0, 2.0]]);
        let (expanded, how) = interpolate_to_needed_length(&value, 4, None, &[9.0], "test");
        assert_eq!(how, Expansion::Fallback);
        assert_eq!(expanded, PrimvarValue::Float2(vec![[9.0, 0.0]; 4]));
    }

    fn quad_pair() -> MeshTopology {
        MeshTopology::new(vec![3, 3], vec![0, 1, 2, 2, 1, 3])
    }

    #[test]
    fn test_fill_vertex_gathers_through_remap() {
        let rt = build_rendering_topology(&MeshTopology::new(vec![3], vec![2, 0, 1]), 3, false, "test");
        let mut out = vec![0.0; 3];
        let report = fill_primvar(
            &[10.0, 11.0, 12.0],
            1,
            Interpolation::Vertex,
            &rt,
            FillTarget { data: &mut out, stride: 1, channel_offset: 0 },
            "test",
        );
        assert_eq!(out, vec![12.0, 10.0, 11.0]);
        assert_eq!(report.warnings(), 0);
    }

    #[test]
    fn test_fill_uniform_per_face() {
        let rt = build_rendering_topology(&quad_pair(), 4, true, "test");
        let mut out = vec![0.0; 6];
        fill_primvar(
            &[1.0, 2.0],
            1,
            Interpolation::Uniform,
            &rt,
            FillTarget { data: &mut out, stride: 1, channel_offset: 0 },
            "test",
        );
        assert_eq!(out, vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_fill_face_varying_fast_path() {
        let rt = build_rendering_topology(&quad_pair(), 4, true, "test");
        let src: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let mut out = vec![0.0; 12];
        let report = fill_primvar(
            &src,
            2,
            Interpolation::FaceVarying,
            &rt,
            FillTarget { data: &mut out, stride: 2, channel_offset: 0 },
            "test",
        );
        assert!(report.fast_path);
        assert_eq!(out, src);
    }

    #[test]
    fn test_fill_channel_offset_uses_slow_path() {
        let rt = build_rendering_topology(&quad_pair(), 4, true, "test");
        let src = vec![1.0; 6];
        let mut out = vec![0.0; 12];
        let report = fill_primvar(
            &src,
            1,
            Interpolation::FaceVarying,
            &rt,
            FillTarget { data: &mut out, stride: 2, channel_offset: 1 },
            "test",
        );
        assert!(!report.fast_path);
        assert_eq!(out, vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_fill_length_mismatch_is_soft() {
        let rt = build_rendering_topology(&quad_pair(), 4, false, "test");
        let mut out = vec![0.0; 4];
        let report = fill_primvar(
            &[1.0, 2.0],
            1,
            Interpolation::Vertex,
            &rt,
            FillTarget { data: &mut out, stride: 1, channel_offset: 0 },
            "test",
        );
        assert!(report.zero_filled);
        assert_eq!(report.skipped, 2);
        assert_eq!(out, vec![1.0, 2.0, 0.0, 0.0]);

        let mut out = vec![0.0; 4];
        let report = fill_primvar(
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            1,
            Interpolation::Vertex,
            &rt,
            FillTarget { data: &mut out, stride: 1, channel_offset: 0 },
            "test",
        );
        assert!(report.truncated);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_fill_constant_broadcasts() {
        let rt = build_rendering_topology(&quad_pair(), 4, false, "test");
        let mut out = vec![0.0; 12];
        fill_primvar(
            &[0.5, 0.5, 0.5],
            3,
            Interpolation::Constant,
            &rt,
            FillTarget { data: &mut out, stride: 3, channel_offset: 0 },
            "test",
        );
        assert!(out.iter().all(|&v| v == 0.5));
    }
}
