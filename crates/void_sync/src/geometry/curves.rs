//! Curve Index Construction
//!
//! Turns basis-curve topology into index buffers:
//! - cubic curves become 4-tuples (one patch per segment)
//! - linear curves, and cubic curves drawn unrefined, become index pairs
//!
//! Indices are global: curve `k` starts at the sum of the vertex counts
//! before it. An authored `curve_indices` array remaps every generated
//! index after clamping it to the array's range.

use void_scene::{CurveBasis, CurveWrap, CurvesTopology};

/// Generated curve indices
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CurveIndices {
    /// Line segments as index pairs
    Lines(Vec<[u32; 2]>),
    /// Cubic patches as index 4-tuples
    Patches(Vec<[u32; 4]>),
    #[default]
    Empty,
}

impl CurveIndices {
    /// Number of segments
    pub fn segment_count(&self) -> usize {
        match self {
            CurveIndices::Lines(lines) => lines.len(),
            CurveIndices::Patches(patches) => patches.len(),
            CurveIndices::Empty => 0,
        }
    }

    /// Flattened index data
    pub fn flatten(&self) -> Vec<u32> {
        match self {
            CurveIndices::Lines(lines) => lines.iter().flatten().copied().collect(),
            CurveIndices::Patches(patches) => patches.iter().flatten().copied().collect(),
            CurveIndices::Empty => Vec::new(),
        }
    }
}

/// Vertex counts with negative entries treated as empty curves
fn sanitized_counts<'a>(topology: &'a CurvesTopology, label: &str) -> impl Iterator<Item = usize> + 'a {
    if topology.curve_vertex_counts.iter().any(|&c| c < 0) {
        log::warn!("{}: negative curve vertex count treated as empty curve", label);
    }
    topology
        .curve_vertex_counts
        .iter()
        .map(|&count| count.max(0) as usize)
}

/// Cubic segments produced by one curve of `vertex_count` points
///
/// `(N - 4) / step + 1` when open, `N / step` when periodic.
pub fn cubic_segment_count(vertex_count: usize, basis: CurveBasis, wrap: CurveWrap) -> usize {
    let step = basis.step();
    if wrap.is_periodic() {
        vertex_count / step
    } else if vertex_count < 4 {
        0
    } else {
        (vertex_count - 4) / step + 1
    }
}

/// Cubic patch indices for every curve
pub fn build_cubic_indices(topology: &CurvesTopology, label: &str) -> Vec<[u32; 4]> {
    let basis = topology.basis;
    let wrap = topology.wrap;
    let step = basis.step();
    let mut out = Vec::new();
    let mut base = 0usize;

    for count in sanitized_counts(topology, label) {
        let segments = cubic_segment_count(count, basis, wrap);
        if segments == 0 && count > 0 {
            log::warn!(
                "{}: cubic curve with {} vertices has no segments",
                label,
                count
            );
        }

        for segment in 0..segments {
            let mut patch = [0u32; 4];
            for (v, slot) in patch.iter_mut().enumerate() {
                let local = if wrap.is_periodic() {
                    (segment * step + v) % count
                } else {
                    match basis {
                        CurveBasis::Bezier => (segment * step + v).min(count - 1),
                        // Open bspline/catmull-rom lead with a phantom tuple
                        // that repeats the first control point.
                        CurveBasis::BSpline | CurveBasis::CatmullRom => {
                            (segment + v).saturating_sub(1).min(count - 1)
                        }
                    }
                };
                *slot = (base + local) as u32;
            }
            out.push(patch);
        }
        base += count;
    }
    out
}

/// Line-segment indices for every curve
///
/// Segmented wrap emits disjoint pairs advancing by two. Otherwise each
/// curve is a polyline; periodic curves close the loop, and catmull-rom
/// cubics drop their first and last segment.
pub fn build_linear_indices(topology: &CurvesTopology, label: &str) -> Vec<[u32; 2]> {
    let drop_ends = topology.is_cubic() && topology.basis == CurveBasis::CatmullRom;
    let mut out = Vec::new();
    let mut base = 0usize;

    for count in sanitized_counts(topology, label) {
        match topology.wrap {
            CurveWrap::Segmented => {
                if count % 2 != 0 {
                    log::warn!(
                        "{}: segmented curve with odd vertex count {}, last vertex ignored",
                        label,
                        count
                    );
                }
                for k in (0..count.saturating_sub(1)).step_by(2) {
                    out.push([(base + k) as u32, (base + k + 1) as u32]);
                }
            }
            wrap => {
                let segments = count.saturating_sub(1);
                let (first, last) = if drop_ends && segments >= 2 {
                    (1, segments - 1)
                } else {
                    (0, segments)
                };
                for k in first..last {
                    out.push([(base + k) as u32, (base + k + 1) as u32]);
                }
                if wrap.is_periodic() && count > 2 {
                    out.push([(base + count - 1) as u32, base as u32]);
                }
            }
        }
        base += count;
    }
    out
}

/// Substitute generated indices through an authored remap
///
/// Each index is clamped to the remap's range first; negative remap
/// entries become zero. Returns how many indices needed clamping.
pub fn remap_indices(indices: &mut [u32], remap: &[i32], label: &str) -> usize {
    if remap.is_empty() {
        return 0;
    }
    let last = remap.len() - 1;
    let mut clamped = 0;
    for index in indices.iter_mut() {
        let position = (*index as usize).min(last);
        if position != *index as usize {
            clamped += 1;
        }
        let value = remap[position];
        *index = if value < 0 { 0 } else { value as u32 };
    }
    if clamped > 0 {
        log::error!(
            "{}: {} curve indices exceeded the {}-entry index array and were clamped",
            label,
            clamped,
            remap.len()
        );
    }
    clamped
}

/// Build the index buffer for a curve prim
///
/// Cubic curves drawn refined produce patches; everything else draws as
/// lines through the control points.
pub fn build_curve_indices(topology: &CurvesTopology, refined: bool, label: &str) -> CurveIndices {
    let mut indices = if topology.is_cubic() && refined {
        CurveIndices::Patches(build_cubic_indices(topology, label))
    } else {
        CurveIndices::Lines(build_linear_indices(topology, label))
    };

    if topology.has_indices() {
        match &mut indices {
            CurveIndices::Lines(lines) => {
                remap_indices(bytemuck::cast_slice_mut(lines.as_mut_slice()), &topology.curve_indices, label);
            }
            CurveIndices::Patches(patches) => {
                remap_indices(bytemuck::cast_slice_mut(patches.as_mut_slice()), &topology.curve_indices, label);
            }
            CurveIndices::Empty => {}
        }
    }

    if indices.segment_count() == 0 {
        CurveIndices::Empty
    } else {
        indices
    }
}

/// Broadcast one value per curve onto that curve's control points
pub fn broadcast_per_curve(values: &[f32], components: usize, topology: &CurvesTopology) -> Vec<f32> {
    let mut out = Vec::with_capacity(topology.num_points() * components);
    for (curve, &count) in topology.curve_vertex_counts.iter().enumerate() {
        let start = curve * components;
        let value = values.get(start..start + components);
        for _ in 0..count.max(0) {
            match value {
                Some(value) => out.extend_from_slice(value),
                None => out.extend(core::iter::repeat(0.0).take(components)),
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_scene::CurveType;

    fn cubic(counts: Vec<i32>, basis: CurveBasis, wrap: CurveWrap) -> CurvesTopology {
        CurvesTopology::new(counts, CurveType::Cubic, basis, wrap)
    }

    #[test]
    fn test_bspline_open_scenario() {
        let topo = cubic(vec![7], CurveBasis::BSpline, CurveWrap::Nonperiodic);
        let patches = build_cubic_indices(&topo, "test");
        assert_eq!(
            patches,
            vec![[0, 0, 1, 2], [0, 1, 2, 3], [1, 2, 3, 4], [2, 3, 4, 5]]
        );
    }

    #[test]
    fn test_open_segment_counts_and_bounds() {
        for basis in [CurveBasis::Bezier, CurveBasis::BSpline, CurveBasis::CatmullRom] {
            for n in 4..20usize {
                let topo = cubic(vec![n as i32], basis, CurveWrap::Nonperiodic);
                let patches = build_cubic_indices(&topo, "test");
                assert_eq!(patches.len(), (n - 4) / basis.step() + 1, "{:?} n={}", basis, n);
                assert!(patches.iter().flatten().all(|&i| (i as usize) < n));
            }
        }
    }

    #[test]
    fn test_periodic_segment_counts_wrap() {
        for basis in [CurveBasis::Bezier, CurveBasis::BSpline, CurveBasis::CatmullRom] {
            for n in 4..20usize {
                let topo = cubic(vec![n as i32], basis, CurveWrap::Periodic);
                let patches = build_cubic_indices(&topo, "test");
                assert_eq!(patches.len(), n / basis.step());
                assert!(patches.iter().flatten().all(|&i| (i as usize) < n));
            }
        }
        let topo = cubic(vec![4], CurveBasis::BSpline, CurveWrap::Periodic);
        assert_eq!(build_cubic_indices(&topo, "test")[3], [3, 0, 1, 2]);
    }

    #[test]
    fn test_bezier_open_steps_by_three() {
        let topo = cubic(vec![7], CurveBasis::Bezier, CurveWrap::Nonperiodic);
        assert_eq!(build_cubic_indices(&topo, "test"), vec![[0, 1, 2, 3], [3, 4, 5, 6]]);
    }

    #[test]
    fn test_multiple_curves_offset() {
        let topo = cubic(vec![4, 4], CurveBasis::Bezier, CurveWrap::Nonperiodic);
        assert_eq!(build_cubic_indices(&topo, "test"), vec![[0, 1, 2, 3], [4, 5, 6, 7]]);
    }

    #[test]
    fn test_short_and_negative_curves_are_skipped() {
        let topo = cubic(vec![3, -2, 4], CurveBasis::Bezier, CurveWrap::Nonperiodic);
        assert_eq!(build_cubic_indices(&topo, "test"), vec![[3, 4, 5, 6]]);
    }

    #[test]
    fn test_linear_polyline_and_periodic() {
        let open = CurvesTopology::new(vec![3], CurveType::Linear, CurveBasis::Bezier, CurveWrap::Nonperiodic);
        assert_eq!(build_linear_indices(&open, "test"), vec![[0, 1], [1, 2]]);

        let closed = CurvesTopology::new(vec![3], CurveType::Linear, CurveBasis::Bezier, CurveWrap::Periodic);
        assert_eq!(build_linear_indices(&closed, "test"), vec![[0, 1], [1, 2], [2, 0]]);
    }

    #[test]
    fn test_linear_segmented_pairs() {
        let topo = CurvesTopology::new(vec![4, 2], CurveType::Linear, CurveBasis::Bezier, CurveWrap::Segmented);
        assert_eq!(build_linear_indices(&topo, "test"), vec![[0, 1], [2, 3], [4, 5]]);
    }

    #[test]
    fn test_catmull_rom_polyline_drops_end_segments() {
        let topo = cubic(vec![5], CurveBasis::CatmullRom, CurveWrap::Nonperiodic);
        assert_eq!(build_linear_indices(&topo, "test"), vec![[1, 2], [2, 3]]);
    }

    #[test]
    fn test_remap_clamps_then_substitutes() {
        let mut indices = vec![0, 1, 2, 9];
        let clamped = remap_indices(&mut indices, &[10, 11, 12], "test");
        assert_eq!(indices, vec![10, 11, 12, 12]);
        assert_eq!(clamped, 1);
    }

    #[test]
    fn test_build_curve_indices_selects_primitive() {
        let topo = cubic(vec![4], CurveBasis::Bezier, CurveWrap::Nonperiodic).with_indices(vec![3, 2, 1, 0]);
        assert_eq!(
            build_curve_indices(&topo, true, "test"),
            CurveIndices::Patches(vec![[3, 2, 1, 0]])
        );
        assert_eq!(
            build_curve_indices(&topo, false, "test"),
            CurveIndices::Lines(vec![[3, 2], [2, 1], [1, 0]])
        );
        let empty = cubic(vec![], CurveBasis::Bezier, CurveWrap::Nonperiodic);
        assert_eq!(build_curve_indices(&empty, true, "test"), CurveIndices::Empty);
    }

    #[test]
    fn test_broadcast_per_curve() {
        let topo = CurvesTopology::new(vec![2, 3], CurveType::Linear, CurveBasis::Bezier, CurveWrap::Nonperiodic);
        assert_eq!(
            broadcast_per_curve(&[1.0, 2.0], 1, &topo),
            vec![1.0, 1.0, 2.0, 2.0, 2.0]
        );
    }
}
