//! Basis curves

use void_core::PrimPath;
use void_gpu::{ElementFormat, PrimitiveType};
use void_scene::{tokens, CurvesTopology, DirtyBits, PrimvarValue};

use super::common::{expand_color, expand_per_vertex, sequential_indices, Placement, PrimCore};
use super::{PrimKind, Rprim, SyncContext};
use crate::commit::{CommitState, VertexStream};
use crate::dirty::{propagate, TOPOLOGY_BITS};
use crate::draw_item::ReprStyle;
use crate::geometry::{build_curve_indices, interpolate_to_needed_length, CurveIndices, Expansion};
use crate::shared_state::SyncPhase;

const CURVE_PRIMVARS: &[&str] = &[
    tokens::POINTS,
    tokens::WIDTHS,
    tokens::DISPLAY_COLOR,
    tokens::DISPLAY_OPACITY,
];

const CURVE_REPRS: &[ReprStyle] = &[
    ReprStyle::Wire,
    ReprStyle::Refined,
    ReprStyle::Points,
    ReprStyle::BoundingBox,
];

/// Renderable basis curves
#[derive(Debug)]
pub struct CurvesPrim {
    core: PrimCore,
    topology: CurvesTopology,
    indices: CurveIndices,
    /// Whether `indices` were built as cubic patches
    indices_refined: bool,
}

impl CurvesPrim {
    pub fn new(path: PrimPath) -> Self {
        Self {
            core: PrimCore::new(path),
            topology: CurvesTopology::default(),
            indices: CurveIndices::Empty,
            indices_refined: false,
        }
    }

    pub fn indices(&self) -> &CurveIndices {
        &self.indices
    }

    /// Control points drawn; authored points as-is when an index remap is
    /// present, otherwise expanded to the topology's vertex count
    fn positions(&self, warnings: &mut u64) -> Vec<f32> {
        let points = &self.core.shared.points;
        if self.topology.has_indices() {
            return bytemuck::cast_slice(points.as_slice()).to_vec();
        }
        let (value, expansion) = interpolate_to_needed_length(
            &PrimvarValue::Float3(points.clone()),
            self.topology.num_points(),
            Some(&self.topology),
            &[0.0; 3],
            self.core.label(),
        );
        if expansion == Expansion::Fallback {
            *warnings += 1;
        }
        value.to_f32_vec()
    }

    fn widths(&self, needed: usize, default_width: f32, warnings: &mut u64) -> Vec<f32> {
        match self.core.shared.primvar(tokens::WIDTHS) {
            Some(source) => expand_per_vertex(
                source,
                needed,
                Some(&self.topology),
                &[default_width],
                self.core.label(),
                warnings,
            ),
            None => vec![default_width; needed],
        }
    }

    fn sync_curves(
        &mut self,
        ctx: &SyncContext<'_>,
        repr: ReprStyle,
        placement: &Placement,
        item_bits: DirtyBits,
    ) -> u64 {
        let mut warnings = 0;
        let refined = repr == ReprStyle::Refined;
        if item_bits.intersects(TOPOLOGY_BITS) || refined != self.indices_refined {
            self.indices = build_curve_indices(&self.topology, refined, self.core.label());
            self.indices_refined = refined;
        }
        let primitive = match self.indices {
            CurveIndices::Patches(_) => PrimitiveType::Patches,
            CurveIndices::Lines(_) | CurveIndices::Empty => PrimitiveType::Lines,
        };

        let mut commit = CommitState {
            shader: Some(self.core.material_shader(ctx.config)),
            enabled: Some(placement.drawn && self.indices.segment_count() > 0),
            ..Default::default()
        };
        placement.apply_to(&mut commit);

        if item_bits.intersects(TOPOLOGY_BITS | DirtyBits::NEW_REPR) {
            commit.index_data = Some(self.indices.flatten());
        }
        let upload_positions = item_bits.intersects(DirtyBits::POINTS | DirtyBits::NEW_REPR);
        let positions = self.positions(&mut warnings);
        let vertices = positions.len() / 3;
        if upload_positions {
            commit.vertex_streams.push(VertexStream::new(
                "positions",
                ElementFormat::Float3,
                positions,
            ));
            commit.bounds = Some(self.core.shared.bounds());
        }
        if upload_positions || item_bits.intersects(DirtyBits::WIDTHS) {
            let widths = self.widths(vertices, ctx.config.default_width, &mut warnings);
            commit
                .vertex_streams
                .push(VertexStream::new("widths", ElementFormat::Float, widths));
        }
        if upload_positions || item_bits.intersects(DirtyBits::PRIMVAR) {
            if let Some(color) =
                expand_color(&self.core, vertices, Some(&self.topology), ctx.config, &mut warnings)
            {
                commit
                    .vertex_streams
                    .push(VertexStream::new("color", ElementFormat::Float4, color));
            }
        }

        self.core.commit_single(ctx, repr, primitive, commit);
        warnings
    }

    fn sync_points(&mut self, ctx: &SyncContext<'_>, placement: &Placement, item_bits: DirtyBits) -> u64 {
        let mut warnings = 0;
        let mut commit = CommitState {
            shader: Some(self.core.material_shader(ctx.config)),
            enabled: Some(placement.drawn && !self.core.shared.points.is_empty()),
            ..Default::default()
        };
        placement.apply_to(&mut commit);
        if item_bits.intersects(DirtyBits::POINTS | DirtyBits::NEW_REPR) {
            let positions = self.positions(&mut warnings);
            commit.index_data = Some(sequential_indices(positions.len() / 3));
            commit.vertex_streams = vec![VertexStream::new(
                "positions",
                ElementFormat::Float3,
                positions,
            )];
            commit.bounds = Some(self.core.shared.bounds());
        }
        self.core
            .commit_single(ctx, ReprStyle::Points, PrimitiveType::Points, commit);
        warnings
    }
}

impl Rprim for CurvesPrim {
    fn path(&self) -> &PrimPath {
        self.core.path()
    }

    fn kind(&self) -> PrimKind {
        PrimKind::BasisCurves
    }

    fn supported_reprs(&self) -> &'static [ReprStyle] {
        CURVE_REPRS
    }

    fn resolve_repr(&self, repr: ReprStyle) -> ReprStyle {
        match repr {
            ReprStyle::SmoothHull | ReprStyle::FlatHull => ReprStyle::Refined,
            ReprStyle::Wireframe => ReprStyle::Wire,
            other => other,
        }
    }

    fn sync(&mut self, ctx: &SyncContext<'_>, dirty: DirtyBits, repr: ReprStyle) {
        let Some(bits) = self.core.begin(ctx, dirty, repr) else {
            return;
        };
        let mut warnings = self.core.refresh(ctx, bits);

        self.core.shared.phase = SyncPhase::TopologyStale;
        if bits.intersects(DirtyBits::TOPOLOGY) {
            self.topology = ctx.scene.curves_topology(self.core.path());
        }

        self.core.shared.phase = SyncPhase::PrimvarStale;
        warnings += self.core.pull_primvars(ctx, bits, CURVE_PRIMVARS);
        warnings += self.core.update_placement(ctx, bits);

        self.core.shared.phase = SyncPhase::BufferStale;
        self.core.disable_other_reprs(repr, ctx.queue);
        let placement = self.core.placement(ctx.config);
        let item_bits = propagate(self.core.draw_item_mut(repr).dirty_bits());
        warnings += match repr {
            ReprStyle::BoundingBox => {
                self.core.sync_bounding_box(ctx, &placement);
                0
            }
            ReprStyle::Points => self.sync_points(ctx, &placement, item_bits),
            _ => self.sync_curves(ctx, repr, &placement, item_bits),
        };

        let mut highlight_warnings = 0;
        let lines = build_curve_indices(&self.topology, false, self.core.label()).flatten();
        let positions = self.positions(&mut highlight_warnings);
        self.core
            .sync_highlight(ctx, bits, PrimitiveType::Lines, &placement, |_| {
                (
                    lines,
                    vec![VertexStream::new("positions", ElementFormat::Float3, positions)],
                )
            });

        self.core.finish(ctx, bits, warnings);
    }

    fn core(&self) -> &PrimCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PrimCore {
        &mut self.core
    }
}
