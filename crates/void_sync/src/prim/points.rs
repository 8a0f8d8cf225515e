//! Point clouds

use void_core::PrimPath;
use void_gpu::{ElementFormat, PrimitiveType};
use void_scene::{tokens, DirtyBits};

use super::common::{expand_color, expand_per_vertex, sequential_indices, Placement, PrimCore};
use super::{PrimKind, Rprim, SyncContext};
use crate::commit::{CommitState, VertexStream};
use crate::dirty::propagate;
use crate::draw_item::ReprStyle;
use crate::shared_state::SyncPhase;

const POINTS_PRIMVARS: &[&str] = &[
    tokens::POINTS,
    tokens::WIDTHS,
    tokens::DISPLAY_COLOR,
    tokens::DISPLAY_OPACITY,
];

const POINTS_REPRS: &[ReprStyle] = &[ReprStyle::Points, ReprStyle::BoundingBox];

/// Renderable point cloud
#[derive(Debug)]
pub struct PointsPrim {
    core: PrimCore,
}

impl PointsPrim {
    pub fn new(path: PrimPath) -> Self {
        Self {
            core: PrimCore::new(path),
        }
    }

    fn positions(&self) -> Vec<f32> {
        bytemuck::cast_slice(self.core.shared.points.as_slice()).to_vec()
    }

    fn widths(&self, needed: usize, default_width: f32, warnings: &mut u64) -> Vec<f32> {
        match self.core.shared.primvar(tokens::WIDTHS) {
            Some(source) => expand_per_vertex(
                source,
                needed,
                None,
                &[default_width],
                self.core.label(),
                warnings,
            ),
            None => vec![default_width; needed],
        }
    }

    fn sync_points(
        &mut self,
        ctx: &SyncContext<'_>,
        placement: &Placement,
        item_bits: DirtyBits,
    ) -> u64 {
        let mut warnings = 0;
        let count = self.core.shared.points.len();
        let mut commit = CommitState {
            shader: Some(self.core.material_shader(ctx.config)),
            enabled: Some(placement.drawn && count > 0),
            ..Default::default()
        };
        placement.apply_to(&mut commit);

        let upload_positions = item_bits.intersects(DirtyBits::POINTS | DirtyBits::NEW_REPR);
        if upload_positions {
            commit.index_data = Some(sequential_indices(count));
            commit.vertex_streams.push(VertexStream::new(
                "positions",
                ElementFormat::Float3,
                self.positions(),
            ));
            commit.bounds = Some(self.core.shared.bounds());
        }
        if upload_positions || item_bits.intersects(DirtyBits::WIDTHS) {
            let widths = self.widths(count, ctx.config.default_width, &mut warnings);
            commit
                .vertex_streams
                .push(VertexStream::new("widths", ElementFormat::Float, widths));
        }
        if upload_positions || item_bits.intersects(DirtyBits::PRIMVAR) {
            if let Some(color) = expand_color(&self.core, count, None, ctx.config, &mut warnings) {
                commit
                    .vertex_streams
                    .push(VertexStream::new("color", ElementFormat::Float4, color));
            }
        }

        self.core
            .commit_single(ctx, ReprStyle::Points, PrimitiveType::Points, commit);
        warnings
    }
}

impl Rprim for PointsPrim {
    fn path(&self) -> &PrimPath {
        self.core.path()
    }

    fn kind(&self) -> PrimKind {
        PrimKind::Points
    }

    fn supported_reprs(&self) -> &'static [ReprStyle] {
        POINTS_REPRS
    }

    fn resolve_repr(&self, repr: ReprStyle) -> ReprStyle {
        match repr {
            ReprStyle::BoundingBox => ReprStyle::BoundingBox,
            _ => ReprStyle::Points,
        }
    }

    fn sync(&mut self, ctx: &SyncContext<'_>, dirty: DirtyBits, repr: ReprStyle) {
        let Some(bits) = self.core.begin(ctx, dirty, repr) else {
            return;
        };
        let mut warnings = self.core.refresh(ctx, bits);

        self.core.shared.phase = SyncPhase::PrimvarStale;
        warnings += self.core.pull_primvars(ctx, bits, POINTS_PRIMVARS);
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
            _ => self.sync_points(ctx, &placement, item_bits),
        };

        let positions = self.positions();
        self.core
            .sync_highlight(ctx, bits, PrimitiveType::Points, &placement, |shared| {
                (
                    sequential_indices(shared.points.len()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prim::test_support::Fixture;
    use crate::selection::SelectionStatus;
    use void_scene::{Interpolation, PrimvarDescriptor, PrimvarValue, SceneDelegate};

    fn cloud(fixture: &Fixture, path: &PrimPath, count: usize) {
        fixture.scene.add_prim(path.clone());
        let points = (0..count).map(|i| [i as f32, 0.0, 0.0]).collect();
        fixture.scene.set_primvar(
            path,
            PrimvarDescriptor::new(tokens::POINTS, Interpolation::Vertex),
            PrimvarValue::Float3(points),
        );
    }

    #[test]
    fn test_constant_width_covers_every_point() {
        let fixture = Fixture::new();
        let path = PrimPath::parse("/cloud").unwrap();
        cloud(&fixture, &path, 500);
        fixture.scene.set_primvar(
            &path,
            PrimvarDescriptor::new(tokens::WIDTHS, Interpolation::Constant),
            PrimvarValue::Float(vec![0.25]),
        );
        let mut points = PointsPrim::new(path.clone());

        fixture.sync(&mut points, ReprStyle::Points);
        let mut warnings = 0;
        assert_eq!(points.widths(500, 1.0, &mut warnings), vec![0.25; 500]);
        assert_eq!(warnings, 0);
        assert_eq!(fixture.counters.snapshot().warnings, 0);

        let item = &points.draw_item(ReprStyle::Points).unwrap().items()[0];
        assert_eq!(item.primitive(), PrimitiveType::Points);
        assert!(item.is_enabled());
        assert!(fixture.scene.dirty_bits(&path).is_clean());
    }

    #[test]
    fn test_missing_widths_use_default() {
        let fixture = Fixture::new();
        let path = PrimPath::parse("/cloud").unwrap();
        cloud(&fixture, &path, 3);
        let mut points = PointsPrim::new(path);
        fixture.sync(&mut points, ReprStyle::Points);

        let mut warnings = 0;
        assert_eq!(
            points.widths(3, fixture.config.default_width, &mut warnings),
            vec![fixture.config.default_width; 3]
        );
    }

    #[test]
    fn test_empty_cloud_is_disabled() {
        let fixture = Fixture::new();
        let path = PrimPath::parse("/empty").unwrap();
        fixture.scene.add_prim(path.clone());
        let mut points = PointsPrim::new(path);

        fixture.sync(&mut points, ReprStyle::Points);
        assert!(!points.draw_item(ReprStyle::Points).unwrap().is_enabled());
    }

    #[test]
    fn test_selection_adds_highlight() {
        let fixture = Fixture::new();
        let path = PrimPath::parse("/cloud").unwrap();
        cloud(&fixture, &path, 4);
        let mut points = PointsPrim::new(path);
        fixture.sync(&mut points, ReprStyle::Points);
        assert!(points.core().highlight().is_none());

        points.shared_mut().selection = SelectionStatus::Selected;
        points.sync(&fixture.ctx(), DirtyBits::CLEAN, ReprStyle::Points);
        let highlight = points.core().highlight().unwrap();
        assert_eq!(highlight.name(), "/cloud#selection");
        assert_eq!(highlight.primitive(), PrimitiveType::Points);

        points.shared_mut().selection = SelectionStatus::Unselected;
        points.sync(&fixture.ctx(), DirtyBits::CLEAN, ReprStyle::Points);
        assert!(points.core().highlight().is_none());
    }
}
