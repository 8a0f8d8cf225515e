//! Polygon meshes
//!
//! Hull reprs draw one render item per geom subset plus one for the faces
//! no subset claims. The rendering topology is rebuilt when the authored
//! topology changes or when the layout has to switch between shared and
//! unshared vertices.

use void_core::PrimPath;
use void_gpu::{ElementFormat, PrimitiveType};
use void_scene::{tokens, DirtyBits, Interpolation, MeshTopology};

use super::common::{sequential_indices, shader_key, Placement, PrimCore};
use super::{PrimKind, Rprim, SyncContext};
use crate::commit::{CommitState, VertexStream};
use crate::config::SyncConfig;
use crate::dirty::{propagate, DIRTY_INDEX_BUFFERS_STALE, DIRTY_NORMALS_STALE, TOPOLOGY_BITS};
use crate::draw_item::ReprStyle;
use crate::geometry::{
    build_rendering_topology, fill_primvar, flat_normals, needs_unshare, smooth_normals,
    triangulate_subsets, wireframe_edges, FillReport, FillTarget, RenderingTopology, SubsetTriangles,
};
use crate::global_cache::ShaderKey;
use crate::shared_state::SyncPhase;

const MESH_PRIMVARS: &[&str] = &[
    tokens::POINTS,
    tokens::NORMALS,
    tokens::DISPLAY_COLOR,
    tokens::DISPLAY_OPACITY,
];

const MESH_REPRS: &[ReprStyle] = &[
    ReprStyle::SmoothHull,
    ReprStyle::FlatHull,
    ReprStyle::Wireframe,
    ReprStyle::Points,
    ReprStyle::BoundingBox,
];

/// Bits that invalidate every buffer of every draw item after a layout change
const LAYOUT_BITS: DirtyBits = DIRTY_INDEX_BUFFERS_STALE
    .union(DirtyBits::POINTS)
    .union(DirtyBits::NORMALS)
    .union(DirtyBits::PRIMVAR);

/// Element format of an `f32` stream with `components` per element
fn stream_format(components: usize) -> Option<ElementFormat> {
    match components {
        1 => Some(ElementFormat::Float),
        2 => Some(ElementFormat::Float2),
        3 => Some(ElementFormat::Float3),
        4 => Some(ElementFormat::Float4),
        _ => None,
    }
}

/// Scene points scattered into rendering-vertex order
fn rendering_positions(
    points: &[[f32; 3]],
    rendering: &RenderingTopology,
    label: &str,
) -> (Vec<f32>, FillReport) {
    let mut data = vec![0.0; rendering.num_rendering_vertices() * 3];
    let report = fill_primvar(
        bytemuck::cast_slice(points),
        3,
        Interpolation::Vertex,
        rendering,
        FillTarget {
            data: &mut data,
            stride: 3,
            channel_offset: 0,
        },
        label,
    );
    (data, report)
}

/// Renderable polygon mesh
#[derive(Debug)]
pub struct MeshPrim {
    core: PrimCore,
    topology: MeshTopology,
    rendering: RenderingTopology,
    /// Scene point count the rendering topology was built for
    num_points: usize,
    subsets: Vec<SubsetTriangles>,
    edges: Vec<u32>,
    smooth_normals: Option<Vec<[f32; 3]>>,
    flat_normals: Option<Vec<[f32; 3]>>,
}

impl MeshPrim {
    pub fn new(path: PrimPath) -> Self {
        Self {
            core: PrimCore::new(path),
            topology: MeshTopology::default(),
            rendering: RenderingTopology::default(),
            num_points: 0,
            subsets: Vec::new(),
            edges: Vec::new(),
            smooth_normals: None,
            flat_normals: None,
        }
    }

    pub fn rendering_topology(&self) -> &RenderingTopology {
        &self.rendering
    }

    /// Triangles per subset; the last entry holds the unclaimed faces
    pub fn subsets(&self) -> &[SubsetTriangles] {
        &self.subsets
    }

    /// Flat shading and per-face or per-corner primvars need one vertex
    /// per face corner
    fn wants_unshared(&self, repr: ReprStyle) -> bool {
        if repr == ReprStyle::FlatHull || self.core.shared.display_style.flat_shading {
            return true;
        }
        let required = self.core.shared.required_primvars(MESH_PRIMVARS);
        needs_unshare(self.core.shared.interpolations(&required))
    }

    /// Rebuild the rendering layout if stale; returns warnings and whether
    /// it was rebuilt
    fn update_rendering_topology(&mut self, bits: DirtyBits, unshare: bool) -> (bool, u64) {
        let num_points = self.core.shared.points.len().max(self.topology.num_points());
        let stale = bits.intersects(TOPOLOGY_BITS)
            || unshare != self.rendering.unshared
            || num_points != self.num_points;
        if !stale {
            return (false, 0);
        }

        let label = self.core.label();
        self.rendering = build_rendering_topology(&self.topology, num_points, unshare, label);
        let (subsets, degenerate) = triangulate_subsets(&self.rendering, &self.topology, label);
        self.subsets = subsets;
        self.edges = wireframe_edges(&self.rendering);
        self.num_points = num_points;
        self.smooth_normals = None;
        self.flat_normals = None;
        log::debug!(
            "{}: rendering topology rebuilt, {} vertices, unshared={}",
            label,
            self.rendering.num_rendering_vertices(),
            unshare
        );
        self.core.mark_draw_items(LAYOUT_BITS);
        (true, degenerate as u64)
    }

    fn normals_data(
        &mut self,
        config: &SyncConfig,
        smooth: bool,
        label: &str,
        warnings: &mut u64,
    ) -> Option<Vec<f32>> {
        if let Some(source) = self.core.shared.primvar(tokens::NORMALS) {
            if source.value.components() == 3 {
                let mut data = vec![0.0; self.rendering.num_rendering_vertices() * 3];
                let report = fill_primvar(
                    &source.value.to_f32_vec(),
                    3,
                    source.interpolation,
                    &self.rendering,
                    FillTarget {
                        data: &mut data,
                        stride: 3,
                        channel_offset: 0,
                    },
                    label,
                );
                *warnings += report.warnings();
                return Some(data);
            }
            log::warn!(
                "{}: normals must be float3[], got {}; computing instead",
                label,
                source.value.type_name()
            );
            *warnings += 1;
        }

        let points = &self.core.shared.points;
        let rendering = &self.rendering;
        let normals = if smooth {
            if !config.enable_smooth_normals {
                return None;
            }
            self.smooth_normals
                .get_or_insert_with(|| smooth_normals(points, rendering))
        } else {
            self.flat_normals
                .get_or_insert_with(|| flat_normals(points, rendering))
        };
        Some(bytemuck::cast_slice(normals.as_slice()).to_vec())
    }

    /// Per-vertex colour and opacity, `None` when both are constant
    ///
    /// Elements with no authored source keep the fallback colour.
    fn color_data(&self, config: &SyncConfig, label: &str, warnings: &mut u64) -> Option<Vec<f32>> {
        if !self.core.has_varying_color() {
            return None;
        }
        let [r, g, b, _] = config.fallback_color;
        let mut data: Vec<f32> = (0..self.rendering.num_rendering_vertices())
            .flat_map(|_| [r, g, b, 1.0])
            .collect();

        for (name, channel_offset) in [(tokens::DISPLAY_COLOR, 0), (tokens::DISPLAY_OPACITY, 3)] {
            let Some(source) = self.core.shared.primvar(name) else {
                continue;
            };
            let report = fill_primvar(
                &source.value.to_f32_vec(),
                source.value.components(),
                source.interpolation,
                &self.rendering,
                FillTarget {
                    data: &mut data,
                    stride: 4,
                    channel_offset,
                },
                label,
            );
            *warnings += report.warnings();
        }
        Some(data)
    }

    /// Streams for primvars the material reads beyond the mesh's own
    fn material_streams(&self, label: &str, warnings: &mut u64) -> Vec<VertexStream> {
        let Some(material) = &self.core.shared.material else {
            return Vec::new();
        };
        let vertices = self.rendering.num_rendering_vertices();

        material
            .required_primvars
            .iter()
            .filter(|name| !MESH_PRIMVARS.contains(&name.as_str()))
            .filter_map(|name| {
                let Some(source) = self.core.shared.primvar(name) else {
                    log::debug!("{}: material reads '{}', which is not authored", label, name);
                    return None;
                };
                let components = source.value.components();
                let Some(format) = stream_format(components) else {
                    log::warn!(
                        "{}: primvar '{}' of type {} cannot be a vertex stream",
                        label,
                        name,
                        source.value.type_name()
                    );
                    *warnings += 1;
                    return None;
                };
                let mut data = vec![0.0; vertices * components];
                let report = fill_primvar(
                    &source.value.to_f32_vec(),
                    components,
                    source.interpolation,
                    &self.rendering,
                    FillTarget {
                        data: &mut data,
                        stride: components,
                        channel_offset: 0,
                    },
                    &format!("{}.{}", label, name),
                );
                *warnings += report.warnings();
                Some(VertexStream::new(name.clone(), format, data))
            })
            .collect()
    }

    fn sync_hull(
        &mut self,
        ctx: &SyncContext<'_>,
        repr: ReprStyle,
        placement: &Placement,
        item_bits: DirtyBits,
    ) -> u64 {
        let label = self.core.label().to_string();
        let mut warnings = 0;
        let smooth = repr == ReprStyle::SmoothHull && !self.core.shared.display_style.flat_shading;

        let upload_indices = item_bits.intersects(TOPOLOGY_BITS | DirtyBits::NEW_REPR);
        let upload_points = item_bits.intersects(DirtyBits::POINTS | DirtyBits::NEW_REPR);
        let upload_normals = upload_points
            || item_bits.intersects(DirtyBits::NORMALS | DirtyBits::DISPLAY_STYLE);
        let upload_primvars = item_bits.intersects(DirtyBits::PRIMVAR | DirtyBits::NEW_REPR);

        let mut streams = Vec::new();
        if upload_points {
            let (positions, report) =
                rendering_positions(&self.core.shared.points, &self.rendering, &label);
            warnings += report.warnings();
            streams.push(VertexStream::new("positions", ElementFormat::Float3, positions));
        }
        if upload_normals {
            if let Some(normals) = self.normals_data(ctx.config, smooth, &label, &mut warnings) {
                streams.push(VertexStream::new("normals", ElementFormat::Float3, normals));
            }
        }
        if upload_primvars {
            if let Some(color) = self.color_data(ctx.config, &label, &mut warnings) {
                streams.push(VertexStream::new("color", ElementFormat::Float4, color));
            }
            streams.extend(self.material_streams(&label, &mut warnings));
        }

        let own_shader = self.core.material_shader(ctx.config);
        let color = self.core.constant_color().unwrap_or(ctx.config.fallback_color);
        let shaders: Vec<ShaderKey> = self
            .subsets
            .iter()
            .map(|subset| match &subset.material_id {
                Some(id) => match ctx.scene.material(id) {
                    Some(material) => shader_key(Some(&material), color),
                    None => {
                        log::warn!("{}: subset material {} not found", label, id);
                        warnings += 1;
                        own_shader.clone()
                    }
                },
                None => own_shader.clone(),
            })
            .collect();

        let base = self.core.item_name(repr);
        let split = !self.topology.subsets.is_empty();
        let wanted = self
            .subsets
            .iter()
            .enumerate()
            .map(|(i, subset)| {
                let name = if split { format!("{}:{}", base, i) } else { base.clone() };
                (name, PrimitiveType::Triangles, subset.material_id.clone())
            })
            .collect();

        let bounds = self.core.shared.bounds();
        let draw_item = self.core.draw_item_mut(repr);
        draw_item.reconcile(wanted, ctx.queue);
        for ((item, subset), shader) in draw_item.items_mut().iter_mut().zip(&self.subsets).zip(shaders) {
            let mut commit = CommitState {
                vertex_streams: streams.clone(),
                shader: Some(shader),
                enabled: Some(placement.drawn && !subset.indices.is_empty()),
                ..Default::default()
            };
            placement.apply_to(&mut commit);
            if upload_indices {
                commit.index_data = Some(subset.indices.clone());
            }
            if upload_points {
                commit.bounds = Some(bounds);
            }
            item.enqueue(commit, ctx.queue);
        }
        draw_item.take_dirty();
        warnings
    }

    fn sync_wireframe(&mut self, ctx: &SyncContext<'_>, placement: &Placement, item_bits: DirtyBits) -> u64 {
        let label = self.core.label().to_string();
        let mut commit = CommitState {
            shader: Some(ShaderKey::solid(
                self.core.constant_color().unwrap_or(ctx.config.fallback_color),
            )),
            enabled: Some(placement.drawn && !self.edges.is_empty()),
            ..Default::default()
        };
        placement.apply_to(&mut commit);

        let mut warnings = 0;
        if item_bits.intersects(TOPOLOGY_BITS | DirtyBits::NEW_REPR) {
            commit.index_data = Some(self.edges.clone());
        }
        if item_bits.intersects(DirtyBits::POINTS | DirtyBits::NEW_REPR) {
            let (positions, report) =
                rendering_positions(&self.core.shared.points, &self.rendering, &label);
            warnings += report.warnings();
            commit.vertex_streams = vec![VertexStream::new("positions", ElementFormat::Float3, positions)];
            commit.bounds = Some(self.core.shared.bounds());
        }

        self.core
            .commit_single(ctx, ReprStyle::Wireframe, PrimitiveType::Lines, commit);
        warnings
    }

    /// Scene points as-is, for snapping
    fn sync_points(&mut self, ctx: &SyncContext<'_>, placement: &Placement, item_bits: DirtyBits) {
        let points = &self.core.shared.points;
        let mut commit = CommitState {
            shader: Some(ShaderKey::solid(
                self.core.constant_color().unwrap_or(ctx.config.fallback_color),
            )),
            enabled: Some(placement.drawn && !points.is_empty()),
            ..Default::default()
        };
        placement.apply_to(&mut commit);
        if item_bits.intersects(DirtyBits::POINTS | DirtyBits::NEW_REPR) {
            commit.index_data = Some(sequential_indices(points.len()));
            commit.vertex_streams = vec![VertexStream::new(
                "positions",
                ElementFormat::Float3,
                bytemuck::cast_slice(points.as_slice()).to_vec(),
            )];
            commit.bounds = Some(self.core.shared.bounds());
        }

        self.core
            .commit_single(ctx, ReprStyle::Points, PrimitiveType::Points, commit);
    }
}

impl Rprim for MeshPrim {
    fn path(&self) -> &PrimPath {
        self.core.path()
    }

    fn kind(&self) -> PrimKind {
        PrimKind::Mesh
    }

    fn supported_reprs(&self) -> &'static [ReprStyle] {
        MESH_REPRS
    }

    fn resolve_repr(&self, repr: ReprStyle) -> ReprStyle {
        match repr {
            ReprStyle::Wire => ReprStyle::Wireframe,
            ReprStyle::Refined => ReprStyle::SmoothHull,
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
            self.topology = ctx.scene.mesh_topology(self.core.path());
        }

        self.core.shared.phase = SyncPhase::PrimvarStale;
        warnings += self.core.pull_primvars(ctx, bits, MESH_PRIMVARS);
        warnings += self.core.update_placement(ctx, bits);
        let unshare = self.wants_unshared(repr);
        let (rebuilt, topology_warnings) = self.update_rendering_topology(bits, unshare);
        warnings += topology_warnings;
        if !rebuilt && bits.intersects(DIRTY_NORMALS_STALE) {
            self.smooth_normals = None;
            self.flat_normals = None;
        }

        self.core.shared.phase = SyncPhase::BufferStale;
        self.core.disable_other_reprs(repr, ctx.queue);
        let placement = self.core.placement(ctx.config);
        let item_bits = propagate(self.core.draw_item_mut(repr).dirty_bits());
        warnings += match repr {
            ReprStyle::BoundingBox => {
                self.core.sync_bounding_box(ctx, &placement);
                0
            }
            ReprStyle::Points => {
                self.sync_points(ctx, &placement, item_bits);
                0
            }
            ReprStyle::Wireframe => self.sync_wireframe(ctx, &placement, item_bits),
            _ => self.sync_hull(ctx, repr, &placement, item_bits),
        };

        let label = self.core.label().to_string();
        let (edges, rendering) = (&self.edges, &self.rendering);
        self.core
            .sync_highlight(ctx, bits, PrimitiveType::Lines, &placement, |shared| {
                let (positions, _) = rendering_positions(&shared.points, rendering, &label);
                (
                    edges.clone(),
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
