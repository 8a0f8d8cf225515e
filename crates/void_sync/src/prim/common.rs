//! Sync skeleton shared by every prim kind
//!
//! A Sync call runs these steps in order; kinds fill in the geometry:
//!
//! 1. merge persisted bits, create the draw item of a new repr, propagate
//! 2. refresh render tag and visibility; a hidden prim disables its items,
//!    cleans only the visibility bits and stops here
//! 3. refresh material, display style, transform and extent
//! 4. pull dirty primvars, evict the ones no longer needed
//! 5. recompute instance placement
//! 6. (kind) derive GPU arrays and enqueue commits
//! 7. clean the scene bits and record stats

use std::collections::BTreeSet;
use void_core::PrimPath;
use void_gpu::PrimitiveType;
use void_math::{Aabb, Mat4};
use void_scene::{
    tokens, CurvesTopology, DirtyBits, Interpolation, MaterialDesc, PrimvarValue, Value,
};

use super::SyncContext;
use crate::commit::{CommitQueue, CommitState, VertexStream};
use crate::config::SyncConfig;
use crate::dirty::{propagate, PLACEMENT_BITS, PRIMVAR_BITS, TOPOLOGY_BITS, VISIBILITY_BITS};
use crate::draw_item::{DrawItem, RenderItemData, ReprStyle};
use crate::geometry::{broadcast_per_curve, interpolate_to_needed_length, Expansion};
use crate::global_cache::ShaderKey;
use crate::shared_state::{PrimvarSource, SharedPrimState, SyncPhase};

/// Where and how often a prim is drawn
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub matrix: Mat4,
    /// Empty when not GPU-instanced
    pub instances: Vec<Mat4>,
    /// `false` when an instancer draws no instance of the prim
    pub drawn: bool,
}

impl Placement {
    /// Copy matrix and instances into `commit`
    pub fn apply_to(&self, commit: &mut CommitState) {
        commit.matrix = Some(self.matrix);
        commit.instance_transforms = Some(self.instances.clone());
    }
}

/// Dirty bit of a cached primvar
fn primvar_bit(name: &str) -> DirtyBits {
    match name {
        tokens::POINTS => DirtyBits::POINTS,
        tokens::NORMALS => DirtyBits::NORMALS,
        tokens::WIDTHS => DirtyBits::WIDTHS,
        _ => DirtyBits::PRIMVAR,
    }
}

/// Shader for a material, or the solid-colour fallback without one
pub fn shader_key(material: Option<&MaterialDesc>, color: [f32; 4]) -> ShaderKey {
    match material {
        Some(material) => ShaderKey::new(material.shader.clone(), color)
            .with_inputs(material.required_primvars.clone())
            .with_textures(material.textures.clone()),
        None => ShaderKey::solid(color),
    }
}

/// Expand a cached primvar to one value per vertex
///
/// `fallback` holds one element and fixes the component count. Uniform
/// values on curves are spread over each curve's vertices; everything else
/// goes through [`interpolate_to_needed_length`].
pub fn expand_per_vertex(
    source: &PrimvarSource,
    needed: usize,
    curves: Option<&CurvesTopology>,
    fallback: &[f32],
    label: &str,
    warnings: &mut u64,
) -> Vec<f32> {
    let components = fallback.len();
    let fallback_fill = || fallback.repeat(needed);

    if source.value.components() != components {
        log::warn!(
            "{}: expected {} components, got {}; using fallback value",
            label,
            components,
            source.value.type_name()
        );
        *warnings += 1;
        return fallback_fill();
    }

    if let (Interpolation::Uniform, Some(topology)) = (source.interpolation, curves) {
        if source.value.len() == topology.num_curves() {
            let spread = broadcast_per_curve(&source.value.to_f32_vec(), components, topology);
            if spread.len() == needed * components {
                return spread;
            }
        }
        log::warn!(
            "{}: {} uniform values for {} curves; using fallback value",
            label,
            source.value.len(),
            topology.num_curves()
        );
        *warnings += 1;
        return fallback_fill();
    }

    let (value, expansion) =
        interpolate_to_needed_length(&source.value, needed, curves, fallback, label);
    if expansion == Expansion::Fallback {
        *warnings += 1;
    }
    value.to_f32_vec()
}

/// Per-vertex colour and opacity, `None` when both are constant
pub fn expand_color(
    core: &PrimCore,
    needed: usize,
    curves: Option<&CurvesTopology>,
    config: &SyncConfig,
    warnings: &mut u64,
) -> Option<Vec<f32>> {
    if !core.has_varying_color() {
        return None;
    }
    let [r, g, b, _] = config.fallback_color;
    let label = core.label();
    let rgb = match core.shared.primvar(tokens::DISPLAY_COLOR) {
        Some(source) => expand_per_vertex(source, needed, curves, &[r, g, b], label, warnings),
        None => [r, g, b].repeat(needed),
    };
    let alpha = match core.shared.primvar(tokens::DISPLAY_OPACITY) {
        Some(source) => expand_per_vertex(source, needed, curves, &[1.0], label, warnings),
        None => vec![1.0; needed],
    };
    Some(
        rgb.chunks_exact(3)
            .zip(&alpha)
            .flat_map(|(c, &a)| [c[0], c[1], c[2], a])
            .collect(),
    )
}

/// `0..count` as an index buffer
pub fn sequential_indices(count: usize) -> Vec<u32> {
    (0..count as u32).collect()
}

/// State and steps common to every prim kind
#[derive(Debug)]
pub struct PrimCore {
    pub shared: SharedPrimState,
    label: String,
    draw_items: Vec<DrawItem>,
    highlight: Option<RenderItemData>,
    /// Repr of the last Sync
    active_repr: Option<ReprStyle>,
}

impl PrimCore {
    pub fn new(path: PrimPath) -> Self {
        Self {
            label: path.to_string(),
            shared: SharedPrimState::new(path),
            draw_items: Vec::new(),
            highlight: None,
            active_repr: None,
        }
    }

    pub fn path(&self) -> &PrimPath {
        &self.shared.path
    }

    /// Path text, for log messages
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Name of the render item drawing `repr`
    pub fn item_name(&self, repr: ReprStyle) -> String {
        format!("{}#{}", self.label, repr.as_str())
    }

    pub fn draw_item(&self, repr: ReprStyle) -> Option<&DrawItem> {
        self.draw_items.iter().find(|item| item.repr() == repr)
    }

    pub fn draw_items(&self) -> &[DrawItem] {
        &self.draw_items
    }

    /// Draw item of `repr`, created if missing
    pub fn draw_item_mut(&mut self, repr: ReprStyle) -> &mut DrawItem {
        let index = match self.draw_items.iter().position(|item| item.repr() == repr) {
            Some(index) => index,
            None => {
                self.draw_items.push(DrawItem::new(repr));
                self.draw_items.len() - 1
            }
        };
        &mut self.draw_items[index]
    }

    pub fn active_repr(&self) -> Option<ReprStyle> {
        self.active_repr
    }

    /// Selection highlight item, while selected
    pub fn highlight(&self) -> Option<&RenderItemData> {
        self.highlight.as_ref()
    }

    /// Steps 1 and 2; returns the bits to process, `None` when hidden
    pub fn begin(
        &mut self,
        ctx: &SyncContext<'_>,
        dirty: DirtyBits,
        repr: ReprStyle,
    ) -> Option<DirtyBits> {
        let mut bits = dirty | self.shared.take_pending();
        self.active_repr = Some(repr);
        if self.draw_item(repr).is_none() {
            self.draw_items.push(DrawItem::new(repr));
            ctx.counters.draw_item_created();
            log::debug!("{}: new {} draw item", self.label, repr.as_str());
            bits |= DirtyBits::NEW_REPR;
        }
        let bits = propagate(bits);
        self.mark_draw_items(bits);

        if bits.intersects(VISIBILITY_BITS) {
            self.shared.render_tag = ctx.scene.render_tag(&self.shared.path);
            self.shared.visible = ctx.scene.visible(&self.shared.path);
        }
        if ctx.config.draws_tag(self.shared.render_tag) && self.shared.visible {
            return Some(bits);
        }

        for item in &mut self.draw_items {
            item.disable(ctx.queue);
        }
        if let Some(highlight) = &mut self.highlight {
            highlight.disable(ctx.queue);
        }
        ctx.scene.mark_clean(&self.shared.path, bits.intersection(VISIBILITY_BITS));
        self.shared
            .persist(bits.difference(VISIBILITY_BITS).difference(DirtyBits::NEW_REPR));
        self.shared.phase = SyncPhase::Hidden;
        ctx.counters.prim_hidden();
        log::trace!("{}: hidden ({})", self.label, self.shared.render_tag.as_str());
        None
    }

    /// Step 3; returns the number of warnings
    pub fn refresh(&mut self, ctx: &SyncContext<'_>, bits: DirtyBits) -> u64 {
        let path = &self.shared.path;
        let mut warnings = 0;

        if bits.intersects(DirtyBits::MATERIAL_ID) {
            let material_id = ctx.scene.material_id(path);
            let material = material_id.as_ref().and_then(|id| {
                let material = ctx.scene.material(id);
                if material.is_none() {
                    log::warn!("{}: material {} not found, using fallback shader", self.label, id);
                    warnings += 1;
                }
                material
            });
            self.shared.material_id = material_id;
            self.shared.material = material;
        }

        let path = &self.shared.path;
        if bits.intersects(DirtyBits::DISPLAY_STYLE) {
            self.shared.display_style = ctx.scene.display_style(path);
        }
        if bits.intersects(DirtyBits::TRANSFORM) {
            self.shared.world_transform = ctx.scene.transform(path);
        }
        if bits.intersects(DirtyBits::EXTENT) {
            self.shared.extent = ctx.scene.extent(path);
        }
        warnings
    }

    /// Step 4; `base` lists the primvars the kind always reads
    pub fn pull_primvars(&mut self, ctx: &SyncContext<'_>, bits: DirtyBits, base: &[&str]) -> u64 {
        if !bits.intersects(PRIMVAR_BITS) {
            return 0;
        }
        let path = self.shared.path.clone();
        let required = self.shared.required_primvars(base);
        let mut authored: BTreeSet<String> = BTreeSet::new();
        let mut warnings = 0;

        for interpolation in Interpolation::ALL {
            for desc in ctx.scene.primvar_descriptors(&path, interpolation) {
                if !required.contains(&desc.name) || !authored.insert(desc.name.clone()) {
                    continue;
                }
                let stale = bits.intersects(primvar_bit(&desc.name))
                    || self
                        .shared
                        .primvar(&desc.name)
                        .map_or(true, |cached| cached.interpolation != interpolation);
                if !stale {
                    continue;
                }
                match ctx.scene.get(&path, &desc.name).and_then(Value::into_array) {
                    Some(value) => {
                        self.shared
                            .primvars
                            .insert(desc.name, PrimvarSource { value, interpolation });
                    }
                    None => {
                        log::warn!("{}: primvar '{}' has no array value", self.label, desc.name);
                        self.shared.primvars.remove(&desc.name);
                        warnings += 1;
                    }
                }
            }
        }

        let keep: BTreeSet<&str> = authored.iter().map(String::as_str).collect();
        let evicted = self.shared.evict_except(&keep);
        if !evicted.is_empty() {
            log::debug!("{}: evicted primvars {:?}", self.label, evicted);
        }

        let points = match self.shared.primvar(tokens::POINTS).map(|source| &source.value) {
            Some(PrimvarValue::Float3(points)) => points.clone(),
            Some(other) => {
                log::warn!("{}: points must be float3[], got {}", self.label, other.type_name());
                warnings += 1;
                Vec::new()
            }
            None => Vec::new(),
        };
        self.shared.points = points;
        warnings
    }

    /// Step 5; returns the number of warnings
    pub fn update_placement(&mut self, ctx: &SyncContext<'_>, bits: DirtyBits) -> u64 {
        if !bits.intersects(PLACEMENT_BITS) {
            return 0;
        }
        let path = &self.shared.path;
        let (transforms, warnings) = match ctx.scene.instancer_id(path) {
            None => (None, 0),
            Some(id) => match ctx.instancers.get(&id) {
                Some(instancer) => {
                    let (transforms, warnings) =
                        instancer.compute_instance_transforms(ctx.scene, path, ctx.instancers);
                    (Some(transforms), warnings)
                }
                None => {
                    log::warn!("{}: instancer {} is not inserted, drawn uninstanced", self.label, id);
                    (None, 1)
                }
            },
        };
        self.shared.instance_transforms = transforms;
        warnings
    }

    /// Object matrix and instances per the instancing threshold
    pub fn placement(&self, config: &SyncConfig) -> Placement {
        let world = self.shared.world_transform;
        match &self.shared.instance_transforms {
            None => Placement {
                matrix: world,
                instances: Vec::new(),
                drawn: true,
            },
            Some(transforms) if transforms.is_empty() => Placement {
                matrix: world,
                instances: Vec::new(),
                drawn: false,
            },
            Some(transforms) if transforms.len() < config.instancing_threshold => Placement {
                matrix: transforms[0] * world,
                instances: Vec::new(),
                drawn: true,
            },
            Some(transforms) => Placement {
                matrix: world,
                instances: transforms.clone(),
                drawn: true,
            },
        }
    }

    /// Constant display colour and opacity, if authored as constants
    pub fn constant_color(&self) -> Option<[f32; 4]> {
        let constant = |name: &str| {
            self.shared
                .primvar(name)
                .filter(|source| source.interpolation == Interpolation::Constant)
                .map(|source| source.value.to_f32_vec())
        };
        let rgb = constant(tokens::DISPLAY_COLOR)?;
        let alpha = constant(tokens::DISPLAY_OPACITY)
            .and_then(|a| a.first().copied())
            .unwrap_or(1.0);
        match rgb.as_slice() {
            [r, g, b, ..] => Some([*r, *g, *b, alpha]),
            _ => None,
        }
    }

    /// Whether display colour or opacity varies across the prim
    pub fn has_varying_color(&self) -> bool {
        [tokens::DISPLAY_COLOR, tokens::DISPLAY_OPACITY].iter().any(|name| {
            self.shared
                .primvar(name)
                .map_or(false, |source| source.interpolation != Interpolation::Constant)
        })
    }

    /// Shader of the prim's own material
    pub fn material_shader(&self, config: &SyncConfig) -> ShaderKey {
        let color = self.constant_color().unwrap_or(config.fallback_color);
        shader_key(self.shared.material.as_ref(), color)
    }

    /// Hide the draw items of every repr but `repr`
    pub fn disable_other_reprs(&mut self, repr: ReprStyle, queue: &CommitQueue) {
        for item in &mut self.draw_items {
            if item.repr() != repr {
                item.disable(queue);
            }
        }
    }

    /// Draw the prim as its bounds, using the shared unit cube
    pub fn sync_bounding_box(&mut self, ctx: &SyncContext<'_>, placement: &Placement) {
        let bounds = self.shared.bounds();
        let shader = ShaderKey::solid(self.constant_color().unwrap_or(ctx.config.fallback_color));
        let mut commit = CommitState {
            use_shared_box: true,
            shader: Some(shader),
            enabled: Some(placement.drawn && !bounds.is_empty()),
            bounds: Some(Aabb::UNIT),
            ..Default::default()
        };
        placement.apply_to(&mut commit);
        commit.matrix = Some(placement.matrix * bounds.unit_cube_transform());
        self.commit_single(ctx, ReprStyle::BoundingBox, PrimitiveType::Lines, commit);
    }

    /// Draw `repr` with a single render item
    pub fn commit_single(
        &mut self,
        ctx: &SyncContext<'_>,
        repr: ReprStyle,
        primitive: PrimitiveType,
        commit: CommitState,
    ) {
        let name = self.item_name(repr);
        let draw_item = self.draw_item_mut(repr);
        draw_item.reconcile(vec![(name, primitive, None)], ctx.queue);
        for item in draw_item.items_mut() {
            item.enqueue(commit.clone(), ctx.queue);
        }
        draw_item.take_dirty();
    }

    /// Keep the selection highlight in step with the selection status
    ///
    /// `geometry` builds the highlight's indices and streams; it is only
    /// called when the highlight is new or its geometry changed.
    pub fn sync_highlight<F>(
        &mut self,
        ctx: &SyncContext<'_>,
        bits: DirtyBits,
        primitive: PrimitiveType,
        placement: &Placement,
        geometry: F,
    ) where
        F: FnOnce(&SharedPrimState) -> (Vec<u32>, Vec<VertexStream>),
    {
        let Some(color) = ctx.config.highlight_colors().for_status(self.shared.selection) else {
            if let Some(highlight) = self.highlight.take() {
                highlight.release(ctx.queue);
            }
            return;
        };

        let created = self.highlight.is_none();
        let geometry_dirty = created
            || bits.intersects(TOPOLOGY_BITS | DirtyBits::POINTS | DirtyBits::DISPLAY_STYLE);

        let mut commit = CommitState {
            shader: Some(ShaderKey::solid(color)),
            enabled: Some(placement.drawn),
            ..Default::default()
        };
        placement.apply_to(&mut commit);
        if geometry_dirty {
            let (indices, streams) = geometry(&self.shared);
            commit.index_data = Some(indices);
            commit.vertex_streams = streams;
            commit.bounds = Some(self.shared.bounds());
        }

        let name = format!("{}#selection", self.label);
        self.highlight
            .get_or_insert_with(|| RenderItemData::new(name, primitive))
            .enqueue(commit, ctx.queue);
    }

    /// Step 7
    pub fn finish(&mut self, ctx: &SyncContext<'_>, bits: DirtyBits, warnings: u64) {
        ctx.scene
            .mark_clean(&self.shared.path, bits.scene_bits().union(DirtyBits::NEW_REPR));
        self.shared.phase = SyncPhase::Clean;
        ctx.counters.prim_synced();
        ctx.counters.add_warnings(warnings);
        log::trace!("{}: synced with {} warnings", self.label, warnings);
    }

    /// Add `bits` to every draw item
    pub fn mark_draw_items(&mut self, bits: DirtyBits) {
        for item in &mut self.draw_items {
            item.mark_dirty(bits);
        }
    }

    /// Queue destruction of every item
    pub fn release(&mut self, queue: &CommitQueue) {
        for draw_item in self.draw_items.drain(..) {
            draw_item.release(queue);
        }
        if let Some(highlight) = self.highlight.take() {
            highlight.release(queue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prim::test_support::Fixture;
    use void_scene::{PrimvarDescriptor, RenderTag, SceneDelegate};

    fn path(text: &str) -> PrimPath {
        PrimPath::parse(text).unwrap()
    }

    #[test]
    fn test_begin_creates_draw_item_once() {
        let fixture = Fixture::new();
        let prim = path("/a");
        fixture.scene.add_prim(prim.clone());
        fixture.scene.set_visible(&prim, true);
        let mut core = PrimCore::new(prim);

        let bits = core.begin(&fixture.ctx(), DirtyBits::CLEAN, ReprStyle::Points).unwrap();
        assert!(bits.contains(DirtyBits::NEW_REPR));
        assert!(core.begin(&fixture.ctx(), DirtyBits::CLEAN, ReprStyle::Points).is_some());
        assert_eq!(core.draw_items().len(), 1);
        assert_eq!(fixture.counters.snapshot().draw_items_created, 1);
    }

    #[test]
    fn test_begin_hidden_persists_other_bits() {
        let fixture = Fixture::new();
        let prim = path("/a");
        fixture.scene.add_prim(prim.clone());
        fixture.scene.set_render_tag(&prim, RenderTag::Guide);
        let mut core = PrimCore::new(prim.clone());

        let dirty = fixture.scene.dirty_bits(&prim);
        assert!(core.begin(&fixture.ctx(), dirty, ReprStyle::Points).is_none());
        assert_eq!(core.shared.phase, SyncPhase::Hidden);
        assert!(core.shared.pending().contains(DirtyBits::POINTS));
        assert!(!core.shared.pending().intersects(VISIBILITY_BITS));

        let remaining = fixture.scene.dirty_bits(&prim);
        assert!(!remaining.intersects(VISIBILITY_BITS));
        assert!(remaining.contains(DirtyBits::TOPOLOGY));
    }

    #[test]
    fn test_pull_primvars_evicts_unneeded() {
        let fixture = Fixture::new();
        let prim = path("/a");
        fixture.scene.add_prim(prim.clone());
        fixture.scene.set_primvar(
            &prim,
            PrimvarDescriptor::new("points", Interpolation::Vertex),
            PrimvarValue::Float3(vec![[0.0; 3]; 3]),
        );
        fixture.scene.set_primvar(
            &prim,
            PrimvarDescriptor::new("st", Interpolation::FaceVarying),
            PrimvarValue::Float2(vec![[0.0; 2]; 3]),
        );
        let mut core = PrimCore::new(prim);
        core.shared.material = Some(MaterialDesc::new("lambert").with_primvar("st"));

        let warnings = core.pull_primvars(&fixture.ctx(), DirtyBits::ALL_SCENE, &["points"]);
        assert_eq!(warnings, 0);
        assert!(core.shared.primvar("st").is_some());
        assert_eq!(core.shared.points.len(), 3);

        core.shared.material = None;
        core.pull_primvars(&fixture.ctx(), DirtyBits::MATERIAL_ID, &["points"]);
        assert!(core.shared.primvar("st").is_none());
        assert!(core.shared.primvar("points").is_some());
    }

    #[test]
    fn test_placement_threshold() {
        let mut core = PrimCore::new(path("/a"));
        let world = Mat4::from_translation(void_math::Vec3::new(0.0, 0.0, 5.0));
        let instance = Mat4::from_translation(void_math::Vec3::new(1.0, 0.0, 0.0));
        core.shared.world_transform = world;
        let config = SyncConfig::default();

        assert_eq!(core.placement(&config).matrix, world);

        core.shared.instance_transforms = Some(vec![instance]);
        let placement = core.placement(&config);
        assert_eq!(placement.matrix, instance * world);
        assert!(placement.instances.is_empty());

        core.shared.instance_transforms = Some(vec![instance; 3]);
        let placement = core.placement(&config);
        assert_eq!(placement.matrix, world);
        assert_eq!(placement.instances.len(), 3);

        core.shared.instance_transforms = Some(Vec::new());
        assert!(!core.placement(&config).drawn);
    }

    #[test]
    fn test_expand_per_vertex_broadcasts_constant() {
        let source = PrimvarSource {
            value: PrimvarValue::Float(vec![0.5]),
            interpolation: Interpolation::Constant,
        };
        let mut warnings = 0;
        let widths = expand_per_vertex(&source, 500, None, &[1.0], "test", &mut warnings);
        assert_eq!(widths, vec![0.5; 500]);
        assert_eq!(warnings, 0);

        let short = PrimvarSource {
            value: PrimvarValue::Float(vec![0.5, 0.25]),
            interpolation: Interpolation::Vertex,
        };
        let widths = expand_per_vertex(&short, 3, None, &[1.0], "test", &mut warnings);
        assert_eq!(widths, vec![1.0; 3]);
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_constant_color() {
        let mut core = PrimCore::new(path("/a"));
        assert_eq!(core.constant_color(), None);
        core.shared.primvars.insert(
            tokens::DISPLAY_COLOR.into(),
            PrimvarSource {
                value: PrimvarValue::Float3(vec![[1.0, 0.0, 0.0]]),
                interpolation: Interpolation::Constant,
            },
        );
        core.shared.primvars.insert(
            tokens::DISPLAY_OPACITY.into(),
            PrimvarSource {
                value: PrimvarValue::Float(vec![0.5]),
                interpolation: Interpolation::Constant,
            },
        );
        assert_eq!(core.constant_color(), Some([1.0, 0.0, 0.0, 0.5]));
        assert!(!core.has_varying_color());
    }
}
