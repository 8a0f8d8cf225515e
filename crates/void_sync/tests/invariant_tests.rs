//! Invariant tests for void_sync
//!
//! Bad authoring data degrades to fallback output with warnings; it never
//! panics a Sync or a commit.

use void_scene::{
    tokens, CurveBasis, CurveType, CurveWrap, CurvesTopology, GeomSubset, Interpolation,
    MeshTopology, PrimvarDescriptor, PrimvarValue,
};
use void_sync::prelude::*;

fn path(text: &str) -> PrimPath {
    PrimPath::parse(text).unwrap()
}

/// INVARIANT: malformed prims sync, commit and report warnings
#[test]
fn invariant_bad_data_never_panics() {
    let _ = env_logger::builder().is_test(true).try_init();
    let delegate = RenderDelegate::new(SyncConfig::default()).unwrap();
    let scene = MemoryScene::new();
    let mut runtime = RecordingRuntime::new();

    // face indices past the point array, subset naming a missing face
    let mesh = path("/bad/mesh");
    scene.add_prim(mesh.clone());
    scene.set_mesh_topology(
        &mesh,
        MeshTopology::new(vec![3, 4, 2], vec![0, 1, 9, 0, 2, 3, -1, 4])
            .with_subsets(vec![GeomSubset {
                id: "ghost".into(),
                material_id: Some(path("/Looks/missing")),
                face_indices: vec![7],
            }]),
    );
    scene.set_primvar(
        &mesh,
        PrimvarDescriptor::new(tokens::POINTS, Interpolation::Vertex),
        PrimvarValue::Float3(vec![[0.0; 3]; 3]),
    );
    scene.set_primvar(
        &mesh,
        PrimvarDescriptor::new(tokens::DISPLAY_COLOR, Interpolation::Vertex),
        PrimvarValue::Float3(vec![[1.0, 0.0, 0.0]; 2]),
    );
    scene.set_primvar(
        &mesh,
        PrimvarDescriptor::new(tokens::NORMALS, Interpolation::Vertex),
        PrimvarValue::Float(vec![1.0; 5]),
    );
    delegate.insert_prim(mesh, PrimKind::Mesh).unwrap();

    // points typed as float, widths of the wrong length
    let curves = path("/bad/curves");
    scene.add_prim(curves.clone());
    scene.set_curves_topology(
        &curves,
        CurvesTopology::new(vec![2, -3, 5], CurveType::Cubic, CurveBasis::CatmullRom, CurveWrap::Periodic),
    );
    scene.set_primvar(
        &curves,
        PrimvarDescriptor::new(tokens::POINTS, Interpolation::Vertex),
        PrimvarValue::Float(vec![0.0; 7]),
    );
    scene.set_primvar(
        &curves,
        PrimvarDescriptor::new(tokens::WIDTHS, Interpolation::Varying),
        PrimvarValue::Float(vec![1.0; 11]),
    );
    delegate.insert_prim(curves, PrimKind::BasisCurves).unwrap();

    // instanced through an instancer that was never inserted
    let cloud = path("/bad/cloud");
    scene.add_prim(cloud.clone());
    scene.set_primvar(
        &cloud,
        PrimvarDescriptor::new(tokens::POINTS, Interpolation::Vertex),
        PrimvarValue::Float3(vec![[0.0; 3]; 2]),
    );
    scene.set_instancer_id(&cloud, Some(path("/bad/instancer")));
    delegate.insert_prim(cloud, PrimKind::Points).unwrap();

    for repr in [ReprStyle::SmoothHull, ReprStyle::Wireframe, ReprStyle::Points, ReprStyle::BoundingBox] {
        delegate.sync_all(&scene, repr);
        delegate.commit_resources(&mut runtime);
    }

    let stats = delegate.stats();
    assert!(stats.warnings > 0);
    assert_eq!(stats.commits_enqueued, stats.commits_executed);
    assert!(scene.dirty_prims().is_empty());
}

/// INVARIANT: every record queued before a drain runs in that drain
#[test]
fn invariant_commit_barrier() {
    let delegate = RenderDelegate::new(SyncConfig::default()).unwrap();
    let scene = MemoryScene::new();
    let mut runtime = RecordingRuntime::new();
    for i in 0..16 {
        let cloud = path(&format!("/cloud{}", i));
        scene.add_prim(cloud.clone());
        scene.set_primvar(
            &cloud,
            PrimvarDescriptor::new(tokens::POINTS, Interpolation::Vertex),
            PrimvarValue::Float3(vec![[i as f32, 0.0, 0.0]]),
        );
        delegate.insert_prim(cloud, PrimKind::Points).unwrap();
    }

    delegate.sync_all(&scene, ReprStyle::Points);
    let pending = delegate.queue().pending();
    assert!(pending >= 16);
    assert_eq!(delegate.commit_resources(&mut runtime), pending);
    assert_eq!(delegate.queue().pending(), 0);
    assert_eq!(runtime.live_object_count(), 16);
}
