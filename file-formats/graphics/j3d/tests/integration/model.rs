//! Full model decode: linking, sentinels, skinning

use glam::{Mat4, Quat, Vec3};
use j3d::skinning::{SkinFrame, SkinningOptions, SkinningResolver};
use j3d::{Diagnostic, J3dError, J3dModel, MaterialBatch};
use pretty_assertions::assert_eq;

use crate::builder::{
    PacketSpec, QUADS, STRIP, TRIANGLES, container, drw1, evp1, inf1, jnt1, mat3, shp1, vtx1,
};

const JOINT: u16 = 0x10;
const MATERIAL: u16 = 0x11;
const SHAPE: u16 = 0x12;
const OPEN: u16 = 0x01;
const CLOSE: u16 = 0x02;

const POSITIONS: [[f32; 3]; 5] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 2.0, 0.0],
];

fn hierarchy() -> Vec<u8> {
    inf1(&[
        (JOINT, 0),
        (OPEN, 0),
        (JOINT, 1),
        (OPEN, 0),
        (MATERIAL, 0),
        (OPEN, 0),
        (SHAPE, 0),
        (CLOSE, 0),
        (CLOSE, 0),
        (CLOSE, 0),
    ])
}

fn packets() -> Vec<PacketSpec> {
    vec![
        PacketSpec {
            matrix_table: vec![0, 1],
            primitives: vec![(STRIP, vec![(0, 0), (0, 1), (1, 2), (1, 3), (0, 4)])],
        },
        PacketSpec {
            matrix_table: vec![0xFFFF, 2],
            primitives: vec![(TRIANGLES, vec![(0, 0), (1, 1), (1, 2)])],
        },
    ]
}

fn skinned_model() -> Vec<u8> {
    let identity = [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]];
    let down = [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, -10.0], [0.0, 0.0, 1.0, 0.0]];
    container(&[
        hierarchy(),
        vtx1(&POSITIONS),
        evp1(&[&[(0, 0.5), (1, 0.5)]], &[identity, down]),
        drw1(&[(false, 0), (false, 1), (true, 0)]),
        jnt1(&[[0.0, 0.0, 0.0], [0.0, 10.0, 0.0]]),
        shp1(&[packets()]),
        mat3("body", [1, 0, 0b11, 2, 1, 0]),
    ])
}

#[test]
fn test_full_model_decode() {
    let model = J3dModel::parse(&skinned_model()).unwrap();

    let stats = model.stats();
    assert_eq!(stats.tags, 7);
    assert_eq!(stats.joints, 2);
    assert_eq!(stats.envelopes, 1);
    assert_eq!(stats.draw_matrices, 3);
    assert_eq!(stats.shapes, 1);
    assert_eq!(stats.packets, 2);
    assert_eq!(stats.vertices, 12);
    assert_eq!(stats.triangles, 4);
    assert_eq!(stats.materials, 1);
    assert!(model.diagnostics.is_empty());

    assert_eq!(model.skeleton.joints()[0].parent, None);
    assert_eq!(model.skeleton.joints()[1].parent, Some(0));
    assert_eq!(
        model.batches,
        vec![MaterialBatch {
            shape: 0,
            material: Some(0)
        }]
    );
    assert_eq!(model.materials[0].name, "body");
    assert_eq!(model.bounding_box.max, Vec3::ONE);

    let (center, radius) = model.bounding_sphere();
    assert_eq!(center, Vec3::ZERO);
    assert!((radius - 3.0f32.sqrt()).abs() < 1e-6);
}

#[test]
fn test_strip_and_sentinel_linking() {
    let model = J3dModel::parse(&skinned_model()).unwrap();

    // Packet 1 inherits slot 0 from packet 0.
    assert_eq!(model.shapes[0].packets[1].matrix_table, vec![0, 2]);

    let mesh = &model.meshes[0];
    assert_eq!(mesh.indices, (0..12).collect::<Vec<u32>>());
    assert_eq!(mesh.draw_slots, vec![0, 0, 1, 1, 0, 1, 1, 1, 0, 0, 2, 2]);

    let strip: Vec<Vec3> = mesh.positions[..9].to_vec();
    let p = |i: usize| Vec3::from_array(POSITIONS[i]);
    assert_eq!(
        strip,
        vec![p(0), p(1), p(2), p(2), p(1), p(3), p(2), p(3), p(4)]
    );
}

#[test]
fn test_gpu_attributes() {
    let model = J3dModel::parse(&skinned_model()).unwrap();
    let attributes = model.skin_attributes(&SkinningResolver::default(), 0).unwrap();

    assert_eq!(attributes.len(), 12);
    // Rigid entries follow the two envelope bone entries in the palette.
    assert_eq!(attributes.rigid_base, 2);
    assert_eq!(attributes.indices[0], [2, -1, -1, -1]);
    assert_eq!(attributes.indices[2], [3, -1, -1, -1]);
    assert_eq!(attributes.weights[2], [1.0, 0.0, 0.0, 0.0]);
    assert_eq!(attributes.indices[11], [0, 1, -1, -1]);
    assert_eq!(attributes.weights[11], [0.5, 0.5, 0.0, 0.0]);
    assert_eq!(attributes.rigid_count(), 10);
    assert_eq!(attributes.weighted_count(), 2);
    assert!(model.skin_attributes(&SkinningResolver::default(), 1).is_err());
}

#[test]
fn test_gpu_palette_matches_cpu_skinning() {
    let mut model = J3dModel::parse(&skinned_model()).unwrap();
    model
        .skeleton
        .set_joint_pose(1, Vec3::ONE, Quat::from_rotation_x(0.5), Vec3::new(0.0, 20.0, 0.0))
        .unwrap();

    let gpu = SkinningResolver::default();
    let cpu = SkinningResolver::new(SkinningOptions::cpu());
    let (skeleton, meshes) = (&model.skeleton, &model.meshes);
    let (drw1, evp1) = (&model.draw_matrices, &model.envelopes);

    let Ok(SkinFrame::Gpu(palette)) = gpu.resolve(skeleton, meshes, drw1, evp1) else {
        panic!("expected a palette");
    };
    let Ok(SkinFrame::Cpu(shapes)) = cpu.resolve(skeleton, meshes, drw1, evp1) else {
        panic!("expected skinned shapes");
    };
    let attributes = model.skin_attributes(&gpu, 0).unwrap();

    // Covers rigid vertices on both joints and the blended vertices.
    for (v, position) in model.meshes[0].positions.iter().enumerate() {
        let blended = attributes.indices[v]
            .iter()
            .zip(&attributes.weights[v])
            .filter(|(i, _)| **i >= 0)
            .fold(Mat4::ZERO, |acc, (i, w)| acc + palette[*i as usize] * *w);
        let on_gpu = blended.transform_point3(*position);
        assert!(
            on_gpu.abs_diff_eq(shapes[0].positions[v], 1e-4),
            "vertex {v}: gpu {on_gpu} cpu {}",
            shapes[0].positions[v]
        );
    }
}

#[test]
fn test_cpu_skinning_follows_pose() {
    let mut model = J3dModel::parse(&skinned_model()).unwrap();
    let resolver = SkinningResolver::new(SkinningOptions::cpu());

    let Some(SkinFrame::Cpu(shapes)) = model.resolve_skinning_if_dirty(&resolver).unwrap() else {
        panic!("a freshly decoded skeleton is dirty");
    };
    let bind = &shapes[0].positions;
    // Rigid to joint 0, rigid to joint 1, then the blended vertex.
    assert!(bind[0].abs_diff_eq(Vec3::ZERO, 1e-6));
    assert!(bind[2].abs_diff_eq(Vec3::new(0.0, 11.0, 0.0), 1e-6));
    assert!(bind[11].abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6));

    assert!(model.resolve_skinning_if_dirty(&resolver).unwrap().is_none());

    model
        .skeleton
        .set_joint_pose(1, Vec3::ONE, Quat::IDENTITY, Vec3::new(0.0, 20.0, 0.0))
        .unwrap();
    let Some(SkinFrame::Cpu(shapes)) = model.resolve_skinning_if_dirty(&resolver).unwrap() else {
        panic!("pose change must mark the skeleton dirty");
    };
    let posed = &shapes[0].positions;
    assert!(posed[2].abs_diff_eq(Vec3::new(0.0, 21.0, 0.0), 1e-5));
    // Half of the vertex follows joint 1's extra 10 units.
    assert!(posed[11].abs_diff_eq(Vec3::new(0.0, 6.0, 0.0), 1e-5));
}

#[test]
fn test_parent_assignment_is_idempotent() {
    let mut model = J3dModel::parse(&skinned_model()).unwrap();
    let first = model.skeleton.joints().to_vec();
    let root = model.hierarchy().unwrap().clone();
    model.skeleton.assign_parents(&root).unwrap();
    assert_eq!(model.skeleton.joints(), first.as_slice());
}

#[test]
fn test_repeated_joint_is_a_cycle() {
    let data = container(&[
        inf1(&[
            (JOINT, 0),
            (OPEN, 0),
            (JOINT, 1),
            (OPEN, 0),
            (JOINT, 0),
            (CLOSE, 0),
            (CLOSE, 0),
        ]),
        jnt1(&[[0.0; 3], [0.0; 3]]),
    ]);
    assert!(matches!(
        J3dModel::parse(&data),
        Err(J3dError::CyclicHierarchy { .. })
    ));
}

#[test]
fn test_unresolvable_sentinel() {
    crate::init_logging();
    let data = container(&[
        vtx1(&POSITIONS),
        shp1(&[vec![PacketSpec {
            matrix_table: vec![0xFFFF],
            primitives: vec![(TRIANGLES, vec![(0, 0), (0, 1), (0, 2)])],
        }]]),
    ]);
    assert!(matches!(
        J3dModel::parse(&data),
        Err(J3dError::UnresolvableBoneIndex {
            shape: 0,
            packet: 0,
            slot: 0
        })
    ));
}

#[test]
fn test_degenerate_and_unsupported_primitives() {
    crate::init_logging();
    let data = container(&[
        vtx1(&POSITIONS),
        shp1(&[vec![PacketSpec {
            matrix_table: vec![0],
            primitives: vec![
                (STRIP, vec![(0, 0), (0, 1), (0, 1), (0, 2), (0, 3)]),
                (QUADS, vec![(0, 0), (0, 1), (0, 2), (0, 3)]),
                (TRIANGLES, vec![(0, 2), (0, 3), (0, 4)]),
            ],
        }]]),
    ]);
    let model = J3dModel::parse(&data).unwrap();

    assert_eq!(model.meshes[0].triangle_count(), 2);
    assert_eq!(model.diagnostics.degenerate_triangles(), 2);
    assert!(model.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::UnsupportedTopology {
            opcode: QUADS,
            ..
        }
    )));
}

#[test]
fn test_too_many_influences() {
    let five: &[(u16, f32)] = &[(0, 0.2), (1, 0.2), (2, 0.2), (3, 0.2), (4, 0.2)];
    let identity = [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]];
    let data = container(&[evp1(&[&[(0, 1.0)], five], &[identity; 5])]);
    assert!(matches!(
        J3dModel::parse(&data),
        Err(J3dError::TooManyInfluences {
            envelope: 1,
            count: 5
        })
    ));
}

#[test]
fn test_load_from_file() {
    let dir = std::env::temp_dir().join(format!("j3d-load-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("model.bmd");
    std::fs::write(&path, skinned_model()).unwrap();

    let model = J3dModel::load(&path).unwrap();
    assert_eq!(model.stats().shapes, 1);
    std::fs::remove_dir_all(&dir).unwrap();

    assert!(matches!(J3dModel::load(&path), Err(J3dError::Io(_))));
}
