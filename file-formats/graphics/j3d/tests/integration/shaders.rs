//! Shader generation for decoded materials

use j3d::J3dModel;
use j3d::shader::{ShaderOptions, generate_or_fallback, generate_shader};

use crate::builder::{container, mat3};

fn material_source(control: [u8; 6]) -> (String, String) {
    let model = J3dModel::parse(&container(&[mat3("skin", control)])).unwrap();
    let source = generate_shader(&model.materials[0], &ShaderOptions::default()).unwrap();
    (source.vertex, source.fragment)
}

#[test]
fn test_lit_material() {
    // Lit, register material color, lights 0 and 1, clamped diffuse, spot falloff
    let (vertex, fragment) = material_source([1, 0, 0b11, 2, 1, 0]);

    assert!(vertex.contains("\tLight LightParams[8];\n"));
    assert!(vertex.contains("\tt_LightAccum = AmbientColors[0];\n"));
    assert!(vertex.contains("\tt_LightDelta = LightParams[1].Position.xyz - t_Position;\n"));
    assert!(vertex.contains("\tt_DiffuseCoeff = max(dot(t_Normal, t_LightDeltaDir), 0.0);\n"));
    assert!(vertex.contains(
        "\tt_DistAtten = dot(LightParams[0].DistAtten.xyz, vec3(1.0, t_LightDeltaDist, t_LightDeltaDist2));\n"
    ));
    assert_eq!(vertex.matches("t_LightAccum +=").count(), 2);
    assert!(vertex.contains("\tv_Color0 = MaterialColors[0] * clamp(t_LightAccum, 0.0, 1.0);\n"));
    assert!(fragment.contains("\tvec4 t_Color = v_Color0;\n"));
}

#[test]
fn test_disabled_lighting_ignores_mask() {
    let (vertex, _) = material_source([0, 1, 0xFF, 2, 1, 0]);

    assert!(vertex.contains("\tt_LightAccum = vec4(1.0);\n"));
    assert!(vertex.contains("\tv_Color0 = a_Color0 * clamp(t_LightAccum, 0.0, 1.0);\n"));
    assert!(!vertex.contains("t_LightAccum +="));
    assert!(!vertex.contains("t_LightDelta ="));
}

#[test]
fn test_unknown_attenuation_falls_back() {
    let model = J3dModel::parse(&container(&[mat3("odd", [1, 0, 1, 2, 7, 0])])).unwrap();
    let options = ShaderOptions::default();

    assert!(generate_shader(&model.materials[0], &options).is_err());
    let source = generate_or_fallback(&model.materials[0], &options);
    assert!(source.is_fallback());
    assert!(source.fragment.contains("normalize(v_Normal)"));
}
