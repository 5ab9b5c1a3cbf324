//! Vertex stage: skinning, lighting channels and texture coordinate generation

use std::fmt::Write;

use super::ShaderOptions;
use super::common::write_prelude;
use crate::error::{J3dError, Result};
use crate::material::{
    AttenuationFunction, ColorChannelControl, ColorSource, DiffuseFunction, MaterialState,
    PostTexGenMatrix, TexGen, TexGenMatrix, TexGenSource, TexGenType,
};

/// Vertex inputs in attribute location order, as `(name, glsl type)`
///
/// The two skin attributes are last and are not forwarded to the fragment
/// stage.
pub const VERTEX_ATTRIBUTES: [(&str, &str); 14] = [
    ("Position", "vec3"),
    ("Normal", "vec3"),
    ("Color0", "vec4"),
    ("Color1", "vec4"),
    ("Tex0", "vec2"),
    ("Tex1", "vec2"),
    ("Tex2", "vec2"),
    ("Tex3", "vec2"),
    ("Tex4", "vec2"),
    ("Tex5", "vec2"),
    ("Tex6", "vec2"),
    ("Tex7", "vec2"),
    ("SkinIndices", "vec4"),
    ("SkinWeights", "vec4"),
];

const MAX_TEX_GENS: usize = 8;

pub(super) fn generate(material: &MaterialState, options: &ShaderOptions) -> Result<String> {
    let mut out = String::new();
    write_prelude(&mut out, material, options)?;
    write_attributes(&mut out)?;

    writeln!(out, "float ApplyAttenuation(vec3 t_Coeff, float t_Value) {{")?;
    writeln!(
        out,
        "\treturn max(dot(t_Coeff, vec3(1.0, t_Value, t_Value*t_Value)), 0.0);"
    )?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    if options.gpu_skinning {
        write_skin_matrix(&mut out)?;
    }

    writeln!(out, "void main() {{")?;
    if options.gpu_skinning {
        writeln!(out, "\tmat4x3 t_SkinMatrix = GetSkinMatrix();")?;
        writeln!(out, "\tvec3 t_Position = t_SkinMatrix * vec4(a_Position, 1.0);")?;
        writeln!(out, "\tvec3 t_Normal = normalize(mat3(t_SkinMatrix) * a_Normal);")?;
    } else {
        writeln!(out, "\tvec3 t_Position = a_Position;")?;
        writeln!(out, "\tvec3 t_Normal = a_Normal;")?;
    }
    writeln!(out, "\tv_Position = t_Position;")?;
    writeln!(out, "\tv_Normal = t_Normal;")?;
    writeln!(out)?;

    writeln!(out, "\tvec4 t_LightAccum;")?;
    writeln!(out, "\tvec3 t_LightDelta, t_LightDeltaDir;")?;
    writeln!(out, "\tfloat t_LightDeltaDist2, t_LightDeltaDist;")?;
    writeln!(out, "\tfloat t_DiffuseCoeff, t_AngleAtten, t_DistAtten;")?;
    writeln!(out, "\tvec4 t_ColorChanTemp;")?;
    writeln!(out)?;

    write_channels(&mut out, material)?;
    write_tex_gens(&mut out, material)?;

    writeln!(
        out,
        "\tgl_Position = ProjectionMatrix * vec4(ViewMatrix * vec4(t_Position, 1.0), 1.0);"
    )?;
    writeln!(out, "}}")?;
    Ok(out)
}

fn write_attributes(out: &mut String) -> Result<()> {
    for (location, (name, ty)) in VERTEX_ATTRIBUTES.iter().enumerate() {
        writeln!(out, "layout(location = {location}) in {ty} a_{name};")?;
    }
    writeln!(out)?;
    for (name, ty) in &VERTEX_ATTRIBUTES[..VERTEX_ATTRIBUTES.len() - 2] {
        writeln!(out, "out {ty} v_{name};")?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_skin_matrix(out: &mut String) -> Result<()> {
    writeln!(out, "mat4x3 GetSkinMatrix() {{")?;
    writeln!(out, "\tmat4x3 t_Matrix = mat4x3(0.0);")?;
    writeln!(out, "\tfor (int i = 0; i < 4; i++) {{")?;
    writeln!(out, "\t\tint t_Bone = int(a_SkinIndices[i]);")?;
    writeln!(out, "\t\tif (t_Bone < 0)")?;
    writeln!(out, "\t\t\tcontinue;")?;
    writeln!(out, "\t\tt_Matrix += BoneMatrices[t_Bone] * a_SkinWeights[i];")?;
    writeln!(out, "\t}}")?;
    writeln!(out, "\treturn t_Matrix;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn write_channels(out: &mut String, material: &MaterialState) -> Result<()> {
    if material.channel_count > 2 {
        return Err(J3dError::ShaderGeneration(format!(
            "{} color channels (maximum is 2)",
            material.channel_count
        )));
    }

    for i in 0..material.channel_count as usize {
        let (color, alpha) = material.channel(i).ok_or_else(|| {
            J3dError::ShaderGeneration(format!("missing controls for color channel {i}"))
        })?;

        if color == alpha {
            writeln!(out, "\t// Channel {i}")?;
            write_channel(out, color, i, &format!("v_Color{i}"))?;
        } else {
            writeln!(out, "\t// Color {i}")?;
            write_channel(out, color, i, "t_ColorChanTemp")?;
            writeln!(out, "\tv_Color{i}.rgb = t_ColorChanTemp.rgb;")?;
            writeln!(out, "\t// Alpha {i}")?;
            write_channel(out, alpha, i, "t_ColorChanTemp")?;
            writeln!(out, "\tv_Color{i}.a = t_ColorChanTemp.a;")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// One color or alpha channel into `output`
pub(super) fn write_channel(
    out: &mut String,
    control: &ColorChannelControl,
    index: usize,
    output: &str,
) -> Result<()> {
    let material_source = color_source(control.material_source, "MaterialColors", index);

    if control.lighting_enabled {
        let ambient_source = color_source(control.ambient_source, "AmbientColors", index);
        let diffuse = diffuse_coefficient(control.diffuse_function)?;
        writeln!(out, "\tt_LightAccum = {ambient_source};")?;

        for light in control.light_mask.lights() {
            let name = format!("LightParams[{light}]");
            let angle = format!("max(0.0, dot(t_LightDeltaDir, {name}.Direction.xyz))");
            let distance = distance_attenuation(control.attenuation_function, &name, &angle)?;

            writeln!(out, "\tt_LightDelta = {name}.Position.xyz - t_Position;")?;
            writeln!(out, "\tt_LightDeltaDist2 = dot(t_LightDelta, t_LightDelta);")?;
            writeln!(out, "\tt_LightDeltaDist = sqrt(t_LightDeltaDist2);")?;
            writeln!(out, "\tt_LightDeltaDir = t_LightDelta / t_LightDeltaDist;")?;
            writeln!(out, "\tt_DiffuseCoeff = {diffuse};")?;
            writeln!(
                out,
                "\tt_AngleAtten = max(0.0, ApplyAttenuation({name}.CosAtten.xyz, {angle}));"
            )?;
            writeln!(out, "\tt_DistAtten = {distance};")?;
            writeln!(
                out,
                "\tt_LightAccum += t_DiffuseCoeff * (t_AngleAtten / t_DistAtten) * {name}.Color;"
            )?;
        }
    } else {
        // Unlit channels see full white regardless of the light mask.
        writeln!(out, "\tt_LightAccum = vec4(1.0);")?;
    }

    writeln!(
        out,
        "\t{output} = {material_source} * clamp(t_LightAccum, 0.0, 1.0);"
    )?;
    Ok(())
}

fn color_source(source: ColorSource, register: &str, index: usize) -> String {
    match source {
        ColorSource::Vertex => format!("a_Color{index}"),
        ColorSource::Register => format!("{register}[{index}]"),
    }
}

fn diffuse_coefficient(function: DiffuseFunction) -> Result<&'static str> {
    match function {
        DiffuseFunction::None => Ok("1.0"),
        DiffuseFunction::Clamp => Ok("max(dot(t_Normal, t_LightDeltaDir), 0.0)"),
        DiffuseFunction::Signed => Ok("dot(t_Normal, t_LightDeltaDir)"),
        DiffuseFunction::Unknown(raw) => Err(J3dError::ShaderGeneration(format!(
            "unknown diffuse function {raw}"
        ))),
    }
}

fn distance_attenuation(
    function: AttenuationFunction,
    light: &str,
    angle: &str,
) -> Result<String> {
    match function {
        AttenuationFunction::None => Ok("1.0".to_string()),
        AttenuationFunction::Spot => Ok(format!(
            "dot({light}.DistAtten.xyz, vec3(1.0, t_LightDeltaDist, t_LightDeltaDist2))"
        )),
        AttenuationFunction::Spec => Ok(format!("ApplyAttenuation({light}.DistAtten.xyz, {angle})")),
        AttenuationFunction::Unknown(raw) => Err(J3dError::ShaderGeneration(format!(
            "unknown attenuation function {raw}"
        ))),
    }
}

fn write_tex_gens(out: &mut String, material: &MaterialState) -> Result<()> {
    if material.tex_gens.len() > MAX_TEX_GENS {
        return Err(J3dError::ShaderGeneration(format!(
            "{} texture generators (maximum is {MAX_TEX_GENS})",
            material.tex_gens.len()
        )));
    }

    for (i, tex_gen) in material.tex_gens.iter().enumerate() {
        writeln!(out, "\t// TexGen {i}")?;
        let source = tex_gen_source(tex_gen.source, i)?;
        let coord = match tex_gen.kind {
            TexGenType::Mtx3x4 => tex_gen_matrix(tex_gen, &source)?,
            TexGenType::Mtx2x4 => format!("vec3(({}).xy, 1.0)", tex_gen_matrix(tex_gen, &source)?),
            // Bump and SRTG generators pass their input through.
            TexGenType::Bump(_) | TexGenType::Srtg => format!("vec3(({source}).xy, 1.0)"),
            TexGenType::Unknown(raw) => {
                return Err(J3dError::ShaderGeneration(format!(
                    "texgen {i}: unknown generator type {raw}"
                )));
            }
        };
        writeln!(out, "\tvec3 t_TexCoord{i} = {coord};")?;

        match material.post_tex_gens.get(i).copied().flatten().map(|p| p.matrix) {
            None | Some(PostTexGenMatrix::Identity) => {}
            Some(PostTexGenMatrix::PostTexMtx(n)) => {
                writeln!(
                    out,
                    "\tt_TexCoord{i} = PostTexMtx[{n}] * vec4(t_TexCoord{i}, 1.0);"
                )?;
            }
            Some(PostTexGenMatrix::Unknown(raw)) => {
                return Err(J3dError::ShaderGeneration(format!(
                    "texgen {i}: unknown post matrix {raw}"
                )));
            }
        }

        if tex_gen.kind == TexGenType::Mtx3x4 {
            writeln!(out, "\tv_Tex{i} = t_TexCoord{i}.xy / t_TexCoord{i}.z;")?;
        } else {
            writeln!(out, "\tv_Tex{i} = t_TexCoord{i}.xy;")?;
        }
    }
    if !material.tex_gens.is_empty() {
        writeln!(out)?;
    }
    Ok(())
}

/// Generator input as a `vec4` expression
fn tex_gen_source(source: TexGenSource, index: usize) -> Result<String> {
    match source {
        TexGenSource::Position => Ok("vec4(t_Position, 1.0)".to_string()),
        TexGenSource::Normal => Ok("vec4(t_Normal, 1.0)".to_string()),
        TexGenSource::Tex(n) => Ok(format!("vec4(a_Tex{n}, 1.0, 1.0)")),
        TexGenSource::TexCoord(n) if (n as usize) < index => {
            Ok(format!("vec4(t_TexCoord{n}, 1.0)"))
        }
        TexGenSource::Color0 => Ok("a_Color0".to_string()),
        TexGenSource::Color1 => Ok("a_Color1".to_string()),
        other => Err(J3dError::ShaderGeneration(format!(
            "texgen {index}: unsupported source {other:?}"
        ))),
    }
}

fn tex_gen_matrix(tex_gen: &TexGen, source: &str) -> Result<String> {
    match tex_gen.matrix {
        TexGenMatrix::Identity => Ok(format!("({source}).xyz")),
        TexGenMatrix::TexMtx(n) => Ok(format!("TexMatrices[{n}] * {source}")),
        TexGenMatrix::PosNormal(_) => Ok(format!("ViewMatrix * {source}")),
        TexGenMatrix::Unknown(raw) => Err(J3dError::ShaderGeneration(format!(
            "unknown texgen matrix {raw}"
        ))),
    }
}
