//! Declarations shared by both stages

use std::fmt::Write;

use super::ShaderOptions;
use crate::error::Result;
use crate::material::MaterialState;

/// Banner, version directive and the uniform blocks
pub(super) fn write_prelude(
    out: &mut String,
    material: &MaterialState,
    options: &ShaderOptions,
) -> Result<()> {
    writeln!(out, "// Automatically generated file. All changes will be lost.")?;
    writeln!(out, "// Material: {}", material.name)?;
    writeln!(out, "#version {} core", options.glsl_version)?;
    writeln!(out)?;
    writeln!(out, "precision mediump float;")?;
    writeln!(out)?;

    writeln!(out, "layout(row_major, std140) uniform MatrixBlock {{")?;
    writeln!(out, "\tmat4x4 ProjectionMatrix;")?;
    writeln!(out, "\tmat4x3 ViewMatrix;")?;
    writeln!(out, "\tmat4x3 BoneMatrices[{}];", options.max_bones)?;
    writeln!(out, "}};")?;
    writeln!(out)?;

    writeln!(out, "struct Light {{")?;
    for field in ["Position", "Direction", "Color", "CosAtten", "DistAtten"] {
        writeln!(out, "\tvec4 {field};")?;
    }
    writeln!(out, "}};")?;
    writeln!(out)?;

    writeln!(out, "layout(row_major, std140) uniform MaterialBlock {{")?;
    writeln!(out, "\tvec4 AmbientColors[2];")?;
    writeln!(out, "\tvec4 MaterialColors[2];")?;
    writeln!(out, "\tvec4 KonstColors[4];")?;
    writeln!(out, "\tvec4 Colors[4];")?;
    writeln!(out, "\tvec4 TextureParams[8];")?;
    writeln!(out, "\tmat4x3 TexMatrices[10];")?;
    writeln!(out, "\tmat4x2 IndirectTexMatrices[3];")?;
    if material.channel_count > 0 {
        writeln!(out, "\tLight LightParams[8];")?;
    }
    if material.uses_post_tex_matrices() {
        writeln!(out, "\tmat4x3 PostTexMtx[20];")?;
    }
    writeln!(out, "}};")?;
    writeln!(out)?;

    writeln!(out, "uniform sampler2D Texture[8];")?;
    writeln!(out)?;
    Ok(())
}
