//! Fragment stage: rasterised color modulated by the bound textures

use std::fmt::Write;

use super::ShaderOptions;
use super::common::write_prelude;
use super::vertex::VERTEX_ATTRIBUTES;
use crate::error::Result;
use crate::material::MaterialState;

pub(super) fn generate(material: &MaterialState, options: &ShaderOptions) -> Result<String> {
    let mut out = String::new();
    write_prelude(&mut out, material, options)?;

    for (name, ty) in &VERTEX_ATTRIBUTES[..VERTEX_ATTRIBUTES.len() - 2] {
        writeln!(out, "in {ty} v_{name};")?;
    }
    writeln!(out)?;
    writeln!(out, "out vec4 FragColor;")?;
    writeln!(out)?;

    writeln!(out, "void main() {{")?;
    if material.channel_count > 0 {
        writeln!(out, "\tvec4 t_Color = v_Color0;")?;
    } else {
        writeln!(out, "\tvec4 t_Color = vec4(1.0);")?;
    }
    for (stage, texture) in material.textures.iter().enumerate() {
        // A texture only samples through a generator with the same index.
        if texture.is_some() && stage < material.tex_gens.len() {
            writeln!(out, "\tt_Color *= texture(Texture[{stage}], v_Tex{stage});")?;
        }
    }
    writeln!(out, "\tFragColor = t_Color;")?;
    writeln!(out, "}}")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{TexGen, TexGenMatrix, TexGenSource, TexGenType};

    #[test]
    fn test_textures_need_a_generator() {
        let mut textures = [None; 8];
        textures[0] = Some(4);
        textures[3] = Some(1);
        let material = MaterialState {
            channel_count: 1,
            tex_gens: vec![TexGen {
                kind: TexGenType::Mtx2x4,
                source: TexGenSource::Tex(0),
                matrix: TexGenMatrix::Identity,
            }],
            textures,
            ..MaterialState::default()
        };
        let text = generate(&material, &ShaderOptions::default()).unwrap();

        assert!(text.contains("\tvec4 t_Color = v_Color0;\n"));
        assert!(text.contains("\tt_Color *= texture(Texture[0], v_Tex0);\n"));
        assert!(!text.contains("Texture[3], v_Tex3"));
        assert!(text.contains("in vec2 v_Tex7;"));
    }

    #[test]
    fn test_no_channels_is_white() {
        let text = generate(&MaterialState::default(), &ShaderOptions::default()).unwrap();
        assert!(text.contains("\tvec4 t_Color = vec4(1.0);\n"));
        assert!(!text.contains("texture("));
    }
}
