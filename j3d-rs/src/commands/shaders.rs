//! Shader generation command

use anyhow::{Context, Result, bail};
use j3d::shader::{ShaderOptions, generate_or_fallback};
use std::fs;
use std::path::Path;

use super::load_model;

pub fn execute(path: &Path, out: &Path, material: Option<&str>, gpu_skinning: bool) -> Result<()> {
    let model = load_model(path)?;

    let materials: Vec<_> = match material {
        Some(name) => match model.material_by_name(name) {
            Some(m) => vec![m],
            None => bail!("Material '{name}' not found in {}", path.display()),
        },
        None => model.materials.iter().collect(),
    };
    if materials.is_empty() {
        println!("{} has no materials", path.display());
        return Ok(());
    }

    fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory {}", out.display()))?;

    let options = ShaderOptions {
        gpu_skinning,
        ..ShaderOptions::default()
    };

    let mut fallbacks = 0;
    for material in materials {
        let source = generate_or_fallback(material, &options);
        if source.is_fallback() {
            fallbacks += 1;
        }

        let stem = file_stem(&material.name);
        for (extension, text) in [("vert", &source.vertex), ("frag", &source.fragment)] {
            let target = out.join(format!("{stem}.{extension}"));
            fs::write(&target, text)
                .with_context(|| format!("Failed to write {}", target.display()))?;
        }
        println!("{} -> {}", material.name, source.name);
    }

    if fallbacks > 0 {
        println!("{fallbacks} material(s) fell back to the debug shader");
    }
    Ok(())
}

/// Material names are free-form; keep them filesystem safe
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "material".to_string()
    } else {
        stem
    }
}
