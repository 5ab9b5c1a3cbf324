//! Skinning summary command

use anyhow::{Context, Result};
use j3d::types::BoundingBox;
use j3d::{SkinFrame, SkinningOptions, SkinningResolver};
use std::path::Path;

use super::load_model;
use crate::utils::{add_table_row, create_table, format_vec3};

pub fn execute(path: &Path) -> Result<()> {
    let model = load_model(path)?;

    println!("=== Skinning: {} ===", path.display());
    println!(
        "Joints: {}, envelopes: {}, draw matrices: {}",
        model.skeleton.len(),
        model.envelopes.envelopes.len(),
        model.draw_matrices.len()
    );

    let cpu = SkinningResolver::new(SkinningOptions::cpu());
    let frame = cpu
        .resolve(
            &model.skeleton,
            &model.meshes,
            &model.draw_matrices,
            &model.envelopes,
        )
        .context("Failed to skin the bind pose")?;
    let skinned = match frame {
        SkinFrame::Cpu(shapes) => shapes,
        SkinFrame::Gpu(_) => Vec::new(),
    };

    let gpu = SkinningResolver::new(SkinningOptions::default());
    let mut table = create_table(&["Shape", "Vertices", "Rigid", "Weighted", "Bind-pose bounds"]);
    for (index, shape) in skinned.iter().enumerate() {
        let attributes = model
            .skin_attributes(&gpu, index)
            .with_context(|| format!("Failed to resolve skin attributes for shape {index}"))?;
        let bounds = BoundingBox::from_points(&shape.positions).map_or_else(
            || "-".to_string(),
            |b| format!("{} .. {}", format_vec3(b.min), format_vec3(b.max)),
        );
        add_table_row(
            &mut table,
            vec![
                index.to_string(),
                attributes.len().to_string(),
                attributes.rigid_count().to_string(),
                attributes.weighted_count().to_string(),
                bounds,
            ],
        );
    }
    table.printstd();

    Ok(())
}
