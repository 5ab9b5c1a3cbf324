//! Model information command

use anyhow::Result;
use j3d::{J3dModel, ModelStats};
use serde::Serialize;
use std::path::Path;

use super::load_model;
use crate::utils::{add_table_row, create_table, format_bytes, format_vec3};

#[derive(Serialize)]
struct TagSummary {
    id: String,
    offset: u64,
    size: u32,
}

#[derive(Serialize)]
struct InfoReport {
    magic: String,
    sub_magic: String,
    total_size: u32,
    tags: Vec<TagSummary>,
    stats: ModelStats,
    materials: Vec<String>,
    bounding_min: [f32; 3],
    bounding_max: [f32; 3],
    bounding_radius: f32,
    diagnostics: Vec<String>,
}

impl InfoReport {
    fn new(model: &J3dModel) -> Self {
        Self {
            magic: String::from_utf8_lossy(&model.header.magic).into_owned(),
            sub_magic: model.header.sub_magic_str(),
            total_size: model.header.total_size,
            tags: model
                .tags
                .iter()
                .map(|t| TagSummary {
                    id: t.id.as_string(),
                    offset: t.offset,
                    size: t.size,
                })
                .collect(),
            stats: model.stats(),
            materials: model.materials.iter().map(|m| m.name.clone()).collect(),
            bounding_min: model.bounding_box.min.to_array(),
            bounding_max: model.bounding_box.max.to_array(),
            bounding_radius: model.bounding_radius,
            diagnostics: model.diagnostics.iter().map(ToString::to_string).collect(),
        }
    }
}

pub fn execute(path: &Path, json: bool) -> Result<()> {
    let model = load_model(path)?;
    let report = InfoReport::new(&model);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("=== J3D Model: {} ===", path.display());
    println!("Format: {} / {}", report.magic, report.sub_magic);
    println!("Declared size: {}", format_bytes(u64::from(report.total_size)));

    println!("\n=== Tags ===");
    let mut table = create_table(&["Tag", "Offset", "Size"]);
    for tag in &report.tags {
        add_table_row(
            &mut table,
            vec![
                tag.id.clone(),
                format!("{:#x}", tag.offset),
                format_bytes(u64::from(tag.size)),
            ],
        );
    }
    table.printstd();

    let stats = &report.stats;
    println!("\n=== Contents ===");
    println!("Joints: {}", stats.joints);
    println!("Envelopes: {}", stats.envelopes);
    println!("Draw matrices: {}", stats.draw_matrices);
    println!("Shapes: {} ({} packets)", stats.shapes, stats.packets);
    println!("Vertices: {}", stats.vertices);
    println!("Triangles: {}", stats.triangles);
    println!("Materials: {}", stats.materials);
    for name in &report.materials {
        println!("  - {name}");
    }
    println!(
        "Bounds: {} .. {} (radius {:.3})",
        format_vec3(model.bounding_box.min),
        format_vec3(model.bounding_box.max),
        report.bounding_radius
    );

    if !report.diagnostics.is_empty() {
        println!("\n=== Diagnostics ({}) ===", report.diagnostics.len());
        for line in &report.diagnostics {
            println!("  ! {line}");
        }
    }

    Ok(())
}
