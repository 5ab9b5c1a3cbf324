//! Scene hierarchy tree command

use anyhow::Result;
use j3d::{HierarchyNode, J3dModel, NodeKind};
use std::path::Path;

use super::load_model;
use crate::utils::{NodeType, TreeNode, TreeOptions, render_tree};

pub fn execute(path: &Path, depth: Option<usize>, no_color: bool) -> Result<()> {
    let model = load_model(path)?;

    let file_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let mut root = TreeNode::new(file_name, NodeType::Root)
        .with_metadata("format", &model.header.sub_magic_str())
        .with_metadata("joints", &model.skeleton.len().to_string())
        .with_metadata("shapes", &model.shapes.len().to_string());

    match model.hierarchy() {
        Some(hierarchy) => {
            let mut next_batch = 0;
            for child in &hierarchy.children {
                root = root.add_child(build_node(&model, child, &mut next_batch));
            }
        }
        None => log::warn!("{} has no scene hierarchy", path.display()),
    }

    let options = TreeOptions {
        max_depth: depth,
        no_color,
        ..TreeOptions::default()
    };
    print!("{}", render_tree(&root, &options));
    Ok(())
}

/// Convert a hierarchy node; `next_batch` tracks shape nodes in pre-order,
/// which is the order of [`J3dModel::batches`]
fn build_node(model: &J3dModel, node: &HierarchyNode, next_batch: &mut usize) -> TreeNode {
    let index = usize::from(node.value);
    let mut tree = match node.kind {
        NodeKind::Root => TreeNode::new("Root".to_string(), NodeType::Root),
        NodeKind::Joint => {
            let mut tree = TreeNode::new(format!("Joint {index}"), NodeType::Joint);
            if let Some(joint) = model.skeleton.joints().get(index)
                && !joint.name.is_empty()
            {
                tree = tree.with_metadata("name", &joint.name);
            }
            tree
        }
        NodeKind::Material => {
            let mut tree = TreeNode::new(format!("Material {index}"), NodeType::Material);
            if let Some(material) = model.materials.get(index) {
                tree = tree.with_metadata("name", &material.name);
            }
            tree
        }
        NodeKind::Shape => {
            let mut tree = TreeNode::new(format!("Shape {index}"), NodeType::Shape);
            let mesh = model
                .batches
                .get(*next_batch)
                .and_then(|batch| model.meshes.get(batch.shape));
            *next_batch += 1;
            if let Some(mesh) = mesh {
                tree = tree
                    .with_metadata("vertices", &mesh.vertex_count().to_string())
                    .with_metadata("triangles", &mesh.triangle_count().to_string());
            }
            tree
        }
    };

    for child in &node.children {
        tree = tree.add_child(build_node(model, child, next_batch));
    }
    tree
}
