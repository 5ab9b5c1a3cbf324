//! Command implementations

pub mod info;
pub mod shaders;
pub mod skin;
pub mod tree;

use anyhow::{Context, Result};
use j3d::J3dModel;
use std::path::Path;

/// Load a model, attaching the path to any error
pub fn load_model(path: &Path) -> Result<J3dModel> {
    J3dModel::load(path).with_context(|| format!("Failed to load J3D model from {}", path.display()))
}
