//! GLSL source generation for fixed-function materials
//!
//! The generator is a pure function of a [`MaterialState`]: it reproduces the
//! material's per-vertex lighting channels and texture coordinate generators
//! as vertex and fragment stage source text. Compiling the text is left to
//! the caller.
//!
//! # Example
//!
//! ```rust
//! use j3d::material::MaterialState;
//! use j3d::shader::{ShaderOptions, generate_or_fallback};
//!
//! let material = MaterialState::default();
//! let source = generate_or_fallback(&material, &ShaderOptions::default());
//! assert!(source.vertex.contains("void main()"));
//! ```

mod common;
mod fragment;
mod vertex;

use log::{debug, warn};

use crate::error::Result;
use crate::material::MaterialState;

pub use vertex::VERTEX_ATTRIBUTES;

/// Name of the program substituted when generation fails
pub const FALLBACK_NAME: &str = "Debug_NormalColors";

/// Options for controlling shader generation
#[derive(Debug, Clone)]
pub struct ShaderOptions {
    /// Blend `BoneMatrices` by the skin attributes in the vertex stage
    pub gpu_skinning: bool,
    /// Value of the `#version` directive
    pub glsl_version: u32,
    /// Length of the `BoneMatrices` uniform array
    pub max_bones: usize,
}

impl Default for ShaderOptions {
    fn default() -> Self {
        Self {
            gpu_skinning: false,
            glsl_version: 330,
            max_bones: 128,
        }
    }
}

/// Generated source of one program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Material name, or [`FALLBACK_NAME`]
    pub name: String,
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSource {
    /// The fixed debug program that colours surfaces by their normal
    pub fn fallback() -> Self {
        Self {
            name: FALLBACK_NAME.to_string(),
            vertex: FALLBACK_VERTEX.to_string(),
            fragment: FALLBACK_FRAGMENT.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.name == FALLBACK_NAME
    }
}

/// Generate vertex and fragment source for a material
pub fn generate_shader(material: &MaterialState, options: &ShaderOptions) -> Result<ShaderSource> {
    let vertex = vertex::generate(material, options)?;
    let fragment = fragment::generate(material, options)?;
    debug!(
        "Generated shader for '{}': {} + {} bytes",
        material.name,
        vertex.len(),
        fragment.len()
    );
    Ok(ShaderSource {
        name: material.name.clone(),
        vertex,
        fragment,
    })
}

/// Generate source for a material, substituting the fallback program on failure
pub fn generate_or_fallback(material: &MaterialState, options: &ShaderOptions) -> ShaderSource {
    match generate_shader(material, options) {
        Ok(source) => source,
        Err(e) => {
            warn!(
                "Failed to generate shader for material '{}': {}",
                material.name, e
            );
            ShaderSource::fallback()
        }
    }
}

const FALLBACK_VERTEX: &str = "\
#version 330 core

layout(row_major, std140) uniform MatrixBlock {
\tmat4x4 ProjectionMatrix;
\tmat4x3 ViewMatrix;
};

layout(location = 0) in vec3 a_Position;
layout(location = 1) in vec3 a_Normal;

out vec3 v_Normal;

void main() {
\tv_Normal = a_Normal;
\tgl_Position = ProjectionMatrix * vec4(ViewMatrix * vec4(a_Position, 1.0), 1.0);
}
";

const FALLBACK_FRAGMENT: &str = "\
#version 330 core

in vec3 v_Normal;

out vec4 FragColor;

void main() {
\tFragColor = vec4(normalize(v_Normal) * 0.5 + 0.5, 1.0);
}
";
