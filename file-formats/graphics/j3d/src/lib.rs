//! Decoder for J3D (BMD/BDL) model containers.
//!
//! A container is a header followed by tagged sections. This crate decodes the
//! sections needed to draw and skin a model:
//!
//! - INF1 scene hierarchy, VTX1 vertex arrays and JNT1 skeleton
//! - EVP1 envelopes and DRW1 draw matrices
//! - SHP1 shapes, with strips and fans normalised to triangle lists
//! - MAT3 lighting and texture coordinate state
//!
//! On top of the decoded sections it resolves per-vertex skinning and
//! generates GLSL source that reproduces each material's fixed-function
//! lighting.
//!
//! # Example
//!
//! ```rust,no_run
//! use j3d::J3dModel;
//! use j3d::shader::{ShaderOptions, generate_or_fallback};
//!
//! let model = J3dModel::load("path/to/model.bmd")?;
//! println!("{} shapes, {} joints", model.shapes.len(), model.skeleton.len());
//!
//! for material in &model.materials {
//!     let source = generate_or_fallback(material, &ShaderOptions::default());
//!     println!("{}: {} bytes", source.name, source.vertex.len());
//! }
//! # Ok::<(), j3d::J3dError>(())
//! ```

pub mod chunk;
pub mod drw1;
pub mod error;
pub mod evp1;
pub mod inf1;
pub mod jnt1;
pub mod mat3;
pub mod material;
pub mod model;
pub mod shader;
pub mod shp1;
pub mod skinning;
pub mod string_table;
pub mod types;
pub mod vtx1;

// Re-export common types
pub use chunk::{ChunkId, ContainerHeader, TagInfo};
pub use error::{DecodeDiagnostics, Diagnostic, J3dError, Result};
pub use inf1::{HierarchyNode, NodeKind};
pub use jnt1::{Skeleton, SkeletonJoint};
pub use material::MaterialState;
pub use model::{J3dModel, MaterialBatch, ModelStats, ShapeMesh};
pub use shader::{ShaderOptions, ShaderSource, generate_shader};
pub use skinning::{SkinFrame, SkinningMode, SkinningOptions, SkinningResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
