//! Skinning resolution
//!
//! Every linked vertex records the DRW1 slot it is bound to. A slot either
//! follows one joint rigidly or blends several joints through an EVP1
//! envelope:
//!
//! ```text
//! rigid:    M = world[joint]
//! weighted: M = Σ weight_i · (world[bone_i] · inverse_bind[bone_i])
//! ```
//!
//! The resolver produces either per-vertex index/weight attributes for GPU
//! skinning, or CPU-skinned positions and normals.
//!
//! The GPU palette holds one `world · inverse_bind` entry per envelope bone,
//! followed by one plain `world` entry per joint for rigid slots. Both modes
//! therefore produce the same deformation.
//!
//! # Example
//!
//! ```rust,no_run
//! use j3d::skinning::{SkinFrame, SkinningOptions, SkinningResolver};
//! use j3d::J3dModel;
//!
//! let mut model = J3dModel::load("path/to/model.bmd")?;
//! let resolver = SkinningResolver::new(SkinningOptions::cpu());
//!
//! if let Some(SkinFrame::Cpu(shapes)) = model.resolve_skinning_if_dirty(&resolver)? {
//!     println!("{} shapes skinned", shapes.len());
//! }
//! # Ok::<(), j3d::J3dError>(())
//! ```

use glam::{Mat4, Vec3};
use log::{debug, trace};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::drw1::{DrawMatrix, Drw1};
use crate::error::{J3dError, Result};
use crate::evp1::{Evp1, MAX_INFLUENCES};
use crate::jnt1::Skeleton;
use crate::model::ShapeMesh;

/// Where skinning happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkinningMode {
    /// Vertices stay static; a matrix palette is produced per frame
    #[default]
    Gpu,
    /// Positions and normals are transformed on the CPU
    Cpu,
}

/// Options for controlling the skinning behavior
#[derive(Debug, Clone)]
pub struct SkinningOptions {
    pub mode: SkinningMode,
    /// Renormalise transformed normals
    pub normalize_normals: bool,
}

impl Default for SkinningOptions {
    fn default() -> Self {
        Self {
            mode: SkinningMode::Gpu,
            normalize_normals: true,
        }
    }
}

impl SkinningOptions {
    pub fn cpu() -> Self {
        Self {
            mode: SkinningMode::Cpu,
            ..Self::default()
        }
    }
}

/// Per-vertex skin attributes for GPU skinning
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinAttributes {
    /// Joint indices, `-1` padded
    pub indices: Vec<[i32; MAX_INFLUENCES]>,
    /// Joint weights, `0` padded
    pub weights: Vec<[f32; MAX_INFLUENCES]>,
    /// Palette index of the first rigid joint entry
    pub rigid_base: i32,
}

impl SkinAttributes {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of vertices bound to a rigid DRW1 slot
    ///
    /// Weighted slots whose envelope has a single influence are not rigid.
    pub fn rigid_count(&self) -> usize {
        self.indices.iter().filter(|i| i[0] >= self.rigid_base).count()
    }

    /// Number of vertices blended through an envelope
    pub fn weighted_count(&self) -> usize {
        self.len() - self.rigid_count()
    }
}

/// CPU-skinned vertex data of one shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinnedShape {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

/// Output of one resolve pass
#[derive(Debug, Clone, PartialEq)]
pub enum SkinFrame {
    /// Matrix palette for [`SkinAttributes`] indices; see
    /// [`SkinningResolver::bone_palette`]
    Gpu(Vec<Mat4>),
    /// Transformed vertices, one entry per shape
    Cpu(Vec<SkinnedShape>),
}

/// Resolves skin slots to blended transforms
#[derive(Debug, Clone, Default)]
pub struct SkinningResolver {
    options: SkinningOptions,
}

impl SkinningResolver {
    pub fn new(options: SkinningOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SkinningOptions {
        &self.options
    }

    /// Index and weight attributes for every vertex of a shape
    ///
    /// Weighted vertices index their envelope bones directly. Rigid vertices
    /// get `(rigid_base + joint, -1, -1, -1)` and `(1, 0, 0, 0)`, where
    /// `rigid_base` is the number of inverse bind matrices.
    pub fn skin_attributes(&self, mesh: &ShapeMesh, drw1: &Drw1, evp1: &Evp1) -> Result<SkinAttributes> {
        let bones = evp1.inverse_bind.len();
        let mut attributes = SkinAttributes {
            indices: Vec::with_capacity(mesh.draw_slots.len()),
            weights: Vec::with_capacity(mesh.draw_slots.len()),
            rigid_base: bones as i32,
        };

        for &slot in &mesh.draw_slots {
            let mut indices = [-1i32; MAX_INFLUENCES];
            let mut weights = [0.0f32; MAX_INFLUENCES];
            match drw1.get(slot as usize)? {
                DrawMatrix::Joint(joint) => {
                    indices[0] = (bones + joint as usize) as i32;
                    weights[0] = 1.0;
                }
                DrawMatrix::Envelope(index) => {
                    let envelope = evp1.envelopes.get(index as usize).ok_or_else(|| {
                        J3dError::out_of_range("envelope", index as usize, evp1.envelopes.len())
                    })?;
                    if envelope.influences.len() > MAX_INFLUENCES {
                        return Err(J3dError::TooManyInfluences {
                            envelope: index as usize,
                            count: envelope.influences.len(),
                        });
                    }
                    for (i, influence) in envelope.influences.iter().enumerate() {
                        let bone = influence.bone as usize;
                        if bone >= bones {
                            return Err(J3dError::out_of_range("inverse bind matrix", bone, bones));
                        }
                        indices[i] = bone as i32;
                        weights[i] = influence.weight;
                    }
                }
            }
            attributes.indices.push(indices);
            attributes.weights.push(weights);
        }

        Ok(attributes)
    }

    /// Blended matrix for every DRW1 slot under the given joint world transforms
    pub fn slot_matrices(&self, world: &[Mat4], drw1: &Drw1, evp1: &Evp1) -> Result<Vec<Mat4>> {
        (0..drw1.len())
            .map(|slot| match drw1.get(slot)? {
                DrawMatrix::Joint(joint) => world
                    .get(joint as usize)
                    .copied()
                    .ok_or_else(|| J3dError::out_of_range("joint", joint as usize, world.len())),
                DrawMatrix::Envelope(envelope) => {
                    let envelope = evp1.envelopes.get(envelope as usize).ok_or_else(|| {
                        J3dError::out_of_range("envelope", envelope as usize, evp1.envelopes.len())
                    })?;
                    envelope
                        .influences
                        .iter()
                        .try_fold(Mat4::ZERO, |acc, influence| -> Result<Mat4> {
                            let bone = influence.bone as usize;
                            let joint = world
                                .get(bone)
                                .ok_or_else(|| J3dError::out_of_range("joint", bone, world.len()))?;
                            let inverse_bind = evp1.inverse_bind.get(bone).ok_or_else(|| {
                                J3dError::out_of_range("inverse bind matrix", bone, evp1.inverse_bind.len())
                            })?;
                            Ok(acc + (*joint * *inverse_bind) * influence.weight)
                        })
                }
            })
            .collect()
    }

    /// Matrix palette for GPU skinning
    ///
    /// Entry `b` is `world[b] · inverse_bind[b]` for every envelope bone.
    /// Entry `inverse_bind.len() + j` is `world[j]`, used by rigid slots.
    pub fn bone_palette(&self, world: &[Mat4], evp1: &Evp1) -> Result<Vec<Mat4>> {
        let mut palette = Vec::with_capacity(evp1.inverse_bind.len() + world.len());
        for (bone, inverse_bind) in evp1.inverse_bind.iter().enumerate() {
            let joint = world
                .get(bone)
                .ok_or_else(|| J3dError::out_of_range("joint", bone, world.len()))?;
            palette.push(*joint * *inverse_bind);
        }
        palette.extend_from_slice(world);
        Ok(palette)
    }

    /// Transform a shape's vertices by its per-slot matrices
    pub fn skin_mesh(&self, mesh: &ShapeMesh, slot_matrices: &[Mat4]) -> Result<SkinnedShape> {
        let matrix_for = |i: usize| -> Result<&Mat4> {
            let slot = mesh.draw_slots.get(i).copied().unwrap_or(0) as usize;
            slot_matrices
                .get(slot)
                .ok_or_else(|| J3dError::out_of_range("DRW1 slot", slot, slot_matrices.len()))
        };
        let normalize = self.options.normalize_normals;

        #[cfg(feature = "parallel")]
        let (positions, normals) = (
            mesh.positions
                .par_iter()
                .enumerate()
                .map(|(i, p)| -> Result<Vec3> { Ok(matrix_for(i)?.transform_point3(*p)) })
                .collect::<Result<Vec<_>>>()?,
            mesh.normals
                .par_iter()
                .enumerate()
                .map(|(i, n)| -> Result<Vec3> { Ok(transform_normal(matrix_for(i)?, *n, normalize)) })
                .collect::<Result<Vec<_>>>()?,
        );
        #[cfg(not(feature = "parallel"))]
        let (positions, normals) = (
            mesh.positions
                .iter()
                .enumerate()
                .map(|(i, p)| -> Result<Vec3> { Ok(matrix_for(i)?.transform_point3(*p)) })
                .collect::<Result<Vec<_>>>()?,
            mesh.normals
                .iter()
                .enumerate()
                .map(|(i, n)| -> Result<Vec3> { Ok(transform_normal(matrix_for(i)?, *n, normalize)) })
                .collect::<Result<Vec<_>>>()?,
        );

        Ok(SkinnedShape { positions, normals })
    }

    /// Run a full resolve pass under the skeleton's current pose
    pub fn resolve(
        &self,
        skeleton: &Skeleton,
        meshes: &[ShapeMesh],
        drw1: &Drw1,
        evp1: &Evp1,
    ) -> Result<SkinFrame> {
        let world = skeleton.world_transforms()?;
        match self.options.mode {
            SkinningMode::Gpu => Ok(SkinFrame::Gpu(self.bone_palette(&world, evp1)?)),
            SkinningMode::Cpu => {
                let slots = self.slot_matrices(&world, drw1, evp1)?;
                let shapes = meshes
                    .iter()
                    .map(|mesh| self.skin_mesh(mesh, &slots))
                    .collect::<Result<Vec<_>>>()?;
                trace!("Skinned {} shapes", shapes.len());
                Ok(SkinFrame::Cpu(shapes))
            }
        }
    }

    /// Resolve only when the pose changed since the last pass
    pub fn resolve_if_dirty(
        &self,
        skeleton: &mut Skeleton,
        meshes: &[ShapeMesh],
        drw1: &Drw1,
        evp1: &Evp1,
    ) -> Result<Option<SkinFrame>> {
        if !skeleton.is_dirty() {
            return Ok(None);
        }
        let frame = self.resolve(skeleton, meshes, drw1, evp1)?;
        skeleton.take_dirty();
        debug!("Skinning resolved for {} joints", skeleton.len());
        Ok(Some(frame))
    }
}

fn transform_normal(matrix: &Mat4, normal: Vec3, normalize: bool) -> Vec3 {
    let n = matrix.transform_vector3(normal);
    if normalize { n.normalize_or_zero() } else { n }
}
