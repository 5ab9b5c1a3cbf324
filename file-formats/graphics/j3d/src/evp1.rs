//! EVP1: skinning envelopes and inverse bind matrices

use binrw::BinRead;
use glam::{Mat4, Vec4};
use log::debug;

use crate::chunk::Tag;
use crate::error::{J3dError, Result};

/// Maximum number of bones a vertex can be weighted to
pub const MAX_INFLUENCES: usize = 4;

/// One bone contributing to an envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneInfluence {
    pub bone: u16,
    pub weight: f32,
}

/// Weighted list of bones influencing a vertex
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub influences: Vec<BoneInfluence>,
}

impl Envelope {
    pub fn total_weight(&self) -> f32 {
        self.influences.iter().map(|i| i.weight).sum()
    }
}

/// A 3x4 row-major matrix as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, BinRead)]
#[br(big)]
pub struct Matrix3x4 {
    pub rows: [[f32; 4]; 3],
}

impl Matrix3x4 {
    /// Expand to an affine column-major matrix
    pub fn to_mat4(&self) -> Mat4 {
        let [r0, r1, r2] = self.rows;
        Mat4::from_cols(
            Vec4::new(r0[0], r1[0], r2[0], 0.0),
            Vec4::new(r0[1], r1[1], r2[1], 0.0),
            Vec4::new(r0[2], r1[2], r2[2], 0.0),
            Vec4::new(r0[3], r1[3], r2[3], 1.0),
        )
    }
}

/// Decoded EVP1 section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evp1 {
    pub envelopes: Vec<Envelope>,
    /// Inverse bind pose per joint, covering every joint up to the highest
    /// one referenced by an envelope
    pub inverse_bind: Vec<Mat4>,
}

impl Evp1 {
    pub fn parse(tag: &Tag<'_>) -> Result<Self> {
        let mut reader = tag.reader();
        let envelope_count: u16 = reader.read_be()?;
        let _padding: u16 = reader.read_be()?;
        let bone_count_offset: u32 = reader.read_be()?;
        let index_offset: u32 = reader.read_be()?;
        let weight_offset: u32 = reader.read_be()?;
        let inverse_bind_offset: u32 = reader.read_be()?;

        let counts: Vec<u8> =
            reader.read_vec_at(bone_count_offset as u64, envelope_count as usize)?;
        for (envelope, &count) in counts.iter().enumerate() {
            if count as usize > MAX_INFLUENCES {
                return Err(J3dError::TooManyInfluences {
                    envelope,
                    count: count as usize,
                });
            }
        }

        let total: usize = counts.iter().map(|&c| c as usize).sum();
        let bones: Vec<u16> = reader.read_vec_at(index_offset as u64, total)?;
        let weights: Vec<f32> = reader.read_vec_at(weight_offset as u64, total)?;

        let mut pairs = bones.iter().zip(&weights);
        let envelopes: Vec<Envelope> = counts
            .iter()
            .map(|&count| Envelope {
                influences: pairs
                    .by_ref()
                    .take(count as usize)
                    .map(|(&bone, &weight)| BoneInfluence { bone, weight })
                    .collect(),
            })
            .collect();

        let matrix_count = bones.iter().map(|&b| b as usize + 1).max().unwrap_or(0);
        let inverse_bind = if matrix_count > 0 {
            reader
                .read_vec_at::<Matrix3x4>(inverse_bind_offset as u64, matrix_count)?
                .iter()
                .map(Matrix3x4::to_mat4)
                .collect()
        } else {
            Vec::new()
        };

        debug!(
            "EVP1: {} envelopes, {} inverse bind matrices",
            envelopes.len(),
            inverse_bind.len()
        );
        Ok(Self {
            envelopes,
            inverse_bind,
        })
    }
}
