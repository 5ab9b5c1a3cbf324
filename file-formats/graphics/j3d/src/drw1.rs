//! DRW1: draw matrix table
//!
//! Maps every skin slot either to a single joint or to an EVP1 envelope.

use log::debug;

use crate::chunk::Tag;
use crate::error::{J3dError, Result};

/// What a skin slot resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMatrix {
    /// Rigidly attached to one joint
    Joint(u16),
    /// Blended through an envelope
    Envelope(u16),
}

/// Decoded DRW1 section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drw1 {
    /// Partially-weighted flag per slot
    pub weighted: Vec<bool>,
    /// Envelope index for weighted slots, joint index otherwise
    pub indices: Vec<u16>,
}

impl Drw1 {
    pub fn parse(tag: &Tag<'_>) -> Result<Self> {
        let mut reader = tag.reader();
        let count: u16 = reader.read_be()?;
        let _padding: u16 = reader.read_be()?;
        let weighted_offset: u32 = reader.read_be()?;
        let index_offset: u32 = reader.read_be()?;

        let weighted = reader
            .read_vec_at::<u8>(weighted_offset as u64, count as usize)?
            .into_iter()
            .map(|flag| flag != 0)
            .collect();
        let indices = reader.read_vec_at(index_offset as u64, count as usize)?;

        debug!("DRW1: {} slots", count);
        Ok(Self { weighted, indices })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, slot: usize) -> Result<DrawMatrix> {
        let index = *self
            .indices
            .get(slot)
            .ok_or_else(|| J3dError::out_of_range("DRW1 slot", slot, self.indices.len()))?;
        Ok(if self.weighted.get(slot).copied().unwrap_or(false) {
            DrawMatrix::Envelope(index)
        } else {
            DrawMatrix::Joint(index)
        })
    }

    /// Number of slots that blend through envelopes
    pub fn weighted_count(&self) -> usize {
        self.weighted.iter().filter(|&&w| w).count()
    }
}
