//! Shape attribute layouts

use log::warn;

use crate::chunk::TagReader;
use crate::error::Result;
use crate::vtx1::VertexAttribute;

/// How an attribute's per-vertex value is stored in the primitive stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEncoding {
    /// Attribute not present in the stream
    None,
    /// Value stored inline as one byte
    Direct,
    /// One-byte array index
    Index8,
    /// Two-byte array index
    Index16,
    Unsupported(u32),
}

impl IndexEncoding {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Direct,
            2 => Self::Index8,
            3 => Self::Index16,
            other => Self::Unsupported(other),
        }
    }

    /// Bytes consumed per vertex
    pub fn byte_width(&self) -> usize {
        match self {
            Self::Direct | Self::Index8 => 1,
            Self::Index16 => 2,
            Self::None | Self::Unsupported(_) => 0,
        }
    }
}

/// One `(semantic, encoding)` entry of a shape's layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeAttribute {
    pub attribute: VertexAttribute,
    pub raw_attribute: u32,
    pub encoding: IndexEncoding,
}

impl ShapeAttribute {
    /// Whether this attribute produces an output vertex stream
    ///
    /// The raw position-matrix index only selects a skin slot.
    pub fn is_output(&self) -> bool {
        !matches!(
            self.attribute,
            VertexAttribute::PositionMatrixIndex
                | VertexAttribute::TexMatrixIndex(_)
                | VertexAttribute::Unknown(_)
        )
    }
}

/// Read an attribute list terminated by the null attribute
pub fn read_attribute_list(reader: &mut TagReader<'_>, offset: u64) -> Result<Vec<ShapeAttribute>> {
    reader.seek(offset)?;
    let mut attributes = Vec::new();
    loop {
        let raw_attribute: u32 = reader.read_be()?;
        let raw_encoding: u32 = reader.read_be()?;
        let attribute = VertexAttribute::from_raw(raw_attribute);
        if attribute == VertexAttribute::Null {
            break;
        }

        let encoding = IndexEncoding::from_raw(raw_encoding);
        if let IndexEncoding::Unsupported(raw) = encoding {
            warn!(
                "SHP1: attribute {:?} uses unsupported encoding {}",
                attribute, raw
            );
        }
        attributes.push(ShapeAttribute {
            attribute,
            raw_attribute,
            encoding,
        });
    }
    Ok(attributes)
}
