//! VTX1: shared vertex attribute arrays
//!
//! The section starts with an offset to a list of attribute formats followed
//! by one array offset per attribute slot. Arrays are packed back to back, so
//! an array's byte length is the distance to the next array (or the tag end).

use binrw::BinRead;
use glam::{Vec2, Vec3, Vec4};
use log::{debug, trace, warn};

use crate::chunk::{Tag, TagReader};
use crate::error::Result;

/// Number of array offset slots after the format offset
pub const ARRAY_SLOT_COUNT: usize = 13;

/// GX vertex attribute ids as used in VTX1 formats and SHP1 layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    PositionMatrixIndex,
    TexMatrixIndex(u8),
    Position,
    Normal,
    Color(u8),
    TexCoord(u8),
    NormalBinormalTangent,
    Null,
    Unknown(u32),
}

impl VertexAttribute {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::PositionMatrixIndex,
            1..=8 => Self::TexMatrixIndex((raw - 1) as u8),
            9 => Self::Position,
            10 => Self::Normal,
            11 | 12 => Self::Color((raw - 11) as u8),
            13..=20 => Self::TexCoord((raw - 13) as u8),
            25 => Self::NormalBinormalTangent,
            0xFF => Self::Null,
            other => Self::Unknown(other),
        }
    }

    /// Slot in the VTX1 array offset table holding this attribute's data
    pub fn array_slot(&self) -> Option<usize> {
        match self {
            Self::Position => Some(0),
            Self::Normal => Some(1),
            Self::NormalBinormalTangent => Some(2),
            Self::Color(n) => Some(3 + *n as usize),
            Self::TexCoord(n) => Some(5 + *n as usize),
            _ => None,
        }
    }
}

/// One entry of the VTX1 format list
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct VertexFormat {
    pub attribute: u32,
    pub component_count: u32,
    pub component_type: u32,
    #[br(pad_after = 3)]
    pub frac_shift: u8,
}

impl VertexFormat {
    pub fn attribute(&self) -> VertexAttribute {
        VertexAttribute::from_raw(self.attribute)
    }

    fn scale(&self) -> f32 {
        1.0 / (1u32 << (self.frac_shift.min(31) as u32)) as f32
    }

    /// Size in bytes of a single scalar component, `None` for unknown types
    fn scalar_size(&self) -> Option<usize> {
        match self.component_type {
            0 | 1 => Some(1),
            2 | 3 => Some(2),
            4 => Some(4),
            _ => None,
        }
    }

    /// Size in bytes of a packed color, `None` for unknown types
    fn color_size(&self) -> Option<usize> {
        match self.component_type {
            0 | 3 => Some(2),
            1 | 4 => Some(3),
            2 | 5 => Some(4),
            _ => None,
        }
    }

    /// Number of scalar components per element for this attribute
    fn components(&self) -> usize {
        match (self.attribute(), self.component_count) {
            (VertexAttribute::Position, 0) => 2,
            (VertexAttribute::Position, _) => 3,
            (VertexAttribute::Normal, _) => 3,
            (VertexAttribute::TexCoord(_), 0) => 1,
            (VertexAttribute::TexCoord(_), _) => 2,
            _ => 0,
        }
    }
}

/// Decoded vertex attribute arrays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexArrays {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: [Vec<Vec4>; 2],
    pub tex_coords: [Vec<Vec2>; 8],
}

/// Decoded VTX1 section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vtx1 {
    pub formats: Vec<VertexFormat>,
    pub arrays: VertexArrays,
}

impl Vtx1 {
    pub fn parse(tag: &Tag<'_>) -> Result<Self> {
        let mut reader = tag.reader();
        let format_offset: u32 = reader.read_be()?;
        let offsets: Vec<u32> = reader.read_vec(ARRAY_SLOT_COUNT)?;

        reader.seek(format_offset as u64)?;
        let mut formats = Vec::new();
        loop {
            let format: VertexFormat = reader.read_be()?;
            if format.attribute() == VertexAttribute::Null {
                break;
            }
            formats.push(format);
        }

        let mut arrays = VertexArrays::default();
        for format in &formats {
            let Some(slot) = format.attribute().array_slot() else {
                trace!("VTX1: attribute {:?} has no array", format.attribute());
                continue;
            };
            let start = offsets[slot] as u64;
            if start == 0 {
                continue;
            }
            let end = array_end(&offsets, start, reader.len());
            decode_array(&mut reader, format, start, end, &mut arrays)?;
        }

        debug!(
            "VTX1: {} formats, {} positions, {} normals",
            formats.len(),
            arrays.positions.len(),
            arrays.normals.len()
        );
        Ok(Self { formats, arrays })
    }
}

/// End of an array: the closest array starting after it, or the tag end
fn array_end(offsets: &[u32], start: u64, tag_len: u64) -> u64 {
    offsets
        .iter()
        .map(|&o| o as u64)
        .filter(|&o| o > start)
        .min()
        .unwrap_or(tag_len)
        .min(tag_len)
}

fn decode_array(
    reader: &mut TagReader<'_>,
    format: &VertexFormat,
    start: u64,
    end: u64,
    arrays: &mut VertexArrays,
) -> Result<()> {
    let byte_len = end.saturating_sub(start) as usize;
    reader.seek(start)?;

    match format.attribute() {
        VertexAttribute::Color(n) => {
            let Some(size) = format.color_size() else {
                warn!("VTX1: unknown color type {}", format.component_type);
                return Ok(());
            };
            let count = byte_len / size;
            let colors = (0..count)
                .map(|_| read_color(reader, format.component_type))
                .collect::<Result<Vec<_>>>()?;
            arrays.colors[n as usize & 1] = colors;
        }
        VertexAttribute::NormalBinormalTangent => {
            debug!("VTX1: skipping NBT array ({} bytes)", byte_len);
        }
        attribute => {
            let Some(size) = format.scalar_size() else {
                warn!(
                    "VTX1: unknown component type {} for {:?}",
                    format.component_type, attribute
                );
                return Ok(());
            };
            let components = format.components();
            if components == 0 {
                return Ok(());
            }
            let count = byte_len / (size * components);
            let scale = format.scale();
            let mut values = Vec::with_capacity(count * components);
            for _ in 0..count * components {
                values.push(read_scalar(reader, format.component_type, scale)?);
            }

            match attribute {
                VertexAttribute::Position => {
                    arrays.positions = values
                        .chunks_exact(components)
                        .map(|c| Vec3::new(c[0], c[1], c.get(2).copied().unwrap_or(0.0)))
                        .collect();
                }
                VertexAttribute::Normal => {
                    arrays.normals = values
                        .chunks_exact(3)
                        .map(|c| Vec3::new(c[0], c[1], c[2]))
                        .collect();
                }
                VertexAttribute::TexCoord(n) => {
                    arrays.tex_coords[n as usize & 7] = values
                        .chunks_exact(components)
                        .map(|c| Vec2::new(c[0], c.get(1).copied().unwrap_or(0.0)))
                        .collect();
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn read_scalar(reader: &mut TagReader<'_>, component_type: u32, scale: f32) -> Result<f32> {
    Ok(match component_type {
        0 => reader.read_be::<u8>()? as f32 * scale,
        1 => reader.read_be::<i8>()? as f32 * scale,
        2 => reader.read_be::<u16>()? as f32 * scale,
        3 => reader.read_be::<i16>()? as f32 * scale,
        _ => reader.read_be::<f32>()?,
    })
}

fn read_color(reader: &mut TagReader<'_>, color_type: u32) -> Result<Vec4> {
    let unit = |v: u32, max: u32| v as f32 / max as f32;
    Ok(match color_type {
        // RGB565
        0 => {
            let v = reader.read_be::<u16>()? as u32;
            Vec4::new(
                unit((v >> 11) & 0x1F, 31),
                unit((v >> 5) & 0x3F, 63),
                unit(v & 0x1F, 31),
                1.0,
            )
        }
        // RGB8
        1 => {
            let [r, g, b]: [u8; 3] = reader.read_be()?;
            Vec4::new(unit(r as u32, 255), unit(g as u32, 255), unit(b as u32, 255), 1.0)
        }
        // RGBX8
        2 => {
            let [r, g, b, _]: [u8; 4] = reader.read_be()?;
            Vec4::new(unit(r as u32, 255), unit(g as u32, 255), unit(b as u32, 255), 1.0)
        }
        // RGBA4
        3 => {
            let v = reader.read_be::<u16>()? as u32;
            Vec4::new(
                unit((v >> 12) & 0xF, 15),
                unit((v >> 8) & 0xF, 15),
                unit((v >> 4) & 0xF, 15),
                unit(v & 0xF, 15),
            )
        }
        // RGBA6
        4 => {
            let [a, b, c]: [u8; 3] = reader.read_be()?;
            let v = ((a as u32) << 16) | ((b as u32) << 8) | c as u32;
            Vec4::new(
                unit((v >> 18) & 0x3F, 63),
                unit((v >> 12) & 0x3F, 63),
                unit((v >> 6) & 0x3F, 63),
                unit(v & 0x3F, 63),
            )
        }
        // RGBA8
        _ => {
            let [r, g, b, a]: [u8; 4] = reader.read_be()?;
            Vec4::new(
                unit(r as u32, 255),
                unit(g as u32, 255),
                unit(b as u32, 255),
                unit(a as u32, 255),
            )
        }
    })
}
