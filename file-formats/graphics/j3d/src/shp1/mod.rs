//! SHP1: shapes, packets and primitive streams
//!
//! A shape is a draw call split into packets. Every packet carries a small
//! matrix table mapping packet-local skin slots to DRW1 slots, plus a byte
//! range of primitive commands. A table entry of `0xFFFF` means "same as the
//! last packet that set this slot".

pub mod attribute;
pub mod primitive;

use binrw::BinRead;
use log::{debug, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub use attribute::{IndexEncoding, ShapeAttribute};
pub use primitive::{MeshVertexIndex, PrimitiveType, Triangulation, triangulate};

use crate::chunk::{Tag, TagReader};
use crate::error::{DecodeDiagnostics, Diagnostic, J3dError, Result};
use crate::types::BoundingBox;

/// Matrix table value meaning "inherit from an earlier packet"
pub const MATRIX_SENTINEL: u16 = 0xFFFF;

/// Size of one shape record
pub const SHAPE_RECORD_SIZE: u64 = 0x28;

/// Offsets in the SHP1 header, all tag-relative
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct Shp1Header {
    pub shape_count: u16,
    _padding: u16,
    pub shape_offset: u32,
    pub remap_offset: u32,
    pub name_offset: u32,
    pub attribute_offset: u32,
    pub matrix_table_offset: u32,
    pub primitive_offset: u32,
    pub matrix_data_offset: u32,
    pub packet_offset: u32,
}

/// Raw shape record
#[derive(Debug, Clone, Copy, PartialEq, BinRead)]
#[br(big)]
pub struct ShapeRecord {
    pub matrix_type: u8,
    _padding: u8,
    pub packet_count: u16,
    /// Relative to the attribute list offset
    pub attribute_offset: u16,
    pub first_matrix_data: u16,
    pub first_packet: u16,
    _padding2: u16,
    pub bounding_radius: f32,
    pub bounding_box: BoundingBox,
}

/// A packet (matrix group) of a shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub current_matrix: u16,
    /// Packet-local skin slot to DRW1 slot
    pub matrix_table: Vec<u16>,
    /// Triangle-list vertices
    pub vertices: Vec<MeshVertexIndex>,
}

impl Packet {
    /// DRW1 slot for a packet-local skin slot
    pub fn draw_slot(&self, skin_slot: usize) -> Option<u16> {
        self.matrix_table
            .get(skin_slot)
            .copied()
            .filter(|&slot| slot != MATRIX_SENTINEL)
    }
}

/// A decoded shape
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub matrix_type: u8,
    pub bounding_radius: f32,
    pub bounding_box: BoundingBox,
    pub attributes: Vec<ShapeAttribute>,
    pub packets: Vec<Packet>,
}

impl Shape {
    /// Attributes that produce vertex streams
    pub fn output_attributes(&self) -> impl Iterator<Item = &ShapeAttribute> {
        self.attributes.iter().filter(|a| a.is_output())
    }

    pub fn vertex_count(&self) -> usize {
        self.packets.iter().map(|p| p.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }

    /// Replace sentinel matrix-table entries with the value from the nearest
    /// earlier packet that sets the same slot
    ///
    /// A sentinel left over afterwards is only fatal when a vertex of its
    /// packet actually uses the slot.
    pub fn resolve_sentinels(
        &mut self,
        shape_index: usize,
        diagnostics: &mut DecodeDiagnostics,
    ) -> Result<()> {
        for p in 0..self.packets.len() {
            let (earlier, rest) = self.packets.split_at_mut(p);
            let packet = &mut rest[0];

            for (slot, entry) in packet.matrix_table.iter_mut().enumerate() {
                if *entry != MATRIX_SENTINEL {
                    continue;
                }
                if let Some(value) = earlier
                    .iter()
                    .rev()
                    .filter_map(|e| e.matrix_table.get(slot).copied())
                    .find(|&v| v != MATRIX_SENTINEL)
                {
                    *entry = value;
                }
            }

            for (slot, &entry) in packet.matrix_table.iter().enumerate() {
                if entry != MATRIX_SENTINEL {
                    continue;
                }
                if packet.vertices.iter().any(|v| v.skin_slot() == slot) {
                    return Err(J3dError::UnresolvableBoneIndex {
                        shape: shape_index,
                        packet: p,
                        slot,
                    });
                }
                warn!(
                    "SHP1: shape {} packet {} slot {} unresolved but unused",
                    shape_index, p, slot
                );
                diagnostics.push(Diagnostic::UnresolvedSentinel {
                    shape: shape_index,
                    packet: p,
                    slot,
                });
            }
        }
        Ok(())
    }
}

/// Decoded SHP1 section
#[derive(Debug, Clone, PartialEq)]
pub struct Shp1 {
    pub shapes: Vec<Shape>,
    /// Hierarchy value to shape index
    pub remap: Vec<u16>,
}

impl Shp1 {
    /// Decode every shape and resolve matrix-table sentinels
    pub fn parse(tag: &Tag<'_>, diagnostics: &mut DecodeDiagnostics) -> Result<Self> {
        let mut reader = tag.reader();
        let header: Shp1Header = reader.read_be()?;
        let remap: Vec<u16> =
            reader.read_vec_at(header.remap_offset as u64, header.shape_count as usize)?;

        let base = reader;
        let decode = |index: usize| -> Result<(Shape, DecodeDiagnostics)> {
            let mut reader = base.clone();
            let mut local = DecodeDiagnostics::new();
            let mut shape = decode_shape(&mut reader, &header, index, &mut local)?;
            shape.resolve_sentinels(index, &mut local)?;
            Ok((shape, local))
        };

        #[cfg(feature = "parallel")]
        let decoded: Vec<Result<(Shape, DecodeDiagnostics)>> = (0..header.shape_count as usize)
            .into_par_iter()
            .map(decode)
            .collect();
        #[cfg(not(feature = "parallel"))]
        let decoded: Vec<Result<(Shape, DecodeDiagnostics)>> =
            (0..header.shape_count as usize).map(decode).collect();

        let mut shapes = Vec::with_capacity(decoded.len());
        for result in decoded {
            let (shape, local) = result?;
            diagnostics.extend(local);
            shapes.push(shape);
        }

        debug!(
            "SHP1: {} shapes, {} packets, {} vertices",
            shapes.len(),
            shapes.iter().map(|s| s.packets.len()).sum::<usize>(),
            shapes.iter().map(Shape::vertex_count).sum::<usize>()
        );
        Ok(Self { shapes, remap })
    }
}

fn decode_shape(
    reader: &mut TagReader<'_>,
    header: &Shp1Header,
    index: usize,
    diagnostics: &mut DecodeDiagnostics,
) -> Result<Shape> {
    reader.seek(header.shape_offset as u64 + index as u64 * SHAPE_RECORD_SIZE)?;
    let record: ShapeRecord = reader.read_be()?;

    let attributes = attribute::read_attribute_list(
        reader,
        header.attribute_offset as u64 + record.attribute_offset as u64,
    )?;
    for attribute in &attributes {
        if let IndexEncoding::Unsupported(encoding) = attribute.encoding {
            diagnostics.push(Diagnostic::UnsupportedAttributeEncoding {
                shape: index,
                attribute: attribute.raw_attribute,
                encoding,
            });
        }
    }

    let mut packets = Vec::with_capacity(record.packet_count as usize);
    for p in 0..record.packet_count as u64 {
        reader.seek(header.packet_offset as u64 + (record.first_packet as u64 + p) * 8)?;
        let packet_size: u32 = reader.read_be()?;
        let packet_offset: u32 = reader.read_be()?;

        reader.seek(header.matrix_data_offset as u64 + (record.first_matrix_data as u64 + p) * 8)?;
        let current_matrix: u16 = reader.read_be()?;
        let matrix_count: u16 = reader.read_be()?;
        let first_index: u32 = reader.read_be()?;
        let matrix_table: Vec<u16> = reader.read_vec_at(
            header.matrix_table_offset as u64 + first_index as u64 * 2,
            matrix_count as usize,
        )?;

        let decoded = primitive::decode_primitives(
            reader,
            &attributes,
            header.primitive_offset as u64 + packet_offset as u64,
            packet_size as u64,
        )?;

        let packet_index = p as usize;
        if decoded.degenerate > 0 {
            debug!(
                "SHP1: shape {} packet {}: {} degenerate triangles",
                index, packet_index, decoded.degenerate
            );
            diagnostics.push(Diagnostic::DegenerateTriangles {
                shape: index,
                packet: packet_index,
                count: decoded.degenerate,
            });
        }
        for opcode in decoded.unsupported {
            diagnostics.push(Diagnostic::UnsupportedTopology {
                shape: index,
                packet: packet_index,
                opcode,
            });
        }

        packets.push(Packet {
            current_matrix,
            matrix_table,
            vertices: decoded.vertices,
        });
    }

    Ok(Shape {
        matrix_type: record.matrix_type,
        bounding_radius: record.bounding_radius,
        bounding_box: record.bounding_box,
        attributes,
        packets,
    })
}
