//! Primitive command decoding and topology normalisation

use log::{trace, warn};

use super::attribute::{IndexEncoding, ShapeAttribute};
use crate::chunk::TagReader;
use crate::error::Result;
use crate::vtx1::VertexAttribute;

/// GX primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Quads,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Lines,
    LineStrip,
    Points,
}

impl PrimitiveType {
    /// Decode a command byte; `None` ends the packet
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode & 0xF8 {
            0x80 | 0x88 => Some(Self::Quads),
            0x90 => Some(Self::Triangles),
            0x98 => Some(Self::TriangleStrip),
            0xA0 => Some(Self::TriangleFan),
            0xA8 => Some(Self::Lines),
            0xB0 => Some(Self::LineStrip),
            0xB8 => Some(Self::Points),
            _ => None,
        }
    }
}

/// Per-attribute indices of one decoded vertex; `-1` marks an unused attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshVertexIndex {
    /// Packet-local skin slot (raw position-matrix index / 3)
    pub matrix_slot: i32,
    pub position: i32,
    pub normal: i32,
    pub colors: [i32; 2],
    pub tex_coords: [i32; 8],
}

impl Default for MeshVertexIndex {
    fn default() -> Self {
        Self {
            matrix_slot: -1,
            position: -1,
            normal: -1,
            colors: [-1; 2],
            tex_coords: [-1; 8],
        }
    }
}

impl MeshVertexIndex {
    /// Skin slot this vertex uses; vertices without a matrix index use slot 0
    pub fn skin_slot(&self) -> usize {
        self.matrix_slot.max(0) as usize
    }

    fn assign(&mut self, attribute: VertexAttribute, value: i32) {
        match attribute {
            VertexAttribute::PositionMatrixIndex => self.matrix_slot = value / 3,
            VertexAttribute::Position => self.position = value,
            VertexAttribute::Normal | VertexAttribute::NormalBinormalTangent => self.normal = value,
            VertexAttribute::Color(n) => self.colors[n as usize & 1] = value,
            VertexAttribute::TexCoord(n) => self.tex_coords[n as usize & 7] = value,
            other => trace!("SHP1: ignoring value for {:?}", other),
        }
    }
}

/// Triangle list produced by [`triangulate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triangulation<T> {
    /// Corners, three per triangle
    pub corners: Vec<T>,
    /// Triangles dropped for repeating a corner
    pub degenerate: usize,
}

fn is_degenerate<T: PartialEq>(a: &T, b: &T, c: &T) -> bool {
    a == b || b == c || a == c
}

/// Convert a primitive to a flat triangle list
///
/// Strips alternate winding by vertex parity, starting with `(0, 1, 2)`.
/// Fans emit `(v, v + 1, 0)`. Returns `None` for non-triangle primitives.
pub fn triangulate<T: PartialEq + Clone>(
    kind: PrimitiveType,
    vertices: &[T],
) -> Option<Triangulation<T>> {
    let mut corners = Vec::new();
    let mut degenerate = 0;
    let mut emit = |a: &T, b: &T, c: &T| {
        if is_degenerate(a, b, c) {
            degenerate += 1;
        } else {
            corners.extend([a.clone(), b.clone(), c.clone()]);
        }
    };

    match kind {
        PrimitiveType::Triangles => {
            return Some(Triangulation {
                corners: vertices.to_vec(),
                degenerate: 0,
            });
        }
        PrimitiveType::TriangleStrip => {
            for v in 2..vertices.len() {
                if v % 2 == 0 {
                    emit(&vertices[v - 2], &vertices[v - 1], &vertices[v]);
                } else {
                    emit(&vertices[v - 1], &vertices[v - 2], &vertices[v]);
                }
            }
        }
        PrimitiveType::TriangleFan => {
            for v in 1..vertices.len().saturating_sub(1) {
                emit(&vertices[v], &vertices[v + 1], &vertices[0]);
            }
        }
        _ => return None,
    }

    Some(Triangulation {
        corners,
        degenerate,
    })
}

/// Result of decoding one packet's primitive stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedPrimitives {
    /// Triangle-list vertices
    pub vertices: Vec<MeshVertexIndex>,
    pub degenerate: usize,
    /// Opcodes of primitives that produced no triangles
    pub unsupported: Vec<u8>,
}

/// Decode primitive commands from `start` until `size` bytes are consumed or
/// a zero/invalid command byte is met
pub fn decode_primitives(
    reader: &mut TagReader<'_>,
    attributes: &[ShapeAttribute],
    start: u64,
    size: u64,
) -> Result<DecodedPrimitives> {
    reader.seek(start)?;
    let end = (start + size).min(reader.len());
    let mut out = DecodedPrimitives::default();

    while reader.position() < end {
        let opcode: u8 = reader.read_be()?;
        let Some(kind) = PrimitiveType::from_opcode(opcode) else {
            break;
        };
        let count: u16 = reader.read_be()?;

        let mut vertices = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut vertex = MeshVertexIndex::default();
            for attribute in attributes {
                let value = match attribute.encoding {
                    IndexEncoding::Direct | IndexEncoding::Index8 => reader.read_be::<u8>()? as i32,
                    IndexEncoding::Index16 => reader.read_be::<u16>()? as i32,
                    IndexEncoding::None | IndexEncoding::Unsupported(_) => continue,
                };
                vertex.assign(attribute.attribute, value);
            }
            vertices.push(vertex);
        }

        match triangulate(kind, &vertices) {
            Some(triangles) => {
                out.degenerate += triangles.degenerate;
                out.vertices.extend(triangles.corners);
            }
            None => {
                warn!("SHP1: unsupported primitive {:?} ({} vertices)", kind, count);
                out.unsupported.push(opcode);
            }
        }
    }

    Ok(out)
}
