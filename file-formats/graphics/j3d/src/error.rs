use std::fmt;
use std::io;
use thiserror::Error;

/// Error types for J3D container decoding, skinning and shader generation
#[derive(Error, Debug)]
pub enum J3dError {
    /// I/O Error during reading
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A fixed-layout record could not be read
    #[error("Binary read error: {0}")]
    Binary(#[from] binrw::Error),

    /// Invalid magic number in the container header
    #[error("Invalid magic number: expected '{expected}', got '{actual}'")]
    InvalidMagic { expected: String, actual: String },

    /// A tag claims bytes past the end of the container
    #[error(
        "Truncated stream: tag '{tag}' at offset {offset:#x} claims {size} bytes but only {available} remain"
    )]
    TruncatedStream {
        tag: String,
        offset: u64,
        size: i64,
        available: u64,
    },

    /// A tag declares a size smaller than its own header
    #[error("Invalid tag size {size} for tag '{tag}'")]
    InvalidTagSize { tag: String, size: i32 },

    /// The INF1 hierarchy stream is malformed
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// A joint ancestor chain or traversal does not terminate
    #[error("Cyclic hierarchy: traversal depth {depth} exceeds limit {limit}")]
    CyclicHierarchy { depth: usize, limit: usize },

    /// An envelope lists more bone influences than can be represented
    #[error("Envelope {envelope} has {count} bone influences (maximum is 4)")]
    TooManyInfluences { envelope: usize, count: usize },

    /// A packet matrix-table sentinel could not be backfilled
    #[error("Unresolvable bone index: shape {shape}, packet {packet}, slot {slot}")]
    UnresolvableBoneIndex {
        shape: usize,
        packet: usize,
        slot: usize,
    },

    /// An index points outside the table it addresses
    #[error("Index out of range: {what} index {index} (length {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Shader source could not be generated for a material
    #[error("Shader generation failed: {0}")]
    ShaderGeneration(String),

    /// Writing generated source text failed
    #[error("Formatting error: {0}")]
    Fmt(#[from] fmt::Error),
}

impl J3dError {
    pub(crate) fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { what, index, len }
    }
}

/// Result type using J3dError
pub type Result<T> = std::result::Result<T, J3dError>;

/// A non-fatal condition met while decoding
///
/// These never abort a decode; the affected element contributes partial or
/// empty output instead.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Diagnostic {
    /// A tag with an identifier no decoder handles
    UnknownTag { id: String, offset: u64 },
    /// A primitive type other than triangles, strips or fans
    UnsupportedTopology {
        shape: usize,
        packet: usize,
        opcode: u8,
    },
    /// A shape attribute using an index encoding with no known byte width
    UnsupportedAttributeEncoding {
        shape: usize,
        attribute: u32,
        encoding: u32,
    },
    /// Triangles dropped because two corners were the same vertex
    DegenerateTriangles {
        shape: usize,
        packet: usize,
        count: usize,
    },
    /// A matrix-table sentinel with no earlier value, not used by any vertex
    UnresolvedSentinel {
        shape: usize,
        packet: usize,
        slot: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTag { id, offset } => {
                write!(f, "skipped unknown tag '{id}' at {offset:#x}")
            }
            Self::UnsupportedTopology {
                shape,
                packet,
                opcode,
            } => write!(
                f,
                "shape {shape} packet {packet}: unsupported primitive {opcode:#04x}"
            ),
            Self::UnsupportedAttributeEncoding {
                shape,
                attribute,
                encoding,
            } => write!(
                f,
                "shape {shape}: attribute {attribute} uses unsupported encoding {encoding}"
            ),
            Self::DegenerateTriangles {
                shape,
                packet,
                count,
            } => write!(
                f,
                "shape {shape} packet {packet}: dropped {count} degenerate triangles"
            ),
            Self::UnresolvedSentinel {
                shape,
                packet,
                slot,
            } => write!(
                f,
                "shape {shape} packet {packet}: unused slot {slot} has no earlier matrix"
            ),
        }
    }
}

/// Non-fatal conditions collected while decoding one model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeDiagnostics {
    entries: Vec<Diagnostic>,
}

impl DecodeDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of degenerate triangles dropped
    pub fn degenerate_triangles(&self) -> usize {
        self.entries
            .iter()
            .map(|d| match d {
                Diagnostic::DegenerateTriangles { count, .. } => *count,
                _ => 0,
            })
            .sum()
    }
}
