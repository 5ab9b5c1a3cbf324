//! Container header and tag walking for J3D files
//!
//! A J3D container is a 32-byte header followed by `tag_count` sections. Each
//! section starts with a 4-byte identifier and a signed 32-bit size that
//! includes the 8-byte tag header itself. All offsets stored inside a section
//! are relative to the first byte of its tag header.

use std::fmt;
use std::io::Cursor;

use binrw::{BinRead, BinReaderExt};
use log::{debug, trace};

use crate::error::{J3dError, Result};

/// A 4-byte tag identifier such as `INF1` or `SHP1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinRead)]
pub struct ChunkId(pub [u8; 4]);

impl ChunkId {
    pub const INF1: Self = Self(*b"INF1");
    pub const VTX1: Self = Self(*b"VTX1");
    pub const EVP1: Self = Self(*b"EVP1");
    pub const DRW1: Self = Self(*b"DRW1");
    pub const JNT1: Self = Self(*b"JNT1");
    pub const SHP1: Self = Self(*b"SHP1");
    pub const MAT3: Self = Self(*b"MAT3");
    pub const MAT2: Self = Self(*b"MAT2");
    pub const TEX1: Self = Self(*b"TEX1");
    pub const MDL3: Self = Self(*b"MDL3");

    /// Get the identifier as a printable string
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

/// The fixed 32-byte container header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct ContainerHeader {
    /// `J3D2` for every retail asset, `J3D1` for some early tools
    pub magic: [u8; 4],
    /// Model flavour: `bmd3`, `bdl4`, ...
    pub sub_magic: [u8; 4],
    /// Declared size of the whole container in bytes
    pub total_size: u32,
    /// Number of tagged sections that follow the header
    pub tag_count: u32,
    /// Unused `SVR3` block
    pub reserved: [u8; 16],
}

impl ContainerHeader {
    /// Size of the header in bytes
    pub const SIZE: u64 = 0x20;

    /// Read and validate the header from the start of a container
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = Cursor::new(data).read_be::<Self>()?;
        if &header.magic != b"J3D2" && &header.magic != b"J3D1" {
            return Err(J3dError::InvalidMagic {
                expected: "J3D2".to_string(),
                actual: String::from_utf8_lossy(&header.magic).into_owned(),
            });
        }
        Ok(header)
    }

    /// Model flavour as a string
    pub fn sub_magic_str(&self) -> String {
        String::from_utf8_lossy(&self.sub_magic).into_owned()
    }
}

/// Header at the start of every tag
#[derive(Debug, Clone, Copy, BinRead)]
#[br(big)]
pub struct TagHeader {
    pub id: ChunkId,
    /// Size of the tag including this header
    pub size: i32,
}

impl TagHeader {
    pub const SIZE: u64 = 8;
}

/// Location of a tag that was walked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagInfo {
    pub id: ChunkId,
    /// Absolute offset of the tag header in the container
    pub offset: u64,
    /// Size of the tag including its header
    pub size: u32,
}

/// A single tag handed to a decoder
#[derive(Debug, Clone, Copy)]
pub struct Tag<'a> {
    pub id: ChunkId,
    pub offset: u64,
    /// Tag bytes starting at the tag header
    pub data: &'a [u8],
}

impl<'a> Tag<'a> {
    /// Create a reader positioned just after the tag header
    pub fn reader(&self) -> TagReader<'a> {
        TagReader::new(self.id, self.data)
    }
}

/// Cursor over the bytes of a single tag
///
/// Positions are tag-relative, matching the offsets stored in section headers.
#[derive(Debug, Clone)]
pub struct TagReader<'a> {
    id: ChunkId,
    cursor: Cursor<&'a [u8]>,
}

impl<'a> TagReader<'a> {
    /// Create a reader over tag bytes; the cursor starts past the tag header
    pub fn new(id: ChunkId, data: &'a [u8]) -> Self {
        let mut cursor = Cursor::new(data);
        cursor.set_position(TagHeader::SIZE.min(data.len() as u64));
        Self { id, cursor }
    }

    /// Tag this reader walks
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Length of the tag in bytes
    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    /// Current tag-relative position
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Move to a tag-relative offset
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.len() {
            return Err(J3dError::out_of_range(
                "tag offset",
                offset as usize,
                self.len() as usize,
            ));
        }
        self.cursor.set_position(offset);
        Ok(())
    }

    /// Read one big-endian value
    pub fn read_be<T>(&mut self) -> Result<T>
    where
        T: BinRead,
        for<'b> <T as BinRead>::Args<'b>: Default,
    {
        Ok(self.cursor.read_be()?)
    }

    /// Read `count` consecutive big-endian values
    pub fn read_vec<T>(&mut self, count: usize) -> Result<Vec<T>>
    where
        T: BinRead,
        for<'b> <T as BinRead>::Args<'b>: Default,
    {
        let mut items = Vec::with_capacity(count.min(0x10000));
        for _ in 0..count {
            items.push(self.read_be()?);
        }
        Ok(items)
    }

    /// Read `count` values starting at a tag-relative offset
    pub fn read_vec_at<T>(&mut self, offset: u64, count: usize) -> Result<Vec<T>>
    where
        T: BinRead,
        for<'b> <T as BinRead>::Args<'b>: Default,
    {
        self.seek(offset)?;
        self.read_vec(count)
    }
}

/// Walk every tag of a container, handing each one to `visit`
///
/// The stream is repositioned to `tag_start + tag_size` after each visit no
/// matter how much the visitor consumed. A tag extending past the declared
/// container size (or the buffer) fails with [`J3dError::TruncatedStream`]
/// and stops the walk.
pub fn walk_tags<'a, F>(
    data: &'a [u8],
    header: &ContainerHeader,
    mut visit: F,
) -> Result<Vec<TagInfo>>
where
    F: FnMut(Tag<'a>) -> Result<()>,
{
    let limit = (header.total_size as u64).min(data.len() as u64);
    let mut cursor = Cursor::new(data);
    cursor.set_position(ContainerHeader::SIZE);

    let mut tags = Vec::with_capacity(header.tag_count as usize);
    for index in 0..header.tag_count {
        let tag_start = cursor.position();
        if tag_start + TagHeader::SIZE > limit {
            return Err(J3dError::TruncatedStream {
                tag: format!("#{index}"),
                offset: tag_start,
                size: TagHeader::SIZE as i64,
                available: limit.saturating_sub(tag_start),
            });
        }

        let tag_header: TagHeader = cursor.read_be()?;
        if (tag_header.size as i64) < TagHeader::SIZE as i64 {
            return Err(J3dError::InvalidTagSize {
                tag: tag_header.id.as_string(),
                size: tag_header.size,
            });
        }

        let tag_end = tag_start + tag_header.size as u64;
        if tag_end > limit {
            return Err(J3dError::TruncatedStream {
                tag: tag_header.id.as_string(),
                offset: tag_start,
                size: tag_header.size as i64,
                available: limit - tag_start,
            });
        }

        trace!(
            "Tag {} at {:#x}, {} bytes",
            tag_header.id, tag_start, tag_header.size
        );

        visit(Tag {
            id: tag_header.id,
            offset: tag_start,
            data: &data[tag_start as usize..tag_end as usize],
        })?;

        tags.push(TagInfo {
            id: tag_header.id,
            offset: tag_start,
            size: tag_header.size as u32,
        });

        // Decoders seek around freely, so always resume at the tag boundary.
        cursor.set_position(tag_end);
    }

    debug!("Walked {} tags", tags.len());
    Ok(tags)
}
