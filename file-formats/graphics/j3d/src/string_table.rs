//! Name tables used by JNT1 and MAT3
//!
//! Layout: `count: u16`, `pad: u16`, then `count` entries of
//! `(hash: u16, offset: u16)` where `offset` is relative to the table start and
//! points at a null-terminated string.

use log::trace;

use crate::chunk::TagReader;
use crate::error::Result;

/// Hash stored beside every name (`hash = hash * 3 + byte`)
pub fn name_hash(name: &str) -> u16 {
    name.bytes()
        .fold(0u16, |hash, b| hash.wrapping_mul(3).wrapping_add(b as u16))
}

/// Read a name table starting at a tag-relative offset
pub fn read_name_table(reader: &mut TagReader<'_>, table_offset: u64) -> Result<Vec<String>> {
    reader.seek(table_offset)?;
    let count: u16 = reader.read_be()?;
    let _padding: u16 = reader.read_be()?;

    let entries: Vec<(u16, u16)> = (0..count)
        .map(|_| -> Result<(u16, u16)> { Ok((reader.read_be()?, reader.read_be()?)) })
        .collect::<Result<_>>()?;

    let mut names = Vec::with_capacity(entries.len());
    for (hash, offset) in entries {
        let name = read_c_string(reader, table_offset + offset as u64)?;
        if name_hash(&name) != hash {
            trace!("Name '{}' hash mismatch (stored {:#06x})", name, hash);
        }
        names.push(name);
    }
    Ok(names)
}

fn read_c_string(reader: &mut TagReader<'_>, offset: u64) -> Result<String> {
    reader.seek(offset)?;
    let mut bytes = Vec::new();
    while reader.position() < reader.len() {
        let b: u8 = reader.read_be()?;
        if b == 0 {
            break;
        }
        bytes.push(b);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chunk::ChunkId;

    /// Encode a name table the way the section writers lay it out
    pub(crate) fn encode_name_table(names: &[&str]) -> Vec<u8> {
        let mut header = Vec::new();
        header.extend_from_slice(&(names.len() as u16).to_be_bytes());
        header.extend_from_slice(&0xFFFFu16.to_be_bytes());

        let mut strings = Vec::new();
        let strings_start = 4 + names.len() * 4;
        for name in names {
            header.extend_from_slice(&name_hash(name).to_be_bytes());
            header.extend_from_slice(&((strings_start + strings.len()) as u16).to_be_bytes());
            strings.extend_from_slice(name.as_bytes());
            strings.push(0);
        }
        header.extend_from_slice(&strings);
        header
    }

    #[test]
    fn test_read_names() {
        let mut tag = vec![0u8; 8];
        tag.extend_from_slice(&encode_name_table(&["root", "arm_l", "arm_r"]));
        let mut reader = TagReader::new(ChunkId::JNT1, &tag);
        let names = read_name_table(&mut reader, 8).unwrap();
        assert_eq!(names, vec!["root", "arm_l", "arm_r"]);
    }

    #[test]
    fn test_hash() {
        assert_eq!(name_hash(""), 0);
        assert_eq!(name_hash("a"), 0x61);
        assert_eq!(name_hash("ab"), 0x61 * 3 + 0x62);
    }

    #[test]
    fn test_unterminated_string_stops_at_tag_end() {
        let mut tag = vec![0u8; 8];
        tag.extend_from_slice(&1u16.to_be_bytes());
        tag.extend_from_slice(&0u16.to_be_bytes());
        tag.extend_from_slice(&0u16.to_be_bytes());
        tag.extend_from_slice(&8u16.to_be_bytes());
        tag.extend_from_slice(b"abc");
        let mut reader = TagReader::new(ChunkId::MAT3, &tag);
        assert_eq!(read_name_table(&mut reader, 8).unwrap(), vec!["abc"]);
    }
}
