//! Tag walking and container-level failures

use j3d::chunk::{ChunkId, ContainerHeader, walk_tags};
use j3d::{Diagnostic, J3dError, J3dModel};

use crate::builder::{Section, container, inf1};

fn opaque(id: &[u8; 4], len: usize) -> Vec<u8> {
    let mut s = Section::new(id);
    s.raw(&vec![0xAB; len]);
    s.finish()
}

#[test]
fn test_oversized_tag_stops_the_walk() {
    let mut data = container(&[inf1(&[]), opaque(b"ABCD", 16), opaque(b"EFGH", 16)]);
    // Second tag claims far more than the container holds.
    let second = 0x20 + inf1(&[]).len();
    data[second + 4..second + 8].copy_from_slice(&0x1000i32.to_be_bytes());

    let header = ContainerHeader::parse(&data).unwrap();
    let mut visited = Vec::new();
    let err = walk_tags(&data, &header, |tag| {
        visited.push(tag.id);
        Ok(())
    })
    .unwrap_err();

    assert!(matches!(err, J3dError::TruncatedStream { ref tag, size: 0x1000, .. } if tag == "ABCD"));
    assert_eq!(visited, vec![ChunkId::INF1]);
    assert!(matches!(
        J3dModel::parse(&data),
        Err(J3dError::TruncatedStream { .. })
    ));
}

#[test]
fn test_declared_total_size_bounds_the_walk() {
    let mut data = container(&[opaque(b"ABCD", 16)]);
    data[8..12].copy_from_slice(&0x28u32.to_be_bytes());
    assert!(matches!(
        J3dModel::parse(&data),
        Err(J3dError::TruncatedStream { available: 8, .. })
    ));
}

#[test]
fn test_tag_smaller_than_header() {
    let mut data = container(&[opaque(b"ABCD", 8)]);
    data[0x24..0x28].copy_from_slice(&4i32.to_be_bytes());
    assert!(matches!(
        J3dModel::parse(&data),
        Err(J3dError::InvalidTagSize { size: 4, .. })
    ));
}

#[test]
fn test_unknown_tags_are_skipped() {
    crate::init_logging();
    let data = container(&[opaque(b"TEX1", 12), opaque(b"ZZZ9", 4), inf1(&[(0x12, 0)])]);
    let model = J3dModel::parse(&data);

    // The shape node points at a shape that does not exist.
    assert!(matches!(model, Err(J3dError::IndexOutOfRange { what: "shape", .. })));

    let data = container(&[opaque(b"TEX1", 12), opaque(b"ZZZ9", 4), inf1(&[])]);
    let model = J3dModel::parse(&data).unwrap();
    assert_eq!(model.tags.len(), 3);
    assert_eq!(
        model.diagnostics.iter().collect::<Vec<_>>(),
        vec![&Diagnostic::UnknownTag {
            id: "ZZZ9".to_string(),
            offset: 0x20 + 20,
        }]
    );
}

#[test]
fn test_bad_magic() {
    let mut data = container(&[]);
    data[..4].copy_from_slice(b"Yaz0");
    assert!(matches!(
        J3dModel::parse(&data),
        Err(J3dError::InvalidMagic { .. })
    ));
}

#[test]
fn test_short_buffer() {
    assert!(J3dModel::parse(&[0x4A, 0x33]).is_err());
}
