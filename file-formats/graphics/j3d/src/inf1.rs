//! INF1: model info and scene hierarchy
//!
//! The hierarchy is stored as a flat stream of `(kind, value)` pairs. Node
//! entries append to the current child list, `open` descends into the most
//! recently appended node and `close` returns to its parent. The decoded tree
//! is owned, rooted at a synthetic [`NodeKind::Root`] node.

use log::{debug, warn};

use crate::chunk::Tag;
use crate::error::{J3dError, Result};

/// Kind of a hierarchy node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum NodeKind {
    /// Synthetic root, never present in the stream
    Root,
    Joint,
    Material,
    /// A shape draw call
    Shape,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::Joint => "Joint",
            Self::Material => "Material",
            Self::Shape => "Shape",
        }
    }
}

/// Raw stream entry kinds
mod entry {
    pub const FINISH: u16 = 0x00;
    pub const OPEN: u16 = 0x01;
    pub const CLOSE: u16 = 0x02;
    pub const JOINT: u16 = 0x10;
    pub const MATERIAL: u16 = 0x11;
    pub const SHAPE: u16 = 0x12;
}

/// A node in the scene hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HierarchyNode {
    pub kind: NodeKind,
    /// Index into the joint, material remap or shape remap table
    pub value: u16,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn new(kind: NodeKind, value: u16) -> Self {
        Self {
            kind,
            value,
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(NodeKind::Root, 0)
    }

    /// Append a child and return `self` for chained construction
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first pre-order walk yielding `(depth, node)`
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            stack: vec![(0, self)],
        }
    }

    /// Number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Shapes in draw order, each bound to the material visited most recently
    /// before it in pre-order
    pub fn draw_batches(&self) -> Vec<DrawBatch> {
        let mut batches = Vec::new();
        let mut current_material = None;
        for (_, node) in self.iter() {
            match node.kind {
                NodeKind::Material => current_material = Some(node.value),
                NodeKind::Shape => batches.push(DrawBatch {
                    shape: node.value,
                    material: current_material,
                }),
                NodeKind::Root | NodeKind::Joint => {}
            }
        }
        batches
    }
}

/// Pre-order iterator over a hierarchy
#[derive(Debug, Clone)]
pub struct PreOrder<'a> {
    stack: Vec<(usize, &'a HierarchyNode)>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, &'a HierarchyNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}

/// A shape paired with the material in effect when it is drawn
///
/// Both values are hierarchy values, i.e. indices into the SHP1 and MAT3
/// remap tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DrawBatch {
    pub shape: u16,
    pub material: Option<u16>,
}

/// Decoded INF1 section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inf1 {
    /// Scaling and lighting flags
    pub flags: u16,
    /// Total matrix group count across all shapes
    pub packet_count: u32,
    /// Total position count
    pub vertex_count: u32,
    pub root: HierarchyNode,
}

impl Inf1 {
    pub fn parse(tag: &Tag<'_>) -> Result<Self> {
        let mut reader = tag.reader();
        let flags: u16 = reader.read_be()?;
        let _padding: u16 = reader.read_be()?;
        let packet_count: u32 = reader.read_be()?;
        let vertex_count: u32 = reader.read_be()?;
        let hierarchy_offset: u32 = reader.read_be()?;

        reader.seek(hierarchy_offset as u64)?;
        let mut entries = Vec::new();
        while reader.position() + 4 <= reader.len() {
            let kind: u16 = reader.read_be()?;
            let value: u16 = reader.read_be()?;
            if kind == entry::FINISH {
                break;
            }
            entries.push((kind, value));
        }

        let root = build_hierarchy(&entries)?;
        debug!(
            "INF1: {} nodes, {} packets, {} vertices",
            root.node_count(),
            packet_count,
            vertex_count
        );

        Ok(Self {
            flags,
            packet_count,
            vertex_count,
            root,
        })
    }
}

/// Build the owned tree from `(kind, value)` stream entries
pub fn build_hierarchy(entries: &[(u16, u16)]) -> Result<HierarchyNode> {
    let mut stack = vec![HierarchyNode::root()];

    for (position, &(kind, value)) in entries.iter().enumerate() {
        let node_kind = match kind {
            entry::JOINT => Some(NodeKind::Joint),
            entry::MATERIAL => Some(NodeKind::Material),
            entry::SHAPE => Some(NodeKind::Shape),
            entry::OPEN => {
                let parent = stack.last_mut().ok_or_else(empty_stack)?;
                let node = parent.children.pop().ok_or_else(|| {
                    J3dError::InvalidHierarchy(format!(
                        "entry {position}: open with no preceding node"
                    ))
                })?;
                stack.push(node);
                None
            }
            entry::CLOSE => {
                if stack.len() <= 1 {
                    return Err(J3dError::InvalidHierarchy(format!(
                        "entry {position}: close at hierarchy root"
                    )));
                }
                let node = stack.pop().ok_or_else(empty_stack)?;
                stack.last_mut().ok_or_else(empty_stack)?.children.push(node);
                None
            }
            other => {
                warn!("INF1: skipping unknown node kind {:#06x}", other);
                None
            }
        };

        if let Some(node_kind) = node_kind {
            stack
                .last_mut()
                .ok_or_else(empty_stack)?
                .children
                .push(HierarchyNode::new(node_kind, value));
        }
    }

    if stack.len() > 1 {
        warn!("INF1: {} unclosed hierarchy levels", stack.len() - 1);
    }
    while stack.len() > 1 {
        let node = stack.pop().ok_or_else(empty_stack)?;
        stack.last_mut().ok_or_else(empty_stack)?.children.push(node);
    }

    stack.pop().ok_or_else(empty_stack)
}

fn empty_stack() -> J3dError {
    J3dError::InvalidHierarchy("hierarchy stack underflow".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkId;
    use pretty_assertions::assert_eq;

    const OPEN: (u16, u16) = (entry::OPEN, 0);
    const CLOSE: (u16, u16) = (entry::CLOSE, 0);

    fn joint(i: u16) -> (u16, u16) {
        (entry::JOINT, i)
    }
    fn material(i: u16) -> (u16, u16) {
        (entry::MATERIAL, i)
    }
    fn shape(i: u16) -> (u16, u16) {
        (entry::SHAPE, i)
    }

    #[test]
    fn test_build_nested_tree() {
        let entries = [
            joint(0),
            OPEN,
            material(0),
            OPEN,
            shape(0),
            CLOSE,
            joint(1),
            CLOSE,
        ];
        let root = build_hierarchy(&entries).unwrap();

        let expected = HierarchyNode::root().with_child(
            HierarchyNode::new(NodeKind::Joint, 0)
                .with_child(
                    HierarchyNode::new(NodeKind::Material, 0)
                        .with_child(HierarchyNode::new(NodeKind::Shape, 0)),
                )
                .with_child(HierarchyNode::new(NodeKind::Joint, 1)),
        );
        assert_eq!(root, expected);
        assert_eq!(root.node_count(), 5);
    }

    #[test]
    fn test_open_without_node_fails() {
        let err = build_hierarchy(&[OPEN]).unwrap_err();
        assert!(matches!(err, J3dError::InvalidHierarchy(_)));
    }

    #[test]
    fn test_close_at_root_fails() {
        let err = build_hierarchy(&[joint(0), CLOSE]).unwrap_err();
        assert!(matches!(err, J3dError::InvalidHierarchy(_)));
    }

    #[test]
    fn test_unclosed_levels_are_folded() {
        let root = build_hierarchy(&[joint(0), OPEN, joint(1)]).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].children.len(), 1);
    }

    #[test]
    fn test_pre_order_depths() {
        let root = build_hierarchy(&[joint(0), OPEN, joint(1), OPEN, joint(2), CLOSE, joint(3), CLOSE])
            .unwrap();
        let walk: Vec<_> = root
            .iter()
            .map(|(depth, node)| (depth, node.kind, node.value))
            .collect();
        assert_eq!(
            walk,
            vec![
                (0, NodeKind::Root, 0),
                (1, NodeKind::Joint, 0),
                (2, NodeKind::Joint, 1),
                (3, NodeKind::Joint, 2),
                (2, NodeKind::Joint, 3),
            ]
        );
    }

    #[test]
    fn test_draw_batches_inherit_material() {
        // Shape 1 sits in a sibling subtree after material 1 closed; it still
        // binds to the most recently visited material.
        let entries = [
            joint(0),
            OPEN,
            shape(9),
            material(0),
            OPEN,
            shape(0),
            material(1),
            OPEN,
            shape(1),
            CLOSE,
            CLOSE,
            shape(2),
            CLOSE,
        ];
        let root = build_hierarchy(&entries).unwrap();
        assert_eq!(
            root.draw_batches(),
            vec![
                DrawBatch { shape: 9, material: None },
                DrawBatch { shape: 0, material: Some(0) },
                DrawBatch { shape: 1, material: Some(1) },
                DrawBatch { shape: 2, material: Some(1) },
            ]
        );
    }

    #[test]
    fn test_parse_tag() {
        let mut tag = Vec::new();
        tag.extend_from_slice(b"INF1");
        tag.extend_from_slice(&0u32.to_be_bytes());
        tag.extend_from_slice(&1u16.to_be_bytes());
        tag.extend_from_slice(&0xFFFFu16.to_be_bytes());
        tag.extend_from_slice(&3u32.to_be_bytes());
        tag.extend_from_slice(&24u32.to_be_bytes());
        tag.extend_from_slice(&0x18u32.to_be_bytes());
        for (kind, value) in [joint(0), OPEN, shape(0), CLOSE, (entry::FINISH, 0)] {
            tag.extend_from_slice(&kind.to_be_bytes());
            tag.extend_from_slice(&value.to_be_bytes());
        }
        let size = tag.len() as u32;
        tag[4..8].copy_from_slice(&size.to_be_bytes());

        let inf1 = Inf1::parse(&Tag {
            id: ChunkId::INF1,
            offset: 0x20,
            data: &tag,
        })
        .unwrap();
        assert_eq!(inf1.flags, 1);
        assert_eq!(inf1.packet_count, 3);
        assert_eq!(inf1.vertex_count, 24);
        assert_eq!(inf1.root.node_count(), 3);
    }
}
