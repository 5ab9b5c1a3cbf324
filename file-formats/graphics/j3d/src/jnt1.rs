//! JNT1: skeleton joints
//!
//! Joint records hold the bind pose of every joint. Parent links are not stored
//! in the section; they come from the INF1 hierarchy, where Joint nodes nest
//! under their parent joint.

use binrw::BinRead;
use glam::{EulerRot, Mat4, Quat, Vec3};
use log::{debug, trace};

use crate::chunk::Tag;
use crate::error::{J3dError, Result};
use crate::inf1::{HierarchyNode, NodeKind};
use crate::string_table::read_name_table;
use crate::types::BoundingBox;

/// Size of one joint record
pub const JOINT_RECORD_SIZE: u64 = 0x40;

/// Raw joint record
#[derive(Debug, Clone, Copy, PartialEq, BinRead)]
#[br(big)]
pub struct JointRecord {
    pub matrix_type: u16,
    pub inherit_flag: u8,
    _padding: u8,
    pub scale: [f32; 3],
    /// Euler angles in units of π/32768 radians
    pub rotation: [i16; 3],
    _padding2: u16,
    pub translation: [f32; 3],
    pub bounding_radius: f32,
    pub bounding_box: BoundingBox,
}

/// Convert the fixed-point Euler angles of a joint record to a quaternion
///
/// The angles apply X first, then Y, then Z.
pub fn rotation_from_fixed(rotation: [i16; 3]) -> Quat {
    let [x, y, z] = rotation.map(|v| v as f32 * std::f32::consts::PI / 32768.0);
    Quat::from_euler(EulerRot::ZYX, z, y, x)
}

/// Local transform of a joint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub scale: Vec3,
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Default for JointPose {
    fn default() -> Self {
        Self {
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
            translation: Vec3::ZERO,
        }
    }
}

impl JointPose {
    /// `translation * rotation * scale`, applied to column vectors
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A decoded joint
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonJoint {
    pub name: String,
    pub matrix_type: u16,
    pub inherit_flag: u8,
    pub bind_pose: JointPose,
    pub bounding_radius: f32,
    pub bounding_box: BoundingBox,
    /// Index of the parent joint, `None` for roots
    pub parent: Option<usize>,
}

impl SkeletonJoint {
    fn from_record(name: String, record: &JointRecord) -> Self {
        Self {
            name,
            matrix_type: record.matrix_type,
            inherit_flag: record.inherit_flag,
            bind_pose: JointPose {
                scale: Vec3::from_array(record.scale),
                rotation: rotation_from_fixed(record.rotation),
                translation: Vec3::from_array(record.translation),
            },
            bounding_radius: record.bounding_radius,
            bounding_box: record.bounding_box,
            parent: None,
        }
    }
}

/// Decoded JNT1 section
#[derive(Debug, Clone, PartialEq)]
pub struct Jnt1 {
    pub joints: Vec<SkeletonJoint>,
    /// Joint index to record index
    pub remap: Vec<u16>,
}

impl Jnt1 {
    pub fn parse(tag: &Tag<'_>) -> Result<Self> {
        let mut reader = tag.reader();
        let joint_count: u16 = reader.read_be()?;
        let _padding: u16 = reader.read_be()?;
        let joint_offset: u32 = reader.read_be()?;
        let remap_offset: u32 = reader.read_be()?;
        let name_table_offset: u32 = reader.read_be()?;

        let remap: Vec<u16> = reader.read_vec_at(remap_offset as u64, joint_count as usize)?;
        let record_count = remap.iter().map(|&r| r as usize + 1).max().unwrap_or(0);
        let records: Vec<JointRecord> =
            reader.read_vec_at(joint_offset as u64, record_count)?;

        let mut names = if name_table_offset != 0 {
            read_name_table(&mut reader, name_table_offset as u64)?
        } else {
            Vec::new()
        };
        names.resize_with(joint_count as usize, String::new);

        let joints = remap
            .iter()
            .zip(names)
            .map(|(&record, name)| -> Result<SkeletonJoint> {
                let record = records
                    .get(record as usize)
                    .ok_or_else(|| J3dError::out_of_range("joint record", record as usize, records.len()))?;
                trace!("Joint '{}': {:?}", name, record);
                Ok(SkeletonJoint::from_record(name, record))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("JNT1: {} joints, {} records", joints.len(), records.len());
        Ok(Self { joints, remap })
    }
}

/// Joint arena with parent links and the current pose
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    joints: Vec<SkeletonJoint>,
    pose: Vec<JointPose>,
    dirty: bool,
}

impl Skeleton {
    /// Create a skeleton posed in its bind pose; it starts dirty
    pub fn new(joints: Vec<SkeletonJoint>) -> Self {
        let pose = joints.iter().map(|j| j.bind_pose).collect();
        Self {
            joints,
            pose,
            dirty: true,
        }
    }

    pub fn joints(&self) -> &[SkeletonJoint] {
        &self.joints
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Current local pose of every joint
    pub fn pose(&self) -> &[JointPose] {
        &self.pose
    }

    /// Replace the local pose of one joint and mark the skeleton dirty
    pub fn set_joint_pose(
        &mut self,
        joint: usize,
        scale: Vec3,
        rotation: Quat,
        translation: Vec3,
    ) -> Result<()> {
        let len = self.pose.len();
        let pose = self
            .pose
            .get_mut(joint)
            .ok_or_else(|| J3dError::out_of_range("joint", joint, len))?;
        *pose = JointPose {
            scale,
            rotation,
            translation,
        };
        self.dirty = true;
        Ok(())
    }

    /// Restore the bind pose and mark the skeleton dirty
    pub fn reset_pose(&mut self) {
        for (pose, joint) in self.pose.iter_mut().zip(&self.joints) {
            *pose = joint.bind_pose;
        }
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, returning whether it was set
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Assign every joint's parent from the scene hierarchy
    ///
    /// A Joint node's parent is the nearest Joint ancestor in the tree. Links
    /// are reset first, so running this twice yields the same result.
    pub fn assign_parents(&mut self, root: &HierarchyNode) -> Result<()> {
        for joint in &mut self.joints {
            joint.parent = None;
        }

        let limit = root.node_count();
        let mut stack: Vec<(&HierarchyNode, Option<usize>, usize)> = vec![(root, None, 0)];
        while let Some((node, current, depth)) = stack.pop() {
            if depth > limit {
                return Err(J3dError::CyclicHierarchy { depth, limit });
            }

            let mut child_current = current;
            if node.kind == NodeKind::Joint {
                let index = node.value as usize;
                let len = self.joints.len();
                let joint = self
                    .joints
                    .get_mut(index)
                    .ok_or_else(|| J3dError::out_of_range("joint", index, len))?;
                joint.parent = current;
                child_current = Some(index);
            }

            for child in node.children.iter().rev() {
                stack.push((child, child_current, depth + 1));
            }
        }

        // A joint listed twice can still link two joints to each other.
        self.check_acyclic()?;
        self.dirty = true;
        Ok(())
    }

    /// Set a parent link directly
    pub fn set_parent(&mut self, joint: usize, parent: Option<usize>) -> Result<()> {
        let len = self.joints.len();
        if let Some(p) = parent {
            if p >= len {
                return Err(J3dError::out_of_range("parent joint", p, len));
            }
        }
        self.joints
            .get_mut(joint)
            .ok_or_else(|| J3dError::out_of_range("joint", joint, len))?
            .parent = parent;
        self.dirty = true;
        Ok(())
    }

    fn check_acyclic(&self) -> Result<()> {
        let limit = self.joints.len();
        for start in 0..limit {
            let mut depth = 0;
            let mut current = self.joints[start].parent;
            while let Some(p) = current {
                depth += 1;
                if depth > limit {
                    return Err(J3dError::CyclicHierarchy { depth, limit });
                }
                current = self.joints.get(p).and_then(|j| j.parent);
            }
        }
        Ok(())
    }

    /// World transform of every joint under the current pose
    ///
    /// Each joint composes its parent's world matrix with its own local
    /// matrix. Results are memoised so shared ancestors are computed once.
    pub fn world_transforms(&self) -> Result<Vec<Mat4>> {
        self.compose(|i| self.pose[i].matrix())
    }

    /// World transforms of the bind pose
    pub fn bind_world_transforms(&self) -> Result<Vec<Mat4>> {
        self.compose(|i| self.joints[i].bind_pose.matrix())
    }

    fn compose(&self, local: impl Fn(usize) -> Mat4) -> Result<Vec<Mat4>> {
        let len = self.joints.len();
        let mut world: Vec<Option<Mat4>> = vec![None; len];
        let mut chain = Vec::new();

        for start in 0..len {
            chain.clear();
            let mut current = Some(start);
            while let Some(j) = current {
                if j >= len {
                    return Err(J3dError::out_of_range("parent joint", j, len));
                }
                if world[j].is_some() {
                    break;
                }
                chain.push(j);
                if chain.len() > len {
                    return Err(J3dError::CyclicHierarchy {
                        depth: chain.len(),
                        limit: len,
                    });
                }
                current = self.joints[j].parent;
            }

            let mut acc = current.and_then(|j| world[j]).unwrap_or(Mat4::IDENTITY);
            for &j in chain.iter().rev() {
                acc *= local(j);
                world[j] = Some(acc);
            }
        }

        Ok(world.into_iter().map(|m| m.unwrap_or(Mat4::IDENTITY)).collect())
    }
}
