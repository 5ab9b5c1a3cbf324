//! Whole-model decoding
//!
//! [`J3dModel::parse`] walks every tag, decodes the sections it knows,
//! then links shapes against the vertex arrays and binds them to materials.

use std::fs;
use std::path::Path;

use glam::{Vec2, Vec3, Vec4};
use log::{debug, info, trace};

use crate::chunk::{ChunkId, ContainerHeader, TagInfo, walk_tags};
use crate::drw1::Drw1;
use crate::error::{DecodeDiagnostics, Diagnostic, J3dError, Result};
use crate::evp1::Evp1;
use crate::inf1::{HierarchyNode, Inf1};
use crate::jnt1::{Jnt1, Skeleton};
use crate::mat3::Mat3;
use crate::material::MaterialState;
use crate::shp1::{Shape, Shp1};
use crate::skinning::{SkinAttributes, SkinFrame, SkinningResolver};
use crate::types::BoundingBox;
use crate::vtx1::{VertexArrays, Vtx1};

/// Flattened vertex streams of one shape
///
/// Every triangle-list corner becomes its own vertex, so `indices` is
/// sequential.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeMesh {
    pub positions: Vec<Vec3>,
    /// Empty when the shape has no normals
    pub normals: Vec<Vec3>,
    pub colors: [Vec<Vec4>; 2],
    pub tex_coords: [Vec<Vec2>; 8],
    pub indices: Vec<u32>,
    /// DRW1 slot of every vertex
    pub draw_slots: Vec<u16>,
}

impl ShapeMesh {
    /// Resolve a decoded shape's attribute indices against the vertex arrays
    pub fn link(shape_index: usize, shape: &Shape, arrays: &VertexArrays) -> Result<Self> {
        let vertices = shape.packets.iter().flat_map(|p| p.vertices.iter());
        let has_normals = vertices.clone().any(|v| v.normal >= 0);
        let has_colors = [0, 1].map(|c| vertices.clone().any(|v| v.colors[c] >= 0));
        let has_tex_coords =
            std::array::from_fn::<bool, 8, _>(|t| vertices.clone().any(|v| v.tex_coords[t] >= 0));

        let mut mesh = Self::default();
        for (p, packet) in shape.packets.iter().enumerate() {
            for vertex in &packet.vertices {
                let position = lookup(&arrays.positions, vertex.position)
                    .ok_or_else(|| {
                        J3dError::out_of_range(
                            "position",
                            vertex.position.max(0) as usize,
                            arrays.positions.len(),
                        )
                    })?;

                let slot = vertex.skin_slot();
                let draw_slot = packet.draw_slot(slot).ok_or_else(|| {
                    if slot < packet.matrix_table.len() {
                        J3dError::UnresolvableBoneIndex {
                            shape: shape_index,
                            packet: p,
                            slot,
                        }
                    } else {
                        J3dError::out_of_range("packet matrix slot", slot, packet.matrix_table.len())
                    }
                })?;

                mesh.indices.push(mesh.positions.len() as u32);
                mesh.positions.push(position);
                mesh.draw_slots.push(draw_slot);
                if has_normals {
                    mesh.normals
                        .push(lookup(&arrays.normals, vertex.normal).unwrap_or(Vec3::ZERO));
                }
                for c in 0..2 {
                    if has_colors[c] {
                        mesh.colors[c]
                            .push(lookup(&arrays.colors[c], vertex.colors[c]).unwrap_or(Vec4::ONE));
                    }
                }
                for t in 0..8 {
                    if has_tex_coords[t] {
                        mesh.tex_coords[t].push(
                            lookup(&arrays.tex_coords[t], vertex.tex_coords[t]).unwrap_or(Vec2::ZERO),
                        );
                    }
                }
            }
        }

        trace!(
            "Shape {}: linked {} vertices",
            shape_index,
            mesh.positions.len()
        );
        Ok(mesh)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

fn lookup<T: Copy>(array: &[T], index: i32) -> Option<T> {
    usize::try_from(index).ok().and_then(|i| array.get(i).copied())
}

/// A shape draw bound to the material in effect for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MaterialBatch {
    /// Index into [`J3dModel::shapes`]
    pub shape: usize,
    /// Index into [`J3dModel::materials`]
    pub material: Option<usize>,
}

/// Summary counts of a decoded model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ModelStats {
    pub tags: usize,
    pub joints: usize,
    pub envelopes: usize,
    pub draw_matrices: usize,
    pub shapes: usize,
    pub packets: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub materials: usize,
    pub diagnostics: usize,
}

/// A decoded J3D model
#[derive(Debug, Clone)]
pub struct J3dModel {
    pub header: ContainerHeader,
    /// Every tag walked, in container order
    pub tags: Vec<TagInfo>,
    pub info: Option<Inf1>,
    pub vertex_data: Vtx1,
    pub skeleton: Skeleton,
    pub envelopes: Evp1,
    pub draw_matrices: Drw1,
    pub shapes: Vec<Shape>,
    /// Linked vertex streams, parallel to `shapes`
    pub meshes: Vec<ShapeMesh>,
    pub materials: Vec<MaterialState>,
    /// Shapes in hierarchy draw order
    pub batches: Vec<MaterialBatch>,
    pub bounding_box: BoundingBox,
    pub bounding_radius: f32,
    pub diagnostics: DecodeDiagnostics,
}

/// Sections collected during the tag walk
#[derive(Default)]
struct Sections {
    inf1: Option<Inf1>,
    vtx1: Option<Vtx1>,
    jnt1: Option<Jnt1>,
    evp1: Option<Evp1>,
    drw1: Option<Drw1>,
    shp1: Option<Shp1>,
    mat3: Option<Mat3>,
}

impl J3dModel {
    /// Load a model file fully into memory and decode it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        info!("Loading {} ({} bytes)", path.as_ref().display(), data.len());
        Self::parse(&data)
    }

    /// Decode a complete container
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = ContainerHeader::parse(data)?;
        debug!(
            "Container {}: {} bytes, {} tags",
            header.sub_magic_str(),
            header.total_size,
            header.tag_count
        );

        let mut diagnostics = DecodeDiagnostics::new();
        let mut sections = Sections::default();
        let tags = walk_tags(data, &header, |tag| {
            match tag.id {
                ChunkId::INF1 => sections.inf1 = Some(Inf1::parse(&tag)?),
                ChunkId::VTX1 => sections.vtx1 = Some(Vtx1::parse(&tag)?),
                ChunkId::JNT1 => sections.jnt1 = Some(Jnt1::parse(&tag)?),
                ChunkId::EVP1 => sections.evp1 = Some(Evp1::parse(&tag)?),
                ChunkId::DRW1 => sections.drw1 = Some(Drw1::parse(&tag)?),
                ChunkId::SHP1 => sections.shp1 = Some(Shp1::parse(&tag, &mut diagnostics)?),
                ChunkId::MAT3 => sections.mat3 = Some(Mat3::parse(&tag)?),
                ChunkId::MAT2 | ChunkId::TEX1 | ChunkId::MDL3 => {
                    debug!("Tag {} at {:#x} not decoded", tag.id, tag.offset);
                }
                other => {
                    debug!("Skipping unknown tag {} at {:#x}", other, tag.offset);
                    diagnostics.push(Diagnostic::UnknownTag {
                        id: other.as_string(),
                        offset: tag.offset,
                    });
                }
            }
            Ok(())
        })?;

        Self::assemble(header, tags, sections, diagnostics)
    }

    fn assemble(
        header: ContainerHeader,
        tags: Vec<TagInfo>,
        sections: Sections,
        diagnostics: DecodeDiagnostics,
    ) -> Result<Self> {
        let mut skeleton = Skeleton::new(sections.jnt1.map(|j| j.joints).unwrap_or_default());
        if let Some(inf1) = &sections.inf1 {
            skeleton.assign_parents(&inf1.root)?;
        }

        let vertex_data = sections.vtx1.unwrap_or_default();
        let (shapes, shape_remap) = sections
            .shp1
            .map(|s| (s.shapes, s.remap))
            .unwrap_or_default();
        let meshes = shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| ShapeMesh::link(i, shape, &vertex_data.arrays))
            .collect::<Result<Vec<_>>>()?;
        let materials = sections.mat3.map(|m| m.materials).unwrap_or_default();

        let batches = match &sections.inf1 {
            Some(inf1) => bind_materials(&inf1.root, &shape_remap, shapes.len(), materials.len())?,
            None => Vec::new(),
        };

        let bounding_box = shapes
            .iter()
            .map(|s| s.bounding_box)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        let bounding_radius = bounding_box.max.length();

        if !diagnostics.is_empty() {
            debug!("Model decoded with {} diagnostics", diagnostics.len());
        }

        Ok(Self {
            header,
            tags,
            info: sections.inf1,
            vertex_data,
            skeleton,
            envelopes: sections.evp1.unwrap_or_default(),
            draw_matrices: sections.drw1.unwrap_or_default(),
            shapes,
            meshes,
            materials,
            batches,
            bounding_box,
            bounding_radius,
            diagnostics,
        })
    }

    /// Scene hierarchy, if the model has an INF1 section
    pub fn hierarchy(&self) -> Option<&HierarchyNode> {
        self.info.as_ref().map(|i| &i.root)
    }

    /// Bounding sphere as `(center, radius)`
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        (self.bounding_box.center(), self.bounding_radius)
    }

    pub fn material_by_name(&self, name: &str) -> Option<&MaterialState> {
        self.materials.iter().find(|m| m.name == name)
    }

    pub fn stats(&self) -> ModelStats {
        ModelStats {
            tags: self.tags.len(),
            joints: self.skeleton.len(),
            envelopes: self.envelopes.envelopes.len(),
            draw_matrices: self.draw_matrices.len(),
            shapes: self.shapes.len(),
            packets: self.shapes.iter().map(|s| s.packets.len()).sum(),
            vertices: self.meshes.iter().map(ShapeMesh::vertex_count).sum(),
            triangles: self.meshes.iter().map(ShapeMesh::triangle_count).sum(),
            materials: self.materials.len(),
            diagnostics: self.diagnostics.len(),
        }
    }

    /// GPU skin attributes for one shape
    pub fn skin_attributes(
        &self,
        resolver: &SkinningResolver,
        shape: usize,
    ) -> Result<SkinAttributes> {
        let mesh = self
            .meshes
            .get(shape)
            .ok_or_else(|| J3dError::out_of_range("shape", shape, self.meshes.len()))?;
        resolver.skin_attributes(mesh, &self.draw_matrices, &self.envelopes)
    }

    /// Resolve skinning under the current pose, if it changed since the last pass
    pub fn resolve_skinning_if_dirty(
        &mut self,
        resolver: &SkinningResolver,
    ) -> Result<Option<SkinFrame>> {
        resolver.resolve_if_dirty(
            &mut self.skeleton,
            &self.meshes,
            &self.draw_matrices,
            &self.envelopes,
        )
    }
}

/// Map hierarchy draw batches onto shape and material indices
fn bind_materials(
    root: &HierarchyNode,
    shape_remap: &[u16],
    shape_count: usize,
    material_count: usize,
) -> Result<Vec<MaterialBatch>> {
    root.draw_batches()
        .into_iter()
        .map(|batch| {
            let value = batch.shape as usize;
            let shape = match shape_remap.get(value) {
                Some(&s) => s as usize,
                None if shape_remap.is_empty() => value,
                None => return Err(J3dError::out_of_range("shape remap", value, shape_remap.len())),
            };
            if shape >= shape_count {
                return Err(J3dError::out_of_range("shape", shape, shape_count));
            }

            // Models without MAT3 keep their shapes but lose the binding.
            let material = match batch.material.map(usize::from) {
                Some(m) if m < material_count => Some(m),
                Some(m) if material_count > 0 => {
                    return Err(J3dError::out_of_range("material", m, material_count));
                }
                _ => None,
            };
            Ok(MaterialBatch { shape, material })
        })
        .collect()
}
