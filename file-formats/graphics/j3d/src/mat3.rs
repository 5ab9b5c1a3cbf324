//! MAT3: material tables
//!
//! Material entries do not hold state directly. Each field is an index into a
//! shared per-kind table whose offset is listed in the section header. Only the
//! lighting and texture-generation state is decoded here.

use binrw::BinRead;
use glam::{Mat4, Vec2, Vec3};
use log::{debug, trace};

use crate::chunk::{Tag, TagReader};
use crate::error::{J3dError, Result};
use crate::material::{
    AttenuationFunction, ColorChannelControl, ColorSource, DiffuseFunction, LightMask,
    MaterialState, PostTexGen, PostTexGenMatrix, TexGen, TexGenMatrix, TexGenSource, TexGenType,
    TexMatrix,
};
use crate::string_table::read_name_table;
use crate::types::{Color, UNUSED_INDEX, optional_index};

/// Size of one material entry
pub const MATERIAL_ENTRY_SIZE: u64 = 0x14C;

/// Number of section offsets in the header
pub const SECTION_COUNT: usize = 30;

/// Positions of the section offsets in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Mat3Section {
    Entries = 0,
    Remap = 1,
    Names = 2,
    Indirect = 3,
    Cull = 4,
    MaterialColors = 5,
    ChannelCounts = 6,
    ChannelControls = 7,
    AmbientColors = 8,
    Lights = 9,
    TexGenCounts = 10,
    TexGens = 11,
    PostTexGens = 12,
    TexMatrices = 13,
    PostTexMatrices = 14,
    TextureRemap = 15,
    TevOrders = 16,
    TevColors = 17,
    KonstColors = 18,
    TevStageCounts = 19,
    TevStages = 20,
    SwapModes = 21,
    SwapTables = 22,
    Fog = 23,
    AlphaCompare = 24,
    Blend = 25,
    ZMode = 26,
    ZCompLoc = 27,
    Dither = 28,
    NbtScale = 29,
}

/// A material entry: indices into the shared tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct MaterialEntry {
    pub flag: u8,
    pub cull_mode_index: u8,
    pub channel_count_index: u8,
    pub texgen_count_index: u8,
    pub tev_stage_count_index: u8,
    pub z_comp_loc_index: u8,
    pub z_mode_index: u8,
    pub dither_index: u8,
    pub material_color: [u16; 2],
    pub channel_control: [u16; 4],
    pub ambient_color: [u16; 2],
    pub light: [u16; 8],
    pub texgen: [u16; 8],
    pub post_texgen: [u16; 8],
    pub tex_matrix: [u16; 10],
    pub post_tex_matrix: [u16; 20],
    pub texture: [u16; 8],
    /// TEV, fog, blend and pixel state
    _tev_state: [u8; 0xB8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
struct ChannelControlRecord {
    enable: u8,
    material_source: u8,
    light_mask: u8,
    diffuse_function: u8,
    attenuation_function: u8,
    ambient_source: u8,
    _padding: u16,
}

impl From<ChannelControlRecord> for ColorChannelControl {
    fn from(r: ChannelControlRecord) -> Self {
        Self {
            lighting_enabled: r.enable != 0,
            material_source: ColorSource::from_raw(r.material_source),
            light_mask: LightMask::from_bits_retain(r.light_mask),
            diffuse_function: DiffuseFunction::from_raw(r.diffuse_function),
            attenuation_function: AttenuationFunction::from_raw(r.attenuation_function),
            ambient_source: ColorSource::from_raw(r.ambient_source),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
struct TexGenRecord {
    kind: u8,
    source: u8,
    matrix: u8,
    _padding: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, BinRead)]
#[br(big)]
struct TexMatrixRecord {
    projection: u8,
    kind: u8,
    _padding: u16,
    center: [f32; 3],
    scale: [f32; 2],
    rotation: i16,
    _padding2: u16,
    translation: [f32; 2],
    effect: [[f32; 4]; 4],
}

impl From<TexMatrixRecord> for TexMatrix {
    fn from(r: TexMatrixRecord) -> Self {
        Self {
            projection: r.projection,
            kind: r.kind,
            center: Vec3::from_array(r.center),
            scale: Vec2::from_array(r.scale),
            rotation: r.rotation as f32 * std::f32::consts::PI / 32768.0,
            translation: Vec2::from_array(r.translation),
            // Stored row-major
            effect: Mat4::from_cols_array_2d(&r.effect).transpose(),
        }
    }
}

/// Decoded MAT3 section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mat3 {
    /// One state per material index
    pub materials: Vec<MaterialState>,
    /// Material index to entry index
    pub remap: Vec<u16>,
}

impl Mat3 {
    pub fn parse(tag: &Tag<'_>) -> Result<Self> {
        let mut reader = tag.reader();
        let material_count: u16 = reader.read_be()?;
        let _padding: u16 = reader.read_be()?;
        let offsets: Vec<u32> = reader.read_vec(SECTION_COUNT)?;
        let tables = Tables { offsets: &offsets };

        let remap: Vec<u16> =
            reader.read_vec_at(tables.offset(Mat3Section::Remap), material_count as usize)?;
        let entry_count = remap.iter().map(|&r| r as usize + 1).max().unwrap_or(0);
        let entries: Vec<MaterialEntry> =
            reader.read_vec_at(tables.offset(Mat3Section::Entries), entry_count)?;

        let mut names = if offsets[Mat3Section::Names as usize] != 0 {
            read_name_table(&mut reader, tables.offset(Mat3Section::Names))?
        } else {
            Vec::new()
        };
        names.resize_with(material_count as usize, String::new);

        let mut materials = Vec::with_capacity(material_count as usize);
        for (name, &entry_index) in names.into_iter().zip(&remap) {
            let entry = entries.get(entry_index as usize).ok_or_else(|| {
                J3dError::out_of_range("material entry", entry_index as usize, entries.len())
            })?;
            let state = tables.material_state(&mut reader, name, entry)?;
            trace!(
                "Material '{}': {} channels, {} texgens",
                state.name,
                state.channel_count,
                state.tex_gens.len()
            );
            materials.push(state);
        }

        debug!("MAT3: {} materials, {} entries", materials.len(), entries.len());
        Ok(Self { materials, remap })
    }

    /// Look up a material by name
    pub fn by_name(&self, name: &str) -> Option<&MaterialState> {
        self.materials.iter().find(|m| m.name == name)
    }
}

struct Tables<'o> {
    offsets: &'o [u32],
}

impl Tables<'_> {
    fn offset(&self, section: Mat3Section) -> u64 {
        self.offsets[section as usize] as u64
    }

    /// Read element `index` of a table of `stride`-sized records
    fn read<T>(
        &self,
        reader: &mut TagReader<'_>,
        section: Mat3Section,
        index: u16,
        stride: u64,
    ) -> Result<T>
    where
        T: BinRead,
        for<'b> <T as BinRead>::Args<'b>: Default,
    {
        reader.seek(self.offset(section) + index as u64 * stride)?;
        reader.read_be()
    }

    fn material_state(
        &self,
        reader: &mut TagReader<'_>,
        name: String,
        entry: &MaterialEntry,
    ) -> Result<MaterialState> {
        let mut state = MaterialState {
            name,
            ..MaterialState::default()
        };

        if entry.channel_count_index != 0xFF {
            state.channel_count = self.read(
                reader,
                Mat3Section::ChannelCounts,
                entry.channel_count_index as u16,
                1,
            )?;
        }

        for (slot, &index) in entry.material_color.iter().enumerate() {
            if let Some(index) = optional_index(index) {
                state.material_colors[slot] =
                    self.read::<Color>(reader, Mat3Section::MaterialColors, index, 4)?;
            }
        }
        for (slot, &index) in entry.ambient_color.iter().enumerate() {
            if let Some(index) = optional_index(index) {
                state.ambient_colors[slot] =
                    self.read::<Color>(reader, Mat3Section::AmbientColors, index, 4)?;
            }
        }

        for &index in &entry.channel_control {
            let control = match optional_index(index) {
                Some(index) => self
                    .read::<ChannelControlRecord>(reader, Mat3Section::ChannelControls, index, 8)?
                    .into(),
                None => ColorChannelControl::default(),
            };
            state.channel_controls.push(control);
        }

        let texgen_count = if entry.texgen_count_index != 0xFF {
            self.read::<u8>(
                reader,
                Mat3Section::TexGenCounts,
                entry.texgen_count_index as u16,
                1,
            )?
        } else {
            0
        };
        // A post generator belongs to the generator in the same slot, so pair
        // the slots before dropping unused ones.
        let slots = entry.texgen.iter().zip(&entry.post_texgen);
        for (&index, &post_index) in slots.take(texgen_count as usize) {
            if index == UNUSED_INDEX {
                continue;
            }
            let r: TexGenRecord = self.read(reader, Mat3Section::TexGens, index, 4)?;
            state.tex_gens.push(TexGen {
                kind: TexGenType::from_raw(r.kind),
                source: TexGenSource::from_raw(r.source),
                matrix: TexGenMatrix::from_raw(r.matrix),
            });

            let post = match optional_index(post_index) {
                Some(index) => {
                    let r: TexGenRecord = self.read(reader, Mat3Section::PostTexGens, index, 4)?;
                    Some(PostTexGen {
                        kind: TexGenType::from_raw(r.kind),
                        source: TexGenSource::from_raw(r.source),
                        matrix: PostTexGenMatrix::from_raw(r.matrix),
                    })
                }
                None => None,
            };
            state.post_tex_gens.push(post);
        }

        for (slot, &index) in entry.tex_matrix.iter().enumerate() {
            if let Some(index) = optional_index(index) {
                let r: TexMatrixRecord =
                    self.read(reader, Mat3Section::TexMatrices, index, 0x64)?;
                state.tex_matrices[slot] = Some(r.into());
            }
        }
        for (slot, &index) in entry.post_tex_matrix.iter().enumerate() {
            if let Some(index) = optional_index(index) {
                let r: TexMatrixRecord =
                    self.read(reader, Mat3Section::PostTexMatrices, index, 0x64)?;
                state.post_tex_matrices[slot] = Some(r.into());
            }
        }

        for (slot, &index) in entry.texture.iter().enumerate() {
            if let Some(index) = optional_index(index) {
                state.textures[slot] =
                    Some(self.read::<u16>(reader, Mat3Section::TextureRemap, index, 2)?);
            }
        }

        Ok(state)
    }
}
