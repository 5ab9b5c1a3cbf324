//! Fixed-function material state
//!
//! These values describe the lighting channels and texture coordinate
//! generators of one material. They are the only input of the shader
//! generator.

use bitflags::bitflags;
use glam::{Mat4, Quat, Vec2, Vec3};

use crate::types::Color;

/// Where a channel takes a color from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSource {
    /// Material or ambient color register
    #[default]
    Register,
    /// Rasterised vertex color
    Vertex,
}

impl ColorSource {
    pub fn from_raw(raw: u8) -> Self {
        if raw == 1 { Self::Vertex } else { Self::Register }
    }
}

/// How the light-to-normal angle scales a light's contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffuseFunction {
    #[default]
    None,
    Signed,
    Clamp,
    Unknown(u8),
}

impl DiffuseFunction {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Signed,
            2 => Self::Clamp,
            other => Self::Unknown(other),
        }
    }
}

/// How a light falls off with distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttenuationFunction {
    Spec,
    Spot,
    #[default]
    None,
    Unknown(u8),
}

impl AttenuationFunction {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Spec,
            1 => Self::Spot,
            2 => Self::None,
            other => Self::Unknown(other),
        }
    }
}

bitflags! {
    /// Hardware lights enabled for a channel
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LightMask: u8 {
        const LIGHT0 = 1 << 0;
        const LIGHT1 = 1 << 1;
        const LIGHT2 = 1 << 2;
        const LIGHT3 = 1 << 3;
        const LIGHT4 = 1 << 4;
        const LIGHT5 = 1 << 5;
        const LIGHT6 = 1 << 6;
        const LIGHT7 = 1 << 7;
    }
}

impl LightMask {
    /// Indices of the enabled lights in ascending order
    pub fn lights(&self) -> impl Iterator<Item = usize> {
        let bits = self.bits();
        (0..8usize).filter(move |&i| bits & (1u8 << i) != 0)
    }
}

/// Lighting setup of one color or alpha channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorChannelControl {
    pub lighting_enabled: bool,
    pub material_source: ColorSource,
    pub light_mask: LightMask,
    pub diffuse_function: DiffuseFunction,
    pub attenuation_function: AttenuationFunction,
    pub ambient_source: ColorSource,
}

/// Texture coordinate generator function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexGenType {
    Mtx3x4,
    Mtx2x4,
    Bump(u8),
    Srtg,
    Unknown(u8),
}

impl TexGenType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Mtx3x4,
            1 => Self::Mtx2x4,
            2..=9 => Self::Bump(raw - 2),
            10 => Self::Srtg,
            other => Self::Unknown(other),
        }
    }
}

/// Input of a texture coordinate generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexGenSource {
    Position,
    Normal,
    Binormal,
    Tangent,
    /// Raw vertex texture coordinate
    Tex(u8),
    /// Output of an earlier generator
    TexCoord(u8),
    Color0,
    Color1,
    Unknown(u8),
}

impl TexGenSource {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Position,
            1 => Self::Normal,
            2 => Self::Binormal,
            3 => Self::Tangent,
            4..=11 => Self::Tex(raw - 4),
            12..=18 => Self::TexCoord(raw - 12),
            19 => Self::Color0,
            20 => Self::Color1,
            other => Self::Unknown(other),
        }
    }
}

/// First-stage texture generator matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexGenMatrix {
    Identity,
    /// Position/normal matrix slot
    PosNormal(u8),
    /// Material texture matrix slot (0..10)
    TexMtx(u8),
    Unknown(u8),
}

impl TexGenMatrix {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            60 => Self::Identity,
            30..=57 if (raw - 30) % 3 == 0 => Self::TexMtx((raw - 30) / 3),
            0..=27 if raw % 3 == 0 => Self::PosNormal(raw / 3),
            other => Self::Unknown(other),
        }
    }
}

/// Second-stage (post) texture generator matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostTexGenMatrix {
    Identity,
    /// Material post texture matrix slot (0..20)
    PostTexMtx(u8),
    Unknown(u8),
}

impl PostTexGenMatrix {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            125 => Self::Identity,
            64..=121 if (raw - 64) % 3 == 0 => Self::PostTexMtx((raw - 64) / 3),
            other => Self::Unknown(other),
        }
    }
}

/// A texture coordinate generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexGen {
    pub kind: TexGenType,
    pub source: TexGenSource,
    pub matrix: TexGenMatrix,
}

/// A post-transform texture coordinate generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostTexGen {
    pub kind: TexGenType,
    pub source: TexGenSource,
    pub matrix: PostTexGenMatrix,
}

/// A texture matrix slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexMatrix {
    pub projection: u8,
    pub kind: u8,
    pub center: Vec3,
    pub scale: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    pub translation: Vec2,
    pub effect: Mat4,
}

impl Default for TexMatrix {
    fn default() -> Self {
        Self {
            projection: 0,
            kind: 0,
            center: Vec3::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            translation: Vec2::ZERO,
            effect: Mat4::IDENTITY,
        }
    }
}

impl TexMatrix {
    /// Scale-rotate-translate about `center` in the UV plane
    pub fn srt_matrix(&self) -> Mat4 {
        let center = Vec3::new(self.center.x, self.center.y, 0.0);
        Mat4::from_translation(Vec3::new(self.translation.x, self.translation.y, 0.0) + center)
            * Mat4::from_scale_rotation_translation(
                Vec3::new(self.scale.x, self.scale.y, 1.0),
                Quat::from_rotation_z(self.rotation),
                Vec3::ZERO,
            )
            * Mat4::from_translation(-center)
    }
}

/// Everything the shader generator needs to know about a material
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialState {
    pub name: String,
    /// Number of color channels (0 to 2)
    pub channel_count: u8,
    /// Color 0, alpha 0, color 1, alpha 1
    pub channel_controls: Vec<ColorChannelControl>,
    pub material_colors: [Color; 2],
    pub ambient_colors: [Color; 2],
    pub tex_gens: Vec<TexGen>,
    /// Post generators, parallel to `tex_gens`
    pub post_tex_gens: Vec<Option<PostTexGen>>,
    pub tex_matrices: [Option<TexMatrix>; 10],
    pub post_tex_matrices: [Option<TexMatrix>; 20],
    /// Texture index bound to each stage
    pub textures: [Option<u16>; 8],
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            name: String::new(),
            channel_count: 0,
            channel_controls: Vec::new(),
            material_colors: [Color::WHITE; 2],
            ambient_colors: [Color::default(); 2],
            tex_gens: Vec::new(),
            post_tex_gens: Vec::new(),
            tex_matrices: [None; 10],
            post_tex_matrices: [None; 20],
            textures: [None; 8],
        }
    }
}

impl MaterialState {
    /// Color and alpha controls for channel `index`
    pub fn channel(&self, index: usize) -> Option<(&ColorChannelControl, &ColorChannelControl)> {
        Some((
            self.channel_controls.get(index * 2)?,
            self.channel_controls.get(index * 2 + 1)?,
        ))
    }

    /// Whether any generator reads a post texture matrix
    pub fn uses_post_tex_matrices(&self) -> bool {
        self.post_tex_gens
            .iter()
            .flatten()
            .any(|g| matches!(g.matrix, PostTexGenMatrix::PostTexMtx(_)))
    }

    pub fn texture_count(&self) -> usize {
        self.textures.iter().flatten().count()
    }
}
