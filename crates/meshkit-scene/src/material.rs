use glam::Vec3;
use meshkit_common::Vec4;

use crate::userdata::UserData;

/// The eleven fixed material attribute slots, in the order the original
/// library and the JTF/3DS/glTF codecs agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialAttrType {
    Color,
    Specular,
    Shininess,
    Roughness,
    Metallic,
    Emissive,
    Reflect,
    Transmit,
    Ior,
    Alpha,
    Bump,
}

pub const MATERIAL_ATTR_COUNT: usize = 11;
pub const MATERIAL_ATTR_ORDER: [MaterialAttrType; MATERIAL_ATTR_COUNT] = [
    MaterialAttrType::Color,
    MaterialAttrType::Specular,
    MaterialAttrType::Shininess,
    MaterialAttrType::Roughness,
    MaterialAttrType::Metallic,
    MaterialAttrType::Emissive,
    MaterialAttrType::Reflect,
    MaterialAttrType::Transmit,
    MaterialAttrType::Ior,
    MaterialAttrType::Alpha,
    MaterialAttrType::Bump,
];

impl MaterialAttrType {
    pub fn index(self) -> usize {
        MATERIAL_ATTR_ORDER
            .iter()
            .position(|&a| a == self)
            .expect("MATERIAL_ATTR_ORDER covers every variant")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexWrap {
    Repeat,
    Clamp,
}

/// A texture map: either a single 2D filename or six cubemap faces.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureMap {
    pub filename: Option<String>,
    pub cube: [Option<String>; 6],
    pub u_filter: TexFilter,
    pub v_filter: TexFilter,
    pub u_wrap: TexWrap,
    pub v_wrap: TexWrap,
    pub offset: Vec3,
    pub scale: Vec3,
    pub rotation: f32,
}

impl Default for TextureMap {
    fn default() -> Self {
        TextureMap {
            filename: None,
            cube: Default::default(),
            u_filter: TexFilter::Linear,
            v_filter: TexFilter::Linear,
            u_wrap: TexWrap::Repeat,
            v_wrap: TexWrap::Repeat,
            offset: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: 0.0,
        }
    }
}

impl TextureMap {
    pub fn is_set(&self) -> bool {
        self.filename.is_some() || self.cube.iter().any(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialAttr {
    pub value: Vec4,
    pub map: TextureMap,
    pub user_data: UserData,
}

impl MaterialAttr {
    fn new(value: Vec4) -> Self {
        MaterialAttr {
            value,
            map: TextureMap::default(),
            user_data: UserData::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    attrs: [MaterialAttr; MATERIAL_ATTR_COUNT],
    pub user_data: UserData,
}

impl Material {
    /// Default material: base color (0.7, 0.7, 0.7, 1), ior/shininess/
    /// roughness/alpha at 1, everything else zero.
    pub fn new(name: impl Into<String>) -> Self {
        let attrs = [
            MaterialAttr::new(Vec4::new(0.7, 0.7, 0.7, 1.0)), // Color
            MaterialAttr::new(Vec4::ZERO),                    // Specular
            MaterialAttr::new(Vec4::new(1.0, 1.0, 1.0, 1.0)), // Shininess
            MaterialAttr::new(Vec4::new(1.0, 1.0, 1.0, 1.0)), // Roughness
            MaterialAttr::new(Vec4::ZERO),                    // Metallic
            MaterialAttr::new(Vec4::ZERO),                    // Emissive
            MaterialAttr::new(Vec4::ZERO),                    // Reflect
            MaterialAttr::new(Vec4::ZERO),                    // Transmit
            MaterialAttr::new(Vec4::new(1.0, 1.0, 1.0, 1.0)), // Ior
            MaterialAttr::new(Vec4::new(1.0, 1.0, 1.0, 1.0)), // Alpha
            MaterialAttr::new(Vec4::ZERO),                    // Bump
        ];
        Material {
            name: name.into(),
            attrs,
            user_data: UserData::None,
        }
    }

    pub fn attr(&self, ty: MaterialAttrType) -> &MaterialAttr {
        &self.attrs[ty.index()]
    }

    pub fn attr_mut(&mut self, ty: MaterialAttrType) -> &mut MaterialAttr {
        &mut self.attrs[ty.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialAttrType, &MaterialAttr)> {
        MATERIAL_ATTR_ORDER.iter().map(|&ty| (ty, self.attr(ty)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_material_matches_documented_defaults() {
        let m = Material::new("default");
        assert_eq!(m.attr(MaterialAttrType::Color).value, Vec4::new(0.7, 0.7, 0.7, 1.0));
        assert_eq!(m.attr(MaterialAttrType::Ior).value.x, 1.0);
        assert_eq!(m.attr(MaterialAttrType::Shininess).value.x, 1.0);
        assert_eq!(m.attr(MaterialAttrType::Roughness).value.x, 1.0);
        assert_eq!(m.attr(MaterialAttrType::Alpha).value.x, 1.0);
        assert_eq!(m.attr(MaterialAttrType::Metallic).value, Vec4::ZERO);
        assert_eq!(m.attr(MaterialAttrType::Bump).value, Vec4::ZERO);
    }

    #[test]
    fn attr_order_has_no_duplicates() {
        for ty in MATERIAL_ATTR_ORDER {
            assert!(ty.index() < MATERIAL_ATTR_COUNT);
        }
    }
}
