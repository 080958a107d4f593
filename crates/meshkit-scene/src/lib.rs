pub mod builder;
pub mod material;
pub mod mesh;
pub mod node;
pub mod scene;
pub mod userdata;

pub use builder::{ImmediateBuilder, Primitive};
pub use material::{Material, MaterialAttr, MaterialAttrType, TexFilter, TextureMap, TexWrap, MATERIAL_ATTR_ORDER};
pub use mesh::{Face, Mesh};
pub use node::Node;
pub use scene::Scene;
pub use userdata::UserData;
