pub mod aabb;
pub mod arena;
pub mod base64;
pub mod error;
pub mod io;
pub mod math;

pub use aabb::{aabb_close, Aabb};
pub use arena::{Arena, Index};
pub use error::{MeshError, MeshResult};
pub use io::{FileIoProvider, IoProvider, MeshIo, OpenMode};
pub use math::{dir_matrix, inverse_checked, prs, transform_dir, transform_point, Mat4, Quat, Vec2, Vec3, Vec4};
