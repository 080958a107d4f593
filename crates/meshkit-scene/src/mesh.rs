use meshkit_common::{Aabb, Index, Vec2, Vec3, Vec4};

use crate::builder::{ImmediateBuilder, Primitive};
use crate::material::Material;
use crate::userdata::UserData;

pub type Face = [u32; 3];

/// A mesh: parallel per-vertex attribute arrays plus a triangle index
/// list. `normal`/`tangent`/`texcoord`/`color` are empty when the
/// attribute was never supplied; `positions.len()` is the vertex count
/// every non-empty attribute array must match.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    pub colors: Vec<Vec4>,
    pub faces: Vec<Face>,
    pub bounds: Aabb,
    pub material: Option<Index<Material>>,
    pub user_data: UserData,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Mesh {
            name: name.into(),
            bounds: Aabb::EMPTY,
            ..Default::default()
        }
    }

    pub fn num_verts(&self) -> usize {
        self.positions.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn add_vertex(&mut self, p: Vec3) -> u32 {
        self.positions.push(p);
        self.bounds.expand(p);
        (self.positions.len() - 1) as u32
    }

    pub fn add_normal(&mut self, n: Vec3) {
        self.normals.push(n);
    }

    pub fn add_tangent(&mut self, t: Vec3) {
        self.tangents.push(t);
    }

    pub fn add_texcoord(&mut self, uv: Vec2) {
        self.texcoords.push(uv);
    }

    pub fn add_color(&mut self, c: Vec4) {
        self.colors.push(c);
    }

    pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.faces.push([a, b, c]);
    }

    /// Splits a quad into two triangles: (a, b, c) and (a, c, d).
    pub fn add_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.add_triangle(a, b, c);
        self.add_triangle(a, c, d);
    }

    /// Discards all geometry, resetting bounds to empty. Used both as a
    /// public reset and internally by [`Mesh::begin`].
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.tangents.clear();
        self.texcoords.clear();
        self.colors.clear();
        self.faces.clear();
        self.bounds = Aabb::EMPTY;
    }

    /// Recomputes the local AABB (invariant: hull of `positions`) from
    /// scratch. Codecs that fill `positions` directly (bulk-decoded
    /// vertex arrays) rather than through `add_vertex` must call this
    /// once they're done.
    pub fn recompute_bounds(&mut self) {
        let mut bounds = Aabb::EMPTY;
        for &p in &self.positions {
            bounds.expand(p);
        }
        self.bounds = bounds;
    }

    /// Starts an immediate-mode build session: clears the mesh and returns
    /// a builder that mutably borrows it for the duration of the session.
    /// Attribute calls (`normal`/`tangent`/`texcoord`/`color`) only exist on
    /// the returned builder, so calling them without an active session is a
    /// compile error rather than a silently-ignored runtime no-op.
    pub fn begin(&mut self, prim: Primitive) -> ImmediateBuilder<'_> {
        self.clear();
        ImmediateBuilder::new(self, prim)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_vertex_expands_bounds() {
        let mut m = Mesh::new("m");
        m.add_vertex(Vec3::new(1.0, 2.0, 3.0));
        m.add_vertex(Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(m.bounds.vmin, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(m.bounds.vmax, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn add_quad_splits_into_two_triangles() {
        let mut m = Mesh::new("m");
        for _ in 0..4 {
            m.add_vertex(Vec3::ZERO);
        }
        m.add_quad(0, 1, 2, 3);
        assert_eq!(m.faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn clear_resets_bounds_to_empty() {
        let mut m = Mesh::new("m");
        m.add_vertex(Vec3::ONE);
        m.clear();
        assert!(m.bounds.is_empty());
        assert_eq!(m.num_verts(), 0);
    }
}
