use meshkit_common::{Vec2, Vec3, Vec4};

use crate::mesh::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Triangles = 3,
    Quads = 4,
}

impl Primitive {
    fn vertex_count(self) -> u32 {
        self as u32
    }
}

/// Immediate-mode mesh builder: `vertex` appends a position plus whichever
/// "sticky" attributes (normal/tangent/texcoord/color) are currently set,
/// and a face is emitted automatically every `prim`-th vertex, exactly
/// like the original's glBegin-style API — minus the runtime magic-tag
/// guard, which Rust's borrow checker makes unnecessary (see
/// [`Mesh::begin`]).
pub struct ImmediateBuilder<'a> {
    mesh: &'a mut Mesh,
    prim: Primitive,
    session_verts: u32,
    normal: Option<Vec3>,
    tangent: Option<Vec3>,
    texcoord: Option<Vec2>,
    color: Option<Vec4>,
}

impl<'a> ImmediateBuilder<'a> {
    pub(crate) fn new(mesh: &'a mut Mesh, prim: Primitive) -> Self {
        ImmediateBuilder {
            mesh,
            prim,
            session_verts: 0,
            normal: None,
            tangent: None,
            texcoord: None,
            color: None,
        }
    }

    pub fn normal(&mut self, n: Vec3) -> &mut Self {
        self.normal = Some(n);
        self
    }

    pub fn tangent(&mut self, t: Vec3) -> &mut Self {
        self.tangent = Some(t);
        self
    }

    pub fn texcoord(&mut self, uv: Vec2) -> &mut Self {
        self.texcoord = Some(uv);
        self
    }

    pub fn color(&mut self, c: Vec4) -> &mut Self {
        self.color = Some(c);
        self
    }

    /// Appends a vertex (plus any active sticky attributes) and, every
    /// `prim`-th call, emits the face connecting the last `prim` vertices.
    pub fn vertex(&mut self, p: Vec3) -> &mut Self {
        let idx = self.mesh.add_vertex(p);
        if let Some(n) = self.normal {
            self.mesh.add_normal(n);
        }
        if let Some(t) = self.tangent {
            self.mesh.add_tangent(t);
        }
        if let Some(uv) = self.texcoord {
            self.mesh.add_texcoord(uv);
        }
        if let Some(c) = self.color {
            self.mesh.add_color(c);
        }

        self.session_verts += 1;
        let n = self.prim.vertex_count();
        if self.session_verts % n == 0 {
            let first = idx + 1 - n;
            match self.prim {
                Primitive::Triangles => self.mesh.add_triangle(first, first + 1, first + 2),
                Primitive::Quads => self.mesh.add_quad(first, first + 1, first + 2, first + 3),
            }
        }
        self
    }

    /// Ends the session. Flushing happens incrementally in `vertex`, so
    /// this only exists to give the session an explicit, readable end
    /// point and to return ownership of the mesh reference.
    pub fn end(self) {}
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn immediate_triangle_emits_one_face() {
        let mut mesh = Mesh::new("m");
        {
            let mut b = mesh.begin(Primitive::Triangles);
            b.vertex(Vec3::ZERO);
            b.vertex(Vec3::X);
            b.vertex(Vec3::Y);
        }
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
        assert_eq!(mesh.num_verts(), 3);
    }

    #[test]
    fn sticky_normal_applies_to_every_subsequent_vertex() {
        let mut mesh = Mesh::new("m");
        {
            let mut b = mesh.begin(Primitive::Triangles);
            b.normal(Vec3::Y);
            b.vertex(Vec3::ZERO);
            b.vertex(Vec3::X);
            b.vertex(Vec3::new(1.0, 1.0, 0.0));
        }
        assert_eq!(mesh.normals.len(), 3);
        assert!(mesh.normals.iter().all(|&n| n == Vec3::Y));
    }

    #[test]
    fn quads_emit_one_face_per_four_vertices() {
        let mut mesh = Mesh::new("m");
        {
            let mut b = mesh.begin(Primitive::Quads);
            b.vertex(Vec3::ZERO);
            b.vertex(Vec3::X);
            b.vertex(Vec3::new(1.0, 1.0, 0.0));
            b.vertex(Vec3::Y);
        }
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn begin_clears_previous_geometry() {
        let mut mesh = Mesh::new("m");
        mesh.add_vertex(Vec3::ONE);
        {
            let mut b = mesh.begin(Primitive::Triangles);
            b.vertex(Vec3::ZERO);
            b.vertex(Vec3::X);
            b.vertex(Vec3::Y);
        }
        assert_eq!(mesh.num_verts(), 3);
    }
}
