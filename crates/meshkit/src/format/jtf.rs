//! JTF ("Just Triangle Faces"): a trivial fixed-record binary format with
//! no indexing — every face owns three independent vertices.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use four_cc::FourCC;
use meshkit_common::{MeshError, MeshResult, Vec2, Vec3};
use meshkit_scene::{Mesh, Node, Scene};

const MAGIC: FourCC = FourCC(*b"JTF!");
const FORMAT_VERSION: u32 = 0;

fn read_vec3(r: &mut impl Read) -> MeshResult<Vec3> {
    Ok(Vec3::new(
        r.read_f32::<LittleEndian>()?,
        r.read_f32::<LittleEndian>()?,
        r.read_f32::<LittleEndian>()?,
    ))
}

fn read_vec2(r: &mut impl Read) -> MeshResult<Vec2> {
    Ok(Vec2::new(r.read_f32::<LittleEndian>()?, r.read_f32::<LittleEndian>()?))
}

fn write_vec3(w: &mut impl Write, v: Vec3) -> MeshResult<()> {
    w.write_f32::<LittleEndian>(v.x)?;
    w.write_f32::<LittleEndian>(v.y)?;
    w.write_f32::<LittleEndian>(v.z)?;
    Ok(())
}

fn write_vec2(w: &mut impl Write, v: Vec2) -> MeshResult<()> {
    w.write_f32::<LittleEndian>(v.x)?;
    w.write_f32::<LittleEndian>(v.y)?;
    Ok(())
}

pub fn load<R: Read>(scene: &mut Scene, r: &mut R) -> MeshResult<()> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if FourCC(magic) != MAGIC {
        return Err(MeshError::format("bad JTF magic"));
    }
    let version = r.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(MeshError::unsupported(format!(
            "unsupported JTF format version {version}"
        )));
    }
    let num_faces = r.read_u32::<LittleEndian>()?;

    let mut mesh = Mesh::new("jtf");
    for face in 0..num_faces {
        let base = face * 3;
        for _ in 0..3 {
            let pos = read_vec3(r)?;
            let normal = read_vec3(r)?;
            let uv = read_vec2(r)?;
            mesh.add_vertex(pos);
            mesh.add_normal(normal);
            mesh.add_texcoord(uv);
        }
        mesh.add_triangle(base, base + 1, base + 2);
    }

    let mesh_idx = scene.add_mesh(mesh);
    let mut node = Node::new("jtf");
    node.add_mesh(mesh_idx);
    scene.add_node(node);
    Ok(())
}

/// Flattens every scene mesh's indexed faces into independent vertices.
/// Missing normals default to `(0, 1, 0)`, missing UVs to `(0, 0)`. Not
/// bidirectional with the general scene graph: node transforms, materials
/// and mesh names are not represented in JTF and are dropped.
pub fn save<W: Write>(scene: &Scene, w: &mut W) -> MeshResult<()> {
    let total_faces: u32 = scene.meshes.iter().map(|m| m.num_faces() as u32).sum();

    w.write_all(&MAGIC.0)?;
    w.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    w.write_u32::<LittleEndian>(total_faces)?;

    for mesh in scene.meshes.iter() {
        for face in &mesh.faces {
            for &i in face {
                let i = i as usize;
                write_vec3(w, mesh.positions[i])?;
                let normal = mesh.normals.get(i).copied().unwrap_or(Vec3::Y);
                write_vec3(w, normal)?;
                let uv = mesh.texcoords.get(i).copied().unwrap_or(Vec2::ZERO);
                write_vec2(w, uv)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn one_triangle_scene() -> Scene {
        let mut scene = Scene::new();
        let mut mesh = Mesh::new("m");
        mesh.add_vertex(Vec3::ZERO);
        mesh.add_vertex(Vec3::X);
        mesh.add_vertex(Vec3::Y);
        mesh.add_normal(Vec3::Z);
        mesh.add_normal(Vec3::Z);
        mesh.add_normal(Vec3::Z);
        mesh.add_texcoord(Vec2::ZERO);
        mesh.add_texcoord(Vec2::X);
        mesh.add_texcoord(Vec2::Y);
        mesh.add_triangle(0, 1, 2);
        scene.add_mesh(mesh);
        scene
    }

    #[test]
    fn round_trips_face_count_and_attributes() {
        let scene = one_triangle_scene();
        let mut buf = Vec::new();
        save(&scene, &mut buf).unwrap();

        let mut loaded = Scene::new();
        load(&mut loaded, &mut Cursor::new(buf)).unwrap();
        assert_eq!(loaded.num_meshes(), 1);
        let mesh = loaded.get_mesh(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_verts(), 3);
        assert_eq!(mesh.positions[1], Vec3::X);
        assert_eq!(mesh.texcoords[2], Vec2::Y);
    }

    #[test]
    fn rejects_bad_magic() {
        let data = b"NOPE\x00\x00\x00\x00\x00\x00\x00\x00".to_vec();
        let mut scene = Scene::new();
        assert!(load(&mut scene, &mut Cursor::new(data)).is_err());
    }

    #[test]
    fn missing_attributes_default_on_save() {
        let mut scene = Scene::new();
        let mut mesh = Mesh::new("m");
        mesh.add_vertex(Vec3::ZERO);
        mesh.add_vertex(Vec3::X);
        mesh.add_vertex(Vec3::Y);
        mesh.add_triangle(0, 1, 2);
        scene.add_mesh(mesh);

        let mut buf = Vec::new();
        save(&scene, &mut buf).unwrap();
        let mut loaded = Scene::new();
        load(&mut loaded, &mut Cursor::new(buf)).unwrap();
        let mesh = loaded.get_mesh(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mesh.normals[0], Vec3::Y);
        assert_eq!(mesh.texcoords[0], Vec2::ZERO);
    }
}
