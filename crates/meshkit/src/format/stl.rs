//! Binary STL. Ground truth: `examples/original_source/src/fmtstl.c`.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use meshkit_common::{MeshError, MeshResult, Vec3};
use meshkit_scene::{Mesh, Node, Scene};

const HEADER_LEN: u64 = 80;
const RECORD_LEN: u64 = 50;

fn read_vec(r: &mut impl Read) -> MeshResult<Vec3> {
    // Disk order is (x, z, y); memory order is (x, y, z).
    let x = r.read_f32::<LittleEndian>()?;
    let z = r.read_f32::<LittleEndian>()?;
    let y = r.read_f32::<LittleEndian>()?;
    Ok(Vec3::new(x, y, z))
}

fn write_vec(w: &mut impl Write, v: Vec3) -> MeshResult<()> {
    w.write_f32::<LittleEndian>(v.x)?;
    w.write_f32::<LittleEndian>(v.z)?;
    w.write_f32::<LittleEndian>(v.y)?;
    Ok(())
}

pub fn load<R: Read + Seek>(scene: &mut Scene, r: &mut R) -> MeshResult<()> {
    let filesz = r.seek(SeekFrom::End(0))?;
    r.seek(SeekFrom::Start(HEADER_LEN))?;

    let nfaces = r.read_u32::<LittleEndian>()?;
    if HEADER_LEN + 4 + RECORD_LEN * nfaces as u64 != filesz {
        return Err(MeshError::format(
            "STL file length does not match the declared face count",
        ));
    }

    let mut mesh = Mesh::new("stl");
    let mut vidx = 0u32;
    for _ in 0..nfaces {
        let normal = read_vec(r)?;
        for _ in 0..3 {
            mesh.add_normal(normal);
            let p = read_vec(r)?;
            mesh.add_vertex(p);
        }
        mesh.add_triangle(vidx, vidx + 2, vidx + 1);
        vidx += 3;
        r.seek(SeekFrom::Current(2))?; // attribute byte count
    }

    let mesh_idx = scene.add_mesh(mesh);
    let mut node = Node::new("stl");
    node.add_mesh(mesh_idx);
    scene.add_node(node);
    Ok(())
}

const STL_ID: &[u8] = b"STL written by meshfile";

pub fn save<W: Write>(scene: &Scene, w: &mut W) -> MeshResult<()> {
    let mut header = [b' '; HEADER_LEN as usize];
    for (i, slot) in header.iter_mut().enumerate() {
        *slot = STL_ID[i % STL_ID.len()];
    }
    w.write_all(&header)?;

    let total_faces: u32 = scene
        .nodes
        .iter()
        .flat_map(|n| n.meshes.iter())
        .filter_map(|&m| scene.get_mesh(m))
        .map(|m| m.num_faces() as u32)
        .sum();
    w.write_u32::<LittleEndian>(total_faces)?;

    for node in scene.nodes.iter() {
        for &mesh_idx in &node.meshes {
            let Some(mesh) = scene.get_mesh(mesh_idx) else {
                continue;
            };
            write_mesh_world_space(w, mesh, &node.global)?;
        }
    }
    Ok(())
}

fn write_mesh_world_space<W: Write>(w: &mut W, mesh: &Mesh, mat: &glam::Mat4) -> MeshResult<()> {
    for face in &mesh.faces {
        let v: Vec<Vec3> = face
            .iter()
            .map(|&i| mat.transform_point3(mesh.positions[i as usize]))
            .collect();
        let normal = (v[1] - v[0]).cross(v[2] - v[0]).normalize_or_zero();

        write_vec(w, normal)?;
        write_vec(w, v[0])?;
        write_vec(w, v[2])?;
        write_vec(w, v[1])?;
        w.write_u16::<LittleEndian>(0)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn write_test_stl(faces: &[([f32; 3], [f32; 3], [f32; 3], [f32; 3])]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0u8; HEADER_LEN as usize]);
        buf.extend_from_slice(&(faces.len() as u32).to_le_bytes());
        for (n, a, b, c) in faces {
            for v in [n, a, c, b] {
                // disk order x, z, y
                buf.extend_from_slice(&v[0].to_le_bytes());
                buf.extend_from_slice(&v[2].to_le_bytes());
                buf.extend_from_slice(&v[1].to_le_bytes());
            }
            buf.extend_from_slice(&[0u8; 2]);
        }
        buf
    }

    #[test]
    fn loads_single_triangle() {
        let data = write_test_stl(&[(
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
        )]);
        let mut scene = Scene::new();
        load(&mut scene, &mut Cursor::new(data)).unwrap();
        assert_eq!(scene.num_meshes(), 1);
        let mesh = scene.get_mesh(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mesh.num_verts(), 3);
        assert_eq!(mesh.faces, vec![[0, 2, 1]]);
    }

    #[test]
    fn rejects_wrong_file_length() {
        let mut data = write_test_stl(&[(
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
        )]);
        data.truncate(data.len() - 10);
        let mut scene = Scene::new();
        assert!(load(&mut scene, &mut Cursor::new(data)).is_err());
    }

    #[test]
    fn save_then_load_round_trips_triangle_count() {
        let mut scene = Scene::new();
        let mut mesh = Mesh::new("m");
        mesh.add_vertex(Vec3::ZERO);
        mesh.add_vertex(Vec3::X);
        mesh.add_vertex(Vec3::Y);
        mesh.add_triangle(0, 1, 2);
        let mesh_idx = scene.add_mesh(mesh);
        let mut node = Node::new("n");
        node.add_mesh(mesh_idx);
        node.global = glam::Mat4::IDENTITY;
        scene.add_node(node);

        let mut buf = Vec::new();
        save(&scene, &mut buf).unwrap();

        let mut loaded = Scene::new();
        load(&mut loaded, &mut Cursor::new(buf)).unwrap();
        assert_eq!(loaded.num_meshes(), 1);
        assert_eq!(loaded.get_mesh(meshkit_common::Index::new(0)).unwrap().num_faces(), 1);
    }
}
