//! Wavefront OBJ + MTL. Ground truth: `examples/original_source/src/fmtobj.c`.
//!
//! No magic bytes, so this codec is only ever tried last during
//! auto-detection (see [`crate::dispatch`]).

use std::collections::HashMap;
use std::io::{BufRead, Read, Seek, Write};

use meshkit_common::{MeshError, MeshResult, Vec2, Vec3};
use meshkit_scene::{Mesh, Node, Scene};

use crate::dispatch::{SiblingCreator, SiblingOpener};
use crate::format::mtl;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct VertKey(i32, i32, i32);

fn parse_index(tok: &str, len: usize) -> Option<i32> {
    let v: i32 = tok.parse().ok()?;
    if v < 0 {
        Some(len as i32 + v)
    } else {
        Some(v - 1)
    }
}

/// Parses one `f` vertex spec: `v`, `v/t`, `v//n`, or `v/t/n`.
fn parse_face_vert(tok: &str, nv: usize, nt: usize, nn: usize) -> Option<VertKey> {
    let mut parts = tok.split('/');
    let v = parse_index(parts.next()?, nv)?;
    let t = match parts.next() {
        Some("") | None => -1,
        Some(s) => parse_index(s, nt)?,
    };
    let n = match parts.next() {
        Some("") | None => -1,
        Some(s) => parse_index(s, nn)?,
    };
    Some(VertKey(v, t, n))
}

/// Per-mesh OBJ build state: raw attribute pools plus a dedup map from
/// `(v, t, n)` index triples to the output mesh's vertex index.
///
/// The original C loader keeps a single dedup map for the whole file,
/// never resetting it at `o`/`g` boundaries — so a `(v, t, n)` triple
/// reused in a later mesh incorrectly reuses a vertex index cached from an
/// earlier, unrelated mesh once that mesh has fewer vertices. That reads
/// as a bug rather than intent: spec.md describes dedup producing "one
/// output vertex in the output mesh" (singular, per mesh), so this dedup
/// map is reset at every new mesh instead.
struct ObjBuilder {
    mesh: Mesh,
    dedup: HashMap<VertKey, u32>,
}

impl ObjBuilder {
    fn new(name: &str) -> Self {
        ObjBuilder {
            mesh: Mesh::new(name),
            dedup: HashMap::new(),
        }
    }
}

pub fn load<R: Read + Seek>(
    scene: &mut Scene,
    r: &mut R,
    dirname: &str,
    sibling: &SiblingOpener,
) -> MeshResult<()> {
    scene.dirname = dirname.to_string();

    let mut positions: Vec<Vec3> = Vec::new();
    let mut texcoords: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut cur = ObjBuilder::new("default");
    let mut cur_material: Option<String> = None;
    let mut any_directive = false;

    let reader = std::io::BufReader::new(r);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut it = line.splitn(2, char::is_whitespace);
        let cmd = it.next().unwrap_or("");
        let rest = it.next().unwrap_or("").trim();
        if cmd.is_empty() {
            continue;
        }

        match cmd {
            "v" => {
                let f = parse_floats3(rest).ok_or_else(|| MeshError::format("malformed v line"))?;
                positions.push(Vec3::new(f[0], f[1], f[2]));
                any_directive = true;
            }
            "vn" => {
                let f = parse_floats3(rest).ok_or_else(|| MeshError::format("malformed vn line"))?;
                normals.push(Vec3::new(f[0], f[1], f[2]));
                any_directive = true;
            }
            "vt" => {
                let f: Vec<f32> = rest.split_whitespace().filter_map(|s| s.parse().ok()).collect();
                if f.len() < 2 {
                    return Err(MeshError::format("malformed vt line"));
                }
                // V is flipped on read only; the writer emits raw values.
                texcoords.push(Vec2::new(f[0], 1.0 - f[1]));
                any_directive = true;
            }
            "f" => {
                any_directive = true;
                let verts: Vec<&str> = rest.split_whitespace().collect();
                if verts.len() != 3 && verts.len() != 4 {
                    return Err(MeshError::format("faces must have 3 or 4 vertices"));
                }
                let mut idx = [0u32; 4];
                for (i, tok) in verts.iter().enumerate() {
                    let key = parse_face_vert(tok, positions.len(), texcoords.len(), normals.len())
                        .ok_or_else(|| MeshError::format("malformed face vertex"))?;
                    idx[i] = *cur.dedup.entry(key).or_insert_with(|| {
                        let vi = cur.mesh.add_vertex(positions[key.0 as usize]);
                        if key.2 >= 0 {
                            cur.mesh.add_normal(normals[key.2 as usize]);
                        }
                        if key.1 >= 0 {
                            cur.mesh.add_texcoord(texcoords[key.1 as usize]);
                        }
                        vi
                    });
                }
                if verts.len() == 3 {
                    cur.mesh.add_triangle(idx[0], idx[1], idx[2]);
                } else {
                    cur.mesh.add_quad(idx[0], idx[1], idx[2], idx[3]);
                }
            }
            "o" | "g" => {
                finalize_mesh(scene, std::mem::replace(&mut cur, ObjBuilder::new(rest)), &cur_material);
                cur_material = None;
            }
            "mtllib" => {
                let resolved = scene.find_asset(rest);
                let handle = sibling(&resolved)?;
                mtl::load(scene, handle)?;
            }
            "usemtl" => {
                cur_material = Some(rest.to_string());
            }
            _ => {}
        }
    }

    finalize_mesh(scene, cur, &cur_material);

    if !any_directive {
        return Err(MeshError::format("not an OBJ file"));
    }
    Ok(())
}

fn parse_floats3(rest: &str) -> Option<[f32; 3]> {
    let f: Vec<f32> = rest.split_whitespace().filter_map(|s| s.parse().ok()).collect();
    if f.len() < 3 {
        return None;
    }
    Some([f[0], f[1], f[2]])
}

/// Skips empty meshes; warns and skips meshes with an inconsistent number
/// of normals or texcoords relative to the vertex count (a face-vertex in
/// this mesh specified the attribute while another didn't).
fn finalize_mesh(scene: &mut Scene, builder: ObjBuilder, material_name: &Option<String>) {
    let mesh = builder.mesh;
    if mesh.faces.is_empty() {
        return;
    }
    if !mesh.normals.is_empty() && mesh.normals.len() != mesh.positions.len() {
        log::warn!("mesh {:?}: inconsistent normal count, dropping mesh", mesh.name);
        return;
    }
    if !mesh.texcoords.is_empty() && mesh.texcoords.len() != mesh.positions.len() {
        log::warn!("mesh {:?}: inconsistent texcoord count, dropping mesh", mesh.name);
        return;
    }

    let mut mesh = mesh;
    if let Some(name) = material_name {
        mesh.material = scene.find_material(name);
    }

    let name = mesh.name.clone();
    let mesh_idx = scene.add_mesh(mesh);
    let mut node = Node::new(name);
    node.add_mesh(mesh_idx);
    scene.add_node(node);
}

pub fn save<W: Write>(
    scene: &Scene,
    w: &mut W,
    dirname: &str,
    creator: &SiblingCreator,
) -> MeshResult<()> {
    writeln!(w, "# written by meshkit")?;

    let mtl_name = format!("{}.mtl", if scene.name.is_empty() { "scene" } else { &scene.name });
    if scene.num_materials() > 0 {
        let mtl_path = if dirname.is_empty() {
            mtl_name.clone()
        } else {
            format!("{dirname}/{mtl_name}")
        };
        if let Ok(handle) = creator(&mtl_path) {
            let mut handle = handle;
            mtl::save(scene, &mut handle)?;
            writeln!(w, "mtllib {mtl_name}")?;
        }
    }

    let mut voffs: u32 = 0;
    for node in scene.nodes.iter() {
        for &mesh_idx in &node.meshes {
            let Some(mesh) = scene.get_mesh(mesh_idx) else {
                continue;
            };
            write_mesh(w, scene, mesh, &mut voffs)?;
        }
    }
    Ok(())
}

fn write_mesh<W: Write>(w: &mut W, scene: &Scene, mesh: &Mesh, voffs: &mut u32) -> MeshResult<()> {
    writeln!(w, "o {}", mesh.name)?;
    if let Some(mtl_idx) = mesh.material {
        if let Some(mtl) = scene.get_material(mtl_idx) {
            writeln!(w, "usemtl {}", mtl.name)?;
        }
    }

    for p in &mesh.positions {
        writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for n in &mesh.normals {
        writeln!(w, "vn {} {} {}", n.x, n.y, n.z)?;
    }
    for uv in &mesh.texcoords {
        writeln!(w, "vt {} {}", uv.x, uv.y)?;
    }

    let has_n = !mesh.normals.is_empty();
    let has_t = !mesh.texcoords.is_empty();
    for face in &mesh.faces {
        write!(w, "f")?;
        for &vi in face {
            let i = *voffs + vi + 1;
            match (has_t, has_n) {
                (true, true) => write!(w, " {i}/{i}/{i}")?,
                (true, false) => write!(w, " {i}/{i}")?,
                (false, true) => write!(w, " {i}//{i}")?,
                (false, false) => write!(w, " {i}")?,
            }
        }
        writeln!(w)?;
    }
    *voffs += mesh.num_verts() as u32;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn no_siblings_opener() -> Box<SiblingOpener<'static>> {
        Box::new(|name: &str| {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no sibling: {name}"),
            ))
        })
    }
    fn no_siblings_creator() -> Box<SiblingCreator<'static>> {
        Box::new(|name: &str| {
            Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("no sibling: {name}"),
            ))
        })
    }

    #[test]
    fn loads_single_triangle() {
        let src = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n".to_vec();
        let mut scene = Scene::new();
        let opener = no_siblings_opener();
        load(&mut scene, &mut Cursor::new(src), "", &*opener).unwrap();
        assert_eq!(scene.num_meshes(), 1);
        let mesh = scene.get_mesh(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mesh.num_verts(), 3);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn quad_face_splits_into_two_triangles() {
        let src = b"v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n".to_vec();
        let mut scene = Scene::new();
        let opener = no_siblings_opener();
        load(&mut scene, &mut Cursor::new(src), "", &*opener).unwrap();
        let mesh = scene.get_mesh(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn negative_indices_resolve_against_running_count() {
        let src = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n".to_vec();
        let mut scene = Scene::new();
        let opener = no_siblings_opener();
        load(&mut scene, &mut Cursor::new(src), "", &*opener).unwrap();
        let mesh = scene.get_mesh(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn vt_is_v_flipped_on_read() {
        let src = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n".to_vec();
        let mut scene = Scene::new();
        let opener = no_siblings_opener();
        load(&mut scene, &mut Cursor::new(src), "", &*opener).unwrap();
        let mesh = scene.get_mesh(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mesh.texcoords[0], Vec2::new(0.0, 1.0));
    }

    #[test]
    fn usemtl_does_not_carry_across_mesh_boundary() {
        let src = b"o a\nusemtl red\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\no b\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 1 2 3\n"
            .to_vec();
        let mut scene = Scene::new();
        let opener = no_siblings_opener();
        load(&mut scene, &mut Cursor::new(src), "", &*opener).unwrap();
        assert_eq!(scene.num_meshes(), 2);
        let mesh_b = scene.get_mesh(meshkit_common::Index::new(1)).unwrap();
        assert!(mesh_b.material.is_none());
    }

    #[test]
    fn empty_mesh_is_dropped() {
        let src = b"o empty\no real\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n".to_vec();
        let mut scene = Scene::new();
        let opener = no_siblings_opener();
        load(&mut scene, &mut Cursor::new(src), "", &*opener).unwrap();
        assert_eq!(scene.num_meshes(), 1);
    }

    #[test]
    fn save_then_load_round_trips_triangle() {
        let mut scene = Scene::new();
        let mut mesh = Mesh::new("m");
        mesh.add_vertex(Vec3::ZERO);
        mesh.add_vertex(Vec3::X);
        mesh.add_vertex(Vec3::Y);
        mesh.add_triangle(0, 1, 2);
        let mesh_idx = scene.add_mesh(mesh);
        let mut node = Node::new("m");
        node.add_mesh(mesh_idx);
        scene.add_node(node);

        let mut buf = Vec::new();
        let creator = no_siblings_creator();
        save(&scene, &mut buf, "", &*creator).unwrap();

        let mut loaded = Scene::new();
        let opener = no_siblings_opener();
        load(&mut loaded, &mut Cursor::new(buf), "", &*opener).unwrap();
        assert_eq!(loaded.num_meshes(), 1);
        let mesh = loaded.get_mesh(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.positions[1], Vec3::X);
    }

    #[test]
    fn rejects_non_obj_input() {
        let mut scene = Scene::new();
        let opener = no_siblings_opener();
        let data = vec![0u8, 1, 2, 3, 4, 5, 6, 7];
        assert!(load(&mut scene, &mut Cursor::new(data), "", &*opener).is_err());
    }
}
