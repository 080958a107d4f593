//! Autodesk 3DS: a recursive binary chunk tree. Ground truth:
//! `examples/original_source/src/fmt3ds.c`.
//!
//! Coordinate convention: 3DS is Y-forward, Z-up. On read, a stored vertex
//! `(fx, fy, fz)` becomes `(fx, fz, -fy)`; on write the inverse. The mesh
//! matrix chunk uses a *different*, asymmetric convention: each axis
//! row has its y/z components swapped (no negation), and gets dropped into
//! the output matrix's columns out of order (X, Z, Y, translation) — this
//! mirrors the original exactly rather than "fixing" it into the vertex
//! convention (see DESIGN.md).

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use meshkit_common::{inverse_checked, Mat4, MeshError, MeshResult, Vec2, Vec3};
use meshkit_scene::{Material, MaterialAttrType, Mesh, Node, Scene};

const CID_RGBF: u16 = 0x0010;
const CID_RGB: u16 = 0x0011;
const CID_RGB_GAMMA: u16 = 0x0012;
const CID_RGBF_GAMMA: u16 = 0x0013;
const CID_PERCENT_INT: u16 = 0x0030;
const CID_PERCENT_FLT: u16 = 0x0031;
const CID_MAIN: u16 = 0x4d4d;
const CID_3DEDITOR: u16 = 0x3d3d;
const CID_MESHVER: u16 = 0x3d3e;
const CID_VERSION: u16 = 0x0002;
const CID_OBJECT: u16 = 0x4000;
const CID_TRIMESH: u16 = 0x4100;
const CID_VERTLIST: u16 = 0x4110;
const CID_FACEDESC: u16 = 0x4120;
const CID_FACEMTL: u16 = 0x4130;
const CID_UVLIST: u16 = 0x4140;
const CID_MESHMATRIX: u16 = 0x4160;
const CID_MATERIAL: u16 = 0xafff;
const CID_MTL_NAME: u16 = 0xa000;
const CID_MTL_AMBIENT: u16 = 0xa010;
const CID_MTL_DIFFUSE: u16 = 0xa020;
const CID_MTL_SPECULAR: u16 = 0xa030;
const CID_MTL_SHININESS: u16 = 0xa040;
const CID_MTL_SHINSTR: u16 = 0xa041;
const CID_MTL_SELFILLUM: u16 = 0xa084;
const CID_MTL_TEXMAP1: u16 = 0xa200;
const CID_MTL_ALPHAMAP: u16 = 0xa210;
const CID_MTL_REFLMAP: u16 = 0xa220;
const CID_MTL_BUMPMAP: u16 = 0xa230;
const CID_MTL_SPECMAP: u16 = 0xa204;
const CID_MTL_SHINMAP: u16 = 0xa33c;
const CID_MAP_FILENAME: u16 = 0xa300;
const CID_MAP_USCALE: u16 = 0xa356;
const CID_MAP_VSCALE: u16 = 0xa354;
const CID_MAP_UOFFS: u16 = 0xa358;
const CID_MAP_VOFFS: u16 = 0xa35a;
const CID_MAP_UVROT: u16 = 0xa35c;

const CHDR_SIZE: u64 = 6;
const MROW_OFFS: [usize; 4] = [0, 8, 4, 12];
const MAPMAP: &[(u16, MaterialAttrType)] = &[
    (CID_MTL_TEXMAP1, MaterialAttrType::Color),
    (CID_MTL_ALPHAMAP, MaterialAttrType::Alpha),
    (CID_MTL_BUMPMAP, MaterialAttrType::Bump),
    (CID_MTL_SHINMAP, MaterialAttrType::Shininess),
    (CID_MTL_SPECMAP, MaterialAttrType::Specular),
    (CID_MTL_REFLMAP, MaterialAttrType::Reflect),
];

#[derive(Clone, Copy)]
struct Chunk {
    id: u16,
    endpos: u64,
}

fn read_chunk<R: Read + Seek>(r: &mut R, bound: Option<u64>) -> MeshResult<Chunk> {
    let fpos = r.stream_position()?;
    if let Some(bound) = bound {
        if fpos + CHDR_SIZE > bound {
            return Err(MeshError::format("truncated 3DS chunk header"));
        }
    }
    let id = r.read_u16::<LittleEndian>()?;
    let len = r.read_u32::<LittleEndian>()?;
    Ok(Chunk {
        id,
        endpos: fpos + len as u64,
    })
}

fn skip_chunk<R: Read + Seek>(r: &mut R, ck: &Chunk) -> MeshResult<()> {
    r.seek(SeekFrom::Start(ck.endpos))?;
    Ok(())
}

fn read_vertex<R: Read>(r: &mut R) -> MeshResult<Vec3> {
    let x = r.read_f32::<LittleEndian>()?;
    let y = r.read_f32::<LittleEndian>()?;
    let z = r.read_f32::<LittleEndian>()?;
    Ok(Vec3::new(x, z, -y))
}

fn write_vertex<W: Write>(w: &mut W, v: Vec3) -> MeshResult<()> {
    w.write_f32::<LittleEndian>(v.x)?;
    w.write_f32::<LittleEndian>(-v.z)?;
    w.write_f32::<LittleEndian>(v.y)?;
    Ok(())
}

fn read_str<R: Read + Seek>(r: &mut R, bound: u64) -> MeshResult<String> {
    let mut bytes = Vec::new();
    loop {
        let pos = r.stream_position()?;
        if pos >= bound {
            break;
        }
        let b = r.read_u8()?;
        if b == 0 {
            break;
        }
        bytes.push(b);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_color<R: Read + Seek>(r: &mut R, bound: u64) -> MeshResult<Option<Vec3>> {
    let ck = read_chunk(r, Some(bound))?;
    let result = match ck.id {
        CID_RGB | CID_RGB_GAMMA => {
            let mut rgb = [0u8; 3];
            r.read_exact(&mut rgb)?;
            Some(Vec3::new(
                rgb[0] as f32 / 255.0,
                rgb[1] as f32 / 255.0,
                rgb[2] as f32 / 255.0,
            ))
        }
        CID_RGBF | CID_RGBF_GAMMA => Some(Vec3::new(
            r.read_f32::<LittleEndian>()?,
            r.read_f32::<LittleEndian>()?,
            r.read_f32::<LittleEndian>()?,
        )),
        _ => {
            skip_chunk(r, &ck)?;
            None
        }
    };
    Ok(result)
}

fn read_percent<R: Read + Seek>(r: &mut R, bound: u64) -> MeshResult<Option<f32>> {
    let ck = read_chunk(r, Some(bound))?;
    let result = match ck.id {
        CID_PERCENT_INT => Some(r.read_u16::<LittleEndian>()? as f32 / 100.0),
        CID_PERCENT_FLT => Some(r.read_f32::<LittleEndian>()? / 100.0),
        _ => {
            skip_chunk(r, &ck)?;
            None
        }
    };
    Ok(result)
}

pub fn load<R: Read + Seek>(scene: &mut Scene, r: &mut R) -> MeshResult<()> {
    let root = read_chunk(r, None)?;
    if root.id != CID_MAIN {
        return Err(MeshError::format("not a 3DS file (bad MAIN chunk id)"));
    }

    while let Ok(ck) = read_chunk(r, Some(root.endpos)) {
        match ck.id {
            CID_3DEDITOR => {
                // No payload of its own; its children follow immediately and
                // are bounded by the same MAIN endpos, so we just continue.
            }
            CID_MATERIAL => read_material(scene, r, ck.endpos)?,
            CID_OBJECT => read_object(scene, r, ck.endpos)?,
            _ => skip_chunk(r, &ck)?,
        }
    }
    Ok(())
}

fn read_map<R: Read + Seek>(r: &mut R, bound: u64) -> MeshResult<meshkit_scene::TextureMap> {
    let mut map = meshkit_scene::TextureMap::default();
    while let Ok(ck) = read_chunk(r, Some(bound)) {
        match ck.id {
            CID_MAP_FILENAME => {
                let name = read_str(r, ck.endpos)?;
                map.filename = Some(name.to_lowercase());
            }
            CID_MAP_UOFFS => map.offset.x = r.read_f32::<LittleEndian>()?,
            CID_MAP_VOFFS => map.offset.y = r.read_f32::<LittleEndian>()?,
            CID_MAP_USCALE => map.scale.x = r.read_f32::<LittleEndian>()?,
            CID_MAP_VSCALE => map.scale.y = r.read_f32::<LittleEndian>()?,
            CID_MAP_UVROT => map.rotation = r.read_f32::<LittleEndian>()?,
            _ => skip_chunk(r, &ck)?,
        }
    }
    Ok(map)
}

fn read_material<R: Read + Seek>(scene: &mut Scene, r: &mut R, bound: u64) -> MeshResult<()> {
    let mut mtl = Material::new("");
    let mut shin = 0.0f32;
    let mut shinstr = 1.0f32;
    let mut selfillum = 0.0f32;

    while let Ok(ck) = read_chunk(r, Some(bound)) {
        match ck.id {
            CID_MTL_NAME => mtl.name = read_str(r, ck.endpos)?,
            CID_MTL_DIFFUSE => {
                if let Some(c) = read_color(r, ck.endpos)? {
                    let a = mtl.attr_mut(MaterialAttrType::Color);
                    a.value.x = c.x;
                    a.value.y = c.y;
                    a.value.z = c.z;
                }
                skip_chunk(r, &ck)?;
            }
            CID_MTL_SPECULAR => {
                if let Some(c) = read_color(r, ck.endpos)? {
                    let a = mtl.attr_mut(MaterialAttrType::Specular);
                    a.value.x = c.x;
                    a.value.y = c.y;
                    a.value.z = c.z;
                }
                skip_chunk(r, &ck)?;
            }
            CID_MTL_SELFILLUM => {
                if let Some(v) = read_percent(r, ck.endpos)? {
                    selfillum = v;
                }
                skip_chunk(r, &ck)?;
            }
            CID_MTL_SHININESS => {
                if let Some(v) = read_percent(r, ck.endpos)? {
                    shin = v;
                }
                skip_chunk(r, &ck)?;
            }
            CID_MTL_SHINSTR => {
                if let Some(v) = read_percent(r, ck.endpos)? {
                    shinstr = v;
                }
                skip_chunk(r, &ck)?;
            }
            CID_MTL_TEXMAP1
            | CID_MTL_SPECMAP
            | CID_MTL_SHINMAP
            | CID_MTL_ALPHAMAP
            | CID_MTL_BUMPMAP
            | CID_MTL_REFLMAP => {
                if let Some(&(_, attr)) = MAPMAP.iter().find(|&&(id, _)| id == ck.id) {
                    let map = read_map(r, ck.endpos)?;
                    mtl.attr_mut(attr).map = map;
                } else {
                    skip_chunk(r, &ck)?;
                }
            }
            _ => skip_chunk(r, &ck)?,
        }
    }

    let color = mtl.attr(MaterialAttrType::Color).value;
    mtl.attr_mut(MaterialAttrType::Shininess).value.x = shin * shinstr * 128.0;
    let emissive = mtl.attr_mut(MaterialAttrType::Emissive);
    emissive.value.x = color.x * selfillum;
    emissive.value.y = color.y * selfillum;
    emissive.value.z = color.z * selfillum;

    scene.add_material(mtl);
    Ok(())
}

fn read_object<R: Read + Seek>(scene: &mut Scene, r: &mut R, bound: u64) -> MeshResult<()> {
    let name = read_str(r, bound)?;
    let mut mesh = Mesh::new(name.clone());
    let mut node = Node::new(name);
    let mut mesh_matrix: Option<Mat4> = None;

    while let Ok(ck) = read_chunk(r, Some(bound)) {
        match ck.id {
            CID_TRIMESH => {
                mesh_matrix = read_trimesh(r, &mut mesh, scene, ck.endpos)?;
            }
            _ => skip_chunk(r, &ck)?,
        }
    }

    if mesh.num_verts() == 0 {
        return Ok(());
    }

    if let Some(m) = mesh_matrix {
        node.local = m;
        if let Some(inv) = inverse_checked(&m) {
            for p in mesh.positions.iter_mut() {
                *p = inv.transform_point3(*p);
            }
        }
    }
    mesh.recompute_bounds();

    let mesh_idx = scene.add_mesh(mesh);
    node.add_mesh(mesh_idx);
    scene.add_node(node);
    Ok(())
}

/// Returns the mesh-local matrix read from a `CID_MESHMATRIX` chunk, if
/// present. Vertices and UVs are added directly to `mesh`; the caller bakes
/// the matrix's inverse into `mesh.positions` afterward.
fn read_trimesh<R: Read + Seek>(
    r: &mut R,
    mesh: &mut Mesh,
    scene: &Scene,
    bound: u64,
) -> MeshResult<Option<Mat4>> {
    let mut matrix = None;

    while let Ok(ck) = read_chunk(r, Some(bound)) {
        match ck.id {
            CID_VERTLIST => {
                let n = r.read_u16::<LittleEndian>()?;
                for _ in 0..n {
                    let v = read_vertex(r)?;
                    mesh.add_vertex(v);
                }
            }
            CID_UVLIST => {
                let n = r.read_u16::<LittleEndian>()?;
                for _ in 0..n {
                    let u = r.read_f32::<LittleEndian>()?;
                    let v = r.read_f32::<LittleEndian>()?;
                    mesh.add_texcoord(Vec2::new(u, v));
                }
            }
            CID_FACEDESC => {
                let n = r.read_u16::<LittleEndian>()?;
                for _ in 0..n {
                    let a = r.read_u16::<LittleEndian>()? as u32;
                    let b = r.read_u16::<LittleEndian>()? as u32;
                    let c = r.read_u16::<LittleEndian>()? as u32;
                    mesh.add_triangle(a, b, c);
                    let _ = r.read_u16::<LittleEndian>(); // edge visibility flags, ignored
                }
            }
            CID_FACEMTL => {
                let name = read_str(r, ck.endpos)?;
                if let Some(idx) = scene.find_material(&name) {
                    mesh.material = Some(idx);
                }
                skip_chunk(r, &ck)?;
            }
            CID_MESHMATRIX => {
                let mut cols = [0f32; 16];
                for i in 0..4 {
                    let mut v = [
                        r.read_f32::<LittleEndian>()?,
                        r.read_f32::<LittleEndian>()?,
                        r.read_f32::<LittleEndian>()?,
                    ];
                    v.swap(1, 2);
                    let off = MROW_OFFS[i];
                    cols[off] = v[0];
                    cols[off + 1] = v[1];
                    cols[off + 2] = v[2];
                    cols[off + 3] = 0.0;
                }
                cols[15] = 1.0;
                matrix = Some(Mat4::from_cols_array(&cols));
            }
            _ => skip_chunk(r, &ck)?,
        }
    }
    Ok(matrix)
}

fn write_chunk_header<W: Write>(w: &mut W, id: u16, len: u32) -> MeshResult<()> {
    w.write_u16::<LittleEndian>(id)?;
    w.write_u32::<LittleEndian>(len)?;
    Ok(())
}

fn begin_chunk<W: Write + Seek>(w: &mut W, id: u16) -> MeshResult<u64> {
    let fpos = w.stream_position()?;
    write_chunk_header(w, id, 0)?;
    Ok(fpos)
}

fn end_chunk<W: Write + Seek>(w: &mut W, fpos: u64) -> MeshResult<()> {
    let end = w.stream_position()?;
    let len = (end - fpos) as u32;
    w.seek(SeekFrom::Start(fpos + 2))?;
    w.write_u32::<LittleEndian>(len)?;
    w.seek(SeekFrom::Start(end))?;
    Ok(())
}

fn write_cstr<W: Write>(w: &mut W, s: &str) -> MeshResult<()> {
    w.write_all(s.as_bytes())?;
    w.write_u8(0)?;
    Ok(())
}

fn write_chunk_str<W: Write + Seek>(w: &mut W, id: u16, s: &str) -> MeshResult<()> {
    let fpos = begin_chunk(w, id)?;
    write_cstr(w, s)?;
    end_chunk(w, fpos)
}

fn write_chunk_flt<W: Write + Seek>(w: &mut W, id: u16, val: f32) -> MeshResult<()> {
    let fpos = begin_chunk(w, id)?;
    w.write_f32::<LittleEndian>(val)?;
    end_chunk(w, fpos)
}

fn write_color<W: Write + Seek>(w: &mut W, id: u16, c: Vec3) -> MeshResult<()> {
    let fpos = begin_chunk(w, id)?;
    let inner = begin_chunk(w, CID_RGB)?;
    w.write_u8((c.x.clamp(0.0, 1.0) * 255.0) as u8)?;
    w.write_u8((c.y.clamp(0.0, 1.0) * 255.0) as u8)?;
    w.write_u8((c.z.clamp(0.0, 1.0) * 255.0) as u8)?;
    end_chunk(w, inner)?;
    end_chunk(w, fpos)
}

fn write_percent<W: Write + Seek>(w: &mut W, id: u16, val: f32) -> MeshResult<()> {
    let fpos = begin_chunk(w, id)?;
    let inner = begin_chunk(w, CID_PERCENT_FLT)?;
    w.write_f32::<LittleEndian>(val * 100.0)?;
    end_chunk(w, inner)?;
    end_chunk(w, fpos)
}

fn write_map<W: Write + Seek>(w: &mut W, id: u16, map: &meshkit_scene::TextureMap) -> MeshResult<()> {
    let fpos = begin_chunk(w, id)?;
    write_chunk_str(w, CID_MAP_FILENAME, map.filename.as_deref().unwrap_or(""))?;
    write_chunk_flt(w, CID_MAP_UOFFS, map.offset.x)?;
    write_chunk_flt(w, CID_MAP_VOFFS, map.offset.y)?;
    write_chunk_flt(w, CID_MAP_USCALE, map.scale.x)?;
    write_chunk_flt(w, CID_MAP_VSCALE, map.scale.y)?;
    write_chunk_flt(w, CID_MAP_UVROT, map.rotation)?;
    end_chunk(w, fpos)
}

fn write_material<W: Write + Seek>(w: &mut W, mtl: &Material) -> MeshResult<()> {
    let fpos = begin_chunk(w, CID_MATERIAL)?;
    write_chunk_str(w, CID_MTL_NAME, &mtl.name)?;

    let color = mtl.attr(MaterialAttrType::Color).value;
    let specular = mtl.attr(MaterialAttrType::Specular).value;
    let shin = mtl.attr(MaterialAttrType::Shininess).value.x;
    let emissive = mtl.attr(MaterialAttrType::Emissive).value;

    write_color(w, CID_MTL_AMBIENT, color.truncate())?;
    write_color(w, CID_MTL_DIFFUSE, color.truncate())?;
    write_color(w, CID_MTL_SPECULAR, specular.truncate())?;
    write_percent(w, CID_MTL_SHININESS, shin / 128.0)?;
    let shinstr = if specular.truncate() == Vec3::ZERO { 0.0 } else { 1.0 };
    write_percent(w, CID_MTL_SHINSTR, shinstr)?;

    let selfillum = (emissive.x + emissive.y + emissive.z) / 3.0;
    if selfillum > 1e-5 {
        write_percent(w, CID_MTL_SELFILLUM, selfillum * 100.0)?;
    }

    for &(chunk_id, attr) in MAPMAP {
        let map = &mtl.attr(attr).map;
        if map.filename.is_some() {
            write_map(w, chunk_id, map)?;
        }
    }
    end_chunk(w, fpos)
}

pub fn save<W: Write + Seek>(scene: &Scene, w: &mut W) -> MeshResult<()> {
    let main_fpos = begin_chunk(w, CID_MAIN)?;
    let ver_fpos = begin_chunk(w, CID_VERSION)?;
    w.write_u32::<LittleEndian>(3)?;
    end_chunk(w, ver_fpos)?;

    let ed_fpos = begin_chunk(w, CID_3DEDITOR)?;
    let mv_fpos = begin_chunk(w, CID_MESHVER)?;
    w.write_u32::<LittleEndian>(3)?;
    end_chunk(w, mv_fpos)?;

    for mtl in scene.materials.iter() {
        write_material(w, mtl)?;
    }

    for node in scene.nodes.iter() {
        for &mesh_idx in &node.meshes {
            let Some(mesh) = scene.get_mesh(mesh_idx) else {
                continue;
            };
            write_object(w, scene, node, mesh)?;
        }
    }
    end_chunk(w, ed_fpos)?;
    end_chunk(w, main_fpos)
}

fn write_object<W: Write + Seek>(
    w: &mut W,
    scene: &Scene,
    node: &Node,
    mesh: &Mesh,
) -> MeshResult<()> {
    if mesh.num_verts() >= 65536 || mesh.num_faces() >= 65536 {
        log::warn!(
            "save_3ds: skipping mesh '{}', too large for the 3DS format (splitting not supported)",
            mesh.name
        );
        return Ok(());
    }

    let obj_fpos = begin_chunk(w, CID_OBJECT)?;
    write_cstr(w, &node.name)?;

    let tri_fpos = begin_chunk(w, CID_TRIMESH)?;

    let vl_fpos = begin_chunk(w, CID_VERTLIST)?;
    w.write_u16::<LittleEndian>(mesh.num_verts() as u16)?;
    for &p in &mesh.positions {
        write_vertex(w, node.global.transform_point3(p))?;
    }
    end_chunk(w, vl_fpos)?;

    let fd_fpos = begin_chunk(w, CID_FACEDESC)?;
    w.write_u16::<LittleEndian>(mesh.num_faces() as u16)?;
    for face in &mesh.faces {
        w.write_u16::<LittleEndian>(face[0] as u16)?;
        w.write_u16::<LittleEndian>(face[1] as u16)?;
        w.write_u16::<LittleEndian>(face[2] as u16)?;
        w.write_u16::<LittleEndian>(7)?;
    }
    end_chunk(w, fd_fpos)?;

    let mtlname = mesh
        .material
        .and_then(|idx| scene.get_material(idx))
        .map(|m| m.name.as_str())
        .unwrap_or("");
    let fm_fpos = begin_chunk(w, CID_FACEMTL)?;
    write_cstr(w, mtlname)?;
    w.write_u16::<LittleEndian>(mesh.num_faces() as u16)?;
    for i in 0..mesh.num_faces() {
        w.write_u16::<LittleEndian>(i as u16)?;
    }
    end_chunk(w, fm_fpos)?;

    if !mesh.texcoords.is_empty() {
        let uv_fpos = begin_chunk(w, CID_UVLIST)?;
        w.write_u16::<LittleEndian>(mesh.num_verts() as u16)?;
        for uv in &mesh.texcoords {
            w.write_f32::<LittleEndian>(uv.x)?;
            w.write_f32::<LittleEndian>(uv.y)?;
        }
        end_chunk(w, uv_fpos)?;
    }

    let mm_fpos = begin_chunk(w, CID_MESHMATRIX)?;
    let cols = node.global.to_cols_array();
    for &off in &MROW_OFFS {
        w.write_f32::<LittleEndian>(cols[off])?;
        w.write_f32::<LittleEndian>(cols[off + 2])?;
        w.write_f32::<LittleEndian>(cols[off + 1])?;
    }
    end_chunk(w, mm_fpos)?;

    end_chunk(w, tri_fpos)?;
    end_chunk(w, obj_fpos)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn build_cube_scene() -> Scene {
        let mut scene = Scene::new();
        let mut mesh = Mesh::new("cube");
        mesh.add_vertex(Vec3::ZERO);
        mesh.add_vertex(Vec3::X);
        mesh.add_vertex(Vec3::Y);
        mesh.add_triangle(0, 1, 2);
        let mesh_idx = scene.add_mesh(mesh);
        let mut node = Node::new("cube");
        node.add_mesh(mesh_idx);
        node.global = Mat4::IDENTITY;
        scene.add_node(node);
        scene
    }

    #[test]
    fn rejects_non_3ds_input() {
        let data = vec![0xffu8, 0xff, 0, 0, 0, 0];
        let mut scene = Scene::new();
        assert!(load(&mut scene, &mut Cursor::new(data)).is_err());
    }

    #[test]
    fn save_then_load_round_trips_vertex_count() {
        let scene = build_cube_scene();
        let mut buf = Cursor::new(Vec::new());
        save(&scene, &mut buf).unwrap();

        let mut loaded = Scene::new();
        buf.set_position(0);
        load(&mut loaded, &mut buf).unwrap();

        assert_eq!(loaded.num_meshes(), 1);
        let mesh = loaded.get_mesh(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mesh.num_verts(), 3);
        assert_eq!(mesh.num_faces(), 1);
    }

    #[test]
    fn vertex_coordinate_swap_round_trips() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let mut buf = Vec::new();
        write_vertex(&mut buf, v).unwrap();
        let back = read_vertex(&mut Cursor::new(buf)).unwrap();
        assert!(back.abs_diff_eq(v, 1e-6));
    }

    #[test]
    fn skips_oversized_mesh_on_save() {
        let mut scene = Scene::new();
        let mut mesh = Mesh::new("huge");
        for i in 0..70000u32 {
            mesh.add_vertex(Vec3::new(i as f32, 0.0, 0.0));
        }
        let mesh_idx = scene.add_mesh(mesh);
        let mut node = Node::new("huge");
        node.add_mesh(mesh_idx);
        scene.add_node(node);

        let mut buf = Cursor::new(Vec::new());
        save(&scene, &mut buf).unwrap();
        let mut loaded = Scene::new();
        buf.set_position(0);
        load(&mut loaded, &mut buf).unwrap();
        assert_eq!(loaded.num_meshes(), 0);
    }
}
