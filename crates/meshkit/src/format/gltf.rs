//! glTF 2.0, JSON and binary (GLB) variants.
//! Ground truth: spec.md §4.6.3 (the original library has no glTF support
//! of its own; this codec is grounded on the other example repos'
//! `serde_json`-based asset loaders plus the spec's directive table).

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use meshkit_common::{prs, MeshError, MeshResult, Mat4, Quat, Vec2, Vec3, Vec4};
use meshkit_scene::{Material, MaterialAttrType, Mesh, Node, Scene, TexFilter, TexWrap};
use serde_json::Value;

use crate::dispatch::SiblingOpener;

const GLB_MAGIC: u32 = 0x46546c67; // "glTF"
const CHUNK_JSON: u32 = 0x4e4f534a; // "JSON"
const CHUNK_BIN: u32 = 0x004e4942; // "BIN\0"

struct GltfCtx {
    buffers: Vec<Vec<u8>>,
    samplers: Vec<(TexFilter, TexWrap, TexWrap)>,
    images: Vec<String>,
    textures: Vec<(Option<usize>, Option<usize>)>, // (sampler, image)
}

fn read_glb<R: Read + Seek>(r: &mut R) -> MeshResult<(Value, Option<Vec<u8>>)> {
    r.seek(SeekFrom::Start(0))?;
    let magic = r.read_u32::<LittleEndian>()?;
    if magic != GLB_MAGIC {
        return Err(MeshError::format("bad GLB magic"));
    }
    let _version = r.read_u32::<LittleEndian>()?;
    let _total_len = r.read_u32::<LittleEndian>()?;

    let mut json_value: Option<Value> = None;
    let mut bin: Option<Vec<u8>> = None;
    loop {
        let len = match r.read_u32::<LittleEndian>() {
            Ok(v) => v,
            Err(_) => break,
        };
        let ty = r.read_u32::<LittleEndian>()?;
        let mut data = vec![0u8; len as usize];
        r.read_exact(&mut data)?;
        match ty {
            CHUNK_JSON if json_value.is_none() => {
                json_value = Some(
                    serde_json::from_slice(&data)
                        .map_err(|e| MeshError::format(format!("bad glTF JSON: {e}")))?,
                );
            }
            CHUNK_BIN if bin.is_none() => bin = Some(data),
            _ => {}
        }
    }
    let json = json_value.ok_or_else(|| MeshError::format("GLB missing JSON chunk"))?;
    Ok((json, bin))
}

fn read_json_doc<R: Read>(r: &mut R) -> MeshResult<Value> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    serde_json::from_slice(&buf).map_err(|e| MeshError::format(format!("bad glTF JSON: {e}")))
}

pub fn load<R: Read + Seek>(
    scene: &mut Scene,
    r: &mut R,
    dirname: &str,
    sibling: &SiblingOpener,
) -> MeshResult<()> {
    scene.dirname = dirname.to_string();

    let mut magic = [0u8; 4];
    let start = r.stream_position()?;
    r.read_exact(&mut magic)?;
    r.seek(SeekFrom::Start(start))?;

    let (json, embedded_bin) = if &magic == b"glTF" {
        read_glb(r)?
    } else {
        let leading_ws = magic.iter().take_while(|b| b.is_ascii_whitespace()).count();
        if leading_ws == magic.len() || magic[leading_ws] != b'{' {
            return Err(MeshError::format("not a glTF file"));
        }
        (read_json_doc(r)?, None)
    };

    if json.pointer("/asset/version").is_none() {
        return Err(MeshError::format("glTF missing asset.version"));
    }

    let mut ctx = GltfCtx {
        buffers: Vec::new(),
        samplers: Vec::new(),
        images: Vec::new(),
        textures: Vec::new(),
    };

    for image in json["images"].as_array().into_iter().flatten() {
        ctx.images.push(image["uri"].as_str().unwrap_or("").to_string());
    }

    for sampler in json["samplers"].as_array().into_iter().flatten() {
        let mag = sampler["magFilter"].as_u64().unwrap_or(9729);
        let filter = if mag == 9728 { TexFilter::Nearest } else { TexFilter::Linear };
        let wrap = |code: u64| if code == 33071 { TexWrap::Clamp } else { TexWrap::Repeat };
        let wrap_s = wrap(sampler["wrapS"].as_u64().unwrap_or(10497));
        let wrap_t = wrap(sampler["wrapT"].as_u64().unwrap_or(10497));
        ctx.samplers.push((filter, wrap_s, wrap_t));
    }

    for texture in json["textures"].as_array().into_iter().flatten() {
        let sampler = texture["sampler"].as_u64().map(|v| v as usize);
        let image = texture["source"].as_u64().map(|v| v as usize);
        ctx.textures.push((sampler, image));
    }

    for buffer in json["buffers"].as_array().into_iter().flatten() {
        let data = load_buffer(buffer, &embedded_bin, sibling)?;
        ctx.buffers.push(data);
    }

    let buffer_views: Vec<&Value> = json["bufferViews"].as_array().into_iter().flatten().collect();
    let accessors: Vec<&Value> = json["accessors"].as_array().into_iter().flatten().collect();

    let mut materials_idx = Vec::new();
    for mtl_json in json["materials"].as_array().into_iter().flatten() {
        materials_idx.push(scene.add_material(parse_material(mtl_json, &ctx)));
    }

    // json mesh index -> every scene Mesh index that mesh produced.
    let mut mesh_groups: Vec<Vec<meshkit_common::Index<Mesh>>> = Vec::new();
    for mesh_json in json["meshes"].as_array().into_iter().flatten() {
        let name = mesh_json["name"].as_str().unwrap_or("").to_string();
        let mut group = Vec::new();
        for prim in mesh_json["primitives"].as_array().into_iter().flatten() {
            let mode = prim["mode"].as_u64().unwrap_or(4);
            if mode != 4 {
                log::warn!("skipping glTF primitive with non-triangle mode {mode}");
                continue;
            }
            let mesh = decode_primitive(prim, &buffer_views, &accessors, &ctx.buffers, &name)?;
            let idx = scene.add_mesh(mesh);
            if let Some(mat_ref) = prim["material"].as_u64() {
                if let Some(&mat_idx) = materials_idx.get(mat_ref as usize) {
                    if let Some(m) = scene.meshes.get_mut(idx) {
                        m.material = Some(mat_idx);
                    }
                }
            }
            group.push(idx);
        }
        mesh_groups.push(group);
    }

    let nodes_json: Vec<&Value> = json["nodes"].as_array().into_iter().flatten().collect();
    let mut parents: Vec<Option<usize>> = vec![None; nodes_json.len()];
    for (i, n) in nodes_json.iter().enumerate() {
        for child in n["children"].as_array().into_iter().flatten() {
            if let Some(c) = child.as_u64() {
                parents[c as usize] = Some(i);
            }
        }
    }

    let mut index_map: Vec<meshkit_common::Index<Node>> = Vec::with_capacity(nodes_json.len());
    // Placeholder pass: we need node indices to exist before we can assign
    // parent Index<Node> values, so reserve them in parent-then-child order
    // by just inserting with a temporary parent of None, fixing it up after.
    for n in &nodes_json {
        let name = n["name"].as_str().unwrap_or("").to_string();
        let mut node = Node::new(name);
        node.local = node_transform(n);
        index_map.push(meshkit_common::Index::new(0)); // placeholder, fixed below
        let idx = scene.nodes.push(node);
        *index_map.last_mut().unwrap() = idx;
    }
    for (i, n) in nodes_json.iter().enumerate() {
        let idx = index_map[i];
        if let Some(mesh_ref) = n["mesh"].as_u64() {
            if let Some(group) = mesh_groups.get(mesh_ref as usize) {
                if let Some(node) = scene.nodes.get_mut(idx) {
                    for &m in group {
                        node.add_mesh(m);
                    }
                }
            }
        }
        if let Some(parent) = parents[i] {
            let parent_idx = index_map[parent];
            if let Some(node) = scene.nodes.get_mut(idx) {
                node.parent = Some(parent_idx);
            }
            if let Some(p) = scene.nodes.get_mut(parent_idx) {
                p.children.push(idx);
            }
        } else {
            scene.top_nodes.push(idx);
        }
    }

    Ok(())
}

fn node_transform(n: &Value) -> Mat4 {
    if let Some(m) = n["matrix"].as_array() {
        if m.len() == 16 {
            let mut cols = [0.0f32; 16];
            for (i, v) in m.iter().enumerate() {
                cols[i] = v.as_f64().unwrap_or(0.0) as f32;
            }
            return Mat4::from_cols_array(&cols);
        }
    }
    let t = read_vec3(&n["translation"]).unwrap_or(Vec3::ZERO);
    let s = read_vec3(&n["scale"]).unwrap_or(Vec3::ONE);
    let r = n["rotation"]
        .as_array()
        .filter(|a| a.len() == 4)
        .map(|a| {
            Quat::from_xyzw(
                a[0].as_f64().unwrap_or(0.0) as f32,
                a[1].as_f64().unwrap_or(0.0) as f32,
                a[2].as_f64().unwrap_or(0.0) as f32,
                a[3].as_f64().unwrap_or(1.0) as f32,
            )
        })
        .unwrap_or(Quat::IDENTITY);
    prs(t, r, s)
}

fn read_vec3(v: &Value) -> Option<Vec3> {
    let a = v.as_array()?;
    if a.len() != 3 {
        return None;
    }
    Some(Vec3::new(
        a[0].as_f64()? as f32,
        a[1].as_f64()? as f32,
        a[2].as_f64()? as f32,
    ))
}

fn read_vec4(v: &Value) -> Option<Vec4> {
    let a = v.as_array()?;
    if a.len() != 4 {
        return None;
    }
    Some(Vec4::new(
        a[0].as_f64()? as f32,
        a[1].as_f64()? as f32,
        a[2].as_f64()? as f32,
        a[3].as_f64()? as f32,
    ))
}

fn load_buffer(
    buffer: &Value,
    embedded_bin: &Option<Vec<u8>>,
    sibling: &SiblingOpener,
) -> MeshResult<Vec<u8>> {
    match buffer["uri"].as_str() {
        Some(uri) => {
            if let Some(b64) = uri.strip_prefix("data:").and_then(|rest| rest.split_once(";base64,").map(|(_, d)| d))
            {
                Ok(meshkit_common::base64::decode(b64))
            } else {
                let mut handle = sibling(uri)?;
                let mut data = Vec::new();
                handle.read_to_end(&mut data)?;
                Ok(data)
            }
        }
        None => embedded_bin
            .clone()
            .ok_or_else(|| MeshError::format("glTF buffer has no URI and no GLB BIN chunk")),
    }
}

fn component_size(ty: &str) -> Option<usize> {
    Some(match ty {
        "byte" | "ubyte" | "BYTE" | "UNSIGNED_BYTE" => 1,
        "short" | "ushort" | "SHORT" | "UNSIGNED_SHORT" => 2,
        "uint" | "float" | "UNSIGNED_INT" | "FLOAT" => 4,
        _ => return None,
    })
}

fn component_type_name(code: u64) -> &'static str {
    match code {
        5120 => "byte",
        5121 => "ubyte",
        5122 => "short",
        5123 => "ushort",
        5125 => "uint",
        5126 => "float",
        _ => "float",
    }
}

fn num_components(ty: &str) -> usize {
    match ty {
        "SCALAR" => 1,
        "VEC2" => 2,
        "VEC3" => 3,
        "VEC4" => 4,
        "MAT2" => 4,
        "MAT3" => 9,
        "MAT4" => 16,
        _ => 1,
    }
}

/// Reads one scalar component, normalizing integer types to `[0, 1]` the
/// way `NORMALIZED` glTF accessors do (ubyte -> /255, ushort -> /65535, per
/// spec.md's directive table). `is_index` bypasses normalization: index
/// accessors are raw vertex indices, never normalized values.
fn read_component(buf: &[u8], offset: usize, comp_type: &str, is_index: bool) -> f32 {
    match comp_type {
        "byte" => buf[offset] as i8 as f32,
        "ubyte" if is_index => buf[offset] as f32,
        "ubyte" => buf[offset] as f32 / 255.0,
        "short" => i16::from_le_bytes([buf[offset], buf[offset + 1]]) as f32,
        "ushort" if is_index => u16::from_le_bytes([buf[offset], buf[offset + 1]]) as f32,
        "ushort" => u16::from_le_bytes([buf[offset], buf[offset + 1]]) as f32 / 65535.0,
        "uint" => u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]]) as f32,
        "float" => f32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]]),
        _ => 0.0,
    }
}

fn accessor_elements(
    accessor: &Value,
    buffer_views: &[&Value],
    buffers: &[Vec<u8>],
    is_index: bool,
) -> MeshResult<Vec<Vec<f32>>> {
    let bv_idx = accessor["bufferView"]
        .as_u64()
        .ok_or_else(|| MeshError::format("accessor missing bufferView"))? as usize;
    let bv = buffer_views
        .get(bv_idx)
        .ok_or_else(|| MeshError::format("bufferView index out of range"))?;
    let buf_idx = bv["buffer"].as_u64().unwrap_or(0) as usize;
    let buffer = buffers
        .get(buf_idx)
        .ok_or_else(|| MeshError::format("buffer index out of range"))?;

    let bv_offset = bv["byteOffset"].as_u64().unwrap_or(0) as usize;
    let acc_offset = accessor["byteOffset"].as_u64().unwrap_or(0) as usize;
    let count = accessor["count"].as_u64().unwrap_or(0) as usize;
    let comp_type = component_type_name(accessor["componentType"].as_u64().unwrap_or(5126));
    let elem_type = accessor["type"].as_str().unwrap_or("SCALAR");
    let ncomp = num_components(elem_type);
    let comp_size = component_size(comp_type).unwrap_or(4);
    let stride = bv["byteStride"].as_u64().map(|s| s as usize).unwrap_or(ncomp * comp_size);

    let base = bv_offset + acc_offset;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let elem_off = base + i * stride;
        let mut elem = Vec::with_capacity(ncomp);
        for c in 0..ncomp {
            let off = elem_off + c * comp_size;
            if off + comp_size > buffer.len() {
                return Err(MeshError::format("accessor reads past end of buffer"));
            }
            elem.push(read_component(buffer, off, comp_type, is_index));
        }
        out.push(elem);
    }
    Ok(out)
}

fn decode_primitive(
    prim: &Value,
    buffer_views: &[&Value],
    accessors: &[&Value],
    buffers: &[Vec<u8>],
    name: &str,
) -> MeshResult<Mesh> {
    let attrs = &prim["attributes"];
    let get_accessor = |idx: u64| accessors.get(idx as usize).copied();

    let pos_idx = attrs["POSITION"]
        .as_u64()
        .ok_or_else(|| MeshError::format("glTF primitive missing POSITION"))?;
    let positions = accessor_elements(
        get_accessor(pos_idx).ok_or_else(|| MeshError::format("bad POSITION accessor"))?,
        buffer_views,
        buffers,
        false,
    )?;

    let mut mesh = Mesh::new(name);
    for p in &positions {
        mesh.add_vertex(Vec3::new(p[0], p[1], p[2]));
    }

    if let Some(idx) = attrs["NORMAL"].as_u64() {
        for n in accessor_elements(get_accessor(idx).unwrap(), buffer_views, buffers, false)? {
            mesh.add_normal(Vec3::new(n[0], n[1], n[2]));
        }
    }
    if let Some(idx) = attrs["TANGENT"].as_u64() {
        for t in accessor_elements(get_accessor(idx).unwrap(), buffer_views, buffers, false)? {
            mesh.add_tangent(Vec3::new(t[0], t[1], t[2]));
        }
    }
    if let Some(idx) = attrs["TEXCOORD_0"].as_u64() {
        for uv in accessor_elements(get_accessor(idx).unwrap(), buffer_views, buffers, false)? {
            mesh.add_texcoord(Vec2::new(uv[0], uv[1]));
        }
    }
    if let Some(idx) = attrs["COLOR_0"].as_u64() {
        for c in accessor_elements(get_accessor(idx).unwrap(), buffer_views, buffers, false)? {
            let a = c.get(3).copied().unwrap_or(1.0);
            mesh.add_color(Vec4::new(c[0], c[1], c[2], a));
        }
    }

    if let Some(indices_idx) = prim["indices"].as_u64() {
        let indices = accessor_elements(
            get_accessor(indices_idx).ok_or_else(|| MeshError::format("bad indices accessor"))?,
            buffer_views,
            buffers,
            true,
        )?;
        for tri in indices.chunks(3) {
            if tri.len() == 3 {
                mesh.add_triangle(tri[0][0] as u32, tri[1][0] as u32, tri[2][0] as u32);
            }
        }
    } else {
        for tri in (0..positions.len() as u32).collect::<Vec<_>>().chunks(3) {
            if tri.len() == 3 {
                mesh.add_triangle(tri[0], tri[1], tri[2]);
            }
        }
    }
    Ok(mesh)
}

fn apply_texture_ref(attr: &mut meshkit_scene::MaterialAttr, tex_json: &Value, ctx: &GltfCtx) {
    let Some(tex_idx) = tex_json["index"].as_u64() else {
        return;
    };
    let Some(&(sampler_idx, image_idx)) = ctx.textures.get(tex_idx as usize) else {
        return;
    };
    if let Some(s) = sampler_idx.and_then(|s| ctx.samplers.get(s)) {
        attr.map.u_filter = s.0;
        attr.map.v_filter = s.0;
        attr.map.u_wrap = s.1;
        attr.map.v_wrap = s.2;
    }
    if let Some(image) = image_idx.and_then(|i| ctx.images.get(i)) {
        attr.map.filename = Some(image.clone());
    }
    if let Some(transform) = tex_json.pointer("/extensions/KHR_texture_transform") {
        if let Some(offset) = read_vec2_arr(&transform["offset"]) {
            attr.map.offset = Vec3::new(offset.0, offset.1, 0.0);
        }
        if let Some(scale) = read_vec2_arr(&transform["scale"]) {
            attr.map.scale = Vec3::new(scale.0, scale.1, 1.0);
        }
    }
}

fn read_vec2_arr(v: &Value) -> Option<(f32, f32)> {
    let a = v.as_array()?;
    if a.len() != 2 {
        return None;
    }
    Some((a[0].as_f64()? as f32, a[1].as_f64()? as f32))
}

fn parse_material(mtl_json: &Value, ctx: &GltfCtx) -> Material {
    let name = mtl_json["name"].as_str().unwrap_or("").to_string();
    let mut mtl = Material::new(name);

    let pbr = &mtl_json["pbrMetallicRoughness"];
    if let Some(c) = read_vec4(&pbr["baseColorFactor"]) {
        mtl.attr_mut(MaterialAttrType::Color).value = c;
    }
    let roughness = pbr["roughnessFactor"].as_f64().map(|v| v as f32).unwrap_or(1.0);
    mtl.attr_mut(MaterialAttrType::Roughness).value.x = roughness;
    mtl.attr_mut(MaterialAttrType::Shininess).value.x = (1.0 - roughness) * 100.0 + 1.0;
    if let Some(m) = pbr["metallicFactor"].as_f64() {
        mtl.attr_mut(MaterialAttrType::Metallic).value.x = m as f32;
    }
    if let Some(e) = read_vec3(&mtl_json["emissiveFactor"]) {
        let a = mtl.attr_mut(MaterialAttrType::Emissive);
        a.value.x = e.x;
        a.value.y = e.y;
        a.value.z = e.z;
    }
    if let Some(s) = read_vec3(&mtl_json.pointer("/extensions/KHR_materials_specular/specularColorFactor").cloned().unwrap_or(Value::Null)) {
        let a = mtl.attr_mut(MaterialAttrType::Specular);
        a.value.x = s.x;
        a.value.y = s.y;
        a.value.z = s.z;
    }
    if let Some(ior) = mtl_json.pointer("/extensions/KHR_materials_ior/ior").and_then(Value::as_f64) {
        mtl.attr_mut(MaterialAttrType::Ior).value.x = ior as f32;
    }
    if let Some(t) = mtl_json
        .pointer("/extensions/KHR_materials_transmission/transmissionFactor")
        .and_then(Value::as_f64)
    {
        mtl.attr_mut(MaterialAttrType::Transmit).value.x = t as f32;
    }

    if pbr["baseColorTexture"].is_object() {
        let tex = pbr["baseColorTexture"].clone();
        apply_texture_ref(mtl.attr_mut(MaterialAttrType::Color), &tex, ctx);
    }
    if pbr["metallicRoughnessTexture"].is_object() {
        let tex = pbr["metallicRoughnessTexture"].clone();
        apply_texture_ref(mtl.attr_mut(MaterialAttrType::Metallic), &tex, ctx);
    }
    if mtl_json["emissiveTexture"].is_object() {
        let tex = mtl_json["emissiveTexture"].clone();
        apply_texture_ref(mtl.attr_mut(MaterialAttrType::Emissive), &tex, ctx);
    }
    if let Some(tex) = mtl_json
        .pointer("/extensions/KHR_materials_transmission/transmissionTexture")
        .cloned()
    {
        apply_texture_ref(mtl.attr_mut(MaterialAttrType::Transmit), &tex, ctx);
    }
    if mtl_json["normalTexture"].is_object() {
        let tex = mtl_json["normalTexture"].clone();
        apply_texture_ref(mtl.attr_mut(MaterialAttrType::Bump), &tex, ctx);
    }

    mtl
}

/// Writes a self-contained GLB: a single JSON mesh per scene mesh, node
/// hierarchy, positions/normals/texcoords/indices packed into one BIN
/// chunk. Materials are emitted with the same factor mapping load uses in
/// reverse.
pub fn save<W: Write>(scene: &Scene, w: &mut W) -> MeshResult<()> {
    let mut bin = Vec::new();
    let mut buffer_views = Vec::new();
    let mut accessors = Vec::new();
    let mut meshes_json = Vec::new();

    for mesh in scene.meshes.iter() {
        let pos_view = push_view(&mut bin, &mut buffer_views, &mesh.positions, |p| {
            vec![p.x, p.y, p.z]
        });
        let pos_accessor = accessors.len();
        accessors.push(make_accessor(pos_view, mesh.positions.len(), "FLOAT", "VEC3", Some(&mesh.bounds)));

        let mut attrs = serde_json::json!({ "POSITION": pos_accessor });
        if !mesh.normals.is_empty() {
            let view = push_view(&mut bin, &mut buffer_views, &mesh.normals, |n| vec![n.x, n.y, n.z]);
            let idx = accessors.len();
            accessors.push(make_accessor(view, mesh.normals.len(), "FLOAT", "VEC3", None));
            attrs["NORMAL"] = serde_json::json!(idx);
        }
        if !mesh.texcoords.is_empty() {
            let view = push_view(&mut bin, &mut buffer_views, &mesh.texcoords, |uv| vec![uv.x, uv.y]);
            let idx = accessors.len();
            accessors.push(make_accessor(view, mesh.texcoords.len(), "FLOAT", "VEC2", None));
            attrs["TEXCOORD_0"] = serde_json::json!(idx);
        }

        let indices: Vec<u32> = mesh.faces.iter().flatten().copied().collect();
        let idx_view = push_index_view(&mut bin, &mut buffer_views, &indices);
        let idx_accessor = accessors.len();
        accessors.push(make_accessor(idx_view, indices.len(), "uint", "SCALAR", None));

        meshes_json.push(serde_json::json!({
            "name": mesh.name,
            "primitives": [{
                "attributes": attrs,
                "indices": idx_accessor,
                "mode": 4,
            }],
        }));
    }

    let mut nodes_json = Vec::new();
    let mut roots = Vec::new();
    for (i, node) in scene.nodes.iter().enumerate() {
        let mut obj = serde_json::json!({
            "name": node.name,
            "children": node.children.iter().map(|c| c.as_usize()).collect::<Vec<_>>(),
        });
        if let Some(&first) = node.meshes.first() {
            obj["mesh"] = serde_json::json!(first.as_usize());
        }
        let cols = node.local.to_cols_array();
        obj["matrix"] = serde_json::json!(cols.to_vec());
        nodes_json.push(obj);
        if scene.top_nodes.iter().any(|&t| t.as_usize() == i) {
            roots.push(i);
        }
    }

    let doc = serde_json::json!({
        "asset": { "version": "2.0", "generator": "meshkit" },
        "buffers": [{ "byteLength": bin.len() }],
        "bufferViews": buffer_views,
        "accessors": accessors,
        "meshes": meshes_json,
        "nodes": nodes_json,
        "scenes": [{ "nodes": roots }],
        "scene": 0,
    });
    let json_bytes = serde_json::to_vec(&doc).map_err(|e| MeshError::format(format!("glTF encode: {e}")))?;

    let json_padded = pad_to(json_bytes, 4, b' ');
    let bin_padded = pad_to(bin, 4, 0);

    let total_len = 12 + 8 + json_padded.len() + 8 + bin_padded.len();
    w.write_u32::<LittleEndian>(GLB_MAGIC)?;
    w.write_u32::<LittleEndian>(2)?;
    w.write_u32::<LittleEndian>(total_len as u32)?;

    w.write_u32::<LittleEndian>(json_padded.len() as u32)?;
    w.write_u32::<LittleEndian>(CHUNK_JSON)?;
    w.write_all(&json_padded)?;

    w.write_u32::<LittleEndian>(bin_padded.len() as u32)?;
    w.write_u32::<LittleEndian>(CHUNK_BIN)?;
    w.write_all(&bin_padded)?;
    Ok(())
}

fn pad_to(mut data: Vec<u8>, align: usize, fill: u8) -> Vec<u8> {
    while data.len() % align != 0 {
        data.push(fill);
    }
    data
}

fn push_view<T, F: Fn(&T) -> Vec<f32>>(
    bin: &mut Vec<u8>,
    views: &mut Vec<Value>,
    items: &[T],
    to_floats: F,
) -> usize {
    let offset = bin.len();
    for item in items {
        for f in to_floats(item) {
            bin.extend_from_slice(&f.to_le_bytes());
        }
    }
    views.push(serde_json::json!({ "buffer": 0, "byteOffset": offset, "byteLength": bin.len() - offset }));
    views.len() - 1
}

fn push_index_view(bin: &mut Vec<u8>, views: &mut Vec<Value>, indices: &[u32]) -> usize {
    let offset = bin.len();
    for &i in indices {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    views.push(serde_json::json!({ "buffer": 0, "byteOffset": offset, "byteLength": bin.len() - offset }));
    views.len() - 1
}

fn make_accessor(view: usize, count: usize, comp: &str, ty: &str, bounds: Option<&meshkit_common::Aabb>) -> Value {
    let component_type = match comp {
        "uint" => 5125,
        _ => 5126,
    };
    let mut obj = serde_json::json!({
        "bufferView": view,
        "componentType": component_type,
        "count": count,
        "type": ty,
    });
    if let Some(b) = bounds {
        if !b.is_empty() {
            obj["min"] = serde_json::json!([b.vmin.x, b.vmin.y, b.vmin.z]);
            obj["max"] = serde_json::json!([b.vmax.x, b.vmax.y, b.vmax.z]);
        }
    }
    obj
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn no_siblings() -> Box<SiblingOpener<'static>> {
        Box::new(|name: &str| {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no sibling: {name}"),
            ))
        })
    }

    fn tri_scene() -> Scene {
        let mut scene = Scene::new();
        let mut mesh = Mesh::new("m");
        mesh.add_vertex(Vec3::ZERO);
        mesh.add_vertex(Vec3::X);
        mesh.add_vertex(Vec3::Y);
        mesh.add_triangle(0, 1, 2);
        let idx = scene.add_mesh(mesh);
        let mut node = Node::new("n");
        node.add_mesh(idx);
        scene.add_node(node);
        scene
    }

    #[test]
    fn rejects_non_gltf_input() {
        let mut scene = Scene::new();
        let opener = no_siblings();
        let data = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        assert!(load(&mut scene, &mut Cursor::new(data), "", &*opener).is_err());
    }

    #[test]
    fn save_then_load_round_trips_as_glb() {
        let scene = tri_scene();
        let mut buf = Vec::new();
        save(&scene, &mut buf).unwrap();
        assert_eq!(&buf[0..4], b"glTF");

        let mut loaded = Scene::new();
        let opener = no_siblings();
        load(&mut loaded, &mut Cursor::new(buf), "", &*opener).unwrap();
        assert_eq!(loaded.num_meshes(), 1);
        let mesh = loaded.get_mesh(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.positions[1], Vec3::X);
    }

    #[test]
    fn loads_plain_json_gltf_with_data_uri_buffer() {
        let mut positions = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for f in p {
                positions.extend_from_slice(&f.to_le_bytes());
            }
        }
        let mut indices = Vec::new();
        for i in [0u32, 1, 2] {
            indices.extend_from_slice(&i.to_le_bytes());
        }
        let mut bin = positions.clone();
        let idx_offset = bin.len();
        bin.extend_from_slice(&indices);

        let b64 = simple_base64_encode(&bin);
        let doc = serde_json::json!({
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": bin.len(), "uri": format!("data:application/octet-stream;base64,{b64}")}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": positions.len()},
                {"buffer": 0, "byteOffset": idx_offset, "byteLength": indices.len()},
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
                {"bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR"},
            ],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "mode": 4}]}],
            "nodes": [{"mesh": 0}],
        });
        let text = serde_json::to_vec(&doc).unwrap();

        let mut scene = Scene::new();
        let opener = no_siblings();
        load(&mut scene, &mut Cursor::new(text), "", &*opener).unwrap();
        assert_eq!(scene.num_meshes(), 1);
        assert_eq!(scene.get_mesh(meshkit_common::Index::new(0)).unwrap().num_faces(), 1);
    }

    #[test]
    fn ushort_indices_read_as_raw_integers_not_normalized() {
        let cube_positions: [[f32; 3]; 8] = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        let mut positions = Vec::new();
        for p in cube_positions {
            for f in p {
                positions.extend_from_slice(&f.to_le_bytes());
            }
        }

        // 12 triangles (36 ushort indices) over the 8 cube corners.
        let cube_indices: [u16; 36] = [
            0, 1, 2, 0, 2, 3, // front
            4, 6, 5, 4, 7, 6, // back
            0, 4, 5, 0, 5, 1, // bottom
            3, 2, 6, 3, 6, 7, // top
            1, 5, 6, 1, 6, 2, // right
            0, 3, 7, 0, 7, 4, // left
        ];
        let mut indices = Vec::new();
        for i in cube_indices {
            indices.extend_from_slice(&i.to_le_bytes());
        }

        let mut bin = positions.clone();
        let idx_offset = bin.len();
        bin.extend_from_slice(&indices);

        let b64 = simple_base64_encode(&bin);
        let doc = serde_json::json!({
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": bin.len(), "uri": format!("data:application/octet-stream;base64,{b64}")}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": positions.len()},
                {"buffer": 0, "byteOffset": idx_offset, "byteLength": indices.len()},
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 8, "type": "VEC3"},
                {"bufferView": 1, "componentType": 5123, "count": 36, "type": "SCALAR"},
            ],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "mode": 4}]}],
            "nodes": [{"mesh": 0}],
        });
        let text = serde_json::to_vec(&doc).unwrap();

        let mut scene = Scene::new();
        let opener = no_siblings();
        load(&mut scene, &mut Cursor::new(text), "", &*opener).unwrap();
        let mesh = scene.get_mesh(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mesh.positions.len(), 8);
        assert_eq!(mesh.num_faces(), 12);
        assert_eq!(mesh.faces[0], [0, 1, 2]);
        assert!(mesh.faces.iter().flatten().any(|&i| i == 6));
    }

    fn simple_base64_encode(data: &[u8]) -> String {
        const ALPHA: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
        let mut out = String::new();
        for chunk in data.chunks(3) {
            let b0 = chunk[0] as u32;
            let b1 = *chunk.get(1).unwrap_or(&0) as u32;
            let b2 = *chunk.get(2).unwrap_or(&0) as u32;
            let n = (b0 << 16) | (b1 << 8) | b2;
            out.push(ALPHA[(n >> 18 & 0x3f) as usize] as char);
            out.push(ALPHA[(n >> 12 & 0x3f) as usize] as char);
            out.push(if chunk.len() > 1 { ALPHA[(n >> 6 & 0x3f) as usize] as char } else { '=' });
            out.push(if chunk.len() > 2 { ALPHA[(n & 0x3f) as usize] as char } else { '=' });
        }
        out
    }
}
