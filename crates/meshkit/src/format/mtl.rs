//! MTL material libraries, as referenced by OBJ's `mtllib`. Not a
//! standalone dispatch target — always invoked from [`crate::format::obj`].
//!
//! Ground truth: `examples/original_source/src/fmtobj.c` (`load_mtl`,
//! `write_material`, `parse_map`, `print_map`). Where spec.md's directive
//! table lists a directive the original reader never actually parsed
//! (`map_Ke`, `map_Ns`, `map_Pr`, `map_Pm`), this reader implements it
//! anyway, symmetric with the writer, since spec.md is the ground truth
//! and lists them as recognized (see DESIGN.md).

use std::io::{BufRead, Read, Write};

use meshkit_common::{MeshResult, Vec3, Vec4};
use meshkit_scene::{Material, MaterialAttr, MaterialAttrType, Scene, TexFilter, TexWrap};

const CUBE_FACE_NAMES: [&str; 6] = [
    "cube_top",
    "cube_bottom",
    "cube_front",
    "cube_back",
    "cube_left",
    "cube_right",
];

fn clean_line(line: &str) -> &str {
    let line = match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    };
    line.trim()
}

fn parse_floats(rest: &str) -> Vec<f32> {
    rest.split_whitespace().filter_map(|s| s.parse::<f32>().ok()).collect()
}

/// `Kd`/`Ks`/etc.: either one scalar (broadcast to all 3 channels) or an RGB
/// triple. Malformed lines are ignored, matching the original's tolerance.
fn parse_value(attr: &mut MaterialAttr, rest: &str) {
    let v = parse_floats(rest);
    match v.len() {
        3 => {
            attr.value.x = v[0];
            attr.value.y = v[1];
            attr.value.z = v[2];
        }
        1 => {
            attr.value.x = v[0];
            attr.value.y = v[0];
            attr.value.z = v[0];
        }
        _ => {}
    }
}

fn parse_map(attr: &mut MaterialAttr, rest: &str, is_bump: bool, is_reflect: bool) {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let mut i = 0;
    let mut cubeface: Option<usize> = None;

    while i < tokens.len() {
        let tok = tokens[i];
        match tok {
            "-blendu" | "-blendv" => {
                if let Some(v) = tokens.get(i + 1) {
                    let filt = if *v == "off" { TexFilter::Nearest } else { TexFilter::Linear };
                    if tok == "-blendu" {
                        attr.map.u_filter = filt;
                    } else {
                        attr.map.v_filter = filt;
                    }
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "-clamp" => {
                if let Some(v) = tokens.get(i + 1) {
                    let wrap = if *v == "on" { TexWrap::Clamp } else { TexWrap::Repeat };
                    attr.map.u_wrap = wrap;
                    attr.map.v_wrap = wrap;
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "-bm" => {
                if let Some(v) = tokens.get(i + 1).and_then(|s| s.parse::<f32>().ok()) {
                    if is_bump {
                        attr.value.x = v;
                        attr.value.y = v;
                        attr.value.z = v;
                    }
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "-o" | "-s" => {
                let mut v = if tok == "-o" { Vec3::ZERO } else { Vec3::ONE };
                let mut consumed = 0usize;
                if let Some(x) = tokens.get(i + 1).and_then(|s| s.parse::<f32>().ok()) {
                    v.x = x;
                    consumed = 1;
                    if let Some(y) = tokens.get(i + 2).and_then(|s| s.parse::<f32>().ok()) {
                        v.y = y;
                        consumed = 2;
                        if let Some(z) = tokens.get(i + 3).and_then(|s| s.parse::<f32>().ok()) {
                            v.z = z;
                            consumed = 3;
                        }
                    }
                }
                if tok == "-o" {
                    attr.map.offset = v;
                } else {
                    attr.map.scale = v;
                }
                i += 1 + consumed;
            }
            "-type" => {
                if let Some(name) = tokens.get(i + 1) {
                    if is_reflect {
                        cubeface = CUBE_FACE_NAMES.iter().position(|n| n == name);
                    }
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => {
                match cubeface.take() {
                    Some(face) => attr.map.cube[face] = Some(tok.to_string()),
                    None => attr.map.filename = Some(tok.to_string()),
                }
                i += 1;
            }
        }
    }
}

/// Zeroes specular when shininess reads below 1, disabling the highlight.
/// Applied to every material as it's finalized (spec.md states this as a
/// general rule; the original C reader only applied it to the last
/// material in the file before EOF, missing earlier ones — not preserved).
fn finalize_material(mtl: &mut Material) {
    if mtl.attr(MaterialAttrType::Shininess).value.x < 1.0 {
        let specular = &mut mtl.attr_mut(MaterialAttrType::Specular).value;
        specular.x = 0.0;
        specular.y = 0.0;
        specular.z = 0.0;
    }
}

pub fn load(scene: &mut Scene, r: Box<dyn Read>) -> MeshResult<()> {
    let reader = std::io::BufReader::new(r);
    let mut mtl: Option<Material> = None;

    for line in reader.lines() {
        let line = line?;
        let line = clean_line(&line);
        if line.is_empty() {
            continue;
        }
        let mut it = line.splitn(2, char::is_whitespace);
        let cmd = it.next().unwrap_or("");
        let rest = it.next().unwrap_or("").trim();

        if cmd == "newmtl" {
            if let Some(mut prev) = mtl.take() {
                finalize_material(&mut prev);
                scene.add_material(prev);
            }
            mtl = Some(Material::new(rest));
            continue;
        }
        let Some(mtl) = mtl.as_mut() else {
            continue;
        };

        match cmd {
            "Kd" => parse_value(mtl.attr_mut(MaterialAttrType::Color), rest),
            "Ks" => parse_value(mtl.attr_mut(MaterialAttrType::Specular), rest),
            "Ke" => parse_value(mtl.attr_mut(MaterialAttrType::Emissive), rest),
            "Ns" => parse_value(mtl.attr_mut(MaterialAttrType::Shininess), rest),
            "d" => {
                parse_value(mtl.attr_mut(MaterialAttrType::Alpha), rest);
                let alpha = mtl.attr(MaterialAttrType::Alpha).value.x;
                let transmit = mtl.attr_mut(MaterialAttrType::Transmit);
                transmit.value.x = 1.0 - alpha;
                transmit.value.y = 1.0 - alpha;
                transmit.value.z = 1.0 - alpha;
            }
            "Ni" => parse_value(mtl.attr_mut(MaterialAttrType::Ior), rest),
            "Pr" => parse_value(mtl.attr_mut(MaterialAttrType::Roughness), rest),
            "Pm" => parse_value(mtl.attr_mut(MaterialAttrType::Metallic), rest),
            "map_Kd" => parse_map(mtl.attr_mut(MaterialAttrType::Color), rest, false, false),
            "map_Ks" => parse_map(mtl.attr_mut(MaterialAttrType::Specular), rest, false, false),
            "map_Ke" => parse_map(mtl.attr_mut(MaterialAttrType::Emissive), rest, false, false),
            "map_Ns" => parse_map(mtl.attr_mut(MaterialAttrType::Shininess), rest, false, false),
            "map_d" => parse_map(mtl.attr_mut(MaterialAttrType::Alpha), rest, false, false),
            "map_Pr" => parse_map(mtl.attr_mut(MaterialAttrType::Roughness), rest, false, false),
            "map_Pm" => parse_map(mtl.attr_mut(MaterialAttrType::Metallic), rest, false, false),
            "bump" | "map_bump" => parse_map(mtl.attr_mut(MaterialAttrType::Bump), rest, true, false),
            "refl" => parse_map(mtl.attr_mut(MaterialAttrType::Reflect), rest, false, true),
            _ => {}
        }
    }

    if let Some(mut mtl) = mtl.take() {
        finalize_material(&mut mtl);
        scene.add_material(mtl);
    }
    Ok(())
}

fn nonzero(v: Vec4) -> bool {
    v.x != 0.0 || v.y != 0.0 || v.z != 0.0
}

fn write_vec3_line<W: Write>(w: &mut W, name: &str, v: Vec4) -> MeshResult<()> {
    writeln!(w, "{name} {} {} {}", v.x, v.y, v.z)?;
    Ok(())
}

fn write_map<W: Write>(w: &mut W, cmd: &str, attr: &MaterialAttr, is_bump: bool, is_reflect: bool) -> MeshResult<()> {
    let map = &attr.map;
    let mut opts = String::new();
    if map.u_filter != TexFilter::Linear {
        opts.push_str(" -blendu off");
    }
    if map.v_filter != TexFilter::Linear {
        opts.push_str(" -blendv off");
    }
    if map.u_wrap != TexWrap::Repeat {
        opts.push_str(" -clamp on");
    }
    if map.offset != Vec3::ZERO {
        opts.push_str(&format!(" -o {} {} {}", map.offset.x, map.offset.y, map.offset.z));
    }
    if map.scale != Vec3::ONE {
        opts.push_str(&format!(" -s {} {} {}", map.scale.x, map.scale.y, map.scale.z));
    }
    if is_bump && attr.value.x != 1.0 {
        opts.push_str(&format!(" -bm {}", attr.value.x));
    }

    if is_reflect {
        if let Some(name) = &map.filename {
            writeln!(w, "{cmd}{opts} -type sphere {name}")?;
            return Ok(());
        }
        for (i, face) in map.cube.iter().enumerate() {
            if let Some(name) = face {
                writeln!(w, "{cmd}{opts} -type {} {name}", CUBE_FACE_NAMES[i])?;
            }
        }
        return Ok(());
    }

    if let Some(name) = &map.filename {
        writeln!(w, "{cmd}{opts} {name}")?;
    }
    Ok(())
}

pub fn save<W: Write>(scene: &Scene, w: &mut W) -> MeshResult<()> {
    for mtl in scene.materials.iter() {
        writeln!(w, "newmtl {}", mtl.name)?;
        write_vec3_line(w, "Kd", mtl.attr(MaterialAttrType::Color).value)?;
        write_vec3_line(w, "Ks", mtl.attr(MaterialAttrType::Specular).value)?;
        writeln!(w, "Ns {}", mtl.attr(MaterialAttrType::Shininess).value.x)?;
        let emissive = mtl.attr(MaterialAttrType::Emissive).value;
        if nonzero(emissive) {
            write_vec3_line(w, "Ke", emissive)?;
        }
        let transmit = mtl.attr(MaterialAttrType::Transmit).value;
        if nonzero(transmit) {
            write_vec3_line(w, "Tf", transmit)?;
        }
        let ior = mtl.attr(MaterialAttrType::Ior).value.x;
        if ior != 1.0 {
            writeln!(w, "Ni {ior}")?;
        }
        writeln!(w, "d {}", mtl.attr(MaterialAttrType::Alpha).value.x)?;
        let roughness = mtl.attr(MaterialAttrType::Roughness).value.x;
        if roughness != 1.0 {
            writeln!(w, "Pr {roughness}")?;
        }
        let metallic = mtl.attr(MaterialAttrType::Metallic).value.x;
        if metallic != 0.0 {
            writeln!(w, "Pm {metallic}")?;
        }

        if mtl.attr(MaterialAttrType::Color).map.filename.is_some() {
            write_map(w, "map_Kd", mtl.attr(MaterialAttrType::Color), false, false)?;
        }
        if mtl.attr(MaterialAttrType::Specular).map.filename.is_some() {
            write_map(w, "map_Ks", mtl.attr(MaterialAttrType::Specular), false, false)?;
        }
        if mtl.attr(MaterialAttrType::Emissive).map.filename.is_some() {
            write_map(w, "map_Ke", mtl.attr(MaterialAttrType::Emissive), false, false)?;
        }
        if mtl.attr(MaterialAttrType::Shininess).map.filename.is_some() {
            write_map(w, "map_Ns", mtl.attr(MaterialAttrType::Shininess), false, false)?;
        }
        if mtl.attr(MaterialAttrType::Alpha).map.filename.is_some() {
            write_map(w, "map_d", mtl.attr(MaterialAttrType::Alpha), false, false)?;
        }
        if mtl.attr(MaterialAttrType::Reflect).map.is_set() {
            write_map(w, "refl", mtl.attr(MaterialAttrType::Reflect), false, true)?;
        }
        if mtl.attr(MaterialAttrType::Bump).map.filename.is_some() {
            write_map(w, "bump", mtl.attr(MaterialAttrType::Bump), true, false)?;
        }
        if mtl.attr(MaterialAttrType::Roughness).map.filename.is_some() {
            write_map(w, "map_Pr", mtl.attr(MaterialAttrType::Roughness), false, false)?;
        }
        if mtl.attr(MaterialAttrType::Metallic).map.filename.is_some() {
            write_map(w, "map_Pm", mtl.attr(MaterialAttrType::Metallic), false, false)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_basic_material() {
        let src = b"newmtl red\nKd 1 0 0\nNs 32\nd 0.5\n".to_vec();
        let mut scene = Scene::new();
        load(&mut scene, Box::new(Cursor::new(src))).unwrap();
        assert_eq!(scene.num_materials(), 1);
        let mtl = scene.get_material(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mtl.name, "red");
        assert_eq!(mtl.attr(MaterialAttrType::Color).value.x, 1.0);
        assert_eq!(mtl.attr(MaterialAttrType::Alpha).value.x, 0.5);
        assert_eq!(mtl.attr(MaterialAttrType::Transmit).value.x, 0.5);
    }

    #[test]
    fn low_shininess_zeroes_specular() {
        let src = b"newmtl dull\nKs 1 1 1\nNs 0.2\n".to_vec();
        let mut scene = Scene::new();
        load(&mut scene, Box::new(Cursor::new(src))).unwrap();
        let mtl = scene.get_material(meshkit_common::Index::new(0)).unwrap();
        assert_eq!(mtl.attr(MaterialAttrType::Specular).value.x, 0.0);
    }

    #[test]
    fn save_then_load_round_trips_color() {
        let mut scene = Scene::new();
        let mut mtl = Material::new("m");
        mtl.attr_mut(MaterialAttrType::Color).value = Vec4::new(0.2, 0.3, 0.4, 1.0);
        scene.add_material(mtl);

        let mut buf = Vec::new();
        save(&scene, &mut buf).unwrap();

        let mut loaded = Scene::new();
        load(&mut loaded, Box::new(Cursor::new(buf))).unwrap();
        let mtl = loaded.get_material(meshkit_common::Index::new(0)).unwrap();
        assert!((mtl.attr(MaterialAttrType::Color).value.x - 0.2).abs() < 1e-5);
    }
}
