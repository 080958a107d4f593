//! C5: format auto-detection on load, suffix/flag-based selection on save.

use std::io::{Read, Seek, SeekFrom, Write};

use meshkit_common::{IoProvider, MeshError, MeshResult, OpenMode};
use meshkit_scene::Scene;

use crate::flags::SaveFormat;
use crate::format::{gltf, jtf, obj, stl, threeds};

/// Opens a sibling file (an OBJ's `mtllib`, a glTF's external buffer) by
/// name, resolved relative to the scene's directory. Boxed rather than
/// generic so every codec can share one concrete signature regardless of
/// the caller's `IoProvider`.
pub type SiblingOpener<'a> = dyn Fn(&str) -> std::io::Result<Box<dyn Read>> + 'a;
pub type SiblingCreator<'a> = dyn Fn(&str) -> std::io::Result<Box<dyn Write>> + 'a;

fn opener_for<'a, P: IoProvider + 'a>(io: &'a P) -> Box<SiblingOpener<'a>> {
    Box::new(move |name: &str| -> std::io::Result<Box<dyn Read>> {
        Ok(Box::new(io.open(name, OpenMode::Read)?))
    })
}

fn creator_for<'a, P: IoProvider + 'a>(io: &'a P) -> Box<SiblingCreator<'a>> {
    Box::new(move |name: &str| -> std::io::Result<Box<dyn Write>> {
        Ok(Box::new(io.open(name, OpenMode::Write)?))
    })
}

/// Trial order on load: 3DS, JTF, glTF, STL, then OBJ last (it has no
/// magic bytes to detect by). Each codec gets a fresh handle, which is
/// equivalent to rewinding a shared one.
pub fn load<P: IoProvider>(scene: &mut Scene, path: &str, io: &P) -> MeshResult<()> {
    let (dirname, _) = meshkit_common::io::split_dirname(path);
    let sibling = opener_for(io);

    let mut handle = io.open(path, OpenMode::Read)?;
    if threeds::load(scene, &mut handle).is_ok() {
        return Ok(());
    }

    let mut handle = io.open(path, OpenMode::Read)?;
    if jtf::load(scene, &mut handle).is_ok() {
        return Ok(());
    }

    let mut handle = io.open(path, OpenMode::Read)?;
    if gltf::load(scene, &mut handle, dirname, &*sibling).is_ok() {
        return Ok(());
    }

    let mut handle = io.open(path, OpenMode::Read)?;
    if stl::load(scene, &mut handle).is_ok() {
        return Ok(());
    }

    let mut handle = io.open(path, OpenMode::Read)?;
    obj::load(scene, &mut handle, dirname, &*sibling)
}

/// Same trial order, but over an in-memory reader with no sibling-file
/// support (used for embedded/self-contained inputs like GLB and tests).
pub fn load_reader<R: Read + Seek>(scene: &mut Scene, r: &mut R) -> MeshResult<()> {
    let start = r.stream_position()?;
    if threeds::load(scene, r).is_ok() {
        return Ok(());
    }
    r.seek(SeekFrom::Start(start))?;
    if jtf::load(scene, r).is_ok() {
        return Ok(());
    }
    r.seek(SeekFrom::Start(start))?;
    let no_siblings: &SiblingOpener = &|name: &str| {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no sibling-file support for this reader: {name}"),
        ))
    };
    if gltf::load(scene, r, "", no_siblings).is_ok() {
        return Ok(());
    }
    r.seek(SeekFrom::Start(start))?;
    if stl::load(scene, r).is_ok() {
        return Ok(());
    }
    r.seek(SeekFrom::Start(start))?;
    obj::load(scene, r, "", no_siblings)
}

/// Chooses the save codec: explicit `format` if not `Auto`, else the
/// path's suffix, else OBJ; then dispatches.
pub fn save<P: IoProvider>(scene: &Scene, path: &str, format: SaveFormat, io: &P) -> MeshResult<()> {
    let resolved = match format {
        SaveFormat::Auto => SaveFormat::from_path_suffix(path),
        other => other,
    };
    let (dirname, _) = meshkit_common::io::split_dirname(path);
    let creator = creator_for(io);

    let mut handle = io.open(path, OpenMode::Write)?;
    match resolved {
        SaveFormat::Obj => obj::save(scene, &mut handle, dirname, &*creator),
        SaveFormat::Jtf => jtf::save(scene, &mut handle),
        SaveFormat::Gltf => gltf::save(scene, &mut handle),
        SaveFormat::ThreeDs => threeds::save(scene, &mut handle),
        SaveFormat::Stl => stl::save(scene, &mut handle),
        SaveFormat::Auto => unreachable!("resolved above"),
    }
}

/// Saves into an in-memory writer; OBJ's sibling `.mtl` is skipped with a
/// warning since there's no filesystem to place it next to.
pub fn save_writer<W: Write + Seek>(scene: &Scene, w: &mut W, format: SaveFormat) -> MeshResult<()> {
    match format {
        SaveFormat::Auto | SaveFormat::Obj => {
            let no_siblings: &SiblingCreator = &|name: &str| {
                Err(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    format!("no sibling-file support for this writer: {name}"),
                ))
            };
            obj::save(scene, w, "", no_siblings)
        }
        SaveFormat::Jtf => jtf::save(scene, w),
        SaveFormat::Gltf => gltf::save(scene, w),
        SaveFormat::ThreeDs => threeds::save(scene, w),
        SaveFormat::Stl => stl::save(scene, w),
    }
}
