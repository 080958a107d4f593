//! Portable 3D mesh file library: a format-agnostic scene graph plus
//! loaders/savers for OBJ+MTL, 3DS, glTF/GLB, JTF and STL.
//!
//! [`load`]/[`save`] are the default entry points, backed by
//! [`meshkit_common::FileIoProvider`]. [`load_with_io`]/[`save_with_io`]
//! take a caller-supplied [`meshkit_common::IoProvider`] for virtual
//! filesystems; [`load_reader`]/[`save_writer`] work against an in-memory
//! stream with no sibling-file support (GLB, JTF, STL are self-contained;
//! OBJ's `mtllib` and glTF's external buffers fail to resolve).

mod dispatch;
mod flags;
mod format;
mod postprocess;

pub use flags::{LoadFlags, SaveFormat};
pub use meshkit_common::*;
pub use meshkit_scene::*;

/// Loads a scene from `path` using the default filesystem I/O provider,
/// auto-detecting the format, then runs the post-processing pipeline.
pub fn load(path: &str, flags: LoadFlags) -> MeshResult<Scene> {
    load_with_io(path, flags, &FileIoProvider)
}

/// Same as [`load`], but with a caller-supplied [`IoProvider`].
pub fn load_with_io<P: IoProvider>(path: &str, flags: LoadFlags, io: &P) -> MeshResult<Scene> {
    let mut scene = Scene::new();
    let (dirname, filename) = meshkit_common::io::split_dirname(path);
    scene.dirname = dirname.to_string();
    scene.name = filename.to_string();
    dispatch::load(&mut scene, path, io)?;
    postprocess::run(&mut scene, flags);
    Ok(scene)
}

/// Loads from an in-memory `Read + Seek` stream with no sibling-file
/// support (suitable for JTF/STL/3DS/GLB, and self-contained glTF).
pub fn load_reader<R: std::io::Read + std::io::Seek>(r: &mut R, flags: LoadFlags) -> MeshResult<Scene> {
    let mut scene = Scene::new();
    dispatch::load_reader(&mut scene, r)?;
    postprocess::run(&mut scene, flags);
    Ok(scene)
}

/// Saves `scene` to `path` using the default filesystem I/O provider.
/// `format` picks the codec explicitly, or `SaveFormat::Auto` to infer it
/// from `path`'s suffix.
pub fn save(scene: &Scene, path: &str, format: SaveFormat) -> MeshResult<()> {
    save_with_io(scene, path, format, &FileIoProvider)
}

/// Same as [`save`], but with a caller-supplied [`IoProvider`].
pub fn save_with_io<P: IoProvider>(scene: &Scene, path: &str, format: SaveFormat, io: &P) -> MeshResult<()> {
    dispatch::save(scene, path, format, io)
}

/// Saves into an in-memory `Write + Seek` stream. OBJ's sibling `.mtl` is
/// skipped with a warning since there's no filesystem to place it next to.
pub fn save_writer<W: std::io::Write + std::io::Seek>(scene: &Scene, w: &mut W, format: SaveFormat) -> MeshResult<()> {
    dispatch::save_writer(scene, w, format)
}

#[cfg(test)]
mod test {
    use super::*;
    use meshkit_scene::{Mesh, Node};
    use std::io::Cursor;

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
    fn jtf_round_trip_through_reader_runs_postprocess() {
        let scene = tri_scene();
        let mut buf = Vec::new();
        save_writer(&scene, &mut Cursor::new(&mut buf), SaveFormat::Jtf).unwrap();

        let loaded = load_reader(&mut Cursor::new(buf), LoadFlags::empty()).unwrap();
        assert_eq!(loaded.num_meshes(), 1);
        // post-processing populates cached_bounds and synthesizes normals.
        assert!(loaded.bounds().is_ok());
        let mesh = loaded.get_mesh(Index::new(0)).unwrap();
        assert!(!mesh.normals.is_empty());
    }

    #[test]
    fn noproc_skips_normal_synthesis() {
        let obj = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n".to_vec();

        let loaded = load_reader(&mut Cursor::new(obj.clone()), LoadFlags::empty()).unwrap();
        let mesh = loaded.get_mesh(Index::new(0)).unwrap();
        assert!(!mesh.normals.is_empty());

        let loaded = load_reader(&mut Cursor::new(obj), LoadFlags::NOPROC).unwrap();
        let mesh = loaded.get_mesh(Index::new(0)).unwrap();
        assert!(mesh.normals.is_empty());
    }
}
