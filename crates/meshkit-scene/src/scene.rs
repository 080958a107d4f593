use std::collections::HashMap;
use std::path::Path;

use meshkit_common::{Aabb, Arena, Index, MeshError, MeshResult};

use crate::material::Material;
use crate::mesh::Mesh;
use crate::node::Node;

/// The scene store: owns every mesh, material and node, plus the
/// top-level node list, source path bookkeeping, and the asset-path
/// resolution cache.
#[derive(Debug, Default)]
pub struct Scene {
    pub meshes: Arena<Mesh>,
    pub materials: Arena<Material>,
    pub nodes: Arena<Node>,
    pub top_nodes: Vec<Index<Node>>,

    /// Name of the scene (basename of the loaded/saved path, or empty).
    pub name: String,
    /// Directory of the loaded/saved path, used to resolve sibling assets.
    pub dirname: String,

    /// Cached scene-level bounds: the union, over every node, of that
    /// node's meshes' positions transformed by the node's global matrix.
    /// Populated by the post-load processing pipeline; `None` until then
    /// (a freshly built scene has no cached bounds).
    pub cached_bounds: Option<Aabb>,

    asset_cache: HashMap<String, String>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> Index<Mesh> {
        self.meshes.push(mesh)
    }

    pub fn add_material(&mut self, mtl: Material) -> Index<Material> {
        self.materials.push(mtl)
    }

    /// Adds a node, registering it as a top-level node if it has no parent
    /// at the time of insertion (matches the original: top-level
    /// membership is decided once, at add time).
    pub fn add_node(&mut self, node: Node) -> Index<Node> {
        let is_top = node.parent.is_none();
        let idx = self.nodes.push(node);
        if is_top {
            self.top_nodes.push(idx);
        }
        idx
    }

    pub fn num_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn num_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_mesh(&self, idx: Index<Mesh>) -> Option<&Mesh> {
        self.meshes.get(idx)
    }

    pub fn get_material(&self, idx: Index<Material>) -> Option<&Material> {
        self.materials.get(idx)
    }

    pub fn get_node(&self, idx: Index<Node>) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub fn find_mesh(&self, name: &str) -> Option<Index<Mesh>> {
        self.meshes
            .iter()
            .position(|m| m.name == name)
            .map(|i| Index::new(i as u32))
    }

    pub fn find_material(&self, name: &str) -> Option<Index<Material>> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(|i| Index::new(i as u32))
    }

    pub fn find_node(&self, name: &str) -> Option<Index<Node>> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| Index::new(i as u32))
    }

    /// Returns the cached scene AABB. Fails if it was never computed (an
    /// empty or not-yet-processed scene), matching `mf_bounds`'s `-1`
    /// return rather than recomputing on the fly.
    pub fn bounds(&self) -> MeshResult<Aabb> {
        match self.cached_bounds {
            Some(b) if !b.is_empty() => Ok(b),
            _ => Err(MeshError::integrity("scene has no geometry to bound")),
        }
    }

    pub fn clear(&mut self) {
        self.meshes.clear();
        self.materials.clear();
        self.nodes.clear();
        self.top_nodes.clear();
        self.name.clear();
        self.dirname.clear();
        self.cached_bounds = None;
        self.asset_cache.clear();
    }

    /// Resolves a referenced filename (texture, sibling MTL) against the
    /// scene's directory, caching the result. Never an error: resolution
    /// failure falls back to the filename unchanged, matching
    /// `mf_find_asset`.
    pub fn find_asset(&mut self, fname: &str) -> String {
        if self.dirname.is_empty() {
            return fname.to_string();
        }
        if let Some(hit) = self.asset_cache.get(fname) {
            return hit.clone();
        }

        let joined = format!("{}/{}", self.dirname, fname);
        let resolved = if Path::new(&joined).exists() {
            joined
        } else if Path::new(fname).exists() {
            fname.to_string()
        } else {
            fname.to_string()
        };

        log::debug!("resolved asset {fname:?} -> {resolved:?}");
        self.asset_cache.insert(fname.to_string(), resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use meshkit_common::{aabb_close, Vec3};

    #[test]
    fn add_node_without_parent_is_top_level() {
        let mut scene = Scene::new();
        let idx = scene.add_node(Node::new("root"));
        assert_eq!(scene.top_nodes, vec![idx]);
    }

    #[test]
    fn add_node_with_parent_is_not_top_level() {
        let mut scene = Scene::new();
        let mut child = Node::new("child");
        child.parent = Some(Index::new(0));
        scene.add_node(child);
        assert!(scene.top_nodes.is_empty());
    }

    #[test]
    fn bounds_of_empty_scene_is_integrity_error() {
        let scene = Scene::new();
        assert!(scene.bounds().is_err());
    }

    #[test]
    fn bounds_returns_cached_value_when_present() {
        let mut scene = Scene::new();
        let b = Aabb {
            vmin: Vec3::new(-1.0, 0.0, 0.0),
            vmax: Vec3::new(1.0, 2.0, 0.0),
        };
        scene.cached_bounds = Some(b);
        let bounds = scene.bounds().unwrap();
        assert!(aabb_close(&bounds, &b, 1e-6));
    }

    #[test]
    fn find_asset_with_no_dirname_returns_unchanged() {
        let mut scene = Scene::new();
        assert_eq!(scene.find_asset("tex.png"), "tex.png");
    }
}
