use meshkit_common::{Index, Mat4};

use crate::mesh::Mesh;
use crate::userdata::UserData;

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub parent: Option<Index<Node>>,
    pub children: Vec<Index<Node>>,
    pub meshes: Vec<Index<Mesh>>,
    /// Transform relative to the parent (identity if never set).
    pub local: Mat4,
    /// Cached `parent.global * local`, refreshed by the post-processor's
    /// transform-propagation pass.
    pub global: Mat4,
    pub user_data: UserData,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Node {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            meshes: Vec::new(),
            local: Mat4::IDENTITY,
            global: Mat4::IDENTITY,
            user_data: UserData::None,
        }
    }

    /// Adds `mesh` to this node's mesh list, unless it's already present
    /// (a node lists each owned mesh once, matching the dedup scan the
    /// original performs before appending).
    pub fn add_mesh(&mut self, mesh: Index<Mesh>) {
        if !self.meshes.contains(&mesh) {
            self.meshes.push(mesh);
        }
    }

    pub fn remove_mesh(&mut self, mesh: Index<Mesh>) {
        self.meshes.retain(|&m| m != mesh);
    }
}

/// Scene-graph operations that need to see more than one node at a time
/// (reparenting must also touch the *old* parent), so they live on the
/// node arena rather than on `Node` itself.
pub fn add_child(nodes: &mut meshkit_common::Arena<Node>, parent: Index<Node>, child: Index<Node>) {
    if let Some(node) = nodes.get(child) {
        if let Some(old_parent) = node.parent {
            if old_parent != parent {
                remove_child(nodes, old_parent, child);
            }
        }
    }
    if let Some(node) = nodes.get_mut(child) {
        node.parent = Some(parent);
    }
    if let Some(p) = nodes.get_mut(parent) {
        if !p.children.contains(&child) {
            p.children.push(child);
        }
    }
}

pub fn remove_child(nodes: &mut meshkit_common::Arena<Node>, parent: Index<Node>, child: Index<Node>) {
    if let Some(p) = nodes.get_mut(parent) {
        p.children.retain(|&c| c != child);
    }
    if let Some(node) = nodes.get_mut(child) {
        if node.parent == Some(parent) {
            node.parent = None;
        }
    }
}
