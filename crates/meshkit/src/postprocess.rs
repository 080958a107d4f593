//! C7: the post-load processing pipeline, run in a fixed order:
//! propagate transforms, recompute bounds, synthesize normals (for meshes
//! that lack them), synthesize tangents (if requested), then bake node
//! transforms into mesh data (if requested).

use meshkit_common::{Aabb, Mat4, Vec2, Vec3};
use meshkit_scene::{Mesh, Scene};

use crate::flags::LoadFlags;

pub fn run(scene: &mut Scene, flags: LoadFlags) {
    propagate_transforms(scene);
    recompute_bounds(scene);

    if flags.contains(LoadFlags::NOPROC) {
        return;
    }

    for mesh in scene.meshes.iter_mut() {
        if mesh.normals.is_empty() {
            compute_normals(mesh);
        }
    }

    if flags.contains(LoadFlags::GEN_TANGENTS) {
        for mesh in scene.meshes.iter_mut() {
            if !mesh.texcoords.is_empty() {
                compute_tangents(mesh);
            }
        }
    }

    if flags.contains(LoadFlags::APPLY_XFORM) {
        apply_transforms(scene);
    }
}

/// `global = parent.global * local`, computed top-down from the top-level
/// nodes. Uses a side table rather than mutating the arena in place, since
/// a node's global depends on its parent's (already-updated) global.
fn propagate_transforms(scene: &mut Scene) {
    let mut globals = vec![Mat4::IDENTITY; scene.nodes.len()];
    let mut stack: Vec<_> = scene.top_nodes.iter().map(|&idx| (idx, Mat4::IDENTITY)).collect();

    while let Some((idx, parent_global)) = stack.pop() {
        let (local, children) = {
            let node = scene.nodes.get(idx).expect("node index from scene arena");
            (node.local, node.children.clone())
        };
        let global = parent_global * local;
        globals[idx.as_usize()] = global;
        for child in children {
            stack.push((child, global));
        }
    }

    for (i, node) in scene.nodes.iter_mut().enumerate() {
        node.global = globals[i];
    }
}

/// Rebuilds the scene-level cached bounds (invariant 4): the union, over
/// every node, of that node's meshes' positions transformed by the node's
/// global matrix. A mesh referenced by more than one node contributes once
/// per reference, which is enough for correct bounds even though it does
/// redundant work.
fn recompute_bounds(scene: &mut Scene) {
    let mut bounds = Aabb::EMPTY;
    for node in scene.nodes.iter() {
        for &mesh_idx in &node.meshes {
            if let Some(mesh) = scene.meshes.get(mesh_idx) {
                for &p in &mesh.positions {
                    bounds.expand(node.global.transform_point3(p));
                }
            }
        }
    }
    scene.cached_bounds = Some(bounds);
}

/// Accumulates unnormalized face normals onto every vertex, then
/// normalizes. No-op if the mesh has no vertices or faces.
pub fn compute_normals(mesh: &mut Mesh) -> bool {
    if mesh.positions.is_empty() || mesh.faces.is_empty() {
        return false;
    }
    let mut normals = vec![Vec3::ZERO; mesh.positions.len()];
    for face in &mesh.faces {
        let v0 = mesh.positions[face[0] as usize];
        let v1 = mesh.positions[face[1] as usize];
        let v2 = mesh.positions[face[2] as usize];
        let n = (v1 - v0).cross(v2 - v0);
        for &i in face {
            normals[i as usize] += n;
        }
    }
    for n in normals.iter_mut() {
        *n = if *n != Vec3::ZERO { n.normalize() } else { Vec3::Z };
    }
    mesh.normals = normals;
    true
}

/// Per-face 2x2 UV-to-edge linear solve for the U tangent direction,
/// accumulated per vertex, then Gram-Schmidt orthogonalized against the
/// (final) per-vertex normal. Requires texture coordinates; computes
/// normals first if the mesh doesn't already have them.
pub fn compute_tangents(mesh: &mut Mesh) -> bool {
    if mesh.positions.is_empty() || mesh.faces.is_empty() || mesh.texcoords.is_empty() {
        return false;
    }
    if mesh.normals.is_empty() {
        compute_normals(mesh);
    }

    let mut tangents = vec![Vec3::ZERO; mesh.positions.len()];
    for face in &mesh.faces {
        let v0 = mesh.positions[face[0] as usize];
        let v1 = mesh.positions[face[1] as usize];
        let v2 = mesh.positions[face[2] as usize];
        let uv0 = mesh.texcoords[face[0] as usize];
        let uv1 = mesh.texcoords[face[1] as usize];
        let uv2 = mesh.texcoords[face[2] as usize];

        let va = v1 - v0;
        let vb = v2 - v0;
        let ta: Vec2 = uv1 - uv0;
        let tb: Vec2 = uv2 - uv0;

        let denom = ta.x * tb.y - tb.x * ta.y;
        if denom.abs() < 1e-12 {
            continue;
        }
        let r = 1.0 / denom;
        let udir = (va * tb.y - vb * ta.y) * r;
        for &i in face {
            tangents[i as usize] += udir;
        }
    }

    for (i, t) in tangents.iter_mut().enumerate() {
        let n = mesh.normals[i];
        let ortho = *t - n * n.dot(*t);
        *t = if ortho != Vec3::ZERO { ortho.normalize() } else { Vec3::ZERO };
    }
    mesh.tangents = tangents;
    true
}

/// Bakes every node's global transform into its meshes' vertex data, then
/// resets every node's local and global matrices to identity.
///
/// A mesh referenced by more than one node is transformed once per
/// reference, so a shared mesh ends up double-transformed — this matches
/// a known limitation of the original implementation rather than fixing
/// it silently (see DESIGN.md).
fn apply_transforms(scene: &mut Scene) {
    let transforms: Vec<(Vec<_>, Mat4)> = scene
        .nodes
        .iter()
        .map(|n| (n.meshes.clone(), n.global))
        .collect();

    for (mesh_indices, global) in transforms {
        for mesh_idx in mesh_indices {
            if let Some(mesh) = scene.meshes.get_mut(mesh_idx) {
                transform_mesh(mesh, &global);
            }
        }
    }

    for node in scene.nodes.iter_mut() {
        node.local = Mat4::IDENTITY;
        node.global = Mat4::IDENTITY;
    }
}

/// Transforms a mesh's positions by `m` in place; normals and tangents are
/// transformed by `transpose(inverse(m))` only if the mesh has any
/// (skipping the extra inverse when there's nothing to transform).
fn transform_mesh(mesh: &mut Mesh, m: &Mat4) {
    for p in mesh.positions.iter_mut() {
        *p = m.transform_point3(*p);
    }
    if mesh.normals.is_empty() && mesh.tangents.is_empty() {
        return;
    }
    let dir_mat = meshkit_common::dir_matrix(m).unwrap_or(*m);
    for n in mesh.normals.iter_mut() {
        *n = dir_mat.transform_vector3(*n).normalize_or_zero();
    }
    for t in mesh.tangents.iter_mut() {
        *t = dir_mat.transform_vector3(*t).normalize_or_zero();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use meshkit_common::aabb_close;
    use meshkit_scene::Node;

    fn triangle() -> Mesh {
        let mut m = Mesh::new("tri");
        m.add_vertex(Vec3::ZERO);
        m.add_vertex(Vec3::X);
        m.add_vertex(Vec3::Y);
        m.add_triangle(0, 1, 2);
        m
    }

    #[test]
    fn compute_normals_fills_unit_normals() {
        let mut m = triangle();
        assert!(compute_normals(&mut m));
        for n in &m.normals {
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn compute_normals_on_empty_mesh_is_noop() {
        let mut m = Mesh::new("empty");
        assert!(!compute_normals(&mut m));
    }

    #[test]
    fn compute_tangents_requires_texcoords() {
        let mut m = triangle();
        assert!(!compute_tangents(&mut m));
    }

    #[test]
    fn compute_tangents_produces_unit_tangents() {
        let mut m = triangle();
        m.add_texcoord(Vec2::new(0.0, 0.0));
        m.add_texcoord(Vec2::new(1.0, 0.0));
        m.add_texcoord(Vec2::new(0.0, 1.0));
        assert!(compute_tangents(&mut m));
        for t in &m.tangents {
            assert!((t.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn propagate_transforms_composes_parent_and_child() {
        let mut scene = Scene::new();
        let mut parent = Node::new("p");
        parent.local = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let parent_idx = scene.add_node(parent);

        let mut child = Node::new("c");
        child.local = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        child.parent = Some(parent_idx);
        let child_idx = scene.add_node(child);
        scene.nodes.get_mut(parent_idx).unwrap().children.push(child_idx);

        propagate_transforms(&mut scene);
        let global = scene.nodes.get(child_idx).unwrap().global;
        let p = global.transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn apply_transforms_bakes_and_resets_identity() {
        let mut scene = Scene::new();
        let mesh_idx = scene.add_mesh(triangle());
        let mut node = Node::new("n");
        node.local = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
        node.meshes.push(mesh_idx);
        let node_idx = scene.add_node(node);

        propagate_transforms(&mut scene);
        apply_transforms(&mut scene);

        let mesh = scene.get_mesh(mesh_idx).unwrap();
        assert!(mesh.positions[0].abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
        let node = scene.get_node(node_idx).unwrap();
        assert!(aabb_close(
            &Aabb {
                vmin: node.local.transform_point3(Vec3::ZERO),
                vmax: node.local.transform_point3(Vec3::ZERO)
            },
            &Aabb {
                vmin: Vec3::ZERO,
                vmax: Vec3::ZERO
            },
            1e-6
        ));
    }
}
