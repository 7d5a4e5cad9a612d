use stage_ngin::{
    Vector3,
    camera::PerspectiveCamera,
    data_structures::{
        geometry::{Geometry, Topology},
        scene_graph::{Culling, Material, Mesh, Node},
    },
    render::FrameInfo,
    stats::RenderStats,
};

fn ball(name: &str) -> Node {
    Node::with_mesh(
        name,
        Mesh::new(Geometry::sphere(1.0, 8, 4, [1.0; 3]), Material::default()),
    )
}

fn tree() -> Node {
    let mut root = Node::new("root");
    root.add_child(ball("near"));
    let mut far = ball("far");
    far.transform.position = Vector3::new(10_000.0, 0.0, 0.0);
    root.add_child(far);
    let mut hidden = Node::new("hidden");
    hidden.visible = false;
    hidden.add_child(ball("inside hidden"));
    root.add_child(hidden);
    root
}

fn drawn(root: &Node, culling: &Culling) -> usize {
    root.draw_list(culling).len()
}

#[test]
fn frustum_culling_skips_hidden_and_out_of_view_meshes() {
    let root = tree();
    let frustum = PerspectiveCamera::default().frustum();
    let items = root.draw_list(&Culling::Frustum(frustum));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].world.w.x, 0.0);
}

#[test]
fn disabled_culling_includes_everything() {
    let root = tree();
    assert_eq!(drawn(&root, &Culling::Disabled), 3);
}

#[test]
fn unculled_nodes_are_drawn_even_out_of_view() {
    let mut root = tree();
    root.find_mut("far").unwrap().frustum_culled = false;
    let frustum = PerspectiveCamera::default().frustum();
    assert_eq!(drawn(&root, &Culling::Frustum(frustum)), 2);
}

#[test]
fn culling_accounts_for_parent_scale() {
    let mut group = Node::new("group");
    group.transform.scale = Vector3::new(100.0, 100.0, 100.0);
    let mut child = ball("child");
    // World centre (50, 0, 0) with radius 100 still covers the origin the camera looks at.
    child.transform.position = Vector3::new(0.5, 0.0, 0.0);
    group.add_child(child);

    let frustum = PerspectiveCamera::default().frustum();
    assert_eq!(drawn(&group, &Culling::Frustum(frustum)), 1);
}

#[test]
fn world_matrices_compose_parent_transforms() {
    let mut parent = Node::new("parent");
    parent.transform.position = Vector3::new(1.0, 2.0, 3.0);
    let mut child = ball("child");
    child.transform.position = Vector3::new(1.0, 0.0, 0.0);
    parent.add_child(child);
    let items = parent.draw_list(&Culling::Disabled);
    let translation = items[0].world.w;
    assert_eq!((translation.x, translation.y, translation.z), (2.0, 2.0, 3.0));
}

#[test]
fn dispose_releases_every_mesh_once() {
    let mut root = tree();
    assert_eq!(root.mesh_count(), 3);
    assert_eq!(root.dispose(), 3);
    assert_eq!(root.dispose(), 0);
    assert!(root.draw_list(&Culling::Disabled).is_empty());
    assert!(root.find("near").unwrap().mesh.as_ref().unwrap().is_disposed());
}

#[test]
fn mesh_dispose_without_upload() {
    let mut mesh = Mesh::new(Geometry::axes(1.0), Material::default());
    assert!(!mesh.is_uploaded());
    assert!(mesh.dispose());
    assert!(!mesh.dispose());
}

#[test]
fn find_and_remove_children_by_name() {
    let mut root = tree();
    assert!(root.find("inside hidden").is_some());
    let removed = root.remove_child("hidden").unwrap();
    assert_eq!(removed.children.len(), 1);
    assert!(root.find("inside hidden").is_none());
    assert!(root.remove_child("hidden").is_none());
}

#[test]
fn procedural_shapes() {
    let ring = Geometry::ring(0.8, 1.0, 64, [1.0; 3]);
    assert_eq!(ring.topology, Topology::Triangles);
    assert_eq!(ring.primitive_count(), 128);

    let axes = Geometry::axes(5.0);
    assert_eq!(axes.topology, Topology::Lines);
    assert_eq!(axes.primitive_count(), 3);

    let grid = Geometry::grid(10.0, 10);
    assert_eq!(grid.primitive_count(), 22);

    let (center, radius) = Geometry::sphere(2.0, 16, 8, [1.0; 3]).bounding_sphere();
    assert!(center.x.abs() < 1e-5 && center.y.abs() < 1e-5 && center.z.abs() < 1e-5);
    assert!((radius - 2.0).abs() < 1e-4);

    let empty = Geometry::new(Vec::new(), Vec::new(), Topology::Triangles);
    assert_eq!(empty.bounding_sphere().1, 0.0);
}

#[test]
fn stats_refresh_from_recorded_frames() {
    let frame = FrameInfo {
        draw_calls: 4,
        triangles: 1200,
        lines: 25,
    };
    let mut stats = RenderStats::new(true);
    stats.record(frame, 0.05);
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.frame, frame);
    assert!((snapshot.fps - 20.0).abs() < 0.01);

    let mut disabled = RenderStats::new(false);
    disabled.record(frame, 0.05);
    assert_eq!(disabled.snapshot().frame, FrameInfo::default());
}

#[test]
fn frame_info_accumulates() {
    let mut total = FrameInfo::default();
    total.add(FrameInfo {
        draw_calls: 1,
        triangles: 10,
        lines: 0,
    });
    total.add(FrameInfo {
        draw_calls: 2,
        triangles: 0,
        lines: 5,
    });
    assert_eq!(
        total,
        FrameInfo {
            draw_calls: 3,
            triangles: 10,
            lines: 5
        }
    );
}
