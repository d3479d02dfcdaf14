use std::collections::BTreeSet;
use std::fs;

use glam::Vec3;
use pretty_assertions::assert_eq;
use swgforge::converter::{HostFloor, HostMesh, HostPortal, floor_from_host, mesh_from_host, mesh_to_host};
use swgforge::formats::common::Appearance;
use swgforge::formats::mgn::{BoneWeight, PerShaderData};
use swgforge::prelude::*;
use tempfile::tempdir;

fn single_triangle() -> HostMesh {
    HostMesh {
        positions: vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(1.0, 3.0, 0.0),
        ],
        polygons: vec![vec![0, 1, 2]],
        material_per_polygon: vec![0],
        materials: vec!["shader/tatooine_wall.sht".to_string()],
        ..HostMesh::default()
    }
}

#[test]
fn test_minimal_static_mesh_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wall.msh");
    let settings = MeshSettings::default();

    let mesh = mesh_from_host(&single_triangle(), &settings).unwrap();
    mesh.write(&path).unwrap();

    let loaded = SwgMesh::load(&path).unwrap();
    assert_eq!(loaded, mesh);
    assert_eq!(loaded.spss.len(), 1);
    assert_eq!(loaded.spss[0].shader, "shader/tatooine_wall.sht");
    assert_eq!(loaded.spss[0].flags, VertexFormat::default().with_position(true));
    let positions: Vec<Vec3> = loaded.spss[0].verts.iter().map(|v| v.pos).collect();
    assert_eq!(
        positions,
        vec![
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(-1.0, 3.0, 0.0),
        ]
    );
    assert_eq!(loaded.triangle_count(), 1);

    // winding comes back as authored
    let host = mesh_to_host(&loaded, &settings);
    let corners: Vec<Vec3> = host.polygons[0].iter().map(|&i| host.positions[i as usize]).collect();
    assert_eq!(corners, single_triangle().positions);
}

#[test]
fn test_unknown_mesh_version_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("future.msh");
    let mut bytes = mesh_from_host(&single_triangle(), &MeshSettings::default())
        .unwrap()
        .to_iff()
        .unwrap()
        .into_bytes();
    // FORM <len> MESH FORM <len> 0005
    assert_eq!(&bytes[20..24], b"0005");
    bytes[20..24].copy_from_slice(b"0099");
    fs::write(&path, &bytes).unwrap();

    let err = SwgMesh::load(&path).unwrap_err();
    assert!(matches!(err, Error::UnsupportedVersion { ref version, .. } if version == "0099"));
    assert!(matches!(Asset::load(&path), Err(Error::UnsupportedVersion { .. })));
}

fn zone(name: &str, index: u16, occluded: bool) -> OcclusionZone {
    OcclusionZone {
        name: name.to_string(),
        index,
        occluded,
    }
}

fn occluding_shirt() -> SkinnedMesh {
    let zones = vec![zone("face", 0, false), zone("neck", 1, true), zone("chest", 2, true)];
    let mut face_neck = ZoneCombination::from_name("face:neck", &zones);
    face_neck.triangles = BTreeSet::from([0, 1]);
    let chest = ZoneCombination::from_name("chest", &zones);

    SkinnedMesh {
        max_transforms_vertex: 1,
        max_transforms_shader: 1,
        skeletons: vec!["appearance/skeleton/all_b.skt".to_string()],
        bone_names: vec!["root".to_string()],
        positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)],
        vertex_weights: vec![vec![BoneWeight::new(0, 1.0)]; 4],
        normals: vec![Vec3::Z],
        zones,
        zone_combinations: vec![face_neck, chest],
        psdts: vec![PerShaderData {
            name: "shader/shirt.sht".to_string(),
            pidx: vec![0, 1, 2, 3],
            nidx: vec![0; 4],
            prims: vec![vec![Triangle::new(0, 1, 2), Triangle::new(0, 2, 3)]],
            ..PerShaderData::default()
        }],
        ..SkinnedMesh::default()
    }
}

#[test]
fn test_occlusion_zone_combination_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shirt.mgn");
    occluding_shirt().write(&path).unwrap();

    let loaded = SkinnedMesh::load(&path).unwrap();
    let face = loaded.zone_by_name("face").unwrap().index;
    let neck = loaded.zone_by_name("neck").unwrap().index;
    assert_eq!(loaded.fully_occluded_zone_combination(), vec![face, neck]);
    assert_eq!(loaded.zone_combinations[0].name(&loaded.zones), "face:neck");
    assert_eq!(loaded.zones_this_occludes(), vec![1, 2]);
}

#[test]
fn test_weight_normalization_is_idempotent() {
    let mut weights = vec![
        vec![BoneWeight::new(0, 2.0), BoneWeight::new(1, 2.0)],
        vec![BoneWeight::new(0, 0.2), BoneWeight::new(1, 0.3), BoneWeight::new(2, 0.5)],
        vec![BoneWeight::new(3, 7.0)],
    ];
    normalize_vertex_weights(&mut weights);
    for vertex in &weights {
        let sum: f32 = vertex.iter().map(|w| w.weight).sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }
    let once = weights.clone();
    normalize_vertex_weights(&mut weights);
    for (a, b) in once.iter().flatten().zip(weights.iter().flatten()) {
        assert_eq!(a.bone, b.bone);
        assert!((a.weight - b.weight).abs() < 1e-6);
    }
    assert_eq!(weights[0], vec![BoneWeight::new(0, 0.5), BoneWeight::new(1, 0.5)]);
}

fn doorway_at(x: f32) -> IndexedTriangleList {
    IndexedTriangleList::from_polygon(vec![
        Vec3::new(x, 0.0, 0.0),
        Vec3::new(x, 2.0, 0.0),
        Vec3::new(x + 2.0, 2.0, 0.0),
        Vec3::new(x + 2.0, 0.0, 0.0),
    ])
}

fn cell_using(name: &str, portal: i32) -> Cell {
    Cell {
        name: name.to_string(),
        appearance: format!("appearance/mesh/tower_{name}.msh"),
        portals: vec![PortalData::new(portal, true)],
        ..Cell::default()
    }
}

#[test]
fn test_portal_connectivity() {
    let mut pob = PortalContainer {
        portals: (0..8).map(|i| doorway_at(i as f32 * 3.0)).collect(),
        cells: vec![cell_using("a", 7), cell_using("b", 7)],
        ..PortalContainer::default()
    };
    pob.assemble_building_graph(&[None, None]).unwrap();
    assert_eq!(pob.cells[0].portals[0].connecting_cell, 1);
    assert_eq!(pob.cells[1].portals[0].connecting_cell, 0);

    let graph = pob.path_graph.as_ref().unwrap();
    let portal = graph
        .nodes
        .iter()
        .find(|n| n.key == 7 && n.node_type != PathNodeType::BuildingCell)
        .unwrap()
        .index;
    let cells: Vec<i32> = graph.nodes_of_type(PathNodeType::BuildingCell).map(|n| n.index).collect();
    assert_eq!(cells.len(), 2);
    assert_eq!(graph.edges.len(), 4);
    for cell in cells {
        assert!(graph.has_edge(cell, portal));
        assert!(graph.has_edge(portal, cell));
    }
}

/// Unit square floor split into two triangles, Y up.
fn square_floor() -> HostFloor {
    HostFloor {
        vertices: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
        ],
        faces: vec![vec![0, 1, 2], vec![2, 1, 3]],
        ..HostFloor::default()
    }
}

fn front_door(id: i32) -> HostPortal {
    let (a, b) = (Vec3::new(-0.1, 0.0, 0.0), Vec3::new(1.1, 0.0, 0.0));
    let (c, d) = (Vec3::new(1.1, 2.0, 0.0), Vec3::new(-0.1, 2.0, 0.0));
    HostPortal {
        id,
        triangles: vec![[a, b, c], [a, c, d]],
    }
}

#[test]
fn test_floor_path_graph_survives_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("room.flr");
    let settings = FloorSettings::default();

    let converted = floor_from_host(&square_floor(), &[front_door(7)], &settings).unwrap();
    let mut floor = converted.floor;
    let waypoints = [(Vec3::new(-0.25, 0.0, 0.25), 0.2), (Vec3::new(-0.75, 0.0, 0.75), 0.2)];
    let report = floor.build_path_graph(&waypoints, &converted.global_portal_ids, &settings);
    assert_eq!(report.portal_nodes, 1);
    assert_eq!(report.unconnected_portals, 0);
    floor.write(&path).unwrap();

    let loaded = FloorFile::load(&path).unwrap();
    assert_eq!(loaded.verts, floor.verts);
    assert_eq!(loaded.tris, floor.tris);
    let graph = loaded.path_graph.unwrap();
    assert_eq!(Some(&graph), floor.path_graph.as_ref());
    assert!(graph.has_edge(0, 1));
    let door = graph.nodes_of_type(PathNodeType::CellPortal).next().unwrap();
    assert_eq!(door.key, 7);
    assert_eq!(door.position, Vec3::new(-0.5, 0.0, 0.0));
}

#[test]
fn test_seam_breaks_connectivity() {
    let settings = FloorSettings::default();
    let mut host = square_floor();
    host.seams.push([1, 2]);
    let mut floor = floor_from_host(&host, &[], &settings).unwrap().floor;
    let waypoints = [(Vec3::new(-0.25, 0.0, 0.25), 0.2), (Vec3::new(-0.75, 0.0, 0.75), 0.2)];
    let report = floor.build_path_graph(&waypoints, &[], &settings);
    assert_eq!(report.connections, 0);
    assert!(floor.path_graph.unwrap().edges.is_empty());
}

/// Two triangles sharing a diagonal edge, at fractional coordinates.
fn skewed_floor() -> HostFloor {
    HostFloor {
        vertices: vec![
            Vec3::new(10.3, 0.0, 12.7),
            Vec3::new(13.9, 0.0, 18.4),
            Vec3::new(17.6, 0.0, 11.2),
            Vec3::new(21.35, 0.0, 16.85),
        ],
        faces: vec![vec![0, 1, 2], vec![2, 1, 3]],
        ..HostFloor::default()
    }
}

#[test]
fn test_diagonal_wall_breaks_connectivity() {
    let settings = FloorSettings::default();
    // triangle centroids, X flipped into engine space
    let waypoints = [
        (Vec3::new(-13.933, 0.0, 14.1), 0.2),
        (Vec3::new(-17.617, 0.0, 15.483), 0.2),
    ];

    let mut open = floor_from_host(&skewed_floor(), &[], &settings).unwrap().floor;
    assert_eq!(open.build_path_graph(&waypoints, &[], &settings).connections, 1);

    let mut host = skewed_floor();
    host.seams.push([1, 2]);
    let mut walled = floor_from_host(&host, &[], &settings).unwrap().floor;
    let report = walled.build_path_graph(&waypoints, &[], &settings);
    assert_eq!(report.connections, 0);
    assert!(walled.path_graph.unwrap().edges.is_empty());
}

/// Overwrite the first count stored in chunk `tag`.
fn corrupt_count(bytes: &mut [u8], tag: &[u8; 4], count: u32) {
    let at = bytes.windows(4).position(|w| w == tag).unwrap() + 8;
    bytes[at..at + 4].copy_from_slice(&count.to_le_bytes());
}

#[test]
fn test_oversized_floor_triangle_count_is_truncated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("huge.flr");
    let mut iff = Iff::new(0);
    iff.insert_form("FLOR", true).unwrap();
    iff.insert_form("0006", true).unwrap();
    iff.insert_chunk("VERT", true).unwrap();
    iff.insert_i32(0).unwrap();
    iff.exit_chunk("VERT").unwrap();
    iff.insert_chunk("TRIS", true).unwrap();
    iff.insert_i32(i32::MAX).unwrap();
    iff.exit_chunk("TRIS").unwrap();
    iff.exit_form("0006").unwrap();
    iff.exit_form("FLOR").unwrap();
    iff.write(&path).unwrap();

    assert!(matches!(FloorFile::load(&path), Err(Error::TruncatedData { .. })));
    assert!(matches!(Asset::load(&path), Err(Error::TruncatedData { .. })));
}

#[test]
fn test_oversized_counts_are_truncated_in_every_format() {
    let dir = tempdir().unwrap();

    let mut bytes = mesh_from_host(&single_triangle(), &MeshSettings::default())
        .unwrap()
        .to_iff()
        .unwrap()
        .into_bytes();
    corrupt_count(&mut bytes, b"INDX", u32::MAX);
    let path = dir.path().join("wall.msh");
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(SwgMesh::load(&path), Err(Error::TruncatedData { .. })));

    let mut bytes = occluding_shirt().to_iff().unwrap().into_bytes();
    corrupt_count(&mut bytes, b"PIDX", u32::MAX);
    let path = dir.path().join("shirt.mgn");
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(SkinnedMesh::load(&path), Err(Error::TruncatedData { .. })));

    let pob = PortalContainer {
        portals: vec![doorway_at(0.0)],
        cells: vec![cell_using("r0", 0), cell_using("r1", 0)],
        ..PortalContainer::default()
    };
    let mut bytes = pob.to_iff(false).unwrap().into_bytes();
    corrupt_count(&mut bytes, b"LGHT", i32::MAX as u32);
    let path = dir.path().join("hut.pob");
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(PortalContainer::load(&path), Err(Error::TruncatedData { .. })));

    let mut iff = Iff::new(0);
    iff.insert_form("SKTM", true).unwrap();
    iff.insert_form("0002", true).unwrap();
    iff.insert_chunk("INFO", true).unwrap();
    iff.insert_i32(i32::MAX).unwrap();
    iff.exit_chunk("INFO").unwrap();
    iff.insert_chunk("NAME", true).unwrap();
    iff.insert_string("root").unwrap();
    iff.exit_chunk("NAME").unwrap();
    iff.exit_form("0002").unwrap();
    iff.exit_form("SKTM").unwrap();
    let path = dir.path().join("body.skt");
    iff.write(&path).unwrap();
    assert!(matches!(SkeletonNames::load(&path), Err(Error::TruncatedData { .. })));
}

#[test]
fn test_pruning_keeps_the_short_edge() {
    let mut graph = PathGraph::new(PathGraphType::Cell);
    let hub = graph.add_node(PathNodeType::CellWaypoint, Vec3::ZERO, 0.5, -1);
    let near = graph.add_node(PathNodeType::CellWaypoint, Vec3::new(1.0, 0.0, 0.0), 0.5, -1);
    let angle = 10f32.to_radians();
    let far = graph.add_node(
        PathNodeType::CellWaypoint,
        Vec3::new(angle.cos() * 3.0, 0.0, angle.sin() * 3.0),
        0.5,
        -1,
    );
    graph.connect(hub, near);
    graph.connect(hub, far);

    assert_eq!(graph.prune_redundant_edges(20.0), 1);
    assert!(graph.has_edge(hub, near));
    assert!(!graph.has_edge(hub, far));
}

#[test]
fn test_building_assembly_with_floors_on_disk() {
    let dir = tempdir().unwrap();
    let root = AssetRoot::new(dir.path());
    fs::create_dir_all(dir.path().join("appearance/collision")).unwrap();

    let settings = FloorSettings::default();
    let mut floor = floor_from_host(&square_floor(), &[front_door(0)], &settings).unwrap().floor;
    floor.build_path_graph(&[(Vec3::new(-0.25, 0.0, 0.25), 0.2)], &[0], &settings);
    floor.write(root.join("appearance/collision/hut_r1.flr")).unwrap();

    let mut room = cell_using("r1", 0);
    room.floor = Some("appearance/collision/hut_r1.flr".to_string());
    let mut pob = PortalContainer {
        portals: vec![doorway_at(0.0)],
        cells: vec![cell_using("r0", 0), room],
        ..PortalContainer::default()
    };

    let floors = pob.load_floor_graphs(&root);
    assert!(floors[0].is_none());
    assert!(floors[1].is_some());
    let refs: Vec<_> = floors.iter().map(Option::as_ref).collect();
    pob.assemble_building_graph(&refs).unwrap();

    let path = dir.path().join("hut.pob");
    pob.write(&path, false).unwrap();
    let loaded = PortalContainer::load(&path).unwrap();
    assert_eq!(loaded.cells, pob.cells);
    assert_eq!(loaded.path_graph, pob.path_graph);

    let graph = loaded.path_graph.unwrap();
    let room_node = graph
        .nodes_of_type(PathNodeType::BuildingCell)
        .find(|n| n.key == 1)
        .unwrap();
    assert_eq!(room_node.position, Vec3::new(-0.25, 0.0, 0.25));
}

#[test]
fn test_crc_is_deterministic() {
    let bytes = occluding_shirt().to_iff().unwrap().into_bytes();
    let first = Iff::from_bytes(bytes.clone());
    let second = Iff::from_bytes(bytes.clone());
    assert_eq!(first.calculate(), second.calculate());

    let mut flipped = bytes;
    let last = flipped.len() - 1;
    flipped[last] ^= 0x01;
    assert_ne!(Iff::from_bytes(flipped).calculate(), first.calculate());
}

/// Enter every block by name, recursing into forms.
fn visit_all(iff: &mut Iff, visited: &mut usize) {
    while !iff.at_end_of_form() {
        let name = iff.current_name();
        if iff.is_current_form() {
            iff.enter_form(&name).unwrap();
            visit_all(iff, visited);
            iff.exit_form(&name).unwrap();
        } else {
            let tag = iff.current_tag();
            iff.enter_chunk(&tag).unwrap();
            iff.exit_chunk(&tag).unwrap();
        }
        *visited += 1;
    }
}

#[test]
fn test_lengths_stay_consistent_after_edits() {
    let mut iff = Iff::new(0);
    iff.insert_form("ROOT", true).unwrap();
    iff.insert_form("0001", true).unwrap();
    iff.insert_chunk("DATA", true).unwrap();
    iff.insert_i32(1).unwrap();
    iff.insert_f32(2.0).unwrap();
    iff.exit_chunk("DATA").unwrap();
    iff.insert_form("KIDS", true).unwrap();
    iff.insert_chunk("NAME", true).unwrap();
    iff.insert_string("first").unwrap();
    iff.exit_chunk("NAME").unwrap();
    iff.exit_form("KIDS").unwrap();
    iff.exit_form("0001").unwrap();
    iff.exit_form("ROOT").unwrap();

    // reopen, shrink DATA and grow NAME in place
    let mut edit = Iff::from_bytes(iff.into_bytes());
    edit.enter_form("ROOT").unwrap();
    edit.enter_form("0001").unwrap();
    edit.enter_chunk("DATA").unwrap();
    edit.delete(4).unwrap();
    edit.exit_chunk("DATA").unwrap();
    edit.enter_form("KIDS").unwrap();
    edit.enter_chunk("NAME").unwrap();
    edit.insert_string("zeroth").unwrap();
    edit.exit_chunk("NAME").unwrap();
    edit.exit_form("KIDS").unwrap();
    edit.exit_form("0001").unwrap();
    edit.exit_form("ROOT").unwrap();

    let bytes = edit.into_bytes();
    let total = u32::from_be_bytes(bytes[4..8].try_into().unwrap()) as usize;
    assert_eq!(total + 8, bytes.len());

    let mut reread = Iff::from_bytes(bytes);
    let mut visited = 0;
    visit_all(&mut reread, &mut visited);
    assert_eq!(visited, 5);

    let mut check = Iff::from_bytes(reread.into_bytes());
    check.enter_form("ROOT").unwrap();
    check.enter_form("0001").unwrap();
    check.enter_chunk("DATA").unwrap();
    assert_eq!(check.read_f32().unwrap(), 2.0);
    check.exit_chunk("DATA").unwrap();
    check.enter_form("KIDS").unwrap();
    check.enter_chunk("NAME").unwrap();
    assert_eq!(check.read_string().unwrap(), "zeroth");
    assert_eq!(check.read_string().unwrap(), "first");
}

#[test]
fn test_lod_apt_chain_through_asset_root() {
    let dir = tempdir().unwrap();
    let root = AssetRoot::new(dir.path());
    fs::create_dir_all(dir.path().join("appearance/lod")).unwrap();

    let plan = LodBuilder::new("hut")
        .child("hut_far", Some(128.0))
        .child("hut_near", Some(32.0))
        .build(Appearance::default());
    assert_eq!(plan.outputs[0], ("hut_near".to_string(), "mesh/hut_l0.msh".to_string()));

    let lod_path = root.join("appearance/lod/hut.lod");
    plan.lod.write(&lod_path).unwrap();
    LodFile::write_companion_apt(&lod_path).unwrap();

    let apt = AptFile::load(dir.path().join("appearance/hut.apt")).unwrap();
    let resolved = apt.resolve(&root).unwrap();
    assert_eq!(LodFile::load(resolved).unwrap(), plan.lod);

    let missing = AptFile::for_lod("tower").resolve(&root).unwrap_err();
    assert!(matches!(missing, Error::MissingReference { .. }));
}

#[test]
fn test_config_drives_asset_root() {
    let dir = tempdir().unwrap();
    let assets = dir.path().join("extracted");
    fs::create_dir_all(assets.join("appearance")).unwrap();
    AptFile::for_lod("hut").write(assets.join("appearance/hut.apt")).unwrap();

    let config_path = dir.path().join("swgforge.toml");
    fs::write(
        &config_path,
        format!(
            "asset_root = {:?}\n\n[floor]\nprune_angle_degrees = 15.0\n",
            assets.display().to_string()
        ),
    )
    .unwrap();

    let config = ToolConfig::load(&config_path).unwrap();
    assert_eq!(config.floor.prune_angle_degrees, 15.0);
    assert_eq!(config.floor.containment_tolerance, 0.1);
    assert!(config.mesh.flip_uv_v);

    let root = config.asset_root().unwrap();
    let files = root.files_with_extension(AssetKind::EXTENSIONS);
    assert_eq!(files.len(), 1);
    let asset = Asset::load(&files[0]).unwrap();
    assert_eq!(asset.kind(), AssetKind::Apt);
}
