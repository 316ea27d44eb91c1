mod common;

use butterfly_tiles::builder::core_nodes;
use butterfly_tiles::{
    distance_estimate_m, BuilderOptions, DecodedTile, DecodedWay, GlobalId, GlobalIdMap,
    GraphStore, LoadError, RouterDb, TagSet, TileGraphBuilder, VehicleSet,
};
use common::{decoded, place, way, EAST, WEST};
use std::collections::{BTreeSet, HashMap};

/// Edges as pairs of node ids.
fn edge_pairs(db: &RouterDb, ids: &GlobalIdMap) -> BTreeSet<(i64, i64)> {
    let node_of: HashMap<u32, i64> = ids.iter().map(|(g, v)| (v.0, g.0)).collect();
    db.edges()
        .iter()
        .map(|e| (node_of[&e.data.from.0], node_of[&e.data.to.0]))
        .collect()
}

fn build(tiles: &[&DecodedTile]) -> (RouterDb, GlobalIdMap) {
    let vehicles = VehicleSet::all();
    let mut db = RouterDb::new();
    let mut ids = GlobalIdMap::new();
    let mut builder =
        TileGraphBuilder::new(&mut db, &mut ids, &vehicles, BuilderOptions::default());
    for tile in tiles {
        builder.add_tile(tile).unwrap();
    }
    drop(builder);
    (db, ids)
}

#[test]
fn single_way_folds_intermediate_nodes_into_shape() {
    let places = [
        place(1, WEST, 0.1, 0.5),
        place(2, WEST, 0.3, 0.45),
        place(3, WEST, 0.5, 0.55),
        place(4, WEST, 0.7, 0.5),
    ];
    let tile = decoded(WEST, &places, vec![way(10, &[1, 2, 3, 4], "residential")]);
    let (db, ids) = build(&[&tile]);

    assert_eq!(db.vertex_count(), 2);
    assert_eq!(db.edge_count(), 1);
    assert_eq!(edge_pairs(&db, &ids), BTreeSet::from([(1, 4)]));

    let coordinate = |id: i64| tile.nodes[&GlobalId(id)].coordinate();
    let edge = &db.edges()[0];
    assert_eq!(edge.shape, vec![coordinate(2), coordinate(3)]);

    let direct = distance_estimate_m(coordinate(1), coordinate(4)) as f32;
    let along = [(1, 2), (2, 3), (3, 4)]
        .iter()
        .map(|&(a, b)| distance_estimate_m(coordinate(a), coordinate(b)))
        .sum::<f64>() as f32;
    assert!(edge.data.distance >= direct);
    assert!((edge.data.distance - along).abs() < 0.01);
}

#[test]
fn shared_node_splits_ways() {
    let places = [
        place(1, WEST, 0.1, 0.5),
        place(2, WEST, 0.3, 0.5),
        place(3, WEST, 0.5, 0.5),
        place(4, WEST, 0.7, 0.5),
        place(5, WEST, 0.9, 0.5),
        place(6, WEST, 0.5, 0.2),
        place(7, WEST, 0.5, 0.1),
    ];
    let tile = decoded(
        WEST,
        &places,
        vec![
            way(10, &[1, 2, 3, 4, 5], "residential"),
            way(11, &[7, 6, 3], "footway"),
        ],
    );
    let (db, ids) = build(&[&tile]);

    assert_eq!(
        edge_pairs(&db, &ids),
        BTreeSet::from([(1, 3), (3, 5), (7, 3)])
    );

    // Every core node is a vertex and no vertex shows up in a shape
    let ways: Vec<&DecodedWay> = tile.ways.iter().collect();
    let core = core_nodes(&tile, &ways);
    assert_eq!(db.vertex_count() as usize, core.len());
    assert!(core.iter().all(|id| ids.try_get(*id).is_some()));

    let vertices: Vec<_> = db.vertices().to_vec();
    let shape_points: Vec<_> = db.edges().iter().flat_map(|e| e.shape.clone()).collect();
    assert_eq!(shape_points.len(), 3);
    assert!(shape_points.iter().all(|p| !vertices.contains(p)));
}

#[test]
fn ways_no_vehicle_can_use_are_rejected() {
    let places = [place(1, WEST, 0.1, 0.5), place(2, WEST, 0.9, 0.5)];
    let mut closed = way(10, &[1, 2], "motorway");
    closed.tags.insert("access", "no");
    let building = DecodedWay {
        id: 11,
        nodes: vec![GlobalId(1), GlobalId(2)],
        tags: [("building", "yes")].into_iter().collect::<TagSet>(),
    };
    let tile = decoded(WEST, &places, vec![closed, building]);

    let cars = VehicleSet::from_names(&["car"]).unwrap();
    let mut db = RouterDb::new();
    let mut ids = GlobalIdMap::new();
    let mut builder = TileGraphBuilder::new(&mut db, &mut ids, &cars, BuilderOptions::default());
    let stats = builder.add_tile_with_stats(&tile).unwrap();
    drop(builder);

    assert_eq!(stats.ways_rejected, 2);
    assert!(!stats.updated());
    assert_eq!(db.vertex_count(), 0);
    assert_eq!(db.profile_count(), 0);
}

#[test]
fn missing_node_fails_tile_without_changes() {
    let places = [place(1, WEST, 0.1, 0.5), place(2, WEST, 0.9, 0.5)];
    let tile = decoded(
        WEST,
        &places,
        vec![way(10, &[1, 2], "residential"), way(11, &[2, 99], "residential")],
    );

    let vehicles = VehicleSet::all();
    let mut db = RouterDb::new();
    let mut ids = GlobalIdMap::new();
    let mut builder =
        TileGraphBuilder::new(&mut db, &mut ids, &vehicles, BuilderOptions::default());
    let err = builder.add_tile(&tile).unwrap_err();
    drop(builder);

    assert!(!err.is_fatal());
    match err {
        LoadError::MissingNode { way_id, node, .. } => {
            assert_eq!(way_id, 11);
            assert_eq!(node, GlobalId(99));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(db.vertex_count(), 0);
    assert_eq!(db.edge_count(), 0);
    assert!(ids.is_empty());
}

#[test]
fn way_with_one_node_is_skipped() {
    let places = [place(1, WEST, 0.5, 0.5)];
    let tile = decoded(WEST, &places, vec![way(10, &[1], "residential")]);

    let vehicles = VehicleSet::all();
    let mut db = RouterDb::new();
    let mut ids = GlobalIdMap::new();
    let mut builder =
        TileGraphBuilder::new(&mut db, &mut ids, &vehicles, BuilderOptions::default());
    let stats = builder.add_tile_with_stats(&tile).unwrap();
    drop(builder);

    assert_eq!(stats.ways_skipped, 1);
    assert_eq!(db.vertex_count(), 0);
}

fn boundary_tiles() -> (DecodedTile, DecodedTile) {
    let places = [
        place(1, WEST, 0.5, 0.5),
        place(2, WEST, 0.9, 0.5),
        place(3, EAST, 0.1, 0.5),
        place(4, EAST, 0.5, 0.5),
    ];
    let ways = || vec![way(7, &[1, 2, 3, 4], "residential")];
    (
        decoded(WEST, &places, ways()),
        decoded(EAST, &places, ways()),
    )
}

#[test]
fn single_tile_builds_crossing_segment() {
    let (west, _) = boundary_tiles();
    let (db, ids) = build(&[&west]);

    assert_eq!(db.vertex_count(), 3);
    assert_eq!(edge_pairs(&db, &ids), BTreeSet::from([(1, 2), (2, 3)]));
}

#[test]
fn boundary_way_is_built_once_in_either_order() {
    let (west, east) = boundary_tiles();
    let expected = BTreeSet::from([(1, 2), (2, 3), (3, 4)]);

    for order in [[&west, &east], [&east, &west]] {
        let (db, ids) = build(&order);
        assert_eq!(db.vertex_count(), 4);
        assert_eq!(db.edge_count(), 3);
        assert_eq!(edge_pairs(&db, &ids), expected);

        let crossing = db
            .edges()
            .iter()
            .find(|e| ids.try_get(GlobalId(2)) == Some(e.data.from))
            .unwrap();
        assert!(crossing.shape.is_empty());
    }
}
