use super::*;
use geo_types::{polygon, Rect};
use std::fs;
use tempfile::tempdir;

fn ls(coords: &[(f64, f64)]) -> LineString<f64> {
    LineString::from(coords.to_vec())
}

#[test]
fn test_shared_endpoints_become_one_junction() {
    let graph = RoadNetworkGraph::from_lines(
        Crs::WGS84,
        vec![
            ls(&[(0.0, 0.0), (10.0, 0.0)]),
            ls(&[(10.0, 0.0), (10.0, 10.0)]),
            ls(&[(10.0, 0.0), (20.0, 0.0)]),
        ],
    );

    assert_eq!(graph.edge_count(), 3);
    assert_eq!(graph.junction_count(), 4);
    let hub = graph
        .junctions()
        .iter()
        .find(|j| j.coordinate == Coord { x: 10.0, y: 0.0 })
        .unwrap();
    assert_eq!(hub.edges.len(), 3);
}

#[test]
fn test_degenerate_lines_are_ignored() {
    let mut graph = RoadNetworkGraph::new(Crs::WGS84);
    assert!(graph.add_edge(ls(&[(1.0, 1.0)])).is_none());
    assert!(graph.add_edge(LineString::new(vec![])).is_none());
    assert!(graph.is_empty());
}

#[test]
fn test_simplify_merges_degree_two_chain() {
    // A -- B -- C -- D with a spur at C.
    let graph = RoadNetworkGraph::from_lines(
        Crs::WGS84,
        vec![
            ls(&[(0.0, 0.0), (1.0, 0.0)]),
            ls(&[(2.0, 0.0), (1.0, 0.0)]),
            ls(&[(2.0, 0.0), (3.0, 0.0)]),
            ls(&[(3.0, 0.0), (4.0, 0.0)]),
            ls(&[(3.0, 0.0), (3.0, 5.0)]),
        ],
    );

    let simplified = graph.simplify();
    assert_eq!(simplified.edge_count(), 3);

    let merged = simplified
        .edges()
        .find(|l| l.0.len() == 4)
        .expect("A..C should merge into one edge");
    assert_eq!(merged.0.first(), Some(&Coord { x: 0.0, y: 0.0 }));
    assert_eq!(merged.0.last(), Some(&Coord { x: 3.0, y: 0.0 }));
    assert_eq!(merged.0[2], Coord { x: 2.0, y: 0.0 });
}

#[test]
fn test_simplify_collapses_isolated_ring() {
    let graph = RoadNetworkGraph::from_lines(
        Crs::WGS84,
        vec![
            ls(&[(0.0, 0.0), (1.0, 0.0)]),
            ls(&[(1.0, 0.0), (1.0, 1.0)]),
            ls(&[(1.0, 1.0), (0.0, 1.0)]),
            ls(&[(0.0, 1.0), (0.0, 0.0)]),
        ],
    );

    let simplified = graph.simplify();
    assert_eq!(simplified.edge_count(), 1);
    let ring = simplified.edges().next().unwrap();
    assert_eq!(ring.0.len(), 5);
    assert_eq!(ring.0.first(), ring.0.last());
}

#[test]
fn test_simplify_parallel_edges_form_loop() {
    // Two parallel edges leave (0,0) as a degree-2 junction between them.
    let graph = RoadNetworkGraph::from_lines(
        Crs::WGS84,
        vec![
            ls(&[(0.0, 0.0), (5.0, 0.0)]),
            ls(&[(0.0, 0.0), (5.0, 0.0)]),
            ls(&[(5.0, 0.0), (9.0, 0.0)]),
        ],
    );

    let simplified = graph.simplify();
    assert_eq!(simplified.edge_count(), 2);
    let looped = simplified.edges().find(|l| l.0.len() == 3).unwrap();
    assert_eq!(looped.0.first(), Some(&Coord { x: 5.0, y: 0.0 }));
    assert_eq!(looped.0.last(), Some(&Coord { x: 5.0, y: 0.0 }));
}

#[test]
fn test_seed_lines_one_per_edge() {
    let graph = RoadNetworkGraph::from_lines(
        Crs::UTM_10N,
        vec![ls(&[(0.0, 0.0), (10.0, 0.0)]), ls(&[(0.0, 0.0), (10.0, 0.0)])],
    );

    let seeds = edges_to_geometry_collection(&graph);
    assert_eq!(seeds.len(), 2);
    assert_eq!(seeds.crs(), Crs::UTM_10N);
    assert_eq!(seeds.vertex_count(), 4);
    assert_eq!(seeds.to_geometry_collection().0.len(), 2);

    let dense = seeds.densified(2.5);
    assert_eq!(dense.lines()[0].0.len(), 5);
}

#[test]
fn test_snapshot_provider_filters_and_simplifies() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("roads.geojson");
    fs::write(
        &path,
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"LineString","coordinates":[[0,0],[5,0]]},"properties":{}},
            {"type":"Feature","geometry":{"type":"LineString","coordinates":[[5,0],[10,0]]},"properties":{}},
            {"type":"Feature","geometry":{"type":"MultiLineString","coordinates":[[[5,-5],[5,5]]]},"properties":{}},
            {"type":"Feature","geometry":{"type":"LineString","coordinates":[[100,100],[110,100]]},"properties":{}},
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1,1]},"properties":{}}
        ]}"#,
    )
    .unwrap();

    let area = Rect::new(Coord { x: -1.0, y: -1.0 }, Coord { x: 11.0, y: 1.0 }).to_polygon();

    let raw = GeoJsonRoadNetwork::new(&path).with_simplify(false);
    let graph = raw.graph_from_polygon(&area, Crs::WGS84).unwrap();
    assert_eq!(graph.edge_count(), 3);
    assert_eq!(graph.crs(), Crs::WGS84);

    // The cross street is not split at (5,0), so the two halves of the main
    // street meet at a degree-2 junction and merge.
    let simplified = GeoJsonRoadNetwork::new(&path)
        .graph_from_polygon(&area, Crs::WGS84)
        .unwrap();
    assert_eq!(simplified.edge_count(), 2);
}

#[test]
fn test_snapshot_provider_far_away_is_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("roads.geojson");
    fs::write(&path, r#"{"type":"LineString","coordinates":[[100,100],[110,100]]}"#).unwrap();

    let area = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
    let graph = GeoJsonRoadNetwork::new(&path).graph_from_polygon(&area, Crs::WGS84).unwrap();
    assert!(graph.is_empty());
}

#[test]
fn test_snapshot_provider_failure_is_retrieval_error() {
    let area = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
    let err = GeoJsonRoadNetwork::new("/nonexistent/roads.geojson")
        .graph_from_polygon(&area, Crs::WGS84)
        .err()
        .unwrap();
    assert!(matches!(err, TessellateError::Retrieval(_)));
}
