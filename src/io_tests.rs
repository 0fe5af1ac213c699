use super::*;
use geo_types::polygon;
use tempfile::tempdir;

#[test]
fn test_reads_feature_collection_without_crs_as_wgs84() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lines.geojson");
    fs::write(
        &path,
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"LineString","coordinates":[[-122.42,37.78],[-122.43,37.79]]},"properties":{}},
            {"type":"Feature","geometry":null,"properties":{}}
        ]}"#,
    )
    .unwrap();

    let file = read_geometries(&path).unwrap();
    assert_eq!(file.crs, Crs::WGS84);
    assert_eq!(file.geometries.len(), 1);
    assert!(matches!(file.geometries[0], Geometry::LineString(_)));
}

#[test]
fn test_reads_declared_crs_and_bare_geometry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("point.geojson");
    fs::write(
        &path,
        r#"{"type":"Point","coordinates":[550000.0,4180000.0],
            "crs":{"type":"name","properties":{"name":"urn:ogc:def:crs:EPSG::26910"}}}"#,
    )
    .unwrap();

    let file = read_geometries(&path).unwrap();
    assert_eq!(file.crs, Crs::UTM_10N);
    assert_eq!(file.geometries.len(), 1);
}

#[test]
fn test_missing_file_is_not_found() {
    let err = read_geometries(Path::new("/nonexistent/path.geojson")).err().unwrap();
    assert!(err.is_not_found());
}

#[test]
fn test_garbage_is_invalid_geometry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.geojson");
    fs::write(&path, "invalid content").unwrap();

    let err = read_geometries(&path).err().unwrap();
    assert!(err.is_invalid_geometry(), "unexpected error {err:?}");
}

#[test]
fn test_non_utf8_bytes_are_invalid_geometry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("area.shp");
    // Shapefile magic followed by Latin-1 text.
    fs::write(&path, [0x00, 0x00, 0x27, 0x0a, 0xff, 0xfe, b'S', b'a', b'n', b' ', b'J', b'o', b's', 0xe9]).unwrap();

    let err = read_geometries(&path).err().unwrap();
    assert!(err.is_invalid_geometry(), "unexpected error {err:?}");
}

#[test]
fn test_write_declares_crs_and_overwrites() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("tiles.geojson");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "stale").unwrap();

    let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
    let mut properties = JsonObject::new();
    properties.insert("tile".to_string(), 0.into());
    write_polygons(&path, Crs::UTM_10N, [PolygonFeature { polygon: &square, properties }]).unwrap();

    let written = read_geometries(&path).unwrap();
    assert_eq!(written.crs, Crs::UTM_10N);
    assert_eq!(written.geometries.len(), 1);
    assert!(matches!(written.geometries[0], Geometry::Polygon(_)));
}
