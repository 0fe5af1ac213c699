//! GeoJSON load/save shared by the area loader, the snapshot road provider and
//! tile persistence.

use crate::crs::Crs;
use crate::error::{Result, TessellateError};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, JsonValue};
use geo_types::{Geometry, Polygon};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Geometries read from a vector file together with the CRS the file declares.
pub struct GeometryFile {
    pub geometries: Vec<Geometry<f64>>,
    pub crs: Crs,
}

/// Reads a GeoJSON `FeatureCollection`, `Feature` or bare `Geometry`.
///
/// Features without geometry are skipped. A legacy top-level `crs` member
/// names the source CRS; without one the file is taken to be WGS 84.
pub fn read_geometries(path: &Path) -> Result<GeometryFile> {
    if !path.exists() {
        return Err(TessellateError::NotFound { path: path.to_path_buf() });
    }

    let bytes = fs::read(path)?;
    let geojson: GeoJson = serde_json::from_slice(&bytes).map_err(|e| {
        TessellateError::InvalidGeometry(format!("{}: not a GeoJSON document: {e}", path.display()))
    })?;

    let mut geometries = Vec::new();
    let foreign_members = match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in fc.features {
                push_feature(feature, &mut geometries)?;
            }
            fc.foreign_members
        }
        GeoJson::Feature(feature) => {
            let members = feature.foreign_members.clone();
            push_feature(feature, &mut geometries)?;
            members
        }
        GeoJson::Geometry(geometry) => {
            let members = geometry.foreign_members.clone();
            geometries.push(to_geo(geometry)?);
            members
        }
    };

    let crs = match foreign_members.as_ref().and_then(|m| m.get("crs")) {
        Some(member) => declared_crs(member)?,
        None => Crs::WGS84,
    };

    Ok(GeometryFile { geometries, crs })
}

fn push_feature(feature: Feature, out: &mut Vec<Geometry<f64>>) -> Result<()> {
    if let Some(geometry) = feature.geometry {
        out.push(to_geo(geometry)?);
    }
    Ok(())
}

fn to_geo(geometry: geojson::Geometry) -> Result<Geometry<f64>> {
    geometry
        .try_into()
        .map_err(|e: geojson::Error| TessellateError::InvalidGeometry(e.to_string()))
}

fn declared_crs(member: &JsonValue) -> Result<Crs> {
    let name = member
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(JsonValue::as_str)
        .or_else(|| member.as_str())
        .ok_or_else(|| TessellateError::InvalidGeometry(format!("unsupported crs member {member}")))?;
    Crs::from_str(name)
}

fn crs_member(crs: Crs) -> JsonValue {
    serde_json::json!({
        "type": "name",
        "properties": { "name": crs.urn() }
    })
}

/// A polygon to write along with its feature properties.
pub struct PolygonFeature<'a> {
    pub polygon: &'a Polygon<f64>,
    pub properties: JsonObject,
}

/// Writes polygons as a FeatureCollection declaring `crs`, replacing any file
/// already at `path`.
pub fn write_polygons<'a, I>(path: &Path, crs: Crs, polygons: I) -> Result<()>
where
    I: IntoIterator<Item = PolygonFeature<'a>>,
{
    let features: Vec<Feature> = polygons
        .into_iter()
        .map(|item| Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(item.polygon))),
            id: None,
            properties: Some(item.properties),
            foreign_members: None,
        })
        .collect();

    let mut members = JsonObject::new();
    members.insert("crs".to_string(), crs_member(crs));

    let fc = FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(members),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &GeoJson::FeatureCollection(fc))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "io_tests.rs"]
mod tests;
