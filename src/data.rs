use crate::config::AppConfig;
use crate::types::Region;
use anyhow::{anyhow, Context, Result};
use geo::{BoundingRect, MultiPolygon};
use geojson::GeoJson;
use shapefile::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn load_boundaries(config: &AppConfig) -> Result<Vec<Region>> {
    let path = &config.input.boundaries;
    tracing::info!("Loading boundaries from {:?}", path);

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Boundary file has no extension"))?;

    let regions = match extension.as_str() {
        "shp" => load_shapefile(path, &config.input.name_property)?,
        "json" | "geojson" => load_geojson(path, &config.input.name_property)?,
        _ => return Err(anyhow!("Unsupported geometry format: {}", extension)),
    };

    tracing::info!("Loaded {} regions", regions.len());
    Ok(regions)
}

/// Wraps a geometry into a `Region`, skipping it when it has no extent.
pub fn make_region(name: String, geometry: MultiPolygon<f64>) -> Option<Region> {
    match geometry.bounding_rect() {
        Some(bounds) => Some(Region {
            name,
            geometry,
            bounds,
        }),
        None => {
            tracing::warn!("Skipping region {:?}: empty geometry", name);
            None
        }
    }
}

fn load_shapefile(path: &Path, name_property: &str) -> Result<Vec<Region>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut regions = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let name_value = record
            .get(name_property)
            .ok_or_else(|| anyhow!("Name column '{}' not found in Shapefile", name_property))?;

        let name = match name_value {
            shapefile::dbase::FieldValue::Character(Some(s)) => s.trim().to_string(),
            shapefile::dbase::FieldValue::Character(None) => continue,
            _ => return Err(anyhow!("Shapefile name column must be a string")),
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue, // points and lines carry no area
        };

        regions.extend(make_region(name, geometry));
    }

    Ok(regions)
}

fn load_geojson(path: &Path, name_property: &str) -> Result<Vec<Region>> {
    let file = File::open(path).with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file)).context("Failed to parse GeoJSON")?;
    regions_from_geojson(geojson, name_property)
}

pub fn regions_from_geojson(geojson: GeoJson, name_property: &str) -> Result<Vec<Region>> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut regions = Vec::new();

    for feature in collection.features {
        let name = match feature
            .properties
            .as_ref()
            .and_then(|props| props.get(name_property))
        {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => continue,
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let geom: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        regions.extend(make_region(name, geometry));
    }

    Ok(regions)
}
