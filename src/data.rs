use crate::diagnostics::Diagnostics;
use crate::types::{House, HouseTable, Zone, ZoneTable};
use csv::{ReaderBuilder, StringRecord, Trim};
use geo::{Geometry, MultiPolygon};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wkt::TryFromWkt;

pub const ZONE_COLUMNS: [&str; 3] = ["neighborhood", "crime_gravity", "geometry"];
pub const HOUSE_COLUMNS: [&str; 2] = ["lat", "lon"];

const PREVIEW_ROWS: usize = 10;

/// Whole-file load failure.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path:?} at line {line}: {source}")]
    Record {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },
    #[error("missing required column(s) {columns:?} in {path:?}")]
    MissingColumns { path: PathBuf, columns: Vec<String> },
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("invalid WKT: {0}")]
    Wkt(String),
    #[error("expected POLYGON or MULTIPOLYGON, found {0}")]
    NotAreal(&'static str),
}

/// Read the zones file. Rows whose geometry does not parse are kept with no
/// shape so the table always has one entry per data row.
pub fn load_zones(
    path: &Path,
    delimiter: u8,
    diagnostics: &Diagnostics,
) -> Result<ZoneTable, LoadError> {
    let (mut rdr, col_indices) = open_table(path, delimiter)?;
    let [neighborhood_idx, gravity_idx, geometry_idx] = require_columns(path, &col_indices, ZONE_COLUMNS)?;

    let mut zones = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| record_error(path, e))?;

        let neighborhood = cell(&record, neighborhood_idx).unwrap_or("").to_string();
        let crime_gravity = cell(&record, gravity_idx).and_then(|v| v.parse::<f64>().ok());
        let geometry_text = cell(&record, geometry_idx).unwrap_or("").to_string();

        // An empty cell is simply "no geometry"; only malformed text is reported.
        let geometry = if geometry_text.is_empty() {
            None
        } else {
            match parse_polygon(&geometry_text) {
                Ok(g) => Some(g),
                Err(e) => {
                    diagnostics.warn_with(
                        format!("Zone '{}' has unusable geometry and will not be drawn", neighborhood),
                        &e,
                    );
                    None
                }
            }
        };

        zones.push(Zone {
            neighborhood,
            crime_gravity,
            geometry_text,
            geometry,
        });
    }

    let table = ZoneTable { zones };
    diagnostics.info(format!(
        "Loaded {} zones from {:?} ({} with geometry)",
        table.len(),
        path,
        table.renderable().count()
    ));

    Ok(table)
}

/// Read the houses file, dropping rows without both coordinates.
pub fn load_houses(
    path: &Path,
    delimiter: u8,
    diagnostics: &Diagnostics,
) -> Result<HouseTable, LoadError> {
    let (mut rdr, col_indices) = open_table(path, delimiter)?;
    let [lat_idx, lon_idx] = require_columns(path, &col_indices, HOUSE_COLUMNS)?;

    let optional = |name: &str| col_indices.get(name).copied();
    let id_idx = optional("house_id");
    let total_idx = optional("total_value");
    let land_idx = optional("land_value");
    let area_idx = optional("superficie_metres");
    let rooms_idx = optional("nb_rooms");
    let bedrooms_idx = optional("nb_bedrooms");
    let bathrooms_idx = optional("nb_bathrooms");
    let use_idx = optional("p_use_type");
    let price_m2_idx = optional("square_metres_price");
    let neighborhood_idx = optional("neighborhood");

    let mut houses = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        let record = result.map_err(|e| record_error(path, e))?;

        let (lat, lon) = match (
            coordinate(&record, lat_idx),
            coordinate(&record, lon_idx),
        ) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                dropped += 1;
                continue;
            }
        };

        let text = |idx: Option<usize>| idx.and_then(|i| cell(&record, i)).map(str::to_string);

        houses.push(House {
            lat,
            lon,
            house_id: text(id_idx),
            total_value: text(total_idx),
            land_value: text(land_idx),
            superficie_metres: text(area_idx),
            nb_rooms: text(rooms_idx),
            nb_bedrooms: text(bedrooms_idx),
            nb_bathrooms: text(bathrooms_idx),
            p_use_type: text(use_idx),
            square_metres_price: text(price_m2_idx),
            neighborhood: text(neighborhood_idx),
        });
    }

    let table = HouseTable { houses };
    diagnostics.info(format!(
        "Loaded {} houses from {:?} ({} dropped for missing coordinates)",
        table.len(),
        path,
        dropped
    ));

    Ok(table)
}

/// Parse WKT into a multipolygon. A single POLYGON becomes a one-member
/// multipolygon.
pub fn parse_polygon(text: &str) -> Result<MultiPolygon<f64>, GeometryError> {
    let geometry = Geometry::<f64>::try_from_wkt_str(text)
        .map_err(|e| GeometryError::Wkt(e.to_string()))?;

    match geometry {
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        Geometry::Rect(r) => Ok(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Ok(MultiPolygon::new(vec![t.to_polygon()])),
        Geometry::Point(_) => Err(GeometryError::NotAreal("POINT")),
        Geometry::Line(_) | Geometry::LineString(_) => Err(GeometryError::NotAreal("LINESTRING")),
        Geometry::MultiPoint(_) => Err(GeometryError::NotAreal("MULTIPOINT")),
        Geometry::MultiLineString(_) => Err(GeometryError::NotAreal("MULTILINESTRING")),
        Geometry::GeometryCollection(_) => Err(GeometryError::NotAreal("GEOMETRYCOLLECTION")),
    }
}

fn open_table(
    path: &Path,
    delimiter: u8,
) -> Result<(csv::Reader<File>, HashMap<String, usize>), LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    // Short rows are padded with nulls instead of failing the file.
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);
    let headers = rdr.headers().map_err(|e| record_error(path, e))?.clone();

    // Map column names to indices for faster lookup
    let col_indices: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_string(), i))
        .collect();

    Ok((rdr, col_indices))
}

fn require_columns<const N: usize>(
    path: &Path,
    col_indices: &HashMap<String, usize>,
    names: [&str; N],
) -> Result<[usize; N], LoadError> {
    let missing: Vec<String> = names
        .iter()
        .filter(|n| !col_indices.contains_key(**n))
        .map(|n| n.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }
    Ok(names.map(|n| col_indices[n]))
}

fn record_error(path: &Path, source: csv::Error) -> LoadError {
    let line = source.position().map(|p| p.line()).unwrap_or(0);
    LoadError::Record {
        path: path.to_path_buf(),
        line,
        source,
    }
}

fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).filter(|v| !v.is_empty())
}

// Empty, unparsable and non-finite values all count as null.
fn coordinate(record: &StringRecord, idx: usize) -> Option<f64> {
    cell(record, idx)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

pub fn preview_zones(table: &ZoneTable) -> String {
    table
        .zones
        .iter()
        .take(PREVIEW_ROWS)
        .map(|z| match z.crime_gravity {
            Some(score) => format!("{} ({})", z.neighborhood, score),
            None => format!("{} (?)", z.neighborhood),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn preview_houses(table: &HouseTable) -> String {
    table
        .houses
        .iter()
        .take(PREVIEW_ROWS)
        .map(|h| {
            format!(
                "#{} @ {},{}",
                h.house_id.as_deref().unwrap_or("?"),
                h.lat,
                h.lon
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
