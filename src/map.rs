use crate::color::{zone_color, PinColor};
use crate::config::{AppConfig, StreetViewConfig};
use crate::diagnostics::Diagnostics;
use crate::format::{coordinate, escape_html, thousands, truncate};
use crate::types::{House, HouseTable, Zone, ZoneTable};
use geo::MultiPolygon;
use geojson::{Feature, JsonObject};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

pub const OUTLINE_COLOR: &str = "black";
pub const OUTLINE_WEIGHT: u32 = 1;
pub const FILL_OPACITY: f64 = 0.6;
pub const MARKER_ICON: &str = "home";

const UNKNOWN_ID: &str = "ID inconnu";
const UNKNOWN_AREA: &str = "Surface inconnue";
const UNKNOWN_PRICE: &str = "Prix inconnu";
const UNKNOWN_ROOMS: &str = "Nombre de pièces inconnu";
const UNKNOWN_BATHROOMS: &str = "Nombre de salles de bain inconnu";
const UNKNOWN_BEDROOMS: &str = "Nombre de chambres";
const UNKNOWN_LAND_VALUE: &str = "Valeur du terrain inconnue";
const UNKNOWN_USE_TYPE: &str = "Type d'usage inconnu";
const UNKNOWN_PRICE_M2: &str = "Prix/m²";
const UNKNOWN_NEIGHBORHOOD: &str = "Quartier inconnu";

/// Why a single zone or house was left off the map.
#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("crime_gravity is missing or not a finite number")]
    MissingScore,
    #[error("{field} value {value:?} is not a number")]
    InvalidNumber { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    /// [lat, lon]
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: TileLayer,
    pub control_scale: bool,
    pub zones: Vec<ZoneLayer>,
    pub markers: Vec<HouseMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub url: String,
    pub attribution: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStyle {
    pub fill_color: &'static str,
    pub color: &'static str,
    pub weight: u32,
    pub fill_opacity: f64,
}

impl ZoneStyle {
    pub fn for_score(score: f64) -> Self {
        ZoneStyle {
            fill_color: zone_color(score),
            color: OUTLINE_COLOR,
            weight: OUTLINE_WEIGHT,
            fill_opacity: FILL_OPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneLayer {
    pub feature: Feature,
    pub style: ZoneStyle,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseMarker {
    /// [lat, lon]
    pub location: [f64; 2],
    pub color: PinColor,
    pub icon: &'static str,
    pub opacity: f64,
    pub image_url: String,
    pub use_type: String,
    pub tooltip: String,
}

/// Compose the map for the given budget. Rows that cannot be turned into a
/// layer or marker are reported and skipped; the rest of the map is built.
pub fn build_map(
    zones: &ZoneTable,
    houses: Option<&HouseTable>,
    budget: u64,
    config: &AppConfig,
    diagnostics: &Diagnostics,
) -> MapView {
    let mut zone_layers = Vec::with_capacity(zones.len());
    for zone in &zones.zones {
        let Some(geometry) = &zone.geometry else {
            tracing::debug!("zone '{}' has no geometry, not drawn", zone.neighborhood);
            continue;
        };
        match zone_layer(zone, geometry) {
            Ok(layer) => zone_layers.push(layer),
            Err(e) => diagnostics.warn_with(format!("Skipping zone '{}'", zone.neighborhood), &e),
        }
    }

    let mut markers = Vec::new();
    if let Some(houses) = houses {
        markers.reserve(houses.len());
        for house in &houses.houses {
            match house_marker(house, budget, &config.street_view) {
                Ok(marker) => markers.push(marker),
                Err(e) => diagnostics.warn_with(
                    format!(
                        "Skipping house {} at {},{}",
                        house.house_id.as_deref().unwrap_or("?"),
                        house.lat,
                        house.lon
                    ),
                    &e,
                ),
            }
        }
    }

    diagnostics.info(format!(
        "Built map with {} zone layers and {} house markers (budget {})",
        zone_layers.len(),
        markers.len(),
        budget
    ));

    MapView {
        center: config.map.center,
        zoom: config.map.zoom,
        tiles: TileLayer {
            url: config.map.tiles_url.clone(),
            attribution: config.map.attribution.clone(),
        },
        control_scale: config.map.control_scale,
        zones: zone_layers,
        markers,
    }
}

pub fn zone_layer(zone: &Zone, geometry: &MultiPolygon<f64>) -> Result<ZoneLayer, RowError> {
    let score = zone
        .crime_gravity
        .filter(|s| s.is_finite())
        .ok_or(RowError::MissingScore)?;

    let mut properties = JsonObject::new();
    properties.insert("neighborhood".to_string(), json!(zone.neighborhood));
    properties.insert("crime_gravity".to_string(), json!(score));

    let feature = Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    };

    Ok(ZoneLayer {
        feature,
        style: ZoneStyle::for_score(score),
        tooltip: zone_tooltip(&zone.neighborhood, score),
    })
}

pub fn zone_tooltip(neighborhood: &str, score: f64) -> String {
    format!(
        "<h1><b>{}</b></h1><h4>{} (Crime Score)</h4>",
        escape_html(neighborhood),
        truncate(score)
    )
}

pub fn house_marker(
    house: &House,
    budget: u64,
    street_view: &StreetViewConfig,
) -> Result<HouseMarker, RowError> {
    let total_value = number("total_value", &house.total_value)?;
    let land_value = number("land_value", &house.land_value)?;
    let area = number("superficie_metres", &house.superficie_metres)?;
    let price_m2 = number("square_metres_price", &house.square_metres_price)?;

    let image_url = street_view_url(street_view, house.lat, house.lon);
    let text = |v: &Option<String>, fallback: &str| escape_html(v.as_deref().unwrap_or(fallback));

    let tooltip = format!(
        "<h4>Maison à {neighborhood} ID#{id}</h4><br><img src='{url}' width='500'><br>\
         <h1><b>Prix : {price} $ (Terrain: {land} $)</b></h1>\
         <h4>{area} m² <br>{rooms} pièces ({bedrooms} chambres, {bathrooms} salles de bains) <br>{price_m2} $/m²</h4>",
        neighborhood = text(&house.neighborhood, UNKNOWN_NEIGHBORHOOD),
        id = text(&house.house_id, UNKNOWN_ID),
        url = escape_html(&image_url),
        price = total_value.map(thousands).unwrap_or_else(|| UNKNOWN_PRICE.to_string()),
        land = land_value.map(thousands).unwrap_or_else(|| UNKNOWN_LAND_VALUE.to_string()),
        area = area
            .map(|a| truncate(a).to_string())
            .unwrap_or_else(|| UNKNOWN_AREA.to_string()),
        rooms = text(&house.nb_rooms, UNKNOWN_ROOMS),
        bedrooms = text(&house.nb_bedrooms, UNKNOWN_BEDROOMS),
        bathrooms = text(&house.nb_bathrooms, UNKNOWN_BATHROOMS),
        price_m2 = price_m2
            .map(|p| thousands(truncate(p) as f64))
            .unwrap_or_else(|| UNKNOWN_PRICE_M2.to_string()),
    );

    Ok(HouseMarker {
        location: [house.lat, house.lon],
        color: PinColor::for_price(total_value, budget),
        icon: MARKER_ICON,
        opacity: 1.0,
        image_url,
        use_type: house
            .p_use_type
            .clone()
            .unwrap_or_else(|| UNKNOWN_USE_TYPE.to_string()),
        tooltip,
    })
}

/// Street-view image URL for a location. Only built, never fetched.
pub fn street_view_url(street_view: &StreetViewConfig, lat: f64, lon: f64) -> String {
    format!(
        "{}?size={}&location={},{}&key={}",
        street_view.endpoint,
        street_view.size,
        coordinate(lat),
        coordinate(lon),
        street_view.api_key
    )
}

// "nan" counts as missing, anything else unparsable is a row error.
fn number(field: &'static str, raw: &Option<String>) -> Result<Option<f64>, RowError> {
    match raw {
        None => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(|v| if v.is_nan() { None } else { Some(v) })
            .map_err(|_| RowError::InvalidNumber {
                field,
                value: value.clone(),
            }),
    }
}
