use geo::MultiPolygon;

/// One row of the zones file.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub neighborhood: String,
    // None when the cell is empty or not a number
    pub crime_gravity: Option<f64>,
    pub geometry_text: String,
    // None when the WKT could not be parsed into an areal shape
    pub geometry: Option<MultiPolygon<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneTable {
    pub zones: Vec<Zone>,
}

impl ZoneTable {
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Zones that will be drawn as layers.
    pub fn renderable(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.geometry.is_some())
    }
}

/// One house listing. Coordinates are always present; every other field is
/// kept as the raw cell text and interpreted when the marker is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct House {
    pub lat: f64,
    pub lon: f64,
    pub house_id: Option<String>,
    pub total_value: Option<String>,
    pub land_value: Option<String>,
    pub superficie_metres: Option<String>,
    pub nb_rooms: Option<String>,
    pub nb_bedrooms: Option<String>,
    pub nb_bathrooms: Option<String>,
    pub p_use_type: Option<String>,
    pub square_metres_price: Option<String>,
    pub neighborhood: Option<String>,
}

impl House {
    pub fn at(lat: f64, lon: f64) -> Self {
        House {
            lat,
            lon,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HouseTable {
    pub houses: Vec<House>,
}

impl HouseTable {
    pub fn len(&self) -> usize {
        self.houses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.houses.is_empty()
    }
}
