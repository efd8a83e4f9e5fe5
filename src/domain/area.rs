use geo::Rect;

/// WGS84 bounding box in Overpass order (south, west, north, east)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Bounding box around a center point
    ///
    /// # Arguments
    /// * `center` - (lat, lon) center point
    /// * `radius_m` - Radius in meters
    pub fn around(center: (f64, f64), radius_m: u32) -> Self {
        let (lat, lon) = center;
        let radius_km = radius_m as f64 / 1000.0;

        // 1 degree latitude ≈ 111 km
        // 1 degree longitude ≈ 111 km * cos(lat)
        let lat_delta = radius_km / 111.0;
        let lon_delta = radius_km / (111.0 * lat.to_radians().cos());

        Self::new(lat - lat_delta, lon - lon_delta, lat + lat_delta, lon + lon_delta)
    }

    /// Split into four equal quadrants: SW, SE, NW, NE
    pub fn quadrants(&self) -> [BBox; 4] {
        let mid_lat = (self.south + self.north) / 2.0;
        let mid_lon = (self.west + self.east) / 2.0;
        [
            BBox::new(self.south, self.west, mid_lat, mid_lon),
            BBox::new(self.south, mid_lon, mid_lat, self.east),
            BBox::new(mid_lat, self.west, self.north, mid_lon),
            BBox::new(mid_lat, mid_lon, self.north, self.east),
        ]
    }

    /// Overpass QL bbox clause body: `south,west,north,east`
    pub fn to_overpass(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

impl From<Rect<f64>> for BBox {
    fn from(rect: Rect<f64>) -> Self {
        let min = rect.min();
        let max = rect.max();
        BBox::new(min.y, min.x, max.y, max.x)
    }
}

/// A named region to download features for
#[derive(Debug, Clone)]
pub struct AreaOfInterest {
    pub name: String,
    pub bbox: BBox,
}

impl AreaOfInterest {
    pub fn new(name: impl Into<String>, bbox: BBox) -> Self {
        Self {
            name: name.into(),
            bbox,
        }
    }

    /// Render an output file name, replacing `{name}` with the area name
    pub fn file_name(&self, template: &str) -> String {
        template.replace("{name}", &self.name)
    }
}
