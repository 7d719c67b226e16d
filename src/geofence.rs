use crate::config::GeofenceConfig;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine great-circle distance in meters between two lat/lon pairs.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

impl GeofenceConfig {
    pub fn distance_m(&self, lat: f64, lon: f64) -> f64 {
        haversine_m(lat, lon, self.office_lat, self.office_lon)
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.distance_m(lat, lon) <= self.radius_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office() -> GeofenceConfig {
        GeofenceConfig {
            office_lat: 11.274_570,
            office_lon: 77.607_235,
            radius_m: 100.0,
        }
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_m(11.0, 77.0, 11.0, 77.0), 0.0);
    }

    #[test]
    fn one_degree_along_equator() {
        // 1 degree of longitude at the equator is about 111.19 km
        let d = haversine_m(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_194.9).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn symmetric() {
        let a = haversine_m(11.274_570, 77.607_235, 11.275_000, 77.608_000);
        let b = haversine_m(11.275_000, 77.608_000, 11.274_570, 77.607_235);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn office_itself_is_inside() {
        let gf = office();
        assert!(gf.contains(gf.office_lat, gf.office_lon));
    }

    #[test]
    fn point_near_office_is_inside() {
        // 0.0005 degrees of latitude is about 56 m
        let gf = office();
        assert!(gf.contains(gf.office_lat + 0.0005, gf.office_lon));
    }

    #[test]
    fn point_past_radius_is_outside() {
        // 0.0015 degrees of latitude is about 167 m
        let gf = office();
        assert!(!gf.contains(gf.office_lat + 0.0015, gf.office_lon));
        assert!(gf.distance_m(gf.office_lat + 0.0015, gf.office_lon) > 100.0);
    }
}
