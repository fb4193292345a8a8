//! Geospatial primitives: point validation, spherical distance, and the
//! bounding-box prefilter used by radius queries.
//!
//! Distances use the haversine formula on a spherical Earth. Planar
//! distance would bias results at the platform's 5 km matching scale and
//! break down entirely over longer radii.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 point. Longitude first to match the storage column order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// Latitude/longitude window around a center point.
///
/// Used as an index-assisted SQL prefilter; the exact haversine predicate
/// refines it. The window does not wrap the antimeridian and clamps at the
/// poles, so radius queries near ±180° longitude or the poles are
/// unsupported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl GeoPoint {
    /// Construct a validated point.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, CoreError> {
        let point = Self {
            longitude,
            latitude,
        };
        point.validate()?;
        Ok(point)
    }

    /// Check that both coordinates are finite and in range
    /// (longitude −180..180, latitude −90..90).
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CoreError::InvalidLocation(format!(
                "longitude {} out of range [-180, 180]",
                self.longitude
            )));
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CoreError::InvalidLocation(format!(
                "latitude {} out of range [-90, 90]",
                self.latitude
            )));
        }
        Ok(())
    }

    /// Great-circle distance to another point in meters (haversine).
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (dlon / 2.0).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }

    /// Lat/lon window guaranteed to contain every point within
    /// `radius_meters` of `self` (away from the antimeridian and poles).
    ///
    /// Longitude spread widens with latitude; at ±90° the cosine hits zero,
    /// so the longitude window is clamped to the full range there.
    pub fn bounding_box(&self, radius_meters: f64) -> BoundingBox {
        let lat_delta = (radius_meters / EARTH_RADIUS_M).to_degrees();

        let cos_lat = self.latitude.to_radians().cos();
        let lon_delta = if cos_lat.abs() < 1e-9 {
            180.0
        } else {
            (radius_meters / (EARTH_RADIUS_M * cos_lat)).to_degrees()
        };

        BoundingBox {
            min_latitude: (self.latitude - lat_delta).max(-90.0),
            max_latitude: (self.latitude + lat_delta).min(90.0),
            min_longitude: (self.longitude - lon_delta).max(-180.0),
            max_longitude: (self.longitude + lon_delta).min(180.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn validates_coordinate_ranges() {
        assert!(GeoPoint::new(77.59, 12.97).is_ok());
        assert!(GeoPoint::new(-180.0, -90.0).is_ok());
        assert!(GeoPoint::new(180.0, 90.0).is_ok());

        assert_matches!(
            GeoPoint::new(181.0, 0.0),
            Err(CoreError::InvalidLocation(_))
        );
        assert_matches!(
            GeoPoint::new(0.0, -90.5),
            Err(CoreError::InvalidLocation(_))
        );
        assert_matches!(
            GeoPoint::new(f64::NAN, 0.0),
            Err(CoreError::InvalidLocation(_))
        );
    }

    #[test]
    fn known_distance_minneapolis_to_st_paul() {
        // Minneapolis to St. Paul, roughly 16 km.
        let minneapolis = GeoPoint::new(-93.27, 44.98).unwrap();
        let st_paul = GeoPoint::new(-93.09, 44.95).unwrap();

        let distance = minneapolis.distance_meters(&st_paul);
        assert!(
            distance > 15_000.0 && distance < 17_000.0,
            "got {distance} m"
        );
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = GeoPoint::new(77.59, 12.97).unwrap();
        assert!(p.distance_meters(&p) < 0.1);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(77.59, 12.97).unwrap();
        let b = GeoPoint::new(77.62, 12.99).unwrap();
        let d1 = a.distance_meters(&b);
        let d2 = b.distance_meters(&a);
        assert!((d1 - d2).abs() < 1e-6);
    }

    #[test]
    fn bounding_box_contains_radius_circle() {
        let center = GeoPoint::new(77.59, 12.97).unwrap();
        let radius = 5_000.0;
        let bbox = center.bounding_box(radius);

        // Probe points on the circle in the four cardinal directions must
        // fall inside the window.
        let north = GeoPoint::new(77.59, 12.97 + 5_000.0 / 111_000.0).unwrap();
        let east_delta = 5_000.0 / (111_000.0 * (12.97f64).to_radians().cos());
        let east = GeoPoint::new(77.59 + east_delta, 12.97).unwrap();

        assert!(north.latitude <= bbox.max_latitude + 1e-6);
        assert!(east.longitude <= bbox.max_longitude + 1e-6);
        assert!(bbox.min_latitude < center.latitude);
        assert!(bbox.min_longitude < center.longitude);
    }

    #[test]
    fn bounding_box_clamps_at_extremes() {
        let near_pole = GeoPoint::new(0.0, 89.99).unwrap();
        let bbox = near_pole.bounding_box(50_000.0);
        assert!(bbox.max_latitude <= 90.0);
        assert!(bbox.min_longitude >= -180.0);
        assert!(bbox.max_longitude <= 180.0);
    }

    #[test]
    fn points_inside_radius_pass_exact_check() {
        // 2 km away: matched at a 5 km radius. 10 km away: not matched.
        let center = GeoPoint::new(77.59, 12.97).unwrap();
        let near = GeoPoint::new(77.59, 12.97 + 2_000.0 / 111_000.0).unwrap();
        let far = GeoPoint::new(77.59, 12.97 + 10_000.0 / 111_000.0).unwrap();

        assert!(center.distance_meters(&near) <= 5_000.0);
        assert!(center.distance_meters(&far) > 5_000.0);
    }
}
