//! WGS84 <-> UTM conversion backed by `proj4rs`
//!
//! Geographic coordinates cross the `proj4rs` boundary in radians; projected
//! coordinates are metres.

use crate::types::{Crs, GeoPoint, ImageryError, ImageryResult, ProjectedPoint, UtmZone};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

const WGS84_LONLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Proj string of a WGS84 UTM zone
fn utm_definition(zone: UtmZone) -> String {
    let mut definition = format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs", zone.zone);
    if !zone.north {
        definition.push_str(" +south");
    }
    definition
}

/// Source and target projections for one zone
struct ZoneTransform {
    lonlat: Proj,
    utm: Proj,
}

impl ZoneTransform {
    fn new(zone: UtmZone) -> ImageryResult<Self> {
        if !(1..=60).contains(&zone.zone) {
            return Err(ImageryError::Projection(format!(
                "UTM zone {} outside 1..=60",
                zone.zone
            )));
        }
        let lonlat = Proj::from_proj_string(WGS84_LONLAT)
            .map_err(|e| ImageryError::Projection(format!("WGS84 definition: {:?}", e)))?;
        let utm = Proj::from_proj_string(&utm_definition(zone)).map_err(|e| {
            ImageryError::Projection(format!("EPSG:{} definition: {:?}", zone.epsg_code(), e))
        })?;
        Ok(Self { lonlat, utm })
    }
}

/// Project a WGS84 point into `zone`
pub fn wgs84_to_utm(point: GeoPoint, zone: UtmZone) -> ImageryResult<ProjectedPoint> {
    if !point.longitude.is_finite()
        || !point.latitude.is_finite()
        || point.latitude.abs() >= 90.0
    {
        return Err(ImageryError::Projection(format!(
            "cannot project ({}, {}) to UTM",
            point.longitude, point.latitude
        )));
    }

    let zone_transform = ZoneTransform::new(zone)?;
    let mut coords = (point.longitude.to_radians(), point.latitude.to_radians(), 0.0);
    transform(&zone_transform.lonlat, &zone_transform.utm, &mut coords).map_err(|e| {
        ImageryError::Projection(format!(
            "projection of ({}, {}) to EPSG:{} failed: {:?}",
            point.longitude,
            point.latitude,
            zone.epsg_code(),
            e
        ))
    })?;

    let (easting, northing) = (coords.0, coords.1);
    if !easting.is_finite() || !northing.is_finite() {
        return Err(ImageryError::Projection(format!(
            "projection of ({}, {}) to EPSG:{} is not finite",
            point.longitude,
            point.latitude,
            zone.epsg_code()
        )));
    }

    Ok(ProjectedPoint { easting, northing })
}

/// Unproject a point of `zone` back to WGS84
pub fn utm_to_wgs84(point: ProjectedPoint, zone: UtmZone) -> ImageryResult<GeoPoint> {
    if !point.easting.is_finite() || !point.northing.is_finite() {
        return Err(ImageryError::Projection(format!(
            "cannot unproject ({}, {}) from UTM",
            point.easting, point.northing
        )));
    }

    let zone_transform = ZoneTransform::new(zone)?;
    let mut coords = (point.easting, point.northing, 0.0);
    transform(&zone_transform.utm, &zone_transform.lonlat, &mut coords).map_err(|e| {
        ImageryError::Projection(format!(
            "unprojection of ({}, {}) from EPSG:{} failed: {:?}",
            point.easting,
            point.northing,
            zone.epsg_code(),
            e
        ))
    })?;

    let longitude = coords.0.to_degrees();
    let latitude = coords.1.to_degrees();
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(ImageryError::Projection(format!(
            "unprojection of ({}, {}) from EPSG:{} is not finite",
            point.easting,
            point.northing,
            zone.epsg_code()
        )));
    }

    Ok(GeoPoint::new(longitude, latitude))
}

/// WGS84 -> native coordinates of `crs`
pub fn to_native(point: GeoPoint, crs: Crs) -> ImageryResult<ProjectedPoint> {
    match crs {
        Crs::Wgs84 => Ok(ProjectedPoint {
            easting: point.longitude,
            northing: point.latitude,
        }),
        Crs::Utm(zone) => wgs84_to_utm(point, zone),
    }
}

/// Native coordinates of `crs` -> WGS84
pub fn from_native(point: ProjectedPoint, crs: Crs) -> ImageryResult<GeoPoint> {
    match crs {
        Crs::Wgs84 => Ok(GeoPoint::new(point.easting, point.northing)),
        Crs::Utm(zone) => utm_to_wgs84(point, zone),
    }
}
