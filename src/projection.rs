//! Coordinate reference systems by EPSG code, backed by `proj4rs`.
//!
//! proj4rs works in radians for geographic systems, so degrees are converted
//! on the way in and out.
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::Proj;
use std::fmt;

pub const WGS84: u16 = 4326;

/// UTM 42N, the metric grid of the original study region.
pub const DEFAULT_AREA_EPSG: u16 = 32642;

/// `32601..=32660` north, `32701..=32760` south.
pub fn utm_epsg(zone: u8, south: bool) -> Option<u16> {
    if !(1..=60).contains(&zone) {
        return None;
    }
    let base = if south { 32700 } else { 32600 };
    Some(base + zone as u16)
}

pub struct Crs {
    epsg: u16,
    proj: Proj,
}

impl fmt::Debug for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl Crs {
    /// `None` when proj4rs has no definition for the code.
    pub fn from_epsg(epsg: u16) -> Option<Self> {
        Proj::from_epsg_code(epsg).ok().map(|proj| Crs { epsg, proj })
    }

    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    pub fn is_geographic(&self) -> bool {
        self.proj.is_latlong()
    }

    pub fn transform(&self, to: &Crs, c: Coord<f64>) -> Result<Coord<f64>, String> {
        let mut point = if self.is_geographic() {
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };
        proj4rs::transform::transform(&self.proj, &to.proj, &mut point)
            .map_err(|e| format!("{:?}", e))?;
        if to.is_geographic() {
            Ok(Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            })
        } else {
            Ok(Coord {
                x: point.0,
                y: point.1,
            })
        }
    }

    pub fn reproject(&self, to: &Crs, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, String> {
        geometry.try_map_coords(|c| self.transform(to, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crs(code: u16) -> Crs {
        Crs::from_epsg(code).unwrap()
    }

    #[test]
    fn central_meridian_on_equator_hits_false_origin() {
        let p = crs(WGS84)
            .transform(&crs(DEFAULT_AREA_EPSG), Coord { x: 69.0, y: 0.0 })
            .unwrap();
        assert!((p.x - 500_000.0).abs() < 1e-3, "{:?}", p);
        assert!(p.y.abs() < 1e-3, "{:?}", p);
    }

    #[test]
    fn web_mercator_matches_spherical_formula() {
        let p = crs(WGS84).transform(&crs(3857), Coord { x: 10.0, y: 0.0 }).unwrap();
        let expected = 6_378_137.0 * 10f64.to_radians();
        assert!((p.x - expected).abs() < 1e-3, "{:?}", p);
        assert!(p.y.abs() < 1e-3, "{:?}", p);
    }

    #[test]
    fn round_trips_inside_zone() {
        let (geo, utm) = (crs(WGS84), crs(DEFAULT_AREA_EPSG));
        for (lon, lat) in [(69.2, 41.3), (67.5, 40.0), (71.4, 43.9)] {
            let there = geo.transform(&utm, Coord { x: lon, y: lat }).unwrap();
            let back = utm.transform(&geo, there).unwrap();
            assert!((back.x - lon).abs() < 1e-7, "{:?}", back);
            assert!((back.y - lat).abs() < 1e-7, "{:?}", back);
        }
    }

    #[test]
    fn recognises_codes() {
        assert!(crs(WGS84).is_geographic());
        assert!(!crs(DEFAULT_AREA_EPSG).is_geographic());
        assert_eq!(crs(3857).epsg(), 3857);
        assert!(Crs::from_epsg(1).is_none());
        assert_eq!(utm_epsg(42, false), Some(32642));
        assert_eq!(utm_epsg(33, true), Some(32733));
        assert_eq!(utm_epsg(61, false), None);
    }
}
