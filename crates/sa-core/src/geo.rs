//! Geographic coordinate type and spherical geodesy.
//!
//! `Coordinate` uses `f64` longitude/latitude.  Movement steps are a metre or
//! two per tick, so single precision (~1 m at the equator) would round most
//! steps away entirely.
//!
//! All functions model the Earth as a sphere of radius [`EARTH_RADIUS_M`].
//! That is accurate to ~0.5 % which is far below the thresholds the
//! simulator and safety classifier work with (5 m, 10 m, 40 m).

use std::fmt;

use crate::CoreError;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS-84 position as a `(longitude, latitude)` pair in decimal degrees.
///
/// Field order matches the `[lng, lat]` convention used by GeoJSON and by
/// routing providers.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    /// Construct without validation.  Use [`Coordinate::try_new`] for input
    /// that comes from configuration or external feeds.
    #[inline]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Construct and validate: both components finite, latitude in
    /// `[-90, 90]`, longitude in `[-180, 180]`.
    pub fn try_new(lon: f64, lat: f64) -> Result<Self, CoreError> {
        let c = Self { lon, lat };
        if c.is_valid() {
            Ok(c)
        } else {
            Err(CoreError::InvalidCoordinate { lon, lat })
        }
    }

    /// `true` if the coordinate is finite and within WGS-84 bounds.
    pub fn is_valid(self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance to `other` in metres.
    #[inline]
    pub fn distance_to(self, other: Coordinate) -> f64 {
        distance(self, other)
    }

    /// Initial bearing towards `other` in degrees, `[0, 360)`.
    #[inline]
    pub fn bearing_to(self, other: Coordinate) -> f64 {
        initial_bearing(self, other)
    }
}

impl From<[f64; 2]> for Coordinate {
    /// Interprets the array as `[lng, lat]`.
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lon, self.lat)
    }
}

/// Haversine great-circle distance in metres.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat * 0.5).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

    // Rounding can push `h` a hair past 1.0 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Project `origin` along `bearing_deg` (clockwise from north) for
/// `distance_m` metres on the sphere.
pub fn destination_point(origin: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    Coordinate {
        lon: normalize_lon(lon2.to_degrees()),
        lat: lat2.to_degrees(),
    }
}

/// Initial great-circle bearing from `a` to `b`, in degrees `[0, 360)`.
///
/// Returns `0.0` when the points coincide.
pub fn initial_bearing(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    let deg = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs.
    if deg >= 360.0 { 0.0 } else { deg }
}

/// Step from `from` towards `to` by at most `step_m` metres.
///
/// The step is clamped to the remaining distance, so a fast agent lands on
/// the target instead of oscillating around it.
pub fn move_towards(from: Coordinate, to: Coordinate, step_m: f64) -> Coordinate {
    let remaining = distance(from, to);
    if remaining <= step_m {
        return to;
    }
    destination_point(from, initial_bearing(from, to), step_m)
}

fn normalize_lon(lon: f64) -> f64 {
    (lon + 540.0).rem_euclid(360.0) - 180.0
}
