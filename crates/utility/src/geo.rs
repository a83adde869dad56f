pub const MAX_LATITUDE: f64 = 90.0;
pub const MAX_LONGITUDE: f64 = 180.0;

pub fn is_valid_latitude(latitude: f64) -> bool {
    latitude.is_finite() && latitude.abs() <= MAX_LATITUDE
}

pub fn is_valid_longitude(longitude: f64) -> bool {
    longitude.is_finite() && longitude.abs() <= MAX_LONGITUDE
}

/// `(0, 0)` is what many GPS modules report before they have a fix.
pub fn is_null_island(latitude: f64, longitude: f64) -> bool {
    latitude == 0.0 && longitude == 0.0
}

/// Z component of the cross product of `o -> a` and `o -> b`, treating
/// `(latitude, longitude)` as planar `(x, y)`. Positive for a counter-clockwise
/// turn, negative for clockwise, zero when the three points are collinear.
pub fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        assert!(is_valid_latitude(-90.0));
        assert!(!is_valid_latitude(90.5));
        assert!(!is_valid_latitude(f64::NAN));
        assert!(is_valid_longitude(180.0));
        assert!(!is_valid_longitude(-180.01));
    }

    #[test]
    fn cross_orientation() {
        assert!(cross((0.0, 0.0), (1.0, 0.0), (0.0, 1.0)) > 0.0);
        assert!(cross((0.0, 0.0), (0.0, 1.0), (1.0, 0.0)) < 0.0);
        assert_eq!(cross((0.0, 0.0), (1.0, 1.0), (2.0, 2.0)), 0.0);
    }
}
