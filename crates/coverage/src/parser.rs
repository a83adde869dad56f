//! Extraction of coordinates from the free-form text reports sent over the
//! radio, e.g.
//!
//! ```text
//! 12:34 PM
//! 37.1, -122.2
//! 15m
//! ```
//!
//! The first line is a header (usually the time of day) and is not
//! interpreted. The line after it starts with latitude and longitude.

use std::sync::OnceLock;

use model::Coordinate;
use regex::Regex;

fn coordinate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // [^\n]*\n         - header line, may be empty
        // ([0-9.-]+)       - latitude
        // ,\s*             - separator
        // ([0-9.-]+)       - longitude
        Regex::new(r"[^\n]*\n([0-9.-]+),\s*([0-9.-]+)").expect("valid coordinate regex")
    })
}

/// Returns the coordinate of the first `lat, lon` line that follows a header
/// line, or `None` if there is none or its numbers do not parse.
///
/// No range checks happen here.
pub fn parse(raw: &str) -> Option<Coordinate> {
    let captures = coordinate_pattern().captures(raw)?;
    let latitude = captures.get(1)?.as_str().parse::<f64>().ok()?;
    let longitude = captures.get(2)?.as_str().parse::<f64>().ok()?;
    Some(Coordinate::new(latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_header_then_coordinates() {
        assert_eq!(
            parse("12:34 PM\n37.1,-122.2"),
            Some(Coordinate::new(37.1, -122.2))
        );
    }

    #[test]
    fn space_after_comma_and_trailing_lines() {
        assert_eq!(
            parse("9:01 AM\n54.3233, 10.1228\n42m"),
            Some(Coordinate::new(54.3233, 10.1228))
        );
    }

    #[test]
    fn any_header_line_is_accepted() {
        assert_eq!(
            parse("position report\n-33.86,151.21"),
            Some(Coordinate::new(-33.86, 151.21))
        );
        assert_eq!(parse("\n1.5,2.5"), Some(Coordinate::new(1.5, 2.5)));
    }

    #[test]
    fn no_range_validation() {
        assert_eq!(
            parse("12:00 PM\n123.0,-500.5"),
            Some(Coordinate::new(123.0, -500.5))
        );
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(
            parse("a\n1,2\nb\n3,4"),
            Some(Coordinate::new(1.0, 2.0))
        );
    }

    #[test]
    fn without_coordinate_line() {
        for raw in [
            "",
            "hello",
            "37.1,-122.2",
            "12:34 PM",
            "12:34 PM\nno fix yet",
            "12:34 PM\n37.1 -122.2",
            "12:34 PM\n37.1;-122.2",
        ] {
            assert_eq!(parse(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn unparsable_numbers() {
        assert_eq!(parse("12:34 PM\n1.2.3,4"), None);
        assert_eq!(parse("12:34 PM\n-,4"), None);
        assert_eq!(parse("12:34 PM\n5,--1"), None);
    }
}
