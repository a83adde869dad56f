use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::serde::timestamp;

use crate::{Coordinate, ExampleData};

/// A single accepted position report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    #[serde(rename = "lat")]
    pub latitude: f64,

    #[serde(rename = "lon")]
    pub longitude: f64,

    #[serde(rename = "time", with = "timestamp")]
    #[schemars(with = "String")]
    pub observed_at: NaiveDateTime,
}

impl Point {
    pub fn new(coordinate: Coordinate, observed_at: NaiveDateTime) -> Self {
        Self {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            observed_at,
        }
    }

    /// Creates a point observed right now.
    pub fn observed_now(coordinate: Coordinate) -> Self {
        Self::new(coordinate, timestamp::now())
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl ExampleData for Point {
    fn example_data() -> Self {
        Point {
            latitude: 54.3233,
            longitude: 10.1228,
            observed_at: NaiveDateTime::parse_from_str(
                "2024-06-01 12:34:00",
                timestamp::FORMAT,
            )
            .unwrap_or_default(),
        }
    }
}
