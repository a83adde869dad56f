use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Coordinate, ExampleData};

/// Vertices of the coverage area in hull order.
///
/// Holds a proper polygon only with three or more vertices. With fewer than
/// three observed points it holds those points verbatim, and it is empty when
/// the observed points do not span an area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CoveragePolygon(Vec<Coordinate>);

impl CoveragePolygon {
    pub fn new(vertices: Vec<Coordinate>) -> Self {
        Self(vertices)
    }

    pub fn empty() -> Self {
        Self(vec![])
    }

    pub fn vertices(&self) -> &[Coordinate] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Coordinate>> for CoveragePolygon {
    fn from(value: Vec<Coordinate>) -> Self {
        Self(value)
    }
}

impl ExampleData for CoveragePolygon {
    fn example_data() -> Self {
        Self(vec![
            Coordinate::new(54.30, 10.10),
            Coordinate::new(54.35, 10.10),
            Coordinate::new(54.35, 10.15),
            Coordinate::new(54.30, 10.15),
        ])
    }
}
