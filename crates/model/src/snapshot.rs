use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Coordinate, CoveragePolygon, ExampleData, Point};

/// All accepted points together with the coverage derived from them.
///
/// This is the document that is persisted and pushed to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    #[serde(default)]
    points: Vec<Point>,

    #[serde(default)]
    coverage: CoveragePolygon,
}

impl Snapshot {
    pub fn new(points: Vec<Point>, coverage: CoveragePolygon) -> Self {
        Self { points, coverage }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Points in the order they were accepted.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn coverage(&self) -> &CoveragePolygon {
        &self.coverage
    }

    /// Points are append-only, so their count orders snapshots of one store.
    pub fn revision(&self) -> usize {
        self.points.len()
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.points.iter().map(Point::coordinate).collect()
    }

    pub fn push_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn set_coverage(&mut self, coverage: CoveragePolygon) {
        self.coverage = coverage;
    }
}

impl ExampleData for Snapshot {
    fn example_data() -> Self {
        Snapshot {
            points: vec![Point::example_data()],
            coverage: CoveragePolygon::example_data(),
        }
    }
}
