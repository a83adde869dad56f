pub mod coordinate;
pub mod coverage;
pub mod point;
pub mod snapshot;

pub use coordinate::Coordinate;
pub use coverage::CoveragePolygon;
pub use point::Point;
pub use snapshot::Snapshot;

pub trait ExampleData {
    fn example_data() -> Self;
}
