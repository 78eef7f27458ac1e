//! Viewport bounds derived from marker positions.

use geo::{BoundingRect as _, MultiPoint, Point};
use serde::Serialize;
use strikenet_report_models::Coordinates;

/// The smallest lng/lat rectangle covering a set of positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportBounds {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl ViewportBounds {
    /// Computes the bounds covering `positions`.
    ///
    /// Returns `None` for an empty input, in which case the caller must
    /// leave the viewport alone.
    pub fn covering<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinates>,
    {
        let points: MultiPoint<f64> = positions
            .into_iter()
            .map(|c| Point::new(c.longitude, c.latitude))
            .collect();

        points.bounding_rect().map(|rect| Self {
            west: rect.min().x,
            south: rect.min().y,
            east: rect.max().x,
            north: rect.max().y,
        })
    }

    /// Centre of the rectangle.
    #[must_use]
    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            f64::midpoint(self.south, self.north),
            f64::midpoint(self.west, self.east),
        )
    }

    /// Whether the bounds collapse to a single point.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_point(&self) -> bool {
        self.west == self.east && self.south == self.north
    }
}

impl std::fmt::Display for ViewportBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.5}, {:.5}] - [{:.5}, {:.5}]",
            self.west, self.south, self.east, self.north
        )
    }
}
