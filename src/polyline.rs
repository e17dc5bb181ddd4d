//! Polyline representation for route geometries.
//!
//! Geometry stays as decoded coordinates inside the planner. Provider replies
//! are decoded at the boundary and points keep the precision they arrived with.

use serde::{Deserialize, Serialize};

use crate::model::Coordinate;

/// A route geometry as an ordered sequence of coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    /// Straight line between two points, used when a provider omits geometry.
    pub fn straight(from: Coordinate, to: Coordinate) -> Self {
        Self {
            points: vec![from, to],
        }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<Coordinate> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Coordinate> {
        self.points.last().copied()
    }

    /// Appends `other`, dropping its first point when it repeats our last one.
    pub fn extend_joined(&mut self, other: &Polyline) {
        let skip = match (self.last(), other.first()) {
            (Some(last), Some(first)) if last == first => 1,
            _ => 0,
        };
        self.points.extend(other.points.iter().skip(skip).copied());
    }

    /// Concatenates consecutive pieces, deduplicating shared endpoints.
    pub fn join<'a>(pieces: impl IntoIterator<Item = &'a Polyline>) -> Polyline {
        let mut joined = Polyline::default();
        for piece in pieces {
            joined.extend_joined(piece);
        }
        joined
    }
}
