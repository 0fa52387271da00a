//! Hand-authored road network and the intersections derived from it.

use midnight_drive_core::{Axis, RoadRect, Vec2};
use serde::Deserialize;

use crate::WorldBuildError;

/// Paved width shared by every road in the default network.
pub const ROAD_WIDTH: f32 = 14.0;

const INTERSECTION_MERGE_DISTANCE: f32 = 0.5;

/// Ordered list of axis-aligned road rectangles.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RoadNetwork {
    roads: Vec<RoadRect>,
}

impl Default for RoadNetwork {
    fn default() -> Self {
        Self::city_grid()
    }
}

impl RoadNetwork {
    /// Creates a network from an explicit list of road rectangles.
    #[must_use]
    pub fn new(roads: Vec<RoadRect>) -> Self {
        Self { roads }
    }

    /// The default hierarchical grid: a primary cross, parallel avenues,
    /// inner connectors and an outer ring.
    #[must_use]
    pub fn city_grid() -> Self {
        let w = ROAD_WIDTH;
        let roads = vec![
            // primary cross
            RoadRect::new(0.0, 0.0, 800.0, w),
            RoadRect::new(0.0, 0.0, w, 800.0),
            // avenues
            RoadRect::new(0.0, -150.0, 760.0, w),
            RoadRect::new(0.0, 150.0, 760.0, w),
            RoadRect::new(-150.0, 0.0, w, 760.0),
            RoadRect::new(150.0, 0.0, w, 760.0),
            // inner connectors
            RoadRect::new(0.0, -75.0, 300.0, w),
            RoadRect::new(0.0, 75.0, 300.0, w),
            RoadRect::new(-75.0, 0.0, w, 300.0),
            RoadRect::new(75.0, 0.0, w, 300.0),
            // outer ring
            RoadRect::new(0.0, -300.0, 620.0, w),
            RoadRect::new(0.0, 300.0, 620.0, w),
            RoadRect::new(-300.0, 0.0, w, 620.0),
            RoadRect::new(300.0, 0.0, w, 620.0),
        ];
        Self { roads }
    }

    /// Road rectangles in declaration order.
    #[must_use]
    pub fn roads(&self) -> &[RoadRect] {
        &self.roads
    }

    pub(crate) fn validate(&self) -> Result<(), WorldBuildError> {
        if self.roads.is_empty() {
            return Err(WorldBuildError::EmptyRoadNetwork);
        }

        for (index, road) in self.roads.iter().enumerate() {
            let finite = road.center_x.is_finite()
                && road.center_z.is_finite()
                && road.width.is_finite()
                && road.depth.is_finite();
            let positive = road.width > 0.0 && road.depth > 0.0;
            let square = road.width == road.depth;
            if !finite || !positive || square {
                return Err(WorldBuildError::DegenerateRoad {
                    index,
                    width: road.width,
                    depth: road.depth,
                });
            }
        }

        Ok(())
    }

    /// Points where a horizontal and a vertical road footprint overlap.
    ///
    /// The point is the vertical road's X paired with the horizontal road's Z.
    /// Coincident points produced by different road pairs are merged.
    #[must_use]
    pub fn intersections(&self) -> Vec<Vec2> {
        let mut points: Vec<Vec2> = Vec::new();
        let horizontal = self
            .roads
            .iter()
            .filter(|road| road.axis() == Axis::Horizontal);

        for across in horizontal {
            let vertical = self
                .roads
                .iter()
                .filter(|road| road.axis() == Axis::Vertical);
            for along in vertical {
                if !footprints_overlap(across, along) {
                    continue;
                }

                let point = Vec2::new(along.center_x, across.center_z);
                let duplicate = points
                    .iter()
                    .any(|existing| existing.distance(point) < INTERSECTION_MERGE_DISTANCE);
                if !duplicate {
                    points.push(point);
                }
            }
        }

        points
    }
}

fn footprints_overlap(first: &RoadRect, second: &RoadRect) -> bool {
    (first.center_x - second.center_x).abs() < (first.width + second.width) * 0.5
        && (first.center_z - second.center_z).abs() < (first.depth + second.depth) * 0.5
}

/// Reports whether `point` lies within `radius` of any intersection.
pub(crate) fn near_intersection(point: Vec2, intersections: &[Vec2], radius: f32) -> bool {
    intersections
        .iter()
        .any(|intersection| intersection.distance_squared(point) < radius * radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_grid_is_valid_and_axis_aligned() {
        let network = RoadNetwork::city_grid();
        assert!(network.validate().is_ok());
        for road in network.roads() {
            assert!(road.length() > road.thickness() * 10.0);
        }
    }

    #[test]
    fn primary_cross_meets_at_origin() {
        let network = RoadNetwork::new(vec![
            RoadRect::new(0.0, 0.0, 200.0, 10.0),
            RoadRect::new(0.0, 0.0, 10.0, 200.0),
        ]);
        assert_eq!(network.intersections(), vec![Vec2::ZERO]);
    }

    #[test]
    fn disjoint_roads_do_not_intersect() {
        let network = RoadNetwork::new(vec![
            RoadRect::new(0.0, 0.0, 100.0, 10.0),
            RoadRect::new(200.0, 0.0, 10.0, 100.0),
        ]);
        assert!(network.intersections().is_empty());
    }

    #[test]
    fn city_grid_produces_expected_crossings() {
        let intersections = RoadNetwork::city_grid().intersections();
        assert!(intersections.contains(&Vec2::new(0.0, 0.0)));
        assert!(intersections.contains(&Vec2::new(150.0, -150.0)));
        assert!(intersections.contains(&Vec2::new(-75.0, 75.0)));
        assert!(intersections.contains(&Vec2::new(300.0, 300.0)));
        // inner connectors stop at the avenues, so they never reach the ring
        assert!(!intersections.contains(&Vec2::new(75.0, 300.0)));
    }

    #[test]
    fn empty_network_is_rejected() {
        let error = RoadNetwork::new(Vec::new()).validate().unwrap_err();
        assert_eq!(error, WorldBuildError::EmptyRoadNetwork);
    }

    #[test]
    fn square_road_is_rejected() {
        let network = RoadNetwork::new(vec![
            RoadRect::new(0.0, 0.0, 100.0, 10.0),
            RoadRect::new(0.0, 0.0, 20.0, 20.0),
        ]);
        assert!(matches!(
            network.validate(),
            Err(WorldBuildError::DegenerateRoad { index: 1, .. })
        ));
    }
}
