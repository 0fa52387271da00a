//! Bounded rejection sampling and the placement plans it produces.

use midnight_drive_core::{Axis, CollisionCircle, CollisionRect, RoadRect, Vec2};
use rand::Rng;

use crate::mesh::Material;

/// Padding added to each building footprint to form its collision rectangle.
pub const BUILDING_CLEARANCE: f32 = 1.5;

/// Clearance kept between road footprints and buildings or trees.
pub const ROAD_MARGIN: f32 = 3.0;

/// Solid radius of a tree trunk and its canopy skirt.
pub const TREE_RADIUS: f32 = 1.6;

/// Solid radius of a street-lamp pole.
pub const LAMP_RADIUS: f32 = 0.6;

/// Distance between lamp proposals along a road edge.
pub(crate) const LAMP_SPACING: f32 = 36.0;

/// Clearance kept between lamps and the road they line.
pub const LAMP_ROAD_MARGIN: f32 = 0.25;

/// Height of one building floor.
pub(crate) const FLOOR_HEIGHT: f32 = 4.0;

const BUILDING_HALF_EXTENT: std::ops::Range<f32> = 6.0..18.0;
const BUILDING_HEIGHT: std::ops::Range<f32> = 12.0..70.0;
const PLACEMENT_HALF_EXTENT: f32 = 370.0;
const LAMP_EDGE_OFFSET: f32 = 1.5;
const LAMP_JITTER: f32 = 4.0;
const FURNITURE_RADIUS: f32 = 0.8;
const FURNITURE_EDGE_OFFSET: f32 = 2.2;
const TREE_SPACING: f32 = 0.5;

const FACADES: [Material; 3] = [
    Material::FacadeConcrete,
    Material::FacadeBrick,
    Material::FacadeSteel,
];

/// Draws up to `target` candidates, spending at most `target * attempts`
/// proposals, and keeps those approved by `accept`.
///
/// `accept` sees the candidates accepted so far. Falling short of the target is
/// not an error; the shortfall is reported at `debug` level.
pub(crate) fn sample<T>(
    category: &'static str,
    target: usize,
    attempts_per_object: u32,
    mut propose: impl FnMut() -> T,
    mut accept: impl FnMut(&T, &[T]) -> bool,
) -> Vec<T> {
    let budget = target.saturating_mul(attempts_per_object.max(1) as usize);
    let mut accepted = Vec::with_capacity(target);

    for _ in 0..budget {
        if accepted.len() >= target {
            break;
        }
        let candidate = propose();
        if accept(&candidate, &accepted) {
            accepted.push(candidate);
        }
    }

    if accepted.len() < target {
        tracing::debug!(
            category,
            placed = accepted.len(),
            target,
            budget,
            "placement fell short of target"
        );
    }

    accepted
}

/// Side of a building footprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Facade {
    North,
    South,
    East,
    West,
}

impl Facade {
    const ALL: [Facade; 4] = [Self::North, Self::South, Self::East, Self::West];
}

/// Accepted building footprint with its decoration choices.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BuildingPlan {
    pub(crate) center: Vec2,
    pub(crate) half_extents: Vec2,
    pub(crate) height: f32,
    pub(crate) facade: Material,
    pub(crate) door: Facade,
    pub(crate) rooftop_units: Vec<Vec2>,
}

impl BuildingPlan {
    pub(crate) fn propose(rng: &mut impl Rng) -> Self {
        let half_extents = Vec2::new(
            rng.gen_range(BUILDING_HALF_EXTENT),
            rng.gen_range(BUILDING_HALF_EXTENT),
        );
        let reach = Vec2::splat(PLACEMENT_HALF_EXTENT) - half_extents;
        let center = Vec2::new(
            rng.gen_range(-reach.x..reach.x),
            rng.gen_range(-reach.y..reach.y),
        );
        let height = rng.gen_range(BUILDING_HEIGHT);
        let facade = FACADES[rng.gen_range(0..FACADES.len())];
        let door = Facade::ALL[rng.gen_range(0..Facade::ALL.len())];
        let unit_count = rng.gen_range(0..=2);
        let rooftop_units = (0..unit_count)
            .map(|_| {
                Vec2::new(
                    rng.gen_range(-0.6..0.6) * half_extents.x,
                    rng.gen_range(-0.6..0.6) * half_extents.y,
                )
            })
            .collect();

        Self {
            center,
            half_extents,
            height,
            facade,
            door,
            rooftop_units,
        }
    }

    pub(crate) fn floors(&self) -> u32 {
        (self.height / FLOOR_HEIGHT).floor() as u32
    }

    pub(crate) fn collision_rect(&self) -> CollisionRect {
        CollisionRect::new(
            self.center.x,
            self.center.y,
            self.half_extents.x + BUILDING_CLEARANCE,
            self.half_extents.y + BUILDING_CLEARANCE,
        )
    }

    pub(crate) fn clear_of_roads(&self, roads: &[RoadRect]) -> bool {
        !roads
            .iter()
            .any(|road| road.overlaps_box(self.center, self.half_extents, ROAD_MARGIN))
    }

    pub(crate) fn clear_of_buildings(&self, accepted: &[BuildingPlan]) -> bool {
        let rect = self.collision_rect();
        !accepted
            .iter()
            .any(|other| rect.overlaps(&other.collision_rect(), 0.0))
    }
}

/// Accepted tree with its visual proportions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TreePlan {
    pub(crate) center: Vec2,
    pub(crate) trunk_height: f32,
    pub(crate) canopy_radius: f32,
    pub(crate) canopy_height: f32,
}

impl TreePlan {
    pub(crate) fn propose(rng: &mut impl Rng) -> Self {
        Self {
            center: Vec2::new(
                rng.gen_range(-PLACEMENT_HALF_EXTENT..PLACEMENT_HALF_EXTENT),
                rng.gen_range(-PLACEMENT_HALF_EXTENT..PLACEMENT_HALF_EXTENT),
            ),
            trunk_height: rng.gen_range(1.8..3.2),
            canopy_radius: rng.gen_range(2.0..3.4),
            canopy_height: rng.gen_range(4.0..7.5),
        }
    }

    pub(crate) fn collision_circle(&self) -> CollisionCircle {
        CollisionCircle::new(self.center.x, self.center.y, TREE_RADIUS)
    }

    pub(crate) fn is_clear(
        &self,
        roads: &[RoadRect],
        buildings: &[CollisionRect],
        lamps: &[CollisionCircle],
        accepted: &[TreePlan],
    ) -> bool {
        let off_road = !roads
            .iter()
            .any(|road| road.overlaps_circle(self.center, TREE_RADIUS, ROAD_MARGIN));
        let off_lots = !buildings
            .iter()
            .any(|building| building.overlaps_circle(self.center, TREE_RADIUS));
        let apart = lamps
            .iter()
            .map(CollisionCircle::center)
            .chain(accepted.iter().map(|tree| tree.center))
            .all(|other| other.distance(self.center) >= TREE_RADIUS * 2.0 + TREE_SPACING);
        off_road && off_lots && apart
    }
}

/// Deterministic lamp proposals lining both edges of every road.
pub(crate) fn lamp_candidates(roads: &[RoadRect], rng: &mut impl Rng) -> Vec<Vec2> {
    let mut candidates = Vec::new();
    for road in roads {
        let count = (road.length() / LAMP_SPACING).floor() as u32;
        let start = -road.length() * 0.5 + LAMP_SPACING * 0.5;
        let edge = road.thickness() * 0.5 + LAMP_EDGE_OFFSET;
        for step in 0..count {
            let along = start + step as f32 * LAMP_SPACING;
            for side in [-1.0, 1.0] {
                let jitter = rng.gen_range(-LAMP_JITTER..LAMP_JITTER);
                candidates.push(road_point(road, along + jitter, side * edge));
            }
        }
    }
    candidates
}

/// Reports whether a lamp at `center` is clear of roads, buildings and other lamps.
pub(crate) fn lamp_is_clear(
    center: Vec2,
    roads: &[RoadRect],
    buildings: &[CollisionRect],
    accepted: &[Vec2],
) -> bool {
    let off_road = !roads
        .iter()
        .any(|road| road.overlaps_circle(center, LAMP_RADIUS, LAMP_ROAD_MARGIN));
    let off_lots = !buildings
        .iter()
        .any(|building| building.overlaps_circle(center, LAMP_RADIUS));
    let apart = accepted
        .iter()
        .all(|other| other.distance(center) >= LAMP_SPACING * 0.25);
    off_road && off_lots && apart
}

/// Kind of purely visual street furniture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FurnitureKind {
    Bench,
    Hydrant,
}

/// Accepted piece of street furniture on a sidewalk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FurniturePlan {
    pub(crate) center: Vec2,
    pub(crate) kind: FurnitureKind,
    pub(crate) axis: Axis,
}

impl FurniturePlan {
    pub(crate) fn propose(roads: &[RoadRect], rng: &mut impl Rng) -> Option<Self> {
        if roads.is_empty() {
            return None;
        }
        let road = &roads[rng.gen_range(0..roads.len())];
        let half = road.length() * 0.5;
        let along = rng.gen_range(-half..half);
        let side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let across = side * (road.thickness() * 0.5 + FURNITURE_EDGE_OFFSET);
        let kind = if rng.gen_bool(0.6) {
            FurnitureKind::Bench
        } else {
            FurnitureKind::Hydrant
        };
        Some(Self {
            center: road_point(road, along, across),
            kind,
            axis: road.axis(),
        })
    }

    pub(crate) fn is_clear(
        &self,
        roads: &[RoadRect],
        buildings: &[CollisionRect],
        lamps: &[CollisionCircle],
    ) -> bool {
        let off_road = !roads
            .iter()
            .any(|road| road.overlaps_circle(self.center, FURNITURE_RADIUS, 0.0));
        let off_lots = !buildings
            .iter()
            .any(|building| building.overlaps_circle(self.center, FURNITURE_RADIUS));
        let off_lamps = !lamps
            .iter()
            .any(|lamp| lamp.hits(self.center, FURNITURE_RADIUS * FURNITURE_RADIUS));
        off_road && off_lots && off_lamps
    }
}

/// Point `along` the road's dominant axis and `across` it, relative to its center.
pub(crate) fn road_point(road: &RoadRect, along: f32, across: f32) -> Vec2 {
    match road.axis() {
        Axis::Horizontal => Vec2::new(road.center_x + along, road.center_z + across),
        Axis::Vertical => Vec2::new(road.center_x + across, road.center_z + along),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn sampler_stops_at_target() {
        let mut proposals = 0;
        let accepted = sample(
            "test",
            5,
            3,
            || {
                proposals += 1;
                proposals
            },
            |_, _| true,
        );
        assert_eq!(accepted, vec![1, 2, 3, 4, 5]);
        assert_eq!(proposals, 5);
    }

    #[test]
    fn sampler_never_exceeds_attempt_budget() {
        let mut proposals = 0;
        let accepted: Vec<u32> = sample(
            "test",
            10,
            3,
            || {
                proposals += 1;
                proposals
            },
            |candidate, _| candidate % 7 == 0,
        );
        assert_eq!(proposals, 30);
        assert_eq!(accepted, vec![7, 14, 21, 28]);
    }

    #[test]
    fn sampler_lets_accept_inspect_previous_candidates() {
        let values = [1, 1, 2, 2, 3];
        let mut iter = values.iter().copied();
        let accepted = sample(
            "test",
            5,
            1,
            || iter.next().unwrap_or(0),
            |candidate, accepted| !accepted.contains(candidate),
        );
        assert_eq!(accepted, vec![1, 2, 3]);
    }

    #[test]
    fn building_collision_rect_adds_clearance() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let plan = BuildingPlan::propose(&mut rng);
        let rect = plan.collision_rect();
        assert_eq!(rect.half_width, plan.half_extents.x + BUILDING_CLEARANCE);
        assert_eq!(rect.half_depth, plan.half_extents.y + BUILDING_CLEARANCE);
        assert!(plan.rooftop_units.len() <= 2);
    }

    #[test]
    fn building_on_road_is_rejected() {
        let road = RoadRect::new(0.0, 0.0, 200.0, 14.0);
        let plan = BuildingPlan {
            center: Vec2::new(0.0, 17.0),
            half_extents: Vec2::splat(8.0),
            height: 20.0,
            facade: Material::FacadeBrick,
            door: Facade::North,
            rooftop_units: Vec::new(),
        };
        assert!(!plan.clear_of_roads(&[road]));
        let moved = BuildingPlan {
            center: Vec2::new(0.0, 19.0),
            ..plan
        };
        assert!(moved.clear_of_roads(&[road]));
    }

    #[test]
    fn lamps_line_both_edges() {
        let road = RoadRect::new(0.0, 0.0, 144.0, 14.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let candidates = lamp_candidates(&[road], &mut rng);
        assert_eq!(candidates.len(), 8);
        for lamp in &candidates {
            assert!((lamp.y.abs() - 8.5).abs() < 1e-4);
            assert!(lamp_is_clear(*lamp, &[road], &[], &[]));
        }
    }

    #[test]
    fn road_point_follows_axis() {
        let vertical = RoadRect::new(10.0, 0.0, 14.0, 300.0);
        assert_eq!(road_point(&vertical, 20.0, 3.0), Vec2::new(13.0, 20.0));
    }
}
