#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Midnight Drive engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing environment mutations, the world executes those commands via
//! its `apply` entry point and broadcasts [`Event`] values. Systems read
//! immutable views such as [`ObstacleView`] and [`TrafficView`] and never
//! mutate world state directly.
//!
//! Ground-plane positions are expressed as [`Vec2`] values whose `x` carries
//! the world X coordinate and whose `y` carries the world Z coordinate.

use std::time::Duration;

pub use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canonical title shown by adapters when the experience boots.
pub const WINDOW_TITLE: &str = "Midnight Drive";

/// Length of one full traffic-signal cycle in seconds.
pub const SIGNAL_CYCLE_SECONDS: f32 = 6.0;

/// Signal clock value at which the green phase hands over to yellow.
pub const SIGNAL_GREEN_END_SECONDS: f32 = 2.7;

/// Signal clock value at which the yellow phase hands over to red.
pub const SIGNAL_YELLOW_END_SECONDS: f32 = 3.3;

/// Commands that express all permissible environment mutations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Forces the day/night flag to the provided value.
    SetNight {
        /// Whether night should be active.
        enabled: bool,
    },
    /// Forces the rain flag to the provided value.
    SetRaining {
        /// Whether rain should be active.
        enabled: bool,
    },
    /// Inverts the day/night flag.
    ToggleNight,
    /// Inverts the rain flag.
    ToggleRain,
    /// Advances the environment clocks by the provided real time.
    Tick {
        /// Real time that elapsed since the previous tick.
        elapsed: Duration,
    },
}

/// Events broadcast after commands are processed or systems advance.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the environment clocks advanced.
    TimeAdvanced {
        /// Real time that elapsed in the tick.
        elapsed: Duration,
    },
    /// The day/night flag switched from day to night.
    NightFell,
    /// The day/night flag switched from night to day.
    DayBroke,
    /// Rain started falling.
    RainStarted,
    /// Rain stopped falling.
    RainStopped,
    /// The global traffic-signal phase changed.
    SignalPhaseChanged {
        /// Phase that became active.
        phase: SignalPhase,
    },
    /// The player vehicle hit an obstacle and bounced back.
    VehicleCollided {
        /// Category of the obstacle that was hit.
        kind: CollisionKind,
    },
    /// The pursuer appeared behind the player.
    PursuerSpawned {
        /// Ground-plane position the pursuer was teleported to.
        position: Vec2,
    },
    /// The pursuer was hidden at daybreak.
    PursuerDespawned,
    /// The pursuer caught the player and a speed penalty was applied.
    PursuerStruck {
        /// Distance between pursuer and player when the hit registered.
        distance: f32,
    },
}

/// Orientation of an axis-aligned road segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// The road runs along the X axis.
    Horizontal,
    /// The road runs along the Z axis.
    Vertical,
}

/// Axis-aligned road rectangle measured by its center and full extents.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadRect {
    /// World X coordinate of the rectangle center.
    pub center_x: f32,
    /// World Z coordinate of the rectangle center.
    pub center_z: f32,
    /// Full extent along the X axis.
    pub width: f32,
    /// Full extent along the Z axis.
    pub depth: f32,
}

impl RoadRect {
    /// Creates a new road rectangle.
    #[must_use]
    pub const fn new(center_x: f32, center_z: f32, width: f32, depth: f32) -> Self {
        Self {
            center_x,
            center_z,
            width,
            depth,
        }
    }

    /// Classifies the road by its dominant extent.
    #[must_use]
    pub fn axis(&self) -> Axis {
        if self.width >= self.depth {
            Axis::Horizontal
        } else {
            Axis::Vertical
        }
    }

    /// Extent along the dominant axis.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.width.max(self.depth)
    }

    /// Extent across the dominant axis.
    #[must_use]
    pub fn thickness(&self) -> f32 {
        self.width.min(self.depth)
    }

    /// Center of the rectangle on the ground plane.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.center_x, self.center_z)
    }

    /// Reports whether an axis-aligned box given by its center and half
    /// extents, grown by `margin`, overlaps this road.
    #[must_use]
    pub fn overlaps_box(&self, center: Vec2, half_extents: Vec2, margin: f32) -> bool {
        let reach_x = self.width * 0.5 + half_extents.x + margin;
        let reach_z = self.depth * 0.5 + half_extents.y + margin;
        (center.x - self.center_x).abs() < reach_x && (center.y - self.center_z).abs() < reach_z
    }

    /// Reports whether a circle, grown by `margin`, overlaps this road.
    #[must_use]
    pub fn overlaps_circle(&self, center: Vec2, radius: f32, margin: f32) -> bool {
        let half = Vec2::new(self.width * 0.5, self.depth * 0.5);
        let offset = center - self.center();
        let nearest = offset.clamp(-half, half);
        let reach = radius + margin;
        (offset - nearest).length_squared() < reach * reach
    }

    /// Reports whether the point lies on the road surface.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        (point.x - self.center_x).abs() <= self.width * 0.5
            && (point.y - self.center_z).abs() <= self.depth * 0.5
    }
}

/// Solid rectangular obstacle used for building collisions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionRect {
    /// World X coordinate of the rectangle center.
    pub x: f32,
    /// World Z coordinate of the rectangle center.
    pub z: f32,
    /// Half extent along the X axis.
    pub half_width: f32,
    /// Half extent along the Z axis.
    pub half_depth: f32,
}

impl CollisionRect {
    /// Creates a new collision rectangle.
    #[must_use]
    pub const fn new(x: f32, z: f32, half_width: f32, half_depth: f32) -> Self {
        Self {
            x,
            z,
            half_width,
            half_depth,
        }
    }

    /// Inclusive bounds test.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        (point.x - self.x).abs() <= self.half_width && (point.y - self.z).abs() <= self.half_depth
    }

    /// Strict interior test, excluding the boundary.
    #[must_use]
    pub fn strictly_contains(&self, point: Vec2) -> bool {
        (point.x - self.x).abs() < self.half_width && (point.y - self.z).abs() < self.half_depth
    }

    /// Reports whether two rectangles overlap once both are grown by `margin`.
    #[must_use]
    pub fn overlaps(&self, other: &CollisionRect, margin: f32) -> bool {
        (self.x - other.x).abs() < self.half_width + other.half_width + margin
            && (self.z - other.z).abs() < self.half_depth + other.half_depth + margin
    }

    /// Reports whether the circle overlaps this rectangle.
    #[must_use]
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        let half = Vec2::new(self.half_width, self.half_depth);
        let offset = center - Vec2::new(self.x, self.z);
        let nearest = offset.clamp(-half, half);
        (offset - nearest).length_squared() < radius * radius
    }
}

/// Solid circular obstacle used for trees and lamp posts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionCircle {
    /// World X coordinate of the circle center.
    pub x: f32,
    /// World Z coordinate of the circle center.
    pub z: f32,
    /// Radius of the solid footprint.
    pub radius: f32,
}

impl CollisionCircle {
    /// Creates a new collision circle.
    #[must_use]
    pub const fn new(x: f32, z: f32, radius: f32) -> Self {
        Self { x, z, radius }
    }

    /// Center of the circle on the ground plane.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }

    /// Squared-distance test with `epsilon` added to the squared radius.
    #[must_use]
    pub fn hits(&self, point: Vec2, epsilon: f32) -> bool {
        let dx = point.x - self.x;
        let dz = point.y - self.z;
        dx * dx + dz * dz < self.radius * self.radius + epsilon
    }
}

/// Category of obstacle reported by a collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollisionKind {
    /// A building rectangle.
    Building,
    /// A tree or lamp circle.
    Prop,
    /// A traffic agent.
    Traffic,
}

/// Read-only view over the static collision records of the world.
#[derive(Clone, Copy, Debug)]
pub struct ObstacleView<'a> {
    buildings: &'a [CollisionRect],
    trees: &'a [CollisionCircle],
    lamps: &'a [CollisionCircle],
}

impl<'a> ObstacleView<'a> {
    /// Captures a new view over the provided collision records.
    #[must_use]
    pub const fn new(
        buildings: &'a [CollisionRect],
        trees: &'a [CollisionCircle],
        lamps: &'a [CollisionCircle],
    ) -> Self {
        Self {
            buildings,
            trees,
            lamps,
        }
    }

    /// A view with no obstacles at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            buildings: &[],
            trees: &[],
            lamps: &[],
        }
    }

    /// Building rectangles in construction order.
    #[must_use]
    pub const fn buildings(&self) -> &'a [CollisionRect] {
        self.buildings
    }

    /// Tree circles in construction order.
    #[must_use]
    pub const fn trees(&self) -> &'a [CollisionCircle] {
        self.trees
    }

    /// Lamp circles in construction order.
    #[must_use]
    pub const fn lamps(&self) -> &'a [CollisionCircle] {
        self.lamps
    }

    /// First building whose inclusive bounds contain the point.
    #[must_use]
    pub fn building_at(&self, point: Vec2) -> Option<&'a CollisionRect> {
        self.buildings.iter().find(|building| building.contains(point))
    }

    /// First tree, then lamp, whose circle contains the point.
    #[must_use]
    pub fn prop_at(&self, point: Vec2, epsilon: f32) -> Option<&'a CollisionCircle> {
        self.trees
            .iter()
            .chain(self.lamps.iter())
            .find(|circle| circle.hits(point, epsilon))
    }
}

/// Boolean driving intents sampled once per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InputIntents {
    /// Throttle is held.
    pub accelerate: bool,
    /// Brake / reverse is held.
    pub brake: bool,
    /// Steering to the left is held.
    pub steer_left: bool,
    /// Steering to the right is held.
    pub steer_right: bool,
    /// Handbrake drift is held.
    pub drift: bool,
}

impl InputIntents {
    /// Combines two input sources by OR-ing every flag.
    #[must_use]
    pub const fn merge(self, other: InputIntents) -> Self {
        Self {
            accelerate: self.accelerate || other.accelerate,
            brake: self.brake || other.brake,
            steer_left: self.steer_left || other.steer_left,
            steer_right: self.steer_right || other.steer_right,
            drift: self.drift || other.drift,
        }
    }

    /// Signed steering input: `1` left, `-1` right, `0` none or both.
    #[must_use]
    pub fn steering(&self) -> f32 {
        match (self.steer_left, self.steer_right) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }
}

/// Pose of the player vehicle as observed by presentation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehiclePose {
    /// Ground-plane position.
    pub position: Vec2,
    /// Heading in radians; zero faces +Z.
    pub heading: f32,
    /// Cosmetic body roll in radians.
    pub lean: f32,
}

impl VehiclePose {
    /// Unit forward vector for the pose heading.
    #[must_use]
    pub fn forward(&self) -> Vec2 {
        forward_vector(self.heading)
    }
}

/// Unit ground-plane vector pointing along `heading`.
#[must_use]
pub fn forward_vector(heading: f32) -> Vec2 {
    Vec2::new(heading.sin(), heading.cos())
}

/// Heading that faces along the provided ground-plane direction.
#[must_use]
pub fn heading_of(direction: Vec2) -> f32 {
    direction.x.atan2(direction.y)
}

/// Three-way traffic-signal phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalPhase {
    /// Green-majority part of the cycle.
    Green,
    /// Short yellow transition.
    Yellow,
    /// Red-majority part of the cycle.
    Red,
}

impl SignalPhase {
    /// Phase shown at the provided signal clock value.
    ///
    /// The clock is wrapped into one cycle first, so any finite value is
    /// accepted.
    #[must_use]
    pub fn at(clock_seconds: f32) -> Self {
        let wrapped = clock_seconds.rem_euclid(SIGNAL_CYCLE_SECONDS);
        if wrapped < SIGNAL_GREEN_END_SECONDS {
            Self::Green
        } else if wrapped < SIGNAL_YELLOW_END_SECONDS {
            Self::Yellow
        } else {
            Self::Red
        }
    }
}

/// Lens intensities shared by every signal head in the city.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalIntensities {
    /// Intensity of the red lens.
    pub red: f32,
    /// Intensity of the yellow lens.
    pub yellow: f32,
    /// Intensity of the green lens.
    pub green: f32,
}

impl SignalIntensities {
    /// Intensity of a lit lens.
    pub const LIT: f32 = 1.0;
    /// Intensity of an unlit lens.
    pub const DIM: f32 = 0.12;

    /// Intensities that light exactly the lens matching `phase`.
    #[must_use]
    pub fn for_phase(phase: SignalPhase) -> Self {
        let lit = |wanted: SignalPhase| {
            if phase == wanted {
                Self::LIT
            } else {
                Self::DIM
            }
        };
        Self {
            red: lit(SignalPhase::Red),
            yellow: lit(SignalPhase::Yellow),
            green: lit(SignalPhase::Green),
        }
    }
}

/// Camera placement presets cycled by the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CameraMode {
    /// Behind and above the vehicle.
    #[default]
    Chase,
    /// High top-down overview.
    Aerial,
    /// Driver's seat.
    Cockpit,
}

impl CameraMode {
    /// Every mode in cycling order.
    pub const ALL: [CameraMode; 3] = [Self::Chase, Self::Aerial, Self::Cockpit];

    /// Mode that follows this one when cycling.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Chase => Self::Aerial,
            Self::Aerial => Self::Cockpit,
            Self::Cockpit => Self::Chase,
        }
    }

    /// Zero-based index exposed to presentation.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Chase => 0,
            Self::Aerial => 1,
            Self::Cockpit => 2,
        }
    }
}

/// Unique identifier assigned to a traffic agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrafficAgentId(u32);

impl TrafficAgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Immutable representation of a single traffic agent used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrafficSnapshot {
    /// Identifier allocated when the agent was spawned.
    pub id: TrafficAgentId,
    /// Ground-plane position.
    pub position: Vec2,
    /// Heading facing the direction of travel.
    pub heading: f32,
    /// Axis of the road the agent patrols.
    pub axis: Axis,
    /// Index into the presentation palette for the body colour.
    pub color_index: u8,
}

/// Read-only snapshot describing all traffic agents.
#[derive(Clone, Debug, Default)]
pub struct TrafficView {
    snapshots: Vec<TrafficSnapshot>,
}

impl TrafficView {
    /// Creates a new traffic view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TrafficSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TrafficSnapshot> {
        self.snapshots.iter()
    }

    /// Number of agents captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Reports whether any agent lies strictly within `radius` of `point`.
    #[must_use]
    pub fn is_near_any_agent(&self, point: Vec2, radius: f32) -> bool {
        let limit = radius * radius;
        self.snapshots
            .iter()
            .any(|agent| agent.position.distance_squared(point) < limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn road_axis_follows_dominant_extent() {
        assert_eq!(RoadRect::new(0.0, 0.0, 800.0, 14.0).axis(), Axis::Horizontal);
        assert_eq!(RoadRect::new(0.0, 0.0, 14.0, 800.0).axis(), Axis::Vertical);
    }

    #[test]
    fn road_overlap_respects_margin() {
        let road = RoadRect::new(0.0, 0.0, 100.0, 10.0);
        let half = Vec2::splat(2.0);
        assert!(!road.overlaps_box(Vec2::new(0.0, 9.0), half, 1.0));
        assert!(road.overlaps_box(Vec2::new(0.0, 9.0), half, 3.0));
        assert!(road.overlaps_circle(Vec2::new(0.0, 7.0), 1.0, 1.5));
        assert!(!road.overlaps_circle(Vec2::new(0.0, 7.0), 1.0, 0.5));
    }

    #[test]
    fn collision_rect_bounds_are_inclusive() {
        let rect = CollisionRect::new(0.0, 0.0, 5.0, 5.0);
        assert!(rect.contains(Vec2::new(5.0, -5.0)));
        assert!(!rect.strictly_contains(Vec2::new(5.0, -5.0)));
        assert!(!rect.contains(Vec2::new(5.01, 0.0)));
    }

    #[test]
    fn obstacle_view_checks_trees_before_lamps() {
        let trees = [CollisionCircle::new(0.0, 0.0, 1.0)];
        let lamps = [CollisionCircle::new(0.0, 0.0, 0.5)];
        let view = ObstacleView::new(&[], &trees, &lamps);
        let hit = view.prop_at(Vec2::ZERO, 0.0).expect("prop hit");
        assert_eq!(hit.radius, 1.0);
    }

    #[test]
    fn merged_intents_are_or_combined() {
        let keyboard = InputIntents {
            accelerate: true,
            ..InputIntents::default()
        };
        let touch = InputIntents {
            steer_left: true,
            ..InputIntents::default()
        };
        let merged = keyboard.merge(touch);
        assert!(merged.accelerate && merged.steer_left);
        assert!(!merged.brake && !merged.steer_right && !merged.drift);
    }

    #[test]
    fn opposing_steering_cancels() {
        let intents = InputIntents {
            steer_left: true,
            steer_right: true,
            ..InputIntents::default()
        };
        assert_eq!(intents.steering(), 0.0);
    }

    #[test]
    fn signal_phase_boundaries_match_cycle_proportions() {
        assert_eq!(SignalPhase::at(0.0), SignalPhase::Green);
        assert_eq!(SignalPhase::at(2.69), SignalPhase::Green);
        assert_eq!(SignalPhase::at(2.71), SignalPhase::Yellow);
        assert_eq!(SignalPhase::at(3.29), SignalPhase::Yellow);
        assert_eq!(SignalPhase::at(3.31), SignalPhase::Red);
        assert_eq!(SignalPhase::at(5.99), SignalPhase::Red);
        assert_eq!(SignalPhase::at(6.5), SignalPhase::Green);
    }

    #[test]
    fn signal_intensities_light_one_lens() {
        let red = SignalIntensities::for_phase(SignalPhase::Red);
        assert_eq!(red.red, SignalIntensities::LIT);
        assert_eq!(red.yellow, SignalIntensities::DIM);
        assert_eq!(red.green, SignalIntensities::DIM);
    }

    #[test]
    fn camera_modes_cycle_through_all_three() {
        let mut mode = CameraMode::default();
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(mode.index());
            mode = mode.next();
        }
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(mode, CameraMode::Chase);
    }

    #[test]
    fn heading_round_trips_through_forward_vector() {
        let heading = 1.1;
        let recovered = heading_of(forward_vector(heading));
        assert!((recovered - heading).abs() < 1e-5);
    }

    #[test]
    fn traffic_view_reports_nearby_agents() {
        let view = TrafficView::from_snapshots(vec![TrafficSnapshot {
            id: TrafficAgentId::new(0),
            position: Vec2::new(10.0, 0.0),
            heading: 0.0,
            axis: Axis::Horizontal,
            color_index: 0,
        }]);
        assert!(view.is_near_any_agent(Vec2::new(12.0, 0.0), 3.2));
        assert!(!view.is_near_any_agent(Vec2::new(14.0, 0.0), 3.2));
    }

    proptest! {
        #[test]
        fn signal_phase_depends_only_on_wrapped_clock(t in 0.0_f32..6.0, cycles in 0_u32..50) {
            let shifted = t + cycles as f32 * SIGNAL_CYCLE_SECONDS;
            let near_boundary = [0.0, SIGNAL_GREEN_END_SECONDS, SIGNAL_YELLOW_END_SECONDS, SIGNAL_CYCLE_SECONDS]
                .iter()
                .any(|edge| (shifted.rem_euclid(SIGNAL_CYCLE_SECONDS) - edge).abs() < 1e-3 || (t - edge).abs() < 1e-3);
            prop_assume!(!near_boundary);
            prop_assert_eq!(SignalPhase::at(shifted), SignalPhase::at(t));
        }
    }
}
