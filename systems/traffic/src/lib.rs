#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Ambient traffic that patrols straight road segments.
//!
//! Each agent is bound to one long road, drives along its dominant axis in a
//! fixed lane, and reverses once it passes a fraction of the road's
//! half-length from the center. Agents never leave their road.

use midnight_drive_core::{
    heading_of, Axis, RoadRect, TrafficAgentId, TrafficSnapshot, TrafficView, Vec2,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

/// Number of body colours presentation is expected to provide.
pub const TRAFFIC_PALETTE_SIZE: u8 = 6;

/// Seed used when the configuration does not provide one.
pub const DEFAULT_TRAFFIC_SEED: u64 = 0x7472_6166_6669_6321;

/// Tunable parameters for spawning and patrolling.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrafficTuning {
    /// Number of agents to spawn.
    pub agent_count: usize,
    /// Roads no longer than this are never used.
    pub min_road_length: f32,
    /// Lateral distance between the road center line and a lane.
    pub lane_offset: f32,
    /// Lower bound of the random cruising speed.
    pub speed_min: f32,
    /// Upper bound of the random cruising speed.
    pub speed_max: f32,
    /// Fraction of the road length spawn positions are drawn from.
    pub spawn_span: f32,
    /// Fraction of the half-length past which an agent turns around.
    pub patrol_extent: f32,
    /// Seed for spawn decisions.
    pub seed: u64,
}

impl Default for TrafficTuning {
    fn default() -> Self {
        Self {
            agent_count: 24,
            min_road_length: 60.0,
            lane_offset: 3.5,
            speed_min: 0.25,
            speed_max: 0.55,
            spawn_span: 0.7,
            patrol_extent: 0.38,
            seed: DEFAULT_TRAFFIC_SEED,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct TrafficAgent {
    id: TrafficAgentId,
    road: RoadRect,
    axis: Axis,
    position: Vec2,
    speed: f32,
    direction: f32,
    lane_offset: f32,
    color_index: u8,
}

impl TrafficAgent {
    fn along(&self) -> f32 {
        match self.axis {
            Axis::Horizontal => self.position.x - self.road.center_x,
            Axis::Vertical => self.position.y - self.road.center_z,
        }
    }

    fn heading(&self) -> f32 {
        let travel = match self.axis {
            Axis::Horizontal => Vec2::new(self.direction, 0.0),
            Axis::Vertical => Vec2::new(0.0, self.direction),
        };
        heading_of(travel)
    }

    fn advance(&mut self, dt: f32, patrol_extent: f32) {
        let delta = self.speed * self.direction * dt;
        match self.axis {
            Axis::Horizontal => self.position.x += delta,
            Axis::Vertical => self.position.y += delta,
        }

        let limit = self.road.length() * 0.5 * patrol_extent;
        let along = self.along();
        if (along > limit && self.direction > 0.0) || (along < -limit && self.direction < 0.0) {
            self.direction = -self.direction;
        }
    }

    fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            id: self.id,
            position: self.position,
            heading: self.heading(),
            axis: self.axis,
            color_index: self.color_index,
        }
    }
}

/// Owns every traffic agent for the whole session.
#[derive(Clone, Debug, PartialEq)]
pub struct Traffic {
    tuning: TrafficTuning,
    agents: Vec<TrafficAgent>,
}

impl Traffic {
    /// Spawns `tuning.agent_count` agents on the roads that are long enough.
    ///
    /// Eligible roads are shuffled once with the tuning seed and then assigned
    /// round-robin. Without an eligible road no agent is spawned.
    #[must_use]
    pub fn spawn(roads: &[RoadRect], tuning: TrafficTuning) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(tuning.seed);
        let mut eligible: Vec<&RoadRect> = roads
            .iter()
            .filter(|road| road.length() > tuning.min_road_length)
            .collect();
        eligible.shuffle(&mut rng);

        if eligible.is_empty() {
            if tuning.agent_count > 0 {
                tracing::warn!(
                    roads = roads.len(),
                    min_road_length = tuning.min_road_length,
                    "no road is long enough for traffic"
                );
            }
            return Self {
                tuning,
                agents: Vec::new(),
            };
        }

        let half_span = tuning.spawn_span.clamp(0.0, 1.0) * 0.5;

        let agents: Vec<TrafficAgent> = (0..tuning.agent_count)
            .map(|index| {
                let road = *eligible[index % eligible.len()];
                let axis = road.axis();
                let along = if half_span > 0.0 {
                    rng.gen_range(-half_span..half_span) * road.length()
                } else {
                    0.0
                };
                let lane = if rng.gen_bool(0.5) {
                    tuning.lane_offset
                } else {
                    -tuning.lane_offset
                };
                let position = match axis {
                    Axis::Horizontal => Vec2::new(road.center_x + along, road.center_z + lane),
                    Axis::Vertical => Vec2::new(road.center_x + lane, road.center_z + along),
                };
                TrafficAgent {
                    id: TrafficAgentId::new(index as u32),
                    road,
                    axis,
                    position,
                    speed: if tuning.speed_min < tuning.speed_max {
                        rng.gen_range(tuning.speed_min..tuning.speed_max)
                    } else {
                        tuning.speed_min
                    },
                    direction: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
                    lane_offset: lane,
                    color_index: rng.gen_range(0..TRAFFIC_PALETTE_SIZE),
                }
            })
            .collect();

        tracing::info!(
            agents = agents.len(),
            eligible_roads = eligible.len(),
            "traffic spawned"
        );

        Self { tuning, agents }
    }

    /// Advances every agent along its road by the normalized step `dt`.
    pub fn step(&mut self, dt: f32) {
        let patrol_extent = self.tuning.patrol_extent;
        for agent in &mut self.agents {
            agent.advance(dt, patrol_extent);
        }
    }

    /// Number of agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Reports whether no agent was spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Captures a read-only view of every agent.
    #[must_use]
    pub fn view(&self) -> TrafficView {
        TrafficView::from_snapshots(self.agents.iter().map(TrafficAgent::snapshot).collect())
    }

    /// Reports whether any agent lies strictly within `radius` of `point`.
    #[must_use]
    pub fn is_near_any_agent(&self, point: Vec2, radius: f32) -> bool {
        let limit = radius * radius;
        self.agents
            .iter()
            .any(|agent| agent.position.distance_squared(point) < limit)
    }

    /// Lateral offsets agents keep from their road's center line.
    pub fn lane_offsets(&self) -> impl Iterator<Item = f32> + '_ {
        self.agents.iter().map(|agent| agent.lane_offset)
    }
}
