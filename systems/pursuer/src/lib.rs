#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Nocturnal pursuer that hunts the player car.
//!
//! The pursuer is dormant during the day and parked far outside the city.
//! On the day to night edge it appears behind the player and chases them
//! until daybreak. It only reports proximity; consequences of a hit are left
//! to the caller.

use midnight_drive_core::{heading_of, Vec2, VehiclePose};
use serde::Deserialize;

/// Parking spot used while the pursuer is dormant.
pub const DORMANT_POSITION: Vec2 = Vec2::new(0.0, -10_000.0);

/// Tunable pursuit parameters.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PursuerTuning {
    /// Distance behind the player at which the pursuer appears.
    pub spawn_distance: f32,
    /// Units covered per normalized step.
    pub pursuit_speed: f32,
    /// The pursuer stops closing in below this distance.
    pub stop_distance: f32,
    /// Distance at or below which the player counts as hit.
    pub hit_radius: f32,
    /// Upper bound of the eye glow.
    pub max_glow: f32,
    /// Glow numerator; glow is this value divided by the distance.
    pub glow_scale: f32,
}

impl Default for PursuerTuning {
    fn default() -> Self {
        Self {
            spawn_distance: 60.0,
            pursuit_speed: 0.28,
            stop_distance: 2.0,
            hit_radius: 3.0,
            max_glow: 4.0,
            glow_scale: 60.0,
        }
    }
}

/// Activity state of the pursuer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PursuerActivity {
    /// Hidden far away during the day.
    #[default]
    Dormant,
    /// Visible and chasing at night.
    Active,
}

/// Edge crossed during an update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PursuerTransition {
    /// The pursuer appeared at the provided position.
    Spawned {
        /// Position it was teleported to.
        position: Vec2,
    },
    /// The pursuer was hidden.
    Despawned,
}

/// Per-update proximity report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PursuerReport {
    /// Distance between pursuer and player after the update.
    pub distance_to_player: f32,
    /// Whether the player is within the hit radius of an active pursuer.
    pub within_hit_radius: bool,
    /// Edge crossed during this update, if any.
    pub transition: Option<PursuerTransition>,
}

/// Read-only pursuer state for presentation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PursuerSnapshot {
    /// Ground-plane position.
    pub position: Vec2,
    /// Heading facing the direction of travel.
    pub facing: f32,
    /// Vertical bob offset.
    pub bob: f32,
    /// Arm swing angle in radians.
    pub arm_swing: f32,
    /// Eye glow intensity.
    pub glow: f32,
    /// Current activity state.
    pub activity: PursuerActivity,
}

/// The single pursuit entity of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct Pursuer {
    tuning: PursuerTuning,
    activity: PursuerActivity,
    position: Vec2,
    facing: f32,
    distance_to_player: f32,
    clock: f32,
}

impl Pursuer {
    /// Creates a dormant pursuer.
    #[must_use]
    pub fn new(tuning: PursuerTuning) -> Self {
        Self {
            tuning,
            activity: PursuerActivity::Dormant,
            position: DORMANT_POSITION,
            facing: 0.0,
            distance_to_player: f32::INFINITY,
            clock: 0.0,
        }
    }

    /// Reports whether the pursuer is chasing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.activity == PursuerActivity::Active
    }

    /// Ground-plane position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Distance to the player measured during the last update.
    #[must_use]
    pub const fn distance_to_player(&self) -> f32 {
        self.distance_to_player
    }

    /// Advances the pursuer.
    ///
    /// `dt` is the normalized step used for movement and `sec` the real time
    /// used for the animation clock. Spawning and despawning happen only when
    /// `is_night` differs from the current activity.
    pub fn update(&mut self, is_night: bool, player: VehiclePose, dt: f32, sec: f32) -> PursuerReport {
        let transition = match (self.activity, is_night) {
            (PursuerActivity::Dormant, true) => {
                let position = player.position - player.forward() * self.tuning.spawn_distance;
                self.activity = PursuerActivity::Active;
                self.position = position;
                self.facing = heading_of(player.position - position);
                tracing::debug!(x = position.x, z = position.y, "pursuer spawned");
                Some(PursuerTransition::Spawned { position })
            }
            (PursuerActivity::Active, false) => {
                self.activity = PursuerActivity::Dormant;
                self.position = DORMANT_POSITION;
                tracing::debug!("pursuer despawned");
                Some(PursuerTransition::Despawned)
            }
            _ => None,
        };

        let chasing = self.is_active() && transition.is_none();
        if chasing {
            self.clock += sec;
            let to_player = player.position - self.position;
            let distance = to_player.length();
            if distance > self.tuning.stop_distance {
                let direction = to_player / distance;
                self.position += direction * self.tuning.pursuit_speed * dt;
                self.facing = heading_of(direction);
            }
        }

        self.distance_to_player = self.position.distance(player.position);
        PursuerReport {
            distance_to_player: self.distance_to_player,
            within_hit_radius: self.is_active()
                && self.distance_to_player <= self.tuning.hit_radius,
            transition,
        }
    }

    /// Presentation snapshot including animation values.
    #[must_use]
    pub fn snapshot(&self) -> PursuerSnapshot {
        let (bob, arm_swing, glow) = if self.is_active() {
            let glow = if self.distance_to_player > 0.0 {
                (self.tuning.glow_scale / self.distance_to_player).min(self.tuning.max_glow)
            } else {
                self.tuning.max_glow
            };
            (
                0.25 * (self.clock * 7.0).sin().abs(),
                0.7 * (self.clock * 9.0).sin(),
                glow,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        PursuerSnapshot {
            position: self.position,
            facing: self.facing,
            bob,
            arm_swing,
            glow,
            activity: self.activity,
        }
    }
}
