#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Arcade vehicle model for the player car.
//!
//! The simulation integrates boolean driving intents into speed, heading and
//! a cosmetic lean, then resolves the proposed displacement against the
//! static obstacles and the traffic agents. All rates are expressed per unit
//! of the normalized step `dt`, where `1.0` corresponds to one frame at the
//! target frame rate.

use midnight_drive_core::{
    forward_vector, CollisionKind, InputIntents, ObstacleView, TrafficView, Vec2, VehiclePose,
};
use serde::Deserialize;

/// Tunable constants of the vehicle model.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    /// Speed gained per unit step while accelerating.
    pub acceleration: f32,
    /// Speed lost per unit step while braking.
    pub brake: f32,
    /// Forward speed limit.
    pub max_speed: f32,
    /// Reverse speed limit, a negative value.
    pub reverse_max: f32,
    /// Coasting decay per unit step.
    pub friction: f32,
    /// Coasting decay per unit step while drifting.
    pub drift_friction: f32,
    /// Extra multiplicative speed decay per frame while drifting.
    pub drift_decay: f32,
    /// Heading change per unit step at full speed factor.
    pub turn_rate: f32,
    /// Steering amplification while drifting.
    pub drift_turn_multiplier: f32,
    /// Minimum speed magnitude for a drift to engage.
    pub drift_min_speed: f32,
    /// Speed factor applied when a collision rejects the displacement.
    pub bounce: f32,
    /// Added to the squared radius of tree and lamp circles.
    pub circle_epsilon: f32,
    /// Distance below which the car touches a traffic agent.
    pub traffic_radius: f32,
    /// Half side of the square the car is clamped into.
    pub world_half_extent: f32,
    /// Multiplier turning speed into the presented speed value.
    pub display_speed_scale: f32,
    /// Lean target while steering.
    pub steer_lean: f32,
    /// Lean target while drifting.
    pub drift_lean: f32,
    /// Fraction of the remaining lean closed per unit step.
    pub lean_smoothing: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            acceleration: 0.035,
            brake: 0.05,
            max_speed: 1.2,
            reverse_max: -0.4,
            friction: 0.015,
            drift_friction: 0.006,
            drift_decay: 0.985,
            turn_rate: 0.035,
            drift_turn_multiplier: 2.5,
            drift_min_speed: 0.3,
            bounce: -0.3,
            circle_epsilon: 0.5,
            traffic_radius: 3.2,
            world_half_extent: 380.0,
            display_speed_scale: 80.0,
            steer_lean: 0.08,
            drift_lean: 0.18,
            lean_smoothing: 0.15,
        }
    }
}

/// Mutable state of the player car.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VehicleState {
    /// Ground-plane position.
    pub position: Vec2,
    /// Heading in radians; zero faces +Z.
    pub heading: f32,
    /// Signed longitudinal speed, forward positive.
    pub speed: f32,
    /// Cosmetic body roll.
    pub lean: f32,
    /// Whether the last step was a drift.
    pub is_drifting: bool,
}

impl VehicleState {
    /// A stationary car at `position` facing `heading`.
    #[must_use]
    pub fn spawn_at(position: Vec2, heading: f32) -> Self {
        Self {
            position,
            heading,
            ..Self::default()
        }
    }

    /// Pose exposed to presentation.
    #[must_use]
    pub fn pose(&self) -> VehiclePose {
        VehiclePose {
            position: self.position,
            heading: self.heading,
            lean: self.lean,
        }
    }
}

/// Result of a single vehicle step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VehicleStepOutcome {
    /// Obstacle category that rejected the displacement, if any.
    pub collision: Option<CollisionKind>,
    /// Rounded speed magnitude in presentation units.
    pub display_speed: u32,
    /// Whether the drift modifier was active this step.
    pub drifting: bool,
}

impl VehicleStepOutcome {
    /// Reports whether the step ended in a collision.
    #[must_use]
    pub const fn collided(&self) -> bool {
        self.collision.is_some()
    }
}

/// Owns and advances the player car.
#[derive(Clone, Debug)]
pub struct VehicleSimulation {
    tuning: VehicleTuning,
    state: VehicleState,
}

impl VehicleSimulation {
    /// Creates a stationary car at the origin facing +Z.
    #[must_use]
    pub fn new(tuning: VehicleTuning) -> Self {
        Self {
            tuning,
            state: VehicleState::default(),
        }
    }

    /// Creates a simulation starting from the provided state.
    #[must_use]
    pub fn with_state(tuning: VehicleTuning, state: VehicleState) -> Self {
        Self { tuning, state }
    }

    /// Current car state.
    #[must_use]
    pub const fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Tuning the simulation was created with.
    #[must_use]
    pub const fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    /// Multiplies the current speed by `factor`.
    pub fn apply_penalty(&mut self, factor: f32) {
        self.state.speed *= factor;
    }

    /// Advances the car by one normalized step.
    pub fn step(
        &mut self,
        intents: InputIntents,
        dt: f32,
        obstacles: ObstacleView<'_>,
        traffic: &TrafficView,
    ) -> VehicleStepOutcome {
        let tuning = self.tuning;
        let state = &mut self.state;
        let drifting = intents.drift && state.speed.abs() > tuning.drift_min_speed;

        state.speed = longitudinal(&tuning, state.speed, intents, drifting, dt);
        if drifting {
            state.speed *= tuning.drift_decay.powf(dt);
        }

        let steering = intents.steering();
        if steering != 0.0 {
            let speed_factor = state.speed.abs().min(1.0);
            let direction = if state.speed > 0.0 {
                1.0
            } else if state.speed < 0.0 {
                -1.0
            } else {
                0.0
            };
            let multiplier = if drifting {
                tuning.drift_turn_multiplier
            } else {
                1.0
            };
            state.heading += steering * tuning.turn_rate * speed_factor * direction * multiplier * dt;
        }

        let candidate = state.position + forward_vector(state.heading) * state.speed * dt;
        let collision = if obstacles.building_at(candidate).is_some() {
            Some(CollisionKind::Building)
        } else if obstacles.prop_at(candidate, tuning.circle_epsilon).is_some() {
            Some(CollisionKind::Prop)
        } else if traffic.is_near_any_agent(candidate, tuning.traffic_radius) {
            Some(CollisionKind::Traffic)
        } else {
            None
        };

        match collision {
            Some(_) => state.speed *= tuning.bounce,
            None => state.position = candidate,
        }

        let bound = Vec2::splat(tuning.world_half_extent);
        state.position = state.position.clamp(-bound, bound);

        let lean_target = if drifting {
            -steering * tuning.drift_lean
        } else {
            -steering * tuning.steer_lean
        };
        let blend = (tuning.lean_smoothing * dt).min(1.0);
        state.lean += (lean_target - state.lean) * blend;
        state.is_drifting = drifting;

        VehicleStepOutcome {
            collision,
            display_speed: (state.speed.abs() * tuning.display_speed_scale).round() as u32,
            drifting,
        }
    }
}

fn longitudinal(
    tuning: &VehicleTuning,
    speed: f32,
    intents: InputIntents,
    drifting: bool,
    dt: f32,
) -> f32 {
    if intents.accelerate {
        return (speed + tuning.acceleration * dt).min(tuning.max_speed);
    }
    if intents.brake {
        return (speed - tuning.brake * dt).max(tuning.reverse_max);
    }

    let friction = if drifting {
        tuning.drift_friction
    } else {
        tuning.friction
    };
    if speed > 0.0 {
        (speed - friction * dt).max(0.0)
    } else if speed < 0.0 {
        (speed + friction * dt).min(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulation(speed: f32) -> VehicleSimulation {
        VehicleSimulation::with_state(
            VehicleTuning::default(),
            VehicleState {
                speed,
                ..VehicleState::default()
            },
        )
    }

    #[test]
    fn accelerate_wins_over_brake() {
        let mut car = simulation(0.0);
        let intents = InputIntents {
            accelerate: true,
            brake: true,
            ..InputIntents::default()
        };
        let _ = car.step(intents, 1.0, ObstacleView::empty(), &TrafficView::default());
        assert!((car.state().speed - 0.035).abs() < 1e-6);
    }

    #[test]
    fn reversing_inverts_steering() {
        let mut forward = simulation(0.5);
        let mut backward = simulation(-0.3);
        let left = InputIntents {
            steer_left: true,
            ..InputIntents::default()
        };
        let _ = forward.step(left, 1.0, ObstacleView::empty(), &TrafficView::default());
        let _ = backward.step(left, 1.0, ObstacleView::empty(), &TrafficView::default());
        assert!(forward.state().heading > 0.0);
        assert!(backward.state().heading < 0.0);
    }

    #[test]
    fn steering_at_rest_does_not_turn() {
        let mut car = simulation(0.0);
        let left = InputIntents {
            steer_left: true,
            ..InputIntents::default()
        };
        let _ = car.step(left, 1.0, ObstacleView::empty(), &TrafficView::default());
        assert_eq!(car.state().heading, 0.0);
    }

    #[test]
    fn drift_needs_minimum_speed() {
        let drift = InputIntents {
            drift: true,
            steer_left: true,
            ..InputIntents::default()
        };
        let mut slow = simulation(0.2);
        let slow_outcome = slow.step(drift, 1.0, ObstacleView::empty(), &TrafficView::default());
        assert!(!slow_outcome.drifting);

        let mut fast = simulation(1.0);
        let mut grip = simulation(1.0);
        let fast_outcome = fast.step(drift, 1.0, ObstacleView::empty(), &TrafficView::default());
        let _ = grip.step(
            InputIntents {
                steer_left: true,
                ..InputIntents::default()
            },
            1.0,
            ObstacleView::empty(),
            &TrafficView::default(),
        );
        assert!(fast_outcome.drifting);
        assert!(fast.state().is_drifting);
        assert!(fast.state().heading > grip.state().heading * 2.0);
        let expected = (1.0 - 0.006) * 0.985;
        assert!((fast.state().speed - expected).abs() < 1e-6);
    }

    #[test]
    fn lean_approaches_target_gradually() {
        let mut car = simulation(1.0);
        let right = InputIntents {
            steer_right: true,
            accelerate: true,
            ..InputIntents::default()
        };
        let _ = car.step(right, 1.0, ObstacleView::empty(), &TrafficView::default());
        let first = car.state().lean;
        assert!((first - 0.08 * 0.15).abs() < 1e-6);
        for _ in 0..200 {
            let _ = car.step(right, 1.0, ObstacleView::empty(), &TrafficView::default());
        }
        assert!((car.state().lean - 0.08).abs() < 1e-3);
    }

    #[test]
    fn position_is_clamped_to_world_bound() {
        let mut car = VehicleSimulation::with_state(
            VehicleTuning::default(),
            VehicleState {
                position: Vec2::new(0.0, 379.5),
                speed: 1.2,
                ..VehicleState::default()
            },
        );
        let outcome = car.step(
            InputIntents {
                accelerate: true,
                ..InputIntents::default()
            },
            1.0,
            ObstacleView::empty(),
            &TrafficView::default(),
        );
        assert_eq!(car.state().position.y, 380.0);
        assert_eq!(outcome.collision, None);
        assert!((car.state().speed - 1.2).abs() < 1e-6);
    }

    #[test]
    fn display_speed_is_scaled_and_rounded() {
        let mut car = simulation(-0.4);
        let outcome = car.step(
            InputIntents {
                brake: true,
                ..InputIntents::default()
            },
            1.0,
            ObstacleView::empty(),
            &TrafficView::default(),
        );
        assert_eq!(outcome.display_speed, 32);
    }

    #[test]
    fn penalty_scales_speed() {
        let mut car = simulation(1.0);
        car.apply_penalty(-0.5);
        assert_eq!(car.state().speed, -0.5);
    }
}
