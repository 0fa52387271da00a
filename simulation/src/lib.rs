#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame orchestrator for Midnight Drive.
//!
//! [`Simulation::frame`] advances every component exactly once per rendered
//! frame in a fixed order:
//!
//! 1. derive the normalized step `dt` and the real seconds `sec`,
//! 2. step the player car against the static world and the traffic,
//! 3. tick the environment clocks with `sec`,
//! 4. move the traffic with `dt`,
//! 5. update the pursuer from the new player pose and apply hit penalties,
//! 6. refresh the shared surfaces and derive lighting,
//! 7. report everything presentation needs.
//!
//! Every component sees the same `dt` and `sec` within a frame.

mod config;

use std::time::Duration;

pub use config::{ConfigError, FrameTuning, SimulationConfig};

use midnight_drive_core::{
    CameraMode, CollisionKind, Command, Event, InputIntents, RoadRect, SignalIntensities,
    TrafficSnapshot, TrafficView, Vec2, VehiclePose,
};
use midnight_drive_system_pursuer::{Pursuer, PursuerSnapshot, PursuerTransition};
use midnight_drive_system_traffic::Traffic;
use midnight_drive_system_vehicle::{VehicleSimulation, VehicleState};
use midnight_drive_world::{self as world, query, Lighting, World, WorldBuildError};

/// Time step shared by every component during one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStep {
    /// Normalized step, one at the target frame rate, clamped to the maximum.
    pub dt: f32,
    /// Real seconds that elapsed, unclamped.
    pub sec: f32,
}

impl FrameStep {
    /// Derives the step from real elapsed time.
    #[must_use]
    pub fn from_elapsed(elapsed: Duration, target_fps: f32, max_step: f32) -> Self {
        let sec = elapsed.as_secs_f32();
        Self {
            dt: (sec * target_fps).clamp(0.0, max_step),
            sec,
        }
    }
}

/// Continuous parameters for ambient audio mixing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioParams {
    /// Magnitude of the car speed.
    pub speed: f32,
    /// Whether night is active.
    pub is_night: bool,
    /// Whether rain is falling.
    pub is_raining: bool,
    /// Distance to the pursuer while it is active.
    pub pursuer_distance: Option<f32>,
}

/// Externally observable outcome of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Zero-based index of the frame.
    pub frame_index: u64,
    /// Step used by every component this frame.
    pub step: FrameStep,
    /// Player pose after the frame.
    pub pose: VehiclePose,
    /// Speed in presentation units.
    pub display_speed: u32,
    /// Whether the car drifted this frame.
    pub drifting: bool,
    /// Obstacle category the car hit this frame.
    pub collision: Option<CollisionKind>,
    /// Rounded pursuer distance while the pursuer is active.
    pub pursuer_distance: Option<u32>,
    /// Whether the pursuer penalty was applied this frame.
    pub pursuer_struck: bool,
    /// Camera preset selected by the player.
    pub camera: CameraMode,
    /// Whether night is active.
    pub is_night: bool,
    /// Whether rain is falling.
    pub is_raining: bool,
    /// Lighting derived from the environment flags.
    pub lighting: Lighting,
    /// Shared traffic-signal lens intensities.
    pub signals: SignalIntensities,
    /// Road-surface wetness.
    pub road_wetness: f32,
    /// Parameters for the ambient mix.
    pub audio: AudioParams,
    /// Events raised since the previous report, including submitted toggles.
    pub events: Vec<Event>,
}

impl FrameReport {
    /// Reports whether the car hit anything this frame.
    #[must_use]
    pub const fn collided(&self) -> bool {
        self.collision.is_some()
    }
}

/// Positions consumed by a top-down minimap.
#[derive(Clone, Debug)]
pub struct MinimapSnapshot<'a> {
    /// Player pose.
    pub player: VehiclePose,
    /// Traffic agents in id order.
    pub traffic: Vec<TrafficSnapshot>,
    /// Pursuer position while it is active.
    pub pursuer: Option<Vec2>,
    /// Static road rectangles.
    pub roads: &'a [RoadRect],
}

/// Owns the world and every system of a session.
#[derive(Debug)]
pub struct Simulation {
    tuning: FrameTuning,
    world: World,
    vehicle: VehicleSimulation,
    traffic: Traffic,
    pursuer: Pursuer,
    camera: CameraMode,
    hit_cooldown: f32,
    frame_index: u64,
    pending_events: Vec<Event>,
}

impl Simulation {
    /// Builds the city, spawns traffic and places the car at the origin.
    pub fn new(config: SimulationConfig) -> Result<Self, WorldBuildError> {
        let world = World::new(&config.world)?;
        let traffic = Traffic::spawn(query::roads(&world), config.traffic);
        let vehicle = VehicleSimulation::with_state(
            config.vehicle,
            VehicleState::spawn_at(Vec2::ZERO, 0.0),
        );
        tracing::info!(
            seed = config.world.seed,
            traffic = traffic.len(),
            "simulation ready"
        );

        Ok(Self {
            tuning: config.frame,
            world,
            vehicle,
            traffic,
            pursuer: Pursuer::new(config.pursuer),
            camera: CameraMode::default(),
            hit_cooldown: 0.0,
            frame_index: 0,
            pending_events: Vec::new(),
        })
    }

    /// Applies an environment command immediately.
    ///
    /// Resulting events are delivered with the next frame report.
    pub fn submit(&mut self, command: Command) {
        world::apply(&mut self.world, command, &mut self.pending_events);
    }

    /// Switches to the next camera preset and returns it.
    pub fn cycle_camera(&mut self) -> CameraMode {
        self.camera = self.camera.next();
        self.camera
    }

    /// Advances the whole simulation by one rendered frame.
    pub fn frame(&mut self, elapsed: Duration, intents: InputIntents) -> FrameReport {
        let step = FrameStep::from_elapsed(elapsed, self.tuning.target_fps, self.tuning.max_step);
        let mut events = std::mem::take(&mut self.pending_events);

        let traffic_view = self.traffic.view();
        let outcome = self.vehicle.step(
            intents,
            step.dt,
            query::obstacles(&self.world),
            &traffic_view,
        );
        if let Some(kind) = outcome.collision {
            events.push(Event::VehicleCollided { kind });
        }

        world::apply(&mut self.world, Command::Tick { elapsed }, &mut events);

        self.traffic.step(step.dt);

        let pose = self.vehicle.state().pose();
        let is_night = query::is_night(&self.world);
        let report = self.pursuer.update(is_night, pose, step.dt, step.sec);
        match report.transition {
            Some(PursuerTransition::Spawned { position }) => {
                events.push(Event::PursuerSpawned { position });
            }
            Some(PursuerTransition::Despawned) => events.push(Event::PursuerDespawned),
            None => {}
        }
        self.hit_cooldown = (self.hit_cooldown - step.sec).max(0.0);
        let struck = report.within_hit_radius && self.hit_cooldown <= 0.0;
        if struck {
            self.vehicle.apply_penalty(self.tuning.pursuer_penalty);
            self.hit_cooldown = self.tuning.hit_cooldown_seconds;
            tracing::debug!(distance = report.distance_to_player, "pursuer struck the car");
            events.push(Event::PursuerStruck {
                distance: report.distance_to_player,
            });
        }

        let lighting = world::refresh_surfaces(&mut self.world);
        let surfaces = query::surfaces(&self.world);
        let is_raining = query::is_raining(&self.world);
        let state = self.vehicle.state();
        let pursuer_distance = self
            .pursuer
            .is_active()
            .then_some(report.distance_to_player);

        let frame_index = self.frame_index;
        self.frame_index += 1;

        FrameReport {
            frame_index,
            step,
            pose: state.pose(),
            display_speed: outcome.display_speed,
            drifting: outcome.drifting,
            collision: outcome.collision,
            pursuer_distance: pursuer_distance.map(|distance| distance.round() as u32),
            pursuer_struck: struck,
            camera: self.camera,
            is_night,
            is_raining,
            lighting,
            signals: surfaces.signals,
            road_wetness: surfaces.road_wetness,
            audio: AudioParams {
                speed: state.speed.abs(),
                is_night,
                is_raining,
                pursuer_distance,
            },
            events,
        }
    }

    /// Positions for the minimap.
    #[must_use]
    pub fn minimap(&self) -> MinimapSnapshot<'_> {
        MinimapSnapshot {
            player: self.vehicle.state().pose(),
            traffic: self.traffic.view().iter().copied().collect(),
            pursuer: self.pursuer.is_active().then(|| self.pursuer.position()),
            roads: query::roads(&self.world),
        }
    }

    /// The authoritative world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Current car state.
    #[must_use]
    pub fn vehicle(&self) -> &VehicleState {
        self.vehicle.state()
    }

    /// Read-only traffic view.
    #[must_use]
    pub fn traffic(&self) -> TrafficView {
        self.traffic.view()
    }

    /// Pursuer presentation snapshot.
    #[must_use]
    pub fn pursuer(&self) -> PursuerSnapshot {
        self.pursuer.snapshot()
    }

    /// Selected camera preset.
    #[must_use]
    pub const fn camera(&self) -> CameraMode {
        self.camera
    }

    /// Places the car, keeping its tuning.
    pub fn place_vehicle(&mut self, position: Vec2, heading: f32) {
        self.vehicle = VehicleSimulation::with_state(
            *self.vehicle.tuning(),
            VehicleState::spawn_at(position, heading),
        );
    }
}
