#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for Midnight Drive.
//!
//! The world owns the static city produced by the builder, the global
//! environment flags, and the render-facing surface state. Environment
//! mutations flow exclusively through [`apply`]; read access goes through the
//! [`query`] module.

mod builder;
mod environment;
pub mod mesh;
mod placement;
mod roads;

pub use builder::{
    build, build_with_budget, WorldBuildError, WorldConfig, WorldGeometry, DEFAULT_WORLD_SEED,
};
pub use environment::{Environment, Lighting, SurfaceState, RAIN_WETNESS};
pub use placement::{
    BUILDING_CLEARANCE, LAMP_RADIUS, LAMP_ROAD_MARGIN, ROAD_MARGIN, TREE_RADIUS,
};
pub use roads::{RoadNetwork, ROAD_WIDTH};

use midnight_drive_core::{Command, Event};

/// Represents the authoritative Midnight Drive world state.
#[derive(Debug)]
pub struct World {
    geometry: WorldGeometry,
    environment: Environment,
    surfaces: SurfaceState,
}

impl World {
    /// Builds the city described by `config` and starts in clear daylight.
    pub fn new(config: &WorldConfig) -> Result<Self, WorldBuildError> {
        Ok(Self::from_geometry(build(config)?))
    }

    /// Wraps an already built city.
    #[must_use]
    pub fn from_geometry(geometry: WorldGeometry) -> Self {
        let environment = Environment::default();
        let surfaces = SurfaceState::from_environment(&environment);
        Self {
            geometry,
            environment,
            surfaces,
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    let environment = &mut world.environment;
    match command {
        Command::SetNight { enabled } => environment.set_night(enabled, out_events),
        Command::SetRaining { enabled } => environment.set_raining(enabled, out_events),
        Command::ToggleNight => {
            let enabled = !environment.is_night();
            environment.set_night(enabled, out_events);
        }
        Command::ToggleRain => {
            let enabled = !environment.is_raining();
            environment.set_raining(enabled, out_events);
        }
        Command::Tick { elapsed } => environment.advance(elapsed, out_events),
    }
}

/// Rewrites the shared surface state from the environment and derives lighting.
///
/// This is the only writer of [`SurfaceState`] after construction.
pub fn refresh_surfaces(world: &mut World) -> Lighting {
    world.surfaces = SurfaceState::from_environment(&world.environment);
    Lighting::from_flags(world.environment.is_night(), world.environment.is_raining())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use midnight_drive_core::{ObstacleView, RoadRect, SignalPhase};

    use super::{Environment, SurfaceState, World, WorldGeometry};

    /// Static city geometry.
    #[must_use]
    pub fn geometry(world: &World) -> &WorldGeometry {
        &world.geometry
    }

    /// Road rectangles in declaration order.
    #[must_use]
    pub fn roads(world: &World) -> &[RoadRect] {
        world.geometry.roads()
    }

    /// Collision view over buildings, trees and lamps.
    #[must_use]
    pub fn obstacles(world: &World) -> ObstacleView<'_> {
        world.geometry.obstacles()
    }

    /// Current environment flags and signal clock.
    #[must_use]
    pub fn environment(world: &World) -> &Environment {
        &world.environment
    }

    /// Reports whether night is active.
    #[must_use]
    pub fn is_night(world: &World) -> bool {
        world.environment.is_night()
    }

    /// Reports whether rain is falling.
    #[must_use]
    pub fn is_raining(world: &World) -> bool {
        world.environment.is_raining()
    }

    /// Phase currently shown by every signal.
    #[must_use]
    pub fn signal_phase(world: &World) -> SignalPhase {
        world.environment.signal_phase()
    }

    /// Surface state as of the last refresh.
    #[must_use]
    pub fn surfaces(world: &World) -> SurfaceState {
        world.surfaces
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use midnight_drive_core::{SignalIntensities, SignalPhase};

    use super::*;

    fn small_world() -> World {
        World::new(&WorldConfig {
            building_target: 20,
            tree_target: 20,
            furniture_target: 5,
            ..WorldConfig::default()
        })
        .expect("world builds")
    }

    #[test]
    fn world_starts_in_clear_daylight() {
        let world = small_world();
        assert!(!query::is_night(&world));
        assert!(!query::is_raining(&world));
        assert_eq!(query::signal_phase(&world), SignalPhase::Green);
        assert_eq!(query::surfaces(&world).road_wetness, 0.0);
    }

    #[test]
    fn toggles_invert_flags() {
        let mut world = small_world();
        let mut events = Vec::new();
        apply(&mut world, Command::ToggleNight, &mut events);
        apply(&mut world, Command::ToggleRain, &mut events);
        apply(&mut world, Command::ToggleNight, &mut events);
        assert_eq!(
            events,
            vec![Event::NightFell, Event::RainStarted, Event::DayBroke]
        );
        assert!(query::is_raining(&world));
    }

    #[test]
    fn surfaces_change_only_on_refresh() {
        let mut world = small_world();
        let mut events = Vec::new();
        apply(&mut world, Command::SetRaining { enabled: true }, &mut events);
        apply(
            &mut world,
            Command::Tick {
                elapsed: Duration::from_secs(4),
            },
            &mut events,
        );
        assert_eq!(query::surfaces(&world).road_wetness, 0.0);

        let lighting = refresh_surfaces(&mut world);
        let surfaces = query::surfaces(&world);
        assert_eq!(surfaces.road_wetness, RAIN_WETNESS);
        assert_eq!(surfaces.signals, SignalIntensities::for_phase(SignalPhase::Red));
        assert_eq!(lighting, Lighting::from_flags(false, true));
    }

    #[test]
    fn misconfigured_roads_fail_before_any_frame() {
        let config = WorldConfig {
            road_network: RoadNetwork::new(Vec::new()),
            ..WorldConfig::default()
        };
        assert!(matches!(
            World::new(&config),
            Err(WorldBuildError::EmptyRoadNetwork)
        ));
    }
}
