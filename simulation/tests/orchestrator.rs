use std::time::Duration;

use midnight_drive_core::{
    CameraMode, Command, Event, InputIntents, SignalIntensities, SignalPhase,
};
use midnight_drive_simulation::{Simulation, SimulationConfig};
use midnight_drive_world::{query, Lighting, WorldConfig, RAIN_WETNESS};

const FRAME: Duration = Duration::from_nanos(16_666_667);

fn config() -> SimulationConfig {
    SimulationConfig {
        world: WorldConfig {
            building_target: 30,
            tree_target: 40,
            furniture_target: 5,
            ..WorldConfig::default()
        },
        ..SimulationConfig::default()
    }
}

fn simulation() -> Simulation {
    Simulation::new(config()).expect("simulation builds")
}

#[test]
fn nightfall_spawns_the_pursuer_exactly_once() {
    let mut sim = simulation();
    assert!(sim.minimap().pursuer.is_none());

    sim.submit(Command::SetNight { enabled: true });
    let first = sim.frame(FRAME, InputIntents::default());
    assert!(first.is_night);
    assert!(first.events.contains(&Event::NightFell));
    assert_eq!(first.pursuer_distance, Some(60));

    let mut spawns = first
        .events
        .iter()
        .filter(|event| matches!(event, Event::PursuerSpawned { .. }))
        .count();
    for _ in 0..60 {
        let report = sim.frame(FRAME, InputIntents::default());
        spawns += report
            .events
            .iter()
            .filter(|event| matches!(event, Event::PursuerSpawned { .. }))
            .count();
    }
    assert_eq!(spawns, 1);
    assert!(sim.minimap().pursuer.is_some());

    sim.submit(Command::SetNight { enabled: false });
    let day = sim.frame(FRAME, InputIntents::default());
    assert!(day.events.contains(&Event::PursuerDespawned));
    assert_eq!(day.pursuer_distance, None);
    assert!(sim.minimap().pursuer.is_none());
}

#[test]
fn pursuer_hits_are_rate_limited_by_cooldown() {
    let mut sim = simulation();
    sim.submit(Command::SetNight { enabled: true });

    let mut hits = Vec::new();
    for _ in 0..700 {
        let report = sim.frame(FRAME, InputIntents::default());
        if report.pursuer_struck {
            assert!(report
                .events
                .iter()
                .any(|event| matches!(event, Event::PursuerStruck { .. })));
            hits.push(report.frame_index);
        }
    }

    assert!(hits.len() >= 2, "expected repeated hits, got {hits:?}");
    for pair in hits.windows(2) {
        assert!(pair[1] - pair[0] >= 119, "hits too close: {hits:?}");
    }
}

#[test]
fn pursuer_distance_is_measured_from_the_updated_pose() {
    let mut sim = simulation();
    sim.submit(Command::SetNight { enabled: true });
    let throttle = InputIntents {
        accelerate: true,
        ..InputIntents::default()
    };
    for _ in 0..20 {
        let report = sim.frame(FRAME, throttle);
        let pursuer = sim.pursuer().position;
        let expected = pursuer.distance(report.pose.position).round() as u32;
        assert_eq!(report.pursuer_distance, Some(expected));
        assert_eq!(report.pose.position, sim.vehicle().position);
    }
}

#[test]
fn rain_toggle_wets_roads_and_dims_lighting() {
    let mut sim = simulation();
    sim.submit(Command::ToggleRain);
    let report = sim.frame(FRAME, InputIntents::default());
    assert!(report.is_raining);
    assert!(report.audio.is_raining);
    assert!(report.events.contains(&Event::RainStarted));
    assert_eq!(report.road_wetness, RAIN_WETNESS);
    assert_eq!(report.lighting, Lighting::from_flags(false, true));

    sim.submit(Command::ToggleRain);
    let report = sim.frame(FRAME, InputIntents::default());
    assert_eq!(report.road_wetness, 0.0);
}

#[test]
fn signal_phase_advances_with_real_time() {
    let mut sim = simulation();
    let half_second = Duration::from_millis(500);
    let mut changes = Vec::new();
    for _ in 0..12 {
        let report = sim.frame(half_second, InputIntents::default());
        assert_eq!(report.step.dt, 3.0);
        for event in &report.events {
            if let Event::SignalPhaseChanged { phase } = event {
                changes.push(*phase);
            }
        }
    }
    assert_eq!(
        changes,
        vec![SignalPhase::Yellow, SignalPhase::Red, SignalPhase::Green]
    );
    assert_eq!(query::signal_phase(sim.world()), SignalPhase::Green);

    let report = sim.frame(Duration::from_millis(2_800), InputIntents::default());
    assert_eq!(
        report.signals,
        SignalIntensities::for_phase(SignalPhase::Yellow)
    );
}

#[test]
fn camera_cycles_through_presets() {
    let mut sim = simulation();
    assert_eq!(sim.camera(), CameraMode::Chase);
    assert_eq!(sim.cycle_camera(), CameraMode::Aerial);
    let report = sim.frame(FRAME, InputIntents::default());
    assert_eq!(report.camera, CameraMode::Aerial);
    let _ = sim.cycle_camera();
    assert_eq!(sim.cycle_camera(), CameraMode::Chase);
}

#[test]
fn driving_into_a_building_reports_a_collision() {
    let mut sim = simulation();
    let target = query::geometry(sim.world()).buildings()[0];
    sim.place_vehicle(
        midnight_drive_core::Vec2::new(target.x, target.z - target.half_depth - 6.0),
        0.0,
    );
    let throttle = InputIntents {
        accelerate: true,
        ..InputIntents::default()
    };

    let mut collision = None;
    for _ in 0..120 {
        let report = sim.frame(FRAME, throttle);
        assert!(!target.strictly_contains(report.pose.position));
        if let Some(kind) = report.collision {
            assert!(report.events.contains(&Event::VehicleCollided { kind }));
            collision = Some(kind);
            break;
        }
    }
    assert!(collision.is_some());
}

#[test]
fn minimap_lists_roads_and_traffic() {
    let sim = simulation();
    let minimap = sim.minimap();
    assert_eq!(minimap.roads.len(), 14);
    assert_eq!(minimap.traffic.len(), 24);
    assert_eq!(minimap.player.position, midnight_drive_core::Vec2::ZERO);
}
