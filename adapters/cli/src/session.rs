//! Bridges the simulation to the rendering contracts.

use std::time::Duration;

use midnight_drive_core::{Command, InputIntents, WINDOW_TITLE};
use midnight_drive_rendering::{
    AudioGate, Color, FrameInput, Hud, Presentation, PursuerPresentation, Scene, SceneLighting,
    TopDownSurface,
};
use midnight_drive_simulation::{FrameReport, Simulation};
use midnight_drive_world::query;

const GROUND: Color = Color::from_rgb_u8(52, 70, 48);
const HEADLESS_FRAME: Duration = Duration::from_micros(16_667);

/// Builds the window descriptor with the static city of `simulation`.
pub(crate) fn presentation(simulation: &Simulation) -> Presentation {
    let geometry = query::geometry(simulation.world());
    let surfaces = geometry
        .surfaces()
        .iter()
        .map(TopDownSurface::from_batched)
        .collect();
    let lamps = geometry.lamps().iter().map(|lamp| lamp.center()).collect();
    let scene = Scene::new(
        surfaces,
        lamps,
        geometry.signal_posts().to_vec(),
        geometry.roads().to_vec(),
    );
    Presentation::new(WINDOW_TITLE, GROUND, scene)
}

/// Owns the simulation while a window is open.
#[derive(Debug)]
pub(crate) struct SessionDriver {
    simulation: Simulation,
    audio: AudioGate,
}

impl SessionDriver {
    pub(crate) fn new(simulation: Simulation) -> Self {
        Self {
            simulation,
            audio: AudioGate::new(),
        }
    }

    /// Applies the frame's toggles, advances one frame and refreshes `scene`.
    pub(crate) fn advance(&mut self, elapsed: Duration, input: FrameInput, scene: &mut Scene) {
        if self.audio.observe(&input) {
            tracing::debug!("audio unlocked");
        }
        if input.toggle_night {
            self.simulation.submit(Command::ToggleNight);
        }
        if input.toggle_rain {
            self.simulation.submit(Command::ToggleRain);
        }
        if input.cycle_camera {
            let _ = self.simulation.cycle_camera();
        }

        let report = self.simulation.frame(elapsed, input.intents);
        for cue in self.audio.admit(&report.events) {
            tracing::debug!(?cue, "audio cue");
        }
        populate_scene(scene, &report, &self.simulation);
    }
}

/// Copies the observable outcome of a frame into the scene.
fn populate_scene(scene: &mut Scene, report: &FrameReport, simulation: &Simulation) {
    let minimap = simulation.minimap();
    scene.player = report.pose;
    scene.traffic = minimap.traffic;
    scene.pursuer = minimap.pursuer.map(|_| {
        let snapshot = simulation.pursuer();
        PursuerPresentation {
            position: snapshot.position,
            facing: snapshot.facing,
            bob: snapshot.bob,
            arm_swing: snapshot.arm_swing,
            glow: snapshot.glow,
        }
    });
    scene.lighting = SceneLighting::from_lighting(&report.lighting);
    scene.signals = report.signals;
    scene.road_wetness = report.road_wetness;
    scene.hud = Hud {
        display_speed: report.display_speed,
        pursuer_distance: report.pursuer_distance,
        is_night: report.is_night,
        is_raining: report.is_raining,
        drifting: report.drifting,
        camera: report.camera,
    };
    scene.crash_flash.advance(report.step.sec);
    if report.collided() {
        scene.crash_flash.trigger();
    }
}

/// Totals gathered over a headless run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct HeadlessSummary {
    pub(crate) frames: u64,
    pub(crate) collisions: u64,
    pub(crate) pursuer_hits: u64,
    pub(crate) top_display_speed: u32,
    pub(crate) distance_travelled: f32,
}

/// Scripted input for headless frame `index`.
fn scripted_intents(index: u64) -> InputIntents {
    InputIntents {
        accelerate: true,
        steer_left: (index / 120) % 3 == 1,
        steer_right: (index / 120) % 3 == 2,
        drift: index % 240 >= 200,
        ..InputIntents::default()
    }
}

/// Drives `frames` scripted frames at 60 Hz; night falls halfway through.
pub(crate) fn run_headless(mut simulation: Simulation, frames: u64) -> HeadlessSummary {
    let mut summary = HeadlessSummary {
        frames,
        ..HeadlessSummary::default()
    };
    let mut previous = simulation.vehicle().position;
    for index in 0..frames {
        if index == frames / 2 {
            simulation.submit(Command::SetNight { enabled: true });
        }
        let report = simulation.frame(HEADLESS_FRAME, scripted_intents(index));
        if report.collided() {
            summary.collisions += 1;
        }
        if report.pursuer_struck {
            summary.pursuer_hits += 1;
        }
        summary.top_display_speed = summary.top_display_speed.max(report.display_speed);
        summary.distance_travelled += report.pose.position.distance(previous);
        previous = report.pose.position;
    }
    summary
}
