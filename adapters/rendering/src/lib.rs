#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Midnight Drive adapters.
//!
//! Backends receive a [`Presentation`] describing the static city and mutate a
//! [`Scene`] once per frame from the simulation output. Everything here is
//! backend agnostic; drawing lives in the adapter crates.

mod audio;

use std::time::Duration;

use anyhow::Result as AnyResult;
use glam::{Vec2, Vec3};
use midnight_drive_core::{
    CameraMode, InputIntents, RoadRect, SignalIntensities, SignalPhase, TrafficSnapshot,
    VehiclePose,
};
use midnight_drive_world::{mesh::BatchedSurface, mesh::Material, Lighting};
use thiserror::Error;

pub use audio::{AudioCue, AudioGate};

/// Seconds the crash tint stays visible after a collision.
pub const CRASH_FLASH_SECONDS: f32 = 0.3;

/// Opacity of the crash tint at the moment of impact.
pub const CRASH_FLASH_PEAK_ALPHA: f32 = 0.45;

/// Vertex normals with a vertical component above this value face the sky.
const UP_FACING_THRESHOLD: f32 = 0.25;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Creates an opaque color from linear RGB channels.
    #[must_use]
    pub fn from_linear(rgb: Vec3) -> Self {
        Self::new(
            rgb.x.clamp(0.0, 1.0),
            rgb.y.clamp(0.0, 1.0),
            rgb.z.clamp(0.0, 1.0),
            1.0,
        )
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Returns the color with every RGB channel multiplied by `factor`.
    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        let factor = factor.max(0.0);
        Self {
            red: (self.red * factor).min(1.0),
            green: (self.green * factor).min(1.0),
            blue: (self.blue * factor).min(1.0),
            alpha: self.alpha,
        }
    }

    /// Returns the color with the provided opacity.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    /// Linear blend towards `other`; `amount` is clamped to 0.0..=1.0.
    #[must_use]
    pub fn mix(self, other: Color, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let blend = |from: f32, to: f32| from + (to - from) * amount;
        Self {
            red: blend(self.red, other.red),
            green: blend(self.green, other.green),
            blue: blend(self.blue, other.blue),
            alpha: blend(self.alpha, other.alpha),
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Base daylight colour of a material.
#[must_use]
pub const fn material_color(material: Material) -> Color {
    match material {
        Material::Sidewalk => Color::from_rgb_u8(150, 150, 146),
        Material::Asphalt => Color::from_rgb_u8(46, 48, 52),
        Material::LaneMarking => Color::from_rgb_u8(232, 226, 196),
        Material::Furniture => Color::from_rgb_u8(120, 84, 52),
        Material::TreeTrunk => Color::from_rgb_u8(96, 66, 40),
        Material::Door => Color::from_rgb_u8(70, 44, 30),
        Material::FacadeConcrete => Color::from_rgb_u8(160, 160, 166),
        Material::FacadeBrick => Color::from_rgb_u8(150, 76, 58),
        Material::FacadeSteel => Color::from_rgb_u8(92, 110, 130),
        Material::Window => Color::from_rgb_u8(255, 214, 130),
        Material::Ledge => Color::from_rgb_u8(110, 110, 114),
        Material::Rooftop => Color::from_rgb_u8(78, 80, 84),
        Material::LampPole => Color::from_rgb_u8(60, 62, 66),
        Material::LampHead => Color::from_rgb_u8(255, 236, 180),
        Material::SignalPole => Color::from_rgb_u8(40, 42, 44),
        Material::SignalRed => Color::from_rgb_u8(235, 40, 36),
        Material::SignalYellow => Color::from_rgb_u8(245, 190, 40),
        Material::SignalGreen => Color::from_rgb_u8(40, 220, 90),
        Material::TreeFoliage => Color::from_rgb_u8(44, 110, 52),
    }
}

const TRAFFIC_PALETTE: [Color; 6] = [
    Color::from_rgb_u8(200, 40, 44),
    Color::from_rgb_u8(36, 92, 200),
    Color::from_rgb_u8(230, 230, 226),
    Color::from_rgb_u8(24, 24, 28),
    Color::from_rgb_u8(236, 184, 30),
    Color::from_rgb_u8(60, 150, 90),
];

/// Body colour for a traffic agent palette index.
#[must_use]
pub fn traffic_color(color_index: u8) -> Color {
    TRAFFIC_PALETTE[usize::from(color_index) % TRAFFIC_PALETTE.len()]
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FrameInput {
    /// Driving intents held this frame.
    pub intents: InputIntents,
    /// The night toggle was pressed this frame.
    pub toggle_night: bool,
    /// The rain toggle was pressed this frame.
    pub toggle_rain: bool,
    /// The camera toggle was pressed this frame.
    pub cycle_camera: bool,
    /// Any key or button was pressed this frame.
    pub any_gesture: bool,
}

/// Up-facing triangles of one batched surface projected onto the ground plane.
#[derive(Clone, Debug, PartialEq)]
pub struct TopDownSurface {
    material: Material,
    triangles: Vec<[Vec2; 3]>,
}

impl TopDownSurface {
    /// Flattens the triangles whose vertex normals all face the sky.
    ///
    /// The ground-plane `y` coordinate carries the world Z axis.
    #[must_use]
    pub fn from_batched(surface: &BatchedSurface) -> Self {
        let mesh = surface.mesh();
        let triangles = mesh
            .indices
            .chunks_exact(3)
            .filter(|triangle| {
                triangle
                    .iter()
                    .all(|&index| mesh.normals[index as usize].y > UP_FACING_THRESHOLD)
            })
            .map(|triangle| {
                let flat = |index: u32| {
                    let position = mesh.positions[index as usize];
                    Vec2::new(position.x, position.z)
                };
                [flat(triangle[0]), flat(triangle[1]), flat(triangle[2])]
            })
            .collect();

        Self {
            material: surface.material(),
            triangles,
        }
    }

    /// Material shared by every triangle.
    #[must_use]
    pub const fn material(&self) -> Material {
        self.material
    }

    /// Flattened triangles.
    #[must_use]
    pub fn triangles(&self) -> &[[Vec2; 3]] {
        &self.triangles
    }
}

/// Screen colours derived from the environment lighting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneLighting {
    /// Colour the frame is cleared to.
    pub sky: Color,
    /// Colour distant geometry fades towards.
    pub fog: Color,
    /// Opacity of the fog veil drawn over the ground plane.
    pub haze: f32,
    /// Brightness applied to lit materials.
    pub brightness: f32,
    /// Emission strength of lamps and windows.
    pub lamps: f32,
}

impl SceneLighting {
    /// Converts simulation lighting into screen colours.
    #[must_use]
    pub fn from_lighting(lighting: &Lighting) -> Self {
        Self {
            sky: Color::from_linear(lighting.sky_color),
            fog: Color::from_linear(lighting.fog_color),
            haze: (lighting.fog_density * 40.0).min(0.5),
            brightness: (lighting.ambient + lighting.sun * 0.4).min(1.0),
            lamps: lighting.lamps,
        }
    }

    /// Colour of `material` under this lighting.
    #[must_use]
    pub fn shade(&self, material: Material) -> Color {
        let base = material_color(material);
        let factor = if material.is_emissive() {
            self.brightness.max(self.lamps)
        } else {
            self.brightness
        };
        base.scale(factor)
    }
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self::from_lighting(&Lighting::from_flags(false, false))
    }
}

/// Pursuer state needed to draw it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PursuerPresentation {
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
}

/// Values shown in the heads-up display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Hud {
    /// Speed in presentation units.
    pub display_speed: u32,
    /// Rounded pursuer distance while it hunts.
    pub pursuer_distance: Option<u32>,
    /// Whether night is active.
    pub is_night: bool,
    /// Whether rain is falling.
    pub is_raining: bool,
    /// Whether the car is drifting.
    pub drifting: bool,
    /// Selected camera preset.
    pub camera: CameraMode,
}

impl Hud {
    /// Text lines in display order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{} km/h", self.display_speed)];
        let mut conditions = String::from(if self.is_night { "Night" } else { "Day" });
        if self.is_raining {
            conditions.push_str(", rain");
        }
        lines.push(conditions);
        if let Some(distance) = self.pursuer_distance {
            lines.push(format!("Something follows: {distance} m"));
        }
        if self.drifting {
            lines.push(String::from("DRIFT"));
        }
        lines.push(format!("Camera: {}", camera_label(self.camera)));
        lines
    }
}

fn camera_label(mode: CameraMode) -> &'static str {
    match mode {
        CameraMode::Chase => "chase",
        CameraMode::Aerial => "aerial",
        CameraMode::Cockpit => "cockpit",
    }
}

/// Top-down view parameters for one camera mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPreset {
    /// Screen pixels per world unit.
    pub pixels_per_unit: f32,
    /// Whether the view rotates so the car always points up.
    pub follow_heading: bool,
    /// World units the view is shifted ahead of the car.
    pub look_ahead: f32,
}

impl CameraPreset {
    /// Preset used for `mode`.
    #[must_use]
    pub const fn for_mode(mode: CameraMode) -> Self {
        match mode {
            CameraMode::Chase => Self {
                pixels_per_unit: 3.0,
                follow_heading: true,
                look_ahead: 20.0,
            },
            CameraMode::Aerial => Self {
                pixels_per_unit: 0.9,
                follow_heading: false,
                look_ahead: 0.0,
            },
            CameraMode::Cockpit => Self {
                pixels_per_unit: 6.0,
                follow_heading: true,
                look_ahead: 35.0,
            },
        }
    }
}

/// Full-screen tint raised by a collision that fades out over time.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct CrashFlash {
    remaining: f32,
}

impl CrashFlash {
    /// Restarts the fade at full strength.
    pub fn trigger(&mut self) {
        self.remaining = CRASH_FLASH_SECONDS;
    }

    /// Advances the fade by real seconds.
    pub fn advance(&mut self, sec: f32) {
        self.remaining = (self.remaining - sec.max(0.0)).max(0.0);
    }

    /// Current opacity of the tint.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        CRASH_FLASH_PEAK_ALPHA * self.remaining / CRASH_FLASH_SECONDS
    }

    /// Reports whether the tint should be drawn.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.remaining > 0.0
    }
}

/// Maps world positions onto a square minimap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinimapProjection {
    size: f32,
    world_half_extent: f32,
}

impl MinimapProjection {
    /// Creates a projection of a `2 * world_half_extent` wide square onto
    /// `size` pixels.
    pub fn new(size: f32, world_half_extent: f32) -> Result<Self, RenderingError> {
        if !(size > 0.0 && world_half_extent > 0.0) {
            return Err(RenderingError::InvalidMinimap {
                size,
                world_half_extent,
            });
        }
        Ok(Self {
            size,
            world_half_extent,
        })
    }

    /// Side length in pixels.
    #[must_use]
    pub const fn size(&self) -> f32 {
        self.size
    }

    /// Pixels per world unit.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.size / (2.0 * self.world_half_extent)
    }

    /// Minimap pixel for a world position, with +Z pointing up.
    ///
    /// Positions outside the mapped square are pinned to its border.
    #[must_use]
    pub fn project(&self, world: Vec2) -> Vec2 {
        let extent = self.world_half_extent;
        let clamped = world.clamp(Vec2::splat(-extent), Vec2::splat(extent));
        Vec2::new(clamped.x + extent, extent - clamped.y) * self.scale()
    }

    /// Top-left pixel and pixel size of a road rectangle.
    #[must_use]
    pub fn project_road(&self, road: &RoadRect) -> (Vec2, Vec2) {
        let half = Vec2::new(road.width, road.depth) * 0.5;
        let top_left = self.project(Vec2::new(road.center_x - half.x, road.center_z + half.y));
        let bottom_right = self.project(Vec2::new(road.center_x + half.x, road.center_z - half.y));
        (top_left, bottom_right - top_left)
    }
}

/// Mutable per-frame view of the city consumed by backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Static surfaces in draw order.
    pub surfaces: Vec<TopDownSurface>,
    /// Street-lamp positions, used for night glow.
    pub lamps: Vec<Vec2>,
    /// Signal-post positions.
    pub signal_posts: Vec<Vec2>,
    /// Road rectangles, used by the minimap.
    pub roads: Vec<RoadRect>,
    /// Player car pose.
    pub player: VehiclePose,
    /// Traffic agents in id order.
    pub traffic: Vec<TrafficSnapshot>,
    /// Pursuer while it hunts.
    pub pursuer: Option<PursuerPresentation>,
    /// Screen colours for the current environment.
    pub lighting: SceneLighting,
    /// Shared signal lens intensities.
    pub signals: SignalIntensities,
    /// Road-surface wetness.
    pub road_wetness: f32,
    /// Heads-up display values.
    pub hud: Hud,
    /// Collision tint.
    pub crash_flash: CrashFlash,
}

impl Scene {
    /// Creates a scene for a static city with the car parked at the origin.
    #[must_use]
    pub fn new(
        surfaces: Vec<TopDownSurface>,
        lamps: Vec<Vec2>,
        signal_posts: Vec<Vec2>,
        roads: Vec<RoadRect>,
    ) -> Self {
        Self {
            surfaces,
            lamps,
            signal_posts,
            roads,
            player: VehiclePose {
                position: Vec2::ZERO,
                heading: 0.0,
                lean: 0.0,
            },
            traffic: Vec::new(),
            pursuer: None,
            lighting: SceneLighting::default(),
            signals: SignalIntensities::for_phase(SignalPhase::Green),
            road_wetness: 0.0,
            hud: Hud::default(),
            crash_flash: CrashFlash::default(),
        }
    }

    /// Colour of `material` under the current lighting, signals and wetness.
    #[must_use]
    pub fn surface_color(&self, material: Material) -> Color {
        let shaded = self.lighting.shade(material);
        match material {
            Material::SignalRed => shaded.scale(self.signals.red),
            Material::SignalYellow => shaded.scale(self.signals.yellow),
            Material::SignalGreen => shaded.scale(self.signals.green),
            Material::Asphalt | Material::LaneMarking => {
                shaded.scale(1.0 - 0.35 * self.road_wetness)
            }
            _ => shaded,
        }
    }
}

/// Describes the elements that should be presented for the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used for the window.
    pub window_title: String,
    /// Background color used when clearing the frame.
    pub clear_color: Color,
    /// Scene content for the current frame.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Trait implemented by rendering backends capable of presenting Midnight Drive.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the real frame delta and
    /// the input captured by the adapter, and mutates the scene before it is
    /// drawn.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, Error, PartialEq)]
pub enum RenderingError {
    /// Minimap dimensions must be positive.
    #[error("minimap size ({size}) and world half extent ({world_half_extent}) must be positive")]
    InvalidMinimap {
        /// Requested side length in pixels.
        size: f32,
        /// Requested world half extent.
        world_half_extent: f32,
    },
}
