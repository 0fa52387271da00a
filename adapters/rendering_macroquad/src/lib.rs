#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Midnight Drive.
//!
//! The city is drawn top-down from the flattened surfaces of the scene, with
//! the camera mode selecting zoom and orientation. Macroquad's optional audio
//! stack depends on native ALSA development libraries, so the adapter depends
//! on macroquad without its default `audio` feature.

mod ui;

use self::ui::{draw_dashboard_ui, DashboardUiContext, DashboardUiResult};
use anyhow::{Context, Result};
use glam::Vec2;
use macroquad::math::Vec2 as MacroquadVec2;
use macroquad::input::{
    get_last_key_pressed, is_key_down, is_key_pressed, is_mouse_button_pressed, KeyCode,
    MouseButton,
};
use midnight_drive_core::{forward_vector, InputIntents, VehiclePose};
use midnight_drive_rendering::{
    traffic_color, CameraPreset, Color, FrameInput, MinimapProjection, Presentation,
    PursuerPresentation, RenderingBackend, Scene, TopDownSurface,
};
use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

const DEFAULT_WORLD_HALF_EXTENT: f32 = 380.0;
const MINIMAP_SIZE: f32 = 180.0;
const MINIMAP_MARGIN: f32 = 16.0;
const DASHBOARD_SIZE: f32 = 220.0;
const RAIN_STREAKS: usize = 220;

const PLAYER_BODY: Color = Color::from_rgb_u8(214, 36, 48);
const HEADLIGHT: Color = Color::new(1.0, 0.95, 0.75, 0.18);
const PURSUER_BODY: Color = Color::from_rgb_u8(12, 10, 14);
const PURSUER_EYES: Color = Color::from_rgb_u8(255, 40, 30);
const LAMP_GLOW: Color = Color::new(1.0, 0.86, 0.55, 0.22);
const RAIN: Color = Color::new(0.7, 0.78, 0.9, 0.35);
const CRASH_TINT: Color = Color::from_rgb_u8(255, 30, 20);
const DASHBOARD_BACKGROUND: Color = Color::new(0.05, 0.06, 0.1, 0.75);

/// Latches dashboard button presses so they are delivered with the next frame's input.
#[doc(hidden)]
#[derive(Clone, Copy, Debug, Default)]
pub struct ToggleLatch {
    night_latched: bool,
    rain_latched: bool,
    camera_latched: bool,
}

impl ToggleLatch {
    /// Returns whether a night toggle was registered and clears the latch.
    pub fn take_night(&mut self) -> bool {
        std::mem::take(&mut self.night_latched)
    }

    /// Returns whether a rain toggle was registered and clears the latch.
    pub fn take_rain(&mut self) -> bool {
        std::mem::take(&mut self.rain_latched)
    }

    /// Returns whether a camera toggle was registered and clears the latch.
    pub fn take_camera(&mut self) -> bool {
        std::mem::take(&mut self.camera_latched)
    }

    /// Records a night button press.
    pub fn register_night(&mut self) {
        self.night_latched = true;
    }

    /// Records a rain button press.
    pub fn register_rain(&mut self) {
        self.rain_latched = true;
    }

    /// Records a camera button press.
    pub fn register_camera(&mut self) {
        self.camera_latched = true;
    }

    fn register(&mut self, result: DashboardUiResult) {
        if result.night_pressed {
            self.register_night();
        }
        if result.rain_pressed {
            self.register_rain();
        }
        if result.camera_pressed {
            self.register_camera();
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct KeyboardShortcuts {
    /// `Escape` quits the game loop.
    quit_requested: bool,
    /// `N` toggles night.
    toggle_night: bool,
    /// `R` toggles rain.
    toggle_rain: bool,
    /// `C` cycles the camera.
    cycle_camera: bool,
    /// Any key or mouse button went down this frame.
    any_gesture: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        Self {
            quit_requested: is_key_pressed(KeyCode::Escape),
            toggle_night: is_key_pressed(KeyCode::N),
            toggle_rain: is_key_pressed(KeyCode::R),
            cycle_camera: is_key_pressed(KeyCode::C),
            any_gesture: get_last_key_pressed().is_some()
                || is_mouse_button_pressed(MouseButton::Left),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct HeldKeys {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
    space: bool,
}

impl HeldKeys {
    fn poll() -> Self {
        Self {
            up: is_key_down(KeyCode::Up) || is_key_down(KeyCode::W),
            down: is_key_down(KeyCode::Down) || is_key_down(KeyCode::S),
            left: is_key_down(KeyCode::Left) || is_key_down(KeyCode::A),
            right: is_key_down(KeyCode::Right) || is_key_down(KeyCode::D),
            space: is_key_down(KeyCode::Space),
        }
    }

    fn intents(self) -> InputIntents {
        InputIntents {
            accelerate: self.up,
            brake: self.down,
            steer_left: self.left,
            steer_right: self.right,
            drift: self.space,
        }
    }
}

fn gather_frame_input(
    keyboard: KeyboardShortcuts,
    held: HeldKeys,
    latch: &mut ToggleLatch,
) -> FrameInput {
    let night = latch.take_night();
    let rain = latch.take_rain();
    let camera = latch.take_camera();
    FrameInput {
        intents: held.intents(),
        toggle_night: keyboard.toggle_night || night,
        toggle_rain: keyboard.toggle_rain || rain,
        cycle_camera: keyboard.cycle_camera || camera,
        any_gesture: keyboard.any_gesture || night || rain || camera,
    }
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
    world_half_extent: f32,
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self {
            swap_interval: None,
            show_fps: false,
            world_half_extent: DEFAULT_WORLD_HALF_EXTENT,
        }
    }
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend logs frame timing metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }

    /// Configures the half side of the square covered by the minimap.
    #[must_use]
    pub fn with_world_half_extent(mut self, world_half_extent: f32) -> Self {
        self.world_half_extent = world_half_extent;
        self
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct FrameBreakdown {
    frame: Duration,
    update: Duration,
    render: Duration,
}

/// Tracks the average frames-per-second produced by the render loop.
#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    frame_times: VecDeque<Duration>,
    window_duration: Duration,
    update_accum: Duration,
    render_accum: Duration,
}

#[derive(Clone, Copy, Debug)]
struct FpsMetrics {
    per_second: f32,
    trailing_ten_seconds: f32,
    avg_update: Duration,
    avg_render: Duration,
}

impl FpsCounter {
    /// Records a rendered frame and returns the per-second and trailing ten-second averages once
    /// one second has elapsed.
    fn record_frame(&mut self, breakdown: FrameBreakdown) -> Option<FpsMetrics> {
        self.elapsed += breakdown.frame;
        self.frames = self.frames.saturating_add(1);
        self.update_accum += breakdown.update;
        self.render_accum += breakdown.render;

        self.frame_times.push_back(breakdown.frame);
        self.window_duration += breakdown.frame;

        let trailing_window = Duration::from_secs(10);
        while self.window_duration > trailing_window {
            if let Some(removed) = self.frame_times.pop_front() {
                self.window_duration = self.window_duration.saturating_sub(removed);
            } else {
                break;
            }
        }

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let seconds = self.elapsed.as_secs_f32();
        let frames = self.frames;
        let per_second = frames as f32 / seconds;
        let window_seconds = self.window_duration.as_secs_f32();
        let trailing_ten_seconds = if window_seconds <= f32::EPSILON {
            per_second
        } else {
            self.frame_times.len() as f32 / window_seconds
        };
        let metrics = FpsMetrics {
            per_second,
            trailing_ten_seconds,
            avg_update: self.update_accum / frames.max(1),
            avg_render: self.render_accum / frames.max(1),
        };

        self.elapsed = Duration::ZERO;
        self.frames = 0;
        self.update_accum = Duration::ZERO;
        self.render_accum = Duration::ZERO;
        Some(metrics)
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
            world_half_extent,
        } = self;

        let Presentation {
            window_title,
            clear_color,
            scene,
        } = presentation;

        let minimap = MinimapProjection::new(MINIMAP_SIZE, world_half_extent)
            .context("failed to configure the minimap")?;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: 1280,
            window_height: 800,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let mut fps_counter = FpsCounter::default();
            let mut latch = ToggleLatch::default();

            loop {
                let keyboard = KeyboardShortcuts::poll();
                if keyboard.quit_requested {
                    break;
                }

                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));
                let frame_input = gather_frame_input(keyboard, HeldKeys::poll(), &mut latch);

                let update_start = Instant::now();
                update_scene(frame_dt, frame_input, &mut scene);
                let update_duration = update_start.elapsed();

                let screen_width = macroquad::window::screen_width();
                let screen_height = macroquad::window::screen_height();
                let metrics = SceneMetrics::from_scene(&scene, screen_width, screen_height);

                let render_start = Instant::now();
                let ground = clear_color.scale(scene.lighting.brightness);
                macroquad::window::clear_background(to_macroquad_color(ground));
                draw_surfaces(&scene, &metrics);
                if scene.lighting.lamps > 0.0 {
                    draw_lamp_glow(&scene, &metrics);
                }
                draw_traffic(&scene, &metrics);
                draw_player(&scene, &metrics);
                if let Some(pursuer) = scene.pursuer {
                    draw_pursuer(pursuer, &metrics);
                }
                draw_veil(scene.lighting.fog.with_alpha(scene.lighting.haze), &metrics);
                if scene.hud.is_raining {
                    draw_rain(&metrics);
                }
                if scene.crash_flash.is_visible() {
                    draw_veil(CRASH_TINT.with_alpha(scene.crash_flash.alpha()), &metrics);
                }
                draw_minimap(&scene, &minimap, &metrics);

                let mut dashboard = macroquad::ui::root_ui();
                let pressed = draw_dashboard_ui(
                    &mut dashboard,
                    DashboardUiContext {
                        origin: MacroquadVec2::new(MINIMAP_MARGIN, MINIMAP_MARGIN),
                        size: MacroquadVec2::new(DASHBOARD_SIZE, DASHBOARD_SIZE),
                        background: to_macroquad_color(DASHBOARD_BACKGROUND),
                        hud: scene.hud,
                    },
                );
                latch.register(pressed);

                let render_duration = render_start.elapsed();
                let fps_metrics = fps_counter.record_frame(FrameBreakdown {
                    frame: frame_dt,
                    update: update_duration,
                    render: render_duration,
                });
                if show_fps {
                    if let Some(FpsMetrics {
                        per_second,
                        trailing_ten_seconds,
                        avg_update,
                        avg_render,
                    }) = fps_metrics
                    {
                        tracing::info!(
                            fps = per_second,
                            trailing_fps = trailing_ten_seconds,
                            update_ms = avg_update.as_secs_f64() * 1_000.0,
                            render_ms = avg_render.as_secs_f64() * 1_000.0,
                            "frame timing"
                        );
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

/// World to screen transform for the current camera mode.
#[derive(Clone, Copy, Debug)]
struct SceneMetrics {
    screen_width: f32,
    screen_height: f32,
    center: Vec2,
    focus: Vec2,
    rotation: Vec2,
    scale: f32,
}

impl SceneMetrics {
    fn from_scene(scene: &Scene, screen_width: f32, screen_height: f32) -> Self {
        Self::for_pose(
            scene.player,
            CameraPreset::for_mode(scene.hud.camera),
            screen_width,
            screen_height,
        )
    }

    fn for_pose(
        pose: VehiclePose,
        preset: CameraPreset,
        screen_width: f32,
        screen_height: f32,
    ) -> Self {
        let angle = if preset.follow_heading {
            pose.heading
        } else {
            0.0
        };
        Self {
            screen_width,
            screen_height,
            center: Vec2::new(screen_width * 0.5, screen_height * 0.5),
            focus: pose.position + pose.forward() * preset.look_ahead,
            rotation: Vec2::from_angle(angle),
            scale: preset.pixels_per_unit,
        }
    }

    /// Screen pixel of a ground-plane point; the view's up axis is +Z or the car heading.
    fn to_screen(&self, world: Vec2) -> Vec2 {
        let view = self.rotation.rotate(world - self.focus);
        self.center + Vec2::new(view.x, -view.y) * self.scale
    }

    fn is_visible(&self, points: &[Vec2]) -> bool {
        let margin = 8.0;
        let min_x = points.iter().fold(f32::INFINITY, |min, point| min.min(point.x));
        let max_x = points.iter().fold(f32::NEG_INFINITY, |max, point| max.max(point.x));
        let min_y = points.iter().fold(f32::INFINITY, |min, point| min.min(point.y));
        let max_y = points.iter().fold(f32::NEG_INFINITY, |max, point| max.max(point.y));
        max_x >= -margin
            && min_x <= self.screen_width + margin
            && max_y >= -margin
            && min_y <= self.screen_height + margin
    }
}

/// Ground-plane corners of a box of the given half sizes oriented along `heading`.
fn oriented_box(center: Vec2, heading: f32, half_width: f32, half_length: f32) -> [Vec2; 4] {
    let forward = forward_vector(heading) * half_length;
    let side = Vec2::new(forward.y, -forward.x).normalize_or_zero() * half_width;
    [
        center + forward + side,
        center + forward - side,
        center - forward - side,
        center - forward + side,
    ]
}

fn draw_quad(corners: [Vec2; 4], metrics: &SceneMetrics, color: Color) {
    let screen = corners.map(|corner| metrics.to_screen(corner));
    if !metrics.is_visible(&screen) {
        return;
    }
    let color = to_macroquad_color(color);
    let [a, b, c, d] = screen.map(to_macroquad_vec2);
    macroquad::shapes::draw_triangle(a, b, c, color);
    macroquad::shapes::draw_triangle(a, c, d, color);
}

fn draw_surfaces(scene: &Scene, metrics: &SceneMetrics) {
    for surface in &scene.surfaces {
        draw_surface(surface, scene.surface_color(surface.material()), metrics);
    }
}

fn draw_surface(surface: &TopDownSurface, color: Color, metrics: &SceneMetrics) {
    let color = to_macroquad_color(color);
    for triangle in surface.triangles() {
        let screen = (*triangle).map(|corner| metrics.to_screen(corner));
        if !metrics.is_visible(&screen) {
            continue;
        }
        let [a, b, c] = screen.map(to_macroquad_vec2);
        macroquad::shapes::draw_triangle(a, b, c, color);
    }
}

fn draw_lamp_glow(scene: &Scene, metrics: &SceneMetrics) {
    let color = to_macroquad_color(LAMP_GLOW.scale(scene.lighting.lamps));
    let radius = 9.0 * metrics.scale;
    for &lamp in &scene.lamps {
        let center = metrics.to_screen(lamp);
        if metrics.is_visible(&[center - radius, center + radius]) {
            macroquad::shapes::draw_circle(center.x, center.y, radius, color);
        }
    }
}

fn draw_traffic(scene: &Scene, metrics: &SceneMetrics) {
    for agent in &scene.traffic {
        let body = traffic_color(agent.color_index).scale(scene.lighting.brightness.max(0.35));
        draw_quad(oriented_box(agent.position, agent.heading, 1.1, 2.2), metrics, body);
    }
}

fn draw_player(scene: &Scene, metrics: &SceneMetrics) {
    let pose = scene.player;
    if scene.hud.is_night {
        let forward = pose.forward();
        let side = Vec2::new(forward.y, -forward.x);
        let apex = metrics.to_screen(pose.position + forward * 2.0);
        let left = metrics.to_screen(pose.position + forward * 30.0 + side * 9.0);
        let right = metrics.to_screen(pose.position + forward * 30.0 - side * 9.0);
        macroquad::shapes::draw_triangle(
            to_macroquad_vec2(apex),
            to_macroquad_vec2(left),
            to_macroquad_vec2(right),
            to_macroquad_color(HEADLIGHT),
        );
    }
    let body = if scene.hud.drifting {
        PLAYER_BODY.lighten(0.25)
    } else {
        PLAYER_BODY
    };
    let half_width = 1.1 * (1.0 - pose.lean.abs());
    draw_quad(oriented_box(pose.position, pose.heading, half_width, 2.2), metrics, body);
}

fn draw_pursuer(pursuer: PursuerPresentation, metrics: &SceneMetrics) {
    let center = metrics.to_screen(pursuer.position);
    let radius = (1.3 + pursuer.bob) * metrics.scale;
    macroquad::shapes::draw_circle(center.x, center.y, radius, to_macroquad_color(PURSUER_BODY));

    let reach = forward_vector(pursuer.facing + pursuer.arm_swing) * 2.0;
    let hand = metrics.to_screen(pursuer.position + reach);
    macroquad::shapes::draw_line(
        center.x,
        center.y,
        hand.x,
        hand.y,
        0.4 * metrics.scale,
        to_macroquad_color(PURSUER_BODY),
    );

    let glow = (pursuer.glow / 4.0).clamp(0.0, 1.0);
    let eyes = PURSUER_EYES.with_alpha(0.3 + 0.7 * glow);
    macroquad::shapes::draw_circle(
        center.x,
        center.y,
        (0.4 + pursuer.glow * 0.3) * metrics.scale,
        to_macroquad_color(eyes),
    );
}

fn draw_veil(color: Color, metrics: &SceneMetrics) {
    if color.alpha <= 0.0 {
        return;
    }
    macroquad::shapes::draw_rectangle(
        0.0,
        0.0,
        metrics.screen_width,
        metrics.screen_height,
        to_macroquad_color(color),
    );
}

fn draw_rain(metrics: &SceneMetrics) {
    let color = to_macroquad_color(RAIN);
    for _ in 0..RAIN_STREAKS {
        let x = macroquad::rand::gen_range(0.0, metrics.screen_width);
        let y = macroquad::rand::gen_range(0.0, metrics.screen_height);
        macroquad::shapes::draw_line(x, y, x - 3.0, y + 14.0, 1.0, color);
    }
}

fn draw_minimap(scene: &Scene, projection: &MinimapProjection, metrics: &SceneMetrics) {
    let size = projection.size();
    let origin = Vec2::new(
        metrics.screen_width - size - MINIMAP_MARGIN,
        metrics.screen_height - size - MINIMAP_MARGIN,
    );
    macroquad::shapes::draw_rectangle(
        origin.x,
        origin.y,
        size,
        size,
        to_macroquad_color(DASHBOARD_BACKGROUND),
    );

    let road = to_macroquad_color(Color::from_rgb_u8(120, 124, 136));
    for rect in &scene.roads {
        let (top_left, extent) = projection.project_road(rect);
        let top_left = origin + top_left;
        macroquad::shapes::draw_rectangle(top_left.x, top_left.y, extent.x, extent.y, road);
    }

    for agent in &scene.traffic {
        let point = origin + projection.project(agent.position);
        macroquad::shapes::draw_circle(
            point.x,
            point.y,
            1.5,
            to_macroquad_color(traffic_color(agent.color_index)),
        );
    }

    if let Some(pursuer) = scene.pursuer {
        let point = origin + projection.project(pursuer.position);
        macroquad::shapes::draw_circle(point.x, point.y, 3.0, to_macroquad_color(PURSUER_EYES));
    }

    let player = origin + projection.project(scene.player.position);
    let forward = forward_vector(scene.player.heading);
    let tip = player + Vec2::new(forward.x, -forward.y) * 6.0;
    macroquad::shapes::draw_circle(player.x, player.y, 3.0, to_macroquad_color(PLAYER_BODY));
    macroquad::shapes::draw_line(
        player.x,
        player.y,
        tip.x,
        tip.y,
        1.5,
        to_macroquad_color(PLAYER_BODY),
    );
}

fn to_macroquad_vec2(point: Vec2) -> MacroquadVec2 {
    MacroquadVec2::new(point.x, point.y)
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}
