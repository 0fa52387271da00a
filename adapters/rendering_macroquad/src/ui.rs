//! Immediate-mode dashboard for the Macroquad rendering backend.
//!
//! All uses of `macroquad::ui` live here so the rest of the adapter stays
//! agnostic of Macroquad's UI types.

use macroquad::{
    color::{Color, WHITE},
    math::{RectOffset, Vec2},
    ui::{hash, Ui},
};
use midnight_drive_rendering::Hud;

/// Buttons pressed on the dashboard during the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DashboardUiResult {
    /// The night button was pressed.
    pub(crate) night_pressed: bool,
    /// The rain button was pressed.
    pub(crate) rain_pressed: bool,
    /// The camera button was pressed.
    pub(crate) camera_pressed: bool,
}

/// Layout and data of the dashboard for the current frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DashboardUiContext {
    /// Top-left corner in screen coordinates.
    pub(crate) origin: Vec2,
    /// Panel dimensions in screen space.
    pub(crate) size: Vec2,
    /// Panel background.
    pub(crate) background: Color,
    /// Values shown as labels.
    pub(crate) hud: Hud,
}

/// Draws the dashboard labels and toggle buttons.
pub(crate) fn draw_dashboard_ui(ui: &mut Ui, context: DashboardUiContext) -> DashboardUiResult {
    let mut skin = ui.default_skin();
    skin.margin = 0.0;

    let window_style = ui
        .style_builder()
        .color(context.background)
        .color_hovered(context.background)
        .color_clicked(context.background)
        .color_selected(context.background)
        .color_selected_hovered(context.background)
        .color_inactive(context.background)
        .text_color(WHITE)
        .text_color_hovered(WHITE)
        .text_color_clicked(WHITE)
        .margin(RectOffset::new(12.0, 12.0, 12.0, 12.0))
        .build();
    skin.window_style = window_style;

    let label_style = ui
        .style_builder()
        .text_color(WHITE)
        .text_color_hovered(WHITE)
        .text_color_clicked(WHITE)
        .margin(RectOffset::new(0.0, 0.0, 2.0, 2.0))
        .build();
    skin.label_style = label_style;

    let button_style = ui
        .style_builder()
        .text_color(WHITE)
        .text_color_hovered(WHITE)
        .text_color_clicked(WHITE)
        .color(Color::from_rgba(40, 44, 60, 230))
        .color_hovered(Color::from_rgba(64, 70, 96, 230))
        .color_clicked(Color::from_rgba(28, 30, 42, 230))
        .color_selected(Color::from_rgba(40, 44, 60, 230))
        .color_selected_hovered(Color::from_rgba(64, 70, 96, 230))
        .color_inactive(Color::from_rgba(28, 30, 42, 200))
        .margin(RectOffset::new(0.0, 0.0, 6.0, 6.0))
        .build();
    skin.button_style = button_style;

    ui.push_skin(&skin);

    let mut result = DashboardUiResult::default();
    let _ = ui.window(hash!("dashboard"), context.origin, context.size, |ui| {
        for line in context.hud.lines() {
            ui.label(None, line.as_str());
        }

        let night_label = if context.hud.is_night {
            "Daylight (N)"
        } else {
            "Nightfall (N)"
        };
        result.night_pressed = ui.button(None, night_label);
        result.rain_pressed = ui.button(None, "Rain (R)");
        result.camera_pressed = ui.button(None, "Camera (C)");
    });

    ui.pop_skin();
    result
}
