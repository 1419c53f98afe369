//! Reusable UI components for the dashboard.

use std::f32::consts::{FRAC_PI_2, TAU};

use eframe::egui::{self, Color32, RichText, Sense, Ui};

use super::theme::Theme;
use crate::chart::PieGauge;

/// Segments used to approximate a full circle.
const GAUGE_SEGMENTS: usize = 96;

/// Render a metric with a caption, large value, and unit.
pub fn metric_card(ui: &mut Ui, theme: &Theme, label: &str, value: &str, unit: &str, accent: Color32) {
    egui::Frame::new()
        .fill(theme.bg_elevated)
        .inner_margin(egui::Margin::symmetric(12, 8))
        .corner_radius(egui::CornerRadius::same(theme.rounding.md as u8))
        .show(ui, |ui| {
            ui.vertical(|ui| {
                ui.label(
                    RichText::new(label)
                        .color(theme.text_muted)
                        .size(theme.typography.caption),
                );
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(value)
                            .color(accent)
                            .size(theme.typography.display)
                            .strong(),
                    );
                    ui.label(
                        RichText::new(unit)
                            .color(theme.text_muted)
                            .size(theme.typography.body),
                    );
                });
            });
        });
}

/// Render an empty state with a title and message.
pub fn empty_state(ui: &mut Ui, theme: &Theme, title: &str, description: &str) {
    ui.vertical_centered(|ui| {
        ui.add_space(theme.spacing.lg);
        ui.label(
            RichText::new(title)
                .color(theme.text_secondary)
                .size(theme.typography.subheading)
                .strong(),
        );
        ui.add_space(theme.spacing.xs);
        ui.label(
            RichText::new(description)
                .color(theme.text_muted)
                .size(theme.typography.body),
        );
        ui.add_space(theme.spacing.lg);
    });
}

/// Render a styled status badge.
pub fn status_badge(ui: &mut Ui, theme: &Theme, text: &str, color: Color32) {
    egui::Frame::new()
        .fill(theme.tint_medium(color))
        .inner_margin(egui::Margin::symmetric(8, 4))
        .corner_radius(egui::CornerRadius::same(theme.rounding.sm as u8))
        .show(ui, |ui| {
            ui.label(
                RichText::new(text)
                    .color(color)
                    .size(theme.typography.caption),
            );
        });
}

/// Render a connection status dot.
pub fn status_dot(ui: &mut Ui, color: Color32, tooltip: &str) -> egui::Response {
    let size = 8.0;
    let (rect, response) = ui.allocate_exact_size(egui::vec2(size, size), Sense::hover());
    if ui.is_rect_visible(rect) {
        ui.painter().circle_filled(rect.center(), size / 2.0, color);
    }
    response.on_hover_text(tooltip)
}

/// Render a spinner with an optional message.
pub fn loading_indicator(ui: &mut Ui, theme: &Theme, message: Option<&str>) {
    ui.horizontal(|ui| {
        ui.spinner();
        if let Some(msg) = message {
            ui.add_space(theme.spacing.sm);
            ui.label(RichText::new(msg).color(theme.text_muted));
        }
    });
}

/// Render an error banner with a Close button.
///
/// Returns true when the user dismissed it.
pub fn error_banner(ui: &mut Ui, theme: &Theme, message: &str) -> bool {
    let mut closed = false;
    egui::Frame::new()
        .fill(theme.tint_subtle(theme.danger))
        .inner_margin(egui::Margin::symmetric(12, 8))
        .corner_radius(egui::CornerRadius::same(theme.rounding.md as u8))
        .stroke(egui::Stroke::new(1.0, theme.danger.gamma_multiply(0.5)))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("[!]").color(theme.danger).strong());
                ui.label(
                    RichText::new(message)
                        .color(theme.text_primary)
                        .size(theme.typography.body),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Close").clicked() {
                        closed = true;
                    }
                });
            });
        });
    closed
}

/// Render a pie gauge: the filled share of the total starting at 12 o'clock,
/// with the remainder drawn as the track.
pub fn pie_gauge(ui: &mut Ui, theme: &Theme, gauge: &PieGauge, diameter: f32) {
    let (rect, response) =
        ui.allocate_exact_size(egui::vec2(diameter, diameter), Sense::hover());
    if !ui.is_rect_visible(rect) {
        return;
    }

    let painter = ui.painter();
    let center = rect.center();
    let radius = diameter / 2.0;

    painter.circle_filled(center, radius, theme.gauge_track);

    let fraction = gauge.fraction() as f32;
    if fraction > 0.0 {
        let steps = ((GAUGE_SEGMENTS as f32 * fraction).ceil() as usize).max(1);
        let sweep = TAU * fraction;
        // Triangle fan from the center; each slice stays convex.
        for i in 0..steps {
            let a0 = -FRAC_PI_2 + sweep * i as f32 / steps as f32;
            let a1 = -FRAC_PI_2 + sweep * (i + 1) as f32 / steps as f32;
            let p0 = center + radius * egui::vec2(a0.cos(), a0.sin());
            let p1 = center + radius * egui::vec2(a1.cos(), a1.sin());
            painter.add(egui::Shape::convex_polygon(
                vec![center, p0, p1],
                theme.gauge_fill,
                egui::Stroke::NONE,
            ));
        }
    }

    painter.circle_stroke(center, radius, egui::Stroke::new(1.0, theme.border));

    let tooltip = match gauge.value() {
        Some(v) => format!("{}: {} of {}", gauge.label(), v, gauge.total()),
        None => format!("{}: no value", gauge.label()),
    };
    response.on_hover_text(tooltip);
}
