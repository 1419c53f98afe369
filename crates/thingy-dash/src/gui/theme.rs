//! Theme and styling for the dashboard.
//!
//! Colors, spacing, typography, and rounding for dark and light mode.

use std::str::FromStr;

use eframe::egui::{Color32, CornerRadius, Margin, Shadow, Stroke, Style, Visuals};

use crate::panel::PanelState;

/// Theme mode for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    /// Toggle between light and dark mode.
    pub fn toggle(&mut self) {
        *self = match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
        };
    }

    /// Label for the toggle button.
    pub fn icon(&self) -> &'static str {
        match self {
            ThemeMode::Dark => "Light Mode",
            ThemeMode::Light => "Dark Mode",
        }
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(ThemeMode::Dark),
            "light" => Ok(ThemeMode::Light),
            other => Err(format!("Unknown theme: {}", other)),
        }
    }
}

/// Opacity levels for consistent transparency across the UI.
#[derive(Debug, Clone, Copy)]
pub struct Opacity {
    /// Subtle hints and banners (15)
    pub subtle: u8,
    /// Status badges, weak fills (35)
    pub medium: u8,
    /// Hover states (50)
    pub hover: u8,
    /// Selections (70)
    pub strong: u8,
}

impl Default for Opacity {
    fn default() -> Self {
        Self {
            subtle: 15,
            medium: 35,
            hover: 50,
            strong: 70,
        }
    }
}

/// Spacing constants on a 4px grid.
#[derive(Debug, Clone, Copy)]
pub struct Spacing {
    pub xs: f32,
    pub sm: f32,
    pub md: f32,
    pub lg: f32,
    pub card_padding: f32,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            xs: 4.0,
            sm: 8.0,
            md: 16.0,
            lg: 24.0,
            card_padding: 16.0,
        }
    }
}

/// Typography sizes on a 1.25 ratio scale.
#[derive(Debug, Clone, Copy)]
pub struct Typography {
    /// Caption/small text (11px)
    pub caption: f32,
    /// Body text (14px)
    pub body: f32,
    /// Subheading (18px)
    pub subheading: f32,
    /// Heading (22px)
    pub heading: f32,
    /// Large display text (28px)
    pub display: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            caption: 11.0,
            body: 14.0,
            subheading: 18.0,
            heading: 22.0,
            display: 28.0,
        }
    }
}

/// Corner radii.
#[derive(Debug, Clone, Copy)]
pub struct Rounding {
    pub sm: f32,
    pub md: f32,
    pub lg: f32,
}

impl Default for Rounding {
    fn default() -> Self {
        Self {
            sm: 4.0,
            md: 8.0,
            lg: 12.0,
        }
    }
}

/// Application color theme.
#[derive(Debug, Clone)]
pub struct Theme {
    pub is_dark: bool,
    // Background colors
    pub bg_primary: Color32,
    pub bg_secondary: Color32,
    pub bg_card: Color32,
    pub bg_elevated: Color32,
    // Text colors
    pub text_primary: Color32,
    pub text_secondary: Color32,
    pub text_muted: Color32,
    pub text_on_accent: Color32,
    // Border and separator
    pub border: Color32,
    pub border_subtle: Color32,
    // Accent and semantic colors
    pub accent: Color32,
    pub success: Color32,
    pub warning: Color32,
    pub danger: Color32,
    pub info: Color32,
    // Sensor colors
    pub chart_temperature: Color32,
    pub gauge_fill: Color32,
    pub gauge_track: Color32,
    pub opacity: Opacity,
    pub spacing: Spacing,
    pub typography: Typography,
    pub rounding: Rounding,
}

impl Theme {
    /// Dark theme with zinc backgrounds.
    pub fn dark() -> Self {
        Self {
            is_dark: true,
            bg_primary: Color32::from_rgb(9, 9, 11),     // zinc-950
            bg_secondary: Color32::from_rgb(24, 24, 27), // zinc-900
            bg_card: Color32::from_rgb(39, 39, 42),      // zinc-800
            bg_elevated: Color32::from_rgb(52, 52, 56),  // zinc-700
            text_primary: Color32::from_rgb(250, 250, 250),
            text_secondary: Color32::from_rgb(212, 212, 216),
            text_muted: Color32::from_rgb(161, 161, 170),
            text_on_accent: Color32::WHITE,
            border: Color32::from_rgb(63, 63, 70),
            border_subtle: Color32::from_rgb(39, 39, 42),
            accent: Color32::from_rgb(59, 130, 246), // blue-500
            success: Color32::from_rgb(34, 197, 94),
            warning: Color32::from_rgb(250, 204, 21),
            danger: Color32::from_rgb(239, 68, 68),
            info: Color32::from_rgb(56, 189, 248),
            chart_temperature: Color32::from_rgb(251, 191, 36), // amber-400
            gauge_fill: Color32::from_rgb(192, 132, 252),       // purple-400
            gauge_track: Color32::from_rgb(63, 63, 70),
            opacity: Opacity::default(),
            spacing: Spacing::default(),
            typography: Typography::default(),
            rounding: Rounding::default(),
        }
    }

    /// Light theme with white cards on a neutral background.
    pub fn light() -> Self {
        Self {
            is_dark: false,
            bg_primary: Color32::from_rgb(250, 250, 250),
            bg_secondary: Color32::from_rgb(244, 244, 245),
            bg_card: Color32::from_rgb(255, 255, 255),
            bg_elevated: Color32::from_rgb(255, 255, 255),
            text_primary: Color32::from_rgb(17, 24, 39),
            text_secondary: Color32::from_rgb(55, 65, 81),
            text_muted: Color32::from_rgb(107, 114, 128),
            text_on_accent: Color32::WHITE,
            border: Color32::from_rgb(209, 213, 219),
            border_subtle: Color32::from_rgb(229, 231, 235),
            accent: Color32::from_rgb(37, 99, 235),
            success: Color32::from_rgb(22, 163, 74),
            warning: Color32::from_rgb(202, 138, 4),
            danger: Color32::from_rgb(220, 38, 38),
            info: Color32::from_rgb(2, 132, 199),
            chart_temperature: Color32::from_rgb(217, 119, 6), // amber-600
            gauge_fill: Color32::from_rgb(147, 51, 234),       // purple-600
            gauge_track: Color32::from_rgb(229, 231, 235),
            opacity: Opacity::default(),
            spacing: Spacing::default(),
            typography: Typography::default(),
            rounding: Rounding::default(),
        }
    }

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Light => Self::light(),
        }
    }

    /// Indicator color for a panel state.
    pub fn state_color(&self, state: PanelState) -> Color32 {
        match state {
            PanelState::Idle => self.text_muted,
            PanelState::Streaming => self.success,
            PanelState::Error => self.warning,
            PanelState::Terminated => self.danger,
        }
    }

    pub fn tint_bg(&self, color: Color32, alpha: u8) -> Color32 {
        Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
    }

    pub fn tint_subtle(&self, color: Color32) -> Color32 {
        self.tint_bg(color, self.opacity.subtle)
    }

    pub fn tint_medium(&self, color: Color32) -> Color32 {
        self.tint_bg(color, self.opacity.medium)
    }

    /// Card shadow for elevation.
    pub fn card_shadow(&self) -> Shadow {
        let alpha = if self.is_dark { 50 } else { 30 };
        Shadow {
            offset: [0, 2],
            blur: 8,
            spread: 0,
            color: Color32::from_black_alpha(alpha),
        }
    }

    /// Create egui Style from this theme.
    pub fn to_style(&self) -> Style {
        Style {
            visuals: self.to_visuals(),
            spacing: eframe::egui::style::Spacing {
                item_spacing: eframe::egui::vec2(self.spacing.sm, self.spacing.sm),
                window_margin: Margin::same(self.spacing.md as i8),
                button_padding: eframe::egui::vec2(12.0, 6.0),
                interact_size: eframe::egui::vec2(40.0, 24.0),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create egui Visuals from this theme.
    pub fn to_visuals(&self) -> Visuals {
        let mut visuals = if self.is_dark {
            Visuals::dark()
        } else {
            Visuals::light()
        };
        visuals.dark_mode = self.is_dark;

        visuals.panel_fill = self.bg_primary;
        visuals.window_fill = self.bg_secondary;
        visuals.extreme_bg_color = self.bg_card;
        visuals.faint_bg_color = self.bg_secondary;
        visuals.window_shadow = self.card_shadow();
        visuals.popup_shadow = self.card_shadow();

        visuals.widgets.noninteractive.bg_fill = self.bg_secondary;
        visuals.widgets.noninteractive.weak_bg_fill = self.bg_secondary;
        visuals.widgets.inactive.bg_fill = self.bg_card;
        visuals.widgets.inactive.weak_bg_fill = self.bg_elevated;
        visuals.widgets.hovered.bg_fill = self.accent;
        visuals.widgets.hovered.weak_bg_fill = self.tint_bg(self.accent, self.opacity.hover);
        visuals.widgets.active.bg_fill = self.accent;
        visuals.widgets.active.weak_bg_fill = self.accent;

        visuals.selection.bg_fill = self.tint_bg(self.accent, self.opacity.strong);
        visuals.selection.stroke = Stroke::new(1.0, self.accent);

        visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, self.text_primary);
        visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, self.text_secondary);
        visuals.widgets.hovered.fg_stroke = Stroke::new(1.5, self.text_on_accent);
        visuals.widgets.active.fg_stroke = Stroke::new(1.5, self.text_on_accent);

        visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, self.border_subtle);
        visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, self.border);
        visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, self.accent);
        visuals.widgets.active.bg_stroke = Stroke::new(1.5, self.accent);

        let rounding = CornerRadius::same(self.rounding.md as u8);
        visuals.widgets.noninteractive.corner_radius = rounding;
        visuals.widgets.inactive.corner_radius = rounding;
        visuals.widgets.hovered.corner_radius = rounding;
        visuals.widgets.active.corner_radius = rounding;

        visuals.hyperlink_color = self.accent;
        visuals.error_fg_color = self.danger;
        visuals.warn_fg_color = self.warning;

        visuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_mode_toggle() {
        let mut mode = ThemeMode::default();
        assert_eq!(mode, ThemeMode::Dark);
        mode.toggle();
        assert_eq!(mode, ThemeMode::Light);
        assert_eq!(mode.icon(), "Dark Mode");
    }

    #[test]
    fn test_theme_mode_from_str() {
        assert_eq!("Light".parse::<ThemeMode>(), Ok(ThemeMode::Light));
        assert_eq!(" dark ".parse::<ThemeMode>(), Ok(ThemeMode::Dark));
        assert!("solarized".parse::<ThemeMode>().is_err());
    }

    #[test]
    fn test_for_mode() {
        assert!(Theme::for_mode(ThemeMode::Dark).is_dark);
        assert!(!Theme::for_mode(ThemeMode::Light).is_dark);
    }

    #[test]
    fn test_state_colors_are_distinct() {
        let theme = Theme::dark();
        assert_ne!(
            theme.state_color(PanelState::Streaming),
            theme.state_color(PanelState::Terminated)
        );
    }

    #[test]
    fn test_visuals_follow_theme_colors() {
        let theme = Theme::light();
        let visuals = theme.to_visuals();
        assert!(!visuals.dark_mode);
        assert_eq!(visuals.panel_fill, theme.bg_primary);
        assert_eq!(visuals.widgets.hovered.bg_fill, theme.accent);
        assert_eq!(visuals.widgets.hovered.weak_bg_fill.a(), theme.opacity.hover);
        assert_eq!(visuals.warn_fg_color, theme.state_color(PanelState::Error));
    }
}
