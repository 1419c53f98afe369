//! Main application state and UI rendering for the dashboard.
//!
//! [`DashApp`] owns the tokio runtime that BLE work runs on and one
//! [`SensorPanel`] per sensor. Each frame it drains panel events, renders the
//! cards, and applies the button actions collected during rendering.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, RichText};
use egui_plot::{HLine, Line, Plot};
use thingy_core::{BleBackend, BleSession, BtleplugBackend, ScanOptions};
use thingy_types::SensorKind;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use super::components;
use super::demo::DemoFeed;
use super::theme::{Theme, ThemeMode};
use crate::chart::{PieGauge, TimeSeriesChart};
use crate::config::Config;
use crate::panel::{PanelDisplay, PanelState, SensorPanel};

/// How long toast notifications are displayed.
const TOAST_DURATION: Duration = Duration::from_secs(4);

/// Upper bound on how long shutdown waits for links to close.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Repaint interval while a chart is scrolling.
const CHART_FRAME: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
enum ToastType {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    toast_type: ToastType,
    created_at: Instant,
}

/// Where panels get their backend from.
enum BackendSource {
    Bluetooth(ScanOptions),
    Demo(DemoFeed),
}

impl BackendSource {
    fn backend(&self, kind: SensorKind) -> Arc<dyn BleBackend> {
        match self {
            BackendSource::Bluetooth(options) => Arc::new(BtleplugBackend::new(options.clone())),
            BackendSource::Demo(feed) => feed.backend(kind),
        }
    }
}

/// A card on the dashboard.
struct Card {
    panel: SensorPanel,
    /// Whether the connected toast was shown for this panel.
    announced: bool,
}

/// Button presses collected while rendering a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardAction {
    Connect,
    RequestValue,
    Disconnect,
    DismissBanner,
}

/// The dashboard application.
pub struct DashApp {
    runtime: Runtime,
    source: BackendSource,
    cards: Vec<Card>,
    chart_window: Duration,
    ctx: egui::Context,
    theme_mode: ThemeMode,
    theme: Theme,
    toasts: Vec<Toast>,
    config: Config,
    config_path: Option<PathBuf>,
    demo_mode: bool,
}

impl DashApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        runtime: Runtime,
        config: Config,
        config_path: Option<PathBuf>,
        scan_options: ScanOptions,
        demo: bool,
    ) -> Self {
        let theme_mode = config.gui.theme.parse::<ThemeMode>().unwrap_or_else(|e| {
            warn!("{}; using dark theme", e);
            ThemeMode::Dark
        });
        let theme = Theme::for_mode(theme_mode);
        cc.egui_ctx.set_style(theme.to_style());

        let source = if demo {
            BackendSource::Demo(DemoFeed::start(runtime.handle()))
        } else {
            BackendSource::Bluetooth(scan_options)
        };

        let mut app = Self {
            runtime,
            source,
            cards: Vec::new(),
            chart_window: config.gui.chart_window(),
            ctx: cc.egui_ctx.clone(),
            theme_mode,
            theme,
            toasts: Vec::new(),
            config,
            config_path,
            demo_mode: demo,
        };

        app.cards = SensorKind::ALL
            .iter()
            .map(|&kind| Card {
                panel: app.new_panel(kind),
                announced: false,
            })
            .collect();

        if app.config.behavior.auto_connect || demo {
            info!("Auto-connecting sensor panels");
            for card in &mut app.cards {
                card.panel.init();
            }
        }

        app
    }

    fn new_panel(&self, kind: SensorKind) -> SensorPanel {
        let ctx = self.ctx.clone();
        SensorPanel::new(
            kind,
            self.source.backend(kind),
            self.runtime.handle().clone(),
            self.chart_window,
        )
        .with_repaint(Arc::new(move || ctx.request_repaint()))
    }

    fn add_toast(&mut self, message: impl Into<String>, toast_type: ToastType) {
        self.toasts.push(Toast {
            message: message.into(),
            toast_type,
            created_at: Instant::now(),
        });
    }

    fn cleanup_toasts(&mut self) {
        self.toasts.retain(|t| t.created_at.elapsed() < TOAST_DURATION);
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.theme_mode.toggle();
        self.theme = Theme::for_mode(self.theme_mode);
        ctx.set_style(self.theme.to_style());

        self.config.gui.theme = match self.theme_mode {
            ThemeMode::Dark => "dark".to_string(),
            ThemeMode::Light => "light".to_string(),
        };
        let saved = match &self.config_path {
            Some(path) => self.config.save_to(path),
            None => self.config.save(),
        };
        if let Err(e) = saved {
            warn!("Failed to save theme preference: {}", e);
        }
    }

    /// Drain panel events and raise toasts for notable changes.
    fn poll_panels(&mut self) {
        let mut toasts = Vec::new();
        for card in &mut self.cards {
            let before = card.panel.state();
            card.panel.poll();
            if before == PanelState::Streaming && card.panel.is_terminated() {
                toasts.push((
                    format!("{} stream ended", card.panel.kind().label()),
                    ToastType::Error,
                ));
            }
            if !card.announced {
                if let Some(name) = card.panel.device_name() {
                    toasts.push((
                        format!("{}: connected to {}", card.panel.kind().label(), name),
                        ToastType::Success,
                    ));
                    card.announced = true;
                }
            }
        }
        for (message, toast_type) in toasts {
            self.add_toast(message, toast_type);
        }
    }

    fn apply(&mut self, index: usize, action: CardAction) {
        let Some(card) = self.cards.get_mut(index) else {
            return;
        };
        let kind = card.panel.kind();
        debug!(sensor = %kind, ?action, "Card action");

        match action {
            CardAction::Connect => {
                if card.panel.is_terminated() {
                    let panel = self.new_panel(kind);
                    let card = &mut self.cards[index];
                    card.panel = panel;
                    card.announced = false;
                    card.panel.init();
                } else {
                    card.panel.init();
                }
            }
            CardAction::RequestValue => card.panel.request_value(),
            CardAction::Disconnect => {
                card.panel.disconnect();
                self.add_toast(format!("{} disconnected", kind.label()), ToastType::Info);
            }
            CardAction::DismissBanner => card.panel.dismiss_banner(),
        }
    }

    fn render_toasts(&self, ctx: &egui::Context) {
        if self.toasts.is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -16.0))
            .show(ctx, |ui| {
                ui.with_layout(egui::Layout::bottom_up(egui::Align::RIGHT), |ui| {
                    for toast in &self.toasts {
                        let (bg_color, icon) = match toast.toast_type {
                            ToastType::Success => (self.theme.success, "[OK]"),
                            ToastType::Error => (self.theme.danger, "[!]"),
                            ToastType::Info => (self.theme.info, "[i]"),
                        };
                        let elapsed = toast.created_at.elapsed().as_secs_f32();
                        let fade_start = TOAST_DURATION.as_secs_f32() - 0.5;
                        let alpha = if elapsed > fade_start {
                            1.0 - (elapsed - fade_start) / 0.5
                        } else {
                            1.0
                        };

                        let text_color = self.theme.text_on_accent.gamma_multiply(alpha);
                        egui::Frame::new()
                            .fill(bg_color.gamma_multiply(0.95 * alpha))
                            .inner_margin(egui::Margin::symmetric(12, 8))
                            .corner_radius(egui::CornerRadius::same(6))
                            .shadow(egui::Shadow {
                                offset: [0, 2],
                                blur: 8,
                                spread: 0,
                                color: Color32::from_black_alpha((40.0 * alpha) as u8),
                            })
                            .show(ui, |ui| {
                                ui.horizontal(|ui| {
                                    ui.label(RichText::new(icon).color(text_color).strong());
                                    ui.label(RichText::new(&toast.message).color(text_color));
                                });
                            });
                        ui.add_space(4.0);
                    }
                });
            });
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        let mut toggle = false;
        egui::TopBottomPanel::top("header")
            .frame(
                egui::Frame::new()
                    .fill(self.theme.bg_secondary)
                    .inner_margin(egui::Margin::symmetric(
                        self.theme.spacing.lg as i8,
                        self.theme.spacing.md as i8,
                    ))
                    .stroke(egui::Stroke::new(1.0, self.theme.border_subtle)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("Thingy Dashboard")
                            .size(self.theme.typography.heading)
                            .strong()
                            .color(self.theme.text_primary),
                    );
                    if self.demo_mode {
                        ui.add_space(self.theme.spacing.sm);
                        components::status_badge(ui, &self.theme, "DEMO", self.theme.info);
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button(self.theme_mode.icon()).clicked() {
                            toggle = true;
                        }
                    });
                });
            });
        if toggle {
            self.toggle_theme(ctx);
        }
    }

    /// Render one card and return the action the user took, if any.
    fn render_card(&self, ui: &mut egui::Ui, panel: &SensorPanel) -> Option<CardAction> {
        let theme = &self.theme;
        let mut action = None;
        let state = panel.state();

        egui::Frame::new()
            .fill(theme.bg_card)
            .inner_margin(egui::Margin::same(theme.spacing.card_padding as i8))
            .corner_radius(egui::CornerRadius::same(theme.rounding.lg as u8))
            .stroke(egui::Stroke::new(1.0, theme.border_subtle))
            .shadow(theme.card_shadow())
            .show(ui, |ui| {
                ui.set_width(ui.available_width());

                ui.horizontal(|ui| {
                    components::status_dot(ui, theme.state_color(state), &state.to_string());
                    ui.label(
                        RichText::new(panel.kind().label())
                            .size(theme.typography.subheading)
                            .strong()
                            .color(theme.text_primary),
                    );
                    components::status_badge(ui, theme, &state.to_string(), theme.state_color(state));
                    if let Some(name) = panel.device_name() {
                        ui.label(
                            RichText::new(name)
                                .size(theme.typography.caption)
                                .color(theme.text_muted),
                        );
                    }
                });
                ui.add_space(theme.spacing.sm);

                if let Some(message) = panel.banner() {
                    if components::error_banner(ui, theme, message) {
                        action = Some(CardAction::DismissBanner);
                    }
                    ui.add_space(theme.spacing.sm);
                }

                ui.horizontal(|ui| {
                    let can_connect = matches!(state, PanelState::Idle | PanelState::Terminated);
                    if ui
                        .add_enabled(can_connect, egui::Button::new("Connect"))
                        .clicked()
                    {
                        action = Some(CardAction::Connect);
                    }
                    let live = state != PanelState::Terminated;
                    if ui
                        .add_enabled(live && !panel.is_reading(), egui::Button::new("Request value"))
                        .clicked()
                    {
                        action = Some(CardAction::RequestValue);
                    }
                    if ui
                        .add_enabled(live, egui::Button::new("Disconnect"))
                        .clicked()
                    {
                        action = Some(CardAction::Disconnect);
                    }
                    if state == PanelState::Streaming && panel.device_name().is_none() {
                        components::loading_indicator(ui, theme, Some("Connecting..."));
                    }
                });
                ui.add_space(theme.spacing.md);

                match panel.display() {
                    PanelDisplay::Chart(chart) => self.render_chart(ui, panel.kind(), chart),
                    PanelDisplay::Gauge(gauge) => self.render_gauge(ui, gauge),
                }
            });

        action
    }

    fn render_chart(&self, ui: &mut egui::Ui, kind: SensorKind, chart: &TimeSeriesChart) {
        let theme = &self.theme;
        if chart.is_empty() {
            components::empty_state(
                ui,
                theme,
                "No readings yet",
                "Connect to start streaming, or request a single value.",
            );
            return;
        }

        if let Some(latest) = chart.latest() {
            components::metric_card(
                ui,
                theme,
                "Latest",
                &format!("{}", latest.value),
                kind.label(),
                theme.chart_temperature,
            );
            ui.add_space(theme.spacing.sm);
        }

        let window = chart.window().as_secs_f64();
        let points = chart.plot_points(chart.view_end());
        let range = chart.value_range();

        Plot::new(format!("{}_plot", kind))
            .height(220.0)
            .show_axes(true)
            .show_grid(true)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .include_x(-window)
            .include_x(0.0)
            .x_axis_label("Seconds")
            .show(ui, |plot_ui| {
                if let Some((lo, hi)) = range {
                    let color = theme.text_muted.gamma_multiply(0.4);
                    plot_ui.hline(HLine::new("Min", lo).color(color));
                    plot_ui.hline(HLine::new("Max", hi).color(color));
                }
                plot_ui.line(
                    Line::new(kind.label(), points)
                        .color(theme.chart_temperature)
                        .width(2.0),
                );
            });
    }

    fn render_gauge(&self, ui: &mut egui::Ui, gauge: &PieGauge) {
        let theme = &self.theme;
        ui.horizontal(|ui| {
            components::pie_gauge(ui, theme, gauge, 160.0);
            ui.add_space(theme.spacing.lg);
            ui.vertical(|ui| {
                let value = gauge
                    .value()
                    .map(|v| format!("{}", v))
                    .unwrap_or_else(|| "--".to_string());
                components::metric_card(ui, theme, gauge.label(), &value, "of 360", theme.gauge_fill);
                ui.add_space(theme.spacing.xs);
                ui.label(
                    RichText::new(format!("Remaining: {}", gauge.remainder()))
                        .size(theme.typography.caption)
                        .color(theme.text_muted),
                );
            });
        });
    }

    /// Sessions still holding a link, for shutdown.
    fn sessions(&self) -> Vec<BleSession> {
        self.cards.iter().map(|c| c.panel.session().clone()).collect()
    }
}

impl eframe::App for DashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_panels();
        self.cleanup_toasts();

        let mut toggle_theme = false;
        ctx.input(|i| {
            if i.key_pressed(egui::Key::T) && !i.modifiers.command && !i.modifiers.ctrl {
                toggle_theme = true;
            }
        });
        if toggle_theme {
            self.toggle_theme(ctx);
        }

        self.render_header(ctx);

        let mut actions = Vec::new();
        egui::CentralPanel::default()
            .frame(
                egui::Frame::new()
                    .fill(self.theme.bg_primary)
                    .inner_margin(egui::Margin::same(self.theme.spacing.lg as i8)),
            )
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for (index, card) in self.cards.iter().enumerate() {
                        if let Some(action) = self.render_card(ui, &card.panel) {
                            actions.push((index, action));
                        }
                        ui.add_space(self.theme.spacing.md);
                    }
                });
            });

        for (index, action) in actions {
            self.apply(index, action);
        }

        self.render_toasts(ctx);

        let scrolling = self.cards.iter().any(|c| match c.panel.display() {
            PanelDisplay::Chart(chart) => chart.is_running(),
            PanelDisplay::Gauge(_) => false,
        });
        if scrolling {
            ctx.request_repaint_after(CHART_FRAME);
        } else if !self.toasts.is_empty() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}

impl Drop for DashApp {
    fn drop(&mut self) {
        let sessions = self.sessions();
        for card in &mut self.cards {
            card.panel.destroy();
        }

        // Wait for links to close before the runtime goes away.
        let result = self.runtime.block_on(async {
            tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
                for session in sessions {
                    if let Err(e) = session.disconnect().await {
                        warn!("Disconnect on shutdown failed: {}", e);
                    }
                }
            })
            .await
        });
        if result.is_err() {
            warn!("Timed out closing Bluetooth links");
        }
        info!("Dashboard closed");
    }
}
