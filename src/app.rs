use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, summary};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct Co2JourneyApp {
    pub state: AppState,
}

impl Co2JourneyApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for Co2JourneyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Bottom panel: data source credits ----
        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            panels::footer(ui);
        });

        // ---- Left side panel: vehicle picker ----
        egui::SidePanel::left("vehicle_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: summary and estimate ----
        egui::CentralPanel::default().show(ctx, |ui| {
            summary::vehicle_summary(ui, &self.state);
        });
    }
}
