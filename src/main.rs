mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use app::Co2JourneyApp;
use co2_journey::profile::DatasetProfile;
use eframe::egui;
use state::AppState;

/// Optional JSON profile offered before the built-in presets.
const PROFILE_ENV: &str = "CO2_PROFILE";

fn initial_state() -> AppState {
    let mut profiles = Vec::new();
    if let Ok(path) = std::env::var(PROFILE_ENV) {
        match DatasetProfile::from_json_file(&PathBuf::from(&path)) {
            Ok(profile) => {
                log::info!("Using profile '{}' from {path}", profile.name);
                profiles.push(profile);
            }
            Err(e) => log::error!("Ignoring {PROFILE_ENV}={path}: {e:#}"),
        }
    }
    profiles.extend(DatasetProfile::presets());

    let mut state = AppState::new(profiles);
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        state.report(|s| s.open(&path));
    }
    state
}

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 720.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Car Journey CO₂ Emission Calculator",
        options,
        Box::new(|_cc| Ok(Box::new(Co2JourneyApp::new(initial_state())))),
    )
}
