use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use co2_journey::data::filter::StepCandidates;
use co2_journey::data::model::{Field, FieldValue};
use co2_journey::estimate::MIN_DISTANCE_KM;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – cascading vehicle picker
// ---------------------------------------------------------------------------

/// Render the left picker panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Choose your vehicle");
    ui.separator();

    let Some(session) = &state.session else {
        ui.label("No dataset loaded.");
        return;
    };

    // Snapshot the view so widgets can queue changes without holding the session.
    let view = session.view();
    let labels: Vec<String> = session
        .profile()
        .steps
        .iter()
        .map(|s| s.label().to_string())
        .collect();
    let mut pending: Option<(Field, FieldValue)> = None;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // Widgets open one at a time, in field order.
            let mut earlier_unset = false;
            for (step, label) in view.steps.iter().zip(&labels) {
                ui.strong(label);
                let selected_text = step
                    .selected
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "Select…".to_string());

                match &step.candidates {
                    StepCandidates::Available(values) if !earlier_unset => {
                        egui::ComboBox::from_id_salt(step.field.column_name())
                            .selected_text(selected_text)
                            .width(ui.available_width())
                            .show_ui(ui, |ui: &mut Ui| {
                                for value in values {
                                    let is_selected = step.selected.as_ref() == Some(value);
                                    if ui
                                        .selectable_label(is_selected, value.to_string())
                                        .clicked()
                                    {
                                        pending = Some((step.field, value.clone()));
                                    }
                                }
                            });
                    }
                    StepCandidates::Available(_) | StepCandidates::Locked => {
                        ui.add_enabled_ui(false, |ui: &mut Ui| {
                            egui::ComboBox::from_id_salt(step.field.column_name())
                                .selected_text(selected_text)
                                .width(ui.available_width())
                                .show_ui(ui, |_ui: &mut Ui| {});
                        });
                    }
                    StepCandidates::Unresolvable => {
                        ui.label(
                            RichText::new("No vehicle matches. Change an earlier choice.")
                                .color(Color32::LIGHT_RED),
                        );
                    }
                }
                earlier_unset |= step.selected.is_none();
                ui.add_space(6.0);
            }

            ui.separator();
            ui.strong("Trip distance");
            ui.add(
                egui::DragValue::new(&mut state.distance_km)
                    .range(MIN_DISTANCE_KM..=100_000.0)
                    .speed(1.0)
                    .suffix(" km"),
            );
            ui.add_space(6.0);

            if ui.button("Reset selection").clicked() {
                state.reset_selection();
            }
        });

    if let Some((field, value)) = pending {
        state.select(field, value);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        let current = state.profile().name.clone();
        let mut chosen = state.profile_index;
        egui::ComboBox::from_id_salt("profile")
            .selected_text(current)
            .show_ui(ui, |ui: &mut Ui| {
                for (i, profile) in state.profiles.iter().enumerate() {
                    ui.selectable_value(&mut chosen, i, &profile.name);
                }
            });
        state.set_profile(chosen);

        ui.separator();

        if let Some(session) = &state.session {
            let table = session.table();
            ui.label(format!(
                "{} vehicles loaded, {} skipped",
                table.len(),
                table.dropped_rows
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

pub fn footer(ui: &mut Ui) {
    ui.small("Data sources: OpenRouteService, Carbon Interface API, Kaggle CO₂ dataset.");
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open vehicle data")
        .add_filter("Supported files", &["csv", "txt", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv", "txt"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.report(|s| s.open(&path));
    }
}
