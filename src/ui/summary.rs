use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use co2_journey::data::model::VehicleRecord;
use co2_journey::estimate::{positive, EstimationResult, GhgBucket};
use co2_journey::session::SelectionPhase;

use crate::color;
use crate::state::AppState;
use crate::ui::plot;

/// Rows shown in the matching-vehicles table before truncating.
const MAX_TABLE_ROWS: usize = 200;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

pub fn vehicle_summary(ui: &mut Ui, state: &AppState) {
    ui.heading("Vehicle Summary");
    ui.separator();

    let Some(phase) = state.phase() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a vehicle table to begin  (File → Open…)");
        });
        return;
    };

    match phase {
        SelectionPhase::Empty | SelectionPhase::PartiallySelected { .. } => {
            ui.label("Please complete all selections to continue.");
            ui.add_space(8.0);
            matching_table(ui, state);
        }
        SelectionPhase::Unresolvable { field } => {
            ui.label(
                RichText::new(format!(
                    "No vehicle matches the chosen {}. Change an earlier choice.",
                    field.label().to_lowercase()
                ))
                .color(Color32::LIGHT_RED),
            );
        }
        SelectionPhase::NoMatch => {
            ui.label(
                RichText::new("The selection is complete but no record matches it.")
                    .color(Color32::YELLOW),
            );
        }
        SelectionPhase::Resolved | SelectionPhase::Estimated => match state.outcome() {
            Some(Ok((resolved, result))) => {
                ui.label(
                    RichText::new(format!("You selected a {}.", resolved.record.summary()))
                        .color(Color32::LIGHT_GREEN),
                );
                if resolved.has_duplicates() {
                    ui.small(format!(
                        "{} rows share this selection ({:?} policy).",
                        resolved.matches,
                        state.profile().duplicate_policy
                    ));
                }
                ui.add_space(8.0);
                metrics_grid(ui, &resolved.record, &result);
                if let Some(gpm) = positive(resolved.record.co2_tailpipe_gpm) {
                    ui.add_space(8.0);
                    plot::emissions_plot(ui, gpm, state.distance());
                }
            }
            Some(Err(e)) => {
                ui.label(RichText::new(e.to_string()).color(Color32::YELLOW));
            }
            None => {}
        },
    }
}

fn unavailable_or(value: Option<f64>, fmt: impl Fn(f64) -> String) -> RichText {
    match value {
        Some(v) => RichText::new(fmt(v)),
        None => RichText::new("unavailable").italics().color(Color32::GRAY),
    }
}

/// Trip distance exactly as the estimate used it.
fn format_distance(km: f64) -> String {
    format!("{km} km")
}

fn metrics_grid(ui: &mut Ui, record: &VehicleRecord, result: &EstimationResult) {
    egui::Grid::new("metrics")
        .num_columns(2)
        .spacing([24.0, 6.0])
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            ui.label("Trip distance");
            ui.label(format_distance(result.distance_km));
            ui.end_row();

            ui.label("CO₂ per km");
            ui.label(unavailable_or(result.co2_g_per_km, |v| format!("{v:.1} g/km")));
            ui.end_row();

            ui.label("Estimated CO₂");
            ui.label(
                unavailable_or(result.co2_kg, |v| format!("{v:.2} kg")).strong(),
            );
            ui.end_row();

            ui.label("Fuel consumption");
            ui.label(unavailable_or(result.liters_per_100km, |v| {
                format!("{v:.2} L/100 km")
            }));
            ui.end_row();

            ui.label("Estimated fuel");
            ui.label(unavailable_or(result.fuel_liters, |v| format!("{v:.2} L")));
            ui.end_row();

            ui.label("GHG score");
            let score = record
                .ghg_score
                .map(|s| format!("{s:.0} / 10, "))
                .unwrap_or_default();
            let bucket = result.ghg_bucket;
            let mut text = RichText::new(format!("{score}{bucket}"));
            if bucket != GhgBucket::Unavailable {
                text = text.strong();
            }
            ui.label(text.color(color::bucket_color(bucket)));
            ui.end_row();
        });
}

/// Rows still matching a partial selection.
fn matching_table(ui: &mut Ui, state: &AppState) {
    let Some(session) = &state.session else {
        return;
    };
    let view = session.view();
    let records = session.table().records();
    let shown = view.matching.len().min(MAX_TABLE_ROWS);

    ui.small(format!("{} matching vehicles", view.matching.len()));
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(90.0))
        .column(Column::auto().at_least(70.0))
        .column(Column::auto().at_least(90.0))
        .column(Column::auto())
        .column(Column::remainder())
        .header(20.0, |mut header| {
            for title in ["Manufacturer", "Fuel", "Model", "Year", "CO₂ g/mile"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, shown, |mut row| {
                let record = &records[view.matching[row.index()]];
                row.col(|ui| {
                    ui.label(&record.manufacturer);
                });
                row.col(|ui| {
                    ui.label(&record.fuel_type);
                });
                row.col(|ui| {
                    ui.label(&record.model);
                });
                row.col(|ui| {
                    ui.label(record.year.map(|y| y.to_string()).unwrap_or_default());
                });
                row.col(|ui| {
                    ui.label(unavailable_or(positive(record.co2_tailpipe_gpm), |v| {
                        format!("{v:.0}")
                    }));
                });
            });
        });
}
