use eframe::egui::Ui;
use egui_plot::{Legend, Line, Plot, PlotPoints, Points};

use co2_journey::estimate::{co2_kg, co2_per_km, TripDistance};

use crate::color;

/// Samples along the distance axis.
const SAMPLES: usize = 50;

// ---------------------------------------------------------------------------
// Emissions plot (central panel)
// ---------------------------------------------------------------------------

/// CO₂ mass against distance from zero to twice the trip, with the trip marked.
pub fn emissions_plot(ui: &mut Ui, co2_gpm: f64, trip: TripDistance) {
    let max_km = trip.km() * 2.0;
    let points: PlotPoints = (0..=SAMPLES)
        .map(|i| {
            let km = max_km * i as f64 / SAMPLES as f64;
            [km, co2_per_km(co2_gpm) * km / 1000.0]
        })
        .collect();
    let trip_point = [trip.km(), co2_kg(co2_gpm, trip)];

    Plot::new("emissions_plot")
        .legend(Legend::default())
        .x_axis_label("Distance (km)")
        .y_axis_label("CO₂ (kg)")
        .height(260.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(points)
                    .name("Emissions")
                    .color(color::emissions_line())
                    .width(1.5),
            );
            plot_ui.points(Points::new(vec![trip_point]).radius(5.0).name("This trip"));
        });
}
