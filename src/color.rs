use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use co2_journey::estimate::GhgBucket;

// ---------------------------------------------------------------------------
// GHG bucket colours
// ---------------------------------------------------------------------------

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let hsl = Hsl::new(hue, saturation, lightness);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Green for a clean vehicle, amber for average, red for a poor score.
pub fn bucket_color(bucket: GhgBucket) -> Color32 {
    match bucket {
        GhgBucket::High => hsl_to_color32(120.0, 0.6, 0.45),
        GhgBucket::Medium => hsl_to_color32(40.0, 0.9, 0.5),
        GhgBucket::Low => hsl_to_color32(0.0, 0.75, 0.5),
        GhgBucket::Unavailable => Color32::GRAY,
    }
}

/// Line colour for the emissions plot.
pub fn emissions_line() -> Color32 {
    hsl_to_color32(200.0, 0.75, 0.55)
}
