use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform value in `[lo, hi)`.
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// (manufacturer, fuel type, model, base CO₂ g/mile, base combined MPG)
const LINEUP: &[(&str, &str, &str, f64, f64)] = &[
    ("Toyota", "Petrol", "Corolla", 260.0, 34.0),
    ("Toyota", "Petrol", "Yaris", 235.0, 38.0),
    ("Toyota", "Hybrid", "Prius", 170.0, 52.0),
    ("Toyota", "Hybrid", "C-HR", 205.0, 45.0),
    ("BMW", "Diesel", "320d", 290.0, 36.0),
    ("BMW", "Diesel", "530d", 345.0, 31.0),
    ("BMW", "Electric", "i3", 0.0, 113.0),
    ("BMW", "Electric", "iX", 0.0, 86.0),
    ("Renault", "Petrol", "Clio", 240.0, 37.0),
    ("Renault", "Petrol", "Megane", 275.0, 33.0),
    ("Renault", "Electric", "Zoe", 0.0, 112.0),
];

const TRANSMISSIONS: [&str; 2] = ["Automatic", "Manual"];

struct Row {
    make: &'static str,
    fuel: &'static str,
    model: &'static str,
    year: i64,
    transmission: &'static str,
    co2: f64,
    mpg: f64,
    ghg: f64,
}

fn ghg_score(co2: f64) -> f64 {
    // EPA-style 1–10 scale: cleaner vehicles score higher.
    (10.0 - co2 / 45.0).round().clamp(1.0, 10.0)
}

fn generate(rng: &mut SimpleRng) -> Vec<Row> {
    let mut rows = Vec::new();
    for &(make, fuel, model, base_co2, base_mpg) in LINEUP {
        for year in 2015..=2024_i64 {
            // Newer model years are a little more efficient.
            let age = (2024 - year) as f64;
            for transmission in TRANSMISSIONS {
                if rng.next_f64() < 0.3 {
                    continue;
                }
                let co2 = if base_co2 > 0.0 {
                    (base_co2 * (1.0 + 0.012 * age) * rng.uniform(0.97, 1.03)).round()
                } else {
                    0.0
                };
                let mpg = (base_mpg * (1.0 - 0.008 * age) * rng.uniform(0.97, 1.03)).round();
                rows.push(Row {
                    make,
                    fuel,
                    model,
                    year,
                    transmission,
                    co2,
                    mpg,
                    ghg: ghg_score(co2),
                });
            }
        }
    }

    // One duplicate label combination with a different figure, so the
    // duplicate policy has something to decide.
    rows.push(Row {
        make: "Toyota",
        fuel: "Petrol",
        model: "Corolla",
        year: 2019,
        transmission: "Manual",
        co2: 268.0,
        mpg: 33.0,
        ghg: 4.0,
    });
    rows
}

fn write_csv(rows: &[Row], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    // Headers deliberately use mixed vintages: spaces, an en dash and a
    // degree-bearing CO₂ column.
    writer.write_record([
        "Make",
        "Fuel Type",
        "Model",
        "Year",
        "Transmission",
        "CO₂ Emissions (g/mi)°",
        "Combined\u{2013}MPG",
        "GHG Score",
    ])?;
    for r in rows {
        writer.write_record([
            r.make.to_string(),
            r.fuel.to_string(),
            r.model.to_string(),
            r.year.to_string(),
            r.transmission.to_string(),
            r.co2.to_string(),
            r.mpg.to_string(),
            r.ghg.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &str) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("make", DataType::Utf8, false),
        Field::new("fuelType", DataType::Utf8, false),
        Field::new("model", DataType::Utf8, false),
        Field::new("year", DataType::Int64, false),
        Field::new("trany", DataType::Utf8, false),
        Field::new("co2TailpipeGpm", DataType::Float64, false),
        Field::new("comb08", DataType::Float64, false),
        Field::new("ghgScore", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.make))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.fuel))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.model))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.year))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.transmission))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.co2))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.mpg))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.ghg))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng);

    let csv_path = "sample_vehicles.csv";
    let parquet_path = "sample_vehicles.parquet";
    write_csv(&rows, csv_path)?;
    write_parquet(&rows, parquet_path)?;

    println!("Wrote {} vehicles to {csv_path} and {parquet_path}", rows.len());
    Ok(())
}
