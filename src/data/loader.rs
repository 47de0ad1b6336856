use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::display::array_value_to_string;
use encoding_rs::Encoding;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::columns::{field_for_header, map_headers, normalize_header};
use super::error::LoadError;
use super::model::{Field, FieldValue, VehicleRecord, VehicleTable};

/// Cell tokens treated as missing, mirroring the usual dataframe NA markers.
const NA_TOKENS: [&str; 7] = ["", "NA", "N/A", "NaN", "nan", "null", "None"];

// ---------------------------------------------------------------------------
// Load options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadOptions {
    /// Field separator for delimited text.
    pub delimiter: u8,
    /// encoding_rs label such as `utf-8`, `latin1` or `windows-1252`.
    pub encoding: String,
    /// Rows missing any of these are dropped. Identity fields are always required.
    pub required_fields: Vec<Field>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: "utf-8".to_string(),
            required_fields: Field::IDENTITY.to_vec(),
        }
    }
}

impl LoadOptions {
    /// Identity fields plus the declared ones, deduplicated.
    pub fn effective_required(&self) -> Vec<Field> {
        let set: BTreeSet<Field> = Field::IDENTITY
            .iter()
            .chain(self.required_fields.iter())
            .copied()
            .collect();
        set.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a vehicle table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – delimited text, honouring `delimiter` and `encoding`
/// * `.json`         – `[{ "Make": "...", "Model": "...", ... }, ...]`
/// * `.parquet`      – flat columns, one row per vehicle
pub fn load_table(path: &Path, options: &LoadOptions) -> Result<VehicleTable, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "csv" | "txt" => read_csv(path, options)?,
        "json" => read_json(path, options)?,
        "parquet" | "pq" => read_parquet(path, options)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    let table = assemble(rows, &options.effective_required());
    log::info!(
        "Loaded {} vehicles from {} ({} rows dropped for missing fields)",
        table.len(),
        path.display(),
        table.dropped_rows
    );
    Ok(table)
}

/// Parsed cells of one source row, keyed by field.
type RowCells = BTreeMap<Field, FieldValue>;

fn ensure_columns(present: &BTreeSet<Field>, options: &LoadOptions) -> Result<(), LoadError> {
    let missing: Vec<Field> = options
        .effective_required()
        .into_iter()
        .filter(|f| !present.contains(f))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::MissingColumns(missing))
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path, options: &LoadOptions) -> Result<Vec<RowCells>, LoadError> {
    let bytes = read_file(path)?;
    let text = decode(&bytes, &options.encoding)?;
    parse_delimited(&text, options)
}

/// Decode raw bytes with an encoding_rs label. A BOM overrides the label.
fn decode(bytes: &[u8], label: &str) -> Result<String, LoadError> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| LoadError::UnknownEncoding(label.to_string()))?;
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(LoadError::Decode {
            encoding: used.name(),
        });
    }
    Ok(text.into_owned())
}

fn parse_delimited(text: &str, options: &LoadOptions) -> Result<Vec<RowCells>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::EmptySource);
    }
    let mapping = map_headers(headers.iter());
    let present: BTreeSet<Field> = mapping.iter().flatten().copied().collect();
    ensure_columns(&present, options)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut cells = RowCells::new();
        for (field, raw) in mapping.iter().zip(record.iter()) {
            if let Some(field) = field {
                cells.insert(*field, coerce(*field, FieldValue::Text(raw.to_string())));
            }
        }
        rows.push(cells);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Make": "Toyota", "Fuel Type": "Petrol", "Model": "Corolla", "co2TailpipeGpm": 250.0 },
///   ...
/// ]
/// ```
///
/// Keys keep their source order, so the first key claiming a field wins as
/// it does for CSV headers.
fn read_json(path: &Path, options: &LoadOptions) -> Result<Vec<RowCells>, LoadError> {
    let bytes = read_file(path)?;
    let root: JsonValue = serde_json::from_slice(&bytes)?;
    parse_json_records(&root, options)
}

fn parse_json_records(root: &JsonValue, options: &LoadOptions) -> Result<Vec<RowCells>, LoadError> {
    let Some(records) = root.as_array() else {
        return Err(LoadError::EmptySource);
    };

    let mut present = BTreeSet::new();
    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let Some(obj) = rec.as_object() else {
            log::debug!("JSON row {i} is not an object, skipped");
            continue;
        };
        let mut cells = RowCells::new();
        for (key, val) in obj {
            let Some(field) = field_for_header(&normalize_header(key)) else {
                continue;
            };
            present.insert(field);
            cells
                .entry(field)
                .or_insert_with(|| coerce(field, json_to_value(val)));
        }
        rows.push(cells);
    }
    ensure_columns(&present, options)?;
    Ok(rows)
}

fn json_to_value(val: &JsonValue) -> FieldValue {
    match val {
        JsonValue::String(s) => FieldValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                FieldValue::Float(f)
            } else {
                FieldValue::Text(n.to_string())
            }
        }
        JsonValue::Null => FieldValue::Null,
        other => FieldValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per attribute.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`); column names go through the same
/// normalisation as CSV headers.
fn read_parquet(path: &Path, options: &LoadOptions) -> Result<Vec<RowCells>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let mapping = map_headers(builder.schema().fields().iter().map(|f| f.name().as_str()));
    let present: BTreeSet<Field> = mapping.iter().flatten().copied().collect();
    ensure_columns(&present, options)?;

    let reader = builder.build()?;
    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let columns: Vec<(Field, &ArrayRef)> = mapping
            .iter()
            .zip(batch.columns())
            .filter_map(|(field, col)| field.map(|f| (f, col)))
            .collect();

        for row in 0..batch.num_rows() {
            let mut cells = RowCells::new();
            for (field, col) in &columns {
                cells.insert(*field, coerce(*field, arrow_to_value(col, row)?));
            }
            rows.push(cells);
        }
    }
    Ok(rows)
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_to_value(col: &ArrayRef, row: usize) -> Result<FieldValue, LoadError> {
    if col.is_null(row) {
        return Ok(FieldValue::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => FieldValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => FieldValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => FieldValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => FieldValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => {
            FieldValue::Float(col.as_primitive::<Float32Type>().value(row) as f64)
        }
        DataType::Float64 => FieldValue::Float(col.as_primitive::<Float64Type>().value(row)),
        _ => FieldValue::Text(array_value_to_string(col, row)?),
    };
    Ok(value)
}

// ---------------------------------------------------------------------------
// Cell coercion and record assembly
// ---------------------------------------------------------------------------

/// Convert a raw cell into the type its field expects. Anything that does not
/// parse becomes `Null` and is handled by the required-field check.
fn coerce(field: Field, value: FieldValue) -> FieldValue {
    let value = match value {
        FieldValue::Text(s) => {
            let trimmed = s.trim();
            if NA_TOKENS.contains(&trimmed) {
                return FieldValue::Null;
            }
            FieldValue::Text(trimmed.to_string())
        }
        FieldValue::Float(f) if !f.is_finite() => return FieldValue::Null,
        other => other,
    };

    match field {
        Field::Manufacturer
        | Field::FuelType
        | Field::Model
        | Field::Transmission
        | Field::Description => match value {
            FieldValue::Integer(i) => FieldValue::Text(i.to_string()),
            FieldValue::Float(f) => FieldValue::Text(f.to_string()),
            other => other,
        },
        Field::Year => match value {
            FieldValue::Float(f) if f.fract() == 0.0 => FieldValue::Integer(f as i64),
            FieldValue::Text(ref s) => parse_year(s).unwrap_or_else(|| {
                log::debug!("unparsable year '{s}'");
                FieldValue::Null
            }),
            FieldValue::Integer(_) => value,
            _ => FieldValue::Null,
        },
        Field::Co2TailpipeGpm | Field::CombinedMpg | Field::GhgScore => match value {
            FieldValue::Integer(i) => FieldValue::Float(i as f64),
            FieldValue::Text(ref s) => match s.parse::<f64>() {
                Ok(f) if f.is_finite() => FieldValue::Float(f),
                _ => {
                    log::debug!("unparsable {field} value '{s}'");
                    FieldValue::Null
                }
            },
            other => other,
        },
    }
}

fn parse_year(s: &str) -> Option<FieldValue> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(FieldValue::Integer(i));
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(FieldValue::Integer(f as i64)),
        _ => None,
    }
}

fn assemble(rows: Vec<RowCells>, required: &[Field]) -> VehicleTable {
    let total = rows.len();
    let records: Vec<VehicleRecord> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, cells)| {
            let record = build_record(&cells, required);
            if record.is_none() {
                log::debug!("row {i} dropped: missing a required field");
            }
            record
        })
        .collect();

    let mut table = VehicleTable::from_records(records);
    table.dropped_rows = total - table.len();
    table
}

fn build_record(cells: &RowCells, required: &[Field]) -> Option<VehicleRecord> {
    let present = |f: &Field| cells.get(f).is_some_and(|v| !v.is_null());
    if !required.iter().all(present) {
        return None;
    }

    let text = |f: Field| match cells.get(&f) {
        Some(FieldValue::Text(s)) => Some(s.clone()),
        _ => None,
    };
    let float = |f: Field| match cells.get(&f) {
        Some(FieldValue::Float(v)) => Some(*v),
        _ => None,
    };

    Some(VehicleRecord {
        manufacturer: text(Field::Manufacturer)?,
        fuel_type: text(Field::FuelType)?,
        model: text(Field::Model)?,
        year: match cells.get(&Field::Year) {
            Some(FieldValue::Integer(y)) => Some(*y),
            _ => None,
        },
        transmission: text(Field::Transmission),
        description: text(Field::Description),
        co2_tailpipe_gpm: float(Field::Co2TailpipeGpm),
        combined_mpg: float(Field::CombinedMpg),
        ghg_score: float(Field::GhgScore),
    })
}

// ---------------------------------------------------------------------------
// Process-wide memoisation
// ---------------------------------------------------------------------------

/// Loads each (file, options) pair once and hands out shared read-only tables.
#[derive(Debug, Default)]
pub struct TableCache {
    tables: Mutex<HashMap<(PathBuf, LoadOptions), Arc<VehicleTable>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(
        &self,
        path: &Path,
        options: &LoadOptions,
    ) -> Result<Arc<VehicleTable>, LoadError> {
        let canonical = path.canonicalize().map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let key = (canonical, options.clone());

        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = tables.get(&key) {
            log::debug!("table cache hit for {}", key.0.display());
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(load_table(&key.0, options)?);
        tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Number of distinct tables held.
    pub fn len(&self) -> usize {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_temp(suffix: &str, bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        file.write_all(bytes).expect("write temp file");
        file.flush().expect("flush temp file");
        file
    }

    fn options_with(required: &[Field]) -> LoadOptions {
        LoadOptions {
            required_fields: required.to_vec(),
            ..LoadOptions::default()
        }
    }

    const SAMPLE: &str = "\
Make , Fuel Type,Model,Year,CO₂ Emissions (g/mi)°,comb08,ghgScore
Toyota,Petrol, Corolla ,2019,250.5,35,7
Toyota,Hybrid,Prius,2020,180,52,9
BMW,Diesel,320d,,300,30,
,Petrol,Clio,2018,200,40,6
Renault,Electric,Zoe,2021,0,,10
";

    #[test]
    fn csv_headers_are_normalised_and_rows_trimmed() {
        let file = write_temp(".csv", SAMPLE.as_bytes());
        let table = load_table(file.path(), &LoadOptions::default()).unwrap();

        // Row without a manufacturer is dropped.
        assert_eq!(table.len(), 4);
        assert_eq!(table.dropped_rows, 1);

        let corolla = &table.records()[0];
        assert_eq!(corolla.model, "Corolla");
        assert_eq!(corolla.year, Some(2019));
        assert_eq!(corolla.co2_tailpipe_gpm, Some(250.5));
        assert_eq!(corolla.combined_mpg, Some(35.0));
        assert_eq!(corolla.ghg_score, Some(7.0));

        let bmw = &table.records()[2];
        assert_eq!(bmw.year, None);
        assert_eq!(bmw.ghg_score, None);
    }

    #[test]
    fn declared_required_fields_drop_incomplete_rows() {
        let file = write_temp(".csv", SAMPLE.as_bytes());
        let options = options_with(&[Field::Year, Field::CombinedMpg]);
        let table = load_table(file.path(), &options).unwrap();
        let models: Vec<&str> = table.records().iter().map(|r| r.model.as_str()).collect();
        assert_eq!(models, vec!["Corolla", "Prius"]);
        assert_eq!(table.dropped_rows, 3);
    }

    #[test]
    fn missing_required_column_is_a_load_error() {
        let file = write_temp(".csv", b"Make,Model\nToyota,Corolla\n");
        let err = load_table(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumns(ref f) if f == &vec![Field::FuelType]));
    }

    #[test]
    fn semicolon_delimited_latin1_source() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1252
            .encode("Make;Fuel Type;Model\nCitroën;Diesel;C4\n");
        let file = write_temp(".csv", &bytes);
        let options = LoadOptions {
            delimiter: b';',
            encoding: "latin1".to_string(),
            ..LoadOptions::default()
        };
        let table = load_table(file.path(), &options).unwrap();
        assert_eq!(table.records()[0].manufacturer, "Citroën");
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let file = write_temp(".csv", b"Make,Fuel Type,Model\nCitro\xebn,Diesel,C4\n");
        let err = load_table(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn unknown_encoding_label_is_rejected() {
        let file = write_temp(".csv", SAMPLE.as_bytes());
        let options = LoadOptions {
            encoding: "klingon".to_string(),
            ..LoadOptions::default()
        };
        let err = load_table(file.path(), &options).unwrap_err();
        assert!(matches!(err, LoadError::UnknownEncoding(ref l) if l == "klingon"));
    }

    #[test]
    fn unsupported_extension() {
        let file = write_temp(".xlsx", b"");
        let err = load_table(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ref e) if e == "xlsx"));
    }

    #[test]
    fn json_records_with_numeric_model_names() {
        let json = r#"[
            {"make": "Fiat", "fuelType": "Petrol", "model": 500, "year": 2015.0, "co2TailpipeGpm": 260},
            {"make": "Fiat", "fuelType": null, "model": "Panda"},
            "not a record"
        ]"#;
        let file = write_temp(".json", json.as_bytes());
        let table = load_table(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
        let fiat = &table.records()[0];
        assert_eq!(fiat.model, "500");
        assert_eq!(fiat.year, Some(2015));
        assert_eq!(fiat.co2_tailpipe_gpm, Some(260.0));
    }

    #[test]
    fn json_first_key_claiming_a_field_wins() {
        let json = r#"[
            {"brand": "Toyota", "Make": "Lexus", "fuelType": "Petrol", "model": "Corolla"}
        ]"#;
        let file = write_temp(".json", json.as_bytes());
        let table = load_table(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.records()[0].manufacturer, "Toyota");
    }

    #[test]
    fn parquet_flat_columns() {
        use arrow::array::{Float64Array, Int64Array, StringArray};
        use arrow::datatypes::{Field as ArrowField, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            ArrowField::new("make", DataType::Utf8, false),
            ArrowField::new("fuelType", DataType::Utf8, false),
            ArrowField::new("model", DataType::Utf8, false),
            ArrowField::new("year", DataType::Int64, true),
            ArrowField::new("co2TailpipeGpm", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["BMW", "BMW"])),
                Arc::new(StringArray::from(vec!["Electric", "Diesel"])),
                Arc::new(StringArray::from(vec!["i3", "530d"])),
                Arc::new(Int64Array::from(vec![Some(2017), None])),
                Arc::new(Float64Array::from(vec![Some(0.0), Some(320.0)])),
            ],
        )
        .unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.reopen().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_table(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].year, Some(2017));
        // Zero CO₂ is a real figure; the estimator reports it as unavailable.
        assert_eq!(table.records()[0].co2_tailpipe_gpm, Some(0.0));
        assert_eq!(table.records()[1].year, None);
        assert_eq!(table.records()[1].co2_tailpipe_gpm, Some(320.0));
    }

    #[test]
    fn cache_loads_each_source_once() {
        let file = write_temp(".csv", SAMPLE.as_bytes());
        let cache = TableCache::new();
        let a = cache.get_or_load(file.path(), &LoadOptions::default()).unwrap();
        let b = cache.get_or_load(file.path(), &LoadOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let strict = options_with(&[Field::Year]);
        let c = cache.get_or_load(file.path(), &strict).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }
}
