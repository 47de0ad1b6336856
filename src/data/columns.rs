use super::model::Field;

/// Canonical alias for a tailpipe CO₂ column whose header carries a degree sign.
pub const CO2_ALIAS: &str = "co2_tailpipe_gpm";

const DASH_VARIANTS: [char; 7] = [
    '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}', '\u{2212}',
];
const DEGREE_SIGNS: [char; 2] = ['°', 'º'];

// ---------------------------------------------------------------------------
// Header normalisation
// ---------------------------------------------------------------------------

/// Normalise a raw column header.
///
/// Headers differ between dataset vintages ("CO₂ Emissions (g/mi)°",
/// "Fuel Type", "Fuel–Type"). The rules are: trim, unify dashes to `-`,
/// collapse whitespace runs to `_`, map any degree-bearing CO₂ header to
/// [`CO2_ALIAS`], and spell the subscript `₂` as `2`.
pub fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('\u{feff}').trim();

    let lowered = trimmed.to_lowercase();
    let mentions_co2 = lowered.contains("co2") || lowered.contains("co₂");
    if mentions_co2 && trimmed.contains(DEGREE_SIGNS) {
        return CO2_ALIAS.to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut in_space = false;
    for c in trimmed.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        match c {
            c if DASH_VARIANTS.contains(&c) => out.push('-'),
            '₂' => out.push('2'),
            c => out.push(c),
        }
    }
    out
}

/// Map a normalised header to the field it carries, if any.
pub fn field_for_header(normalized: &str) -> Option<Field> {
    let key: String = normalized
        .chars()
        .filter(|c| !matches!(c, '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect();

    let field = match key.as_str() {
        "make" | "manufacturer" | "brand" | "carbrand" => Field::Manufacturer,
        "fueltype" | "fuel" | "fueltype1" | "vehicletype" => Field::FuelType,
        "model" | "carmodel" | "basemodel" => Field::Model,
        "year" | "modelyear" => Field::Year,
        "transmission" | "trany" | "gearbox" => Field::Transmission,
        "description" | "vclass" | "vehicleclass" | "trim" => Field::Description,
        "co2tailpipegpm" | "co2gpermile" | "co2gmi" | "co2(g/mi)" | "co2emissions(g/mi)"
        | "co2tailpipe" | "co2" => Field::Co2TailpipeGpm,
        "comb08" | "combinedmpg" | "combmpg" | "mpg" | "combinedfueleconomy" => {
            Field::CombinedMpg
        }
        "ghgscore" | "ghg" | "greenhousegasscore" => Field::GhgScore,
        _ => return None,
    };
    Some(field)
}

/// Resolve each source column to a field. The first column claiming a field wins.
pub fn map_headers<'a, I>(headers: I) -> Vec<Option<Field>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = Vec::new();
    headers
        .into_iter()
        .map(|raw| {
            let field = field_for_header(&normalize_header(raw))?;
            if seen.contains(&field) {
                log::debug!("ignoring duplicate column '{raw}' for {field}");
                return None;
            }
            seen.push(field);
            Some(field)
        })
        .collect()
}
