use once_cell::sync::Lazy;
use regex::Regex;

use super::Sample;

/// Leading-sign, optional-decimal number, e.g. `-12`, `+.5`, `123.4`.
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?\d*\.?\d+").expect("numeric pattern is valid"));

/// A measurement carried by one free-text `Label: value` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Thrust,
    Temperature,
    Rpm,
    Voltage,
    Current,
}

impl Field {
    pub fn index(self) -> usize {
        match self {
            Field::Thrust => 0,
            Field::Temperature => 1,
            Field::Rpm => 2,
            Field::Voltage => 3,
            Field::Current => 4,
        }
    }
}

// Checked in order; the first keyword found decides the field.
const KEYWORDS: [(&str, Field); 6] = [
    ("load", Field::Thrust),
    ("thrust", Field::Thrust),
    ("temp", Field::Temperature),
    ("rpm", Field::Rpm),
    ("voltage", Field::Voltage),
    ("current", Field::Current),
];

/// What a single line from the device turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// Column header (`time,...` or `timestamp,...`).
    Header,
    /// A complete 7- or 8-column CSV reading.
    Sample(Sample),
    /// One value from the legacy one-field-per-line format.
    Field(Field, f64),
    Unrecognized,
}

/// Classify one line. Blank lines are [`LineKind::Unrecognized`].
pub fn classify_line(line: &str) -> LineKind {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Unrecognized;
    }

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if is_header(fields[0]) {
        return LineKind::Header;
    }

    match fields.len() {
        8 | 7 => parse_csv(&fields).map_or(LineKind::Unrecognized, LineKind::Sample),
        _ => parse_free_text(line).map_or(LineKind::Unrecognized, |(field, value)| LineKind::Field(field, value)),
    }
}

fn is_header(first: &str) -> bool {
    let first = first.to_ascii_lowercase();
    first.starts_with("time") || first.starts_with("timestamp")
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `time, thrust, rpm, temperature, voltage, current, power[, throttle]`.
/// Every column must be numeric.
pub fn parse_csv(fields: &[&str]) -> Option<Sample> {
    if fields.len() != 7 && fields.len() != 8 {
        return None;
    }
    let values = fields.iter().map(|f| parse_number(f)).collect::<Option<Vec<f64>>>()?;
    Some(Sample {
        elapsed_time: values[0],
        thrust: values[1],
        rpm: values[2],
        temperature: values[3],
        voltage: values[4],
        current: values[5],
        power: Some(values[6]),
        throttle: values.get(7).copied().unwrap_or(0.0),
        wall_clock_timestamp: String::new(),
    })
}

/// `Load cell: 123.4 g` style lines. The value is the first number after
/// the last colon.
pub fn parse_free_text(line: &str) -> Option<(Field, f64)> {
    let lower = line.to_lowercase();
    let field = KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, field)| *field)?;
    let tail = line.rsplit(':').next().unwrap_or(line);
    let value = NUMBER.find(tail).and_then(|m| parse_number(m.as_str()))?;
    Some((field, value))
}
