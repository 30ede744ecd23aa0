use chrono::{NaiveDate, NaiveTime};

/// Digits kept for floating point results in ledger rows.
pub const PRECISION: i32 = 5;

/// `YYYYMMDD` to `DD.MM.YYYY`.
pub fn format_series_date(raw: &str) -> Option<String> {
    let digits = raw.trim().get(..8)?;
    NaiveDate::parse_from_str(digits, "%Y%m%d")
        .ok()
        .map(|date| date.format("%d.%m.%Y").to_string())
}

/// `HHMMSS[.ffffff]` to `HH:MM:SS`. Shorter `HH` and `HHMM` forms are zero padded.
pub fn format_series_time(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let whole = raw.split('.').next().unwrap_or(raw);
    if !matches!(whole.len(), 2 | 4 | 6) {
        return None;
    }
    let padded = format!("{whole:0<6}");
    NaiveTime::parse_from_str(&padded, "%H%M%S")
        .ok()
        .map(|time| time.format("%H:%M:%S").to_string())
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// Replaces characters that cannot appear in a file name.
pub fn file_name_component(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
