use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Europe::Paris;

const MONTHS: [&str; 12] = [
    "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.", "nov.",
    "déc.",
];

/// Euros the way a French till prints them: `1 234,50 €`.
pub fn format_currency(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let units = (cents / 100).to_string();

    let mut grouped = String::new();
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('\u{202f}');
        }
        grouped.push(digit);
    }
    format!("{}{},{:02}\u{a0}€", sign, grouped, cents % 100)
}

/// Medium date and short time in Paris local time: `14 nov. 2023, 23:13`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    let local = at.with_timezone(&Paris);
    format!(
        "{} {} {}, {}",
        local.day(),
        MONTHS[local.month0() as usize],
        local.year(),
        local.format("%H:%M")
    )
}
