use chrono::NaiveDate;
use rand::Rng;

pub const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &[u8] = b"0123456789";
pub const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Latest day every month has, so shifted dates never need per-month validation.
pub const MAX_SAFE_DAY: u32 = 28;

pub fn random_string<R: Rng + ?Sized>(rng: &mut R, length: usize, charset: &[u8]) -> String {
    if charset.is_empty() {
        return String::new();
    }
    (0..length)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

/// Moves `(year, month)` by `delta` months, rolling across year boundaries in both directions.
/// The year is returned as `i64`; callers reject years outside the calendar range.
pub fn shift_month(year: i32, month: u32, delta: i64) -> (i64, u32) {
    let total = year as i64 * 12 + (month as i64 - 1) + delta;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

pub fn clamp_day(day: i64) -> u32 {
    day.clamp(1, MAX_SAFE_DAY as i64) as u32
}

/// Parses a `YYMMDD` value date into `(year, month, day)`.
///
/// The day is only range-checked against 1..=31; callers clamp it before
/// building a calendar date.
pub fn parse_swift_date(value: &str) -> Option<(i32, u32, u32)> {
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = value[0..2].parse().ok()?;
    let month: u32 = value[2..4].parse().ok()?;
    let day: u32 = value[4..6].parse().ok()?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    Some((2000 + year, month, day))
}

pub fn format_swift_date(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// Parses a SWIFT amount using comma as the decimal separator (`10000,00`).
/// Dots are accepted as thousands separators when a comma is present.
pub fn parse_amount(value: &str) -> Option<f64> {
    if !value.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if !value.bytes().all(|b| b.is_ascii_digit() || b == b',' || b == b'.') {
        return None;
    }
    if value.matches(',').count() > 1 {
        return None;
    }

    let normalized = if value.contains(',') {
        value.replace('.', "").replace(',', ".")
    } else {
        value.to_string()
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Renders an amount with two fractional digits and a comma separator.
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value.max(0.0)).replace('.', ",")
}

pub fn is_amount_char(c: char) -> bool {
    c.is_ascii_digit() || c == ',' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_shift_month_rolls_years() {
        assert_eq!(shift_month(2023, 1, -1), (2022, 12));
        assert_eq!(shift_month(2023, 12, 1), (2024, 1));
        assert_eq!(shift_month(2023, 6, 0), (2023, 6));
        assert_eq!(shift_month(2023, 3, -27), (2020, 12));
        assert_eq!(shift_month(2023, 11, 14), (2025, 1));
    }

    #[test]
    fn test_shift_month_extreme_deltas() {
        let (year, month) = shift_month(2023, 6, i32::MAX as i64);
        assert!(year > i32::MAX as i64 / 12);
        assert!((1..=12).contains(&month));

        let (year, month) = shift_month(2023, 6, -(u32::MAX as i64));
        assert!(year < 0);
        assert!((1..=12).contains(&month));
    }

    #[test]
    fn test_clamp_day() {
        assert_eq!(clamp_day(-4), 1);
        assert_eq!(clamp_day(0), 1);
        assert_eq!(clamp_day(15), 15);
        assert_eq!(clamp_day(31), 28);
    }

    #[test]
    fn test_parse_swift_date() {
        assert_eq!(parse_swift_date("230101"), Some((2023, 1, 1)));
        assert_eq!(parse_swift_date("991231"), Some((2099, 12, 31)));
        assert_eq!(parse_swift_date("231301"), None);
        assert_eq!(parse_swift_date("230100"), None);
        assert_eq!(parse_swift_date("2301"), None);
        assert_eq!(parse_swift_date("23A101"), None);
    }

    #[test]
    fn test_format_swift_date() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        assert_eq!(format_swift_date(date), "240209");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("10000,00"), Some(10000.0));
        assert_eq!(parse_amount("1.250,50"), Some(1250.5));
        assert_eq!(parse_amount("1000,"), Some(1000.0));
        assert_eq!(parse_amount("750"), Some(750.0));
        assert_eq!(parse_amount(","), None);
        assert_eq!(parse_amount("1,0,0"), None);
        assert_eq!(parse_amount("12A"), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(10000.0), "10000,00");
        assert_eq!(format_amount(1234.567), "1234,57");
        assert_eq!(format_amount(0.0), "0,00");
    }

    #[test]
    fn test_random_string_charset_and_length() {
        let mut rng = StdRng::seed_from_u64(42);
        let value = random_string(&mut rng, 12, ALPHANUMERIC);
        assert_eq!(value.len(), 12);
        assert!(value
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(random_string(&mut rng, 0, DIGITS), "");
        assert_eq!(random_string(&mut rng, 5, &[]), "");
    }
}
