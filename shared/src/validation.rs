//! Validation utilities for the Granel inventory platform

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Validate a quantity is strictly positive
pub fn validate_quantity(quantity: f64) -> Result<(), &'static str> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a unit cost is strictly positive
pub fn validate_unit_cost(cost: f64) -> Result<(), &'static str> {
    if !cost.is_finite() || cost <= 0.0 {
        return Err("Unit cost must be greater than zero");
    }
    Ok(())
}

/// Validate a markup percentage is non-negative
pub fn validate_markup(markup: f64) -> Result<(), &'static str> {
    if !markup.is_finite() || markup < 0.0 {
        return Err("Markup must be zero or positive");
    }
    Ok(())
}

/// Validate a product name is non-empty
pub fn validate_product_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Product name must not be empty");
    }
    Ok(())
}

/// Parse a request date, accepting RFC 3339 timestamps, naive ISO-8601
/// timestamps (taken as UTC) or bare `YYYY-MM-DD` dates.
///
/// A bare date is expanded to the start of the day, or to the end of the
/// day when `end_of_day` is set, so date-only ranges stay inclusive.
pub fn parse_date_param(value: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = value.parse::<NaiveDateTime>() {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    if let Ok(date) = value.parse::<NaiveDate>() {
        let time = if end_of_day {
            date.and_hms_opt(23, 59, 59)?
        } else {
            date.and_hms_opt(0, 0, 0)?
        };
        return Some(DateTime::from_naive_utc_and_offset(time, Utc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn rejects_non_positive_amounts() {
        assert!(validate_quantity(0.0).is_err());
        assert!(validate_quantity(-1.5).is_err());
        assert!(validate_quantity(f64::NAN).is_err());
        assert!(validate_quantity(2.5).is_ok());
        assert!(validate_unit_cost(0.0).is_err());
        assert!(validate_unit_cost(1200.0).is_ok());
    }

    #[test]
    fn markup_may_be_zero_but_not_negative() {
        assert!(validate_markup(0.0).is_ok());
        assert!(validate_markup(35.0).is_ok());
        assert!(validate_markup(-1.0).is_err());
    }

    #[test]
    fn parses_bare_dates_inclusively() {
        let start = parse_date_param("2024-03-01", false).unwrap();
        assert_eq!(start.hour(), 0);
        let end = parse_date_param("2024-03-01", true).unwrap();
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
    }

    #[test]
    fn parses_full_timestamps() {
        assert!(parse_date_param("2024-03-01T10:30:00Z", false).is_some());
        assert!(parse_date_param("2024-03-01T10:30:00", false).is_some());
        assert!(parse_date_param("not-a-date", false).is_none());
    }
}
