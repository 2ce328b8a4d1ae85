// ABOUTME: Entity number formatting
// ABOUTME: Bit-exact <ECR|ECO|ECN>-<YY>-<NNN> rendering

use chrono::{DateTime, Datelike, Utc};
use ecflow_core::EntityType;

/// Last two digits of the calendar year of `at` (UTC)
pub fn two_digit_year(at: DateTime<Utc>) -> i32 {
    at.year().rem_euclid(100)
}

/// Render a number such as `ECR-25-001`.
///
/// The sequence is zero-padded to three digits and simply grows past 999
/// (`ECR-25-1000`), it is never re-padded or wrapped.
pub fn format_number(entity_type: EntityType, year: i32, sequence: i64) -> String {
    format!(
        "{}-{:02}-{:03}",
        entity_type.as_str(),
        year.rem_euclid(100),
        sequence
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_pads_to_three_digits() {
        assert_eq!(format_number(EntityType::Ecr, 25, 1), "ECR-25-001");
        assert_eq!(format_number(EntityType::Eco, 25, 42), "ECO-25-042");
        assert_eq!(format_number(EntityType::Ecn, 25, 999), "ECN-25-999");
    }

    #[test]
    fn test_format_grows_past_999() {
        assert_eq!(format_number(EntityType::Ecr, 25, 1000), "ECR-25-1000");
        assert_eq!(format_number(EntityType::Ecr, 25, 12345), "ECR-25-12345");
    }

    #[test]
    fn test_year_uses_two_digits() {
        assert_eq!(format_number(EntityType::Eco, 2007, 3), "ECO-07-003");

        let at = Utc.with_ymd_and_hms(2031, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(two_digit_year(at), 31);
    }
}
