use chrono::{DateTime, Months, Utc};

/// Calendar-month addition.
///
/// When the target month is shorter than the source day, the result is clamped to the last
/// valid day of that month (Jan 31 + 1 month is Feb 29 in a leap year, Feb 28 otherwise).
/// Time of day is preserved. Returns `None` only when the result leaves chrono's range.
pub fn add_months(start: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    start.checked_add_months(Months::new(months))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn twelve_months_lands_on_same_day_next_year() {
        assert_eq!(add_months(at(2024, 1, 15), 12), Some(at(2025, 1, 15)));
    }

    #[test]
    fn month_overflow_clamps_to_last_day() {
        assert_eq!(add_months(at(2024, 1, 31), 1), Some(at(2024, 2, 29)));
        assert_eq!(add_months(at(2023, 1, 31), 1), Some(at(2023, 2, 28)));
        assert_eq!(add_months(at(2024, 3, 31), 1), Some(at(2024, 4, 30)));
    }

    #[test]
    fn zero_months_is_identity() {
        assert_eq!(add_months(at(2024, 6, 1), 0), Some(at(2024, 6, 1)));
    }
}
