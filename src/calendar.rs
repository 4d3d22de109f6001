use time::{Date, Month};

use crate::error::Error;

/// One calendar row, Sunday first. `0` marks a day outside the month.
pub type Week = [u8; 7];

/// Weeks of `year`/`month`, Sunday first, padded with zeros.
///
/// # Errors
///
/// Returns [`Error::Date`] for a month outside `1..=12` or an unsupported year.
pub fn month_weeks(year: i32, month: u8) -> Result<Vec<Week>, Error> {
    let month = Month::try_from(month).map_err(|e| Error::Date(e.to_string()))?;
    let first = Date::from_calendar_date(year, month, 1).map_err(|e| Error::Date(e.to_string()))?;

    let mut weeks = Vec::with_capacity(6);
    let mut week: Week = [0; 7];
    let mut slot = usize::from(first.weekday().number_days_from_sunday());

    let mut day = Some(first);
    while let Some(date) = day.filter(|d| d.month() == month) {
        week[slot] = date.day();
        slot += 1;
        if slot == 7 {
            weeks.push(week);
            week = [0; 7];
            slot = 0;
        }
        day = date.next_day();
    }
    if slot > 0 {
        weeks.push(week);
    }
    Ok(weeks)
}

/// English month name, or `None` outside `1..=12`.
#[must_use]
pub fn month_name(month: u8) -> Option<String> {
    Month::try_from(month).ok().map(|m| m.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_starting_on_sunday() {
        // September 2024 starts on a Sunday and has 30 days.
        let weeks = month_weeks(2024, 9).unwrap();
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0], [1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(weeks[4], [29, 30, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_month_padding_at_start() {
        // October 2026 starts on a Thursday.
        let weeks = month_weeks(2026, 10).unwrap();
        assert_eq!(weeks[0], [0, 0, 0, 0, 1, 2, 3]);
        assert_eq!(weeks.last().unwrap(), &[25, 26, 27, 28, 29, 30, 31]);
    }

    #[test]
    fn test_leap_february() {
        let weeks = month_weeks(2024, 2).unwrap();
        let days: Vec<u8> = weeks.iter().flatten().copied().filter(|d| *d > 0).collect();
        assert_eq!(days.len(), 29);
        assert_eq!(days.first(), Some(&1));
        assert_eq!(days.last(), Some(&29));
    }

    #[test]
    fn test_six_week_month() {
        // August 2026 starts on a Saturday with 31 days.
        let weeks = month_weeks(2026, 8).unwrap();
        assert_eq!(weeks.len(), 6);
        assert_eq!(weeks[0], [0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(weeks[5], [30, 31, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_invalid_month() {
        assert!(month_weeks(2024, 0).is_err());
        assert!(month_weeks(2024, 13).is_err());
    }

    #[test]
    fn test_month_name() {
        assert_eq!(month_name(1).as_deref(), Some("January"));
        assert_eq!(month_name(10).as_deref(), Some("October"));
        assert_eq!(month_name(13), None);
    }
}
