use super::error::{ClientError, Result};
use chrono::{Datelike, Days, NaiveDate, Utc, Weekday};
use std::fmt;
use std::str::FromStr;

/// An ISO-8601 week, written `YYYY-Www` (e.g. `2024-W05`).
///
/// Filters that take a week treat "no week" as the current reporting period,
/// so most APIs accept `Option<WeekId>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekId {
    year: i32,
    week: u32,
}

impl WeekId {
    /// Validates that the week exists in that ISO year (week 53 only exists
    /// in some years).
    pub fn new(year: i32, week: u32) -> Result<Self> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .map(|_| Self { year, week })
            .ok_or_else(|| {
                ClientError::InvalidInput(format!("{}-W{:02} is not an ISO week", year, week))
            })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn current() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    /// Monday of this week.
    pub fn start_date(&self) -> NaiveDate {
        // Constructed through `new`/`from_date`, so the date exists.
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).unwrap_or(NaiveDate::MIN)
    }

    pub fn next(&self) -> Self {
        self.start_date()
            .checked_add_days(Days::new(7))
            .map(Self::from_date)
            .unwrap_or(*self)
    }

    pub fn prev(&self) -> Self {
        self.start_date()
            .checked_sub_days(Days::new(7))
            .map(Self::from_date)
            .unwrap_or(*self)
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ClientError::InvalidInput(format!("'{}' is not a week (expected YYYY-Www)", s));

        let (year, week) = s.trim().split_once("-W").ok_or_else(invalid)?;
        if year.len() != 4 || week.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let week: u32 = week.parse().map_err(|_| invalid())?;
        Self::new(year, week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let week: WeekId = "2024-W05".parse().unwrap();
        assert_eq!(week.year(), 2024);
        assert_eq!(week.week(), 5);
        assert_eq!(week.to_string(), "2024-W05");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("2024-05".parse::<WeekId>().is_err());
        assert!("2024-W5".parse::<WeekId>().is_err());
        assert!("24-W05".parse::<WeekId>().is_err());
        assert!("2024-W00".parse::<WeekId>().is_err());
        assert!("2024-Wxx".parse::<WeekId>().is_err());
    }

    #[test]
    fn test_week_53_only_in_long_years() {
        // 2020 has 53 ISO weeks, 2021 does not.
        assert!(WeekId::new(2020, 53).is_ok());
        assert!(WeekId::new(2021, 53).is_err());
    }

    #[test]
    fn test_next_and_prev_cross_year() {
        let last = WeekId::new(2020, 53).unwrap();
        assert_eq!(last.next().to_string(), "2021-W01");
        assert_eq!(last.next().prev(), last);

        let first = WeekId::new(2024, 1).unwrap();
        assert_eq!(first.prev().to_string(), "2023-W52");
    }

    #[test]
    fn test_start_date_is_monday() {
        let week: WeekId = "2024-W05".parse().unwrap();
        assert_eq!(week.start_date(), NaiveDate::from_ymd_opt(2024, 1, 29).unwrap());
        assert_eq!(WeekId::from_date(week.start_date()), week);
    }
}
