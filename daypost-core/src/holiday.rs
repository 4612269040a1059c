//! Calendar holiday detection.
//!
//! A holiday is either pinned to a month/day or floats on the Nth (or last)
//! occurrence of a weekday within one specific month.

use crate::types::HolidayMatch;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ordinal {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl Ordinal {
    fn weeks_after_first(self) -> Option<i64> {
        match self {
            Ordinal::First => Some(0),
            Ordinal::Second => Some(1),
            Ordinal::Third => Some(2),
            Ordinal::Fourth => Some(3),
            Ordinal::Last => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "lowercase")]
pub enum HolidayRule {
    Fixed {
        month: u32,
        day: u32,
    },
    Floating {
        month: u32,
        weekday: Weekday,
        ordinal: Ordinal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub key: String,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(flatten)]
    pub rule: HolidayRule,
}

fn default_category() -> String {
    "major".to_string()
}

impl Holiday {
    pub fn fixed(key: &str, name: &str, month: u32, day: u32) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            category: default_category(),
            rule: HolidayRule::Fixed { month, day },
        }
    }

    pub fn floating(key: &str, name: &str, month: u32, weekday: Weekday, ordinal: Ordinal) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            category: default_category(),
            rule: HolidayRule::Floating {
                month,
                weekday,
                ordinal,
            },
        }
    }

    fn to_match(&self, date: NaiveDate) -> HolidayMatch {
        HolidayMatch {
            key: self.key.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            date,
        }
    }
}

/// Date of the `ordinal` occurrence of `weekday` in the given month.
pub fn occurrence(year: i32, month: u32, weekday: Weekday, ordinal: Ordinal) -> Option<NaiveDate> {
    match ordinal.weeks_after_first() {
        Some(weeks) => {
            let first_day = NaiveDate::from_ymd_opt(year, month, 1)?;
            let offset = (7 + weekday.num_days_from_monday() as i64
                - first_day.weekday().num_days_from_monday() as i64)
                % 7;
            let date = first_day + Duration::days(offset + 7 * weeks);
            (date.month() == month).then_some(date)
        }
        None => {
            let mut day = last_day_of_month(year, month)?;
            while day.weekday() != weekday {
                day = day.pred_opt()?;
            }
            Some(day)
        }
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    holidays: Vec<Holiday>,
}

impl HolidayCalendar {
    pub fn new(holidays: Vec<Holiday>) -> Self {
        Self { holidays }
    }

    /// Major US holidays. Independence Day is intentionally left out.
    pub fn us_major() -> Self {
        Self::new(vec![
            Holiday::fixed("new_years_day", "New Year's Day", 1, 1),
            Holiday::floating(
                "martin_luther_king_day",
                "Martin Luther King Jr. Day",
                1,
                Weekday::Mon,
                Ordinal::Third,
            ),
            Holiday::floating("presidents_day", "Presidents' Day", 2, Weekday::Mon, Ordinal::Third),
            Holiday::floating("memorial_day", "Memorial Day", 5, Weekday::Mon, Ordinal::Last),
            Holiday::floating("labor_day", "Labor Day", 9, Weekday::Mon, Ordinal::First),
            Holiday::floating("columbus_day", "Columbus Day", 10, Weekday::Mon, Ordinal::Second),
            Holiday::fixed("veterans_day", "Veterans Day", 11, 11),
            Holiday::floating("thanksgiving", "Thanksgiving", 11, Weekday::Thu, Ordinal::Fourth),
            Holiday::fixed("christmas", "Christmas", 12, 25),
        ])
    }

    pub fn holidays(&self) -> &[Holiday] {
        &self.holidays
    }

    /// Fixed dates are checked before any floating rule.
    pub fn detect(&self, date: NaiveDate) -> Option<HolidayMatch> {
        let fixed = self.holidays.iter().find(|holiday| {
            matches!(holiday.rule, HolidayRule::Fixed { month, day }
                if month == date.month() && day == date.day())
        });
        if let Some(holiday) = fixed {
            return Some(holiday.to_match(date));
        }

        self.holidays
            .iter()
            .find(|holiday| match holiday.rule {
                HolidayRule::Floating {
                    month,
                    weekday,
                    ordinal,
                } => {
                    month == date.month()
                        && weekday == date.weekday()
                        && occurrence(date.year(), month, weekday, ordinal) == Some(date)
                }
                HolidayRule::Fixed { .. } => false,
            })
            .map(|holiday| holiday.to_match(date))
    }
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self::us_major()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_thanksgiving_2024() {
        let calendar = HolidayCalendar::us_major();
        let matched = calendar.detect(ymd(2024, 11, 28)).expect("Thanksgiving");
        assert_eq!(matched.name, "Thanksgiving");
        assert_eq!(matched.key, "thanksgiving");
        assert_eq!(matched.category, "major");
        assert_eq!(matched.date, ymd(2024, 11, 28));

        // Third Thursday, not the fourth
        assert!(calendar.detect(ymd(2024, 11, 21)).is_none());
    }

    #[test]
    fn test_fixed_holidays() {
        let calendar = HolidayCalendar::us_major();
        assert_eq!(calendar.detect(ymd(2025, 1, 1)).unwrap().key, "new_years_day");
        assert_eq!(calendar.detect(ymd(2023, 11, 11)).unwrap().key, "veterans_day");
        assert_eq!(calendar.detect(ymd(2030, 12, 25)).unwrap().key, "christmas");
        assert!(calendar.detect(ymd(2024, 7, 4)).is_none());
        assert!(calendar.detect(ymd(2024, 3, 14)).is_none());
    }

    #[test]
    fn test_floating_holidays() {
        let calendar = HolidayCalendar::us_major();
        assert_eq!(
            calendar.detect(ymd(2024, 1, 15)).unwrap().key,
            "martin_luther_king_day"
        );
        assert_eq!(calendar.detect(ymd(2024, 2, 19)).unwrap().key, "presidents_day");
        assert_eq!(calendar.detect(ymd(2024, 5, 27)).unwrap().key, "memorial_day");
        assert_eq!(calendar.detect(ymd(2024, 9, 2)).unwrap().key, "labor_day");
        assert_eq!(calendar.detect(ymd(2024, 10, 14)).unwrap().key, "columbus_day");
        assert_eq!(calendar.detect(ymd(2025, 11, 27)).unwrap().key, "thanksgiving");
    }

    #[test]
    fn test_right_weekday_wrong_ordinal() {
        let calendar = HolidayCalendar::us_major();
        // Second Monday of September 2024
        assert!(calendar.detect(ymd(2024, 9, 9)).is_none());
        // Memorial Day falls on the 27th in 2024, not the 20th
        assert!(calendar.detect(ymd(2024, 5, 20)).is_none());
        // Third Monday of a month with no floating holiday
        assert!(calendar.detect(ymd(2024, 3, 18)).is_none());
    }

    #[test]
    fn test_floating_holiday_has_no_fixed_date() {
        let calendar = HolidayCalendar::us_major();
        // Jan 15 2025 is a Wednesday; MLK Day that year is Jan 20
        assert!(calendar.detect(ymd(2025, 1, 15)).is_none());
        assert_eq!(
            calendar.detect(ymd(2025, 1, 20)).unwrap().key,
            "martin_luther_king_day"
        );
        // Nov 28 2025 is the Friday after Thanksgiving
        assert!(calendar.detect(ymd(2025, 11, 28)).is_none());
    }

    #[test]
    fn test_third_monday_of_january_range() {
        for year in 1990..=2100 {
            let date = occurrence(year, 1, Weekday::Mon, Ordinal::Third).unwrap();
            assert!((15..=21).contains(&date.day()), "{year}: {date}");
            assert_eq!(date.weekday(), Weekday::Mon);
        }
    }

    #[test]
    fn test_last_monday_of_may_never_in_june() {
        for year in 1990..=2100 {
            let date = occurrence(year, 5, Weekday::Mon, Ordinal::Last).unwrap();
            assert_eq!(date.month(), 5);
            assert!(date.day() >= 25);
        }
    }

    #[test]
    fn test_last_weekday_in_december_rolls_over_year() {
        let date = occurrence(2024, 12, Weekday::Tue, Ordinal::Last).unwrap();
        assert_eq!(date, ymd(2024, 12, 31));
        let date = occurrence(2023, 12, Weekday::Fri, Ordinal::Last).unwrap();
        assert_eq!(date, ymd(2023, 12, 29));
    }

    #[test]
    fn test_leap_year_last_weekday() {
        // Feb 29 2024 is a Thursday
        let date = occurrence(2024, 2, Weekday::Thu, Ordinal::Last).unwrap();
        assert_eq!(date, ymd(2024, 2, 29));
        let date = occurrence(2023, 2, Weekday::Tue, Ordinal::Last).unwrap();
        assert_eq!(date, ymd(2023, 2, 28));
    }

    #[test]
    fn test_detect_matches_only_computed_occurrences() {
        let calendar = HolidayCalendar::us_major();
        let mut date = ymd(2024, 1, 1);
        let end = ymd(2026, 12, 31);
        while date <= end {
            let expected = calendar.holidays().iter().any(|holiday| match holiday.rule {
                HolidayRule::Fixed { month, day } => date.month() == month && date.day() == day,
                HolidayRule::Floating {
                    month,
                    weekday,
                    ordinal,
                } => occurrence(date.year(), month, weekday, ordinal) == Some(date),
            });
            assert_eq!(calendar.detect(date).is_some(), expected, "{date}");
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_holiday_toml_roundtrip() {
        let source = r#"
            key = "labor_day"
            name = "Labor Day"
            rule = "floating"
            month = 9
            weekday = "Mon"
            ordinal = "first"
        "#;
        let holiday: Holiday = toml::from_str(source).unwrap();
        assert_eq!(
            holiday,
            Holiday::floating("labor_day", "Labor Day", 9, Weekday::Mon, Ordinal::First)
        );
    }
}
