//! Ages, birthdays, zodiac signs and life milestones. Everything works on calendar dates; a
//! February 29 birthday falls on February 28 in other years.

use std::{cmp::Ordering, fmt::Display};

use anyhow::{bail, Result};
use chrono::{Datelike, Months, NaiveDate};

use crate::error::DaybookError;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%d %B %Y",
];

const DAYS_IN_YEAR: f64 = 365.25;

/// Tries the supported formats in order, so `03/04/2020` reads as 3 April.
pub fn parse_date(text: &str) -> Result<NaiveDate, DaybookError> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(|| DaybookError::InvalidDate(text.to_string()))
}

/// The birthday of `birth` in `year`.
fn anniversary(birth: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birth.month(), birth.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 2, 28))
}

/// Whole months between the dates, counting a month only once its day has been reached.
fn whole_months(from: NaiveDate, to: NaiveDate) -> u32 {
    let months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    let months = if to.day() < from.day() { months - 1 } else { months };
    months.max(0) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactAge {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Age {
    pub birth_date: NaiveDate,
    pub on: NaiveDate,
    pub exact: ExactAge,
    pub total_months: u32,
    pub total_weeks: i64,
    pub total_days: i64,
    pub next_birthday: NaiveDate,
    pub days_to_next_birthday: i64,
}

impl Age {
    pub fn calculate(birth_date: NaiveDate, on: NaiveDate) -> Result<Age> {
        if birth_date > on {
            bail!("Birth date {birth_date} is after {on}");
        }
        let total_months = whole_months(birth_date, on);
        // Months are added from the birth date, so the remaining days never exceed a month.
        let last_monthiversary = birth_date
            .checked_add_months(Months::new(total_months))
            .unwrap_or(on)
            .min(on);
        let exact = ExactAge {
            years: total_months / 12,
            months: total_months % 12,
            days: (on - last_monthiversary).num_days() as u32,
        };

        let next_birthday = match anniversary(birth_date, on.year()) {
            Some(date) if date >= on => Some(date),
            _ => anniversary(birth_date, on.year() + 1),
        }
        .unwrap_or(on);
        let total_days = (on - birth_date).num_days();

        Ok(Age {
            birth_date,
            on,
            exact,
            total_months,
            total_weeks: total_days / 7,
            total_days,
            next_birthday,
            days_to_next_birthday: (next_birthday - on).num_days(),
        })
    }

    pub fn years(&self) -> u32 {
        self.exact.years
    }

    pub fn total_hours(&self) -> i64 {
        self.total_days * 24
    }
}

impl Display for Age {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "🎂 Born {}", self.birth_date.format("%B %d, %Y"))?;
        writeln!(
            f,
            "Exact age on {}: {} years, {} months, {} days",
            self.on.format("%B %d, %Y"),
            self.exact.years,
            self.exact.months,
            self.exact.days
        )?;
        writeln!(f, "  Months:  {}", self.total_months)?;
        writeln!(f, "  Weeks:   {}", self.total_weeks)?;
        writeln!(f, "  Days:    {}", self.total_days)?;
        writeln!(f, "  Hours:   {}", self.total_hours())?;
        writeln!(f, "  Minutes: {}", self.total_hours() * 60)?;
        writeln!(f, "  Seconds: {}", self.total_hours() * 3600)?;
        write!(
            f,
            "🎉 Next birthday {} in {} days, turning {}",
            self.next_birthday.format("%B %d, %Y"),
            self.days_to_next_birthday,
            self.years() + u32::from(self.days_to_next_birthday > 0)
        )
    }
}

/// First and last day of each sign. Capricorn wraps around the new year.
const WESTERN_SIGNS: &[((u32, u32), (u32, u32), &str, &str)] = &[
    ((1, 20), (2, 18), "Aquarius", "♒"),
    ((2, 19), (3, 20), "Pisces", "♓"),
    ((3, 21), (4, 19), "Aries", "♈"),
    ((4, 20), (5, 20), "Taurus", "♉"),
    ((5, 21), (6, 20), "Gemini", "♊"),
    ((6, 21), (7, 22), "Cancer", "♋"),
    ((7, 23), (8, 22), "Leo", "♌"),
    ((8, 23), (9, 22), "Virgo", "♍"),
    ((9, 23), (10, 22), "Libra", "♎"),
    ((10, 23), (11, 21), "Scorpio", "♏"),
    ((11, 22), (12, 21), "Sagittarius", "♐"),
    ((12, 22), (1, 19), "Capricorn", "♑"),
];

const CHINESE_ANIMALS: [&str; 12] = [
    "Monkey", "Rooster", "Dog", "Pig", "Rat", "Ox", "Tiger", "Rabbit", "Dragon", "Snake", "Horse",
    "Goat",
];

const CHINESE_ELEMENTS: [&str; 5] = ["Metal", "Water", "Wood", "Fire", "Earth"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zodiac {
    pub sign: &'static str,
    pub symbol: &'static str,
    pub element: &'static str,
    pub animal: &'static str,
}

impl Zodiac {
    /// The Chinese sign follows the calendar year of the birth date.
    pub fn of(birth_date: NaiveDate) -> Zodiac {
        let (month, day) = (birth_date.month(), birth_date.day());
        let (sign, symbol) = WESTERN_SIGNS
            .iter()
            .find(|(start, end, ..)| {
                (month == start.0 && day >= start.1) || (month == end.0 && day <= end.1)
            })
            .map(|(_, _, sign, symbol)| (*sign, *symbol))
            .unwrap_or(("Unknown", "?"));

        let year = birth_date.year();
        Zodiac {
            sign,
            symbol,
            element: CHINESE_ELEMENTS[(year / 2).rem_euclid(5) as usize],
            animal: CHINESE_ANIMALS[year.rem_euclid(12) as usize],
        }
    }
}

impl Display for Zodiac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Western: {} {}", self.sign, self.symbol)?;
        write!(f, "Chinese: {} {}", self.element, self.animal)
    }
}

const MILESTONES: &[(i32, &str)] = &[
    (18, "Legal adult"),
    (21, "Legal drinking age (US)"),
    (25, "Quarter century"),
    (30, "Thirty"),
    (40, "Forty"),
    (50, "Half century"),
    (65, "Retirement age"),
    (100, "Centennial"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub age: i32,
    pub description: &'static str,
    pub date: NaiveDate,
    /// Days from today to the milestone, negative once it has passed.
    pub days_from_today: i64,
}

impl Milestone {
    pub fn passed(&self) -> bool {
        self.days_from_today <= 0
    }
}

pub fn milestones(birth_date: NaiveDate, today: NaiveDate) -> Vec<Milestone> {
    MILESTONES
        .iter()
        .filter_map(|&(age, description)| {
            let date = anniversary(birth_date, birth_date.year() + age)?;
            Some(Milestone {
                age,
                description,
                date,
                days_from_today: (date - today).num_days(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgeComparison {
    pub first: Age,
    pub second: Age,
    pub difference_days: i64,
    /// `Less` when the first person is older.
    pub order: Ordering,
}

impl AgeComparison {
    pub fn difference_years(&self) -> f64 {
        self.difference_days as f64 / DAYS_IN_YEAR
    }
}

pub fn compare(first: NaiveDate, second: NaiveDate, today: NaiveDate) -> Result<AgeComparison> {
    Ok(AgeComparison {
        first: Age::calculate(first, today)?,
        second: Age::calculate(second, today)?,
        difference_days: (first - second).num_days().abs(),
        order: first.cmp(&second),
    })
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use anyhow::Result;
    use chrono::NaiveDate;

    use crate::error::DaybookError;

    use super::{compare, milestones, parse_date, Age, ExactAge, Zodiac};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn dates_in_several_formats() -> Result<()> {
        assert_eq!(parse_date("1990-03-05")?, date(1990, 3, 5));
        assert_eq!(parse_date("05/03/1990")?, date(1990, 3, 5));
        assert_eq!(parse_date("12/31/1990")?, date(1990, 12, 31));
        assert_eq!(parse_date("05.03.1990")?, date(1990, 3, 5));
        assert_eq!(parse_date("March 5, 1990")?, date(1990, 3, 5));
        assert_eq!(parse_date("5 March 1990")?, date(1990, 3, 5));
        assert!(matches!(
            parse_date("yesterday"),
            Err(DaybookError::InvalidDate(_))
        ));
        Ok(())
    }

    #[test]
    fn age_before_birthday() -> Result<()> {
        let age = Age::calculate(date(2000, 6, 15), date(2024, 3, 10))?;
        assert_eq!(
            age.exact,
            ExactAge {
                years: 23,
                months: 8,
                days: 24
            }
        );
        assert_eq!(age.years(), 23);
        assert_eq!(age.total_months, 284);
        assert_eq!(age.next_birthday, date(2024, 6, 15));
        assert_eq!(age.days_to_next_birthday, 97);
        assert_eq!(age.total_days, 8669);
        assert_eq!(age.total_weeks, 1238);
        Ok(())
    }

    #[test]
    fn birthday_today_counts_as_next() -> Result<()> {
        let age = Age::calculate(date(1990, 3, 5), date(2020, 3, 5))?;
        assert_eq!(age.years(), 30);
        assert_eq!(age.exact.months, 0);
        assert_eq!(age.exact.days, 0);
        assert_eq!(age.days_to_next_birthday, 0);
        assert!(Age::calculate(date(2030, 1, 1), date(2020, 1, 1)).is_err());
        Ok(())
    }

    #[test]
    fn leap_day_birthday() -> Result<()> {
        let age = Age::calculate(date(2000, 2, 29), date(2023, 3, 1))?;
        assert_eq!(age.years(), 23);
        assert_eq!(age.next_birthday, date(2024, 2, 29));
        Ok(())
    }

    #[test]
    fn zodiac_signs() {
        let zodiac = Zodiac::of(date(2000, 1, 1));
        assert_eq!(zodiac.sign, "Capricorn");
        assert_eq!(zodiac.element, "Metal");
        assert_eq!(zodiac.animal, "Dragon");

        assert_eq!(Zodiac::of(date(1990, 3, 21)).sign, "Aries");
        assert_eq!(Zodiac::of(date(1990, 12, 22)).sign, "Capricorn");
        assert_eq!(Zodiac::of(date(1990, 2, 18)).sign, "Aquarius");
        assert_eq!(Zodiac::of(date(1990, 2, 19)).sign, "Pisces");
    }

    #[test]
    fn milestones_split_around_today() {
        let events = milestones(date(2000, 6, 15), date(2024, 3, 10));
        assert_eq!(events.len(), 8);
        assert_eq!(events[0].date, date(2018, 6, 15));
        assert!(events[0].passed());
        assert!(events[1].passed());
        assert_eq!(events[2].age, 25);
        assert!(!events[2].passed());
        assert_eq!(events[2].date, date(2025, 6, 15));
    }

    #[test]
    fn comparison_finds_older_person() -> Result<()> {
        let comparison = compare(date(1990, 1, 1), date(1991, 1, 1), date(2024, 1, 1))?;
        assert_eq!(comparison.difference_days, 365);
        assert_eq!(comparison.order, Ordering::Less);
        assert_eq!(comparison.first.years(), 34);
        assert_eq!(comparison.second.years(), 33);
        assert!((comparison.difference_years() - 0.999).abs() < 0.01);
        Ok(())
    }
}
