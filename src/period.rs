// src/period.rs

use anyhow::{bail, Result};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A calendar year-month, canonical form `YYYYMM`.
///
/// Ordering is chronological: the derived `Ord` compares `year` first, then `month`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("month {} out of range in period {:04}{:02}", month, year, month);
        }
        if !(0..=9999).contains(&year) {
            bail!("year {} cannot be written as YYYY", year);
        }
        Ok(Self { year, month })
    }

    /// For compile-time constants whose month is known to be in range.
    pub(crate) const fn known(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// The period containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The next calendar month.
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Leading `YYYYMM` of a file name such as `202412SOCIEDADES.csv`.
    pub fn from_name_prefix(name: &str) -> Option<Self> {
        name.get(..6).and_then(|prefix| prefix.parse().ok())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != 6 || !s.chars().all(|c| c.is_ascii_digit()) {
            bail!("`{}` is not a YYYYMM period", s);
        }
        // both slices are ASCII digits, so these parses cannot fail
        let year: i32 = s[..4].parse()?;
        let month: u32 = s[4..].parse()?;
        Period::new(year, month)
    }
}

/// YAML and JSON sources carry periods both as `"202412"` and as `202412`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPeriod {
    Text(String),
    Number(u32),
}

impl TryFrom<RawPeriod> for Period {
    type Error = anyhow::Error;

    fn try_from(raw: RawPeriod) -> Result<Self> {
        match raw {
            RawPeriod::Text(s) => s.parse(),
            RawPeriod::Number(n) => n.to_string().parse(),
        }
    }
}

impl From<Period> for String {
    fn from(p: Period) -> String {
        p.to_string()
    }
}

/// Source of "today" for period enumeration.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock local date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Every period from `start` through the period containing `today`, one month apart.
/// Empty when `start` lies after today's period.
pub fn enumerate_periods(start: Period, today: NaiveDate) -> Vec<Period> {
    let end = Period::from_date(today);
    std::iter::successors(Some(start), |p| Some(p.succ()))
        .take_while(|p| *p <= end)
        .collect()
}
