use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::str::FromStr;
use strum::EnumString;
use thiserror::Error;
use tracing::warn;

pub const SENTINEL_DATE: &str = "xxxx-xx-xx";

const LABELS: [&str; 3] = ["Added ", "Written ", "Updated "];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized date string {0:?}")]
pub struct DateParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin(NaiveDateTime);

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
enum Weekday {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl Origin {
    pub fn from_unix(secs: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| Self(dt.naive_utc()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }
}

impl From<NaiveDateTime> for Origin {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

impl Month {
    fn number(self) -> u32 {
        self as u32 + 1
    }
}

/// `timezone_minutes` is west of UTC (`480` is UTC-8).
pub fn get_origin(timestamp_ms: Option<i64>, timezone_minutes: Option<i32>) -> Result<Origin> {
    let timestamp = match timestamp_ms {
        Some(ms) => ms.div_euclid(1000),
        None => Utc::now().timestamp(),
    };
    let offset = match timezone_minutes {
        Some(minutes) => i64::from(minutes) * 60,
        None => -i64::from(standard_offset_secs()),
    };

    Origin::from_unix(timestamp - offset)
        .ok_or_else(|| anyhow!("origin timestamp {} is out of range", timestamp - offset))
}

pub fn strip_label(text: &str) -> &str {
    LABELS
        .iter()
        .find_map(|label| text.strip_prefix(label))
        .unwrap_or(text)
}

/// A weekday equal to the origin's own weekday means one week back: the
/// site renders today's answers as `Just Now`, never as a weekday.
pub fn resolve(origin: Origin, text: &str) -> Result<NaiveDate, DateParseError> {
    let today = origin.date();
    let err = || DateParseError(text.to_string());

    if text.eq_ignore_ascii_case("just now") {
        return Ok(today);
    }

    let tokens: Vec<&str> = text.split(' ').collect();
    match tokens.as_slice() {
        [weekday] => {
            let weekday = Weekday::from_str(weekday).map_err(|_| err())?;
            let back = match (today.weekday().num_days_from_sunday() + 7 - weekday as u32) % 7 {
                0 => 7,
                n => n,
            };
            today
                .checked_sub_days(Days::new(u64::from(back)))
                .ok_or_else(err)
        }
        [day, month] => match calendar_date(today.year(), day, month) {
            Some(date) if date <= today => Ok(date),
            _ => calendar_date(today.year() - 1, day, month).ok_or_else(err),
        },
        [day, month, year] => {
            let year = parse_digits(year, 4, 4).ok_or_else(err)?;
            calendar_date(year as i32, day, month).ok_or_else(err)
        }
        _ => Err(err()),
    }
}

pub fn parse_date_label(origin: Origin, text: &str) -> Result<NaiveDate, DateParseError> {
    resolve(origin, strip_label(text))
}

pub fn format_date(resolved: Result<NaiveDate, DateParseError>) -> String {
    match resolved {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(e) => {
            warn!("failed to parse date: {e}");
            SENTINEL_DATE.to_string()
        }
    }
}

// UTC offset of the local zone outside daylight saving time.
fn standard_offset_secs() -> i32 {
    let year = Utc::now().year();
    [1, 7]
        .into_iter()
        .filter_map(|month| NaiveDate::from_ymd_opt(year, month, 1))
        .filter_map(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| Local.from_utc_datetime(&dt).offset().local_minus_utc())
        .min()
        .unwrap_or(0)
}

fn calendar_date(year: i32, day: &str, month: &str) -> Option<NaiveDate> {
    let day = parse_digits(day, 1, 2)?;
    let month = Month::from_str(month).ok()?;
    NaiveDate::from_ymd_opt(year, month.number(), day)
}

fn parse_digits(s: &str, min: usize, max: usize) -> Option<u32> {
    if s.len() < min || s.len() > max || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
