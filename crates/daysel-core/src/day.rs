use std::fmt;
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Local,
  NaiveDate,
  TimeDelta,
  Weekday
};
use regex::Regex;
use serde::{
  Deserialize,
  Serialize
};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// A calendar day with no time or zone attached.
///
/// Two days are equal when they name the same date. Serialized as
/// `YYYY-MM-DD`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize
)]
#[serde(transparent)]
pub struct Day(NaiveDate);

impl Day {
  /// Builds a day from a year, a zero-based month (0-11) and a day of
  /// month.
  #[must_use]
  pub fn new(
    year: i32,
    month_index: u32,
    day: u32
  ) -> Option<Self> {
    NaiveDate::from_ymd_opt(
      year,
      month_index.checked_add(1)?,
      day
    )
    .map(Self)
  }

  #[must_use]
  pub fn today() -> Self {
    Self(Local::now().date_naive())
  }

  #[must_use]
  pub fn year(self) -> i32 {
    self.0.year()
  }

  /// Month of the year, 1-12.
  #[must_use]
  pub fn month(self) -> u32 {
    self.0.month()
  }

  /// Month of the year, 0-11.
  #[must_use]
  pub fn month_index(self) -> u32 {
    self.0.month0()
  }

  #[must_use]
  pub fn day(self) -> u32 {
    self.0.day()
  }

  #[must_use]
  pub fn weekday(self) -> Weekday {
    self.0.weekday()
  }

  #[must_use]
  pub fn is_weekend(self) -> bool {
    matches!(
      self.weekday(),
      Weekday::Sat | Weekday::Sun
    )
  }

  #[must_use]
  pub fn days_in_month(self) -> u32 {
    days_in_month(
      self.year(),
      self.month()
    )
  }

  #[must_use]
  pub fn checked_add_days(
    self,
    days: i64
  ) -> Option<Self> {
    self
      .0
      .checked_add_signed(
        TimeDelta::try_days(days)?
      )
      .map(Self)
  }

  /// Adds (or with a negative count, subtracts) days. Saturates at the
  /// representable calendar bounds.
  #[must_use]
  pub fn add_days(
    self,
    days: i64
  ) -> Self {
    self
      .checked_add_days(days)
      .unwrap_or(self)
  }

  /// Signed number of days from `other` to `self`.
  #[must_use]
  pub fn diff_days(
    self,
    other: Day
  ) -> i64 {
    (self.0 - other.0).num_days()
  }

  #[must_use]
  pub fn succ(self) -> Option<Self> {
    self.0.succ_opt().map(Self)
  }

  #[must_use]
  pub fn pred(self) -> Option<Self> {
    self.0.pred_opt().map(Self)
  }

  #[must_use]
  pub fn first_of_year(
    year: i32
  ) -> Option<Self> {
    Self::new(year, 0, 1)
  }

  #[must_use]
  pub fn last_of_year(
    year: i32
  ) -> Option<Self> {
    Self::new(year, 11, 31)
  }
}

impl From<NaiveDate> for Day {
  fn from(date: NaiveDate) -> Self {
    Self(date)
  }
}

impl fmt::Display for Day {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{}",
      self.0.format(DAY_FORMAT)
    )
  }
}

impl FromStr for Day {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    NaiveDate::parse_from_str(
      s.trim(),
      DAY_FORMAT
    )
    .map(Self)
    .with_context(|| {
      format!(
        "invalid day (expected \
         YYYY-MM-DD): {s}"
      )
    })
  }
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  NaiveDate::from_ymd_opt(
    next_year, next_month, 1
  )
  .and_then(|first| first.pred_opt())
  .map(|last| last.day())
  .unwrap_or(31)
}

/// Parses a day expression relative to `today`.
#[tracing::instrument(skip(today))]
pub fn parse_day_expr(
  input: &str,
  today: Day
) -> anyhow::Result<Day> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return today
        .checked_add_days(1)
        .ok_or_else(|| {
          anyhow!(
            "tomorrow is out of range"
          )
        });
    }
    | "yesterday" => {
      return today
        .checked_add_days(-1)
        .ok_or_else(|| {
          anyhow!(
            "yesterday is out of range"
          )
        });
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday(
      today, target
    ));
  }

  if let Some(target_month) =
    parse_month_name(&lower)
  {
    let mut year = today.year();
    if target_month <= today.month() {
      year = year.saturating_add(1);
    }
    return Day::new(
      year,
      target_month - 1,
      1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month candidate: \
         {year}-{target_month}"
      )
    });
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$")
    .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let days = match caps
      .name("unit")
      .map(|m| m.as_str())
    {
      | Some("d") => num,
      | Some("w") => {
        num.checked_mul(7).ok_or_else(
          || {
            anyhow!(
              "relative weeks out of \
               range: {num}"
            )
          }
        )?
      }
      | other => {
        return Err(anyhow!(
          "unknown relative unit: \
           {other:?}"
        ));
      }
    };
    let signed = if caps
      .name("sign")
      .is_some_and(|m| m.as_str() == "-")
    {
      -days
    } else {
      days
    };

    return today
      .checked_add_days(signed)
      .ok_or_else(|| {
        anyhow!(
          "relative day out of range: \
           {token}"
        )
      });
  }

  token.parse::<Day>().with_context(
    || {
      "supported formats: \
       today/tomorrow/yesterday, \
       weekday names (e.g. monday), \
       month names (e.g. march), \
       +Nd/-Nd/+Nw/-Nw, YYYY-MM-DD"
    }
  )
}

fn next_weekday(
  from: Day,
  target: Weekday
) -> Day {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from.add_days(delta)
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::Weekday;

  use super::{
    Day,
    days_in_month,
    parse_day_expr
  };

  fn day(
    year: i32,
    month_index: u32,
    d: u32
  ) -> Day {
    Day::new(year, month_index, d)
      .expect("valid day")
  }

  #[test]
  fn month_index_is_zero_based() {
    let jan = day(2026, 0, 5);
    assert_eq!(jan.month_index(), 0);
    assert_eq!(jan.month(), 1);
    assert_eq!(
      jan.to_string(),
      "2026-01-05"
    );
    assert!(Day::new(2026, 12, 1).is_none());
  }

  #[test]
  fn arithmetic_crosses_month_and_year() {
    let eve = day(2025, 11, 31);
    assert_eq!(
      day(2026, 0, 1).pred(),
      Some(eve)
    );
    assert_eq!(
      eve.succ(),
      Some(day(2026, 0, 1))
    );
    assert_eq!(
      eve.add_days(1),
      day(2026, 0, 1)
    );
    assert_eq!(
      day(2026, 2, 1).add_days(-1),
      day(2026, 1, 28)
    );
    assert_eq!(
      day(2026, 0, 8)
        .diff_days(day(2026, 0, 5)),
      3
    );
    assert_eq!(
      day(2024, 1, 1).days_in_month(),
      29
    );
    assert_eq!(days_in_month(2026, 12), 31);
  }

  #[test]
  fn weekend_detection() {
    let saturday = day(2026, 9, 17);
    assert_eq!(
      saturday.weekday(),
      Weekday::Sat
    );
    assert!(saturday.is_weekend());
    assert!(!day(2026, 9, 19).is_weekend());
  }

  #[test]
  fn parses_named_and_relative_days() {
    // Wednesday.
    let today = day(2026, 1, 18);
    assert_eq!(
      parse_day_expr("today", today)
        .expect("today"),
      today
    );
    assert_eq!(
      parse_day_expr("tomorrow", today)
        .expect("tomorrow"),
      day(2026, 1, 19)
    );
    assert_eq!(
      parse_day_expr("wednesday", today)
        .expect("weekday"),
      day(2026, 1, 25)
    );
    assert_eq!(
      parse_day_expr("+2w", today)
        .expect("weeks"),
      day(2026, 2, 4)
    );
    assert_eq!(
      parse_day_expr("-3d", today)
        .expect("days back"),
      day(2026, 1, 15)
    );
    assert_eq!(
      parse_day_expr("january", today)
        .expect("month"),
      day(2027, 0, 1)
    );
    assert_eq!(
      parse_day_expr(
        "2026-12-25",
        today
      )
      .expect("iso"),
      day(2026, 11, 25)
    );
  }

  #[test]
  fn rejects_garbage() {
    let today = day(2026, 1, 18);
    assert!(
      parse_day_expr("soonish", today)
        .is_err()
    );
    assert!(
      parse_day_expr("2026-02-30", today)
        .is_err()
    );
  }
}
