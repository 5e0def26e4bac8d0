use anyhow::anyhow;
use chrono::Weekday;

use crate::day::Day;

const MONTH_NAMES: [&str; 12] = [
  "January",
  "February",
  "March",
  "April",
  "May",
  "June",
  "July",
  "August",
  "September",
  "October",
  "November",
  "December"
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDay {
  pub day:        Day,
  pub weekday:    Weekday,
  pub is_weekend: bool
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRow {
  pub month_index: u32,
  pub name:        &'static str,
  /// Padding columns before the first day.
  pub offset:      usize,
  pub days:        Vec<GridDay>
}

impl MonthRow {
  #[must_use]
  pub fn width(&self) -> usize {
    self.offset + self.days.len()
  }
}

/// A year laid out as twelve rows whose columns all share one weekday,
/// starting with the weekday of January 1st.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearGrid {
  pub year:           i32,
  pub columns:        usize,
  pub weekday_header: Vec<Weekday>,
  pub months:         Vec<MonthRow>
}

impl YearGrid {
  #[tracing::instrument]
  pub fn build(
    year: i32
  ) -> anyhow::Result<Self> {
    let first_of_year =
      Day::first_of_year(year)
        .ok_or_else(|| {
          anyhow!(
            "year out of range: {year}"
          )
        })?;
    let year_weekday = first_of_year
      .weekday()
      .num_days_from_monday();

    let mut months =
      Vec::with_capacity(12);
    for (month_index, name) in
      (0_u32..).zip(MONTH_NAMES)
    {
      let first = Day::new(
        year,
        month_index,
        1
      )
      .ok_or_else(|| {
        anyhow!(
          "invalid month {month_index} \
           in {year}"
        )
      })?;
      let month_weekday = first
        .weekday()
        .num_days_from_monday();
      let offset = ((7 + month_weekday
        - year_weekday)
        % 7) as usize;

      let days = (0..i64::from(
        first.days_in_month()
      ))
        .map(|delta| {
          let day =
            first.add_days(delta);
          GridDay {
            day,
            weekday: day.weekday(),
            is_weekend: day.is_weekend()
          }
        })
        .collect();

      months.push(MonthRow {
        month_index,
        name,
        offset,
        days
      });
    }

    let columns = months
      .iter()
      .map(MonthRow::width)
      .max()
      .unwrap_or(0);

    let mut weekday_header =
      Vec::with_capacity(columns);
    let mut weekday =
      first_of_year.weekday();
    for _ in 0..columns {
      weekday_header.push(weekday);
      weekday = weekday.succ();
    }

    tracing::debug!(
      year,
      columns,
      "built year grid"
    );

    Ok(Self {
      year,
      columns,
      weekday_header,
      months
    })
  }

  /// Initial of each column's weekday.
  #[must_use]
  pub fn header_letters(
    &self
  ) -> Vec<char> {
    self
      .weekday_header
      .iter()
      .filter_map(|weekday| {
        weekday
          .to_string()
          .chars()
          .next()
      })
      .collect()
  }

  #[must_use]
  pub fn cell(
    &self,
    month_index: u32,
    column: usize
  ) -> Option<&GridDay> {
    let row = self
      .months
      .get(month_index as usize)?;
    let position =
      column.checked_sub(row.offset)?;
    row.days.get(position)
  }

  /// Row and column of `day`, if it belongs to this grid's year.
  #[must_use]
  pub fn column_of(
    &self,
    day: Day
  ) -> Option<(u32, usize)> {
    if day.year() != self.year {
      return None;
    }
    let row = self
      .months
      .get(day.month_index() as usize)?;
    Some((
      row.month_index,
      row.offset + day.day() as usize - 1
    ))
  }
}

#[cfg(test)]
mod tests {
  use chrono::Weekday;

  use super::YearGrid;
  use crate::day::Day;

  #[test]
  fn columns_share_a_weekday() {
    let grid = YearGrid::build(2026)
      .expect("grid for 2026");

    assert_eq!(grid.months.len(), 12);
    assert_eq!(
      grid.weekday_header[0],
      Weekday::Thu
    );
    for row in &grid.months {
      for column in 0..grid.columns {
        if let Some(cell) =
          grid.cell(row.month_index, column)
        {
          assert_eq!(
            cell.weekday,
            grid.weekday_header[column]
          );
        }
      }
    }
  }

  #[test]
  fn offsets_and_width_for_2026() {
    let grid = YearGrid::build(2026)
      .expect("grid for 2026");

    let offsets: Vec<usize> = grid
      .months
      .iter()
      .map(|row| row.offset)
      .collect();
    assert_eq!(
      offsets,
      vec![0, 3, 3, 6, 1, 4, 6, 2, 5, 0, 3, 5]
    );
    // July: six padding columns plus 31 days.
    assert_eq!(grid.columns, 37);
    assert_eq!(
      grid.header_letters()[..7],
      ['T', 'F', 'S', 'S', 'M', 'T', 'W']
    );
  }

  #[test]
  fn locates_days_in_the_grid() {
    let grid = YearGrid::build(2026)
      .expect("grid for 2026");
    let july_first = Day::new(2026, 6, 1)
      .expect("valid day");

    assert_eq!(
      grid.column_of(july_first),
      Some((6, 6))
    );
    assert_eq!(
      grid
        .cell(6, 6)
        .map(|cell| cell.day),
      Some(july_first)
    );
    assert!(grid.cell(6, 5).is_none());
    assert!(grid.cell(1, 40).is_none());
    assert!(
      grid
        .column_of(
          Day::new(2027, 0, 1)
            .expect("valid day")
        )
        .is_none()
    );
  }

  #[test]
  fn leap_february_has_29_cells() {
    let grid = YearGrid::build(2024)
      .expect("grid for 2024");
    assert_eq!(grid.months[1].days.len(), 29);
    assert!(
      grid.months[1]
        .days
        .iter()
        .filter(|cell| cell.is_weekend)
        .count()
        >= 8
    );
  }
}
