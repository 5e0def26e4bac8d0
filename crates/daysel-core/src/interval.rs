use std::fmt;
use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::day::Day;
use crate::error::CalendarError;
use crate::tag::IntervalTag;

/// A closed range of days and the tag it is displayed with.
///
/// `start <= end` always holds: constructors and deserialization sort the
/// two bounds, so callers may hand them over in either order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "IntervalRecord")]
pub struct Interval {
    start: Day,
    end: Day,
    tag: IntervalTag,
}

#[derive(Deserialize)]
struct IntervalRecord {
    start: Day,
    end: Day,
    #[serde(default)]
    tag: IntervalTag,
}

impl From<IntervalRecord> for Interval {
    fn from(record: IntervalRecord) -> Self {
        Interval::new(record.start, record.end, record.tag)
    }
}

impl Interval {
    pub fn new(a: Day, b: Day, tag: IntervalTag) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Self { start, end, tag }
    }

    /// A one-day interval, what a plain click produces.
    pub fn single(day: Day, tag: IntervalTag) -> Self {
        Self::new(day, day, tag)
    }

    /// Builds an interval from two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str, tag: IntervalTag) -> Result<Self, CalendarError> {
        let parse_bound = |raw: &str| {
            raw.parse::<Day>()
                .map_err(|err| CalendarError::InvalidInterval(format!("{err:#}")))
        };
        Ok(Self::new(parse_bound(start)?, parse_bound(end)?, tag))
    }

    pub fn start(&self) -> Day {
        self.start
    }

    pub fn end(&self) -> Day {
        self.end
    }

    pub fn tag(&self) -> &IntervalTag {
        &self.tag
    }

    /// Number of days covered, bounds included.
    pub fn len_days(&self) -> i64 {
        self.end.diff_days(self.start) + 1
    }

    pub fn contains(&self, day: Day) -> bool {
        self.start <= day && day <= self.end
    }

    /// Whether `[start, end]` overlaps this interval widened by one day on
    /// each side, i.e. whether the two would merge.
    pub fn touches(&self, start: Day, end: Day) -> bool {
        let padded_start = self.start.add_days(-1);
        let padded_end = self.end.add_days(1);
        start <= padded_end && end >= padded_start
    }

    pub fn overlaps_year(&self, year: i32) -> bool {
        self.start.year() <= year && year <= self.end.year()
    }

    pub fn days(&self) -> Days {
        self.expand_to_days(ExpandOptions::default())
    }

    /// Every day of the interval in chronological order.
    ///
    /// With `skip_other_years` and a `restrict_to_year`, only the days of
    /// that year are produced. The year filter alone has no effect.
    pub fn expand_to_days(&self, options: ExpandOptions) -> Days {
        let year = match options.restrict_to_year {
            Some(year) if options.skip_other_years => year,
            _ => return Days::between(self.start, self.end),
        };

        if !self.overlaps_year(year) {
            return Days::empty(self.start);
        }
        let (Some(first), Some(last)) = (Day::first_of_year(year), Day::last_of_year(year)) else {
            return Days::empty(self.start);
        };
        Days::between(self.start.max(first), self.end.min(last))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandOptions {
    pub restrict_to_year: Option<i32>,
    pub skip_other_years: bool,
}

impl ExpandOptions {
    pub fn year(year: i32) -> Self {
        Self {
            restrict_to_year: Some(year),
            skip_other_years: true,
        }
    }
}

/// Iterator over consecutive days, produced by [`Interval::expand_to_days`].
#[derive(Debug, Clone)]
pub struct Days {
    next: Option<Day>,
    last: Day,
}

impl Days {
    fn between(first: Day, last: Day) -> Self {
        Self {
            next: (first <= last).then_some(first),
            last,
        }
    }

    fn empty(anchor: Day) -> Self {
        Self {
            next: None,
            last: anchor,
        }
    }
}

impl Iterator for Days {
    type Item = Day;

    fn next(&mut self) -> Option<Day> {
        let current = self.next?;
        self.next = if current < self.last {
            current.succ()
        } else {
            None
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .next
            .map(|next| usize::try_from(self.last.diff_days(next) + 1).unwrap_or(0))
            .unwrap_or(0);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Days {}

impl FusedIterator for Days {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::ModeType;

    fn day(year: i32, month_index: u32, d: u32) -> Day {
        Day::new(year, month_index, d).expect("valid day")
    }

    fn full_day() -> IntervalTag {
        IntervalTag::new(ModeType::FullDay)
    }

    #[test]
    fn bounds_are_sorted_on_construction() {
        let interval = Interval::new(day(2026, 0, 8), day(2026, 0, 5), full_day());
        assert_eq!(interval.start(), day(2026, 0, 5));
        assert_eq!(interval.end(), day(2026, 0, 8));
        assert_eq!(interval.len_days(), 4);
    }

    #[test]
    fn deserialization_sorts_backwards_bounds() {
        let interval: Interval =
            serde_json::from_str(r#"{"start":"2026-03-10","end":"2026-03-02"}"#)
                .expect("deserialize interval");
        assert_eq!(interval.start(), day(2026, 2, 2));
        assert_eq!(interval.end(), day(2026, 2, 10));
        assert_eq!(interval.tag(), &IntervalTag::default());
    }

    #[test]
    fn containment_is_inclusive() {
        let interval = Interval::new(day(2026, 0, 5), day(2026, 0, 8), full_day());
        assert!(interval.contains(day(2026, 0, 5)));
        assert!(interval.contains(day(2026, 0, 8)));
        assert!(!interval.contains(day(2026, 0, 4)));
        assert!(!interval.contains(day(2026, 0, 9)));
    }

    #[test]
    fn adjacent_ranges_touch_and_gapped_ones_do_not() {
        let interval = Interval::new(day(2026, 0, 5), day(2026, 0, 8), full_day());
        assert!(interval.touches(day(2026, 0, 9), day(2026, 0, 12)));
        assert!(interval.touches(day(2026, 0, 1), day(2026, 0, 4)));
        assert!(interval.touches(day(2026, 0, 6), day(2026, 0, 6)));
        assert!(interval.touches(day(2026, 0, 1), day(2026, 0, 20)));
        assert!(!interval.touches(day(2026, 0, 10), day(2026, 0, 12)));
        assert!(!interval.touches(day(2026, 0, 1), day(2026, 0, 3)));
    }

    #[test]
    fn expands_to_every_day_in_order() {
        let interval = Interval::new(day(2026, 0, 5), day(2026, 0, 8), full_day());
        let days: Vec<Day> = interval.days().collect();
        assert_eq!(
            days,
            vec![day(2026, 0, 5), day(2026, 0, 6), day(2026, 0, 7), day(2026, 0, 8)]
        );
        assert_eq!(interval.days().len(), 4);
        assert_eq!(interval.days().collect::<Vec<_>>(), days);
    }

    #[test]
    fn single_day_expands_to_itself() {
        let interval = Interval::single(day(2026, 4, 1), full_day());
        assert_eq!(interval.days().collect::<Vec<_>>(), vec![day(2026, 4, 1)]);
    }

    #[test]
    fn year_restriction_clips_across_the_boundary() {
        let interval = Interval::new(day(2025, 11, 30), day(2026, 0, 2), full_day());

        let in_2026: Vec<Day> = interval.expand_to_days(ExpandOptions::year(2026)).collect();
        assert_eq!(in_2026, vec![day(2026, 0, 1), day(2026, 0, 2)]);

        let in_2025: Vec<Day> = interval.expand_to_days(ExpandOptions::year(2025)).collect();
        assert_eq!(in_2025, vec![day(2025, 11, 30), day(2025, 11, 31)]);

        assert_eq!(interval.expand_to_days(ExpandOptions::year(2027)).count(), 0);

        let unfiltered = ExpandOptions {
            restrict_to_year: Some(2026),
            skip_other_years: false,
        };
        assert_eq!(interval.expand_to_days(unfiltered).count(), 4);
    }

    #[test]
    fn parse_reports_invalid_bounds() {
        let err = Interval::parse("2026-01-05", "2026-13-01", full_day())
            .expect_err("month 13 is invalid");
        assert!(matches!(err, CalendarError::InvalidInterval(_)));
    }
}
