use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::day::Day;
use crate::error::CalendarError;
use crate::interval::{ExpandOptions, Interval};
use crate::tag::IntervalTag;

/// What to do when an insertion would exceed the maximum number of
/// concurrent intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Drop the oldest stored interval to make room.
    #[default]
    EvictOldest,
    /// Refuse the insertion and leave the set untouched.
    RejectNew,
}

impl OverflowPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            OverflowPolicy::EvictOldest => "evict-oldest",
            OverflowPolicy::RejectNew => "reject-new",
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverflowPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evict-oldest" | "evict" => Ok(OverflowPolicy::EvictOldest),
            "reject-new" | "reject" => Ok(OverflowPolicy::RejectNew),
            other => Err(anyhow!(
                "unknown overflow policy: {other} (expected evict-oldest or reject-new)"
            )),
        }
    }
}

/// Bound on the number of intervals that may be active at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capacity {
    /// `None` and `Some(0)` both mean unbounded.
    pub max_concurrent: Option<usize>,
    pub on_overflow: OverflowPolicy,
}

impl Capacity {
    pub const UNBOUNDED: Capacity = Capacity {
        max_concurrent: None,
        on_overflow: OverflowPolicy::EvictOldest,
    };

    pub fn new(max_concurrent: usize, on_overflow: OverflowPolicy) -> Self {
        Self {
            max_concurrent: Some(max_concurrent),
            on_overflow,
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.max_concurrent.filter(|max| *max > 0)
    }
}

/// Result of [`IntervalSet::add`].
#[derive(Debug, Clone, PartialEq)]
pub struct AddOutcome {
    /// The interval as stored, after folding in every touching interval.
    pub merged: Interval,
    /// Stored intervals that were folded into `merged`.
    pub absorbed: Vec<Interval>,
    /// Intervals dropped to respect the capacity, oldest first.
    pub evicted: Vec<Interval>,
}

/// The active intervals of one calendar, in insertion order.
///
/// No two intervals added through [`IntervalSet::add`] overlap or sit next
/// to each other; [`IntervalSet::replace_all`] stores its input as given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Interval> {
        self.intervals.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.intervals
    }

    /// Inserts `interval`, merging it with every stored interval it
    /// overlaps or is adjacent to.
    ///
    /// The merged interval keeps the tag of `interval` and goes to the end
    /// of insertion order. On failure the set is unchanged.
    pub fn add(
        &mut self,
        interval: Interval,
        capacity: &Capacity,
    ) -> Result<AddOutcome, CalendarError> {
        let mut start = interval.start();
        let mut end = interval.end();
        let mut kept = self.intervals.clone();
        let mut absorbed = Vec::new();

        // Widening can make earlier, already-skipped intervals adjacent.
        loop {
            let (touching, rest): (Vec<Interval>, Vec<Interval>) = kept
                .into_iter()
                .partition(|existing| existing.touches(start, end));
            kept = rest;
            if touching.is_empty() {
                break;
            }
            for existing in touching {
                trace!(%existing, "folding touching interval");
                start = start.min(existing.start());
                end = end.max(existing.end());
                absorbed.push(existing);
            }
        }

        let merged = Interval::new(start, end, *interval.tag());
        let mut evicted = Vec::new();

        if let Some(max) = capacity.limit()
            && kept.len() + 1 > max
        {
            match capacity.on_overflow {
                OverflowPolicy::RejectNew => {
                    warn!(%interval, max, "rejecting interval over capacity");
                    return Err(CalendarError::OverflowRejected { max });
                }
                OverflowPolicy::EvictOldest => {
                    let excess = (kept.len() + 1 - max).min(kept.len());
                    evicted = kept.drain(..excess).collect();
                    debug!(count = evicted.len(), max, "evicted oldest intervals");
                }
            }
        }

        kept.push(merged);
        self.intervals = kept;

        debug!(
            %merged,
            absorbed = absorbed.len(),
            evicted = evicted.len(),
            total = self.intervals.len(),
            "added interval"
        );

        Ok(AddOutcome {
            merged,
            absorbed,
            evicted,
        })
    }

    /// Removes the interval at `index`. Merged intervals are removed whole.
    pub fn remove(&mut self, index: usize) -> Result<Interval, CalendarError> {
        let len = self.intervals.len();
        if index >= len {
            return Err(CalendarError::IndexOutOfRange { index, len });
        }
        let removed = self.intervals.remove(index);
        debug!(index, %removed, "removed interval");
        Ok(removed)
    }

    /// Index of the interval covering `day`, bounds included.
    pub fn find_containing(&self, day: Day) -> Option<usize> {
        self.intervals
            .iter()
            .position(|interval| interval.contains(day))
    }

    pub fn remove_containing(&mut self, day: Day) -> Option<(usize, Interval)> {
        let index = self.find_containing(day)?;
        let removed = self.intervals.remove(index);
        debug!(index, %removed, %day, "removed interval containing day");
        Some((index, removed))
    }

    pub fn is_active(&self, day: Day) -> bool {
        self.find_containing(day).is_some()
    }

    /// Replaces the whole collection without merging.
    pub fn replace_all<I>(&mut self, intervals: I)
    where
        I: IntoIterator<Item = Interval>,
    {
        self.intervals = intervals.into_iter().collect();
        debug!(total = self.intervals.len(), "replaced all intervals");
    }

    pub fn clear(&mut self) {
        self.intervals.clear();
    }

    /// Every active day that falls in `year`, with the tag it is shown with.
    pub fn active_days_in_year(&self, year: i32) -> Vec<(Day, IntervalTag)> {
        self.intervals
            .iter()
            .filter(|interval| interval.overlaps_year(year))
            .flat_map(|interval| {
                let tag = *interval.tag();
                interval
                    .expand_to_days(ExpandOptions::year(year))
                    .map(move |day| (day, tag))
            })
            .collect()
    }
}

impl FromIterator<Interval> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = Interval>>(iter: I) -> Self {
        Self {
            intervals: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}
