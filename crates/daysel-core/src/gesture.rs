use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::day::Day;
use crate::error::CalendarError;
use crate::interval::Interval;
use crate::interval_set::{AddOutcome, Capacity, IntervalSet};
use crate::tag::IntervalTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum GestureState {
    #[default]
    Idle,
    Pressed {
        anchor: Day,
    },
    Dragging {
        anchor: Day,
        current: Day,
    },
}

/// Cells to repaint while dragging. Ranges are order-normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preview {
    pub clear: Option<(Day, Day)>,
    pub paint: (Day, Day),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    Added(AddOutcome),
    Removed { index: usize, interval: Interval },
}

/// Press, drag and release over calendar days.
///
/// A release on the pressed day toggles that day off when it is already
/// active; any other release adds the swept range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionGesture {
    state: GestureState,
}

impl SelectionGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::Dragging { .. })
    }

    /// Starts a gesture. Returns `false` if one is already in progress.
    pub fn press(&mut self, day: Day) -> bool {
        if !self.is_idle() {
            warn!(%day, state = ?self.state, "press ignored while a gesture is in progress");
            return false;
        }
        self.state = GestureState::Pressed { anchor: day };
        debug!(%day, "gesture pressed");
        true
    }

    /// Moves the pointer onto `day`. Outside a gesture this does nothing.
    pub fn enter(&mut self, day: Day) -> Option<Preview> {
        let (anchor, clear) = match self.state {
            GestureState::Idle => return None,
            GestureState::Pressed { anchor } => (anchor, None),
            GestureState::Dragging { anchor, current } => (anchor, Some(ordered(anchor, current))),
        };
        self.state = GestureState::Dragging {
            anchor,
            current: day,
        };
        debug!(%anchor, %day, "gesture dragging");
        Some(Preview {
            clear,
            paint: ordered(anchor, day),
        })
    }

    /// Finishes the gesture on `day` and applies it to `set`.
    ///
    /// Without a prior press the release day is also the anchor. The
    /// gesture is back to idle afterwards, whether or not `set` accepted
    /// the change.
    pub fn release(
        &mut self,
        day: Day,
        set: &mut IntervalSet,
        tag: IntervalTag,
        capacity: &Capacity,
    ) -> Result<GestureOutcome, CalendarError> {
        let anchor = match std::mem::take(&mut self.state) {
            GestureState::Idle => day,
            GestureState::Pressed { anchor } | GestureState::Dragging { anchor, .. } => anchor,
        };

        if anchor == day
            && let Some((index, interval)) = set.remove_containing(day)
        {
            debug!(%day, index, "click on active day removed its interval");
            return Ok(GestureOutcome::Removed { index, interval });
        }

        set.add(Interval::new(anchor, day, tag), capacity)
            .map(GestureOutcome::Added)
    }

    /// Abandons the gesture without touching any set. Returns the preview
    /// range that was painted, if any.
    pub fn cancel(&mut self) -> Option<(Day, Day)> {
        let previous = std::mem::take(&mut self.state);
        debug!(state = ?previous, "gesture cancelled");
        match previous {
            GestureState::Dragging { anchor, current } => Some(ordered(anchor, current)),
            GestureState::Idle | GestureState::Pressed { .. } => None,
        }
    }
}

fn ordered(a: Day, b: Day) -> (Day, Day) {
    if a <= b { (a, b) } else { (b, a) }
}
