use std::collections::BTreeMap;

use chrono::{
  NaiveDateTime,
  Timelike
};
use serde::Serialize;

use crate::schedule::Event;

pub const HOURS_PER_DAY: u32 = 24;
pub const DEFAULT_HOUR_HEIGHT: f64 =
  200.0;
pub const DEFAULT_OVERLAP_HEIGHT: f64 =
  50.0;

const MIN_FONT_SCALE: f64 = 0.7;
const FONT_STEP_PER_OVERLAP: f64 = 0.05;

/// Events touching each hour-of-day bucket.
///
/// Every hour from the start's hour-of-day through the end's hour-of-day
/// counts, both inclusive. Only the 0..=23 value is used: an event that
/// crosses midnight (e.g. 23:00 to 01:00) walks an empty range and adds
/// nothing.
#[must_use]
pub fn hour_counts(
  events: &[Event]
) -> BTreeMap<u32, usize> {
  let mut counts = BTreeMap::new();
  for event in events {
    for hour in
      event.start.hour()..=event.end.hour()
    {
      *counts.entry(hour).or_insert(0) +=
        1;
    }
  }
  counts
}

/// Largest bucket from [`hour_counts`], 0 for no events.
#[must_use]
pub fn peak_overlap(
  events: &[Event]
) -> usize {
  hour_counts(events)
    .into_values()
    .max()
    .unwrap_or(0)
}

/// Calendar sizing derived from the peak overlap.
#[derive(
  Debug, Clone, Copy, PartialEq, Serialize,
)]
pub struct Layout {
  pub peak_overlap: usize,
  pub total_height: f64,
  pub row_height:   f64,
  pub font_scale:   f64
}

impl Layout {
  #[must_use]
  pub fn from_peak(
    peak_overlap: usize,
    hour_height: f64,
    overlap_height: f64
  ) -> Self {
    let peak = peak_overlap as f64;
    let total_height = hour_height
      * f64::from(HOURS_PER_DAY)
      + peak * overlap_height;
    Self {
      peak_overlap,
      total_height,
      row_height: total_height
        / f64::from(HOURS_PER_DAY),
      font_scale: (1.0
        - peak * FONT_STEP_PER_OVERLAP)
        .max(MIN_FONT_SCALE)
    }
  }

  #[must_use]
  pub fn for_events(
    events: &[Event],
    hour_height: f64,
    overlap_height: f64
  ) -> Self {
    Self::from_peak(
      peak_overlap(events),
      hour_height,
      overlap_height
    )
  }
}

impl Default for Layout {
  fn default() -> Self {
    Self::from_peak(
      0,
      DEFAULT_HOUR_HEIGHT,
      DEFAULT_OVERLAP_HEIGHT
    )
  }
}

/// Whether an event is happening at `now`, and how far along it is.
#[derive(
  Debug, Clone, Copy, PartialEq, Serialize,
)]
pub struct EventStatus {
  pub current:          bool,
  pub progress_percent: f64
}

impl EventStatus {
  #[must_use]
  pub fn at(
    event: &Event,
    now: NaiveDateTime
  ) -> Self {
    let current =
      event.start <= now && now <= event.end;
    if !current {
      return Self {
        current,
        progress_percent: 0.0
      };
    }

    let span = (event.end - event.start)
      .num_milliseconds();
    let done = (now - event.start)
      .num_milliseconds();
    let progress_percent = if span > 0 {
      done as f64 / span as f64 * 100.0
    } else {
      0.0
    };

    Self {
      current,
      progress_percent
    }
  }
}
