use chrono::NaiveDateTime;

use crate::clock::{
  MILLIS_PER_DAY,
  start_of_day
};

/// Share of the local day that has passed at `now`, in `[0, 1]`.
#[must_use]
pub fn fraction_of_day(
  now: NaiveDateTime
) -> f64 {
  let elapsed = (now - start_of_day(now))
    .num_milliseconds();
  (elapsed as f64 / MILLIS_PER_DAY as f64)
    .clamp(0.0, 1.0)
}

/// Vertical offset that centres `now` in the viewport. Not clamped: the
/// result may be negative or run past the end of the grid.
#[must_use]
pub fn scroll_offset(
  now: NaiveDateTime,
  grid_height: f64,
  viewport_height: f64
) -> f64 {
  fraction_of_day(now) * grid_height
    - viewport_height / 2.0
}

/// What a scrollable viewport does with an offset from [`scroll_offset`].
#[must_use]
pub fn clamp_scroll(
  offset: f64,
  grid_height: f64,
  viewport_height: f64
) -> f64 {
  let max =
    (grid_height - viewport_height).max(0.0);
  offset.clamp(0.0, max)
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveDateTime
  };

  use super::{
    clamp_scroll,
    fraction_of_day,
    scroll_offset
  };

  fn at(
    hour: u32,
    minute: u32
  ) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 10)
      .expect("valid date")
      .and_hms_opt(hour, minute, 0)
      .expect("valid time")
  }

  #[test]
  fn noon_is_half_the_day() {
    assert_eq!(fraction_of_day(at(12, 0)), 0.5);
    assert_eq!(
      scroll_offset(at(12, 0), 4800.0, 600.0),
      2100.0
    );
  }

  #[test]
  fn early_morning_goes_negative() {
    let offset =
      scroll_offset(at(0, 0), 4800.0, 600.0);
    assert_eq!(offset, -300.0);
    assert_eq!(
      clamp_scroll(offset, 4800.0, 600.0),
      0.0
    );
  }

  #[test]
  fn late_night_is_clamped_by_caller() {
    let offset = scroll_offset(
      at(23, 59),
      4800.0,
      600.0
    );
    assert!(offset > 4200.0);
    assert_eq!(
      clamp_scroll(offset, 4800.0, 600.0),
      4200.0
    );
  }
}
