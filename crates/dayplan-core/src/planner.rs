//! Session state a host keeps between user actions and clock ticks.
//!
//! Nothing here owns a timer: the host calls [`DayPlanner::refresh`] at
//! whatever cadence it likes (about once a second for a live display) and
//! passes the current time in.

use chrono::{
  NaiveDate,
  NaiveDateTime
};
use serde::Serialize;
use tracing::{
  debug,
  info
};

use crate::config::Config;
use crate::density::{
  DEFAULT_HOUR_HEIGHT,
  DEFAULT_OVERLAP_HEIGHT,
  EventStatus,
  Layout,
  peak_overlap
};
use crate::lifegrid::{
  LifeGrid,
  LifeGridError,
  LifeUnit,
  Lifespan,
  build_life_grid
};
use crate::schedule::{
  Event,
  ParseError,
  parse_schedule,
  repeat_tomorrow
};
use crate::scroll::scroll_offset;

pub const DEFAULT_VIEWPORT_HEIGHT: f64 =
  600.0;

#[derive(
  Debug, Clone, Copy, PartialEq, Serialize,
)]
pub struct LayoutSettings {
  pub hour_height:     f64,
  pub overlap_height:  f64,
  pub viewport_height: f64
}

impl Default for LayoutSettings {
  fn default() -> Self {
    Self {
      hour_height:     DEFAULT_HOUR_HEIGHT,
      overlap_height:  DEFAULT_OVERLAP_HEIGHT,
      viewport_height:
        DEFAULT_VIEWPORT_HEIGHT
    }
  }
}

impl LayoutSettings {
  pub fn from_config(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let defaults = Self::default();
    Ok(Self {
      hour_height:     cfg
        .get_f64("layout.hour_height")?
        .unwrap_or(defaults.hour_height),
      overlap_height:  cfg
        .get_f64("layout.overlap_height")?
        .unwrap_or(
          defaults.overlap_height
        ),
      viewport_height: cfg
        .get_f64(
          "layout.viewport_height"
        )?
        .unwrap_or(
          defaults.viewport_height
        )
    })
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct LifeSelection {
  pub birthdate: String,
  pub lifespan:  Option<Lifespan>,
  pub unit:      LifeUnit
}

impl Default for LifeSelection {
  fn default() -> Self {
    Self {
      birthdate: String::new(),
      lifespan:  None,
      unit:      LifeUnit::Week
    }
  }
}

/// Everything the display needs for one tick.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
  pub now:           NaiveDateTime,
  pub layout:        Layout,
  /// Only set while locked to now.
  pub scroll_offset: Option<f64>,
  pub statuses:      Vec<EventStatus>,
  pub life:          Result<LifeGrid, LifeGridError>
}

impl Frame {
  /// Indices of events happening at `now`.
  pub fn current_events(
    &self
  ) -> impl Iterator<Item = usize> + '_ {
    self
      .statuses
      .iter()
      .enumerate()
      .filter(|(_, status)| status.current)
      .map(|(idx, _)| idx)
  }
}

#[derive(Debug, Clone, Default)]
pub struct DayPlanner {
  events:        Vec<Event>,
  last_errors:   Vec<ParseError>,
  locked_to_now: bool,
  life:          LifeSelection,
  settings:      LayoutSettings
}

impl DayPlanner {
  pub fn new(
    settings: LayoutSettings
  ) -> Self {
    Self {
      settings,
      ..Self::default()
    }
  }

  pub fn events(&self) -> &[Event] {
    &self.events
  }

  /// Errors from the most recent [`DayPlanner::commit`].
  pub fn last_errors(
    &self
  ) -> &[ParseError] {
    &self.last_errors
  }

  pub fn settings(
    &self
  ) -> LayoutSettings {
    self.settings
  }

  /// Parses `input` against `reference` and appends the new events after
  /// the existing ones. Blank input leaves everything untouched.
  #[tracing::instrument(skip(self, input))]
  pub fn commit(
    &mut self,
    input: &str,
    reference: NaiveDate
  ) -> &[ParseError] {
    if input.trim().is_empty() {
      debug!("blank input, nothing to commit");
      return &[];
    }

    let result =
      parse_schedule(input, reference);
    info!(
      added = result.events.len(),
      errors = result.errors.len(),
      "committed schedule input"
    );
    self.events.extend(result.events);
    self.last_errors = result.errors;
    &self.last_errors
  }

  /// Duplicates every event starting on `day` onto the following day.
  /// Returns how many copies were added.
  #[tracing::instrument(skip(self))]
  pub fn repeat_tomorrow(
    &mut self,
    day: NaiveDate
  ) -> usize {
    let todays: Vec<Event> = self
      .events
      .iter()
      .filter(|event| {
        event.start.date() == day
      })
      .cloned()
      .collect();
    let copies = repeat_tomorrow(&todays);
    let added = copies.len();
    self.events.extend(copies);
    debug!(added, "repeated events for tomorrow");
    added
  }

  pub fn clear(&mut self) {
    self.events.clear();
    self.last_errors.clear();
  }

  pub fn is_locked_to_now(&self) -> bool {
    self.locked_to_now
  }

  pub fn set_locked_to_now(
    &mut self,
    locked: bool
  ) {
    self.locked_to_now = locked;
  }

  pub fn toggle_lock(&mut self) -> bool {
    self.locked_to_now =
      !self.locked_to_now;
    self.locked_to_now
  }

  pub fn set_life(
    &mut self,
    selection: LifeSelection
  ) {
    self.life = selection;
  }

  pub fn life(&self) -> &LifeSelection {
    &self.life
  }

  pub fn peak_overlap(&self) -> usize {
    peak_overlap(&self.events)
  }

  pub fn layout(&self) -> Layout {
    Layout::for_events(
      &self.events,
      self.settings.hour_height,
      self.settings.overlap_height
    )
  }

  /// Recomputes everything that depends on the clock.
  #[tracing::instrument(skip(self))]
  pub fn refresh(
    &self,
    now: NaiveDateTime
  ) -> Frame {
    let layout = self.layout();
    let scroll_offset =
      self.locked_to_now.then(|| {
        scroll_offset(
          now,
          layout.total_height,
          self.settings.viewport_height
        )
      });
    let statuses = self
      .events
      .iter()
      .map(|event| {
        EventStatus::at(event, now)
      })
      .collect();
    let life = build_life_grid(
      &self.life.birthdate,
      self.life.lifespan,
      self.life.unit,
      now
    );

    Frame {
      now,
      layout,
      scroll_offset,
      statuses,
      life
    }
  }
}
