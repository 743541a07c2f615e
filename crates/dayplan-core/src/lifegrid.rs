use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  NaiveDate,
  NaiveDateTime,
  NaiveTime
};
use serde::Serialize;
use tracing::debug;

use crate::clock;

pub const WEEK_COLUMNS: usize = 52;
pub const DAY_COLUMNS: usize = 7;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Lifespan {
  Unhealthy,
  Healthy,
  Extreme
}

const LIFESPAN_YEARS: [(Lifespan, u32); 3] = [
  (Lifespan::Unhealthy, 65),
  (Lifespan::Healthy, 80),
  (Lifespan::Extreme, 130)
];

impl Lifespan {
  pub const ALL: [Lifespan; 3] = [
    Lifespan::Unhealthy,
    Lifespan::Healthy,
    Lifespan::Extreme
  ];

  #[must_use]
  pub fn years(self) -> u32 {
    LIFESPAN_YEARS
      .iter()
      .find(|(option, _)| *option == self)
      .map(|(_, years)| *years)
      .unwrap_or(0)
  }

  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      | Self::Unhealthy => "unhealthy",
      | Self::Healthy => "healthy",
      | Self::Extreme => "extreme"
    }
  }
}

impl fmt::Display for Lifespan {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{} ({} years)",
      self.name(),
      self.years()
    )
  }
}

impl FromStr for Lifespan {
  type Err = LifeGridError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "unhealthy" => Ok(Self::Unhealthy),
      | "healthy" => Ok(Self::Healthy),
      | "extreme" | "bryan" => {
        Ok(Self::Extreme)
      }
      | _ => Err(
        LifeGridError::MissingLifespanSelection
      )
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LifeUnit {
  Week,
  Day
}

impl LifeUnit {
  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      | Self::Week => "week",
      | Self::Day => "day"
    }
  }
}

impl FromStr for LifeUnit {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "week" | "weeks" | "w" => {
        Ok(Self::Week)
      }
      | "day" | "days" | "d" => {
        Ok(Self::Day)
      }
      | other => Err(anyhow!(
        "unknown life unit: {other} \
         (expected week or day)"
      ))
    }
  }
}

/// Why no grid could be produced. The `Missing*` variants mean "not
/// configured yet" and should render as a prompt.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  thiserror::Error,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifeGridError {
  #[error("enter your birthday")]
  MissingBirthdate,
  #[error("select a lifespan option")]
  MissingLifespanSelection,
  #[error("`{input}` is not a valid birthday in the past")]
  InvalidBirthdate { input: String }
}

impl LifeGridError {
  #[must_use]
  pub fn is_prompt(&self) -> bool {
    matches!(
      self,
      Self::MissingBirthdate
        | Self::MissingLifespanSelection
    )
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct LifeCell {
  pub elapsed: bool
}

#[derive(
  Debug, Clone, Copy, PartialEq, Serialize,
)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifeProgress {
  Living { percent: f64 },
  Exceeded
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct LifeGrid {
  pub unit:           LifeUnit,
  pub lifespan:       Lifespan,
  pub birthdate:      NaiveDate,
  pub expected_death: NaiveDate,
  pub total_units:    u64,
  /// May exceed `total_units` once the assumed lifespan has passed.
  pub elapsed_units:  u64,
  pub columns:        usize,
  pub rows:           usize,
  pub cells:          Vec<LifeCell>
}

impl LifeGrid {
  #[must_use]
  pub fn is_exceeded(&self) -> bool {
    self.elapsed_units > self.total_units
  }

  #[must_use]
  pub fn progress(&self) -> LifeProgress {
    if self.is_exceeded()
      || self.total_units == 0
    {
      return LifeProgress::Exceeded;
    }
    LifeProgress::Living {
      percent: self.elapsed_units as f64
        / self.total_units as f64
        * 100.0
    }
  }

  /// Row-major `(row, col)` of cell `index`.
  #[must_use]
  pub fn cell_position(
    &self,
    index: usize
  ) -> Option<(usize, usize)> {
    if index >= self.cells.len()
      || self.columns == 0
    {
      return None;
    }
    Some((
      index / self.columns,
      index % self.columns
    ))
  }

  pub fn grid_rows(
    &self
  ) -> impl Iterator<Item = &[LifeCell]> {
    self.cells.chunks(self.columns.max(1))
  }
}

/// Maps a birthdate and lifespan assumption onto elapsed/remaining units.
///
/// Weekly grids are `52 x years` cells; daily grids hold every calendar
/// day to the expected death date in rows of seven. Elapsed units are whole
/// periods since the birthdate's midnight, truncated.
#[tracing::instrument(skip(now))]
pub fn build_life_grid(
  birthdate: &str,
  lifespan: Option<Lifespan>,
  unit: LifeUnit,
  now: NaiveDateTime
) -> Result<LifeGrid, LifeGridError> {
  let raw = birthdate.trim();
  if raw.is_empty() {
    return Err(
      LifeGridError::MissingBirthdate
    );
  }
  let lifespan = lifespan.ok_or(
    LifeGridError::MissingLifespanSelection
  )?;

  let invalid = || {
    LifeGridError::InvalidBirthdate {
      input: raw.to_string()
    }
  };
  let birth = clock::parse_iso_date(raw)
    .ok_or_else(invalid)?;
  let birth_start =
    birth.and_time(NaiveTime::MIN);
  if birth_start >= now {
    return Err(invalid());
  }

  let years = lifespan.years();
  let expected_death =
    clock::add_years(birth, years)
      .ok_or_else(invalid)?;

  let elapsed_days = u64::try_from(
    (now - birth_start).num_days()
  )
  .unwrap_or(0);
  let lifetime_days = u64::try_from(
    (expected_death - birth).num_days()
  )
  .unwrap_or(0);

  let (total_units, elapsed_units, columns) =
    match unit {
      | LifeUnit::Week => (
        u64::from(years)
          * WEEK_COLUMNS as u64,
        elapsed_days / 7,
        WEEK_COLUMNS
      ),
      | LifeUnit::Day => (
        lifetime_days,
        elapsed_days,
        DAY_COLUMNS
      )
    };
  let rows = match unit {
    | LifeUnit::Week => years as usize,
    | LifeUnit::Day => {
      (total_units as usize)
        .div_ceil(DAY_COLUMNS)
    }
  };

  let cells = (0..total_units)
    .map(|idx| LifeCell {
      elapsed: idx < elapsed_units
    })
    .collect();

  debug!(
    %birth,
    %expected_death,
    unit = unit.name(),
    total_units,
    elapsed_units,
    "built life grid"
  );

  Ok(LifeGrid {
    unit,
    lifespan,
    birthdate: birth,
    expected_death,
    total_units,
    elapsed_units,
    columns,
    rows,
    cells
  })
}
