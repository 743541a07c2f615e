pub mod clause;
pub mod lexer;

use chrono::{
  Days,
  NaiveDate,
  NaiveDateTime
};
use serde::Serialize;
use tracing::debug;

pub use self::clause::parse_clause;

pub const CLAUSE_SEPARATOR: char = ';';

/// A time-boxed activity. `end` is always strictly after `start`.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct Event {
  pub title: String,
  pub start: NaiveDateTime,
  pub end:   NaiveDateTime
}

impl Event {
  #[must_use]
  pub fn shifted_days(
    &self,
    days: u64
  ) -> Option<Self> {
    Some(Self {
      title: self.title.clone(),
      start: self
        .start
        .checked_add_days(Days::new(
          days
        ))?,
      end:   self
        .end
        .checked_add_days(Days::new(
          days
        ))?
    })
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  thiserror::Error,
)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorReason {
  #[error("expected a trailing am/pm marker")]
  MissingMeridiem,
  #[error("expected an end time like 10:00")]
  MalformedEndTime,
  #[error("expected '-' between the two times")]
  MissingSeparator,
  #[error("expected a start time like 9:00")]
  MalformedStartTime,
  #[error("clock time out of range")]
  InvalidClock,
  #[error("start and end are the same time")]
  EmptyRange,
  #[error("date out of range")]
  DateOverflow
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  thiserror::Error,
)]
#[error("cannot parse `{raw_clause}`: {reason}")]
pub struct ParseError {
  pub raw_clause: String,
  pub reason:     ParseErrorReason
}

impl ParseError {
  pub fn new(
    raw_clause: &str,
    reason: ParseErrorReason
  ) -> Self {
    Self {
      raw_clause: raw_clause.to_string(),
      reason
    }
  }
}

/// Events and errors, each in clause order.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct ParseResult {
  pub events: Vec<Event>,
  pub errors: Vec<ParseError>
}

impl ParseResult {
  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
      && self.errors.is_empty()
  }
}

/// Splits `input` on `;` and parses every non-empty clause against
/// `reference`. Blank clauses are dropped silently; malformed ones are
/// reported and parsing continues.
#[tracing::instrument(skip(input, reference))]
pub fn parse_schedule(
  input: &str,
  reference: NaiveDate
) -> ParseResult {
  let mut result = ParseResult::default();
  if input.trim().is_empty() {
    return result;
  }

  for clause in input
    .split(CLAUSE_SEPARATOR)
    .map(str::trim)
    .filter(|clause| !clause.is_empty())
  {
    match parse_clause(clause, reference)
    {
      | Ok(event) => {
        result.events.push(event)
      }
      | Err(err) => {
        debug!(
          clause = %err.raw_clause,
          reason = %err.reason,
          "failed to parse clause"
        );
        result.errors.push(err);
      }
    }
  }

  debug!(
    events = result.events.len(),
    errors = result.errors.len(),
    "parsed schedule"
  );
  result
}

/// Copies of `events` one calendar day later, for "repeat tomorrow".
#[must_use]
pub fn repeat_tomorrow(
  events: &[Event]
) -> Vec<Event> {
  events
    .iter()
    .filter_map(|event| {
      event.shifted_days(1)
    })
    .collect()
}
