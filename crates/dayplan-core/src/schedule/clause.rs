//! Time Range Parser for a single clause.
//!
//! Grammar, read right to left so the title can hold anything:
//!
//! ```text
//! clause   := title start ws? '-' ws? end ws? meridiem
//! start    := hour ':' minute        (hour takes the last 1-2 digits)
//! end      := hour ':' minute
//! hour     := 1-2 digits, 1..=12
//! minute   := exactly 2 digits, 00..=59
//! meridiem := "am" | "pm"            (case-insensitive, shared by both)
//! title    := ['['] text [']']
//! ```

use chrono::{
  NaiveDate,
  NaiveDateTime
};
use tracing::trace;

use super::lexer::{
  Token,
  TokenKind,
  tokenize
};
use super::{
  Event,
  ParseError,
  ParseErrorReason
};
use crate::clock;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Meridiem {
  Am,
  Pm
}

impl Meridiem {
  fn from_word(
    word: &str
  ) -> Option<Self> {
    if word.eq_ignore_ascii_case("am") {
      Some(Self::Am)
    } else if word
      .eq_ignore_ascii_case("pm")
    {
      Some(Self::Pm)
    } else {
      None
    }
  }

  /// Converts a 12-hour clock hour (1..=12) to 0..=23.
  #[must_use]
  pub fn to_24h(
    self,
    hour: u32
  ) -> u32 {
    match (self, hour) {
      | (Self::Am, 12) => 0,
      | (Self::Am, h) => h,
      | (Self::Pm, 12) => 12,
      | (Self::Pm, h) => h + 12
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct ClockTime {
  pub hour:   u32,
  pub minute: u32
}

impl ClockTime {
  fn resolve(
    self,
    date: NaiveDate,
    meridiem: Meridiem
  ) -> Result<NaiveDateTime, ParseErrorReason>
  {
    if !(1..=12).contains(&self.hour)
      || self.minute > 59
    {
      return Err(
        ParseErrorReason::InvalidClock
      );
    }
    clock::at_clock(
      date,
      meridiem.to_24h(self.hour),
      self.minute
    )
    .ok_or(ParseErrorReason::InvalidClock)
  }
}

/// The shape of a clause before it is placed on a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseShape<'a> {
  pub title:    &'a str,
  pub start:    ClockTime,
  pub end:      ClockTime,
  pub meridiem: Meridiem
}

struct TailParser<'a> {
  source: &'a str,
  tokens: Vec<Token<'a>>,
  end:    usize
}

impl<'a> TailParser<'a> {
  fn new(source: &'a str) -> Self {
    let tokens = tokenize(source);
    let end = tokens.len();
    Self {
      source,
      tokens,
      end
    }
  }

  fn peek(&self) -> Option<Token<'a>> {
    self
      .end
      .checked_sub(1)
      .and_then(|idx| {
        self.tokens.get(idx).copied()
      })
  }

  fn take(
    &mut self,
    kind: TokenKind
  ) -> Option<Token<'a>> {
    let tok = self.peek()?;
    if tok.kind != kind {
      return None;
    }
    self.end -= 1;
    Some(tok)
  }

  fn skip_space(&mut self) {
    let _ = self.take(TokenKind::Space);
  }

  fn parse(
    mut self
  ) -> Result<ClauseShape<'a>, ParseErrorReason>
  {
    let meridiem = self.meridiem()?;
    self.skip_space();

    let end = self
      .clock(false)
      .ok_or(
        ParseErrorReason::MalformedEndTime
      )?
      .0;
    self.skip_space();

    self.take(TokenKind::Dash).ok_or(
      ParseErrorReason::MissingSeparator
    )?;
    self.skip_space();

    let (start, start_offset) =
      self.clock(true).ok_or(
        ParseErrorReason::MalformedStartTime
      )?;

    let title = clean_title(
      &self.source[..start_offset]
    );

    Ok(ClauseShape {
      title,
      start,
      end,
      meridiem
    })
  }

  fn meridiem(
    &mut self
  ) -> Result<Meridiem, ParseErrorReason>
  {
    self
      .take(TokenKind::Word)
      .and_then(|tok| {
        Meridiem::from_word(tok.text)
      })
      .ok_or(
        ParseErrorReason::MissingMeridiem
      )
  }

  /// Consumes `hour ':' minute` from the tail. When `split_hour` is set the
  /// hour may be the trailing digits of a longer run, the rest is left to
  /// the title. Returns the clock and the byte offset where it starts.
  fn clock(
    &mut self,
    split_hour: bool
  ) -> Option<(ClockTime, usize)> {
    let minute_tok =
      self.take(TokenKind::Digits)?;
    if minute_tok.text.len() != 2 {
      return None;
    }
    self.take(TokenKind::Colon)?;
    let hour_tok =
      self.take(TokenKind::Digits)?;

    let digits = hour_tok.text;
    let (hour_text, offset) =
      if digits.len() <= 2 {
        (digits, hour_tok.offset)
      } else if split_hour {
        let cut = digits.len() - 2;
        (&digits[cut..], hour_tok.offset + cut)
      } else {
        return None;
      };

    Some((
      ClockTime {
        hour:   hour_text.parse().ok()?,
        minute: minute_tok
          .text
          .parse()
          .ok()?
      },
      offset
    ))
  }
}

fn clean_title(raw: &str) -> &str {
  let trimmed = raw.trim_end();
  let trimmed = trimmed
    .strip_suffix(']')
    .unwrap_or(trimmed);
  let trimmed = trimmed
    .strip_prefix('[')
    .unwrap_or(trimmed);
  trimmed.trim()
}

/// Recognises the clause shape without placing it on a calendar date.
pub fn parse_shape(
  clause: &str
) -> Result<ClauseShape<'_>, ParseErrorReason>
{
  TailParser::new(clause).parse()
}

/// Parses one clause into an [`Event`] on `reference`.
///
/// Both clock times share the single meridiem marker. When the end lands
/// before the start it is moved to the following day, once.
#[tracing::instrument(skip(reference), fields(clause = clause))]
pub fn parse_clause(
  clause: &str,
  reference: NaiveDate
) -> Result<Event, ParseError> {
  let fail = |reason| {
    ParseError::new(clause, reason)
  };

  let shape =
    parse_shape(clause).map_err(fail)?;
  let start = shape
    .start
    .resolve(reference, shape.meridiem)
    .map_err(fail)?;
  let mut end = shape
    .end
    .resolve(reference, shape.meridiem)
    .map_err(fail)?;

  if end < start {
    trace!(%start, %end, "end before start, wrapping past midnight");
    end = clock::next_day(end).ok_or(
      fail(ParseErrorReason::DateOverflow)
    )?;
  }
  if end == start {
    return Err(fail(
      ParseErrorReason::EmptyRange
    ));
  }

  Ok(Event {
    title: shape.title.to_string(),
    start,
    end
  })
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveDateTime
  };

  use super::{
    Meridiem,
    parse_clause,
    parse_shape
  };
  use crate::schedule::ParseErrorReason;

  fn day0() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10)
      .expect("valid date")
  }

  fn at(
    date: NaiveDate,
    hour: u32,
    minute: u32
  ) -> NaiveDateTime {
    date
      .and_hms_opt(hour, minute, 0)
      .expect("valid time")
  }

  #[test]
  fn parses_plain_clause() {
    let event = parse_clause(
      "Meeting 9:00-10:00 am",
      day0()
    )
    .expect("parse clause");
    assert_eq!(event.title, "Meeting");
    assert_eq!(event.start, at(day0(), 9, 0));
    assert_eq!(event.end, at(day0(), 10, 0));
  }

  #[test]
  fn strips_brackets_from_title() {
    let event = parse_clause(
      "[Lunch] 12:00-1:00 pm",
      day0()
    )
    .expect("parse clause");
    assert_eq!(event.title, "Lunch");
    assert_eq!(
      event.start,
      at(day0(), 12, 0)
    );
    assert_eq!(event.end, at(day0(), 13, 0));
  }

  #[test]
  fn meridiem_is_shared_by_both_times() {
    // 11:30 pm to 1:00 pm wraps to the next afternoon.
    let event = parse_clause(
      "Shift 11:30-1:00 pm",
      day0()
    )
    .expect("parse clause");
    assert_eq!(
      event.start,
      at(day0(), 23, 30)
    );
    let next = day0().succ_opt().expect("next day");
    assert_eq!(event.end, at(next, 13, 0));
  }

  #[test]
  fn wraps_end_past_midnight() {
    let event = parse_clause(
      "Party 11:00-1:00 am",
      day0()
    )
    .expect("parse clause");
    assert_eq!(
      event.start,
      at(day0(), 11, 0)
    );
    let next = day0().succ_opt().expect("next day");
    assert_eq!(event.end, at(next, 1, 0));
    assert!(event.end > event.start);
  }

  #[test]
  fn twelve_am_is_midnight() {
    let event = parse_clause(
      "Late 12:15-12:45 am",
      day0()
    )
    .expect("parse clause");
    assert_eq!(event.start, at(day0(), 0, 15));
    assert_eq!(event.end, at(day0(), 0, 45));
  }

  #[test]
  fn empty_title_is_allowed() {
    let event =
      parse_clause("9:00-9:30 AM", day0())
        .expect("parse clause");
    assert_eq!(event.title, "");
  }

  #[test]
  fn loose_spacing_is_accepted() {
    let shape =
      parse_shape("Gym7:00 - 8:15pm")
        .expect("parse shape");
    assert_eq!(shape.title, "Gym");
    assert_eq!(shape.start.hour, 7);
    assert_eq!(shape.end.minute, 15);
    assert_eq!(shape.meridiem, Meridiem::Pm);
  }

  #[test]
  fn title_keeps_digits_before_hour() {
    let shape =
      parse_shape("Room101:00-2:00 pm")
        .expect("parse shape");
    assert_eq!(shape.title, "Room1");
    assert_eq!(shape.start.hour, 1);
  }

  #[test]
  fn reports_missing_meridiem() {
    let err = parse_clause(
      "Meeting 9:00-10:00",
      day0()
    )
    .expect_err("no meridiem");
    assert_eq!(
      err.raw_clause,
      "Meeting 9:00-10:00"
    );
    assert_eq!(
      err.reason,
      ParseErrorReason::MissingMeridiem
    );
  }

  #[test]
  fn rejects_out_of_range_clock() {
    let err = parse_clause(
      "Odd 13:00-14:00 pm",
      day0()
    )
    .expect_err("hour 13");
    assert_eq!(
      err.reason,
      ParseErrorReason::InvalidClock
    );

    let err = parse_clause(
      "Odd 9:75-10:00 am",
      day0()
    )
    .expect_err("minute 75");
    assert_eq!(
      err.reason,
      ParseErrorReason::InvalidClock
    );
  }

  #[test]
  fn rejects_single_digit_minutes() {
    let err = parse_clause(
      "Call 9:0-10:00 am",
      day0()
    )
    .expect_err("short minutes");
    assert_eq!(
      err.reason,
      ParseErrorReason::MalformedStartTime
    );
  }

  #[test]
  fn rejects_zero_length_range() {
    let err = parse_clause(
      "Blink 9:00-9:00 am",
      day0()
    )
    .expect_err("zero length");
    assert_eq!(
      err.reason,
      ParseErrorReason::EmptyRange
    );
  }

  #[test]
  fn rejects_missing_separator() {
    let err = parse_clause(
      "Nap 1:00 2:00 pm",
      day0()
    )
    .expect_err("no dash");
    assert_eq!(
      err.reason,
      ParseErrorReason::MissingSeparator
    );
  }
}
