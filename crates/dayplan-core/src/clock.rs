use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Days,
  Local,
  Months,
  NaiveDate,
  NaiveDateTime,
  NaiveTime
};

pub const MILLIS_PER_DAY: i64 =
  86_400_000;

const ISO_DATE: &str = "%Y-%m-%d";

const DATETIME_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M"
];

/// Current local wall-clock time. Everything below this function takes
/// the instant as a parameter.
#[must_use]
pub fn local_now() -> NaiveDateTime {
  Local::now().naive_local()
}

#[must_use]
pub fn start_of_day(
  dt: NaiveDateTime
) -> NaiveDateTime {
  dt.date().and_time(NaiveTime::MIN)
}

#[must_use]
pub fn parse_iso_date(
  input: &str
) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(
    input.trim(),
    ISO_DATE
  )
  .ok()
}

/// Calendar-year addition; Feb 29 lands on Feb 28 in non-leap years.
#[must_use]
pub fn add_years(
  date: NaiveDate,
  years: u32
) -> Option<NaiveDate> {
  date.checked_add_months(Months::new(
    years.checked_mul(12)?
  ))
}

#[must_use]
pub fn next_day(
  dt: NaiveDateTime
) -> Option<NaiveDateTime> {
  dt.checked_add_days(Days::new(1))
}

#[must_use]
pub fn at_clock(
  date: NaiveDate,
  hour: u32,
  minute: u32
) -> Option<NaiveDateTime> {
  date.and_hms_opt(hour, minute, 0)
}

/// Resolves the date clock-times are placed on: `today`, `tomorrow`,
/// `yesterday` or an ISO date.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn reference_date(
  input: &str,
  now: NaiveDateTime
) -> anyhow::Result<NaiveDate> {
  let token =
    input.trim().to_ascii_lowercase();
  let today = now.date();

  match token.as_str() {
    | "" | "today" => Ok(today),
    | "tomorrow" => {
      today
        .checked_add_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "failed to advance to \
             tomorrow"
          )
        })
    }
    | "yesterday" => {
      today
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "failed to step back to \
             yesterday"
          )
        })
    }
    | _ => {
      parse_iso_date(&token)
        .ok_or_else(|| {
          anyhow!(
            "unrecognized reference \
             date: {input}"
          )
        })
        .context(
          "supported reference dates: \
           today, tomorrow, yesterday, \
           YYYY-MM-DD"
        )
    }
  }
}

/// Parses the `--now` override into a local wall-clock instant.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_now_expr(
  input: &str,
  now: NaiveDateTime
) -> anyhow::Result<NaiveDateTime> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "now" => return Ok(now),
    | "today" => {
      return Ok(start_of_day(now));
    }
    | "tomorrow" => {
      return next_day(start_of_day(
        now
      ))
      .ok_or_else(|| {
        anyhow!(
          "failed to advance to \
           tomorrow"
        )
      });
    }
    | _ => {}
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(
      dt.with_timezone(&Local)
        .naive_local()
    );
  }

  for fmt in DATETIME_FORMATS {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt);
    }
  }

  if let Some(date) =
    parse_iso_date(token)
  {
    return Ok(
      date.and_time(NaiveTime::MIN)
    );
  }

  Err(anyhow!(
    "unrecognized time expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow, RFC3339, \
     YYYY-MM-DD, YYYY-MM-DDTHH:MM[:SS], \
     YYYY-MM-DD HH:MM[:SS]"
  })
}
