use std::sync::LazyLock;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Datelike,
  Duration,
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::TaskError;

static RELATIVE_RE: LazyLock<
  Result<Regex, regex::Error>
> = LazyLock::new(|| {
  Regex::new(
    r"^\+(?P<num>\d+)(?P<unit>[dw])$"
  )
});

/// Parses an IANA timezone id from config. Bad ids are logged and ignored
/// so the caller falls back to the system zone.
pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Calendar date of `now` in `tz`, or in the system zone when unset.
#[must_use]
pub fn local_date(
  now: DateTime<Utc>,
  tz: Option<Tz>
) -> NaiveDate {
  match tz {
    | Some(tz) => {
      now.with_timezone(&tz).date_naive()
    }
    | None => {
      now.with_timezone(&Local).date_naive()
    }
  }
}

/// Short label used in task tables, e.g. `Tue, 3 Mar`.
#[must_use]
pub fn format_due(
  date: NaiveDate
) -> String {
  date.format("%a, %-d %b").to_string()
}

/// Parses due-date input relative to `today`.
///
/// Blank input clears the date. Accepts `YYYY-MM-DD`, `today`,
/// `tomorrow`, `yesterday`, weekday names (next occurrence, never today)
/// and `+Nd` / `+Nw`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_due(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<Option<NaiveDate>> {
  let token = input.trim();
  if token.is_empty() {
    return Ok(None);
  }
  let lower = token.to_ascii_lowercase();
  let invalid = || {
    anyhow::Error::from(
      TaskError::InvalidDueDate(
        token.to_string()
      )
    )
  };

  match lower.as_str() {
    | "today" => return Ok(Some(today)),
    | "tomorrow" => {
      return today
        .checked_add_signed(
          Duration::days(1)
        )
        .map(Some)
        .ok_or_else(invalid);
    }
    | "yesterday" => {
      return today
        .checked_sub_signed(
          Duration::days(1)
        )
        .map(Some)
        .ok_or_else(invalid);
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return next_weekday_date(
      today, target
    )
    .map(Some)
    .ok_or_else(invalid);
  }

  let rel_re =
    RELATIVE_RE.as_ref().map_err(|e| {
      anyhow!(
        "internal regex compile \
         failure: {e}"
      )
    })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps
      .name("num")
      .and_then(|m| {
        m.as_str().parse().ok()
      })
      .ok_or_else(invalid)?;
    let days = match caps
      .name("unit")
      .map(|m| m.as_str())
    {
      | Some("w") => num.checked_mul(7),
      | _ => Some(num)
    }
    .ok_or_else(invalid)?;

    return Duration::try_days(days)
      .and_then(|d| {
        today.checked_add_signed(d)
      })
      .map(Some)
      .ok_or_else(invalid);
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .map(Some)
  .map_err(|_| invalid())
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> Option<NaiveDate> {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from.checked_add_signed(
    Duration::days(delta)
  )
}
