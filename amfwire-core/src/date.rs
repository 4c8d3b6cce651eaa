//! Date values.
//!
//! AMF carries dates as milliseconds since the Unix epoch (UTC). Decoding can
//! shift them into local or "unspecified" wall-clock time depending on the
//! timezone compensation policy, so a date remembers which kind of clock its
//! wall-clock fields belong to.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Which clock a [`Date`]'s wall-clock fields are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateKind {
    Utc,
    Local,
    /// Wall-clock time with no zone attached; converted as local time when
    /// an instant is required.
    Unspecified,
}

/// A calendar date and time with an associated [`DateKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    naive: NaiveDateTime,
    kind: DateKind,
}

impl Date {
    pub fn new(naive: NaiveDateTime, kind: DateKind) -> Self {
        Self { naive, kind }
    }

    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Self::new(instant.naive_utc(), DateKind::Utc)
    }

    /// Creates a UTC date from milliseconds since the epoch. Returns `None`
    /// when the value is out of chrono's range.
    pub fn from_timestamp_millis(millis: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(Self::from_utc)
    }

    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.naive
    }

    pub fn kind(&self) -> DateKind {
        self.kind
    }

    /// Resolves this date to an instant. Local and unspecified dates are
    /// interpreted in the host's timezone.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self.kind {
            DateKind::Utc => self.naive.and_utc(),
            DateKind::Local | DateKind::Unspecified => Local
                .from_local_datetime(&self.naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .unwrap_or_else(|| self.naive.and_utc()),
        }
    }

    /// Milliseconds since the epoch of the instant this date denotes.
    pub fn timestamp_millis(&self) -> i64 {
        self.to_utc().timestamp_millis()
    }

    /// Converts to host-local wall-clock time.
    pub fn to_local(&self) -> Self {
        match self.kind {
            DateKind::Local => *self,
            _ => Self::new(
                self.to_utc().with_timezone(&Local).naive_local(),
                DateKind::Local,
            ),
        }
    }

    /// Shifts the wall-clock fields by `minutes` and marks the result
    /// unspecified.
    pub fn shift_minutes(&self, minutes: i64) -> Self {
        Self::new(
            self.naive + chrono::Duration::minutes(minutes),
            DateKind::Unspecified,
        )
    }

    /// Host timezone offset from UTC in minutes at this date's instant.
    pub fn local_offset_minutes(&self) -> i32 {
        Local
            .offset_from_utc_datetime(&self.to_utc().naive_utc())
            .local_minus_utc()
            / 60
    }
}

impl From<DateTime<Utc>> for Date {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::from_utc(instant)
    }
}
