use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Weekly,
    Monthly,
}

impl PeriodKind {
    /// Capitalized label used in report titles.
    pub fn title_label(self) -> &'static str {
        match self {
            PeriodKind::Weekly => "Weekly",
            PeriodKind::Monthly => "Monthly",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodKind::Weekly => "weekly",
            PeriodKind::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodKind {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(PeriodKind::Weekly),
            "monthly" | "month" => Ok(PeriodKind::Monthly),
            other => Err(PeriodError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("period start {start} is after end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("unknown period kind '{0}', expected 'weekly' or 'monthly'")]
    UnknownKind(String),

    #[error("invalid calendar month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}

/// A bounded reporting window. Weekly periods run Monday 00:00:00 through
/// Sunday 23:59:59 UTC, monthly periods cover one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PeriodFields")]
pub struct Period {
    kind: PeriodKind,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PeriodFields {
    kind: PeriodKind,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<PeriodFields> for Period {
    type Error = PeriodError;

    fn try_from(fields: PeriodFields) -> Result<Self, Self::Error> {
        Period::new(fields.kind, fields.start, fields.end)
    }
}

impl Period {
    pub fn new(
        kind: PeriodKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, PeriodError> {
        if start > end {
            return Err(PeriodError::Inverted { start, end });
        }
        Ok(Self { kind, start, end })
    }

    /// A custom window from the start of `first` through the last second
    /// of `last`, both dates inclusive.
    pub fn from_dates(
        kind: PeriodKind,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Self, PeriodError> {
        let end = match last.succ_opt() {
            Some(next) => last_second_before(next),
            None => start_of_day(last),
        };
        Self::new(kind, start_of_day(first), end)
    }

    /// The Monday-to-Sunday week containing `date`.
    pub fn week_of(date: NaiveDate) -> Self {
        let monday = date - Days::new(u64::from(date.weekday().num_days_from_monday()));
        let next_monday = monday + Days::new(7);
        Self {
            kind: PeriodKind::Weekly,
            start: start_of_day(monday),
            end: last_second_before(next_monday),
        }
    }

    pub fn month_of(year: i32, month: u32) -> Result<Self, PeriodError> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(PeriodError::InvalidMonth { year, month })?;
        Ok(Self::month_starting(first))
    }

    /// The period of `kind` that contains `instant`.
    pub fn containing(kind: PeriodKind, instant: DateTime<Utc>) -> Self {
        let date = instant.date_naive();
        match kind {
            PeriodKind::Weekly => Self::week_of(date),
            PeriodKind::Monthly => Self::month_starting(first_of_month(date)),
        }
    }

    /// The most recent fully elapsed period of `kind` before `now`.
    pub fn last_completed(kind: PeriodKind, now: DateTime<Utc>) -> Self {
        Self::containing(kind, now).previous()
    }

    /// The period of the same kind immediately preceding this one.
    pub fn previous(&self) -> Self {
        let start_date = self.start.date_naive();
        match self.kind {
            PeriodKind::Weekly => Self::week_of(start_date - Days::new(7)),
            PeriodKind::Monthly => {
                let prior_day = first_of_month(start_date) - Days::new(1);
                Self::month_starting(first_of_month(prior_day))
            }
        }
    }

    pub fn kind(&self) -> PeriodKind {
        self.kind
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whole days between start and end, truncated. A Monday-to-Sunday week
    /// spans 6 days.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    fn month_starting(first: NaiveDate) -> Self {
        // 31 days past the 1st always lands inside the following month
        let next_first = first_of_month(first + Days::new(31));
        Self {
            kind: PeriodKind::Monthly,
            start: start_of_day(first),
            end: last_second_before(next_first),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} to {}",
            self.kind,
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn last_second_before(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) - chrono::Duration::seconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        // 2024-01-03 is a Wednesday
        let week = Period::week_of(date(2024, 1, 3));
        assert_eq!(week.start(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(week.end(), Utc.with_ymd_and_hms(2024, 1, 7, 23, 59, 59).unwrap());
        assert_eq!(week.start().weekday(), Weekday::Mon);
        assert_eq!(week.end().weekday(), Weekday::Sun);
        assert_eq!(week.duration_days(), 6);
    }

    #[test]
    fn previous_week_crosses_year_boundary() {
        let week = Period::week_of(date(2024, 1, 1));
        let prev = week.previous();
        assert_eq!(prev.kind(), PeriodKind::Weekly);
        assert_eq!(prev.start(), Utc.with_ymd_and_hms(2023, 12, 25, 0, 0, 0).unwrap());
        assert_eq!(prev.end(), Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn previous_week_realigns_to_monday() {
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 12, 0, 0, 0).unwrap();
        let custom = Period::new(PeriodKind::Weekly, start, end).unwrap();
        let prev = custom.previous();
        assert_eq!(prev.start(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn month_covers_leap_february() {
        let feb = Period::month_of(2024, 2).unwrap();
        assert_eq!(feb.start(), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(feb.end(), Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap());
    }

    #[test]
    fn previous_month_crosses_year_boundary() {
        let jan = Period::month_of(2024, 1).unwrap();
        let dec = jan.previous();
        assert_eq!(dec.kind(), PeriodKind::Monthly);
        assert_eq!(dec.start(), Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(dec.end(), Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn previous_of_march_is_february() {
        let march = Period::month_of(2023, 3).unwrap();
        let feb = march.previous();
        assert_eq!(feb.end(), Utc.with_ymd_and_hms(2023, 2, 28, 23, 59, 59).unwrap());
    }

    #[test]
    fn last_completed_week_and_month() {
        // Thursday 2024-03-14
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 9, 30, 0).unwrap();

        let week = Period::last_completed(PeriodKind::Weekly, now);
        assert_eq!(week.start(), Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap());
        assert_eq!(week.end(), Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap());

        let month = Period::last_completed(PeriodKind::Monthly, now);
        assert_eq!(month.start(), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(month.end(), Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap());
    }

    #[test]
    fn date_range_covers_whole_days() {
        let period = Period::from_dates(PeriodKind::Monthly, date(2024, 2, 10), date(2024, 3, 1)).unwrap();
        assert_eq!(period.start(), Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap());
        assert_eq!(period.end(), Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap());
        assert_eq!(period.duration_days(), 20);

        let inverted = Period::from_dates(PeriodKind::Weekly, date(2024, 3, 2), date(2024, 3, 1));
        assert!(matches!(inverted, Err(PeriodError::Inverted { .. })));
    }

    #[test]
    fn inverted_period_is_rejected() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            Period::new(PeriodKind::Weekly, start, end),
            Err(PeriodError::Inverted { .. })
        ));
        assert!(Period::new(PeriodKind::Weekly, start, start).is_ok());
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert_eq!(
            Period::month_of(2024, 13),
            Err(PeriodError::InvalidMonth { year: 2024, month: 13 })
        );
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Weekly".parse::<PeriodKind>(), Ok(PeriodKind::Weekly));
        assert_eq!("monthly".parse::<PeriodKind>(), Ok(PeriodKind::Monthly));
        assert!("daily".parse::<PeriodKind>().is_err());
    }

    #[test]
    fn deserializing_inverted_period_fails() {
        let json = r#"{"kind":"weekly","start":"2024-01-08T00:00:00Z","end":"2024-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<Period>(json).is_err());
    }
}
