//! Date normalization for job schedules.
//!
//! A job's schedule is edited as two fields, a day and a time of day, and
//! stored as two instants. The day instant ends up carrying the full
//! schedule; the time instant carries only the time of day, anchored on
//! 1970-01-01. All civil arithmetic happens in one configured time zone.

use jiff::{
    Timestamp,
    civil::{self, Date, Time},
    tz::TimeZone,
};

use crate::model::Record;

/// The fixed reference day time-of-day instants are anchored on.
const EPOCH_DAY: Date = civil::date(1970, 1, 1);

#[derive(Debug, thiserror::Error)]
#[error("time zone conversion failed: {0}")]
pub struct CalendarError(#[from] jiff::Error);

pub type Result<T> = core::result::Result<T, CalendarError>;

/// Civil date arithmetic in one time zone.
#[derive(Debug, Clone)]
pub struct Calendar {
    tz: TimeZone,
}

impl Calendar {
    pub fn new(tz: TimeZone) -> Self {
        Self { tz }
    }

    /// A calendar in the system's configured time zone.
    pub fn system() -> Self {
        Self::new(TimeZone::system())
    }

    /// Collapses `value` to 00:00:00 of its civil day.
    ///
    /// An absent value, or the zero instant, means "now".
    pub fn day_start(&self, value: Option<Timestamp>) -> Result<Timestamp> {
        let day = self.civil_date(or_now(value));
        Ok(day.to_zoned(self.tz.clone())?.timestamp())
    }

    /// Keeps only the hour, minute and second of `value`, on 1970-01-01.
    ///
    /// An absent value, or the zero instant, means "now".
    pub fn time_of_day(&self, value: Option<Timestamp>) -> Result<Timestamp> {
        self.at_epoch(self.civil_time(or_now(value)))
    }

    /// The time-of-day instant for `clock`: that time on 1970-01-01.
    pub fn at_epoch(&self, clock: Time) -> Result<Timestamp> {
        self.combine(EPOCH_DAY, clock)
    }

    /// Merges the civil day of `date` with the time of day of `time`.
    ///
    /// Returns `(date, time)` where the new date carries the merged schedule
    /// and the new time is that same time of day on 1970-01-01. The two are
    /// consistent with each other by construction.
    pub fn reconcile(&self, date: Timestamp, time: Timestamp) -> Result<(Timestamp, Timestamp)> {
        let day = self.civil_date(date);
        let clock = self.civil_time(time);
        Ok((self.combine(day, clock)?, self.at_epoch(clock)?))
    }

    /// The instant at `clock` on `day`, to the second.
    pub fn combine(&self, day: Date, clock: Time) -> Result<Timestamp> {
        let zoned = day.to_datetime(whole_seconds(clock)).to_zoned(self.tz.clone())?;
        Ok(zoned.timestamp())
    }

    pub fn civil_date(&self, value: Timestamp) -> Date {
        value.to_zoned(self.tz.clone()).date()
    }

    /// The time of day of `value`, truncated to the second.
    pub fn civil_time(&self, value: Timestamp) -> Time {
        whole_seconds(value.to_zoned(self.tz.clone()).time())
    }

    /// Listing label for a record: its title (or id when untitled) followed
    /// by its schedule.
    pub fn label(&self, record: &Record) -> String {
        let when = record.date.to_zoned(self.tz.clone()).strftime("%Y-%m-%d %H:%M");
        if record.title.is_empty() {
            format!("{} [{when}]", record.id)
        } else {
            format!("{} [{when}]", record.title)
        }
    }
}

fn or_now(value: Option<Timestamp>) -> Timestamp {
    match value {
        Some(ts) if ts != Timestamp::UNIX_EPOCH => ts,
        _ => Timestamp::now(),
    }
}

fn whole_seconds(clock: Time) -> Time {
    civil::time(clock.hour(), clock.minute(), clock.second(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::{SignedDuration, tz};

    use crate::model::{ArchiveId, RecordId};

    fn utc() -> Calendar {
        Calendar::new(TimeZone::UTC)
    }

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn day_start_drops_time_of_day() {
        let day = utc().day_start(Some(ts("2024-03-15T14:30:12Z"))).unwrap();
        assert_eq!(day, ts("2024-03-15T00:00:00Z"));
    }

    #[test]
    fn day_start_uses_local_day() {
        // 23:30 UTC is already the next day at UTC+2.
        let cal = Calendar::new(TimeZone::fixed(tz::offset(2)));
        let day = cal.day_start(Some(ts("2024-03-15T23:30:00Z"))).unwrap();
        assert_eq!(day, ts("2024-03-15T22:00:00Z"));
    }

    #[test]
    fn time_of_day_anchors_on_epoch_day() {
        let time = utc()
            .time_of_day(Some(ts("2024-03-15T14:30:12.750Z")))
            .unwrap();
        assert_eq!(time, ts("1970-01-01T14:30:12Z"));
    }

    #[test]
    fn absent_and_zero_mean_now() {
        let cal = utc();

        for value in [None, Some(Timestamp::UNIX_EPOCH)] {
            let before = Timestamp::now();
            let day = cal.day_start(value).unwrap();

            assert_eq!(cal.civil_time(day), Time::midnight());
            assert!(day <= Timestamp::now());
            assert!(before.duration_since(day) < SignedDuration::from_hours(24));
        }

        let time = cal.time_of_day(None).unwrap();
        assert_eq!(cal.civil_date(time), EPOCH_DAY);
    }

    #[test]
    fn reconcile_merges_edited_time_into_date() {
        let (date, time) = utc()
            .reconcile(ts("2024-03-15T14:30:00Z"), ts("1970-01-01T09:00:00Z"))
            .unwrap();

        assert_eq!(date, ts("2024-03-15T09:00:00Z"));
        assert_eq!(time, ts("1970-01-01T09:00:00Z"));
    }

    #[test]
    fn reconcile_outputs_share_time_of_day() {
        let cal = Calendar::new(TimeZone::fixed(tz::offset(-5)));
        let (date, time) = cal
            .reconcile(ts("2023-11-02T04:00:00Z"), ts("2001-06-30T17:45:09Z"))
            .unwrap();

        assert_eq!(cal.civil_time(date), cal.civil_time(time));
        assert_eq!(cal.civil_date(time), EPOCH_DAY);
        // 04:00Z is still Nov 1st at UTC-5.
        assert_eq!(cal.civil_date(date), civil::date(2023, 11, 1));
    }

    #[test]
    fn label_prefers_title_over_id() {
        let cal = utc();
        let mut record = Record {
            id: RecordId(7),
            archive_id: ArchiveId(1),
            title: "Welder".into(),
            date: ts("2024-03-15T09:00:00Z"),
            time: ts("1970-01-01T09:00:00Z"),
            published: true,
            last_modified: Timestamp::now(),
        };

        assert_eq!(cal.label(&record), "Welder [2024-03-15 09:00]");

        record.title.clear();
        assert_eq!(cal.label(&record), "7 [2024-03-15 09:00]");
    }
}
