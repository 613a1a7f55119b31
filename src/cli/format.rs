//! Output formatting for CLI display.

use crate::calendar::Calendar;
use crate::model::{Archive, Record, VersionSnapshot};

pub(super) fn format_archive(archive: &Archive) -> String {
    format!("{:>4}  {}", archive.id, archive.title)
}

/// One job line: id, visibility, label, and the toggle link when the
/// principal may use it.
pub(super) fn format_record(calendar: &Calendar, record: &Record, link: Option<&str>) -> String {
    let state = if record.published { "published" } else { "hidden" };
    let line = format!("#{:<5} [{state:<9}]  {}", record.id, calendar.label(record));
    match link {
        Some(link) => format!("{line}  ?{link}"),
        None => line,
    }
}

pub(super) fn format_snapshot(calendar: &Calendar, snapshot: &VersionSnapshot) -> String {
    let marker = if snapshot.changed { "*" } else { " " };
    let state = if snapshot.data.published { "published" } else { "hidden" };
    let short_digest = snapshot.digest.get(..8).unwrap_or(&snapshot.digest);
    format!(
        "r{:<3}{marker} {}  {:<12}  {state:<9}  {short_digest}  {}",
        snapshot.revision,
        snapshot.created_at.strftime("%Y-%m-%d %H:%M:%S"),
        snapshot.author,
        calendar.label(&snapshot.data),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::{Timestamp, tz::TimeZone};

    use crate::model::{ArchiveId, EntityKind, RecordId};

    fn record() -> Record {
        Record {
            id: RecordId(12),
            archive_id: ArchiveId(5),
            title: "Welder".into(),
            date: "2024-03-15T14:30:00Z".parse().unwrap(),
            time: "1970-01-01T14:30:00Z".parse().unwrap(),
            published: false,
            last_modified: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn record_line_shows_state_and_label() {
        let cal = Calendar::new(TimeZone::UTC);

        let line = format_record(&cal, &record(), None);

        assert_eq!(line, "#12    [hidden   ]  Welder [2024-03-15 14:30]");
    }

    #[test]
    fn record_line_appends_link() {
        let cal = Calendar::new(TimeZone::UTC);

        let line = format_record(&cal, &record(), Some("act=toggle&tid=12&state=1"));

        assert!(line.ends_with("  ?act=toggle&tid=12&state=1"));
    }

    #[test]
    fn snapshot_line_marks_changes() {
        let cal = Calendar::new(TimeZone::UTC);
        let snapshot = VersionSnapshot {
            entity_kind: EntityKind::Job,
            record_id: RecordId(12),
            revision: 3,
            author: "editor".into(),
            data: record(),
            digest: "0123456789abcdef".into(),
            changed: true,
            created_at: "2024-03-16T08:00:00Z".parse().unwrap(),
        };

        let line = format_snapshot(&cal, &snapshot);

        assert!(line.starts_with("r3  * 2024-03-16 08:00:00  editor"));
        assert!(line.contains("01234567"));
        assert!(line.ends_with("Welder [2024-03-15 14:30]"));
    }
}
