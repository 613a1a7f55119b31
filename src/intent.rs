//! Toggle intents carried in URL query parameters.
//!
//! A listing renders one toggle link per job, carrying the job id in `tid`
//! and the state to switch to in `state` (`1` to publish, empty to
//! unpublish). Following a link twice has the same effect as following it
//! once.

use url::form_urlencoded;

use crate::model::{Record, RecordId};

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("invalid job item ID \"{0}\"")]
    InvalidId(String),
}

/// A request to set one job's published flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleIntent {
    pub id: RecordId,
    pub publish: bool,
}

impl ToggleIntent {
    /// Reads an intent from a query string, with or without a leading `?`.
    ///
    /// Returns `None` when the query carries no `tid`.
    pub fn from_query(query: &str) -> Result<Option<Self>, IntentError> {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut tid = None;
        let mut state = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "tid" => tid = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                _ => {}
            }
        }

        let Some(tid) = tid.filter(|tid| !tid.is_empty()) else {
            return Ok(None);
        };
        let id = tid
            .parse()
            .map(RecordId)
            .map_err(|_| IntentError::InvalidId(tid.clone()))?;

        Ok(Some(Self {
            id,
            publish: state.as_deref() == Some("1"),
        }))
    }
}

/// The query string of the link that flips `record`'s published flag.
pub fn toggle_href(record: &Record) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("act", "toggle")
        .append_pair("tid", &record.id.to_string())
        .append_pair("state", if record.published { "" } else { "1" })
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;

    use crate::model::ArchiveId;

    fn record(published: bool) -> Record {
        Record {
            id: RecordId(12),
            archive_id: ArchiveId(1),
            title: "Welder".into(),
            date: Timestamp::UNIX_EPOCH,
            time: Timestamp::UNIX_EPOCH,
            published,
            last_modified: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn reads_tid_and_state() {
        let intent = ToggleIntent::from_query("?do=job&tid=12&state=1").unwrap();

        assert_eq!(
            intent,
            Some(ToggleIntent {
                id: RecordId(12),
                publish: true
            })
        );
    }

    #[test]
    fn anything_but_one_unpublishes() {
        for query in ["tid=3&state=", "tid=3", "tid=3&state=0", "tid=3&state=true"] {
            let intent = ToggleIntent::from_query(query).unwrap().unwrap();
            assert!(!intent.publish, "{query}");
        }
    }

    #[test]
    fn no_tid_means_no_intent() {
        assert_eq!(ToggleIntent::from_query("act=edit&id=4").unwrap(), None);
        assert_eq!(ToggleIntent::from_query("tid=&state=1").unwrap(), None);
        assert_eq!(ToggleIntent::from_query("").unwrap(), None);
    }

    #[test]
    fn non_numeric_tid_is_rejected() {
        let err = ToggleIntent::from_query("tid=12abc&state=1").unwrap_err();
        assert!(matches!(err, IntentError::InvalidId(ref tid) if tid == "12abc"));
    }

    #[test]
    fn href_carries_inverted_state() {
        assert_eq!(toggle_href(&record(false)), "act=toggle&tid=12&state=1");
        assert_eq!(toggle_href(&record(true)), "act=toggle&tid=12&state=");
    }

    #[test]
    fn href_round_trips_into_an_intent() {
        let intent = ToggleIntent::from_query(&toggle_href(&record(true)))
            .unwrap()
            .unwrap();

        assert_eq!(intent.id, RecordId(12));
        assert!(!intent.publish);
    }
}
