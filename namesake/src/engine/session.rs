//! The aggregated result set of one search and its display cursor.

use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{PaginationToken, ResultRecord};

/// Records gathered for one subject across fetched pages.
///
/// Records are only ever appended, in arrival order. A record whose
/// `subject_id` was already seen, or equals the excluded id, is dropped.
/// Records without a `subject_id` are always kept.
#[derive(Debug, Clone)]
pub struct AggregatedSession {
    id: Uuid,
    subject: String,
    exclude_id: Option<String>,
    records: Vec<ResultRecord>,
    seen: HashSet<String>,
    token: Option<PaginationToken>,
    current_page: usize,
    page_size: usize,
}

impl AggregatedSession {
    /// Creates an empty session. A zero `page_size` is treated as one.
    #[must_use]
    pub fn new(subject: impl Into<String>, exclude_id: Option<String>, page_size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            exclude_id,
            records: Vec::new(),
            seen: HashSet::new(),
            token: None,
            current_page: 0,
            page_size: page_size.max(1),
        }
    }

    /// Unique id of this session.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Subject the session was started for.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Profile id filtered out of the results.
    #[must_use]
    pub fn exclude_id(&self) -> Option<&str> {
        self.exclude_id.as_deref()
    }

    /// Appends `incoming` after exclusion and deduplication. Returns how many
    /// records were kept.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = ResultRecord>) -> usize {
        let before = self.records.len();
        for record in incoming {
            if let Some(id) = record.subject_id.as_deref() {
                if self.exclude_id.as_deref() == Some(id) || !self.seen.insert(id.to_string()) {
                    continue;
                }
            }
            self.records.push(record);
        }
        self.records.len() - before
    }

    /// All records, in session order.
    #[must_use]
    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the session holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The continuation token, absent once results are exhausted.
    #[must_use]
    pub fn token(&self) -> Option<&PaginationToken> {
        self.token.as_ref()
    }

    /// Replaces the continuation token.
    pub fn set_token(&mut self, token: Option<PaginationToken>) {
        self.token = token;
    }

    /// Whether another page can be fetched.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.token.is_some()
    }

    /// Records per display page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Zero-based index of the displayed page.
    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Number of display pages; zero when the session is empty.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.records.len().div_ceil(self.page_size)
    }

    /// Records on display page `n`; empty past the end.
    #[must_use]
    pub fn page(&self, n: usize) -> &[ResultRecord] {
        let start = n.saturating_mul(self.page_size).min(self.records.len());
        let end = start.saturating_add(self.page_size).min(self.records.len());
        &self.records[start..end]
    }

    /// Records on the displayed page.
    #[must_use]
    pub fn current_page_records(&self) -> &[ResultRecord] {
        self.page(self.current_page)
    }

    /// Moves to the next display page if there is one.
    pub fn next_page(&mut self) -> bool {
        if self.current_page + 1 < self.total_pages() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    /// Moves to the previous display page if there is one.
    pub fn prev_page(&mut self) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Jumps to display page `n`, clamped to the last page.
    pub fn go_to_page(&mut self, n: usize) {
        self.current_page = n.min(self.total_pages().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: &str) -> ResultRecord {
        ResultRecord::new(format!("Author {id}"), format!("https://x/citations?user={id}"))
    }

    fn ids(session: &AggregatedSession) -> Vec<String> {
        session
            .records()
            .iter()
            .map(|r| r.subject_id.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_merge_dedups_and_keeps_order() {
        let mut session = AggregatedSession::new("ada", None, 10);
        assert_eq!(session.merge(vec![record("a"), record("b")]), 2);
        assert_eq!(session.merge(vec![record("b"), record("c"), record("a")]), 1);
        assert_eq!(ids(&session), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_excludes_own_profile() {
        let mut session = AggregatedSession::new("ada", Some("me".to_string()), 10);
        session.merge(vec![record("x"), record("me"), record("y")]);
        assert_eq!(ids(&session), vec!["x", "y"]);
        assert_eq!(session.exclude_id(), Some("me"));
    }

    #[test]
    fn test_records_without_id_are_never_deduplicated() {
        let mut session = AggregatedSession::new("ada", Some("me".to_string()), 10);
        let anonymous = ResultRecord::new("Anon", "https://x/profile");
        assert_eq!(session.merge(vec![anonymous.clone(), anonymous]), 2);
    }

    #[test]
    fn test_display_pages() {
        let mut session = AggregatedSession::new("ada", None, 2);
        session.merge((0..5).map(|i| record(&i.to_string())));

        assert_eq!(session.total_pages(), 3);
        assert_eq!(session.current_page_records().len(), 2);
        assert_eq!(session.page(2).len(), 1);
        assert!(session.page(9).is_empty());

        assert!(session.next_page());
        assert!(session.next_page());
        assert!(!session.next_page());
        assert_eq!(session.current_page(), 2);
        assert_eq!(session.current_page_records()[0].subject_id.as_deref(), Some("4"));

        assert!(session.prev_page());
        session.go_to_page(99);
        assert_eq!(session.current_page(), 2);
        session.go_to_page(0);
        assert!(!session.prev_page());
    }

    #[test]
    fn test_empty_session_pages() {
        let mut session = AggregatedSession::new("ada", None, 0);
        assert_eq!(session.page_size(), 1);
        assert_eq!(session.total_pages(), 0);
        assert!(session.current_page_records().is_empty());
        assert!(!session.next_page());
        session.go_to_page(3);
        assert_eq!(session.current_page(), 0);
    }

    #[test]
    fn test_token_drives_has_more() {
        let mut session = AggregatedSession::new("ada", None, 10);
        assert!(!session.has_more());
        session.set_token(Some(PaginationToken::Start(10)));
        assert!(session.has_more());
        assert_eq!(session.token(), Some(&PaginationToken::Start(10)));
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        let a = AggregatedSession::new("ada", None, 10);
        let b = AggregatedSession::new("ada", None, 10);
        assert_ne!(a.id(), b.id());
    }
}
