//! In-memory cache of thread summaries, rebuilt wholesale on every sync.

use std::collections::HashMap;

use shared::{
    domain::{ThreadId, ThreadKind, ThreadStatus},
    protocol::ThreadSummary,
};

/// List filter. Status and type filters are mutually exclusive; `All`
/// clears both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadFilter {
    #[default]
    All,
    Status(ThreadStatus),
    Kind(ThreadKind),
}

impl ThreadFilter {
    pub fn matches(self, thread: &ThreadSummary) -> bool {
        match self {
            ThreadFilter::All => true,
            ThreadFilter::Status(status) => thread.status == status,
            ThreadFilter::Kind(kind) => thread.kind == kind,
        }
    }

    /// Query-string pair for the list endpoint, if any.
    pub fn query_pair(self) -> Option<(&'static str, &'static str)> {
        match self {
            ThreadFilter::All => None,
            ThreadFilter::Status(status) => Some(("status", status.label())),
            ThreadFilter::Kind(kind) => Some(("type", kind.label())),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "all" => Some(ThreadFilter::All),
            "active" => Some(ThreadFilter::Status(ThreadStatus::Active)),
            "resolved" => Some(ThreadFilter::Status(ThreadStatus::Resolved)),
            "closed" => Some(ThreadFilter::Status(ThreadStatus::Closed)),
            "assignment" => Some(ThreadFilter::Kind(ThreadKind::Assignment)),
            "invoice" => Some(ThreadFilter::Kind(ThreadKind::Invoice)),
            "general" => Some(ThreadFilter::Kind(ThreadKind::General)),
            "support" => Some(ThreadFilter::Kind(ThreadKind::Support)),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThreadFilter::All => "all",
            ThreadFilter::Status(status) => status.label(),
            ThreadFilter::Kind(kind) => kind.label(),
        }
    }
}

/// Authoritative client-side copy of the thread list. The whole set is
/// replaced in one swap per refresh; individual entries are only ever
/// touched for a confirmed status change or a delete.
#[derive(Debug, Default)]
pub struct ThreadStore {
    order: Vec<ThreadId>,
    threads: HashMap<ThreadId, ThreadSummary>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic swap of the full cached set, preserving server order.
    pub fn replace_all(&mut self, threads: Vec<ThreadSummary>) {
        self.order = threads.iter().map(|t| t.id).collect();
        self.threads = threads.into_iter().map(|t| (t.id, t)).collect();
    }

    pub fn get(&self, thread_id: ThreadId) -> Option<&ThreadSummary> {
        self.threads.get(&thread_id)
    }

    pub fn remove(&mut self, thread_id: ThreadId) -> Option<ThreadSummary> {
        self.order.retain(|id| *id != thread_id);
        self.threads.remove(&thread_id)
    }

    pub fn set_status(&mut self, thread_id: ThreadId, status: ThreadStatus) -> bool {
        match self.threads.get_mut(&thread_id) {
            Some(thread) => {
                thread.status = status;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThreadSummary> {
        self.order.iter().filter_map(|id| self.threads.get(id))
    }

    pub fn snapshot(&self) -> Vec<ThreadSummary> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn summary(kind: ThreadKind, status: ThreadStatus) -> ThreadSummary {
        ThreadSummary {
            id: ThreadId(Uuid::new_v4()),
            subject: "subject".into(),
            kind,
            status,
            participants: Vec::new(),
            unread_count: 0,
            last_message_preview: String::new(),
            assignment_code: None,
            created_by: "CS Rep".into(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn filter_matches_status_and_kind_predicates() {
        let active_support = summary(ThreadKind::Support, ThreadStatus::Active);
        let resolved_invoice = summary(ThreadKind::Invoice, ThreadStatus::Resolved);

        assert!(ThreadFilter::All.matches(&active_support));
        assert!(ThreadFilter::Status(ThreadStatus::Active).matches(&active_support));
        assert!(!ThreadFilter::Status(ThreadStatus::Active).matches(&resolved_invoice));
        assert!(ThreadFilter::Kind(ThreadKind::Invoice).matches(&resolved_invoice));
        assert!(!ThreadFilter::Kind(ThreadKind::Invoice).matches(&active_support));
    }

    #[test]
    fn filter_parse_covers_statuses_types_and_all() {
        assert_eq!(ThreadFilter::parse("all"), Some(ThreadFilter::All));
        assert_eq!(
            ThreadFilter::parse("resolved"),
            Some(ThreadFilter::Status(ThreadStatus::Resolved))
        );
        assert_eq!(
            ThreadFilter::parse("support"),
            Some(ThreadFilter::Kind(ThreadKind::Support))
        );
        assert_eq!(ThreadFilter::parse("nonsense"), None);
    }

    #[test]
    fn replace_all_swaps_the_full_set_and_keeps_order() {
        let mut store = ThreadStore::new();
        let first = summary(ThreadKind::General, ThreadStatus::Active);
        let second = summary(ThreadKind::Support, ThreadStatus::Active);
        store.replace_all(vec![first.clone(), second.clone()]);
        assert_eq!(store.len(), 2);

        let replacement = summary(ThreadKind::Invoice, ThreadStatus::Resolved);
        store.replace_all(vec![replacement.clone()]);
        let ids: Vec<_> = store.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![replacement.id]);
        assert!(store.get(first.id).is_none());
    }

    #[test]
    fn remove_drops_entry_and_order_slot() {
        let mut store = ThreadStore::new();
        let first = summary(ThreadKind::General, ThreadStatus::Active);
        let second = summary(ThreadKind::Support, ThreadStatus::Active);
        store.replace_all(vec![first.clone(), second.clone()]);

        assert!(store.remove(first.id).is_some());
        assert_eq!(store.len(), 1);
        assert_eq!(store.iter().next().map(|t| t.id), Some(second.id));
    }

    #[test]
    fn set_status_updates_cached_entry() {
        let mut store = ThreadStore::new();
        let thread = summary(ThreadKind::General, ThreadStatus::Active);
        store.replace_all(vec![thread.clone()]);

        assert!(store.set_status(thread.id, ThreadStatus::Resolved));
        assert_eq!(
            store.get(thread.id).map(|t| t.status),
            Some(ThreadStatus::Resolved)
        );
        assert!(!store.set_status(ThreadId(Uuid::new_v4()), ThreadStatus::Closed));
    }
}
