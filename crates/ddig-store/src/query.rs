use ddig_core::Record;

/// Default cap for admin listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Filter, ordering and cap applied to a category listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Case-insensitive match against a registration's event name.
    pub event: Option<String>,
    pub order: Order,
    pub limit: Option<usize>,
    /// Drop unsubscribed newsletter entries.
    pub active_only: bool,
}

impl ListQuery {
    /// Newest first, capped at [`DEFAULT_LIST_LIMIT`].
    pub fn recent() -> Self {
        Self {
            limit: Some(DEFAULT_LIST_LIMIT),
            ..Self::default()
        }
    }

    /// Every registration for one event, newest first.
    pub fn for_event(name: impl Into<String>) -> Self {
        Self {
            event: Some(name.into()),
            ..Self::default()
        }
    }

    /// Everything still active, oldest first.
    pub fn export() -> Self {
        Self {
            order: Order::OldestFirst,
            active_only: true,
            ..Self::default()
        }
    }

    /// Apply the query to records given in append order.
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        let mut out: Vec<Record> = records
            .into_iter()
            .filter(|r| !self.active_only || r.is_active())
            .filter(|r| match &self.event {
                Some(event) => r
                    .event_name()
                    .is_some_and(|name| name.trim().eq_ignore_ascii_case(event.trim())),
                None => true,
            })
            .collect();
        if self.order == Order::NewestFirst {
            out.reverse();
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

/// Identifier returned by an append: the natural id, or `#<n>` for
/// categories without one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn natural(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 1-based position within the category.
    pub fn positional(n: usize) -> Self {
        Self(format!("#{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
