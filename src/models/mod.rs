pub mod item;

// Re-exports for convenience
pub use item::*;

/// Result of a single poll of the alliance page.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// No identifier could be read after all retries.
    Missing,
    /// The page still shows the known identifier.
    Unchanged(ItemIdentifier),
    /// The identifier differs from the known one. `record` is `None` when the
    /// detail page could not be fetched.
    Changed {
        previous: Option<ItemIdentifier>,
        current: ItemIdentifier,
        record: Option<ItemRecord>,
    },
}

impl CheckOutcome {
    pub fn is_change(&self) -> bool {
        matches!(self, CheckOutcome::Changed { .. })
    }
}

/// Why the main loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// An interrupt was received.
    Stopped,
    /// Re-authentication failed after a network error.
    NetworkFailure,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorState {
    pub current_identifier: Option<ItemIdentifier>,
    pub check_count: u64,
}
