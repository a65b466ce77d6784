pub mod auth_context;
pub mod memory_store;
pub mod notifier;
pub mod sqlite_store;
pub mod store;

use chrono::{DateTime, SubsecRound, Utc};

/// Record timestamps are kept at whole seconds so their text form sorts correctly.
pub(crate) fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
