use async_trait::async_trait;

use crate::domain::auth::Caller;
use crate::domain::errors::{ScheduleError, ScheduleResult};

/// Source of the caller identity for the current request.
///
/// Token verification happens outside the core; implementations only report
/// who was verified.
#[async_trait]
pub trait AuthContext: Send + Sync {
    async fn current_caller(&self) -> ScheduleResult<Caller>;
}

/// A fixed identity, or none at all (`StaticAuth::default()`).
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAuth {
    caller: Option<Caller>,
}

impl From<Option<Caller>> for StaticAuth {
    fn from(caller: Option<Caller>) -> Self {
        Self { caller }
    }
}

#[async_trait]
impl AuthContext for StaticAuth {
    async fn current_caller(&self) -> ScheduleResult<Caller> {
        self.caller.ok_or(ScheduleError::Unauthenticated)
    }
}
