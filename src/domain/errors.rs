use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::domain::swap_model::{SwapAction, SwapStatus};

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Record kinds that errors can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Employee,
    Shift,
    SwapRequest,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Employee => write!(f, "employee"),
            Entity::Shift => write!(f, "shift"),
            Entity::SwapRequest => write!(f, "swap request"),
        }
    }
}

/// Failures raised by a store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A persisted row that cannot be turned into a domain value.
    #[error("invalid {table} record {id}: {reason}")]
    InvalidRecord {
        table: &'static str,
        id: i64,
        reason: String,
    },
}

/// Every error the scheduling core surfaces to its caller.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("no authenticated caller")]
    Unauthenticated,

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("invalid time range: end {end} is not after start {start}")]
    InvalidRange { start: NaiveTime, end: NaiveTime },

    #[error("shift overlaps shift {existing_shift_id} of employee {employee_id} on {date}")]
    Conflict {
        employee_id: i64,
        date: NaiveDate,
        existing_shift_id: i64,
    },

    #[error("cannot {action} swap request {swap_id} while it is {status}")]
    InvalidTransition {
        swap_id: i64,
        status: SwapStatus,
        action: SwapAction,
    },

    #[error("employee {employee_id} is not allowed to {operation}")]
    Forbidden {
        operation: String,
        employee_id: i64,
    },

    #[error("{entity} {id} changed since the swap was requested ({reason}); reload and retry")]
    StaleReference {
        entity: Entity,
        id: i64,
        reason: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScheduleError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ScheduleError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn forbidden(operation: impl Into<String>, employee_id: i64) -> Self {
        ScheduleError::Forbidden {
            operation: operation.into(),
            employee_id,
        }
    }

    /// Only transport-level database failures are worth a second read.
    pub fn is_retryable_read(&self) -> bool {
        matches!(self, ScheduleError::Store(StoreError::Database(_)))
    }
}

impl From<sqlx::Error> for ScheduleError {
    fn from(e: sqlx::Error) -> Self {
        ScheduleError::Store(StoreError::Database(e))
    }
}

impl From<crate::domain::time::InvalidRange> for ScheduleError {
    fn from(e: crate::domain::time::InvalidRange) -> Self {
        ScheduleError::InvalidRange {
            start: e.start,
            end: e.end,
        }
    }
}
