pub mod dto;
pub mod employee_service;
pub mod hours_service;
pub mod shift_service;
pub mod swap_service;

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::auth::{Caller, Capability};
use crate::domain::errors::{Entity, ScheduleError, ScheduleResult};
use crate::domain::models::EmployeeId;
use crate::infrastructure::auth_context::AuthContext;
use crate::infrastructure::notifier::ChangeNotifier;
use crate::infrastructure::store::ScheduleStore;

/// Collaborators every service is built from.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn ScheduleStore>,
    pub auth: Arc<dyn AuthContext>,
    pub notifier: Arc<dyn ChangeNotifier>,
}

impl ServiceContext {
    pub fn new(store: Arc<dyn ScheduleStore>, auth: Arc<dyn AuthContext>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { store, auth, notifier }
    }

    pub(crate) async fn caller(&self) -> ScheduleResult<Caller> {
        self.auth.current_caller().await
    }

    /// The single capability check an operation performs before doing work.
    pub(crate) async fn authorize(&self, capability: Capability) -> ScheduleResult<Caller> {
        let caller = self.caller().await?;
        if let Err(e) = caller.require(capability) {
            tracing::warn!(employee_id = caller.employee_id, role = %caller.role, ?capability, "operation refused");
            return Err(e);
        }
        Ok(caller)
    }

    /// Only active employees may be given shifts, by a manager or by a swap.
    pub(crate) async fn ensure_active_employee(&self, employee_id: EmployeeId) -> ScheduleResult<()> {
        let store = &self.store;
        let employee = read_with_retry("get employee", move || store.get_employee(employee_id))
            .await?
            .ok_or(ScheduleError::NotFound {
                entity: Entity::Employee,
                id: employee_id,
            })?;

        if !employee.active {
            return Err(ScheduleError::validation(
                "employee_id",
                format!("employee {} is inactive", employee_id),
            ));
        }
        Ok(())
    }
}

/// Runs an idempotent read, retrying once on a transient store failure.
///
/// Writes must never go through here.
pub(crate) async fn read_with_retry<T, F, Fut>(operation: &'static str, mut read: F) -> ScheduleResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScheduleResult<T>>,
{
    match read().await {
        Err(e) if e.is_retryable_read() => {
            tracing::warn!(operation, error = %e, "read failed, retrying once");
            read().await
        }
        other => other,
    }
}

pub(crate) fn ensure_ordered_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ScheduleResult<()> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(ScheduleError::validation(
            "date_to",
            format!("{} is before {}", to, from),
        )),
        _ => Ok(()),
    }
}
