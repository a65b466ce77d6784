use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::models::EmployeeId;

/// Published after a mutation has been committed.
///
/// `scope` names the employee whose view changed; `None` means "anyone".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    ShiftsChanged { scope: Option<EmployeeId> },
    SwapsChanged { scope: Option<EmployeeId> },
}

/// Best-effort sink for change events.
///
/// Calls must not block or fail the operation that triggered them; consumers
/// re-fetch on every event and must cope with missed or repeated ones.
pub trait ChangeNotifier: Send + Sync {
    fn notify_shifts_changed(&self, scope: Option<EmployeeId>);
    fn notify_swaps_changed(&self, scope: Option<EmployeeId>);
}

/// Fans events out over a tokio broadcast channel.
///
/// Slow receivers lose the oldest events (`RecvError::Lagged`) and should
/// simply refresh.
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    fn publish(&self, event: ChangeEvent) {
        // no subscribers is not an error
        let _ = self.sender.send(event);
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn notify_shifts_changed(&self, scope: Option<EmployeeId>) {
        self.publish(ChangeEvent::ShiftsChanged { scope });
    }

    fn notify_swaps_changed(&self, scope: Option<EmployeeId>) {
        self.publish(ChangeEvent::SwapsChanged { scope });
    }
}

/// Writes every event to the log; used by the CLI where nobody listens.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl ChangeNotifier for TracingNotifier {
    fn notify_shifts_changed(&self, scope: Option<EmployeeId>) {
        tracing::debug!(scope = ?scope, "shifts changed");
    }

    fn notify_swaps_changed(&self, scope: Option<EmployeeId>) {
        tracing::debug!(scope = ?scope, "swaps changed");
    }
}
