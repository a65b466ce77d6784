//! Swap Request State Machine
//!
//! Pure transition rules for shift-swap negotiations. Performing the swap
//! itself (reassigning shifts) is the workflow service's job; this module
//! only decides whether a caller may move a request and where it lands.
//!
//! Capabilities are checked once by the service before it gets here; this
//! module only adds who-owns-what rules on top.
//!
//! ```text
//!   Pending ──accept (partner)──> PartnerAccepted ──approve (manager)──> Approved
//!      │                               │
//!      └──reject (partner|manager)─────┴──reject (manager)─────────────> Rejected
//! ```
//!
//! Terminal states: Approved, Rejected (immutable).

use crate::domain::auth::{Caller, Capability};
use crate::domain::errors::{ScheduleError, ScheduleResult};
use crate::domain::swap_model::{SwapAction, SwapRequest, SwapStatus};

pub struct SwapStateMachine;

impl SwapStateMachine {
    /// Validates `action` by `caller` on `swap` and returns the next status.
    ///
    /// Terminal requests refuse everything with `InvalidTransition`. Otherwise
    /// ownership is checked before the source status, so a stranger gets
    /// `Forbidden` regardless of where the request stands. `Approve` assumes
    /// the caller already holds [`Capability::ApproveSwap`].
    pub fn transition(swap: &SwapRequest, action: SwapAction, caller: &Caller) -> ScheduleResult<SwapStatus> {
        use SwapStatus::*;

        let invalid = || ScheduleError::InvalidTransition {
            swap_id: swap.id,
            status: swap.status,
            action,
        };

        if swap.status.is_terminal() {
            return Err(invalid());
        }

        match action {
            SwapAction::Accept => {
                if caller.employee_id != swap.partner_id {
                    return Err(ScheduleError::forbidden("accept a swap addressed to someone else", caller.employee_id));
                }
                match swap.status {
                    Pending => Ok(PartnerAccepted),
                    _ => Err(invalid()),
                }
            }
            SwapAction::Reject => {
                if caller.can(Capability::ApproveSwap) {
                    // managers may turn down anything still open
                    return match swap.status {
                        Pending | PartnerAccepted => Ok(Rejected),
                        _ => Err(invalid()),
                    };
                }
                if caller.employee_id != swap.partner_id {
                    return Err(ScheduleError::forbidden("reject a swap addressed to someone else", caller.employee_id));
                }
                match swap.status {
                    Pending => Ok(Rejected),
                    _ => Err(invalid()),
                }
            }
            SwapAction::Approve => match swap.status {
                PartnerAccepted => Ok(Approved),
                _ => Err(invalid()),
            },
        }
    }
}
