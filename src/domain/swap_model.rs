use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::{EmployeeId, ShiftId, SwapId};

/// Where a swap request is in its negotiation.
///
/// This is the only source of truth; the `partner_accepted` and
/// `manager_approved` flags found in storage are projections of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    PartnerAccepted,
    Approved,
    Rejected,
}

impl SwapStatus {
    pub fn partner_accepted(&self) -> bool {
        matches!(self, SwapStatus::PartnerAccepted | SwapStatus::Approved)
    }

    pub fn manager_approved(&self) -> bool {
        matches!(self, SwapStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SwapStatus::Approved | SwapStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::PartnerAccepted => "partner_accepted",
            SwapStatus::Approved => "approved",
            SwapStatus::Rejected => "rejected",
        }
    }

    /// Rebuilds a status from its stored form, refusing flags that disagree.
    ///
    /// A rejected request may carry `partner_accepted = true` (the manager
    /// turned down an accepted request), so that combination is allowed.
    pub fn from_stored(status: &str, partner_accepted: bool, manager_approved: bool) -> Result<Self, String> {
        let parsed: SwapStatus = status.parse()?;
        let consistent = match parsed {
            SwapStatus::Rejected => !manager_approved,
            other => other.partner_accepted() == partner_accepted && other.manager_approved() == manager_approved,
        };
        if consistent {
            Ok(parsed)
        } else {
            Err(format!(
                "status '{}' disagrees with partner_accepted={} manager_approved={}",
                status, partner_accepted, manager_approved
            ))
        }
    }
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SwapStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SwapStatus::Pending),
            "partner_accepted" => Ok(SwapStatus::PartnerAccepted),
            "approved" => Ok(SwapStatus::Approved),
            "rejected" => Ok(SwapStatus::Rejected),
            _ => Err(format!("Invalid swap status: {}", s)),
        }
    }
}

/// Moves a caller can attempt on a swap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapAction {
    Accept,
    Reject,
    Approve,
}

impl std::fmt::Display for SwapAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapAction::Accept => write!(f, "accept"),
            SwapAction::Reject => write!(f, "reject"),
            SwapAction::Approve => write!(f, "approve"),
        }
    }
}

/// A negotiation over two shifts. Holds shift ids only, never their times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub id: SwapId,
    pub from_shift_id: ShiftId,
    pub to_shift_id: ShiftId,
    pub requester_id: EmployeeId,
    pub partner_id: EmployeeId,
    pub note: Option<String>,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SwapRequest {
    pub fn partner_accepted(&self) -> bool {
        self.status.partner_accepted()
    }

    pub fn manager_approved(&self) -> bool {
        self.status.manager_approved()
    }

    pub fn involves(&self, employee_id: EmployeeId) -> bool {
        self.requester_id == employee_id || self.partner_id == employee_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSwapRequest {
    pub from_shift_id: ShiftId,
    pub to_shift_id: ShiftId,
    pub requester_id: EmployeeId,
    pub partner_id: EmployeeId,
    pub note: Option<String>,
}
