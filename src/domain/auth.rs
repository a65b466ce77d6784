//! Roles, capabilities and the caller identity handed to the core.
//!
//! Every public operation names the [`Capability`] it needs and checks it
//! once through [`Caller::require`]. The role table in [`Role::grants`] is
//! the only place that maps roles to what they may do.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{ScheduleError, ScheduleResult};
use crate::domain::models::EmployeeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Manager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Read one's own shifts and hours.
    ReadOwnSchedule,
    /// Read anyone's shifts and hours.
    ReadAnySchedule,
    /// Create, update and delete shifts directly.
    ManageShifts,
    /// Create and deactivate employees.
    ManageEmployees,
    /// List colleagues.
    ViewDirectory,
    ProposeSwap,
    /// Accept or reject a swap request.
    RespondToSwap,
    ApproveSwap,
    /// Per-employee hour reports.
    ViewReports,
}

impl Capability {
    pub fn describe(&self) -> &'static str {
        match self {
            Capability::ReadOwnSchedule => "read their own schedule",
            Capability::ReadAnySchedule => "read other employees' schedules",
            Capability::ManageShifts => "manage shifts",
            Capability::ManageEmployees => "manage employees",
            Capability::ViewDirectory => "view the employee directory",
            Capability::ProposeSwap => "propose shift swaps",
            Capability::RespondToSwap => "respond to shift swaps",
            Capability::ApproveSwap => "approve shift swaps",
            Capability::ViewReports => "view hour reports",
        }
    }
}

impl Role {
    pub fn grants(&self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            Role::Manager => true,
            Role::Employee => matches!(
                capability,
                ReadOwnSchedule | ViewDirectory | ProposeSwap | RespondToSwap
            ),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Employee => write!(f, "employee"),
            Role::Manager => write!(f, "manager"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "employee" => Ok(Role::Employee),
            "manager" => Ok(Role::Manager),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Who is calling, as reported by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub employee_id: EmployeeId,
    pub role: Role,
}

impl Caller {
    pub fn employee(employee_id: EmployeeId) -> Self {
        Self {
            employee_id,
            role: Role::Employee,
        }
    }

    pub fn manager(employee_id: EmployeeId) -> Self {
        Self {
            employee_id,
            role: Role::Manager,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.grants(capability)
    }

    pub fn require(&self, capability: Capability) -> ScheduleResult<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(ScheduleError::forbidden(capability.describe(), self.employee_id))
        }
    }

    /// Resolves which employee's schedule a read may cover.
    ///
    /// Managers get what they asked for (`None` = everyone). Employees are
    /// pinned to themselves and refused for anyone else.
    pub fn schedule_scope(&self, requested: Option<EmployeeId>) -> ScheduleResult<Option<EmployeeId>> {
        if self.can(Capability::ReadAnySchedule) {
            return Ok(requested);
        }
        self.require(Capability::ReadOwnSchedule)?;
        match requested {
            None => Ok(Some(self.employee_id)),
            Some(id) if id == self.employee_id => Ok(Some(id)),
            Some(_) => Err(ScheduleError::forbidden(
                Capability::ReadAnySchedule.describe(),
                self.employee_id,
            )),
        }
    }
}
