//! Runtime configuration.
//!
//! Every setting can come from a flag or from a `SHIFT_DESK_*` environment
//! variable; flags win.

use chrono_tz::Tz;
use clap::Args;
use thiserror::Error;

use crate::domain::auth::{Caller, Role};
use crate::domain::models::EmployeeId;

mod defaults {
    pub const DATABASE_URL: &str = "sqlite://shift-desk.db";
    pub const TIMEZONE: &str = "Europe/Rome";
    pub const MAX_CONNECTIONS: u32 = 5;
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("missing configuration {key}: {hint}")]
    MissingRequired { key: &'static str, hint: &'static str },
}

#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    /// SQLite connection URL
    #[arg(long, env = "SHIFT_DESK_DATABASE_URL", default_value = defaults::DATABASE_URL, global = true)]
    pub database_url: String,

    /// IANA zone used to decide what "today" is
    #[arg(long, env = "SHIFT_DESK_TIMEZONE", default_value = defaults::TIMEZONE, global = true)]
    pub timezone: String,

    #[arg(long, env = "SHIFT_DESK_MAX_CONNECTIONS", default_value_t = defaults::MAX_CONNECTIONS, global = true)]
    pub max_connections: u32,

    /// Employee id the commands run as
    #[arg(long = "as-employee", env = "SHIFT_DESK_EMPLOYEE_ID", global = true)]
    pub employee_id: Option<EmployeeId>,

    /// Role of that employee (employee | manager)
    #[arg(long, env = "SHIFT_DESK_ROLE", default_value = "employee", global = true)]
    pub role: String,
}

impl AppConfig {
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone.parse::<Tz>().map_err(|e| ConfigError::InvalidValue {
            key: "SHIFT_DESK_TIMEZONE",
            value: self.timezone.clone(),
            reason: e.to_string(),
        })
    }

    pub fn max_connections(&self) -> Result<u32, ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SHIFT_DESK_MAX_CONNECTIONS",
                value: self.max_connections.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self.max_connections)
    }

    /// The configured identity, or `None` when no employee id was given.
    pub fn caller(&self) -> Result<Option<Caller>, ConfigError> {
        let role = self.role.parse::<Role>().map_err(|reason| ConfigError::InvalidValue {
            key: "SHIFT_DESK_ROLE",
            value: self.role.clone(),
            reason,
        })?;
        Ok(self.employee_id.map(|employee_id| Caller { employee_id, role }))
    }

    /// Like [`AppConfig::caller`], for commands that cannot run anonymously.
    pub fn require_caller(&self) -> Result<Caller, ConfigError> {
        self.caller()?.ok_or(ConfigError::MissingRequired {
            key: "SHIFT_DESK_EMPLOYEE_ID",
            hint: "pass --as-employee <ID>",
        })
    }
}
