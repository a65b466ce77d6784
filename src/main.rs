use std::process::ExitCode;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use shift_desk::config::{AppConfig, ConfigError};
use shift_desk::domain::errors::ScheduleError;
use shift_desk::domain::models::{EmployeeId, NewEmployee, NewShift, ShiftId, SwapId, WorkingHours};
use shift_desk::domain::time::YearMonth;
use shift_desk::infrastructure::auth_context::StaticAuth;
use shift_desk::infrastructure::notifier::TracingNotifier;
use shift_desk::infrastructure::sqlite_store::SqliteStore;
use shift_desk::infrastructure::store::ShiftFilter;
use shift_desk::AppServices;

#[derive(Parser)]
#[command(name = "shift-desk")]
#[command(version)]
#[command(about = "Manage employee shifts, worked hours and shift swaps", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates the database if needed and applies migrations
    Migrate,
    #[command(subcommand)]
    Employee(EmployeeCommand),
    #[command(subcommand)]
    Shift(ShiftCommand),
    #[command(subcommand)]
    Hours(HoursCommand),
    #[command(subcommand)]
    Swap(SwapCommand),
    /// Today's shifts in the configured zone (everyone's for managers)
    Today,
}

#[derive(Subcommand)]
enum EmployeeCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        role_label: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long, default_value_t = 40)]
        weekly_hours: u32,
    },
    List,
    Deactivate { id: EmployeeId },
}

#[derive(Subcommand)]
enum ShiftCommand {
    Add {
        #[arg(long)]
        employee: EmployeeId,
        #[arg(long)]
        date: NaiveDate,
        /// HH:MM, omit together with --end for a day off
        #[arg(long, requires = "end", conflicts_with = "off")]
        start: Option<NaiveTime>,
        #[arg(long, requires = "start")]
        end: Option<NaiveTime>,
        #[arg(long, default_value_t = 0)]
        break_minutes: u32,
        #[arg(long)]
        break_paid: bool,
        #[arg(long)]
        off: bool,
        #[arg(long)]
        note: Option<String>,
    },
    List {
        #[arg(long)]
        employee: Option<EmployeeId>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    Delete { id: ShiftId },
    /// Everyone working on a date (defaults to today)
    Roster {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum HoursCommand {
    Month {
        #[arg(long)]
        employee: EmployeeId,
        /// YYYY-MM, defaults to the current month
        #[arg(long)]
        month: Option<YearMonth>,
    },
    Range {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
}

#[derive(Subcommand)]
enum SwapCommand {
    Propose {
        /// Your shift
        #[arg(long)]
        from_shift: ShiftId,
        /// The colleague's shift you want instead
        #[arg(long)]
        to_shift: ShiftId,
        #[arg(long)]
        note: Option<String>,
    },
    Accept { id: SwapId },
    Reject { id: SwapId },
    Approve { id: SwapId },
    List,
    /// Requests waiting for a manager
    Pending,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config;
    let timezone = config.timezone()?;
    let store = SqliteStore::open(&config.database_url, config.max_connections()?).await?;

    if let Commands::Migrate = cli.command {
        println!("database ready at {}", config.database_url);
        return Ok(());
    }

    // every remaining command acts on someone's behalf
    let auth = StaticAuth::from(Some(config.require_caller()?));
    let services = AppServices::new(Arc::new(store), Arc::new(auth), Arc::new(TracingNotifier), timezone);

    match cli.command {
        Commands::Migrate => {}
        Commands::Employee(cmd) => match cmd {
            EmployeeCommand::Add {
                name,
                role_label,
                department,
                weekly_hours,
            } => {
                let employee = NewEmployee {
                    name,
                    role_label,
                    department,
                    weekly_hours,
                };
                print_json(&services.employees.create(employee).await?)?;
            }
            EmployeeCommand::List => print_json(&services.employees.list_active().await?)?,
            EmployeeCommand::Deactivate { id } => {
                services.employees.deactivate(id).await?;
                println!("employee {} deactivated", id);
            }
        },
        Commands::Shift(cmd) => match cmd {
            ShiftCommand::Add {
                employee,
                date,
                start,
                end,
                break_minutes,
                break_paid,
                off,
                note,
            } => {
                let shift = match (start, end) {
                    (Some(start), Some(end)) => NewShift::working(
                        employee,
                        date,
                        WorkingHours::new(start, end).with_break(break_minutes, break_paid),
                    ),
                    _ if off => NewShift::off(employee, date),
                    _ => return Err(CliError::Usage("pass --start and --end, or --off".to_string())),
                };
                let shift = NewShift { note, ..shift };
                print_json(&services.shifts.create(shift).await?)?;
            }
            ShiftCommand::List { employee, from, to } => {
                let filter = ShiftFilter {
                    employee_id: employee,
                    date_from: from,
                    date_to: to,
                };
                print_json(&services.shifts.list(filter).await?)?;
            }
            ShiftCommand::Delete { id } => {
                services.shifts.delete(id).await?;
                println!("shift {} deleted", id);
            }
            ShiftCommand::Roster { date: Some(date) } => print_json(&services.shifts.roster(date).await?)?,
            ShiftCommand::Roster { date: None } => print_json(&services.shifts.today_roster().await?)?,
        },
        Commands::Hours(cmd) => match cmd {
            HoursCommand::Month { employee, month } => {
                let month = month.unwrap_or_else(|| YearMonth::of(services.shifts.today()));
                print_json(&services.hours.monthly_hours(employee, month).await?)?;
            }
            HoursCommand::Range { from, to } => {
                print_json(&services.hours.hours_by_employee(from, to).await?)?;
            }
        },
        Commands::Swap(cmd) => match cmd {
            SwapCommand::Propose { from_shift, to_shift, note } => {
                print_json(&services.swaps.propose(from_shift, to_shift, note).await?)?;
            }
            SwapCommand::Accept { id } => print_json(&services.swaps.accept(id).await?)?,
            SwapCommand::Reject { id } => print_json(&services.swaps.reject(id).await?)?,
            SwapCommand::Approve { id } => print_json(&services.swaps.approve(id).await?)?,
            SwapCommand::List => print_json(&services.swaps.list_mine().await?)?,
            SwapCommand::Pending => print_json(&services.swaps.list_awaiting_approval().await?)?,
        },
        Commands::Today => {
            let today = ShiftFilter::default().on(services.shifts.today());
            print_json(&services.shifts.list(today).await?)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
