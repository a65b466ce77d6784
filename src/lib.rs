pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

use chrono_tz::Tz;

use application::employee_service::EmployeeService;
use application::hours_service::HoursService;
use application::shift_service::ShiftService;
use application::swap_service::SwapService;
use application::ServiceContext;
use infrastructure::auth_context::AuthContext;
use infrastructure::notifier::ChangeNotifier;
use infrastructure::store::ScheduleStore;

// Every service shares the same store, auth and notifier
pub struct AppServices {
    pub employees: EmployeeService,
    pub shifts: ShiftService,
    pub hours: HoursService,
    pub swaps: SwapService,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        auth: Arc<dyn AuthContext>,
        notifier: Arc<dyn ChangeNotifier>,
        timezone: Tz,
    ) -> Self {
        let ctx = ServiceContext::new(store, auth, notifier);
        Self {
            employees: EmployeeService::new(ctx.clone()),
            shifts: ShiftService::new(ctx.clone(), timezone),
            hours: HoursService::new(ctx.clone()),
            swaps: SwapService::new(ctx),
        }
    }
}
