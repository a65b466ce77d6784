use crate::application::{read_with_retry, ServiceContext};
use crate::domain::auth::Capability;
use crate::domain::errors::{Entity, ScheduleError, ScheduleResult};
use crate::domain::models::{Employee, EmployeeId, NewEmployee};

pub struct EmployeeService {
    ctx: ServiceContext,
}

impl EmployeeService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, employee: NewEmployee) -> ScheduleResult<Employee> {
        let caller = self.ctx.authorize(Capability::ManageEmployees).await?;
        employee.validate()?;

        let created = self.ctx.store.insert_employee(&employee).await?;
        tracing::info!(employee_id = created.id, name = %created.name, by = caller.employee_id, "employee created");
        Ok(created)
    }

    /// Active employees ordered by name.
    pub async fn list_active(&self) -> ScheduleResult<Vec<Employee>> {
        self.ctx.authorize(Capability::ViewDirectory).await?;
        let store = &self.ctx.store;
        read_with_retry("list employees", move || store.list_employees(true)).await
    }

    pub async fn get(&self, id: EmployeeId) -> ScheduleResult<Employee> {
        self.ctx.authorize(Capability::ViewDirectory).await?;
        let store = &self.ctx.store;
        read_with_retry("get employee", move || store.get_employee(id))
            .await?
            .ok_or(ScheduleError::NotFound { entity: Entity::Employee, id })
    }

    /// Marks the employee inactive. Their past shifts stay untouched.
    pub async fn deactivate(&self, id: EmployeeId) -> ScheduleResult<Employee> {
        let caller = self.ctx.authorize(Capability::ManageEmployees).await?;

        let employee = self.ctx.store.set_employee_active(id, false).await?;
        tracing::info!(employee_id = id, by = caller.employee_id, "employee deactivated");
        Ok(employee)
    }
}
