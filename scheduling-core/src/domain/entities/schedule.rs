use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use shared::{EmployeeId, StoreId};

use super::{
    AvailabilityRule, CoverageRequirement, Employee, RoleRequirement, Shift, TimeOffRequest,
};

/// Everything a solver needs to roster one store for one week.
///
/// Built once per solve and borrowed immutably by the solver. All entities
/// reference each other by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleContext {
    pub store_id: StoreId,
    /// Monday of the target week.
    pub week_start: NaiveDate,
    pub employees: Vec<Employee>,
    pub availability_rules: Vec<AvailabilityRule>,
    pub time_off_requests: Vec<TimeOffRequest>,
    pub coverage_requirements: Vec<CoverageRequirement>,
    pub role_requirements: Vec<RoleRequirement>,
    pub existing_shifts: Vec<Shift>,
}

impl ScheduleContext {
    /// Sunday of the schedule week.
    pub fn week_end(&self) -> NaiveDate {
        self.week_start + Duration::days(6)
    }

    /// Date of a weekday within the schedule week (Monday = 0).
    pub fn day_date(&self, day_of_week: u8) -> NaiveDate {
        self.week_start + Duration::days(day_of_week as i64)
    }

    pub fn employee_map(&self) -> HashMap<EmployeeId, &Employee> {
        self.employees.iter().map(|e| (e.id, e)).collect()
    }
}

/// Output of one solve: newly proposed shifts plus what could not be
/// satisfied. `existing_shifts` are never echoed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub success: bool,
    pub shifts: Vec<Shift>,
    pub unmet_coverage: Vec<CoverageRequirement>,
    pub unmet_role_requirements: Vec<RoleRequirement>,
    /// Hours short of contract, per employee.
    pub unmet_contracted_hours: HashMap<EmployeeId, f64>,
    pub warnings: Vec<String>,
}
