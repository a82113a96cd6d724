//! Post-hoc schedule validation.
//!
//! Samples every coverage and role requirement window at a 30-minute
//! cadence and reports the requirements with at least one unmet sample,
//! plus per-employee contracted-hour shortfalls. Both solvers report their
//! unmet collections through this module so they stay interchangeable.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use shared::{DepartmentId, EmployeeId};

use super::entities::{
    CoverageRequirement, Employee, RoleRequirement, ScheduleContext, ScheduleResult, Shift,
};

/// Sampling cadence within requirement windows.
const SAMPLE_INTERVAL_MINUTES: i64 = 30;

/// Outcome of validating one shift set against a context.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Coverage requirements with gaps, plus the sample instants that failed.
    pub coverage_gaps: Vec<(CoverageRequirement, Vec<NaiveDateTime>)>,
    /// Role requirements with gaps, plus the sample instants that failed.
    pub role_gaps: Vec<(RoleRequirement, Vec<NaiveDateTime>)>,
    /// Hours short of contract, per employee.
    pub hour_shortfalls: HashMap<EmployeeId, f64>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.coverage_gaps.is_empty()
            && self.role_gaps.is_empty()
            && self.hour_shortfalls.is_empty()
    }

    /// Assemble a `ScheduleResult` from this report and the newly produced
    /// shifts. Warnings summarise counts per unmet category, appended after
    /// any solver-specific warnings.
    pub fn into_result(self, new_shifts: Vec<Shift>, mut warnings: Vec<String>) -> ScheduleResult {
        if !self.coverage_gaps.is_empty() {
            warnings.push(format!(
                "{} coverage requirements not fully met",
                self.coverage_gaps.len()
            ));
        }
        if !self.role_gaps.is_empty() {
            warnings.push(format!(
                "{} role requirements not fully met",
                self.role_gaps.len()
            ));
        }
        if !self.hour_shortfalls.is_empty() {
            warnings.push(format!(
                "{} employees under contracted hours",
                self.hour_shortfalls.len()
            ));
        }

        let success = self.is_valid();
        ScheduleResult {
            success,
            shifts: new_shifts,
            unmet_coverage: self.coverage_gaps.into_iter().map(|(req, _)| req).collect(),
            unmet_role_requirements: self.role_gaps.into_iter().map(|(req, _)| req).collect(),
            unmet_contracted_hours: self.hour_shortfalls,
            warnings,
        }
    }
}

/// Shifts active at an instant, optionally filtered by department.
pub fn shifts_covering_instant<'a>(
    shifts: &'a [Shift],
    t: NaiveDateTime,
    department_id: Option<DepartmentId>,
) -> Vec<&'a Shift> {
    shifts
        .iter()
        .filter(|shift| shift.covers(t))
        .filter(|shift| department_id.map_or(true, |dept| shift.department_id == dept))
        .collect()
}

fn coverage_met_at(shifts: &[Shift], requirement: &CoverageRequirement, t: NaiveDateTime) -> bool {
    let covering = shifts_covering_instant(shifts, t, Some(requirement.department_id));
    covering.len() as u32 >= requirement.min_staff
}

/// Sample one coverage window; returns the failing instants.
pub fn coverage_gaps_for_window(
    shifts: &[Shift],
    requirement: &CoverageRequirement,
    context: &ScheduleContext,
) -> Vec<NaiveDateTime> {
    let date = context.day_date(requirement.day_of_week);
    let window_start = date.and_time(requirement.start_time);
    let window_end = date.and_time(requirement.end_time);

    let mut gaps = Vec::new();
    let mut current = window_start;
    while current < window_end {
        if !coverage_met_at(shifts, requirement, current) {
            gaps.push(current);
        }
        current += Duration::minutes(SAMPLE_INTERVAL_MINUTES);
    }
    gaps
}

/// Whether a role requirement is satisfied at one instant.
pub fn role_met_at(
    shifts: &[Shift],
    employee_map: &HashMap<EmployeeId, &Employee>,
    requirement: &RoleRequirement,
    t: NaiveDateTime,
) -> bool {
    let active = shifts_covering_instant(shifts, t, requirement.department_id);
    let active_employees: Vec<&Employee> = active
        .iter()
        .filter_map(|shift| employee_map.get(&shift.employee_id).copied())
        .collect();

    if requirement.requires_keyholder && !active_employees.iter().any(|e| e.is_keyholder) {
        return false;
    }

    if requirement.requires_manager {
        let manager_count = active_employees.iter().filter(|e| e.is_manager).count() as u32;
        if manager_count < requirement.min_manager_count {
            return false;
        }
    }

    true
}

/// Sample one role window across its applicable days; returns the failing
/// instants.
pub fn role_gaps_for_window(
    shifts: &[Shift],
    employee_map: &HashMap<EmployeeId, &Employee>,
    requirement: &RoleRequirement,
    context: &ScheduleContext,
) -> Vec<NaiveDateTime> {
    let mut gaps = Vec::new();

    for day in requirement.applicable_days() {
        let date = context.day_date(day);
        let window_start = date.and_time(requirement.start_time);
        let window_end = date.and_time(requirement.end_time);

        let mut current = window_start;
        while current < window_end {
            if !role_met_at(shifts, employee_map, requirement, current) {
                gaps.push(current);
            }
            current += Duration::minutes(SAMPLE_INTERVAL_MINUTES);
        }
    }

    gaps
}

/// Total hours assigned to an employee across a shift set.
pub fn employee_hours(shifts: &[Shift], employee_id: EmployeeId) -> f64 {
    shifts
        .iter()
        .filter(|s| s.employee_id == employee_id)
        .map(|s| s.duration_hours())
        .sum()
}

/// Positive contracted-hour shortfalls for all employees.
pub fn contracted_hour_shortfalls(
    shifts: &[Shift],
    employees: &[Employee],
) -> HashMap<EmployeeId, f64> {
    let mut shortfalls = HashMap::new();
    for emp in employees {
        let assigned = employee_hours(shifts, emp.id);
        let shortfall = emp.contracted_weekly_hours as f64 - assigned;
        if shortfall > 0.0 {
            shortfalls.insert(emp.id, shortfall);
        }
    }
    shortfalls
}

/// Validate a complete shift set (new plus existing) against every
/// requirement in the context.
pub fn validate_schedule(context: &ScheduleContext, shifts: &[Shift]) -> ValidationReport {
    let employee_map = context.employee_map();

    let coverage_gaps: Vec<(CoverageRequirement, Vec<NaiveDateTime>)> = context
        .coverage_requirements
        .iter()
        .filter_map(|req| {
            let gaps = coverage_gaps_for_window(shifts, req, context);
            if gaps.is_empty() {
                None
            } else {
                Some((req.clone(), gaps))
            }
        })
        .collect();

    let role_gaps: Vec<(RoleRequirement, Vec<NaiveDateTime>)> = context
        .role_requirements
        .iter()
        .filter_map(|req| {
            let gaps = role_gaps_for_window(shifts, &employee_map, req, context);
            if gaps.is_empty() {
                None
            } else {
                Some((req.clone(), gaps))
            }
        })
        .collect();

    let hour_shortfalls = contracted_hour_shortfalls(shifts, &context.employees);

    if !coverage_gaps.is_empty() || !role_gaps.is_empty() {
        tracing::debug!(
            coverage_gaps = coverage_gaps.len(),
            role_gaps = role_gaps.len(),
            "schedule validation found gaps"
        );
    }

    ValidationReport {
        coverage_gaps,
        role_gaps,
        hour_shortfalls,
    }
}
