//! Orchestration façade.
//!
//! Validates the incoming context, then dispatches to the selected solver
//! strategy. Input validation errors propagate; everything else is absorbed
//! into the `ScheduleResult`.

use chrono::Datelike;
use shared::{DomainError, DomainResult};

#[cfg(test)]
use mockall::automock;

use crate::domain::entities::{ScheduleContext, ScheduleResult};

use super::cp_solver::CpSolver;
use super::greedy_solver::GreedySolver;
use super::solver_options::SolverOptions;

/// Common solver contract. Both strategies borrow the context immutably and
/// produce an owned result.
#[cfg_attr(test, automock)]
pub trait Solver {
    fn solve(&self, context: &ScheduleContext) -> DomainResult<ScheduleResult>;
}

/// Strategy selection at the call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStrategy {
    Greedy,
    CpSat,
}

pub struct Scheduler {
    options: SolverOptions,
}

impl Scheduler {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    /// Generate a schedule proposal for one store and one week.
    pub fn generate(
        &self,
        strategy: SolverStrategy,
        context: &ScheduleContext,
    ) -> DomainResult<ScheduleResult> {
        validate_context(context, &self.options)?;

        match strategy {
            SolverStrategy::Greedy => GreedySolver::new(self.options.clone()).solve(context),
            SolverStrategy::CpSat => CpSolver::new(self.options.clone()).solve(context),
        }
    }
}

/// Reject malformed contexts before any solver runs.
pub fn validate_context(context: &ScheduleContext, options: &SolverOptions) -> DomainResult<()> {
    if options.day_end_hour > 23 || options.day_start_hour >= options.day_end_hour {
        return Err(DomainError::InvalidInput(format!(
            "Day window {}:00-{}:00 is not a valid wall-clock range",
            options.day_start_hour, options.day_end_hour
        )));
    }

    if context.week_start.weekday().num_days_from_monday() != 0 {
        return Err(DomainError::InvalidInput(
            "Schedule week must start on a Monday".to_string(),
        ));
    }

    for rule in &context.availability_rules {
        if rule.day_of_week > 6 {
            return Err(DomainError::InvalidInput(format!(
                "Availability rule for employee {} has day_of_week {} out of range",
                rule.employee_id, rule.day_of_week
            )));
        }
        match (rule.start_time, rule.end_time) {
            (None, None) => {}
            (Some(start), Some(end)) => {
                if end <= start {
                    return Err(DomainError::InvalidInput(format!(
                        "Availability rule for employee {} has an empty time window",
                        rule.employee_id
                    )));
                }
            }
            _ => {
                return Err(DomainError::InvalidInput(format!(
                    "Availability rule for employee {} sets only one of start/end time",
                    rule.employee_id
                )));
            }
        }
    }

    for request in &context.time_off_requests {
        if request.end_datetime <= request.start_datetime {
            return Err(DomainError::InvalidInput(format!(
                "Time off for employee {} has an empty datetime range",
                request.employee_id
            )));
        }
    }

    for req in &context.coverage_requirements {
        if req.day_of_week > 6 {
            return Err(DomainError::InvalidInput(format!(
                "Coverage requirement {} has day_of_week {} out of range",
                req.id, req.day_of_week
            )));
        }
        if req.end_time <= req.start_time {
            return Err(DomainError::InvalidInput(format!(
                "Coverage requirement {} has an empty time window",
                req.id
            )));
        }
        if req.min_staff == 0 {
            return Err(DomainError::InvalidInput(format!(
                "Coverage requirement {} demands zero staff",
                req.id
            )));
        }
    }

    for req in &context.role_requirements {
        if let Some(day) = req.day_of_week {
            if day > 6 {
                return Err(DomainError::InvalidInput(format!(
                    "Role requirement {} has day_of_week {} out of range",
                    req.id, day
                )));
            }
        }
        if req.end_time <= req.start_time {
            return Err(DomainError::InvalidInput(format!(
                "Role requirement {} has an empty time window",
                req.id
            )));
        }
        if !req.requires_keyholder && !req.requires_manager {
            return Err(DomainError::InvalidInput(format!(
                "Role requirement {} demands neither keyholder nor manager",
                req.id
            )));
        }
        if req.requires_manager && req.min_manager_count == 0 {
            return Err(DomainError::InvalidInput(format!(
                "Role requirement {} requires a manager but sets min_manager_count to zero",
                req.id
            )));
        }
        if !req.requires_manager && req.min_manager_count != 0 {
            return Err(DomainError::InvalidInput(format!(
                "Role requirement {} sets min_manager_count without requiring a manager",
                req.id
            )));
        }
    }

    let employee_map = context.employee_map();
    for shift in &context.existing_shifts {
        if shift.end_datetime <= shift.start_datetime {
            return Err(DomainError::InvalidInput(format!(
                "Existing shift for employee {} has an empty datetime range",
                shift.employee_id
            )));
        }
        match employee_map.get(&shift.employee_id) {
            Some(emp) if !emp.works_in(shift.department_id) => {
                return Err(DomainError::InvalidInput(format!(
                    "Existing shift assigns employee {} outside their departments",
                    shift.employee_id
                )));
            }
            _ => {}
        }
        if shift.duration_hours() < options.min_shift_hours as f64 {
            return Err(DomainError::InvalidInput(format!(
                "Existing shift for employee {} is shorter than {} hours",
                shift.employee_id, options.min_shift_hours
            )));
        }
    }

    Ok(())
}
