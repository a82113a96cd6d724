pub mod domain;
pub mod infrastructure;

pub use domain::entities::{
    AvailabilityRule, CoverageRequirement, Employee, RoleRequirement, ScheduleContext,
    ScheduleResult, Shift, TimeOffRequest,
};
pub use domain::services::{Scheduler, Solver, SolverOptions, SolverStrategy, Weights};
