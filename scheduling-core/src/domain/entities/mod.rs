pub mod availability;
pub mod employee;
pub mod requirement;
pub mod schedule;
pub mod shift;

pub use availability::{AvailabilityRule, TimeOffRequest};
pub use employee::Employee;
pub use requirement::{CoverageRequirement, RoleRequirement};
pub use schedule::{ScheduleContext, ScheduleResult};
pub use shift::Shift;
