use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use shared::{DepartmentId, RequirementId, StoreId};

/// A demand floor on concurrent headcount in a department across a weekly
/// day/time window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageRequirement {
    pub id: RequirementId,
    pub store_id: StoreId,
    pub department_id: DepartmentId,
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub min_staff: u32,
    /// Carried through from the store model but not enforced by either
    /// solver.
    pub max_staff: Option<u32>,
}

/// A presence rule for capabilities (keyholder/manager) across a window.
///
/// `department_id = None` applies store-wide; `day_of_week = None` applies
/// every day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleRequirement {
    pub id: RequirementId,
    pub store_id: StoreId,
    pub department_id: Option<DepartmentId>,
    pub day_of_week: Option<u8>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub requires_keyholder: bool,
    pub requires_manager: bool,
    pub min_manager_count: u32,
}

impl RoleRequirement {
    /// Days of week this requirement applies to.
    pub fn applicable_days(&self) -> Vec<u8> {
        match self.day_of_week {
            Some(day) => vec![day],
            None => (0..7).collect(),
        }
    }
}
