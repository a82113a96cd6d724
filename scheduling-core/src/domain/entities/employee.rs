use serde::{Deserialize, Serialize};
use shared::{DepartmentId, EmployeeId, StoreId};

/// Employee snapshot for one solve.
///
/// Only `ACTIVE` employees are expected here; the data loader filters on
/// employment status before the context is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    pub id: EmployeeId,
    pub store_id: StoreId,
    pub is_keyholder: bool,
    pub is_manager: bool,
    pub contracted_weekly_hours: u32,
    /// Departments the employee may be scheduled into. Declared order
    /// matters: the first entry is the fallback when no primary is set.
    pub department_ids: Vec<DepartmentId>,
    pub primary_department_id: Option<DepartmentId>,
}

impl Employee {
    /// Whether the employee may work in the given department.
    pub fn works_in(&self, department_id: DepartmentId) -> bool {
        self.department_ids.contains(&department_id)
    }

    /// Primary department, falling back to the first declared one.
    pub fn primary_or_first_department(&self) -> Option<DepartmentId> {
        self.primary_department_id
            .or_else(|| self.department_ids.first().copied())
    }
}
