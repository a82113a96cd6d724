use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use shared::{AvailabilityType, EmployeeId};

/// A recurring weekly availability rule for one employee.
///
/// `start_time`/`end_time` are either both set (a window within the day) or
/// both `None` (the rule covers the whole day). Only active rules are
/// carried into a solve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityRule {
    pub employee_id: EmployeeId,
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: u8,
    pub rule_type: AvailabilityType,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl AvailabilityRule {
    /// True when the rule has no time window and covers the whole day.
    pub fn is_all_day(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none()
    }
}

/// An approved time-off request. The range is half-open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeOffRequest {
    pub employee_id: EmployeeId,
    pub start_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
}
