use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use shared::{DepartmentId, EmployeeId, StoreId};

/// A shift assignment, proposed by a solver or already on the roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shift {
    pub employee_id: EmployeeId,
    pub store_id: StoreId,
    pub department_id: DepartmentId,
    pub start_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
}

impl Shift {
    pub fn duration_hours(&self) -> f64 {
        let delta = self.end_datetime - self.start_datetime;
        delta.num_minutes() as f64 / 60.0
    }

    /// Monday = 0 .. Sunday = 6, taken from the shift start.
    pub fn day_of_week(&self) -> u8 {
        self.start_datetime.weekday().num_days_from_monday() as u8
    }

    /// Half-open containment check: does the shift cover instant `t`?
    pub fn covers(&self, t: NaiveDateTime) -> bool {
        self.start_datetime <= t && t < self.end_datetime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::{DepartmentId, EmployeeId, StoreId};

    fn shift(start_h: u32, end_h: u32) -> Shift {
        let date = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();
        Shift {
            employee_id: EmployeeId::new(),
            store_id: StoreId::new(),
            department_id: DepartmentId::new(),
            start_datetime: date.and_hms_opt(start_h, 0, 0).unwrap(),
            end_datetime: date.and_hms_opt(end_h, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_duration_and_day() {
        let s = shift(9, 17);
        assert_eq!(s.duration_hours(), 8.0);
        // 2025-01-20 is a Monday
        assert_eq!(s.day_of_week(), 0);
    }

    #[test]
    fn test_covers_is_half_open() {
        let s = shift(9, 17);
        let date = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();
        assert!(s.covers(date.and_hms_opt(9, 0, 0).unwrap()));
        assert!(s.covers(date.and_hms_opt(16, 30, 0).unwrap()));
        assert!(!s.covers(date.and_hms_opt(17, 0, 0).unwrap()));
    }
}
