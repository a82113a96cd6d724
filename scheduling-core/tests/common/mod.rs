//! Shared builders and invariant checks for the solver integration tests.

use chrono::{NaiveDate, NaiveTime};
use scheduling_core::domain::availability::{can_work, ranges_overlap};
use scheduling_core::{
    AvailabilityRule, CoverageRequirement, Employee, RoleRequirement, ScheduleContext,
    ScheduleResult, Shift, SolverOptions,
};
use shared::{AvailabilityType, DepartmentId, EmployeeId, RequirementId, StoreId};
use std::collections::HashMap;

/// A fixed Monday so every test works with the same week.
pub fn test_monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn empty_context(store_id: StoreId) -> ScheduleContext {
    ScheduleContext {
        store_id,
        week_start: test_monday(),
        employees: vec![],
        availability_rules: vec![],
        time_off_requests: vec![],
        coverage_requirements: vec![],
        role_requirements: vec![],
        existing_shifts: vec![],
    }
}

pub fn employee(store_id: StoreId, dept: DepartmentId, contracted: u32) -> Employee {
    Employee {
        id: EmployeeId::new(),
        store_id,
        is_keyholder: false,
        is_manager: false,
        contracted_weekly_hours: contracted,
        department_ids: vec![dept],
        primary_department_id: Some(dept),
    }
}

pub fn keyholder(store_id: StoreId, dept: DepartmentId, contracted: u32) -> Employee {
    Employee {
        is_keyholder: true,
        ..employee(store_id, dept, contracted)
    }
}

pub fn availability(
    employee_id: EmployeeId,
    day: u8,
    rule_type: AvailabilityType,
    window: Option<(NaiveTime, NaiveTime)>,
) -> AvailabilityRule {
    AvailabilityRule {
        employee_id,
        day_of_week: day,
        rule_type,
        start_time: window.map(|(s, _)| s),
        end_time: window.map(|(_, e)| e),
    }
}

pub fn coverage(
    store_id: StoreId,
    dept: DepartmentId,
    day: u8,
    start: NaiveTime,
    end: NaiveTime,
    min_staff: u32,
) -> CoverageRequirement {
    CoverageRequirement {
        id: RequirementId::new(),
        store_id,
        department_id: dept,
        day_of_week: day,
        start_time: start,
        end_time: end,
        min_staff,
        max_staff: None,
    }
}

pub fn keyholder_requirement(
    store_id: StoreId,
    day: Option<u8>,
    start: NaiveTime,
    end: NaiveTime,
) -> RoleRequirement {
    RoleRequirement {
        id: RequirementId::new(),
        store_id,
        department_id: None,
        day_of_week: day,
        start_time: start,
        end_time: end,
        requires_keyholder: true,
        requires_manager: false,
        min_manager_count: 0,
    }
}

/// Shifts of one employee that overlap a window on a given day.
pub fn shifts_in_window(
    shifts: &[Shift],
    employee_id: EmployeeId,
    start: chrono::NaiveDateTime,
    end: chrono::NaiveDateTime,
) -> Vec<Shift> {
    shifts
        .iter()
        .filter(|s| s.employee_id == employee_id)
        .filter(|s| ranges_overlap(s.start_datetime, s.end_datetime, start, end))
        .cloned()
        .collect()
}

/// The universal result invariants every solver must uphold.
pub fn assert_invariants(
    context: &ScheduleContext,
    result: &ScheduleResult,
    options: &SolverOptions,
) {
    let employees: HashMap<EmployeeId, &Employee> = context.employee_map();

    let mut all_shifts = result.shifts.clone();
    all_shifts.extend(context.existing_shifts.iter().cloned());

    for shift in &result.shifts {
        let emp = employees
            .get(&shift.employee_id)
            .expect("shift for unknown employee");

        // 1: department membership
        assert!(
            emp.works_in(shift.department_id),
            "shift assigned outside employee departments"
        );

        // 2: duration bounds by role
        let duration = shift.duration_hours();
        assert!(duration >= options.min_shift_hours as f64);
        let max = options.max_shift_hours(emp.is_manager) as f64;
        assert!(
            duration <= max,
            "shift of {duration}h exceeds {max}h for this role"
        );

        // 6: the feasibility predicate holds against all other shifts
        let others: Vec<Shift> = all_shifts
            .iter()
            .filter(|other| {
                !(other.employee_id == shift.employee_id
                    && other.start_datetime == shift.start_datetime
                    && other.end_datetime == shift.end_datetime)
            })
            .cloned()
            .collect();
        let (ok, reason) = can_work(
            emp,
            shift.start_datetime,
            shift.end_datetime,
            shift.department_id,
            &context.availability_rules,
            &context.time_off_requests,
            &others,
        );
        assert!(ok, "produced shift fails feasibility: {reason}");
    }

    // 3: no same-employee overlap anywhere in the union
    for (i, a) in all_shifts.iter().enumerate() {
        for b in all_shifts.iter().skip(i + 1) {
            if a.employee_id != b.employee_id {
                continue;
            }
            assert!(
                !ranges_overlap(a.start_datetime, a.end_datetime, b.start_datetime, b.end_datetime),
                "overlapping shifts for one employee"
            );
        }
    }

    // 4: at most one new shift per employee per day
    let mut per_day: HashMap<(EmployeeId, u8), u32> = HashMap::new();
    for shift in &result.shifts {
        *per_day.entry((shift.employee_id, shift.day_of_week())).or_default() += 1;
    }
    assert!(
        per_day.values().all(|&count| count <= 1),
        "more than one new shift on one day"
    );

    // 5: inter-day rest across the union
    for a in &all_shifts {
        for b in &all_shifts {
            if a.employee_id != b.employee_id {
                continue;
            }
            if b.day_of_week() != a.day_of_week() + 1 {
                continue;
            }
            let rest = b.start_datetime - a.end_datetime;
            assert!(
                rest.num_minutes() >= (options.min_rest_hours * 60) as i64,
                "only {} minutes of rest between consecutive days",
                rest.num_minutes()
            );
        }
    }

    // 7: success mirrors the unmet collections
    assert_eq!(
        result.success,
        result.unmet_coverage.is_empty()
            && result.unmet_role_requirements.is_empty()
            && result.unmet_contracted_hours.is_empty()
    );
}
