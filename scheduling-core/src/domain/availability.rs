//! Availability checking.
//!
//! Decides whether an employee can work a given time window and classifies
//! the window against their weekly availability rules.

use chrono::{Datelike, NaiveDateTime, NaiveTime};
use shared::{AvailabilityType, DepartmentId, EmployeeId};

use super::entities::{AvailabilityRule, Employee, Shift, TimeOffRequest};

/// Half-open overlap between two same-day time ranges.
pub fn times_overlap(start1: NaiveTime, end1: NaiveTime, start2: NaiveTime, end2: NaiveTime) -> bool {
    start1 < end2 && start2 < end1
}

/// Half-open overlap between two datetime ranges.
pub fn ranges_overlap(
    start1: NaiveDateTime,
    end1: NaiveDateTime,
    start2: NaiveDateTime,
    end2: NaiveDateTime,
) -> bool {
    start1 < end2 && start2 < end1
}

/// Whether the employee has approved time off anywhere in the window.
pub fn is_on_time_off(
    employee_id: EmployeeId,
    start: NaiveDateTime,
    end: NaiveDateTime,
    time_off_requests: &[TimeOffRequest],
) -> bool {
    time_off_requests.iter().any(|req| {
        req.employee_id == employee_id
            && ranges_overlap(start, end, req.start_datetime, req.end_datetime)
    })
}

fn preferred_rule_overlaps(
    rules: &[&AvailabilityRule],
    slot_start: NaiveTime,
    slot_end: NaiveTime,
) -> bool {
    rules.iter().any(|rule| {
        rule.rule_type == AvailabilityType::Preferred
            && match (rule.start_time, rule.end_time) {
                (Some(start), Some(end)) => times_overlap(slot_start, slot_end, start, end),
                _ => false,
            }
    })
}

/// Effective availability classification for one employee/day/slot.
///
/// Precedence, in order:
/// 1. any overlapping `UNAVAILABLE` rule wins;
/// 2. an `AVAILABLE` rule covering the slot (upgraded to `PREFERRED` when a
///    preferred window also overlaps);
/// 3. an overlapping `PREFERRED` rule on its own implies availability;
/// 4. `AVAILABLE` rules exist for the day but none covers the slot: the
///    un-listed time is forbidden;
/// 5. no applicable rule at all: `None` (treated as available by default).
pub fn classify(
    employee_id: EmployeeId,
    day_of_week: u8,
    slot_start: NaiveTime,
    slot_end: NaiveTime,
    rules: &[AvailabilityRule],
) -> Option<AvailabilityType> {
    let employee_rules: Vec<&AvailabilityRule> = rules
        .iter()
        .filter(|r| r.employee_id == employee_id && r.day_of_week == day_of_week)
        .collect();

    if employee_rules.is_empty() {
        return None;
    }

    for rule in &employee_rules {
        if rule.rule_type != AvailabilityType::Unavailable {
            continue;
        }
        if rule.is_all_day() {
            return Some(AvailabilityType::Unavailable);
        }
        if let (Some(start), Some(end)) = (rule.start_time, rule.end_time) {
            if times_overlap(slot_start, slot_end, start, end) {
                return Some(AvailabilityType::Unavailable);
            }
        }
    }

    for rule in &employee_rules {
        if rule.rule_type != AvailabilityType::Available {
            continue;
        }
        let covers = if rule.is_all_day() {
            true
        } else if let (Some(start), Some(end)) = (rule.start_time, rule.end_time) {
            slot_start >= start && slot_end <= end
        } else {
            false
        };
        if covers {
            if preferred_rule_overlaps(&employee_rules, slot_start, slot_end) {
                return Some(AvailabilityType::Preferred);
            }
            return Some(AvailabilityType::Available);
        }
    }

    for rule in &employee_rules {
        if rule.rule_type != AvailabilityType::Preferred {
            continue;
        }
        if rule.is_all_day() {
            return Some(AvailabilityType::Preferred);
        }
        if let (Some(start), Some(end)) = (rule.start_time, rule.end_time) {
            if times_overlap(slot_start, slot_end, start, end) {
                return Some(AvailabilityType::Preferred);
            }
        }
    }

    // Explicit availability elsewhere in the day means un-listed times are
    // forbidden.
    let has_available_rules = employee_rules
        .iter()
        .any(|r| r.rule_type == AvailabilityType::Available);
    if has_available_rules {
        return Some(AvailabilityType::Unavailable);
    }

    None
}

/// Whether an employee can work a candidate shift window.
///
/// Checks, in order: department assignment, approved time off, availability
/// rules, and double booking against the supplied shift set. Returns the
/// first failure reason.
pub fn can_work(
    employee: &Employee,
    shift_start: NaiveDateTime,
    shift_end: NaiveDateTime,
    department_id: DepartmentId,
    rules: &[AvailabilityRule],
    time_off_requests: &[TimeOffRequest],
    other_shifts: &[Shift],
) -> (bool, &'static str) {
    if !employee.works_in(department_id) {
        return (false, "employee not assigned to department");
    }

    if is_on_time_off(employee.id, shift_start, shift_end, time_off_requests) {
        return (false, "employee has approved time off");
    }

    let day_of_week = shift_start.weekday().num_days_from_monday() as u8;
    let availability = classify(
        employee.id,
        day_of_week,
        shift_start.time(),
        shift_end.time(),
        rules,
    );
    if availability == Some(AvailabilityType::Unavailable) {
        return (false, "employee unavailable during this time");
    }

    for existing in other_shifts {
        if existing.employee_id != employee.id {
            continue;
        }
        if ranges_overlap(
            shift_start,
            shift_end,
            existing.start_datetime,
            existing.end_datetime,
        ) {
            return (false, "conflicts with existing shift");
        }
    }

    (true, "ok")
}

/// All employees able to work a window, most preferred first
/// (`PREFERRED`, then `AVAILABLE`, then rule-less defaults).
pub fn available_employees_for_window<'a>(
    employees: &'a [Employee],
    shift_start: NaiveDateTime,
    shift_end: NaiveDateTime,
    department_id: DepartmentId,
    rules: &[AvailabilityRule],
    time_off_requests: &[TimeOffRequest],
    other_shifts: &[Shift],
) -> Vec<(&'a Employee, Option<AvailabilityType>)> {
    let day_of_week = shift_start.weekday().num_days_from_monday() as u8;

    let mut available: Vec<(&Employee, Option<AvailabilityType>)> = employees
        .iter()
        .filter(|emp| {
            can_work(
                emp,
                shift_start,
                shift_end,
                department_id,
                rules,
                time_off_requests,
                other_shifts,
            )
            .0
        })
        .map(|emp| {
            let avail = classify(
                emp.id,
                day_of_week,
                shift_start.time(),
                shift_end.time(),
                rules,
            );
            (emp, avail)
        })
        .collect();

    fn preference_rank(avail: Option<AvailabilityType>) -> u8 {
        match avail {
            Some(AvailabilityType::Preferred) => 0,
            Some(AvailabilityType::Available) => 1,
            _ => 2,
        }
    }

    available.sort_by_key(|(_, avail)| preference_rank(*avail));
    available
}
