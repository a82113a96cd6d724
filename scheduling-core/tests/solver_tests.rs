//! End-to-end scenarios for both solver strategies.

#[path = "common/mod.rs"]
mod common;

use common::{
    assert_invariants, availability, coverage, employee, empty_context, keyholder,
    keyholder_requirement, shifts_in_window, test_monday, time,
};
use scheduling_core::domain::validation::validate_schedule;
use scheduling_core::{ScheduleContext, ScheduleResult, Scheduler, SolverOptions, SolverStrategy};
use shared::{AvailabilityType, DepartmentId, StoreId};

const STRATEGIES: [SolverStrategy; 2] = [SolverStrategy::Greedy, SolverStrategy::CpSat];

fn generate(strategy: SolverStrategy, context: &ScheduleContext) -> ScheduleResult {
    let scheduler = Scheduler::new(SolverOptions::default());
    scheduler
        .generate(strategy, context)
        .expect("well-formed context must not error")
}

#[test]
fn empty_day_yields_no_shifts() {
    let store_id = StoreId::new();
    let dept = DepartmentId::new();
    let mut ctx = empty_context(store_id);
    ctx.employees = vec![employee(store_id, dept, 0)];

    for strategy in STRATEGIES {
        let result = generate(strategy, &ctx);
        assert!(result.success, "{strategy:?} should succeed on an empty day");
        assert!(result.shifts.is_empty());
        assert!(result.warnings.is_empty());
        assert_invariants(&ctx, &result, &SolverOptions::default());
    }
}

#[test]
fn forced_coverage_schedules_both_employees() {
    let store_id = StoreId::new();
    let dept = DepartmentId::new();
    let mut ctx = empty_context(store_id);
    let first = employee(store_id, dept, 0);
    let second = employee(store_id, dept, 0);
    ctx.availability_rules = vec![
        availability(
            first.id,
            0,
            AvailabilityType::Available,
            Some((time(10, 0), time(14, 0))),
        ),
        availability(
            second.id,
            0,
            AvailabilityType::Available,
            Some((time(10, 0), time(14, 0))),
        ),
    ];
    ctx.employees = vec![first, second];
    ctx.coverage_requirements = vec![coverage(store_id, dept, 0, time(10, 0), time(14, 0), 2)];

    for strategy in STRATEGIES {
        let result = generate(strategy, &ctx);
        assert!(
            result.unmet_coverage.is_empty(),
            "{strategy:?} left coverage unmet"
        );

        let monday_shifts: Vec<_> = result
            .shifts
            .iter()
            .filter(|s| s.day_of_week() == 0 && s.department_id == dept)
            .collect();
        assert!(monday_shifts.len() >= 2);
        for shift in &monday_shifts {
            assert!(shift.start_datetime <= test_monday().and_hms_opt(10, 0, 0).unwrap());
            assert!(shift.end_datetime >= test_monday().and_hms_opt(14, 0, 0).unwrap());
        }
        assert_invariants(&ctx, &result, &SolverOptions::default());
    }
}

#[test]
fn all_day_unavailability_blocks_the_employee() {
    let store_id = StoreId::new();
    let dept = DepartmentId::new();
    let mut ctx = empty_context(store_id);
    let emp = employee(store_id, dept, 0);
    ctx.availability_rules = vec![availability(emp.id, 0, AvailabilityType::Unavailable, None)];
    let emp_id = emp.id;
    ctx.employees = vec![emp];
    ctx.coverage_requirements = vec![coverage(store_id, dept, 0, time(10, 0), time(14, 0), 1)];

    for strategy in STRATEGIES {
        let result = generate(strategy, &ctx);
        assert!(!result.success);
        assert!(!result.unmet_coverage.is_empty(), "{strategy:?}");
        assert!(
            result
                .shifts
                .iter()
                .all(|s| !(s.employee_id == emp_id && s.day_of_week() == 0)),
            "{strategy:?} scheduled an unavailable employee on Monday"
        );
        assert_invariants(&ctx, &result, &SolverOptions::default());
    }
}

#[test]
fn rest_rule_allows_at_most_one_of_two_adjacent_windows() {
    let store_id = StoreId::new();
    let dept = DepartmentId::new();
    let mut ctx = empty_context(store_id);
    let emp = employee(store_id, dept, 0);
    ctx.availability_rules = vec![
        availability(
            emp.id,
            0,
            AvailabilityType::Available,
            Some((time(18, 0), time(22, 0))),
        ),
        availability(
            emp.id,
            1,
            AvailabilityType::Available,
            Some((time(6, 0), time(10, 0))),
        ),
    ];
    let emp_id = emp.id;
    ctx.employees = vec![emp];
    ctx.coverage_requirements = vec![
        coverage(store_id, dept, 0, time(18, 0), time(22, 0), 1),
        coverage(store_id, dept, 1, time(6, 0), time(10, 0), 1),
    ];

    for strategy in STRATEGIES {
        let result = generate(strategy, &ctx);
        assert_eq!(
            result.unmet_coverage.len(),
            1,
            "{strategy:?} must leave exactly one window uncovered"
        );

        let monday_evening = shifts_in_window(
            &result.shifts,
            emp_id,
            test_monday().and_hms_opt(18, 0, 0).unwrap(),
            test_monday().and_hms_opt(22, 0, 0).unwrap(),
        );
        let tuesday_morning = shifts_in_window(
            &result.shifts,
            emp_id,
            test_monday().succ_opt().unwrap().and_hms_opt(6, 0, 0).unwrap(),
            test_monday().succ_opt().unwrap().and_hms_opt(10, 0, 0).unwrap(),
        );
        assert!(
            monday_evening.len() + tuesday_morning.len() <= 1,
            "{strategy:?} scheduled both sides of the rest gap"
        );
        assert_invariants(&ctx, &result, &SolverOptions::default());
    }
}

#[test]
fn keyholder_requirement_is_satisfied() {
    let store_id = StoreId::new();
    let dept = DepartmentId::new();
    let mut ctx = empty_context(store_id);
    let holder = keyholder(store_id, dept, 0);
    let plain = employee(store_id, dept, 0);
    let holder_id = holder.id;
    ctx.employees = vec![holder, plain];
    ctx.role_requirements = vec![keyholder_requirement(
        store_id,
        Some(0),
        time(7, 0),
        time(10, 0),
    )];

    for strategy in STRATEGIES {
        let result = generate(strategy, &ctx);
        assert!(
            result.unmet_role_requirements.is_empty(),
            "{strategy:?} left the keyholder requirement unmet"
        );

        let covering = shifts_in_window(
            &result.shifts,
            holder_id,
            test_monday().and_hms_opt(7, 0, 0).unwrap(),
            test_monday().and_hms_opt(10, 0, 0).unwrap(),
        );
        assert!(!covering.is_empty(), "{strategy:?} did not schedule the keyholder");
        assert_invariants(&ctx, &result, &SolverOptions::default());
    }
}

#[test]
fn impossible_role_requirement_is_reported_not_raised() {
    let store_id = StoreId::new();
    let dept = DepartmentId::new();
    let mut ctx = empty_context(store_id);
    ctx.employees = vec![employee(store_id, dept, 0)];
    let requirement = keyholder_requirement(store_id, Some(0), time(7, 0), time(10, 0));
    let requirement_id = requirement.id;
    ctx.role_requirements = vec![requirement];

    for strategy in STRATEGIES {
        let result = generate(strategy, &ctx);
        assert!(!result.success);
        assert!(result
            .unmet_role_requirements
            .iter()
            .any(|req| req.id == requirement_id));
        assert!(!result.warnings.is_empty());
        assert_invariants(&ctx, &result, &SolverOptions::default());
    }
}

#[test]
fn existing_shifts_are_respected_and_excluded() {
    let store_id = StoreId::new();
    let dept = DepartmentId::new();
    let mut ctx = empty_context(store_id);
    let emp = employee(store_id, dept, 4);
    ctx.existing_shifts = vec![scheduling_core::Shift {
        employee_id: emp.id,
        store_id,
        department_id: dept,
        start_datetime: test_monday().and_hms_opt(10, 0, 0).unwrap(),
        end_datetime: test_monday().and_hms_opt(14, 0, 0).unwrap(),
    }];
    ctx.employees = vec![emp];
    ctx.coverage_requirements = vec![coverage(store_id, dept, 0, time(10, 0), time(14, 0), 1)];

    let result = generate(SolverStrategy::Greedy, &ctx);
    assert!(result.success);
    assert!(
        result.shifts.is_empty(),
        "the existing shift already satisfies everything"
    );
    assert_invariants(&ctx, &result, &SolverOptions::default());
}

#[test]
fn tightening_min_staff_never_improves_unmet_metrics() {
    let store_id = StoreId::new();
    let dept = DepartmentId::new();

    let mut unmet_counts = Vec::new();
    for min_staff in [1u32, 2, 3] {
        let mut ctx = empty_context(store_id);
        let emp = employee(store_id, dept, 0);
        ctx.availability_rules = vec![availability(
            emp.id,
            0,
            AvailabilityType::Available,
            Some((time(10, 0), time(14, 0))),
        )];
        ctx.employees = vec![emp];
        ctx.coverage_requirements =
            vec![coverage(store_id, dept, 0, time(10, 0), time(14, 0), min_staff)];

        let result = generate(SolverStrategy::Greedy, &ctx);
        unmet_counts.push(result.unmet_coverage.len());
    }

    assert!(unmet_counts.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn both_solvers_report_through_the_validator() {
    let store_id = StoreId::new();
    let dept = DepartmentId::new();
    let mut ctx = empty_context(store_id);
    let emp = employee(store_id, dept, 0);
    ctx.availability_rules = vec![availability(emp.id, 0, AvailabilityType::Unavailable, None)];
    ctx.employees = vec![emp];
    ctx.coverage_requirements = vec![coverage(store_id, dept, 0, time(10, 0), time(14, 0), 1)];

    for strategy in STRATEGIES {
        let result = generate(strategy, &ctx);

        // Re-running the validator over the returned union reproduces the
        // reported unmet sets
        let mut union = result.shifts.clone();
        union.extend(ctx.existing_shifts.iter().cloned());
        let report = validate_schedule(&ctx, &union);

        let reported: Vec<_> = result.unmet_coverage.iter().map(|r| r.id).collect();
        let recomputed: Vec<_> = report.coverage_gaps.iter().map(|(r, _)| r.id).collect();
        assert_eq!(reported, recomputed, "{strategy:?}");
        assert_eq!(
            result.unmet_contracted_hours,
            report.hour_shortfalls,
            "{strategy:?}"
        );
    }
}
