//! Runs both solver strategies over a small in-memory store week and prints
//! the proposed rosters.

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use scheduling_core::{
    AvailabilityRule, CoverageRequirement, Employee, RoleRequirement, ScheduleContext, Scheduler,
    SolverOptions, SolverStrategy,
};
use shared::{AvailabilityType, DepartmentId, EmployeeId, RequirementId, StoreId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn demo_context() -> ScheduleContext {
    let store_id = StoreId::new();
    let sales = DepartmentId::new();
    let warehouse = DepartmentId::new();

    let manager = Employee {
        id: EmployeeId::new(),
        store_id,
        is_keyholder: true,
        is_manager: true,
        contracted_weekly_hours: 40,
        department_ids: vec![sales, warehouse],
        primary_department_id: Some(sales),
    };
    let clerk = Employee {
        id: EmployeeId::new(),
        store_id,
        is_keyholder: false,
        is_manager: false,
        contracted_weekly_hours: 24,
        department_ids: vec![sales],
        primary_department_id: Some(sales),
    };
    let picker = Employee {
        id: EmployeeId::new(),
        store_id,
        is_keyholder: false,
        is_manager: false,
        contracted_weekly_hours: 16,
        department_ids: vec![warehouse],
        primary_department_id: Some(warehouse),
    };

    let availability_rules = vec![
        // The clerk prefers mornings early in the week
        AvailabilityRule {
            employee_id: clerk.id,
            day_of_week: 0,
            rule_type: AvailabilityType::Preferred,
            start_time: Some(time(8, 0)),
            end_time: Some(time(14, 0)),
        },
        // The picker is away on Wednesdays
        AvailabilityRule {
            employee_id: picker.id,
            day_of_week: 2,
            rule_type: AvailabilityType::Unavailable,
            start_time: None,
            end_time: None,
        },
    ];

    let coverage_requirements = vec![
        CoverageRequirement {
            id: RequirementId::new(),
            store_id,
            department_id: sales,
            day_of_week: 0,
            start_time: time(9, 0),
            end_time: time(17, 0),
            min_staff: 1,
            max_staff: Some(3),
        },
        CoverageRequirement {
            id: RequirementId::new(),
            store_id,
            department_id: warehouse,
            day_of_week: 1,
            start_time: time(8, 0),
            end_time: time(12, 0),
            min_staff: 1,
            max_staff: None,
        },
    ];

    let role_requirements = vec![RoleRequirement {
        id: RequirementId::new(),
        store_id,
        department_id: None,
        day_of_week: Some(0),
        start_time: time(9, 0),
        end_time: time(12, 0),
        requires_keyholder: true,
        requires_manager: false,
        min_manager_count: 0,
    }];

    ScheduleContext {
        store_id,
        // A Monday
        week_start: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
        employees: vec![manager, clerk, picker],
        availability_rules,
        time_off_requests: vec![],
        coverage_requirements,
        role_requirements,
        existing_shifts: vec![],
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scheduling_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let context = demo_context();
    let scheduler = Scheduler::new(SolverOptions::default());

    for strategy in [SolverStrategy::Greedy, SolverStrategy::CpSat] {
        let result = scheduler.generate(strategy, &context)?;

        println!("\n== {strategy:?} ==");
        println!("success: {}", result.success);
        let mut shifts = result.shifts.clone();
        shifts.sort_by_key(|s| (s.start_datetime, s.employee_id));
        for shift in &shifts {
            println!(
                "  {} {:>5}-{:>5}  employee {}  department {}",
                shift.start_datetime.date(),
                shift.start_datetime.time().format("%H:%M"),
                shift.end_datetime.time().format("%H:%M"),
                shift.employee_id,
                shift.department_id,
            );
        }
        for warning in &result.warnings {
            println!("  warning: {warning}");
        }
        // What the proposal writer would receive
        println!("  payload: {}", serde_json::to_string(&shifts)?);
    }

    Ok(())
}
