//! Greedy constructive solver.
//!
//! Builds a schedule in four phases over a working shift list seeded from
//! the existing shifts: coverage seeding (most-constrained requirement
//! first), role satisfaction, contracted-hour fill, and one coverage
//! re-sweep to use employees freed up by the later phases. Candidate shifts
//! are scored and the best survivor wins; infeasibility is never an error.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use shared::{AvailabilityType, DepartmentId, DomainResult, EmployeeId};

use crate::domain::availability::{available_employees_for_window, can_work, classify};
use crate::domain::entities::{
    CoverageRequirement, Employee, RoleRequirement, ScheduleContext, ScheduleResult, Shift,
};
use crate::domain::validation::{
    role_met_at, shifts_covering_instant, validate_schedule,
};

use super::scheduler::Solver;
use super::solver_options::SolverOptions;

/// Shift-length palettes in priority order; position breaks score ties.
const MANAGER_SHIFT_HOURS: [u32; 4] = [8, 4, 6, 10];
const REGULAR_SHIFT_HOURS: [u32; 3] = [8, 4, 6];

/// Walk and start-sweep granularity.
const STEP_MINUTES: i64 = 30;

const SCORE_DEPT_NEED_PER_STAFF: f64 = 5.0;
const SCORE_PRIMARY_DEPT: f64 = 25.0;
const SCORE_NON_PRIMARY_DEPT: f64 = -15.0;
const SCORE_PREFERRED: f64 = 15.0;
const SCORE_AVAILABLE: f64 = 5.0;
const SCORE_FILLS_NEEDED_PER_HOUR: f64 = 2.0;
const SCORE_OVERTIME_PER_HOUR: f64 = -3.0;
const SCORE_FIVE_PLUS_DAYS: f64 = -20.0;
const SCORE_FOUR_DAYS: f64 = -5.0;
const SCORE_ROLE_MATCH: f64 = 20.0;
/// Passes over the under-hours list in the fill phase.
const FILL_PASSES: usize = 3;

fn shift_length_score(hours: u32) -> f64 {
    match hours {
        8 => 10.0,
        4 => 7.0,
        6 => 5.0,
        10 => 3.0,
        _ => 0.0,
    }
}

fn palette(is_manager: bool) -> &'static [u32] {
    if is_manager {
        &MANAGER_SHIFT_HOURS
    } else {
        &REGULAR_SHIFT_HOURS
    }
}

pub struct GreedySolver {
    options: SolverOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl GreedySolver {
    pub fn new(options: SolverOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Cooperative cancellation flag, checked at each phase boundary.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

impl Solver for GreedySolver {
    fn solve(&self, context: &ScheduleContext) -> DomainResult<ScheduleResult> {
        let state = SolveState::new(context, &self.options);
        Ok(state.run(self.cancel.as_deref()))
    }
}

/// Working state for one solve; owned by the solver, moved into the result.
struct SolveState<'a> {
    context: &'a ScheduleContext,
    options: &'a SolverOptions,
    shifts: Vec<Shift>,
    hours: HashMap<EmployeeId, f64>,
    days_worked: HashMap<EmployeeId, HashSet<u8>>,
}

impl<'a> SolveState<'a> {
    fn new(context: &'a ScheduleContext, options: &'a SolverOptions) -> Self {
        let mut hours: HashMap<EmployeeId, f64> = HashMap::new();
        let mut days_worked: HashMap<EmployeeId, HashSet<u8>> = HashMap::new();
        for shift in &context.existing_shifts {
            *hours.entry(shift.employee_id).or_default() += shift.duration_hours();
            days_worked
                .entry(shift.employee_id)
                .or_default()
                .insert(shift.day_of_week());
        }

        Self {
            context,
            options,
            shifts: context.existing_shifts.clone(),
            hours,
            days_worked,
        }
    }

    fn run(mut self, cancel: Option<&AtomicBool>) -> ScheduleResult {
        tracing::info!(
            store_id = %self.context.store_id,
            week_start = %self.context.week_start,
            employees = self.context.employees.len(),
            coverage_requirements = self.context.coverage_requirements.len(),
            role_requirements = self.context.role_requirements.len(),
            "greedy solve started"
        );

        let mut warnings = Vec::new();
        let cancelled = |warnings: &mut Vec<String>| {
            let hit = cancel.is_some_and(|flag| flag.load(Ordering::Relaxed));
            if hit && warnings.is_empty() {
                tracing::warn!("greedy solve cancelled; returning partial schedule");
                warnings.push("solve cancelled before completion".to_string());
            }
            hit
        };

        if !cancelled(&mut warnings) {
            tracing::debug!("phase 1: coverage seeding");
            self.cover_requirements();
        }
        if !cancelled(&mut warnings) {
            tracing::debug!("phase 2: role satisfaction");
            self.satisfy_role_requirements();
        }
        if !cancelled(&mut warnings) {
            tracing::debug!("phase 3: contracted-hour fill");
            self.fill_contracted_hours();
        }
        if !cancelled(&mut warnings) {
            tracing::debug!("phase 4: coverage re-sweep");
            self.cover_requirements_once();
        }

        self.build_result(warnings)
    }

    // ---- phase 1 & 4: coverage ----

    fn cover_requirements(&mut self) {
        for req in self.requirements_by_constraint() {
            self.cover_single_requirement(&req);
        }
    }

    fn cover_requirements_once(&mut self) {
        // Same sweep; employees freed by phases 2-3 may now help.
        self.cover_requirements();
    }

    /// Coverage requirements, hardest to fill first: ascending ratio of
    /// available employees to demanded staff, ties to the larger demand.
    fn requirements_by_constraint(&self) -> Vec<CoverageRequirement> {
        let mut scored: Vec<(f64, CoverageRequirement)> = self
            .context
            .coverage_requirements
            .iter()
            .map(|req| {
                let date = self.context.day_date(req.day_of_week);
                let start = date.and_time(req.start_time);
                let end = date.and_time(req.end_time);
                let available = available_employees_for_window(
                    &self.context.employees,
                    start,
                    end,
                    req.department_id,
                    &self.context.availability_rules,
                    &self.context.time_off_requests,
                    &self.shifts,
                );
                let ratio = available.len() as f64 / req.min_staff.max(1) as f64;
                (ratio, req.clone())
            })
            .collect();

        scored.sort_by(|(ratio_a, req_a), (ratio_b, req_b)| {
            ratio_a
                .partial_cmp(ratio_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(req_b.min_staff.cmp(&req_a.min_staff))
        });

        scored.into_iter().map(|(_, req)| req).collect()
    }

    fn cover_single_requirement(&mut self, req: &CoverageRequirement) {
        let date = self.context.day_date(req.day_of_week);
        let window_start = date.and_time(req.start_time);
        let window_end = date.and_time(req.end_time);

        let mut current = window_start;
        while current < window_end {
            let present =
                shifts_covering_instant(&self.shifts, current, Some(req.department_id)).len()
                    as u32;
            if present < req.min_staff {
                let needed = req.min_staff - present;
                for _ in 0..needed {
                    if let Some(shift) =
                        self.find_best_shift_for_time(current, req.department_id)
                    {
                        self.add_shift(shift);
                    }
                }
            }
            current += Duration::minutes(STEP_MINUTES);
        }
    }

    // ---- candidate enumeration ----

    /// Best-scoring shift that covers `target` inside the window, over all
    /// (employee, length, start) candidates. Ties break on palette position
    /// and then the earliest start.
    fn find_best_shift_for_time(
        &self,
        target: NaiveDateTime,
        department_id: DepartmentId,
    ) -> Option<Shift> {
        let mut best: Option<Candidate> = None;

        for emp in &self.context.employees {
            if !emp.works_in(department_id) {
                continue;
            }
            self.consider_employee_candidates(emp, department_id, target, 0.0, &mut best);
        }

        best.map(|c| c.shift)
    }

    /// Enumerate every feasible (length, start) pair for one employee and
    /// keep the winner in `best`.
    fn consider_employee_candidates(
        &self,
        emp: &Employee,
        department_id: DepartmentId,
        target: NaiveDateTime,
        extra_score: f64,
        best: &mut Option<Candidate>,
    ) {
        let day_of_week = (target.date() - self.context.week_start).num_days();
        if !(0..7).contains(&day_of_week) {
            return;
        }
        let day_of_week = day_of_week as u8;

        if self.worked_day(emp.id, day_of_week) {
            return;
        }
        if !self.has_sufficient_rest(emp.id, target.date()) {
            return;
        }

        let day_start = target.date().and_time(self.options.day_start_time());
        let day_end = target.date().and_time(self.options.day_end_time());

        for (position, &length_hours) in palette(emp.is_manager).iter().enumerate() {
            let length = Duration::hours(length_hours as i64);

            // The shift must cover the target instant and stay within the day.
            let earliest = (target - length + Duration::minutes(STEP_MINUTES)).max(day_start);
            let latest = (day_end - length).min(target);
            if earliest > latest {
                continue;
            }

            let mut start = earliest;
            while start <= latest {
                let end = start + length;
                let (ok, _) = can_work(
                    emp,
                    start,
                    end,
                    department_id,
                    &self.context.availability_rules,
                    &self.context.time_off_requests,
                    &self.shifts,
                );
                if ok {
                    let shift = Shift {
                        employee_id: emp.id,
                        store_id: self.context.store_id,
                        department_id,
                        start_datetime: start,
                        end_datetime: end,
                    };
                    let score = self.score_shift(&shift, emp, department_id) + extra_score;
                    let candidate = Candidate {
                        score,
                        palette_position: position,
                        shift,
                    };
                    if candidate.beats(best.as_ref()) {
                        *best = Some(candidate);
                    }
                }
                start += Duration::minutes(STEP_MINUTES);
            }
        }
    }

    // ---- phase 2: roles ----

    fn satisfy_role_requirements(&mut self) {
        let requirements = self.context.role_requirements.clone();
        for req in &requirements {
            self.satisfy_single_role_requirement(req);
        }
    }

    fn satisfy_single_role_requirement(&mut self, req: &RoleRequirement) {
        let employee_map = self.context.employee_map();

        for day in req.applicable_days() {
            let date = self.context.day_date(day);
            let window_start = date.and_time(req.start_time);
            let window_end = date.and_time(req.end_time);

            let mut current = window_start;
            while current < window_end {
                if !role_met_at(&self.shifts, &employee_map, req, current) {
                    if let Some(shift) = self.find_role_shift(req, current) {
                        self.add_shift(shift);
                    }
                }
                current += Duration::minutes(STEP_MINUTES);
            }
        }
    }

    /// Like `find_best_shift_for_time` but restricted to employees with the
    /// demanded capability, with the department taken from the requirement
    /// or falling back to the employee's primary (or first) department.
    fn find_role_shift(&self, req: &RoleRequirement, target: NaiveDateTime) -> Option<Shift> {
        let mut best: Option<Candidate> = None;

        for emp in &self.context.employees {
            if req.requires_keyholder && !emp.is_keyholder {
                continue;
            }
            if req.requires_manager && !emp.is_manager {
                continue;
            }

            let department_id = match req.department_id {
                Some(dept) => {
                    if !emp.works_in(dept) {
                        continue;
                    }
                    dept
                }
                None => match emp.primary_or_first_department() {
                    Some(dept) => dept,
                    None => continue,
                },
            };

            self.consider_employee_candidates(
                emp,
                department_id,
                target,
                SCORE_ROLE_MATCH,
                &mut best,
            );
        }

        best.map(|c| c.shift)
    }

    // ---- phase 3: contracted hours ----

    fn fill_contracted_hours(&mut self) {
        for _ in 0..FILL_PASSES {
            let mut needing: Vec<(Employee, f64)> = self
                .context
                .employees
                .iter()
                .filter_map(|emp| {
                    let assigned = self.hours.get(&emp.id).copied().unwrap_or(0.0);
                    let needed = emp.contracted_weekly_hours as f64 - assigned;
                    if needed > 0.0 {
                        Some((emp.clone(), needed))
                    } else {
                        None
                    }
                })
                .collect();

            if needing.is_empty() {
                break;
            }

            needing.sort_by(|(_, a), (_, b)| {
                b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal)
            });

            for (emp, needed) in needing {
                self.fill_employee_hours(&emp, needed);
            }
        }
    }

    fn fill_employee_hours(&mut self, emp: &Employee, mut needed: f64) {
        let mut lengths: Vec<u32> = palette(emp.is_manager).to_vec();
        lengths.sort_unstable_by(|a, b| b.cmp(a));

        for day in 0..7u8 {
            if needed <= 0.0 {
                break;
            }
            if self.worked_day(emp.id, day) {
                continue;
            }

            let date = self.context.day_date(day);
            if !self.has_sufficient_rest(emp.id, date) {
                continue;
            }

            for &length_hours in &lengths {
                if let Some(shift) = self.find_open_shift(emp, date, length_hours) {
                    needed -= shift.duration_hours();
                    self.add_shift(shift);
                    break;
                }
            }
        }
    }

    /// First workable slot on a free day, primary department first and then
    /// the rest in declared order, sweeping hourly starts within day bounds.
    fn find_open_shift(&self, emp: &Employee, date: NaiveDate, length_hours: u32) -> Option<Shift> {
        let length = Duration::hours(length_hours as i64);

        let mut departments: Vec<DepartmentId> = Vec::new();
        if let Some(primary) = emp.primary_department_id {
            departments.push(primary);
        }
        for dept in &emp.department_ids {
            if !departments.contains(dept) {
                departments.push(*dept);
            }
        }

        let last_start_hour = self.options.day_end_hour.checked_sub(length_hours)?;
        for dept in departments {
            for hour in self.options.day_start_hour..=last_start_hour {
                let start = date.and_hms_opt(hour, 0, 0)?;
                let end = start + length;
                let (ok, _) = can_work(
                    emp,
                    start,
                    end,
                    dept,
                    &self.context.availability_rules,
                    &self.context.time_off_requests,
                    &self.shifts,
                );
                if ok {
                    return Some(Shift {
                        employee_id: emp.id,
                        store_id: self.context.store_id,
                        department_id: dept,
                        start_datetime: start,
                        end_datetime: end,
                    });
                }
            }
        }

        None
    }

    // ---- feasibility and scoring ----

    fn worked_day(&self, employee_id: EmployeeId, day_of_week: u8) -> bool {
        self.days_worked
            .get(&employee_id)
            .map_or(false, |days| days.contains(&day_of_week))
    }

    /// Conservative inter-day rest check against the day bounds: a shift on
    /// the previous day must end at least `min_rest_hours` before the day
    /// opens, and one on the next day must start at least that long after
    /// the day closes.
    fn has_sufficient_rest(&self, employee_id: EmployeeId, target_date: NaiveDate) -> bool {
        let min_rest = Duration::hours(self.options.min_rest_hours as i64);
        let day_start = target_date.and_time(self.options.day_start_time());
        let day_end = target_date.and_time(self.options.day_end_time());

        for shift in &self.shifts {
            if shift.employee_id != employee_id {
                continue;
            }
            let shift_date = shift.start_datetime.date();

            if shift_date == target_date - Duration::days(1)
                && day_start - shift.end_datetime < min_rest
            {
                return false;
            }
            if shift_date == target_date + Duration::days(1)
                && shift.start_datetime - day_end < min_rest
            {
                return false;
            }
        }

        true
    }

    fn score_shift(&self, shift: &Shift, employee: &Employee, department_id: DepartmentId) -> f64 {
        let mut score = 0.0;

        // Departments with a higher staffing floor are worth more.
        let dept_min_staff = self
            .context
            .coverage_requirements
            .iter()
            .filter(|req| req.department_id == department_id)
            .map(|req| req.min_staff)
            .max()
            .unwrap_or(1);
        score += dept_min_staff as f64 * SCORE_DEPT_NEED_PER_STAFF;

        if Some(department_id) == employee.primary_department_id {
            score += SCORE_PRIMARY_DEPT;
        } else {
            score += SCORE_NON_PRIMARY_DEPT;
        }

        let availability = classify(
            employee.id,
            shift.day_of_week(),
            shift.start_datetime.time(),
            shift.end_datetime.time(),
            &self.context.availability_rules,
        );
        match availability {
            Some(AvailabilityType::Preferred) => score += SCORE_PREFERRED,
            Some(AvailabilityType::Available) => score += SCORE_AVAILABLE,
            _ => {}
        }

        let duration = shift.duration_hours();
        score += shift_length_score(duration as u32);

        let current = self.hours.get(&employee.id).copied().unwrap_or(0.0);
        let contracted = employee.contracted_weekly_hours as f64;
        let needed = contracted - current;
        if needed > 0.0 {
            score += SCORE_FILLS_NEEDED_PER_HOUR * duration.min(needed);
        }
        let overtime = (current + duration - contracted).max(0.0);
        score += SCORE_OVERTIME_PER_HOUR * overtime;

        let days = self
            .days_worked
            .get(&employee.id)
            .map_or(0, |days| days.len());
        if days >= 5 {
            score += SCORE_FIVE_PLUS_DAYS;
        } else if days == 4 {
            score += SCORE_FOUR_DAYS;
        }

        score
    }

    fn add_shift(&mut self, shift: Shift) {
        *self.hours.entry(shift.employee_id).or_default() += shift.duration_hours();
        self.days_worked
            .entry(shift.employee_id)
            .or_default()
            .insert(shift.day_of_week());
        self.shifts.push(shift);
    }

    // ---- result ----

    fn build_result(self, warnings: Vec<String>) -> ScheduleResult {
        let report = validate_schedule(self.context, &self.shifts);

        let existing_keys: HashSet<(EmployeeId, NaiveDateTime, NaiveDateTime)> = self
            .context
            .existing_shifts
            .iter()
            .map(|s| (s.employee_id, s.start_datetime, s.end_datetime))
            .collect();
        let new_shifts: Vec<Shift> = self
            .shifts
            .into_iter()
            .filter(|s| !existing_keys.contains(&(s.employee_id, s.start_datetime, s.end_datetime)))
            .collect();

        let result = report.into_result(new_shifts, warnings);
        tracing::info!(
            new_shifts = result.shifts.len(),
            success = result.success,
            "greedy solve finished"
        );
        result
    }
}

struct Candidate {
    score: f64,
    palette_position: usize,
    shift: Shift,
}

impl Candidate {
    /// Lexicographic: higher score, then earlier palette position, then
    /// earlier start.
    fn beats(&self, other: Option<&Candidate>) -> bool {
        match other {
            None => true,
            Some(other) => {
                if self.score != other.score {
                    self.score > other.score
                } else if self.palette_position != other.palette_position {
                    self.palette_position < other.palette_position
                } else {
                    self.shift.start_datetime < other.shift.start_datetime
                }
            }
        }
    }
}
