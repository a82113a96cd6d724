//! Exact solver on a CP backend.
//!
//! Discretises the week into fixed-length slots, creates one boolean
//! decision variable per admissible (employee, day, start-slot, length,
//! department) tuple, imposes the per-day and inter-day-rest rules as hard
//! constraints, and expresses everything else as a weighted objective that
//! the backend maximises. Unmet collections are always recomputed by the
//! validator so both solvers report identically.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveTime;
use selen::prelude::*;
use shared::{AvailabilityType, DepartmentId, DomainError, DomainResult, EmployeeId};

use crate::domain::availability::{classify, is_on_time_off, ranges_overlap};
use crate::domain::entities::{Employee, ScheduleContext, ScheduleResult, Shift};
use crate::domain::validation::validate_schedule;

use super::scheduler::Solver;
use super::solver_options::SolverOptions;

/// Decision-variable coordinates: one candidate shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VarKey {
    employee_id: EmployeeId,
    day: u8,
    start_slot: u32,
    length_slots: u32,
    department_id: DepartmentId,
}

impl VarKey {
    fn covers_slot(&self, slot: u32) -> bool {
        self.start_slot <= slot && slot < self.start_slot + self.length_slots
    }
}

pub struct CpSolver {
    options: SolverOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl CpSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Cooperative cancellation flag, checked before model construction and
    /// before extraction.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    fn slot_to_time(&self, slot: u32) -> NaiveTime {
        let total_minutes = self.options.day_start_hour * 60 + slot * self.options.slot_duration_minutes;
        NaiveTime::from_hms_opt(total_minutes / 60, total_minutes % 60, 0)
            .expect("slot within the day window")
    }

    fn time_to_slot(&self, t: NaiveTime) -> i64 {
        use chrono::Timelike;
        let total_minutes = (t.hour() * 60 + t.minute()) as i64;
        let start_minutes = (self.options.day_start_hour * 60) as i64;
        (total_minutes - start_minutes) / self.options.slot_duration_minutes as i64
    }

    /// Requirement window clamped onto the slot grid of one day.
    fn window_slots(&self, start: NaiveTime, end: NaiveTime) -> (u32, u32) {
        let slots_per_day = self.options.slots_per_day() as i64;
        let start_slot = self.time_to_slot(start).clamp(0, slots_per_day);
        let end_slot = self.time_to_slot(end).clamp(0, slots_per_day);
        (start_slot as u32, end_slot as u32)
    }

    fn minute_aligned(&self, t: NaiveTime) -> bool {
        use chrono::Timelike;
        t.minute() % self.options.slot_duration_minutes == 0
    }

    /// Per-slot availability and preference grids for one employee,
    /// folding in availability rules, time off, and existing shifts.
    fn availability_matrix(
        &self,
        employee: &Employee,
        context: &ScheduleContext,
    ) -> (Vec<Vec<bool>>, Vec<Vec<bool>>) {
        let slots_per_day = self.options.slots_per_day() as usize;
        let mut available = vec![vec![false; slots_per_day]; 7];
        let mut preferred = vec![vec![false; slots_per_day]; 7];

        for day in 0..7u8 {
            let date = context.day_date(day);
            for slot in 0..slots_per_day as u32 {
                let slot_start = self.slot_to_time(slot);
                let slot_end = self.slot_to_time(slot + 1);

                let avail = classify(
                    employee.id,
                    day,
                    slot_start,
                    slot_end,
                    &context.availability_rules,
                );
                if avail == Some(AvailabilityType::Unavailable) {
                    continue;
                }

                let slot_start_dt = date.and_time(slot_start);
                let slot_end_dt = date.and_time(slot_end);

                if is_on_time_off(
                    employee.id,
                    slot_start_dt,
                    slot_end_dt,
                    &context.time_off_requests,
                ) {
                    continue;
                }

                let conflicts = context.existing_shifts.iter().any(|existing| {
                    existing.employee_id == employee.id
                        && ranges_overlap(
                            slot_start_dt,
                            slot_end_dt,
                            existing.start_datetime,
                            existing.end_datetime,
                        )
                });
                if conflicts {
                    continue;
                }

                available[day as usize][slot as usize] = true;
                if avail == Some(AvailabilityType::Preferred) {
                    preferred[day as usize][slot as usize] = true;
                }
            }
        }

        (available, preferred)
    }

    /// Upper bound on the variable count before any model is built.
    fn projected_variable_count(&self, context: &ScheduleContext) -> usize {
        let slots_per_day = self.options.slots_per_day() as usize;
        context
            .employees
            .iter()
            .map(|emp| {
                let lengths = self.options.valid_shift_lengths_slots(emp.is_manager).len();
                7 * slots_per_day * lengths * emp.department_ids.len()
            })
            .sum()
    }

    /// Window misalignment warnings for the current slot grid.
    fn alignment_warnings(&self, context: &ScheduleContext) -> Vec<String> {
        let mut warnings = Vec::new();
        for req in &context.coverage_requirements {
            if !self.minute_aligned(req.start_time) || !self.minute_aligned(req.end_time) {
                warnings.push(format!(
                    "coverage requirement {} window is not aligned to {}-minute slots",
                    req.id, self.options.slot_duration_minutes
                ));
            }
        }
        for req in &context.role_requirements {
            if !self.minute_aligned(req.start_time) || !self.minute_aligned(req.end_time) {
                warnings.push(format!(
                    "role requirement {} window is not aligned to {}-minute slots",
                    req.id, self.options.slot_duration_minutes
                ));
            }
        }
        warnings
    }

    fn degraded_result(
        &self,
        context: &ScheduleContext,
        mut warnings: Vec<String>,
        reason: String,
    ) -> ScheduleResult {
        tracing::warn!(reason = %reason, "cp solve degraded to empty proposal");
        warnings.push(reason);
        let report = validate_schedule(context, &context.existing_shifts);
        report.into_result(Vec::new(), warnings)
    }
}

impl Solver for CpSolver {
    fn solve(&self, context: &ScheduleContext) -> DomainResult<ScheduleResult> {
        if self.options.slot_duration_minutes == 0 || 60 % self.options.slot_duration_minutes != 0
        {
            return Err(DomainError::InvalidInput(format!(
                "slot duration {} does not divide 60",
                self.options.slot_duration_minutes
            )));
        }
        if self.options.day_end_hour > 23
            || self.options.day_start_hour >= self.options.day_end_hour
        {
            return Err(DomainError::InvalidInput(format!(
                "Day window {}:00-{}:00 is not a valid wall-clock range",
                self.options.day_start_hour, self.options.day_end_hour
            )));
        }

        let projected = self.projected_variable_count(context);
        if projected > self.options.variable_cap {
            return Err(DomainError::CapacityExceeded(format!(
                "projected {} decision variables exceed cap {}",
                projected, self.options.variable_cap
            )));
        }

        tracing::info!(
            store_id = %context.store_id,
            week_start = %context.week_start,
            employees = context.employees.len(),
            projected_variables = projected,
            "cp solve started"
        );

        let mut warnings = self.alignment_warnings(context);

        if self.is_cancelled() {
            return Ok(self.degraded_result(
                context,
                warnings,
                "solve cancelled before model construction".to_string(),
            ));
        }

        let slots_per_day = self.options.slots_per_day();
        let slots_per_hour = self.options.slots_per_hour() as i32;
        let weights = &self.options.weights;

        let existing_hours: HashMap<EmployeeId, f64> = context
            .employees
            .iter()
            .map(|emp| {
                let hours: f64 = context
                    .existing_shifts
                    .iter()
                    .filter(|s| s.employee_id == emp.id)
                    .map(|s| s.duration_hours())
                    .sum();
                (emp.id, hours)
            })
            .collect();
        let existing_days: HashMap<EmployeeId, HashSet<u8>> = context
            .employees
            .iter()
            .map(|emp| {
                let days = context
                    .existing_shifts
                    .iter()
                    .filter(|s| s.employee_id == emp.id)
                    .map(|s| s.day_of_week())
                    .collect();
                (emp.id, days)
            })
            .collect();

        // With no demand at all there is nothing to optimise
        let nothing_to_schedule = context.coverage_requirements.is_empty()
            && context.role_requirements.is_empty()
            && context.employees.iter().all(|emp| {
                existing_hours[&emp.id] >= emp.contracted_weekly_hours as f64
            });
        if nothing_to_schedule {
            tracing::debug!("no coverage, role, or hour demand; returning empty proposal");
            let report = validate_schedule(context, &context.existing_shifts);
            return Ok(report.into_result(Vec::new(), warnings));
        }

        let employee_map = context.employee_map();
        let mut availability = HashMap::new();
        let mut preferred = HashMap::new();
        for emp in &context.employees {
            let (avail, pref) = self.availability_matrix(emp, context);
            availability.insert(emp.id, avail);
            preferred.insert(emp.id, pref);
        }

        let config = SolverConfig::default()
            .with_timeout_ms(self.options.cpsat_time_budget_seconds * 1000);
        let mut m = Model::with_config(config);

        // ---- decision variables ----
        let mut shift_vars: Vec<(VarKey, VarId)> = Vec::new();
        for emp in &context.employees {
            let avail = &availability[&emp.id];
            let lengths = self.options.valid_shift_lengths_slots(emp.is_manager);

            for day in 0..7u8 {
                // Days already holding an existing shift are skipped outright
                if existing_days[&emp.id].contains(&day) {
                    continue;
                }
                for start_slot in 0..slots_per_day {
                    for &length in &lengths {
                        let end_slot = start_slot + length;
                        if end_slot > slots_per_day {
                            continue;
                        }
                        let all_free = (start_slot..end_slot)
                            .all(|slot| avail[day as usize][slot as usize]);
                        if !all_free {
                            continue;
                        }
                        for &dept in &emp.department_ids {
                            let key = VarKey {
                                employee_id: emp.id,
                                day,
                                start_slot,
                                length_slots: length,
                                department_id: dept,
                            };
                            shift_vars.push((key, m.int(0, 1)));
                        }
                    }
                }
            }
        }

        tracing::debug!(variables = shift_vars.len(), "cp model variables created");

        if shift_vars.is_empty() {
            return Ok(self.degraded_result(
                context,
                warnings,
                "no admissible shift candidates for any employee".to_string(),
            ));
        }

        let emp_day_vars = |employee_id: EmployeeId, day: u8| -> Vec<(VarKey, VarId)> {
            shift_vars
                .iter()
                .filter(|(key, _)| key.employee_id == employee_id && key.day == day)
                .copied()
                .collect()
        };

        // ---- hard constraints ----

        // At most one new shift per employee per day, across departments
        for emp in &context.employees {
            for day in 0..7u8 {
                let day_vars: Vec<VarId> = emp_day_vars(emp.id, day)
                    .into_iter()
                    .map(|(_, var)| var)
                    .collect();
                if day_vars.len() > 1 {
                    let day_sum = m.sum(&day_vars);
                    m.c(day_sum).le(int(1));
                }
            }
        }

        // Inter-day rest, wrapping midnight in real minutes
        let day_start_minutes = (self.options.day_start_hour * 60) as i64;
        let slot_minutes = self.options.slot_duration_minutes as i64;
        let min_rest_minutes = (self.options.min_rest_hours * 60) as i64;
        let end_minutes_of = |key: &VarKey| -> i64 {
            day_start_minutes + (key.start_slot + key.length_slots) as i64 * slot_minutes
        };
        let start_minutes_of =
            |key: &VarKey| -> i64 { day_start_minutes + key.start_slot as i64 * slot_minutes };

        for emp in &context.employees {
            for day in 0..6u8 {
                let today = emp_day_vars(emp.id, day);
                let tomorrow = emp_day_vars(emp.id, day + 1);

                for (key1, var1) in &today {
                    let end_today = end_minutes_of(key1);
                    for (key2, var2) in &tomorrow {
                        let rest = (24 * 60 - end_today) + start_minutes_of(key2);
                        if rest < min_rest_minutes {
                            let pair = m.sum(&[*var1, *var2]);
                            m.c(pair).le(int(1));
                        }
                    }
                }

                // Existing shifts exclude candidates one-sidedly
                for existing in &context.existing_shifts {
                    if existing.employee_id != emp.id {
                        continue;
                    }
                    if existing.day_of_week() == day {
                        use chrono::Timelike;
                        let end_today = (existing.end_datetime.time().hour() * 60
                            + existing.end_datetime.time().minute())
                            as i64;
                        for (key2, var2) in &tomorrow {
                            let rest = (24 * 60 - end_today) + start_minutes_of(key2);
                            if rest < min_rest_minutes {
                                m.c(*var2).eq(int(0));
                            }
                        }
                    }
                    if existing.day_of_week() == day + 1 {
                        use chrono::Timelike;
                        let start_tomorrow = (existing.start_datetime.time().hour() * 60
                            + existing.start_datetime.time().minute())
                            as i64;
                        for (key1, var1) in &today {
                            let rest = (24 * 60 - end_minutes_of(key1)) + start_tomorrow;
                            if rest < min_rest_minutes {
                                m.c(*var1).eq(int(0));
                            }
                        }
                    }
                }
            }
        }

        // ---- soft constraints (objective terms) ----
        fn weighted(m: &mut Model, var: VarId, weight: i32) -> VarId {
            let coefficient = m.int(weight, weight);
            m.mul(var, coefficient)
        }
        fn constant(m: &mut Model, value: i32) -> VarId {
            m.int(value, value)
        }
        let mut objective_terms: Vec<VarId> = Vec::new();

        // Coverage demand per sampled slot
        for req in &context.coverage_requirements {
            let (req_start, req_end) = self.window_slots(req.start_time, req.end_time);
            let date = context.day_date(req.day_of_week);

            for slot in req_start..req_end {
                let slot_dt = date.and_time(self.slot_to_time(slot));
                let existing_coverage = context
                    .existing_shifts
                    .iter()
                    .filter(|s| s.department_id == req.department_id && s.covers(slot_dt))
                    .count() as u32;

                if req.min_staff <= existing_coverage {
                    continue;
                }
                let needed = (req.min_staff - existing_coverage) as i32;

                let covering: Vec<VarId> = shift_vars
                    .iter()
                    .filter(|(key, _)| {
                        key.day == req.day_of_week
                            && key.department_id == req.department_id
                            && key.covers_slot(slot)
                    })
                    .map(|(_, var)| *var)
                    .collect();

                if covering.is_empty() {
                    // Nothing can cover this sample; keep instances ranked
                    let penalty = weights.unmet_coverage_slot * needed;
                    let term = constant(&mut m, penalty);
                    objective_terms.push(term);
                    continue;
                }

                let slack = m.int(0, needed);
                let covered = m.sum(&covering);
                let total = m.add(covered, slack);
                m.c(total).ge(int(needed));
                let term = weighted(&mut m, slack, weights.unmet_coverage_slot);
                objective_terms.push(term);
            }
        }

        // Role demand per sampled slot
        for req in &context.role_requirements {
            let (req_start, req_end) = self.window_slots(req.start_time, req.end_time);

            for day in req.applicable_days() {
                let date = context.day_date(day);
                for slot in req_start..req_end {
                    let slot_dt = date.and_time(self.slot_to_time(slot));

                    let mut existing_keyholders = 0u32;
                    let mut existing_managers = 0u32;
                    for s in &context.existing_shifts {
                        if !s.covers(slot_dt) {
                            continue;
                        }
                        if let Some(emp) = employee_map.get(&s.employee_id) {
                            if emp.is_keyholder {
                                existing_keyholders += 1;
                            }
                            if emp.is_manager {
                                existing_managers += 1;
                            }
                        }
                    }

                    if req.requires_keyholder && existing_keyholders == 0 {
                        let keyholder_vars: Vec<VarId> = shift_vars
                            .iter()
                            .filter(|(key, _)| {
                                key.day == day
                                    && key.covers_slot(slot)
                                    && employee_map
                                        .get(&key.employee_id)
                                        .is_some_and(|e| e.is_keyholder)
                            })
                            .map(|(_, var)| *var)
                            .collect();

                        if keyholder_vars.is_empty() {
                            let term = constant(&mut m, weights.unmet_role_slot);
                            objective_terms.push(term);
                        } else {
                            let slack = m.int(0, 1);
                            let present = m.sum(&keyholder_vars);
                            let total = m.add(present, slack);
                            m.c(total).ge(int(1));
                            let term = weighted(&mut m, slack, weights.unmet_role_slot);
                            objective_terms.push(term);
                        }
                    }

                    if req.requires_manager && req.min_manager_count > existing_managers {
                        let needed = (req.min_manager_count - existing_managers) as i32;
                        let manager_vars: Vec<VarId> = shift_vars
                            .iter()
                            .filter(|(key, _)| {
                                key.day == day
                                    && key.covers_slot(slot)
                                    && employee_map
                                        .get(&key.employee_id)
                                        .is_some_and(|e| e.is_manager)
                            })
                            .map(|(_, var)| *var)
                            .collect();

                        if manager_vars.is_empty() {
                            let term = constant(&mut m, weights.unmet_role_slot * needed);
                            objective_terms.push(term);
                        } else {
                            let slack = m.int(0, needed);
                            let present = m.sum(&manager_vars);
                            let total = m.add(present, slack);
                            m.c(total).ge(int(needed));
                            let term = weighted(&mut m, slack, weights.unmet_role_slot);
                            objective_terms.push(term);
                        }
                    }
                }
            }
        }

        // Contracted hours and overtime, in slots scaled back to hours
        let shortfall_weight = weights
            .unmet_contracted_hour
            .div_euclid(slots_per_hour);
        let overtime_weight = weights.overtime_hour.div_euclid(slots_per_hour);
        for emp in &context.employees {
            let scaled: Vec<VarId> = shift_vars
                .iter()
                .filter(|(key, _)| key.employee_id == emp.id)
                .map(|(key, var)| weighted(&mut m, *var, key.length_slots as i32))
                .collect();
            if scaled.is_empty() {
                continue;
            }
            let total_new = m.sum(&scaled);

            let contracted_slots =
                (emp.contracted_weekly_hours as i32) * slots_per_hour;
            let existing_slots =
                (existing_hours[&emp.id] * slots_per_hour as f64).round() as i32;

            let needed_slots = contracted_slots - existing_slots;
            if needed_slots > 0 {
                let shortfall = m.int(0, needed_slots);
                let filled = m.add(total_new, shortfall);
                m.c(filled).ge(int(needed_slots));
                let term = weighted(&mut m, shortfall, shortfall_weight);
                objective_terms.push(term);
            }

            let horizon = (7 * slots_per_day) as i32;
            let overtime = m.int(0, horizon);
            let margin = m.sub(overtime, total_new);
            m.c(margin).ge(int(existing_slots - contracted_slots));
            let term = weighted(&mut m, overtime, overtime_weight);
            objective_terms.push(term);
        }

        // Per-shift bonuses: department preference, fully-preferred window,
        // and length preference
        for (key, var) in &shift_vars {
            let emp = employee_map[&key.employee_id];

            let dept_weight = if Some(key.department_id) == emp.primary_department_id {
                weights.primary_department
            } else {
                weights.non_primary_department
            };
            let term = weighted(&mut m, *var, dept_weight);
            objective_terms.push(term);

            let pref = &preferred[&key.employee_id];
            let all_preferred = (key.start_slot..key.start_slot + key.length_slots)
                .all(|slot| pref[key.day as usize][slot as usize]);
            if all_preferred {
                let term = weighted(&mut m, *var, weights.preferred_window);
                objective_terms.push(term);
            }

            let hours = key.length_slots / self.options.slots_per_hour();
            let term = weighted(&mut m, *var, weights.shift_length_bonus(hours));
            objective_terms.push(term);
        }

        // ---- solve ----
        let objective = m.sum(&objective_terms);
        let solution = match m.maximize(objective) {
            Ok(solution) => solution,
            Err(err) => {
                return Ok(self.degraded_result(
                    context,
                    warnings,
                    format!("CP backend returned no schedule: {err:?}"),
                ));
            }
        };

        if self.is_cancelled() {
            warnings.push("solve cancelled before extraction".to_string());
        }

        // ---- extraction ----
        let new_shifts: Vec<Shift> = shift_vars
            .iter()
            .filter(|(_, var)| solution.get::<i32>(*var) == 1)
            .map(|(key, _)| {
                let date = context.day_date(key.day);
                Shift {
                    employee_id: key.employee_id,
                    store_id: context.store_id,
                    department_id: key.department_id,
                    start_datetime: date.and_time(self.slot_to_time(key.start_slot)),
                    end_datetime: date
                        .and_time(self.slot_to_time(key.start_slot + key.length_slots)),
                }
            })
            .collect();

        let mut all_shifts = new_shifts.clone();
        all_shifts.extend(context.existing_shifts.iter().cloned());
        let report = validate_schedule(context, &all_shifts);

        let result = report.into_result(new_shifts, warnings);
        tracing::info!(
            new_shifts = result.shifts.len(),
            success = result.success,
            "cp solve finished"
        );
        Ok(result)
    }
}
