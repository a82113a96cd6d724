use chrono::NaiveTime;

/// Soft-constraint weights for the CP solver objective. Negative values are
/// penalties, positive values bonuses.
#[derive(Debug, Clone)]
pub struct Weights {
    /// Per unmet coverage slot (applied to slack).
    pub unmet_coverage_slot: i32,
    /// Per unmet role slot (missing keyholder, or each missing manager).
    pub unmet_role_slot: i32,
    /// Per hour short of contract.
    pub unmet_contracted_hour: i32,
    /// Per hour beyond contract.
    pub overtime_hour: i32,
    /// Per picked shift in the employee's primary department.
    pub primary_department: i32,
    /// Per picked shift outside the primary department.
    pub non_primary_department: i32,
    /// Per picked shift whose every slot is preferred.
    pub preferred_window: i32,
    pub shift_8h: i32,
    pub shift_6h: i32,
    pub shift_4h: i32,
    pub shift_other: i32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            unmet_coverage_slot: -1000,
            unmet_role_slot: -1000,
            unmet_contracted_hour: -100,
            overtime_hour: -3,
            primary_department: 25,
            non_primary_department: -15,
            preferred_window: 15,
            shift_8h: 10,
            shift_6h: 8,
            shift_4h: 7,
            shift_other: 5,
        }
    }
}

impl Weights {
    /// Bonus for a shift of the given whole-hour length.
    pub fn shift_length_bonus(&self, hours: u32) -> i32 {
        match hours {
            8 => self.shift_8h,
            6 => self.shift_6h,
            4 => self.shift_4h,
            _ => self.shift_other,
        }
    }
}

/// Tuning knobs shared by both solvers, with defaults matching the store
/// operating point.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// CP discretisation granularity; must divide 60.
    pub slot_duration_minutes: u32,
    /// Wall-clock start of the schedulable day.
    pub day_start_hour: u32,
    /// Wall-clock end of the schedulable day.
    pub day_end_hour: u32,
    /// Lower bound on every produced shift.
    pub min_shift_hours: u32,
    /// Upper bound for non-managers.
    pub max_regular_hours: u32,
    /// Upper bound for managers.
    pub max_manager_hours: u32,
    /// Minimum rest between shifts on consecutive days.
    pub min_rest_hours: u32,
    /// Wall-clock budget for the CP backend.
    pub cpsat_time_budget_seconds: u64,
    /// Hard cap on the projected CP variable count.
    pub variable_cap: usize,
    pub weights: Weights,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            slot_duration_minutes: 60,
            day_start_hour: 6,
            day_end_hour: 22,
            min_shift_hours: 4,
            max_regular_hours: 9,
            max_manager_hours: 12,
            min_rest_hours: 12,
            cpsat_time_budget_seconds: 120,
            variable_cap: 100_000,
            weights: Weights::default(),
        }
    }
}

impl SolverOptions {
    pub fn from_config(config: &crate::infrastructure::config::SolverSettings) -> Self {
        let defaults = Self::default();
        Self {
            slot_duration_minutes: config.slot_duration_minutes,
            day_start_hour: config.day_start_hour,
            day_end_hour: config.day_end_hour,
            min_shift_hours: config.min_shift_hours,
            max_regular_hours: config.max_regular_hours,
            max_manager_hours: config.max_manager_hours,
            min_rest_hours: config.min_rest_hours,
            cpsat_time_budget_seconds: config.cpsat_time_budget_seconds,
            variable_cap: config.variable_cap,
            weights: defaults.weights,
        }
    }

    pub fn slots_per_hour(&self) -> u32 {
        60 / self.slot_duration_minutes
    }

    pub fn slots_per_day(&self) -> u32 {
        (self.day_end_hour - self.day_start_hour) * self.slots_per_hour()
    }

    pub fn day_start_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.day_start_hour, 0, 0).expect("valid day start hour")
    }

    pub fn day_end_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.day_end_hour, 0, 0).expect("valid day end hour")
    }

    /// Maximum shift length in hours for the employee type.
    pub fn max_shift_hours(&self, is_manager: bool) -> u32 {
        if is_manager {
            self.max_manager_hours
        } else {
            self.max_regular_hours
        }
    }

    /// Valid CP shift lengths in slots, hourly multiples only.
    pub fn valid_shift_lengths_slots(&self, is_manager: bool) -> Vec<u32> {
        let min_slots = self.min_shift_hours * self.slots_per_hour();
        let max_slots = self.max_shift_hours(is_manager) * self.slots_per_hour();
        (min_slots..=max_slots)
            .step_by(self.slots_per_hour() as usize)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_discretisation() {
        let options = SolverOptions::default();
        assert_eq!(options.slots_per_hour(), 1);
        assert_eq!(options.slots_per_day(), 16);
    }

    #[test]
    fn test_half_hour_slots() {
        let options = SolverOptions {
            slot_duration_minutes: 30,
            ..SolverOptions::default()
        };
        assert_eq!(options.slots_per_hour(), 2);
        assert_eq!(options.slots_per_day(), 32);
        assert_eq!(
            options.valid_shift_lengths_slots(false),
            vec![8, 10, 12, 14, 16, 18]
        );
    }

    #[test]
    fn test_shift_lengths_by_role() {
        let options = SolverOptions::default();
        assert_eq!(options.valid_shift_lengths_slots(false), vec![4, 5, 6, 7, 8, 9]);
        assert_eq!(
            options.valid_shift_lengths_slots(true),
            vec![4, 5, 6, 7, 8, 9, 10, 11, 12]
        );
    }

    #[test]
    fn test_length_bonus_table() {
        let weights = Weights::default();
        assert_eq!(weights.shift_length_bonus(8), 10);
        assert_eq!(weights.shift_length_bonus(6), 8);
        assert_eq!(weights.shift_length_bonus(4), 7);
        assert_eq!(weights.shift_length_bonus(12), 5);
    }
}
