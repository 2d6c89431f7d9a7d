//! The calendar structure underpinning every model build.
//!
//! The planning horizon is a list of calendar years partitioned into contiguous
//! blocks of equal size, one block per investment stage. Operation within a
//! year is represented by a set of representative days, each standing in for a
//! number of real calendar days, and an ordered set of sub-day time steps.
use crate::scenario::ConfigurationError;
use indexmap::IndexMap;

/// A calendar year index (1-based)
pub type Year = u32;
/// An investment stage index (1-based)
pub type Stage = u32;
/// A representative day index (1-based)
pub type Day = u32;
/// A sub-day time step index (1-based)
pub type TimeStep = u32;

/// Temporal dimensions shared by the scenario and the hub model
#[derive(Clone, Debug, PartialEq)]
pub struct Calendar {
    /// Calendar years grouped into one contiguous block per investment stage
    stage_years: Vec<Vec<Year>>,
    /// Number of representative days per year
    num_days: u32,
    /// Number of time steps per representative day
    num_time_steps: u32,
    /// How many real calendar days each representative day stands for
    day_weights: IndexMap<Day, f64>,
}

impl Calendar {
    /// Build the calendar for the given horizon.
    ///
    /// The years `1..=num_years` are split into `num_stages` contiguous blocks
    /// of equal size. Days absent from `day_weights` get a weight of one.
    pub fn new(
        num_years: u32,
        num_stages: u32,
        num_days: u32,
        num_time_steps: u32,
        day_weights: IndexMap<Day, f64>,
    ) -> Result<Self, ConfigurationError> {
        if num_years == 0 || num_stages == 0 || num_days == 0 || num_time_steps == 0 {
            return Err(ConfigurationError::new(
                "Calendar dimensions must all be nonzero",
            ));
        }
        if num_years % num_stages != 0 {
            return Err(ConfigurationError::new(&format!(
                "Number of years ({num_years}) is not divisible by the number of \
                 investment stages ({num_stages})"
            )));
        }

        let block_size = num_years / num_stages;
        let stage_years = (1..=num_years)
            .collect::<Vec<_>>()
            .chunks(block_size as usize)
            .map(<[Year]>::to_vec)
            .collect();

        Ok(Self {
            stage_years,
            num_days,
            num_time_steps,
            day_weights,
        })
    }

    /// Iterate over investment stage indices
    pub fn stages(&self) -> impl Iterator<Item = Stage> + Clone {
        1..=self.stage_years.len() as Stage
    }

    /// The calendar years belonging to the given investment stage
    pub fn years_for_stage(&self, stage: Stage) -> &[Year] {
        &self.stage_years[stage as usize - 1]
    }

    /// The full horizon as one flat, ordered year sequence
    pub fn years(&self) -> impl Iterator<Item = Year> + Clone {
        1..=self.num_years()
    }

    /// Total number of calendar years in the horizon
    pub fn num_years(&self) -> u32 {
        self.stage_years.iter().map(Vec::len).sum::<usize>() as u32
    }

    /// The final calendar year of the horizon
    pub fn last_year(&self) -> Year {
        self.num_years()
    }

    /// Iterate over representative day indices
    pub fn days(&self) -> impl Iterator<Item = Day> + Clone {
        1..=self.num_days
    }

    /// Iterate over time step indices
    pub fn time_steps(&self) -> impl Iterator<Item = TimeStep> + Clone {
        1..=self.num_time_steps
    }

    /// The last time step of a representative day
    pub fn last_time_step(&self) -> TimeStep {
        self.num_time_steps
    }

    /// The last representative day index
    pub fn last_day(&self) -> Day {
        self.num_days
    }

    /// The number of real calendar days represented by day `day`
    pub fn day_weight(&self, day: Day) -> f64 {
        self.day_weights.get(&day).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use itertools::assert_equal;

    #[test]
    fn test_calendar_stage_blocks() {
        let calendar = Calendar::new(4, 2, 14, 24, IndexMap::new()).unwrap();
        assert_equal(calendar.stages(), 1..=2);
        assert_eq!(calendar.years_for_stage(1), &[1, 2]);
        assert_eq!(calendar.years_for_stage(2), &[3, 4]);
        assert_equal(calendar.years(), 1..=4);
        assert_eq!(calendar.last_year(), 4);
    }

    #[test]
    fn test_calendar_indivisible_years() {
        assert!(Calendar::new(5, 2, 14, 24, IndexMap::new()).is_err());
    }

    #[test]
    fn test_calendar_zero_dimension() {
        assert!(Calendar::new(4, 2, 0, 24, IndexMap::new()).is_err());
    }

    #[test]
    fn test_day_weight_default() {
        let weights = [(1, 30.0)].into_iter().collect();
        let calendar = Calendar::new(2, 1, 2, 24, weights).unwrap();
        assert_approx_eq!(f64, calendar.day_weight(1), 30.0);
        assert_approx_eq!(f64, calendar.day_weight(2), 1.0);
    }
}
