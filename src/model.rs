//! MILP construction for the energy hub.
//!
//! A [`HubModel`] wraps one immutable scenario, precomputes the derived
//! technology parameters and builds a fresh optimisation problem for a chosen
//! objective. The problem is rebuilt for every solve, so successive solves of
//! the orchestrator never share solver state.
use crate::calendar::{Stage, Year};
use crate::finance::{salvage_fraction, total_degradation};
use crate::scenario::Scenario;
use crate::technology::TechnologyID;
use highs::RowProblem as Problem;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::collections::HashMap;

pub mod constraints;
pub mod variables;

use variables::VariableMap;

/// The scalar objective to minimise; never both at once
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Objective {
    /// Total discounted system cost
    Cost,
    /// Total carbon emissions from imports
    Carbon,
}

/// How operation within a year is represented
#[derive(Clone, Copy, Debug, PartialEq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum)]
pub enum TemporalResolution {
    /// Independent representative days, storage cyclic within each day
    #[string = "typical-days"]
    TypicalDays,
    /// Consecutive days, storage chained across days and cyclic over the year
    #[string = "full-horizon"]
    FullHorizon,
}

/// One scenario with its derived parameters, ready to build MILP instances
pub struct HubModel<'a> {
    /// The parameter set being modelled
    pub scenario: &'a Scenario,
    /// How operation within a year is represented
    pub temporal: TemporalResolution,
    conversion_degradation: HashMap<(TechnologyID, Stage, Year), f64>,
    storage_degradation: HashMap<(TechnologyID, Stage, Year), f64>,
    conversion_salvage: HashMap<(TechnologyID, Stage), f64>,
    storage_salvage: HashMap<(TechnologyID, Stage), f64>,
}

impl<'a> HubModel<'a> {
    /// Precompute degradation and salvage parameters for every technology/stage
    pub fn new(scenario: &'a Scenario, temporal: TemporalResolution) -> Self {
        let calendar = &scenario.calendar;
        let last_year = calendar.last_year();
        let rate = scenario.discount_rate;

        let mut conversion_degradation = HashMap::new();
        let mut conversion_salvage = HashMap::new();
        for tech in &scenario.conversion_techs {
            for stage in calendar.stages() {
                conversion_salvage.insert(
                    (tech.id.clone(), stage),
                    salvage_fraction(last_year, stage, tech.lifetime, rate),
                );
                for year in calendar.years() {
                    conversion_degradation.insert(
                        (tech.id.clone(), stage, year),
                        total_degradation(tech.yearly_degradation, tech.lifetime, stage, year),
                    );
                }
            }
        }

        let mut storage_degradation = HashMap::new();
        let mut storage_salvage = HashMap::new();
        for tech in &scenario.storage_techs {
            for stage in calendar.stages() {
                storage_salvage.insert(
                    (tech.id.clone(), stage),
                    salvage_fraction(last_year, stage, tech.lifetime, rate),
                );
                for year in calendar.years() {
                    storage_degradation.insert(
                        (tech.id.clone(), stage, year),
                        total_degradation(tech.yearly_degradation, tech.lifetime, stage, year),
                    );
                }
            }
        }

        Self {
            scenario,
            temporal,
            conversion_degradation,
            storage_degradation,
            conversion_salvage,
            storage_salvage,
        }
    }

    /// Derating of a conversion technology installed in `stage` during `year`
    pub fn conversion_degradation(&self, tech: &TechnologyID, stage: Stage, year: Year) -> f64 {
        self.conversion_degradation
            .get(&(tech.clone(), stage, year))
            .copied()
            .unwrap_or(1.0)
    }

    /// Derating of a storage's charge/discharge efficiency installed in `stage` during `year`
    pub fn storage_degradation(&self, tech: &TechnologyID, stage: Stage, year: Year) -> f64 {
        self.storage_degradation
            .get(&(tech.clone(), stage, year))
            .copied()
            .unwrap_or(1.0)
    }

    /// Salvage fraction of a conversion technology installed in `stage`
    pub fn conversion_salvage(&self, tech: &TechnologyID, stage: Stage) -> f64 {
        self.conversion_salvage
            .get(&(tech.clone(), stage))
            .copied()
            .unwrap_or(0.0)
    }

    /// Salvage fraction of a storage technology installed in `stage`
    pub fn storage_salvage(&self, tech: &TechnologyID, stage: Stage) -> f64 {
        self.storage_salvage
            .get(&(tech.clone(), stage))
            .copied()
            .unwrap_or(0.0)
    }

    /// Build a fresh MILP instance for the given objective.
    ///
    /// `carbon_cap` adds an epsilon constraint bounding total carbon; `None`
    /// leaves emissions unconstrained.
    pub fn build(&self, objective: Objective, carbon_cap: Option<f64>) -> (Problem, VariableMap) {
        let mut problem = Problem::default();
        let vars = variables::add_variables(&mut problem, self, objective);
        constraints::add_all(&mut problem, &vars, self, carbon_cap);

        (problem, vars)
    }
}
