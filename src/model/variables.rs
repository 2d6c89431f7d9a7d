//! Decision variables of the hub MILP.
//!
//! Variables are registered in a [`VariableMap`] in a fixed order, so the
//! column values of a solved problem can be zipped back onto their keys.
use super::{HubModel, Objective};
use crate::calendar::{Day, Stage, TimeStep, Year};
use crate::carrier::CarrierID;
use crate::location::{DirectedLink, LocationID};
use crate::technology::TechnologyID;
use highs::RowProblem as Problem;
use indexmap::IndexMap;
use std::fmt;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
pub type Variable = highs::Col;

/// Identifies one decision variable by its semantic indices
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum VariableKey {
    /// Input flow into a conversion technology
    ConversionInput {
        tech: TechnologyID,
        location: LocationID,
        stage: Stage,
        year: Year,
        day: Day,
        step: TimeStep,
    },
    /// Carrier bought from outside the system
    Import {
        carrier: CarrierID,
        location: LocationID,
        year: Year,
        day: Day,
        step: TimeStep,
    },
    /// Carrier sold to outside the system
    Export {
        carrier: CarrierID,
        location: LocationID,
        year: Year,
        day: Day,
        step: TimeStep,
    },
    /// Carrier flowing over a directed network link
    Exchange {
        carrier: CarrierID,
        link: DirectedLink,
        year: Year,
        day: Day,
        step: TimeStep,
    },
    /// Energy charged into a storage
    Charge {
        tech: TechnologyID,
        location: LocationID,
        stage: Stage,
        year: Year,
        day: Day,
        step: TimeStep,
    },
    /// Energy discharged from a storage
    Discharge {
        tech: TechnologyID,
        location: LocationID,
        stage: Stage,
        year: Year,
        day: Day,
        step: TimeStep,
    },
    /// Energy held in a storage at the end of a time step
    StateOfCharge {
        tech: TechnologyID,
        location: LocationID,
        stage: Stage,
        year: Year,
        day: Day,
        step: TimeStep,
    },
    /// New conversion capacity installed in a stage
    ConversionCapacity {
        tech: TechnologyID,
        location: LocationID,
        stage: Stage,
    },
    /// New storage capacity installed in a stage
    StorageCapacity {
        tech: TechnologyID,
        location: LocationID,
        stage: Stage,
    },
    /// Whether a conversion technology is installed in a stage (binary)
    ConversionInstalled {
        tech: TechnologyID,
        location: LocationID,
        stage: Stage,
    },
    /// Whether a storage technology is installed in a stage (binary)
    StorageInstalled {
        tech: TechnologyID,
        location: LocationID,
        stage: Stage,
    },
    /// Whether a network connection is activated in a stage (binary)
    Connected {
        carrier: CarrierID,
        link: DirectedLink,
        stage: Stage,
    },
    /// Diameter of the pipe carrying a carrier over a link
    PipeDiameter { carrier: CarrierID, link: DirectedLink },
    /// Cost per metre of the pipe carrying a carrier over a link
    PipeCost { carrier: CarrierID, link: DirectedLink },
    /// Product of connection binary and pipe cost (linearisation variable)
    ConnectionCost {
        carrier: CarrierID,
        link: DirectedLink,
        stage: Stage,
    },
    /// Technology investment at a location in a stage
    TechInvestment { location: LocationID, stage: Stage },
    /// Network investment at a location in a stage
    NetworkInvestment { location: LocationID, stage: Stage },
    /// Import expenditure at a location in a year
    ImportCost { location: LocationID, year: Year },
    /// Maintenance expenditure at a location in a year
    MaintenanceCost { location: LocationID, year: Year },
    /// Export income at a location in a year
    ExportProfit { location: LocationID, year: Year },
    /// Undiscounted salvage value of all equipment at a location
    SiteSalvage { location: LocationID },
    /// Discounted investment cost over all locations and stages
    InvestmentCost,
    /// Discounted operating cost over all locations and years
    OperatingCost,
    /// Discounted salvage value over all locations
    SalvageValue,
    /// Total system cost
    TotalCost,
    /// Total carbon emissions from imports
    TotalCarbon,
}

impl VariableKey {
    /// The variable family this key belongs to
    pub fn family(&self) -> &'static str {
        match self {
            Self::ConversionInput { .. } => "conversion_input",
            Self::Import { .. } => "import",
            Self::Export { .. } => "export",
            Self::Exchange { .. } => "exchange",
            Self::Charge { .. } => "charge",
            Self::Discharge { .. } => "discharge",
            Self::StateOfCharge { .. } => "state_of_charge",
            Self::ConversionCapacity { .. } => "conversion_capacity",
            Self::StorageCapacity { .. } => "storage_capacity",
            Self::ConversionInstalled { .. } => "conversion_installed",
            Self::StorageInstalled { .. } => "storage_installed",
            Self::Connected { .. } => "connected",
            Self::PipeDiameter { .. } => "pipe_diameter",
            Self::PipeCost { .. } => "pipe_cost",
            Self::ConnectionCost { .. } => "connection_cost",
            Self::TechInvestment { .. } => "tech_investment",
            Self::NetworkInvestment { .. } => "network_investment",
            Self::ImportCost { .. } => "import_cost",
            Self::MaintenanceCost { .. } => "maintenance_cost",
            Self::ExportProfit { .. } => "export_profit",
            Self::SiteSalvage { .. } => "site_salvage",
            Self::InvestmentCost => "investment_cost",
            Self::OperatingCost => "operating_cost",
            Self::SalvageValue => "salvage_value",
            Self::TotalCost => "total_cost",
            Self::TotalCarbon => "total_carbon",
        }
    }

    /// The semantic indices of this key, joined with semicolons
    pub fn indices(&self) -> String {
        match self {
            Self::ConversionInput {
                tech,
                location,
                stage,
                year,
                day,
                step,
            } => format!("{tech};{location};{stage};{year};{day};{step}"),
            Self::Import {
                carrier,
                location,
                year,
                day,
                step,
            }
            | Self::Export {
                carrier,
                location,
                year,
                day,
                step,
            } => format!("{carrier};{location};{year};{day};{step}"),
            Self::Exchange {
                carrier,
                link,
                year,
                day,
                step,
            } => format!("{carrier};{link};{year};{day};{step}"),
            Self::Charge {
                tech,
                location,
                stage,
                year,
                day,
                step,
            }
            | Self::Discharge {
                tech,
                location,
                stage,
                year,
                day,
                step,
            }
            | Self::StateOfCharge {
                tech,
                location,
                stage,
                year,
                day,
                step,
            } => format!("{tech};{location};{stage};{year};{day};{step}"),
            Self::ConversionCapacity {
                tech,
                location,
                stage,
            }
            | Self::StorageCapacity {
                tech,
                location,
                stage,
            }
            | Self::ConversionInstalled {
                tech,
                location,
                stage,
            }
            | Self::StorageInstalled {
                tech,
                location,
                stage,
            } => format!("{tech};{location};{stage}"),
            Self::Connected {
                carrier,
                link,
                stage,
            }
            | Self::ConnectionCost {
                carrier,
                link,
                stage,
            } => format!("{carrier};{link};{stage}"),
            Self::PipeDiameter { carrier, link } | Self::PipeCost { carrier, link } => {
                format!("{carrier};{link}")
            }
            Self::TechInvestment { location, stage }
            | Self::NetworkInvestment { location, stage } => format!("{location};{stage}"),
            Self::ImportCost { location, year }
            | Self::MaintenanceCost { location, year }
            | Self::ExportProfit { location, year } => format!("{location};{year}"),
            Self::SiteSalvage { location } => location.to_string(),
            Self::InvestmentCost
            | Self::OperatingCost
            | Self::SalvageValue
            | Self::TotalCost
            | Self::TotalCarbon => String::new(),
        }
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indices = self.indices();
        if indices.is_empty() {
            write!(f, "{}", self.family())
        } else {
            write!(f, "{}[{indices}]", self.family())
        }
    }
}

/// A map for easy lookup of variables in the problem.
///
/// The entries are ordered (see [`IndexMap`]), matching the order in which
/// columns were added to the problem. We use this both to define constraints
/// and to key the column values when reading a solution.
#[derive(Default)]
pub struct VariableMap(IndexMap<VariableKey, Variable>);

impl VariableMap {
    /// Get the [`Variable`] corresponding to the given key.
    pub fn get(&self, key: &VariableKey) -> Variable {
        *self.0.get(key).expect("No variable found for given key")
    }

    /// Iterate over keys in column order
    pub fn keys(&self) -> impl Iterator<Item = &VariableKey> {
        self.0.keys()
    }

    /// The column index of the given key, if registered
    pub fn index_of(&self, key: &VariableKey) -> Option<usize> {
        self.0.get_index_of(key)
    }

    /// Number of registered variables
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no variables have been registered
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn add_continuous(
        &mut self,
        problem: &mut Problem,
        key: VariableKey,
        objective_coeff: f64,
        bounds: impl std::ops::RangeBounds<f64>,
    ) {
        let var = problem.add_column(objective_coeff, bounds);
        let existing = self.0.insert(key, var).is_some();
        assert!(!existing, "Duplicate entry for var");
    }

    fn add_binary(&mut self, problem: &mut Problem, key: VariableKey) {
        let var = problem.add_integer_column(0.0, 0.0..=1.0);
        let existing = self.0.insert(key, var).is_some();
        assert!(!existing, "Duplicate entry for var");
    }
}

/// Register every decision variable of the model as a problem column.
///
/// The chosen objective's roll-up variable gets an objective coefficient of
/// one; every other column has a zero coefficient.
pub fn add_variables(problem: &mut Problem, model: &HubModel, objective: Objective) -> VariableMap {
    let mut vars = VariableMap::default();
    let scenario = model.scenario;
    let calendar = &scenario.calendar;

    let operation = || {
        calendar.years().flat_map(move |y| {
            calendar
                .days()
                .flat_map(move |d| calendar.time_steps().map(move |t| (y, d, t)))
        })
    };

    for tech in &scenario.conversion_techs {
        for location in &scenario.locations {
            for stage in calendar.stages() {
                for (year, day, step) in operation() {
                    vars.add_continuous(
                        problem,
                        VariableKey::ConversionInput {
                            tech: tech.id.clone(),
                            location: location.id.clone(),
                            stage,
                            year,
                            day,
                            step,
                        },
                        0.0,
                        0.0..,
                    );
                }
            }
        }
    }

    for carrier in &scenario.carriers.importable {
        for location in &scenario.locations {
            for (year, day, step) in operation() {
                vars.add_continuous(
                    problem,
                    VariableKey::Import {
                        carrier: carrier.clone(),
                        location: location.id.clone(),
                        year,
                        day,
                        step,
                    },
                    0.0,
                    0.0..,
                );
            }
        }
    }

    for carrier in &scenario.carriers.exportable {
        for location in &scenario.locations {
            for (year, day, step) in operation() {
                vars.add_continuous(
                    problem,
                    VariableKey::Export {
                        carrier: carrier.clone(),
                        location: location.id.clone(),
                        year,
                        day,
                        step,
                    },
                    0.0,
                    0.0..,
                );
            }
        }
    }

    for carrier in &scenario.carriers.exchangeable {
        for (link, _) in scenario.network.iter_links() {
            for (year, day, step) in operation() {
                vars.add_continuous(
                    problem,
                    VariableKey::Exchange {
                        carrier: carrier.clone(),
                        link: link.clone(),
                        year,
                        day,
                        step,
                    },
                    0.0,
                    0.0..,
                );
            }
        }
    }

    for tech in &scenario.storage_techs {
        for location in &scenario.locations {
            for stage in calendar.stages() {
                for (year, day, step) in operation() {
                    let index = (
                        tech.id.clone(),
                        location.id.clone(),
                        stage,
                        year,
                        day,
                        step,
                    );
                    vars.add_continuous(
                        problem,
                        VariableKey::Charge {
                            tech: index.0.clone(),
                            location: index.1.clone(),
                            stage,
                            year,
                            day,
                            step,
                        },
                        0.0,
                        0.0..,
                    );
                    vars.add_continuous(
                        problem,
                        VariableKey::Discharge {
                            tech: index.0.clone(),
                            location: index.1.clone(),
                            stage,
                            year,
                            day,
                            step,
                        },
                        0.0,
                        0.0..,
                    );
                    vars.add_continuous(
                        problem,
                        VariableKey::StateOfCharge {
                            tech: index.0,
                            location: index.1,
                            stage,
                            year,
                            day,
                            step,
                        },
                        0.0,
                        0.0..,
                    );
                }
            }
        }
    }

    for tech in &scenario.conversion_techs {
        for location in &scenario.locations {
            for stage in calendar.stages() {
                vars.add_continuous(
                    problem,
                    VariableKey::ConversionCapacity {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    },
                    0.0,
                    0.0..,
                );
                vars.add_binary(
                    problem,
                    VariableKey::ConversionInstalled {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    },
                );
            }
        }
    }

    for tech in &scenario.storage_techs {
        for location in &scenario.locations {
            for stage in calendar.stages() {
                // The technology's capacity cap is enforced as a column bound
                vars.add_continuous(
                    problem,
                    VariableKey::StorageCapacity {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    },
                    0.0,
                    0.0..=tech.max_capacity,
                );
                vars.add_binary(
                    problem,
                    VariableKey::StorageInstalled {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    },
                );
            }
        }
    }

    for carrier in &scenario.carriers.exchangeable {
        for (link, _) in scenario.network.iter_links() {
            for stage in calendar.stages() {
                vars.add_binary(
                    problem,
                    VariableKey::Connected {
                        carrier: carrier.clone(),
                        link: link.clone(),
                        stage,
                    },
                );
                vars.add_continuous(
                    problem,
                    VariableKey::ConnectionCost {
                        carrier: carrier.clone(),
                        link: link.clone(),
                        stage,
                    },
                    0.0,
                    0.0..,
                );
            }
            vars.add_continuous(
                problem,
                VariableKey::PipeDiameter {
                    carrier: carrier.clone(),
                    link: link.clone(),
                },
                0.0,
                0.0..,
            );
            vars.add_continuous(
                problem,
                VariableKey::PipeCost {
                    carrier: carrier.clone(),
                    link,
                },
                0.0,
                0.0..,
            );
        }
    }

    for location in &scenario.locations {
        for stage in calendar.stages() {
            vars.add_continuous(
                problem,
                VariableKey::TechInvestment {
                    location: location.id.clone(),
                    stage,
                },
                0.0,
                0.0..,
            );
            vars.add_continuous(
                problem,
                VariableKey::NetworkInvestment {
                    location: location.id.clone(),
                    stage,
                },
                0.0,
                0.0..,
            );
        }
        for year in calendar.years() {
            vars.add_continuous(
                problem,
                VariableKey::ImportCost {
                    location: location.id.clone(),
                    year,
                },
                0.0,
                0.0..,
            );
            vars.add_continuous(
                problem,
                VariableKey::MaintenanceCost {
                    location: location.id.clone(),
                    year,
                },
                0.0,
                0.0..,
            );
            vars.add_continuous(
                problem,
                VariableKey::ExportProfit {
                    location: location.id.clone(),
                    year,
                },
                0.0,
                0.0..,
            );
        }
        vars.add_continuous(
            problem,
            VariableKey::SiteSalvage {
                location: location.id.clone(),
            },
            0.0,
            0.0..,
        );
    }

    vars.add_continuous(problem, VariableKey::InvestmentCost, 0.0, 0.0..);
    vars.add_continuous(problem, VariableKey::OperatingCost, 0.0, 0.0..);
    vars.add_continuous(problem, VariableKey::SalvageValue, 0.0, 0.0..);

    let (cost_coeff, carbon_coeff) = match objective {
        Objective::Cost => (1.0, 0.0),
        Objective::Carbon => (0.0, 1.0),
    };
    vars.add_continuous(problem, VariableKey::TotalCost, cost_coeff, ..);
    vars.add_continuous(problem, VariableKey::TotalCarbon, carbon_coeff, 0.0..);

    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::scenario;
    use crate::model::TemporalResolution;
    use crate::scenario::Scenario;
    use rstest::rstest;

    #[rstest]
    fn test_variable_registration(scenario: Scenario) {
        let model = HubModel::new(&scenario, TemporalResolution::TypicalDays);
        let mut problem = Problem::default();
        let vars = add_variables(&mut problem, &model, Objective::Cost);

        // Importable carriers get import columns across the horizon
        assert!(
            vars.index_of(&VariableKey::Import {
                carrier: "gas".into(),
                location: "site_a".into(),
                year: 2,
                day: 1,
                step: 2,
            })
            .is_some()
        );

        // Exchange columns exist in both directions for exchangeable carriers
        let forward = DirectedLink {
            from: "site_a".into(),
            to: "site_b".into(),
        };
        for link in [forward.clone(), forward.reversed()] {
            assert!(
                vars.index_of(&VariableKey::Exchange {
                    carrier: "heat".into(),
                    link,
                    year: 1,
                    day: 1,
                    step: 1,
                })
                .is_some()
            );
        }

        // Gas is not exportable, so it has no export column
        assert!(
            vars.index_of(&VariableKey::Export {
                carrier: "gas".into(),
                location: "site_a".into(),
                year: 1,
                day: 1,
                step: 1,
            })
            .is_none()
        );
    }

    #[rstest]
    fn test_variable_key_display(scenario: Scenario) {
        let model = HubModel::new(&scenario, TemporalResolution::TypicalDays);
        let mut problem = Problem::default();
        let vars = add_variables(&mut problem, &model, Objective::Carbon);

        let key = VariableKey::StorageCapacity {
            tech: "battery".into(),
            location: "site_b".into(),
            stage: 2,
        };
        assert!(vars.index_of(&key).is_some());
        assert_eq!(key.to_string(), "storage_capacity[battery;site_b;2]");
        assert_eq!(VariableKey::TotalCost.to_string(), "total_cost");
    }
}
