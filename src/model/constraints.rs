//! The constraint system of the hub MILP.
//!
//! Each function adds one family of linear rows to the problem. Rows are
//! expressed as (variable, coefficient) terms against the columns registered
//! in the [`VariableMap`].
use super::variables::{Variable, VariableKey, VariableMap};
use super::{HubModel, TemporalResolution};
use crate::calendar::{Day, TimeStep};
use crate::technology::ConversionKind;
use highs::RowProblem as Problem;

/// Add every constraint family of the model
pub fn add_all(
    problem: &mut Problem,
    vars: &VariableMap,
    model: &HubModel,
    carbon_cap: Option<f64>,
) {
    add_load_balance(problem, vars, model);
    add_capacity_limits(problem, vars, model);
    add_solar_input(problem, vars, model);
    add_roof_area(problem, vars, model);
    add_biomass_limit(problem, vars, model);
    add_install_linking(problem, vars, model);
    add_storage_balance(problem, vars, model);
    add_storage_rate_limits(problem, vars, model);
    add_storage_capacity(problem, vars, model);
    add_network_topology(problem, vars, model);
    add_financial_rollups(problem, vars, model);

    if let Some(cap) = carbon_cap {
        problem.add_row(..=cap, [(vars.get(&VariableKey::TotalCarbon), 1.0)]);
    }
}

/// Energy balance per carrier, location, year, day and time step.
///
/// Imports, degraded conversion output, net storage discharge and
/// loss-adjusted exchange into the location, less exports, must equal the
/// end-use demand (zero for carriers without one). Exchange losses apply to
/// the inbound direction only.
fn add_load_balance(problem: &mut Problem, vars: &VariableMap, model: &HubModel) {
    let scenario = model.scenario;
    let calendar = &scenario.calendar;
    let loss_per_metre = scenario.network_params.loss_per_metre;

    let mut terms: Vec<(Variable, f64)> = Vec::new();
    for carrier in &scenario.carriers.all {
        for location in &scenario.locations {
            for year in calendar.years() {
                for day in calendar.days() {
                    for step in calendar.time_steps() {
                        if scenario.carriers.is_importable(carrier) {
                            terms.push((
                                vars.get(&VariableKey::Import {
                                    carrier: carrier.clone(),
                                    location: location.id.clone(),
                                    year,
                                    day,
                                    step,
                                }),
                                1.0,
                            ));
                        }

                        for tech in &scenario.conversion_techs {
                            for stage in calendar.stages() {
                                let factor =
                                    scenario.conversion_factors.get(&tech.id, carrier, stage);
                                if factor == 0.0 {
                                    continue;
                                }
                                let coeff = factor
                                    * model.conversion_degradation(&tech.id, stage, year);
                                terms.push((
                                    vars.get(&VariableKey::ConversionInput {
                                        tech: tech.id.clone(),
                                        location: location.id.clone(),
                                        stage,
                                        year,
                                        day,
                                        step,
                                    }),
                                    coeff,
                                ));
                            }
                        }

                        for tech in &scenario.storage_techs {
                            if tech.carrier != *carrier {
                                continue;
                            }
                            for stage in calendar.stages() {
                                terms.push((
                                    vars.get(&VariableKey::Discharge {
                                        tech: tech.id.clone(),
                                        location: location.id.clone(),
                                        stage,
                                        year,
                                        day,
                                        step,
                                    }),
                                    1.0,
                                ));
                                terms.push((
                                    vars.get(&VariableKey::Charge {
                                        tech: tech.id.clone(),
                                        location: location.id.clone(),
                                        stage,
                                        year,
                                        day,
                                        step,
                                    }),
                                    -1.0,
                                ));
                            }
                        }

                        if scenario.carriers.is_exchangeable(carrier) {
                            for (link, distance) in scenario.network.links_into(&location.id) {
                                terms.push((
                                    vars.get(&VariableKey::Exchange {
                                        carrier: carrier.clone(),
                                        link,
                                        year,
                                        day,
                                        step,
                                    }),
                                    1.0 - loss_per_metre * distance,
                                ));
                            }
                            for (link, _) in scenario.network.links_out_of(&location.id) {
                                terms.push((
                                    vars.get(&VariableKey::Exchange {
                                        carrier: carrier.clone(),
                                        link,
                                        year,
                                        day,
                                        step,
                                    }),
                                    -1.0,
                                ));
                            }
                        }

                        if scenario.carriers.is_exportable(carrier) {
                            terms.push((
                                vars.get(&VariableKey::Export {
                                    carrier: carrier.clone(),
                                    location: location.id.clone(),
                                    year,
                                    day,
                                    step,
                                }),
                                -1.0,
                            ));
                        }

                        let rhs = if scenario.carriers.is_demanded(carrier) {
                            scenario.demand(carrier, day, step)
                        } else {
                            0.0
                        };
                        problem.add_row(rhs..=rhs, terms.drain(0..));
                    }
                }
            }
        }
    }
}

/// Degraded dispatchable output never exceeds the installed capacity.
///
/// Skipped for carriers the technology does not produce.
fn add_capacity_limits(problem: &mut Problem, vars: &VariableMap, model: &HubModel) {
    let scenario = model.scenario;
    let calendar = &scenario.calendar;

    for tech in &scenario.conversion_techs {
        if tech.kind != ConversionKind::Dispatchable {
            continue;
        }
        for carrier in &scenario.carriers.all {
            for location in &scenario.locations {
                for stage in calendar.stages() {
                    let factor = scenario.conversion_factors.get(&tech.id, carrier, stage);
                    if factor <= 0.0 {
                        continue;
                    }
                    for year in calendar.years() {
                        let coeff = factor * model.conversion_degradation(&tech.id, stage, year);
                        let capacity = vars.get(&VariableKey::ConversionCapacity {
                            tech: tech.id.clone(),
                            location: location.id.clone(),
                            stage,
                        });
                        for day in calendar.days() {
                            for step in calendar.time_steps() {
                                let input = vars.get(&VariableKey::ConversionInput {
                                    tech: tech.id.clone(),
                                    location: location.id.clone(),
                                    stage,
                                    year,
                                    day,
                                    step,
                                });
                                problem.add_row(..=0.0, [(input, coeff), (capacity, -1.0)]);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Solar input flow equals irradiance times the installed area
fn add_solar_input(problem: &mut Problem, vars: &VariableMap, model: &HubModel) {
    let scenario = model.scenario;
    let calendar = &scenario.calendar;

    for tech in &scenario.conversion_techs {
        if tech.kind != ConversionKind::Solar {
            continue;
        }
        for location in &scenario.locations {
            for stage in calendar.stages() {
                let capacity = vars.get(&VariableKey::ConversionCapacity {
                    tech: tech.id.clone(),
                    location: location.id.clone(),
                    stage,
                });
                for year in calendar.years() {
                    for day in calendar.days() {
                        for step in calendar.time_steps() {
                            let input = vars.get(&VariableKey::ConversionInput {
                                tech: tech.id.clone(),
                                location: location.id.clone(),
                                stage,
                                year,
                                day,
                                step,
                            });
                            let irradiance =
                                scenario.irradiance(&location.id, year, day, step);
                            problem
                                .add_row(0.0..=0.0, [(input, 1.0), (capacity, -irradiance)]);
                        }
                    }
                }
            }
        }
    }
}

/// Solar capacity installed at a location, over all stages, fits on the roof
fn add_roof_area(problem: &mut Problem, vars: &VariableMap, model: &HubModel) {
    let scenario = model.scenario;

    let mut terms: Vec<(Variable, f64)> = Vec::new();
    for location in &scenario.locations {
        for tech in &scenario.conversion_techs {
            if tech.kind != ConversionKind::Solar {
                continue;
            }
            for stage in scenario.calendar.stages() {
                terms.push((
                    vars.get(&VariableKey::ConversionCapacity {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    }),
                    1.0,
                ));
            }
        }
        if !terms.is_empty() {
            problem.add_row(..=location.roof_area, terms.drain(0..));
        }
    }
}

/// Weighted annual imports of the biomass carrier are bounded by the
/// biomass available per unit of floor area
fn add_biomass_limit(problem: &mut Problem, vars: &VariableMap, model: &HubModel) {
    let scenario = model.scenario;
    let calendar = &scenario.calendar;
    let Some(carrier) = &scenario.biomass_carrier else {
        return;
    };

    let mut terms: Vec<(Variable, f64)> = Vec::new();
    for location in &scenario.locations {
        for year in calendar.years() {
            for day in calendar.days() {
                let weight = calendar.day_weight(day);
                for step in calendar.time_steps() {
                    terms.push((
                        vars.get(&VariableKey::Import {
                            carrier: carrier.clone(),
                            location: location.id.clone(),
                            year,
                            day,
                            step,
                        }),
                        weight,
                    ));
                }
            }
            let rhs = scenario.biomass_per_area(year) * location.floor_area;
            problem.add_row(..=rhs, terms.drain(0..));
        }
    }
}

/// Big-M rows forcing the install binary on whenever capacity is nonzero
fn add_install_linking(problem: &mut Problem, vars: &VariableMap, model: &HubModel) {
    let scenario = model.scenario;
    let big_m = scenario.big_m;

    for tech in &scenario.conversion_techs {
        for location in &scenario.locations {
            for stage in scenario.calendar.stages() {
                let capacity = vars.get(&VariableKey::ConversionCapacity {
                    tech: tech.id.clone(),
                    location: location.id.clone(),
                    stage,
                });
                let installed = vars.get(&VariableKey::ConversionInstalled {
                    tech: tech.id.clone(),
                    location: location.id.clone(),
                    stage,
                });
                problem.add_row(..=0.0, [(capacity, 1.0), (installed, -big_m)]);
            }
        }
    }

    for tech in &scenario.storage_techs {
        for location in &scenario.locations {
            for stage in scenario.calendar.stages() {
                let capacity = vars.get(&VariableKey::StorageCapacity {
                    tech: tech.id.clone(),
                    location: location.id.clone(),
                    stage,
                });
                let installed = vars.get(&VariableKey::StorageInstalled {
                    tech: tech.id.clone(),
                    location: location.id.clone(),
                    stage,
                });
                problem.add_row(..=0.0, [(capacity, 1.0), (installed, -big_m)]);
            }
        }
    }
}

/// The day/time step whose state of charge precedes the given one.
///
/// Typical-days mode closes the loop within each representative day;
/// full-horizon mode chains days and closes the loop over the year.
fn preceding_step(
    temporal: TemporalResolution,
    day: Day,
    step: TimeStep,
    last_day: Day,
    last_step: TimeStep,
) -> (Day, TimeStep) {
    if step > 1 {
        return (day, step - 1);
    }
    match temporal {
        TemporalResolution::TypicalDays => (day, last_step),
        TemporalResolution::FullHorizon if day > 1 => (day - 1, last_step),
        TemporalResolution::FullHorizon => (last_day, last_step),
    }
}

/// Cyclic state-of-charge recursion with standing losses and efficiency
/// degradation
fn add_storage_balance(problem: &mut Problem, vars: &VariableMap, model: &HubModel) {
    let scenario = model.scenario;
    let calendar = &scenario.calendar;
    let last_day = calendar.last_day();
    let last_step = calendar.last_time_step();

    for tech in &scenario.storage_techs {
        for location in &scenario.locations {
            for stage in calendar.stages() {
                for year in calendar.years() {
                    let degradation = model.storage_degradation(&tech.id, stage, year);
                    let charge_coeff = tech.charge_efficiency * degradation;
                    let discharge_coeff = 1.0 / (tech.discharge_efficiency * degradation);
                    for day in calendar.days() {
                        for step in calendar.time_steps() {
                            let (prev_day, prev_step) = preceding_step(
                                model.temporal,
                                day,
                                step,
                                last_day,
                                last_step,
                            );
                            let soc = vars.get(&VariableKey::StateOfCharge {
                                tech: tech.id.clone(),
                                location: location.id.clone(),
                                stage,
                                year,
                                day,
                                step,
                            });
                            let charge = vars.get(&VariableKey::Charge {
                                tech: tech.id.clone(),
                                location: location.id.clone(),
                                stage,
                                year,
                                day,
                                step,
                            });
                            let discharge = vars.get(&VariableKey::Discharge {
                                tech: tech.id.clone(),
                                location: location.id.clone(),
                                stage,
                                year,
                                day,
                                step,
                            });

                            let retention = 1.0 - tech.standing_loss;
                            if (prev_day, prev_step) == (day, step) {
                                // Degenerate single-step cycle
                                problem.add_row(
                                    0.0..=0.0,
                                    [
                                        (soc, 1.0 - retention),
                                        (charge, -charge_coeff),
                                        (discharge, discharge_coeff),
                                    ],
                                );
                                continue;
                            }

                            let prev_soc = vars.get(&VariableKey::StateOfCharge {
                                tech: tech.id.clone(),
                                location: location.id.clone(),
                                stage,
                                year,
                                day: prev_day,
                                step: prev_step,
                            });
                            problem.add_row(
                                0.0..=0.0,
                                [
                                    (soc, 1.0),
                                    (prev_soc, -retention),
                                    (charge, -charge_coeff),
                                    (discharge, discharge_coeff),
                                ],
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Charge and discharge flows are bounded by a fraction of the capacity
fn add_storage_rate_limits(problem: &mut Problem, vars: &VariableMap, model: &HubModel) {
    let scenario = model.scenario;
    let calendar = &scenario.calendar;

    for tech in &scenario.storage_techs {
        for location in &scenario.locations {
            for stage in calendar.stages() {
                let capacity = vars.get(&VariableKey::StorageCapacity {
                    tech: tech.id.clone(),
                    location: location.id.clone(),
                    stage,
                });
                for year in calendar.years() {
                    for day in calendar.days() {
                        for step in calendar.time_steps() {
                            let charge = vars.get(&VariableKey::Charge {
                                tech: tech.id.clone(),
                                location: location.id.clone(),
                                stage,
                                year,
                                day,
                                step,
                            });
                            let discharge = vars.get(&VariableKey::Discharge {
                                tech: tech.id.clone(),
                                location: location.id.clone(),
                                stage,
                                year,
                                day,
                                step,
                            });
                            problem
                                .add_row(..=0.0, [(charge, 1.0), (capacity, -tech.max_charge_rate)]);
                            problem.add_row(
                                ..=0.0,
                                [(discharge, 1.0), (capacity, -tech.max_discharge_rate)],
                            );
                        }
                    }
                }
            }
        }
    }
}

/// The state of charge never exceeds the installed capacity
fn add_storage_capacity(problem: &mut Problem, vars: &VariableMap, model: &HubModel) {
    let scenario = model.scenario;
    let calendar = &scenario.calendar;

    for tech in &scenario.storage_techs {
        for location in &scenario.locations {
            for stage in calendar.stages() {
                let capacity = vars.get(&VariableKey::StorageCapacity {
                    tech: tech.id.clone(),
                    location: location.id.clone(),
                    stage,
                });
                for year in calendar.years() {
                    for day in calendar.days() {
                        for step in calendar.time_steps() {
                            let soc = vars.get(&VariableKey::StateOfCharge {
                                tech: tech.id.clone(),
                                location: location.id.clone(),
                                stage,
                                year,
                                day,
                                step,
                            });
                            problem.add_row(..=0.0, [(soc, 1.0), (capacity, -1.0)]);
                        }
                    }
                }
            }
        }
    }
}

/// Network topology: single activation, bidirectionality, Big-M flow gating,
/// pipe sizing and the connection-cost linearisation
fn add_network_topology(problem: &mut Problem, vars: &VariableMap, model: &HubModel) {
    let scenario = model.scenario;
    let calendar = &scenario.calendar;
    let params = &scenario.network_params;
    let big_m = scenario.big_m;

    let mut terms: Vec<(Variable, f64)> = Vec::new();
    for carrier in &scenario.carriers.exchangeable {
        // Pairwise rows: activation happens at most once over the horizon and
        // both directions of a pair agree on binaries, diameter and cost
        for (pair, _) in scenario.network.iter_pairs() {
            let reversed = pair.reversed();
            for stage in calendar.stages() {
                let forward = vars.get(&VariableKey::Connected {
                    carrier: carrier.clone(),
                    link: pair.clone(),
                    stage,
                });
                let backward = vars.get(&VariableKey::Connected {
                    carrier: carrier.clone(),
                    link: reversed.clone(),
                    stage,
                });
                problem.add_row(0.0..=0.0, [(forward, 1.0), (backward, -1.0)]);
                terms.push((forward, 1.0));
            }
            problem.add_row(..=1.0, terms.drain(0..));

            let diameter = vars.get(&VariableKey::PipeDiameter {
                carrier: carrier.clone(),
                link: pair.clone(),
            });
            let diameter_rev = vars.get(&VariableKey::PipeDiameter {
                carrier: carrier.clone(),
                link: reversed.clone(),
            });
            problem.add_row(0.0..=0.0, [(diameter, 1.0), (diameter_rev, -1.0)]);

            let cost = vars.get(&VariableKey::PipeCost {
                carrier: carrier.clone(),
                link: pair.clone(),
            });
            let cost_rev = vars.get(&VariableKey::PipeCost {
                carrier: carrier.clone(),
                link: reversed,
            });
            problem.add_row(0.0..=0.0, [(cost, 1.0), (cost_rev, -1.0)]);
        }

        // Per-directed-link rows
        for (link, _) in scenario.network.iter_links() {
            let connected: Vec<Variable> = calendar
                .stages()
                .map(|stage| {
                    vars.get(&VariableKey::Connected {
                        carrier: carrier.clone(),
                        link: link.clone(),
                        stage,
                    })
                })
                .collect();
            let diameter = vars.get(&VariableKey::PipeDiameter {
                carrier: carrier.clone(),
                link: link.clone(),
            });
            let cost = vars.get(&VariableKey::PipeCost {
                carrier: carrier.clone(),
                link: link.clone(),
            });

            for year in calendar.years() {
                for day in calendar.days() {
                    for step in calendar.time_steps() {
                        let exchange = vars.get(&VariableKey::Exchange {
                            carrier: carrier.clone(),
                            link: link.clone(),
                            year,
                            day,
                            step,
                        });

                        // Flow only over a connection that has been activated
                        terms.push((exchange, 1.0));
                        terms.extend(connected.iter().map(|&c| (c, -big_m)));
                        problem.add_row(..=0.0, terms.drain(0..));

                        // Diameter sized for the peak exchanged flow
                        terms.push((diameter, 1.0));
                        terms.push((exchange, -params.diameter_per_flow));
                        terms.extend(connected.iter().map(|&c| (c, -params.diameter_fixed)));
                        problem.add_row(0.0.., terms.drain(0..));
                    }
                }
            }

            // Pipe cost linear in diameter plus a connection surcharge
            terms.push((cost, 1.0));
            terms.push((diameter, -params.cost_per_diameter));
            terms.extend(connected.iter().map(|&c| (c, -params.cost_fixed)));
            problem.add_row(0.0..=0.0, terms.drain(0..));

            // Linearise connection binary x pipe cost per stage
            for (stage, &binary) in calendar.stages().zip(&connected) {
                let product = vars.get(&VariableKey::ConnectionCost {
                    carrier: carrier.clone(),
                    link: link.clone(),
                    stage,
                });
                problem.add_row(..=0.0, [(product, 1.0), (binary, -big_m)]);
                problem.add_row(0.0.., [(cost, 1.0), (product, -1.0)]);
                problem.add_row(..=big_m, [(cost, 1.0), (product, -1.0), (binary, big_m)]);
            }
        }
    }
}

/// Financial roll-up definitions tying flows and capacities to the cost and
/// carbon objective variables
fn add_financial_rollups(problem: &mut Problem, vars: &VariableMap, model: &HubModel) {
    let scenario = model.scenario;
    let calendar = &scenario.calendar;
    let rate = scenario.discount_rate;

    let mut terms: Vec<(Variable, f64)> = Vec::new();

    // Technology investment per location and stage
    for location in &scenario.locations {
        for stage in calendar.stages() {
            terms.push((
                vars.get(&VariableKey::TechInvestment {
                    location: location.id.clone(),
                    stage,
                }),
                1.0,
            ));
            for tech in &scenario.conversion_techs {
                terms.push((
                    vars.get(&VariableKey::ConversionInstalled {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    }),
                    -scenario.fixed_conversion_cost(&tech.id, stage),
                ));
                terms.push((
                    vars.get(&VariableKey::ConversionCapacity {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    }),
                    -scenario.linear_conversion_cost(&tech.id, stage),
                ));
            }
            for tech in &scenario.storage_techs {
                terms.push((
                    vars.get(&VariableKey::StorageInstalled {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    }),
                    -scenario.fixed_storage_cost(&tech.id, stage),
                ));
                terms.push((
                    vars.get(&VariableKey::StorageCapacity {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    }),
                    -scenario.linear_storage_cost(&tech.id, stage),
                ));
            }
            problem.add_row(0.0..=0.0, terms.drain(0..));
        }
    }

    // Network investment per location and stage: half of each incident pipe
    for location in &scenario.locations {
        for stage in calendar.stages() {
            terms.push((
                vars.get(&VariableKey::NetworkInvestment {
                    location: location.id.clone(),
                    stage,
                }),
                1.0,
            ));
            for carrier in &scenario.carriers.exchangeable {
                for (link, distance) in scenario.network.links_out_of(&location.id) {
                    terms.push((
                        vars.get(&VariableKey::ConnectionCost {
                            carrier: carrier.clone(),
                            link,
                            stage,
                        }),
                        -0.5 * distance,
                    ));
                }
            }
            problem.add_row(0.0..=0.0, terms.drain(0..));
        }
    }

    // Investment cost: stage investments discounted to the start of the horizon
    terms.push((vars.get(&VariableKey::InvestmentCost), 1.0));
    for location in &scenario.locations {
        for stage in calendar.stages() {
            let factor = crate::finance::discount_factor(rate, stage - 1);
            terms.push((
                vars.get(&VariableKey::TechInvestment {
                    location: location.id.clone(),
                    stage,
                }),
                -factor,
            ));
            terms.push((
                vars.get(&VariableKey::NetworkInvestment {
                    location: location.id.clone(),
                    stage,
                }),
                -factor,
            ));
        }
    }
    problem.add_row(0.0..=0.0, terms.drain(0..));

    // Import cost per location and year
    for location in &scenario.locations {
        for year in calendar.years() {
            terms.push((
                vars.get(&VariableKey::ImportCost {
                    location: location.id.clone(),
                    year,
                }),
                1.0,
            ));
            for carrier in &scenario.carriers.importable {
                let price = scenario.import_price(carrier, year);
                for day in calendar.days() {
                    let weight = calendar.day_weight(day);
                    for step in calendar.time_steps() {
                        terms.push((
                            vars.get(&VariableKey::Import {
                                carrier: carrier.clone(),
                                location: location.id.clone(),
                                year,
                                day,
                                step,
                            }),
                            -price * weight,
                        ));
                    }
                }
            }
            problem.add_row(0.0..=0.0, terms.drain(0..));
        }
    }

    // Maintenance cost per location and year, a fixed share of the investment
    for location in &scenario.locations {
        for year in calendar.years() {
            terms.push((
                vars.get(&VariableKey::MaintenanceCost {
                    location: location.id.clone(),
                    year,
                }),
                1.0,
            ));
            for tech in &scenario.conversion_techs {
                for stage in calendar.stages() {
                    terms.push((
                        vars.get(&VariableKey::ConversionCapacity {
                            tech: tech.id.clone(),
                            location: location.id.clone(),
                            stage,
                        }),
                        -scenario.linear_conversion_cost(&tech.id, stage)
                            * tech.maintenance_cost_rate,
                    ));
                    terms.push((
                        vars.get(&VariableKey::ConversionInstalled {
                            tech: tech.id.clone(),
                            location: location.id.clone(),
                            stage,
                        }),
                        -scenario.fixed_conversion_cost(&tech.id, stage)
                            * tech.maintenance_cost_rate,
                    ));
                }
            }
            for tech in &scenario.storage_techs {
                for stage in calendar.stages() {
                    terms.push((
                        vars.get(&VariableKey::StorageCapacity {
                            tech: tech.id.clone(),
                            location: location.id.clone(),
                            stage,
                        }),
                        -scenario.linear_storage_cost(&tech.id, stage)
                            * tech.maintenance_cost_rate,
                    ));
                    terms.push((
                        vars.get(&VariableKey::StorageInstalled {
                            tech: tech.id.clone(),
                            location: location.id.clone(),
                            stage,
                        }),
                        -scenario.fixed_storage_cost(&tech.id, stage)
                            * tech.maintenance_cost_rate,
                    ));
                }
            }
            problem.add_row(0.0..=0.0, terms.drain(0..));
        }
    }

    // Export profit per location and year
    for location in &scenario.locations {
        for year in calendar.years() {
            terms.push((
                vars.get(&VariableKey::ExportProfit {
                    location: location.id.clone(),
                    year,
                }),
                1.0,
            ));
            for carrier in &scenario.carriers.exportable {
                let price = scenario.export_price(carrier, year);
                for day in calendar.days() {
                    let weight = calendar.day_weight(day);
                    for step in calendar.time_steps() {
                        terms.push((
                            vars.get(&VariableKey::Export {
                                carrier: carrier.clone(),
                                location: location.id.clone(),
                                year,
                                day,
                                step,
                            }),
                            -price * weight,
                        ));
                    }
                }
            }
            problem.add_row(0.0..=0.0, terms.drain(0..));
        }
    }

    // Operating cost: yearly balances discounted to the start of the horizon
    terms.push((vars.get(&VariableKey::OperatingCost), 1.0));
    for location in &scenario.locations {
        for year in calendar.years() {
            let factor = crate::finance::discount_factor(rate, year);
            terms.push((
                vars.get(&VariableKey::ImportCost {
                    location: location.id.clone(),
                    year,
                }),
                -factor,
            ));
            terms.push((
                vars.get(&VariableKey::MaintenanceCost {
                    location: location.id.clone(),
                    year,
                }),
                -factor,
            ));
            terms.push((
                vars.get(&VariableKey::ExportProfit {
                    location: location.id.clone(),
                    year,
                }),
                factor,
            ));
        }
    }
    problem.add_row(0.0..=0.0, terms.drain(0..));

    // Salvage value of equipment outliving the horizon
    for location in &scenario.locations {
        terms.push((
            vars.get(&VariableKey::SiteSalvage {
                location: location.id.clone(),
            }),
            1.0,
        ));
        for tech in &scenario.conversion_techs {
            for stage in calendar.stages() {
                let salvage = model.conversion_salvage(&tech.id, stage);
                terms.push((
                    vars.get(&VariableKey::ConversionCapacity {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    }),
                    -scenario.linear_conversion_cost(&tech.id, stage) * salvage,
                ));
                terms.push((
                    vars.get(&VariableKey::ConversionInstalled {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    }),
                    -scenario.fixed_conversion_cost(&tech.id, stage) * salvage,
                ));
            }
        }
        for tech in &scenario.storage_techs {
            for stage in calendar.stages() {
                let salvage = model.storage_salvage(&tech.id, stage);
                terms.push((
                    vars.get(&VariableKey::StorageCapacity {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    }),
                    -scenario.linear_storage_cost(&tech.id, stage) * salvage,
                ));
                terms.push((
                    vars.get(&VariableKey::StorageInstalled {
                        tech: tech.id.clone(),
                        location: location.id.clone(),
                        stage,
                    }),
                    -scenario.fixed_storage_cost(&tech.id, stage) * salvage,
                ));
            }
        }
        problem.add_row(0.0..=0.0, terms.drain(0..));
    }

    let horizon_discount = crate::finance::discount_factor(rate, calendar.last_year() + 1);
    terms.push((vars.get(&VariableKey::SalvageValue), 1.0));
    for location in &scenario.locations {
        terms.push((
            vars.get(&VariableKey::SiteSalvage {
                location: location.id.clone(),
            }),
            -horizon_discount,
        ));
    }
    problem.add_row(0.0..=0.0, terms.drain(0..));

    // Total cost and total carbon
    problem.add_row(
        0.0..=0.0,
        [
            (vars.get(&VariableKey::TotalCost), 1.0),
            (vars.get(&VariableKey::InvestmentCost), -1.0),
            (vars.get(&VariableKey::OperatingCost), -1.0),
            (vars.get(&VariableKey::SalvageValue), 1.0),
        ],
    );

    terms.push((vars.get(&VariableKey::TotalCarbon), 1.0));
    for carrier in &scenario.carriers.importable {
        for location in &scenario.locations {
            for year in calendar.years() {
                let factor = scenario.carbon_factor(carrier, year);
                for day in calendar.days() {
                    let weight = calendar.day_weight(day);
                    for step in calendar.time_steps() {
                        terms.push((
                            vars.get(&VariableKey::Import {
                                carrier: carrier.clone(),
                                location: location.id.clone(),
                                year,
                                day,
                                step,
                            }),
                            -factor * weight,
                        ));
                    }
                }
            }
        }
    }
    problem.add_row(0.0..=0.0, terms.drain(0..));
}
