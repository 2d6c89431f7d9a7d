//! Integration tests solving small hub models end to end.
use float_cmp::assert_approx_eq;
use hubplan::calendar::Calendar;
use hubplan::carrier::{CarrierID, CarrierRegistry};
use hubplan::location::{DirectedLink, Location, LocationID, Network};
use hubplan::model::variables::VariableKey;
use hubplan::model::{HubModel, Objective, TemporalResolution};
use hubplan::optimisation::{OptimisationMode, Orchestrator, SolveStatus, SolverConfig};
use hubplan::scenario::{NetworkParameters, Scenario, ScenarioBuilder};
use hubplan::technology::{
    ConversionFactorMap, ConversionKind, ConversionTechnology, StorageTechnology,
};
use indexmap::{IndexMap, indexmap};
use std::collections::HashMap;

/// A two-site scenario over two years/stages with a gas boiler and a battery.
///
/// Heat comes only from the boiler, electricity only from imports, so the
/// optimal flows are easy to reason about.
fn scenario_builder() -> ScenarioBuilder {
    let calendar = Calendar::new(2, 2, 1, 2, IndexMap::new()).unwrap();

    let ids = |names: &[&str]| names.iter().map(|n| CarrierID::new(n)).collect();
    let carriers = CarrierRegistry::new(
        ids(&["elec", "heat", "gas"]),
        ids(&["elec", "gas"]),
        ids(&["elec"]),
        ids(&["heat"]),
        ids(&["elec", "heat"]),
    )
    .unwrap();

    let location_ids: Vec<LocationID> = ["site_a", "site_b"]
        .into_iter()
        .map(LocationID::new)
        .collect();
    let network =
        Network::from_distances(location_ids.iter().cloned().collect(), &[100.0]).unwrap();
    let locations = location_ids
        .into_iter()
        .map(|id| Location {
            id,
            floor_area: 1000.0,
            roof_area: 150.0,
        })
        .collect();

    let gas_boiler = ConversionTechnology {
        id: "gas_boiler".into(),
        kind: ConversionKind::Dispatchable,
        lifetime: 20,
        yearly_degradation: 0.0,
        minimum_part_load: 0.0,
        maintenance_cost_rate: 0.01,
    };
    let battery = StorageTechnology {
        id: "battery".into(),
        carrier: "elec".into(),
        lifetime: 10,
        max_charge_rate: 0.25,
        max_discharge_rate: 0.25,
        standing_loss: 0.001,
        charge_efficiency: 0.95,
        discharge_efficiency: 0.95,
        max_capacity: 100.0,
        yearly_degradation: 0.0,
        maintenance_cost_rate: 0.0,
    };

    let mut conversion_factors = ConversionFactorMap::new();
    for stage in calendar.stages() {
        conversion_factors.insert(gas_boiler.id.clone(), "heat".into(), stage, 0.9);
        conversion_factors.insert(gas_boiler.id.clone(), "gas".into(), stage, -1.0);
    }

    let demand = HashMap::from([
        (("heat".into(), 1, 1), 10.0),
        (("heat".into(), 1, 2), 8.0),
        (("elec".into(), 1, 1), 3.0),
        (("elec".into(), 1, 2), 3.0),
    ]);

    ScenarioBuilder {
        calendar,
        carriers,
        network,
        locations,
        conversion_techs: vec![gas_boiler.clone()],
        storage_techs: vec![battery.clone()],
        conversion_factors,
        linear_conversion_cost: indexmap! { gas_boiler.id.clone() => vec![160.0, 160.0] },
        fixed_conversion_cost: indexmap! { gas_boiler.id => vec![5000.0, 5000.0] },
        linear_storage_cost: indexmap! { battery.id.clone() => vec![400.0, 400.0] },
        fixed_storage_cost: indexmap! { battery.id => vec![1000.0, 1000.0] },
        import_prices: indexmap! {
            "elec".into() => vec![0.24, 0.24],
            "gas".into() => vec![0.09, 0.09],
        },
        export_prices: indexmap! { "elec".into() => vec![0.08, 0.08] },
        carbon_factors: indexmap! {
            "elec".into() => vec![0.14, 0.14],
            "gas".into() => vec![0.2, 0.2],
        },
        demand,
        solar_irradiance: HashMap::new(),
        biomass_per_area: vec![0.0, 0.0],
        biomass_carrier: None,
        discount_rate: 0.05,
        network_params: NetworkParameters {
            diameter_per_flow: 0.0006,
            diameter_fixed: 0.01,
            cost_per_diameter: 2100.0,
            cost_fixed: 350.0,
            loss_per_metre: 0.0002,
            lifetime: 40,
        },
        big_m: 1e6,
    }
}

fn scenario() -> Scenario {
    scenario_builder().for_stage(1).unwrap()
}

#[test]
fn cost_run_covers_demand() {
    let scenario = scenario();
    let model = HubModel::new(&scenario, TemporalResolution::TypicalDays);
    let orchestrator = Orchestrator::new(
        &model,
        OptimisationMode::CostOnly,
        SolverConfig::default(),
    );
    let points = orchestrator.run();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].status, SolveStatus::Optimal);
    let solution = points[0].solution.as_ref().unwrap();

    // Installed boiler capacity must cover the peak heat demand of both sites
    let mut boiler_capacity = 0.0;
    for location in ["site_a", "site_b"] {
        for stage in 1..=2 {
            boiler_capacity += solution
                .value_of(&VariableKey::ConversionCapacity {
                    tech: "gas_boiler".into(),
                    location: location.into(),
                    stage,
                })
                .unwrap();
        }
    }
    assert!(boiler_capacity >= 20.0 - 1e-6);

    // Electricity only enters through imports, so they cover its demand
    let mut elec_import = 0.0;
    for location in ["site_a", "site_b"] {
        for step in 1..=2 {
            elec_import += solution
                .value_of(&VariableKey::Import {
                    carrier: "elec".into(),
                    location: location.into(),
                    year: 1,
                    day: 1,
                    step,
                })
                .unwrap();
        }
    }
    assert!(elec_import >= 12.0 - 1e-6);

    assert!(solution.total_cost() > 0.0);
    assert!(solution.total_carbon() > 0.0);
}

#[test]
fn carbon_cap_below_minimum_is_infeasible() {
    let scenario = scenario();
    let model = HubModel::new(&scenario, TemporalResolution::TypicalDays);
    let orchestrator = Orchestrator::new(
        &model,
        OptimisationMode::CostOnly,
        SolverConfig::default(),
    );

    // Meeting the heat demand requires gas, so zero carbon is unattainable
    let point = orchestrator.solve_point("capped", Objective::Cost, Some(0.0));
    assert_eq!(point.status, SolveStatus::Infeasible);
    assert!(point.solution.is_none());
}

#[test]
fn carbon_only_mode_caps_the_cost_solve() {
    let scenario = scenario();
    let model = HubModel::new(&scenario, TemporalResolution::TypicalDays);
    let points = Orchestrator::new(
        &model,
        OptimisationMode::CarbonOnly,
        SolverConfig::default(),
    )
    .run();

    assert_eq!(points.len(), 2);
    assert_eq!(points[1].status, SolveStatus::Optimal);
    let carbon_min = points[0].solution.as_ref().unwrap().total_carbon();
    let capped = points[1].solution.as_ref().unwrap();
    assert!(capped.total_carbon() <= carbon_min * 1.01 + 1e-6);
}

#[test]
fn multi_objective_traces_intermediate_points() {
    let scenario = scenario();
    let model = HubModel::new(&scenario, TemporalResolution::TypicalDays);
    let points = Orchestrator::new(
        &model,
        OptimisationMode::MultiObjective { pareto_points: 1 },
        SolverConfig::default(),
    )
    .run();

    assert_eq!(points.len(), 3);
    assert_eq!(points[2].label, "pareto_1");
    assert_eq!(points[2].status, SolveStatus::Optimal);

    // The intermediate cap lies between the carbon values of the extremes
    let cost_extreme = points[0].solution.as_ref().unwrap();
    let carbon_extreme = points[1].solution.as_ref().unwrap();
    let cap = points[2].carbon_cap.unwrap();
    assert!(cap <= cost_extreme.total_carbon() + 1e-6);
    assert!(cap >= carbon_extreme.total_carbon() - 1e-6);
}

#[test]
fn identical_runs_agree() {
    let scenario = scenario();
    let model = HubModel::new(&scenario, TemporalResolution::FullHorizon);
    let orchestrator = Orchestrator::new(
        &model,
        OptimisationMode::CostOnly,
        SolverConfig::default(),
    );

    let first = orchestrator.run();
    let second = orchestrator.run();
    assert_approx_eq!(
        f64,
        first[0].solution.as_ref().unwrap().total_cost(),
        second[0].solution.as_ref().unwrap().total_cost(),
        epsilon = 1e-6
    );
}

#[test]
fn shared_boiler_activates_the_exchange_network() {
    // With a large fixed installation cost and a short, cheap pipe, one
    // shared boiler plus heat exchange beats a boiler per site
    let mut builder = scenario_builder();
    builder.network = Network::from_distances(
        ["site_a", "site_b"].into_iter().map(LocationID::new).collect(),
        &[1.0],
    )
    .unwrap();
    builder
        .fixed_conversion_cost
        .insert("gas_boiler".into(), vec![200_000.0, 200_000.0]);

    let scenario = builder.for_stage(1).unwrap();
    let model = HubModel::new(&scenario, TemporalResolution::TypicalDays);
    let points = Orchestrator::new(
        &model,
        OptimisationMode::CostOnly,
        SolverConfig::default(),
    )
    .run();
    assert_eq!(points[0].status, SolveStatus::Optimal);
    let solution = points[0].solution.as_ref().unwrap();

    // Exactly one site hosts the boiler
    let capacity_at = |location: &str| -> f64 {
        (1..=2)
            .map(|stage| {
                solution
                    .value_of(&VariableKey::ConversionCapacity {
                        tech: "gas_boiler".into(),
                        location: location.into(),
                        stage,
                    })
                    .unwrap()
            })
            .sum()
    };
    let installed = ["site_a", "site_b"]
        .iter()
        .filter(|location| capacity_at(location) > 1e-3)
        .count();
    assert_eq!(installed, 1);

    // The other site's heat demand (10 + 8 per year) travels over the pipe
    let forward = DirectedLink {
        from: "site_a".into(),
        to: "site_b".into(),
    };
    let mut exchanged = 0.0;
    for link in [forward.clone(), forward.reversed()] {
        for step in 1..=2 {
            exchanged += solution
                .value_of(&VariableKey::Exchange {
                    carrier: "heat".into(),
                    link: link.clone(),
                    year: 1,
                    day: 1,
                    step,
                })
                .unwrap();
        }
    }
    assert!(exchanged >= 18.0 - 1e-6);

    // Nonzero flow forces the connection binary, which the pairwise row
    // limits to a single activation over the horizon
    let connected = |link: &DirectedLink, stage| {
        solution
            .value_of(&VariableKey::Connected {
                carrier: "heat".into(),
                link: link.clone(),
                stage,
            })
            .unwrap()
    };
    let activations: f64 = (1..=2).map(|stage| connected(&forward, stage)).sum();
    assert_approx_eq!(f64, activations, 1.0, epsilon = 1e-6);

    // Both directions of the pair agree on binaries, diameter and cost
    let backward = forward.reversed();
    for stage in 1..=2 {
        assert_approx_eq!(
            f64,
            connected(&forward, stage),
            connected(&backward, stage),
            epsilon = 1e-6
        );
    }
    let diameter = |link: &DirectedLink| {
        solution
            .value_of(&VariableKey::PipeDiameter {
                carrier: "heat".into(),
                link: link.clone(),
            })
            .unwrap()
    };
    assert_approx_eq!(f64, diameter(&forward), diameter(&backward), epsilon = 1e-6);
    assert!(diameter(&forward) > 0.0);
    let pipe_cost = |link: &DirectedLink| {
        solution
            .value_of(&VariableKey::PipeCost {
                carrier: "heat".into(),
                link: link.clone(),
            })
            .unwrap()
    };
    assert_approx_eq!(f64, pipe_cost(&forward), pipe_cost(&backward), epsilon = 1e-6);
    assert!(pipe_cost(&forward) > 0.0);
}

#[test]
fn zero_roof_area_forces_zero_solar() {
    let mut builder = scenario_builder();
    for location in &mut builder.locations {
        location.roof_area = 0.0;
    }
    builder.conversion_techs.push(ConversionTechnology {
        id: "solar_pv".into(),
        kind: ConversionKind::Solar,
        lifetime: 25,
        yearly_degradation: 0.0,
        minimum_part_load: 0.0,
        maintenance_cost_rate: 0.0,
    });
    for stage in 1..=2 {
        builder
            .conversion_factors
            .insert("solar_pv".into(), "elec".into(), stage, 1.0);
    }
    builder
        .linear_conversion_cost
        .insert("solar_pv".into(), vec![50.0, 50.0]);
    builder
        .fixed_conversion_cost
        .insert("solar_pv".into(), vec![0.0, 0.0]);
    for location in ["site_a", "site_b"] {
        for year in 1..=2 {
            for step in 1..=2 {
                builder
                    .solar_irradiance
                    .insert((location.into(), year, 1, step), 0.5);
            }
        }
    }

    let scenario = builder.for_stage(1).unwrap();
    let model = HubModel::new(&scenario, TemporalResolution::TypicalDays);
    let points = Orchestrator::new(
        &model,
        OptimisationMode::CostOnly,
        SolverConfig::default(),
    )
    .run();
    assert_eq!(points[0].status, SolveStatus::Optimal);
    let solution = points[0].solution.as_ref().unwrap();

    for location in ["site_a", "site_b"] {
        for stage in 1..=2 {
            let capacity = solution
                .value_of(&VariableKey::ConversionCapacity {
                    tech: "solar_pv".into(),
                    location: location.into(),
                    stage,
                })
                .unwrap();
            assert_approx_eq!(f64, capacity, 0.0, epsilon = 1e-6);
        }
    }
}
