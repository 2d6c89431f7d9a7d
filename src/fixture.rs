//! Fixtures for tests

use crate::calendar::Calendar;
use crate::carrier::{CarrierID, CarrierRegistry};
use crate::location::{Location, LocationID, Network};
use crate::scenario::{NetworkParameters, Scenario, ScenarioBuilder};
use crate::technology::{
    ConversionFactorMap, ConversionKind, ConversionTechnology, StorageTechnology,
};
use indexmap::{IndexMap, indexmap};
use rstest::fixture;
use std::collections::HashMap;

#[fixture]
pub fn calendar() -> Calendar {
    Calendar::new(2, 2, 1, 2, IndexMap::new()).unwrap()
}

#[fixture]
pub fn carriers() -> CarrierRegistry {
    let ids = |names: &[&str]| names.iter().map(|n| CarrierID::new(n)).collect();
    CarrierRegistry::new(
        ids(&["elec", "heat", "gas"]),
        ids(&["elec", "gas"]),
        ids(&["elec"]),
        ids(&["heat"]),
        ids(&["elec", "heat"]),
    )
    .unwrap()
}

#[fixture]
pub fn network() -> Network {
    let locations = ["site_a", "site_b"]
        .into_iter()
        .map(LocationID::new)
        .collect();
    Network::from_distances(locations, &[100.0]).unwrap()
}

#[fixture]
pub fn gas_boiler() -> ConversionTechnology {
    ConversionTechnology {
        id: "gas_boiler".into(),
        kind: ConversionKind::Dispatchable,
        lifetime: 20,
        yearly_degradation: 0.0,
        minimum_part_load: 0.0,
        maintenance_cost_rate: 0.01,
    }
}

#[fixture]
pub fn battery() -> StorageTechnology {
    StorageTechnology {
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
    }
}

/// A two-site scenario over two years/stages with a gas boiler and a battery
#[fixture]
pub fn scenario_builder(
    calendar: Calendar,
    carriers: CarrierRegistry,
    network: Network,
    gas_boiler: ConversionTechnology,
    battery: StorageTechnology,
) -> ScenarioBuilder {
    let mut conversion_factors = ConversionFactorMap::new();
    for stage in calendar.stages() {
        conversion_factors.insert(gas_boiler.id.clone(), "heat".into(), stage, 0.9);
        conversion_factors.insert(gas_boiler.id.clone(), "gas".into(), stage, -1.0);
    }

    let locations = vec![
        Location {
            id: "site_a".into(),
            floor_area: 1000.0,
            roof_area: 150.0,
        },
        Location {
            id: "site_b".into(),
            floor_area: 800.0,
            roof_area: 100.0,
        },
    ];

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

#[fixture]
pub fn scenario(scenario_builder: ScenarioBuilder) -> Scenario {
    scenario_builder.for_stage(1).unwrap()
}
