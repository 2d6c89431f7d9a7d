//! Reading of scenario input files.
//!
//! A scenario is one TOML file plus CSV files for the time series it points
//! to. File paths inside the TOML are resolved relative to its directory.
use crate::calendar::{Calendar, Day, TimeStep, Year};
use crate::carrier::{CarrierID, CarrierRegistry};
use crate::id::IDCollection;
use crate::location::{Location, LocationID, Network};
use crate::scenario::{NetworkParameters, ScenarioBuilder};
use crate::technology::{
    ConversionFactorMap, ConversionKind, ConversionTechnology, StorageTechnology, TechnologyID,
};
use anyhow::{Context, Result, ensure};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a series of type Ts from a CSV file into a Vec<T>.
///
/// # Arguments
///
/// * `csv_file_path`: Path to the CSV file
pub fn read_vec_from_csv<T: DeserializeOwned>(csv_file_path: &Path) -> Result<Vec<T>> {
    let context = || format!("Error reading {}", csv_file_path.to_string_lossy());

    let mut reader = csv::Reader::from_path(csv_file_path).with_context(context)?;
    let mut vec = Vec::new();
    for result in reader.deserialize() {
        let d: T = result.with_context(context)?;
        vec.push(d)
    }
    ensure!(!vec.is_empty(), "{}: CSV file cannot be empty", context());

    Ok(vec)
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value is not between 0 and 1"))?
    }

    Ok(value)
}

fn default_big_m() -> f64 {
    1e6
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    calendar: CalendarSection,
    economy: EconomySection,
    carriers: CarriersSection,
    network: NetworkSection,
    #[serde(rename = "location")]
    locations: Vec<LocationSection>,
    #[serde(rename = "conversion_tech", default)]
    conversion_techs: Vec<ConversionTechSection>,
    #[serde(rename = "storage_tech", default)]
    storage_techs: Vec<StorageTechSection>,
    prices: PricesSection,
    #[serde(default)]
    series: SeriesSection,
}

#[derive(Debug, Deserialize)]
struct CalendarSection {
    years: u32,
    stages: u32,
    days: u32,
    time_steps: u32,
    day_weights_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct EconomySection {
    discount_rate: f64,
    #[serde(default = "default_big_m")]
    big_m: f64,
    /// Biomass available per unit of floor area, one value per year
    #[serde(default)]
    biomass_per_area: Vec<f64>,
    biomass_carrier: Option<CarrierID>,
}

#[derive(Debug, Deserialize)]
struct CarriersSection {
    all: Vec<CarrierID>,
    #[serde(default)]
    importable: Vec<CarrierID>,
    #[serde(default)]
    exportable: Vec<CarrierID>,
    #[serde(default)]
    exchangeable: Vec<CarrierID>,
    #[serde(default)]
    demanded: Vec<CarrierID>,
}

#[derive(Debug, Deserialize)]
struct NetworkSection {
    /// One distance per unordered location pair, in pair-combination order
    distances: Vec<f64>,
    loss_per_metre: f64,
    diameter_per_flow: f64,
    diameter_fixed: f64,
    cost_per_diameter: f64,
    cost_fixed: f64,
    lifetime: u32,
}

#[derive(Debug, Deserialize)]
struct LocationSection {
    id: LocationID,
    floor_area: f64,
    roof_area: f64,
}

#[derive(Debug, Deserialize)]
struct ConversionTechSection {
    id: TechnologyID,
    kind: ConversionKind,
    lifetime: u32,
    #[serde(default, deserialize_with = "deserialise_proportion")]
    yearly_degradation: f64,
    #[serde(default, deserialize_with = "deserialise_proportion")]
    minimum_part_load: f64,
    #[serde(default)]
    maintenance_cost_rate: f64,
    /// Investment cost per unit of capacity, one value per year
    linear_cost: Vec<f64>,
    /// Fixed investment cost, one value per year
    fixed_cost: Vec<f64>,
    /// Conversion factor per carrier, one value per investment stage
    factors: IndexMap<CarrierID, Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct StorageTechSection {
    id: TechnologyID,
    carrier: CarrierID,
    lifetime: u32,
    #[serde(deserialize_with = "deserialise_proportion")]
    max_charge_rate: f64,
    #[serde(deserialize_with = "deserialise_proportion")]
    max_discharge_rate: f64,
    #[serde(deserialize_with = "deserialise_proportion")]
    standing_loss: f64,
    #[serde(deserialize_with = "deserialise_proportion")]
    charge_efficiency: f64,
    #[serde(deserialize_with = "deserialise_proportion")]
    discharge_efficiency: f64,
    max_capacity: f64,
    #[serde(default, deserialize_with = "deserialise_proportion")]
    yearly_degradation: f64,
    #[serde(default)]
    maintenance_cost_rate: f64,
    linear_cost: Vec<f64>,
    fixed_cost: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct PricesSection {
    /// Import price per carrier, one value per year
    import: IndexMap<CarrierID, Vec<f64>>,
    #[serde(default)]
    export: IndexMap<CarrierID, Vec<f64>>,
    /// Carbon emitted per unit imported, one series per carrier
    #[serde(default)]
    carbon: IndexMap<CarrierID, Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct SeriesSection {
    demand_file: Option<PathBuf>,
    solar_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct DemandRow {
    carrier: String,
    day: Day,
    time_step: TimeStep,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct SolarRow {
    location: String,
    year: Year,
    day: Day,
    time_step: TimeStep,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct DayWeightRow {
    day: Day,
    weight: f64,
}

/// Load a scenario TOML file and the CSV series it references.
///
/// Structural validation beyond basic shape checks happens when the builder
/// regenerates a per-stage scenario.
pub fn load_scenario(scenario_file: &Path) -> Result<ScenarioBuilder> {
    let contents = fs::read_to_string(scenario_file)
        .with_context(|| format!("Could not read {}", scenario_file.to_string_lossy()))?;
    let file: ScenarioFile = toml::from_str(&contents)
        .with_context(|| format!("Error parsing {}", scenario_file.to_string_lossy()))?;
    let base_dir = scenario_file.parent().unwrap_or(Path::new("."));

    let day_weights = match &file.calendar.day_weights_file {
        Some(path) => read_vec_from_csv::<DayWeightRow>(&base_dir.join(path))?
            .into_iter()
            .map(|row| (row.day, row.weight))
            .collect(),
        None => IndexMap::new(),
    };
    let calendar = Calendar::new(
        file.calendar.years,
        file.calendar.stages,
        file.calendar.days,
        file.calendar.time_steps,
        day_weights,
    )?;

    let carriers = CarrierRegistry::new(
        file.carriers.all.into_iter().collect(),
        file.carriers.importable.into_iter().collect(),
        file.carriers.exportable.into_iter().collect(),
        file.carriers.exchangeable.into_iter().collect(),
        file.carriers.demanded.into_iter().collect(),
    )?;

    let location_ids: IndexSet<LocationID> =
        file.locations.iter().map(|l| l.id.clone()).collect();
    ensure!(
        location_ids.len() == file.locations.len(),
        "Duplicate location IDs in {}",
        scenario_file.to_string_lossy()
    );
    let network = Network::from_distances(location_ids, &file.network.distances)?;
    let locations = file
        .locations
        .into_iter()
        .map(|l| Location {
            id: l.id,
            floor_area: l.floor_area,
            roof_area: l.roof_area,
        })
        .collect();

    let num_stages = calendar.stages().count();
    let mut conversion_factors = ConversionFactorMap::new();
    let mut conversion_techs = Vec::new();
    let mut linear_conversion_cost = IndexMap::new();
    let mut fixed_conversion_cost = IndexMap::new();
    for tech in file.conversion_techs {
        for (carrier, factors) in &tech.factors {
            ensure!(
                carriers.all.contains(carrier),
                "Conversion factor of {} names unknown carrier {carrier}",
                tech.id
            );
            ensure!(
                factors.len() >= num_stages,
                "Conversion factor of {} for {carrier} covers {} stages but there are {num_stages}",
                tech.id,
                factors.len()
            );
            for (stage, value) in calendar.stages().zip(factors) {
                conversion_factors.insert(tech.id.clone(), carrier.clone(), stage, *value);
            }
        }
        linear_conversion_cost.insert(tech.id.clone(), tech.linear_cost);
        fixed_conversion_cost.insert(tech.id.clone(), tech.fixed_cost);
        conversion_techs.push(ConversionTechnology {
            id: tech.id,
            kind: tech.kind,
            lifetime: tech.lifetime,
            yearly_degradation: tech.yearly_degradation,
            minimum_part_load: tech.minimum_part_load,
            maintenance_cost_rate: tech.maintenance_cost_rate,
        });
    }

    let mut storage_techs = Vec::new();
    let mut linear_storage_cost = IndexMap::new();
    let mut fixed_storage_cost = IndexMap::new();
    for tech in file.storage_techs {
        linear_storage_cost.insert(tech.id.clone(), tech.linear_cost);
        fixed_storage_cost.insert(tech.id.clone(), tech.fixed_cost);
        storage_techs.push(StorageTechnology {
            id: tech.id,
            carrier: tech.carrier,
            lifetime: tech.lifetime,
            max_charge_rate: tech.max_charge_rate,
            max_discharge_rate: tech.max_discharge_rate,
            standing_loss: tech.standing_loss,
            charge_efficiency: tech.charge_efficiency,
            discharge_efficiency: tech.discharge_efficiency,
            max_capacity: tech.max_capacity,
            yearly_degradation: tech.yearly_degradation,
            maintenance_cost_rate: tech.maintenance_cost_rate,
        });
    }

    let mut demand: HashMap<(CarrierID, Day, TimeStep), f64> = HashMap::new();
    if let Some(path) = &file.series.demand_file {
        for row in read_vec_from_csv::<DemandRow>(&base_dir.join(path))? {
            let carrier = carriers.all.get_id_by_str(&row.carrier)?;
            demand.insert((carrier, row.day, row.time_step), row.value);
        }
    }
    let mut solar_irradiance: HashMap<(LocationID, Year, Day, TimeStep), f64> = HashMap::new();
    if let Some(path) = &file.series.solar_file {
        for row in read_vec_from_csv::<SolarRow>(&base_dir.join(path))? {
            let location = network.locations().get_id_by_str(&row.location)?;
            solar_irradiance.insert((location, row.year, row.day, row.time_step), row.value);
        }
    }

    let biomass_per_area = if file.economy.biomass_per_area.is_empty() {
        vec![0.0; calendar.num_years() as usize]
    } else {
        file.economy.biomass_per_area
    };

    Ok(ScenarioBuilder {
        calendar,
        carriers,
        network,
        locations,
        conversion_techs,
        storage_techs,
        conversion_factors,
        linear_conversion_cost,
        fixed_conversion_cost,
        linear_storage_cost,
        fixed_storage_cost,
        import_prices: file.prices.import,
        export_prices: file.prices.export,
        carbon_factors: file.prices.carbon,
        demand,
        solar_irradiance,
        biomass_per_area,
        biomass_carrier: file.economy.biomass_carrier,
        discount_rate: file.economy.discount_rate,
        network_params: NetworkParameters {
            diameter_per_flow: file.network.diameter_per_flow,
            diameter_fixed: file.network.diameter_fixed,
            cost_per_diameter: file.network.cost_per_diameter,
            cost_fixed: file.network.cost_fixed,
            loss_per_metre: file.network.loss_per_metre,
            lifetime: file.network.lifetime,
        },
        big_m: file.economy.big_m,
    })
}
