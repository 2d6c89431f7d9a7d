//! Scenario assembly: the full parameter universe consumed by the hub model.
//!
//! The [`ScenarioBuilder`] holds base series as supplied by the input files.
//! [`ScenarioBuilder::for_stage`] turns them into one immutable [`Scenario`]
//! whose year-indexed maps are anchored to the flat year horizon. Each call
//! produces an independent value, so driving several investment stages never
//! shares mutable state between them.
use crate::calendar::{Calendar, Day, Stage, TimeStep, Year};
use crate::carrier::{CarrierID, CarrierRegistry};
use crate::id::IDLike;
use crate::location::{Location, LocationID, Network};
use crate::technology::{
    ConversionFactorMap, ConversionTechnology, StorageTechnology, TechnologyID,
};
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// Indicates that the scenario inputs are structurally inconsistent.
#[derive(Debug, Clone)]
pub struct ConfigurationError {
    message: String,
}

impl ConfigurationError {
    pub fn new(message: &str) -> ConfigurationError {
        ConfigurationError {
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// This is needed so that ConfigurationError can be treated like standard errors are.
impl Error for ConfigurationError {}

/// Coefficients of the linear pipe-sizing and pipe-cost relations
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkParameters {
    /// Pipe diameter per unit of peak exchanged flow
    pub diameter_per_flow: f64,
    /// Fixed diameter contribution of an active connection
    pub diameter_fixed: f64,
    /// Pipe cost per unit of diameter and metre
    pub cost_per_diameter: f64,
    /// Fixed pipe cost per metre of an active connection
    pub cost_fixed: f64,
    /// Fraction of exchanged flow lost per metre of pipe
    pub loss_per_metre: f64,
    /// Nominal lifetime of network assets in years
    pub lifetime: u32,
}

/// One complete, immutable parameter set for a model build.
///
/// All year-indexed maps are keyed by the flat year horizon. Demand and
/// irradiance default to zero for absent keys; cost and price maps are
/// validated for completeness when the scenario is built.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    /// Temporal dimensions of the horizon
    pub calendar: Calendar,
    /// Energy carriers and their role subsets
    pub carriers: CarrierRegistry,
    /// The inter-site exchange network
    pub network: Network,
    /// The sites of the hub
    pub locations: Vec<Location>,
    /// Candidate conversion technologies
    pub conversion_techs: Vec<ConversionTechnology>,
    /// Candidate storage technologies
    pub storage_techs: Vec<StorageTechnology>,
    /// Conversion efficiencies per technology, carrier and stage
    pub conversion_factors: ConversionFactorMap,
    linear_conversion_cost: HashMap<(TechnologyID, Year), f64>,
    fixed_conversion_cost: HashMap<(TechnologyID, Year), f64>,
    linear_storage_cost: HashMap<(TechnologyID, Year), f64>,
    fixed_storage_cost: HashMap<(TechnologyID, Year), f64>,
    import_prices: HashMap<(CarrierID, Year), f64>,
    export_prices: HashMap<(CarrierID, Year), f64>,
    carbon_factors: HashMap<(CarrierID, Year), f64>,
    demand: HashMap<(CarrierID, Day, TimeStep), f64>,
    solar_irradiance: HashMap<(LocationID, Year, Day, TimeStep), f64>,
    biomass_per_area: HashMap<Year, f64>,
    /// The carrier whose imports are capped by the site's biomass availability
    pub biomass_carrier: Option<CarrierID>,
    /// Yearly discount rate applied to all cash flows
    pub discount_rate: f64,
    /// Coefficients of the pipe-sizing and pipe-cost relations
    pub network_params: NetworkParameters,
    /// Big-M constant used in install and connection gating rows
    pub big_m: f64,
}

impl Scenario {
    /// End-use demand for a carrier at a day/time step, zero when absent
    pub fn demand(&self, carrier: &CarrierID, day: Day, step: TimeStep) -> f64 {
        self.demand
            .get(&(carrier.clone(), day, step))
            .copied()
            .unwrap_or(0.0)
    }

    /// Solar irradiance at a location/year/day/time step, zero when absent
    pub fn irradiance(&self, location: &LocationID, year: Year, day: Day, step: TimeStep) -> f64 {
        self.solar_irradiance
            .get(&(location.clone(), year, day, step))
            .copied()
            .unwrap_or(0.0)
    }

    /// Capacity-proportional investment cost of a conversion technology
    pub fn linear_conversion_cost(&self, tech: &TechnologyID, year: Year) -> f64 {
        lookup(&self.linear_conversion_cost, tech, year)
    }

    /// Fixed investment cost of a conversion technology
    pub fn fixed_conversion_cost(&self, tech: &TechnologyID, year: Year) -> f64 {
        lookup(&self.fixed_conversion_cost, tech, year)
    }

    /// Capacity-proportional investment cost of a storage technology
    pub fn linear_storage_cost(&self, tech: &TechnologyID, year: Year) -> f64 {
        lookup(&self.linear_storage_cost, tech, year)
    }

    /// Fixed investment cost of a storage technology
    pub fn fixed_storage_cost(&self, tech: &TechnologyID, year: Year) -> f64 {
        lookup(&self.fixed_storage_cost, tech, year)
    }

    /// Price paid per unit of an imported carrier
    pub fn import_price(&self, carrier: &CarrierID, year: Year) -> f64 {
        lookup(&self.import_prices, carrier, year)
    }

    /// Price received per unit of an exported carrier
    pub fn export_price(&self, carrier: &CarrierID, year: Year) -> f64 {
        lookup(&self.export_prices, carrier, year)
    }

    /// Carbon emitted per unit of an imported carrier
    pub fn carbon_factor(&self, carrier: &CarrierID, year: Year) -> f64 {
        lookup(&self.carbon_factors, carrier, year)
    }

    /// Biomass available per unit of floor area in a year
    pub fn biomass_per_area(&self, year: Year) -> f64 {
        self.biomass_per_area.get(&year).copied().unwrap_or(0.0)
    }
}

/// Look up a (key, year) entry; completeness is validated at scenario build
fn lookup<K: IDLike>(map: &HashMap<(K, Year), f64>, key: &K, year: Year) -> f64 {
    map.get(&(key.clone(), year)).copied().unwrap_or(0.0)
}

/// Base series keyed per technology or carrier, one value per horizon year
pub type YearlySeries<K> = IndexMap<K, Vec<f64>>;

/// Holds the raw scenario inputs and regenerates per-stage parameter sets.
#[derive(Clone, Debug)]
pub struct ScenarioBuilder {
    /// Temporal dimensions of the horizon
    pub calendar: Calendar,
    /// Energy carriers and their role subsets
    pub carriers: CarrierRegistry,
    /// The inter-site exchange network
    pub network: Network,
    /// The sites of the hub
    pub locations: Vec<Location>,
    /// Candidate conversion technologies
    pub conversion_techs: Vec<ConversionTechnology>,
    /// Candidate storage technologies
    pub storage_techs: Vec<StorageTechnology>,
    /// Conversion efficiencies per technology, carrier and stage
    pub conversion_factors: ConversionFactorMap,
    /// Per-year capacity-proportional conversion investment costs
    pub linear_conversion_cost: YearlySeries<TechnologyID>,
    /// Per-year fixed conversion investment costs
    pub fixed_conversion_cost: YearlySeries<TechnologyID>,
    /// Per-year capacity-proportional storage investment costs
    pub linear_storage_cost: YearlySeries<TechnologyID>,
    /// Per-year fixed storage investment costs
    pub fixed_storage_cost: YearlySeries<TechnologyID>,
    /// Per-year import prices per carrier
    pub import_prices: YearlySeries<CarrierID>,
    /// Per-year export prices per carrier
    pub export_prices: YearlySeries<CarrierID>,
    /// Per-year carbon factors per carrier
    pub carbon_factors: YearlySeries<CarrierID>,
    /// End-use demand per carrier, day and time step
    pub demand: HashMap<(CarrierID, Day, TimeStep), f64>,
    /// Solar irradiance per location, year, day and time step
    pub solar_irradiance: HashMap<(LocationID, Year, Day, TimeStep), f64>,
    /// Biomass available per unit of floor area, one value per year
    pub biomass_per_area: Vec<f64>,
    /// The carrier whose imports are capped by the site's biomass availability
    pub biomass_carrier: Option<CarrierID>,
    /// Yearly discount rate applied to all cash flows
    pub discount_rate: f64,
    /// Coefficients of the pipe-sizing and pipe-cost relations
    pub network_params: NetworkParameters,
    /// Big-M constant used in install and connection gating rows
    pub big_m: f64,
}

/// Zip a flat per-year series onto the year horizon.
///
/// The series must cover the whole horizon; a shorter series is an error
/// rather than a silent truncation. Values beyond the horizon are ignored.
pub fn expand_yearly_series(
    name: &str,
    base: &[f64],
    years: impl Iterator<Item = Year> + Clone,
) -> Result<HashMap<Year, f64>, ConfigurationError> {
    let num_years = years.clone().count();
    if base.len() < num_years {
        return Err(ConfigurationError::new(&format!(
            "Yearly series for {name} covers {} years but the horizon has {num_years}",
            base.len()
        )));
    }

    Ok(years.zip(base.iter().copied()).collect())
}

/// Expand the series stored under `key`, re-keying every entry by (key, year)
fn expand_keyed<K: IDLike>(
    name: &str,
    series: &YearlySeries<K>,
    key: &K,
    years: impl Iterator<Item = Year> + Clone,
) -> Result<HashMap<(K, Year), f64>, ConfigurationError> {
    let base = series
        .get(key)
        .ok_or_else(|| ConfigurationError::new(&format!("Missing yearly series for {name}")))?;
    let expanded = expand_yearly_series(name, base, years)?;

    Ok(expanded
        .into_iter()
        .map(|(y, v)| ((key.clone(), y), v))
        .collect())
}

impl ScenarioBuilder {
    /// Build the immutable scenario for one investment-stage run.
    ///
    /// Every year-indexed base series is expanded against the flat year
    /// horizon and the resulting maps are checked for completeness over the
    /// technology and carrier sets the model will iterate over.
    pub fn for_stage(&self, stage: Stage) -> Result<Scenario, ConfigurationError> {
        if !self.calendar.stages().contains(&stage) {
            return Err(ConfigurationError::new(&format!(
                "Investment stage {stage} is outside the calendar's stage range"
            )));
        }

        let mut linear_conversion_cost = HashMap::new();
        let mut fixed_conversion_cost = HashMap::new();
        for tech in &self.conversion_techs {
            linear_conversion_cost.extend(expand_keyed(
                &format!("linear investment cost of {}", tech.id),
                &self.linear_conversion_cost,
                &tech.id,
                self.calendar.years(),
            )?);
            fixed_conversion_cost.extend(expand_keyed(
                &format!("fixed investment cost of {}", tech.id),
                &self.fixed_conversion_cost,
                &tech.id,
                self.calendar.years(),
            )?);
        }

        let mut linear_storage_cost = HashMap::new();
        let mut fixed_storage_cost = HashMap::new();
        for tech in &self.storage_techs {
            if !self.carriers.all.contains(&tech.carrier) {
                return Err(ConfigurationError::new(&format!(
                    "Storage {} stores unknown carrier {}",
                    tech.id, tech.carrier
                )));
            }
            linear_storage_cost.extend(expand_keyed(
                &format!("linear investment cost of {}", tech.id),
                &self.linear_storage_cost,
                &tech.id,
                self.calendar.years(),
            )?);
            fixed_storage_cost.extend(expand_keyed(
                &format!("fixed investment cost of {}", tech.id),
                &self.fixed_storage_cost,
                &tech.id,
                self.calendar.years(),
            )?);
        }

        let mut import_prices = HashMap::new();
        let mut carbon_factors = HashMap::new();
        for carrier in &self.carriers.importable {
            import_prices.extend(expand_keyed(
                &format!("import price of {carrier}"),
                &self.import_prices,
                carrier,
                self.calendar.years(),
            )?);
            carbon_factors.extend(expand_keyed(
                &format!("carbon factor of {carrier}"),
                &self.carbon_factors,
                carrier,
                self.calendar.years(),
            )?);
        }

        let mut export_prices = HashMap::new();
        for carrier in &self.carriers.exportable {
            export_prices.extend(expand_keyed(
                &format!("export price of {carrier}"),
                &self.export_prices,
                carrier,
                self.calendar.years(),
            )?);
        }

        if let Some(carrier) = &self.biomass_carrier {
            if !self.carriers.importable.contains(carrier) {
                return Err(ConfigurationError::new(&format!(
                    "Biomass carrier {carrier} is not importable"
                )));
            }
        }
        let biomass_per_area = expand_yearly_series(
            "biomass availability per floor area",
            &self.biomass_per_area,
            self.calendar.years(),
        )?;

        Ok(Scenario {
            calendar: self.calendar.clone(),
            carriers: self.carriers.clone(),
            network: self.network.clone(),
            locations: self.locations.clone(),
            conversion_techs: self.conversion_techs.clone(),
            storage_techs: self.storage_techs.clone(),
            conversion_factors: self.conversion_factors.clone(),
            linear_conversion_cost,
            fixed_conversion_cost,
            linear_storage_cost,
            fixed_storage_cost,
            import_prices,
            export_prices,
            carbon_factors,
            demand: self.demand.clone(),
            solar_irradiance: self.solar_irradiance.clone(),
            biomass_per_area,
            biomass_carrier: self.biomass_carrier.clone(),
            discount_rate: self.discount_rate,
            network_params: self.network_params.clone(),
            big_m: self.big_m,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_expand_yearly_series() {
        let expanded = expand_yearly_series("test", &[1.0, 2.0, 3.0], 1..=3).unwrap();
        assert_eq!(expanded.len(), 3);
        assert_approx_eq!(f64, expanded[&2], 2.0);
    }

    #[test]
    fn test_expand_yearly_series_too_short() {
        assert!(expand_yearly_series("test", &[1.0, 2.0], 1..=3).is_err());
    }

    #[test]
    fn test_expand_yearly_series_extra_values_ignored() {
        let expanded = expand_yearly_series("test", &[1.0, 2.0, 3.0, 4.0], 1..=3).unwrap();
        assert_eq!(expanded.len(), 3);
    }
}
