//! Conversion and storage technology definitions.
use crate::carrier::CarrierID;
use crate::id::define_id_type;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::collections::HashMap;

define_id_type! {TechnologyID}

/// How a conversion technology is driven
#[derive(Clone, Debug, PartialEq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum)]
pub enum ConversionKind {
    /// Input flow is a free decision variable
    #[string = "dispatchable"]
    Dispatchable,
    /// Input flow is fixed by the irradiance profile and the installed area
    #[string = "solar"]
    Solar,
}

/// A technology converting one or more carriers into others
#[derive(Clone, Debug, PartialEq)]
pub struct ConversionTechnology {
    /// Unique identifier
    pub id: TechnologyID,
    /// Whether the technology is dispatchable or solar-driven
    pub kind: ConversionKind,
    /// Nominal lifetime in years
    pub lifetime: u32,
    /// Fractional loss of output per year of age
    pub yearly_degradation: f64,
    /// Minimum stable output as a fraction of capacity (dispatchable only)
    pub minimum_part_load: f64,
    /// Yearly maintenance cost as a fraction of the investment cost
    pub maintenance_cost_rate: f64,
}

/// A technology storing a single carrier across time steps
#[derive(Clone, Debug, PartialEq)]
pub struct StorageTechnology {
    /// Unique identifier
    pub id: TechnologyID,
    /// The carrier held by this storage
    pub carrier: CarrierID,
    /// Nominal lifetime in years
    pub lifetime: u32,
    /// Maximum charge per time step as a fraction of capacity
    pub max_charge_rate: f64,
    /// Maximum discharge per time step as a fraction of capacity
    pub max_discharge_rate: f64,
    /// Fractional loss of stored energy per time step
    pub standing_loss: f64,
    /// Efficiency of charging
    pub charge_efficiency: f64,
    /// Efficiency of discharging
    pub discharge_efficiency: f64,
    /// Largest installable capacity per location and stage
    pub max_capacity: f64,
    /// Fractional loss of charge/discharge efficiency per year of age
    pub yearly_degradation: f64,
    /// Yearly maintenance cost as a fraction of the investment cost
    pub maintenance_cost_rate: f64,
}

/// Sparse map of conversion efficiencies.
///
/// Keyed by technology, carrier and investment stage. A missing key means the
/// technology neither consumes nor produces that carrier (factor zero).
/// Negative factors denote consumption, positive factors production.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversionFactorMap(HashMap<(TechnologyID, CarrierID, u32), f64>);

impl ConversionFactorMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the factor for a technology/carrier/stage combination
    pub fn insert(&mut self, technology: TechnologyID, carrier: CarrierID, stage: u32, value: f64) {
        self.0.insert((technology, carrier, stage), value);
    }

    /// The factor for the given combination, zero when absent
    pub fn get(&self, technology: &TechnologyID, carrier: &CarrierID, stage: u32) -> f64 {
        self.0
            .get(&(technology.clone(), carrier.clone(), stage))
            .copied()
            .unwrap_or(0.0)
    }
}
