//! Energy carriers and the role subsets they can belong to.
use crate::id::define_id_type;
use crate::scenario::ConfigurationError;
use indexmap::IndexSet;

define_id_type! {CarrierID}

/// The full carrier set together with its role subsets.
///
/// A carrier may belong to any combination of subsets; every subset member
/// must also appear in the full set.
#[derive(Clone, Debug, PartialEq)]
pub struct CarrierRegistry {
    /// Every carrier known to the scenario
    pub all: IndexSet<CarrierID>,
    /// Carriers that can be bought from outside the system
    pub importable: IndexSet<CarrierID>,
    /// Carriers that can be sold to outside the system
    pub exportable: IndexSet<CarrierID>,
    /// Carriers that can flow between locations over the network
    pub exchangeable: IndexSet<CarrierID>,
    /// Carriers with an end-use demand profile
    pub demanded: IndexSet<CarrierID>,
}

impl CarrierRegistry {
    /// Create a registry, checking that every subset is contained in `all`
    pub fn new(
        all: IndexSet<CarrierID>,
        importable: IndexSet<CarrierID>,
        exportable: IndexSet<CarrierID>,
        exchangeable: IndexSet<CarrierID>,
        demanded: IndexSet<CarrierID>,
    ) -> Result<Self, ConfigurationError> {
        if all.is_empty() {
            return Err(ConfigurationError::new("Carrier set cannot be empty"));
        }
        for (name, subset) in [
            ("importable", &importable),
            ("exportable", &exportable),
            ("exchangeable", &exchangeable),
            ("demanded", &demanded),
        ] {
            if let Some(unknown) = subset.iter().find(|id| !all.contains(*id)) {
                return Err(ConfigurationError::new(&format!(
                    "Carrier {unknown} in the {name} subset is not in the carrier set"
                )));
            }
        }

        Ok(Self {
            all,
            importable,
            exportable,
            exchangeable,
            demanded,
        })
    }

    /// Whether the carrier can be imported
    pub fn is_importable(&self, id: &CarrierID) -> bool {
        self.importable.contains(id)
    }

    /// Whether the carrier can be exported
    pub fn is_exportable(&self, id: &CarrierID) -> bool {
        self.exportable.contains(id)
    }

    /// Whether the carrier can be exchanged between locations
    pub fn is_exchangeable(&self, id: &CarrierID) -> bool {
        self.exchangeable.contains(id)
    }

    /// Whether the carrier has an end-use demand
    pub fn is_demanded(&self, id: &CarrierID) -> bool {
        self.demanded.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> IndexSet<CarrierID> {
        names.iter().map(|n| CarrierID::new(n)).collect()
    }

    #[test]
    fn test_registry_valid() {
        let registry = CarrierRegistry::new(
            ids(&["elec", "heat", "gas"]),
            ids(&["elec", "gas"]),
            ids(&["elec"]),
            ids(&["heat"]),
            ids(&["elec", "heat"]),
        )
        .unwrap();
        assert!(registry.is_importable(&CarrierID::new("gas")));
        assert!(!registry.is_demanded(&CarrierID::new("gas")));
    }

    #[test]
    fn test_registry_unknown_subset_member() {
        let result = CarrierRegistry::new(
            ids(&["elec"]),
            ids(&["gas"]),
            ids(&[]),
            ids(&[]),
            ids(&[]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_registry_empty() {
        assert!(
            CarrierRegistry::new(ids(&[]), ids(&[]), ids(&[]), ids(&[]), ids(&[])).is_err()
        );
    }
}
