//! Hub locations and the exchange network that connects them.
use crate::id::define_id_type;
use crate::scenario::ConfigurationError;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

define_id_type! {LocationID}

/// A site in the hub with its building stock attributes
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    /// Unique identifier
    pub id: LocationID,
    /// Total heated floor area at the site (m2)
    pub floor_area: f64,
    /// Roof area available for solar installations (m2)
    pub roof_area: f64,
}

/// One direction of a connection between two locations
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DirectedLink {
    /// Sending location
    pub from: LocationID,
    /// Receiving location
    pub to: LocationID,
}

impl DirectedLink {
    /// The same connection traversed in the opposite direction
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

impl std::fmt::Display for DirectedLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// The exchange network: every unordered location pair, with a distance.
///
/// Distances are stored once per unordered pair; both directions of a link
/// report the same distance.
#[derive(Clone, Debug, PartialEq)]
pub struct Network {
    locations: IndexSet<LocationID>,
    /// Distance per unordered pair, keyed by the canonical direction
    distances: IndexMap<DirectedLink, f64>,
}

impl Network {
    /// Build the network from per-pair distances.
    ///
    /// `distances` must hold exactly one entry per unordered pair of distinct
    /// locations, in the order produced by iterating pair combinations of
    /// `locations`.
    pub fn from_distances(
        locations: IndexSet<LocationID>,
        distances: &[f64],
    ) -> Result<Self, ConfigurationError> {
        let num_pairs = locations.len() * (locations.len().saturating_sub(1)) / 2;
        if distances.len() != num_pairs {
            return Err(ConfigurationError::new(&format!(
                "Expected {} link distances for {} locations, got {}",
                num_pairs,
                locations.len(),
                distances.len()
            )));
        }

        let distances = locations
            .iter()
            .tuple_combinations()
            .map(|(a, b)| DirectedLink {
                from: a.clone(),
                to: b.clone(),
            })
            .zip(distances.iter().copied())
            .collect();

        Ok(Self {
            locations,
            distances,
        })
    }

    /// The location IDs in insertion order
    pub fn locations(&self) -> &IndexSet<LocationID> {
        &self.locations
    }

    /// Iterate over every unordered pair once, in canonical direction
    pub fn iter_pairs(&self) -> impl Iterator<Item = (&DirectedLink, f64)> {
        self.distances.iter().map(|(link, dist)| (link, *dist))
    }

    /// Iterate over every directed link (both directions of every pair)
    pub fn iter_links(&self) -> impl Iterator<Item = (DirectedLink, f64)> + '_ {
        self.distances
            .iter()
            .flat_map(|(link, dist)| [(link.clone(), *dist), (link.reversed(), *dist)])
    }

    /// Iterate over directed links arriving at `to`
    pub fn links_into(&self, to: &LocationID) -> impl Iterator<Item = (DirectedLink, f64)> + '_ {
        let to = to.clone();
        self.iter_links().filter(move |(link, _)| link.to == to)
    }

    /// Iterate over directed links leaving `from`
    pub fn links_out_of(
        &self,
        from: &LocationID,
    ) -> impl Iterator<Item = (DirectedLink, f64)> + '_ {
        let from = from.clone();
        self.iter_links().filter(move |(link, _)| link.from == from)
    }

    /// The distance between the two endpoints of `link`, in either direction
    pub fn distance(&self, link: &DirectedLink) -> Option<f64> {
        self.distances
            .get(link)
            .or_else(|| self.distances.get(&link.reversed()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn three_sites() -> IndexSet<LocationID> {
        ["a", "b", "c"].into_iter().map(LocationID::new).collect()
    }

    #[test]
    fn test_network_pair_count() {
        assert!(Network::from_distances(three_sites(), &[100.0, 200.0]).is_err());
        assert!(Network::from_distances(three_sites(), &[100.0, 200.0, 300.0]).is_ok());
    }

    #[test]
    fn test_network_distances_both_directions() {
        let network = Network::from_distances(three_sites(), &[100.0, 200.0, 300.0]).unwrap();
        let ab = DirectedLink {
            from: "a".into(),
            to: "b".into(),
        };
        assert_approx_eq!(f64, network.distance(&ab).unwrap(), 100.0);
        assert_approx_eq!(f64, network.distance(&ab.reversed()).unwrap(), 100.0);
    }

    #[test]
    fn test_network_directed_links() {
        let network = Network::from_distances(three_sites(), &[100.0, 200.0, 300.0]).unwrap();
        assert_eq!(network.iter_links().count(), 6);
        assert_eq!(network.links_into(&"b".into()).count(), 2);
        assert_eq!(network.links_out_of(&"b".into()).count(), 2);
    }
}
