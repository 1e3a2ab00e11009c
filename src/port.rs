use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::container::{total_weight, Container, ContainerType};
use crate::error::{check_quantity, EntityKind, FleetError, FleetResult};
use crate::geo::Coordinate;

/// Number of completed trips a port remembers. Older entries are evicted first.
pub const PAST_TRIP_LIMIT: usize = 7;

/// A port that stores containers and docks vehicles.
///
/// Resident containers are owned by the port. Vehicles and trips are tracked
/// by id; the fleet registry owns those values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub name: String,
    pub location: Coordinate,
    /// Maximum total container weight in kg
    pub storing_capacity: f64,
    /// Whether trucks can reach this port
    pub landing_ability: bool,
    /// Reattached from the containers collection on load
    #[serde(skip)]
    containers: Vec<Container>,
    vehicles: BTreeSet<String>,
    current_trips: Vec<String>,
    past_trips: VecDeque<String>,
}

impl Port {
    pub fn new(
        id: &str,
        name: &str,
        latitude: f64,
        longitude: f64,
        storing_capacity: f64,
        landing_ability: bool,
    ) -> FleetResult<Self> {
        let location = Coordinate::new(latitude, longitude);
        if !location.is_valid() {
            return Err(FleetError::InvalidCoordinate { latitude, longitude });
        }
        check_quantity("storing capacity", storing_capacity)?;
        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            location,
            storing_capacity,
            landing_ability,
            containers: Vec::new(),
            vehicles: BTreeSet::new(),
            current_trips: Vec::new(),
            past_trips: VecDeque::with_capacity(PAST_TRIP_LIMIT + 1),
        })
    }

    // ==========================================
    // Containers
    // ==========================================

    /// Total weight of resident containers
    pub fn stored_weight(&self) -> f64 {
        total_weight(&self.containers)
    }

    /// Remaining storage in kg (never negative)
    pub fn available_capacity(&self) -> f64 {
        (self.storing_capacity - self.stored_weight()).max(0.0)
    }

    /// Check whether `container` fits without storing it
    pub fn check_container(&self, container: &Container) -> FleetResult<()> {
        container.validate()?;
        if self.stored_weight() + container.weight > self.storing_capacity {
            return Err(FleetError::CapacityExceeded {
                requested: container.weight,
                available: self.available_capacity(),
            });
        }
        Ok(())
    }

    /// Store a container, rejecting it if the port would exceed its storing capacity
    pub fn add_container(&mut self, container: Container) -> FleetResult<()> {
        self.check_container(&container)?;
        self.containers.push(container);
        Ok(())
    }

    /// Remove a container by id. Returns the container if it was here.
    pub fn remove_container(&mut self, container_id: &str) -> Option<Container> {
        let idx = self.containers.iter().position(|c| c.id == container_id)?;
        Some(self.containers.remove(idx))
    }

    pub fn container(&self, container_id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == container_id)
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Total resident weight grouped by container type
    pub fn weight_by_type(&self) -> BTreeMap<ContainerType, f64> {
        let mut by_type = BTreeMap::new();
        for c in &self.containers {
            *by_type.entry(c.kind).or_insert(0.0) += c.weight;
        }
        by_type
    }

    /// Replace a resident container in place, re-checking capacity against
    /// every other resident. The port is untouched on failure.
    pub(crate) fn replace_container(&mut self, updated: Container) -> FleetResult<()> {
        let idx = self
            .containers
            .iter()
            .position(|c| c.id == updated.id)
            .ok_or_else(|| FleetError::not_found(EntityKind::Container, &updated.id))?;
        updated.validate()?;
        let others = self.stored_weight() - self.containers[idx].weight;
        if others + updated.weight > self.storing_capacity {
            return Err(FleetError::CapacityExceeded {
                requested: updated.weight,
                available: (self.storing_capacity - others).max(0.0),
            });
        }
        self.containers[idx] = updated;
        Ok(())
    }

    // ==========================================
    // Vehicles
    // ==========================================

    pub fn add_vehicle(&mut self, vehicle_id: &str) {
        self.vehicles.insert(vehicle_id.to_string());
    }

    pub fn remove_vehicle(&mut self, vehicle_id: &str) {
        self.vehicles.remove(vehicle_id);
    }

    pub fn has_vehicle(&self, vehicle_id: &str) -> bool {
        self.vehicles.contains(vehicle_id)
    }

    pub fn vehicle_ids(&self) -> impl Iterator<Item = &str> {
        self.vehicles.iter().map(String::as_str)
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    // ==========================================
    // Geography
    // ==========================================

    /// Great-circle distance to another port in km
    pub fn calculate_distance(&self, other: &Port) -> f64 {
        self.location.distance_to(&other.location)
    }

    // ==========================================
    // Traffic
    // ==========================================

    /// Register a trip as current traffic through this port
    pub fn add_trip(&mut self, trip_id: &str) {
        self.current_trips.push(trip_id.to_string());
    }

    /// Move a trip from current to past traffic.
    ///
    /// Returns the id evicted from the history, if the history overflowed.
    pub fn complete_trip(&mut self, trip_id: &str) -> Option<String> {
        self.current_trips.retain(|t| t != trip_id);
        self.past_trips.push_back(trip_id.to_string());
        if self.past_trips.len() > PAST_TRIP_LIMIT {
            self.past_trips.pop_front()
        } else {
            None
        }
    }

    pub fn current_trips(&self) -> &[String] {
        &self.current_trips
    }

    pub fn past_trips(&self) -> impl Iterator<Item = &str> {
        self.past_trips.iter().map(String::as_str)
    }

    /// Whether the port's traffic lists mention a trip
    pub fn references_trip(&self, trip_id: &str) -> bool {
        self.current_trips.iter().any(|t| t == trip_id) || self.past_trips.iter().any(|t| t == trip_id)
    }

    /// Whether removing the port would strand containers, vehicles or trips
    pub fn is_in_use(&self) -> bool {
        !self.containers.is_empty() || !self.vehicles.is_empty() || !self.current_trips.is_empty()
    }

    // ==========================================
    // Administrative edits
    // ==========================================

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn set_landing_ability(&mut self, landing_ability: bool) {
        self.landing_ability = landing_ability;
    }

    /// Change storing capacity; cannot drop below what is already stored
    pub fn set_storing_capacity(&mut self, capacity: f64) -> FleetResult<()> {
        check_quantity("storing capacity", capacity)?;
        let stored = self.stored_weight();
        if capacity < stored {
            return Err(FleetError::CapacityExceeded {
                requested: stored,
                available: capacity,
            });
        }
        self.storing_capacity = capacity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(capacity: f64) -> Port {
        Port::new("P1", "Harbor", 40.7128, -74.0060, capacity, true).unwrap()
    }

    #[test]
    fn test_new_port_rejects_bad_coordinates() {
        assert!(matches!(
            Port::new("P", "Nowhere", 91.0, 0.0, 1000.0, true),
            Err(FleetError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            Port::new("P", "Nowhere", 0.0, 181.0, 1000.0, true),
            Err(FleetError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_new_port_rejects_bad_capacity() {
        for capacity in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Port::new("P", "Harbor", 0.0, 0.0, capacity, true),
                Err(FleetError::InvalidQuantity { .. })
            ));
        }
        let mut p = port(1000.0);
        assert!(p.set_storing_capacity(f64::NAN).is_err());
        assert!(p.set_storing_capacity(-5.0).is_err());
        assert_eq!(p.storing_capacity, 1000.0);
    }

    #[test]
    fn test_bad_weights_cannot_bypass_capacity() {
        let mut p = port(10_000.0);
        for weight in [f64::NAN, -50_000.0, f64::INFINITY] {
            assert!(matches!(
                p.add_container(Container::new("X", weight, ContainerType::DryStorage)),
                Err(FleetError::InvalidQuantity { .. })
            ));
        }
        assert_eq!(p.container_count(), 0);

        p.add_container(Container::new("A", 9000.0, ContainerType::DryStorage)).unwrap();
        assert!(p.add_container(Container::new("B", 9000.0, ContainerType::DryStorage)).is_err());
        assert!(p.replace_container(Container::new("A", f64::NAN, ContainerType::DryStorage)).is_err());
        assert_eq!(p.stored_weight(), 9000.0);
    }

    #[test]
    fn test_capacity_scenario() {
        let mut p = port(10_000.0);
        p.add_container(Container::new("C1", 6000.0, ContainerType::DryStorage)).unwrap();

        let err = p
            .add_container(Container::new("C2", 5000.0, ContainerType::DryStorage))
            .unwrap_err();
        assert!(matches!(err, FleetError::CapacityExceeded { .. }));
        assert_eq!(p.container_count(), 1);
        assert_eq!(p.stored_weight(), 6000.0);

        p.add_container(Container::new("C3", 3000.0, ContainerType::OpenTop)).unwrap();
        assert_eq!(p.stored_weight(), 9000.0);
        assert_eq!(p.available_capacity(), 1000.0);
    }

    #[test]
    fn test_fill_to_exact_capacity() {
        let mut p = port(5000.0);
        p.add_container(Container::new("C1", 5000.0, ContainerType::Liquid)).unwrap();
        assert_eq!(p.available_capacity(), 0.0);
        assert!(p.add_container(Container::new("C2", 0.5, ContainerType::Liquid)).is_err());
    }

    #[test]
    fn test_stored_weight_never_exceeds_capacity() {
        let mut p = port(10_000.0);
        for i in 0..20 {
            let weight = 700.0 + (i as f64) * 130.0;
            let _ = p.add_container(Container::new(&format!("C{i}"), weight, ContainerType::DryStorage));
            assert!(p.stored_weight() <= p.storing_capacity);
        }
    }

    #[test]
    fn test_remove_container_is_idempotent() {
        let mut p = port(10_000.0);
        p.add_container(Container::new("C1", 100.0, ContainerType::OpenSide)).unwrap();
        assert!(p.remove_container("C1").is_some());
        assert!(p.remove_container("C1").is_none());
        assert_eq!(p.container_count(), 0);
    }

    #[test]
    fn test_vehicle_membership() {
        let mut p = port(1000.0);
        p.add_vehicle("S1");
        p.add_vehicle("S1");
        p.add_vehicle("T1");
        assert_eq!(p.vehicle_count(), 2);
        assert!(p.has_vehicle("S1"));
        p.remove_vehicle("S1");
        p.remove_vehicle("S1");
        assert!(!p.has_vehicle("S1"));
        assert_eq!(p.vehicle_ids().collect::<Vec<_>>(), vec!["T1"]);
    }

    #[test]
    fn test_past_trips_bounded_fifo() {
        let mut p = port(1000.0);
        for i in 1..=7 {
            let id = format!("T{i}");
            p.add_trip(&id);
            assert_eq!(p.complete_trip(&id), None);
        }
        assert_eq!(p.past_trips().count(), PAST_TRIP_LIMIT);

        p.add_trip("T8");
        let evicted = p.complete_trip("T8");
        assert_eq!(evicted.as_deref(), Some("T1"));

        let past: Vec<&str> = p.past_trips().collect();
        assert_eq!(past, vec!["T2", "T3", "T4", "T5", "T6", "T7", "T8"]);
        assert!(p.current_trips().is_empty());
    }

    #[test]
    fn test_complete_trip_moves_from_current() {
        let mut p = port(1000.0);
        p.add_trip("A");
        p.add_trip("B");
        p.complete_trip("A");
        assert_eq!(p.current_trips().to_vec(), vec!["B".to_string()]);
        assert!(p.references_trip("A"));
        assert!(p.references_trip("B"));
        assert!(!p.references_trip("C"));
    }

    #[test]
    fn test_weight_by_type() {
        let mut p = port(100_000.0);
        p.add_container(Container::new("A", 1000.0, ContainerType::Liquid)).unwrap();
        p.add_container(Container::new("B", 2500.0, ContainerType::Liquid)).unwrap();
        p.add_container(Container::new("C", 400.0, ContainerType::OpenTop)).unwrap();

        let by_type = p.weight_by_type();
        assert_eq!(by_type.get(&ContainerType::Liquid), Some(&3500.0));
        assert_eq!(by_type.get(&ContainerType::OpenTop), Some(&400.0));
        assert_eq!(by_type.get(&ContainerType::Refrigerated), None);
    }

    #[test]
    fn test_set_storing_capacity() {
        let mut p = port(10_000.0);
        p.add_container(Container::new("A", 4000.0, ContainerType::DryStorage)).unwrap();
        assert!(p.set_storing_capacity(3999.0).is_err());
        assert_eq!(p.storing_capacity, 10_000.0);
        p.set_storing_capacity(4000.0).unwrap();
        assert_eq!(p.storing_capacity, 4000.0);
    }

    #[test]
    fn test_replace_container_rechecks_capacity() {
        let mut p = port(10_000.0);
        p.add_container(Container::new("A", 4000.0, ContainerType::DryStorage)).unwrap();
        p.add_container(Container::new("B", 4000.0, ContainerType::DryStorage)).unwrap();

        assert!(p.replace_container(Container::new("A", 7000.0, ContainerType::DryStorage)).is_err());
        assert_eq!(p.container("A").unwrap().weight, 4000.0);

        p.replace_container(Container::new("A", 6000.0, ContainerType::Liquid)).unwrap();
        assert_eq!(p.container("A").unwrap().kind, ContainerType::Liquid);
        assert_eq!(p.stored_weight(), 10_000.0);
    }

    #[test]
    fn test_distance_between_ports() {
        let a = port(1.0);
        let b = Port::new("P2", "LA", 34.0522, -118.2437, 1.0, true).unwrap();
        assert!((a.calculate_distance(&b) - b.calculate_distance(&a)).abs() < 1e-9);
        assert_eq!(a.calculate_distance(&a), 0.0);
    }
}
