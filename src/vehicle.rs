use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::container::{total_weight, Container, ContainerType};
use crate::error::{check_quantity, EntityKind, FleetError, FleetResult};
use crate::fuel::{rates, required_fuel};
use crate::port::Port;

/// Truck body type. Each body carries a fixed set of container types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TruckType {
    Basic,
    Reefer,
    Tanker,
}

impl TruckType {
    /// Fuel rate in gallons per ton per km
    pub fn fuel_rate(&self) -> f64 {
        match self {
            TruckType::Basic => rates::BASIC_TRUCK,
            TruckType::Reefer => rates::REEFER_TRUCK,
            TruckType::Tanker => rates::TANKER_TRUCK,
        }
    }

    /// Container types this body can legally carry
    pub fn allowed_cargo(&self) -> &'static [ContainerType] {
        match self {
            TruckType::Basic => &[
                ContainerType::DryStorage,
                ContainerType::OpenTop,
                ContainerType::OpenSide,
            ],
            TruckType::Reefer => &[ContainerType::Refrigerated],
            TruckType::Tanker => &[ContainerType::Liquid],
        }
    }

    pub fn can_carry(&self, kind: ContainerType) -> bool {
        self.allowed_cargo().contains(&kind)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TruckType::Basic => "Basic",
            TruckType::Reefer => "Reefer",
            TruckType::Tanker => "Tanker",
        }
    }
}

impl FromStr for TruckType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(TruckType::Basic),
            "reefer" => Ok(TruckType::Reefer),
            "tanker" => Ok(TruckType::Tanker),
            _ => Err(format!("unknown truck type '{s}'")),
        }
    }
}

/// Transport mode of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleKind {
    Ship,
    Truck(TruckType),
}

impl VehicleKind {
    /// Mode fuel rate in gallons per ton per km
    pub fn fuel_rate(&self) -> f64 {
        match self {
            VehicleKind::Ship => rates::SHIP,
            VehicleKind::Truck(truck_type) => truck_type.fuel_rate(),
        }
    }

    /// Whether this mode may carry a container type. Ships carry anything.
    pub fn can_carry(&self, kind: ContainerType) -> bool {
        match self {
            VehicleKind::Ship => true,
            VehicleKind::Truck(truck_type) => truck_type.can_carry(kind),
        }
    }

    /// Whether this mode needs landing ability at both ends of a move
    pub fn needs_landing(&self) -> bool {
        matches!(self, VehicleKind::Truck(_))
    }

    pub fn display_name(&self) -> String {
        match self {
            VehicleKind::Ship => "Ship".to_string(),
            VehicleKind::Truck(truck_type) => format!("{} Truck", truck_type.display_name()),
        }
    }
}

/// A ship or truck that carries containers between ports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub name: String,
    pub kind: VehicleKind,
    /// Tank size in gallons
    pub fuel_capacity: f64,
    /// Fuel on board in gallons, always within [0, fuel_capacity]
    current_fuel: f64,
    /// Maximum total cargo weight in kg
    pub carrying_capacity: f64,
    /// Id of the port the vehicle is docked at, if any
    current_port: Option<String>,
    /// Reattached from the containers collection on load
    #[serde(skip)]
    cargo: Vec<Container>,
}

impl Vehicle {
    /// Create an undocked vehicle with a full tank
    pub fn new(
        id: &str,
        name: &str,
        kind: VehicleKind,
        fuel_capacity: f64,
        carrying_capacity: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            fuel_capacity,
            current_fuel: fuel_capacity,
            carrying_capacity,
            current_port: None,
            cargo: Vec::new(),
        }
    }

    pub fn ship(id: &str, name: &str, fuel_capacity: f64, carrying_capacity: f64) -> Self {
        Self::new(id, name, VehicleKind::Ship, fuel_capacity, carrying_capacity)
    }

    pub fn truck(
        id: &str,
        name: &str,
        truck_type: TruckType,
        fuel_capacity: f64,
        carrying_capacity: f64,
    ) -> Self {
        Self::new(id, name, VehicleKind::Truck(truck_type), fuel_capacity, carrying_capacity)
    }

    pub fn is_ship(&self) -> bool {
        matches!(self.kind, VehicleKind::Ship)
    }

    pub fn is_truck(&self) -> bool {
        matches!(self.kind, VehicleKind::Truck(_))
    }

    pub fn current_fuel(&self) -> f64 {
        self.current_fuel
    }

    /// Capacities must be finite and not negative, with fuel on board inside the tank
    pub fn validate(&self) -> FleetResult<()> {
        check_quantity("fuel capacity", self.fuel_capacity)?;
        check_quantity("carrying capacity", self.carrying_capacity)?;
        check_quantity("current fuel", self.current_fuel)?;
        if self.current_fuel > self.fuel_capacity {
            return Err(FleetError::InvalidQuantity {
                field: "current fuel",
                value: self.current_fuel,
            });
        }
        Ok(())
    }

    pub fn current_port(&self) -> Option<&str> {
        self.current_port.as_deref()
    }

    pub(crate) fn dock_at(&mut self, port_id: &str) {
        self.current_port = Some(port_id.to_string());
    }

    pub(crate) fn undock(&mut self) {
        self.current_port = None;
    }

    // ==========================================
    // Cargo
    // ==========================================

    pub fn cargo(&self) -> &[Container] {
        &self.cargo
    }

    pub fn cargo_container(&self, container_id: &str) -> Option<&Container> {
        self.cargo.iter().find(|c| c.id == container_id)
    }

    pub fn cargo_weight(&self) -> f64 {
        total_weight(&self.cargo)
    }

    /// Check whether a container can be loaded without loading it.
    /// Cargo type is checked before capacity.
    pub fn check_container(&self, container: &Container) -> FleetResult<()> {
        container.validate()?;
        self.check_compatible(container)?;
        self.check_capacity(self.cargo_weight(), container.weight)
    }

    /// Load a container onto the vehicle
    pub fn add_container(&mut self, container: Container) -> FleetResult<()> {
        self.check_container(&container)?;
        self.cargo.push(container);
        Ok(())
    }

    /// Unload a container by id. Returns the container if it was on board.
    pub fn remove_container(&mut self, container_id: &str) -> Option<Container> {
        let idx = self.cargo.iter().position(|c| c.id == container_id)?;
        Some(self.cargo.remove(idx))
    }

    /// Replace a container on board after an administrative edit.
    /// The vehicle is untouched on failure.
    pub(crate) fn replace_container(&mut self, updated: Container) -> FleetResult<()> {
        let idx = self
            .cargo
            .iter()
            .position(|c| c.id == updated.id)
            .ok_or_else(|| FleetError::not_found(EntityKind::Container, &updated.id))?;
        updated.validate()?;
        self.check_compatible(&updated)?;
        let others = self.cargo_weight() - self.cargo[idx].weight;
        self.check_capacity(others, updated.weight)?;
        self.cargo[idx] = updated;
        Ok(())
    }

    fn check_compatible(&self, container: &Container) -> FleetResult<()> {
        match self.kind {
            VehicleKind::Truck(truck_type) if !truck_type.can_carry(container.kind) => {
                Err(FleetError::IncompatibleCargo {
                    truck_type: truck_type.display_name(),
                    container_type: container.kind.display_name(),
                })
            }
            _ => Ok(()),
        }
    }

    fn check_capacity(&self, loaded: f64, extra: f64) -> FleetResult<()> {
        if loaded + extra > self.carrying_capacity {
            return Err(FleetError::CapacityExceeded {
                requested: extra,
                available: (self.carrying_capacity - loaded).max(0.0),
            });
        }
        Ok(())
    }

    // ==========================================
    // Fuel and movement
    // ==========================================

    /// Fuel needed to haul the current cargo from `origin` to `destination`.
    ///
    /// `origin` must be the port the vehicle is docked at.
    pub fn calculate_required_fuel(&self, origin: &Port, destination: &Port) -> FleetResult<f64> {
        if self.current_port.as_deref() != Some(origin.id.as_str()) {
            return Err(FleetError::NotAtPort(self.id.clone()));
        }
        let distance = origin.calculate_distance(destination);
        Ok(required_fuel(distance, self.cargo_weight(), self.kind.fuel_rate()))
    }

    /// Whether the vehicle has enough fuel for the move, and for trucks,
    /// whether both ports can receive it.
    pub fn can_move(&self, origin: &Port, destination: &Port) -> FleetResult<bool> {
        let required = self.calculate_required_fuel(origin, destination)?;
        let fuel_ok = self.current_fuel >= required;
        if self.kind.needs_landing() {
            Ok(fuel_ok && origin.landing_ability && destination.landing_ability)
        } else {
            Ok(fuel_ok)
        }
    }

    /// Validate a move without performing it. Returns the fuel it would burn.
    pub fn plan_move(&self, origin: &Port, destination: &Port) -> FleetResult<f64> {
        let required = self.calculate_required_fuel(origin, destination)?;
        if !self.can_move(origin, destination)? {
            return Err(FleetError::InsufficientFuel {
                required,
                available: self.current_fuel,
            });
        }
        Ok(required)
    }

    /// Move to another port, burning fuel and updating both ports' vehicle sets.
    /// Nothing changes if the move is rejected. Returns the fuel burned.
    pub fn move_to(&mut self, origin: &mut Port, destination: &mut Port) -> FleetResult<f64> {
        let burned = self.plan_move(origin, destination)?;
        self.current_fuel = (self.current_fuel - burned).max(0.0);
        origin.remove_vehicle(&self.id);
        destination.add_vehicle(&self.id);
        self.dock_at(&destination.id);
        Ok(burned)
    }

    /// Add fuel, never exceeding the tank size. Returns the fuel level after refueling.
    pub fn refuel(&mut self, amount: f64) -> f64 {
        self.current_fuel = (self.current_fuel + amount).min(self.fuel_capacity);
        self.current_fuel
    }

    // ==========================================
    // Administrative edits
    // ==========================================

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Resize the tank; fuel above the new size is lost
    pub fn set_fuel_capacity(&mut self, capacity: f64) -> FleetResult<()> {
        self.fuel_capacity = check_quantity("fuel capacity", capacity)?;
        self.current_fuel = self.current_fuel.min(self.fuel_capacity);
        Ok(())
    }

    /// Change carrying capacity; cannot drop below the cargo on board
    pub fn set_carrying_capacity(&mut self, capacity: f64) -> FleetResult<()> {
        check_quantity("carrying capacity", capacity)?;
        let loaded = self.cargo_weight();
        if capacity < loaded {
            return Err(FleetError::CapacityExceeded {
                requested: loaded,
                available: capacity,
            });
        }
        self.carrying_capacity = capacity;
        Ok(())
    }

    /// Change transport mode; every container on board must stay legal
    pub fn set_kind(&mut self, kind: VehicleKind) -> FleetResult<()> {
        if let VehicleKind::Truck(truck_type) = kind {
            if let Some(c) = self.cargo.iter().find(|c| !truck_type.can_carry(c.kind)) {
                return Err(FleetError::IncompatibleCargo {
                    truck_type: truck_type.display_name(),
                    container_type: c.kind.display_name(),
                });
            }
        }
        self.kind = kind;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_york() -> Port {
        Port::new("NYC", "New York", 40.7128, -74.0060, 1_000_000.0, true).unwrap()
    }

    fn los_angeles() -> Port {
        Port::new("LAX", "Los Angeles", 34.0522, -118.2437, 1_000_000.0, true).unwrap()
    }

    fn docked_ship(origin: &mut Port) -> Vehicle {
        let mut ship = Vehicle::ship("S1", "Evergreen", 500_000.0, 150_000.0);
        ship.dock_at(&origin.id);
        origin.add_vehicle(&ship.id);
        ship
    }

    #[test]
    fn test_new_vehicle_has_full_tank() {
        let v = Vehicle::truck("T1", "Hauler", TruckType::Basic, 300.0, 20_000.0);
        assert_eq!(v.current_fuel(), 300.0);
        assert!(v.is_truck());
        assert!(!v.is_ship());
        assert_eq!(v.current_port(), None);
    }

    #[test]
    fn test_ship_capacity() {
        let mut ship = Vehicle::ship("S1", "Evergreen", 1000.0, 10_000.0);
        ship.add_container(Container::new("A", 6000.0, ContainerType::Liquid)).unwrap();
        let err = ship
            .add_container(Container::new("B", 5000.0, ContainerType::DryStorage))
            .unwrap_err();
        assert!(matches!(err, FleetError::CapacityExceeded { .. }));
        assert_eq!(ship.cargo().len(), 1);
        ship.add_container(Container::new("C", 4000.0, ContainerType::Refrigerated)).unwrap();
        assert_eq!(ship.cargo_weight(), 10_000.0);
    }

    #[test]
    fn test_truck_cargo_compatibility() {
        let cases = [
            (TruckType::Basic, ContainerType::DryStorage, true),
            (TruckType::Basic, ContainerType::OpenTop, true),
            (TruckType::Basic, ContainerType::OpenSide, true),
            (TruckType::Basic, ContainerType::Refrigerated, false),
            (TruckType::Basic, ContainerType::Liquid, false),
            (TruckType::Reefer, ContainerType::Refrigerated, true),
            (TruckType::Reefer, ContainerType::DryStorage, false),
            (TruckType::Tanker, ContainerType::Liquid, true),
            (TruckType::Tanker, ContainerType::OpenTop, false),
        ];
        for (truck_type, kind, allowed) in cases {
            let mut truck = Vehicle::truck("T", "T", truck_type, 100.0, 50_000.0);
            let result = truck.add_container(Container::new("C", 1000.0, kind));
            assert_eq!(result.is_ok(), allowed, "{truck_type:?} carrying {kind:?}");
            if !allowed {
                assert!(matches!(result, Err(FleetError::IncompatibleCargo { .. })));
            }
        }
    }

    #[test]
    fn test_truck_checks_type_before_capacity() {
        let mut truck = Vehicle::truck("T", "T", TruckType::Tanker, 100.0, 1000.0);
        let err = truck
            .add_container(Container::new("C", 5000.0, ContainerType::DryStorage))
            .unwrap_err();
        assert!(matches!(err, FleetError::IncompatibleCargo { .. }));

        let err = truck
            .add_container(Container::new("C", 5000.0, ContainerType::Liquid))
            .unwrap_err();
        assert!(matches!(err, FleetError::CapacityExceeded { .. }));
    }

    #[test]
    fn test_required_fuel_needs_port() {
        let ship = Vehicle::ship("S1", "Evergreen", 500_000.0, 150_000.0);
        let err = ship.calculate_required_fuel(&new_york(), &los_angeles()).unwrap_err();
        assert!(matches!(err, FleetError::NotAtPort(_)));
        assert!(ship.can_move(&new_york(), &los_angeles()).is_err());
    }

    #[test]
    fn test_required_fuel_rejects_wrong_origin() {
        let mut nyc = new_york();
        let ship = docked_ship(&mut nyc);
        let lax = los_angeles();
        assert!(matches!(
            ship.calculate_required_fuel(&lax, &nyc),
            Err(FleetError::NotAtPort(_))
        ));
    }

    #[test]
    fn test_ship_fuel_scenario() {
        let mut nyc = new_york();
        let mut lax = los_angeles();
        let mut ship = docked_ship(&mut nyc);
        ship.add_container(Container::new("A", 60_000.0, ContainerType::DryStorage)).unwrap();
        ship.add_container(Container::new("B", 40_000.0, ContainerType::Liquid)).unwrap();

        let distance = nyc.calculate_distance(&lax);
        let expected = distance * 100_000.0 * 3.5 / 1000.0;
        let required = ship.calculate_required_fuel(&nyc, &lax).unwrap();
        assert!((required - expected).abs() < 1e-6);

        // Roughly 1.38M gallons; a 500k tank cannot make it
        assert!(!ship.can_move(&nyc, &lax).unwrap());
        let err = ship.move_to(&mut nyc, &mut lax).unwrap_err();
        assert!(matches!(err, FleetError::InsufficientFuel { .. }));
        assert_eq!(ship.current_fuel(), 500_000.0);
        assert_eq!(ship.current_port(), Some("NYC"));
        assert!(nyc.has_vehicle("S1"));
        assert!(!lax.has_vehicle("S1"));
    }

    #[test]
    fn test_move_debits_fuel_and_updates_ports() {
        let mut nyc = new_york();
        let mut lax = los_angeles();
        let mut ship = docked_ship(&mut nyc);
        ship.add_container(Container::new("A", 10_000.0, ContainerType::DryStorage)).unwrap();

        let required = ship.calculate_required_fuel(&nyc, &lax).unwrap();
        assert!(ship.can_move(&nyc, &lax).unwrap());
        let burned = ship.move_to(&mut nyc, &mut lax).unwrap();

        assert_eq!(burned, required);
        assert!((ship.current_fuel() - (500_000.0 - required)).abs() < 1e-6);
        assert_eq!(ship.current_port(), Some("LAX"));
        assert!(!nyc.has_vehicle("S1"));
        assert!(lax.has_vehicle("S1"));
    }

    #[test]
    fn test_truck_needs_landing_ability() {
        let mut nyc = new_york();
        let mut dock = Port::new("DOCK", "Offshore", 40.0, -73.0, 1000.0, false).unwrap();
        let mut truck = Vehicle::truck("T1", "Hauler", TruckType::Basic, 1000.0, 20_000.0);
        truck.dock_at(&nyc.id);
        nyc.add_vehicle(&truck.id);

        // Empty truck needs no fuel but still cannot land
        assert_eq!(truck.calculate_required_fuel(&nyc, &dock).unwrap(), 0.0);
        assert!(!truck.can_move(&nyc, &dock).unwrap());
        assert!(matches!(
            truck.move_to(&mut nyc, &mut dock),
            Err(FleetError::InsufficientFuel { .. })
        ));

        // Ships ignore landing ability
        let mut ship = Vehicle::ship("S1", "Evergreen", 1000.0, 20_000.0);
        ship.dock_at(&nyc.id);
        assert!(ship.can_move(&nyc, &dock).unwrap());
    }

    #[test]
    fn test_refuel_clamps_to_capacity() {
        let mut v = Vehicle::ship("S1", "Evergreen", 1000.0, 10.0);
        v.current_fuel = 0.0;
        assert_eq!(v.refuel(1000.0), 1000.0);

        v.current_fuel = 900.0;
        assert_eq!(v.refuel(250.0), 1000.0);

        v.current_fuel = 100.0;
        assert_eq!(v.refuel(250.0), 350.0);
    }

    #[test]
    fn test_set_fuel_capacity_clamps_fuel() {
        let mut v = Vehicle::ship("S1", "Evergreen", 1000.0, 10.0);
        v.set_fuel_capacity(400.0).unwrap();
        assert_eq!(v.current_fuel(), 400.0);
        v.set_fuel_capacity(800.0).unwrap();
        assert_eq!(v.current_fuel(), 400.0);

        assert!(v.set_fuel_capacity(-10.0).is_err());
        assert!(v.set_fuel_capacity(f64::NAN).is_err());
        assert_eq!(v.fuel_capacity, 800.0);
        assert_eq!(v.current_fuel(), 400.0);
    }

    #[test]
    fn test_validate_capacities() {
        assert!(Vehicle::ship("S1", "Evergreen", 1000.0, 10.0).validate().is_ok());
        assert!(Vehicle::ship("S1", "Evergreen", 0.0, 0.0).validate().is_ok());
        for (fuel, carrying) in [(-10.0, 1.0), (f64::NAN, 1.0), (1.0, f64::NAN), (1.0, -1.0), (f64::INFINITY, 1.0)] {
            assert!(matches!(
                Vehicle::ship("S1", "Evergreen", fuel, carrying).validate(),
                Err(FleetError::InvalidQuantity { .. })
            ));
        }
    }

    #[test]
    fn test_bad_weights_rejected_on_board() {
        let mut v = Vehicle::ship("S1", "Evergreen", 1000.0, 10_000.0);
        for weight in [f64::NAN, -5_000.0] {
            assert!(matches!(
                v.add_container(Container::new("X", weight, ContainerType::Liquid)),
                Err(FleetError::InvalidQuantity { .. })
            ));
        }
        v.add_container(Container::new("A", 9_000.0, ContainerType::Liquid)).unwrap();
        assert!(v.replace_container(Container::new("A", -1.0, ContainerType::Liquid)).is_err());
        assert_eq!(v.cargo_weight(), 9_000.0);
    }

    #[test]
    fn test_set_carrying_capacity() {
        let mut v = Vehicle::ship("S1", "Evergreen", 1000.0, 10_000.0);
        v.add_container(Container::new("A", 6000.0, ContainerType::OpenTop)).unwrap();
        assert!(v.set_carrying_capacity(5000.0).is_err());
        assert!(v.set_carrying_capacity(f64::NAN).is_err());
        assert_eq!(v.carrying_capacity, 10_000.0);
        v.set_carrying_capacity(6000.0).unwrap();
    }

    #[test]
    fn test_set_kind_keeps_cargo_legal() {
        let mut v = Vehicle::truck("T1", "Hauler", TruckType::Basic, 100.0, 10_000.0);
        v.add_container(Container::new("A", 100.0, ContainerType::OpenTop)).unwrap();
        assert!(v.set_kind(VehicleKind::Truck(TruckType::Tanker)).is_err());
        assert_eq!(v.kind, VehicleKind::Truck(TruckType::Basic));
        v.set_kind(VehicleKind::Ship).unwrap();
        assert!(v.is_ship());
    }

    #[test]
    fn test_replace_container_on_truck() {
        let mut v = Vehicle::truck("T1", "Hauler", TruckType::Reefer, 100.0, 10_000.0);
        v.add_container(Container::new("A", 1000.0, ContainerType::Refrigerated)).unwrap();
        assert!(v
            .replace_container(Container::new("A", 1000.0, ContainerType::Liquid))
            .is_err());
        assert!(v
            .replace_container(Container::new("A", 20_000.0, ContainerType::Refrigerated))
            .is_err());
        v.replace_container(Container::new("A", 9000.0, ContainerType::Refrigerated)).unwrap();
        assert_eq!(v.cargo_weight(), 9000.0);
    }

    #[test]
    fn test_parse_truck_type() {
        assert_eq!("REEFER".parse::<TruckType>(), Ok(TruckType::Reefer));
        assert_eq!(" basic ".parse::<TruckType>(), Ok(TruckType::Basic));
        assert!("dump".parse::<TruckType>().is_err());
    }
}
