//! The fleet registry: owns every user, port, vehicle and trip, gates each
//! operation on the caller's session, and saves a snapshot after every
//! successful change.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::container::{Container, ContainerType};
use crate::error::{check_quantity, EntityKind, FleetError, FleetResult};
use crate::port::Port;
use crate::store::{ContainerLocation, Snapshot, SnapshotStore, StoreError, StoredContainer};
use crate::trip::Trip;
use crate::user::{Permission, Role, Session, User};
use crate::vehicle::{Vehicle, VehicleKind};

/// Credentials created when a fleet has no users at all
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Optional edits to a port. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct PortChanges {
    pub name: Option<String>,
    pub storing_capacity: Option<f64>,
    pub landing_ability: Option<bool>,
}

/// Optional edits to a vehicle. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct VehicleChanges {
    pub name: Option<String>,
    pub kind: Option<VehicleKind>,
    pub fuel_capacity: Option<f64>,
    pub carrying_capacity: Option<f64>,
}

/// Optional edits to a container
#[derive(Debug, Clone, Default)]
pub struct ContainerChanges {
    pub weight: Option<f64>,
    pub kind: Option<ContainerType>,
}

pub struct Fleet {
    users: Vec<User>,
    ports: Vec<Port>,
    vehicles: Vec<Vehicle>,
    trips: Vec<Trip>,
    store: Option<Box<dyn SnapshotStore>>,
}

impl Fleet {
    /// An empty fleet with only the default administrator
    pub fn new() -> Self {
        Self {
            users: vec![User::admin(DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD)],
            ports: Vec::new(),
            vehicles: Vec::new(),
            trips: Vec::new(),
            store: None,
        }
    }

    /// Load a fleet from `store` and keep saving to it.
    ///
    /// A store without users gets the default administrator, saved immediately.
    pub fn open(store: Box<dyn SnapshotStore>) -> FleetResult<Self> {
        let snapshot = store.load()?;
        let seeded = snapshot.users.is_empty();
        let mut fleet = Self::from_snapshot(snapshot)?;
        fleet.store = Some(store);
        if seeded {
            info!(username = DEFAULT_ADMIN_USERNAME, "created default administrator");
            fleet.save()?;
        }
        Ok(fleet)
    }

    /// Rebuild a fleet from persisted collections, moving every container
    /// back into the port or vehicle that holds it.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        let Snapshot {
            mut users,
            mut ports,
            mut vehicles,
            containers,
            trips,
        } = snapshot;

        for port in &ports {
            check_quantity("storing capacity", port.storing_capacity)
                .map_err(|e| StoreError::Inconsistent(format!("port '{}': {e}", port.id)))?;
        }
        for vehicle in &vehicles {
            vehicle
                .validate()
                .map_err(|e| StoreError::Inconsistent(format!("vehicle '{}': {e}", vehicle.id)))?;
        }

        let mut seen = HashSet::new();
        for record in containers {
            let id = record.container.id.clone();
            if !seen.insert(id.clone()) {
                return Err(StoreError::Inconsistent(format!("duplicate container '{id}'")));
            }
            let placed = match &record.location {
                ContainerLocation::Port(port_id) => ports
                    .iter_mut()
                    .find(|p| &p.id == port_id)
                    .map(|p| p.add_container(record.container)),
                ContainerLocation::Vehicle(vehicle_id) => vehicles
                    .iter_mut()
                    .find(|v| &v.id == vehicle_id)
                    .map(|v| v.add_container(record.container)),
            };
            match placed {
                None => {
                    return Err(StoreError::Inconsistent(format!(
                        "container '{id}' is at unknown location {:?}",
                        record.location
                    )))
                }
                Some(Err(e)) => {
                    return Err(StoreError::Inconsistent(format!("container '{id}': {e}")));
                }
                Some(Ok(())) => {}
            }
        }

        for vehicle in &vehicles {
            if let Some(port_id) = vehicle.current_port() {
                if !ports.iter().any(|p| p.id == port_id) {
                    return Err(StoreError::Inconsistent(format!(
                        "vehicle '{}' is docked at unknown port '{port_id}'",
                        vehicle.id
                    )));
                }
            }
        }

        if users.is_empty() {
            users.push(User::admin(DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD));
        }

        Ok(Self {
            users,
            ports,
            vehicles,
            trips,
            store: None,
        })
    }

    /// Flatten the registry into its five persisted collections
    pub fn snapshot(&self) -> Snapshot {
        let mut containers = Vec::new();
        for port in &self.ports {
            containers.extend(port.containers().iter().map(|c| StoredContainer {
                container: c.clone(),
                location: ContainerLocation::Port(port.id.clone()),
            }));
        }
        for vehicle in &self.vehicles {
            containers.extend(vehicle.cargo().iter().map(|c| StoredContainer {
                container: c.clone(),
                location: ContainerLocation::Vehicle(vehicle.id.clone()),
            }));
        }
        Snapshot {
            users: self.users.clone(),
            ports: self.ports.clone(),
            vehicles: self.vehicles.clone(),
            containers,
            trips: self.trips.clone(),
        }
    }

    /// Persist future changes to `store`
    pub fn attach_store(&mut self, store: Box<dyn SnapshotStore>) {
        self.store = Some(store);
    }

    /// Write the whole snapshot to the attached store, if any
    pub fn save(&mut self) -> FleetResult<()> {
        if self.store.is_none() {
            return Ok(());
        }
        let snapshot = self.snapshot();
        if let Some(store) = self.store.as_mut() {
            store.save(&snapshot)?;
        }
        Ok(())
    }

    /// Whether the fleet holds no ports, vehicles or trips
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty() && self.vehicles.is_empty() && self.trips.is_empty()
    }

    /// Run a mutation, saving on success and logging the rejection on failure
    fn mutate<T>(
        &mut self,
        session: &Session,
        op: &'static str,
        f: impl FnOnce(&mut Self) -> FleetResult<T>,
    ) -> FleetResult<T> {
        match f(self) {
            Ok(value) => {
                self.save()?;
                Ok(value)
            }
            Err(e) => {
                warn!(user = %session.username, op, error = %e, "operation rejected");
                Err(e)
            }
        }
    }

    // ==========================================
    // Lookups
    // ==========================================

    fn user_index(&self, username: &str) -> FleetResult<usize> {
        self.users
            .iter()
            .position(|u| u.username == username)
            .ok_or_else(|| FleetError::not_found(EntityKind::User, username))
    }

    fn port_index(&self, port_id: &str) -> FleetResult<usize> {
        self.ports
            .iter()
            .position(|p| p.id == port_id)
            .ok_or_else(|| FleetError::not_found(EntityKind::Port, port_id))
    }

    fn vehicle_index(&self, vehicle_id: &str) -> FleetResult<usize> {
        self.vehicles
            .iter()
            .position(|v| v.id == vehicle_id)
            .ok_or_else(|| FleetError::not_found(EntityKind::Vehicle, vehicle_id))
    }

    fn trip_index(&self, trip_id: &str) -> FleetResult<usize> {
        self.trips
            .iter()
            .position(|t| t.id == trip_id)
            .ok_or_else(|| FleetError::not_found(EntityKind::Trip, trip_id))
    }

    /// Where a container currently lives
    fn locate_container(&self, container_id: &str) -> Option<ContainerLocation> {
        if let Some(port) = self.ports.iter().find(|p| p.container(container_id).is_some()) {
            return Some(ContainerLocation::Port(port.id.clone()));
        }
        self.vehicles
            .iter()
            .find(|v| v.cargo_container(container_id).is_some())
            .map(|v| ContainerLocation::Vehicle(v.id.clone()))
    }

    /// The port a location belongs to. Cargo belongs to the vehicle's
    /// current port, or to none while the vehicle is in transit.
    fn location_port<'a>(&'a self, location: &'a ContainerLocation) -> Option<&'a str> {
        match location {
            ContainerLocation::Port(port_id) => Some(port_id),
            ContainerLocation::Vehicle(vehicle_id) => self
                .vehicles
                .iter()
                .find(|v| &v.id == vehicle_id)
                .and_then(|v| v.current_port()),
        }
    }

    /// Permission check scoped to a port that may not exist. Only admins may
    /// act on things outside any port.
    fn require_scoped(
        session: &Session,
        permission: Permission,
        port_id: Option<&str>,
    ) -> FleetResult<()> {
        match port_id {
            Some(port_id) => session.require_at(permission, port_id),
            None if session.is_admin() => session.require(permission),
            None => Err(FleetError::PermissionDenied {
                username: session.username.clone(),
                permission,
            }),
        }
    }

    // ==========================================
    // Users
    // ==========================================

    /// Authenticate and open a session
    pub fn login(&self, username: &str, password: &str) -> FleetResult<Session> {
        match self.users.iter().find(|u| u.username == username) {
            Some(user) if user.authenticate(password) => {
                info!(username, role = user.role.display_name(), "login");
                Ok(Session::for_user(user))
            }
            _ => {
                warn!(username, "login failed");
                Err(FleetError::AuthenticationFailed)
            }
        }
    }

    pub fn add_manager(
        &mut self,
        session: &Session,
        username: &str,
        password: &str,
        port_id: &str,
    ) -> FleetResult<()> {
        self.mutate(session, "add_manager", |fleet| {
            session.require(Permission::AddManager)?;
            if fleet.users.iter().any(|u| u.username == username) {
                return Err(FleetError::duplicate(EntityKind::User, username));
            }
            fleet.port_index(port_id)?;
            fleet.users.push(User::manager(username, password, port_id));
            info!(user = %session.username, manager = username, port = port_id, "manager added");
            Ok(())
        })
    }

    /// Remove a port manager. Administrators cannot be removed this way.
    pub fn remove_manager(&mut self, session: &Session, username: &str) -> FleetResult<()> {
        self.mutate(session, "remove_manager", |fleet| {
            session.require(Permission::RemoveManager)?;
            let idx = fleet.user_index(username)?;
            if fleet.users[idx].role == Role::SystemAdmin {
                return Err(FleetError::PermissionDenied {
                    username: session.username.clone(),
                    permission: Permission::RemoveManager,
                });
            }
            fleet.users.remove(idx);
            info!(user = %session.username, manager = username, "manager removed");
            Ok(())
        })
    }

    /// Users may change their own password; changing anyone else's needs `ModifyUser`
    pub fn change_password(
        &mut self,
        session: &Session,
        username: &str,
        new_password: &str,
    ) -> FleetResult<()> {
        self.mutate(session, "change_password", |fleet| {
            if session.username != username {
                session.require(Permission::ModifyUser)?;
            }
            let idx = fleet.user_index(username)?;
            fleet.users[idx].set_password(new_password);
            info!(user = %session.username, target = username, "password changed");
            Ok(())
        })
    }

    // ==========================================
    // Ports
    // ==========================================

    pub fn add_port(&mut self, session: &Session, port: Port) -> FleetResult<()> {
        self.mutate(session, "add_port", |fleet| {
            session.require(Permission::AddPort)?;
            check_quantity("storing capacity", port.storing_capacity)?;
            if fleet.ports.iter().any(|p| p.id == port.id) {
                return Err(FleetError::duplicate(EntityKind::Port, &port.id));
            }
            info!(user = %session.username, port = %port.id, name = %port.name, "port added");
            fleet.ports.push(port);
            Ok(())
        })
    }

    /// Remove an idle port. Fails with `PortInUse` while it holds containers,
    /// docks vehicles or has trips that have not completed.
    pub fn remove_port(&mut self, session: &Session, port_id: &str) -> FleetResult<()> {
        self.mutate(session, "remove_port", |fleet| {
            session.require(Permission::RemovePort)?;
            let idx = fleet.port_index(port_id)?;
            let has_active_trips = fleet.trips.iter().any(|t| {
                t.is_active() && (t.departure_port == port_id || t.arrival_port == port_id)
            });
            if fleet.ports[idx].is_in_use() || has_active_trips {
                return Err(FleetError::PortInUse(port_id.to_string()));
            }
            fleet.ports.remove(idx);
            info!(user = %session.username, port = port_id, "port removed");
            Ok(())
        })
    }

    /// Edit a port. Either every change applies or none does.
    pub fn modify_port(
        &mut self,
        session: &Session,
        port_id: &str,
        changes: PortChanges,
    ) -> FleetResult<()> {
        self.mutate(session, "modify_port", |fleet| {
            session.require_at(Permission::ModifyPort, port_id)?;
            let idx = fleet.port_index(port_id)?;
            let mut updated = fleet.ports[idx].clone();
            if let Some(capacity) = changes.storing_capacity {
                updated.set_storing_capacity(capacity)?;
            }
            if let Some(name) = &changes.name {
                updated.set_name(name);
            }
            if let Some(landing_ability) = changes.landing_ability {
                updated.set_landing_ability(landing_ability);
            }
            fleet.ports[idx] = updated;
            info!(user = %session.username, port = port_id, "port modified");
            Ok(())
        })
    }

    // ==========================================
    // Vehicles
    // ==========================================

    /// Register a vehicle, optionally docked at `port_id`
    pub fn add_vehicle(
        &mut self,
        session: &Session,
        mut vehicle: Vehicle,
        port_id: Option<&str>,
    ) -> FleetResult<()> {
        self.mutate(session, "add_vehicle", |fleet| {
            session.require(Permission::AddVehicle)?;
            vehicle.validate()?;
            if fleet.vehicles.iter().any(|v| v.id == vehicle.id) {
                return Err(FleetError::duplicate(EntityKind::Vehicle, &vehicle.id));
            }
            match port_id {
                Some(port_id) => {
                    let idx = fleet.port_index(port_id)?;
                    fleet.ports[idx].add_vehicle(&vehicle.id);
                    vehicle.dock_at(port_id);
                }
                None => vehicle.undock(),
            }
            info!(
                user = %session.username,
                vehicle = %vehicle.id,
                kind = %vehicle.kind.display_name(),
                port = ?port_id,
                "vehicle added"
            );
            fleet.vehicles.push(vehicle);
            Ok(())
        })
    }

    /// Remove a vehicle and the cargo on board. Fails with `VehicleInUse`
    /// while any of its trips has not completed.
    pub fn remove_vehicle(&mut self, session: &Session, vehicle_id: &str) -> FleetResult<()> {
        self.mutate(session, "remove_vehicle", |fleet| {
            session.require(Permission::RemoveVehicle)?;
            let idx = fleet.vehicle_index(vehicle_id)?;
            if fleet.trips.iter().any(|t| t.is_active() && t.vehicle_id == vehicle_id) {
                return Err(FleetError::VehicleInUse(vehicle_id.to_string()));
            }
            let vehicle = fleet.vehicles.remove(idx);
            if let Some(port_id) = vehicle.current_port() {
                if let Some(port) = fleet.ports.iter_mut().find(|p| p.id == port_id) {
                    port.remove_vehicle(vehicle_id);
                }
            }
            info!(
                user = %session.username,
                vehicle = vehicle_id,
                cargo = vehicle.cargo().len(),
                "vehicle removed"
            );
            Ok(())
        })
    }

    /// Edit a vehicle. Either every change applies or none does.
    pub fn modify_vehicle(
        &mut self,
        session: &Session,
        vehicle_id: &str,
        changes: VehicleChanges,
    ) -> FleetResult<()> {
        self.mutate(session, "modify_vehicle", |fleet| {
            session.require(Permission::ModifyVehicle)?;
            let idx = fleet.vehicle_index(vehicle_id)?;
            let mut updated = fleet.vehicles[idx].clone();
            if let Some(kind) = changes.kind {
                updated.set_kind(kind)?;
            }
            if let Some(capacity) = changes.carrying_capacity {
                updated.set_carrying_capacity(capacity)?;
            }
            if let Some(capacity) = changes.fuel_capacity {
                updated.set_fuel_capacity(capacity)?;
            }
            if let Some(name) = &changes.name {
                updated.set_name(name);
            }
            fleet.vehicles[idx] = updated;
            info!(user = %session.username, vehicle = vehicle_id, "vehicle modified");
            Ok(())
        })
    }

    // ==========================================
    // Containers
    // ==========================================

    /// Store a new container at a port. Container ids are unique fleet-wide.
    pub fn add_container_to_port(
        &mut self,
        session: &Session,
        port_id: &str,
        container: Container,
    ) -> FleetResult<()> {
        self.mutate(session, "add_container", |fleet| {
            session.require_at(Permission::AddContainer, port_id)?;
            let idx = fleet.port_index(port_id)?;
            if fleet.locate_container(&container.id).is_some() {
                return Err(FleetError::duplicate(EntityKind::Container, &container.id));
            }
            let (id, weight, kind) = (container.id.clone(), container.weight, container.kind);
            fleet.ports[idx].add_container(container)?;
            info!(
                user = %session.username,
                port = port_id,
                container = %id,
                weight,
                kind = kind.display_name(),
                "container stored"
            );
            Ok(())
        })
    }

    /// Delete a container from wherever it is
    pub fn remove_container(&mut self, session: &Session, container_id: &str) -> FleetResult<()> {
        self.mutate(session, "remove_container", |fleet| {
            let location = fleet
                .locate_container(container_id)
                .ok_or_else(|| FleetError::not_found(EntityKind::Container, container_id))?;
            Self::require_scoped(
                session,
                Permission::RemoveContainer,
                fleet.location_port(&location),
            )?;
            match &location {
                ContainerLocation::Port(port_id) => {
                    let idx = fleet.port_index(port_id)?;
                    fleet.ports[idx].remove_container(container_id);
                }
                ContainerLocation::Vehicle(vehicle_id) => {
                    let idx = fleet.vehicle_index(vehicle_id)?;
                    fleet.vehicles[idx].remove_container(container_id);
                }
            }
            info!(user = %session.username, container = container_id, from = ?location, "container removed");
            Ok(())
        })
    }

    /// Change a container's weight or type. The holder re-validates its
    /// capacity and, for trucks, cargo compatibility.
    pub fn modify_container(
        &mut self,
        session: &Session,
        container_id: &str,
        changes: ContainerChanges,
    ) -> FleetResult<()> {
        self.mutate(session, "modify_container", |fleet| {
            let location = fleet
                .locate_container(container_id)
                .ok_or_else(|| FleetError::not_found(EntityKind::Container, container_id))?;
            Self::require_scoped(
                session,
                Permission::ModifyContainer,
                fleet.location_port(&location),
            )?;
            match &location {
                ContainerLocation::Port(port_id) => {
                    let idx = fleet.port_index(port_id)?;
                    let port = &mut fleet.ports[idx];
                    let updated = apply_changes(port.container(container_id), container_id, &changes)?;
                    port.replace_container(updated)?;
                }
                ContainerLocation::Vehicle(vehicle_id) => {
                    let idx = fleet.vehicle_index(vehicle_id)?;
                    let vehicle = &mut fleet.vehicles[idx];
                    let updated =
                        apply_changes(vehicle.cargo_container(container_id), container_id, &changes)?;
                    vehicle.replace_container(updated)?;
                }
            }
            info!(user = %session.username, container = container_id, "container modified");
            Ok(())
        })
    }

    /// Move a container from a port onto a vehicle docked at that port
    pub fn load_container(
        &mut self,
        session: &Session,
        vehicle_id: &str,
        container_id: &str,
    ) -> FleetResult<()> {
        self.mutate(session, "load_container", |fleet| {
            let vi = fleet.vehicle_index(vehicle_id)?;
            let port_id = fleet.vehicles[vi]
                .current_port()
                .ok_or_else(|| FleetError::NotAtPort(vehicle_id.to_string()))?
                .to_string();
            session.require_at(Permission::LoadCargo, &port_id)?;
            match fleet.locate_container(container_id) {
                Some(ContainerLocation::Port(at)) if at == port_id => {}
                Some(ContainerLocation::Port(_)) => {
                    return Err(FleetError::NotAtPort(vehicle_id.to_string()))
                }
                _ => return Err(FleetError::not_found(EntityKind::Container, container_id)),
            }

            let pi = fleet.port_index(&port_id)?;
            let port = &mut fleet.ports[pi];
            let vehicle = &mut fleet.vehicles[vi];
            let container = port
                .container(container_id)
                .ok_or_else(|| FleetError::not_found(EntityKind::Container, container_id))?;
            vehicle.check_container(container)?;
            if let Some(container) = port.remove_container(container_id) {
                vehicle.add_container(container)?;
            }
            info!(
                user = %session.username,
                vehicle = vehicle_id,
                container = container_id,
                port = %port_id,
                "container loaded"
            );
            Ok(())
        })
    }

    /// Move a container from a vehicle into the port it is docked at
    pub fn unload_container(
        &mut self,
        session: &Session,
        vehicle_id: &str,
        container_id: &str,
    ) -> FleetResult<()> {
        self.mutate(session, "unload_container", |fleet| {
            let vi = fleet.vehicle_index(vehicle_id)?;
            let port_id = fleet.vehicles[vi]
                .current_port()
                .ok_or_else(|| FleetError::NotAtPort(vehicle_id.to_string()))?
                .to_string();
            session.require_at(Permission::LoadCargo, &port_id)?;

            let pi = fleet.port_index(&port_id)?;
            let port = &mut fleet.ports[pi];
            let vehicle = &mut fleet.vehicles[vi];
            let container = vehicle
                .cargo_container(container_id)
                .ok_or_else(|| FleetError::not_found(EntityKind::Container, container_id))?;
            port.check_container(container)?;
            if let Some(container) = vehicle.remove_container(container_id) {
                port.add_container(container)?;
            }
            info!(
                user = %session.username,
                vehicle = vehicle_id,
                container = container_id,
                port = %port_id,
                "container unloaded"
            );
            Ok(())
        })
    }

    // ==========================================
    // Movement and fuel
    // ==========================================

    /// Move a docked vehicle to another port, burning fuel. Returns the fuel burned.
    pub fn move_vehicle(
        &mut self,
        session: &Session,
        vehicle_id: &str,
        destination_id: &str,
    ) -> FleetResult<f64> {
        self.mutate(session, "move_vehicle", |fleet| {
            session.require(Permission::MoveVehicle)?;
            let vi = fleet.vehicle_index(vehicle_id)?;
            let origin_id = fleet.vehicles[vi]
                .current_port()
                .ok_or_else(|| FleetError::NotAtPort(vehicle_id.to_string()))?
                .to_string();
            let oi = fleet.port_index(&origin_id)?;
            let di = fleet.port_index(destination_id)?;
            let vehicle = &mut fleet.vehicles[vi];

            let burned = if oi == di {
                // Zero distance: validate landing rules but nothing moves
                let port = &fleet.ports[oi];
                vehicle.plan_move(port, port)?
            } else {
                let (origin, destination) = pair_mut(&mut fleet.ports, oi, di);
                vehicle.move_to(origin, destination)?
            };
            info!(
                user = %session.username,
                vehicle = vehicle_id,
                from = %origin_id,
                to = destination_id,
                burned,
                remaining = vehicle.current_fuel(),
                "vehicle moved"
            );
            Ok(burned)
        })
    }

    /// Refuel a vehicle. Returns the fuel level afterwards.
    pub fn refuel_vehicle(
        &mut self,
        session: &Session,
        vehicle_id: &str,
        amount: f64,
    ) -> FleetResult<f64> {
        self.mutate(session, "refuel_vehicle", |fleet| {
            session.require(Permission::RefuelVehicle)?;
            let idx = fleet.vehicle_index(vehicle_id)?;
            let level = fleet.vehicles[idx].refuel(amount.max(0.0));
            info!(user = %session.username, vehicle = vehicle_id, amount, level, "vehicle refueled");
            Ok(level)
        })
    }

    /// Fuel a docked vehicle would need to reach `destination_id` with its current cargo
    pub fn required_fuel(
        &self,
        session: &Session,
        vehicle_id: &str,
        destination_id: &str,
    ) -> FleetResult<f64> {
        session.require(Permission::CalculateFuel)?;
        let vehicle = &self.vehicles[self.vehicle_index(vehicle_id)?];
        let origin_id = vehicle
            .current_port()
            .ok_or_else(|| FleetError::NotAtPort(vehicle_id.to_string()))?;
        let origin = &self.ports[self.port_index(origin_id)?];
        let destination = &self.ports[self.port_index(destination_id)?];
        let fuel = vehicle.calculate_required_fuel(origin, destination)?;
        debug!(vehicle = vehicle_id, from = origin_id, to = destination_id, fuel, "required fuel");
        Ok(fuel)
    }

    // ==========================================
    // Trips
    // ==========================================

    /// Schedule a pending trip and register it with both ports' traffic
    pub fn schedule_trip(
        &mut self,
        session: &Session,
        trip_id: &str,
        vehicle_id: &str,
        departure_date: NaiveDate,
        from: &str,
        to: &str,
    ) -> FleetResult<()> {
        self.mutate(session, "schedule_trip", |fleet| {
            session.require(Permission::ManageTrips)?;
            if fleet.trips.iter().any(|t| t.id == trip_id) {
                return Err(FleetError::duplicate(EntityKind::Trip, trip_id));
            }
            fleet.vehicle_index(vehicle_id)?;
            let fi = fleet.port_index(from)?;
            let ti = fleet.port_index(to)?;

            fleet.ports[fi].add_trip(trip_id);
            if ti != fi {
                fleet.ports[ti].add_trip(trip_id);
            }
            fleet.trips.push(Trip::new(trip_id, vehicle_id, departure_date, from, to));
            info!(
                user = %session.username,
                trip = trip_id,
                vehicle = vehicle_id,
                from,
                to,
                departure = %departure_date,
                "trip scheduled"
            );
            Ok(())
        })
    }

    /// Depart. The vehicle must be docked at the trip's departure port.
    pub fn start_trip(&mut self, session: &Session, trip_id: &str) -> FleetResult<()> {
        self.mutate(session, "start_trip", |fleet| {
            session.require(Permission::ManageTrips)?;
            let ti = fleet.trip_index(trip_id)?;
            let vi = fleet.vehicle_index(&fleet.trips[ti].vehicle_id)?;
            let pi = fleet.port_index(&fleet.trips[ti].departure_port)?;

            let trip = &mut fleet.trips[ti];
            let vehicle = &mut fleet.vehicles[vi];
            if trip.is_active() && vehicle.current_port() != Some(trip.departure_port.as_str()) {
                return Err(FleetError::NotAtPort(vehicle.id.clone()));
            }
            trip.start(vehicle, &mut fleet.ports[pi])?;
            info!(user = %session.username, trip = trip_id, vehicle = %vehicle.id, "trip started");
            Ok(())
        })
    }

    /// Arrive on `arrival_date`. The trip is archived in both ports' history;
    /// trips pushed out of every history are forgotten.
    pub fn complete_trip(
        &mut self,
        session: &Session,
        trip_id: &str,
        arrival_date: NaiveDate,
    ) -> FleetResult<()> {
        self.mutate(session, "complete_trip", |fleet| {
            session.require(Permission::ManageTrips)?;
            let ti = fleet.trip_index(trip_id)?;
            let vi = fleet.vehicle_index(&fleet.trips[ti].vehicle_id)?;
            let ai = fleet.port_index(&fleet.trips[ti].arrival_port)?;
            let di = fleet.port_index(&fleet.trips[ti].departure_port)?;

            let mut evicted = Vec::new();
            let trip = &mut fleet.trips[ti];
            evicted.extend(trip.complete(arrival_date, &mut fleet.vehicles[vi], &mut fleet.ports[ai])?);
            if di != ai {
                evicted.extend(fleet.ports[di].complete_trip(trip_id));
            }
            info!(
                user = %session.username,
                trip = trip_id,
                arrival = %arrival_date,
                "trip completed"
            );

            for old in evicted {
                if !fleet.ports.iter().any(|p| p.references_trip(&old)) {
                    fleet.trips.retain(|t| t.id != old);
                    debug!(trip = %old, "trip dropped from history");
                }
            }
            Ok(())
        })
    }

    // ==========================================
    // Reports
    // ==========================================

    pub fn port(&self, session: &Session, port_id: &str) -> FleetResult<&Port> {
        session.require_at(Permission::ViewPort, port_id)?;
        debug!(user = %session.username, port = port_id, "view port");
        Ok(&self.ports[self.port_index(port_id)?])
    }

    /// Managers may view vehicles docked at their own port
    pub fn vehicle(&self, session: &Session, vehicle_id: &str) -> FleetResult<&Vehicle> {
        let vehicle = &self.vehicles[self.vehicle_index(vehicle_id)?];
        if session.require(Permission::ViewAll).is_err() {
            Self::require_scoped(session, Permission::ViewPort, vehicle.current_port())?;
        }
        debug!(user = %session.username, vehicle = vehicle_id, "view vehicle");
        Ok(vehicle)
    }

    /// A container and where it currently is
    pub fn container(
        &self,
        session: &Session,
        container_id: &str,
    ) -> FleetResult<(&Container, ContainerLocation)> {
        let location = self
            .locate_container(container_id)
            .ok_or_else(|| FleetError::not_found(EntityKind::Container, container_id))?;
        Self::require_scoped(session, Permission::ViewPort, self.location_port(&location))?;
        let container = match &location {
            ContainerLocation::Port(port_id) => self.ports[self.port_index(port_id)?].container(container_id),
            ContainerLocation::Vehicle(vehicle_id) => {
                self.vehicles[self.vehicle_index(vehicle_id)?].cargo_container(container_id)
            }
        };
        let container =
            container.ok_or_else(|| FleetError::not_found(EntityKind::Container, container_id))?;
        Ok((container, location))
    }

    pub fn trip(&self, session: &Session, trip_id: &str) -> FleetResult<&Trip> {
        session.require(Permission::ViewAll)?;
        Ok(&self.trips[self.trip_index(trip_id)?])
    }

    pub fn ports(&self, session: &Session) -> FleetResult<&[Port]> {
        session.require(Permission::ViewAll)?;
        Ok(&self.ports)
    }

    pub fn vehicles(&self, session: &Session) -> FleetResult<&[Vehicle]> {
        session.require(Permission::ViewAll)?;
        Ok(&self.vehicles)
    }

    pub fn users(&self, session: &Session) -> FleetResult<&[User]> {
        session.require(Permission::ViewAll)?;
        Ok(&self.users)
    }

    pub fn trips(&self, session: &Session) -> FleetResult<&[Trip]> {
        session.require(Permission::ViewAll)?;
        Ok(&self.trips)
    }

    /// Every container in the fleet with its location
    pub fn containers(&self, session: &Session) -> FleetResult<Vec<(&Container, ContainerLocation)>> {
        session.require(Permission::ViewAll)?;
        let at_ports = self.ports.iter().flat_map(|p| {
            p.containers()
                .iter()
                .map(move |c| (c, ContainerLocation::Port(p.id.clone())))
        });
        let on_vehicles = self.vehicles.iter().flat_map(|v| {
            v.cargo()
                .iter()
                .map(move |c| (c, ContainerLocation::Vehicle(v.id.clone())))
        });
        Ok(at_ports.chain(on_vehicles).collect())
    }

    /// Ships currently docked at a port
    pub fn ships_in_port(&self, session: &Session, port_id: &str) -> FleetResult<Vec<&Vehicle>> {
        session.require_at(Permission::ListShips, port_id)?;
        let port = &self.ports[self.port_index(port_id)?];
        let ships: Vec<&Vehicle> = port
            .vehicle_ids()
            .filter_map(|id| self.vehicles.iter().find(|v| v.id == id))
            .filter(|v| v.is_ship())
            .collect();
        debug!(user = %session.username, port = port_id, count = ships.len(), "ships in port");
        Ok(ships)
    }

    /// Total weight stored at a port, per container type
    pub fn container_weights(
        &self,
        session: &Session,
        port_id: &str,
    ) -> FleetResult<BTreeMap<ContainerType, f64>> {
        session.require_at(Permission::CalculateWeights, port_id)?;
        Ok(self.ports[self.port_index(port_id)?].weight_by_type())
    }

    /// Trips departing or arriving on `date`
    pub fn trips_on(&self, session: &Session, date: NaiveDate) -> FleetResult<Vec<&Trip>> {
        session.require(Permission::ViewAll)?;
        Ok(self.trips.iter().filter(|t| t.touches_date(date)).collect())
    }

    /// Trips departing or arriving within `[from, to]`
    pub fn trips_between(
        &self,
        session: &Session,
        from: NaiveDate,
        to: NaiveDate,
    ) -> FleetResult<Vec<&Trip>> {
        session.require(Permission::ViewAll)?;
        if from > to {
            return Err(FleetError::InvalidDate(format!("{from} is after {to}")));
        }
        Ok(self.trips.iter().filter(|t| t.within(from, to)).collect())
    }
}

impl Default for Fleet {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_changes(
    current: Option<&Container>,
    container_id: &str,
    changes: &ContainerChanges,
) -> FleetResult<Container> {
    let mut updated = current
        .cloned()
        .ok_or_else(|| FleetError::not_found(EntityKind::Container, container_id))?;
    if let Some(weight) = changes.weight {
        updated.weight = weight;
    }
    if let Some(kind) = changes.kind {
        updated.kind = kind;
    }
    Ok(updated)
}

/// Two distinct mutable elements of a slice
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
