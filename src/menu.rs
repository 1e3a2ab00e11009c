//! Text console: login prompt, role menu, and one prompt sequence per action.

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

use crate::container::{Container, ContainerType};
use crate::error::FleetError;
use crate::fleet::{ContainerChanges, Fleet, PortChanges, VehicleChanges};
use crate::port::Port;
use crate::store::ContainerLocation;
use crate::trip::Trip;
use crate::user::{Role, Session, User};
use crate::vehicle::{TruckType, Vehicle, VehicleKind};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Why an action stopped early
#[derive(Debug, Error)]
enum ActionError {
    #[error(transparent)]
    Fleet(#[from] FleetError),

    #[error("{0}")]
    Input(String),

    #[error("input closed")]
    Eof,

    #[error(transparent)]
    Io(#[from] io::Error),
}

type ActionResult<T = ()> = Result<T, ActionError>;

/// Menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    AddVehicle,
    RemoveVehicle,
    ModifyVehicle,
    AddPort,
    RemovePort,
    ModifyPort,
    ViewPort,
    AddContainer,
    RemoveContainer,
    ModifyContainer,
    LoadContainer,
    UnloadContainer,
    AddManager,
    RemoveManager,
    ChangePassword,
    MoveVehicle,
    RefuelVehicle,
    FuelUsage,
    ScheduleTrip,
    StartTrip,
    CompleteTrip,
    ListPorts,
    ListVehicles,
    ListContainers,
    ListUsers,
    ListTrips,
    ContainerWeights,
    ShipsInPort,
    TripsOnDate,
    TripsBetween,
}

impl Action {
    fn label(&self) -> &'static str {
        match self {
            Action::AddVehicle => "Add vehicle",
            Action::RemoveVehicle => "Remove vehicle",
            Action::ModifyVehicle => "Modify vehicle",
            Action::AddPort => "Add port",
            Action::RemovePort => "Remove port",
            Action::ModifyPort => "Modify port",
            Action::ViewPort => "View port",
            Action::AddContainer => "Add container",
            Action::RemoveContainer => "Remove container",
            Action::ModifyContainer => "Modify container",
            Action::LoadContainer => "Load container onto vehicle",
            Action::UnloadContainer => "Unload container from vehicle",
            Action::AddManager => "Add port manager",
            Action::RemoveManager => "Remove port manager",
            Action::ChangePassword => "Change password",
            Action::MoveVehicle => "Move vehicle",
            Action::RefuelVehicle => "Refuel vehicle",
            Action::FuelUsage => "Calculate fuel usage",
            Action::ScheduleTrip => "Schedule trip",
            Action::StartTrip => "Start trip",
            Action::CompleteTrip => "Complete trip",
            Action::ListPorts => "View all ports",
            Action::ListVehicles => "View all vehicles",
            Action::ListContainers => "View all containers",
            Action::ListUsers => "View all users",
            Action::ListTrips => "View all trips",
            Action::ContainerWeights => "Calculate container weights",
            Action::ShipsInPort => "List ships in port",
            Action::TripsOnDate => "List trips on a date",
            Action::TripsBetween => "List trips between dates",
        }
    }
}

const ADMIN_ACTIONS: &[Action] = &[
    Action::AddVehicle,
    Action::RemoveVehicle,
    Action::ModifyVehicle,
    Action::AddPort,
    Action::RemovePort,
    Action::ModifyPort,
    Action::AddContainer,
    Action::RemoveContainer,
    Action::ModifyContainer,
    Action::LoadContainer,
    Action::UnloadContainer,
    Action::AddManager,
    Action::RemoveManager,
    Action::ChangePassword,
    Action::MoveVehicle,
    Action::RefuelVehicle,
    Action::FuelUsage,
    Action::ScheduleTrip,
    Action::StartTrip,
    Action::CompleteTrip,
    Action::ListPorts,
    Action::ListVehicles,
    Action::ListContainers,
    Action::ListUsers,
    Action::ListTrips,
    Action::ContainerWeights,
    Action::ShipsInPort,
    Action::TripsOnDate,
    Action::TripsBetween,
];

const MANAGER_ACTIONS: &[Action] = &[
    Action::ViewPort,
    Action::ModifyPort,
    Action::AddContainer,
    Action::RemoveContainer,
    Action::ModifyContainer,
    Action::LoadContainer,
    Action::UnloadContainer,
    Action::ShipsInPort,
    Action::ContainerWeights,
    Action::ChangePassword,
];

fn actions_for(role: &Role) -> &'static [Action] {
    match role {
        Role::SystemAdmin => ADMIN_ACTIONS,
        Role::PortManager { .. } => MANAGER_ACTIONS,
    }
}

/// Interactive console over any line reader and writer
pub struct Console<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Run until the input ends or `q` is entered at the login prompt.
    /// Fleet errors are printed and the menu continues.
    pub fn run(&mut self, fleet: &mut Fleet) -> io::Result<()> {
        writeln!(self.output, "Welcome to the Port Management System")?;
        loop {
            let session = match self.login(fleet) {
                Ok(Some(session)) => session,
                Ok(None) | Err(ActionError::Eof) => return Ok(()),
                Err(ActionError::Io(e)) => return Err(e),
                Err(e) => {
                    writeln!(self.output, "Login failed: {e}")?;
                    continue;
                }
            };
            match self.session_loop(fleet, &session) {
                Ok(()) => writeln!(self.output, "Logged out.")?,
                Err(ActionError::Io(e)) => return Err(e),
                Err(_) => return Ok(()),
            }
        }
    }

    fn login(&mut self, fleet: &Fleet) -> ActionResult<Option<Session>> {
        let username = self.ask("Username (q to quit)")?;
        if username.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        let password = self.ask("Password")?;
        let session = fleet.login(&username, &password)?;
        writeln!(
            self.output,
            "Logged in as {} ({})",
            session.username,
            session.role.display_name()
        )?;
        Ok(Some(session))
    }

    /// Returns Ok on logout; Eof and Io end the console
    fn session_loop(&mut self, fleet: &mut Fleet, session: &Session) -> ActionResult {
        let actions = actions_for(&session.role);
        loop {
            writeln!(self.output)?;
            for (i, action) in actions.iter().enumerate() {
                writeln!(self.output, "{:>2}. {}", i + 1, action.label())?;
            }
            writeln!(self.output, " 0. Logout")?;

            let choice = self.ask("Choice")?;
            let action = match choice.parse::<usize>() {
                Ok(0) => return Ok(()),
                Ok(n) if n <= actions.len() => actions[n - 1],
                _ => {
                    writeln!(self.output, "Invalid choice '{choice}'")?;
                    continue;
                }
            };
            match self.dispatch(fleet, session, action) {
                Ok(()) => {}
                Err(e @ (ActionError::Eof | ActionError::Io(_))) => return Err(e),
                Err(e) => writeln!(self.output, "Error: {e}")?,
            }
        }
    }

    fn dispatch(&mut self, fleet: &mut Fleet, session: &Session, action: Action) -> ActionResult {
        match action {
            Action::AddVehicle => {
                let id = self.ask("Vehicle id")?;
                let name = self.ask("Name")?;
                let kind = parse_kind(&self.ask("Type (ship/basic/reefer/tanker)")?)?;
                let fuel = self.ask_parse::<f64>("Fuel capacity (gal)")?;
                let carrying = self.ask_parse::<f64>("Carrying capacity (kg)")?;
                let port = self.ask_optional("Docked at port id (blank for none)")?;
                let vehicle = Vehicle::new(&id, &name, kind, fuel, carrying);
                fleet.add_vehicle(session, vehicle, port.as_deref())?;
                writeln!(self.output, "Vehicle added.")?;
            }
            Action::RemoveVehicle => {
                let id = self.ask("Vehicle id")?;
                fleet.remove_vehicle(session, &id)?;
                writeln!(self.output, "Vehicle removed.")?;
            }
            Action::ModifyVehicle => {
                let id = self.ask("Vehicle id")?;
                let changes = VehicleChanges {
                    name: self.ask_optional("New name (blank to keep)")?,
                    kind: self
                        .ask_optional("New type (blank to keep)")?
                        .map(|s| parse_kind(&s))
                        .transpose()?,
                    fuel_capacity: self.ask_optional_parse("New fuel capacity (blank to keep)")?,
                    carrying_capacity: self
                        .ask_optional_parse("New carrying capacity (blank to keep)")?,
                };
                fleet.modify_vehicle(session, &id, changes)?;
                writeln!(self.output, "Vehicle updated.")?;
            }
            Action::AddPort => {
                let id = self.ask("Port id")?;
                let name = self.ask("Name")?;
                let latitude = self.ask_parse::<f64>("Latitude")?;
                let longitude = self.ask_parse::<f64>("Longitude")?;
                let capacity = self.ask_parse::<f64>("Storing capacity (kg)")?;
                let landing = self.ask_yes_no("Landing ability (y/n)")?;
                let port = Port::new(&id, &name, latitude, longitude, capacity, landing)?;
                fleet.add_port(session, port)?;
                writeln!(self.output, "Port added.")?;
            }
            Action::RemovePort => {
                let id = self.ask("Port id")?;
                fleet.remove_port(session, &id)?;
                writeln!(self.output, "Port removed.")?;
            }
            Action::ModifyPort => {
                let id = self.port_for(session)?;
                let name = self.ask_optional("New name (blank to keep)")?;
                let storing_capacity = self.ask_optional_parse("New storing capacity (blank to keep)")?;
                let landing_ability = self
                    .ask_optional("Landing ability y/n (blank to keep)")?
                    .map(|answer| parse_yes_no(&answer))
                    .transpose()?;
                let changes = PortChanges {
                    name,
                    storing_capacity,
                    landing_ability,
                };
                fleet.modify_port(session, &id, changes)?;
                writeln!(self.output, "Port updated.")?;
            }
            Action::ViewPort => {
                let id = self.port_for(session)?;
                let port = fleet.port(session, &id)?;
                writeln!(self.output, "{}", describe_port(port))?;
                for c in port.containers() {
                    writeln!(self.output, "  {}", describe_container(c))?;
                }
            }
            Action::AddContainer => {
                let port = self.port_for(session)?;
                let id = self.ask("Container id")?;
                let weight = self.ask_parse::<f64>("Weight (kg)")?;
                let kind = self.ask_parse::<ContainerType>(
                    "Type (dry storage/open top/open side/refrigerated/liquid)",
                )?;
                fleet.add_container_to_port(session, &port, Container::new(&id, weight, kind))?;
                writeln!(self.output, "Container added.")?;
            }
            Action::RemoveContainer => {
                let id = self.ask("Container id")?;
                fleet.remove_container(session, &id)?;
                writeln!(self.output, "Container removed.")?;
            }
            Action::ModifyContainer => {
                let id = self.ask("Container id")?;
                let changes = ContainerChanges {
                    weight: self.ask_optional_parse("New weight (blank to keep)")?,
                    kind: self.ask_optional_parse("New type (blank to keep)")?,
                };
                fleet.modify_container(session, &id, changes)?;
                writeln!(self.output, "Container updated.")?;
            }
            Action::LoadContainer => {
                let vehicle = self.ask("Vehicle id")?;
                let container = self.ask("Container id")?;
                fleet.load_container(session, &vehicle, &container)?;
                writeln!(self.output, "Container loaded.")?;
            }
            Action::UnloadContainer => {
                let vehicle = self.ask("Vehicle id")?;
                let container = self.ask("Container id")?;
                fleet.unload_container(session, &vehicle, &container)?;
                writeln!(self.output, "Container unloaded.")?;
            }
            Action::AddManager => {
                let username = self.ask("Username")?;
                let password = self.ask("Password")?;
                let port = self.ask("Managed port id")?;
                fleet.add_manager(session, &username, &password, &port)?;
                writeln!(self.output, "Manager added.")?;
            }
            Action::RemoveManager => {
                let username = self.ask("Username")?;
                fleet.remove_manager(session, &username)?;
                writeln!(self.output, "Manager removed.")?;
            }
            Action::ChangePassword => {
                let username = if session.is_admin() {
                    self.ask_optional("Username (blank for yourself)")?
                        .unwrap_or_else(|| session.username.clone())
                } else {
                    session.username.clone()
                };
                let password = self.ask("New password")?;
                fleet.change_password(session, &username, &password)?;
                writeln!(self.output, "Password changed.")?;
            }
            Action::MoveVehicle => {
                let vehicle = self.ask("Vehicle id")?;
                let destination = self.ask("Destination port id")?;
                let burned = fleet.move_vehicle(session, &vehicle, &destination)?;
                writeln!(self.output, "Vehicle moved, {burned:.2} gal burned.")?;
            }
            Action::RefuelVehicle => {
                let vehicle = self.ask("Vehicle id")?;
                let amount = self.ask_parse::<f64>("Amount (gal)")?;
                let level = fleet.refuel_vehicle(session, &vehicle, amount)?;
                writeln!(self.output, "Fuel now {level:.2} gal.")?;
            }
            Action::FuelUsage => {
                let vehicle = self.ask("Vehicle id")?;
                let destination = self.ask("Destination port id")?;
                let fuel = fleet.required_fuel(session, &vehicle, &destination)?;
                writeln!(self.output, "Required fuel: {fuel:.2} gal")?;
            }
            Action::ScheduleTrip => {
                let id = self.ask("Trip id")?;
                let vehicle = self.ask("Vehicle id")?;
                let date = self.ask_date("Departure date (YYYY-MM-DD)")?;
                let from = self.ask("Departure port id")?;
                let to = self.ask("Arrival port id")?;
                fleet.schedule_trip(session, &id, &vehicle, date, &from, &to)?;
                writeln!(self.output, "Trip scheduled.")?;
            }
            Action::StartTrip => {
                let id = self.ask("Trip id")?;
                fleet.start_trip(session, &id)?;
                writeln!(self.output, "Trip started.")?;
            }
            Action::CompleteTrip => {
                let id = self.ask("Trip id")?;
                let date = self.ask_date("Arrival date (YYYY-MM-DD)")?;
                fleet.complete_trip(session, &id, date)?;
                writeln!(self.output, "Trip completed.")?;
            }
            Action::ListPorts => {
                for port in fleet.ports(session)? {
                    writeln!(self.output, "{}", describe_port(port))?;
                }
            }
            Action::ListVehicles => {
                for vehicle in fleet.vehicles(session)? {
                    writeln!(self.output, "{}", describe_vehicle(vehicle))?;
                }
            }
            Action::ListContainers => {
                for (container, location) in fleet.containers(session)? {
                    let at = match location {
                        ContainerLocation::Port(id) => format!("port {id}"),
                        ContainerLocation::Vehicle(id) => format!("vehicle {id}"),
                    };
                    writeln!(self.output, "{} at {at}", describe_container(container))?;
                }
            }
            Action::ListUsers => {
                for user in fleet.users(session)? {
                    writeln!(self.output, "{}", describe_user(user))?;
                }
            }
            Action::ListTrips => {
                for trip in fleet.trips(session)? {
                    writeln!(self.output, "{}", describe_trip(trip))?;
                }
            }
            Action::ContainerWeights => {
                let port = self.port_for(session)?;
                let weights = fleet.container_weights(session, &port)?;
                if weights.is_empty() {
                    writeln!(self.output, "No containers at {port}.")?;
                }
                for (kind, weight) in weights {
                    writeln!(self.output, "{:<14} {weight:>12.1} kg", kind.display_name())?;
                }
            }
            Action::ShipsInPort => {
                let port = self.port_for(session)?;
                let ships = fleet.ships_in_port(session, &port)?;
                if ships.is_empty() {
                    writeln!(self.output, "No ships at {port}.")?;
                }
                for ship in ships {
                    writeln!(self.output, "{}", describe_vehicle(ship))?;
                }
            }
            Action::TripsOnDate => {
                let date = self.ask_date("Date (YYYY-MM-DD)")?;
                for trip in fleet.trips_on(session, date)? {
                    writeln!(self.output, "{}", describe_trip(trip))?;
                }
            }
            Action::TripsBetween => {
                let from = self.ask_date("From (YYYY-MM-DD)")?;
                let to = self.ask_date("To (YYYY-MM-DD)")?;
                for trip in fleet.trips_between(session, from, to)? {
                    writeln!(self.output, "{}", describe_trip(trip))?;
                }
            }
        }
        Ok(())
    }

    // ==========================================
    // Prompts
    // ==========================================

    fn ask(&mut self, label: &str) -> ActionResult<String> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ActionError::Eof);
        }
        Ok(line.trim().to_string())
    }

    fn ask_optional(&mut self, label: &str) -> ActionResult<Option<String>> {
        let answer = self.ask(label)?;
        Ok(if answer.is_empty() { None } else { Some(answer) })
    }

    fn ask_parse<T>(&mut self, label: &str) -> ActionResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let answer = self.ask(label)?;
        parse_input(&answer)
    }

    fn ask_optional_parse<T>(&mut self, label: &str) -> ActionResult<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.ask_optional(label)?
            .map(|answer| parse_input(&answer))
            .transpose()
    }

    fn ask_yes_no(&mut self, label: &str) -> ActionResult<bool> {
        let answer = self.ask(label)?;
        parse_yes_no(&answer)
    }

    fn ask_date(&mut self, label: &str) -> ActionResult<NaiveDate> {
        let answer = self.ask(label)?;
        NaiveDate::parse_from_str(&answer, DATE_FORMAT)
            .map_err(|e| ActionError::Input(format!("invalid date '{answer}': {e}")))
    }

    /// Managers always act on their own port; admins are asked
    fn port_for(&mut self, session: &Session) -> ActionResult<String> {
        match &session.role {
            Role::PortManager { port_id } => Ok(port_id.clone()),
            Role::SystemAdmin => self.ask("Port id"),
        }
    }
}

fn parse_input<T>(answer: &str) -> ActionResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    answer
        .parse()
        .map_err(|e: T::Err| ActionError::Input(format!("invalid value '{answer}': {e}")))
}

fn parse_yes_no(answer: &str) -> ActionResult<bool> {
    match answer.to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" => Ok(true),
        "n" | "no" | "false" => Ok(false),
        _ => Err(ActionError::Input(format!("expected y or n, got '{answer}'"))),
    }
}

fn parse_kind(answer: &str) -> ActionResult<VehicleKind> {
    if answer.trim().eq_ignore_ascii_case("ship") {
        return Ok(VehicleKind::Ship);
    }
    answer
        .parse::<TruckType>()
        .map(VehicleKind::Truck)
        .map_err(ActionError::Input)
}

// ==========================================
// Formatting
// ==========================================

fn describe_port(port: &Port) -> String {
    format!(
        "[{}] {} ({:.4}, {:.4}) stored {:.1}/{:.1} kg, {} containers, {} vehicles, landing: {}",
        port.id,
        port.name,
        port.location.latitude,
        port.location.longitude,
        port.stored_weight(),
        port.storing_capacity,
        port.container_count(),
        port.vehicle_count(),
        if port.landing_ability { "yes" } else { "no" }
    )
}

fn describe_vehicle(vehicle: &Vehicle) -> String {
    format!(
        "[{}] {} ({}) fuel {:.1}/{:.1} gal, cargo {:.1}/{:.1} kg, at {}",
        vehicle.id,
        vehicle.name,
        vehicle.kind.display_name(),
        vehicle.current_fuel(),
        vehicle.fuel_capacity,
        vehicle.cargo_weight(),
        vehicle.carrying_capacity,
        vehicle.current_port().unwrap_or("sea")
    )
}

fn describe_container(container: &Container) -> String {
    format!(
        "[{}] {} {:.1} kg",
        container.id,
        container.kind.display_name(),
        container.weight
    )
}

fn describe_user(user: &User) -> String {
    match user.managed_port() {
        Some(port) => format!("{} ({}, {port})", user.username, user.role.display_name()),
        None => format!("{} ({})", user.username, user.role.display_name()),
    }
}

fn describe_trip(trip: &Trip) -> String {
    let arrival = trip
        .arrival_date()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "[{}] {} {} -> {} departs {} arrives {} ({:?})",
        trip.id,
        trip.vehicle_id,
        trip.departure_port,
        trip.arrival_port,
        trip.departure_date,
        arrival,
        trip.status()
    )
}
