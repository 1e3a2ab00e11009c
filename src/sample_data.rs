//! Deterministic demo fleet for first start.
//!
//! Every random choice is drawn from a per-topic ChaCha8 stream derived from
//! the seed, so the same seed always builds the same fleet.

use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use tracing::info;

use crate::container::{Container, ContainerType};
use crate::error::{FleetError, FleetResult};
use crate::fleet::{Fleet, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};
use crate::port::Port;
use crate::user::Session;
use crate::vehicle::{TruckType, Vehicle};

/// A real port used as a template
struct PortSite {
    id: &'static str,
    name: &'static str,
    latitude: f64,
    longitude: f64,
    landing_ability: bool,
}

const PORT_SITES: &[PortSite] = &[
    PortSite {
        id: "RTM",
        name: "Rotterdam",
        latitude: 51.9244,
        longitude: 4.4777,
        landing_ability: true,
    },
    PortSite {
        id: "HAM",
        name: "Hamburg",
        latitude: 53.5461,
        longitude: 9.9661,
        landing_ability: true,
    },
    PortSite {
        id: "SIN",
        name: "Singapore",
        latitude: 1.2644,
        longitude: 103.8222,
        landing_ability: false,
    },
    PortSite {
        id: "SHA",
        name: "Shanghai",
        latitude: 31.2304,
        longitude: 121.4737,
        landing_ability: true,
    },
    PortSite {
        id: "LAX",
        name: "Los Angeles",
        latitude: 33.7405,
        longitude: -118.2713,
        landing_ability: true,
    },
];

const SHIP_NAMES: &[&str] = &[
    "Ever Given",
    "Maersk Mc-Kinney",
    "MSC Gulsun",
    "CMA CGM Marco Polo",
    "HMM Algeciras",
    "Cosco Universe",
    "ONE Innovation",
];

const TRUCK_NAMES: &[&str] = &[
    "Road Runner",
    "Iron Mule",
    "Blue Yonder",
    "Night Hauler",
    "Cold Chain",
    "Steady Eddie",
];

const TRUCK_TYPES: &[TruckType] = &[TruckType::Basic, TruckType::Reefer, TruckType::Tanker];

/// Generation parameters
pub mod params {
    pub const CONTAINERS_PER_PORT: usize = 8;
    pub const WEIGHT_MEAN_KG: f64 = 8_000.0;
    pub const WEIGHT_STD_DEV_KG: f64 = 3_000.0;
    pub const WEIGHT_MIN_KG: f64 = 500.0;
    pub const WEIGHT_MAX_KG: f64 = 30_000.0;
    pub const COMPLETED_TRIPS: usize = 4;
    pub const MANAGER_PASSWORD: &str = "manager123";
}

/// Build a sample fleet from `seed`
pub fn generate(seed: u64) -> FleetResult<Fleet> {
    let mut fleet = Fleet::new();
    let admin = fleet.login(DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD)?;

    add_ports(&mut fleet, &admin, &mut topic_rng(seed, "ports"))?;
    add_vehicles(&mut fleet, &admin, &mut topic_rng(seed, "vehicles"))?;
    add_containers(&mut fleet, &admin, &mut topic_rng(seed, "containers"))?;
    load_trucks(&mut fleet, &admin)?;
    add_trips(&mut fleet, &admin, &mut topic_rng(seed, "trips"))?;

    for site in PORT_SITES {
        let username = manager_username(site.id);
        fleet.add_manager(&admin, &username, params::MANAGER_PASSWORD, site.id)?;
    }

    info!(seed, "generated sample fleet");
    Ok(fleet)
}

/// Username of the sample manager for a port
pub fn manager_username(port_id: &str) -> String {
    format!("manager_{}", port_id.to_ascii_lowercase())
}

fn add_ports(fleet: &mut Fleet, admin: &Session, rng: &mut ChaCha8Rng) -> FleetResult<()> {
    for site in PORT_SITES {
        let capacity = (rng.gen_range(150_000.0..400_000.0_f64) / 1000.0).round() * 1000.0;
        let port = Port::new(
            site.id,
            site.name,
            site.latitude,
            site.longitude,
            capacity,
            site.landing_ability,
        )?;
        fleet.add_port(admin, port)?;
    }
    Ok(())
}

/// One ship per port, plus two trucks of each body type at landing ports
fn add_vehicles(fleet: &mut Fleet, admin: &Session, rng: &mut ChaCha8Rng) -> FleetResult<()> {
    for (i, site) in PORT_SITES.iter().enumerate() {
        let fuel = (rng.gen_range(200_000.0..600_000.0_f64) / 1000.0).round() * 1000.0;
        let carrying = (rng.gen_range(100_000.0..200_000.0_f64) / 1000.0).round() * 1000.0;
        let name = SHIP_NAMES[rng.gen_range(0..SHIP_NAMES.len())];
        let ship = Vehicle::ship(&format!("S{}", i + 1), name, fuel, carrying);
        fleet.add_vehicle(admin, ship, Some(site.id))?;
    }

    let landing: Vec<&PortSite> = PORT_SITES.iter().filter(|s| s.landing_ability).collect();
    for i in 0..TRUCK_TYPES.len() * 2 {
        let truck_type = TRUCK_TYPES[i % TRUCK_TYPES.len()];
        let site = landing[rng.gen_range(0..landing.len())];
        let fuel = (rng.gen_range(800.0..2_000.0_f64) / 10.0).round() * 10.0;
        let carrying = (rng.gen_range(20_000.0..40_000.0_f64) / 100.0).round() * 100.0;
        let truck = Vehicle::truck(&format!("T{}", i + 1), TRUCK_NAMES[i], truck_type, fuel, carrying);
        fleet.add_vehicle(admin, truck, Some(site.id))?;
    }
    Ok(())
}

fn sample_weight(rng: &mut ChaCha8Rng) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    let weight = params::WEIGHT_MEAN_KG + z * params::WEIGHT_STD_DEV_KG;
    weight.clamp(params::WEIGHT_MIN_KG, params::WEIGHT_MAX_KG).round()
}

/// Containers that would overflow a port are skipped
fn add_containers(fleet: &mut Fleet, admin: &Session, rng: &mut ChaCha8Rng) -> FleetResult<()> {
    let types = ContainerType::all();
    let mut next_id = 1;
    for site in PORT_SITES {
        for _ in 0..params::CONTAINERS_PER_PORT {
            let kind = types[rng.gen_range(0..types.len())];
            let container = Container::new(&format!("C{next_id:03}"), sample_weight(rng), kind);
            match fleet.add_container_to_port(admin, site.id, container) {
                Ok(()) => next_id += 1,
                Err(FleetError::CapacityExceeded { .. }) => {}
                Err(e) => return Err(e),
            }
        }
    }
    Ok(())
}

/// Give every truck the first compatible container that fits at its port
fn load_trucks(fleet: &mut Fleet, admin: &Session) -> FleetResult<()> {
    let mut plan: Vec<(String, String)> = Vec::new();
    for truck in fleet.vehicles(admin)?.iter().filter(|v| v.is_truck()) {
        let Some(port_id) = truck.current_port() else {
            continue;
        };
        let port = fleet.port(admin, port_id)?;
        let pick = port
            .containers()
            .iter()
            .find(|c| truck.check_container(c).is_ok() && !plan.iter().any(|(_, id)| id == &c.id));
        if let Some(container) = pick {
            plan.push((truck.id.clone(), container.id.clone()));
        }
    }
    for (truck_id, container_id) in plan {
        fleet.load_container(admin, &truck_id, &container_id)?;
    }
    Ok(())
}

/// Completed ship voyages, then one pending trip per ship.
/// Trips here do not burn fuel.
fn add_trips(fleet: &mut Fleet, admin: &Session, rng: &mut ChaCha8Rng) -> FleetResult<()> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .ok_or_else(|| FleetError::InvalidDate("2024-01-01".to_string()))?;
    let ships: Vec<String> = fleet
        .vehicles(admin)?
        .iter()
        .filter(|v| v.is_ship())
        .map(|v| v.id.clone())
        .collect();

    let mut trip_no = 1;
    for ship_id in &ships {
        let mut day = base + Duration::days(rng.gen_range(0..30));
        for _ in 0..params::COMPLETED_TRIPS {
            let from = docked_at(fleet, admin, ship_id)?;
            let to = other_port(rng, &from);
            let trip_id = format!("TR{trip_no:03}");
            trip_no += 1;

            fleet.schedule_trip(admin, &trip_id, ship_id, day, &from, to)?;
            fleet.start_trip(admin, &trip_id)?;
            day += Duration::days(rng.gen_range(3..25));
            fleet.complete_trip(admin, &trip_id, day)?;
            day += Duration::days(rng.gen_range(1..10));
        }

        let from = docked_at(fleet, admin, ship_id)?;
        let to = other_port(rng, &from);
        let trip_id = format!("TR{trip_no:03}");
        trip_no += 1;
        fleet.schedule_trip(admin, &trip_id, ship_id, day, &from, to)?;
    }
    Ok(())
}

fn docked_at(fleet: &Fleet, admin: &Session, vehicle_id: &str) -> FleetResult<String> {
    fleet
        .vehicle(admin, vehicle_id)?
        .current_port()
        .map(str::to_string)
        .ok_or_else(|| FleetError::NotAtPort(vehicle_id.to_string()))
}

fn other_port(rng: &mut ChaCha8Rng, from: &str) -> &'static str {
    let choices: Vec<&PortSite> = PORT_SITES.iter().filter(|s| s.id != from).collect();
    choices[rng.gen_range(0..choices.len())].id
}

/// A deterministic RNG stream for one generation topic
fn topic_rng(seed: u64, topic: &str) -> ChaCha8Rng {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[..8].copy_from_slice(&seed.to_le_bytes());
    seed_bytes[8..16].copy_from_slice(&fnv1a(topic.as_bytes()).to_le_bytes());
    ChaCha8Rng::from_seed(seed_bytes)
}

/// FNV-1a, stable across platforms and compiler versions
fn fnv1a(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
