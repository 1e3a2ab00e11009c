use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FleetError, FleetResult};
use crate::port::Port;
use crate::vehicle::Vehicle;

/// Trip lifecycle: Pending -> InProgress -> Completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripStatus {
    Pending,
    InProgress,
    Completed,
}

/// A scheduled voyage of one vehicle between two ports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub vehicle_id: String,
    pub departure_date: NaiveDate,
    arrival_date: Option<NaiveDate>,
    pub departure_port: String,
    pub arrival_port: String,
    status: TripStatus,
}

impl Trip {
    /// Create a pending trip
    pub fn new(
        id: &str,
        vehicle_id: &str,
        departure_date: NaiveDate,
        departure_port: &str,
        arrival_port: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            departure_date,
            arrival_date: None,
            departure_port: departure_port.to_string(),
            arrival_port: arrival_port.to_string(),
            status: TripStatus::Pending,
        }
    }

    pub fn status(&self) -> TripStatus {
        self.status
    }

    pub fn arrival_date(&self) -> Option<NaiveDate> {
        self.arrival_date
    }

    /// Whether the trip is still pending or underway
    pub fn is_active(&self) -> bool {
        matches!(self.status, TripStatus::Pending | TripStatus::InProgress)
    }

    /// Whether the trip departs or arrives on `date`
    pub fn touches_date(&self, date: NaiveDate) -> bool {
        self.departure_date == date || self.arrival_date == Some(date)
    }

    /// Whether the trip departs or arrives within `[from, to]`
    pub fn within(&self, from: NaiveDate, to: NaiveDate) -> bool {
        let in_range = |d: NaiveDate| d >= from && d <= to;
        in_range(self.departure_date) || self.arrival_date.is_some_and(in_range)
    }

    /// Depart: the vehicle leaves the departure port and is in transit.
    ///
    /// Fuel is not debited here; `Vehicle::move_to` is the fuel-accounted move.
    pub fn start(&mut self, vehicle: &mut Vehicle, departure: &mut Port) -> FleetResult<()> {
        if self.status != TripStatus::Pending {
            return Err(FleetError::IllegalTransition {
                from: self.status,
                to: TripStatus::InProgress,
            });
        }
        debug_assert_eq!(vehicle.id, self.vehicle_id);
        debug_assert_eq!(departure.id, self.departure_port);

        self.status = TripStatus::InProgress;
        departure.remove_vehicle(&vehicle.id);
        vehicle.undock();
        Ok(())
    }

    /// Arrive: the vehicle docks at the arrival port and the trip is archived
    /// in that port's history.
    ///
    /// Returns the trip id evicted from the arrival port's history, if any.
    pub fn complete(
        &mut self,
        arrival_date: NaiveDate,
        vehicle: &mut Vehicle,
        arrival: &mut Port,
    ) -> FleetResult<Option<String>> {
        if self.status != TripStatus::InProgress {
            return Err(FleetError::IllegalTransition {
                from: self.status,
                to: TripStatus::Completed,
            });
        }
        if arrival_date < self.departure_date {
            return Err(FleetError::InvalidDate(format!(
                "arrival {arrival_date} precedes departure {}",
                self.departure_date
            )));
        }
        debug_assert_eq!(vehicle.id, self.vehicle_id);
        debug_assert_eq!(arrival.id, self.arrival_port);

        self.arrival_date = Some(arrival_date);
        self.status = TripStatus::Completed;
        arrival.add_vehicle(&vehicle.id);
        vehicle.dock_at(&arrival.id);
        Ok(arrival.complete_trip(&self.id))
    }
}
