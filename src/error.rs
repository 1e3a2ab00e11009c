use std::fmt;

use thiserror::Error;

use crate::store::StoreError;
use crate::trip::TripStatus;
use crate::user::Permission;

/// Kind of entity an id refers to, used in lookup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Port,
    Vehicle,
    Container,
    Trip,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Port => "port",
            EntityKind::Vehicle => "vehicle",
            EntityKind::Container => "container",
            EntityKind::Trip => "trip",
        };
        f.write_str(name)
    }
}

/// Every way a fleet operation can be rejected.
///
/// All variants except `Storage` are raised before any entity is touched, so
/// a rejected operation leaves the fleet exactly as it was.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("capacity exceeded: {requested:.1} kg requested, {available:.1} kg available")]
    CapacityExceeded { requested: f64, available: f64 },

    #[error("{truck_type} truck cannot carry {container_type} containers")]
    IncompatibleCargo {
        truck_type: &'static str,
        container_type: &'static str,
    },

    #[error("vehicle '{0}' is not at a port")]
    NotAtPort(String),

    #[error("insufficient fuel: {required:.1} gal required, {available:.1} gal available")]
    InsufficientFuel { required: f64, available: f64 },

    #[error("trip cannot go from {from:?} to {to:?}")]
    IllegalTransition { from: TripStatus, to: TripStatus },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} '{id}' already exists")]
    DuplicateId { kind: EntityKind, id: String },

    #[error("user '{username}' lacks permission {permission:?}")]
    PermissionDenied {
        username: String,
        permission: Permission,
    },

    #[error("invalid username or password")]
    AuthenticationFailed,

    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("invalid {field}: {value} (must be a finite number, zero or more)")]
    InvalidQuantity { field: &'static str, value: f64 },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("port '{0}' still has containers, vehicles or active trips")]
    PortInUse(String),

    #[error("vehicle '{0}' has an active trip")]
    VehicleInUse(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl FleetError {
    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        FleetError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn duplicate(kind: EntityKind, id: &str) -> Self {
        FleetError::DuplicateId {
            kind,
            id: id.to_string(),
        }
    }
}

pub type FleetResult<T> = Result<T, FleetError>;

/// Accept a weight, capacity or fuel amount only if it is finite and not negative
pub fn check_quantity(field: &'static str, value: f64) -> FleetResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(FleetError::InvalidQuantity { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_quantity() {
        assert_eq!(check_quantity("weight", 0.0).unwrap(), 0.0);
        assert_eq!(check_quantity("weight", 12.5).unwrap(), 12.5);
        for bad in [-0.1, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                check_quantity("weight", bad),
                Err(FleetError::InvalidQuantity { field: "weight", .. })
            ));
        }
    }
}
