//! Shipping containers and their per-type fuel rates.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{check_quantity, FleetResult};
use crate::fuel::KG_PER_TON;

/// Container construction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContainerType {
    DryStorage,
    OpenTop,
    OpenSide,
    Refrigerated,
    Liquid,
}

impl ContainerType {
    /// Ship fuel rate for this container type (gallons per ton per km)
    pub fn ship_rate(&self) -> f64 {
        match self {
            ContainerType::DryStorage => 3.5,
            ContainerType::OpenTop => 2.8,
            ContainerType::OpenSide => 2.7,
            ContainerType::Refrigerated => 4.5,
            ContainerType::Liquid => 4.8,
        }
    }

    /// Truck fuel rate for this container type (gallons per ton per km)
    pub fn truck_rate(&self) -> f64 {
        match self {
            ContainerType::DryStorage => 4.6,
            ContainerType::OpenTop => 3.2,
            ContainerType::OpenSide => 3.2,
            ContainerType::Refrigerated => 5.4,
            ContainerType::Liquid => 5.3,
        }
    }

    /// Display name for menus and error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ContainerType::DryStorage => "Dry Storage",
            ContainerType::OpenTop => "Open Top",
            ContainerType::OpenSide => "Open Side",
            ContainerType::Refrigerated => "Refrigerated",
            ContainerType::Liquid => "Liquid",
        }
    }

    pub fn all() -> &'static [ContainerType] {
        &[
            ContainerType::DryStorage,
            ContainerType::OpenTop,
            ContainerType::OpenSide,
            ContainerType::Refrigerated,
            ContainerType::Liquid,
        ]
    }
}

impl FromStr for ContainerType {
    type Err = String;

    /// Accepts names like `dry_storage`, `DRY_STORAGE`, `dry storage` or `drystorage`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "drystorage" => Ok(ContainerType::DryStorage),
            "opentop" => Ok(ContainerType::OpenTop),
            "openside" => Ok(ContainerType::OpenSide),
            "refrigerated" => Ok(ContainerType::Refrigerated),
            "liquid" => Ok(ContainerType::Liquid),
            _ => Err(format!("unknown container type '{s}'")),
        }
    }
}

/// A container stored at a port or carried by a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    /// Gross weight in kg
    pub weight: f64,
    pub kind: ContainerType,
}

impl Container {
    pub fn new(id: &str, weight: f64, kind: ContainerType) -> Self {
        Self {
            id: id.to_string(),
            weight,
            kind,
        }
    }

    /// Reject weights that would poison capacity sums
    pub fn validate(&self) -> FleetResult<()> {
        check_quantity("container weight", self.weight)?;
        Ok(())
    }

    /// Container-level fuel estimate for hauling this container `distance` km.
    ///
    /// Uses the container type's own rate table, not the vehicle's mode rate,
    /// so it generally disagrees with `Vehicle::calculate_required_fuel`.
    pub fn calculate_fuel_consumption(&self, is_ship: bool, distance: f64) -> f64 {
        let rate = if is_ship {
            self.kind.ship_rate()
        } else {
            self.kind.truck_rate()
        };
        (self.weight / KG_PER_TON) * rate * distance
    }
}

/// Total weight of a slice of containers
pub fn total_weight(containers: &[Container]) -> f64 {
    containers.iter().map(|c| c.weight).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_table() {
        assert_eq!(ContainerType::DryStorage.ship_rate(), 3.5);
        assert_eq!(ContainerType::DryStorage.truck_rate(), 4.6);
        assert_eq!(ContainerType::OpenSide.ship_rate(), 2.7);
        assert_eq!(ContainerType::OpenSide.truck_rate(), 3.2);
        assert_eq!(ContainerType::Liquid.ship_rate(), 4.8);
        assert_eq!(ContainerType::Refrigerated.truck_rate(), 5.4);
    }

    #[test]
    fn test_fuel_consumption_by_mode() {
        let c = Container::new("C1", 2000.0, ContainerType::Refrigerated);
        // 2 tons * 4.5 * 100 km
        assert!((c.calculate_fuel_consumption(true, 100.0) - 900.0).abs() < 1e-9);
        // 2 tons * 5.4 * 100 km
        assert!((c.calculate_fuel_consumption(false, 100.0) - 1080.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_weight() {
        let containers = vec![
            Container::new("A", 1500.0, ContainerType::OpenTop),
            Container::new("B", 2500.0, ContainerType::Liquid),
        ];
        assert_eq!(total_weight(&containers), 4000.0);
        assert_eq!(total_weight(&[]), 0.0);
    }

    #[test]
    fn test_parse_container_type() {
        assert_eq!("dry_storage".parse::<ContainerType>(), Ok(ContainerType::DryStorage));
        assert_eq!("OPEN_TOP".parse::<ContainerType>(), Ok(ContainerType::OpenTop));
        assert_eq!("Open Side".parse::<ContainerType>(), Ok(ContainerType::OpenSide));
        assert_eq!("refrigerated".parse::<ContainerType>(), Ok(ContainerType::Refrigerated));
        assert!("crate".parse::<ContainerType>().is_err());
    }

    #[test]
    fn test_all_types_listed() {
        assert_eq!(ContainerType::all().len(), 5);
    }
}
