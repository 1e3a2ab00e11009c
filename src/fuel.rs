/// Fuel consumption rate constants, in gallons per ton per km
pub mod rates {
    /// Ships burn the same rate regardless of cargo type
    pub const SHIP: f64 = 3.5;

    /// Basic trucks carry dry storage, open top and open side containers
    pub const BASIC_TRUCK: f64 = 4.6;

    /// Refrigerated trucks
    pub const REEFER_TRUCK: f64 = 5.4;

    /// Liquid tankers
    pub const TANKER_TRUCK: f64 = 5.3;
}

/// Weight values are recorded in kg; rates are quoted per ton.
pub const KG_PER_TON: f64 = 1000.0;

/// Fuel needed to haul `total_cargo_weight` (kg) over `distance_km` at `rate`
/// gallons per ton per km.
pub fn required_fuel(distance_km: f64, total_cargo_weight: f64, rate: f64) -> f64 {
    distance_km * total_cargo_weight * rate / KG_PER_TON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fuel_scales_linearly() {
        assert_eq!(required_fuel(100.0, 1000.0, rates::SHIP), 350.0);
        assert_eq!(required_fuel(200.0, 1000.0, rates::SHIP), 700.0);
        assert_eq!(required_fuel(100.0, 2000.0, rates::SHIP), 700.0);
    }

    #[test]
    fn test_no_cargo_needs_no_fuel() {
        assert_eq!(required_fuel(5000.0, 0.0, rates::TANKER_TRUCK), 0.0);
    }

    #[test]
    fn test_no_distance_needs_no_fuel() {
        assert_eq!(required_fuel(0.0, 80_000.0, rates::REEFER_TRUCK), 0.0);
    }

    #[test]
    fn test_truck_rates_exceed_ship_rate() {
        for rate in [rates::BASIC_TRUCK, rates::REEFER_TRUCK, rates::TANKER_TRUCK] {
            assert!(rate > rates::SHIP);
        }
    }
}
