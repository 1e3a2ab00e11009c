pub mod config;
pub mod container;
pub mod error;
pub mod fleet;
pub mod fuel;
pub mod geo;
pub mod menu;
pub mod port;
pub mod sample_data;
pub mod store;
pub mod trip;
pub mod user;
pub mod vehicle;

pub use error::{FleetError, FleetResult};
pub use fleet::Fleet;
