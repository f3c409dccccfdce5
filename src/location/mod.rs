//! Location reference data for the geonames service.
//!
//! Loads the country list and per-country city lists once at startup and
//! answers country resolution and city validation queries against them.

pub mod loader;
pub mod resolver;
pub mod types;

pub use loader::{load, load_dir, write_artifacts};
pub use resolver::LocationResolver;
pub use types::{CityIndex, Country, LoadError, LocationError, Validity};
