//! Geonames location service.
//!
//! Resolves country identifiers (ISO2 code or name) against a static
//! reference dataset, lists a country's cities, and validates country/city
//! pairs. Served over HTTP or queried once from the command line.

pub mod location;
pub mod logging;
pub mod server;
