//! Country resolution and city lookups over the loaded reference data.
//!
//! Identifier flow:  empty → error
//!                   2 chars → ISO code, confirmed against the city index
//!                   otherwise → exact case-insensitive country name match
//!
//! An ISO code only counts as known when it has a city bucket. A country that
//! appears in `countries.json` without city data therefore resolves by name but
//! is rejected by code. This is a known quirk of the public API.

use super::types::{CityIndex, Country, LocationError, Validity};

/// Read-only lookup engine. Built once by the loader, then shared.
#[derive(Debug, Clone)]
pub struct LocationResolver {
    countries: Vec<Country>,
    cities: CityIndex,
}

impl LocationResolver {
    pub fn new(countries: Vec<Country>, cities: CityIndex) -> Self {
        Self { countries, cities }
    }

    /// All countries in load order.
    pub fn list_countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn city_bucket_count(&self) -> usize {
        self.cities.len()
    }

    /// Map a country identifier (ISO2 code or name, any case) to its ISO code.
    pub fn resolve_country(&self, identifier: &str) -> Result<String, LocationError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(LocationError::NoCountrySpecified);
        }

        if identifier.chars().count() == 2 {
            let iso = identifier.to_uppercase();
            return if self.cities.contains_key(&iso) {
                Ok(iso)
            } else {
                Err(LocationError::UnknownIsoCode(iso))
            };
        }

        let folded = identifier.to_lowercase();
        let mut matches = self
            .countries
            .iter()
            .filter(|c| c.name.to_lowercase() == folded);

        match (matches.next(), matches.count()) {
            (None, _) => Err(LocationError::CountryNotFound(identifier.to_string())),
            (Some(country), 0) => Ok(country.iso.clone()),
            (Some(_), rest) => Err(LocationError::AmbiguousCountry {
                identifier: identifier.to_string(),
                count: rest + 1,
            }),
        }
    }

    /// City names for an already resolved ISO code.
    pub fn cities_for(&self, iso: &str) -> Result<&[String], LocationError> {
        self.cities
            .get(iso)
            .map(Vec::as_slice)
            .ok_or_else(|| LocationError::UnknownCity(iso.to_string()))
    }

    /// Case-sensitive membership test. Unknown codes are simply not valid.
    pub fn is_valid_city(&self, iso: &str, city: &str) -> bool {
        self.cities
            .get(iso)
            .is_some_and(|names| names.iter().any(|n| n == city))
    }

    /// Resolve `identifier`, then return its cities.
    pub fn cities_for_identifier(&self, identifier: &str) -> Result<&[String], LocationError> {
        let iso = self.resolve_country(identifier)?;
        self.cities_for(&iso)
    }

    /// A missing identifier is a hard error; an unknown one is just invalid.
    pub fn validate_country(&self, identifier: Option<&str>) -> Result<Validity, LocationError> {
        let identifier = require(identifier, LocationError::NoCountrySpecified)?;
        Ok(match self.resolve_country(identifier) {
            Ok(_) => Validity::Valid,
            Err(e) => Validity::Invalid(e),
        })
    }

    /// Validate a country/city pair.
    ///
    /// Hard errors: missing country, and missing city once the country has
    /// resolved. An unresolvable country short-circuits to `Invalid` before
    /// the city parameter is looked at.
    pub fn validate_city(
        &self,
        identifier: Option<&str>,
        city: Option<&str>,
    ) -> Result<Validity, LocationError> {
        let identifier = require(identifier, LocationError::NoCountrySpecified)?;
        let iso = match self.resolve_country(identifier) {
            Ok(iso) => iso,
            Err(e) => return Ok(Validity::Invalid(e)),
        };

        let city = require(city, LocationError::NoCitySpecified)?;
        if self.is_valid_city(&iso, city) {
            Ok(Validity::Valid)
        } else {
            Ok(Validity::Invalid(LocationError::CityNotFound {
                iso,
                city: city.to_string(),
            }))
        }
    }
}

fn require(value: Option<&str>, missing: LocationError) -> Result<&str, LocationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(missing),
    }
}
