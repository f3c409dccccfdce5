//! Reference data loader.
//!
//! Layout under a data directory:
//!   countries.json       — `[{"iso": "GB", "name": "United Kingdom"}, ...]`
//!   cities/<ISO>*.json   — `["London", "Manchester", ...]`, one file per country
//!   cities.json          — alternative to `cities/`: `{"GB": ["London", ...], ...}`
//!
//! Everything is read once at startup. Any malformed or missing artifact is
//! fatal; there is no partial load.

use super::resolver::LocationResolver;
use super::types::{is_canonical_iso, CityIndex, Country, LoadError};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

pub const COUNTRIES_FILE: &str = "countries.json";
pub const CITIES_DIR: &str = "cities";
pub const CITIES_FILE: &str = "cities.json";

/// Load from a data directory using the standard file names.
pub fn load_dir(data_dir: &Path) -> Result<LocationResolver, LoadError> {
    let countries_path = data_dir.join(COUNTRIES_FILE);
    let cities_dir = data_dir.join(CITIES_DIR);
    let cities_path = if cities_dir.is_dir() {
        cities_dir
    } else {
        let combined = data_dir.join(CITIES_FILE);
        if !combined.is_file() {
            return Err(LoadError::Missing(cities_dir));
        }
        combined
    };
    load(&countries_path, &cities_path)
}

/// Load from explicit paths. `cities_path` may be a per-country directory or a
/// single combined document.
pub fn load(countries_path: &Path, cities_path: &Path) -> Result<LocationResolver, LoadError> {
    let countries = read_countries(countries_path)?;
    let cities = if cities_path.is_dir() {
        read_city_dir(cities_path)?
    } else {
        read_city_document(cities_path)?
    };

    let resolver = assemble(countries, cities)?;
    tracing::info!(
        countries = resolver.list_countries().len(),
        city_buckets = resolver.city_bucket_count(),
        "Loaded location data"
    );
    Ok(resolver)
}

/// Validate cross-record invariants and build the resolver.
pub fn assemble(countries: Vec<Country>, cities: CityIndex) -> Result<LocationResolver, LoadError> {
    let mut seen = HashSet::with_capacity(countries.len());
    let mut names: HashMap<String, usize> = HashMap::new();
    for country in &countries {
        if !seen.insert(country.iso.as_str()) {
            return Err(LoadError::DuplicateCountry(country.iso.clone()));
        }
        *names.entry(country.name.to_lowercase()).or_default() += 1;
    }

    for (name, count) in names.iter().filter(|(_, c)| **c > 1) {
        tracing::warn!(name = %name, count, "Country name is shared by several countries; name lookups will be ambiguous");
    }

    let mut orphans: Vec<&str> = cities
        .keys()
        .map(String::as_str)
        .filter(|iso| !seen.contains(iso))
        .collect();
    if !orphans.is_empty() {
        orphans.sort_unstable();
        tracing::warn!(codes = ?orphans, "City data without a matching country");
    }

    Ok(LocationResolver::new(countries, cities))
}

fn read_countries(path: &Path) -> Result<Vec<Country>, LoadError> {
    let data = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    let countries: Vec<Country> = serde_json::from_str(&data).map_err(|e| LoadError::json(path, e))?;

    if let Some(bad) = countries.iter().find(|c| !is_canonical_iso(&c.iso)) {
        return Err(LoadError::InvalidIsoCode {
            path: path.to_path_buf(),
            code: bad.iso.clone(),
        });
    }
    Ok(countries)
}

fn read_city_dir(dir: &Path) -> Result<CityIndex, LoadError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))? {
        let path = entry.map_err(|e| LoadError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        } else {
            tracing::debug!(path = %path.display(), "Skipping non-JSON entry in cities directory");
        }
    }
    paths.sort();

    let mut index = CityIndex::with_capacity(paths.len());
    for path in paths {
        // The first two characters of the filename are the ISO code.
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let code = file_name.get(..2).unwrap_or(file_name.as_str()).to_string();
        if !is_canonical_iso(&code) {
            return Err(LoadError::InvalidIsoCode { path, code });
        }

        let data = fs::read_to_string(&path).map_err(|e| LoadError::io(&path, e))?;
        let names: Vec<String> = serde_json::from_str(&data).map_err(|e| LoadError::json(&path, e))?;

        if index.insert(code.clone(), names).is_some() {
            return Err(LoadError::DuplicateCityBucket(code));
        }
    }
    Ok(index)
}

fn read_city_document(path: &Path) -> Result<CityIndex, LoadError> {
    let data = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    let document: CityDocument = serde_json::from_str(&data).map_err(|e| LoadError::json(path, e))?;
    if let Some(code) = document.duplicate {
        return Err(LoadError::DuplicateCityBucket(code));
    }
    let index = document.index;

    if let Some(bad) = index.keys().find(|code| !is_canonical_iso(code)) {
        return Err(LoadError::InvalidIsoCode {
            path: path.to_path_buf(),
            code: bad.clone(),
        });
    }
    Ok(index)
}

/// The combined `cities.json` object. A plain map would let a repeated key
/// silently overwrite the earlier one, so the first repeat is kept aside.
struct CityDocument {
    index: CityIndex,
    duplicate: Option<String>,
}

impl<'de> Deserialize<'de> for CityDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = CityDocument;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping ISO2 codes to arrays of city names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<CityDocument, A::Error> {
                let mut index = CityIndex::with_capacity(map.size_hint().unwrap_or(0));
                let mut duplicate = None;
                while let Some((code, names)) = map.next_entry::<String, Vec<String>>()? {
                    if index.contains_key(&code) {
                        duplicate.get_or_insert(code);
                    } else {
                        index.insert(code, names);
                    }
                }
                Ok(CityDocument { index, duplicate })
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

/// Write the artifacts in the per-country layout `load_dir` reads.
pub fn write_artifacts(dir: &Path, countries: &[Country], cities: &CityIndex) -> Result<(), LoadError> {
    let cities_dir = dir.join(CITIES_DIR);
    fs::create_dir_all(&cities_dir).map_err(|e| LoadError::io(&cities_dir, e))?;

    let countries_path = dir.join(COUNTRIES_FILE);
    let json = serde_json::to_string(countries).map_err(|e| LoadError::json(&countries_path, e))?;
    fs::write(&countries_path, json).map_err(|e| LoadError::io(&countries_path, e))?;

    for (iso, names) in cities {
        let path = cities_dir.join(format!("{iso}.json"));
        let json = serde_json::to_string(names).map_err(|e| LoadError::json(&path, e))?;
        fs::write(&path, json).map_err(|e| LoadError::io(&path, e))?;
    }
    Ok(())
}
