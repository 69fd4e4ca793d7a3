//! Silicon ID catalog
//!
//! Two read-only tables keyed by the 12-bit device id of a silicon
//! identification word: device-id -> family name and device-id -> default
//! part number. The compiled-in catalog is built once on first use and
//! never mutated; catalogs loaded from RON files are built in one step and
//! are equally immutable afterwards.
//!
//! A program can install one catalog at startup with
//! [`SiliconCatalog::install`]; [`SiliconCatalog::shared`] hands that out
//! from then on, the compiled-in catalog before.

mod builtin;
mod database;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};

pub use database::CatalogError;

static BUILTIN: Lazy<Arc<SiliconCatalog>> = Lazy::new(|| {
    Arc::new(SiliconCatalog::from_tables(
        builtin::FAMILIES,
        builtin::DEFAULT_PARTS,
    ))
});

static INSTALLED: OnceCell<Arc<SiliconCatalog>> = OnceCell::new();

/// Mask selecting the device-id field of an identification word
pub const DEVICE_ID_MASK: u32 = 0xFFF;

/// Resolved catalog information for one device id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// The 12-bit device id
    pub device_id: u16,
    /// Family name, or `Unknown (0xNNN)` if the id is not in the catalog
    pub family: String,
    /// Default part number, or the family name with spaces replaced by
    /// underscores if the catalog has no explicit part for this id
    pub part_number: String,
    /// True if the family was found in the catalog
    pub known_family: bool,
    /// True if the part number was derived rather than looked up
    pub derived_part: bool,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:03X}  {:<32} {}",
            self.device_id, self.family, self.part_number
        )
    }
}

/// Immutable device-id tables
#[derive(Debug, Clone, Default)]
pub struct SiliconCatalog {
    families: HashMap<u16, String>,
    parts: HashMap<u16, String>,
}

impl SiliconCatalog {
    /// The compiled-in STM32 catalog
    pub fn builtin() -> &'static SiliconCatalog {
        &BUILTIN
    }

    /// Shared handle to the process-wide catalog: the installed one if
    /// any, the compiled-in one otherwise
    pub fn shared() -> Arc<SiliconCatalog> {
        match INSTALLED.get() {
            Some(catalog) => Arc::clone(catalog),
            None => Arc::clone(&BUILTIN),
        }
    }

    /// Make `catalog` the process-wide catalog
    ///
    /// Can be done once; later calls fail and leave the first catalog in
    /// place.
    pub fn install(catalog: SiliconCatalog) -> Result<Arc<SiliconCatalog>, CatalogError> {
        let catalog = Arc::new(catalog);
        INSTALLED
            .set(Arc::clone(&catalog))
            .map_err(|_| CatalogError::AlreadyInstalled)?;
        Ok(catalog)
    }

    /// Build a catalog from static `(device_id, value)` tables
    pub fn from_tables(families: &[(u16, &str)], parts: &[(u16, &str)]) -> Self {
        Self {
            families: families
                .iter()
                .map(|&(id, name)| (id, name.to_string()))
                .collect(),
            parts: parts
                .iter()
                .map(|&(id, part)| (id, part.to_string()))
                .collect(),
        }
    }

    /// Return a new catalog with the entries of `other` layered on top of
    /// this one (entries of `other` win)
    pub fn merged_with(&self, other: &SiliconCatalog) -> SiliconCatalog {
        let mut merged = self.clone();
        for (id, family) in &other.families {
            merged.families.insert(*id, family.clone());
        }
        for (id, part) in &other.parts {
            merged.parts.insert(*id, part.clone());
        }
        merged
    }

    /// Number of device ids with a family name
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// Returns true if the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Look up the family name for a device id
    pub fn family(&self, device_id: u16) -> Option<&str> {
        self.families.get(&device_id).map(String::as_str)
    }

    /// Look up the default part number for a device id
    pub fn default_part(&self, device_id: u16) -> Option<&str> {
        self.parts.get(&device_id).map(String::as_str)
    }

    /// Resolve family and part number, synthesizing fallbacks for ids the
    /// catalog does not know
    pub fn info(&self, device_id: u16) -> DeviceInfo {
        let (family, known_family) = match self.family(device_id) {
            Some(name) => (name.to_string(), true),
            None => (unknown_family_label(device_id), false),
        };
        let (part_number, derived_part) = match self.default_part(device_id) {
            Some(part) => (part.to_string(), false),
            None => (derive_part_number(&family), true),
        };
        DeviceInfo {
            device_id,
            family,
            part_number,
            known_family,
            derived_part,
        }
    }

    /// All catalog entries sorted by device id
    pub fn entries(&self) -> Vec<DeviceInfo> {
        let mut ids: Vec<u16> = self.families.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| self.info(id)).collect()
    }
}

/// Family label used for device ids missing from the catalog
pub fn unknown_family_label(device_id: u16) -> String {
    format!("Unknown (0x{:03X})", device_id)
}

/// Derive a part number from a family label
pub fn derive_part_number(family: &str) -> String {
    family.replace(' ', "_")
}
