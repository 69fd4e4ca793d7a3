//! Loading catalogs from RON files
//!
//! A catalog file lists device ids with their family name and an optional
//! default part number:
//!
//! ```ron
//! (
//!     entries: [
//!         (device_id: 0x451, family: "STM32F76xxx/77xxx", part: Some("STM32F765ZG")),
//!         (device_id: 0x4A0, family: "Custom board MCU"),
//!     ],
//! )
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use super::{SiliconCatalog, DEVICE_ID_MASK};

/// Error type for catalog loading
#[derive(Debug, Error)]
pub enum CatalogError {
    /// I/O error reading the file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// RON parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
    /// A process-wide catalog is already installed
    #[error("a catalog is already installed")]
    AlreadyInstalled,
}

#[derive(Debug, serde::Deserialize)]
struct CatalogDef {
    entries: Vec<EntryDef>,
}

#[derive(Debug, serde::Deserialize)]
struct EntryDef {
    device_id: u16,
    family: String,
    #[serde(default)]
    part: Option<String>,
}

impl SiliconCatalog {
    /// Build a catalog from RON text
    pub fn from_ron(contents: &str) -> Result<Self, CatalogError> {
        let def: CatalogDef = ron::from_str(contents)?;

        let mut families = HashMap::new();
        let mut parts = HashMap::new();
        for entry in def.entries {
            if u32::from(entry.device_id) & !DEVICE_ID_MASK != 0 {
                return Err(CatalogError::Validation(format!(
                    "device id 0x{:X} does not fit in 12 bits",
                    entry.device_id
                )));
            }
            if entry.family.trim().is_empty() {
                return Err(CatalogError::Validation(format!(
                    "device id 0x{:03X} has an empty family name",
                    entry.device_id
                )));
            }
            if families.insert(entry.device_id, entry.family).is_some() {
                return Err(CatalogError::Validation(format!(
                    "duplicate device id 0x{:03X}",
                    entry.device_id
                )));
            }
            if let Some(part) = entry.part {
                parts.insert(entry.device_id, part);
            }
        }

        Ok(Self { families, parts })
    }

    /// Build a catalog from a RON file
    pub fn load_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path)?;
        let catalog = Self::from_ron(&contents)?;
        log::debug!(
            "Loaded {} catalog entries from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_ron() {
        let ron = r#"
        (
            entries: [
                (device_id: 0x411, family: "STM32F76xxx/77xxx", part: Some("STM32F765ZG")),
                (device_id: 0x4A0, family: "Custom board MCU"),
            ],
        )
        "#;

        let catalog = SiliconCatalog::from_ron(ron).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.family(0x411), Some("STM32F76xxx/77xxx"));
        assert_eq!(catalog.default_part(0x411), Some("STM32F765ZG"));
        assert_eq!(catalog.default_part(0x4A0), None);
        assert_eq!(catalog.info(0x4A0).part_number, "Custom_board_MCU");
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let ron = r#"(entries: [
            (device_id: 0x451, family: "A"),
            (device_id: 0x451, family: "B"),
        ])"#;
        let err = SiliconCatalog::from_ron(ron).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[test]
    fn test_wide_id_rejected() {
        let ron = r#"(entries: [(device_id: 0x1451, family: "A")])"#;
        assert!(matches!(
            SiliconCatalog::from_ron(ron),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_family_rejected() {
        let ron = r#"(entries: [(device_id: 0x451, family: "  ")])"#;
        assert!(matches!(
            SiliconCatalog::from_ron(ron),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            SiliconCatalog::from_ron("(entries: [(device_id: )])"),
            Err(CatalogError::Parse(_))
        ));
    }
}
