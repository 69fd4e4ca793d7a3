//! List commands implementation

use flashkit_core::catalog::{DeviceInfo, SiliconCatalog};
use flashkit_flash::available_programmers;

/// List all supported programmers
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for p in available_programmers() {
        let name = if p.aliases.is_empty() {
            p.name.to_string()
        } else {
            format!("{} ({})", p.name, p.aliases.join(", "))
        };
        println!("  {:<16} - {}", name, p.description);
    }
}

/// Catalog entries whose family contains `family_filter` (case-insensitive)
fn filter_entries(catalog: &SiliconCatalog, family_filter: Option<&str>) -> Vec<DeviceInfo> {
    let filter = family_filter.map(str::to_lowercase);
    catalog
        .entries()
        .into_iter()
        .filter(|e| match &filter {
            Some(f) => e.family.to_lowercase().contains(f),
            None => true,
        })
        .collect()
}

/// List the silicon ID catalog
pub fn list_catalog(catalog: &SiliconCatalog, family_filter: Option<&str>) {
    println!("Known device IDs:");
    println!();
    println!("{:<8} {:<32} {}", "ID", "Family", "Default part");
    println!("{}", "-".repeat(60));

    for entry in filter_entries(catalog, family_filter) {
        let part = if entry.derived_part {
            "-"
        } else {
            entry.part_number.as_str()
        };
        println!("0x{:03X}    {:<32} {}", entry.device_id, entry.family, part);
    }
}
