// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use log::debug;
use uefi::{
    prelude::*,
    table::cfg::*,
    Guid,
};

fn table_name(guid: &Guid) -> Option<&'static str> {
    match *guid {
        ACPI_GUID => Some("ACPI 1.0"),
        ACPI2_GUID => Some("ACPI 2.0"),
        SMBIOS_GUID => Some("SMBIOS"),
        SMBIOS3_GUID => Some("SMBIOS 3"),
        DXE_SERVICES_GUID => Some("DXE services"),
        HAND_OFF_BLOCK_LIST_GUID => Some("HOB list"),
        _ => None,
    }
}

/// Lists what the firmware handed us, before any of it is parsed.
pub fn print_config_tables(system_table: &SystemTable<Boot>) {
    for entry in system_table.config_table() {
        debug!("Configuration table {} at {:p}: {}",
                entry.guid, entry.address, table_name(&entry.guid).unwrap_or("(unknown)"));
    }
}
