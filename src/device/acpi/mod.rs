// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

pub(crate) mod handler;
mod mcfg;
mod rsdp;
mod sdt;
mod xsdt;

use acpi::AcpiHandler;
use log::{info, trace};

use crate::device::DeviceError;

pub use self::{
    handler::IdentityMappedHandler,
    mcfg::{BusConfigTable, RootComplexDescriptor},
    rsdp::{find_root_pointer, ConfigurationTableEntry, RootPointer, ACPI2_TABLE_GUID},
    sdt::checksum,
    xsdt::ExtendedRootTable,
};

/// Follows RSDP, XSDT and MCFG, validating each of them, and returns the
/// table describing the PCI Express root complexes.
pub fn locate_root_complexes<'a, H, I>(handler: &H, entries: I) -> Result<BusConfigTable<H>, DeviceError>
        where H: AcpiHandler,
              I: IntoIterator<Item = &'a ConfigurationTableEntry> {
    let rsdp_address = find_root_pointer(entries)?;

    // SAFETY: the address comes from the firmware configuration table.
    let rsdp = unsafe { RootPointer::map(handler, rsdp_address) };
    rsdp.validate()?;
    trace!("[acpi] RSDP revision {} from {:?}", rsdp.revision(), core::str::from_utf8(&rsdp.oem_id()));

    // SAFETY: the RSDP was validated above.
    let xsdt = unsafe { ExtendedRootTable::from_root_pointer(handler, &rsdp)? };
    xsdt.validate()?;
    trace!("[acpi] XSDT at 0x{:x} with {} entries", rsdp.xsdt_address(), xsdt.entries().count());

    let mcfg = xsdt.find_bus_config_table(handler)?;
    mcfg.validate()?;

    info!("[acpi] MCFG at 0x{:x} describes {} root complex(es)", mcfg.physical_start(), mcfg.entries().len());
    for descriptor in mcfg.entries() {
        trace!("[acpi]   segment {} buses {}..={} at {:x}",
                descriptor.segment_group(), descriptor.start_bus(), descriptor.end_bus(),
                descriptor.base_address().as_u64());
    }

    Ok(mcfg)
}
