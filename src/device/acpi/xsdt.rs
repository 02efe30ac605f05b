// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use acpi::{sdt::{SdtHeader, Signature}, AcpiHandler};
use log::{trace, warn};

use crate::device::DeviceError;
use super::{
    mcfg::BusConfigTable,
    rsdp::RootPointer,
    sdt::{signature_bytes, SdtMapping, HEADER_SIZE},
};

/// Extended System Description Table: an array of 64-bit pointers to the
/// other description tables.
pub struct ExtendedRootTable<H: AcpiHandler> {
    table: SdtMapping<H>,
}

impl<H: AcpiHandler> ExtendedRootTable<H> {
    pub const SIGNATURE: Signature = Signature::XSDT;

    /// Maps the table the RSDP points at. It still has to be validated.
    ///
    /// # Safety
    /// `rsdp` must be a firmware-provided root pointer.
    pub unsafe fn from_root_pointer(handler: &H, rsdp: &RootPointer<H>) -> Result<Self, DeviceError> {
        let address = rsdp.xsdt_address() as usize;
        if address == 0 {
            return Err(DeviceError::not_found("XSDT"));
        }

        let table = SdtMapping::map(handler, address);
        if table.header().signature != Self::SIGNATURE {
            warn!("[acpi] XSDT signature is {:?}", table.signature());
        }

        Ok(Self { table })
    }

    pub fn validate(&self) -> Result<(), DeviceError> {
        self.table.validate("XSDT")
    }

    #[must_use]
    pub fn header(&self) -> &SdtHeader {
        self.table.header()
    }

    /// Physical addresses of the tables this one points at.
    pub fn entries(&self) -> impl Iterator<Item = u64> + '_ {
        self.table.body(0)
            .chunks_exact(8)
            .map(|chunk| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(chunk);
                u64::from_le_bytes(bytes)
            })
    }

    /// Looks for the first pointed-at table whose signature is `MCFG`. The
    /// result still has to be validated.
    pub fn find_bus_config_table(&self, handler: &H) -> Result<BusConfigTable<H>, DeviceError> {
        for address in self.entries() {
            if address == 0 {
                continue;
            }

            let address = address as usize;

            // SAFETY: the XSDT only points at description tables.
            let header = unsafe {
                handler.map_physical_region::<SdtHeader>(address, HEADER_SIZE)
            };

            trace!("[acpi] XSDT entry 0x{address:x}: {:?}", core::str::from_utf8(&signature_bytes(&header)));

            if header.signature == BusConfigTable::<H>::SIGNATURE {
                drop(header);

                // SAFETY: see above.
                return Ok(unsafe { BusConfigTable::map(handler, address) });
            }
        }

        Err(DeviceError::not_found("MCFG"))
    }
}
