// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use core::mem::size_of;
use acpi::{rsdp::Rsdp, AcpiHandler, PhysicalMapping};
use log::{trace, warn};

use crate::device::DeviceError;
use super::sdt::checksum;

/// `8868e871-e4f1-11d3-bc22-0080c73c8881`, in the mixed-endian byte order
/// EFI stores GUIDs in.
pub const ACPI2_TABLE_GUID: [u8; 16] = [
    0x71, 0xe8, 0x68, 0x88,
    0xf1, 0xe4,
    0xd3, 0x11,
    0xbc, 0x22,
    0x00, 0x80, 0xc7, 0x3c, 0x88, 0x81,
];

/// One (identifier, pointer) pair of the firmware configuration table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigurationTableEntry {
    pub identifier: [u8; 16],
    pub address: usize,
}

/// Returns the address stored in the first ACPI 2.0 configuration table entry.
pub fn find_root_pointer<'a, I>(entries: I) -> Result<usize, DeviceError>
        where I: IntoIterator<Item = &'a ConfigurationTableEntry> {
    let entry = entries.into_iter()
        .find(|entry| entry.identifier == ACPI2_TABLE_GUID)
        .ok_or(DeviceError::not_found("ACPI 2.0 configuration table entry"))?;

    if entry.address == 0 {
        return Err(DeviceError::not_found("RSDP"));
    }

    trace!("[acpi] RSDP at 0x{:x}", entry.address);
    Ok(entry.address)
}

/// The Root System Description Pointer handed out by the firmware.
///
/// The extended fields are read from the mapped bytes. `Rsdp` only hands
/// them out above revision 0, and revision 0 is accepted here.
pub struct RootPointer<H: AcpiHandler> {
    mapping: PhysicalMapping<H, Rsdp>,
}

pub const RSDP_SIGNATURE: &[u8; 8] = b"RSD PTR ";

/// Bytes covered by `checksum`.
pub const RSDP_LEGACY_SIZE: usize = 20;

/// Bytes covered by `extended_checksum`.
pub const RSDP_SIZE: usize = 36;

const _: () = assert!(size_of::<Rsdp>() == RSDP_SIZE);

impl<H: AcpiHandler> RootPointer<H> {
    /// # Safety
    /// `address` must be the RSDP address handed out by the firmware.
    pub unsafe fn map(handler: &H, address: usize) -> Self {
        let mapping = handler.map_physical_region::<Rsdp>(address, size_of::<Rsdp>());

        if mapping.signature() != *RSDP_SIGNATURE {
            warn!("[acpi] RSDP signature is {:?}", mapping.signature());
        }

        Self { mapping }
    }

    /// Only the extended revision is supported, so revision 1 is refused
    /// outright. Every other revision must pass both checksums.
    pub fn validate(&self) -> Result<(), DeviceError> {
        let bytes = self.as_bytes();

        if checksum(&bytes[..RSDP_LEGACY_SIZE]) != 0 {
            return Err(DeviceError::checksum_invalid("RSDP"));
        }

        if self.revision() == 1 {
            return Err(DeviceError::revision_unsupported(self.revision()));
        }

        if checksum(bytes) != 0 {
            return Err(DeviceError::checksum_invalid("RSDP extended"));
        }

        Ok(())
    }

    #[must_use]
    pub fn rsdp(&self) -> &Rsdp {
        &self.mapping
    }

    #[must_use]
    pub fn revision(&self) -> u8 {
        self.mapping.revision()
    }

    #[must_use]
    pub fn oem_id(&self) -> [u8; 6] {
        let mut oem_id = [0; 6];
        oem_id.copy_from_slice(&self.as_bytes()[9..15]);
        oem_id
    }

    #[must_use]
    pub fn xsdt_address(&self) -> u64 {
        let mut address = [0; 8];
        address.copy_from_slice(&self.as_bytes()[24..32]);
        u64::from_le_bytes(address)
    }

    fn as_bytes(&self) -> &[u8; RSDP_SIZE] {
        let rsdp: &Rsdp = &self.mapping;

        // SAFETY: `Rsdp` is packed, 36 bytes long and has no padding.
        unsafe { &*(rsdp as *const Rsdp).cast::<[u8; RSDP_SIZE]>() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceErrorKind;
    use crate::testing::{build_rsdp, SimulatedMemory};

    const RSDP_ADDRESS: usize = 0x7F00_0000;

    fn map_rsdp(bytes: &[u8]) -> (SimulatedMemory, usize) {
        let mut memory = SimulatedMemory::new();
        memory.add_region(RSDP_ADDRESS, RSDP_SIZE, 0);
        memory.write_bytes(RSDP_ADDRESS, bytes);
        (memory, RSDP_ADDRESS)
    }

    #[test]
    fn finds_first_acpi2_entry() {
        let entries = [
            ConfigurationTableEntry { identifier: [0xAA; 16], address: 0x1000 },
            ConfigurationTableEntry { identifier: ACPI2_TABLE_GUID, address: 0x2000 },
            ConfigurationTableEntry { identifier: ACPI2_TABLE_GUID, address: 0x3000 },
        ];

        assert_eq!(find_root_pointer(&entries).unwrap(), 0x2000);
    }

    #[test]
    fn missing_acpi2_entry_is_not_found() {
        let entries = [
            ConfigurationTableEntry { identifier: [0; 16], address: 0x1000 },
        ];

        let error = find_root_pointer(&entries).unwrap_err();
        assert!(matches!(error.kind(), DeviceErrorKind::NotFound(_)));
    }

    #[test]
    fn null_acpi2_pointer_is_not_found() {
        let entries = [
            ConfigurationTableEntry { identifier: ACPI2_TABLE_GUID, address: 0 },
        ];

        assert!(find_root_pointer(&entries).is_err());
    }

    #[test]
    fn accepts_revision_2_with_fixed_up_checksums() {
        let bytes = build_rsdp(2, 0xDEAD_0000);
        let (memory, address) = map_rsdp(&bytes);

        let rsdp = unsafe { RootPointer::map(&memory.handler(), address) };
        assert_eq!(rsdp.revision(), 2);
        assert_eq!(rsdp.xsdt_address(), 0xDEAD_0000);
        assert_eq!(rsdp.rsdp().length(), RSDP_SIZE as u32);
        assert_eq!(&rsdp.oem_id(), b"BOCHS ");
        assert!(rsdp.validate().is_ok());
    }

    #[test]
    fn rejects_revision_1_even_with_valid_checksums() {
        let bytes = build_rsdp(1, 0xDEAD_0000);
        assert_eq!(checksum(&bytes[..RSDP_LEGACY_SIZE]), 0);
        assert_eq!(checksum(&bytes), 0);

        let (memory, address) = map_rsdp(&bytes);
        let rsdp = unsafe { RootPointer::map(&memory.handler(), address) };

        let error = rsdp.validate().unwrap_err();
        assert!(matches!(error.kind(), DeviceErrorKind::RevisionUnsupported(1)));
    }

    #[test]
    fn rejects_broken_legacy_checksum() {
        let mut bytes = build_rsdp(2, 0xDEAD_0000);
        bytes[15 + 1] ^= 0x01;

        let (memory, address) = map_rsdp(&bytes);
        let rsdp = unsafe { RootPointer::map(&memory.handler(), address) };

        let error = rsdp.validate().unwrap_err();
        assert!(matches!(error.kind(), DeviceErrorKind::ChecksumInvalid(_)));
    }

    #[test]
    fn rejects_broken_extended_checksum() {
        let mut bytes = build_rsdp(2, 0xDEAD_0000);
        bytes[33] = 0x5A;

        let (memory, address) = map_rsdp(&bytes);
        let rsdp = unsafe { RootPointer::map(&memory.handler(), address) };

        let error = rsdp.validate().unwrap_err();
        assert!(matches!(error.kind(), DeviceErrorKind::ChecksumInvalid("RSDP extended")));
    }

    #[test]
    fn revision_0_still_requires_extended_checksum() {
        let mut bytes = build_rsdp(0, 0);
        bytes[32] = bytes[32].wrapping_add(1);

        let (memory, address) = map_rsdp(&bytes);
        let rsdp = unsafe { RootPointer::map(&memory.handler(), address) };

        assert!(rsdp.validate().is_err());
    }
}
