// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use core::mem::size_of;
use core::{ptr, slice};
use acpi::{sdt::SdtHeader, AcpiHandler, PhysicalMapping};
use log::trace;

use crate::device::DeviceError;

/// Sums all bytes modulo 256. ACPI structures are valid when this is zero.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

pub const HEADER_SIZE: usize = size_of::<SdtHeader>();

const _: () = assert!(HEADER_SIZE == 36);

/// The raw signature of a header. Formatting `Signature` panics on bytes
/// that aren't UTF-8.
#[must_use]
pub fn signature_bytes(header: &SdtHeader) -> [u8; 4] {
    // SAFETY: the signature is the first field of the packed header.
    unsafe { ptr::read_unaligned((header as *const SdtHeader).cast::<[u8; 4]>()) }
}

/// A description table mapped over the full length its header claims.
pub struct SdtMapping<H: AcpiHandler> {
    mapping: PhysicalMapping<H, SdtHeader>,
    length: usize,
}

impl<H: AcpiHandler> SdtMapping<H> {
    /// Reads the header first to learn the length, then maps the whole table.
    ///
    /// # Safety
    /// `address` must point to a description table provided by the firmware.
    pub unsafe fn map(handler: &H, address: usize) -> Self {
        let length = {
            let header = handler.map_physical_region::<SdtHeader>(address, HEADER_SIZE);
            header.length as usize
        };

        trace!("[acpi] Table at 0x{address:x} is 0x{length:x} bytes");

        Self {
            mapping: handler.map_physical_region(address, length.max(HEADER_SIZE)),
            length,
        }
    }

    #[must_use]
    pub fn header(&self) -> &SdtHeader {
        &self.mapping
    }

    #[must_use]
    pub fn signature(&self) -> [u8; 4] {
        signature_bytes(&self.mapping)
    }

    #[must_use]
    pub fn physical_start(&self) -> usize {
        self.mapping.physical_start()
    }

    /// The bytes covered by the table's `length` field.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        let start = self.mapping.virtual_start().as_ptr() as *const u8;

        // SAFETY: the mapping spans at least `length` bytes.
        unsafe { slice::from_raw_parts(start, self.length) }
    }

    /// The bytes following the header (and `skip` further reserved bytes).
    #[must_use]
    pub fn body(&self, skip: usize) -> &[u8] {
        self.bytes().get(HEADER_SIZE + skip..).unwrap_or_default()
    }

    /// A table too short to hold its own header is invalid as well.
    pub fn validate(&self, table: &'static str) -> Result<(), DeviceError> {
        if self.length < HEADER_SIZE || checksum(self.bytes()) != 0 {
            return Err(DeviceError::checksum_invalid(table));
        }

        Ok(())
    }
}
