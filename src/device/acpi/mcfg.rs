// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use core::mem::size_of;
use core::ptr;
use acpi::{mcfg::McfgEntry, sdt::{SdtHeader, Signature}, AcpiHandler};
use x86_64::PhysAddr;

use crate::device::DeviceError;
use super::sdt::SdtMapping;

/// One ECAM window: where the configuration space of a range of buses of a
/// PCI segment group lives.
#[derive(Clone, Copy, Debug)]
pub struct RootComplexDescriptor {
    entry: McfgEntry,
}

const _: () = assert!(size_of::<McfgEntry>() == RootComplexDescriptor::SIZE);

impl RootComplexDescriptor {
    pub const SIZE: usize = 16;

    #[must_use]
    pub fn new(base_address: u64, segment_group: u16, start_bus: u8, end_bus: u8) -> Self {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..8].copy_from_slice(&base_address.to_le_bytes());
        bytes[8..10].copy_from_slice(&segment_group.to_le_bytes());
        bytes[10] = start_bus;
        bytes[11] = end_bus;
        Self::read(&bytes)
    }

    /// Decodes one descriptor from exactly `SIZE` bytes.
    fn read(bytes: &[u8]) -> Self {
        debug_assert_eq!(bytes.len(), Self::SIZE);

        // SAFETY: `McfgEntry` is a packed struct of integers, so any 16 bytes
        // are a valid value.
        let entry = unsafe { ptr::read_unaligned(bytes.as_ptr().cast::<McfgEntry>()) };
        Self { entry }
    }

    #[must_use]
    pub fn entry(&self) -> &McfgEntry {
        &self.entry
    }

    #[must_use]
    pub fn base_address(&self) -> PhysAddr {
        PhysAddr::new_truncate(self.entry.base_address)
    }

    #[must_use]
    pub fn segment_group(&self) -> u16 {
        self.entry.pci_segment_group
    }

    #[must_use]
    pub fn start_bus(&self) -> u8 {
        self.entry.bus_number_start
    }

    #[must_use]
    pub fn end_bus(&self) -> u8 {
        self.entry.bus_number_end
    }

    #[must_use]
    pub fn decodes_bus(&self, bus: u8) -> bool {
        (self.start_bus()..=self.end_bus()).contains(&bus)
    }
}

/// PCI Express memory-mapped configuration table.
pub struct BusConfigTable<H: AcpiHandler> {
    table: SdtMapping<H>,
}

impl<H: AcpiHandler> BusConfigTable<H> {
    pub const SIGNATURE: Signature = Signature::MCFG;

    /// Reserved bytes between the header and the first descriptor.
    const RESERVED_SIZE: usize = 8;

    /// # Safety
    /// `address` must point to the firmware's MCFG.
    pub(crate) unsafe fn map(handler: &H, address: usize) -> Self {
        Self {
            table: SdtMapping::map(handler, address),
        }
    }

    pub fn validate(&self) -> Result<(), DeviceError> {
        self.table.validate("MCFG")
    }

    #[must_use]
    pub fn header(&self) -> &SdtHeader {
        self.table.header()
    }

    #[must_use]
    pub fn physical_start(&self) -> usize {
        self.table.physical_start()
    }

    /// `(length - 44) / 16` descriptors; a short table has none.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = RootComplexDescriptor> + '_ {
        self.table.body(Self::RESERVED_SIZE)
            .chunks_exact(RootComplexDescriptor::SIZE)
            .map(RootComplexDescriptor::read)
    }
}
