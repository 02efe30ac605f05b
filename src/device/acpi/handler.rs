// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use core::ptr::NonNull;
use acpi::{AcpiHandler, PhysicalMapping};
use log::trace;

static LOG_ENABLED: bool = false;

/// Maps physical regions while UEFI boot services are still active.
///
/// The firmware identity-maps all of memory during the boot services phase,
/// so a physical address is directly usable as a pointer and nothing has to
/// be torn down afterwards.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityMappedHandler;

impl AcpiHandler for IdentityMappedHandler {
    unsafe fn map_physical_region<T>(&self, physical_address: usize, size: usize) -> PhysicalMapping<Self, T> {
        if LOG_ENABLED {
            trace!("[acpi] Mapping {physical_address:x} size {size:x}");
        }

        let virtual_start = NonNull::new(physical_address as *mut T)
            .expect("attempted to map the null physical address");

        PhysicalMapping::new(physical_address, virtual_start, size, size, *self)
    }

    fn unmap_physical_region<T>(region: &PhysicalMapping<Self, T>) {
        if LOG_ENABLED {
            trace!("[acpi] Unmapping {:x} size {:x}", region.physical_start(), region.region_length());
        }
    }
}

/// Performs a single volatile read of a `T` at the given physical address.
///
/// # Safety
/// The address must point to readable memory (or MMIO) of at least
/// `size_of::<T>()` bytes and be suitably aligned for `T`.
pub(crate) unsafe fn read_physical<H, T>(handler: &H, address: usize) -> T
        where H: AcpiHandler, T: Copy {
    let mapping = handler.map_physical_region::<T>(address, core::mem::size_of::<T>());
    mapping.virtual_start().as_ptr().read_volatile()
}
