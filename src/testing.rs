// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! A fake physical address space for running the discovery code on the host.

use alloc::{boxed::Box, collections::BTreeMap, rc::Rc, vec, vec::Vec};
use core::cell::{Cell, RefCell};
use core::ptr::NonNull;

use acpi::{AcpiHandler, PhysicalMapping};

use crate::device::acpi::checksum;

const PAGE_SIZE: usize = 0x1000;

type Page = Box<[Cell<u64>]>;

fn page(fill: u8) -> Page {
    let word = u64::from_ne_bytes([fill; 8]);
    (0..PAGE_SIZE / 8).map(|_| Cell::new(word)).collect()
}

enum Backing {
    Dense(Box<[Cell<u64>]>),

    /// Untouched pages all alias one page of `fill` bytes.
    Sparse {
        fill: Page,
        pages: BTreeMap<usize, Page>,
    },
}

struct Region {
    base: usize,
    len: usize,
    backing: Backing,
}

impl Region {
    fn contains(&self, address: usize, size: usize) -> bool {
        address >= self.base && address + size <= self.base + self.len
    }

    fn pointer(&self, address: usize, size: usize) -> *mut u8 {
        let offset = address - self.base;
        match &self.backing {
            Backing::Dense(data) => {
                (data.as_ptr() as *mut u8).wrapping_add(offset)
            }

            Backing::Sparse { fill, pages } => {
                let index = offset / PAGE_SIZE;
                assert_eq!(index, (offset + size.max(1) - 1) / PAGE_SIZE,
                        "mapping {address:x}+{size:x} crosses a sparse page");

                let page = pages.get(&index).unwrap_or(fill);
                (page.as_ptr() as *mut u8).wrapping_add(offset % PAGE_SIZE)
            }
        }
    }

    fn pointer_mut(&mut self, address: usize) -> *mut u8 {
        if let Backing::Sparse { fill, pages } = &mut self.backing {
            let index = (address - self.base) / PAGE_SIZE;
            pages.entry(index).or_insert_with(|| fill.iter().map(|word| Cell::new(word.get())).collect());
        }

        self.pointer(address, 1)
    }
}

#[derive(Default)]
pub struct SimulatedMemory {
    regions: Rc<RefCell<Vec<Region>>>,
}

impl SimulatedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self) -> SimulatedHandler {
        SimulatedHandler {
            regions: Rc::clone(&self.regions),
        }
    }

    fn add(&mut self, base: usize, len: usize, backing: Backing) {
        let mut regions = self.regions.borrow_mut();
        assert!(regions.iter().all(|region| base + len <= region.base || region.base + region.len <= base),
                "region {base:x}+{len:x} overlaps another one");
        regions.push(Region { base, len, backing });
    }

    pub fn add_region(&mut self, base: usize, len: usize, fill: u8) {
        let word = u64::from_ne_bytes([fill; 8]);
        let data = (0..len.div_ceil(8)).map(|_| Cell::new(word)).collect();
        self.add(base, len, Backing::Dense(data));
    }

    pub fn add_table(&mut self, base: usize, bytes: &[u8]) {
        self.add_region(base, bytes.len(), 0);
        self.write_bytes(base, bytes);
    }

    /// An ECAM window of `buses` buses in which every function reads back as
    /// absent until it is written.
    pub fn add_ecam(&mut self, base: u64, buses: usize) {
        self.add(base as usize, buses << 20, Backing::Sparse {
            fill: page(0xFF),
            pages: BTreeMap::new(),
        });
    }

    pub fn write_bytes(&mut self, address: usize, bytes: &[u8]) {
        let mut regions = self.regions.borrow_mut();
        let region = regions.iter_mut()
            .find(|region| region.contains(address, bytes.len()))
            .unwrap_or_else(|| panic!("write to unbacked memory at {address:x}"));

        for (index, byte) in bytes.iter().enumerate() {
            let pointer = region.pointer_mut(address + index);

            // SAFETY: the pointer lies inside a heap page owned by the region
            // and the memory is only ever accessed through `Cell`'s storage.
            unsafe { pointer.write_volatile(*byte) };
        }
    }

    pub fn write_u8(&mut self, address: usize, value: u8) {
        self.write_bytes(address, &[value]);
    }

    pub fn write_u16(&mut self, address: usize, value: u16) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_u32(&mut self, address: usize, value: u32) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    /// Writes the configuration header of a function. `bus` is relative to
    /// the start of the window and `header_type` is the decoded code.
    pub fn write_function(&mut self, ecam: u64, bus: u8, device: u8, function: u8, config: &FunctionConfig) {
        let base = ecam as usize + ((bus as usize) << 20 | (device as usize) << 15 | (function as usize) << 12);

        self.write_bytes(base, &[0; PAGE_SIZE]);
        self.write_u16(base, config.vendor_id);
        self.write_u16(base + 0x02, config.device_id);
        self.write_u16(base + 0x06, config.status);
        self.write_u8(base + 0x09, config.prog_if);
        self.write_u8(base + 0x0A, config.subclass);
        self.write_u8(base + 0x0B, config.class);
        self.write_u8(base + 0x0E, config.header_type.reverse_bits());

        match config.header_type {
            0 => {
                for (index, bar) in config.bars.iter().enumerate() {
                    self.write_u32(base + 0x10 + index * 4, *bar);
                }
                self.write_u8(base + 0x34, config.capabilities_pointer);
            }

            1 => {
                self.write_u32(base + 0x10, config.bars[0]);
                self.write_u32(base + 0x14, config.bars[1]);
                self.write_u8(base + 0x18, bus);
                self.write_u8(base + 0x19, config.secondary_bus);
                self.write_u8(base + 0x1A, config.secondary_bus);
                self.write_u8(base + 0x34, config.capabilities_pointer);
            }

            2 => {
                self.write_u8(base + 0x14, config.capabilities_pointer);
                self.write_u8(base + 0x18, bus);
                self.write_u8(base + 0x19, config.secondary_bus);
                self.write_u8(base + 0x1A, config.secondary_bus);
            }

            _ => (),
        }
    }

    /// An AHCI register block with every channel idle.
    pub fn add_hba(&mut self, base: usize, ports_implemented: u32, capabilities: u32) {
        self.add_region(base, 0x1100, 0);
        self.write_u32(base, capabilities);
        self.write_u32(base + 0x0C, ports_implemented);
        self.write_u32(base + 0x10, 0x0001_0300);
    }

    pub fn set_port(&mut self, base: usize, index: usize, sata_status: u32, signature: u32) {
        let port = base + 0x100 + index * 0x80;
        self.write_u32(port + 0x24, signature);
        self.write_u32(port + 0x28, sata_status);
    }
}

/// Translates physical addresses into the regions of a [`SimulatedMemory`].
#[derive(Clone)]
pub struct SimulatedHandler {
    regions: Rc<RefCell<Vec<Region>>>,
}

impl AcpiHandler for SimulatedHandler {
    unsafe fn map_physical_region<T>(&self, physical_address: usize, size: usize) -> PhysicalMapping<Self, T> {
        let regions = self.regions.borrow();
        let region = regions.iter()
            .find(|region| region.contains(physical_address, size))
            .unwrap_or_else(|| panic!("mapping unbacked memory at {physical_address:x}+{size:x}"));

        let pointer = region.pointer(physical_address, size).cast::<T>();
        let virtual_start = NonNull::new(pointer).expect("regions are heap allocated");

        PhysicalMapping::new(physical_address, virtual_start, size, size, self.clone())
    }

    fn unmap_physical_region<T>(_region: &PhysicalMapping<Self, T>) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FunctionConfig {
    pub vendor_id: u16,
    pub device_id: u16,
    pub status: u16,
    pub class: u8,
    pub subclass: u8,
    pub prog_if: u8,
    pub header_type: u8,
    pub secondary_bus: u8,
    pub bars: [u32; 6],
    pub capabilities_pointer: u8,
}

fn fix_checksum(bytes: &mut [u8], at: usize, covered: usize) {
    bytes[at] = 0;
    bytes[at] = 0u8.wrapping_sub(checksum(&bytes[..covered]));
}

pub fn build_rsdp(revision: u8, xsdt: u64) -> Vec<u8> {
    let mut bytes = vec![0u8; 36];
    bytes[0..8].copy_from_slice(b"RSD PTR ");
    bytes[9..15].copy_from_slice(b"BOCHS ");
    bytes[15] = revision;
    bytes[20..24].copy_from_slice(&36u32.to_le_bytes());
    bytes[24..32].copy_from_slice(&xsdt.to_le_bytes());

    fix_checksum(&mut bytes, 8, 20);
    fix_checksum(&mut bytes, 32, 36);
    bytes
}

pub fn build_sdt(signature: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let length = 36 + body.len();

    let mut bytes = vec![0u8; 36];
    bytes[0..4].copy_from_slice(signature);
    bytes[4..8].copy_from_slice(&(length as u32).to_le_bytes());
    bytes[8] = 1;
    bytes[10..16].copy_from_slice(b"BOCHS ");
    bytes[16..24].copy_from_slice(b"BXPC    ");
    bytes[24..28].copy_from_slice(&1u32.to_le_bytes());
    bytes[28..32].copy_from_slice(b"BXPC");
    bytes[32..36].copy_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(body);

    fix_checksum(&mut bytes, 9, length);
    bytes
}

pub fn build_xsdt(entries: &[u64]) -> Vec<u8> {
    let body = entries.iter().flat_map(|entry| entry.to_le_bytes()).collect::<Vec<_>>();
    build_sdt(b"XSDT", &body)
}

/// Descriptors are `(base, segment group, start bus, end bus)`.
pub fn build_mcfg(descriptors: &[(u64, u16, u8, u8)]) -> Vec<u8> {
    let mut body = vec![0u8; 8];
    for &(base, segment, start, end) in descriptors {
        body.extend_from_slice(&base.to_le_bytes());
        body.extend_from_slice(&segment.to_le_bytes());
        body.push(start);
        body.push(end);
        body.extend_from_slice(&[0; 4]);
    }
    build_sdt(b"MCFG", &body)
}
