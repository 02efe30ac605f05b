// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use alloc::vec::Vec;
use acpi::AcpiHandler;
use log::{debug, info, trace, warn};

use crate::device::{
    acpi::{BusConfigTable, RootComplexDescriptor},
    DiscoveryOptions,
};
use super::{
    capabilities,
    find_capability,
    ConfigurationHeader,
    EnhancedConfigurationSpace,
    PciAddress,
    PciHeaderType,
    PCI_CAP_MSI,
};

const DEVICES_PER_BUS: u8 = 32;
const FUNCTIONS_PER_DEVICE: u8 = 8;

/// A function that answered during enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PciDevice {
    pub address: PciAddress,
    pub header: ConfigurationHeader,
}

/// The functions found during enumeration, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceList {
    devices: Vec<PciDevice>,
}

impl DeviceList {
    #[must_use]
    pub const fn new() -> Self {
        Self { devices: Vec::new() }
    }

    pub fn push(&mut self, device: PciDevice) {
        self.devices.push(device);
    }

    pub fn append(&mut self, other: &mut DeviceList) {
        self.devices.append(&mut other.devices);
    }

    pub fn iter(&self) -> core::slice::Iter<'_, PciDevice> {
        self.devices.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PciDevice] {
        &self.devices
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a PciDevice;
    type IntoIter = core::slice::Iter<'a, PciDevice>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// State of one recursive walk over the buses of a root complex.
struct BusWalk<'a, H: AcpiHandler> {
    mechanism: EnhancedConfigurationSpace<'a, H>,
    devices: DeviceList,
    visited: [u64; 4],
    options: DiscoveryOptions,
}

impl<'a, H: AcpiHandler> BusWalk<'a, H> {
    fn new(handler: &'a H, descriptor: RootComplexDescriptor, options: DiscoveryOptions) -> Self {
        Self {
            mechanism: EnhancedConfigurationSpace::new(handler, descriptor),
            devices: DeviceList::new(),
            visited: [0; 4],
            options,
        }
    }

    /// Marks the bus as visited. Returns false if it was seen before or
    /// lies outside the window of the root complex.
    fn enter_bus(&mut self, bus: u8) -> bool {
        if !self.mechanism.descriptor().decodes_bus(bus) {
            let descriptor = self.mechanism.descriptor();
            warn!("[pci] Skipping bus {bus}: outside of window {}..={}",
                    descriptor.start_bus(), descriptor.end_bus());
            return false;
        }

        let (word, bit) = (usize::from(bus / 64), bus % 64);
        if self.visited[word] & (1u64 << bit) != 0 {
            warn!("[pci] Skipping bus {bus}: already walked");
            return false;
        }

        self.visited[word] |= 1u64 << bit;
        true
    }

    fn read(&self, bus: u8, device: u8, function: u8) -> Option<(PciAddress, ConfigurationHeader)> {
        let addr = self.mechanism.address(bus, device, function);
        ConfigurationHeader::read(&self.mechanism, addr).map(|header| (addr, header))
    }

    fn record(&mut self, address: PciAddress, header: ConfigurationHeader) {
        if self.options.verbose {
            header.dump(address);

            for capability in capabilities(&self.mechanism, address, &header) {
                debug!("[pci]   capability {:02x} {} at {:02x}",
                        capability.id, capability.name().unwrap_or_default(), capability.offset);
            }
        }

        self.devices.push(PciDevice { address, header });
    }

    /// The bus a CardBus function fans out to, counted from the start of the
    /// window.
    fn function_bus(&self, function: u8) -> Option<u8> {
        let bus = self.mechanism.descriptor().start_bus().checked_add(function);
        if bus.is_none() {
            warn!("[pci] Skipping function {function}: bus number overflows");
        }
        bus
    }

    fn probe_device(&mut self, bus: u8, device: u8) {
        let Some((address, header)) = self.read(bus, device, 0) else {
            return;
        };

        self.record(address, header);

        if header.is_pci_to_pci_bridge() && header.header_type == PciHeaderType::Bridge {
            if let Some(bridge) = header.bridge() {
                let secondary = bridge.secondary_bus_number;
                trace!("[pci] Bridge {address} forwards to bus {secondary}");
                self.probe_bus(secondary);
            }
        }

        if header.header_type == PciHeaderType::CardBus {
            for function in 1..FUNCTIONS_PER_DEVICE {
                if self.read(bus, device, function).is_none() {
                    break;
                }

                if let Some(bus) = self.function_bus(function) {
                    self.probe_bus(bus);
                }
            }
        }
    }

    fn probe_bus(&mut self, bus: u8) {
        if !self.enter_bus(bus) {
            return;
        }

        trace!("[pci] Walking bus {bus}");
        for device in 0..DEVICES_PER_BUS {
            self.probe_device(bus, device);
        }
    }

    fn probe_all_buses(&mut self) {
        let root_bus = self.mechanism.descriptor().start_bus();

        let root_is_cardbus = matches!(
            self.read(root_bus, 0, 0),
            Some((_, header)) if header.header_type == PciHeaderType::CardBus
        );

        if !root_is_cardbus {
            self.probe_bus(root_bus);
            return;
        }

        for function in 0..FUNCTIONS_PER_DEVICE {
            if self.read(root_bus, 0, function).is_none() {
                break;
            }

            if let Some(bus) = self.function_bus(function) {
                self.probe_bus(bus);
            }
        }
    }
}

/// Recursively enumerates every function reachable from the root complex.
pub fn enumerate<H: AcpiHandler>(handler: &H, descriptor: RootComplexDescriptor, options: DiscoveryOptions) -> DeviceList {
    trace!("[pci] Enumerating segment {} buses {}..={} at {:x}",
            descriptor.segment_group(), descriptor.start_bus(), descriptor.end_bus(),
            descriptor.base_address().as_u64());

    let mut walk = BusWalk::new(handler, descriptor, options);
    walk.probe_all_buses();

    for device in &walk.devices {
        if find_capability(&walk.mechanism, device.address, &device.header, PCI_CAP_MSI).is_some() {
            trace!("[pci] {} supports MSI", device.address);
        }
    }

    info!("[pci] Found {} function(s) on segment {}", walk.devices.len(), descriptor.segment_group());
    walk.devices
}

/// Enumerates every root complex of the table, concatenating the lists in
/// table order.
pub fn enumerate_all<H: AcpiHandler>(handler: &H, mcfg: &BusConfigTable<H>, options: DiscoveryOptions) -> DeviceList {
    let mut devices = DeviceList::new();
    for descriptor in mcfg.entries() {
        devices.append(&mut enumerate(handler, descriptor, options));
    }
    devices
}
