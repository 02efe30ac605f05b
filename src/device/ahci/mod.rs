// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod channel;
mod registers;

use core::mem::size_of;
use acpi::{AcpiHandler, PhysicalMapping};
use log::{info, trace};

use crate::device::{
    pci::{DeviceList, PciBaseAddressType, PciClassCode, PciDevice, PciHeaderType, PciSubclass},
    DeviceError,
};

pub use self::{
    channel::{ChannelStatus, Channels, DeviceClass, LinkState, PowerState, SelectedChannel},
    registers::{ChannelRegisters, HostControllerRegisters, CHANNEL_COUNT},
};

/// Index of the BAR holding the AHCI base address (ABAR).
const ABAR_INDEX: usize = 5;

#[must_use]
pub fn is_host_controller(device: &PciDevice) -> bool {
    device.header.header_type == PciHeaderType::Endpoint
        && device.header.class_code == PciClassCode::MASS_STORAGE_CONTROLLER
        && device.header.subclass == PciSubclass::SERIAL_ATA
}

/// The first SATA controller in the list.
pub fn find_controller(devices: &DeviceList) -> Result<&PciDevice, DeviceError> {
    devices.iter()
        .find(|device| is_host_controller(device))
        .ok_or(DeviceError::not_found("AHCI controller"))
}

pub struct HostController<H: AcpiHandler> {
    registers: PhysicalMapping<H, HostControllerRegisters>,
}

impl<H: AcpiHandler> HostController<H> {
    /// Maps the register block the controller's ABAR points at.
    pub fn map(handler: &H, device: &PciDevice) -> Result<Self, DeviceError> {
        let bar = device.header.endpoint()
            .map(|endpoint| endpoint.base_addresses[ABAR_INDEX])
            .ok_or(DeviceError::not_found("AHCI base address"))?;

        if bar.kind() != PciBaseAddressType::MemorySpace || bar.actual_address() == 0 {
            return Err(DeviceError::not_found("AHCI base address"));
        }

        let address = bar.actual_address() as usize;
        trace!("[ahci] Controller {} has its registers at 0x{address:x}", device.address);

        // SAFETY: the BAR of a memory-space function points at its MMIO
        // registers.
        let registers = unsafe {
            handler.map_physical_region::<HostControllerRegisters>(address, size_of::<HostControllerRegisters>())
        };

        Ok(Self { registers })
    }

    #[must_use]
    pub fn registers(&self) -> &HostControllerRegisters {
        &self.registers
    }

    #[must_use]
    pub fn ports_supported(&self) -> u32 {
        (self.registers.capabilities.read() & 0x1F) + 1
    }

    #[must_use]
    pub fn ports_implemented(&self) -> u32 {
        self.registers.ports_implemented.read()
    }

    #[must_use]
    pub fn version(&self) -> (u16, u16) {
        let version = self.registers.version.read();
        ((version >> 16) as u16, version as u16)
    }

    pub fn enumerate_channels(&self) -> Channels<'_> {
        Channels::new(&self.registers)
    }

    /// The lowest-numbered implemented channel with a link and an active
    /// interface.
    pub fn select_channel(&self) -> Result<SelectedChannel<'_>, DeviceError> {
        let channels = self.enumerate_channels();

        let status = channels.clone()
            .find(ChannelStatus::is_usable)
            .ok_or(DeviceError::no_active_channel())?;

        Ok(SelectedChannel::new(status, channels.registers(status.index)))
    }

    pub fn log_summary(&self, verbose: bool) {
        let (major, minor) = self.version();
        info!("[ahci] Controller version {major:x}.{minor:02x}, {} port(s) supported, implemented {:#010b}",
                self.ports_supported(), self.ports_implemented());

        if verbose {
            for channel in self.enumerate_channels() {
                info!("[ahci]   port {}: {}, power {}", channel.index, channel.link, channel.power);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::acpi::RootComplexDescriptor;
    use crate::device::pci::enumerate;
    use crate::device::{DeviceErrorKind, DiscoveryOptions};
    use crate::testing::{FunctionConfig, SimulatedHandler, SimulatedMemory};

    const ECAM: u64 = 0xE000_0000;
    const ABAR: u32 = 0xFEBF_1000;

    const LINKED_ACTIVE: u32 = 0x113;
    const LINKED_SLUMBER: u32 = 0x613;
    const NO_LINK: u32 = 0x001;

    fn controller(abar: u32) -> FunctionConfig {
        FunctionConfig {
            vendor_id: 0x8086,
            device_id: 0x2922,
            class: 0x01,
            subclass: 0x06,
            prog_if: 0x01,
            header_type: 0,
            bars: [0, 0, 0, 0, 0xC041, abar],
            ..FunctionConfig::default()
        }
    }

    fn platform(ports_implemented: u32, ports: &[(usize, u32, u32)]) -> SimulatedMemory {
        let mut memory = SimulatedMemory::new();
        memory.add_ecam(ECAM, 1);
        memory.write_function(ECAM, 0, 0, 0, &FunctionConfig {
            vendor_id: 0x8086,
            device_id: 0x29C0,
            class: 0x06,
            subclass: 0x00,
            ..FunctionConfig::default()
        });
        memory.write_function(ECAM, 0, 0x1F, 0, &controller(ABAR | 0x8));

        memory.add_hba(ABAR as usize, ports_implemented, 0x4034_FF05);
        for &(index, status, signature) in ports {
            memory.set_port(ABAR as usize, index, status, signature);
        }
        memory
    }

    fn map(memory: &SimulatedMemory) -> HostController<SimulatedHandler> {
        let handler = memory.handler();
        let devices = enumerate(&handler, RootComplexDescriptor::new(ECAM, 0, 0, 0), DiscoveryOptions::default());
        let device = find_controller(&devices).unwrap();
        HostController::map(&handler, device).unwrap()
    }

    #[test]
    fn finds_first_sata_controller() {
        let memory = platform(0, &[]);
        let handler = memory.handler();
        let devices = enumerate(&handler, RootComplexDescriptor::new(ECAM, 0, 0, 0), DiscoveryOptions::default());

        let device = find_controller(&devices).unwrap();
        assert_eq!(device.address.device, 0x1F);
    }

    #[test]
    fn missing_controller_is_not_found() {
        let devices = DeviceList::new();
        let error = find_controller(&devices).unwrap_err();
        assert!(matches!(error.kind(), DeviceErrorKind::NotFound(_)));
    }

    #[test]
    fn reports_port_count_from_capabilities() {
        let memory = platform(0b1, &[]);
        let hba = map(&memory);

        assert_eq!(hba.ports_supported(), 6);
        assert_eq!(hba.ports_implemented(), 0b1);
    }

    #[test]
    fn lists_implemented_channels_in_order() {
        let memory = platform(0b1000_0101, &[
            (0, NO_LINK, 0),
            (1, LINKED_ACTIVE, 0),
            (7, LINKED_SLUMBER, 0),
        ]);
        let hba = map(&memory);

        let channels = hba.enumerate_channels();
        let indices = channels.clone().map(|channel| channel.index).collect::<Vec<_>>();
        assert_eq!(indices, [0, 2, 7]);

        let statuses = channels.collect::<Vec<_>>();
        assert_eq!(statuses[0].link, LinkState::PresentNoLink);
        assert_eq!(statuses[1].link, LinkState::NotPresent);
        assert_eq!(statuses[2].power, PowerState::Slumber);
    }

    #[test]
    fn selects_the_only_usable_channel() {
        let memory = platform(0xFFFF_FFFF, &[
            (0, NO_LINK, 0),
            (30, LINKED_ACTIVE, DeviceClass::SIGNATURE_ATAPI),
        ]);
        let hba = map(&memory);

        let channel = hba.select_channel().unwrap();
        assert_eq!(channel.index(), 30);
        assert_eq!(channel.classify(), DeviceClass::Atapi);
    }

    #[test]
    fn selects_lowest_of_two_usable_channels() {
        let memory = platform(0b1100, &[
            (2, LINKED_ACTIVE, DeviceClass::SIGNATURE_PORT_MULTIPLIER),
            (3, LINKED_ACTIVE, DeviceClass::SIGNATURE_ATA),
        ]);
        let hba = map(&memory);

        let channel = hba.select_channel().unwrap();
        assert_eq!(channel.index(), 2);
        assert_eq!(channel.classify(), DeviceClass::PortMultiplier);
    }

    #[test]
    fn unimplemented_channels_are_never_selected() {
        let memory = platform(0b01, &[
            (0, LINKED_SLUMBER, 0),
            (1, LINKED_ACTIVE, 0),
        ]);
        let hba = map(&memory);

        let error = hba.select_channel().err().unwrap();
        assert!(matches!(error.kind(), DeviceErrorKind::NoActiveChannel));
    }

    #[test]
    fn io_abar_is_refused() {
        let mut memory = SimulatedMemory::new();
        memory.add_ecam(ECAM, 1);
        memory.write_function(ECAM, 0, 2, 0, &controller(0xC001));

        let handler = memory.handler();
        let devices = enumerate(&handler, RootComplexDescriptor::new(ECAM, 0, 0, 0), DiscoveryOptions::default());
        let device = find_controller(&devices).unwrap();

        assert!(HostController::map(&handler, device).is_err());
    }
}
