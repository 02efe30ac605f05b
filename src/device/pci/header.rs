// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use log::debug;

use super::{
    ConfigurationSpaceMechanism,
    PciAddress,
    PciBaseAddress,
    PciClassCode,
    PciDeviceId,
    PciSubclass,
    PciVendorId,
};

/// The decoded header type.
///
/// The raw register has its bit order reversed before it is compared to the
/// layout codes, everywhere it is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PciHeaderType {
    Endpoint,
    Bridge,
    CardBus,
    Unknown(u8),
}

impl PciHeaderType {
    #[must_use]
    pub const fn decode(raw: u8) -> Self {
        Self::new(raw.reverse_bits())
    }

    #[must_use]
    pub const fn new(code: u8) -> Self {
        match code {
            0x0 => Self::Endpoint,
            0x1 => Self::Bridge,
            0x2 => Self::CardBus,
            _ => Self::Unknown(code),
        }
    }

    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Endpoint => 0x0,
            Self::Bridge => 0x1,
            Self::CardBus => 0x2,
            Self::Unknown(code) => *code,
        }
    }
}

/// The 16 bytes every configuration header starts with, plus the layout
/// selected by the header type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigurationHeader {
    pub vendor_id: PciVendorId,
    pub device_id: PciDeviceId,
    pub command: u16,
    pub status: u16,
    pub revision_id: u8,
    pub prog_if: u8,
    pub subclass: PciSubclass,
    pub class_code: PciClassCode,
    pub cache_line_size: u8,
    pub latency_timer: u8,
    pub header_type: PciHeaderType,
    pub bist: u8,
    pub layout: HeaderLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderLayout {
    Endpoint(EndpointHeader),
    Bridge(BridgeHeader),
    CardBus(CardBusHeader),
    Unknown(u8),
}

/// Type 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndpointHeader {
    pub base_addresses: [PciBaseAddress; 6],
    pub cardbus_cis_pointer: u32,
    pub subsystem_vendor_id: u16,
    pub subsystem_id: u16,
    pub expansion_rom_base_address: u32,
    pub capabilities_pointer: u8,
    pub interrupt_line: u8,
    pub interrupt_pin: u8,
    pub min_grant: u8,
    pub max_latency: u8,
}

/// Type 1, PCI-to-PCI bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BridgeHeader {
    pub base_addresses: [PciBaseAddress; 2],
    pub primary_bus_number: u8,
    pub secondary_bus_number: u8,
    pub subordinate_bus_number: u8,
    pub secondary_latency_timer: u8,
    pub io_base: u8,
    pub io_limit: u8,
    pub secondary_status: u16,
    pub memory_base: u16,
    pub memory_limit: u16,
    pub prefetchable_memory_base: u16,
    pub prefetchable_memory_limit: u16,
    pub prefetchable_base_upper_32: u32,
    pub prefetchable_limit_upper_32: u32,
    pub io_base_upper_16: u16,
    pub io_limit_upper_16: u16,
    pub capabilities_pointer: u8,
    pub expansion_rom_base_address: u32,
    pub interrupt_line: u8,
    pub interrupt_pin: u8,
    pub bridge_control: u16,
}

/// Type 2, CardBus bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardBusHeader {
    pub cardbus_socket: u32,
    pub capabilities_offset: u8,
    pub secondary_status: u16,
    pub pci_bus_number: u8,
    pub cardbus_bus_number: u8,
    pub subordinate_bus_number: u8,
    pub cardbus_latency_timer: u8,
    pub memory_base_address_0: u32,
    pub memory_limit_0: u32,
    pub memory_base_address_1: u32,
    pub memory_limit_1: u32,
    pub io_base_address_0: u32,
    pub io_limit_0: u32,
    pub io_base_address_1: u32,
    pub io_limit_1: u32,
    pub interrupt_line: u8,
    pub interrupt_pin: u8,
    pub bridge_control: u16,
    pub subsystem_device_id: u16,
    pub subsystem_vendor_id: u16,
    pub legacy_mode_base_address: u32,
}

impl ConfigurationHeader {
    /// Reads the header of the function, or `None` if nothing answers.
    pub fn read(mechanism: &impl ConfigurationSpaceMechanism, addr: PciAddress) -> Option<Self> {
        let vendor_id = mechanism.vendor_id(addr);
        if vendor_id == PciVendorId::INVALID {
            return None;
        }

        let header_type = mechanism.header_type(addr);
        let layout = match header_type {
            PciHeaderType::Endpoint => HeaderLayout::Endpoint(EndpointHeader::read(mechanism, addr)),
            PciHeaderType::Bridge => HeaderLayout::Bridge(BridgeHeader::read(mechanism, addr)),
            PciHeaderType::CardBus => HeaderLayout::CardBus(CardBusHeader::read(mechanism, addr)),
            PciHeaderType::Unknown(code) => HeaderLayout::Unknown(code),
        };

        Some(Self {
            vendor_id,
            device_id: mechanism.device_id(addr),
            command: mechanism.command(addr),
            status: mechanism.status(addr),
            revision_id: mechanism.revision_id(addr),
            prog_if: mechanism.prog_if(addr),
            subclass: mechanism.subclass(addr),
            class_code: mechanism.class_code(addr),
            cache_line_size: mechanism.read_byte(addr, super::regs::CACHE_LINE_SIZE),
            latency_timer: mechanism.read_byte(addr, super::regs::LATENCY_TIMER),
            header_type,
            bist: mechanism.read_byte(addr, super::regs::BIST),
            layout,
        })
    }

    #[must_use]
    pub fn is_pci_to_pci_bridge(&self) -> bool {
        self.class_code == PciClassCode::BRIDGE
            && self.subclass == PciSubclass::PCI_TO_PCI_BRIDGE
    }

    #[must_use]
    pub fn endpoint(&self) -> Option<&EndpointHeader> {
        match &self.layout {
            HeaderLayout::Endpoint(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    #[must_use]
    pub fn bridge(&self) -> Option<&BridgeHeader> {
        match &self.layout {
            HeaderLayout::Bridge(bridge) => Some(bridge),
            _ => None,
        }
    }

    #[must_use]
    pub fn cardbus(&self) -> Option<&CardBusHeader> {
        match &self.layout {
            HeaderLayout::CardBus(cardbus) => Some(cardbus),
            _ => None,
        }
    }

    /// Config-space offset of the first capability, if the layout has one.
    #[must_use]
    pub fn capabilities_pointer(&self) -> Option<u8> {
        match &self.layout {
            HeaderLayout::Endpoint(endpoint) => Some(endpoint.capabilities_pointer),
            HeaderLayout::Bridge(bridge) => Some(bridge.capabilities_pointer),
            HeaderLayout::CardBus(cardbus) => Some(cardbus.capabilities_offset),
            HeaderLayout::Unknown(..) => None,
        }
    }

    pub fn dump(&self, addr: PciAddress) {
        debug!("[pci] Device {addr}  vendor={:04x} {}  device={:04x} {}",
                self.vendor_id.value(),
                self.vendor_id.name().unwrap_or_default(),
                self.device_id.value(),
                self.device_id.name(self.vendor_id).unwrap_or_default());
        debug!("[pci]   class={:02x} {}  subclass={:02x} {}  prog-if={:02x}  revision={:02x}",
                self.class_code.value(),
                self.class_code.name().unwrap_or_default(),
                self.subclass.value(),
                self.subclass.name(self.class_code).unwrap_or_default(),
                self.prog_if,
                self.revision_id);
        debug!("[pci]   status={:04x}  command={:04x}  header-type={:?}  bist={:02x}  latency={:02x}  cache-line={:02x}",
                self.status, self.command, self.header_type, self.bist, self.latency_timer, self.cache_line_size);

        match &self.layout {
            HeaderLayout::Endpoint(endpoint) => {
                for (index, bar) in endpoint.base_addresses.iter().enumerate() {
                    debug!("[pci]   BAR{index}: {:08x}", bar.value());
                }
                debug!("[pci]   subsystem={:04x}:{:04x}  rom={:08x}  cis={:08x}",
                        endpoint.subsystem_vendor_id, endpoint.subsystem_id,
                        endpoint.expansion_rom_base_address, endpoint.cardbus_cis_pointer);
                debug!("[pci]   interrupt line={} pin={}  min-grant={}  max-latency={}",
                        endpoint.interrupt_line, endpoint.interrupt_pin,
                        endpoint.min_grant, endpoint.max_latency);
            }

            HeaderLayout::Bridge(bridge) => {
                debug!("[pci]   BAR0: {:08x}  BAR1: {:08x}",
                        bridge.base_addresses[0].value(), bridge.base_addresses[1].value());
                debug!("[pci]   buses primary={} secondary={} subordinate={}  secondary-latency={}",
                        bridge.primary_bus_number, bridge.secondary_bus_number,
                        bridge.subordinate_bus_number, bridge.secondary_latency_timer);
                debug!("[pci]   I/O {:04x}{:02x}..{:04x}{:02x}  memory {:04x}..{:04x}  prefetchable {:08x}{:04x}..{:08x}{:04x}",
                        bridge.io_base_upper_16, bridge.io_base, bridge.io_limit_upper_16, bridge.io_limit,
                        bridge.memory_base, bridge.memory_limit,
                        bridge.prefetchable_base_upper_32, bridge.prefetchable_memory_base,
                        bridge.prefetchable_limit_upper_32, bridge.prefetchable_memory_limit);
                debug!("[pci]   secondary-status={:04x}  bridge-control={:04x}  rom={:08x}  interrupt line={} pin={}",
                        bridge.secondary_status, bridge.bridge_control, bridge.expansion_rom_base_address,
                        bridge.interrupt_line, bridge.interrupt_pin);
            }

            HeaderLayout::CardBus(cardbus) => {
                debug!("[pci]   socket={:08x}  buses pci={} cardbus={} subordinate={}  latency={}",
                        cardbus.cardbus_socket, cardbus.pci_bus_number, cardbus.cardbus_bus_number,
                        cardbus.subordinate_bus_number, cardbus.cardbus_latency_timer);
                debug!("[pci]   memory {:08x}..{:08x} {:08x}..{:08x}  I/O {:08x}..{:08x} {:08x}..{:08x}",
                        cardbus.memory_base_address_0, cardbus.memory_limit_0,
                        cardbus.memory_base_address_1, cardbus.memory_limit_1,
                        cardbus.io_base_address_0, cardbus.io_limit_0,
                        cardbus.io_base_address_1, cardbus.io_limit_1);
                debug!("[pci]   subsystem={:04x}:{:04x}  legacy={:08x}  bridge-control={:04x}  interrupt line={} pin={}",
                        cardbus.subsystem_vendor_id, cardbus.subsystem_device_id,
                        cardbus.legacy_mode_base_address, cardbus.bridge_control,
                        cardbus.interrupt_line, cardbus.interrupt_pin);
            }

            HeaderLayout::Unknown(code) => {
                debug!("[pci]   unknown header layout {code}");
            }
        }
    }
}

impl EndpointHeader {
    fn read(mechanism: &impl ConfigurationSpaceMechanism, addr: PciAddress) -> Self {
        let mut base_addresses = [PciBaseAddress::new(0); 6];
        for (index, bar) in base_addresses.iter_mut().enumerate() {
            *bar = mechanism.base_address(addr, index as u8);
        }

        Self {
            base_addresses,
            cardbus_cis_pointer: mechanism.read_dword(addr, 0x28),
            subsystem_vendor_id: mechanism.read_word(addr, 0x2C),
            subsystem_id: mechanism.read_word(addr, 0x2E),
            expansion_rom_base_address: mechanism.read_dword(addr, 0x30),
            capabilities_pointer: mechanism.read_byte(addr, 0x34),
            interrupt_line: mechanism.read_byte(addr, 0x3C),
            interrupt_pin: mechanism.read_byte(addr, 0x3D),
            min_grant: mechanism.read_byte(addr, 0x3E),
            max_latency: mechanism.read_byte(addr, 0x3F),
        }
    }
}

impl BridgeHeader {
    fn read(mechanism: &impl ConfigurationSpaceMechanism, addr: PciAddress) -> Self {
        Self {
            base_addresses: [mechanism.base_address(addr, 0), mechanism.base_address(addr, 1)],
            primary_bus_number: mechanism.read_byte(addr, 0x18),
            secondary_bus_number: mechanism.read_byte(addr, 0x19),
            subordinate_bus_number: mechanism.read_byte(addr, 0x1A),
            secondary_latency_timer: mechanism.read_byte(addr, 0x1B),
            io_base: mechanism.read_byte(addr, 0x1C),
            io_limit: mechanism.read_byte(addr, 0x1D),
            secondary_status: mechanism.read_word(addr, 0x1E),
            memory_base: mechanism.read_word(addr, 0x20),
            memory_limit: mechanism.read_word(addr, 0x22),
            prefetchable_memory_base: mechanism.read_word(addr, 0x24),
            prefetchable_memory_limit: mechanism.read_word(addr, 0x26),
            prefetchable_base_upper_32: mechanism.read_dword(addr, 0x28),
            prefetchable_limit_upper_32: mechanism.read_dword(addr, 0x2C),
            io_base_upper_16: mechanism.read_word(addr, 0x30),
            io_limit_upper_16: mechanism.read_word(addr, 0x32),
            capabilities_pointer: mechanism.read_byte(addr, 0x34),
            expansion_rom_base_address: mechanism.read_dword(addr, 0x38),
            interrupt_line: mechanism.read_byte(addr, 0x3C),
            interrupt_pin: mechanism.read_byte(addr, 0x3D),
            bridge_control: mechanism.read_word(addr, 0x3E),
        }
    }
}

impl CardBusHeader {
    fn read(mechanism: &impl ConfigurationSpaceMechanism, addr: PciAddress) -> Self {
        Self {
            cardbus_socket: mechanism.read_dword(addr, 0x10),
            capabilities_offset: mechanism.read_byte(addr, 0x14),
            secondary_status: mechanism.read_word(addr, 0x16),
            pci_bus_number: mechanism.read_byte(addr, 0x18),
            cardbus_bus_number: mechanism.read_byte(addr, 0x19),
            subordinate_bus_number: mechanism.read_byte(addr, 0x1A),
            cardbus_latency_timer: mechanism.read_byte(addr, 0x1B),
            memory_base_address_0: mechanism.read_dword(addr, 0x1C),
            memory_limit_0: mechanism.read_dword(addr, 0x20),
            memory_base_address_1: mechanism.read_dword(addr, 0x24),
            memory_limit_1: mechanism.read_dword(addr, 0x28),
            io_base_address_0: mechanism.read_dword(addr, 0x2C),
            io_limit_0: mechanism.read_dword(addr, 0x30),
            io_base_address_1: mechanism.read_dword(addr, 0x34),
            io_limit_1: mechanism.read_dword(addr, 0x38),
            interrupt_line: mechanism.read_byte(addr, 0x3C),
            interrupt_pin: mechanism.read_byte(addr, 0x3D),
            bridge_control: mechanism.read_word(addr, 0x3E),
            subsystem_device_id: mechanism.read_word(addr, 0x40),
            subsystem_vendor_id: mechanism.read_word(addr, 0x42),
            legacy_mode_base_address: mechanism.read_dword(addr, 0x44),
        }
    }
}
