// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use core::fmt::{Debug, Display, Formatter};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PciAddress {
    pub segment: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl PciAddress {
    #[must_use]
    pub const fn new(segment: u16, bus: u8, device: u8, function: u8) -> Self {
        Self { segment, bus, device, function }
    }

    /// Offset of this function's 4 KiB configuration block inside the ECAM
    /// window that starts decoding at `bus_number_start`.
    #[must_use]
    pub fn create_express_offset(&self, bus_number_start: u8) -> u64 {
        ((u64::from(self.bus) - u64::from(bus_number_start)) << 20)
                | (u64::from(self.device & 0b11111) << 15)
                | (u64::from(self.function & 0b111) << 12)
    }
}

impl Debug for PciAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for PciAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04x}:{:02x}:{:02x}.{}", self.segment, self.bus, self.device, self.function)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PciBaseAddress(u32);

impl PciBaseAddress {
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn kind(&self) -> PciBaseAddressType {
        if self.0 & 0b1 == 1 {
            PciBaseAddressType::IOSpace
        } else {
            PciBaseAddressType::MemorySpace
        }
    }

    /// The address with the type and prefetch bits masked off.
    #[must_use]
    pub const fn actual_address(&self) -> u32 {
        match self.kind() {
            PciBaseAddressType::MemorySpace => self.value() & !0xF,
            PciBaseAddressType::IOSpace => self.value() & !0x3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PciBaseAddressType {
    MemorySpace,
    IOSpace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PciClassCode(u8);

impl PciClassCode {
    pub const UNCLASSIFIED: Self = Self(0x00);
    pub const MASS_STORAGE_CONTROLLER: Self = Self(0x01);
    pub const NETWORK_CONTROLLER: Self = Self(0x02);
    pub const DISPLAY_CONTROLLER: Self = Self(0x03);
    pub const MULTIMEDIA_CONTROLLER: Self = Self(0x04);
    pub const MEMORY_CONTROLLER: Self = Self(0x05);
    pub const BRIDGE: Self = Self(0x06);
    pub const SIMPLE_COMMUNICATION_CONTROLLER: Self = Self(0x07);
    pub const BASE_SYSTEM_PERIPHERAL: Self = Self(0x08);
    pub const INPUT_DEVICE_CONTROLLER: Self = Self(0x09);
    pub const SERIAL_BUS_CONTROLLER: Self = Self(0x0C);

    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn name(&self) -> Option<&'static str> {
        match *self {
            Self::UNCLASSIFIED => Some("Unclassified"),
            Self::MASS_STORAGE_CONTROLLER => Some("Mass Storage Controller"),
            Self::NETWORK_CONTROLLER => Some("Network Controller"),
            Self::DISPLAY_CONTROLLER => Some("Display Controller"),
            Self::MULTIMEDIA_CONTROLLER => Some("Multimedia Controller"),
            Self::MEMORY_CONTROLLER => Some("Memory Controller"),
            Self::BRIDGE => Some("Bridge"),
            Self::SIMPLE_COMMUNICATION_CONTROLLER => Some("Simple Communication Controller"),
            Self::BASE_SYSTEM_PERIPHERAL => Some("Base System Peripheral"),
            Self::INPUT_DEVICE_CONTROLLER => Some("Input Device Controller"),
            Self::SERIAL_BUS_CONTROLLER => Some("Serial Bus Controller"),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PciSubclass(u8);

impl PciSubclass {
    /// Under [`PciClassCode::MASS_STORAGE_CONTROLLER`].
    pub const SERIAL_ATA: Self = Self(0x06);

    /// Under [`PciClassCode::BRIDGE`].
    pub const PCI_TO_PCI_BRIDGE: Self = Self(0x04);

    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    pub const fn name(&self, class_code: PciClassCode) -> Option<&'static str> {
        match (class_code, self.value()) {
            (PciClassCode::MASS_STORAGE_CONTROLLER, 0x0) => Some("SCSI Bus Controller"),
            (PciClassCode::MASS_STORAGE_CONTROLLER, 0x1) => Some("IDE Controller"),
            (PciClassCode::MASS_STORAGE_CONTROLLER, 0x4) => Some("RAID Controller"),
            (PciClassCode::MASS_STORAGE_CONTROLLER, 0x5) => Some("ATA Controller"),
            (PciClassCode::MASS_STORAGE_CONTROLLER, 0x6) => Some("Serial ATA Controller"),
            (PciClassCode::MASS_STORAGE_CONTROLLER, 0x7) => Some("Serial Attached SCSI Controller"),
            (PciClassCode::MASS_STORAGE_CONTROLLER, 0x8) => Some("Non-Volatile Memory Controller"),

            (PciClassCode::NETWORK_CONTROLLER, 0x0) => Some("Ethernet Controller"),
            (PciClassCode::DISPLAY_CONTROLLER, 0x0) => Some("VGA Compatible Controller"),

            (PciClassCode::BRIDGE, 0x0) => Some("Host Bridge"),
            (PciClassCode::BRIDGE, 0x1) => Some("ISA Bridge"),
            (PciClassCode::BRIDGE, 0x4) => Some("PCI-to-PCI Bridge"),
            (PciClassCode::BRIDGE, 0x7) => Some("CardBus Bridge"),
            (PciClassCode::BRIDGE, 0x9) => Some("PCI-to-PCI Bridge (2)"),

            (PciClassCode::SERIAL_BUS_CONTROLLER, 0x3) => Some("USB Controller"),
            (PciClassCode::SERIAL_BUS_CONTROLLER, 0x5) => Some("SMBus"),

            (_, 0x80) => Some("Other"),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PciDeviceId(u16);

impl PciDeviceId {
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }

    pub const fn name(&self, vendor_id: PciVendorId) -> Option<&'static str> {
        match vendor_id {
            PciVendorId::BOCHS => DeviceNames::get_bochs(self.0),
            PciVendorId::INTEL_CORPORATION => DeviceNames::get_intel(self.0),
            PciVendorId::RED_HAT => DeviceNames::get_red_hat(self.0),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PciVendorId(u16);

impl PciVendorId {
    /// What an empty slot reads back as.
    pub const INVALID: Self = Self(0xFFFF);

    pub const BOCHS: Self = Self(0x1234);
    pub const RED_HAT: Self = Self(0x1B36);
    pub const INTEL_CORPORATION: Self = Self(0x8086);

    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn name(&self) -> Option<&'static str> {
        match *self {
            Self::BOCHS => Some("Bochs"),
            Self::RED_HAT => Some("Red Hat, Inc."),
            Self::INTEL_CORPORATION => Some("Intel Corporation"),

            Self::INVALID => Some("INVALID"),

            _ => None,
        }
    }
}

struct DeviceNames;
impl DeviceNames {
    pub const fn get_bochs(id: u16) -> Option<&'static str> {
        match id {
            0x1111 => Some("Graphics Adapter"),
            _ => None,
        }
    }

    pub const fn get_intel(id: u16) -> Option<&'static str> {
        match id {
            0x1237 => Some("440FX - 82441FX PMC [Natoma]"),
            0x100e => Some("82540EM Gigabit Ethernet Controller"),
            0x10d3 => Some("82574L Gigabit Network Connection"),
            0x2918 => Some("82801IB (ICH9) LPC Interface Controller"),
            0x2922 => Some("82801IR/IO/IH (ICH9R/DO/DH) 6 port SATA Controller [AHCI mode]"),
            0x2930 => Some("82801I (ICH9 Family) SMBus Controller"),
            0x29c0 => Some("82G33/G31/P35/P31 Express DRAM Controller"),
            _ => None,
        }
    }

    pub const fn get_red_hat(id: u16) -> Option<&'static str> {
        match id {
            0x000c => Some("QEMU PCIe Root port"),
            0x000e => Some("QEMU PCIe-to-PCI bridge"),
            _ => None,
        }
    }
}
