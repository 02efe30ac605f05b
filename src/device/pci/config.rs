// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use acpi::AcpiHandler;

use crate::device::acpi::{handler::read_physical, RootComplexDescriptor};
use super::{PciAddress, PciBaseAddress, PciClassCode, PciDeviceId, PciHeaderType, PciSubclass, PciVendorId};

/// Offsets into the configuration space shared by every header layout.
pub mod regs {
    pub const VENDOR_ID: u16 = 0x00;
    pub const DEVICE_ID: u16 = 0x02;
    pub const COMMAND: u16 = 0x04;
    pub const STATUS: u16 = 0x06;
    pub const REVISION_ID: u16 = 0x08;
    pub const PROG_IF: u16 = 0x09;
    pub const SUBCLASS: u16 = 0x0A;
    pub const CLASS_CODE: u16 = 0x0B;
    pub const CACHE_LINE_SIZE: u16 = 0x0C;
    pub const LATENCY_TIMER: u16 = 0x0D;
    pub const HEADER_TYPE: u16 = 0x0E;
    pub const BIST: u16 = 0x0F;
    pub const BAR0: u16 = 0x10;

    /// Status register bit announcing a capabilities list.
    pub const STATUS_CAPABILITIES_LIST: u16 = 1 << 4;
}

pub trait ConfigurationSpaceMechanism {
    /// Reads the aligned dword containing `offset`.
    fn read_dword(&self, addr: PciAddress, offset: u16) -> u32;

    fn read_word(&self, addr: PciAddress, offset: u16) -> u16 {
        let data = self.read_dword(addr, offset & !0x3);
        ((data >> ((offset & 2) * 8)) & 0xFFFF) as u16
    }

    fn read_byte(&self, addr: PciAddress, offset: u16) -> u8 {
        let data = self.read_dword(addr, offset & !0x3);
        ((data >> ((offset & 3) * 8)) & 0xFF) as u8
    }

    fn vendor_id(&self, addr: PciAddress) -> PciVendorId {
        PciVendorId::new(self.read_word(addr, regs::VENDOR_ID))
    }

    fn device_id(&self, addr: PciAddress) -> PciDeviceId {
        PciDeviceId::new(self.read_word(addr, regs::DEVICE_ID))
    }

    fn command(&self, addr: PciAddress) -> u16 {
        self.read_word(addr, regs::COMMAND)
    }

    fn status(&self, addr: PciAddress) -> u16 {
        self.read_word(addr, regs::STATUS)
    }

    fn revision_id(&self, addr: PciAddress) -> u8 {
        self.read_byte(addr, regs::REVISION_ID)
    }

    fn prog_if(&self, addr: PciAddress) -> u8 {
        self.read_byte(addr, regs::PROG_IF)
    }

    fn subclass(&self, addr: PciAddress) -> PciSubclass {
        PciSubclass::new(self.read_byte(addr, regs::SUBCLASS))
    }

    fn class_code(&self, addr: PciAddress) -> PciClassCode {
        PciClassCode::new(self.read_byte(addr, regs::CLASS_CODE))
    }

    fn header_type(&self, addr: PciAddress) -> PciHeaderType {
        PciHeaderType::decode(self.read_byte(addr, regs::HEADER_TYPE))
    }

    fn is_present(&self, addr: PciAddress) -> bool {
        self.vendor_id(addr) != PciVendorId::INVALID
    }

    fn base_address(&self, addr: PciAddress, index: u8) -> PciBaseAddress {
        PciBaseAddress::new(self.read_dword(addr, regs::BAR0 + u16::from(index) * 4))
    }
}

/// The enhanced (memory-mapped) configuration access mechanism of one root
/// complex.
pub struct EnhancedConfigurationSpace<'h, H: AcpiHandler> {
    handler: &'h H,
    descriptor: RootComplexDescriptor,
}

impl<'h, H: AcpiHandler> EnhancedConfigurationSpace<'h, H> {
    #[must_use]
    pub fn new(handler: &'h H, descriptor: RootComplexDescriptor) -> Self {
        Self { handler, descriptor }
    }

    #[must_use]
    pub fn descriptor(&self) -> &RootComplexDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn address(&self, bus: u8, device: u8, function: u8) -> PciAddress {
        PciAddress::new(self.descriptor.segment_group(), bus, device, function)
    }

    /// Physical address of the function's configuration block. The bus is
    /// not checked against the window.
    #[must_use]
    pub fn map(&self, addr: PciAddress) -> u64 {
        self.descriptor.base_address().as_u64()
            + addr.create_express_offset(self.descriptor.start_bus())
    }
}

impl<'h, H: AcpiHandler> ConfigurationSpaceMechanism for EnhancedConfigurationSpace<'h, H> {
    fn read_dword(&self, addr: PciAddress, offset: u16) -> u32 {
        let address = self.map(addr) + u64::from(offset & 0xFFC);

        // SAFETY: the ECAM window is MMIO described by the firmware, and the
        // address is dword aligned.
        unsafe { read_physical::<H, u32>(self.handler, address as usize) }
    }
}
