// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use super::{regs, ConfigurationHeader, ConfigurationSpaceMechanism, PciAddress};

pub const PCI_CAP_POWER_MANAGEMENT: u8 = 0x01;
pub const PCI_CAP_MSI: u8 = 0x05;
pub const PCI_CAP_VENDOR_SPECIFIC: u8 = 0x09;
pub const PCI_CAP_EXPRESS: u8 = 0x10;
pub const PCI_CAP_MSIX: u8 = 0x11;
pub const PCI_CAP_SATA: u8 = 0x12;

/// 256 bytes of legacy configuration space fit at most 48 four-byte
/// capabilities after the 64-byte header.
const MAX_CAPABILITIES: u8 = 48;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capability {
    pub offset: u8,
    pub id: u8,
}

impl Capability {
    #[must_use]
    pub const fn name(&self) -> Option<&'static str> {
        match self.id {
            PCI_CAP_POWER_MANAGEMENT => Some("Power Management"),
            PCI_CAP_MSI => Some("MSI"),
            PCI_CAP_VENDOR_SPECIFIC => Some("Vendor Specific"),
            PCI_CAP_EXPRESS => Some("PCI Express"),
            PCI_CAP_MSIX => Some("MSI-X"),
            PCI_CAP_SATA => Some("SATA Data/Index Configuration"),
            _ => None,
        }
    }
}

/// Iterator over the capability list of one function.
pub struct Capabilities<'m, M: ConfigurationSpaceMechanism> {
    mechanism: &'m M,
    addr: PciAddress,
    next: u8,
    remaining: u8,
}

impl<'m, M: ConfigurationSpaceMechanism> Iterator for Capabilities<'m, M> {
    type Item = Capability;

    fn next(&mut self) -> Option<Capability> {
        if self.next == 0 || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let offset = self.next;
        let id = self.mechanism.read_byte(self.addr, u16::from(offset));
        self.next = self.mechanism.read_byte(self.addr, u16::from(offset) + 1) & !0x3;

        Some(Capability { offset, id })
    }
}

/// Walks the capability list announced by the status register. Layouts
/// without a capabilities pointer yield nothing.
pub fn capabilities<'m, M>(mechanism: &'m M, addr: PciAddress, header: &ConfigurationHeader) -> Capabilities<'m, M>
        where M: ConfigurationSpaceMechanism {
    let next = match header.capabilities_pointer() {
        Some(pointer) if header.status & regs::STATUS_CAPABILITIES_LIST != 0 => pointer & !0x3,
        _ => 0,
    };

    Capabilities {
        mechanism,
        addr,
        next,
        remaining: MAX_CAPABILITIES,
    }
}

pub fn find_capability<M>(mechanism: &M, addr: PciAddress, header: &ConfigurationHeader, id: u8) -> Option<Capability>
        where M: ConfigurationSpaceMechanism {
    capabilities(mechanism, addr, header).find(|capability| capability.id == id)
}
