// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use core::fmt::{Display, Formatter};

use super::registers::{ChannelRegisters, HostControllerRegisters, CHANNEL_COUNT};

/// Device detection (SStatus.DET).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    NotPresent,
    PresentNoLink,
    PresentWithLink,
    PresentOffline,
    Reserved(u8),
}

impl LinkState {
    #[must_use]
    pub const fn from_sata_status(status: u32) -> Self {
        match (status & 0xF) as u8 {
            0 => Self::NotPresent,
            1 => Self::PresentNoLink,
            3 => Self::PresentWithLink,
            4 => Self::PresentOffline,
            raw => Self::Reserved(raw),
        }
    }
}

impl Display for LinkState {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotPresent => f.write_str("no device detected"),
            Self::PresentNoLink => f.write_str("device detected, no phy communication established"),
            Self::PresentWithLink => f.write_str("device detected, phy communication established"),
            Self::PresentOffline => f.write_str("device detected, phy offline"),
            Self::Reserved(raw) => write!(f, "unexpected detection state {raw}"),
        }
    }
}

/// Interface power management (SStatus.IPM).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerState {
    NotPresent,
    Active,
    Partial,
    Slumber,
    DevSleep,
    Reserved(u8),
}

impl PowerState {
    #[must_use]
    pub const fn from_sata_status(status: u32) -> Self {
        match ((status >> 8) & 0xF) as u8 {
            0 => Self::NotPresent,
            1 => Self::Active,
            2 => Self::Partial,
            6 => Self::Slumber,
            8 => Self::DevSleep,
            raw => Self::Reserved(raw),
        }
    }
}

impl Display for PowerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotPresent => f.write_str("not present"),
            Self::Active => f.write_str("active"),
            Self::Partial => f.write_str("partial"),
            Self::Slumber => f.write_str("slumber"),
            Self::DevSleep => f.write_str("devsleep"),
            Self::Reserved(raw) => write!(f, "reserved ({raw})"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceClass {
    Ata,
    Atapi,
    EnclosureBridge,
    PortMultiplier,
}

impl DeviceClass {
    pub const SIGNATURE_ATA: u32 = 0x0000_0101;
    pub const SIGNATURE_ATAPI: u32 = 0xEB14_0101;
    pub const SIGNATURE_ENCLOSURE_BRIDGE: u32 = 0xC33C_0101;
    pub const SIGNATURE_PORT_MULTIPLIER: u32 = 0x9669_0101;

    /// Unrecognized signatures are treated as plain ATA.
    #[must_use]
    pub const fn from_signature(signature: u32) -> Self {
        match signature {
            Self::SIGNATURE_ATAPI => Self::Atapi,
            Self::SIGNATURE_ENCLOSURE_BRIDGE => Self::EnclosureBridge,
            Self::SIGNATURE_PORT_MULTIPLIER => Self::PortMultiplier,
            _ => Self::Ata,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ata => "SATA drive",
            Self::Atapi => "SATAPI drive",
            Self::EnclosureBridge => "enclosure management bridge",
            Self::PortMultiplier => "port multiplier",
        }
    }
}

/// Snapshot of one implemented channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelStatus {
    pub index: u8,
    pub link: LinkState,
    pub power: PowerState,
}

impl ChannelStatus {
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.link == LinkState::PresentWithLink && self.power == PowerState::Active
    }
}

/// Iterates the implemented channels in ascending order.
#[derive(Clone)]
pub struct Channels<'r> {
    registers: &'r HostControllerRegisters,
    implemented: u32,
    next: usize,
}

impl<'r> Channels<'r> {
    pub(super) fn new(registers: &'r HostControllerRegisters) -> Self {
        Self {
            registers,
            implemented: registers.ports_implemented.read(),
            next: 0,
        }
    }

    pub(super) fn registers(&self, index: u8) -> &'r ChannelRegisters {
        &self.registers.channels[usize::from(index)]
    }
}

impl<'r> Iterator for Channels<'r> {
    type Item = ChannelStatus;

    fn next(&mut self) -> Option<ChannelStatus> {
        while self.next < CHANNEL_COUNT {
            let index = self.next;
            self.next += 1;

            if self.implemented & (1 << index) == 0 {
                continue;
            }

            let status = self.registers.channels[index].sata_status.read();
            return Some(ChannelStatus {
                index: index as u8,
                link: LinkState::from_sata_status(status),
                power: PowerState::from_sata_status(status),
            });
        }

        None
    }
}

/// A channel with an established link and an active interface.
#[derive(Clone, Copy)]
pub struct SelectedChannel<'r> {
    status: ChannelStatus,
    registers: &'r ChannelRegisters,
}

impl<'r> SelectedChannel<'r> {
    pub(super) fn new(status: ChannelStatus, registers: &'r ChannelRegisters) -> Self {
        Self { status, registers }
    }

    #[must_use]
    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    #[must_use]
    pub fn index(&self) -> u8 {
        self.status.index
    }

    #[must_use]
    pub fn signature(&self) -> u32 {
        self.registers.signature.read()
    }

    #[must_use]
    pub fn classify(&self) -> DeviceClass {
        DeviceClass::from_signature(self.signature())
    }
}
