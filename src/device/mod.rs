// Copyright (C) 2023 - 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

pub mod acpi;
pub mod ahci;
pub mod pci;

use core::fmt::{Display, Formatter};
use ::acpi::AcpiHandler;
use log::info;

use self::{
    acpi::ConfigurationTableEntry,
    ahci::{ChannelStatus, DeviceClass, HostController},
    pci::{DeviceList, PciAddress},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Dump every configuration header and the status of every channel.
    pub verbose: bool,
}

/// What the pipeline found.
#[derive(Debug)]
pub struct Discovery {
    pub devices: DeviceList,
    pub controller: PciAddress,
    pub ports_supported: u32,
    pub channel: ChannelStatus,
    pub signature: u32,
    pub class: DeviceClass,
}

/// Locates the PCI Express root complexes, enumerates everything behind
/// them and picks the first usable channel of the first AHCI controller.
pub fn discover<'a, H, I>(handler: &H, entries: I, options: DiscoveryOptions) -> Result<Discovery, DeviceError>
        where H: AcpiHandler,
              I: IntoIterator<Item = &'a ConfigurationTableEntry> {
    let mcfg = acpi::locate_root_complexes(handler, entries)
        .map_err(|e| e.with_region("acpi"))?;

    let devices = pci::enumerate_all(handler, &mcfg, options);
    info!("[pci] Enumerated {} function(s)", devices.len());

    let device = ahci::find_controller(&devices)
        .map_err(|e| e.with_region("ahci"))?;
    let controller = device.address;

    let hba = HostController::map(handler, device)
        .map_err(|e| e.with_region("ahci"))?;
    hba.log_summary(options.verbose);

    let selected = hba.select_channel()
        .map_err(|e| e.with_region("ahci"))?;
    let channel = selected.status();
    let signature = selected.signature();
    let class = selected.classify();

    info!("[ahci] Using port {} of {controller}: {} (signature {signature:08x})",
            channel.index, class.name());

    Ok(Discovery {
        ports_supported: hba.ports_supported(),
        devices,
        controller,
        channel,
        signature,
        class,
    })
}

#[derive(Debug)]
pub struct DeviceError {
    kind: DeviceErrorKind,
    region: &'static str,
}

impl DeviceError {
    pub fn with_region(self, region: &'static str) -> Self {
        Self {
            region,
            ..self
        }
    }

    #[must_use]
    pub fn kind(&self) -> &DeviceErrorKind {
        &self.kind
    }

    #[must_use]
    pub fn region(&self) -> &'static str {
        self.region
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::new(DeviceErrorKind::NotFound(what))
    }

    pub fn checksum_invalid(table: &'static str) -> Self {
        Self::new(DeviceErrorKind::ChecksumInvalid(table))
    }

    pub fn revision_unsupported(revision: u8) -> Self {
        Self::new(DeviceErrorKind::RevisionUnsupported(revision))
    }

    pub fn no_active_channel() -> Self {
        Self::new(DeviceErrorKind::NoActiveChannel)
    }

    const fn new(kind: DeviceErrorKind) -> Self {
        DeviceError {
            kind,
            region: "(unknown)",
        }
    }
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}] {}", self.region, self.kind)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceErrorKind {
    NotFound(&'static str),
    ChecksumInvalid(&'static str),
    RevisionUnsupported(u8),
    NoActiveChannel,
}

impl Display for DeviceErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::ChecksumInvalid(table) => write!(f, "{table} checksum is invalid"),
            Self::RevisionUnsupported(revision) => write!(f, "revision {revision} is not supported"),
            Self::NoActiveChannel => f.write_str("no channel has an active link"),
        }
    }
}
