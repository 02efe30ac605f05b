// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod capability;
mod config;
mod enumerate;
mod header;
mod types;

pub use self::{
    capability::{
        capabilities,
        find_capability,
        Capabilities,
        Capability,
        PCI_CAP_EXPRESS,
        PCI_CAP_MSI,
        PCI_CAP_MSIX,
        PCI_CAP_POWER_MANAGEMENT,
        PCI_CAP_SATA,
        PCI_CAP_VENDOR_SPECIFIC,
    },
    config::{
        regs,
        ConfigurationSpaceMechanism,
        EnhancedConfigurationSpace,
    },
    enumerate::{
        enumerate,
        enumerate_all,
        DeviceList,
        PciDevice,
    },
    header::{
        BridgeHeader,
        CardBusHeader,
        ConfigurationHeader,
        EndpointHeader,
        HeaderLayout,
        PciHeaderType,
    },
    types::{
        PciAddress,
        PciBaseAddress,
        PciBaseAddressType,
        PciClassCode,
        PciDeviceId,
        PciSubclass,
        PciVendorId,
    },
};
