// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Boot-time hardware discovery: ACPI tables to the PCI Express root
//! complexes, the bus tree behind them, and the AHCI controller on it.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod device;

#[cfg(test)]
mod testing;

pub use self::device::{
    discover,
    DeviceError,
    DeviceErrorKind,
    Discovery,
    DiscoveryOptions,
};
