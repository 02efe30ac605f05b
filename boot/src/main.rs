// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

#![no_main]
#![no_std]

extern crate alloc;

mod debug;

use alloc::vec::Vec;
use log::{error, info, LevelFilter};
use scoperta::{
    device::acpi::{ConfigurationTableEntry, IdentityMappedHandler},
    DeviceError,
    DeviceErrorKind,
    DiscoveryOptions,
};
use uefi::prelude::*;

/// How long the results stay on screen before control returns to the
/// firmware.
const SHUTDOWN_STALL_MICROS: usize = 10_000_000;

const OPTIONS: DiscoveryOptions = DiscoveryOptions {
    verbose: cfg!(feature = "verbose"),
};

#[entry]
fn main(_image_handle: Handle, mut system_table: SystemTable<Boot>) -> Status {
    // Initialize logger & memory services.
    if uefi_services::init(&mut system_table).is_err() {
        return Status::ABORTED;
    }

    log::set_max_level(if OPTIONS.verbose { LevelFilter::Trace } else { LevelFilter::Info });

    info!("Scoperta");

    if OPTIONS.verbose {
        debug::print_config_tables(&system_table);
    }

    let entries = system_table.config_table()
        .iter()
        .map(|entry| ConfigurationTableEntry {
            identifier: entry.guid.to_bytes(),
            address: entry.address as usize,
        })
        .collect::<Vec<_>>();

    let status = match scoperta::discover(&IdentityMappedHandler, &entries, OPTIONS) {
        Ok(discovery) => {
            info!("Found {} function(s), AHCI controller at {} with {} port(s)",
                    discovery.devices.len(), discovery.controller, discovery.ports_supported);
            info!("Port {} holds a {}", discovery.channel.index, discovery.class.name());
            Status::SUCCESS
        }

        Err(e) => {
            error!("Discovery failed: {e}");
            status_of(&e)
        }
    };

    system_table.boot_services().stall(SHUTDOWN_STALL_MICROS);
    status
}

fn status_of(error: &DeviceError) -> Status {
    match error.kind() {
        DeviceErrorKind::NotFound(..) => Status::NOT_FOUND,
        DeviceErrorKind::ChecksumInvalid(..) => Status::CRC_ERROR,
        DeviceErrorKind::RevisionUnsupported(..) => Status::UNSUPPORTED,
        DeviceErrorKind::NoActiveChannel => Status::NOT_READY,
    }
}
