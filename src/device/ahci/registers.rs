// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use core::mem::{offset_of, size_of};
use volatile::{ReadOnly, Volatile};

pub const CHANNEL_COUNT: usize = 32;

/// The memory-mapped register block (ABAR) of an AHCI host controller.
#[repr(C)]
pub struct HostControllerRegisters {
    /// Bits 0..=4 hold the number of ports minus one.
    pub capabilities: ReadOnly<u32>,
    pub global_host_control: Volatile<u32>,
    pub interrupt_status: Volatile<u32>,

    /// One bit per channel that is exposed by the controller.
    pub ports_implemented: ReadOnly<u32>,
    pub version: ReadOnly<u32>,
    pub command_completion_coalescing_control: Volatile<u32>,
    pub command_completion_coalescing_ports: Volatile<u32>,
    pub enclosure_management_location: ReadOnly<u32>,
    pub enclosure_management_control: Volatile<u32>,
    pub capabilities_extended: ReadOnly<u32>,
    pub bios_handoff_control: Volatile<u32>,

    _reserved: [u8; 0x74],
    _vendor_specific: [u8; 0x60],

    pub channels: [ChannelRegisters; CHANNEL_COUNT],
}

/// The register block of one port.
#[repr(C)]
pub struct ChannelRegisters {
    pub command_list_base: Volatile<u32>,
    pub command_list_base_upper: Volatile<u32>,
    pub fis_base: Volatile<u32>,
    pub fis_base_upper: Volatile<u32>,
    pub interrupt_status: Volatile<u32>,
    pub interrupt_enable: Volatile<u32>,
    pub command_and_status: Volatile<u32>,
    _reserved_0: u32,
    pub task_file_data: ReadOnly<u32>,

    /// The signature of the first D2H register FIS, identifying the kind of
    /// device attached.
    pub signature: ReadOnly<u32>,

    /// SStatus: detection in bits 0..=3, speed in 4..=7, power management
    /// in 8..=11.
    pub sata_status: ReadOnly<u32>,
    pub sata_control: Volatile<u32>,
    pub sata_error: Volatile<u32>,
    pub sata_active: Volatile<u32>,
    pub command_issue: Volatile<u32>,
    pub sata_notification: Volatile<u32>,
    pub fis_based_switching_control: Volatile<u32>,
    pub device_sleep: Volatile<u32>,

    _reserved_1: [u8; 0x28],
    _vendor_specific: [u8; 0x10],
}

const _: () = assert!(size_of::<ChannelRegisters>() == 0x80);
const _: () = assert!(offset_of!(ChannelRegisters, signature) == 0x24);
const _: () = assert!(offset_of!(ChannelRegisters, sata_status) == 0x28);

const _: () = assert!(offset_of!(HostControllerRegisters, ports_implemented) == 0x0C);
const _: () = assert!(offset_of!(HostControllerRegisters, bios_handoff_control) == 0x28);
const _: () = assert!(offset_of!(HostControllerRegisters, channels) == 0x100);
const _: () = assert!(size_of::<HostControllerRegisters>() == 0x1100);
