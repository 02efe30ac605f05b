// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::path::{Path, PathBuf};
use std::process::Command;

const DEFAULT_EFI: &str = "boot/target/x86_64-unknown-uefi/debug/scoperta-boot.efi";
const ESP_DIR: &str = "target/esp";

fn main() -> Result<(), std::io::Error> {
    let mut args = std::env::args().skip(1);
    let command = args.next();
    let disk = args.next();

    let efi = efi_path();

    let mut cmd = match command.as_deref() {
        Some("run") => create_qemu_cmd(&efi, disk.as_deref())?,

        Some("debug") => {
            let mut cmd = create_qemu_cmd(&efi, disk.as_deref())?;
            cmd.args(["-s", "-S"]);
            cmd
        }

        Some("info") => {
            println!("OS> SCOPERTA_EFI: {}", efi.display());
            println!("OS> OVMF: {}", ovmf_prebuilt::ovmf_pure_efi().display());
            println!("OS> QEMU available: {}", does_command_exist("qemu-system-x86_64"));
            return Ok(());
        }

        Some(command) => {
            println!("OS> Unknown command `{command}`");
            return Ok(());
        }

        None => {
            println!("OS> No command supplied! `run [disk.img]`, `debug [disk.img]`, `info`");
            return Ok(());
        }
    };

    if !does_command_exist("qemu-system-x86_64") {
        println!("OS> CLI tool `qemu-system-x86_64` not found");
        return Ok(());
    }

    let mut child = cmd.spawn()?;
    child.wait()?;

    Ok(())
}

fn efi_path() -> PathBuf {
    std::env::var_os("SCOPERTA_EFI")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EFI))
}

/// Lays the application out as the removable-media boot loader of a FAT
/// directory QEMU can export.
fn prepare_esp(efi: &Path) -> Result<PathBuf, std::io::Error> {
    let boot_dir = Path::new(ESP_DIR).join("EFI").join("BOOT");
    std::fs::create_dir_all(&boot_dir)?;
    std::fs::copy(efi, boot_dir.join("BOOTX64.EFI"))?;
    Ok(PathBuf::from(ESP_DIR))
}

fn create_qemu_cmd(efi: &Path, disk: Option<&str>) -> Result<Command, std::io::Error> {
    let esp = prepare_esp(efi)?;

    let mut cmd = Command::new("qemu-system-x86_64");

    // q35 provides the MCFG table
    cmd.args(["-machine", "q35"]);
    cmd.args(["-m", "256M"]);

    // Prevent rebooting because of faults
    cmd.arg("-no-reboot");

    cmd.arg("-bios").arg(ovmf_prebuilt::ovmf_pure_efi());
    cmd.arg("-drive").arg(format!("format=raw,file=fat:rw:{}", esp.display()));

    // The built-in ICH9 controller sits at function 2 of its slot, so add
    // one at function 0 of a root bus slot.
    cmd.args(["-device", "ahci,id=ahci0,bus=pcie.0,addr=0x5"]);

    match disk {
        Some(disk) => {
            cmd.arg("-drive").arg(format!("id=disk,file={disk},if=none,format=raw"));
            cmd.args(["-device", "ide-hd,drive=disk,bus=ahci0.0"]);
        }

        None => {
            println!("OS> No disk image supplied, the added controller will have no active port");
        }
    }

    // Attach serial output to stdio
    cmd.args(["-serial", "stdio"]);

    Ok(cmd)
}

fn does_command_exist(name: &str) -> bool {
    which::which(name).is_ok()
}
