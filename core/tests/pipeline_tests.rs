//! End-to-end assembly from a boot volume

mod common;

use blockio::{BlockDevice, BlockError, DirectCommand, Geometry, Transport, TransportFault};
use common::{test_memory_map, test_ram, ElfWriter, IsoBuilder, MockFirmware};
use iso9660::FsError;
use keel_core::image::TargetArch;
use keel_core::pipeline::{self, PlatformInfo};
use keel_core::stage::StageError;
use keel_core::{BootConfiguration, BootError, BootMode, BootOptions, LoaderSettings};

const MODULES: [&str; 6] = [
    "ZERO.KO",
    "RANDOM.KO",
    "SERIAL.KO",
    "ATA.KO",
    "EXT2.KO",
    "ISO9660.KO",
];

fn kernel() -> Vec<u8> {
    ElfWriter::new(TargetArch::I386)
        .entry(0x10000C)
        .segment(0x100000, &[0x1B; 0x2400], 0x8000)
        .build()
}

fn boot_volume() -> IsoBuilder {
    let mut builder = IsoBuilder::new().file("KERNEL.", &kernel());
    for (i, name) in MODULES.iter().enumerate() {
        builder = builder.file(&format!("MOD/{}", name), &vec![i as u8; 700 * (i + 1)]);
    }
    builder.file("RAMDISK.IMG", &[0xEE; 5000])
}

fn config() -> BootConfiguration {
    BootConfiguration::resolve(
        &BootOptions::default(),
        BootMode::Graphical,
        &LoaderSettings::default(),
    )
}

fn platform() -> PlatformInfo {
    PlatformInfo {
        memory_map: test_memory_map(),
        framebuffer: None,
        loader_buffers: Vec::new(),
    }
}

/// Direct transport over an in-memory disk
struct Disk {
    data: Vec<u8>,
    sector_size: usize,
}

impl DirectCommand for Disk {
    fn read(&mut self, lba: u64, count: u32, dst: &mut [u8]) -> Result<(), TransportFault> {
        let start = lba as usize * self.sector_size;
        let len = count as usize * self.sector_size;
        dst[..len].copy_from_slice(&self.data[start..start + len]);
        Ok(())
    }
}

#[test]
fn test_assemble_default_configuration() {
    let mut disk = boot_volume().build();
    let mut ram = test_ram();
    let mut firmware = MockFirmware::default();

    let assembly = pipeline::assemble(
        &mut disk,
        0,
        &config(),
        &platform(),
        &mut ram,
        &mut firmware,
    )
    .unwrap();

    assert_eq!(assembly.handoff.entry(), 0x10000C);
    assert_eq!(assembly.descriptor.entry_point, 0x10000C);

    let names: Vec<&str> = assembly
        .descriptor
        .modules
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(
        names,
        [
            "ZERO.KO",
            "RANDOM.KO",
            "SERIAL.KO",
            "ATA.KO",
            "EXT2.KO",
            "ISO9660.KO",
            "RAMDISK.IMG"
        ]
    );

    // Kernel image and bss
    assert!(ram.at(0x100000, 0x2400).iter().all(|&b| b == 0x1B));
    assert!(ram.at(0x102400, 0x8000 - 0x2400).iter().all(|&b| b == 0));

    // Modules sit above the kernel, one after another
    let mut previous_end = 0x108000;
    for (i, module) in assembly.descriptor.modules[..MODULES.len()].iter().enumerate() {
        assert!(module.address >= previous_end);
        assert_eq!(module.length, 700 * (i as u64 + 1));
        assert!(ram.at(module.address, module.length as usize).iter().all(|&b| b == i as u8));
        previous_end = module.end();
    }

    let info = assembly.handoff.info() as u64;
    assert_eq!(ram.u32_at(info + 20), 7);
    assert_eq!(
        ram.c_str_at(ram.u32_at(info + 16) as u64),
        "root=/dev/ram0,nocache start=--migrate _start=live-session vid=auto,1440,900 "
    );
    assert_eq!(firmware.ready_calls, 1);
    assert_eq!(firmware.exit_calls, 0);
}

/// Multiboot type of the encoded mmap entry starting at `base`
fn encoded_type(ram: &common::RamMemory, info: u64, base: u64) -> Option<u32> {
    let length = ram.u32_at(info + 44) as u64;
    let mmap = ram.u32_at(info + 48) as u64;
    (0..length / 24)
        .map(|i| mmap + i * 24)
        .find(|&entry| ram.u64_at(entry + 4) == base)
        .map(|entry| ram.u32_at(entry + 20))
}

#[test]
fn test_loader_buffers_are_not_handed_out() {
    let mut disk = boot_volume().build();
    let mut ram = test_ram();
    let platform = PlatformInfo {
        // Heap and trampoline page inside firmware-reclaimable memory
        loader_buffers: vec![0x800000..0x840000, 0x8FF000..0x900000],
        ..platform()
    };

    let assembly = pipeline::assemble(
        &mut disk,
        0,
        &config(),
        &platform,
        &mut ram,
        &mut MockFirmware::default(),
    )
    .unwrap();
    let info = assembly.handoff.info() as u64;

    assert_eq!(encoded_type(&ram, info, 0x800000), Some(2));
    assert_eq!(encoded_type(&ram, info, 0x8FF000), Some(2));
    // The rest of the reclaimable region is free again
    assert_eq!(encoded_type(&ram, info, 0x840000), Some(1));

    // Placement is unaffected
    assert_eq!(assembly.handoff.entry(), 0x10000C);
    assert!(assembly
        .descriptor
        .modules
        .iter()
        .all(|m| m.end() <= 0x800000 || m.address >= 0x900000));
}

#[test]
fn test_assemble_through_block_device() {
    let image = boot_volume().build();
    let mut transport = Disk {
        sector_size: 512,
        data: image.data.clone(),
    };
    let geometry = Geometry::new(512, (image.data.len() / 512) as u64).unwrap();
    let mut device = BlockDevice::new(geometry, Transport::Direct(&mut transport));
    let mut ram = test_ram();

    let assembly = pipeline::assemble(
        &mut device,
        0,
        &config(),
        &platform(),
        &mut ram,
        &mut MockFirmware::default(),
    )
    .unwrap();
    assert_eq!(assembly.descriptor.modules.len(), 7);
}

#[test]
fn test_blank_device_is_not_bootable() {
    let mut disk = common::MemoryBlockDevice::new(vec![0; 2048 * 40], 2048);
    let result = pipeline::assemble(
        &mut disk,
        0,
        &config(),
        &platform(),
        &mut test_ram(),
        &mut MockFirmware::default(),
    );

    let error = result.unwrap_err();
    assert_eq!(error, BootError::Volume(FsError::BadVolume));
    assert!(error.is_not_bootable());
}

#[test]
fn test_volume_without_kernel_is_not_bootable() {
    let mut disk = IsoBuilder::new().file("README.TXT", b"hello").build();
    let error = pipeline::assemble(
        &mut disk,
        0,
        &config(),
        &platform(),
        &mut test_ram(),
        &mut MockFirmware::default(),
    )
    .unwrap_err();

    assert_eq!(error, BootError::KernelPath(FsError::NotFound));
    assert!(error.is_not_bootable());
}

#[test]
fn test_missing_root_driver_stops_the_boot() {
    let mut disk = IsoBuilder::new()
        .file("KERNEL.", &kernel())
        .file("MOD/ZERO.KO", b"zero")
        .file("RAMDISK.IMG", b"ramdisk")
        .build();
    let mut firmware = MockFirmware::default();

    let error = pipeline::assemble(
        &mut disk,
        0,
        &config(),
        &platform(),
        &mut test_ram(),
        &mut firmware,
    )
    .unwrap_err();

    assert!(matches!(
        error,
        BootError::Modules(StageError::Missing { ref module, .. }) if module == "EXT2.KO"
    ));
    assert!(!error.is_not_bootable());
    assert_eq!(firmware.ready_calls, 0);
}

#[test]
fn test_failing_transport_is_reported_unchanged() {
    struct Broken;
    impl DirectCommand for Broken {
        fn read(&mut self, _: u64, _: u32, _: &mut [u8]) -> Result<(), TransportFault> {
            Err(TransportFault::Timeout)
        }
    }

    let mut broken = Broken;
    let geometry = Geometry::new(2048, 1000).unwrap();
    let mut device = BlockDevice::new(geometry, Transport::Direct(&mut broken));

    let error = pipeline::assemble(
        &mut device,
        0,
        &config(),
        &platform(),
        &mut test_ram(),
        &mut MockFirmware::default(),
    )
    .unwrap_err();

    assert_eq!(
        error,
        BootError::Volume(FsError::Block(BlockError::TransportFailure(
            TransportFault::Timeout
        )))
    );
    assert!(!error.is_not_bootable());
}
