//! Module staging

mod common;

use blockio::{BlockError, TransportFault};
use common::{test_memory_map, test_ram, IsoBuilder, MemoryBlockDevice};
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};
use iso9660::{FsError, VolumeDescriptor};
use keel_core::config::{ModuleEntry, ModuleTable};
use keel_core::memory::{AllocationRecord, MemoryError, MemoryKind, MemoryMap, MemoryRegion};
use keel_core::stage::{self, StageError};
use keel_core::{BootConfiguration, BootMode, BootOptions, LoaderSettings};

fn config(modules: ModuleTable) -> BootConfiguration {
    let mut config = BootConfiguration::resolve(
        &BootOptions::default(),
        BootMode::Graphical,
        &LoaderSettings::default(),
    );
    config.modules = modules;
    config
}

fn open(builder: IsoBuilder) -> (MemoryBlockDevice, VolumeDescriptor) {
    let mut disk = builder.build();
    let volume = iso9660::open(&mut disk, 0).unwrap();
    (disk, volume)
}

fn payload(tag: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| tag.wrapping_add(i as u8)).collect()
}

#[test]
fn test_tombstones_leave_no_record() {
    let (mut disk, volume) = open(
        IsoBuilder::new()
            .file("MOD/ZERO.KO", &payload(1, 5000))
            .file("MOD/SERIAL.KO", &payload(7, 300)),
    );
    let config = config(ModuleTable::from_names(&["ZERO.KO", "NONE", "SERIAL.KO"]));
    let mut allocations = AllocationRecord::new(&test_memory_map());
    let mut ram = test_ram();

    let staged = stage::stage_all(&mut disk, &volume, &config, &mut allocations, &mut ram).unwrap();

    let names: Vec<&str> = staged.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["ZERO.KO", "SERIAL.KO"]);
    assert_eq!(staged[0].length, 5000);
    assert_eq!(staged[1].length, 300);

    assert_eq!(ram.at(staged[0].address, 5000), &payload(1, 5000)[..]);
    assert_eq!(ram.at(staged[1].address, 300), &payload(7, 300)[..]);

    for module in &staged {
        assert_eq!(module.address % 4096, 0);
    }
    assert!(staged[0].end() <= staged[1].address);
    assert_eq!(allocations.reservations().len(), 2);
}

#[test]
fn test_staging_preserves_table_order() {
    let (mut disk, volume) = open(
        IsoBuilder::new()
            .file("MOD/A.KO", b"a")
            .file("MOD/B.KO", b"b")
            .file("MOD/C.KO", b"c"),
    );
    let config = config(ModuleTable::from_names(&["C.KO", "A.KO", "NONE", "B.KO"]));
    let mut allocations = AllocationRecord::new(&test_memory_map());
    let mut ram = test_ram();

    let staged = stage::stage_all(&mut disk, &volume, &config, &mut allocations, &mut ram).unwrap();
    let names: Vec<&str> = staged.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["C.KO", "A.KO", "B.KO"]);
    assert!(staged.windows(2).all(|w| w[0].address < w[1].address));
}

#[test]
fn test_missing_best_effort_module_is_skipped() {
    let (mut disk, volume) = open(IsoBuilder::new().file("MOD/ZERO.KO", b"zero"));
    let config = config(ModuleTable::from_names(&["ZERO.KO", "SND.KO"]));
    let mut allocations = AllocationRecord::new(&test_memory_map());
    let mut ram = test_ram();

    let staged = stage::stage_all(&mut disk, &volume, &config, &mut allocations, &mut ram).unwrap();
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].name, "ZERO.KO");
}

#[test]
fn test_missing_required_module_aborts() {
    let (mut disk, volume) = open(IsoBuilder::new().file("MOD/ZERO.KO", b"zero"));
    let config = config(ModuleTable::from_entries(vec![
        ModuleEntry::driver("ZERO.KO"),
        ModuleEntry::driver("EXT2.KO").required(),
    ]));
    let mut allocations = AllocationRecord::new(&test_memory_map());
    let mut ram = test_ram();

    assert_eq!(
        stage::stage_all(&mut disk, &volume, &config, &mut allocations, &mut ram),
        Err(StageError::Missing {
            module: "EXT2.KO".to_string(),
            source: FsError::NotFound,
        })
    );
}

#[test]
fn test_lookup_failure_is_not_a_missing_module() {
    // MOD is a plain file, so /MOD/ZERO.KO cannot be walked
    let (mut disk, volume) = open(IsoBuilder::new().file("MOD", b"not a directory"));
    let config = config(ModuleTable::from_names(&["ZERO.KO"]));
    let mut allocations = AllocationRecord::new(&test_memory_map());
    let mut ram = test_ram();

    assert_eq!(
        stage::stage_all(&mut disk, &volume, &config, &mut allocations, &mut ram),
        Err(StageError::Resolve {
            module: "ZERO.KO".to_string(),
            source: FsError::NotADirectory,
        })
    );
}

/// A disk that went away after the volume was opened
struct Unplugged {
    disk: MemoryBlockDevice,
}

impl BlockIo for Unplugged {
    type Error = BlockError;

    fn block_size(&self) -> BlockSize {
        self.disk.block_size()
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        self.disk.num_blocks()
    }

    fn read_blocks(&mut self, _start_lba: Lba, _dst: &mut [u8]) -> Result<(), Self::Error> {
        Err(BlockError::TransportFailure(TransportFault::Timeout))
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        self.disk.write_blocks(start_lba, src)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.disk.flush()
    }
}

#[test]
fn test_transport_failure_reaches_the_caller_unchanged() {
    let (disk, volume) = open(IsoBuilder::new().file("MOD/ZERO.KO", b"zero"));
    let mut device = Unplugged { disk };
    // Best-effort modules are only skipped when absent
    let config = config(ModuleTable::from_names(&["ZERO.KO"]));
    let mut allocations = AllocationRecord::new(&test_memory_map());
    let mut ram = test_ram();

    let error = stage::stage_all(&mut device, &volume, &config, &mut allocations, &mut ram)
        .unwrap_err();
    assert_eq!(
        error,
        StageError::Resolve {
            module: "ZERO.KO".to_string(),
            source: FsError::Block(BlockError::TransportFailure(TransportFault::Timeout)),
        }
    );
    assert!(error.to_string().starts_with("Looking up module ZERO.KO"));
    assert!(allocations.reservations().is_empty());
}

#[test]
fn test_ramdisk_comes_from_volume_root() {
    let (mut disk, volume) = open(
        IsoBuilder::new()
            .file("MOD/EXT2.KO", b"ext2")
            .file("RAMDISK.IMG", &payload(9, 10000)),
    );
    let config = config(ModuleTable::from_entries(vec![
        ModuleEntry::driver("EXT2.KO").required(),
        ModuleEntry::root_file("RAMDISK.IMG"),
    ]));
    let mut allocations = AllocationRecord::new(&test_memory_map());
    let mut ram = test_ram();

    let staged = stage::stage_all(&mut disk, &volume, &config, &mut allocations, &mut ram).unwrap();
    assert_eq!(staged.last().unwrap().name, "RAMDISK.IMG");
    assert_eq!(
        ram.at(staged[1].address, 10000),
        &payload(9, 10000)[..]
    );
}

#[test]
fn test_default_table_needs_root_filesystem_driver() {
    let (mut disk, volume) = open(
        IsoBuilder::new()
            .file("MOD/ZERO.KO", b"zero")
            .file("RAMDISK.IMG", b"ramdisk"),
    );
    let config = config(ModuleTable::resolve(&BootOptions::default(), "RAMDISK.IMG"));
    let mut allocations = AllocationRecord::new(&test_memory_map());
    let mut ram = test_ram();

    match stage::stage_all(&mut disk, &volume, &config, &mut allocations, &mut ram) {
        Err(StageError::Missing { module, .. }) => assert_eq!(module, "EXT2.KO"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_out_of_memory() {
    let (mut disk, volume) = open(IsoBuilder::new().file("MOD/BIG.KO", &payload(3, 0x3000)));
    let config = config(ModuleTable::from_names(&["BIG.KO"]));
    let tiny = MemoryMap::from_regions([MemoryRegion::new(0x100000, 0x2000, MemoryKind::Usable)]);
    let mut allocations = AllocationRecord::new(&tiny);
    let mut ram = test_ram();

    assert_eq!(
        stage::stage_all(&mut disk, &volume, &config, &mut allocations, &mut ram),
        Err(StageError::Memory(MemoryError::Exhausted { length: 0x3000 }))
    );
    assert!(ram.windows.is_empty());
}
