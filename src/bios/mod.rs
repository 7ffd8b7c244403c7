//!
//! See example `dmidecode-mini` on how to use this.
//!
//! ## Sources
//! The raw table is read from
//! `/sys/firmware/dmi/tables/{smbios_entry_point, DMI}`, both SMBIOS 2.1
//! and 3.0 entry points are supported. If those can't be read (they need
//! root), the kernel's `/sys/class/dmi/id/*` strings are used instead,
//! which only covers the bios, system and board descriptors.
//!
//! ```no_run
//! use hw_telemetry::bios::Smbios;
//! let smbios = Smbios::read();
//! if let Some(bios) = smbios.bios() {
//! 	println!("{} {}", bios.vendor, bios.version);
//! }
//! ```

mod low_level;
mod structures;

use crate::util::read_first_line;

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

pub use uuid::Uuid;
pub use low_level::{
	EntryPoint, EntryPointKind, Error, Structure, StructureKind, Structures
};
pub use structures::{
	BiosInformation, SystemInformation, BaseBoardInformation,
	ProcessorInformation, MemoryDevice, Record
};

#[cfg(feature = "serde")]
use serde1::Serialize;

/// Where to find the firmware tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmiPaths {
	pub entry_point: PathBuf,
	pub table: PathBuf,
	/// directory containing `bios_vendor`, `board_name`, ...
	pub id: PathBuf
}

impl DmiPaths {

	/// Every path relative to a sysfs root, `/sys` for the real thing.
	pub fn with_root(root: impl AsRef<Path>) -> Self {
		let root = root.as_ref();
		Self {
			entry_point: root.join("firmware/dmi/tables/smbios_entry_point"),
			table: root.join("firmware/dmi/tables/DMI"),
			id: root.join("class/dmi/id")
		}
	}
}

impl Default for DmiPaths {
	fn default() -> Self {
		Self::with_root("/sys")
	}
}

/// SMBIOS version, as reported next to the table. Not interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct Version {
	pub major: u8,
	pub minor: u8
}

impl fmt::Display for Version {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}", self.major, self.minor)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Smbios {
	version: Option<Version>,
	table: Vec<Structure>,
	bios: Option<BiosInformation>,
	system: Option<SystemInformation>,
	board: Option<BaseBoardInformation>,
	processor: Option<ProcessorInformation>,
	memory_devices: Vec<MemoryDevice>
}

impl Smbios {

	/// Reads from the default sysfs paths, see [`Smbios::read_with`].
	pub fn read() -> Self {
		Self::read_with(&DmiPaths::default())
	}

	/// Decodes the raw table if available and falls back to the
	/// `dmi/id` strings otherwise.
	pub fn read_with(paths: &DmiPaths) -> Self {
		match Self::read_table(paths) {
			Ok(me) => me,
			Err(e) => {
				debug!("raw smbios table unavailable ({}), using dmi id strings", e);
				Self::from_dmi_id(&paths.id)
			}
		}
	}

	/// Only the raw table, no fallback.
	pub fn read_table(paths: &DmiPaths) -> Result<Self, Error> {
		let entry_point = EntryPoint::read(paths)?;
		let table = Structures::read(&paths.table, entry_point.table_max)?;
		if table.is_empty() {
			return Err(Error::StructuresNotFound)
		}
		Ok(Self::decode(&table, entry_point.major, entry_point.minor))
	}

	/// Decodes a raw structure table. `major` and `minor` are attached
	/// as they are, both 0 means unknown.
	pub fn from_table(raw: impl Into<Vec<u8>>, major: u8, minor: u8) -> Self {
		Self::decode(&Structures::from_bytes(raw.into()), major, minor)
	}

	fn decode(table: &Structures, major: u8, minor: u8) -> Self {
		let mut me = Self::empty(major, minor);

		for stru in table.structures() {
			match Record::from_structure(&stru) {
				Record::Bios(b) => {
					me.bios.get_or_insert(b);
				},
				Record::System(s) => {
					me.system.get_or_insert(s);
				},
				Record::BaseBoard(b) => {
					me.board.get_or_insert(b);
				},
				Record::Processor(p) => {
					me.processor.get_or_insert(p);
				},
				Record::MemoryDevice(m) => me.memory_devices.push(m),
				Record::Generic => {
					trace!("smbios record type {:#04x} kept as generic", stru.kind_code());
				}
			}
			me.table.push(stru);
		}

		me
	}

	fn empty(major: u8, minor: u8) -> Self {
		Self {
			version: (major > 0 || minor > 0)
				.then(|| Version { major, minor }),
			table: vec![],
			bios: None,
			system: None,
			board: None,
			processor: None,
			memory_devices: vec![]
		}
	}

	/// Builds the descriptors from the kernel's `dmi/id` attributes, a
	/// missing attribute is an empty field.
	pub fn from_dmi_id(dir: impl AsRef<Path>) -> Self {
		let dir = dir.as_ref();
		let read = |name: &str| read_first_line(dir.join(name))
			.unwrap_or_default();

		Self::from_platform_strings(PlatformStrings {
			bios_vendor: read("bios_vendor"),
			bios_version: read("bios_version"),
			bios_date: read("bios_date"),
			sys_vendor: read("sys_vendor"),
			product_name: read("product_name"),
			product_version: read("product_version"),
			product_serial: read("product_serial"),
			product_uuid: read("product_uuid"),
			product_family: read("product_family"),
			board_vendor: read("board_vendor"),
			board_name: read("board_name"),
			board_version: read("board_version"),
			board_serial: read("board_serial")
		})
	}

	/// When no table is available. Processor and memory devices stay
	/// empty.
	pub fn from_platform_strings(s: PlatformStrings) -> Self {
		let mut me = Self::empty(0, 0);
		me.bios = Some(BiosInformation::new(
			s.bios_vendor, s.bios_version, s.bios_date
		));
		me.system = Some(SystemInformation::new(
			s.sys_vendor,
			s.product_name,
			s.product_version,
			s.product_serial,
			Uuid::parse_str(s.product_uuid.trim())
				.unwrap_or_else(|_| Uuid::nil()),
			s.product_family
		));
		me.board = Some(BaseBoardInformation::new(
			s.board_vendor, s.board_name, s.board_version, s.board_serial
		));
		me
	}

	pub fn version(&self) -> Option<Version> {
		self.version
	}

	/// Every decoded record in table order, including the ones which
	/// also have a typed descriptor. Empty for platform strings.
	pub fn structures(&self) -> &[Structure] {
		&self.table
	}

	/// The first bios record.
	pub fn bios(&self) -> Option<&BiosInformation> {
		self.bios.as_ref()
	}

	/// The first system record.
	pub fn system(&self) -> Option<&SystemInformation> {
		self.system.as_ref()
	}

	/// The first board record.
	pub fn board(&self) -> Option<&BaseBoardInformation> {
		self.board.as_ref()
	}

	/// The first processor record.
	pub fn processor(&self) -> Option<&ProcessorInformation> {
		self.processor.as_ref()
	}

	/// Every memory device record.
	pub fn memory_devices(&self) -> &[MemoryDevice] {
		&self.memory_devices
	}

	/// The flat summary handed to reporting.
	pub fn report(&self) -> SmbiosReport {
		let (bios_vendor, bios_version) = self.bios()
			.map(|b| (b.vendor.clone(), b.version.clone()))
			.unwrap_or_default();
		let (board_manufacturer, board_name) = self.board()
			.map(|b| (b.manufacturer.clone(), b.product_name.clone()))
			.unwrap_or_default();

		SmbiosReport {
			bios_vendor,
			bios_version,
			board_manufacturer,
			board_name,
			processor_manufacturer: self.processor()
				.map(|p| p.manufacturer.clone()),
			processor_version: self.processor()
				.map(|p| p.version.clone()),
			processor_core_count: self.processor()
				.map(|p| p.core_count),
			processor_thread_count: self.processor()
				.map(|p| p.thread_count),
			memory: self.memory_devices.iter()
				.map(|m| MemoryReport {
					manufacturer: m.manufacturer.clone(),
					part_number: m.part_number.clone(),
					locator: m.device_locator.clone(),
					bank_locator: m.bank_locator.clone(),
					speed: m.speed
				})
				.collect()
		}
	}
}

/// Discrete strings a platform exposes instead of the raw table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformStrings {
	pub bios_vendor: String,
	pub bios_version: String,
	pub bios_date: String,
	pub sys_vendor: String,
	pub product_name: String,
	pub product_version: String,
	pub product_serial: String,
	/// textual uuid, anything unparsable is the nil uuid
	pub product_uuid: String,
	pub product_family: String,
	pub board_vendor: String,
	pub board_name: String,
	pub board_version: String,
	pub board_serial: String
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct SmbiosReport {
	pub bios_vendor: String,
	pub bios_version: String,
	pub board_manufacturer: String,
	pub board_name: String,
	pub processor_manufacturer: Option<String>,
	pub processor_version: Option<String>,
	pub processor_core_count: Option<u8>,
	pub processor_thread_count: Option<u8>,
	pub memory: Vec<MemoryReport>
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct MemoryReport {
	pub manufacturer: String,
	pub part_number: String,
	pub locator: String,
	pub bank_locator: String,
	/// MT/s
	pub speed: u16
}


#[cfg(test)]
mod tests {
	use super::*;

	use std::fs;

	fn record(kind: u8, handle: u16, fields: &[(usize, u8)], len: u8, strings: &[&str]) -> Vec<u8> {
		let mut data = vec![0u8; len as usize];
		data[0] = kind;
		data[1] = len;
		data[2..4].copy_from_slice(&handle.to_be_bytes());
		for &(offset, value) in fields {
			data[offset] = value;
		}
		if strings.is_empty() {
			data.push(0);
		}
		for s in strings {
			data.extend_from_slice(s.as_bytes());
			data.push(0);
		}
		data.push(0);
		data
	}

	fn full_table() -> Vec<u8> {
		let mut raw = vec![];
		raw.extend(record(0x00, 0x0000, &[(0x04, 1), (0x05, 2), (0x08, 3)], 0x12, &["American Megatrends Inc.", "F31o", "12/03/2020"]));
		raw.extend(record(0x01, 0x0001, &[(0x04, 1), (0x05, 2)], 0x1b, &["Gigabyte Technology Co., Ltd.", "X570 AORUS ELITE"]));
		raw.extend(record(0x02, 0x0002, &[(0x04, 1), (0x05, 2)], 0x0f, &["Gigabyte Technology Co., Ltd. ", "X570 AORUS ELITE"]));
		raw.extend(record(0x04, 0x0003, &[(0x07, 1), (0x10, 2), (0x23, 12), (0x24, 12), (0x25, 24)], 0x30, &["Advanced Micro Devices, Inc.", "AMD Ryzen 9 3900X 12-Core Processor"]));
		raw.extend(record(0x11, 0x0010, &[(0x10, 1), (0x11, 2), (0x15, 0x40), (0x16, 0x06), (0x17, 3), (0x1a, 4)], 0x28, &["DIMM 0", "P0 CHANNEL A", "Unknown", "F4-3200C16-16GVK"]));
		raw.extend(record(0x11, 0x0011, &[(0x10, 1), (0x11, 2)], 0x28, &["DIMM 1", "P0 CHANNEL B"]));
		// second bios, must not replace the first one
		raw.extend(record(0x00, 0x0020, &[(0x04, 1)], 0x12, &["Other Vendor"]));
		raw.extend(record(0x7f, 0x00ff, &[], 0x04, &[]));
		raw
	}

	#[test]
	fn minimal_bios_table() {
		let mut raw = vec![0x00, 0x06, 0x00, 0x00, 0x01, 0x02];
		raw.extend_from_slice(b"Acme\0v1.0\0\0");
		raw.extend_from_slice(&[0x7f, 0x04, 0x00, 0x00, 0x00, 0x00]);
		// anything after the end-of-table is ignored
		raw.extend_from_slice(&[0x00, 0x06, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00]);

		let smbios = Smbios::from_table(raw, 0, 0);
		let bios = smbios.bios().unwrap();
		assert_eq!(bios.vendor, "Acme");
		assert_eq!(bios.version, "v1.0");
		assert_eq!(bios.release_date, "");
		assert_eq!(smbios.structures().len(), 2);
		assert_eq!(smbios.structures()[1].kind(), StructureKind::EndOfTable);
		assert!(smbios.version().is_none());
	}

	#[test]
	fn decode_full_table() {
		let smbios = Smbios::from_table(full_table(), 3, 3);
		assert_eq!(smbios.version(), Some(Version { major: 3, minor: 3 }));
		assert_eq!(smbios.version().unwrap().to_string(), "3.3");

		let bios = smbios.bios().unwrap();
		assert_eq!(bios.vendor, "American Megatrends Inc.");
		assert_eq!(bios.version, "F31o");
		assert_eq!(bios.release_date, "12/03/2020");
		assert_eq!(bios.handle, 0);

		let board = smbios.board().unwrap();
		assert_eq!(board.manufacturer, "Gigabyte Technology Co., Ltd.");
		assert_eq!(board.product_name, "X570 AORUS ELITE");
		assert_eq!(board.handle, 0x0002);

		let cpu = smbios.processor().unwrap();
		assert_eq!(cpu.core_count, 12);
		assert_eq!(cpu.thread_count, 24);

		let mem = smbios.memory_devices();
		assert_eq!(mem.len(), 2);
		assert_eq!(mem[0].part_number, "F4-3200C16-16GVK");
		assert_eq!(mem[0].speed, 1600);
		assert_eq!(mem[1].device_locator, "DIMM 1");
		assert_eq!(mem[1].manufacturer, "");

		// the second bios record is kept in the table only
		assert_eq!(smbios.structures().len(), 8);
		assert_eq!(smbios.structures()[6].handle(), 0x0020);
	}

	#[test]
	fn decode_is_idempotent() {
		let a = Smbios::from_table(full_table(), 3, 3);
		let b = Smbios::from_table(full_table(), 3, 3);
		assert_eq!(a, b);
	}

	#[test]
	fn truncated_record_keeps_prefix() {
		let mut raw = full_table();
		let full = Smbios::from_table(raw.clone(), 3, 3);

		// a record claiming more bytes than there are
		let bios_len = record(0x00, 0, &[], 0x12, &["American Megatrends Inc.", "F31o", "12/03/2020"]).len();
		raw.truncate(bios_len);
		raw.extend_from_slice(&[0x01, 0x40, 0x00, 0x01, 0x01, 0x02]);

		let part = Smbios::from_table(raw, 3, 3);
		assert_eq!(part.structures(), &full.structures()[..1]);
		assert_eq!(part.bios(), full.bios());
		assert!(part.system().is_none());
		assert!(part.memory_devices().is_empty());
	}

	#[test]
	fn empty_table() {
		let smbios = Smbios::from_table(vec![], 0, 0);
		assert!(smbios.structures().is_empty());
		assert!(smbios.bios().is_none());
		assert!(smbios.processor().is_none());
	}

	#[test]
	fn report() {
		let report = Smbios::from_table(full_table(), 3, 3).report();
		assert_eq!(report.bios_vendor, "American Megatrends Inc.");
		assert_eq!(report.board_name, "X570 AORUS ELITE");
		assert_eq!(report.processor_core_count, Some(12));
		assert_eq!(report.processor_thread_count, Some(24));
		assert_eq!(report.memory.len(), 2);
		assert_eq!(report.memory[0].locator, "DIMM 0");
		assert_eq!(report.memory[0].bank_locator, "P0 CHANNEL A");
	}

	fn write(dir: &Path, name: &str, content: &str) {
		fs::write(dir.join(name), content).unwrap();
	}

	#[test]
	fn dmi_id_fallback() {
		let root = tempfile::tempdir().unwrap();
		let paths = DmiPaths::with_root(root.path());
		fs::create_dir_all(&paths.id).unwrap();
		write(&paths.id, "bios_vendor", "LENOVO\n");
		write(&paths.id, "bios_version", "N2HET65W (1.48 )\n");
		write(&paths.id, "board_vendor", "LENOVO\n");
		write(&paths.id, "board_name", "20QDCTO1WW\n");
		write(&paths.id, "product_uuid", "00112233-4455-6677-8899-aabbccddeeff\n");

		let smbios = Smbios::read_with(&paths);
		assert!(smbios.structures().is_empty());
		assert!(smbios.version().is_none());

		let bios = smbios.bios().unwrap();
		assert_eq!(bios.vendor, "LENOVO");
		assert_eq!(bios.version, "N2HET65W (1.48 )");
		assert_eq!(bios.release_date, "");

		let system = smbios.system().unwrap();
		assert_eq!(system.manufacturer, "");
		assert_eq!(system.uuid.to_string(), "00112233-4455-6677-8899-aabbccddeeff");

		let board = smbios.board().unwrap();
		assert_eq!(board.product_name, "20QDCTO1WW");
		assert_eq!(board.version, "");

		assert!(smbios.processor().is_none());
		assert!(smbios.memory_devices().is_empty());
	}

	#[test]
	fn reads_raw_table() {
		let root = tempfile::tempdir().unwrap();
		let paths = DmiPaths::with_root(root.path());
		fs::create_dir_all(paths.table.parent().unwrap()).unwrap();

		let table = full_table();
		let mut ep = vec![];
		ep.extend_from_slice(b"_SM3_");
		ep.extend_from_slice(&[0x00, 0x18, 0x03, 0x04, 0x00, 0x01, 0x00]);
		ep.extend_from_slice(&(table.len() as u32).to_le_bytes());
		ep.extend_from_slice(&0u64.to_le_bytes());
		fs::write(&paths.entry_point, ep).unwrap();
		fs::write(&paths.table, &table).unwrap();

		let smbios = Smbios::read_table(&paths).unwrap();
		assert_eq!(smbios, Smbios::from_table(table, 3, 4));
	}

	#[test]
	fn table_bigger_than_entry_point() {
		let root = tempfile::tempdir().unwrap();
		let paths = DmiPaths::with_root(root.path());
		fs::create_dir_all(paths.table.parent().unwrap()).unwrap();

		let mut ep = vec![];
		ep.extend_from_slice(b"_SM3_");
		ep.extend_from_slice(&[0x00, 0x18, 0x03, 0x04, 0x00, 0x01, 0x00]);
		ep.extend_from_slice(&4u32.to_le_bytes());
		ep.extend_from_slice(&0u64.to_le_bytes());
		fs::write(&paths.entry_point, ep).unwrap();
		fs::write(&paths.table, full_table()).unwrap();

		assert_eq!(
			Smbios::read_table(&paths).unwrap_err(),
			Error::StructuresMalformed
		);
	}
}
