//! Typed views of the records we care about.
//!
//! Every descriptor can be built from a decoded [`Structure`] or directly
//! from strings the platform hands out, the fields mean the same in both
//! cases. Absent data is an empty string or 0.

use super::low_level::{Structure, StructureKind};

use uuid::Uuid;

#[cfg(feature = "serde")]
use serde1::Serialize;

/// BIOS Information (Type 0).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct BiosInformation {
	pub handle: u16,
	pub vendor: String,
	/// Free-form, may contain core and OEM version information.
	pub version: String,
	/// mm/dd/yy or mm/dd/yyyy
	pub release_date: String
}

impl BiosInformation {

	pub fn new(vendor: String, version: String, release_date: String) -> Self {
		Self { handle: 0, vendor, version, release_date }
	}

	pub fn from_structure(stru: &Structure) -> Self {
		debug_assert_eq!(stru.kind(), StructureKind::BiosInformation);

		Self {
			handle: stru.handle(),
			vendor: stru.get_str(0x04).to_string(),
			version: stru.get_str(0x05).to_string(),
			release_date: stru.get_str(0x08).to_string()
		}
	}
}

/// System Information (Type 1).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct SystemInformation {
	pub handle: u16,
	pub manufacturer: String,
	pub product_name: String,
	pub version: String,
	pub serial_number: String,
	/// nil if not present
	#[cfg_attr(feature = "serde", serde(serialize_with = "serialize_uuid"))]
	pub uuid: Uuid,
	/// A family refers to a set of computers that are similar but not
	/// identical from a hardware or software point of view.
	pub family: String
}

impl SystemInformation {

	pub fn new(
		manufacturer: String,
		product_name: String,
		version: String,
		serial_number: String,
		uuid: Uuid,
		family: String
	) -> Self {
		Self {
			handle: 0, manufacturer, product_name, version, serial_number,
			uuid, family
		}
	}

	pub fn from_structure(stru: &Structure) -> Self {
		debug_assert_eq!(stru.kind(), StructureKind::SystemInformation);

		Self {
			handle: stru.handle(),
			manufacturer: stru.get_str(0x04).to_string(),
			product_name: stru.get_str(0x05).to_string(),
			version: stru.get_str(0x06).to_string(),
			serial_number: stru.get_str(0x07).to_string(),
			uuid: stru.bytes(0x08, 16)
				.map(uuid_from_smbios)
				.unwrap_or_else(Uuid::nil),
			family: stru.get_str(0x1a).to_string()
		}
	}
}

// the first three fields are little-endian, the rest is in network order
fn uuid_from_smbios(raw: &[u8]) -> Uuid {
	let mut bytes = [0u8; 16];
	bytes.copy_from_slice(raw);
	bytes[0..4].reverse();
	bytes[4..6].reverse();
	bytes[6..8].reverse();
	Uuid::from_bytes(bytes)
}

#[cfg(feature = "serde")]
fn serialize_uuid<S>(uuid: &Uuid, s: S) -> Result<S::Ok, S::Error>
where S: serde1::Serializer {
	s.collect_str(uuid)
}

/// Baseboard (or Module) Information (Type 2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct BaseBoardInformation {
	pub handle: u16,
	pub manufacturer: String,
	pub product_name: String,
	pub version: String,
	pub serial_number: String
}

impl BaseBoardInformation {

	pub fn new(
		manufacturer: String,
		product_name: String,
		version: String,
		serial_number: String
	) -> Self {
		Self { handle: 0, manufacturer, product_name, version, serial_number }
	}

	pub fn from_structure(stru: &Structure) -> Self {
		debug_assert_eq!(stru.kind(), StructureKind::BaseBoardInformation);

		Self {
			handle: stru.handle(),
			manufacturer: trimmed(stru, 0x04),
			product_name: trimmed(stru, 0x05),
			version: trimmed(stru, 0x06),
			serial_number: trimmed(stru, 0x07)
		}
	}
}

/// Processor Information (Type 4).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct ProcessorInformation {
	pub handle: u16,
	pub manufacturer: String,
	pub version: String,
	/// MHz, 0 if unknown
	pub external_clock: u16,
	/// MHz, the maximum the socket supports
	pub max_speed: u16,
	/// MHz, at boot
	pub current_speed: u16,
	pub core_count: u8,
	pub core_enabled: u8,
	pub thread_count: u8
}

impl ProcessorInformation {

	pub fn from_structure(stru: &Structure) -> Self {
		debug_assert_eq!(stru.kind(), StructureKind::ProcessorInformation);

		Self {
			handle: stru.handle(),
			manufacturer: trimmed(stru, 0x07),
			version: trimmed(stru, 0x10),
			external_clock: stru.get_word(0x12),
			max_speed: stru.get_word(0x14),
			current_speed: stru.get_word(0x16),
			core_count: stru.get_byte(0x23),
			core_enabled: stru.get_byte(0x24),
			thread_count: stru.get_byte(0x25)
		}
	}
}

/// Memory Device (Type 17), one per socket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct MemoryDevice {
	pub handle: u16,
	/// Raw size word: 0 empty socket, FFFFh unknown, bit 15 set means the
	/// value is in KB instead of MB.
	pub size: u16,
	/// for example `DIMM_A1`
	pub device_locator: String,
	/// for example `BANK 0`
	pub bank_locator: String,
	/// MT/s
	pub speed: u16,
	pub manufacturer: String,
	pub serial_number: String,
	pub part_number: String
}

impl MemoryDevice {

	pub fn from_structure(stru: &Structure) -> Self {
		debug_assert_eq!(stru.kind(), StructureKind::MemoryDevice);

		Self {
			handle: stru.handle(),
			size: stru.get_word(0x0c),
			device_locator: trimmed(stru, 0x10),
			bank_locator: trimmed(stru, 0x11),
			speed: stru.get_word(0x15),
			manufacturer: trimmed(stru, 0x17),
			serial_number: trimmed(stru, 0x18),
			part_number: trimmed(stru, 0x1a)
		}
	}

	/// Size in MB, `None` for an unknown size.
	pub fn size_mb(&self) -> Option<u32> {
		match self.size {
			0xffff => None,
			// 7FFFh means the real size is in the extended size field
			0x7fff => None,
			s if s & 0x8000 != 0 => Some((s & 0x7fff) as u32 / 1024),
			s => Some(s as u32)
		}
	}
}

fn trimmed(stru: &Structure, offset: usize) -> String {
	stru.get_str(offset).trim().to_string()
}

/// A decoded record, typed if we know its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
	Bios(BiosInformation),
	System(SystemInformation),
	BaseBoard(BaseBoardInformation),
	Processor(ProcessorInformation),
	MemoryDevice(MemoryDevice),
	/// Every other type, including the end-of-table marker.
	Generic
}

impl Record {

	pub fn from_structure(stru: &Structure) -> Self {
		match stru.kind() {
			StructureKind::BiosInformation => {
				Self::Bios(BiosInformation::from_structure(stru))
			},
			StructureKind::SystemInformation => {
				Self::System(SystemInformation::from_structure(stru))
			},
			StructureKind::BaseBoardInformation => {
				Self::BaseBoard(BaseBoardInformation::from_structure(stru))
			},
			StructureKind::ProcessorInformation => {
				Self::Processor(ProcessorInformation::from_structure(stru))
			},
			StructureKind::MemoryDevice => {
				Self::MemoryDevice(MemoryDevice::from_structure(stru))
			},
			_ => Self::Generic
		}
	}
}
