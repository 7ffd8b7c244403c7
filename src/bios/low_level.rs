/// Raw SMBIOS access, see https://www.dmtf.org/sites/default/files/standards/documents/DSP0134_3.4.0.pdf
///
/// The table is walked record by record, every record being a formatted
/// area (header included) followed by a string-set. Decoding never fails,
/// a record which would reach past the end of the buffer simply ends the
/// walk.
///
/// The access method on linux is via the files
/// /sys/firmware/dmi/tables/{smbios_entry_point, DMI}

use super::DmiPaths;
use crate::util::latin1_to_string;

use std::{fs, iter};
use std::path::Path;
use simple_bytes::{Bytes, BytesRead, BytesReadRef};
use memchr::memchr;
use tracing::{debug, trace};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// Meaning the file could not be found or we don't have enough permission
	#[error("smbios entry point not found")]
	EntryPointNotFound,
	/// Neither a 2.1 (`_SM_`) nor a 3.0 (`_SM3_`) anchor
	#[error("smbios entry point anchor string incorrect")]
	AnchorStringIncorrect,
	/// If something is not correct with the entry point struct.
	/// Note the checksum is ignored.
	#[error("smbios entry point malformed")]
	EntryPointMalformed,
	/// Meaning the file DMI could not be found or we don't have enough
	/// permissions
	#[error("smbios structure table not found")]
	StructuresNotFound,
	/// The table is bigger than the entry point allows
	#[error("smbios structure table malformed")]
	StructuresMalformed
}

impl From<Error> for std::io::Error {
	fn from(e: Error) -> Self {
		let kind = match e {
			Error::EntryPointNotFound |
			Error::StructuresNotFound => std::io::ErrorKind::NotFound,
			_ => std::io::ErrorKind::Other
		};
		Self::new(kind, e)
	}
}

const ANCHOR_STRING_2: [u8; 4] = *b"_SM_";
const ANCHOR_STRING_3: [u8; 5] = *b"_SM3_";
const ENTRY_POINT_2_MIN_LEN: usize = 4 + 1 + 1 + 1 + 1 + 2 + 1 + 5 + 5 + 1
	+ 2 + 4 + 2 + 1;
const ENTRY_POINT_3_MIN_LEN: usize = 5 + 1 + 1 + 1 + 1 + 1 + 1 + 1 + 4 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPointKind {
	/// 32-bit entry point, `_SM_`
	Smbios2,
	/// 64-bit entry point, `_SM3_`
	Smbios3
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
	pub kind: EntryPointKind,
	/// Major SMBIOS version implemented by the table
	/// structures (for example, the value is 0Ah for revision 10.22 and
	/// 02h for revision 2.1)
	pub major: u8,
	/// Minor SMBIOS version implemented by the table
	/// structures (for example, the value is 16h for revision 10.22 and
	/// 01h for revision 2.1)
	pub minor: u8,
	/// For 3.0 the maximum size of the structure table, for 2.1 the exact
	/// length. The actual size is guaranteed to be less or equal.
	pub table_max: u32
}

impl EntryPoint {

	/// Only the anchor string is checked.
	pub fn read(paths: &DmiPaths) -> Result<Self> {
		let buf = fs::read(&paths.entry_point)
			.map_err(|_| Error::EntryPointNotFound)?;
		Self::from_bytes(&buf)
	}

	pub fn from_bytes(buf: &[u8]) -> Result<Self> {
		if buf.starts_with(&ANCHOR_STRING_3) {
			if buf.len() < ENTRY_POINT_3_MIN_LEN {
				return Err(Error::EntryPointMalformed)
			}
			let mut bytes = Bytes::from(buf);
			let _anchor = bytes.read(ANCHOR_STRING_3.len());
			let _checksum = bytes.read_le_u8();
			let _len = bytes.read_le_u8();
			let major = bytes.read_le_u8();
			let minor = bytes.read_le_u8();
			let _docrev = bytes.read_le_u8();
			let _revision = bytes.read_le_u8();
			let _reserved = bytes.read_le_u8();

			Ok(Self {
				kind: EntryPointKind::Smbios3,
				major,
				minor,
				table_max: bytes.read_le_u32()
			})
		} else if buf.starts_with(&ANCHOR_STRING_2) {
			if buf.len() < ENTRY_POINT_2_MIN_LEN {
				return Err(Error::EntryPointMalformed)
			}
			let mut bytes = Bytes::from(buf);
			let _anchor = bytes.read(ANCHOR_STRING_2.len());
			let _checksum = bytes.read_le_u8();
			let _len = bytes.read_le_u8();
			let major = bytes.read_le_u8();
			let minor = bytes.read_le_u8();
			let _max_structure_size = bytes.read_le_u16();
			let _revision = bytes.read_le_u8();
			let _formatted = bytes.read(5);
			if bytes.read(5) != b"_DMI_" {
				return Err(Error::EntryPointMalformed)
			}
			let _intermediate_checksum = bytes.read_le_u8();

			Ok(Self {
				kind: EntryPointKind::Smbios2,
				major,
				minor,
				table_max: bytes.read_le_u16() as u32
			})
		} else {
			Err(Error::AnchorStringIncorrect)
		}
	}
}

macro_rules! structure_kind {
	($($name:ident = $val:expr),*) => {
		#[derive(Debug, Clone, Copy, PartialEq, Eq)]
		pub enum StructureKind {
			$($name),*,
			Unknown
		}

		impl StructureKind {
			pub fn from_u8(num: u8) -> Self {
				match num {
					$($val => Self::$name),*,
					_ => Self::Unknown
				}
			}
		}
	}
}

structure_kind! {
	BiosInformation = 0x00,
	SystemInformation = 0x01,
	BaseBoardInformation = 0x02,
	SystemEnclosure = 0x03,
	ProcessorInformation = 0x04,
	CacheInformation = 0x07,
	SystemSlots = 0x09,
	PhysicalMemoryArray = 0x10,
	MemoryDevice = 0x11,
	MemoryArrayMappedAddress = 0x13,
	SystemBootInformation = 0x20,
	EndOfTable = 0x7f
}

/// type, length and handle
const STRUCTURE_HEADER_LEN: usize = 1 + 1 + 2;

/// One record of the table.
///
/// `data` is the formatted area including the header, so offsets used by
/// the accessors are the ones DMTF documents for each type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
	kind: u8,
	handle: u16,
	data: Vec<u8>,
	strings: Vec<String>
}

impl Structure {

	pub fn new(kind: u8, handle: u16, data: Vec<u8>, strings: Vec<String>) -> Self {
		Self { kind, handle, data, strings }
	}

	/// Returns `None` if less than a header and one terminating byte are
	/// left or if the formatted area would reach past the end.
	fn read<'a>(reader: &mut impl BytesReadRef<'a>) -> Option<Self> {
		let remaining = reader.remaining_ref();
		if remaining.len() <= STRUCTURE_HEADER_LEN {
			return None
		}

		let kind = remaining[0];
		let len = remaining[1] as usize;
		// the handle is stored big-endian in this representation
		let handle = u16::from_be_bytes([remaining[2], remaining[3]]);

		if len > remaining.len() {
			debug!(
				"smbios table truncated: record {:#04x} wants {} bytes, {} left",
				kind, len, remaining.len()
			);
			return None
		}

		let data = reader.read_ref(len).to_vec();
		let strings = read_strings(reader);

		Some(Self { kind, handle, data, strings })
	}

	/// The raw type code.
	pub fn kind_code(&self) -> u8 {
		self.kind
	}

	pub fn kind(&self) -> StructureKind {
		StructureKind::from_u8(self.kind)
	}

	pub fn handle(&self) -> u16 {
		self.handle
	}

	pub fn data(&self) -> &[u8] {
		&self.data
	}

	pub fn strings(&self) -> &[String] {
		&self.strings
	}

	/// Returns 0 if `offset` is outside of the formatted area.
	pub fn get_byte(&self, offset: usize) -> u8 {
		self.data.get(offset)
			.copied()
			.unwrap_or(0)
	}

	/// Little-endian word, 0 if any of the two bytes is outside of the
	/// formatted area.
	pub fn get_word(&self, offset: usize) -> u16 {
		match self.bytes(offset, 2) {
			Some(b) => Bytes::from(b).read_le_u16(),
			None => 0
		}
	}

	/// `len` bytes starting at `offset` if all of them are present.
	pub fn bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
		self.data.get(offset..offset.checked_add(len)?)
	}

	/// Resolves the 1-based string number stored at `offset`.
	///
	/// An absent byte, string number 0 or a number past the string-set
	/// all resolve to an empty string.
	pub fn get_str(&self, offset: usize) -> &str {
		match self.get_byte(offset) as usize {
			0 => "",
			num => self.strings.get(num - 1)
				.map(String::as_str)
				.unwrap_or("")
		}
	}
}

// An empty string-set is a single 0 followed by the terminating 0,
// otherwise every string is null terminated with one more 0 at the end.
fn read_strings<'a>(reader: &mut impl BytesReadRef<'a>) -> Vec<String> {
	let rest = reader.remaining_ref();
	let mut strings = vec![];
	let mut pos = 0;

	if rest.first() == Some(&0) {
		pos += 1;
	}

	while pos < rest.len() && rest[pos] != 0 {
		let end = memchr(0, &rest[pos..])
			.map(|i| pos + i)
			.unwrap_or(rest.len());
		strings.push(latin1_to_string(&rest[pos..end]));
		pos = end + 1;
	}
	// terminating null
	pos += 1;

	let _consumed = reader.read_ref(pos.min(rest.len()));
	strings
}

/// The raw structure table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Structures {
	bytes: Vec<u8>
}

impl Structures {

	pub fn from_bytes(bytes: Vec<u8>) -> Self {
		Self { bytes }
	}

	/// if table_max == 0 the size of DMI is just used
	pub fn read(path: impl AsRef<Path>, table_max: u32) -> Result<Self> {
		let buf = fs::read(path)
			.map_err(|_| Error::StructuresNotFound)?;

		if table_max != 0 && buf.len() > table_max as usize {
			return Err(Error::StructuresMalformed)
		}

		Ok(Self { bytes: buf })
	}

	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Walks the table until the end-of-table record (which is still
	/// returned) or until the rest of the buffer can't hold a record.
	pub fn structures(&self) -> impl Iterator<Item=Structure> + '_ {
		let mut bytes = Bytes::from(self.bytes.as_slice());
		let mut finished = false;
		iter::from_fn(move || {
			if finished {
				return None
			}
			let stru = Structure::read(&mut bytes)?;
			if stru.kind() == StructureKind::EndOfTable {
				trace!("smbios end-of-table at handle {:#06x}", stru.handle);
				finished = true;
			}
			Some(stru)
		})
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	fn structure(data: &[u8], strings: &[&str]) -> Structure {
		Structure::new(
			data.first().copied().unwrap_or(0),
			0,
			data.to_vec(),
			strings.iter().map(|s| s.to_string()).collect()
		)
	}

	#[test]
	fn field_reader_out_of_bounds() {
		let s = structure(&[0x00, 0x06, 0x00, 0x00, 0x01, 0x02], &["a", "b"]);
		assert_eq!(s.get_byte(5), 0x02);
		assert_eq!(s.get_byte(6), 0);
		assert_eq!(s.get_byte(usize::MAX), 0);
		assert_eq!(s.get_word(4), 0x0201);
		assert_eq!(s.get_word(5), 0);
		assert_eq!(s.get_word(usize::MAX), 0);
		assert!(s.bytes(usize::MAX, 2).is_none());
	}

	#[test]
	fn string_numbers() {
		let s = structure(&[0x00, 0x08, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03], &["a", "b"]);
		assert_eq!(s.get_str(4), "");
		assert_eq!(s.get_str(5), "a");
		assert_eq!(s.get_str(6), "b");
		// past the string-set
		assert_eq!(s.get_str(7), "");
		// past the formatted area
		assert_eq!(s.get_str(8), "");

		// every number on a string-less record
		for num in 0..=u8::MAX {
			let s = structure(&[0x00, 0x05, 0x00, 0x00, num], &[]);
			assert_eq!(s.get_str(4), "");
		}
	}

	fn table() -> Vec<u8> {
		let mut raw = vec![];
		// bios, two strings
		raw.extend_from_slice(&[0x00, 0x06, 0x12, 0x34, 0x01, 0x02]);
		raw.extend_from_slice(b"Acme\0v1.0\0\0");
		// unknown oem record without strings
		raw.extend_from_slice(&[0x88, 0x05, 0x00, 0x01, 0xaa, 0x00, 0x00]);
		// end of table
		raw.extend_from_slice(&[0x7f, 0x04, 0x00, 0x02, 0x00, 0x00]);
		raw
	}

	#[test]
	fn walk_table() {
		let table = Structures::from_bytes(table());
		let all: Vec<_> = table.structures().collect();
		assert_eq!(all.len(), 3);

		assert_eq!(all[0].kind(), StructureKind::BiosInformation);
		assert_eq!(all[0].handle(), 0x1234);
		assert_eq!(all[0].data().len(), 6);
		assert_eq!(all[0].strings(), ["Acme", "v1.0"]);

		assert_eq!(all[1].kind(), StructureKind::Unknown);
		assert_eq!(all[1].kind_code(), 0x88);
		assert_eq!(all[1].get_byte(4), 0xaa);
		assert!(all[1].strings().is_empty());

		assert_eq!(all[2].kind(), StructureKind::EndOfTable);
	}

	#[test]
	fn stops_at_end_of_table() {
		let mut raw = table();
		raw.extend_from_slice(&[0x00, 0x04, 0x00, 0x03, 0x00, 0x00]);
		let table = Structures::from_bytes(raw);
		assert_eq!(table.structures().count(), 3);
	}

	#[test]
	fn truncated_is_prefix() {
		let raw = table();
		let full: Vec<_> = Structures::from_bytes(raw.clone())
			.structures()
			.collect();

		// record boundaries
		for (cut, expected) in [(0, 0), (17, 1), (24, 2)] {
			let part: Vec<_> = Structures::from_bytes(raw[..cut].to_vec())
				.structures()
				.collect();
			assert_eq!(part.len(), expected);
			assert_eq!(part[..], full[..expected]);
		}

		// cut inside the formatted area of the second record
		let part: Vec<_> = Structures::from_bytes(raw[..20].to_vec())
			.structures()
			.collect();
		assert_eq!(part[..], full[..1]);
	}

	#[test]
	fn latin1_strings() {
		let raw = [0x01, 0x05, 0x00, 0x00, 0x01, b'M', 0xfc, b'n', 0x00, 0x00];
		let table = Structures::from_bytes(raw.to_vec());
		let s = table.structures().next().unwrap();
		assert_eq!(s.get_str(4), "M\u{fc}n");
	}

	#[test]
	fn entry_point_3() {
		let mut raw = vec![];
		raw.extend_from_slice(b"_SM3_");
		raw.extend_from_slice(&[0x00, 0x18, 0x03, 0x02, 0x00, 0x01, 0x00]);
		raw.extend_from_slice(&0x1000u32.to_le_bytes());
		raw.extend_from_slice(&0u64.to_le_bytes());
		let ep = EntryPoint::from_bytes(&raw).unwrap();
		assert_eq!(ep.kind, EntryPointKind::Smbios3);
		assert_eq!((ep.major, ep.minor), (3, 2));
		assert_eq!(ep.table_max, 0x1000);
	}

	#[test]
	fn entry_point_2() {
		let mut raw = vec![];
		raw.extend_from_slice(b"_SM_");
		raw.extend_from_slice(&[0x00, 0x1f, 0x02, 0x08]);
		raw.extend_from_slice(&[0x00, 0x01, 0x00]);
		raw.extend_from_slice(&[0; 5]);
		raw.extend_from_slice(b"_DMI_");
		raw.push(0x00);
		raw.extend_from_slice(&0x0800u16.to_le_bytes());
		raw.extend_from_slice(&[0; 4 + 2 + 1]);
		let ep = EntryPoint::from_bytes(&raw).unwrap();
		assert_eq!(ep.kind, EntryPointKind::Smbios2);
		assert_eq!((ep.major, ep.minor), (2, 8));
		assert_eq!(ep.table_max, 0x0800);
	}

	#[test]
	fn entry_point_errors() {
		assert_eq!(
			EntryPoint::from_bytes(b"_XX_ nothing here"),
			Err(Error::AnchorStringIncorrect)
		);
		assert_eq!(
			EntryPoint::from_bytes(b"_SM3_\0\0"),
			Err(Error::EntryPointMalformed)
		);
	}
}
