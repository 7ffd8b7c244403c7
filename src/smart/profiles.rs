//! Drive families and what their attributes mean.
//!
//! The built-in list is ordered, earlier profiles win. The generic hard
//! disk profile is not part of that list, it is the fallback used when no
//! other profile matches.

use super::{AttributeValue, ChannelKey, SensorKind};
use super::attribute::AttributeDescriptor;
use super::attribute::conversions::*;

use std::fmt;
use std::sync::Arc;

/// A sensor computed from several attributes instead of being bound to
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedSensor {
	pub key: ChannelKey,
	pub name: &'static str
}

/// Extra sensors of a profile, updated after the attribute bound ones.
pub trait DerivedSensors: fmt::Debug + Send + Sync {
	/// The sensors this hook provides, created when the drive is set up.
	fn sensors(&self) -> Vec<DerivedSensor>;

	/// New values from the attributes just read. A sensor whose inputs
	/// are missing gets `None`.
	fn derive(&self, values: &[AttributeValue]) -> Vec<(ChannelKey, Option<f32>)>;
}

pub struct DeviceProfile {
	name: &'static str,
	name_prefixes: Vec<&'static str>,
	required_attributes: Vec<u8>,
	attributes: Vec<AttributeDescriptor>,
	derived: Option<Box<dyn DerivedSensors>>
}

impl DeviceProfile {

	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			name_prefixes: vec![],
			required_attributes: vec![],
			attributes: vec![],
			derived: None
		}
	}

	/// Model name prefixes, an empty prefix matches every model.
	pub fn prefixes(mut self, prefixes: &[&'static str]) -> Self {
		self.name_prefixes = prefixes.to_vec();
		self
	}

	/// Attribute ids which all need to be reported.
	pub fn requires(mut self, ids: &[u8]) -> Self {
		self.required_attributes = ids.to_vec();
		self
	}

	pub fn attributes(mut self, attributes: Vec<AttributeDescriptor>) -> Self {
		self.attributes = attributes;
		self
	}

	pub fn derived(mut self, derived: impl DerivedSensors + 'static) -> Self {
		self.derived = Some(Box::new(derived));
		self
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn name_prefixes(&self) -> &[&'static str] {
		&self.name_prefixes
	}

	pub fn required_attributes(&self) -> &[u8] {
		&self.required_attributes
	}

	/// In declaration order.
	pub fn attribute_descriptors(&self) -> &[AttributeDescriptor] {
		&self.attributes
	}

	pub fn derived_sensors(&self) -> Option<&dyn DerivedSensors> {
		self.derived.as_deref()
	}

	/// True if every required id is in `values`, also if none is required.
	pub fn has_required(&self, values: &[AttributeValue]) -> bool {
		self.required_attributes.iter()
			.all(|id| values.iter().any(|v| v.identifier == *id))
	}

	/// Case-sensitive prefix match against the model name.
	pub fn matches_name(&self, model: &str) -> bool {
		self.name_prefixes.iter()
			.any(|prefix| model.starts_with(prefix))
	}
}

impl fmt::Debug for DeviceProfile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DeviceProfile")
			.field("name", &self.name)
			.field("name_prefixes", &self.name_prefixes)
			.field("required_attributes", &self.required_attributes)
			.field("attributes", &self.attributes.len())
			.field("derived", &self.derived)
			.finish()
	}
}

/// Ordered candidates plus the fallback. Build it once and hand it to
/// every drive.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
	candidates: Vec<Arc<DeviceProfile>>,
	fallback: Arc<DeviceProfile>
}

impl ProfileRegistry {

	pub fn new(candidates: Vec<DeviceProfile>, fallback: DeviceProfile) -> Self {
		Self {
			candidates: candidates.into_iter().map(Arc::new).collect(),
			fallback: Arc::new(fallback)
		}
	}

	/// Plextor, Intel, Sandforce, Indilinx, Samsung and Micron SSDs with a
	/// generic hard disk as fallback.
	pub fn builtin() -> Self {
		Self::new(
			vec![plextor(), intel(), sandforce(), indilinx(), samsung(), micron()],
			generic_hard_disk()
		)
	}

	/// In priority order.
	pub fn candidates(&self) -> &[Arc<DeviceProfile>] {
		&self.candidates
	}

	pub fn fallback(&self) -> &Arc<DeviceProfile> {
		&self.fallback
	}
}

impl Default for ProfileRegistry {
	fn default() -> Self {
		Self::builtin()
	}
}

fn attr(id: u8, name: &'static str) -> AttributeDescriptor {
	AttributeDescriptor::new(id, name)
}

fn temperature_attr(id: u8, name: &'static str) -> AttributeDescriptor {
	attr(id, name)
		.convert_with(temperature)
		.sensor(SensorKind::Temperature, 0)
		.parameters(&TEMPERATURE_OFFSET)
}

fn counter(id: u8, name: &'static str) -> AttributeDescriptor {
	attr(id, name).convert_with(raw_to_int)
}

/// Fallback for everything else, spinning disks mostly.
pub fn generic_hard_disk() -> DeviceProfile {
	DeviceProfile::new("Generic Hard Disk")
		.prefixes(&[""])
		.attributes(vec![
			attr(0x01, "Read Error Rate"),
			attr(0x02, "Throughput Performance"),
			attr(0x03, "Spin-Up Time"),
			counter(0x04, "Start/Stop Count"),
			attr(0x05, "Reallocated Sectors Count"),
			attr(0x06, "Read Channel Margin"),
			attr(0x07, "Seek Error Rate"),
			attr(0x08, "Seek Time Performance"),
			counter(0x09, "Power-On Hours (POH)"),
			attr(0x0a, "Spin Retry Count"),
			attr(0x0b, "Recalibration Retries"),
			counter(0x0c, "Power Cycle Count"),
			attr(0x0d, "Soft Read Error Rate"),
			attr(0xb8, "End-to-End error"),
			attr(0xbb, "Reported Uncorrectable Errors"),
			attr(0xbc, "Command Timeout"),
			attr(0xbd, "High Fly Writes"),
			// both temperatures share the channel, the first one reported wins
			temperature_attr(0xbe, "Airflow Temperature"),
			attr(0xbf, "G-sense Error Rate"),
			attr(0xc0, "Power-off Retract Count"),
			attr(0xc1, "Load Cycle Count"),
			temperature_attr(0xc2, "Temperature"),
			attr(0xc3, "Hardware ECC Recovered"),
			attr(0xc4, "Reallocation Event Count"),
			attr(0xc5, "Current Pending Sector Count"),
			attr(0xc6, "Uncorrectable Sector Count"),
			attr(0xc7, "UltraDMA CRC Error Count"),
			attr(0xc8, "Write Error Rate"),
			attr(0xca, "Data Address Mark errors"),
			attr(0xdc, "Disk Shift"),
			temperature_attr(0xe7, "Temperature"),
			attr(0xf0, "Head Flying Hours"),
			counter(0xf1, "Total LBAs Written"),
			counter(0xf2, "Total LBAs Read")
		])
}

fn plextor() -> DeviceProfile {
	DeviceProfile::new("Plextor SSD")
		.prefixes(&["PLEXTOR"])
		.requires(&[0xf1, 0xf2])
		.attributes(vec![
			counter(0x09, "Power-On Hours (POH)"),
			counter(0x0c, "Power Cycle Count"),
			attr(0xf1, "Host Writes")
				.convert_with(raw_32mib_to_gb)
				.sensor(SensorKind::Data, 0),
			attr(0xf2, "Host Reads")
				.convert_with(raw_32mib_to_gb)
				.sensor(SensorKind::Data, 1)
		])
}

fn intel() -> DeviceProfile {
	DeviceProfile::new("Intel SSD")
		.prefixes(&["INTEL SSD"])
		.requires(&[0xe8, 0xe9])
		.attributes(vec![
			attr(0x01, "Read Error Rate"),
			attr(0x03, "Spin-Up Time"),
			counter(0x04, "Start/Stop Count"),
			attr(0x05, "Reallocated Sectors Count"),
			counter(0x09, "Power-On Hours (POH)"),
			counter(0x0c, "Power Cycle Count"),
			attr(0xaa, "Available Reserved Space"),
			attr(0xab, "Program Fail Count"),
			attr(0xac, "Erase Fail Count"),
			attr(0xae, "Unsafe Shutdown Count"),
			attr(0xb8, "End-to-End error"),
			temperature_attr(0xbe, "Temperature"),
			attr(0xc0, "Unsafe Shutdown Count"),
			attr(0xe1, "Host Writes")
				.convert_with(raw_32mib_to_gb)
				.sensor(SensorKind::Data, 0),
			attr(0xe8, "Remaining Life")
				.convert_with(current)
				.sensor(SensorKind::Level, 0),
			attr(0xe9, "Media Wearout Indicator"),
			attr(0xf1, "Host Writes")
				.convert_with(raw_32mib_to_gb)
				.sensor(SensorKind::Data, 0),
			attr(0xf2, "Host Reads")
				.convert_with(raw_32mib_to_gb)
				.sensor(SensorKind::Data, 1)
		])
}

fn sandforce() -> DeviceProfile {
	DeviceProfile::new("SandForce SSD")
		.prefixes(&[""])
		.requires(&[0xab, 0xb1])
		.attributes(vec![
			attr(0x01, "Raw Read Error Rate"),
			counter(0x05, "Retired Block Count"),
			counter(0x09, "Power-On Hours (POH)"),
			counter(0x0c, "Power Cycle Count"),
			attr(0xab, "Program Fail Count"),
			attr(0xac, "Erase Fail Count"),
			counter(0xae, "Unexpected Power Loss Count"),
			attr(0xb1, "Wear Range Delta"),
			attr(0xb5, "Alternative Program Fail Count"),
			attr(0xb6, "Alternative Erase Fail Count"),
			attr(0xbb, "Uncorrectable Error Count"),
			attr(0xc2, "Temperature")
				.convert_with(current_temperature)
				.sensor(SensorKind::Temperature, 0)
				.parameters(&TEMPERATURE_OFFSET)
				.hidden(),
			attr(0xc3, "Unrecovered ECC"),
			counter(0xc4, "Reallocation Event Count"),
			attr(0xe7, "Remaining Life")
				.convert_with(current)
				.sensor(SensorKind::Level, 0),
			attr(0xe9, "Controller Writes to NAND")
				.convert_with(raw_to_int)
				.sensor(SensorKind::Data, 0),
			attr(0xea, "Host Writes to Controller")
				.convert_with(raw_to_int)
				.sensor(SensorKind::Data, 1),
			attr(0xf1, "Host Writes")
				.convert_with(raw_to_int)
				.sensor(SensorKind::Data, 1),
			attr(0xf2, "Host Reads")
				.convert_with(raw_to_int)
				.sensor(SensorKind::Data, 2)
		])
		.derived(WriteAmplification {
			key: ChannelKey::new(SensorKind::Factor, 1),
			nand_writes: &[0xe9],
			host_writes: 0xea
		})
}

fn indilinx() -> DeviceProfile {
	DeviceProfile::new("Indilinx SSD")
		.prefixes(&[""])
		.requires(&[0x01, 0x09, 0x0c, 0xd1, 0xce, 0xcf])
		.attributes(vec![
			attr(0x01, "Read Error Rate"),
			counter(0x09, "Power-On Hours (POH)"),
			counter(0x0c, "Power Cycle Count"),
			attr(0xb8, "Initial Bad Block Count"),
			attr(0xc3, "Program Failure Block Count"),
			attr(0xc4, "Erase Failure Block Count"),
			attr(0xc5, "Read Failure Block Count"),
			attr(0xc6, "Total Count of Read Sectors"),
			attr(0xc7, "Total Count of Write Sectors"),
			attr(0xc8, "Total Count of Read Commands"),
			attr(0xc9, "Total Count of Write Commands"),
			attr(0xca, "Total Count of Error Bits from Flash"),
			attr(0xcb, "Total Count of Read Sectors with Correctable Bit Errors"),
			attr(0xcc, "Bad Block Full Flag"),
			attr(0xcd, "Max P/E Count"),
			attr(0xce, "Min Erase Count"),
			attr(0xcf, "Max Erase Count"),
			attr(0xd0, "Average Erase Count"),
			attr(0xd1, "Remaining Life")
				.convert_with(current)
				.sensor(SensorKind::Level, 0),
			attr(0xd3, "SATA Error Count CRC"),
			attr(0xd4, "SATA Error Count Handshake")
		])
}

fn samsung() -> DeviceProfile {
	DeviceProfile::new("Samsung SSD")
		.prefixes(&["SAMSUNG SSD", "SAMSUNG MZ7"])
		.requires(&[0xb1, 0xb3])
		.attributes(vec![
			attr(0x05, "Reallocated Sectors Count"),
			counter(0x09, "Power-On Hours (POH)"),
			counter(0x0c, "Power Cycle Count"),
			attr(0xaf, "Program Fail Count (Chip)"),
			attr(0xb0, "Erase Fail Count (Chip)"),
			attr(0xb1, "Wear Leveling Count")
				.convert_with(current)
				.sensor(SensorKind::Level, 0)
				.display_name("Remaining Life"),
			attr(0xb2, "Used Reserved Block Count (Chip)"),
			attr(0xb3, "Used Reserved Block Count (Total)")
				.convert_with(current)
				.sensor(SensorKind::Level, 1)
				.display_name("Available Reserved Space"),
			attr(0xb4, "Unused Reserved Block Count (Total)"),
			attr(0xb5, "Program Fail Count (Total)"),
			attr(0xb6, "Erase Fail Count (Total)"),
			attr(0xb7, "Runtime Bad Block (Total)"),
			attr(0xbb, "Uncorrectable Error Count"),
			temperature_attr(0xbe, "Temperature"),
			attr(0xc2, "Airflow Temperature"),
			attr(0xc3, "ECC Rate"),
			attr(0xc6, "Off-Line Uncorrectable Error Count"),
			attr(0xc7, "CRC Error Count"),
			attr(0xc9, "Supercap Status"),
			attr(0xca, "Exception Mode Status"),
			attr(0xeb, "Power Recovery Count"),
			attr(0xf1, "Total LBAs Written")
				.convert_with(lba_to_gb)
				.sensor(SensorKind::Data, 0)
				.display_name("Total Bytes Written")
		])
}

fn micron() -> DeviceProfile {
	DeviceProfile::new("Micron SSD")
		.prefixes(&[
			"C300-", "C400-", "C500-", "M4-", "M500", "M550", "MTFDD",
			"Crucial_CT"
		])
		.requires(&[0xaa, 0xab, 0xac, 0xad])
		.attributes(vec![
			counter(0x01, "Read Error Rate"),
			counter(0x05, "Reallocated NAND Block Count"),
			counter(0x09, "Power-On Hours (POH)"),
			counter(0x0c, "Power Cycle Count"),
			counter(0xaa, "New Failing Block Count"),
			counter(0xab, "Program Fail Count"),
			counter(0xac, "Erase Fail Count"),
			counter(0xad, "Wear Leveling Count"),
			counter(0xae, "Unexpected Power Loss Count"),
			counter(0xb5, "Non-4K Aligned Access"),
			counter(0xb7, "SATA Downshift Error Count"),
			counter(0xbb, "Reported Uncorrectable Errors"),
			counter(0xbc, "Command Timeout"),
			counter(0xbd, "Factory Bad Block Count"),
			temperature_attr(0xc2, "Temperature"),
			counter(0xc4, "Reallocation Event Count"),
			counter(0xc5, "Current Pending Sector Count"),
			counter(0xc6, "Off-Line Uncorrectable Error Count"),
			counter(0xc7, "UltraDMA CRC Error Count"),
			attr(0xca, "Percent Lifetime Used")
				.convert_with(remaining_from_used)
				.sensor(SensorKind::Level, 0)
				.display_name("Remaining Life"),
			counter(0xce, "Write Error Rate"),
			counter(0xf7, "Host Program Page Count"),
			counter(0xf8, "FTL Program Page Count")
		])
		.derived(WriteAmplification {
			key: ChannelKey::new(SensorKind::Factor, 0),
			nand_writes: &[0xf7, 0xf8],
			host_writes: 0xf7
		})
}

/// Sum of `nand_writes` divided by `host_writes`, 0 while nothing was
/// written by the host yet.
#[derive(Debug, Clone, Copy)]
struct WriteAmplification {
	key: ChannelKey,
	nand_writes: &'static [u8],
	host_writes: u8
}

impl DerivedSensors for WriteAmplification {

	fn sensors(&self) -> Vec<DerivedSensor> {
		vec![DerivedSensor { key: self.key, name: "Write Amplification" }]
	}

	fn derive(&self, values: &[AttributeValue]) -> Vec<(ChannelKey, Option<f32>)> {
		let counter = |id: u8| values.iter()
			.find(|v| v.identifier == id)
			.map(|v| raw_to_int(v, &[]));

		let nand: Option<f32> = self.nand_writes.iter()
			.map(|&id| counter(id))
			.sum();
		let value = nand.zip(counter(self.host_writes))
			.map(|(nand, host)| if host > 0.0 { nand / host } else { 0.0 });

		vec![(self.key, value)]
	}
}
