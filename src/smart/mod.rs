//!
//! Turns the SMART attributes a drive reports into sensors.
//!
//! A drive is classified once into a [`DeviceProfile`] by its model name
//! and the attribute ids it exposes, the profile then says which
//! attributes become sensors and how their raw bytes convert.
//!
//! Reading attributes, opening the device and listing its volumes is the
//! job of a [`SmartBackend`], everything here is synchronous and runs in
//! the caller's update tick.
//!
//! ```
//! use hw_telemetry::smart::{ProfileRegistry, AttributeValue, classify};
//! let registry = ProfileRegistry::builtin();
//! let values = [AttributeValue::new(0xc2, 100, [38, 0, 0, 0, 0, 0])];
//! let profile = classify(&registry, "WDC WD40EFRX-68N32N0", &values);
//! assert_eq!(profile.name(), "Generic Hard Disk");
//! ```

mod attribute;
mod classifier;
mod drive;
mod profiles;
mod sensor;

pub use attribute::{
	AttributeDescriptor, Conversion, ParameterDescription, conversions
};
pub use classifier::classify;
pub use drive::{
	Drive, DriveReport, SmartBackend, Volume, VolumeReport, usage_percent
};
pub use profiles::{DeviceProfile, DerivedSensor, DerivedSensors, ProfileRegistry};
pub use sensor::{Sensor, SensorSet};

use std::fmt;

#[cfg(feature = "serde")]
use serde1::Serialize;

/// Model name used when the drive doesn't report one.
pub const GENERIC_MODEL_NAME: &str = "Generic Hard Disk";
/// Firmware revision used when the drive doesn't report one.
pub const UNKNOWN_FIRMWARE: &str = "Unknown";

/// One attribute as read from the drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeValue {
	pub identifier: u8,
	/// normalized value, vendor specific, usually 1..=253
	pub current: u8,
	pub worst: u8,
	pub threshold: u8,
	/// vendor specific raw counter
	pub raw: [u8; 6]
}

impl AttributeValue {

	pub fn new(identifier: u8, current: u8, raw: [u8; 6]) -> Self {
		Self { identifier, current, worst: current, threshold: 0, raw }
	}
}

/// What a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub enum SensorKind {
	/// °C
	Temperature,
	/// %, how much is used
	Load,
	/// %, how much is left
	Level,
	/// a ratio
	Factor,
	/// GB
	Data
}

impl fmt::Display for SensorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Temperature => "temperature",
			Self::Load => "load",
			Self::Level => "level",
			Self::Factor => "factor",
			Self::Data => "data"
		};
		f.write_str(s)
	}
}

/// Identifies one visible value of a drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct ChannelKey {
	pub kind: SensorKind,
	pub channel: u32
}

impl ChannelKey {

	pub fn new(kind: SensorKind, channel: u32) -> Self {
		Self { kind, channel }
	}
}

impl fmt::Display for ChannelKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.kind, self.channel)
	}
}

/// Tuning of a [`Drive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveConfig {
	/// SMART attributes are only read every `update_divider` ticks,
	/// volume usage on every tick.
	pub update_divider: u32
}

impl Default for DriveConfig {
	fn default() -> Self {
		Self { update_divider: 30 }
	}
}
