use super::{AttributeValue, ChannelKey, SensorKind};

use std::fmt;

/// Turns an attribute into a sensor value, `parameters` are the current
/// parameter values of the sensor (in the order they were declared).
pub type Conversion = fn(value: &AttributeValue, parameters: &[f32]) -> f32;

/// A user adjustable input of a conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterDescription {
	pub name: &'static str,
	pub description: &'static str,
	pub default: f32
}

/// How one SMART attribute of a profile is interpreted.
#[derive(Clone)]
pub struct AttributeDescriptor {
	identifier: u8,
	name: &'static str,
	conversion: Option<Conversion>,
	sensor: Option<ChannelKey>,
	display_name: Option<&'static str>,
	hidden: bool,
	parameters: &'static [ParameterDescription]
}

impl AttributeDescriptor {

	/// An attribute without sensor, converting to its normalized value.
	pub fn new(identifier: u8, name: &'static str) -> Self {
		Self {
			identifier,
			name,
			conversion: None,
			sensor: None,
			display_name: None,
			hidden: false,
			parameters: &[]
		}
	}

	pub fn convert_with(mut self, conversion: Conversion) -> Self {
		self.conversion = Some(conversion);
		self
	}

	/// Exposes the attribute as a sensor on the given channel.
	pub fn sensor(mut self, kind: SensorKind, channel: u32) -> Self {
		self.sensor = Some(ChannelKey::new(kind, channel));
		self
	}

	/// Name of the sensor if it differs from the attribute name.
	pub fn display_name(mut self, name: &'static str) -> Self {
		self.display_name = Some(name);
		self
	}

	/// The sensor is hidden unless asked for.
	pub fn hidden(mut self) -> Self {
		self.hidden = true;
		self
	}

	pub fn parameters(mut self, parameters: &'static [ParameterDescription]) -> Self {
		self.parameters = parameters;
		self
	}

	pub fn identifier(&self) -> u8 {
		self.identifier
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	/// `None` for attributes which are only informational.
	pub fn channel_key(&self) -> Option<ChannelKey> {
		self.sensor
	}

	pub fn sensor_name(&self) -> &'static str {
		self.display_name.unwrap_or(self.name)
	}

	pub fn is_hidden(&self) -> bool {
		self.hidden
	}

	pub fn parameter_descriptions(&self) -> &'static [ParameterDescription] {
		self.parameters
	}

	/// Without a conversion the normalized value is used.
	pub fn convert(&self, value: &AttributeValue, parameters: &[f32]) -> f32 {
		match self.conversion {
			Some(conv) => conv(value, parameters),
			None => value.current as f32
		}
	}
}

impl fmt::Debug for AttributeDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AttributeDescriptor")
			.field("identifier", &format_args!("{:#04x}", self.identifier))
			.field("name", &self.name)
			.field("sensor", &self.sensor)
			.field("hidden", &self.hidden)
			.finish()
	}
}

pub mod conversions {
	//! Conversions shared by the built-in profiles.

	use super::{AttributeValue, ParameterDescription};

	pub static TEMPERATURE_OFFSET: [ParameterDescription; 1] = [
		ParameterDescription {
			name: "Offset [°C]",
			description: "Temperature offset of the thermal sensor.\n\
				Temperature = Value + Offset.",
			default: 0.0
		}
	];

	fn offset(parameters: &[f32]) -> f32 {
		parameters.first().copied().unwrap_or(0.0)
	}

	/// Little-endian 32-bit counter from the first four raw bytes.
	pub fn raw_to_int(value: &AttributeValue, _: &[f32]) -> f32 {
		let r = &value.raw;
		u32::from_le_bytes([r[0], r[1], r[2], r[3]]) as f32
	}

	/// The normalized value.
	pub fn current(value: &AttributeValue, _: &[f32]) -> f32 {
		value.current as f32
	}

	/// First raw byte in °C plus the offset parameter.
	pub fn temperature(value: &AttributeValue, parameters: &[f32]) -> f32 {
		value.raw[0] as f32 + offset(parameters)
	}

	/// Normalized value in °C plus the offset parameter.
	pub fn current_temperature(value: &AttributeValue, parameters: &[f32]) -> f32 {
		value.current as f32 + offset(parameters)
	}

	/// Counter in units of 32 MiB to GB.
	pub fn raw_32mib_to_gb(value: &AttributeValue, parameters: &[f32]) -> f32 {
		raw_to_int(value, parameters) / 32.0
	}

	/// 48-bit LBA counter (512 byte sectors) to GB.
	pub fn lba_to_gb(value: &AttributeValue, _: &[f32]) -> f32 {
		let r = &value.raw;
		let lbas = u64::from_le_bytes([r[0], r[1], r[2], r[3], r[4], r[5], 0, 0]);
		(lbas as f64 * 512.0 / (1u64 << 30) as f64) as f32
	}

	/// Raw counter is the percentage used.
	pub fn remaining_from_used(value: &AttributeValue, parameters: &[f32]) -> f32 {
		100.0 - raw_to_int(value, parameters)
	}
}
