use super::{AttributeValue, ChannelKey};
use super::profiles::DeviceProfile;

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde1::Serialize;

/// One visible value of a drive.
///
/// `value` is `None` while there is no data, never 0.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct Sensor {
	key: ChannelKey,
	name: String,
	value: Option<f32>,
	hidden: bool,
	parameters: Vec<f32>
}

impl Sensor {

	pub fn new(key: ChannelKey, name: impl Into<String>) -> Self {
		Self {
			key,
			name: name.into(),
			value: None,
			hidden: false,
			parameters: vec![]
		}
	}

	pub fn key(&self) -> ChannelKey {
		self.key
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn value(&self) -> Option<f32> {
		self.value
	}

	pub fn set_value(&mut self, value: Option<f32>) {
		self.value = value;
	}

	pub fn is_hidden(&self) -> bool {
		self.hidden
	}

	pub fn parameters(&self) -> &[f32] {
		&self.parameters
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
	/// index into the profile's attribute descriptors
	Attribute(usize),
	Derived
}

#[derive(Debug, Clone, PartialEq)]
struct Binding {
	source: Source,
	sensor: Sensor
}

/// The sensors of one drive, keyed by channel.
///
/// A channel is bound once, later attempts to bind the same channel are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSet {
	bindings: BTreeMap<ChannelKey, Binding>
}

impl SensorSet {

	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a sensor for every descriptor with a channel whose
	/// attribute is in `values`, in declaration order, followed by the
	/// derived sensors of the profile. The first one to claim a channel
	/// keeps it.
	pub fn bind(profile: &DeviceProfile, values: &[AttributeValue]) -> Self {
		let mut me = Self::new();

		for (i, desc) in profile.attribute_descriptors().iter().enumerate() {
			let key = match desc.channel_key() {
				Some(k) => k,
				None => continue
			};
			let value = match find(values, desc.identifier()) {
				Some(v) => v,
				None => continue
			};
			if me.bindings.contains_key(&key) {
				continue
			}

			let mut sensor = Sensor::new(key, desc.sensor_name());
			sensor.hidden = desc.is_hidden();
			sensor.parameters = desc.parameter_descriptions().iter()
				.map(|p| p.default)
				.collect();
			sensor.value = Some(desc.convert(value, &sensor.parameters));

			me.insert(sensor, Source::Attribute(i));
		}

		if let Some(derived) = profile.derived_sensors() {
			for d in derived.sensors() {
				me.insert(Sensor::new(d.key, d.name), Source::Derived);
			}
			me.apply_derived(derived.derive(values));
		}

		me
	}

	/// Returns false if the channel was already taken.
	fn insert(&mut self, sensor: Sensor, source: Source) -> bool {
		if self.bindings.contains_key(&sensor.key) {
			return false
		}
		self.bindings.insert(sensor.key, Binding { source, sensor });
		true
	}

	/// Converts the attributes again, a sensor whose attribute is gone
	/// loses its value.
	///
	/// `profile` should be the one the set was bound with, a sensor without
	/// a descriptor in it has no value.
	pub fn update_attributes(&mut self, profile: &DeviceProfile, values: &[AttributeValue]) {
		let descs = profile.attribute_descriptors();

		for binding in self.bindings.values_mut() {
			let desc = match binding.source {
				Source::Attribute(i) => descs.get(i),
				Source::Derived => continue
			};
			let sensor = &mut binding.sensor;
			sensor.value = match desc {
				Some(d) => find(values, d.identifier())
					.map(|v| d.convert(v, &sensor.parameters)),
				None => None
			};
		}
	}

	/// Only updates derived sensors, unknown keys are ignored.
	pub fn apply_derived(&mut self, updates: Vec<(ChannelKey, Option<f32>)>) {
		for (key, value) in updates {
			match self.bindings.get_mut(&key) {
				Some(b) if b.source == Source::Derived => b.sensor.value = value,
				_ => {}
			}
		}
	}

	/// Sets parameter `index` of a sensor, applied on the next update.
	pub fn set_parameter(&mut self, key: ChannelKey, index: usize, value: f32) -> bool {
		let param = self.bindings.get_mut(&key)
			.and_then(|b| b.sensor.parameters.get_mut(index));
		match param {
			Some(p) => {
				*p = value;
				true
			},
			None => false
		}
	}

	/// The attribute a sensor is bound to, `None` for derived sensors.
	pub fn attribute_of(&self, key: ChannelKey) -> Option<usize> {
		match self.bindings.get(&key)?.source {
			Source::Attribute(i) => Some(i),
			Source::Derived => None
		}
	}

	pub fn get(&self, key: ChannelKey) -> Option<&Sensor> {
		self.bindings.get(&key)
			.map(|b| &b.sensor)
	}

	/// Ordered by channel.
	pub fn iter(&self) -> impl Iterator<Item=&Sensor> {
		self.bindings.values()
			.map(|b| &b.sensor)
	}

	pub fn len(&self) -> usize {
		self.bindings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bindings.is_empty()
	}
}

fn find(values: &[AttributeValue], id: u8) -> Option<&AttributeValue> {
	values.iter()
		.find(|v| v.identifier == id)
}
