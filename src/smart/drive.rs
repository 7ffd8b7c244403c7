use super::{
	AttributeValue, ChannelKey, DriveConfig, SensorKind, GENERIC_MODEL_NAME,
	UNKNOWN_FIRMWARE
};
use super::classifier::classify;
use super::profiles::{DeviceProfile, ProfileRegistry};
use super::sensor::{Sensor, SensorSet};

use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde1::Serialize;

/// A mounted filesystem living on a drive.
pub trait Volume {
	fn name(&self) -> &str;

	/// For example `ext4` or `NTFS`, empty if unknown.
	fn filesystem_type(&self) -> &str;

	/// False while the volume can't be queried, for example an empty
	/// card reader.
	fn is_ready(&self) -> bool;

	/// Bytes.
	fn total_size(&self) -> io::Result<u64>;

	/// Bytes available to the caller.
	fn free_space(&self) -> io::Result<u64>;
}

/// Platform access to drives, implemented outside of this crate.
///
/// Every method is infallible in the sense that failure is a normal
/// answer: no handle, no attributes, no name.
pub trait SmartBackend {
	type Handle;
	type Volume: Volume;

	/// `None` if the drive can't be opened.
	fn open_drive(&self, index: usize) -> Option<Self::Handle>;

	/// Returns false if SMART could not be enabled.
	fn enable_smart(&self, handle: &Self::Handle, index: usize) -> bool;

	/// Empty if not supported.
	fn read_smart_data(&self, handle: &Self::Handle, index: usize) -> Vec<AttributeValue>;

	/// Model name and firmware revision.
	fn read_name_and_firmware(&self, handle: &Self::Handle, index: usize) -> Option<(String, String)>;

	/// The volumes on this drive.
	fn logical_volumes(&self, index: usize) -> Vec<Self::Volume>;

	fn close_handle(&self, handle: Self::Handle);
}

/// One physical drive.
///
/// SMART attributes are read every [`DriveConfig::update_divider`] calls
/// to [`Drive::update`], volume usage on every call.
/// The device handle is held from creation until the drive is dropped.
pub struct Drive<B: SmartBackend> {
	backend: B,
	index: usize,
	name: String,
	firmware_revision: String,
	profile: Arc<DeviceProfile>,
	handle: Option<B::Handle>,
	/// SMART could be enabled on the handle
	smart_enabled: bool,
	volumes: Vec<B::Volume>,
	sensors: SensorSet,
	usage: Option<Sensor>,
	divider: u32,
	count: u32
}

impl<B: SmartBackend> Drive<B> {

	/// Probes the drive, classifies it and sets it up.
	///
	/// Returns `None` if the drive can't be opened and has no volume with
	/// a size either.
	pub fn create(
		backend: B,
		index: usize,
		registry: &ProfileRegistry,
		config: &DriveConfig
	) -> Option<Self> {
		let (ident, values) = match backend.open_drive(index) {
			Some(handle) => {
				let ident = backend.read_name_and_firmware(&handle, index);
				let values = if backend.enable_smart(&handle, index) {
					backend.read_smart_data(&handle, index)
				} else {
					vec![]
				};
				backend.close_handle(handle);
				(ident, values)
			},
			None => {
				let has_volume = backend.logical_volumes(index)
					.iter()
					.any(has_capacity);
				if !has_volume {
					debug!("drive {} can't be opened and has no volumes", index);
					return None
				}
				(None, vec![])
			}
		};

		let (name, firmware) = ident.unwrap_or_default();
		let name = non_empty(name, GENERIC_MODEL_NAME);
		let firmware = non_empty(firmware, UNKNOWN_FIRMWARE);

		let profile = classify(registry, &name, &values).clone();

		Some(Self::new(backend, index, name, firmware, profile, config))
	}

	/// Opens the drive and binds the sensors of `profile`.
	pub fn new(
		backend: B,
		index: usize,
		name: String,
		firmware_revision: String,
		profile: Arc<DeviceProfile>,
		config: &DriveConfig
	) -> Self {
		let handle = backend.open_drive(index);

		let smart_enabled = match &handle {
			Some(h) => backend.enable_smart(h, index),
			None => false
		};

		let sensors = match &handle {
			Some(h) if smart_enabled => {
				let values = backend.read_smart_data(h, index);
				if values.is_empty() {
					warn!("drive {} ({}) reports no SMART attributes", index, name);
					SensorSet::new()
				} else {
					SensorSet::bind(&profile, &values)
				}
			},
			Some(_) => {
				warn!("drive {} ({}): SMART could not be enabled", index, name);
				SensorSet::new()
			},
			None => SensorSet::new()
		};

		let volumes: Vec<_> = backend.logical_volumes(index)
			.into_iter()
			.filter(has_capacity)
			.collect();

		let usage = (!volumes.is_empty()).then(|| {
			Sensor::new(ChannelKey::new(SensorKind::Load, 0), "Used Space")
		});

		Self {
			backend,
			index,
			name,
			firmware_revision,
			profile,
			handle,
			smart_enabled,
			volumes,
			sensors,
			usage,
			divider: config.update_divider.max(1),
			count: 0
		}
	}

	/// Call once per tick.
	pub fn update(&mut self) {
		if self.count == 0 {
			self.update_smart();
		}

		if let Some(usage) = &mut self.usage {
			usage.set_value(usage_percent(&self.volumes));
		}

		self.count = (self.count + 1) % self.divider;
	}

	fn update_smart(&mut self) {
		let handle = match &self.handle {
			Some(h) if self.smart_enabled => h,
			_ => return
		};

		let values = self.backend.read_smart_data(handle, self.index);
		self.sensors.update_attributes(&self.profile, &values);

		if let Some(derived) = self.profile.derived_sensors() {
			self.sensors.apply_derived(derived.derive(&values));
		}
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn firmware_revision(&self) -> &str {
		&self.firmware_revision
	}

	pub fn profile(&self) -> &DeviceProfile {
		&self.profile
	}

	/// False if the drive could not be opened, only usage is available.
	pub fn is_open(&self) -> bool {
		self.handle.is_some()
	}

	pub fn volumes(&self) -> &[B::Volume] {
		&self.volumes
	}

	/// Attribute sensors followed by the usage sensor.
	pub fn sensors(&self) -> impl Iterator<Item=&Sensor> {
		self.sensors.iter()
			.chain(self.usage.as_ref())
	}

	pub fn sensor(&self, key: ChannelKey) -> Option<&Sensor> {
		self.sensors.get(key)
			.or_else(|| self.usage.as_ref().filter(|s| s.key() == key))
	}

	/// Used space in percent of all ready volumes.
	pub fn usage(&self) -> Option<f32> {
		self.usage.as_ref()?.value()
	}

	/// Name, firmware and the sizes of every ready volume. Volumes which
	/// fail to report their sizes are left out.
	pub fn report(&self) -> DriveReport {
		let volumes = self.volumes.iter()
			.filter(|v| v.is_ready())
			.filter_map(|v| {
				match (v.total_size(), v.free_space()) {
					(Ok(total_size), Ok(free_space)) => Some(VolumeReport {
						name: v.name().to_string(),
						filesystem_type: v.filesystem_type().to_string(),
						total_size,
						free_space
					}),
					(Err(e), _) | (_, Err(e)) => {
						debug!("volume {} left out of report: {}", v.name(), e);
						None
					}
				}
			})
			.collect();

		DriveReport {
			name: self.name.clone(),
			firmware_revision: self.firmware_revision.clone(),
			volumes
		}
	}

	/// See [`SensorSet::set_parameter`].
	pub fn set_parameter(&mut self, key: ChannelKey, index: usize, value: f32) -> bool {
		self.sensors.set_parameter(key, index, value)
	}
}

impl<B: SmartBackend> Drop for Drive<B> {
	fn drop(&mut self) {
		if let Some(handle) = self.handle.take() {
			self.backend.close_handle(handle);
		}
	}
}

/// What [`Drive::report`] hands to reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct DriveReport {
	pub name: String,
	pub firmware_revision: String,
	pub volumes: Vec<VolumeReport>
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(crate = "serde1"))]
pub struct VolumeReport {
	pub name: String,
	pub filesystem_type: String,
	/// bytes
	pub total_size: u64,
	/// bytes
	pub free_space: u64
}

fn has_capacity(volume: &impl Volume) -> bool {
	matches!(volume.total_size(), Ok(size) if size > 0)
}

fn non_empty(s: String, default: &str) -> String {
	if s.is_empty() {
		default.to_string()
	} else {
		s
	}
}

/// Used space over all ready volumes, `None` if they have no capacity.
///
/// A volume which isn't ready or fails to report its sizes is left out of
/// both sums.
pub fn usage_percent<V: Volume>(volumes: &[V]) -> Option<f32> {
	let mut total: u64 = 0;
	let mut free: u64 = 0;

	for volume in volumes {
		if !volume.is_ready() {
			continue
		}
		match (volume.total_size(), volume.free_space()) {
			(Ok(t), Ok(f)) => {
				total += t;
				free += f;
			},
			(Err(e), _) | (_, Err(e)) => {
				debug!("skipping volume {}: {}", volume.name(), e);
			}
		}
	}

	if total == 0 {
		return None
	}

	Some((100.0 - 100.0 * free as f64 / total as f64) as f32)
}
