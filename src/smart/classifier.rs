use super::AttributeValue;
use super::profiles::{DeviceProfile, ProfileRegistry};

use std::sync::Arc;
use tracing::debug;

/// Picks the first candidate whose required attributes are all present and
/// which has a name prefix matching `model`, or the fallback.
///
/// Candidates are tried in registry order, so putting a profile earlier
/// gives it priority.
pub fn classify<'r>(
	registry: &'r ProfileRegistry,
	model: &str,
	values: &[AttributeValue]
) -> &'r Arc<DeviceProfile> {
	let found = registry.candidates().iter()
		.filter(|p| p.has_required(values))
		.find(|p| p.matches_name(model));

	match found {
		Some(profile) => {
			debug!("drive {:?} classified as {}", model, profile.name());
			profile
		},
		None => {
			debug!(
				"no profile matches drive {:?}, using {}",
				model, registry.fallback().name()
			);
			registry.fallback()
		}
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::smart::AttributeDescriptor;

	fn value(id: u8) -> AttributeValue {
		AttributeValue::new(id, 100, [0; 6])
	}

	fn vertex() -> DeviceProfile {
		DeviceProfile::new("OCZ Vertex")
			.prefixes(&["OCZ-VERTEX"])
			.requires(&[0xe9])
			.attributes(vec![AttributeDescriptor::new(0xe9, "Media Wearout Indicator")])
	}

	fn generic() -> DeviceProfile {
		DeviceProfile::new("Generic")
			.prefixes(&[""])
	}

	#[test]
	fn matching_profile_wins_over_fallback() {
		let registry = ProfileRegistry::new(vec![vertex()], generic());
		let profile = classify(&registry, "OCZ-VERTEX2", &[value(0xe9)]);
		assert_eq!(profile.name(), "OCZ Vertex");
	}

	#[test]
	fn missing_attribute_falls_back() {
		let registry = ProfileRegistry::new(vec![vertex()], generic());
		let profile = classify(&registry, "OCZ-VERTEX2", &[value(0x09)]);
		assert_eq!(profile.name(), "Generic");
		// monitoring couldn't be enabled
		let profile = classify(&registry, "OCZ-VERTEX2", &[]);
		assert_eq!(profile.name(), "Generic");
	}

	#[test]
	fn prefix_is_case_sensitive() {
		let registry = ProfileRegistry::new(vec![vertex()], generic());
		let profile = classify(&registry, "ocz-vertex2", &[value(0xe9)]);
		assert_eq!(profile.name(), "Generic");
	}

	#[test]
	fn order_is_priority() {
		let catch_all = DeviceProfile::new("Catch all")
			.prefixes(&["OCZ"])
			.requires(&[0xe9]);

		let registry = ProfileRegistry::new(vec![vertex(), catch_all], generic());
		assert_eq!(classify(&registry, "OCZ-VERTEX2", &[value(0xe9)]).name(), "OCZ Vertex");

		let catch_all = DeviceProfile::new("Catch all")
			.prefixes(&["OCZ"])
			.requires(&[0xe9]);
		let registry = ProfileRegistry::new(vec![catch_all, vertex()], generic());
		assert_eq!(classify(&registry, "OCZ-VERTEX2", &[value(0xe9)]).name(), "Catch all");
	}

	#[test]
	fn deterministic() {
		let registry = ProfileRegistry::builtin();
		let values = [value(0xab), value(0xb1), value(0xe9), value(0xea)];
		let first = classify(&registry, "OCZ-AGILITY3", &values);
		for _ in 0..10 {
			assert!(Arc::ptr_eq(first, classify(&registry, "OCZ-AGILITY3", &values)));
		}
		assert_eq!(first.name(), "SandForce SSD");
	}

	#[test]
	fn builtin_profiles() {
		let registry = ProfileRegistry::builtin();

		let intel = [value(0xe8), value(0xe9), value(0x09)];
		assert_eq!(classify(&registry, "INTEL SSDSC2BW240A4", &intel).name(), "Intel SSD");
		// same attributes, other vendor
		assert_eq!(classify(&registry, "KINGSTON SV300", &intel).name(), "Generic Hard Disk");

		let samsung = [value(0xb1), value(0xb3), value(0xf1)];
		assert_eq!(classify(&registry, "SAMSUNG SSD 860 EVO 500GB", &samsung).name(), "Samsung SSD");

		let crucial = [value(0xaa), value(0xab), value(0xac), value(0xad)];
		assert_eq!(classify(&registry, "Crucial_CT525MX300SSD1", &crucial).name(), "Micron SSD");

		assert_eq!(classify(&registry, "WDC WD40EFRX-68N32N0", &[value(0xc2)]).name(), "Generic Hard Disk");
	}
}
