//! Prints the used space of a block device over all its mounted
//! partitions, like the "Used Space" sensor of a drive.
//!
//! `cargo run --example drive-usage -- sda`

use hw_telemetry::smart::{usage_percent, Volume};
use hw_telemetry::storage::MountPoints;

use tracing_subscriber::EnvFilter;


fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	let device = std::env::args().nth(1)
		.unwrap_or_else(|| "sda".into());

	let mounts = MountPoints::read().expect("failed to read mountinfo");
	let volumes = mounts.volumes_of(&device);

	if volumes.is_empty() {
		println!("{} has no mounted volumes", device);
		return
	}

	for volume in &volumes {
		match (volume.total_size(), volume.free_space()) {
			(Ok(total), Ok(free)) => println!(
				"\t{} ({}): {} of {} MiB free",
				volume.name(), volume.filesystem_type(), free >> 20, total >> 20
			),
			(Err(e), _) | (_, Err(e)) => println!("\t{}: {}", volume.name(), e)
		}
	}

	match usage_percent(&volumes) {
		Some(used) => println!("{}: {:.1}% used", device, used),
		None => println!("{}: no capacity", device)
	}
}
