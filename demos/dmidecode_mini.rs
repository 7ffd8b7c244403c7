//! Produces a subset from the dmidecode command
//! Set RUST_LOG=hw_telemetry=debug to see what is read.

use hw_telemetry::bios::{Smbios, StructureKind};

use tracing_subscriber::EnvFilter;


fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	let smbios = Smbios::read();

	match smbios.version() {
		Some(v) => println!("SMBIOS {} present.", v),
		None => println!("No SMBIOS table, using /sys/class/dmi/id.")
	}
	println!("{} structures", smbios.structures().len());
	println!();

	if let Some(bios) = smbios.bios() {
		println!("Bios Information");
		println!("\tVendor: {}", bios.vendor);
		println!("\tVersion: {}", bios.version);
		println!("\tRelease Date: {}", bios.release_date);
		println!();
	}

	if let Some(system) = smbios.system() {
		println!("System Information");
		println!("\tManufacturer: {}", system.manufacturer);
		println!("\tProduct Name: {}", system.product_name);
		println!("\tVersion: {}", system.version);
		println!("\tSerial Number: {}", system.serial_number);
		println!("\tUUID: {}", system.uuid);
		println!("\tFamily: {}", system.family);
		println!();
	}

	if let Some(board) = smbios.board() {
		println!("Base Board Information");
		println!("\tManufacturer: {}", board.manufacturer);
		println!("\tProduct Name: {}", board.product_name);
		println!("\tVersion: {}", board.version);
		println!("\tSerial Number: {}", board.serial_number);
		println!();
	}

	if let Some(cpu) = smbios.processor() {
		println!("Processor Information");
		println!("\tManufacturer: {}", cpu.manufacturer);
		println!("\tVersion: {}", cpu.version);
		println!("\tMax Speed: {} MHz", cpu.max_speed);
		println!("\tCurrent Speed: {} MHz", cpu.current_speed);
		println!("\tCore Count: {}", cpu.core_count);
		println!("\tThread Count: {}", cpu.thread_count);
		println!();
	}

	for mem in smbios.memory_devices() {
		println!("Memory Device");
		match mem.size_mb() {
			Some(0) => println!("\tSize: No Module Installed"),
			Some(mb) => println!("\tSize: {} MB", mb),
			None => println!("\tSize: Unknown")
		}
		println!("\tLocator: {}", mem.device_locator);
		println!("\tBank Locator: {}", mem.bank_locator);
		println!("\tSpeed: {} MT/s", mem.speed);
		println!("\tManufacturer: {}", mem.manufacturer);
		println!("\tPart Number: {}", mem.part_number);
		println!();
	}

	let other = smbios.structures().iter()
		.filter(|s| matches!(s.kind(), StructureKind::Unknown))
		.count();
	println!("{} structures of other types", other);
}
