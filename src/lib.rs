//!
//! Hardware telemetry for linux: firmware information from the SMBIOS
//! tables and SMART based drive sensors.
//!
//! - *bios* walks the raw SMBIOS table and decodes the common records.
//! - *smart* classifies drives into device profiles and turns their
//!   attributes into sensors, the platform access is behind a trait.
//! - *storage* finds the mounted volumes of a drive.
//!
//! ## Async
//! Every read here goes to /sys, /proc or a device handle which
//! does not benefit from async code.

/// Read SMBIOS / DMI information.
pub mod bios;
/// SMART drive profiles and sensors.
pub mod smart;
/// Mounted volumes (mountinfo, statfs).
pub mod storage;

mod util;
