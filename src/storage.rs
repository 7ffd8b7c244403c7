//! Mounted filesystems as volumes of a drive.

use crate::smart::Volume;

use std::path::{Path, PathBuf};
use std::{fs, io};

use tracing::trace;

/// Read mount points from /proc/self/mountinfo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoints {
	raw: String
}

impl MountPoints {

	fn path() -> &'static Path {
		Path::new("/proc/self/mountinfo")
	}

	#[cfg(test)]
	fn from_string(raw: String) -> Self {
		Self {raw}
	}

	/// Read mount points from /proc/self/mountinfo.
	pub fn read() -> io::Result<Self> {
		Self::read_from(Self::path())
	}

	/// Read mount points from a file in the mountinfo format.
	pub fn read_from(path: impl AsRef<Path>) -> io::Result<Self> {
		Ok(Self {
			raw: fs::read_to_string(path)?
		})
	}

	/// Get the mount points.
	pub fn points<'a>(&'a self) -> impl Iterator<Item=MountPoint<'a>> {
		self.raw.trim()
			.split('\n')
			.filter(|l| !l.is_empty())
			.map(MountPoint::from_str)
	}

	/// Every mount point whose source is the block device `device` or one
	/// of its partitions.
	///
	/// `device` can be given as `sda` or `/dev/sda`.
	pub fn volumes_of(&self, device: &str) -> Vec<MountVolume> {
		let device = device.strip_prefix("/dev/").unwrap_or(device);

		self.points()
			.filter(|p| {
				p.mount_source()
					.and_then(|s| s.strip_prefix("/dev/"))
					.map(|s| is_device_or_partition(s, device))
					.unwrap_or(false)
			})
			.filter_map(|p| {
				let volume = MountVolume::new(unescape(p.mount_point()?))
					.with_filesystem_type(p.filesystem_type().unwrap_or(""));
				Some(volume)
			})
			.collect()
	}

}

/// The mounted volumes of a block device, see [`MountPoints::volumes_of`].
pub fn volumes_of(device: &str) -> io::Result<Vec<MountVolume>> {
	Ok(MountPoints::read()?.volumes_of(device))
}

/// `sda1` belongs to `sda`, `nvme0n1p2` belongs to `nvme0n1`.
fn is_device_or_partition(name: &str, device: &str) -> bool {
	let rest = match name.strip_prefix(device) {
		Some(r) => r,
		None => return false
	};
	if rest.is_empty() {
		return true
	}
	// names ending in a digit separate the partition number with a p
	let number = if device.ends_with(|c: char| c.is_ascii_digit()) {
		match rest.strip_prefix('p') {
			Some(n) => n,
			None => return false
		}
	} else {
		rest
	};
	!number.is_empty() && number.bytes().all(|b| b.is_ascii_digit())
}

/// mountinfo encodes space, tab, newline and backslash as octal escapes.
fn unescape(s: &str) -> String {
	if !s.contains('\\') {
		return s.to_string()
	}

	let bytes = s.as_bytes();
	let mut out = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		let octal = bytes.get(i + 1..i + 4)
			.filter(|_| bytes[i] == b'\\')
			.and_then(|d| std::str::from_utf8(d).ok())
			.and_then(|d| u8::from_str_radix(d, 8).ok());
		match octal {
			Some(b) => {
				out.push(b);
				i += 4;
			},
			None => {
				out.push(bytes[i]);
				i += 1;
			}
		}
	}

	String::from_utf8_lossy(&out).into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint<'a> {
	raw: &'a str
}

impl<'a> MountPoint<'a> {

	fn from_str(raw: &'a str) -> Self {
		Self {raw}
	}

	/// Returns every value separated by a space.
	#[inline]
	pub fn values(&self) -> impl Iterator<Item=&'a str> {
		self.raw.split(' ')
	}

	/// A unique ID for the mount (may be reused after umount).
	pub fn mount_id(&self) -> Option<usize> {
		self.values().nth(0)?
			.parse().ok()
	}

	/// The ID of the parent mount (or of self for
	/// the root of this mount namespace's mount tree).
	pub fn parent_id(&self) -> Option<usize> {
		self.values().nth(1)?
			.parse().ok()
	}

	/// major:minor: the value of st_dev for files on this filesystem.
	#[inline]
	pub fn major_minor(&self) -> Option<&'a str> {
		self.values().nth(2)
	}

	/// the pathname of the directory in the filesystem
	/// which forms the root of this mount.
	pub fn root(&self) -> Option<&'a str> {
		self.values().nth(3)
	}

	/// The pathname of the mount point relative
	/// to the process's root directory.
	pub fn mount_point(&self) -> Option<&'a str> {
		self.values().nth(4)
	}

	/// Per-mount options.
	pub fn mount_options(&self) -> Option<&'a str> {
		self.values().nth(5)
	}

	fn after_separator(&self) -> impl Iterator<Item=&'a str> {
		self.values().skip(5)
			.skip_while(|&i| i != "-")
			.skip(1)// skip separator
	}

	/// The filesystem type in the form "type[.subtype]".
	pub fn filesystem_type(&self) -> Option<&'a str> {
		self.after_separator().nth(0)
	}

	/// Filesystem-specific information.
	/// df command uses this information as Filesystem.
	pub fn mount_source(&self) -> Option<&'a str> {
		self.after_separator().nth(1)
	}

	/// Per-superblock options.
	pub fn super_options(&self) -> Option<&'a str> {
		self.after_separator().nth(2)
	}

}

/// Filesystem statistics
#[derive(Clone)]
pub struct FsStat {
	raw: libc::statfs
}

impl FsStat {

	pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
		crate::util::statfs(path)
			.map(|raw| Self {raw})
	}

	/// The block size in bytes used for this filesystem.
	pub fn block_size(&self) -> u64 {
		self.raw.f_bsize as u64
	}

	/// The total block count.
	pub fn total_blocks(&self) -> u64 {
		self.raw.f_blocks as u64
	}

	/// The blocks that are free and accessible to unprivileged
	/// users.
	pub fn available_blocks(&self) -> u64 {
		self.raw.f_bavail as u64
	}

	/// The size of the filesystem in bytes.
	pub fn total(&self) -> u64 {
		self.total_blocks().saturating_mul(self.block_size())
	}

	/// The space available to unprivileged users in bytes.
	pub fn available(&self) -> u64 {
		self.available_blocks().saturating_mul(self.block_size())
	}

}

/// A mounted filesystem, queried with statfs on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountVolume {
	path: PathBuf,
	name: String,
	filesystem_type: String
}

impl MountVolume {

	pub fn new(path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		let name = path.to_string_lossy().into_owned();
		Self { path, name, filesystem_type: String::new() }
	}

	pub fn with_filesystem_type(mut self, fs_type: impl Into<String>) -> Self {
		self.filesystem_type = fs_type.into();
		self
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn stats(&self) -> io::Result<FsStat> {
		FsStat::new(&self.path)
	}
}

impl Volume for MountVolume {
	fn name(&self) -> &str {
		&self.name
	}

	fn filesystem_type(&self) -> &str {
		&self.filesystem_type
	}

	fn is_ready(&self) -> bool {
		match self.stats() {
			Ok(_) => true,
			Err(e) => {
				trace!("volume {} not ready: {}", self.name, e);
				false
			}
		}
	}

	fn total_size(&self) -> io::Result<u64> {
		self.stats().map(|s| s.total())
	}

	fn free_space(&self) -> io::Result<u64> {
		self.stats().map(|s| s.available())
	}
}
