use std::ffi::CString;
use std::path::Path;
use std::{fs, io, mem};
use std::os::unix::ffi::OsStrExt;

/// Every byte is one character (ISO 8859-1), which is how SMBIOS strings
/// are treated.
pub fn latin1_to_string(bytes: &[u8]) -> String {
	bytes.iter()
		.map(|&b| b as char)
		.collect()
}

/// Reads the first line of a sysfs attribute.
/// Returns `None` if the file doesn't exist or can't be read.
pub fn read_first_line(path: impl AsRef<Path>) -> Option<String> {
	let raw = fs::read_to_string(path).ok()?;
	Some(raw.lines().next().unwrap_or("").to_string())
}

pub fn statfs(path: impl AsRef<Path>) -> io::Result<libc::statfs> {
	let path = CString::new(path.as_ref().as_os_str().as_bytes())
		.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

	// Safety: statfs only writes into the struct we pass
	let mut raw: libc::statfs = unsafe { mem::zeroed() };
	let r = unsafe { libc::statfs(path.as_ptr(), &mut raw) };
	if r == 0 {
		Ok(raw)
	} else {
		Err(io::Error::last_os_error())
	}
}
