//! Size detection for backing stores: regular files and raw block devices.

use libc::ioctl;
use std::ffi::c_long;
use std::fs;
use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

/// ioctl macro: command.
macro_rules! ioc {
	($a:expr, $b:expr, $c:expr, $d:expr) => {
		(($a) << 30) | (($b) << 8) | ($c) | (($d) << 16)
	};
}

/// ioctl macro: read command.
macro_rules! ior {
	($a:expr, $b:expr, $c:ty) => {
		ioc!(2, $a, $b, std::mem::size_of::<$c>() as c_long)
	};
}

/// ioctl command: get the size of a block device, in bytes.
const BLKGETSIZE64: c_long = ior!(0x12, 114, u64);

/// Returns the size in bytes of the backing store at `path`.
///
/// Regular files report their length; block devices are queried with
/// `BLKGETSIZE64` since their apparent length is not meaningful.
pub fn device_size(path: &Path) -> io::Result<u64> {
	let metadata = fs::metadata(path)?;
	let file_type = metadata.file_type();

	if file_type.is_block_device() {
		let dev = File::open(path)?;
		let mut size: u64 = 0;
		let ret = unsafe { ioctl(dev.as_raw_fd(), BLKGETSIZE64 as _, &mut size) };
		if ret < 0 {
			return Err(io::Error::last_os_error());
		}
		Ok(size)
	} else {
		Ok(metadata.len())
	}
}
