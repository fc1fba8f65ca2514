//! Error types shared by the library and its command-line front ends.

use std::fmt;
use std::io;

/// Errors that can occur while building, mounting, or operating on a YukiFS image.
#[derive(Debug)]
pub enum Error {
	/// The image's magic or recorded sizes are inconsistent.
	InvalidFormat(&'static str),
	/// The hidden record's bracket pair could not be located.
	NoHiddenHeader,
	/// The requested device size / block size combination has no valid layout.
	InvalidSize(&'static str),
	/// An underlying I/O operation failed.
	Io(io::Error),
	/// No free inode or directory slot remains.
	NoSpace,
	/// No entry with the given name exists in the root directory.
	NotFound,
	/// The operation is not permitted (e.g. creating a subdirectory).
	PermissionDenied,
	/// The requested offset lies beyond the end of the file.
	InvalidOffset,
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::InvalidFormat(msg) => write!(f, "invalid filesystem format: {msg}"),
			Self::NoHiddenHeader => write!(f, "hidden header not found"),
			Self::InvalidSize(msg) => write!(f, "invalid size: {msg}"),
			Self::Io(e) => write!(f, "I/O error: {e}"),
			Self::NoSpace => write!(f, "no space left on device"),
			Self::NotFound => write!(f, "no such file"),
			Self::PermissionDenied => write!(f, "permission denied"),
			Self::InvalidOffset => write!(f, "offset out of range"),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		Self::Io(e)
	}
}

/// Shorthand for a `Result` using this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
