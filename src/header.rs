//! Byte-exact codec for the hidden record and the superblock, plus the
//! bracket scan that locates the hidden record inside a raw image.

use crate::consts::{Arch, BRACKET_END, BRACKET_START, MAGIC};
use crate::error::{Error, Result};
use crate::layout::Layout;

/// Length in bytes of an encoded [`HiddenRecord`], brackets included.
pub const HIDDEN_RECORD_LEN: usize = 2 + 3 + 10 + 3 + 4 * 3 + 4 * 3 + 4 * 3 + 64 + 1 + 4 + 2;

/// The bracketed record embedded at the start of the hidden region.
///
/// Located by [`scan`] before any other metadata is trusted, and carrying the
/// canonical `superblock_offset` that every other lookup is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiddenRecord {
	pub fs_version: [u8; 3],
	pub builder_name: [u8; 10],
	pub builder_version: [u8; 3],
	pub payload_offset: u32,
	pub payload_size: u32,
	pub payload_storage_size: u32,
	pub hidden_record_offset: u32,
	pub hidden_record_size: u32,
	pub hidden_record_storage_size: u32,
	pub driver_offset: u32,
	pub driver_size: u32,
	pub driver_storage_size: u32,
	pub driver_version: [u8; 64],
	pub arch: Arch,
	pub superblock_offset: u32,
}

impl HiddenRecord {
	pub fn encode(&self) -> [u8; HIDDEN_RECORD_LEN] {
		let mut buf = [0u8; HIDDEN_RECORD_LEN];
		let mut w = 0;
		macro_rules! put {
			($bytes:expr) => {{
				let b = $bytes;
				buf[w..w + b.len()].copy_from_slice(&b);
				w += b.len();
			}};
		}
		put!(BRACKET_START);
		put!(self.fs_version);
		put!(self.builder_name);
		put!(self.builder_version);
		put!(self.payload_offset.to_ne_bytes());
		put!(self.payload_size.to_ne_bytes());
		put!(self.payload_storage_size.to_ne_bytes());
		put!(self.hidden_record_offset.to_ne_bytes());
		put!(self.hidden_record_size.to_ne_bytes());
		put!(self.hidden_record_storage_size.to_ne_bytes());
		put!(self.driver_offset.to_ne_bytes());
		put!(self.driver_size.to_ne_bytes());
		put!(self.driver_storage_size.to_ne_bytes());
		put!(self.driver_version);
		put!([self.arch as u8]);
		put!(self.superblock_offset.to_ne_bytes());
		put!(BRACKET_END);
		debug_assert_eq!(w, HIDDEN_RECORD_LEN);
		buf
	}

	pub fn decode(buf: &[u8]) -> Result<Self> {
		if buf.len() < HIDDEN_RECORD_LEN {
			return Err(Error::InvalidFormat("hidden record truncated"));
		}
		if buf[0..2] != BRACKET_START {
			return Err(Error::InvalidFormat("missing start bracket"));
		}
		if buf[HIDDEN_RECORD_LEN - 2..HIDDEN_RECORD_LEN] != BRACKET_END {
			return Err(Error::InvalidFormat("missing end bracket"));
		}
		let mut r = 2;
		macro_rules! take {
			($n:expr) => {{
				let s = &buf[r..r + $n];
				r += $n;
				s
			}};
		}
		let fs_version = take!(3).try_into().unwrap();
		let builder_name = take!(10).try_into().unwrap();
		let builder_version = take!(3).try_into().unwrap();
		let payload_offset = u32::from_ne_bytes(take!(4).try_into().unwrap());
		let payload_size = u32::from_ne_bytes(take!(4).try_into().unwrap());
		let payload_storage_size = u32::from_ne_bytes(take!(4).try_into().unwrap());
		let hidden_record_offset = u32::from_ne_bytes(take!(4).try_into().unwrap());
		let hidden_record_size = u32::from_ne_bytes(take!(4).try_into().unwrap());
		let hidden_record_storage_size = u32::from_ne_bytes(take!(4).try_into().unwrap());
		let driver_offset = u32::from_ne_bytes(take!(4).try_into().unwrap());
		let driver_size = u32::from_ne_bytes(take!(4).try_into().unwrap());
		let driver_storage_size = u32::from_ne_bytes(take!(4).try_into().unwrap());
		let driver_version = take!(64).try_into().unwrap();
		let arch = Arch::from_u8(take!(1)[0]);
		let superblock_offset = u32::from_ne_bytes(take!(4).try_into().unwrap());
		Ok(Self {
			fs_version,
			builder_name,
			builder_version,
			payload_offset,
			payload_size,
			payload_storage_size,
			hidden_record_offset,
			hidden_record_size,
			hidden_record_storage_size,
			driver_offset,
			driver_size,
			driver_storage_size,
			driver_version,
			arch,
			superblock_offset,
		})
	}
}

/// Length in bytes of an encoded [`Superblock`].
pub const SUPERBLOCK_LEN: usize = 8 + 4 * 13;

/// The fixed-width structure describing every region of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
	pub block_size: u32,
	pub block_count: u32,
	pub block_free: u32,
	pub total_inodes: u32,
	pub free_inodes: u32,
	pub inode_table_size: u32,
	pub inode_table_clusters: u32,
	pub inode_table_storage_size: u32,
	pub inode_table_offset: u32,
	pub data_blocks_offset: u32,
	pub data_blocks_total_size: u32,
	pub data_blocks_end_offset: u32,
	pub unallocated_space_size: u32,
}

impl Superblock {
	/// Builds a fresh superblock for a newly computed [`Layout`], with every
	/// block and inode initially free except the root (slot 0).
	pub fn from_layout(layout: &Layout) -> Result<Self> {
		let narrow = |v: u64| u32::try_from(v).map_err(|_| Error::InvalidSize("offset exceeds 32 bits"));
		Ok(Self {
			block_size: layout.block_size,
			block_count: layout.block_count,
			block_free: layout.block_count - 1,
			total_inodes: layout.total_inodes,
			free_inodes: layout.total_inodes - 1,
			inode_table_size: narrow(layout.inode_table_size)?,
			inode_table_clusters: layout.inode_table_clusters,
			inode_table_storage_size: narrow(layout.inode_table_storage_size)?,
			inode_table_offset: narrow(layout.inode_table_offset)?,
			data_blocks_offset: narrow(layout.data_blocks_offset)?,
			data_blocks_total_size: narrow(layout.data_blocks_total_size)?,
			data_blocks_end_offset: narrow(layout.data_blocks_end_offset)?,
			unallocated_space_size: narrow(layout.unallocated_space_size)?,
		})
	}

	pub fn encode(&self) -> [u8; SUPERBLOCK_LEN] {
		let mut buf = [0u8; SUPERBLOCK_LEN];
		let mut w = 0;
		macro_rules! put {
			($bytes:expr) => {{
				let b = $bytes;
				buf[w..w + b.len()].copy_from_slice(&b);
				w += b.len();
			}};
		}
		put!(MAGIC);
		put!(self.block_size.to_ne_bytes());
		put!(self.block_count.to_ne_bytes());
		put!(self.block_free.to_ne_bytes());
		put!(self.total_inodes.to_ne_bytes());
		put!(self.free_inodes.to_ne_bytes());
		put!(self.inode_table_size.to_ne_bytes());
		put!(self.inode_table_clusters.to_ne_bytes());
		put!(self.inode_table_storage_size.to_ne_bytes());
		put!(self.inode_table_offset.to_ne_bytes());
		put!(self.data_blocks_offset.to_ne_bytes());
		put!(self.data_blocks_total_size.to_ne_bytes());
		put!(self.data_blocks_end_offset.to_ne_bytes());
		put!(self.unallocated_space_size.to_ne_bytes());
		debug_assert_eq!(w, SUPERBLOCK_LEN);
		buf
	}

	pub fn decode(buf: &[u8]) -> Result<Self> {
		if buf.len() < SUPERBLOCK_LEN {
			return Err(Error::InvalidFormat("superblock truncated"));
		}
		if buf[0..8] != MAGIC {
			return Err(Error::InvalidFormat("bad magic"));
		}
		let mut r = 8;
		macro_rules! take {
			() => {{
				let v = u32::from_ne_bytes(buf[r..r + 4].try_into().unwrap());
				r += 4;
				v
			}};
		}
		Ok(Self {
			block_size: take!(),
			block_count: take!(),
			block_free: take!(),
			total_inodes: take!(),
			free_inodes: take!(),
			inode_table_size: take!(),
			inode_table_clusters: take!(),
			inode_table_storage_size: take!(),
			inode_table_offset: take!(),
			data_blocks_offset: take!(),
			data_blocks_total_size: take!(),
			data_blocks_end_offset: take!(),
			unallocated_space_size: take!(),
		})
	}
}

/// Scans the first [`crate::consts::SCAN_WINDOW`] bytes of `buf` for the
/// hidden record's bracket pair.
///
/// Mirrors the reference inspector's scan loop literally: it keeps
/// overwriting the recorded offset on every match, so the *last* occurrence
/// of each bracket in the window wins, not the first.
pub fn scan(buf: &[u8]) -> Result<usize> {
	let mut start = None;
	let mut end = None;
	if buf.len() < 2 {
		return Err(Error::NoHiddenHeader);
	}
	for i in 0..buf.len() - 1 {
		if buf[i..i + 2] == BRACKET_START {
			start = Some(i);
		}
		if buf[i..i + 2] == BRACKET_END {
			end = Some(i);
		}
	}
	match (start, end) {
		(Some(s), Some(_)) => Ok(s),
		_ => Err(Error::NoHiddenHeader),
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn sample_hidden_record() -> HiddenRecord {
		HiddenRecord {
			fs_version: [0, 1, 0],
			builder_name: *b"mkfs\0\0\0\0\0\0",
			builder_version: [1, 0, 0],
			payload_offset: 0,
			payload_size: 0,
			payload_storage_size: 0,
			hidden_record_offset: 1024,
			hidden_record_size: HIDDEN_RECORD_LEN as u32,
			hidden_record_storage_size: 1024,
			driver_offset: 2048,
			driver_size: 0,
			driver_storage_size: 0,
			driver_version: [0u8; 64],
			arch: Arch::X86_64,
			superblock_offset: 3072,
		}
	}

	#[test]
	fn hidden_record_round_trip() {
		let rec = sample_hidden_record();
		let encoded = rec.encode();
		let decoded = HiddenRecord::decode(&encoded).unwrap();
		assert_eq!(rec, decoded);
	}

	#[test]
	fn scan_finds_brackets() {
		let rec = sample_hidden_record();
		let encoded = rec.encode();
		let mut image = vec![0u8; 4096];
		image[1024..1024 + encoded.len()].copy_from_slice(&encoded);
		let offset = scan(&image).unwrap();
		assert_eq!(offset, 1024);
	}

	#[test]
	fn scan_fails_without_brackets() {
		let image = vec![0u8; 4096];
		assert!(scan(&image).is_err());
	}

	#[test]
	fn superblock_round_trip() {
		let layout = Layout::compute(1024 * 1024, 1024, 0).unwrap();
		let sb = Superblock::from_layout(&layout).unwrap();
		let encoded = sb.encode();
		let decoded = Superblock::decode(&encoded).unwrap();
		assert_eq!(sb, decoded);
		assert_eq!(decoded.free_inodes, 989);
	}
}
