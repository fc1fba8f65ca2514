//! Derives every on-disk offset and size from a block size and a device size.

use crate::consts::{INODE_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, MIN_PADDING_SIZE, MIN_SUPERBLOCK_SIZE};
use crate::error::{Error, Result};

/// All derived extents of a YukiFS image, as recorded in the superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
	pub block_size: u32,
	pub device_size: u64,

	pub fs_padding_size: u32,
	pub hidden_data_size: u32,
	pub superblock_padded_size: u32,
	pub header_size: u64,

	pub total_inodes: u32,
	pub block_count: u32,

	pub inode_table_size: u64,
	pub inode_table_clusters: u32,
	pub inode_table_storage_size: u64,
	pub inode_table_offset: u64,

	pub data_blocks_offset: u64,
	pub data_blocks_total_size: u64,
	pub data_blocks_end_offset: u64,

	pub unallocated_space_size: u64,
}

fn ceil_div(n: u64, d: u64) -> u64 {
	(n + d - 1) / d
}

impl Layout {
	/// Derives a layout for `device_size` bytes of backing store, a chosen
	/// `block_size`, and the length of the driver-module blob that will be
	/// embedded in the hidden region.
	pub fn compute(device_size: u64, block_size: u32, driver_module_len: u32) -> Result<Self> {
		if block_size < MIN_BLOCK_SIZE || block_size > MAX_BLOCK_SIZE {
			return Err(Error::InvalidSize("block size out of range"));
		}

		let block_size_u64 = block_size as u64;

		let fs_padding_size = block_size.max(MIN_PADDING_SIZE);
		let hidden_data_size = block_size
			+ (ceil_div(driver_module_len as u64, block_size_u64) as u32) * block_size;
		let superblock_padded_size = block_size.max(MIN_SUPERBLOCK_SIZE);
		let header_size = fs_padding_size as u64 + hidden_data_size as u64 + superblock_padded_size as u64;

		if device_size < header_size {
			return Err(Error::InvalidSize("device too small for header"));
		}
		let remaining = device_size - header_size;
		let aligned_remaining = (remaining / block_size_u64) * block_size_u64;
		let x = aligned_remaining / (INODE_SIZE as u64 + block_size_u64);
		if x == 0 {
			return Err(Error::InvalidSize("device too small for any inode"));
		}
		let x = u32::try_from(x).map_err(|_| Error::InvalidSize("device too large"))?;

		let total_inodes = x;
		let block_count = x;

		let inode_table_size = INODE_SIZE as u64 * total_inodes as u64;
		let inode_table_clusters = ceil_div(inode_table_size, block_size_u64) as u32;
		let inode_table_storage_size = inode_table_clusters as u64 * block_size_u64;
		let inode_table_offset = header_size;

		let data_blocks_offset = inode_table_offset + inode_table_storage_size;
		let data_blocks_total_size = block_count as u64 * block_size_u64;
		let data_blocks_end_offset = data_blocks_offset + data_blocks_total_size;

		if data_blocks_end_offset > device_size {
			return Err(Error::InvalidSize("layout exceeds device size"));
		}
		let unallocated_space_size = device_size - data_blocks_end_offset;

		Ok(Self {
			block_size,
			device_size,
			fs_padding_size,
			hidden_data_size,
			superblock_padded_size,
			header_size,
			total_inodes,
			block_count,
			inode_table_size,
			inode_table_clusters,
			inode_table_storage_size,
			inode_table_offset,
			data_blocks_offset,
			data_blocks_total_size,
			data_blocks_end_offset,
			unallocated_space_size,
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn one_mib_default_block_size() {
		let layout = Layout::compute(1024 * 1024, 1024, 0).unwrap();
		assert_eq!(layout.fs_padding_size, 1024);
		assert_eq!(layout.hidden_data_size, 1024);
		assert_eq!(layout.superblock_padded_size, 1024);
		assert_eq!(layout.header_size, 3072);
		assert_eq!(layout.total_inodes, 990);
		assert_eq!(layout.block_count, 990);
		assert_eq!(layout.inode_table_clusters, 31);
		assert_eq!(layout.inode_table_storage_size, 31744);
		assert_eq!(layout.inode_table_offset, 3072);
		assert_eq!(layout.data_blocks_offset, 34816);
	}

	#[test]
	fn rejects_undersized_device() {
		assert!(Layout::compute(100, 1024, 0).is_err());
	}

	#[test]
	fn rejects_out_of_range_block_size() {
		assert!(Layout::compute(1024 * 1024, 512, 0).is_err());
		assert!(Layout::compute(1024 * 1024, 16384, 0).is_err());
	}
}
