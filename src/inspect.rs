//! Read-only inspection of an existing image: the structured report used by
//! `infofs`, and the raw block/range dump used by `viewfs`.

use crate::block_io::BlockDevice;
use crate::consts::SCAN_WINDOW;
use crate::error::{Error, Result};
use crate::header::{self, HiddenRecord, Superblock};
use std::fs::File;

/// Everything recovered by repeating the first steps of the mount pipeline,
/// without materialising a root directory or a writable session.
pub struct Report {
	pub hidden_record: HiddenRecord,
	pub superblock: Superblock,
	/// Human-readable warnings about recorded-vs-derived mismatches.
	pub warnings: Vec<String>,
}

/// Repeats the scan + superblock read of the mount pipeline and cross-checks
/// the recorded fields against what the layout calculator would derive for
/// the same parameters.
pub fn inspect(file: &File) -> Result<Report> {
	let file_len = file.metadata()?.len();
	let mut dev = BlockDevice::new(file.try_clone()?, 512);

	// A valid image can be smaller than the scan window (as little as 5120
	// bytes at block_size 1024), so the window is clamped to the file length
	// rather than always reading a full SCAN_WINDOW.
	let mut window = vec![0u8; SCAN_WINDOW.min(file_len as usize)];
	dev.read_at(0, &mut window)?;
	let hidden_offset = header::scan(&window)?;
	let hidden_record = HiddenRecord::decode(&window[hidden_offset..])?;

	let mut sb_buf = vec![0u8; header::SUPERBLOCK_LEN];
	dev.read_at(hidden_record.superblock_offset as u64, &mut sb_buf)?;
	let superblock = Superblock::decode(&sb_buf)?;

	let mut warnings = Vec::new();
	let expected_table_size = superblock.total_inodes * crate::consts::INODE_SIZE;
	if expected_table_size != superblock.inode_table_size {
		warnings.push(format!(
			"inode_table_size recorded as {} but total_inodes*32 is {}",
			superblock.inode_table_size, expected_table_size
		));
	}
	let expected_data_offset = superblock.inode_table_offset + superblock.inode_table_storage_size;
	if expected_data_offset != superblock.data_blocks_offset {
		warnings.push(format!(
			"data_blocks_offset recorded as {} but inode_table_offset+storage is {}",
			superblock.data_blocks_offset, expected_data_offset
		));
	}
	if superblock.free_inodes > superblock.total_inodes {
		warnings.push("free_inodes exceeds total_inodes".to_string());
	}

	Ok(Report {
		hidden_record,
		superblock,
		warnings,
	})
}

/// Reads `count` bytes from data block `block_num`, skipping `skip` bytes
/// into that block first.
pub fn read_block_range(
	file: &File,
	superblock: &Superblock,
	block_num: u32,
	skip: u32,
	count: u32,
) -> Result<Vec<u8>> {
	if block_num >= superblock.block_count {
		return Err(Error::InvalidOffset);
	}
	let block_size = superblock.block_size;
	if skip >= block_size {
		return Err(Error::InvalidOffset);
	}
	let offset = superblock.data_blocks_offset as u64
		+ block_num as u64 * block_size as u64
		+ skip as u64;
	let count = count.min(block_size - skip);

	let mut dev = BlockDevice::new(file.try_clone()?, block_size);
	let mut buf = vec![0u8; count as usize];
	dev.read_at(offset, &mut buf)?;
	Ok(buf)
}

/// Formats `data` the way `viewfs --format hex` does: 16 bytes per line,
/// upper-case two-digit hex, space-separated.
pub fn format_hex(data: &[u8]) -> String {
	let mut out = String::with_capacity(data.len() * 3);
	for (i, byte) in data.iter().enumerate() {
		out.push_str(&format!("{byte:02X} "));
		if (i + 1) % 16 == 0 {
			out.push('\n');
		}
	}
	out.push('\n');
	out
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn hex_format_breaks_every_16_bytes() {
		let data: Vec<u8> = (0..32).collect();
		let out = format_hex(&data);
		assert_eq!(out.lines().count(), 2);
	}
}
