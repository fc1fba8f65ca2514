//! Single-block read/write path for regular files.
//!
//! Each file occupies exactly one data block, indexed by its own inode
//! index. Offsets and lengths are always clamped to that one block.

use crate::block_io::BlockDevice;
use crate::error::{Error, Result};
use crate::inode_table::{Inode, InodeTable};

/// An open file: the inode it refers to and the shared read/write cursor.
pub struct FileHandle {
	pub inode_index: u32,
	pub position: u64,
	pub append: bool,
}

impl FileHandle {
	/// Opens `inode_index`; in append mode the cursor starts at end-of-file.
	pub fn open(table: &InodeTable, inode_index: u32, append: bool) -> Result<Self> {
		let inode = table.get(inode_index)?;
		let position = if append { inode.size as u64 } else { 0 };
		Ok(Self {
			inode_index,
			position,
			append,
		})
	}
}

fn data_block_offset(data_blocks_offset: u64, block_size: u32, inode_index: u32) -> u64 {
	data_blocks_offset + inode_index as u64 * block_size as u64
}

/// Reads from `handle`'s current position into `buf`, advancing the
/// position by the number of bytes actually copied.
pub fn read(
	dev: &mut BlockDevice,
	table: &InodeTable,
	data_blocks_offset: u64,
	handle: &mut FileHandle,
	buf: &mut [u8],
) -> Result<usize> {
	let inode = *table.get(handle.inode_index)?;
	let size = inode.size as u64;
	if handle.position > size {
		return Err(Error::InvalidOffset);
	}
	let avail = (size - handle.position) as usize;
	let len = buf.len().min(avail);
	if len == 0 {
		return Ok(0);
	}
	let block_size = dev.block_size();
	let mut block = vec![0u8; block_size as usize];
	dev.read_at(
		data_block_offset(data_blocks_offset, block_size, inode.first_block),
		&mut block,
	)?;
	let start = handle.position as usize;
	buf[..len].copy_from_slice(&block[start..start + len]);
	handle.position += len as u64;
	Ok(len)
}

/// Writes `buf` at `handle`'s current position, clamped to the file's
/// single block, and updates the inode's `size` in `table` (without
/// committing the table, since the caller commits after the superblock
/// counters are recomputed).
///
/// Matches the reference driver's write path: a non-append write always
/// starts from a zero-filled scratch block rather than the block's previous
/// contents, so writing at an offset greater than zero on a non-append
/// handle zeroes the bytes before that offset.
pub fn write(
	dev: &mut BlockDevice,
	table: &mut InodeTable,
	data_blocks_offset: u64,
	handle: &mut FileHandle,
	buf: &[u8],
) -> Result<usize> {
	let inode = *table.get(handle.inode_index)?;
	let block_size = dev.block_size() as u64;
	if handle.position > block_size {
		return Err(Error::InvalidOffset);
	}
	let room = (block_size - handle.position) as usize;
	let len = buf.len().min(room);

	let mut block = vec![0u8; block_size as usize];
	if handle.append {
		dev.read_at(
			data_block_offset(data_blocks_offset, block_size as u32, inode.first_block),
			&mut block,
		)?;
	}
	let start = handle.position as usize;
	block[start..start + len].copy_from_slice(&buf[..len]);
	dev.write_at(
		data_block_offset(data_blocks_offset, block_size as u32, inode.first_block),
		&block,
	)?;

	// The inode's size always tracks exactly the range just written, not the
	// maximum ever written: a non-append write resets the block to zero
	// first, so any previous tail beyond this write is no longer live data.
	let new_end = handle.position + len as u64;
	let mut updated = inode;
	updated.size = new_end as u32;
	table.set(handle.inode_index, updated)?;
	handle.position = new_end;
	Ok(len)
}

/// Zeroes a file's data block entirely, as the unlink path requires.
pub fn zero_block(dev: &mut BlockDevice, data_blocks_offset: u64, inode: &Inode) -> Result<()> {
	let block_size = dev.block_size();
	let zero = vec![0u8; block_size as usize];
	dev.write_at(
		data_block_offset(data_blocks_offset, block_size, inode.first_block),
		&zero,
	)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::inode_table::pack_name;
	use tempfile::tempfile;

	fn scratch(block_size: u32, blocks: u32) -> BlockDevice {
		let file = tempfile().unwrap();
		file.set_len(block_size as u64 * blocks as u64).unwrap();
		BlockDevice::new(file, block_size)
	}

	fn table_with_one(block_size: u32) -> (BlockDevice, InodeTable) {
		let mut dev = scratch(block_size, 3);
		let mut table = InodeTable::load(&mut dev, 2 * block_size as u64, 1, 2).unwrap();
		table
			.set(
				1,
				Inode {
					name: pack_name(b"hello"),
					size: 0,
					in_use: 1,
					descriptor: 0o100644,
					first_block: 1,
				},
			)
			.unwrap();
		(dev, table)
	}

	#[test]
	fn write_then_read_back() {
		let block_size = 64;
		let (mut dev, mut table) = table_with_one(block_size);
		let mut handle = FileHandle::open(&table, 1, false).unwrap();
		let n = write(&mut dev, &mut table, 0, &mut handle, b"hello\nworld").unwrap();
		assert_eq!(n, 11);
		assert_eq!(table.get(1).unwrap().size, 11);

		let mut handle = FileHandle::open(&table, 1, false).unwrap();
		let mut buf = [0u8; 11];
		let n = read(&mut dev, &table, 0, &mut handle, &mut buf).unwrap();
		assert_eq!(n, 11);
		assert_eq!(&buf, b"hello\nworld");
	}

	#[test]
	fn append_preserves_prior_bytes() {
		let block_size = 64;
		let (mut dev, mut table) = table_with_one(block_size);
		let mut handle = FileHandle::open(&table, 1, false).unwrap();
		write(&mut dev, &mut table, 0, &mut handle, b"hello\nworld").unwrap();

		let mut handle = FileHandle::open(&table, 1, true).unwrap();
		assert_eq!(handle.position, 11);
		write(&mut dev, &mut table, 0, &mut handle, b"!").unwrap();
		assert_eq!(table.get(1).unwrap().size, 12);

		let mut handle = FileHandle::open(&table, 1, false).unwrap();
		let mut buf = [0u8; 12];
		read(&mut dev, &table, 0, &mut handle, &mut buf).unwrap();
		assert_eq!(&buf, b"hello\nworld!");
	}

	#[test]
	fn non_append_write_zeroes_leading_bytes() {
		let block_size = 64;
		let (mut dev, mut table) = table_with_one(block_size);
		let mut handle = FileHandle::open(&table, 1, false).unwrap();
		write(&mut dev, &mut table, 0, &mut handle, b"hello").unwrap();

		// Non-append write at offset 2 starts from a zeroed block, so the
		// file's size becomes exactly offset + len, not the old size.
		let mut handle = FileHandle::open(&table, 1, false).unwrap();
		handle.position = 2;
		write(&mut dev, &mut table, 0, &mut handle, b"X").unwrap();
		assert_eq!(table.get(1).unwrap().size, 3);

		let mut handle = FileHandle::open(&table, 1, false).unwrap();
		let mut buf = [0u8; 3];
		read(&mut dev, &table, 0, &mut handle, &mut buf).unwrap();
		assert_eq!(&buf, &[0, 0, b'X']);
	}

	#[test]
	fn read_past_end_of_file_errors() {
		let block_size = 64;
		let (mut dev, mut table) = table_with_one(block_size);
		let mut handle = FileHandle::open(&table, 1, false).unwrap();
		write(&mut dev, &mut table, 0, &mut handle, b"hi").unwrap();

		let mut handle = FileHandle::open(&table, 1, false).unwrap();
		handle.position = 5;
		let mut buf = [0u8; 1];
		assert!(matches!(
			read(&mut dev, &table, 0, &mut handle, &mut buf),
			Err(Error::InvalidOffset)
		));
	}

	#[test]
	fn write_clamped_to_single_block() {
		let block_size = 16;
		let (mut dev, mut table) = table_with_one(block_size);
		let mut handle = FileHandle::open(&table, 1, false).unwrap();
		let payload = vec![b'a'; 32];
		let n = write(&mut dev, &mut table, 0, &mut handle, &payload).unwrap();
		assert_eq!(n, 16);
	}
}
