//! The root directory: a fixed-width array of inode indices occupying
//! inode 0's single data block.

use crate::block_io::BlockDevice;
use crate::error::{Error, Result};
use crate::inode_table::InodeTable;

/// One entry yielded by [`RootDirectory::iterate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
	pub inode: u32,
	pub name: Vec<u8>,
}

/// In-memory copy of the root directory's slot array.
pub struct RootDirectory {
	/// Byte offset of the root's data block.
	offset: u64,
	/// Little-endian 32-bit inode indices; `0` means empty.
	slots: Vec<u32>,
}

impl RootDirectory {
	/// Loads the root block (inode 0's `first_block`, always data block 0).
	pub fn load(dev: &mut BlockDevice, data_blocks_offset: u64) -> Result<Self> {
		let block_size = dev.block_size();
		let mut raw = vec![0u8; block_size as usize];
		dev.read_at(data_blocks_offset, &mut raw)?;
		let slots = raw
			.chunks_exact(4)
			.map(|c| u32::from_le_bytes(c.try_into().unwrap()))
			.collect();
		Ok(Self {
			offset: data_blocks_offset,
			slots,
		})
	}

	pub fn commit(&self, dev: &mut BlockDevice) -> Result<()> {
		let mut raw = Vec::with_capacity(self.slots.len() * 4);
		for slot in &self.slots {
			raw.extend_from_slice(&slot.to_le_bytes());
		}
		dev.write_at(self.offset, &raw)
	}

	/// Returns the slot index and inode index of the entry named `name`, if
	/// any non-empty slot's inode has that (null- or length-terminated) name.
	pub fn find(&self, table: &InodeTable, name: &[u8]) -> Result<Option<(usize, u32)>> {
		for (slot_idx, &inode_idx) in self.slots.iter().enumerate() {
			if inode_idx == 0 {
				continue;
			}
			let inode = table.get(inode_idx)?;
			if inode.name_str() == name {
				return Ok(Some((slot_idx, inode_idx)));
			}
		}
		Ok(None)
	}

	/// Finds the first empty slot.
	pub fn find_empty(&self) -> Result<usize> {
		self.slots
			.iter()
			.position(|&s| s == 0)
			.ok_or(Error::NoSpace)
	}

	pub fn set(&mut self, slot_idx: usize, inode_idx: u32) {
		self.slots[slot_idx] = inode_idx;
	}

	pub fn clear(&mut self, slot_idx: usize) {
		self.slots[slot_idx] = 0;
	}

	/// Emits entries starting at the slot whose first byte is `cursor`,
	/// returning the updated cursor for a resumable next call.
	pub fn iterate(&self, table: &InodeTable, cursor: u32) -> Result<(Vec<DirEntry>, u32)> {
		let start_slot = (cursor / 4) as usize;
		let mut entries = Vec::new();
		let mut slot_idx = start_slot;
		while slot_idx < self.slots.len() {
			let inode_idx = self.slots[slot_idx];
			if inode_idx != 0 {
				let inode = table.get(inode_idx)?;
				entries.push(DirEntry {
					inode: inode_idx,
					name: inode.name_str().to_vec(),
				});
			}
			slot_idx += 1;
		}
		Ok((entries, (self.slots.len() * 4) as u32))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::inode_table::{pack_name, Inode};
	use tempfile::tempfile;

	fn scratch(block_size: u32) -> BlockDevice {
		let file = tempfile().unwrap();
		file.set_len(block_size as u64).unwrap();
		BlockDevice::new(file, block_size)
	}

	fn table_with(entries: Vec<Inode>) -> InodeTable {
		// Exercises only the in-memory query surface, so a zero-length
		// commit-backed table is built by hand via allocate().
		let mut dev = scratch(32 * entries.len().max(1) as u32);
		let mut table = InodeTable::load(&mut dev, 0, 1, entries.len() as u32).unwrap();
		for (i, e) in entries.into_iter().enumerate() {
			table.set(i as u32, e).unwrap();
		}
		table
	}

	#[test]
	fn find_by_name() {
		let mut dev = scratch(64);
		let mut dir = RootDirectory::load(&mut dev, 0).unwrap();
		let table = table_with(vec![
			Inode::ZERO,
			Inode {
				name: pack_name(b"hello"),
				size: 0,
				in_use: 1,
				descriptor: 0,
				first_block: 1,
			},
		]);
		dir.set(1, 1);
		let found = dir.find(&table, b"hello").unwrap();
		assert_eq!(found, Some((1, 1)));
		assert_eq!(dir.find(&table, b"nope").unwrap(), None);
	}

	#[test]
	fn empty_slot_search() {
		let mut dev = scratch(16);
		let dir = RootDirectory::load(&mut dev, 0).unwrap();
		assert_eq!(dir.find_empty().unwrap(), 0);
	}
}
