//! The mount pipeline and the serialized session API built on top of it.

use crate::block_io::BlockDevice;
use crate::consts::{MODE_DIR, MODE_REG, ROOT_DIR_MODE, ROOT_INODE, SCAN_WINDOW};
use crate::directory::{DirEntry, RootDirectory};
use crate::error::{Error, Result};
use crate::file::{self, FileHandle};
use crate::header::{self, HiddenRecord, Superblock};
use crate::inode_table::{pack_name, InodeTable};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

/// Snapshot of the superblock's free-space counters, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
	pub block_size: u32,
	pub block_count: u32,
	pub block_free: u32,
	pub total_inodes: u32,
	pub free_inodes: u32,
	pub max_name_len: usize,
}

struct Inner {
	dev: BlockDevice,
	superblock_offset: u64,
	superblock: Superblock,
	table: InodeTable,
	root: RootDirectory,
}

impl Inner {
	fn data_blocks_offset(&self) -> u64 {
		self.superblock.data_blocks_offset as u64
	}

	/// Recomputes `free_inodes`/`block_free` from the table's current state
	/// and writes the superblock and inode table back.
	fn commit(&mut self) -> Result<()> {
		let free = self.table.free_count();
		self.superblock.free_inodes = free;
		self.superblock.block_free = free;
		self.table.commit(&mut self.dev)?;
		self.root.commit(&mut self.dev)?;
		let encoded = self.superblock.encode();
		self.dev.write_at(self.superblock_offset, &encoded)
	}
}

/// A mounted YukiFS image. Every mutating operation is serialized by an
/// internal mount-wide lock, matching the single-writer model the on-disk
/// format assumes.
pub struct Session {
	inner: Mutex<Inner>,
}

impl Session {
	/// Runs the mount pipeline: locate the hidden record, read the
	/// superblock it points to, and materialise the root directory.
	pub fn mount(path: &Path) -> Result<Self> {
		let file = OpenOptions::new().read(true).write(true).open(path)?;
		let file_len = file.metadata()?.len();
		// The block size is not yet known; the scan window only depends on
		// byte offsets, so an arbitrary placeholder size is fine until the
		// superblock reveals the real one.
		let mut dev = BlockDevice::new(file, 512);

		// A valid image can be smaller than the scan window (as little as
		// 5120 bytes at block_size 1024), so the window is clamped to the
		// file length rather than always reading a full SCAN_WINDOW.
		let mut window = vec![0u8; SCAN_WINDOW.min(file_len as usize)];
		dev.read_at(0, &mut window)?;
		let hidden_offset = header::scan(&window)?;
		let hidden_record_len = header::HIDDEN_RECORD_LEN;
		if hidden_offset + hidden_record_len > window.len() {
			return Err(Error::InvalidFormat("hidden record runs past scan window"));
		}
		let hidden_record =
			HiddenRecord::decode(&window[hidden_offset..hidden_offset + hidden_record_len])?;

		let superblock_offset = hidden_record.superblock_offset as u64;
		let mut sb_buf = vec![0u8; header::SUPERBLOCK_LEN];
		dev.read_at(superblock_offset, &mut sb_buf)?;
		let superblock = Superblock::decode(&sb_buf)?;

		let mut dev = BlockDevice::new(dev.file_mut().try_clone()?, superblock.block_size);

		let table = InodeTable::load(
			&mut dev,
			superblock.inode_table_offset as u64,
			superblock.inode_table_clusters,
			superblock.total_inodes,
		)?;
		let root_inode = *table.get(ROOT_INODE)?;
		let root_offset =
			superblock.data_blocks_offset as u64 + root_inode.first_block as u64 * superblock.block_size as u64;
		let root = RootDirectory::load(&mut dev, root_offset)?;

		Ok(Self {
			inner: Mutex::new(Inner {
				dev,
				superblock_offset,
				superblock,
				table,
				root,
			}),
		})
	}

	pub fn statfs(&self) -> StatFs {
		let inner = self.inner.lock().unwrap();
		StatFs {
			block_size: inner.superblock.block_size,
			block_count: inner.superblock.block_count,
			block_free: inner.superblock.block_free,
			total_inodes: inner.superblock.total_inodes,
			free_inodes: inner.superblock.free_inodes,
			max_name_len: crate::consts::MAX_NAME_LEN,
		}
	}

	/// Looks up `name` in the root directory, returning its inode index.
	pub fn lookup(&self, name: &[u8]) -> Result<u32> {
		let inner = self.inner.lock().unwrap();
		inner
			.root
			.find(&inner.table, name)?
			.map(|(_, inode_idx)| inode_idx)
			.ok_or(Error::NotFound)
	}

	/// Creates a regular file named `name` with the given descriptor bits
	/// (permission bits only; the regular-file type bit is added here).
	pub fn create(&self, name: &[u8], mode: u32) -> Result<u32> {
		let mut inner = self.inner.lock().unwrap();
		let slot = inner.root.find_empty()?;
		let packed = pack_name(name);
		let descriptor = MODE_REG | (mode & 0o7777);
		let inode_idx = inner.table.allocate(packed, descriptor)?;
		inner.root.set(slot, inode_idx);
		inner.commit()?;
		Ok(inode_idx)
	}

	/// Rejects subdirectory creation outright; this format has no nested
	/// directories.
	pub fn mkdir(&self, _name: &[u8]) -> Result<()> {
		Err(Error::PermissionDenied)
	}

	/// Opens `inode_index` for reading/writing.
	pub fn open(&self, inode_index: u32, append: bool) -> Result<FileHandle> {
		let inner = self.inner.lock().unwrap();
		FileHandle::open(&inner.table, inode_index, append)
	}

	pub fn read(&self, handle: &mut FileHandle, buf: &mut [u8]) -> Result<usize> {
		let mut inner = self.inner.lock().unwrap();
		let data_blocks_offset = inner.data_blocks_offset();
		let Inner { dev, table, .. } = &mut *inner;
		file::read(dev, table, data_blocks_offset, handle, buf)
	}

	pub fn write(&self, handle: &mut FileHandle, buf: &[u8]) -> Result<usize> {
		let mut inner = self.inner.lock().unwrap();
		let data_blocks_offset = inner.data_blocks_offset();
		let n = {
			let Inner { dev, table, .. } = &mut *inner;
			file::write(dev, table, data_blocks_offset, handle, buf)?
		};
		inner.commit()?;
		Ok(n)
	}

	/// Removes `name`: zeroes its data block, its directory slot, and its
	/// inode record, then recomputes the free counters.
	pub fn unlink(&self, name: &[u8]) -> Result<()> {
		let mut inner = self.inner.lock().unwrap();
		let (slot, inode_idx) = inner
			.root
			.find(&inner.table, name)?
			.ok_or(Error::NotFound)?;
		let data_blocks_offset = inner.data_blocks_offset();
		let inode = *inner.table.get(inode_idx)?;
		file::zero_block(&mut inner.dev, data_blocks_offset, &inode)?;
		inner.root.clear(slot);
		inner.table.free(inode_idx)?;
		inner.commit()
	}

	/// Returns up to all remaining entries starting at byte `cursor` into
	/// the slot array, plus the cursor to resume from.
	pub fn iterate(&self, cursor: u32) -> Result<(Vec<DirEntry>, u32)> {
		let inner = self.inner.lock().unwrap();
		inner.root.iterate(&inner.table, cursor)
	}

	/// Drops the in-memory session. Already-issued writes were synchronous,
	/// so there is nothing further to flush.
	pub fn unmount(self) {}
}

/// Descriptor bits for a freshly built root directory inode.
pub fn root_descriptor() -> u32 {
	MODE_DIR | ROOT_DIR_MODE
}
