//! Composes a fresh image: padding, hidden record, superblock, inode table,
//! and a zeroed data region.

use crate::consts::{Arch, ROOT_INODE};
use crate::error::Result;
use crate::header::{HiddenRecord, Superblock, HIDDEN_RECORD_LEN};
use crate::inode_table::{Inode, InodeTable};
use crate::layout::Layout;
use crate::session::root_descriptor;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

/// The embedded helper payload, normally a small precompiled program. Its
/// internal structure is out of scope here; it is carried as an opaque byte
/// range whose size the image records.
pub const HELPER_PAYLOAD: &[u8] = &[];

/// The embedded driver-module blob. Like the helper payload, its contents
/// are opaque to this crate.
pub const DRIVER_MODULE: &[u8] = &[];

/// Parameters controlling how a fresh image is composed.
pub struct BuildOptions {
	pub block_size: u32,
	/// If true, the target is a raw block device: the helper payload is not
	/// embedded in the padding region (there is nowhere for a bootstrapping
	/// program to run from on a bare block device in this reference build).
	pub is_block_device: bool,
}

/// Everything the builder computed and is about to write, useful to a
/// caller (e.g. a dry-run front end) that wants to report the result without
/// having actually written to a device.
pub struct BuildResult {
	pub layout: Layout,
	pub superblock: Superblock,
	pub hidden_record: HiddenRecord,
}

fn builder_name() -> [u8; 10] {
	let mut out = [0u8; 10];
	let bytes = b"mkfs";
	out[..bytes.len()].copy_from_slice(bytes);
	out
}

/// Builds the complete header region and root inode table bytes for
/// `device_size` bytes of backing store, without touching any destination.
/// Returns the composed header bytes (padding + hidden region + superblock)
/// and the inode-table bytes, alongside the [`BuildResult`] metadata.
pub fn compose(
	device_size: u64,
	opts: &BuildOptions,
) -> Result<(Vec<u8>, Vec<u8>, BuildResult)> {
	let layout = Layout::compute(device_size, opts.block_size, DRIVER_MODULE.len() as u32)?;

	let mut header = vec![0u8; layout.header_size as usize];
	if !opts.is_block_device {
		let n = HELPER_PAYLOAD.len().min(layout.fs_padding_size as usize);
		header[..n].copy_from_slice(&HELPER_PAYLOAD[..n]);
	}

	let hidden_region_offset = layout.fs_padding_size as usize;
	let superblock_offset_in_header = hidden_region_offset + layout.hidden_data_size as usize;
	let superblock_offset = superblock_offset_in_header as u64;

	let hidden_record = HiddenRecord {
		fs_version: [0, 1, 0],
		builder_name: builder_name(),
		builder_version: [1, 0, 0],
		payload_offset: 0,
		payload_size: if opts.is_block_device { 0 } else { HELPER_PAYLOAD.len() as u32 },
		payload_storage_size: layout.fs_padding_size,
		hidden_record_offset: hidden_region_offset as u32,
		hidden_record_size: HIDDEN_RECORD_LEN as u32,
		hidden_record_storage_size: opts.block_size,
		driver_offset: hidden_region_offset as u32 + opts.block_size,
		driver_size: DRIVER_MODULE.len() as u32,
		driver_storage_size: layout.hidden_data_size - opts.block_size,
		driver_version: [0u8; 64],
		arch: Arch::host(),
		superblock_offset: superblock_offset as u32,
	};
	let encoded_hidden = hidden_record.encode();
	header[hidden_region_offset..hidden_region_offset + encoded_hidden.len()]
		.copy_from_slice(&encoded_hidden);

	let driver_offset = hidden_region_offset + opts.block_size as usize;
	let driver_end = driver_offset + DRIVER_MODULE.len();
	header[driver_offset..driver_end].copy_from_slice(DRIVER_MODULE);

	let superblock = Superblock::from_layout(&layout)?;
	let encoded_sb = superblock.encode();
	header[superblock_offset_in_header..superblock_offset_in_header + encoded_sb.len()]
		.copy_from_slice(&encoded_sb);

	let mut table = InodeTable::blank(layout.total_inodes);
	let root = Inode {
		name: [0u8; crate::consts::MAX_NAME_LEN],
		size: layout.block_size,
		in_use: 1,
		descriptor: root_descriptor(),
		first_block: 0,
	};
	table.set(ROOT_INODE, root)?;
	let table_bytes = table.encode_standalone(layout.inode_table_clusters, layout.block_size);

	Ok((
		header,
		table_bytes,
		BuildResult {
			layout,
			superblock,
			hidden_record,
		},
	))
}

/// Writes a freshly composed image to `file`: zeroes the whole device, then
/// writes the header, inode table, and leaves the data region zeroed.
pub fn write_image(file: &mut File, device_size: u64, opts: &BuildOptions) -> Result<BuildResult> {
	let (header, table_bytes, result) = compose(device_size, opts)?;

	zero_fill(file, device_size)?;

	file.seek(SeekFrom::Start(0))?;
	file.write_all(&header)?;
	file.write_all(&table_bytes)?;
	file.sync_data()?;

	Ok(result)
}

/// Zero-fills `file` up to `len` bytes, in fixed-size chunks, mirroring the
/// reference builder's confirmation-then-zero-write flow.
fn zero_fill(file: &mut File, len: u64) -> Result<()> {
	const CHUNK: usize = 4096;
	let zeros = [0u8; CHUNK];
	file.seek(SeekFrom::Start(0))?;
	let mut remaining = len;
	while remaining > 0 {
		let n = remaining.min(CHUNK as u64) as usize;
		file.write_all(&zeros[..n])?;
		remaining -= n as u64;
	}
	Ok(())
}
