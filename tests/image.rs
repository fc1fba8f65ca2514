//! End-to-end scenarios against a real backing file: build, mount, and
//! exercise create/read/write/append/unlink/exhaustion.

use std::fs::OpenOptions;
use tempfile::NamedTempFile;
use yukifs::build::{self, BuildOptions};
use yukifs::error::Error;
use yukifs::session::Session;

const ONE_MIB: u64 = 1024 * 1024;

fn build_fixture(device_size: u64, block_size: u32) -> NamedTempFile {
	let tmp = NamedTempFile::new().unwrap();
	tmp.as_file().set_len(device_size).unwrap();
	let mut file = OpenOptions::new()
		.write(true)
		.read(true)
		.open(tmp.path())
		.unwrap();
	let opts = BuildOptions {
		block_size,
		is_block_device: false,
	};
	build::write_image(&mut file, device_size, &opts).unwrap();
	tmp
}

#[test]
fn build_then_inspect_one_mib() {
	let tmp = build_fixture(ONE_MIB, 1024);
	let session = Session::mount(tmp.path()).unwrap();
	let stat = session.statfs();
	assert_eq!(stat.block_size, 1024);
	assert_eq!(stat.block_count, 990);
	assert_eq!(stat.total_inodes, 990);
	assert_eq!(stat.free_inodes, 989);
	assert_eq!(stat.block_free, 989);
}

#[test]
fn create_then_lookup() {
	let tmp = build_fixture(ONE_MIB, 1024);
	let session = Session::mount(tmp.path()).unwrap();

	let inode_idx = session.create(b"hello", 0o644).unwrap();
	let found = session.lookup(b"hello").unwrap();
	assert_eq!(found, inode_idx);
	assert_eq!(session.statfs().free_inodes, 988);
}

#[test]
fn write_and_read_back() {
	let tmp = build_fixture(ONE_MIB, 1024);
	let session = Session::mount(tmp.path()).unwrap();
	session.create(b"hello", 0o644).unwrap();

	let mut handle = session.open(session.lookup(b"hello").unwrap(), false).unwrap();
	let n = session.write(&mut handle, b"hello\nworld").unwrap();
	assert_eq!(n, 11);

	let mut handle = session.open(session.lookup(b"hello").unwrap(), false).unwrap();
	let mut buf = [0u8; 11];
	let n = session.read(&mut handle, &mut buf).unwrap();
	assert_eq!(n, 11);
	assert_eq!(&buf, b"hello\nworld");

	let mut handle = session.open(session.lookup(b"hello").unwrap(), false).unwrap();
	handle.position = 6;
	let mut buf = [0u8; 5];
	session.read(&mut handle, &mut buf).unwrap();
	assert_eq!(&buf, b"world");

	let mut handle = session.open(session.lookup(b"hello").unwrap(), false).unwrap();
	handle.position = 11;
	let mut buf = [0u8; 1];
	let n = session.read(&mut handle, &mut buf).unwrap();
	assert_eq!(n, 0);
}

#[test]
fn append_preserves_prior_content() {
	let tmp = build_fixture(ONE_MIB, 1024);
	let session = Session::mount(tmp.path()).unwrap();
	session.create(b"hello", 0o644).unwrap();

	let mut handle = session.open(session.lookup(b"hello").unwrap(), false).unwrap();
	session.write(&mut handle, b"hello\nworld").unwrap();

	let mut handle = session.open(session.lookup(b"hello").unwrap(), true).unwrap();
	assert_eq!(handle.position, 11);
	session.write(&mut handle, b"!").unwrap();

	let mut handle = session.open(session.lookup(b"hello").unwrap(), false).unwrap();
	let mut buf = [0u8; 12];
	session.read(&mut handle, &mut buf).unwrap();
	assert_eq!(&buf, b"hello\nworld!");
}

#[test]
fn unlink_removes_and_zeroes() {
	let tmp = build_fixture(ONE_MIB, 1024);
	let session = Session::mount(tmp.path()).unwrap();
	let inode_idx = session.create(b"hello", 0o644).unwrap();
	let mut handle = session.open(inode_idx, false).unwrap();
	session.write(&mut handle, b"hello\nworld").unwrap();

	session.unlink(b"hello").unwrap();
	assert!(matches!(session.lookup(b"hello"), Err(Error::NotFound)));
	assert_eq!(session.statfs().free_inodes, 989);
}

#[test]
fn fill_to_exhaustion() {
	let tmp = build_fixture(ONE_MIB, 1024);
	let session = Session::mount(tmp.path()).unwrap();

	// At block_size 1024 the root's single data block holds 256 four-byte
	// slots, which is the binding limit long before the 990-entry inode
	// table runs out (see DESIGN.md's directory-vs-inode-capacity note).
	for i in 0..256 {
		let name = format!("f{i}");
		session.create(name.as_bytes(), 0o644).unwrap();
	}
	assert_eq!(session.statfs().free_inodes, 990 - 1 - 256);

	assert!(matches!(
		session.create(b"overflow", 0o644),
		Err(Error::NoSpace)
	));
}

#[test]
fn name_truncated_to_eight_bytes() {
	let tmp = build_fixture(ONE_MIB, 1024);
	let session = Session::mount(tmp.path()).unwrap();
	session.create(b"abcdefghX", 0o644).unwrap();

	assert!(session.lookup(b"abcdefgh").is_ok());
	assert!(matches!(session.lookup(b"abcdefghX"), Err(Error::NotFound)));
}

#[test]
fn mkdir_is_rejected() {
	let tmp = build_fixture(ONE_MIB, 1024);
	let session = Session::mount(tmp.path()).unwrap();
	assert!(matches!(session.mkdir(b"sub"), Err(Error::PermissionDenied)));
}
