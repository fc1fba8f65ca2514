//! Reports the hidden record and superblock fields of an existing image.

use std::fs::File;
use std::path::PathBuf;
use yukifs::cli;
use yukifs::consts::Arch;
use yukifs::inspect;

const VERSION: &str = "0.1.0";

fn print_usage(bin: &str) {
	println!("Usage: {bin} [OPTIONS] <image>");
	println!("Options:");
	println!("  -h, --help       Display this help message.");
	println!("  -v, --version    Display version info.");
}

fn arch_name(arch: Arch) -> &'static str {
	match arch {
		Arch::Unknown => "unknown",
		Arch::X86_32 => "x86-32",
		Arch::X86_64 => "x86-64",
		Arch::Arm32 => "arm32",
		Arch::Arm64 => "arm64",
		Arch::RiscV => "riscv",
	}
}

fn main() {
	let (bin, mut args) = cli::args();

	let mut path = None;
	for arg in &mut args {
		match arg.as_str() {
			"-h" | "--help" => {
				print_usage(&bin);
				return;
			}
			"-v" | "--version" => {
				println!("infofs version {VERSION}");
				return;
			}
			other => path = Some(PathBuf::from(other)),
		}
	}
	let path = path.unwrap_or_else(|| cli::die(&bin, "specify a path to an image"));

	let file = File::open(&path).unwrap_or_else(|e| cli::die(&bin, format!("{}: {e}", path.display())));
	let report = inspect::inspect(&file).unwrap_or_else(|e| cli::die(&bin, format!("{}: {e}", path.display())));

	println!("YukiFS image: {}", path.display());
	println!("  architecture:        {}", arch_name(report.hidden_record.arch));
	println!("  superblock_offset:   {}", report.hidden_record.superblock_offset);
	println!("  block_size:          {}", report.superblock.block_size);
	println!("  block_count:         {}", report.superblock.block_count);
	println!("  block_free:          {}", report.superblock.block_free);
	println!("  total_inodes:        {}", report.superblock.total_inodes);
	println!("  free_inodes:         {}", report.superblock.free_inodes);
	println!("  inode_table_offset:  {}", report.superblock.inode_table_offset);
	println!("  inode_table_clusters:{}", report.superblock.inode_table_clusters);
	println!("  data_blocks_offset:  {}", report.superblock.data_blocks_offset);
	println!("  data_blocks_total:   {}", report.superblock.data_blocks_total_size);
	println!("  unallocated_space:   {}", report.superblock.unallocated_space_size);

	if report.warnings.is_empty() {
		println!("  no inconsistencies detected");
	} else {
		println!("  warnings:");
		for w in &report.warnings {
			println!("    - {w}");
		}
	}
}
