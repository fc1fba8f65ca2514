//! Builds a fresh YukiFS image on a file or block device.

use std::fs::OpenOptions;
use std::io::{self, BufRead, Read, Write};
use std::os::unix::fs::FileTypeExt;
use std::path::PathBuf;
use std::process::exit;
use yukifs::build::{self, BuildOptions};
use yukifs::cli;
use yukifs::consts::DEFAULT_BLOCK_SIZE;
use yukifs::header;

const VERSION: &str = "0.1.0";

#[derive(Default)]
struct Args {
	device_path: Option<PathBuf>,
	block_size: Option<u32>,
	try_run: Option<u64>,
	assume_yes: bool,
	help: bool,
	version: bool,
}

fn print_usage(bin: &str) {
	println!("Usage: {bin} [OPTIONS] <device>");
	println!("Options:");
	println!("  -y, --yes               Do not prompt for confirmation before overwriting.");
	println!("  -t, --try-run=<size>    Compose the image in memory against a device of");
	println!("                          the given size, without touching any path.");
	println!("  -b, --block-size=<n>    Block size in bytes (default {DEFAULT_BLOCK_SIZE}).");
	println!("  -h, --help              Display this help message.");
	println!("  -v, --version           Display version info.");
}

fn parse_args(bin: &str, mut iter: impl Iterator<Item = String>) -> Args {
	let mut args = Args::default();
	while let Some(arg) = iter.next() {
		match arg.as_str() {
			"-y" | "--yes" => args.assume_yes = true,
			"-h" | "--help" => args.help = true,
			"-v" | "--version" => args.version = true,
			"-t" | "--try-run" => {
				let size = iter
					.next()
					.unwrap_or_else(|| cli::die(bin, "--try-run requires a size"));
				args.try_run = Some(size.parse().unwrap_or_else(|_| {
					cli::die(bin, format!("invalid size: {size}"))
				}));
			}
			"-b" | "--block-size" => {
				let size = iter
					.next()
					.unwrap_or_else(|| cli::die(bin, "--block-size requires a value"));
				args.block_size = Some(size.parse().unwrap_or_else(|_| {
					cli::die(bin, format!("invalid block size: {size}"))
				}));
			}
			other => args.device_path = Some(PathBuf::from(other)),
		}
	}
	args
}

fn confirm(question: &str) -> bool {
	print!("{question}");
	let _ = io::stdout().flush();
	io::stdin()
		.lock()
		.lines()
		.next()
		.and_then(|l| l.ok())
		.map(|s| s.trim().eq_ignore_ascii_case("y"))
		.unwrap_or(false)
}

fn main() {
	let (bin, args) = cli::args();
	let args = parse_args(&bin, args);

	if args.help {
		print_usage(&bin);
		return;
	}
	if args.version {
		println!("mkfs version {VERSION}");
		return;
	}

	if args.assume_yes && args.try_run.is_some() {
		cli::die(&bin, "--yes and --try-run are mutually exclusive");
	}

	let block_size = args.block_size.unwrap_or(DEFAULT_BLOCK_SIZE);

	if let Some(size) = args.try_run {
		let opts = BuildOptions {
			block_size,
			is_block_device: false,
		};
		match build::compose(size, &opts) {
			Ok((_, _, result)) => {
				println!("try-run succeeded for a {size}-byte device:");
				println!("  block_size:        {}", result.layout.block_size);
				println!("  total_inodes:      {}", result.layout.total_inodes);
				println!("  inode_table_offset:{}", result.layout.inode_table_offset);
				println!("  data_blocks_offset:{}", result.layout.data_blocks_offset);
			}
			Err(e) => cli::die(&bin, e),
		}
		return;
	}

	let device_path = args
		.device_path
		.unwrap_or_else(|| cli::die(&bin, "specify a path to a device or image file"));

	let metadata = std::fs::metadata(&device_path).unwrap_or_else(|e| {
		cli::die(&bin, format!("{}: {e}", device_path.display()));
	});
	let is_block_device = metadata.file_type().is_block_device();

	let mut file = OpenOptions::new()
		.read(true)
		.write(true)
		.open(&device_path)
		.unwrap_or_else(|e| cli::die(&bin, format!("{}: {e}", device_path.display())));

	let mut window = vec![0u8; yukifs::consts::SCAN_WINDOW];
	let _ = file.read(&mut window);
	if header::scan(&window).is_ok() && !args.assume_yes {
		let ok = confirm(&format!(
			"{} appears to already contain a filesystem. Proceed anyway? (y/N) ",
			device_path.display()
		));
		if !ok {
			eprintln!("Abort.");
			exit(1);
		}
	}

	let device_size = yukifs::disk::device_size(&device_path)
		.unwrap_or_else(|e| cli::die(&bin, format!("{}: {e}", device_path.display())));

	let opts = BuildOptions {
		block_size,
		is_block_device,
	};
	let result = build::write_image(&mut file, device_size, &opts)
		.unwrap_or_else(|e| cli::die(&bin, format!("failed to create filesystem: {e}")));

	println!(
		"created YukiFS on {}: {} inodes, block size {}",
		device_path.display(),
		result.layout.total_inodes,
		result.layout.block_size
	);
}
