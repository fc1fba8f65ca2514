//! Dumps a raw data block (or a range within one) from an existing image,
//! in hex or text.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use yukifs::cli;
use yukifs::inspect;

const VERSION: &str = "0.1.0";

#[derive(Default)]
struct Args {
	input_file: Option<PathBuf>,
	output_file: Option<PathBuf>,
	block_num: Option<u32>,
	count: Option<u32>,
	skip: u32,
	format: String,
	help: bool,
}

fn print_usage(bin: &str) {
	println!("Usage: {bin} [OPTIONS]");
	println!("Options:");
	println!("  -i, --if=<filename>     Input file (disk image).");
	println!("  -o, --of=<filename>     Output file (defaults to stdout).");
	println!("  -b, --block-num=<n>     Starting block number (required).");
	println!("  -c, --count=<n>         Bytes to read (defaults to block size).");
	println!("  -s, --skip=<n>          Bytes to skip into the block (default 0).");
	println!("  -f, --format=<hex|text> Output format (default hex).");
	println!("  -h, --help              Display this help message.");
	println!("  -v, --version           Display version info.");
}

fn parse_args(bin: &str, mut iter: impl Iterator<Item = String>) -> Args {
	let mut args = Args {
		format: "hex".to_string(),
		..Default::default()
	};
	while let Some(arg) = iter.next() {
		let mut value = || {
			iter.next()
				.unwrap_or_else(|| cli::die(bin, format!("{arg} requires a value")))
		};
		match arg.as_str() {
			"-i" | "--if" => args.input_file = Some(PathBuf::from(value())),
			"-o" | "--of" => args.output_file = Some(PathBuf::from(value())),
			"-b" | "--block-num" => {
				let v = value();
				args.block_num = Some(v.parse().unwrap_or_else(|_| cli::die(bin, format!("invalid block number: {v}"))));
			}
			"-c" | "--count" => {
				let v = value();
				args.count = Some(v.parse().unwrap_or_else(|_| cli::die(bin, format!("invalid count: {v}"))));
			}
			"-s" | "--skip" => {
				let v = value();
				args.skip = v.parse().unwrap_or_else(|_| cli::die(bin, format!("invalid skip: {v}")));
			}
			"-f" | "--format" => {
				let v = value();
				if v != "hex" && v != "text" {
					cli::die(bin, format!("invalid format: {v} (must be 'hex' or 'text')"));
				}
				args.format = v;
			}
			"-h" | "--help" => args.help = true,
			"-v" | "--version" => {
				println!("viewfs version {VERSION}");
				std::process::exit(0);
			}
			other => cli::die(bin, format!("unrecognized option: {other}")),
		}
	}
	args
}

fn main() {
	let (bin, args) = cli::args();
	let args = parse_args(&bin, args);

	if args.help {
		print_usage(&bin);
		return;
	}

	let input_file = args
		.input_file
		.unwrap_or_else(|| cli::die(&bin, "input file (--if) is required"));
	let block_num = args
		.block_num
		.unwrap_or_else(|| cli::die(&bin, "block number (--block-num) is required"));

	let file = File::open(&input_file).unwrap_or_else(|e| cli::die(&bin, format!("{}: {e}", input_file.display())));
	let report = inspect::inspect(&file).unwrap_or_else(|e| cli::die(&bin, format!("{}: {e}", input_file.display())));

	let count = args.count.unwrap_or(report.superblock.block_size);
	let data = inspect::read_block_range(&file, &report.superblock, block_num, args.skip, count)
		.unwrap_or_else(|e| cli::die(&bin, format!("{}: {e}", input_file.display())));

	let rendered = match args.format.as_str() {
		"hex" => inspect::format_hex(&data),
		"text" => {
			let mut s = String::from_utf8_lossy(&data).into_owned();
			s.push('\n');
			s
		}
		other => cli::die(&bin, format!("unknown format '{other}'")),
	};

	match args.output_file {
		Some(path) => {
			let mut f = File::create(&path).unwrap_or_else(|e| cli::die(&bin, format!("{}: {e}", path.display())));
			f.write_all(rendered.as_bytes())
				.unwrap_or_else(|e| cli::die(&bin, format!("{}: {e}", path.display())));
		}
		None => print!("{rendered}"),
	}
}
