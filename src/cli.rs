//! Small helpers shared by the `mkfs`/`infofs`/`viewfs` front ends.

use std::env;
use std::fmt;
use std::process::exit;

/// Returns the command's name along with an iterator over its arguments.
pub fn args() -> (String, env::Args) {
	let mut args = env::args();
	let bin = args.next().unwrap_or_else(|| "yukifs".to_string());
	(bin, args)
}

/// Prints `{bin}: error: {msg}` to stderr and exits with status 1.
pub fn die<M: fmt::Display>(bin: &str, msg: M) -> ! {
	eprintln!("{bin}: error: {msg}");
	exit(1);
}
