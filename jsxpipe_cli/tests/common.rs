#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;

pub const UPPERCASE_CONFIG: &str = "[compiler]\ncommand = \"tr '[:lower:]' '[:upper:]'\"\n";

pub fn jsxpipe_cmd() -> Command {
	let mut cmd = Command::cargo_bin("jsxpipe").unwrap_or_else(|e| panic!("missing binary: {e}"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

pub fn write_file(root: &Path, relative: &str, content: &str) -> std::io::Result<()> {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)
}
