#![cfg(unix)]

use std::io::BufRead;
use std::io::BufReader;
use std::process::Child;
use std::process::Stdio;
use std::sync::mpsc;
use std::time::Duration;
use std::time::Instant;

use jsxpipe_core::AnyEmptyResult;
use predicates::prelude::*;
use similar_asserts::assert_eq;

mod common;

use common::UPPERCASE_CONFIG;
use common::jsxpipe_cmd;
use common::write_file;

#[test]
fn build_compiles_scripts_and_embedded_blocks() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	write_file(root, "jsxpipe.toml", UPPERCASE_CONFIG)?;
	write_file(root, "a.js", "x()")?;
	write_file(
		root,
		"pages/index.html",
		"<p>hi</p><script type=\"text/jsx\">y()</script>",
	)?;
	write_file(root, "notes.txt", "keep me")?;

	jsxpipe_cmd()
		.arg("build")
		.arg("--path")
		.arg(root)
		.assert()
		.success()
		.stderr(predicate::str::contains("Transformed a.js"))
		.stderr(predicate::str::contains("Transformed pages/index.html"))
		.stderr(predicate::str::contains("notes.txt").not());

	let out = root.join("dist");
	assert_eq!(std::fs::read_to_string(out.join("a.js"))?, "X()");
	assert_eq!(
		std::fs::read_to_string(out.join("pages/index.html"))?,
		"<p>hi</p><script type=\"text/javascript\">Y()</script>"
	);
	assert_eq!(std::fs::read_to_string(out.join("notes.txt"))?, "keep me");
	assert!(!out.join("jsxpipe.toml").exists());

	Ok(())
}

#[test]
fn build_writes_to_custom_out_dir() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	write_file(root, "jsxpipe.toml", UPPERCASE_CONFIG)?;
	write_file(root, "a.jsx", "x()")?;

	jsxpipe_cmd()
		.args(["build", "--out", "public", "--path"])
		.arg(root)
		.assert()
		.success();

	assert_eq!(std::fs::read_to_string(root.join("public/a.jsx"))?, "X()");
	assert!(!root.join("dist").exists());

	Ok(())
}

#[test]
fn build_does_not_read_its_own_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	write_file(root, "jsxpipe.toml", UPPERCASE_CONFIG)?;
	write_file(root, "a.js", "x()")?;

	for _ in 0..2 {
		jsxpipe_cmd()
			.arg("build")
			.arg("--path")
			.arg(root)
			.assert()
			.success();
	}

	assert!(!root.join("dist/dist").exists());

	Ok(())
}

#[test]
fn build_skips_gitignored_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	write_file(root, "jsxpipe.toml", UPPERCASE_CONFIG)?;
	write_file(root, ".gitignore", "vendor/\n")?;
	write_file(root, "a.js", "x()")?;
	write_file(root, "vendor/lib.js", "y()")?;

	jsxpipe_cmd()
		.arg("build")
		.arg("--path")
		.arg(root)
		.assert()
		.success();

	assert!(root.join("dist/a.js").exists());
	assert!(!root.join("dist/vendor/lib.js").exists());

	Ok(())
}

#[test]
fn build_failure_exits_with_code_two_and_writes_nothing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	write_file(
		root,
		"jsxpipe.toml",
		"[compiler]\ncommand = \"echo 'SyntaxError: unexpected token' >&2; exit 1\"\n",
	)?;
	write_file(root, "a.js", "x(")?;

	jsxpipe_cmd()
		.arg("build")
		.arg("--path")
		.arg(root)
		.assert()
		.code(2)
		.stderr(predicate::str::contains(
			"Failed to process a.js due to SyntaxError: unexpected token",
		));

	assert!(!root.join("dist").exists());

	Ok(())
}

#[test]
fn build_forwards_config_args_to_the_compiler() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	write_file(
		root,
		"jsxpipe.toml",
		"[compiler]\ncommand = \"printf '%s' \\\"$JSXPIPE_OPTIONS\\\"\"\n\n[args]\nmoduleId = \
		 \"app\"\n",
	)?;
	write_file(root, "a.js", "x()")?;

	jsxpipe_cmd()
		.arg("build")
		.arg("--path")
		.arg(root)
		.assert()
		.success();

	let options: serde_json::Value =
		serde_json::from_str(&std::fs::read_to_string(root.join("dist/a.js"))?)?;
	assert_eq!(options["filename"], "a.js");
	assert_eq!(options["moduleId"], "app");
	assert_eq!(options["whitelist"], serde_json::json!(["react"]));

	Ok(())
}

#[test]
fn build_without_compiler_command_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_file(tmp.path(), "a.js", "x()")?;

	jsxpipe_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicate::str::contains("no compiler command configured"));

	Ok(())
}

#[test]
fn build_rejects_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_file(tmp.path(), "jsxpipe.toml", "[compiler\n")?;

	jsxpipe_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2);

	Ok(())
}

#[test]
fn missing_subcommand_exits_with_code_one() {
	jsxpipe_cmd()
		.assert()
		.code(1)
		.stderr(predicate::str::contains("No subcommand specified"));
}

/// Stops a long running `jsxpipe` process when the test ends.
struct KillOnDrop(Child);

impl Drop for KillOnDrop {
	fn drop(&mut self) {
		let _ = self.0.kill();
		let _ = self.0.wait();
	}
}

fn wait_for(condition: impl Fn() -> bool) -> bool {
	let deadline = Instant::now() + Duration::from_secs(10);
	while Instant::now() < deadline {
		if condition() {
			return true;
		}
		std::thread::sleep(Duration::from_millis(50));
	}
	condition()
}

#[test]
fn watch_rebuilds_changes_and_deletes_removed_outputs() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	write_file(
		root,
		"jsxpipe.toml",
		r#"[compiler]
command = '''printf '{"code":"OUT","map":{"version":3}}' '''
"#,
	)?;
	write_file(root, "a.js", "x()")?;

	let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_jsxpipe"))
		.args(["build", "--watch", "--path"])
		.arg(root)
		.env("NO_COLOR", "1")
		.stdout(Stdio::piped())
		.stderr(Stdio::null())
		.spawn()?;
	let stdout = child.stdout.take().ok_or("missing stdout")?;
	let _guard = KillOnDrop(child);

	// Keep draining stdout so later status lines never hit a closed pipe.
	let (ready_tx, ready_rx) = mpsc::channel();
	std::thread::spawn(move || {
		for line in BufReader::new(stdout).lines().map_while(Result::ok) {
			if line.contains("Watching for file changes") {
				let _ = ready_tx.send(());
			}
		}
	});
	assert!(
		ready_rx.recv_timeout(Duration::from_secs(10)).is_ok(),
		"watch mode did not start"
	);

	let out = root.join("dist");
	assert_eq!(std::fs::read_to_string(out.join("a.js"))?, "OUT");
	assert!(out.join("a.js.map").exists());

	std::fs::remove_file(root.join("a.js"))?;
	write_file(root, "b.js", "y()")?;

	assert!(
		wait_for(|| {
			!out.join("a.js").exists() && !out.join("a.js.map").exists() && out.join("b.js").exists()
		}),
		"watch mode did not apply the change set"
	);
	assert_eq!(std::fs::read_to_string(out.join("b.js"))?, "OUT");

	Ok(())
}
