use jsxpipe_core::AnyEmptyResult;

mod common;

use common::jsxpipe_cmd;

#[test]
fn can_init() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	jsxpipe_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Created jsxpipe.toml"));

	let content = std::fs::read_to_string(tmp.path().join("jsxpipe.toml"))?;
	assert!(content.contains("[compiler]"));
	assert!(content.contains("command = "));

	// The sample must load as a valid config.
	let config = jsxpipe_core::PipelineConfig::from_toml(&content)?;
	assert!(config.compiler.command.is_some());

	Ok(())
}

#[test]
fn init_does_not_overwrite() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config_path = tmp.path().join("jsxpipe.toml");
	std::fs::write(&config_path, "existing config")?;

	jsxpipe_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("already exists"));

	assert_eq!(std::fs::read_to_string(&config_path)?, "existing config");

	Ok(())
}

#[test]
fn init_respects_dotfile_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join(".config"))?;
	std::fs::write(tmp.path().join(".config/jsxpipe.toml"), "")?;

	jsxpipe_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("already exists"));

	assert!(!tmp.path().join("jsxpipe.toml").exists());

	Ok(())
}
