use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::PipelineError;
use crate::PipelineResult;
use crate::options::CompileArgs;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["jsxpipe.toml", ".jsxpipe.toml", ".config/jsxpipe.toml"];

/// Marker identifying embedded JSX blocks inside a `type` attribute.
pub const DEFAULT_DIALECT_MARKER: &str = "text/jsx";
/// Marker written in place of the dialect marker once a block is compiled.
pub const DEFAULT_RUNTIME_MARKER: &str = "text/javascript";
/// Feature enabled on every compile call.
pub const DEFAULT_FEATURE_FLAG: &str = "react";

/// Configuration loaded from a `jsxpipe.toml` file.
///
/// ```toml
/// dialect_marker = "text/jsx"
/// runtime_marker = "text/javascript"
/// feature_flag = "react"
/// markup_extensions = ["html", "htm"]
/// script_extensions = ["js", "jsx"]
///
/// [compiler]
/// command = "node scripts/compile.js"
///
/// [args]
/// whitelist = ["es6.arrowFunctions"]
/// moduleId = "app"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
	/// Substring of a `<script>` `type` value marking an embedded block.
	#[serde(default = "default_dialect_marker")]
	pub dialect_marker: String,
	/// Replacement for the dialect marker in compiled output.
	#[serde(default = "default_runtime_marker")]
	pub runtime_marker: String,
	/// Feature appended to the `whitelist` option of every compile call.
	#[serde(default = "default_feature_flag")]
	pub feature_flag: String,
	/// Extensions of host documents scanned for embedded blocks.
	#[serde(default = "default_markup_extensions")]
	pub markup_extensions: Vec<String>,
	/// Extensions of files compiled as a whole.
	#[serde(default = "default_script_extensions")]
	pub script_extensions: Vec<String>,
	/// The external compiler.
	#[serde(default)]
	pub compiler: CompilerConfig,
	/// Options forwarded to every compile call.
	#[serde(default)]
	pub args: CompileArgs,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			dialect_marker: default_dialect_marker(),
			runtime_marker: default_runtime_marker(),
			feature_flag: default_feature_flag(),
			markup_extensions: default_markup_extensions(),
			script_extensions: default_script_extensions(),
			compiler: CompilerConfig::default(),
			args: CompileArgs::default(),
		}
	}
}

/// The `[compiler]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompilerConfig {
	/// Shell command run once per compiled unit. See
	/// [`CommandCompiler`](crate::CommandCompiler).
	#[serde(default)]
	pub command: Option<String>,
}

impl PipelineConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> PipelineResult<Option<PipelineConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		Self::from_toml(&content).map(Some)
	}

	pub fn from_toml(content: &str) -> PipelineResult<PipelineConfig> {
		toml::from_str(content).map_err(|e| PipelineError::ConfigParse(e.to_string()))
	}
}

fn default_dialect_marker() -> String {
	DEFAULT_DIALECT_MARKER.to_string()
}

fn default_runtime_marker() -> String {
	DEFAULT_RUNTIME_MARKER.to_string()
}

fn default_feature_flag() -> String {
	DEFAULT_FEATURE_FLAG.to_string()
}

fn default_markup_extensions() -> Vec<String> {
	vec!["html".to_string(), "htm".to_string()]
}

fn default_script_extensions() -> Vec<String> {
	vec!["js".to_string(), "jsx".to_string()]
}
