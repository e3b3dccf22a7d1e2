use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum PipelineError {
	#[error(transparent)]
	#[diagnostic(code(jsxpipe::io_error))]
	Io(#[from] std::io::Error),

	#[error("{message}")]
	#[diagnostic(
		code(jsxpipe::compile_failure),
		help("fix the reported error in `{file}` and rebuild")
	)]
	Compile {
		file: String,
		message: String,
		stack: Option<String>,
	},

	#[error("`{file}` is not valid UTF-8")]
	#[diagnostic(
		code(jsxpipe::invalid_encoding),
		help("markup and script files must be UTF-8 encoded to be compiled")
	)]
	InvalidEncoding { file: String },

	#[error("failed to serialize the source map for `{file}`: {reason}")]
	#[diagnostic(code(jsxpipe::source_map))]
	SourceMap { file: String, reason: String },

	#[error("invalid dialect marker pattern: {0}")]
	#[diagnostic(
		code(jsxpipe::invalid_marker),
		help("check the `dialect_marker` value in jsxpipe.toml")
	)]
	InvalidMarker(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(jsxpipe::config_parse),
		help("check that jsxpipe.toml is valid TOML with optional [compiler] and [args] sections")
	)]
	ConfigParse(String),

	#[error("no compiler command configured")]
	#[diagnostic(
		code(jsxpipe::missing_compiler),
		help("set `command` in the [compiler] section of jsxpipe.toml")
	)]
	MissingCompilerCommand,
}

pub type PipelineResult<T> = Result<T, PipelineError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
