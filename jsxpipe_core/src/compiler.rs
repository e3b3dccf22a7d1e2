use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::thread::JoinHandle;

use serde_json::Value;
use thiserror::Error;

use crate::PipelineError;
use crate::PipelineResult;
use crate::normalize::is_stack_frame;
use crate::normalize::normalize_failure;
use crate::options::CompileArgs;
use crate::options::CompileOptions;
use crate::options::merge;

/// Environment variable carrying the JSON encoded [`CompileOptions`] for
/// [`CommandCompiler`] processes.
pub const OPTIONS_ENV_VAR: &str = "JSXPIPE_OPTIONS";

/// Compiled code together with an optional source map.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
	pub code: String,
	pub source_map: Option<Value>,
}

impl CompileOutput {
	pub fn code(code: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			source_map: None,
		}
	}

	#[must_use]
	pub fn with_source_map(mut self, source_map: Value) -> Self {
		self.source_map = Some(source_map);
		self
	}
}

/// A compiler rejected its input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct CompileFailure {
	pub message: String,
	pub stack: Option<String>,
}

impl CompileFailure {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			stack: None,
		}
	}

	#[must_use]
	pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
		self.stack = Some(stack.into());
		self
	}

	/// Split raw failure output into a message and the stack frames that
	/// follow it.
	pub fn from_output(text: &str) -> Self {
		let text = text.trim_end();
		let lines: Vec<&str> = text.split('\n').collect();
		let Some(frame_start) = lines.iter().skip(1).position(|line| is_stack_frame(line)) else {
			return Self::new(text);
		};

		let split = frame_start + 1;
		Self::new(lines[..split].join("\n")).with_stack(lines[split..].join("\n"))
	}
}

/// The external compiler: source text and options in, compiled code out.
pub trait Compiler {
	fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompileOutput, CompileFailure>;
}

impl<F> Compiler for F
where
	F: Fn(&str, &CompileOptions) -> Result<CompileOutput, CompileFailure>,
{
	fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompileOutput, CompileFailure> {
		self(source, options)
	}
}

/// Compiles single units of text (a whole script file or one embedded block)
/// with the option layers `{filename} < caller args < block directives`.
pub struct Invoker<'a, C: ?Sized> {
	pub compiler: &'a C,
	pub feature_flag: &'a str,
	pub caller_args: Option<&'a CompileArgs>,
}

impl<C: Compiler + ?Sized> Invoker<'_, C> {
	/// Build the effective options for one compile call.
	pub fn options(&self, filename: &str, directives: Option<&CompileArgs>) -> CompileOptions {
		let base = CompileArgs::for_file(filename);
		let layers = std::iter::once(&base)
			.chain(self.caller_args)
			.chain(directives);

		merge(layers, self.feature_flag).resolve(filename)
	}

	pub fn compile(
		&self,
		filename: &str,
		source: &str,
		directives: Option<&CompileArgs>,
	) -> PipelineResult<CompileOutput> {
		let options = self.options(filename, directives);
		tracing::debug!(filename, features = ?options.features, "invoking compiler");

		self.compiler.compile(source, &options).map_err(|failure| {
			let (message, stack) = normalize_failure(&failure.message, failure.stack.as_deref());
			PipelineError::Compile {
				file: filename.to_string(),
				message,
				stack,
			}
		})
	}
}

/// Runs a shell command per compile call.
///
/// The source text is written to stdin and the options are passed as JSON in
/// [`OPTIONS_ENV_VAR`]. Stdout is either the compiled code or a JSON object
/// `{"code": "...", "map": {...}}`. A non-zero exit status is a failure whose
/// message is read from stderr.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
	command: String,
	current_dir: Option<PathBuf>,
}

impl CommandCompiler {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			current_dir: None,
		}
	}

	#[must_use]
	pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.current_dir = Some(dir.into());
		self
	}

	fn shell(&self) -> Command {
		let mut command = if cfg!(windows) {
			let mut command = Command::new("cmd");
			command.arg("/C");
			command
		} else {
			let mut command = Command::new("sh");
			command.arg("-c");
			command
		};
		command.arg(&self.command);
		if let Some(dir) = &self.current_dir {
			command.current_dir(dir);
		}
		command
	}
}

impl Compiler for CommandCompiler {
	fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompileOutput, CompileFailure> {
		let options_json =
			serde_json::to_string(options).map_err(|e| CompileFailure::new(e.to_string()))?;

		let mut child = self
			.shell()
			.env(OPTIONS_ENV_VAR, options_json)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.map_err(|e| CompileFailure::new(format!("failed to run `{}`: {e}", self.command)))?;

		// Feed stdin from a separate thread so a compiler that writes a lot
		// before draining its input cannot deadlock on a full pipe.
		let writer = child.stdin.take().map(|mut stdin| {
			let source = source.to_string();
			thread::spawn(move || stdin.write_all(source.as_bytes()))
		});

		let output = child
			.wait_with_output()
			.map_err(|e| CompileFailure::new(format!("failed to run `{}`: {e}", self.command)))?;

		let stdin_result = writer.map(JoinHandle::join);

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr);
			if stderr.trim().is_empty() {
				return Err(CompileFailure::new(format!(
					"`{}` exited with status {}",
					self.command,
					output
						.status
						.code()
						.map_or_else(|| "unknown".to_string(), |code| code.to_string())
				)));
			}
			return Err(CompileFailure::from_output(&stderr));
		}

		if let Some(result) = stdin_result {
			check_stdin_write(&self.command, result)?;
		}

		let stdout = String::from_utf8(output.stdout)
			.map_err(|_| CompileFailure::new(format!("`{}` wrote invalid UTF-8", self.command)))?;

		Ok(parse_command_output(stdout))
	}
}

/// A compiler may exit without reading all of its input, so a broken pipe is
/// not a failure on its own. Any other write error means the compiler saw a
/// truncated source.
pub(crate) fn check_stdin_write(
	command: &str,
	result: thread::Result<io::Result<()>>,
) -> Result<(), CompileFailure> {
	match result {
		Ok(Ok(())) => Ok(()),
		Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
		Ok(Err(e)) => {
			Err(CompileFailure::new(format!(
				"failed to write source to `{command}`: {e}"
			)))
		}
		Err(_) => {
			Err(CompileFailure::new(format!(
				"failed to write source to `{command}`"
			)))
		}
	}
}

fn parse_command_output(stdout: String) -> CompileOutput {
	if let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(&stdout) {
		if let Some(Value::String(code)) = object.remove("code") {
			let source_map = object.remove("map").filter(|map| !map.is_null());
			return CompileOutput { code, source_map };
		}
	}

	CompileOutput::code(stdout)
}
