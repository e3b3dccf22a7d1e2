use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Instant;

use derive_more::Deref;
use derive_more::DerefMut;
use miette::Diagnostic;
use thiserror::Error;

use crate::PipelineError;
use crate::PipelineResult;
use crate::compiler::CompileOutput;
use crate::compiler::Compiler;
use crate::compiler::Invoker;
use crate::config::PipelineConfig;
use crate::markup::BlockMatcher;
use crate::markup::transform_markup;
use crate::options::CompileArgs;
use crate::report::report_failure;
use crate::report::report_transformed;
use crate::router::FileKind;
use crate::router::FileRouter;

/// The files removed, added or changed since the previous batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
	pub removed: BTreeSet<String>,
	pub added_or_changed: BTreeMap<String, Vec<u8>>,
}

impl ChangeSet {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_removed(mut self, filename: impl Into<String>) -> Self {
		self.removed.insert(filename.into());
		self
	}

	#[must_use]
	pub fn with_file(mut self, filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
		self.added_or_changed.insert(filename.into(), content.into());
		self
	}

	pub fn is_empty(&self) -> bool {
		self.removed.is_empty() && self.added_or_changed.is_empty()
	}
}

/// One entry of an [`OutputMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEntry {
	Content(Vec<u8>),
	/// The file was removed in this batch.
	Tombstone,
}

impl OutputEntry {
	pub fn is_tombstone(&self) -> bool {
		matches!(self, Self::Tombstone)
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			Self::Content(bytes) => Some(bytes),
			Self::Tombstone => None,
		}
	}
}

/// Output of a batch keyed by filename. Source maps are stored under
/// `<filename>.map`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut)]
pub struct OutputMap(BTreeMap<String, OutputEntry>);

impl OutputMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn content(&self, filename: &str) -> Option<&[u8]> {
		self.get(filename).and_then(OutputEntry::as_bytes)
	}

	pub fn is_tombstone(&self, filename: &str) -> bool {
		self.get(filename).is_some_and(OutputEntry::is_tombstone)
	}
}

/// A batch stopped at `file`. Files processed before it remain in `output`;
/// files after it were never visited.
#[derive(Debug, Diagnostic, Error)]
#[error("Failed to process {file} due to {error}")]
#[diagnostic(code(jsxpipe::batch_failed))]
pub struct BatchFailure {
	pub file: String,
	#[source]
	#[diagnostic_source]
	pub error: PipelineError,
	pub output: OutputMap,
}

/// Routes every file of a change set to its handler and collects the output.
pub struct Pipeline<C> {
	compiler: C,
	router: FileRouter,
	matcher: BlockMatcher,
	runtime_marker: String,
	feature_flag: String,
}

impl<C: Compiler> Pipeline<C> {
	pub fn new(compiler: C, config: &PipelineConfig) -> PipelineResult<Self> {
		Ok(Self {
			compiler,
			router: FileRouter::from_config(config),
			matcher: BlockMatcher::new(&config.dialect_marker)?,
			runtime_marker: config.runtime_marker.clone(),
			feature_flag: config.feature_flag.clone(),
		})
	}

	pub fn compiler(&self) -> &C {
		&self.compiler
	}

	/// Process one batch.
	///
	/// Tombstones for every removed file are written before any other file is
	/// touched. A file that is both removed and changed keeps its tombstone.
	/// The first failure stops the batch and is returned together with the
	/// output written so far.
	pub fn run(
		&self,
		change_set: &ChangeSet,
		mut output: OutputMap,
		args: Option<&CompileArgs>,
	) -> Result<OutputMap, BatchFailure> {
		for filename in &change_set.removed {
			output.insert(filename.clone(), OutputEntry::Tombstone);
		}

		for (filename, original) in &change_set.added_or_changed {
			if change_set.removed.contains(filename) {
				tracing::debug!(filename, "skipping file removed in the same batch");
				continue;
			}

			let started = Instant::now();
			let result = self
				.process_file(filename, original, args)
				.and_then(|transformed| {
					transformed
						.map(|compiled| encode_output(filename, compiled))
						.transpose()
				});
			let elapsed = started.elapsed();

			match result {
				Ok(Some((code, source_map))) => {
					report_transformed(filename, elapsed, original.len(), code.len());
					if let Some(source_map) = source_map {
						output.insert(format!("{filename}.map"), OutputEntry::Content(source_map));
					}
					output.insert(filename.clone(), OutputEntry::Content(code));
				}
				Ok(None) => {
					tracing::debug!(filename, "passthrough");
					output.insert(filename.clone(), OutputEntry::Content(original.clone()));
				}
				Err(error) => {
					report_failure(filename, &error);
					return Err(BatchFailure {
						file: filename.clone(),
						error,
						output,
					});
				}
			}
		}

		Ok(output)
	}

	/// Like [`Pipeline::run`], but hands the finished output to `on_done`.
	/// `on_done` runs exactly once when every file succeeds and never when
	/// the batch fails.
	pub fn run_then<F>(
		&self,
		change_set: &ChangeSet,
		output: OutputMap,
		args: Option<&CompileArgs>,
		on_done: F,
	) -> Result<(), BatchFailure>
	where
		F: FnOnce(OutputMap),
	{
		let output = self.run(change_set, output, args)?;
		on_done(output);
		Ok(())
	}

	/// Run the handler for a single file. `None` means the file passes
	/// through unchanged.
	pub fn process_file(
		&self,
		filename: &str,
		original: &[u8],
		args: Option<&CompileArgs>,
	) -> PipelineResult<Option<CompileOutput>> {
		let kind = self.router.classify(filename);
		if kind == FileKind::Passthrough {
			return Ok(None);
		}

		let source = std::str::from_utf8(original).map_err(|_| {
			PipelineError::InvalidEncoding {
				file: filename.to_string(),
			}
		})?;
		let invoker = Invoker {
			compiler: &self.compiler,
			feature_flag: &self.feature_flag,
			caller_args: args,
		};

		match kind {
			FileKind::Markup => {
				let document =
					transform_markup(&self.matcher, &invoker, &self.runtime_marker, filename, source)?;
				Ok(document.map(CompileOutput::code))
			}
			FileKind::Script => invoker.compile(filename, source, None).map(Some),
			FileKind::Passthrough => Ok(None),
		}
	}
}

/// Encode compiled code and its source map (pretty printed JSON) as bytes.
fn encode_output(
	filename: &str,
	compiled: CompileOutput,
) -> PipelineResult<(Vec<u8>, Option<Vec<u8>>)> {
	let source_map = compiled
		.source_map
		.map(|map| {
			serde_json::to_string_pretty(&map).map_err(|e| {
				PipelineError::SourceMap {
					file: filename.to_string(),
					reason: e.to_string(),
				}
			})
		})
		.transpose()?;

	Ok((compiled.code.into_bytes(), source_map.map(String::into_bytes)))
}
