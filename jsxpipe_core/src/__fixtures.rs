use std::cell::RefCell;

use crate::CompileFailure;
use crate::CompileOptions;
use crate::CompileOutput;
use crate::Compiler;
use crate::PipelineConfig;
use crate::markup::Segment;

/// A failure shaped like a compiler error with a colorized code frame.
pub const CODE_FRAME_FAILURE: &str = "SyntaxError: unexpected token (1:2)\n> 1 | \
                                      \u{1b}[31mx(\u{1b}[39m\n    at Parser.raise \
                                      (parser.js:10:5)";

pub fn uppercase(source: &str, _: &CompileOptions) -> Result<CompileOutput, CompileFailure> {
	Ok(CompileOutput::code(source.to_uppercase()))
}

pub fn fail_on_boom(source: &str, _: &CompileOptions) -> Result<CompileOutput, CompileFailure> {
	if source.contains("boom") {
		return Err(CompileFailure::new(CODE_FRAME_FAILURE));
	}
	Ok(CompileOutput::code(source.to_uppercase()))
}

pub fn with_source_map(source: &str, _: &CompileOptions) -> Result<CompileOutput, CompileFailure> {
	Ok(CompileOutput::code(source.to_uppercase())
		.with_source_map(serde_json::json!({ "version": 3, "mappings": "AAAA" })))
}

/// Uppercases its input, records every call and fails for one filename.
#[derive(Debug, Default)]
pub struct RecordingCompiler {
	pub calls: RefCell<Vec<CompileOptions>>,
	pub fail_on: Option<String>,
}

impl RecordingCompiler {
	pub fn failing_on(filename: &str) -> Self {
		Self {
			fail_on: Some(filename.to_string()),
			..Self::default()
		}
	}

	pub fn filenames(&self) -> Vec<String> {
		self.calls
			.borrow()
			.iter()
			.map(|options| options.filename.clone())
			.collect()
	}
}

impl Compiler for RecordingCompiler {
	fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompileOutput, CompileFailure> {
		self.calls.borrow_mut().push(options.clone());
		if self.fail_on.as_deref() == Some(options.filename.as_str()) {
			return Err(CompileFailure::new(CODE_FRAME_FAILURE));
		}
		Ok(CompileOutput::code(source.to_uppercase()))
	}
}

pub fn dialect_config() -> PipelineConfig {
	PipelineConfig {
		dialect_marker: "text/dialect".to_string(),
		runtime_marker: "text/plain-script".to_string(),
		..PipelineConfig::default()
	}
}

/// Compact one-line description of a segment list.
pub fn describe_segments(segments: &[Segment<'_>]) -> String {
	segments
		.iter()
		.map(|segment| {
			match segment {
				Segment::Literal(text) => format!("literal({text})"),
				Segment::Block(block) => {
					format!("block({}|{}|{})", block.marker, block.attributes, block.body)
				}
			}
		})
		.collect::<Vec<_>>()
		.join(" ")
}

/// Concatenate segments back into the source document.
pub fn render_segments(segments: &[Segment<'_>]) -> String {
	segments
		.iter()
		.map(|segment| {
			match segment {
				Segment::Literal(text) => (*text).to_string(),
				Segment::Block(block) => {
					[
						block.prefix,
						block.marker,
						block.attributes,
						block.tag_close,
						block.body,
						block.closing,
					]
					.concat()
				}
			}
		})
		.collect()
}
