use regex::Regex;
use regex::RegexBuilder;

use crate::PipelineError;
use crate::PipelineResult;
use crate::compiler::Compiler;
use crate::compiler::Invoker;
use crate::directive::parse_directives;
use crate::options::CompileArgs;

/// A `<script>` element whose `type` attribute carries the dialect marker,
/// split into the pieces needed to rebuild it.
///
/// ```text
/// <script type="text/jsx;harmony=true" id="app">render()</script>
/// ^^^^^^^^^^^^^^                                                   prefix
///               ^^^^^^^^                                           marker
///                       ^^^^^^^^^^^^^                              attributes
///                                    ^^^^^^^^^^^                   tag_close
///                                               ^^^^^^^^           body
///                                                       ^^^^^^^^^  closing
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedBlock<'a> {
	/// Everything from `<script` up to the marker inside the `type` value.
	pub prefix: &'a str,
	/// The dialect marker exactly as written in the source.
	pub marker: &'a str,
	/// The rest of the `type` value, where directives live.
	pub attributes: &'a str,
	/// The closing quote of the `type` value through the end of the tag.
	pub tag_close: &'a str,
	pub body: &'a str,
	pub closing: &'a str,
}

/// A markup document decomposes into literal text and embedded blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
	Literal(&'a str),
	Block(EmbeddedBlock<'a>),
}

impl Segment<'_> {
	pub fn is_block(&self) -> bool {
		matches!(self, Self::Block(_))
	}
}

/// Finds embedded blocks for one dialect marker.
#[derive(Debug, Clone)]
pub struct BlockMatcher {
	pattern: Regex,
}

impl BlockMatcher {
	pub fn new(dialect_marker: &str) -> PipelineResult<Self> {
		let source = format!(
			r#"(<script\s[^>]*?type="[^"]*?)({})([^"]*)("[^>]*>)(.*?)(</script\s*>)"#,
			regex::escape(dialect_marker)
		);
		let pattern = RegexBuilder::new(&source)
			.case_insensitive(true)
			.dot_matches_new_line(true)
			.build()
			.map_err(|e| PipelineError::InvalidMarker(e.to_string()))?;

		Ok(Self { pattern })
	}

	/// Split `document` into literal and block segments, left to right.
	/// Concatenating every segment reproduces the document exactly.
	pub fn segments<'a>(&self, document: &'a str) -> Vec<Segment<'a>> {
		let mut segments = Vec::new();
		let mut last_end = 0;

		for captures in self.pattern.captures_iter(document) {
			let Some(whole) = captures.get(0) else {
				continue;
			};
			let (_, [prefix, marker, attributes, tag_close, body, closing]) = captures.extract();

			if whole.start() > last_end {
				segments.push(Segment::Literal(&document[last_end..whole.start()]));
			}
			segments.push(Segment::Block(EmbeddedBlock {
				prefix,
				marker,
				attributes,
				tag_close,
				body,
				closing,
			}));
			last_end = whole.end();
		}

		if last_end < document.len() {
			segments.push(Segment::Literal(&document[last_end..]));
		}

		segments
	}
}

/// Compile every embedded block of `document` and rebuild it with
/// `runtime_marker` in place of the dialect marker.
///
/// A document without embedded blocks is returned unchanged. Returns `None`
/// only for an empty document. The first block that fails to compile aborts
/// the document.
pub fn transform_markup<C: Compiler + ?Sized>(
	matcher: &BlockMatcher,
	invoker: &Invoker<'_, C>,
	runtime_marker: &str,
	filename: &str,
	document: &str,
) -> PipelineResult<Option<String>> {
	if document.is_empty() {
		return Ok(None);
	}

	let segments = matcher.segments(document);
	if !segments.iter().any(Segment::is_block) {
		return Ok(Some(document.to_string()));
	}

	let mut output = String::with_capacity(document.len());
	for segment in &segments {
		match segment {
			Segment::Literal(text) => output.push_str(text),
			Segment::Block(block) => {
				let directives = CompileArgs::from_directives(&parse_directives(block.attributes));
				let compiled = invoker.compile(filename, block.body, Some(&directives))?;

				output.push_str(block.prefix);
				output.push_str(runtime_marker);
				output.push_str(block.attributes);
				output.push_str(block.tag_close);
				output.push_str(&compiled.code);
				output.push_str(block.closing);
			}
		}
	}

	Ok(Some(output))
}
