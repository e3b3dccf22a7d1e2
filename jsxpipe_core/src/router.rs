use std::path::Path;

use crate::config::PipelineConfig;

/// How a file in a change set is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
	/// A host document that may contain embedded blocks.
	Markup,
	/// A whole file handed to the compiler.
	Script,
	/// Copied to the output unchanged.
	Passthrough,
}

/// Classifies files by extension, ignoring case.
#[derive(Debug, Clone)]
pub struct FileRouter {
	markup_extensions: Vec<String>,
	script_extensions: Vec<String>,
}

impl FileRouter {
	pub fn new<M, S>(markup_extensions: M, script_extensions: S) -> Self
	where
		M: IntoIterator,
		M::Item: AsRef<str>,
		S: IntoIterator,
		S::Item: AsRef<str>,
	{
		Self {
			markup_extensions: normalize_extensions(markup_extensions),
			script_extensions: normalize_extensions(script_extensions),
		}
	}

	pub fn from_config(config: &PipelineConfig) -> Self {
		Self::new(&config.markup_extensions, &config.script_extensions)
	}

	pub fn classify(&self, filename: &str) -> FileKind {
		let Some(extension) = Path::new(filename)
			.extension()
			.and_then(|extension| extension.to_str())
		else {
			return FileKind::Passthrough;
		};
		let extension = extension.to_ascii_lowercase();

		if self.markup_extensions.contains(&extension) {
			FileKind::Markup
		} else if self.script_extensions.contains(&extension) {
			FileKind::Script
		} else {
			FileKind::Passthrough
		}
	}
}

fn normalize_extensions<I>(extensions: I) -> Vec<String>
where
	I: IntoIterator,
	I::Item: AsRef<str>,
{
	extensions
		.into_iter()
		.map(|extension| extension.as_ref().trim_start_matches('.').to_ascii_lowercase())
		.collect()
}
