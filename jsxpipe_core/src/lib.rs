//! `jsxpipe_core` is the core library for the jsxpipe build step. It takes one
//! change set at a time (files removed, added or changed since the previous
//! batch), compiles JSX files and the JSX blocks embedded in HTML pages with an
//! external compiler, and returns the output for every file in the batch.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Change set
//!   → Pipeline (tombstones for removed files, then one pass over the rest)
//!   → FileRouter (markup, script or passthrough by extension)
//!   → BlockMatcher (splits markup into literal and embedded block segments)
//!   → Directive parser + option merger (per block compile options)
//!   → Compiler (external, whole scripts or single blocks)
//!   → Report (one log line per transformed file)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `jsxpipe.toml`.
//! - [`directive`]: Parsing of `;key=value` directives written next to the
//!   dialect marker.
//! - [`markup`]: Discovery and reassembly of embedded blocks.
//! - [`normalize`]: Reformatting of multi-line compiler failures.
//! - [`options`]: Compile option layers and their merge rules.
//!
//! ## Quick Start
//!
//! ```rust
//! use jsxpipe_core::ChangeSet;
//! use jsxpipe_core::CompileFailure;
//! use jsxpipe_core::CompileOptions;
//! use jsxpipe_core::CompileOutput;
//! use jsxpipe_core::OutputMap;
//! use jsxpipe_core::Pipeline;
//! use jsxpipe_core::PipelineConfig;
//!
//! fn uppercase(source: &str, _: &CompileOptions) -> Result<CompileOutput, CompileFailure> {
//! 	Ok(CompileOutput::code(source.to_uppercase()))
//! }
//!
//! let pipeline = Pipeline::new(uppercase, &PipelineConfig::default()).unwrap();
//! let change_set = ChangeSet::new()
//! 	.with_file("index.html", r#"<script type="text/jsx">x()</script>"#)
//! 	.with_removed("old.js");
//!
//! let output = pipeline.run(&change_set, OutputMap::new(), None).unwrap();
//! assert_eq!(
//! 	output.content("index.html"),
//! 	Some(r#"<script type="text/javascript">X()</script>"#.as_bytes())
//! );
//! assert!(output.is_tombstone("old.js"));
//! ```

pub use compiler::*;
pub use config::*;
pub use error::*;
pub use pipeline::*;
pub use report::*;
pub use router::*;

mod compiler;
pub mod config;
pub mod directive;
#[allow(unused_assignments)]
mod error;
pub mod markup;
pub mod normalize;
pub mod options;
mod pipeline;
mod report;
mod router;

pub use options::CompileArgs;
pub use options::CompileOptions;
pub use options::ModuleId;

#[cfg(test)]
mod __fixtures;
