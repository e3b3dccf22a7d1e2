use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::directive::DirectiveValue;
use crate::directive::Directives;

/// Option key holding the name of the file being compiled.
pub const FILENAME_KEY: &str = "filename";
/// Option key holding the list of enabled compiler features.
pub const FEATURES_KEY: &str = "whitelist";
/// Option key holding the module name, which may be computed per file.
pub const MODULE_ID_KEY: &str = "moduleId";

/// The module naming option: either a fixed name or a function of the
/// filename being compiled.
#[derive(Clone, Deserialize)]
#[serde(from = "String")]
pub enum ModuleId {
	Literal(String),
	Resolver(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl ModuleId {
	pub fn resolver(resolve: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
		Self::Resolver(Arc::new(resolve))
	}

	/// The effective module name for `filename`.
	pub fn resolve(&self, filename: &str) -> String {
		match self {
			Self::Literal(name) => name.clone(),
			Self::Resolver(resolve) => resolve(filename),
		}
	}
}

impl fmt::Debug for ModuleId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Literal(name) => f.debug_tuple("Literal").field(name).finish(),
			Self::Resolver(_) => f.write_str("Resolver(..)"),
		}
	}
}

impl From<String> for ModuleId {
	fn from(value: String) -> Self {
		Self::Literal(value)
	}
}

impl From<&str> for ModuleId {
	fn from(value: &str) -> Self {
		Self::Literal(value.to_string())
	}
}

/// One layer of compiler options. Unset fields leave earlier layers alone
/// when layers are merged.
///
/// ```toml
/// [args]
/// whitelist = ["es6.arrowFunctions"]
/// moduleId = "app"
/// compact = true
/// ```
///
/// Keys other than `filename`, `whitelist` and `moduleId` are kept in
/// [`CompileArgs::extra`] and forwarded to the compiler verbatim.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompileArgs {
	#[serde(default)]
	pub filename: Option<String>,
	#[serde(default, rename = "whitelist")]
	pub features: Option<Vec<String>>,
	#[serde(default, rename = "moduleId")]
	pub module_id: Option<ModuleId>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
	/// Recognized keys this layer sets to no value, clearing whatever an
	/// earlier layer set.
	#[serde(skip)]
	pub unset: BTreeSet<String>,
}

impl CompileArgs {
	/// The base layer: only the filename is set.
	pub fn for_file(filename: impl Into<String>) -> Self {
		Self {
			filename: Some(filename.into()),
			..Self::default()
		}
	}

	/// Build a layer from the directives of one embedded block.
	///
	/// A bare flag on `filename`, `whitelist` or `moduleId` clears the value
	/// set by earlier layers. The feature list accepts a comma separated
	/// value. Every other key lands in [`CompileArgs::extra`].
	pub fn from_directives(directives: &Directives) -> Self {
		let mut layer = Self::default();

		for (key, value) in directives {
			match (key.as_str(), value) {
				(FILENAME_KEY | FEATURES_KEY | MODULE_ID_KEY, DirectiveValue::Flag) => {
					layer.unset.insert(key.clone());
				}
				(FILENAME_KEY, value) => layer.filename = Some(directive_text(value)),
				(MODULE_ID_KEY, value) => {
					layer.module_id = Some(ModuleId::Literal(directive_text(value)));
				}
				(FEATURES_KEY, value) => {
					layer.features = Some(
						directive_text(value)
							.split(',')
							.map(str::trim)
							.filter(|feature| !feature.is_empty())
							.map(ToString::to_string)
							.collect(),
					);
				}
				(_, value) => {
					layer.extra.insert(key.clone(), value.to_json());
				}
			}
		}

		layer
	}

	/// Shallow overwrite: every field set or unset in `other` replaces the
	/// same field in `self`.
	pub fn overlay(&mut self, other: &Self) {
		for key in &other.unset {
			match key.as_str() {
				FILENAME_KEY => self.filename = None,
				FEATURES_KEY => self.features = None,
				MODULE_ID_KEY => self.module_id = None,
				_ => {}
			}
		}
		if let Some(filename) = &other.filename {
			self.filename = Some(filename.clone());
		}
		if let Some(features) = &other.features {
			self.features = Some(features.clone());
		}
		if let Some(module_id) = &other.module_id {
			self.module_id = Some(module_id.clone());
		}
		for (key, value) in &other.extra {
			self.extra.insert(key.clone(), value.clone());
		}
	}

	/// Append `flag` to the feature list, creating the list when it is
	/// missing. Existing entries, including duplicates of `flag`, are kept.
	pub fn ensure_feature(&mut self, flag: &str) {
		self.features
			.get_or_insert_with(Vec::new)
			.push(flag.to_string());
	}

	/// Produce the options handed to the compiler for `filename`, calling the
	/// module id resolver when one is set.
	pub fn resolve(self, filename: &str) -> CompileOptions {
		CompileOptions {
			module_id: self.module_id.as_ref().map(|id| id.resolve(filename)),
			filename: self.filename.unwrap_or_else(|| filename.to_string()),
			features: self.features.unwrap_or_default(),
			extra: self.extra,
		}
	}
}

/// Merge option layers, later layers winning, and make sure the feature list
/// contains `feature_flag`.
pub fn merge<'a>(
	layers: impl IntoIterator<Item = &'a CompileArgs>,
	feature_flag: &str,
) -> CompileArgs {
	let mut merged = CompileArgs::default();
	for layer in layers {
		merged.overlay(layer);
	}
	merged.ensure_feature(feature_flag);
	merged
}

/// Fully resolved options for one compile call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileOptions {
	pub filename: String,
	#[serde(rename = "whitelist")]
	pub features: Vec<String>,
	#[serde(rename = "moduleId", skip_serializing_if = "Option::is_none")]
	pub module_id: Option<String>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

fn directive_text(value: &DirectiveValue) -> String {
	match value {
		DirectiveValue::Flag => String::new(),
		DirectiveValue::Bool(value) => value.to_string(),
		DirectiveValue::Text(text) => text.clone(),
	}
}
