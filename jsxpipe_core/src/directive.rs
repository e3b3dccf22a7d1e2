use std::collections::BTreeMap;

use serde_json::Value;

/// The value of a single inline directive.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DirectiveValue {
	/// The key appeared without `=value`.
	Flag,
	/// The value was exactly `true` or `false`.
	Bool(bool),
	/// Any other value, kept verbatim.
	Text(String),
}

impl DirectiveValue {
	/// The JSON form forwarded to the compiler. Flags are present but unset,
	/// so they become `null`.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Flag => Value::Null,
			Self::Bool(value) => Value::Bool(*value),
			Self::Text(value) => Value::String(value.clone()),
		}
	}
}

/// Directives keyed by name. A repeated key keeps its last value.
pub type Directives = BTreeMap<String, DirectiveValue>;

/// Parse the directive string that follows a dialect marker, e.g.
/// `;harmony=true;stripTypes;moduleId=app`.
///
/// Text before the first `;` is not part of any directive and empty segments
/// are skipped. An empty value (`key=`) is treated the same as a bare flag.
pub fn parse_directives(input: &str) -> Directives {
	let mut directives = Directives::new();
	let Some((_, rest)) = input.split_once(';') else {
		return directives;
	};

	for segment in rest.split(';') {
		let (key, raw) = segment.split_once('=').unwrap_or((segment, ""));
		if key.is_empty() {
			continue;
		}

		let value = match raw {
			"" => DirectiveValue::Flag,
			"true" => DirectiveValue::Bool(true),
			"false" => DirectiveValue::Bool(false),
			other => DirectiveValue::Text(other.to_string()),
		};

		directives.insert(key.to_string(), value);
	}

	directives
}
