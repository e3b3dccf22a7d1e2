/// Terminal sequence that resets all colors and text styles.
pub const STYLE_RESET: &str = "\u{1b}[0m";

/// Returns `true` for stack-frame lines: leading whitespace followed by the
/// `at` token.
pub fn is_stack_frame(line: &str) -> bool {
	let trimmed = line.trim_start();
	if trimmed.len() == line.len() {
		return false;
	}

	trimmed
		.strip_prefix("at")
		.is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

/// Reformat multi-line compiler failure text so a colorized code frame cannot
/// bleed into the lines printed after it.
///
/// The first line is kept as is. Every later line that is not a stack frame
/// starts with [`STYLE_RESET`].
pub fn normalize_failure_text(text: &str) -> String {
	let mut normalized = String::with_capacity(text.len() + 16);

	for (index, line) in text.split('\n').enumerate() {
		if index > 0 {
			normalized.push('\n');
			if !is_stack_frame(line) {
				normalized.push_str(STYLE_RESET);
			}
		}
		normalized.push_str(line);
	}

	normalized
}

/// Normalize a failure message and its stack as one text, then split the
/// result back at the original message boundary.
pub fn normalize_failure(message: &str, stack: Option<&str>) -> (String, Option<String>) {
	let Some(stack) = stack else {
		return (normalize_failure_text(message), None);
	};

	let combined = normalize_failure_text(&format!("{message}\n{stack}"));
	let message_lines = message.split('\n').count();
	let mut lines = combined.split('\n');
	let message = lines.by_ref().take(message_lines).collect::<Vec<_>>().join("\n");
	let stack = lines.collect::<Vec<_>>().join("\n");

	(message, Some(stack))
}
