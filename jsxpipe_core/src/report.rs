use std::fmt::Display;
use std::time::Duration;

const KILOBYTE: f64 = 1024.0;
const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Human readable byte count, e.g. `512 B` or `1.5 KB`.
pub fn humanize_bytes(len: usize) -> String {
	if len < 1024 {
		return format!("{len} B");
	}

	let mut value = len as f64 / KILOBYTE;
	let mut unit = UNITS[0];
	for next in &UNITS[1..] {
		if value < KILOBYTE {
			break;
		}
		value /= KILOBYTE;
		unit = next;
	}

	format!("{value:.1} {unit}")
}

/// Human readable duration, e.g. `12 ms`, `1.5 s` or `2.0 min`.
pub fn humanize_duration(elapsed: Duration) -> String {
	let millis = elapsed.as_millis();
	if millis < 1000 {
		return format!("{millis} ms");
	}

	let seconds = elapsed.as_secs_f64();
	if seconds < 60.0 {
		format!("{seconds:.1} s")
	} else {
		format!("{:.1} min", seconds / 60.0)
	}
}

/// Size change as a percentage of the original. An empty original reports
/// `0.0`.
pub fn size_delta_percent(original: usize, transformed: usize) -> f64 {
	if original == 0 {
		return 0.0;
	}

	((transformed as f64 / original as f64) - 1.0) * 100.0
}

/// The line logged for every transformed file.
pub fn transformed_line(
	filename: &str,
	elapsed: Duration,
	original: usize,
	transformed: usize,
) -> String {
	format!(
		"Transformed {filename}, took {} ({} -> {}, {:.1}%)",
		humanize_duration(elapsed),
		humanize_bytes(original),
		humanize_bytes(transformed),
		size_delta_percent(original, transformed)
	)
}

pub fn report_transformed(filename: &str, elapsed: Duration, original: usize, transformed: usize) {
	tracing::info!("{}", transformed_line(filename, elapsed, original, transformed));
}

pub fn report_failure(filename: &str, message: impl Display) {
	tracing::error!("Failed to process {filename} due to {message}");
}
