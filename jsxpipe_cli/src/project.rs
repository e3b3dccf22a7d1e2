//! Turning the project directory into change sets and writing batch output
//! back to disk.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use ignore::WalkBuilder;
use ignore::gitignore::Gitignore;
use jsxpipe_core::AnyResult;
use jsxpipe_core::ChangeSet;
use jsxpipe_core::OutputEntry;
use jsxpipe_core::OutputMap;
use jsxpipe_core::PipelineConfig;

/// The files under a project root that belong to a build. The output
/// directory, the config file, hidden paths and `.gitignore`d paths are
/// excluded.
pub struct BuildScope {
	root: PathBuf,
	out_dir: PathBuf,
	config_path: Option<PathBuf>,
	gitignore: Gitignore,
}

impl BuildScope {
	/// `root` should be canonical so that watcher paths strip cleanly.
	pub fn new(root: PathBuf, out_dir: PathBuf) -> Self {
		let config_path = PipelineConfig::resolve_path(&root);
		let (gitignore, _) = Gitignore::new(root.join(".gitignore"));

		Self {
			root,
			out_dir,
			config_path,
			gitignore,
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn out_dir(&self) -> &Path {
		&self.out_dir
	}

	/// The change set key for `path`: relative to the root, `/` separated.
	pub fn key(&self, path: &Path) -> Option<String> {
		let relative = path.strip_prefix(&self.root).ok()?;
		let parts: Vec<_> = relative
			.components()
			.map(|component| component.as_os_str().to_string_lossy())
			.collect();

		if parts.is_empty() {
			return None;
		}

		Some(parts.join("/"))
	}

	pub fn excludes(&self, path: &Path) -> bool {
		if path.starts_with(&self.out_dir) || self.config_path.as_deref() == Some(path) {
			return true;
		}

		let Ok(relative) = path.strip_prefix(&self.root) else {
			return true;
		};

		let hidden = relative
			.components()
			.any(|component| component.as_os_str().to_string_lossy().starts_with('.'));

		hidden
			|| self
				.gitignore
				.matched_path_or_any_parents(path, false)
				.is_ignore()
	}
}

/// Every file in the scope, as one change set.
pub fn collect_project(scope: &BuildScope) -> AnyResult<ChangeSet> {
	let out_dir = scope.out_dir.clone();
	let walker = WalkBuilder::new(&scope.root)
		.require_git(false)
		.filter_entry(move |entry| !entry.path().starts_with(&out_dir))
		.build();

	let mut change_set = ChangeSet::new();
	for entry in walker {
		let entry = entry?;
		if !entry.file_type().is_some_and(|file_type| file_type.is_file()) {
			continue;
		}

		let path = entry.path();
		if scope.excludes(path) {
			continue;
		}

		if let Some(key) = scope.key(path) {
			change_set.added_or_changed.insert(key, std::fs::read(path)?);
		}
	}

	Ok(change_set)
}

/// Build a change set from the paths reported by the file watcher. Paths
/// that no longer exist are removals.
pub fn collect_changes(scope: &BuildScope, paths: &BTreeSet<PathBuf>) -> io::Result<ChangeSet> {
	let mut change_set = ChangeSet::new();

	for path in paths {
		if path.is_dir() || scope.excludes(path) {
			continue;
		}

		let Some(key) = scope.key(path) else {
			continue;
		};

		if path.is_file() {
			change_set.added_or_changed.insert(key, std::fs::read(path)?);
		} else {
			change_set.removed.insert(key);
		}
	}

	Ok(change_set)
}

/// Block for the next batch of watcher paths, then gather every batch that
/// arrives within `window` of the previous one. Returns `None` once the
/// watcher is gone.
pub fn next_debounced(
	rx: &Receiver<Vec<PathBuf>>,
	window: Duration,
) -> Option<BTreeSet<PathBuf>> {
	let mut paths: BTreeSet<PathBuf> = rx.recv().ok()?.into_iter().collect();
	while let Ok(more) = rx.recv_timeout(window) {
		paths.extend(more);
	}

	Some(paths)
}

/// Counts returned by [`write_output`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
	pub written: usize,
	pub removed: usize,
}

/// Write every content entry below `out_dir` and delete the output of every
/// tombstoned file along with its source map.
pub fn write_output(out_dir: &Path, output: &OutputMap) -> io::Result<WriteSummary> {
	let mut summary = WriteSummary::default();

	for (filename, entry) in output.iter() {
		let path = out_dir.join(filename);
		match entry {
			OutputEntry::Content(bytes) => {
				if let Some(parent) = path.parent() {
					std::fs::create_dir_all(parent)?;
				}
				std::fs::write(&path, bytes)?;
				summary.written += 1;
			}
			OutputEntry::Tombstone => {
				if remove_if_exists(&path)? {
					summary.removed += 1;
				}
				remove_if_exists(&out_dir.join(format!("{filename}.map")))?;
			}
		}
	}

	Ok(summary)
}

fn remove_if_exists(path: &Path) -> io::Result<bool> {
	if path.is_dir() {
		return Ok(false);
	}

	match std::fs::remove_file(path) {
		Ok(()) => Ok(true),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
		Err(e) => Err(e),
	}
}
