use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use jsxpipe_cli::Commands;
use jsxpipe_cli::JsxpipeCli;
use jsxpipe_cli::project::BuildScope;
use jsxpipe_cli::project::WriteSummary;
use jsxpipe_cli::project::collect_changes;
use jsxpipe_cli::project::collect_project;
use jsxpipe_cli::project::next_debounced;
use jsxpipe_cli::project::write_output;
use jsxpipe_core::BatchFailure;
use jsxpipe_core::ChangeSet;
use jsxpipe_core::CommandCompiler;
use jsxpipe_core::OutputMap;
use jsxpipe_core::Pipeline;
use jsxpipe_core::PipelineConfig;
use jsxpipe_core::PipelineError;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = JsxpipeCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_logging(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Build { out, watch }) => run_build(&args, out, *watch),
		None => {
			eprintln!("No subcommand specified. Run `jsxpipe --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		print_error(e);
		process::exit(2);
	}
}

/// Transform reports and failures are emitted through `tracing`, so the
/// subscriber writes to stderr and keeps stdout for command output.
fn init_logging(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "info" };
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.init();
}

fn print_error(e: Box<dyn std::error::Error>) {
	// The batch failure was already logged. Render its cause through miette
	// for the help text and error code.
	let e = match e.downcast::<BatchFailure>() {
		Ok(failure) => {
			let BatchFailure { error, .. } = *failure;
			let report: miette::Report = error.into();
			eprintln!("{report:?}");
			return;
		}
		Err(e) => e,
	};

	match e.downcast::<PipelineError>() {
		Ok(pipeline_err) => {
			let report: miette::Report = (*pipeline_err).into();
			eprintln!("{report:?}");
		}
		Err(e) => {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

fn resolve_root(args: &JsxpipeCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn run_init(args: &JsxpipeCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);

	if let Some(existing) = PipelineConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
		return Ok(());
	}

	let config_path = root.join("jsxpipe.toml");
	let sample_config = "# jsxpipe configuration\n\n[compiler]\n# Shell command run once per \
	                     script file or embedded block.\n# The source is written to stdin and \
	                     the compile options are\n# available as JSON in $JSXPIPE_OPTIONS.\n# \
	                     Print the compiled code, or `{\"code\": ..., \"map\": ...}`, to \
	                     stdout.\ncommand = \"npx babel --presets @babel/preset-react\"\n\n# \
	                     dialect_marker = \"text/jsx\"\n# runtime_marker = \
	                     \"text/javascript\"\n# markup_extensions = [\"html\", \"htm\"]\n# \
	                     script_extensions = [\"js\", \"jsx\"]\n\n# Options forwarded to every \
	                     compile call.\n# [args]\n# whitelist = [\"es6.arrowFunctions\"]\n";

	std::fs::write(&config_path, sample_config)?;
	println!("Created jsxpipe.toml");
	println!();
	println!("Next steps:");
	println!("  1. Set the compiler command in {}", config_path.display());
	println!("  2. Run `jsxpipe build` to compile the project into dist/");

	Ok(())
}

fn run_build(
	args: &JsxpipeCli,
	out: &Path,
	watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args).canonicalize()?;
	let config = PipelineConfig::load(&root)?.unwrap_or_default();
	let command = config
		.compiler
		.command
		.clone()
		.ok_or(PipelineError::MissingCompilerCommand)?;
	let pipeline = Pipeline::new(CommandCompiler::new(command).current_dir(&root), &config)?;
	let scope = BuildScope::new(root.clone(), root.join(out));

	let change_set = collect_project(&scope)?;
	build_once(&pipeline, &config, &change_set, scope.out_dir())?;

	if !watch {
		return Ok(());
	}

	let (tx, rx) = mpsc::channel();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_)
						| notify::EventKind::Create(_)
						| notify::EventKind::Remove(_)
				) {
					let _ = tx.send(event.paths);
				}
			}
		})?;

	use notify::Watcher;
	watcher.watch(&root, notify::RecursiveMode::Recursive)?;
	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	loop {
		let Some(paths) = next_debounced(&rx, Duration::from_millis(200)) else {
			return Ok(());
		};

		let change_set = match collect_changes(&scope, &paths) {
			Ok(change_set) => change_set,
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
				continue;
			}
		};

		if change_set.is_empty() {
			continue;
		}

		println!("\nFile change detected, rebuilding...");
		if let Err(e) = build_once(&pipeline, &config, &change_set, scope.out_dir()) {
			print_error(e);
		}
	}
}

fn build_once(
	pipeline: &Pipeline<CommandCompiler>,
	config: &PipelineConfig,
	change_set: &ChangeSet,
	out_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
	tracing::debug!(
		changed = change_set.added_or_changed.len(),
		removed = change_set.removed.len(),
		"running batch"
	);
	let output = pipeline.run(change_set, OutputMap::new(), Some(&config.args))?;
	let WriteSummary { written, removed } = write_output(out_dir, &output)?;

	let summary = format!("Wrote {written} file(s), removed {removed} file(s)");
	println!("{} in {}", colored!(summary, green), out_dir.display());

	Ok(())
}
