use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

pub mod project;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Compile JSX files and JSX blocks embedded in HTML pages.",
	long_about = "jsxpipe compiles JSX with an external compiler of your choice.\n\nWhole `.js` and \
	              `.jsx` files are compiled as they are. HTML pages are scanned for `<script \
	              type=\"text/jsx\">` blocks, which are compiled in place while the rest of the \
	              page is copied byte for byte. Every other file is copied unchanged.\n\nQuick \
	              start:\n  jsxpipe init            Create a jsxpipe.toml\n  jsxpipe build --out \
	              dist  Compile the project into dist/\n  jsxpipe build --watch   Rebuild changed \
	              files as they change"
)]
pub struct JsxpipeCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Create a sample `jsxpipe.toml` in the project root.
	///
	/// If a config file already exists, this command is a no-op and exits
	/// successfully.
	Init,
	/// Compile the project into an output directory.
	///
	/// Every file under the project root (respecting `.gitignore`) forms one
	/// change set. Script files are compiled, HTML pages have their embedded
	/// JSX blocks compiled, and everything else is copied. The first failure
	/// stops the build and nothing is written for that batch.
	Build {
		/// Directory the output is written to, relative to the project root.
		#[arg(long, short, default_value = "dist")]
		out: PathBuf,

		/// Keep running and rebuild files as they are added, changed or
		/// removed. Removed files are deleted from the output directory.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
}
