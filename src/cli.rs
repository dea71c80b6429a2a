use clap::Parser;

/// Command line of the `pullzip` binary.
///
/// Archives are read from the local filesystem only; entries are decoded as
/// streams and checked against their CRC-32 while they are written out.
#[derive(Parser, Debug)]
#[command(name = "pullzip")]
#[command(version)]
#[command(about = "Stream entries out of a local ZIP archive", long_about = None)]
#[command(after_help = "Examples:\n  \
  pullzip -l assets.zip               show entry names\n  \
  pullzip assets.zip '*.cfg' -d out   extract matching entries into out/\n  \
  pullzip -p assets.zip readme.txt    write one entry to stdout\n  \
  pullzip -t assets.zip               verify the CRC-32 of every entry")]
pub struct Cli {
    /// Archive to read
    #[arg(value_name = "ARCHIVE")]
    pub file: String,

    /// Entry names or `*`/`?` patterns to process (default: every entry)
    #[arg(value_name = "ENTRIES")]
    pub files: Vec<String>,

    /// Print entry names, one per line
    #[arg(short = 'l')]
    pub list: bool,

    /// Print a table with sizes, method, timestamp and CRC-32
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Decode entries and check their CRC-32 without writing anything
    #[arg(short = 't')]
    pub test: bool,

    /// Stream entry contents to stdout
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Directory to extract into (default: current directory)
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Skip entries containing or matching these patterns
    #[arg(short = 'x', value_name = "PATTERN", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Keep existing files, even with -o
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Replace existing files
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Drop directory components from entry names
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Less output; repeat to also hide the test summary
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    /// Per-entry progress is suppressed with `-q` and while piping.
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }
}
