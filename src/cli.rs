use clap::Parser;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "bootjar")]
#[command(version)]
#[command(about = "Inspect and read executable jars without extracting them", long_about = None)]
#[command(after_help = "Examples:\n  \
  bootjar app.jar                      show the main class and classpath\n  \
  bootjar -l app.jar                   list entries of app.jar\n  \
  bootjar -l app.jar BOOT-INF/lib/foo.jar   list entries of a nested jar\n  \
  bootjar -p app.jar 'BOOT-INF/lib/foo.jar!/META-INF/MANIFEST.MF' | more")]
pub struct Cli {
    /// Executable jar, or a directory it has been unpacked to
    #[arg(value_name = "ARCHIVE")]
    pub archive: String,

    /// Entry to act on; use `!/` to descend into nested archives
    #[arg(value_name = "ENTRY")]
    pub entry: Option<String>,

    /// List entries (short format, add -v for details)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely / log more
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Write the content of ENTRY to stdout
    #[arg(short = 'p', requires = "entry")]
    pub pipe: bool,

    /// Treat ARCHIVE as an unpacked directory
    #[arg(short = 'x')]
    pub exploded: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_exploded(&self) -> bool {
        self.exploded || Path::new(&self.archive).is_dir()
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.is_very_quiet() {
            "off"
        } else if self.is_quiet() {
            "error"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}
