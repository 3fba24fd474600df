//! Main entry point for the bootjar CLI application.
//!
//! Lists executable jars and the archives nested in them, pipes nested
//! entries to stdout, and prints the launch plan (main class and classpath)
//! of packed or unpacked executable jars.

use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Env;
use log::info;
use tokio::io::AsyncWriteExt;

use bootjar::{
    Archive, ClassPathContent, Cli, DataBlock, ExplodedArchive, LaunchSource, Launcher,
    PackedArchive,
};

/// Size of the chunks entries are streamed to stdout in.
const PIPE_CHUNK_SIZE: usize = 64 * 1024;

/// Application entry point.
///
/// Any error ends up here; returning it prints the cause chain and exits
/// with a non-zero status.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level())).init();

    if cli.is_exploded() {
        if cli.list || cli.pipe {
            bail!("-l and -p need a packed archive, '{}' is a directory", cli.archive);
        }
        let launcher = Launcher::new(ExplodedArchive::new(&cli.archive))
            .await
            .with_context(|| format!("Unable to read '{}'", cli.archive))?;
        return print_launch_plan(&launcher, &cli)
            .await
            .with_context(|| format!("Unable to launch '{}'", cli.archive));
    }

    let archive = Archive::open(&cli.archive)
        .await
        .with_context(|| format!("Unable to open '{}'", cli.archive))?;

    if cli.pipe {
        let entry = cli.entry.as_deref().unwrap_or_default();
        return pipe_entry(&archive, entry)
            .await
            .with_context(|| format!("Unable to read '{}' from '{}'", entry, cli.archive));
    }

    if cli.list {
        let target = match cli.entry.as_deref() {
            Some(path) => archive
                .open_archive_path(path)
                .await
                .with_context(|| format!("Unable to open '{}' in '{}'", path, cli.archive))?,
            None => archive,
        };
        return list_entries(&target, cli.verbose)
            .await
            .with_context(|| format!("Unable to list '{}'", target.name()));
    }

    let launcher = Launcher::new(PackedArchive::new(archive))
        .await
        .with_context(|| format!("Unable to read '{}'", cli.archive))?;
    print_launch_plan(&launcher, &cli)
        .await
        .with_context(|| format!("Unable to launch '{}'", cli.archive))
}

/// Print the main class and the resolved classpath, in order.
async fn print_launch_plan<S: LaunchSource>(launcher: &Launcher<S>, cli: &Cli) -> Result<()> {
    let main_class = launcher.main_class()?;
    let class_path = launcher.class_path().await?;
    info!(
        "Resolved {} classpath entries for {}",
        class_path.len(),
        launcher.source().name()
    );

    if cli.is_very_quiet() {
        return Ok(());
    }

    println!("Start-Class: {}", main_class);
    println!("Classpath:");
    for entry in &class_path {
        match &entry.content {
            ClassPathContent::Archive(archive) if cli.verbose => {
                let size = archive.block().size()?;
                let entries = archive.central_directory().await?.len();
                println!(
                    "  {}  ({}, {} entries)",
                    entry.name,
                    format_size(size),
                    entries
                );
            }
            ClassPathContent::Directory(path) if cli.verbose => {
                println!("  {}  ({})", entry.name, path.display());
            }
            _ => println!("  {}", entry.name),
        }
    }
    Ok(())
}

/// Stream an entry, possibly inside nested archives, to stdout.
async fn pipe_entry(archive: &Archive, path: &str) -> Result<()> {
    let block = archive.open_path(path).await?;
    let mut stdout = tokio::io::stdout();
    let mut buf = vec![0u8; PIPE_CHUNK_SIZE];
    let mut pos = 0u64;
    loop {
        let count = block.read_at(pos, &mut buf).await?;
        if count == 0 {
            break;
        }
        stdout.write_all(&buf[..count]).await?;
        pos += count as u64;
    }
    stdout.flush().await?;
    Ok(())
}

/// List entries of an archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just entry names, one per line
/// - Verbose format (`-lv`): Detailed table with size, compression ratio and timestamps
async fn list_entries(archive: &Archive, verbose: bool) -> Result<()> {
    let directory = archive.central_directory().await?;

    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    // Track totals for summary line
    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in directory.entries() {
        if verbose {
            let (year, month, day) = entry.mod_date();
            let (hour, minute, _second) = entry.mod_time();

            println!(
                "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
                entry.uncompressed_size,
                entry.compressed_size,
                ratio(entry.compressed_size, entry.uncompressed_size),
                year,
                month,
                day,
                hour,
                minute,
                entry.name
            );

            if !entry.is_directory {
                total_uncompressed += entry.uncompressed_size;
                total_compressed += entry.compressed_size;
                file_count += 1;
            }
        } else {
            println!("{}", entry.name);
        }
    }

    if verbose {
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files{}",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            "",
            file_count,
            if directory.zip64 { " (zip64)" } else { "" }
        );
    }

    Ok(())
}

/// Space saved by compression, as a right-aligned percentage.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Format a byte size into a human-readable string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
