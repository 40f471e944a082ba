use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "psc", about = "Find and remove duplicate files", version)]
pub struct Cli {
    /// Enable debug mode
    #[arg(long, global = true, hide = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan paths for duplicates
    Scan {
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
        /// Only consider files larger than this size (e.g. 10M)
        #[arg(long, value_parser = parse_size)]
        minimum: Option<i64>,
        /// Only consider files up to this size
        #[arg(long, value_parser = parse_size)]
        maximum: Option<i64>,
    },
    /// List all duplicates
    Report {
        path: Option<PathBuf>,
        /// Show paths relative to the filtered directory
        #[arg(short, long)]
        relative: bool,
    },
    /// Report statistics
    Summary,
    /// List files, annotating duplicates
    Ls {
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
        /// Show hidden files
        #[arg(short, long)]
        all: bool,
        /// List duplicates of each file
        #[arg(short, long)]
        verbose: bool,
        /// Show only files with duplicates
        #[arg(short = 'd', long, conflicts_with = "unique")]
        duplicate: bool,
        /// Show only files without duplicates
        #[arg(short, long)]
        unique: bool,
        /// Show duplicates as relative paths
        #[arg(short, long)]
        relative: bool,
        /// List subdirectories recursively
        #[arg(short = 'R', long)]
        recursive: bool,
        /// Show only regular files
        #[arg(short, long)]
        files: bool,
    },
    /// Show duplicate info about paths
    Info {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Show duplicates as relative paths
        #[arg(short, long)]
        relative: bool,
    },
    /// Recursively list all duplicates under a root
    Tree {
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Include hidden files
        #[arg(short, long)]
        all: bool,
    },
    /// Safely remove duplicates
    Rm {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Recursively delete duplicates
        #[arg(short, long)]
        recursive: bool,
        /// List files being deleted
        #[arg(short, long)]
        verbose: bool,
        /// Do not delete files, but show files eligible for deletion
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Delete only files that have a duplicate here
        #[arg(short, long, conflicts_with = "arbitrary")]
        contained: Vec<PathBuf>,
        /// With no witness elsewhere, keep one arbitrary copy per group
        #[arg(short, long)]
        arbitrary: bool,
    },
    /// Remove a directory subtree from the catalog
    Forget {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Compute and store hashes for files
    Hash {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Drop catalog entries whose files have disappeared
    Refresh,
    /// Emit the full duplicate listing as JSON
    Export,
    /// Delete the catalog
    Finish,
}

/// Parse a human-readable size like `1234`, `10M`, or `1.5 GB`. Values
/// beyond 63-bit capacity saturate to the maximum.
pub fn parse_size(value: &str) -> Result<i64, String> {
    let bytes = value
        .parse::<bytesize::ByteSize>()
        .map_err(|_| format!("cannot parse '{value}' as a number of bytes"))?
        .as_u64();
    Ok(bytes.min(i64::MAX as u64) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("1234").unwrap(), 1234);
        assert_eq!(parse_size("10M").unwrap(), 10_000_000);
        assert!(parse_size("ten").is_err());
    }

    #[test]
    fn test_parse_size_saturates() {
        assert_eq!(parse_size("18446744073709551615").unwrap(), i64::MAX);
    }
}
