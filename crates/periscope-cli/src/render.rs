use humansize::{format_size, DECIMAL};
use periscope_core::paths;
use periscope_core::query::{FileReport, Listing, LsEntry, TreeEntry};
use periscope_core::{DuplicateSet, Error, InfoSummary, Result};
use std::path::Path;

pub fn render_error(err: &Error, debug: bool) -> String {
    match err {
        Error::User(message) => format!("{message}\n"),
        Error::Unlikely { short, long } => format!("{short}\n\n{long}\n"),
        Error::Io(_) | Error::Database(_) | Error::Internal(_) => {
            let mut out = format!("internal error: {err}\n");
            if !debug {
                out.push_str(
                    "\nThis might be a bug in periscope. Run with --debug for more \
                     detail, and please consider reporting this occurrence.\n",
                );
            }
            out
        }
    }
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn comma(n: i64) -> String {
    let digits = n.abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{out}")
    } else {
        out
    }
}

pub fn print_report(sets: &[DuplicateSet], relative: bool, dir: Option<&Path>) -> Result<()> {
    let ref_dir = if relative {
        Some(paths::clean_abs(dir.unwrap_or_else(|| Path::new(".")))?)
    } else {
        None
    };
    for (i, set) in sets.iter().enumerate() {
        if i > 0 {
            println!();
        }
        // all files within a set have the same size
        println!("{}", format_size(set[0].size as u64, DECIMAL));
        for info in set {
            match &ref_dir {
                Some(dir) => println!("  {}", paths::rel_path(dir, &info.path).display()),
                None => println!("  {}", info.path.display()),
            }
        }
    }
    Ok(())
}

pub fn print_summary(summary: &InfoSummary) {
    println!("tracked {}", comma(summary.files));
    println!("unique {}", comma(summary.unique));
    println!("duplicate {}", comma(summary.duplicate));
    println!("overhead {}", format_size(summary.overhead.max(0) as u64, DECIMAL));
}

fn entry_desc(entry: &LsEntry) -> String {
    match entry.kind.tag() {
        Some(tag) => tag.to_string(),
        None if entry.dup_count > 0 => entry.dup_count.to_string(),
        None => String::new(),
    }
}

pub fn print_listings(listings: &[Listing], show_headers: bool) {
    let mut first = true;
    for listing in listings {
        if show_headers && listing.entries.is_empty() && !first {
            continue;
        }
        if show_headers {
            if !first {
                println!();
            }
            println!("{}:", listing.dir.display());
        }
        first = false;
        let width = listing
            .entries
            .iter()
            .map(|entry| entry_desc(entry).len())
            .max()
            .unwrap_or(0);
        for entry in &listing.entries {
            let desc = entry_desc(entry);
            if width > 0 {
                println!("{desc:>width$} {}", entry.name);
            } else {
                println!("{}", entry.name);
            }
            for dupe in &entry.duplicates {
                println!("{:width$}   {}", "", dupe.display());
            }
        }
    }
}

pub fn print_info(reports: &[FileReport]) {
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", report.path.display());
        if let Some(short_hash) = &report.short_hash {
            println!("  short hash: {}", hex(short_hash));
        }
        if let Some(full_hash) = &report.full_hash {
            println!("  full hash:  {}", hex(full_hash));
        }
        if !report.duplicates.is_empty() {
            println!("  duplicates: {}", report.duplicates.len());
            for dupe in &report.duplicates {
                println!("    {}", dupe.display());
            }
        }
    }
}

pub fn print_tree(entries: &[TreeEntry]) {
    let width = entries
        .iter()
        .map(|entry| entry.dup_count.to_string().len())
        .max()
        .unwrap_or(0);
    for entry in entries {
        println!("{:>width$} {}", entry.dup_count, entry.path.display());
    }
}
