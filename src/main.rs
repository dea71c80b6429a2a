//! Command-line front end for pullzip.
//!
//! Lists, tests and extracts local ZIP archives with unzip-style flags.

use anyhow::{Result, bail};
use clap::Parser;
use std::path::{Component, Path, PathBuf};

use pullzip::{ByteSource, Cli, ZipArchive, ZipExtractor, ZipFileEntry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let archive = match ZipArchive::open(&cli.file) {
        Ok(archive) => archive,
        Err(e) => bail!("cannot open {}: {}", cli.file, e),
    };
    run(ZipExtractor::new(archive), &cli)
}

/// Dispatch on the requested mode: listing (`-l`, `-v`), integrity test
/// (`-t`) or extraction.
fn run<S: ByteSource>(extractor: ZipExtractor<S>, cli: &Cli) -> Result<()> {
    if cli.list || cli.verbose {
        print_listing(&extractor, cli.verbose);
        return Ok(());
    }

    let selected: Vec<ZipFileEntry> = extractor
        .list_files()
        .into_iter()
        .filter(|entry| is_selected(&entry.file_name, cli))
        .collect();

    if cli.test {
        return test_entries(&extractor, &selected, cli);
    }

    let banner = cli.pipe && selected.len() > 1;
    for entry in &selected {
        extract_entry(&extractor, entry, cli, banner)?;
    }
    Ok(())
}

/// An entry is processed when it matches one of the requested names (or no
/// names were given) and none of the `-x` patterns.
fn is_selected(name: &str, cli: &Cli) -> bool {
    let base = base_name(name);
    let requested = cli.files.is_empty()
        || cli.files.iter().any(|wanted| {
            if is_pattern(wanted) {
                glob_match(wanted, name)
            } else {
                name == wanted.as_str() || base == wanted.as_str()
            }
        });

    requested
        && !cli
            .exclude
            .iter()
            .any(|excluded| name.contains(excluded.as_str()) || glob_match(excluded, name))
}

fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn print_listing<S: ByteSource>(extractor: &ZipExtractor<S>, verbose: bool) {
    let entries = extractor.list_files();
    if !verbose {
        for entry in &entries {
            println!("{}", entry.file_name);
        }
        return;
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:<8}  {:>10}  {:>5}  {:>8}  Name",
        "Length", "Size", "Cmpr", "Method", "Date", "Time", "CRC-32"
    );
    println!("{}", "-".repeat(88));

    let (mut length, mut size) = (0u64, 0u64);
    for entry in &entries {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _) = entry.mod_time();
        println!(
            "{:>10}  {:>10}  {}  {:<8}  {:04}-{:02}-{:02}  {:02}:{:02}  {:08x}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            savings(entry.compressed_size, entry.uncompressed_size),
            entry.compression_method.to_string(),
            year,
            month,
            day,
            hour,
            minute,
            entry.crc32,
            entry.file_name
        );
        length += entry.uncompressed_size;
        size += entry.compressed_size;
    }

    println!("{}", "-".repeat(88));
    println!(
        "{:>10}  {:>10}  {}  {:>43}  {} files",
        length,
        size,
        savings(size, length),
        "",
        entries.len()
    );

    let comment = extractor.archive().comment();
    if !comment.is_empty() {
        println!("{}", String::from_utf8_lossy(comment));
    }
}

/// Space saved by compression, right-aligned percentage.
fn savings(compressed: u64, uncompressed: u64) -> String {
    let percent = match uncompressed {
        0 => 0,
        _ => 100u64.saturating_sub(compressed * 100 / uncompressed),
    };
    format!("{:>4}%", percent)
}

/// Decode every selected entry and report the ones whose data is damaged.
fn test_entries<S: ByteSource>(
    extractor: &ZipExtractor<S>,
    entries: &[ZipFileEntry],
    cli: &Cli,
) -> Result<()> {
    let mut failed = 0usize;
    for entry in entries {
        match extractor.test_file(entry) {
            Ok(()) if !cli.is_quiet() => println!("    testing: {:<40} OK", entry.file_name),
            Ok(()) => {}
            Err(e) => {
                failed += 1;
                eprintln!("    testing: {:<40} FAILED ({})", entry.file_name, e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} entries failed the integrity test", failed, entries.len());
    }
    if !cli.is_very_quiet() {
        println!("No errors detected in {} ({} entries)", cli.file, entries.len());
    }
    Ok(())
}

fn extract_entry<S: ByteSource>(
    extractor: &ZipExtractor<S>,
    entry: &ZipFileEntry,
    cli: &Cli,
    banner: bool,
) -> Result<()> {
    if cli.pipe {
        if banner {
            println!("--- {} ---", entry.file_name);
        }
        return extractor.extract_to_stdout(entry);
    }

    let Some(target) = output_path(&entry.file_name, cli) else {
        if !cli.is_quiet() {
            eprintln!("Skipping: {} (path leaves the extraction directory)", entry.file_name);
        }
        return Ok(());
    };
    if target.exists() && (cli.never_overwrite || !cli.overwrite) {
        if !cli.is_quiet() {
            let hint = if cli.never_overwrite {
                "file exists"
            } else {
                "use -o to overwrite"
            };
            eprintln!("Skipping: {} ({})", entry.file_name, hint);
        }
        return Ok(());
    }

    if !cli.is_quiet() {
        println!("  extracting: {}", entry.file_name);
    }
    extractor.extract_to_file(entry, &target)
}

/// Destination of an entry on disk, honouring `-d` and `-j`.
///
/// `None` for names that are absolute or climb out with `..`.
fn output_path(name: &str, cli: &Cli) -> Option<PathBuf> {
    let relative = if cli.junk_paths { base_name(name) } else { name };

    let mut cleaned = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => cleaned.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if cleaned.as_os_str().is_empty() {
        return None;
    }

    Some(match cli.extract_dir.as_deref() {
        Some(dir) => Path::new(dir).join(cleaned),
        None => cleaned,
    })
}

fn is_pattern(text: &str) -> bool {
    text.contains(['*', '?'])
}

/// Wildcard match where `*` spans any run of characters (including none) and
/// `?` stands for exactly one.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, tried)) => {
                    p = star + 1;
                    t = tried + 1;
                    backtrack = Some((star, tried + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("pullzip").chain(args.iter().copied()))
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*.txt", "readme.txt"));
        assert!(glob_match("file?.dat", "file1.dat"));
        assert!(!glob_match("*.txt", "readme.md"));
        assert!(glob_match("models/*/skin*", "models/orbb/skin_red.png"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a*b*c", "aXbYbZc"));
        assert!(!glob_match("a?c", "ac"));
    }

    #[test]
    fn test_selection() {
        let all = cli(&["a.zip"]);
        assert!(is_selected("docs/readme.txt", &all));

        let by_name = cli(&["a.zip", "readme.txt"]);
        assert!(is_selected("docs/readme.txt", &by_name));
        assert!(!is_selected("docs/other.txt", &by_name));

        let excluded = cli(&["a.zip", "-x", "*.md"]);
        assert!(is_selected("notes.txt", &excluded));
        assert!(!is_selected("notes.md", &excluded));
    }

    #[test]
    fn test_output_path() {
        let junk = cli(&["-j", "-d", "out", "a.zip"]);
        assert_eq!(
            output_path("docs/readme.txt", &junk).as_deref(),
            Some(Path::new("out/readme.txt"))
        );

        let keep = cli(&["a.zip"]);
        assert_eq!(
            output_path("./docs/readme.txt", &keep).as_deref(),
            Some(Path::new("docs/readme.txt"))
        );
    }

    #[test]
    fn test_output_path_stays_inside_extract_dir() {
        let into = cli(&["-d", "out", "a.zip"]);
        assert_eq!(output_path("../../etc/passwd", &into), None);
        assert_eq!(output_path("docs/../../up.txt", &into), None);
        assert_eq!(output_path("/tmp/abs.txt", &into), None);
        assert_eq!(output_path("./", &into), None);

        // Only the base name survives `-j`, so the climb is harmless there.
        let junk = cli(&["-j", "-d", "out", "a.zip"]);
        assert_eq!(
            output_path("../../etc/passwd", &junk).as_deref(),
            Some(Path::new("out/passwd"))
        );
        assert_eq!(output_path("docs/..", &junk), None);
    }

    #[test]
    fn test_savings() {
        assert_eq!(savings(13, 14), "   8%");
        assert_eq!(savings(0, 0), "   0%");
        assert_eq!(savings(20, 10), "   0%");
    }
}
