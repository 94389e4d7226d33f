use std::fs;
use std::io::{self, Read, Write};

use anyhow::{bail, Context};
use colored::Colorize;
use poon_patch::render_unified;
use poon_repo::{BackendConfig, ObjectType, RepoError, Repository, RepositoryConfig};
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let repo = open_repository(&cli)?;
    let format = cli.format;
    let result = match cli.command {
        Command::Ingest(args) => cmd_ingest(&repo, args),
        Command::Cat(args) => cmd_cat(&repo, args),
        Command::Ls(args) => cmd_ls(&repo, args, &format),
        Command::Log(args) => cmd_log(&repo, args, &format),
        Command::Apply(args) => cmd_apply(&repo, args),
        Command::History(args) => cmd_history(&repo, args, &format),
        Command::Diff(args) => cmd_diff(&repo, args),
        Command::Fsck(_) => cmd_fsck(&repo, &format),
        Command::Rollback(_) => cmd_rollback(&repo),
    };
    repo.close()?;
    result
}

/// Load `--config` if given. A config without a disk backend is pointed at
/// `--store`.
fn open_repository(cli: &Cli) -> anyhow::Result<Repository> {
    let mut config = match &cli.config {
        Some(path) => RepositoryConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RepositoryConfig::default(),
    };
    if matches!(config.backend, BackendConfig::Memory) {
        config.backend = BackendConfig::Disk { root: cli.store.clone() };
    }
    Ok(Repository::open(&config)?)
}

/// `requested`, or the current version when absent.
fn resolve_version(repo: &Repository, requested: Option<i64>) -> anyhow::Result<i64> {
    match requested {
        Some(version) => Ok(version),
        None => match repo.current_version()? {
            0 => bail!("repository is empty; run `poon ingest <dir>` first"),
            current => Ok(current),
        },
    }
}

fn cmd_ingest(repo: &Repository, args: IngestArgs) -> anyhow::Result<()> {
    let info = repo
        .create_commit_from_filesystem(&args.dir, &args.author, &args.message)
        .with_context(|| format!("snapshotting {}", args.dir.display()))?;
    println!(
        "{} Created version {} ({})",
        "✓".green().bold(),
        info.version.to_string().yellow().bold(),
        info.commit_hash.short_hex().dimmed(),
    );
    Ok(())
}

fn cmd_cat(repo: &Repository, args: CatArgs) -> anyhow::Result<()> {
    let version = resolve_version(repo, args.version)?;
    let content = repo.read_file(version, &args.path)?;
    io::stdout().write_all(&content)?;
    Ok(())
}

fn cmd_ls(repo: &Repository, args: LsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let version = resolve_version(repo, args.version)?;
    let entries = repo.read_directory(version, &args.path)?;
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in &entries {
        let name = match entry.entry_type {
            ObjectType::Tree => format!("{}/", entry.name).blue().bold(),
            _ => entry.name.normal(),
        };
        println!("{:o} {:>10} {} {}", entry.mode, entry.size, entry.hash.short_hex().dimmed(), name);
    }
    Ok(())
}

fn cmd_log(repo: &Repository, args: LogArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let versions = repo.list_versions(args.limit)?;
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }
    if versions.is_empty() {
        println!("No versions.");
    }
    for info in &versions {
        if args.oneline {
            println!("{} {} {}", format!("v{}", info.version).yellow(), info.commit_hash.short_hex().dimmed(), info.message);
        } else {
            println!("{}  {}", format!("v{}", info.version).yellow().bold(), info.commit_hash.to_hex().dimmed());
            println!("  Date: {}", info.timestamp.to_rfc3339());
            println!("  {}", info.message);
        }
    }
    Ok(())
}

fn cmd_apply(repo: &Repository, args: ApplyArgs) -> anyhow::Result<()> {
    let patch = if args.patch == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).context("reading patch from stdin")?;
        buf
    } else {
        fs::read(&args.patch).with_context(|| format!("reading patch {}", args.patch))?
    };
    let info = repo.apply_patch(&patch, &args.author, &args.message)?;
    println!(
        "{} Applied patch as version {} ({})",
        "✓".green().bold(),
        info.version.to_string().yellow().bold(),
        info.commit_hash.short_hex().dimmed(),
    );
    Ok(())
}

fn cmd_history(repo: &Repository, args: HistoryArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let changes = repo.file_history(&args.path, args.limit)?;
    if let OutputFormat::Json = format {
        let rows: Vec<_> = changes
            .iter()
            .map(|c| {
                json!({
                    "version": c.version,
                    "commit_hash": c.commit_hash,
                    "timestamp": c.timestamp,
                    "message": c.message,
                    "kind": c.kind.to_string(),
                    "blob": c.blob,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if changes.is_empty() {
        println!("No history for {}.", args.path.bold());
    }
    for change in &changes {
        println!(
            "{} {:<8} {} {}",
            format!("v{}", change.version).yellow(),
            change.kind.to_string().cyan(),
            change.timestamp.format("%Y-%m-%d %H:%M:%S"),
            change.message,
        );
    }
    Ok(())
}

fn cmd_diff(repo: &Repository, args: DiffArgs) -> anyhow::Result<()> {
    let to = resolve_version(repo, args.to)?;
    let old = read_or_empty(repo, args.from, &args.path)?;
    let new = read_or_empty(repo, to, &args.path)?;
    let patch = render_unified(&String::from_utf8_lossy(&old), &String::from_utf8_lossy(&new), &args.path);
    if patch.is_empty() {
        println!("No changes.");
    } else {
        print!("{patch}");
    }
    Ok(())
}

/// File content at `version`, or empty when the file or a parent directory
/// does not exist there.
fn read_or_empty(repo: &Repository, version: i64, path: &str) -> anyhow::Result<Vec<u8>> {
    match repo.read_file(version, path) {
        Ok(content) => Ok(content),
        Err(RepoError::FileNotFound { .. } | RepoError::DirectoryNotFound { .. }) => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn cmd_fsck(repo: &Repository, format: &OutputFormat) -> anyhow::Result<()> {
    let report = repo.verify_objects()?;
    if let OutputFormat::Json = format {
        let corrupt: Vec<_> = report
            .corrupt
            .iter()
            .map(|(hash, reason)| json!({ "hash": hash, "reason": reason }))
            .collect();
        let out = json!({
            "checked": report.checked,
            "reachable": report.reachable,
            "corrupt": corrupt,
            "missing": report.missing,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if report.is_ok() {
        println!("{} No issues. {} objects checked.", "✓".green().bold(), report.checked);
    } else {
        for (hash, reason) in &report.corrupt {
            println!("{} {} {}", "corrupt".red().bold(), hash, reason);
        }
        for hash in &report.missing {
            println!("{} {}", "missing".red().bold(), hash);
        }
    }
    if !report.is_ok() {
        bail!(
            "{} corrupt and {} missing objects",
            report.corrupt.len(),
            report.missing.len()
        );
    }
    Ok(())
}

fn cmd_rollback(repo: &Repository) -> anyhow::Result<()> {
    let now = repo.rollback()?;
    println!("{} Current version is now {}", "✓".green().bold(), now.to_string().yellow().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(store: &std::path::Path, rest: &[&str]) -> Cli {
        let mut argv = vec!["poon", "--store", store.to_str().unwrap()];
        argv.extend_from_slice(rest);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn store_flag_selects_disk_backend() {
        let store = TempDir::new().unwrap();
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("a.txt"), "a\n").unwrap();

        let repo = open_repository(&cli(store.path(), &["fsck"])).unwrap();
        repo.create_commit_from_filesystem(src.path(), "t", "seed").unwrap();
        repo.close().unwrap();

        let reopened = open_repository(&cli(store.path(), &["log"])).unwrap();
        assert_eq!(reopened.current_version().unwrap(), 1);
        assert_eq!(reopened.read_file(1, "a.txt").unwrap(), b"a\n");
    }

    #[test]
    fn resolve_version_defaults_to_current() {
        let store = TempDir::new().unwrap();
        let repo = open_repository(&cli(store.path(), &["ls"])).unwrap();
        assert!(resolve_version(&repo, None).is_err());
        assert_eq!(resolve_version(&repo, Some(4)).unwrap(), 4);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let store = TempDir::new().unwrap();
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("a.txt"), "a\n").unwrap();
        let repo = open_repository(&cli(store.path(), &["diff", "a.txt", "1"])).unwrap();
        repo.create_commit_from_filesystem(src.path(), "t", "seed").unwrap();

        assert!(read_or_empty(&repo, 1, "nope/b.txt").unwrap().is_empty());
        assert_eq!(read_or_empty(&repo, 1, "a.txt").unwrap(), b"a\n");
        assert!(read_or_empty(&repo, 7, "a.txt").is_err());
    }
}
