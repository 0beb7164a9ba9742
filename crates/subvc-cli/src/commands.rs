use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use subvc_sdk::repository::REPO_DIR;
use subvc_sdk::{
    FileDiff, FileSet, HistoryReport, Version, VersionControl, VersionControlConfig,
    VersionDiff, VersionRequest,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    if let Command::Init(args) = cli.command {
        return cmd_init(cli.repo, args, format);
    }

    let vc = open_repo(cli.repo)?;
    match cli.command {
        Command::Init(_) => Ok(()),
        Command::Commit(args) => cmd_commit(&vc, args, format),
        Command::Log(args) => cmd_log(&vc, args, format),
        Command::Show(args) => cmd_show(&vc, args, format),
        Command::Latest(args) => cmd_latest(&vc, args, format),
        Command::Cat(args) => cmd_cat(&vc, args),
        Command::Diff(args) => cmd_diff(&vc, args, format),
        Command::Verify(args) => cmd_verify(&vc, args, format),
        Command::Gc(args) => cmd_gc(&vc, args, format),
        Command::Stats => cmd_stats(&vc, format),
    }
}

fn open_repo(repo: Option<PathBuf>) -> anyhow::Result<VersionControl> {
    let root = match repo {
        Some(root) => root,
        None => VersionControl::discover(&std::env::current_dir()?)?,
    };
    VersionControl::open(&root).with_context(|| format!("opening {}", root.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(repo: Option<PathBuf>, args: InitArgs, format: OutputFormat) -> anyhow::Result<()> {
    let root = args.path.or(repo).unwrap_or_else(|| PathBuf::from("."));
    let mut config = VersionControlConfig::default();
    if let Some(interval) = args.snapshot_interval {
        config.snapshot_interval = interval;
    }
    config.compression.enabled = args.compress;

    let vc = VersionControl::init(&root, config)?;
    if format == OutputFormat::Json {
        return print_json(vc.config());
    }
    println!(
        "{} Initialized subvc repository in {}",
        "✓".green().bold(),
        root.join(REPO_DIR).display().to_string().bold()
    );
    println!("  Snapshot interval: {}", vc.config().snapshot_interval);
    println!(
        "  Compression: {}",
        if vc.config().compression.enabled { "zstd".cyan() } else { "off".dimmed() }
    );
    Ok(())
}

fn cmd_commit(vc: &VersionControl, args: CommitArgs, format: OutputFormat) -> anyhow::Result<()> {
    let files = collect_files(&args.paths)?;
    debug!(files = files.len(), submission = %args.submission, "collected files");
    let mut request = VersionRequest::new(args.submission)
        .with_files(files)
        .with_trigger(args.trigger);
    if let Some(author) = args.author {
        request = request.with_author(author);
    }
    if let Some(message) = args.message {
        request = request.with_message(message);
    }
    for (key, value) in args.metadata {
        request = request.with_metadata(key, value);
    }

    let version = vc.create_version(request)?;
    if format == OutputFormat::Json {
        return print_json(&version);
    }
    println!(
        "{} Recorded version {} of submission {}",
        "✓".green().bold(),
        version.version_number.to_string().yellow().bold(),
        version.submission_id
    );
    println!("  Id: {}", version.id);
    println!("  Commit: {}", version.commit_hash.as_str().dimmed());
    println!(
        "  Files: {} ({} bytes)",
        version.total_files, version.total_size_bytes
    );
    if version.is_snapshot {
        println!("  {}", "snapshot".cyan());
    }
    Ok(())
}

fn cmd_log(vc: &VersionControl, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut versions = vc.get_versions(args.submission)?;
    if let Some(limit) = args.limit {
        versions.truncate(limit);
    }
    if format == OutputFormat::Json {
        return print_json(&versions);
    }
    if versions.is_empty() {
        println!("No versions for submission {}.", args.submission);
        return Ok(());
    }
    for version in &versions {
        if args.oneline {
            println!(
                "{} {} {}",
                format!("v{}", version.version_number).yellow(),
                version.commit_hash.short().dimmed(),
                version.commit_message.as_deref().unwrap_or("")
            );
        } else {
            print_version_header(version);
            println!();
        }
    }
    Ok(())
}

fn print_version_header(version: &Version) {
    let snapshot = if version.is_snapshot { " [snapshot]" } else { "" };
    println!(
        "{}  {}  (id {}){}",
        format!("v{}", version.version_number).yellow().bold(),
        version.commit_hash.as_str().dimmed(),
        version.id,
        snapshot.cyan()
    );
    println!("  Trigger: {}", version.trigger_type);
    if let Some(author) = &version.created_by {
        println!("  Author: {author}");
    }
    println!("  Date: {}", version.created_at.to_rfc3339());
    if let Some(message) = &version.commit_message {
        println!("  Message: {message}");
    }
    for (key, value) in &version.metadata {
        println!("  {}: {value}", key.dimmed());
    }
    println!(
        "  Files: {} ({} bytes)",
        version.total_files, version.total_size_bytes
    );
}

fn cmd_show(vc: &VersionControl, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let version = vc.get_version(args.version)?;
    print_version(&version, format)
}

fn cmd_latest(vc: &VersionControl, args: LatestArgs, format: OutputFormat) -> anyhow::Result<()> {
    let version = vc.get_latest_version(args.submission)?;
    print_version(&version, format)
}

fn print_version(version: &Version, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(version);
    }
    print_version_header(version);
    if let Some(parent) = version.parent_version_id {
        println!("  Parent: {parent}");
    }
    println!();
    for file in &version.files {
        println!(
            "  {:>10}  {}  {}  {}",
            file.file_size_bytes,
            file.content_hash.short_hex().dimmed(),
            file.file_path,
            file.content_type.dimmed()
        );
    }
    Ok(())
}

fn cmd_cat(vc: &VersionControl, args: CatArgs) -> anyhow::Result<()> {
    let content = vc.get_file_content(args.version, &args.path)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&content)?;
    stdout.flush()?;
    Ok(())
}

fn cmd_diff(vc: &VersionControl, args: DiffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let diff = vc.diff(args.source, args.target, args.path.as_deref())?;
    if format == OutputFormat::Json {
        return print_json(&diff);
    }
    if diff.files.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    for file in &diff.files {
        print_file_diff(file, args.stat);
    }
    print_summary(&diff);
    Ok(())
}

fn print_file_diff(file: &FileDiff, stat_only: bool) {
    let label = format!("{:<8}", file.change_type.to_string());
    let label = match file.change_type {
        subvc_sdk::ChangeType::Added => label.green(),
        subvc_sdk::ChangeType::Modified => label.yellow(),
        subvc_sdk::ChangeType::Deleted => label.red(),
    };
    println!(
        "{} {}  {} {} {}",
        label,
        file.file_path.bold(),
        format!("+{}", file.lines_added).green(),
        format!("-{}", file.lines_deleted).red(),
        format!("~{}", file.lines_modified).yellow()
    );
    if stat_only {
        return;
    }
    for line in file.unified_diff.lines() {
        if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else {
            println!("{}", line.dimmed());
        }
    }
    println!();
}

fn print_summary(diff: &VersionDiff) {
    let s = &diff.summary;
    println!(
        "v{} -> v{}: {} files changed ({} added, {} modified, {} deleted), {} insertions(+), {} deletions(-), {} modified(~)",
        diff.source_version_number,
        diff.target_version_number,
        s.total_files,
        s.files_added,
        s.files_modified,
        s.files_deleted,
        s.total_lines_added,
        s.total_lines_deleted,
        s.total_lines_modified
    );
}

fn cmd_verify(vc: &VersionControl, args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let reports = match args.submission {
        Some(submission) => vec![vc.validate_history(submission)?],
        None => vc.validate_all()?,
    };
    let failed = reports.iter().filter(|r| !r.is_valid()).count();

    if format == OutputFormat::Json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            print_report(report);
        }
        if reports.is_empty() {
            println!("No submissions recorded.");
        }
    }
    if failed > 0 {
        bail!("{failed} submission histories failed validation");
    }
    Ok(())
}

fn print_report(report: &HistoryReport) {
    let mark = |ok: bool| if ok { "valid".green() } else { "INVALID".red().bold() };
    let status = if report.is_valid() { "✓".green().bold() } else { "✗".red().bold() };
    println!(
        "{} Submission {} ({} versions)",
        status, report.submission_id, report.version_count
    );
    println!("  Numbering: {}", mark(report.numbering_contiguous));
    println!("  Parent links: {}", mark(report.parent_links_valid));
    println!("  Snapshot flags: {}", mark(report.snapshot_flags_valid));
    println!("  Aggregates: {}", mark(report.aggregates_valid));
    println!("  Blobs: {}", mark(report.blobs_present));
    for violation in &report.violations {
        println!(
            "    {} v{}: {:?} {}",
            "!".red(),
            violation.version_number,
            violation.kind,
            violation.description
        );
    }
}

fn cmd_gc(vc: &VersionControl, args: GcArgs, format: OutputFormat) -> anyhow::Result<()> {
    let blobs = if args.dry_run {
        vc.unreferenced_blobs()?
    } else {
        vc.collect_garbage()?
    };
    if format == OutputFormat::Json {
        return print_json(&blobs);
    }
    let bytes: u64 = blobs.iter().map(|b| b.size_bytes).sum();
    let verb = if args.dry_run { "would remove" } else { "removed" };
    println!(
        "{} GC {} {} blobs ({} bytes)",
        "✓".green(),
        verb,
        blobs.len(),
        bytes
    );
    for blob in &blobs {
        println!("  {} {}", blob.id, blob.content_hash.short_hex().dimmed());
    }
    Ok(())
}

fn cmd_stats(vc: &VersionControl, format: OutputFormat) -> anyhow::Result<()> {
    let stats = vc.stats()?;
    if format == OutputFormat::Json {
        return print_json(&stats);
    }
    println!("Submissions: {}", stats.submission_count.to_string().bold());
    println!("Versions: {}", stats.version_count.to_string().bold());
    println!(
        "Blobs: {} ({} unreferenced)",
        stats.blob_count.to_string().bold(),
        stats.unreferenced_blobs
    );
    println!(
        "Bytes: {} logical, {} stored",
        stats.logical_bytes, stats.stored_bytes
    );
    Ok(())
}

/// Read the given files, walking directories. Directory entries are keyed
/// relative to the directory; plain files by the path as given.
pub fn collect_files(paths: &[PathBuf]) -> anyhow::Result<FileSet> {
    let mut files = FileSet::new();
    for path in paths {
        if path.is_dir() {
            let walker = WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.file_name() != REPO_DIR);
            for entry in walker {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(path)?;
                insert_file(&mut files, relative, entry.path())?;
            }
        } else if path.is_file() {
            insert_file(&mut files, path, path)?;
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    Ok(files)
}

fn insert_file(files: &mut FileSet, key: &Path, source: &Path) -> anyhow::Result<()> {
    let key = repo_path(key)?;
    let content =
        std::fs::read(source).with_context(|| format!("reading {}", source.display()))?;
    if files.insert(key.clone(), content).is_some() {
        bail!("{key} was given more than once");
    }
    Ok(())
}

/// `/`-separated relative path for a local file path.
fn repo_path(path: &Path) -> anyhow::Result<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => match part.to_str() {
                Some(part) => parts.push(part),
                None => bail!("{} is not valid UTF-8", path.display()),
            },
            Component::CurDir => {}
            _ => bail!("{} must be a relative path inside the project", path.display()),
        }
    }
    if parts.is_empty() {
        bail!("{} does not name a file", path.display());
    }
    Ok(parts.join("/"))
}
