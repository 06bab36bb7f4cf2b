use anyhow::Result;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use rom_copy_engine::config::{
    load_from_path, Config, ConfigError, DirMapping, NameMapping, Profile, RewriteSpec,
};
use rom_copy_engine::console::{self, JsonSink, TextSink};
use rom_copy_engine::engine::{self, RunSummary};
use rom_copy_engine::loopback::LoopbackMatch;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "rom-copy-engine")]
#[command(
    about = "Copy and reshape game ROM platform folders",
    long_about = "Copies platform folders ('snes', 'psx', ...) from a source library into a \
                  destination tree, filtered by globs, then explodes subdirectories, renames \
                  entries and rewrites file contents."
)]
#[command(version)]
struct Cli {
    /// Source directory containing platform folders, e.g. '/home/me/ROMs'
    #[arg(long, alias = "sourceDir", value_name = "PATH")]
    source_dir: Option<PathBuf>,

    /// Target directory containing platform folders, e.g. '/media/sdcard/Roms'
    #[arg(long, alias = "targetDir", value_name = "PATH")]
    target_dir: Option<PathBuf>,

    /// Source folder to destination folder, e.g. 'snes:SFC' (repeatable)
    #[arg(long = "mapping", value_name = "SRC:DST")]
    mappings: Vec<DirMapping>,

    /// Copy only entries matching any of these globs (repeatable; '**' crosses directories)
    #[arg(long, alias = "copyInclude", value_name = "GLOB")]
    copy_include: Vec<String>,

    /// Never copy entries matching any of these globs (repeatable)
    #[arg(long, alias = "copyExclude", value_name = "GLOB")]
    copy_exclude: Vec<String>,

    /// Move the contents of every directory with this name into the platform folder (repeatable)
    #[arg(long = "explode-dir", alias = "explodeDir", value_name = "NAME")]
    explode_dirs: Vec<String>,

    /// Rename every entry named OLD to NEW after copying (repeatable)
    #[arg(long = "rename", value_name = "OLD:NEW")]
    renames: Vec<NameMapping>,

    /// Find and replace inside files matching GLOB (repeatable)
    #[arg(long = "rewrite", value_name = "GLOB:SEARCH:REPLACE")]
    rewrites: Vec<RewriteSpec>,

    /// Treat every rewrite SEARCH as a regular expression
    #[arg(long, alias = "rewritesAreRegex")]
    rewrites_are_regex: bool,

    /// Delete everything in each destination folder before copying
    #[arg(long, alias = "cleanTarget")]
    clean_target: bool,

    /// After copying, also copy same-named files anywhere in the source, ignoring excludes
    #[arg(long, alias = "loopbackCopy")]
    loopback_copy: bool,

    /// How loopback patterns are derived: 'name' or 'stem'
    #[arg(long, value_name = "MODE")]
    loopback_match: Option<LoopbackMatch>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long, alias = "skipConfirm")]
    skip_confirm: bool,

    /// Report every operation without touching the filesystem
    #[arg(short = 'n', long, alias = "dryRun")]
    dry_run: bool,

    /// TOML profile; command-line flags are layered on top
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Event output format
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Hide per-file skip lines in text output
    #[arg(short, long)]
    quiet: bool,

    /// Diagnostic log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

impl Cli {
    fn to_profile(&self) -> Profile {
        Profile {
            source_dir: self.source_dir.clone(),
            target_dir: self.target_dir.clone(),
            mappings: self.mappings.clone(),
            copy_include: self.copy_include.clone(),
            copy_exclude: self.copy_exclude.clone(),
            explode_dirs: self.explode_dirs.clone(),
            renames: self.renames.clone(),
            rewrites: self.rewrites.clone(),
            rewrites_are_regex: self.rewrites_are_regex,
            clean_target: self.clean_target,
            loopback_copy: self.loopback_copy,
            loopback_match: self.loopback_match,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Indented, coloured lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match execute(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} Error: {}", "✗".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> Result<ExitCode> {
    // 1. Profile, then flags on top
    let profile = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => Profile::default(),
    };
    let config = Config::from_profile(profile.merge(cli.to_profile()))
        .map_err(|source| ConfigError::Validation {
            path: cli.config.clone(),
            source,
        })?
        .with_dry_run(cli.dry_run);

    // 2. Summary and confirmation (kept off stdout when it carries JSON)
    let mut info: Box<dyn Write> = match cli.output {
        OutputFormat::Text => Box::new(io::stdout()),
        OutputFormat::Json => Box::new(io::stderr()),
    };
    console::print_config_summary(&config, &mut info)?;
    writeln!(info)?;

    if !cli.skip_confirm && !cli.dry_run {
        if config.clean_target {
            console::print_clean_warning(&config, &mut info)?;
        }
        writeln!(
            info,
            "{}",
            "[Hint: rerun with '--dry-run' to see every operation without performing it, or \
             '--skip-confirm' to skip this confirmation]"
                .dimmed()
        )?;
        let proceed = console::confirm(
            "All files will be copied as summarized above. Conflicting names will be overwritten. Proceed?",
            &mut io::stdin().lock(),
            &mut info,
        )?;
        if !proceed {
            writeln!(info, "Copy cancelled. No operations performed.")?;
            return Ok(ExitCode::FAILURE);
        }
        writeln!(info, "Beginning copy...")?;
    } else {
        writeln!(info, "Skipping confirmation...")?;
    }
    writeln!(info)?;

    // 3. Run
    let summary = match cli.output {
        OutputFormat::Text => {
            let mut sink = TextSink::new(io::stdout());
            if cli.quiet {
                sink = sink.quiet_skips();
            }
            let summary = engine::run(&config, &mut sink)?;
            if let Some(e) = sink.take_error() {
                return Err(e.into());
            }
            summary
        }
        OutputFormat::Json => {
            let mut sink = JsonSink::new(io::stdout());
            let summary = engine::run(&config, &mut sink)?;
            if let Some(e) = sink.take_error() {
                return Err(e.into());
            }
            summary
        }
    };

    // 4. Summary
    print_summary(&summary, config.dry_run, &mut info)?;
    Ok(ExitCode::SUCCESS)
}

fn print_summary(summary: &RunSummary, dry_run: bool, out: &mut impl Write) -> io::Result<()> {
    let copied_label = if dry_run { "would be copied" } else { "copied" };
    writeln!(out)?;
    writeln!(out, "{}", "Summary:".bold())?;
    writeln!(
        out,
        "  {} mapping(s) processed",
        format!("{}", summary.mappings.len()).green()
    )?;
    writeln!(
        out,
        "  {} file(s) {copied_label}",
        format!("{}", summary.total_copied()).green()
    )?;
    writeln!(
        out,
        "  {} skipped",
        format!("{}", summary.total_skipped()).cyan()
    )?;
    writeln!(out, "All transfers & processing completed successfully!")
}
