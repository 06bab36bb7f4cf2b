//! Terminal presentation: event renderers, configuration summary, prompt.

use crate::config::Config;
use crate::event::{Event, EventKind, EventSink, MoveMethod, Phase, SkipReason};
use colored::Colorize;
use std::io::{self, BufRead, Write};

const ICON_COPY: &str = "📋";
const ICON_SKIP: &str = "⏭️";
const ICON_FOLDER: &str = "📁";
const ICON_EXPLODE: &str = "💥";
const ICON_RENAME: &str = "🏷️";
const ICON_REWRITE: &str = "🔀";
const ICON_CLEAN: &str = "🧹";
const ICON_COMPLETE: &str = "✅";
const ICON_WARNING: &str = "⚠️";

/// Indentation depth of a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Base,
    Action,
    Detail,
}

impl Level {
    fn indent(self) -> &'static str {
        match self {
            Level::Base => "",
            Level::Action => "  ",
            Level::Detail => "    ",
        }
    }
}

/// Human-readable renderer with icons and indentation.
pub struct TextSink<W: Write> {
    out: W,
    verbose: bool,
    error: Option<io::Error>,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            verbose: true,
            error: None,
        }
    }

    /// Hide per-file skip lines.
    pub fn quiet_skips(mut self) -> Self {
        self.verbose = false;
        self
    }

    /// First write error encountered, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, level: Level, icon: &str, dry_run: bool, message: &str) {
        if self.error.is_some() {
            return;
        }
        let mut text = String::from(level.indent());
        if !icon.is_empty() {
            text.push_str(icon);
            text.push(' ');
        }
        if dry_run {
            text.push_str(&"[DRY RUN] ".cyan().to_string());
        }
        text.push_str(message);
        if let Err(e) = writeln!(self.out, "{text}") {
            self.error = Some(e);
        }
    }
}

fn phase_intro(phase: Phase) -> &'static str {
    match phase {
        Phase::Clean => "Cleaning target directory...",
        Phase::Copy => "Beginning copy...",
        Phase::Loopback => "Beginning loopback copy [ignoring excludes]...",
        Phase::Explode => "Exploding directories...",
        Phase::Rename => "Processing renames...",
        Phase::Rewrite => "Processing rewrites...",
    }
}

impl<W: Write> EventSink for TextSink<W> {
    fn emit(&mut self, event: Event) {
        let dry = event.dry_run;
        match event.kind {
            EventKind::MappingStarted {
                source,
                destination,
            } => {
                let pair = format!("{} -> {}", source.display(), destination.display());
                self.line(
                    Level::Base,
                    "",
                    false,
                    &format!("Beginning operations for {}", pair.bold().blue()),
                );
            }
            EventKind::MappingCompleted {
                source,
                destination,
            } => self.line(
                Level::Base,
                "",
                false,
                &format!(
                    "Operations for {} -> {} complete!",
                    source.display(),
                    destination.display()
                ),
            ),
            EventKind::PhaseStarted { phase } => {
                let icon = if phase == Phase::Clean { ICON_CLEAN } else { "" };
                self.line(Level::Action, icon, false, phase_intro(phase));
            }
            EventKind::PhaseCompleted { phase } => self.line(
                Level::Action,
                ICON_COMPLETE,
                false,
                &format!("{} complete!", phase.label()).green().to_string(),
            ),
            EventKind::TargetCleaned { path, removed } => {
                let message = if dry {
                    format!("Would clear all contents of {}", path.display())
                } else {
                    format!("Removed {} entries from {}", removed, path.display())
                };
                self.line(Level::Detail, ICON_CLEAN, dry, &message);
            }
            EventKind::DirCreated { path } => {
                let verb = if dry { "Would create" } else { "Created" };
                self.line(
                    Level::Detail,
                    ICON_FOLDER,
                    dry,
                    &format!("{verb} directory {}", path.display()),
                );
            }
            EventKind::FileCopied {
                source,
                destination,
                ..
            } => {
                let verb = if dry { "Would copy" } else { "Copied" };
                self.line(
                    Level::Detail,
                    ICON_COPY,
                    dry,
                    &format!("{verb} {} to {}", source.display(), destination.display()),
                );
            }
            EventKind::FileSkipped { path, reason } => {
                if !self.verbose {
                    return;
                }
                let why = match reason {
                    SkipReason::Filtered => "does not match include/exclude rules",
                    SkipReason::NotRegularFile => "not a regular file",
                };
                self.line(
                    Level::Detail,
                    ICON_SKIP,
                    dry,
                    &format!("Skipping {path} ({why})").dimmed().to_string(),
                );
            }
            EventKind::LoopbackPatterns { patterns } => self.line(
                Level::Detail,
                ICON_COPY,
                dry,
                &format!(
                    "Beginning loopback from {} glob(s): [{}]",
                    patterns.len(),
                    patterns.join(", ")
                ),
            ),
            EventKind::Moved { from, to, method } => {
                let via = match method {
                    MoveMethod::Rename => "",
                    MoveMethod::CopyDelete => " (copy + delete)",
                };
                self.line(
                    Level::Detail,
                    ICON_EXPLODE,
                    dry,
                    &format!("Moved {} to {}{via}", from.display(), to.display()),
                );
            }
            EventKind::Exploded { dir, into } => {
                let message = if dry {
                    format!("If located, would explode {dir} into {}", into.display())
                } else {
                    format!("Exploded {dir} into {}", into.display())
                };
                self.line(Level::Detail, ICON_EXPLODE, dry, &message);
            }
            EventKind::Renamed { from, to } => self.line(
                Level::Detail,
                ICON_RENAME,
                dry,
                &format!("Renamed {} to {}", from.display(), to.display()),
            ),
            EventKind::RenamePlanned { from, to, root } => self.line(
                Level::Detail,
                ICON_RENAME,
                dry,
                &format!(
                    "Would rename any entry named {from} to {to} under {}",
                    root.display()
                ),
            ),
            EventKind::Rewrote { path, changed } => {
                let message = if changed {
                    format!("Rewrote {}", path.display())
                } else {
                    format!("No matches in {}; left unchanged", path.display())
                };
                self.line(Level::Detail, ICON_REWRITE, dry, &message);
            }
            EventKind::RewritePlanned {
                glob,
                search,
                replace,
                regex,
            } => {
                let kind = if regex { "regex" } else { "literal" };
                self.line(
                    Level::Detail,
                    ICON_REWRITE,
                    dry,
                    &format!(
                        "If files match glob '{glob}', would rewrite {search} to {replace} via {kind} search"
                    ),
                );
            }
            EventKind::NotFound {
                phase,
                target,
                root,
            } => {
                let message = match phase {
                    Phase::Rewrite => format!(
                        "No files matching glob '{target}' in {}; skipping",
                        root.display()
                    ),
                    _ => format!("Unable to locate {target} in {}; skipping", root.display()),
                };
                self.line(Level::Detail, ICON_SKIP, dry, &message);
            }
        }
    }
}

/// One JSON object per event per line.
pub struct JsonSink<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for JsonSink<W> {
    fn emit(&mut self, event: Event) {
        if self.error.is_some() {
            return;
        }
        let written = serde_json::to_writer(&mut self.out, &event)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(self.out));
        if let Err(e) = written {
            self.error = Some(e);
        }
    }
}

/// Print what a run is about to do.
pub fn print_config_summary(config: &Config, out: &mut impl Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "==== Configuration ====".bold())?;
    writeln!(out)?;

    writeln!(out, "Copy sources and destinations:")?;
    for mapping in &config.mappings {
        writeln!(
            out,
            "  {} -> {}",
            config.source_path(mapping).display(),
            config.dest_path(mapping).display()
        )?;
    }

    if !config.renames.is_empty() {
        writeln!(out, "Renames:")?;
        for rename in &config.renames {
            writeln!(
                out,
                "  • All entries named {} will be renamed to {}",
                rename.from, rename.to
            )?;
        }
    }

    if !config.explode_dirs.is_empty() {
        writeln!(out, "Exploded directories:")?;
        for name in &config.explode_dirs {
            writeln!(
                out,
                "  • Directories named {name} will have their contents moved to the platform folder"
            )?;
        }
    }

    if !config.rewrite_specs.is_empty() {
        let kind = if config.rewrites_are_regex {
            "Regex"
        } else {
            "Literal"
        };
        writeln!(out, "{kind} file rewrites:")?;
        for spec in &config.rewrite_specs {
            writeln!(
                out,
                "  • Files matching glob '{}' will have {} replaced with {}",
                spec.glob, spec.search, spec.replace
            )?;
        }
    }

    let includes = config.policy.includes().patterns();
    let excludes = config.policy.excludes().patterns();
    if !includes.is_empty() {
        writeln!(out, "Copy will include files/folders matching any of:")?;
        for pattern in includes {
            writeln!(out, "  • {pattern}")?;
        }
    }
    if !excludes.is_empty() {
        writeln!(out, "Copy will exclude files/folders matching any of:")?;
        for pattern in excludes {
            writeln!(out, "  • {pattern}")?;
        }
    }

    if let Some(matching) = config.loopback {
        writeln!(
            out,
            "Loopback copy enabled (match by {matching}); excludes are ignored for it"
        )?;
    }
    if config.clean_target {
        writeln!(
            out,
            "{}",
            "Target directories will be cleaned before copying".yellow()
        )?;
    }
    if config.dry_run {
        writeln!(
            out,
            "{}",
            "Dry run mode enabled; no files will be copied or modified".cyan()
        )?;
    }

    writeln!(out)?;
    writeln!(out, "{}", "==== End Configuration ====".bold())?;
    Ok(())
}

/// Warn about every destination that `--clean-target` will empty.
pub fn print_clean_warning(config: &Config, out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "{ICON_WARNING} {} The clean-target option will delete all contents of:",
        "WARNING".yellow().bold()
    )?;
    for mapping in &config.mappings {
        writeln!(out, "  • {}", config.dest_path(mapping).display())?;
    }
    writeln!(out)
}

/// Ask a yes/no question until answered. End of input counts as "no".
pub fn confirm<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> io::Result<bool> {
    let mut answer = String::new();
    loop {
        write!(output, "{prompt} [y/n]: ")?;
        output.flush()?;

        answer.clear();
        if input.read_line(&mut answer)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please enter 'y' or 'n'")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn render(events: Vec<Event>) -> String {
        let mut sink = TextSink::new(Vec::new());
        for event in events {
            sink.emit(event);
        }
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_text_indentation_by_level() {
        let out = render(vec![
            Event::new(EventKind::PhaseStarted { phase: Phase::Copy }),
            Event::new(EventKind::DirCreated {
                path: PathBuf::from("/dst/images"),
            }),
        ]);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("  Beginning copy"));
        assert!(lines[1].starts_with("    📁 "));
        assert!(lines[1].contains("Created directory /dst/images"));
    }

    #[test]
    fn test_text_dry_run_prefix() {
        let out = render(vec![Event::with_dry_run(
            EventKind::Exploded {
                dir: "images".to_string(),
                into: PathBuf::from("/dst"),
            },
            true,
        )]);
        assert!(out.contains("[DRY RUN]"));
        assert!(out.contains("If located, would explode images into /dst"));
    }

    #[test]
    fn test_dry_run_rename_names_any_depth() {
        let out = render(vec![Event::with_dry_run(
            EventKind::RenamePlanned {
                from: "gamelist.xml".to_string(),
                to: "miyoogamelist.xml".to_string(),
                root: PathBuf::from("/dst/PS1"),
            },
            true,
        )]);
        assert!(out.contains(
            "Would rename any entry named gamelist.xml to miyoogamelist.xml under /dst/PS1"
        ));
    }

    #[test]
    fn test_quiet_skips() {
        let mut sink = TextSink::new(Vec::new()).quiet_skips();
        sink.emit(Event::new(EventKind::FileSkipped {
            path: "a.xml".to_string(),
            reason: SkipReason::Filtered,
        }));
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn test_json_lines() {
        let mut sink = JsonSink::new(Vec::new());
        sink.emit(Event::new(EventKind::PhaseStarted { phase: Phase::Copy }));
        sink.emit(Event::new(EventKind::PhaseCompleted { phase: Phase::Copy }));
        assert!(sink.take_error().is_none());

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "phase_started");
        assert_eq!(lines[1]["phase"], "copy");
    }

    #[test]
    fn test_confirm_retries_until_answer() {
        let mut input = Cursor::new("maybe\nYES\n");
        let mut output = Vec::new();
        assert!(confirm("Proceed?", &mut input, &mut output).unwrap());
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Please enter 'y' or 'n'"));
        assert_eq!(shown.matches("Proceed? [y/n]: ").count(), 2);
    }

    #[test]
    fn test_confirm_no_and_eof() {
        let mut output = Vec::new();
        assert!(!confirm("Go?", &mut Cursor::new("n\n"), &mut output).unwrap());
        assert!(!confirm("Go?", &mut Cursor::new(""), &mut output).unwrap());
    }
}
