//! Handles all user-facing output for the CLI.
//!
//! Reports go to stdout through `termcolor`. Every status keeps a stable
//! mark and color across commands, so a report can be scanned at a glance:
//! `✓` success, `✗` failed, `?` pending, `~` ignored, `·` unknown.

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::run::Status;
use crate::suite::Suite;
use crate::test::Test;

fn stdout() -> StandardStream {
    let choice = if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

fn status_spec(status: Status) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match status {
        Status::Unknown => spec.set_dimmed(true),
        Status::Success => spec.set_fg(Some(Color::Green)),
        Status::Ignored => spec.set_fg(Some(Color::Yellow)),
        Status::Pending => spec.set_fg(Some(Color::Cyan)),
        Status::Failed => spec.set_fg(Some(Color::Red)).set_bold(true),
    };
    spec
}

fn mark(status: Status) -> &'static str {
    match status {
        Status::Unknown => "·",
        Status::Success => "✓",
        Status::Ignored => "~",
        Status::Pending => "?",
        Status::Failed => "✗",
    }
}

fn write_badge(out: &mut StandardStream, status: Status) {
    let _ = out.set_color(&status_spec(status));
    let _ = write!(out, "{status}");
    let _ = out.reset();
}

/// One line announcing a test about to execute.
pub fn print_running(test: &Test) {
    let mut out = stdout();
    let _ = out.set_color(ColorSpec::new().set_bold(true));
    let _ = writeln!(out, "running '{}' [{}]", test.name(), test.uid());
    let _ = out.reset();
}

/// Per-step status lines for each test.
pub fn print_status(tests: &[&Test]) {
    if tests.is_empty() {
        println!("  No tests stored.");
        return;
    }
    let mut out = stdout();
    for test in tests {
        let _ = out.set_color(ColorSpec::new().set_bold(true));
        let _ = write!(out, "{} [{}]", test.name(), test.uid());
        let _ = out.reset();
        let _ = write!(out, ": ");
        write_badge(&mut out, test.status());
        let _ = writeln!(out);

        for step in test.steps() {
            let status = step.status();
            let _ = write!(out, "  ");
            let _ = out.set_color(&status_spec(status));
            let _ = write!(out, "{}", mark(status));
            let _ = out.reset();
            let _ = write!(out, " {}: ", step.name());
            write_badge(&mut out, status);
            let _ = writeln!(out);
        }
    }
}

/// One line per stored test: uid, status, name, size.
pub fn print_list(tests: &[Test]) {
    if tests.is_empty() {
        println!("  No tests stored.");
        return;
    }
    let mut out = stdout();
    for test in tests {
        let status = test.status();
        let _ = write!(out, "  {}  ", test.uid());
        let _ = out.set_color(&status_spec(status));
        let _ = write!(out, "{:<7}", status.as_str());
        let _ = out.reset();
        let _ = writeln!(out, "  {} ({} steps)", test.name(), test.steps().len());
    }
}

/// End-of-run report: one line per executed test, then the step totals.
pub fn print_report(suite: &Suite) {
    let mut out = stdout();
    for (name, status) in suite.overview() {
        let _ = out.set_color(&status_spec(status));
        let _ = write!(out, "{} ", mark(status));
        let _ = out.reset();
        let _ = write!(out, "{name}: ");
        write_badge(&mut out, status);
        let _ = writeln!(out);
    }

    let summary = suite.summary();
    let _ = out.set_color(ColorSpec::new().set_bold(true));
    let _ = write!(out, "{} steps:", summary.total());
    let _ = out.reset();
    let counts = [
        (summary.success, Status::Success),
        (summary.ignored, Status::Ignored),
        (summary.pending, Status::Pending),
        (summary.failed, Status::Failed),
        (summary.unknown, Status::Unknown),
    ];
    for (count, status) in counts {
        if count == 0 {
            continue;
        }
        let _ = write!(out, " ");
        let _ = out.set_color(&status_spec(status));
        let _ = write!(out, "{count} {status}");
        let _ = out.reset();
    }
    let _ = writeln!(out);
}

/// A serialized document, verbatim, for reading or piping onward.
pub fn print_document(text: &str) {
    print!("{text}");
}

/// Registered hook identifiers, one per line.
pub fn print_hooks(names: &[String]) {
    if names.is_empty() {
        println!("  No hooks registered.");
        return;
    }
    for name in names {
        println!("  {name}");
    }
}
