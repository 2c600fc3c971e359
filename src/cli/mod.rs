//! The runbook command-line interface.
//!
//! Thin orchestration over the library: open the state store, dispatch the
//! subcommand, turn the outcome into an exit code. Exit status 1 means some
//! step is still `pending` or `failed` (or the command itself broke); 0
//! means everything the command touched is settled.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use walkdir::WalkDir;

use crate::cli::args::{Command, OutputFormat, RunbookArgs};
use crate::errors::RunbookError;
use crate::hooks::{standard_registry, HookRegistry};
use crate::run::Status;
use crate::spec::{self, Format, TestSpec};
use crate::store::{FileStore, Store};
use crate::suite::Suite;
use crate::test::Test;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    crate::logging::init();
    let args = RunbookArgs::parse();
    let registry = standard_registry();
    match dispatch(args, &registry) {
        Ok(code) => process::exit(code),
        Err(err) => {
            let report = miette::Report::new(err);
            eprintln!("{report:?}");
            process::exit(1);
        }
    }
}

fn dispatch(args: RunbookArgs, registry: &HookRegistry) -> Result<i32, RunbookError> {
    match args.command {
        Command::Run { scripts, output } => {
            let mut store = FileStore::open(&args.state, registry.clone())?;
            run_scripts(&mut store, registry, &scripts, output)
        }
        Command::Status { uid } => {
            let store = FileStore::open(&args.state, registry.clone())?;
            show_status(&store, uid.as_deref())
        }
        Command::Results { uid, output } => {
            let store = FileStore::open(&args.state, registry.clone())?;
            show_results(&store, uid.as_deref(), output)
        }
        Command::List => {
            let store = FileStore::open(&args.state, registry.clone())?;
            output::print_list(store.tests());
            Ok(0)
        }
        Command::Reset { uid } => {
            let mut store = FileStore::open(&args.state, registry.clone())?;
            reset(&mut store, uid.as_deref())
        }
        Command::Hooks => {
            output::print_hooks(&registry.names());
            Ok(0)
        }
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_scripts(
    store: &mut FileStore,
    registry: &HookRegistry,
    scripts: &[PathBuf],
    show_output: Option<OutputFormat>,
) -> Result<i32, RunbookError> {
    let mut executed = Vec::new();
    for path in discover_scripts(scripts)? {
        let mut test = load_script(&path, registry)?;
        if let Some(prior) = store.get(test.uid()) {
            test.given(prior);
        }
        output::print_running(&test);
        test.execute(registry)?;
        executed.push(test.uid().to_string());
        store.add(test)?;
    }

    let tests: Vec<Test> = executed
        .iter()
        .filter_map(|uid| store.get(uid).cloned())
        .collect();
    let suite = Suite::from_tests(session_name(store.path()), tests);
    output::print_report(&suite);
    if let Some(format) = show_output {
        let specs: Vec<TestSpec> = suite.tests().iter().map(Test::to_spec).collect();
        let text = spec::encode(codec(format), &specs, store.path())?;
        output::print_document(&text);
    }
    Ok(i32::from(suite.status().is_actionable()))
}

fn show_status(store: &FileStore, uid: Option<&str>) -> Result<i32, RunbookError> {
    let tests: Vec<&Test> = match uid {
        Some(uid) => vec![store.get(uid).ok_or_else(|| RunbookError::UnknownTest {
            uid: uid.to_string(),
        })?],
        None => store.tests().iter().collect(),
    };
    output::print_status(&tests);
    let worst = tests
        .iter()
        .map(|test| test.status())
        .max()
        .unwrap_or(Status::Unknown);
    Ok(i32::from(worst.is_actionable()))
}

fn show_results(
    store: &FileStore,
    uid: Option<&str>,
    format: OutputFormat,
) -> Result<i32, RunbookError> {
    let format = codec(format);
    let text = match uid {
        Some(uid) => {
            let test = store.get(uid).ok_or_else(|| RunbookError::UnknownTest {
                uid: uid.to_string(),
            })?;
            spec::encode(format, &test.to_spec(), store.path())?
        }
        None => {
            let specs: Vec<TestSpec> = store.tests().iter().map(Test::to_spec).collect();
            spec::encode(format, &specs, store.path())?
        }
    };
    output::print_document(&text);
    Ok(0)
}

fn reset(store: &mut FileStore, uid: Option<&str>) -> Result<i32, RunbookError> {
    let uids: Vec<String> = match uid {
        Some(uid) => vec![uid.to_string()],
        None => store.uids(),
    };
    for uid in &uids {
        let test = store.get_mut(uid).ok_or_else(|| RunbookError::UnknownTest {
            uid: uid.to_string(),
        })?;
        test.reset();
        println!("  reset {uid}");
    }
    if let Some(first) = uids.first() {
        store.persist(first)?;
    }
    Ok(0)
}

// ============================================================================
// SCRIPT LOADING
// ============================================================================

/// Files pass through as given; directories are scanned recursively for
/// `.yaml`/`.yml`/`.json` scripts. The combined list is sorted to ensure a
/// deterministic execution order.
fn discover_scripts(roots: &[PathBuf]) -> Result<Vec<PathBuf>, RunbookError> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| RunbookError::io(root, e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if is_script(path) {
                files.push(path.to_path_buf());
            }
        }
    }
    files.sort();
    Ok(files)
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml" || ext == "json")
}

/// Loads one script as a fresh test. A script without a `work_dir` runs in
/// its own directory; a relative `work_dir` is taken relative to it.
fn load_script(path: &Path, registry: &HookRegistry) -> Result<Test, RunbookError> {
    let text = fs::read_to_string(path).map_err(|e| RunbookError::io(path, e))?;
    let mut spec: TestSpec = spec::decode(Format::for_path(path), &text, path)?;
    let script_dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    spec.work_dir = match (spec.work_dir.take(), script_dir) {
        (Some(dir), Some(base)) => Some(base.join(dir).display().to_string()),
        (Some(dir), None) => Some(dir),
        (None, Some(base)) => Some(base.display().to_string()),
        (None, None) => None,
    };
    Test::from_spec(spec, registry)
}

fn session_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("session")
        .to_string()
}

fn codec(format: OutputFormat) -> Format {
    match format {
        OutputFormat::Yaml => Format::Yaml,
        OutputFormat::Json => Format::Json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.yaml"), "name: b").unwrap();
        fs::write(dir.path().join("a.yml"), "name: a").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a script").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.json"), "{}").unwrap();

        let found = discover_scripts(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.yml", "b.yaml", "c.json"]);
    }

    #[test]
    fn scripts_default_their_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.yaml");
        fs::write(
            &path,
            "name: probe\nsteps:\n  - name: s\n    perform: text.echo\n",
        )
        .unwrap();

        let registry = standard_registry();
        let test = load_script(&path, &registry).unwrap();
        let spec = test.to_spec();
        assert_eq!(spec.work_dir.as_deref(), Some(dir.path().to_str().unwrap()));
    }

    #[test]
    fn relative_work_dirs_anchor_at_the_script() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        let path = dir.path().join("probe.yaml");
        fs::write(
            &path,
            "name: probe\nwork_dir: data\nsteps:\n  - name: s\n    perform: text.echo\n",
        )
        .unwrap();

        let registry = standard_registry();
        let test = load_script(&path, &registry).unwrap();
        let spec = test.to_spec();
        assert_eq!(
            spec.work_dir.map(PathBuf::from),
            Some(dir.path().join("data"))
        );
    }
}
