//! Standard hook library.
//!
//! A small set of general-purpose hooks registered by the CLI (and available
//! to embedders via [`register_std_hooks`]). Identifiers follow the
//! `area.verb` convention.

use std::{env, fs, process::Command};

use chrono::Utc;
use serde_json::{json, Value};

use crate::errors::HookError;
use crate::value;

use super::{ArgMap, HookRegistry};

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

fn required_str<'a>(args: &'a ArgMap, key: &str, hook: &str) -> Result<&'a str, HookError> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!(
            "{hook}: argument '{key}' must be a string, got {}",
            value::type_name(other)
        )
        .into()),
        None => Err(format!("{hook}: missing argument '{key}'").into()),
    }
}

// ============================================================================
// HOOKS
// ============================================================================

/// Returns the `text` argument unchanged.
///
/// Usage: `perform: text.echo` with `{ text: <value> }`
/// Returns: `<value>`
fn echo(args: &ArgMap) -> Result<Value, HookError> {
    args.get("text")
        .cloned()
        .ok_or_else(|| "text.echo: missing argument 'text'".into())
}

/// Reads an environment variable.
///
/// Usage: `perform: env.get` with `{ name: "HOME", default: <value> }`
/// Returns: the variable's value, or `default` when unset (an error when
/// unset and no default was given).
fn env_get(args: &ArgMap) -> Result<Value, HookError> {
    let name = required_str(args, "name", "env.get")?;
    match env::var(name) {
        Ok(v) => Ok(Value::String(v)),
        Err(_) => args
            .get("default")
            .cloned()
            .ok_or_else(|| format!("env.get: '{name}' is unset and no default was given").into()),
    }
}

/// Reads a file as UTF-8 text. Relative paths resolve against the current
/// working directory, so `work_dir` scoping applies.
///
/// Usage: `perform: file.read` with `{ path: "notes.txt" }`
/// Returns: the file content as a string.
fn file_read(args: &ArgMap) -> Result<Value, HookError> {
    let path = required_str(args, "path", "file.read")?;
    let content =
        fs::read_to_string(path).map_err(|e| format!("file.read: cannot read '{path}': {e}"))?;
    Ok(Value::String(content))
}

/// Usage: `perform: file.exists` with `{ path: "notes.txt" }`
/// Returns: `true` when the path exists.
fn file_exists(args: &ArgMap) -> Result<Value, HookError> {
    let path = required_str(args, "path", "file.exists")?;
    Ok(Value::Bool(std::path::Path::new(path).exists()))
}

/// Runs a command line through the system shell.
///
/// Usage: `perform: shell.run` with `{ command: "echo hello" }`
/// Returns: `{ code, stdout, stderr, success }`; stdout and stderr have
/// trailing whitespace trimmed.
///
/// Example assertion: `result.success == true and 'hello' in result.stdout`
fn shell_run(args: &ArgMap) -> Result<Value, HookError> {
    let command = required_str(args, "command", "shell.run")?;
    #[cfg(not(windows))]
    let output = Command::new("sh").arg("-c").arg(command).output()?;
    #[cfg(windows)]
    let output = Command::new("cmd").arg("/C").arg(command).output()?;
    Ok(json!({
        "code": output.status.code().unwrap_or(-1),
        "stdout": String::from_utf8_lossy(&output.stdout).trim_end(),
        "stderr": String::from_utf8_lossy(&output.stderr).trim_end(),
        "success": output.status.success(),
    }))
}

/// Current UTC time, RFC 3339. Takes no arguments, which also makes it
/// usable through the expander's zero-argument fallback.
///
/// Usage: `perform: time.utcnow`, or `started: time.utcnow` inside `with:`
/// Returns: a timestamp string.
fn utcnow(_args: &ArgMap) -> Result<Value, HookError> {
    Ok(Value::String(Utc::now().to_rfc3339()))
}

/// Usage: `perform: random.value`
/// Returns: a float in `[0, 1)`.
fn random_value(_args: &ArgMap) -> Result<Value, HookError> {
    let x: f64 = rand::random();
    Ok(serde_json::Number::from_f64(x)
        .map(Value::Number)
        .unwrap_or(Value::Null))
}

/// Registers the whole standard library with `registry`.
pub fn register_std_hooks(registry: &mut HookRegistry) {
    registry.register("text.echo", echo);
    registry.register("env.get", env_get);
    registry.register("file.read", file_read);
    registry.register("file.exists", file_exists);
    registry.register("shell.run", shell_run);
    registry.register("time.utcnow", utcnow);
    registry.register("random.value", random_value);
}
