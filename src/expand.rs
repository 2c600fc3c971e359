//! Variable expansion for arguments, variables and assertion operands.
//!
//! Expansion is a single pass over a value:
//!
//! - mappings recurse into their values; every other non-string passes
//!   through unchanged
//! - a string starting with `~` names a file whose content replaces the
//!   string, and expansion continues on that content
//! - `$name` / `?name` tokens substitute from the variable mapping first,
//!   then from the process environment; an absent name is an error
//! - a token spanning the whole string substitutes wholesale, keeping the
//!   variable's type; spliced tokens stringify
//! - finally, a string that names a registered hook is replaced by calling
//!   the hook with no arguments; any failure there is swallowed and the
//!   string stands
//!
//! The last rule lets a spec write `started: time.utcnow` and receive a
//! timestamp without ceremony.

use std::{env, fs};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::RunbookError;
use crate::hooks::{ArgMap, HookRegistry};
use crate::value;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"([$?])(\w+)").unwrap());

/// One expansion context: a variable mapping plus the hook registry for the
/// zero-argument fallback.
pub struct Expander<'a> {
    vars: &'a Map<String, Value>,
    registry: &'a HookRegistry,
}

impl<'a> Expander<'a> {
    pub fn new(vars: &'a Map<String, Value>, registry: &'a HookRegistry) -> Self {
        Self { vars, registry }
    }

    /// Expands one value. Mappings recurse; strings go through the full
    /// pipeline; everything else is returned unchanged.
    pub fn expand(&self, value: &Value) -> Result<Value, RunbookError> {
        match value {
            Value::Object(map) => Ok(Value::Object(self.expand_map(map)?)),
            Value::String(s) => self.expand_str(s),
            other => Ok(other.clone()),
        }
    }

    pub fn expand_map(
        &self,
        map: &Map<String, Value>,
    ) -> Result<Map<String, Value>, RunbookError> {
        let mut out = Map::new();
        for (key, val) in map {
            out.insert(key.clone(), self.expand(val)?);
        }
        Ok(out)
    }

    pub fn expand_str(&self, input: &str) -> Result<Value, RunbookError> {
        match input.strip_prefix('~') {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| RunbookError::io(path, e))?;
                self.expand_tokens(&content)
            }
            None => self.expand_tokens(input),
        }
    }

    fn expand_tokens(&self, text: &str) -> Result<Value, RunbookError> {
        // A token spanning the whole string substitutes wholesale so the
        // variable's type survives.
        if let Some(m) = TOKEN.find(text) {
            if m.start() == 0 && m.end() == text.len() {
                return Ok(match self.lookup(&text[1..])? {
                    Value::String(s) => self.hook_fallback(s),
                    other => other,
                });
            }
        }
        Ok(self.hook_fallback(self.splice(text)?))
    }

    /// Pure token splice: substitutes every token, stringifying values, with
    /// no file inclusion and no hook fallback. Assertion string literals go
    /// through this directly.
    pub fn splice(&self, text: &str) -> Result<String, RunbookError> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in TOKEN.find_iter(text) {
            let value = self.lookup(&m.as_str()[1..])?;
            out.push_str(&text[last..m.start()]);
            out.push_str(&value::to_display(&value));
            last = m.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Variable mapping first, then the process environment.
    pub fn lookup(&self, name: &str) -> Result<Value, RunbookError> {
        if let Some(v) = self.vars.get(name) {
            return Ok(v.clone());
        }
        env::var(name)
            .map(Value::String)
            .map_err(|_| RunbookError::unknown_variable(name))
    }

    fn hook_fallback(&self, text: String) -> Value {
        match self.registry.call(&text, &ArgMap::new()) {
            Some(Ok(value)) => value,
            _ => Value::String(text),
        }
    }
}
