//! Unified error type for every failure mode in the crate.
//!
//! All fallible operations return [`RunbookError`]. Each variant maps to one
//! [`ErrorCategory`], and the category decides how a failure is reported
//! inside a run record: assertion failures keep the original one-line
//! message, everything else is rendered with its full cause chain via
//! [`RunbookError::trace`].
//!
//! Assertion syntax errors carry the spec text and a span so `miette`
//! renders a labelled snippet pointing at the offending token.

use std::path::PathBuf;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode, SourceSpan};
use thiserror::Error;

/// Boxed error type produced by hook callables.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Coarse classification used by the step executor to pick a report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed script or unresolvable reference; surfaces at load.
    Config,
    /// An assertion evaluated to false.
    Assertion,
    /// A hook or assertion evaluation broke at run time.
    Execution,
    /// Filesystem or serialization failure.
    Io,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Config => "config",
            ErrorCategory::Assertion => "assertion",
            ErrorCategory::Execution => "execution",
            ErrorCategory::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// Unified error for loading, expanding, executing and persisting tests.
#[derive(Debug, Error)]
pub enum RunbookError {
    /// A script shape problem: missing fields, bad flags, empty names.
    #[error("invalid script: {message}")]
    Spec { message: String },

    /// A step names a hook identifier nobody registered.
    #[error("step '{step}' performs unregistered hook '{hook}'")]
    UnknownHook { step: String, hook: String },

    /// A `$name`/`?name` token resolved neither in the variable mapping nor
    /// in the process environment.
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    /// An assertion spec failed to compile.
    #[error("invalid assertion: {message}")]
    AssertionSyntax {
        message: String,
        src: NamedSource<String>,
        span: SourceSpan,
    },

    /// An assertion compiled and evaluated, and came out false.
    #[error("'{spec}' failed for result={result}")]
    AssertionFailed { spec: String, result: String },

    /// An assertion blew up mid-evaluation: unknown name, bad index, type
    /// mismatch. Distinct from [`RunbookError::AssertionFailed`].
    #[error("cannot evaluate '{spec}': {message}")]
    AssertionEval { spec: String, message: String },

    /// A hook callable returned an error.
    #[error("hook '{hook}' failed")]
    Hook {
        hook: String,
        #[source]
        source: HookError,
    },

    /// A store was asked for a uid it does not contain.
    #[error("unknown test '{uid}'")]
    UnknownTest { uid: String },

    #[error("cannot access '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode '{path}'")]
    Decode {
        path: PathBuf,
        #[source]
        source: HookError,
    },

    #[error("cannot encode state for '{path}'")]
    Encode {
        path: PathBuf,
        #[source]
        source: HookError,
    },
}

impl RunbookError {
    pub fn spec(message: impl Into<String>) -> Self {
        RunbookError::Spec {
            message: message.into(),
        }
    }

    pub fn unknown_hook(step: impl Into<String>, hook: impl Into<String>) -> Self {
        RunbookError::UnknownHook {
            step: step.into(),
            hook: hook.into(),
        }
    }

    pub fn unknown_variable(name: impl Into<String>) -> Self {
        RunbookError::UnknownVariable { name: name.into() }
    }

    /// Builds a syntax error labelling `span` inside the assertion text.
    pub fn assertion_syntax(
        spec: &str,
        message: impl Into<String>,
        span: impl Into<SourceSpan>,
    ) -> Self {
        RunbookError::AssertionSyntax {
            message: message.into(),
            src: NamedSource::new("assertion", spec.to_string()),
            span: span.into(),
        }
    }

    pub fn assertion_eval(spec: impl Into<String>, message: impl Into<String>) -> Self {
        RunbookError::AssertionEval {
            spec: spec.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RunbookError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RunbookError::Spec { .. }
            | RunbookError::UnknownHook { .. }
            | RunbookError::UnknownVariable { .. }
            | RunbookError::AssertionSyntax { .. }
            | RunbookError::UnknownTest { .. } => ErrorCategory::Config,
            RunbookError::AssertionFailed { .. } => ErrorCategory::Assertion,
            RunbookError::AssertionEval { .. } | RunbookError::Hook { .. } => {
                ErrorCategory::Execution
            }
            RunbookError::Io { .. } | RunbookError::Decode { .. } | RunbookError::Encode { .. } => {
                ErrorCategory::Io
            }
        }
    }

    /// True only for a false assertion, the one failure reported without a
    /// cause chain.
    pub fn is_assertion_failure(&self) -> bool {
        self.category() == ErrorCategory::Assertion
    }

    /// Renders the error with its whole cause chain, one cause per line.
    /// This is the `info` format for unexpected step failures.
    pub fn trace(&self) -> String {
        let mut out = format!("{} error: {}", self.category(), self);
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            out.push_str("\n  caused by: ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }
}

impl Diagnostic for RunbookError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        None
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            RunbookError::UnknownHook { .. } => Some(Box::new(
                "register the hook before loading specs; `runbook hooks` lists known identifiers",
            )),
            RunbookError::AssertionSyntax { .. } => Some(Box::new(
                "assertions support comparisons, and/or/not, in, and all(..)/any(..) quantifiers",
            )),
            RunbookError::UnknownVariable { .. } => Some(Box::new(
                "tokens resolve against the test's variables, then the process environment",
            )),
            _ => None,
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        match self {
            RunbookError::AssertionSyntax { src, .. } => Some(src),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            RunbookError::AssertionSyntax { message, span, .. } => {
                let label = LabeledSpan::new_with_span(Some(message.clone()), *span);
                Some(Box::new(std::iter::once(label)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_failure_message_keeps_the_original_spec() {
        let err = RunbookError::AssertionFailed {
            spec: "result == False".to_string(),
            result: "true".to_string(),
        };
        assert_eq!(err.to_string(), "'result == False' failed for result=true");
        assert!(err.is_assertion_failure());
    }

    #[test]
    fn categories_split_load_time_from_run_time() {
        assert_eq!(
            RunbookError::spec("steps missing").category(),
            ErrorCategory::Config
        );
        assert_eq!(
            RunbookError::unknown_hook("greet", "nope.nope").category(),
            ErrorCategory::Config
        );
        assert_eq!(
            RunbookError::assertion_eval("result < 3", "cannot order string and number").category(),
            ErrorCategory::Execution
        );
        assert_eq!(
            RunbookError::io("state.yaml", std::io::Error::new(std::io::ErrorKind::Other, "boom"))
                .category(),
            ErrorCategory::Io
        );
    }

    #[test]
    fn trace_renders_the_cause_chain() {
        let cause: HookError = "connection refused".into();
        let err = RunbookError::Hook {
            hook: "shell.run".to_string(),
            source: cause,
        };
        let trace = err.trace();
        assert!(trace.starts_with("execution error: hook 'shell.run' failed"));
        assert!(trace.contains("caused by: connection refused"));
    }

    #[test]
    fn syntax_errors_render_a_labelled_snippet() {
        let err =
            RunbookError::assertion_syntax("result === 5", "unexpected token", (7usize, 3usize));
        let report = miette::Report::new(err);
        let rendered = format!("{report:?}");
        assert!(rendered.contains("unexpected token"));
    }
}
