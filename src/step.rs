//! # Step Execution
//!
//! A step is the unit of work inside a test: one hook invocation with
//! expanded arguments, checked by assertions, recorded as a [`Run`].
//!
//! ## Decision gate
//!
//! `execute` consults the last recorded run before touching the hook:
//!
//! - no prior run: invoke
//! - prior run succeeded and `always` is off: skip
//! - prior run failed and `ignore` or `noretry` is set: skip
//! - anything else: invoke again
//!
//! A skip still appends a run (marked `skipped`), so the history shows every
//! pass over the test, not only the ones that did work.
//!
//! ## Outcome classification
//!
//! A false assertion records its one-line failure message. Any other error
//! (argument expansion, the hook itself, assertion evaluation) records the
//! full cause chain. Both leave the run `failed`; the derived step status
//! then folds in the `ignore`/`noretry` flags.

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::assertion::Assertion;
use crate::errors::RunbookError;
use crate::expand::Expander;
use crate::hooks::{ArgMap, HookRegistry};
use crate::run::{Run, Status};
use crate::spec::StepSpec;

/// One named unit of work: a hook, its arguments, its assertions, and the
/// append-only history of every attempt so far.
#[derive(Debug, Clone)]
pub struct Step {
    index: usize,
    name: String,
    perform: String,
    args: ArgMap,
    assertions: Vec<Assertion>,
    proceed: bool,
    always: bool,
    ignore: bool,
    noretry: bool,
    runs: Vec<Run>,
}

impl Step {
    /// Builds a step from its declarative form, validating that the hook is
    /// registered and every assertion compiles. Any stored `status` field is
    /// ignored; the run history is the single source of truth.
    pub fn from_spec(
        index: usize,
        spec: StepSpec,
        registry: &HookRegistry,
    ) -> Result<Self, RunbookError> {
        if spec.name.is_empty() {
            return Err(RunbookError::spec(format!("step {index} has no name")));
        }
        if spec.perform.is_empty() {
            return Err(RunbookError::spec(format!(
                "step '{}' names no hook to perform",
                spec.name
            )));
        }
        if !registry.has(&spec.perform) {
            return Err(RunbookError::unknown_hook(&spec.name, &spec.perform));
        }
        let assertions = spec
            .asserts
            .map(|a| a.into_specs())
            .unwrap_or_default()
            .iter()
            .map(|s| Assertion::new(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            index,
            name: spec.name,
            perform: spec.perform,
            args: spec.with,
            assertions,
            proceed: spec.proceed,
            always: spec.always,
            ignore: spec.ignore,
            noretry: spec.noretry,
            runs: spec.runs,
        })
    }

    /// The declarative form, including the derived status and full history.
    pub fn to_spec(&self) -> StepSpec {
        StepSpec {
            name: self.name.clone(),
            perform: self.perform.clone(),
            with: self.args.clone(),
            asserts: crate::spec::AssertSpec::from_specs(
                self.assertions.iter().map(|a| a.spec().to_string()).collect(),
            ),
            proceed: self.proceed,
            always: self.always,
            ignore: self.ignore,
            noretry: self.noretry,
            status: Some(self.status()),
            runs: self.runs.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // EXECUTION
    // ------------------------------------------------------------------------

    /// Runs the decision gate and appends exactly one [`Run`]. Never fails:
    /// every problem is classified and recorded in the run itself.
    pub fn execute(&mut self, vars: &ArgMap, registry: &HookRegistry) {
        let run = match self.runs.last() {
            Some(last) if self.gate_skips(last.status) => {
                debug!(step = %self.name, prior = %last.status, "skipping execution");
                Run::skip(last)
            }
            _ => self.attempt(vars, registry),
        };
        debug!(step = %self.name, status = %run.status, skipped = run.skipped, "run recorded");
        self.runs.push(run);
    }

    fn gate_skips(&self, prior: Status) -> bool {
        match prior {
            Status::Success => !self.always,
            Status::Failed => self.ignore || self.noretry,
            _ => false,
        }
    }

    fn attempt(&self, vars: &ArgMap, registry: &HookRegistry) -> Run {
        let start = Utc::now();
        match self.invoke(vars, registry) {
            Ok(output) => Run::success(output, start),
            Err(err) if err.is_assertion_failure() => Run::failure(err.to_string(), start),
            Err(err) => Run::failure(err.trace(), start),
        }
    }

    fn invoke(&self, vars: &ArgMap, registry: &HookRegistry) -> Result<Value, RunbookError> {
        let expander = Expander::new(vars, registry);
        let args = expander.expand_map(&self.args)?;
        let output = registry
            .call(&self.perform, &args)
            .ok_or_else(|| RunbookError::unknown_hook(&self.name, &self.perform))?
            .map_err(|source| RunbookError::Hook {
                hook: self.perform.clone(),
                source,
            })?;
        for assertion in &self.assertions {
            assertion.check(&output, &expander)?;
        }
        Ok(output)
    }

    // ------------------------------------------------------------------------
    // DERIVED STATE
    // ------------------------------------------------------------------------

    /// Status derived from the latest run and the step's flags. With no
    /// history the step is `unknown`; a failed run reads as `ignored`,
    /// `failed` or `pending` depending on `ignore`/`noretry`.
    pub fn status(&self) -> Status {
        match self.runs.last() {
            None => Status::Unknown,
            Some(run) => match run.status {
                Status::Failed if self.ignore => Status::Ignored,
                Status::Failed if self.noretry => Status::Failed,
                Status::Failed => Status::Pending,
                status => status,
            },
        }
    }

    /// True when the latest run failed and the step does not allow the test
    /// to continue past it.
    pub fn abort(&self) -> bool {
        matches!(self.runs.last(), Some(run) if run.status == Status::Failed) && !self.proceed
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn perform(&self) -> &str {
        &self.perform
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn last(&self) -> Option<&Run> {
        self.runs.last()
    }

    /// Clears the run history, returning the step to `unknown`.
    pub fn reset(&mut self) {
        self.runs.clear();
    }

    /// Adopts the run history of a same-named prior incarnation of this
    /// step. Renamed steps start over from scratch.
    pub(crate) fn seed_from(&mut self, prior: &Step) {
        if self.name == prior.name {
            self.runs = prior.runs.clone();
        }
    }
}
