//! # Hook System
//!
//! Hooks are the work units steps invoke: named callables taking a mapping
//! of expanded arguments and returning a value (or an error). Scripts refer
//! to hooks purely by identifier, so every identifier a script uses must be
//! registered before it loads; resolution failures are reported at load
//! time, naming the step.
//!
//! ## Module Structure
//!
//! - **`std`**: the standard hook library (`shell.run`, `file.read`, ...)
//!
//! Embedding applications register their own hooks next to the standard
//! ones; identifiers are plain strings and dots carry no semantics beyond
//! convention.

use ::std::sync::Arc;

use im::HashMap;
use serde_json::Value;

use crate::errors::HookError;

/// Argument mapping passed to hooks, after variable expansion.
pub type ArgMap = serde_json::Map<String, Value>;

/// Hook function signature. Hooks never see unexpanded tokens.
pub type HookFn = dyn Fn(&ArgMap) -> Result<Value, HookError> + Send + Sync;

/// A registered hook, shareable across tests.
pub type Hook = Arc<HookFn>;

// ============================================================================
// REGISTRY
// ============================================================================

/// Registry of all known hooks, inspectable at runtime.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<String, Hook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hook` under `id`. Re-registering an id replaces the
    /// previous hook.
    pub fn register(
        &mut self,
        id: &str,
        hook: impl Fn(&ArgMap) -> Result<Value, HookError> + Send + Sync + 'static,
    ) {
        self.hooks.insert(id.to_string(), Arc::new(hook));
    }

    pub fn get(&self, id: &str) -> Option<&Hook> {
        self.hooks.get(id)
    }

    /// Invokes the hook registered under `id`; `None` when no such hook.
    pub fn call(&self, id: &str, args: &ArgMap) -> Option<Result<Value, HookError>> {
        self.hooks.get(id).map(|hook| hook.as_ref()(args))
    }

    pub fn has(&self, id: &str) -> bool {
        self.hooks.contains_key(id)
    }

    /// All registered identifiers, sorted for stable listings.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hooks.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

pub mod std;

/// Builds a registry preloaded with the standard hook library.
pub fn standard_registry() -> HookRegistry {
    let mut registry = HookRegistry::new();
    std::register_std_hooks(&mut registry);
    registry
}
