//! Construction hooks keyed by type name or capability name.
//!
//! At most one pair of hooks is registered per key; registering again
//! replaces the previous pair. When an instance is constructed the hooks of
//! its exact type win, then those of its capabilities in declared order.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use lazy_static::lazy_static;
use tracing::debug;

use crate::{
    error::{HookPhase, ModelError},
    instance::Instance,
    registry::RegisteredType,
    value::Value,
};

lazy_static! {
    static ref GLOBAL_VALIDATORS: ValidatorChain = ValidatorChain::new();
}

/// Runs before any field is assigned, with the raw constructor arguments
/// (inherited values first, then own values).
pub type PreHook = Arc<dyn Fn(&[Value]) -> Result<(), String> + Send + Sync>;

/// Runs once the instance is fully populated.
pub type PostHook = Arc<dyn Fn(&mut Instance) -> Result<(), String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Hooks {
    pub pre:  Option<PreHook>,
    pub post: Option<PostHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Hooks::default()
    }

    pub fn pre<F>(mut self, hook: F) -> Self
    where
        F: Fn(&[Value]) -> Result<(), String> + Send + Sync + 'static,
    {
        self.pre = Some(Arc::new(hook));
        self
    }

    pub fn post<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Instance) -> Result<(), String> + Send + Sync + 'static,
    {
        self.post = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre", &self.pre.is_some())
            .field("post", &self.post.is_some())
            .finish()
    }
}

/// Object form of a hook pair.
pub trait Validator: Send + Sync + 'static {
    /// The type or capability name this validator is registered under.
    fn validates(&self) -> &str;

    fn pre_construct(&self, _args: &[Value]) -> Result<(), String> {
        Ok(())
    }

    fn post_construct(&self, _instance: &mut Instance) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct ValidatorChain {
    hooks:   RwLock<HashMap<String, Hooks>>,
    enabled: AtomicBool,
}

impl Default for ValidatorChain {
    fn default() -> Self {
        ValidatorChain {
            hooks:   RwLock::new(HashMap::new()),
            enabled: AtomicBool::new(true),
        }
    }
}

impl ValidatorChain {
    pub fn new() -> Self {
        ValidatorChain::default()
    }

    pub fn global() -> &'static ValidatorChain {
        &GLOBAL_VALIDATORS
    }

    /// Registers `hooks` under `key`, replacing any earlier registration.
    pub fn register(&self, key: impl Into<String>, hooks: Hooks) {
        let key = key.into();
        debug!(key = %key, pre = hooks.pre.is_some(), post = hooks.post.is_some(), "registered hooks");
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, hooks);
    }

    pub fn register_validator<V: Validator>(&self, validator: V) {
        let validator = Arc::new(validator);
        let key = validator.validates().to_string();
        let pre = validator.clone();
        let post = validator;
        self.register(
            key,
            Hooks::new()
                .pre(move |args| pre.pre_construct(args))
                .post(move |instance| post.post_construct(instance)),
        );
    }

    pub fn unregister(&self, key: &str) -> bool {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    /// The hooks that apply to `ty`: its own, else those of the first
    /// capability that has any.
    pub fn resolve_for(&self, ty: &RegisteredType) -> Option<Hooks> {
        let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner);
        std::iter::once(ty.name())
            .chain(ty.capabilities().iter().map(String::as_str))
            .find_map(|key| hooks.get(key).cloned())
    }

    /// Turns hook execution on or off for every construction path.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.hooks.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    // The lock is released before a hook runs, so hooks may register hooks.
    fn resolve_enabled(&self, ty: &RegisteredType) -> Option<Hooks> {
        if self.is_enabled() {
            self.resolve_for(ty)
        } else {
            None
        }
    }

    pub(crate) fn run_pre(&self, ty: &RegisteredType, args: &[Value]) -> Result<(), ModelError> {
        if let Some(pre) = self.resolve_enabled(ty).and_then(|h| h.pre) {
            pre(args).map_err(|message| ModelError::Hook {
                type_name: ty.name().to_string(),
                phase: HookPhase::PreConstruct,
                message,
            })?;
        }
        Ok(())
    }

    pub(crate) fn run_post(&self, ty: &RegisteredType, instance: &mut Instance) -> Result<(), ModelError> {
        if let Some(post) = self.resolve_enabled(ty).and_then(|h| h.post) {
            post(instance).map_err(|message| ModelError::Hook {
                type_name: ty.name().to_string(),
                phase: HookPhase::PostConstruct,
                message,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use elementum_schema::TypeDescriptor;

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry
            .register_all(vec![
                TypeDescriptor::record("Shape").capability("Drawable"),
                TypeDescriptor::record("Circle").base("Shape").capability("HasArea"),
            ])
            .unwrap();
        registry
    }

    fn tagged(tag: &'static str) -> Hooks {
        Hooks::new().pre(move |_| Err(tag.to_string()))
    }

    fn resolved_tag(chain: &ValidatorChain, ty: &RegisteredType) -> Option<String> {
        let pre = chain.resolve_for(ty)?.pre?;
        pre(&[]).err()
    }

    #[test]
    fn exact_type_beats_capabilities() {
        let registry = registry();
        let circle = registry.get("Circle").unwrap();
        let chain = ValidatorChain::new();

        assert!(chain.resolve_for(&circle).is_none());
        chain.register("Drawable", tagged("drawable"));
        assert_eq!(resolved_tag(&chain, &circle).as_deref(), Some("drawable"));
        chain.register("HasArea", tagged("area"));
        assert_eq!(resolved_tag(&chain, &circle).as_deref(), Some("area"));
        chain.register("Circle", tagged("circle"));
        assert_eq!(resolved_tag(&chain, &circle).as_deref(), Some("circle"));
    }

    #[test]
    fn last_registration_wins() {
        let registry = registry();
        let shape = registry.get("Shape").unwrap();
        let chain = ValidatorChain::new();
        chain.register("Shape", tagged("first"));
        chain.register("Shape", tagged("second"));
        assert_eq!(resolved_tag(&chain, &shape).as_deref(), Some("second"));
        assert!(chain.unregister("Shape"));
        assert!(chain.resolve_for(&shape).is_none());
    }

    #[test]
    fn disabled_chain_runs_nothing() {
        let registry = registry();
        let shape = registry.get("Shape").unwrap();
        let chain = ValidatorChain::new();
        chain.register("Shape", tagged("boom"));

        let err = chain.run_pre(&shape, &[]).unwrap_err();
        assert!(matches!(err, ModelError::Hook { phase: HookPhase::PreConstruct, .. }));

        chain.set_enabled(false);
        chain.run_pre(&shape, &[]).unwrap();
    }

    struct RejectEverything;

    impl Validator for RejectEverything {
        fn validates(&self) -> &str {
            "Drawable"
        }

        fn pre_construct(&self, args: &[Value]) -> Result<(), String> {
            Err(format!("{} arguments rejected", args.len()))
        }
    }

    #[test]
    fn validator_objects_register_by_key() {
        let registry = registry();
        let shape = registry.get("Shape").unwrap();
        let chain = ValidatorChain::new();
        chain.register_validator(RejectEverything);
        assert_eq!(resolved_tag(&chain, &shape).as_deref(), Some("0 arguments rejected"));
    }
}
