use crate::{registry::TypeRegistry, validator::ValidatorChain};

/// The registry and hook chain a construction or conversion runs against.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub registry:   &'a TypeRegistry,
    pub validators: &'a ValidatorChain,
}

impl<'a> Context<'a> {
    pub fn new(registry: &'a TypeRegistry, validators: &'a ValidatorChain) -> Self {
        Context { registry, validators }
    }
}

impl Context<'static> {
    /// The process-wide registry and hook chain.
    pub fn global() -> Self {
        Context {
            registry:   TypeRegistry::global(),
            validators: ValidatorChain::global(),
        }
    }
}
