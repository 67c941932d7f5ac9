//! Post-mapping attribute alteration hooks.
//!
//! After the mapper has produced an attribute set, registered hooks get a
//! chance to rewrite or add entries before the set is handed to the
//! identity-provider runtime. This replaces the legacy module's
//! `hook_backdropauth_attributes_alter` extension point.

use std::sync::Arc;

use super::{AttributeSet, RawUserRecord};

/// A hook that may mutate the mapped attribute set.
///
/// Hooks run in registration order and see the mutations of earlier hooks.
pub trait AttributeAlterHook: Send + Sync {
    fn alter(&self, attributes: &mut AttributeSet, record: &RawUserRecord);
}

impl<F> AttributeAlterHook for F
where
    F: Fn(&mut AttributeSet, &RawUserRecord) + Send + Sync,
{
    fn alter(&self, attributes: &mut AttributeSet, record: &RawUserRecord) {
        self(attributes, record)
    }
}

/// Registry of alteration hooks, run in registration order.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn AttributeAlterHook>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hook_count", &self.hooks.len())
            .finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn AttributeAlterHook>) {
        self.hooks.push(hook);
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn run(&self, attributes: &mut AttributeSet, record: &RawUserRecord) {
        for hook in &self.hooks {
            hook.alter(attributes, record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hooks_run_in_registration_order() {
        let mut registry = HookRegistry::new();
        registry.register(Arc::new(
            |attrs: &mut AttributeSet, _record: &RawUserRecord| {
                attrs.insert("marker", vec!["first".into()]);
            },
        ));
        registry.register(Arc::new(
            |attrs: &mut AttributeSet, _record: &RawUserRecord| {
                let seen = attrs.get("marker").map(<[String]>::to_vec).unwrap_or_default();
                assert_eq!(seen, vec!["first".to_string()]);
                attrs.insert("marker", vec!["second".into()]);
            },
        ));

        let mut attrs = AttributeSet::new();
        registry.run(&mut attrs, &RawUserRecord::new());
        assert_eq!(attrs.get("marker"), Some(&["second".to_string()][..]));
    }
}
