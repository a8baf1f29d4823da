// src/core/registry.rs

use crate::core::namespace::{Namespace, Target};

/// The targets of one loaded script, ordered by name.
///
/// Built fresh on every process start by scanning a [`Namespace`]; nothing is
/// cached between runs.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: Vec<Target>,
}

impl TargetRegistry {
    /// Collects every target binding of `namespace`, including the ones that
    /// were brought in through includes. An empty result is valid.
    pub fn discover(namespace: &Namespace) -> Self {
        let targets: Vec<Target> = namespace.targets().cloned().collect();
        log::debug!(
            "Discovered {} target(s): {:?}",
            targets.len(),
            targets.iter().map(Target::name).collect::<Vec<_>>()
        );
        Self { targets }
    }

    pub fn resolve(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(Target::name)
    }

    /// Target names to offer for tab completion: every target that is not
    /// also a name of the engine's own namespace. Scripts that import the
    /// engine wholesale would otherwise leak its helpers into the list.
    pub fn completion_candidates<'a>(
        &'a self,
        engine: &'a Namespace,
    ) -> impl Iterator<Item = &'a str> {
        self.names().filter(move |name| !engine.contains(name))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
