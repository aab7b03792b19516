//! Named store of validated locomotor templates.
//!
//! Each name maps to a version stack: the base definition at the bottom and
//! any number of live-tuning overrides above it. `resolve` always returns the
//! top of the stack, and `reset` drops every override so a new match starts
//! from authored data. Templates are shared as `Arc` so live locomotors keep
//! a consistent view even across a reset.

use std::collections::BTreeMap;
use std::sync::Arc;

use bevy::prelude::*;

use crate::template::{LocomotorTemplate, TemplateError};

#[derive(Resource, Default)]
pub struct TemplateRegistry {
    stacks: BTreeMap<String, TemplateStack>,
}

struct TemplateStack {
    /// `true` when layer 0 is an authored base (survives `reset`).
    has_base: bool,
    layers: Vec<Arc<LocomotorTemplate>>,
}

impl TemplateRegistry {
    /// Validate and install `template` as the base definition for its name,
    /// replacing any existing stack.
    pub fn register_base(&mut self, mut template: LocomotorTemplate) -> Result<(), TemplateError> {
        template.validate()?;
        let name = template.name.clone();
        self.stacks.insert(
            name,
            TemplateStack {
                has_base: true,
                layers: vec![Arc::new(template)],
            },
        );
        Ok(())
    }

    /// Push an override for `name`: a copy of the current top, mutated by
    /// `tune`, then re-validated. Creates a pure-override stack when the name
    /// is unknown (dropped again by `reset`).
    pub fn register_override(
        &mut self,
        name: &str,
        tune: impl FnOnce(&mut LocomotorTemplate) -> Result<(), TemplateError>,
    ) -> Result<(), TemplateError> {
        let stack = self.stacks.entry(name.to_string()).or_insert_with(|| {
            warn!("TemplateRegistry: override for unknown locomotor '{name}'");
            TemplateStack {
                has_base: false,
                layers: vec![Arc::new(LocomotorTemplate::named(name))],
            }
        });
        let mut copy = (**stack.layers.last().expect("stack never empty")).clone();
        tune(&mut copy)?;
        copy.validate()?;
        if stack.has_base || stack.layers.len() > 1 {
            stack.layers.push(Arc::new(copy));
        } else {
            // Pure-override stack: the placeholder bottom layer is replaced.
            stack.layers[0] = Arc::new(copy);
        }
        Ok(())
    }

    /// Current effective template for `name` (top of the version stack).
    pub fn resolve(&self, name: &str) -> Option<Arc<LocomotorTemplate>> {
        self.stacks
            .get(name)
            .map(|s| Arc::clone(s.layers.last().expect("stack never empty")))
    }

    /// Drop all overrides: stacks with a base truncate to it, pure-override
    /// stacks disappear entirely.
    pub fn reset(&mut self) {
        self.stacks.retain(|_, stack| {
            if stack.has_base {
                stack.layers.truncate(1);
                true
            } else {
                false
            }
        });
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stacks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}
