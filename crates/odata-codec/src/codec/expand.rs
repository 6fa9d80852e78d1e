//! Expansion walk shared by the serializers.
//!
//! Each branch of an `$expand` walk carries the ids of the entities already
//! expanded on the path from the root. Meeting one of them again yields a
//! reference instead of a second expansion; entities without an id are
//! bounded by [`MAX_EXPAND_DEPTH`].

use std::borrow::Cow;

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::context::NavigationResolver;
use crate::limits::MAX_EXPAND_DEPTH;
use crate::model::{Entity, Inline, Link};

/// Identities visited on the current expansion branch.
#[derive(Debug, Clone, Default)]
pub struct ExpandGuard {
    visited: FxHashSet<String>,
    depth: usize,
}

/// What to do with an expansion target.
#[derive(Debug)]
pub enum Visit {
    /// Expand the target with the given guard for its own branch.
    Expand(ExpandGuard),
    /// Already expanded on this branch: write a reference to this id.
    Reference(String),
    /// Too deep and no id to recognize a revisit: stop expanding.
    Truncate,
}

impl ExpandGuard {
    /// Guard for a top-level entity (which counts as visited).
    pub fn root(entity: &Entity) -> Self {
        let mut guard = Self::default();
        if let Some(id) = &entity.id {
            guard.visited.insert(id.clone());
        }
        guard
    }

    /// Guard for the members of a top-level collection.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn enter(&self, target: &Entity) -> Visit {
        if let Some(id) = &target.id {
            if self.visited.contains(id) {
                trace!(id = %id, "expansion revisits entity, writing reference");
                return Visit::Reference(id.clone());
            }
        }
        if self.depth >= MAX_EXPAND_DEPTH {
            trace!(depth = self.depth, "expansion depth limit reached");
            return Visit::Truncate;
        }
        let mut visited = self.visited.clone();
        if let Some(id) = &target.id {
            visited.insert(id.clone());
        }
        Visit::Expand(ExpandGuard {
            visited,
            depth: self.depth + 1,
        })
    }
}

/// The inline payload for `navigation`: the link's own inline content, or
/// whatever the resolver supplies.
pub fn expansion_target<'e>(
    entity: &'e Entity,
    link: Option<&'e Link>,
    navigation: &str,
    resolver: Option<&dyn NavigationResolver>,
) -> Option<Cow<'e, Inline>> {
    if let Some(inline) = link.and_then(|l| l.inline.as_ref()) {
        return Some(Cow::Borrowed(inline));
    }
    resolver
        .and_then(|r| r.resolve(entity, navigation))
        .map(Cow::Owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityBuilder;

    #[test]
    fn test_revisit_on_branch_is_reference() {
        let a = EntityBuilder::new().id("A").build();
        let b = EntityBuilder::new().id("B").build();

        let root = ExpandGuard::root(&a);
        let Visit::Expand(at_b) = root.enter(&b) else {
            panic!("expected expansion of B");
        };
        assert!(matches!(at_b.enter(&a), Visit::Reference(id) if id == "A"));
        assert!(matches!(at_b.enter(&b), Visit::Reference(id) if id == "B"));
        // Siblings do not share visits.
        assert!(matches!(root.enter(&b), Visit::Expand(_)));
    }

    #[test]
    fn test_anonymous_entities_are_depth_bounded() {
        let anon = Entity::new();
        let mut guard = ExpandGuard::empty();
        let mut steps = 0;
        while let Visit::Expand(next) = guard.enter(&anon) {
            guard = next;
            steps += 1;
        }
        assert_eq!(steps, MAX_EXPAND_DEPTH);
    }
}
