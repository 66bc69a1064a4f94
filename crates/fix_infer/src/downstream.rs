// ==============================================================================
// Downstream Impact Cache
// ==============================================================================
//
// Modules that depend on the target can only observe return-type changes of
// its public, non-primitive methods. Each such method that has a downstream
// caller is measured once per run, and trees are bounded from those
// single-fix impacts:
//
//   effect(f, T)  = triggered downstream errors of f that T does not resolve
//   upper(T)      = sum of effect(f, T) over the tree
//   lower(T)      = max of effect(f, T) over the tree, 0 when empty
//
// Errors triggered by several fixes are counted once per fix.

use fix_model::{Change, Fix, Impact, Location};
use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::InferError;
use crate::graph::{ConflictGraph, Node};
use crate::workspace::{Scope, Workspace};

pub const DOWNSTREAM_REASON: &str = "DOWNSTREAM";

#[derive(Debug, Default)]
pub struct DownstreamImpactCache {
    store: FxHashMap<Location, Impact>,
}

impl DownstreamImpactCache {
    /// A cache that knows no downstream effects.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_impacts(impacts: impl IntoIterator<Item = Impact>) -> Self {
        let mut cache = Self::default();
        for impact in impacts {
            cache.merge(impact);
        }
        cache
    }

    /// Measure every public non-primitive method of the target that some
    /// downstream module calls.
    pub fn analyze(workspace: &mut Workspace, optimized: bool) -> Result<Self, InferError> {
        let mut cache = Self::default();
        if workspace.downstream_modules().is_empty() {
            return Ok(cache);
        }
        workspace.prepare_downstream()?;

        for idx in 0..workspace.downstream_modules().len() {
            let mut graph = ConflictGraph::new(optimized);
            let module = &workspace.downstream_modules()[idx];
            for method in workspace.target().methods().public_non_primitive_methods() {
                let regions: FxHashSet<_> = module
                    .callers_of(&method.class, &method.signature)
                    .cloned()
                    .collect();
                if regions.is_empty() {
                    continue;
                }
                let location = Location::method(method.class.clone(), method.signature.clone())
                    .with_path(method.path.clone());
                let fix = Fix::new(
                    Change::add(location, workspace.annotation()),
                    DOWNSTREAM_REASON,
                    true,
                );
                graph.add_node(Node::new(fix, FxHashSet::default(), regions, None));
            }
            if graph.is_empty() {
                continue;
            }

            log::info!(
                "measuring {} methods against downstream module {}",
                graph.len(),
                module.name()
            );
            workspace.measure(&mut graph, Scope::Downstream(idx))?;
            for (_, node) in graph.nodes() {
                let mut impact = Impact::new(node.root.clone(), node.regions.clone());
                impact.triggered_errors = node.triggered_errors.clone();
                impact.resolved_errors = node.resolved_errors.clone();
                impact.triggered_fixes = node.triggered_fixes.clone();
                cache.merge(impact);
            }
        }
        Ok(cache)
    }

    /// Fold in the impact of a fix on one more downstream module.
    fn merge(&mut self, impact: Impact) {
        match self.store.get_mut(impact.location()) {
            Some(known) => {
                known.triggered_errors.extend(impact.triggered_errors);
                known.resolved_errors.extend(impact.resolved_errors);
                known.triggered_fixes.extend(impact.triggered_fixes);
                known.regions.extend(impact.regions);
            }
            None => {
                self.store.insert(impact.location().clone(), impact);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn impact(&self, fix: &Fix) -> Option<&Impact> {
        self.store.get(fix.location())
    }

    /// Triggered downstream errors of `fix` that `tree` does not resolve.
    pub fn effect(&self, fix: &Fix, tree: &FxHashSet<Fix>) -> i32 {
        self.impact(fix).map_or(0, |impact| {
            impact
                .triggered_errors
                .iter()
                .filter(|error| !error.is_resolvable_with(tree))
                .count() as i32
        })
    }

    pub fn upper_bound(&self, tree: &FxHashSet<Fix>) -> i32 {
        tree.iter().map(|fix| self.effect(fix, tree)).sum()
    }

    pub fn lower_bound(&self, tree: &FxHashSet<Fix>) -> i32 {
        tree.iter()
            .map(|fix| self.effect(fix, tree))
            .max()
            .unwrap_or(0)
    }

    /// True when `fix` triggers a downstream error that no fix in the target
    /// module can resolve.
    pub fn triggers_unresolvable_errors(&self, fix: &Fix) -> bool {
        self.impact(fix).is_some_and(|impact| {
            impact
                .triggered_errors
                .iter()
                .any(|error| error.is_unresolvable())
        })
    }

    /// In-module fixes for downstream errors triggered by the tree, excluding
    /// the tree itself.
    pub fn follow_up_fixes(&self, tree: &FxHashSet<Fix>) -> Vec<Fix> {
        tree.iter()
            .filter_map(|fix| self.impact(fix))
            .flat_map(|impact| impact.triggered_errors.iter())
            .flat_map(|error| error.fixes_in_module())
            .filter(|fix| !tree.contains(*fix))
            .unique()
            .cloned()
            .sorted_by_cached_key(|fix| fix.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fix_model::{CheckError, Region, DEFAULT_ANNOTATION};

    fn fix(class: &str, signature: &str) -> Fix {
        Fix::new(
            Change::add(Location::method(class, signature), DEFAULT_ANNOTATION),
            DOWNSTREAM_REASON,
            true,
        )
    }

    fn error(member: &str) -> CheckError {
        CheckError::new("DEREFERENCE_NULLABLE", "deref", Region::new("App", member), 0)
    }

    fn impact(fix: &Fix, errors: Vec<CheckError>) -> Impact {
        let mut impact = Impact::new(fix.clone(), FxHashSet::default());
        impact.triggered_errors = errors;
        impact
    }

    #[test]
    fn overlapping_errors_count_per_fix() {
        let x = fix("Foo", "x()");
        let y = fix("Foo", "y()");
        let cache = DownstreamImpactCache::from_impacts([
            impact(&x, vec![error("e1()"), error("e2()")]),
            impact(&y, vec![error("e2()"), error("e3()")]),
        ]);

        let tree: FxHashSet<Fix> = [x, y].into_iter().collect();
        assert_eq!(cache.upper_bound(&tree), 4);
        assert_eq!(cache.lower_bound(&tree), 2);
        assert_eq!(cache.lower_bound(&FxHashSet::default()), 0);
    }

    #[test]
    fn tree_fixes_resolve_downstream_errors() {
        let x = fix("Foo", "x()");
        let param = Fix::new(
            Change::add(
                Location::parameter("Foo", "take(java.lang.Object)", 0),
                DEFAULT_ANNOTATION,
            ),
            "PASS_NULLABLE",
            true,
        );
        let cache = DownstreamImpactCache::from_impacts([impact(
            &x,
            vec![error("a()").with_fix(param.clone()), error("b()")],
        )]);

        let alone: FxHashSet<Fix> = [x.clone()].into_iter().collect();
        assert_eq!(cache.effect(&x, &alone), 2);
        assert_eq!(cache.follow_up_fixes(&alone), vec![param.clone()]);
        assert!(cache.triggers_unresolvable_errors(&x));

        let with_param: FxHashSet<Fix> = [x.clone(), param].into_iter().collect();
        assert_eq!(cache.effect(&x, &with_param), 1);
        assert!(cache.follow_up_fixes(&with_param).is_empty());
    }

    #[test]
    fn impacts_from_several_modules_merge() {
        let x = fix("Foo", "x()");
        let cache = DownstreamImpactCache::from_impacts([
            impact(&x, vec![error("a()")]),
            impact(&x, vec![error("b()")]),
        ]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.upper_bound(&[x].into_iter().collect()), 2);
    }
}
