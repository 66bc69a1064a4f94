use fix_model::{CheckError, Fix, Impact};
use itertools::Itertools;
use rustc_hash::FxHashSet;

use super::{open_reports, seed_reports, Evaluator};
use crate::cache::ImpactCache;
use crate::downstream::DownstreamImpactCache;
use crate::error::InferError;
use crate::graph::{ConflictGraph, Node};
use crate::report::Reports;
use crate::workspace::{Scope, Workspace};

/// Measures each fix on its own once and composes tree effects from the
/// cached single-fix impacts. The cache outlives a single `evaluate` call and
/// is pruned after every injection.
pub struct CachedEvaluator {
    depth: usize,
    optimized: bool,
    cache: ImpactCache,
}

impl CachedEvaluator {
    pub fn new(depth: usize, optimized: bool) -> Self {
        Self {
            depth,
            optimized,
            cache: ImpactCache::new(),
        }
    }

    pub fn cache(&self) -> &ImpactCache {
        &self.cache
    }

    /// Measure the fixes of `trees` that the cache has not seen yet.
    fn fill_cache<'a>(
        &mut self,
        trees: impl IntoIterator<Item = &'a FxHashSet<Fix>>,
        workspace: &mut Workspace,
    ) -> Result<(), InferError> {
        let unknown: Vec<Fix> = trees
            .into_iter()
            .flatten()
            .filter(|fix| self.cache.is_unknown(fix))
            .unique()
            .cloned()
            .sorted_by_cached_key(|fix| fix.to_string())
            .collect();

        let mut graph = ConflictGraph::new(self.optimized);
        for fix in unknown {
            let Some(regions) = workspace.fix_regions(&fix) else {
                continue;
            };
            graph.add_node(Node::new(fix, FxHashSet::default(), regions, None));
        }
        if graph.is_empty() {
            return Ok(());
        }

        workspace.measure(&mut graph, Scope::Target)?;
        let impacts: Vec<Impact> = graph
            .nodes()
            .map(|(_, node)| {
                let mut impact = Impact::new(node.root.clone(), node.regions.clone());
                impact.triggered_errors = node.triggered_errors.clone();
                impact.resolved_errors = node.resolved_errors.clone();
                impact.triggered_fixes = node.triggered_fixes.clone();
                impact
            })
            .collect();
        self.cache.update_cache_state(impacts);
        Ok(())
    }
}

impl Evaluator for CachedEvaluator {
    fn evaluate(
        &mut self,
        fixes: &[Fix],
        workspace: &mut Workspace,
        downstream: &DownstreamImpactCache,
    ) -> Result<Reports, InferError> {
        let mut reports = seed_reports(fixes, workspace);

        for round in 0..self.depth {
            let open = open_reports(&reports);
            if open.is_empty() {
                break;
            }
            log::info!(
                "round {round}: {} open reports, {} cached impacts",
                open.len(),
                self.cache.len()
            );
            self.fill_cache(open.iter().map(|id| &reports[*id].tree), workspace)?;

            let last_round = round + 1 == self.depth;
            for id in open {
                let report = &mut reports[id];
                let mut effect = 0;
                let mut triggered: Vec<CheckError> = Vec::new();
                let mut follow_ups: Vec<Fix> = Vec::new();
                for fix in &report.tree {
                    let Some(impact) = self.cache.fetch_impact(fix) else {
                        continue;
                    };
                    effect += impact.effect_within(&report.tree);
                    triggered.extend(
                        impact
                            .triggered_errors
                            .iter()
                            .filter(|error| !error.is_resolvable_with(&report.tree))
                            .cloned(),
                    );
                    follow_ups.extend(impact.triggered_fixes.iter().cloned());
                }
                follow_ups.extend(downstream.follow_up_fixes(&report.tree));
                report.fold_round(effect, triggered, follow_ups, last_round);
            }
        }
        Ok(reports)
    }

    fn on_injection(&mut self, injected: &[Fix], workspace: &Workspace) {
        self.cache
            .update_impacts_after_injection(injected, &workspace.registry());
    }
}
