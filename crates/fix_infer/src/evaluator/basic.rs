use fix_model::Fix;

use super::{open_reports, seed_reports, Evaluator};
use crate::downstream::DownstreamImpactCache;
use crate::error::InferError;
use crate::graph::{ConflictGraph, Node};
use crate::report::Reports;
use crate::workspace::{Scope, Workspace};

/// Re-measures the whole tree of every open report in each round.
pub struct BasicEvaluator {
    depth: usize,
    optimized: bool,
}

impl BasicEvaluator {
    pub fn new(depth: usize, optimized: bool) -> Self {
        Self { depth, optimized }
    }
}

impl Evaluator for BasicEvaluator {
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
            log::info!("round {round}: {} open reports", open.len());

            let mut graph = ConflictGraph::new(self.optimized);
            for id in open {
                let report = &reports[id];
                let regions = workspace.tree_regions(&report.tree);
                graph.add_node(Node::new(
                    report.root.clone(),
                    report.tree.clone(),
                    regions,
                    Some(id),
                ));
            }
            workspace.measure(&mut graph, Scope::Target)?;

            let last_round = round + 1 == self.depth;
            for (_, node) in graph.nodes() {
                let Some(id) = node.report else { continue };
                let report = &mut reports[id];
                let mut follow_ups = if node.changed {
                    node.triggered_fixes.clone()
                } else {
                    Vec::new()
                };
                follow_ups.extend(downstream.follow_up_fixes(&node.tree));
                report.fold_round(
                    node.effect,
                    node.triggered_errors.clone(),
                    follow_ups,
                    last_round,
                );
            }
        }
        Ok(reports)
    }
}
