// ==============================================================================
// Evaluators
// ==============================================================================
//
// An evaluator turns a batch of candidate fixes into one report per fix. Each
// report walks through up to `depth` rounds; a round measures the current tree
// and either finishes the report or grows the tree by the in-module fixes of
// the errors it triggered.

mod basic;
mod cached;
mod void;

pub use basic::BasicEvaluator;
pub use cached::CachedEvaluator;
pub use void::VoidEvaluator;

use fix_model::Fix;

use crate::config::{EvaluatorKind, InferConfig};
use crate::downstream::DownstreamImpactCache;
use crate::error::InferError;
use crate::report::{Report, ReportId, Reports, Termination};
use crate::workspace::Workspace;

pub trait Evaluator {
    fn evaluate(
        &mut self,
        fixes: &[Fix],
        workspace: &mut Workspace,
        downstream: &DownstreamImpactCache,
    ) -> Result<Reports, InferError>;

    /// Called after `injected` became part of the sources for good.
    fn on_injection(&mut self, _injected: &[Fix], _workspace: &Workspace) {}
}

pub fn evaluator_for(config: &InferConfig) -> Box<dyn Evaluator> {
    if config.exhaustive {
        return Box::new(VoidEvaluator);
    }
    let depth = config.effective_depth();
    match config.evaluator {
        EvaluatorKind::Void => Box::new(VoidEvaluator),
        EvaluatorKind::Basic => Box::new(BasicEvaluator::new(depth, config.optimized)),
        EvaluatorKind::Cached => Box::new(CachedEvaluator::new(depth, config.optimized)),
    }
}

/// One report per fix. Fixes that cannot be resolved in the target module
/// are finished right away.
fn seed_reports(fixes: &[Fix], workspace: &Workspace) -> Reports {
    let mut reports = Reports::default();
    for fix in fixes {
        let mut report = Report::new(fix.clone());
        if workspace.fix_regions(fix).is_none() {
            log::warn!("{fix} cannot be resolved in {}", workspace.target().name());
            report.finish(Termination::Unresolvable);
        }
        reports.alloc(report);
    }
    reports
}

fn open_reports(reports: &Reports) -> Vec<ReportId> {
    reports
        .iter()
        .filter(|(_, report)| !report.finished)
        .map(|(id, _)| id)
        .collect()
}
