// ==============================================================================
// Outer Loop
// ==============================================================================
//
// Repeatedly asks the checker for fixes it has not evaluated yet, explores
// them with the configured evaluator, tags the reports and injects the
// approved ones. Stops when no unseen fix is left or the iteration cap is hit.

use std::path::Path;

use fix_model::Fix;
use itertools::Itertools;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::config::InferConfig;
use crate::downstream::DownstreamImpactCache;
use crate::error::InferError;
use crate::evaluator::{evaluator_for, Evaluator};
use crate::oracle::{BuildPipeline, Injector};
use crate::policy::{ApprovalPolicy, ApproveAll};
use crate::report::{Report, Reports, Termination};
use crate::workspace::Workspace;

/// An accepted root fix as written to the report document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedFix {
    pub fix: String,
    pub kind: &'static str,
    pub class: String,
    pub reasons: Vec<String>,
    pub iteration: usize,
    pub local_effect: i32,
    pub lower_bound: i32,
    pub upper_bound: i32,
    pub overall_effect: i32,
    pub termination: Termination,
    pub tree: Vec<String>,
    pub downstream_fixes: Vec<String>,
}

impl AcceptedFix {
    fn new(report: &Report, iteration: usize) -> Self {
        let location = report.root.location();
        Self {
            fix: report.root.to_string(),
            kind: location.kind().as_str(),
            class: location.class.to_string(),
            reasons: report.root.reasons.iter().map(|r| r.to_string()).collect(),
            iteration,
            local_effect: report.local_effect,
            lower_bound: report.lower_bound,
            upper_bound: report.upper_bound,
            overall_effect: report.overall_effect(),
            termination: report.termination,
            tree: report
                .tree
                .iter()
                .filter(|fix| **fix != report.root)
                .map(|fix| fix.to_string())
                .sorted()
                .collect(),
            downstream_fixes: report.downstream_fixes.iter().map(|fix| fix.to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    module: &'a str,
    iterations: usize,
    builds: usize,
    remaining_errors: usize,
    fixes: Vec<&'a AcceptedFix>,
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: usize,
    pub builds: usize,
    pub injected: Vec<Fix>,
    pub accepted: Vec<AcceptedFix>,
    pub remaining_errors: usize,
    /// The iteration cap stopped the run before it converged.
    pub capped: bool,
}

pub struct Inferrer {
    config: InferConfig,
    workspace: Workspace,
    evaluator: Box<dyn Evaluator>,
    policy: Box<dyn ApprovalPolicy>,
    downstream: DownstreamImpactCache,
    seen: FxHashSet<Fix>,
}

impl Inferrer {
    pub fn new(
        config: InferConfig,
        pipeline: Box<dyn BuildPipeline>,
        injector: Box<dyn Injector>,
    ) -> Result<Self, InferError> {
        let workspace = Workspace::from_config(&config, pipeline, injector)?;
        Ok(Self::with_workspace(config, workspace))
    }

    pub fn with_workspace(config: InferConfig, workspace: Workspace) -> Self {
        let evaluator = evaluator_for(&config);
        let policy: Box<dyn ApprovalPolicy> = if config.exhaustive {
            Box::new(ApproveAll)
        } else {
            Box::new(config.mode)
        };
        Self {
            config,
            workspace,
            evaluator,
            policy,
            downstream: DownstreamImpactCache::empty(),
            seen: FxHashSet::default(),
        }
    }

    /// Replace the approval policy derived from the config.
    pub fn with_policy(mut self, policy: Box<dyn ApprovalPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn run(&mut self) -> Result<RunSummary, InferError> {
        self.workspace.refresh()?;
        if self.config.downstream {
            self.downstream =
                DownstreamImpactCache::analyze(&mut self.workspace, self.config.optimized)?;
            log::info!("measured {} methods on downstream modules", self.downstream.len());
        }

        let mut accepted: Vec<AcceptedFix> = Vec::new();
        let mut iterations = 0;
        let mut capped = false;
        loop {
            let candidates: Vec<Fix> = self
                .workspace
                .candidate_fixes()?
                .into_iter()
                .filter(|fix| !self.seen.contains(fix))
                .collect();
            if candidates.is_empty() {
                break;
            }
            if iterations == self.config.max_iterations {
                log::warn!(
                    "stopping after {iterations} iterations with {} unseen fixes",
                    candidates.len()
                );
                capped = true;
                break;
            }
            iterations += 1;
            self.seen.extend(candidates.iter().cloned());

            let mut reports =
                self.evaluator
                    .evaluate(&candidates, &mut self.workspace, &self.downstream)?;
            self.review(&mut reports);

            let approved: Vec<&Report> = reports
                .iter()
                .map(|(_, report)| report)
                .filter(|report| report.approved())
                .collect();
            let to_inject: Vec<Fix> = approved
                .iter()
                .flat_map(|report| self.fixes_to_inject(report))
                .filter(|fix| fix.in_module)
                .unique()
                .collect();
            log::info!(
                "iteration {iterations}: {} candidates, {} approved, injecting {} fixes",
                candidates.len(),
                approved.len(),
                to_inject.len()
            );
            accepted.extend(
                approved
                    .iter()
                    .map(|report| AcceptedFix::new(report, iterations)),
            );

            if !to_inject.is_empty() {
                self.workspace.inject(&to_inject)?;
                self.workspace.refresh()?;
                self.evaluator.on_injection(&to_inject, &self.workspace);
            }
        }

        accepted.sort_by(|a, b| {
            b.overall_effect
                .cmp(&a.overall_effect)
                .then_with(|| a.fix.cmp(&b.fix))
        });
        let summary = RunSummary {
            iterations,
            builds: self.workspace.builds(),
            injected: self.workspace.injected().to_vec(),
            accepted,
            remaining_errors: self.workspace.baseline().len(),
            capped,
        };
        if let Some(path) = &self.config.report_path {
            self.write_report(path, &summary)?;
        }
        Ok(summary)
    }

    /// Attach downstream bounds, then tag with the policy and apply vetoes.
    pub(crate) fn review(&self, reports: &mut Reports) {
        self.compute_bounds(reports);
        self.policy.tag(reports);
        self.veto(reports);
    }

    fn compute_bounds(&self, reports: &mut Reports) {
        for (_, report) in reports.iter_mut() {
            report.lower_bound = self.downstream.lower_bound(&report.tree);
            report.upper_bound = self.downstream.upper_bound(&report.tree);
            report.triggers_unresolvable_downstream = report
                .tree
                .iter()
                .any(|fix| self.downstream.triggers_unresolvable_errors(fix));
            report.downstream_fixes = self.downstream.follow_up_fixes(&report.tree);
        }
    }

    /// Rejections that no policy can override.
    fn veto(&self, reports: &mut Reports) {
        for (_, report) in reports.iter_mut() {
            if !report.approved() {
                continue;
            }
            let unresolvable_downstream =
                self.config.downstream && report.triggers_unresolvable_downstream;
            if report.is_unresolvable() || unresolvable_downstream {
                log::debug!("vetoed {}", report.root);
                report.set_approved(false);
            }
        }
    }

    fn fixes_to_inject(&self, report: &Report) -> Vec<Fix> {
        if self.config.chain {
            report
                .tree
                .iter()
                .cloned()
                .sorted_by_cached_key(|fix| fix.to_string())
                .collect()
        } else {
            vec![report.root.clone()]
        }
    }

    fn write_report(&self, path: &Path, summary: &RunSummary) -> Result<(), InferError> {
        let document = ReportDocument {
            module: self.workspace.target().name(),
            iterations: summary.iterations,
            builds: summary.builds,
            remaining_errors: summary.remaining_errors,
            fixes: summary.accepted.iter().collect(),
        };
        let json = serde_json::to_string_pretty(&document)?;
        std::fs::write(path, json).map_err(|source| InferError::ReportWrite {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("wrote report to {}", path.display());
        Ok(())
    }
}
