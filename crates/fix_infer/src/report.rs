use derive_more::Display;
use fix_model::{CheckError, Fix};
use itertools::Itertools;
use la_arena::{Arena, Idx};
use rustc_hash::FxHashSet;
use serde::Serialize;

pub type ReportId = Idx<Report>;
pub type Reports = Arena<Report>;

/// Why exploration of a tree stopped.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    #[default]
    #[display("exploring")]
    Exploring,
    /// No triggered error can be addressed by another in-module fix.
    #[display("resolved")]
    Resolved,
    /// Depth ran out while follow-up fixes were still pending.
    #[display("depth-limit")]
    DepthLimit,
    /// The root cannot be resolved inside the module under inference.
    #[display("unresolvable")]
    Unresolvable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tag {
    #[default]
    Pending,
    Approve,
    Reject,
}

/// Outcome of exploring one root fix.
#[derive(Debug, Clone)]
pub struct Report {
    pub root: Fix,
    /// The root and every follow-up fix explored with it.
    pub tree: FxHashSet<Fix>,
    pub triggered_errors: Vec<CheckError>,
    /// Follow-up fixes discovered in the last round that are not in `tree`.
    pub triggered_fixes: Vec<Fix>,
    pub local_effect: i32,
    pub lower_bound: i32,
    pub upper_bound: i32,
    /// Some fix of the tree triggers a downstream error no in-module fix
    /// resolves.
    pub triggers_unresolvable_downstream: bool,
    /// In-module fixes that resolve downstream errors triggered by the tree.
    pub downstream_fixes: Vec<Fix>,
    pub rounds: usize,
    pub finished: bool,
    pub termination: Termination,
    tag: Tag,
}

impl Report {
    pub fn new(root: Fix) -> Self {
        let tree = FxHashSet::from_iter([root.clone()]);
        Self {
            root,
            tree,
            triggered_errors: Vec::new(),
            triggered_fixes: Vec::new(),
            local_effect: 0,
            lower_bound: 0,
            upper_bound: 0,
            triggers_unresolvable_downstream: false,
            downstream_fixes: Vec::new(),
            rounds: 0,
            finished: false,
            termination: Termination::Exploring,
            tag: Tag::Pending,
        }
    }

    pub fn finish(&mut self, termination: Termination) {
        self.finished = true;
        self.termination = termination;
    }

    /// Fold one round of measurements. `follow_ups` are candidate fixes for
    /// errors the tree triggered; the tree grows by them only if another
    /// round will measure the result.
    pub fn fold_round(
        &mut self,
        effect: i32,
        triggered: Vec<CheckError>,
        follow_ups: Vec<Fix>,
        last_round: bool,
    ) {
        self.rounds += 1;
        self.local_effect = effect;
        self.triggered_errors = triggered;
        let follow_ups: Vec<Fix> = follow_ups
            .into_iter()
            .filter(|fix| !self.tree.contains(fix))
            .unique()
            .collect();

        if follow_ups.is_empty() {
            self.triggered_fixes.clear();
            self.finish(Termination::Resolved);
        } else if last_round {
            self.triggered_fixes = follow_ups;
            self.finish(Termination::DepthLimit);
        } else {
            self.tree.extend(follow_ups.iter().cloned());
            self.triggered_fixes = follow_ups;
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn set_approved(&mut self, approved: bool) {
        self.tag = if approved { Tag::Approve } else { Tag::Reject };
    }

    pub fn approved(&self) -> bool {
        self.tag == Tag::Approve
    }

    /// Effect on the module plus the guaranteed downstream effect.
    pub fn overall_effect(&self) -> i32 {
        self.local_effect + self.lower_bound
    }

    pub fn is_unresolvable(&self) -> bool {
        self.termination == Termination::Unresolvable
    }
}
