use rustc_hash::FxHashSet;

use crate::check_error::CheckError;
use crate::fix::Fix;
use crate::location::Location;
use crate::region::Region;

/// What happened when a single fix was injected on its own.
#[derive(Debug, Clone)]
pub struct Impact {
    pub fix: Fix,
    /// Errors that appeared in the fix's impacted regions.
    pub triggered_errors: Vec<CheckError>,
    /// Baseline errors that disappeared from the fix's impacted regions.
    pub resolved_errors: Vec<CheckError>,
    /// In-module fixes that resolve some of the triggered errors.
    pub triggered_fixes: Vec<Fix>,
    /// The region set the observation was made over. The impact stays valid
    /// only while no later injection touches one of these regions.
    pub regions: FxHashSet<Region>,
}

impl Impact {
    pub fn new(fix: Fix, regions: FxHashSet<Region>) -> Self {
        Self {
            fix,
            triggered_errors: Vec::new(),
            resolved_errors: Vec::new(),
            triggered_fixes: Vec::new(),
            regions,
        }
    }

    pub fn location(&self) -> &Location {
        self.fix.location()
    }

    /// Signed change in error count caused by the fix alone.
    pub fn effect(&self) -> i32 {
        self.triggered_errors.len() as i32 - self.resolved_errors.len() as i32
    }

    /// Effect of this fix when it is injected together with `tree`: triggered
    /// errors that the tree already resolves are not counted.
    pub fn effect_within(&self, tree: &FxHashSet<Fix>) -> i32 {
        let triggered = self
            .triggered_errors
            .iter()
            .filter(|error| !error.is_resolvable_with(tree))
            .count();
        triggered as i32 - self.resolved_errors.len() as i32
    }
}
