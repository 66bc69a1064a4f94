// ==============================================================================
// Oracle Interfaces
// ==============================================================================
//
// The engine never edits sources or runs the checker itself. It goes through
// these two seams, which the embedding tool implements.

use fix_model::{Change, Fix};
use region_index::ModuleSources;

use crate::error::InferError;

/// Rebuilds a module with the null-safety checker attached.
pub trait BuildPipeline {
    /// Afterwards the module's errors file (and optional fixes file) reflect
    /// the current sources. A failure aborts the run.
    fn build(&mut self, module: &ModuleSources) -> Result<(), InferError>;
}

/// Applies annotation changes to the sources.
pub trait Injector {
    /// Apply every change, or none of them.
    fn apply(&mut self, changes: &[Change]) -> Result<(), InferError>;

    fn inject(&mut self, fixes: &[Fix]) -> Result<(), InferError> {
        let changes: Vec<Change> = fixes
            .iter()
            .flat_map(|fix| fix.changes().iter().cloned())
            .collect();
        self.apply(&changes)
    }

    /// Undo an earlier `inject` of the same fixes.
    fn retract(&mut self, fixes: &[Fix]) -> Result<(), InferError> {
        let changes: Vec<Change> = fixes
            .iter()
            .flat_map(|fix| fix.changes().iter().map(Change::inverse))
            .collect();
        self.apply(&changes)
    }
}
