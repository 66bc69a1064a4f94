use derive_more::Display;
use serde::Deserialize;

use crate::report::Reports;

/// Turns computed effects into accept/reject decisions. The engine reads
/// only `Report::approved()` afterwards.
pub trait ApprovalPolicy {
    fn tag(&self, reports: &mut Reports);
}

/// How much of the downstream effect counts against a fix.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    /// Only the effect on the target module.
    #[default]
    #[display("local")]
    Local,
    /// Local effect plus the guaranteed downstream effect.
    #[display("lower-bound")]
    LowerBound,
    /// Local effect plus the worst-case downstream effect.
    #[display("upper-bound")]
    UpperBound,
    /// Like `UpperBound`, and nothing that breaks a dependent module beyond
    /// repair.
    #[display("strict")]
    Strict,
}

impl ApprovalPolicy for AnalysisMode {
    fn tag(&self, reports: &mut Reports) {
        for (_, report) in reports.iter_mut() {
            let approved = match self {
                AnalysisMode::Local => report.local_effect < 1,
                AnalysisMode::LowerBound => report.local_effect + report.lower_bound < 1,
                AnalysisMode::UpperBound => report.local_effect + report.upper_bound < 1,
                AnalysisMode::Strict => {
                    report.local_effect + report.upper_bound < 1
                        && !report.triggers_unresolvable_downstream
                }
            };
            report.set_approved(approved);
        }
    }
}

/// Approves every report.
pub struct ApproveAll;

impl ApprovalPolicy for ApproveAll {
    fn tag(&self, reports: &mut Reports) {
        for (_, report) in reports.iter_mut() {
            report.set_approved(true);
        }
    }
}
