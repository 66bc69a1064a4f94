pub mod cache;
pub mod config;
pub mod downstream;
mod error;
pub mod evaluator;
pub mod graph;
mod inferrer;
pub mod oracle;
pub mod policy;
pub mod report;
pub mod workspace;


#[cfg(test)]
mod pbt;

pub use cache::ImpactCache;
pub use config::{find_config, load_config, EvaluatorKind, InferConfig, ModuleConfig};
pub use downstream::DownstreamImpactCache;
pub use error::InferError;
pub use evaluator::{BasicEvaluator, CachedEvaluator, Evaluator, VoidEvaluator};
pub use graph::{ConflictGraph, Node, NodeId};
pub use inferrer::{AcceptedFix, Inferrer, RunSummary};
pub use oracle::{BuildPipeline, Injector};
pub use policy::{AnalysisMode, ApprovalPolicy, ApproveAll};
pub use report::{Report, ReportId, Reports, Tag, Termination};
pub use workspace::{ErrorStore, Scope, Workspace};
