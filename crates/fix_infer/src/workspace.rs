// ==============================================================================
// Workspace
// ==============================================================================
//
// Owns the module indices, the oracle seams and the baseline checker errors.
// Every measurement follows the same cycle: inject the fixes of one color
// class, build, read the errors, retract. Nodes of a class have disjoint
// regions, so each node's diff only looks at its own regions.

use fix_model::wire::{read_errors, read_fixes};
use fix_model::{CheckError, Fix, FixContext, Region, WireFormat};
use itertools::Itertools;
use rayon::prelude::*;
use region_index::{CompoundRegistry, Index, IndexKind, ModuleInfo, RegionRegistry};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::config::InferConfig;
use crate::error::InferError;
use crate::graph::{ConflictGraph, Node, NodeId};
use crate::oracle::{BuildPipeline, Injector};

/// Checker errors of one build, indexed by the region they occur in.
#[derive(Debug, Clone)]
pub struct ErrorStore {
    index: Index<CheckError>,
}

impl Default for ErrorStore {
    fn default() -> Self {
        Self {
            index: Index::new(IndexKind::ByMember),
        }
    }
}

impl ErrorStore {
    pub fn new(errors: impl IntoIterator<Item = CheckError>) -> Self {
        Self {
            index: Index::from_records(IndexKind::ByMember, errors),
        }
    }

    pub fn errors_in(&self, regions: &FxHashSet<Region>) -> FxHashSet<CheckError> {
        regions
            .iter()
            .flat_map(|region| self.index.get_by_member(&region.class, &region.member))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckError> {
        self.index.values()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Which module a measurement builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Target,
    Downstream(usize),
}

pub struct Workspace {
    target: ModuleInfo,
    downstream: Vec<ModuleInfo>,
    baseline: ErrorStore,
    downstream_baselines: Vec<ErrorStore>,
    pipeline: Box<dyn BuildPipeline>,
    injector: Box<dyn Injector>,
    wire_format: WireFormat,
    annotation: SmolStr,
    builds: usize,
    injected: Vec<Fix>,
}

impl Workspace {
    pub fn new(
        target: ModuleInfo,
        downstream: Vec<ModuleInfo>,
        pipeline: Box<dyn BuildPipeline>,
        injector: Box<dyn Injector>,
        wire_format: WireFormat,
        annotation: impl Into<SmolStr>,
    ) -> Self {
        Self {
            target,
            downstream,
            baseline: ErrorStore::default(),
            downstream_baselines: Vec::new(),
            pipeline,
            injector,
            wire_format,
            annotation: annotation.into(),
            builds: 0,
            injected: Vec::new(),
        }
    }

    /// Load the target and downstream modules named in `config`.
    pub fn from_config(
        config: &InferConfig,
        pipeline: Box<dyn BuildPipeline>,
        injector: Box<dyn Injector>,
    ) -> Result<Self, InferError> {
        let target = ModuleInfo::load(config.target.clone().into())?;
        let downstream = config
            .downstream_modules
            .iter()
            .map(|module| ModuleInfo::load(module.clone().into()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(
            target,
            downstream,
            pipeline,
            injector,
            config.wire_format,
            config.annotation.clone(),
        ))
    }

    pub fn target(&self) -> &ModuleInfo {
        &self.target
    }

    pub fn downstream_modules(&self) -> &[ModuleInfo] {
        &self.downstream
    }

    pub fn registry(&self) -> CompoundRegistry<'_> {
        self.target.registry()
    }

    pub fn baseline(&self) -> &ErrorStore {
        &self.baseline
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    pub fn builds(&self) -> usize {
        self.builds
    }

    /// Fixes injected permanently so far.
    pub fn injected(&self) -> &[Fix] {
        &self.injected
    }

    fn build(&mut self, scope: Scope) -> Result<ErrorStore, InferError> {
        let module = match scope {
            Scope::Target => &self.target,
            Scope::Downstream(idx) => &self.downstream[idx],
        };
        log::debug!("building {}", module.name());
        self.pipeline.build(module.sources())?;
        self.builds += 1;

        let ctx = FixContext {
            annotation: &self.annotation,
            membership: &self.target,
        };
        let errors = read_errors(&module.sources().errors, self.wire_format, &ctx)?;
        Ok(ErrorStore::new(errors))
    }

    /// Build the target and make its errors the new baseline.
    pub fn refresh(&mut self) -> Result<(), InferError> {
        let errors = self.build(Scope::Target)?;
        self.target.reindex()?;
        self.baseline = errors;
        log::info!(
            "{}: {} errors after {} builds",
            self.target.name(),
            self.baseline.len(),
            self.builds
        );
        Ok(())
    }

    /// Record the current errors of every downstream module.
    pub fn prepare_downstream(&mut self) -> Result<(), InferError> {
        let mut baselines = Vec::with_capacity(self.downstream.len());
        for idx in 0..self.downstream.len() {
            baselines.push(self.build(Scope::Downstream(idx))?);
            self.downstream[idx].reindex()?;
        }
        self.downstream_baselines = baselines;
        Ok(())
    }

    /// Regions impacted by every change of `fix`, or `None` if one of them is
    /// not declared in the target module.
    pub fn fix_regions(&self, fix: &Fix) -> Option<FxHashSet<Region>> {
        let registry = self.registry();
        let mut regions = FxHashSet::default();
        for location in fix.locations() {
            regions.extend(registry.impacted_regions(location)?);
        }
        Some(regions)
    }

    /// Union of the impacted regions of a tree. Fixes without regions in the
    /// target contribute nothing.
    pub fn tree_regions<'a>(&self, tree: impl IntoIterator<Item = &'a Fix>) -> FxHashSet<Region> {
        let mut regions = FxHashSet::default();
        for fix in tree {
            match self.fix_regions(fix) {
                Some(found) => regions.extend(found),
                None => log::debug!("{fix} has no impacted regions in {}", self.target.name()),
            }
        }
        regions
    }

    /// In-module fixes of the current errors plus the checker's separate fix
    /// suggestions, deduplicated with their reasons merged.
    pub fn candidate_fixes(&self) -> Result<Vec<Fix>, InferError> {
        let mut found: Vec<Fix> = self
            .baseline
            .iter()
            .flat_map(|error| error.fixes_in_module().cloned())
            .collect();
        if let Some(path) = &self.target.sources().fixes {
            let ctx = FixContext {
                annotation: &self.annotation,
                membership: &self.target,
            };
            found.extend(read_fixes(path, &ctx)?.into_iter().filter(|fix| fix.in_module));
        }

        let mut merged: Vec<Fix> = Vec::new();
        let mut positions: FxHashMap<Fix, usize> = FxHashMap::default();
        for fix in found {
            match positions.get(&fix) {
                Some(&idx) => merged[idx].merge_reasons(&fix),
                None => {
                    positions.insert(fix.clone(), merged.len());
                    merged.push(fix);
                }
            }
        }
        Ok(merged
            .into_iter()
            .sorted_by_cached_key(|fix| fix.to_string())
            .collect())
    }

    /// Inject `fixes` for good.
    pub fn inject(&mut self, fixes: &[Fix]) -> Result<(), InferError> {
        self.injector.inject(fixes)?;
        self.injected.extend(fixes.iter().cloned());
        Ok(())
    }

    /// Measure every node of `graph`, one build per color class.
    pub fn measure(&mut self, graph: &mut ConflictGraph, scope: Scope) -> Result<(), InferError> {
        let groups = graph.groups();
        log::info!(
            "measuring {} nodes with {} builds",
            graph.len(),
            groups.len()
        );

        for group in groups {
            let shared: &ConflictGraph = graph;
            let fixes: Vec<Fix> = group
                .iter()
                .flat_map(|id| shared[*id].tree.iter())
                .filter(|fix| fix.in_module)
                .unique()
                .cloned()
                .collect();

            self.injector.inject(&fixes)?;
            let built = self.build(scope);
            let retracted = self.injector.retract(&fixes);
            let after = match (built, retracted) {
                (Ok(after), Ok(())) => after,
                (Ok(_), Err(err)) | (Err(err), Ok(())) => return Err(err),
                (Err(err), Err(retract_err)) => {
                    log::error!(
                        "retracting {} fixes after a failed build: {retract_err}",
                        fixes.len()
                    );
                    return Err(err);
                }
            };

            let before = match scope {
                Scope::Target => &self.baseline,
                Scope::Downstream(idx) => &self.downstream_baselines[idx],
            };
            let outcomes: Vec<(NodeId, Outcome)> = group
                .par_iter()
                .map(|&id| (id, Outcome::diff(&shared[id], before, &after)))
                .collect();
            for (id, outcome) in outcomes {
                outcome.apply(&mut graph[id]);
            }
        }
        Ok(())
    }
}

/// Error diff of one node against the baseline.
struct Outcome {
    triggered: Vec<CheckError>,
    resolved: Vec<CheckError>,
    triggered_fixes: Vec<Fix>,
}

impl Outcome {
    fn diff(node: &Node, before: &ErrorStore, after: &ErrorStore) -> Self {
        let before = before.errors_in(&node.regions);
        let after = after.errors_in(&node.regions);

        let triggered: Vec<CheckError> = after
            .difference(&before)
            .cloned()
            .sorted_by_cached_key(|error| error.to_string())
            .collect();
        let resolved: Vec<CheckError> = before
            .difference(&after)
            .cloned()
            .sorted_by_cached_key(|error| error.to_string())
            .collect();
        let triggered_fixes: Vec<Fix> = triggered
            .iter()
            .flat_map(|error| error.fixes_in_module())
            .filter(|fix| !node.tree.contains(*fix))
            .unique()
            .cloned()
            .collect();

        Self {
            triggered,
            resolved,
            triggered_fixes,
        }
    }

    fn apply(self, node: &mut Node) {
        node.effect = self.triggered.len() as i32 - self.resolved.len() as i32;
        node.finished = self.triggered_fixes.is_empty();
        node.changed = !node.finished;
        node.triggered_errors = self.triggered;
        node.resolved_errors = self.resolved;
        node.triggered_fixes = self.triggered_fixes;
    }
}
