// ==============================================================================
// Property-Based Tests for Grouping and Caching
// ==============================================================================
//
// Generates fixes over small class/member pools so that region sets overlap
// often, then checks the properties the outer loop relies on:
// - every color class of the conflict graph is pairwise disjoint
// - first-fit coloring never needs more than max degree + 1 colors
// - after an injection the impact cache holds nothing observed over a
//   touched region
// - downstream bounds are ordered
//
// Known limitations:
// - Generated fixes are all additions, so the inverse path of the injector is
//   only covered by the scenario tests.

use fix_model::arbitrary::arb_region;
use fix_model::{CheckError, Fix, Impact, Location, Region};
use proptest::prelude::{
    any, prop, prop_assert, prop_assert_eq, proptest, ProptestConfig, Strategy,
};
use region_index::RegionRegistry;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cache::ImpactCache;
use crate::downstream::DownstreamImpactCache;
use crate::graph::{ConflictGraph, Node, NodeId};

fn arb_regions() -> impl Strategy<Value = FxHashSet<Region>> {
    prop::collection::vec(arb_region(), 1..4).prop_map(|regions| regions.into_iter().collect())
}

fn arb_nodes() -> impl Strategy<Value = Vec<(Fix, FxHashSet<Region>)>> {
    prop::collection::vec((any::<Fix>(), arb_regions()), 1..12)
}

fn graph_of(nodes: &[(Fix, FxHashSet<Region>)]) -> ConflictGraph {
    let mut graph = ConflictGraph::new(true);
    for (fix, regions) in nodes {
        graph.add_node(Node::new(
            fix.clone(),
            FxHashSet::default(),
            regions.clone(),
            None,
        ));
    }
    graph
}

/// Maps every location to a fixed region set, like a registry over a module
/// where each declaration has a known set of users.
struct FakeRegistry(FxHashMap<Location, FxHashSet<Region>>);

impl RegionRegistry for FakeRegistry {
    fn impacted_regions(&self, location: &Location) -> Option<FxHashSet<Region>> {
        self.0.get(location).cloned()
    }

    fn impacted_regions_by_use(&self, location: &Location) -> Option<FxHashSet<Region>> {
        self.impacted_regions(location)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn color_classes_are_disjoint(nodes in arb_nodes()) {
        let graph = graph_of(&nodes);
        let groups = graph.groups();

        let covered: FxHashSet<NodeId> = groups.iter().flatten().copied().collect();
        prop_assert_eq!(covered.len(), graph.len());
        prop_assert_eq!(groups.iter().map(Vec::len).sum::<usize>(), graph.len());

        for group in &groups {
            prop_assert!(!group.is_empty());
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    prop_assert!(
                        !graph[*a].conflicts_with(&graph[*b]),
                        "{} and {} share a group",
                        graph[*a].root,
                        graph[*b].root
                    );
                }
            }
        }
    }

    #[test]
    fn coloring_stays_within_degree_bound(nodes in arb_nodes()) {
        let graph = graph_of(&nodes);
        let mut degree: FxHashMap<NodeId, usize> = FxHashMap::default();
        for (a, b) in graph.conflicts() {
            *degree.entry(a).or_default() += 1;
            *degree.entry(b).or_default() += 1;
        }
        let max_degree = degree.values().copied().max().unwrap_or(0);
        prop_assert!(graph.groups().len() <= max_degree + 1);
    }

    #[test]
    fn injection_leaves_no_stale_impacts(
        cached in arb_nodes(),
        injected in prop::collection::vec((any::<Fix>(), arb_regions()), 1..3),
    ) {
        let mut cache = ImpactCache::new();
        cache.update_cache_state(
            cached
                .iter()
                .map(|(fix, regions)| Impact::new(fix.clone(), regions.clone())),
        );
        let registry = FakeRegistry(
            injected
                .iter()
                .map(|(fix, regions)| (fix.location().clone(), regions.clone()))
                .collect(),
        );
        let fixes: Vec<Fix> = injected.iter().map(|(fix, _)| fix.clone()).collect();
        let touched: FxHashSet<Region> = fixes
            .iter()
            .filter_map(|fix| registry.impacted_regions(fix.location()))
            .flatten()
            .collect();
        let before: Vec<Impact> = cache.impacts().cloned().collect();

        cache.update_impacts_after_injection(&fixes, &registry);

        for impact in cache.impacts() {
            prop_assert!(impact.regions.is_disjoint(&touched));
            prop_assert!(!fixes.contains(&impact.fix));
        }
        // Entries away from the injection survive.
        for impact in before {
            if impact.regions.is_disjoint(&touched) && !fixes.contains(&impact.fix) {
                prop_assert!(!cache.is_unknown(&impact.fix));
            }
        }
    }

    #[test]
    fn downstream_bounds_are_ordered(
        impacts in prop::collection::vec((any::<Fix>(), 0usize..4, any::<Option<Fix>>()), 1..8),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 1..5),
    ) {
        let fixes: Vec<Fix> = impacts.iter().map(|(fix, _, _)| fix.clone()).collect();
        let cache = DownstreamImpactCache::from_impacts(impacts.into_iter().map(
            |(fix, triggered, resolving)| {
                let mut impact = Impact::new(fix, FxHashSet::default());
                for i in 0..triggered {
                    let mut error = CheckError::new(
                        "DEREFERENCE_NULLABLE",
                        format!("dereference {i}"),
                        Region::new("Downstream", "use()"),
                        i as u32,
                    );
                    if let Some(resolving) = &resolving {
                        error = error.with_fix(resolving.clone());
                    }
                    impact.triggered_errors.push(error);
                }
                impact
            },
        ));
        let tree: FxHashSet<Fix> = picks.iter().map(|pick| pick.get(&fixes).clone()).collect();

        let lower = cache.lower_bound(&tree);
        let upper = cache.upper_bound(&tree);
        prop_assert!(0 <= lower);
        prop_assert!(lower <= upper);
        for fix in &tree {
            prop_assert!(cache.effect(fix, &tree) <= lower);
        }
    }
}
