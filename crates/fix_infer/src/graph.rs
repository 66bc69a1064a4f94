// ==============================================================================
// Conflict Graph
// ==============================================================================
//
// One node per fix tree under test. Two nodes conflict when their impacted
// regions overlap: injecting them in the same build would mix their effects.
// A greedy first-fit coloring (in node id order) splits the nodes into color
// classes, and each class is measured with a single build.

use std::ops::{Index, IndexMut};

use derive_more::Debug;
use fix_model::{CheckError, Fix, Region};
use la_arena::{Arena, Idx};
use petgraph::graph::{NodeIndex, UnGraph};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::report::ReportId;

pub type NodeId = Idx<Node>;

#[derive(Debug, Clone)]
pub struct Node {
    pub root: Fix,
    /// Fixes injected together when this node is measured. Contains `root`.
    #[debug(skip)]
    pub tree: FxHashSet<Fix>,
    #[debug(skip)]
    pub regions: FxHashSet<Region>,
    /// The report this node measures for, if any.
    pub report: Option<ReportId>,

    pub effect: i32,
    pub triggered_errors: Vec<CheckError>,
    pub resolved_errors: Vec<CheckError>,
    /// In-module fixes for the triggered errors that are not in `tree` yet.
    pub triggered_fixes: Vec<Fix>,
    /// The last measurement surfaced fixes outside `tree`, so the tree can
    /// grow by another round.
    pub changed: bool,
    pub finished: bool,
}

impl Node {
    pub fn new(
        root: Fix,
        tree: FxHashSet<Fix>,
        regions: FxHashSet<Region>,
        report: Option<ReportId>,
    ) -> Self {
        let mut tree = tree;
        tree.insert(root.clone());
        Self {
            root,
            tree,
            regions,
            report,
            effect: 0,
            triggered_errors: Vec::new(),
            resolved_errors: Vec::new(),
            triggered_fixes: Vec::new(),
            changed: false,
            finished: false,
        }
    }

    pub fn conflicts_with(&self, other: &Node) -> bool {
        !self.regions.is_disjoint(&other.regions)
    }
}

#[derive(Debug, Default)]
pub struct ConflictGraph {
    nodes: Arena<Node>,
    optimized: bool,
}

impl ConflictGraph {
    pub fn new(optimized: bool) -> Self {
        Self {
            nodes: Arena::default(),
            optimized,
        }
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.alloc(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Conflicting node pairs, found with pairwise tests in parallel.
    pub fn conflicts(&self) -> Vec<(NodeId, NodeId)> {
        let nodes: Vec<(NodeId, &Node)> = self.nodes.iter().collect();
        (0..nodes.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                let nodes = &nodes;
                (i + 1..nodes.len())
                    .filter(move |&j| nodes[i].1.conflicts_with(nodes[j].1))
                    .map(move |j| (nodes[i].0, nodes[j].0))
            })
            .collect()
    }

    /// Groups of nodes that can be injected in one build. Without
    /// optimization every node gets a build of its own.
    pub fn groups(&self) -> Vec<Vec<NodeId>> {
        if !self.optimized {
            return self.nodes.iter().map(|(id, _)| vec![id]).collect();
        }

        let mut graph: UnGraph<NodeId, ()> = UnGraph::with_capacity(self.nodes.len(), 0);
        let indices: FxHashMap<NodeId, NodeIndex> = self
            .nodes
            .iter()
            .map(|(id, _)| (id, graph.add_node(id)))
            .collect();
        for (a, b) in self.conflicts() {
            graph.add_edge(indices[&a], indices[&b], ());
        }

        let colors = greedy_coloring(&graph);
        let count = colors.iter().max().map_or(0, |max| max + 1);
        let mut groups: Vec<Vec<NodeId>> = vec![Vec::new(); count];
        for (idx, color) in colors.into_iter().enumerate() {
            groups[color].push(graph[NodeIndex::new(idx)]);
        }
        log::debug!(
            "colored {} nodes into {} groups",
            self.nodes.len(),
            groups.len()
        );
        groups
    }
}

/// First-fit coloring in node index order. Uses at most `max degree + 1`
/// colors.
pub fn greedy_coloring<N, E>(graph: &UnGraph<N, E>) -> Vec<usize> {
    let mut colors: Vec<Option<usize>> = vec![None; graph.node_count()];
    for node in graph.node_indices() {
        let taken: FxHashSet<usize> = graph
            .neighbors(node)
            .filter_map(|neighbor| colors[neighbor.index()])
            .collect();
        let color = (0..).find(|c| !taken.contains(c)).unwrap_or_default();
        colors[node.index()] = Some(color);
    }
    colors.into_iter().map(Option::unwrap_or_default).collect()
}

impl Index<NodeId> for ConflictGraph {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for ConflictGraph {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fix_model::{Change, Location, DEFAULT_ANNOTATION};

    fn node(location: Location, regions: &[(&str, &str)]) -> Node {
        let fix = Fix::new(Change::add(location, DEFAULT_ANNOTATION), "TEST", true);
        let regions = regions.iter().map(|(c, m)| Region::new(*c, *m)).collect();
        Node::new(fix, FxHashSet::default(), regions, None)
    }

    #[test]
    fn disjoint_fixes_share_a_build() {
        let mut graph = ConflictGraph::new(true);
        graph.add_node(node(
            Location::parameter("Foo", "m(int)", 0),
            &[("Foo", "m(int)"), ("Baz", "call()")],
        ));
        graph.add_node(node(
            Location::method("Bar", "n()"),
            &[("Bar", "n()"), ("Qux", "use()")],
        ));
        assert!(graph.conflicts().is_empty());
        assert_eq!(graph.groups().len(), 1);
    }

    #[test]
    fn overlapping_fixes_are_split() {
        let mut graph = ConflictGraph::new(true);
        let a = graph.add_node(node(
            Location::method("Foo", "a()"),
            &[("Foo", "a()"), ("Baz", "run()")],
        ));
        let b = graph.add_node(node(
            Location::method("Foo", "b()"),
            &[("Foo", "b()"), ("Baz", "run()")],
        ));
        let c = graph.add_node(node(Location::method("Foo", "c()"), &[("Foo", "c()")]));

        assert_eq!(graph.conflicts(), vec![(a, b)]);
        let groups = graph.groups();
        assert_eq!(groups, vec![vec![a, c], vec![b]]);
    }

    #[test]
    fn unoptimized_graph_uses_singletons() {
        let mut graph = ConflictGraph::new(false);
        graph.add_node(node(Location::method("Foo", "a()"), &[("Foo", "a()")]));
        graph.add_node(node(Location::method("Foo", "b()"), &[("Foo", "b()")]));
        assert_eq!(graph.groups().len(), 2);
    }

    #[test]
    fn root_is_part_of_the_tree() {
        let n = node(Location::method("Foo", "a()"), &[]);
        assert!(n.tree.contains(&n.root));
    }
}
