
/*       ██████╗ ██████╗  █████╗ ██████╗ ██╗  ██╗      */
/*      ██╔════╝ ██╔══██╗██╔══██╗██╔══██╗██║  ██║      */
/*      ██║  ███╗██████╔╝███████║██████╔╝███████║      */
/*      ██║   ██║██╔══██╗██╔══██║██╔═══╝ ██╔══██║      */
/*      ╚██████╔╝██║  ██║██║  ██║██║     ██║  ██║      */
/*       ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚═╝     ╚═╝  ╚═╝      */
/*     ███████████████████████████████████████████╗    */
/*     ╚══════════════════════════════════════════╝    */

use std::collections::{BTreeMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};

use crate as c;
use crate::state::State;


///
/// The call graph, keyed by module name. Each per-module edge list
/// preserves insertion order, which is the IR traversal order of the
/// collector; together with lexicographic fan-out in the resolver this
/// makes two runs over the same input byte-identical.
///
#[derive(Clone, Debug, Default)]
pub struct CallGraph
{
    pub edges: BTreeMap<String, Vec<c::CallEdge>>,
}

impl CallGraph
{
    pub fn new() -> Self
    {
        CallGraph { edges: BTreeMap::new() }
    }

    pub fn push(&mut self, edge: c::CallEdge)
    {
        self.edges.entry(edge.module.clone()).or_default().push(edge);
    }

    pub fn module_edges(&self, module: &str) -> &[c::CallEdge]
    {
        self.edges.get(module).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every edge, module blocks in name order, insertion order inside
    /// each block.
    pub fn iter(&self) -> impl Iterator<Item = &c::CallEdge>
    {
        self.edges.values().flatten()
    }

    pub fn len(&self) -> usize
    {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}


/// Node weight of the materialised graph. `dashed` marks the pseudo
/// node unresolved edges point at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphNode
{
    pub name:   String,
    pub dashed: bool,
}


impl State
{
    ///
    /// Turn each collected call site into a call-graph edge, in IR
    /// traversal order. Direct sites become concrete edges; indirect
    /// sites enter the graph unresolved, carrying their dispatch.
    ///
    /// Modified fields:
    /// - `graph`
    ///
    pub fn build_edges(&mut self)
    {
        for site in &self.sites
        {
            let edge = match &site.target
            {
                c::CallTarget::Direct(callee) => c::CallEdge
                {
                    module:   site.module.clone(),
                    caller:   site.caller.clone(),
                    callee:   c::Callee::Direct(callee.clone()),
                    line:     site.line,
                    dispatch: None,
                },
                c::CallTarget::Indirect(dispatch) => c::CallEdge
                {
                    module:   site.module.clone(),
                    caller:   site.caller.clone(),
                    callee:   c::Callee::Unresolved,
                    line:     site.line,
                    dispatch: Some(dispatch.clone()),
                },
            };
            self.graph.push(edge);
        }
    }


    ///
    /// Materialise the final graph into a `petgraph` digraph: one node
    /// per distinct function name, plus a single dashed `?` node that
    /// every unresolved edge points at. Duplicate `(caller, callee)`
    /// pairs collapse into one edge; the edge weight records whether
    /// the call was indirect.
    ///
    pub fn build_digraph(&self) -> (DiGraph<GraphNode, bool>, BTreeMap<String, NodeIndex>)
    {
        let mut g = DiGraph::new();
        let mut indices: BTreeMap<String, NodeIndex> = BTreeMap::new();
        let mut seen: HashSet<(NodeIndex, NodeIndex, bool)> = HashSet::new();

        let node = |g: &mut DiGraph<GraphNode, bool>,
                        indices: &mut BTreeMap<String, NodeIndex>,
                        name: &str,
                        dashed: bool|
        {
            if let Some(idx) = indices.get(name)
            {
                return *idx;
            }
            let idx = g.add_node(GraphNode { name: name.to_string(), dashed });
            indices.insert(name.to_string(), idx);
            idx
        };

        for edge in self.graph.iter()
        {
            let caller = node(&mut g, &mut indices, &edge.caller, false);

            let (callee, indirect) = match &edge.callee
            {
                c::Callee::Direct(n)   => (node(&mut g, &mut indices, n, false), false),
                c::Callee::Resolved(n) => (node(&mut g, &mut indices, n, false), true),
                c::Callee::Unresolved  => (node(&mut g, &mut indices, "?", true), true),
            };

            if seen.insert((caller, callee, indirect))
            {
                g.add_edge(caller, callee, indirect);
            }
        }

        (g, indices)
    }
}


#[cfg(test)]
mod tests
{
    use super::*;
    use crate::{CallEdge, Callee, Dispatch};

    fn edge(module: &str, caller: &str, callee: Callee, dispatch: Option<Dispatch>) -> CallEdge
    {
        CallEdge
        {
            module: module.to_string(),
            caller: caller.to_string(),
            callee,
            line: 0,
            dispatch,
        }
    }

    #[test]
    fn push_groups_by_module_and_keeps_order()
    {
        let mut graph = CallGraph::new();
        graph.push(edge("b.ll", "main", Callee::Direct("one".into()), None));
        graph.push(edge("a.ll", "main", Callee::Direct("two".into()), None));
        graph.push(edge("b.ll", "main", Callee::Direct("three".into()), None));

        assert_eq!(graph.len(), 3);
        let b: Vec<&str> = graph
            .module_edges("b.ll")
            .iter()
            .map(|e| e.callee.name().unwrap())
            .collect();
        assert_eq!(b, ["one", "three"]);

        // module blocks come out in name order
        let modules: Vec<&String> = graph.edges.keys().collect();
        assert_eq!(modules, ["a.ll", "b.ll"]);
    }

    #[test]
    fn digraph_collapses_duplicates_and_dashes_unresolved()
    {
        let mut state = State::empty();
        state.graph.push(edge("m.ll", "f", Callee::Direct("g".into()), None));
        state.graph.push(edge("m.ll", "f", Callee::Direct("g".into()), None));
        state.graph.push(edge("m.ll", "f", Callee::Unresolved, Some(Dispatch::Unknown)));

        let (g, indices) = state.build_digraph();
        assert_eq!(g.node_count(), 3); // f, g, ?
        assert_eq!(g.edge_count(), 2);
        assert!(g[indices["?"]].dashed);
        assert!(!g[indices["f"]].dashed);
    }
}
