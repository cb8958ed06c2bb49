
/*      ██╗███╗   ██╗██████╗ ██╗██████╗ ███████╗ ██████╗████████╗       */
/*      ██║████╗  ██║██╔══██╗██║██╔══██╗██╔════╝██╔════╝╚══██╔══╝       */
/*      ██║██╔██╗ ██║██║  ██║██║██████╔╝█████╗  ██║        ██║          */
/*      ██║██║╚██╗██║██║  ██║██║██╔══██╗██╔══╝  ██║        ██║          */
/*      ██║██║ ╚████║██████╔╝██║██║  ██║███████╗╚██████╗   ██║          */
/*      ╚═╝╚═╝  ╚═══╝╚═════╝ ╚═╝╚═╝  ╚═╝╚══════╝ ╚═════╝   ╚═╝          */
/*     ██████████████████████████████████████████████████████████╗      */
/*     ╚═════════════════════════════════════════════════════════╝      */

use log::debug;

use crate as c;
use crate::state::State;


impl State
{
    ///
    /// Rewrite unresolved indirect edges against the fact tables.
    /// Three rules, tried in this order, the first match winning:
    ///
    /// - a local/global variable dispatch matches settings with the
    ///   same module, the same variable and no struct type;
    /// - a struct-field dispatch matches settings with the same
    ///   module, struct type and field index;
    /// - a parameter dispatch in caller `C` matches argument passings
    ///   whose callee is `C` at the same argument position.
    ///
    /// Several candidates fan out into one edge per distinct target,
    /// ordered lexicographically. No match leaves the edge unresolved;
    /// edges resolved earlier are never touched again, so running this
    /// twice changes nothing.
    ///
    /// Modified fields:
    /// - `graph`
    ///
    pub fn resolve(&mut self)
    {
        let mut graph = std::mem::take(&mut self.graph);

        for (module, edges) in graph.edges.iter_mut()
        {
            let drained: Vec<c::CallEdge> = std::mem::take(edges);
            for edge in drained
            {
                if edge.is_resolved()
                {
                    edges.push(edge);
                    continue;
                }

                let candidates = self.candidates_for(module, &edge);
                if candidates.is_empty()
                {
                    debug!(
                        "[debug] unresolved indirect call in `{}` at line {}",
                        edge.caller, edge.line
                    );
                    edges.push(edge);
                    continue;
                }

                debug!(
                    "[debug] resolved indirect call in `{}` at line {} -> {}",
                    edge.caller,
                    edge.line,
                    candidates.join(", ")
                );
                for target in candidates
                {
                    edges.push(narrow(edge.clone(), target));
                }
            }
        }

        self.graph = graph;
    }


    /// Distinct targets for one unresolved edge, lexicographically
    /// ordered. Empty when no rule matches.
    fn candidates_for(&self, module: &str, edge: &c::CallEdge) -> Vec<String>
    {
        let dispatch = edge
            .dispatch
            .as_ref()
            .expect("BUG: unresolved edge without a dispatch");

        let mut out: Vec<String> = match dispatch
        {
            c::Dispatch::LocalVar(v) | c::Dispatch::GlobalVar(v) => self
                .settings
                .iter()
                .filter(|s| s.module == module && s.var_name == *v && s.struct_type.is_empty())
                .map(|s| s.func_name.clone())
                .collect(),

            c::Dispatch::StructField { struct_type, field_offset, .. } => self
                .settings
                .iter()
                .filter(|s| {
                    s.module == module
                        && s.struct_type == *struct_type
                        && s.field_offset == *field_offset
                })
                .map(|s| s.func_name.clone())
                .collect(),

            // Argument passings are matched on the callee name alone:
            // the callback may well be handed over from another module.
            c::Dispatch::Parameter(i) => self
                .arg_passes
                .iter()
                .filter(|p| p.callee == edge.caller && p.arg_index == *i)
                .map(|p| p.passed_func.clone())
                .collect(),

            c::Dispatch::Unknown => Vec::new(),
        };

        out.sort();
        out.dedup();
        out
    }
}


fn narrow(mut edge: c::CallEdge, target: String) -> c::CallEdge
{
    assert!(
        !edge.is_resolved(),
        "BUG: rewriting an already-resolved edge ({} -> {})",
        edge.caller,
        edge.callee
    );
    edge.callee = c::Callee::Resolved(target);
    edge
}
