use call_graph_lib as cg;

/// Run the full pipeline (collect, build, resolve) over in-memory
/// textual IR modules.
#[allow(dead_code)]
pub fn analyze(modules: &[(&str, &str)]) -> cg::State
{
    let mut state = cg::State::empty();
    for (name, text) in modules
    {
        let handle = cg::ir::parse(text.as_bytes(), name)
            .unwrap_or_else(|e| panic!("fixture `{}` must parse: {}", name, e));
        let module = cg::inp::LoadedModule {
            name: name.to_string(),
            handle,
        };
        state.collect(&module);
    }
    state.build_edges();
    state.resolve();
    state
}

/// `(caller, callee)` pairs of every edge with a concrete target, in
/// graph order.
#[allow(dead_code)]
pub fn resolved_pairs<'a>(state: &'a cg::State, module: &str) -> Vec<(&'a str, &'a str)>
{
    state
        .graph
        .module_edges(module)
        .iter()
        .filter_map(|e| Some((e.caller.as_str(), e.callee.name()?)))
        .collect()
}
