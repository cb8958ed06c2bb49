
/*      ███████╗████████╗ █████╗ ████████╗███████╗       */
/*      ██╔════╝╚══██╔══╝██╔══██╗╚══██╔══╝██╔════╝       */
/*      ███████╗   ██║   ███████║   ██║   █████╗         */
/*      ╚════██║   ██║   ██╔══██║   ██║   ██╔══╝         */
/*      ███████║   ██║   ██║  ██║   ██║   ███████╗       */
/*      ╚══════╝   ╚═╝   ╚═╝  ╚═╝   ╚═╝   ╚══════╝       */
/*     ███████████████████████████████████████████╗      */
/*     ╚══════════════════════════════════════════╝      */

use std::collections::HashSet;

use log::debug;

use crate as c; // call-graph-lib
use crate::graph::CallGraph;


/// Dedup key for settings: `(module, func_name, line, field_offset,
/// var_name)`. A re-observation of an identical setting is silently
/// dropped.
type SettingKey = (String, String, u32, usize, String);


///
/// The analysis context: every fact table and the call graph, threaded
/// through all stages of the run. Facts are appended during collection
/// and immutable afterwards; only the graph's indirect edges change,
/// and only in the resolver. Everything is released together at the
/// end of the run.
///
/// The IR handles themselves are *not* owned here — the loader keeps
/// them alive, and no reference into an IR object survives beyond the
/// collector's return.
///
#[derive(Clone, Debug, Default)]
pub struct State
{
    pub protos:         Vec<c::FunctionProto>,
    pub settings:       Vec<c::FpSetting>,
    pub arg_passes:     Vec<c::FpArgPass>,
    pub sites:          Vec<c::CallSite>,

    pub graph:          CallGraph,

    seen_settings:      HashSet<SettingKey>,
}


impl State
{
    /// All tables empty.
    pub fn empty() -> Self
    {
        State
        {
            protos:         Vec::new(),
            settings:       Vec::new(),
            arg_passes:     Vec::new(),
            sites:          Vec::new(),
            graph:          CallGraph::new(),
            seen_settings:  HashSet::new(),
        }
    }


    ///
    /// Append a setting unless an identical one was already recorded.
    ///
    /// Modified fields:
    /// - `settings`
    /// - `seen_settings`
    ///
    pub(crate) fn record_setting(&mut self, s: c::FpSetting)
    {
        let key: SettingKey = (
            s.module.clone(),
            s.func_name.clone(),
            s.line,
            s.field_offset,
            s.var_name.clone(),
        );
        if !self.seen_settings.insert(key)
        {
            return; // already processed
        }

        debug!(
            "[debug] function pointer setting: `{}` -> `{}` (setter `{}`, struct `{}`, offset {}, line {})",
            s.func_name, s.var_name, s.setter, s.struct_type, s.field_offset, s.line
        );
        self.settings.push(s);
    }
}
