
/*      ██████╗ ███████╗██████╗  ██████╗ ██████╗ ████████╗      */
/*      ██╔══██╗██╔════╝██╔══██╗██╔═══██╗██╔══██╗╚══██╔══╝      */
/*      ██████╔╝█████╗  ██████╔╝██║   ██║██████╔╝   ██║         */
/*      ██╔══██╗██╔══╝  ██╔═══╝ ██║   ██║██╔══██╗   ██║         */
/*      ██║  ██║███████╗██║     ╚██████╔╝██║  ██║   ██║         */
/*      ╚═╝  ╚═╝╚══════╝╚═╝      ╚═════╝ ╚═╝  ╚═╝   ╚═╝         */
/*     ██████████████████████████████████████████████████╗      */
/*     ╚═════════════════════════════════════════════════╝      */

use std::collections::BTreeMap;
use std::{
    io,
    io::Write as _, // to get write_fmt, granting writeln!
};

use crate as c;
use crate::state::State;


impl State
{
    ///
    /// The full textual report: the three fact dumps followed by the
    /// call graph, one line per edge. All grouping goes through
    /// ordered maps and the edge lists keep insertion order, so the
    /// output is byte-identical across runs over the same input.
    ///
    pub fn output_report(&self, mut writer: impl io::Write, verbose: bool) -> io::Result<()>
    {
        self.dump_module_function_map(&mut writer)?;
        self.dump_fp_settings(&mut writer)?;
        self.dump_fp_call_map(&mut writer)?;
        self.dump_call_graph(&mut writer, verbose)
    }

    /// The report as a string; handy for diffing two runs.
    pub fn report_string(&self, verbose: bool) -> String
    {
        let mut buf = Vec::new();
        self.output_report(&mut buf, verbose).expect("UNREACHABLE");
        String::from_utf8(buf).expect("UNREACHABLE")
    }


    fn dump_module_function_map(&self, writer: &mut impl io::Write) -> io::Result<()>
    {
        writeln!(writer, "=== ModuleFunctionMap Debug Dump ===")?;

        let mut by_module: BTreeMap<&str, Vec<&c::FunctionProto>> = BTreeMap::new();
        for p in &self.protos
        {
            by_module.entry(p.module.as_str()).or_default().push(p);
        }

        for (module, protos) in by_module
        {
            writeln!(writer, "Module: {}", module)?;
            for p in protos
            {
                writeln!(
                    writer,
                    "  [{}:{}:{}:{}]",
                    p.name,
                    p.return_type,
                    p.param_types.join(","),
                    p.def_line
                )?;
            }
            writeln!(writer)?;
        }

        writeln!(writer, "=== End of Dump ===")?;
        writeln!(writer)
    }


    fn dump_fp_settings(&self, writer: &mut impl io::Write) -> io::Result<()>
    {
        writeln!(writer, "==== Function Pointer Settings ====")?;

        let mut by_key: BTreeMap<(&str, u32), Vec<&c::FpSetting>> = BTreeMap::new();
        for s in &self.settings
        {
            by_key.entry((s.module.as_str(), s.line)).or_default().push(s);
        }

        for ((module, line), entries) in by_key
        {
            writeln!(writer, "{}:{}", module, line)?;
            for s in entries
            {
                writeln!(
                    writer,
                    "  setter={} struct={} func={} line={} offset={}",
                    s.setter, s.struct_type, s.func_name, s.line, s.field_offset
                )?;
            }
        }

        writeln!(writer, "==== End of Map ====")?;
        writeln!(writer)
    }


    fn dump_fp_call_map(&self, writer: &mut impl io::Write) -> io::Result<()>
    {
        writeln!(writer, "==== Function Pointer Call Map ====")?;

        let mut by_key: BTreeMap<(&str, u32, usize), Vec<&c::FpArgPass>> = BTreeMap::new();
        for p in &self.arg_passes
        {
            by_key
                .entry((p.module.as_str(), p.line, p.arg_index))
                .or_default()
                .push(p);
        }

        for ((module, line, arg), entries) in by_key
        {
            writeln!(writer, "{}:{}:{}", module, line, arg)?;
            for p in entries
            {
                writeln!(
                    writer,
                    "  caller={} callee={} passed={} line={} arg={}",
                    p.caller, p.callee, p.passed_func, p.line, p.arg_index
                )?;
            }
        }

        writeln!(writer, "==== End of Map ====")?;
        writeln!(writer)
    }


    fn dump_call_graph(&self, writer: &mut impl io::Write, verbose: bool) -> io::Result<()>
    {
        writeln!(writer, "==== Call Graph ====")?;

        for edge in self.graph.iter()
        {
            write!(
                writer,
                "{}: {} -> {} [line {}]",
                edge.module, edge.caller, edge.callee, edge.line
            )?;
            if edge.is_indirect() && edge.is_resolved()
            {
                write!(writer, " [indirect]")?;
            }
            writeln!(writer)?;

            if verbose && edge.is_indirect()
            {
                if let Some(dispatch) = &edge.dispatch
                {
                    writeln!(writer, "    dispatch: {}", dispatch)?;
                }
            }
        }

        writeln!(writer, "==== End of Call Graph ====")
    }
}
