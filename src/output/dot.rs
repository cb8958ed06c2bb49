use std::{
    io,
    io::Write as _, // to get write_fmt, granting writeln!
};

use crate::output::escaper::Escaper;
use crate::state::State;




impl State
{
    ///
    /// Render the final graph as Graphviz dot. Function names are
    /// demangled for the labels; the `?` node and the edges of calls
    /// that went through a function pointer are dashed.
    ///
    pub fn output_dot(&self, mut writer: impl io::Write, dc: DotConf) -> io::Result<()>
    {
        let (g, _indices) = self.build_digraph();

        writeln!(writer, "digraph {{")?;
        writeln!(writer, "    node [fontname={} shape=box]", &dc.font)?;

        for (i, node) in g.raw_nodes().iter().enumerate() {
            let node = &node.weight;

            write!(writer, "    {} [label=\"", i,)?;

            let mut esc = Escaper::new(&mut writer);
            write!(esc, "{}", rustc_demangle::demangle(&node.name))?;
            esc.error?;

            write!(writer, "\"")?;

            if node.dashed {
                write!(writer, " style=dashed")?;
            }

            writeln!(writer, "]")?;
        }

        for edge in g.raw_edges() {
            write!(
                writer,
                "    {} -> {}",
                edge.source().index(),
                edge.target().index()
            )?;
            if edge.weight {
                write!(writer, " [style=dashed]")?;
            }
            writeln!(writer)?;
        }

        writeln!(writer, "}}")?;

        Ok(())
    }
}



pub struct DotConf
{
    pub font: String,
}

impl DotConf
{
    pub fn default() -> Self
    {
        DotConf
        {
            font: "monospace".to_string(),
        }
    }
}
