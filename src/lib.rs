//! Library for building a whole-program call graph from compiled
//! LLVM modules. Indirect call sites (calls through function-valued
//! variables, struct fields or arguments) are resolved to concrete
//! target functions wherever the collected facts allow it.\
//! \
//! The pipeline is strictly staged: load modules, collect facts,
//! build edges, resolve indirect edges, emit the result.
//!

// #![deny(rust_2018_idioms)]
// #![deny(missing_docs)]


pub mod inp;
pub mod ir;
pub mod state;
pub mod graph;
pub mod output;

mod collect;
mod resolve;

pub use graph::CallGraph;
pub use state::State;




/*      ██████╗ ██████╗  ██████╗ ████████╗ ██████╗       */
/*      ██╔══██╗██╔══██╗██╔═══██╗╚══██╔══╝██╔═══██╗      */
/*      ██████╔╝██████╔╝██║   ██║   ██║   ██║   ██║      */
/*      ██╔═══╝ ██╔══██╗██║   ██║   ██║   ██║   ██║      */
/*      ██║     ██║  ██║╚██████╔╝   ██║   ╚██████╔╝      */
/*      ╚═╝     ╚═╝  ╚═╝ ╚═════╝    ╚═╝    ╚═════╝       */
/*     ████████████████████████████████████████████╗     */
/*     ╚═══════════════════════════════════════════╝     */

///
/// One function's signature, as collected from a module. Declarations
/// (functions without a body) are never recorded.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionProto
{
    pub module:      String,
    pub name:        String,
    pub return_type: String,
    pub param_types: Vec<String>,
    /// Line of the definition in the source; `0` when the module
    /// carries no debug metadata.
    pub def_line:    u32,
}











/*      ███████╗ █████╗  ██████╗████████╗███████╗      */
/*      ██╔════╝██╔══██╗██╔════╝╚══██╔══╝██╔════╝      */
/*      █████╗  ███████║██║        ██║   ███████╗      */
/*      ██╔══╝  ██╔══██║██║        ██║   ╚════██║      */
/*      ██║     ██║  ██║╚██████╗   ██║   ███████║      */
/*      ╚═╝     ╚═╝  ╚═╝ ╚═════╝   ╚═╝   ╚══════╝      */
/*     ██████████████████████████████████████████╗     */
/*     ╚═════════════════════════════════════════╝     */

/// Name recorded as the setter of a function pointer that is
/// initialised at global scope rather than inside a function body.
pub const GLOBAL_SETTER: &str = "global";

///
/// A place where a function's address is stored into a named location:
/// a global initialiser, a struct-field initialiser, or a store inside
/// a function body.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FpSetting
{
    pub module:       String,
    /// Enclosing function, or [`GLOBAL_SETTER`] for initialisers.
    pub setter:       String,
    /// The local or global being written.
    pub var_name:     String,
    /// Empty when the write does not target a struct field.
    pub struct_type:  String,
    /// Field index inside `struct_type`; `0` when `struct_type` is
    /// empty. This is an index, never a byte offset.
    pub field_offset: usize,
    /// The function whose address is taken.
    pub func_name:    String,
    pub line:         u32,
}


/// A function address passed as an argument of a direct call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FpArgPass
{
    pub module:      String,
    pub caller:      String,
    pub callee:      String,
    pub passed_func: String,
    pub arg_index:   usize,
    pub line:        u32,
}











/*      ██████╗ ██╗███████╗██████╗  █████╗ ████████╗ ██████╗██╗  ██╗      */
/*      ██╔══██╗██║██╔════╝██╔══██╗██╔══██╗╚══██╔══╝██╔════╝██║  ██║      */
/*      ██║  ██║██║███████╗██████╔╝███████║   ██║   ██║     ███████║      */
/*      ██║  ██║██║╚════██║██╔═══╝ ██╔══██║   ██║   ██║     ██╔══██║      */
/*      ██████╔╝██║███████║██║     ██║  ██║   ██║   ╚██████╗██║  ██║      */
/*      ╚═════╝ ╚═╝╚══════╝╚═╝     ╚═╝  ╚═╝   ╚═╝    ╚═════╝╚═╝  ╚═╝      */
/*     ████████████████████████████████████████████████████████╗      */
/*     ╚═══════════════════════════════════════════════════════╝      */
use core::fmt;

///
/// How an indirect call obtains its target at runtime.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch
{
    /// Loaded from a stack slot of the calling function.
    LocalVar(String),
    /// Loaded from (or a direct reference to) a global variable.
    GlobalVar(String),
    /// Loaded from a field of a struct instance.
    StructField
    {
        struct_type:  String,
        /// Field index, never a byte offset.
        field_offset: usize,
        /// The instance the field was read from. Kept for diagnostics;
        /// matching ignores it so that one initialised global can
        /// drive every call site of the same struct type.
        base_var:     String,
    },
    /// The calling function's n-th parameter.
    Parameter(usize),
    /// None of the recognised patterns; the edge stays unresolved.
    Unknown,
}

impl fmt::Display for Dispatch
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        match self
        {
            Dispatch::LocalVar(v)  => write!(f, "local variable `{}`", v),
            Dispatch::GlobalVar(v) => write!(f, "global variable `{}`", v),
            Dispatch::StructField { struct_type, field_offset, base_var } =>
                write!(f, "field {} of `{}` (via `{}`)", field_offset, struct_type, base_var),
            Dispatch::Parameter(i) => write!(f, "parameter #{}", i),
            Dispatch::Unknown      => f.write_str("unknown"),
        }
    }
}











/*      ███████╗██╗████████╗███████╗███████╗      */
/*      ██╔════╝██║╚══██╔══╝██╔════╝██╔════╝      */
/*      ███████╗██║   ██║   █████╗  ███████╗      */
/*      ╚════██║██║   ██║   ██╔══╝  ╚════██║      */
/*      ███████║██║   ██║   ███████╗███████║      */
/*      ╚══════╝╚═╝   ╚═╝   ╚══════╝╚══════╝      */
/*     █████████████████████████████████████╗     */
/*     ╚════════════════════════════════════╝     */

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallTarget
{
    Direct(String),
    Indirect(Dispatch),
}

/// A call instruction observed during collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSite
{
    pub module: String,
    pub caller: String,
    pub line:   u32,
    pub target: CallTarget,
}











/*      ███████╗██████╗  ██████╗ ███████╗███████╗      */
/*      ██╔════╝██╔══██╗██╔════╝ ██╔════╝██╔════╝      */
/*      █████╗  ██║  ██║██║  ███╗█████╗  ███████╗      */
/*      ██╔══╝  ██║  ██║██║   ██║██╔══╝  ╚════██║      */
/*      ███████╗██████╔╝╚██████╔╝███████╗███████║      */
/*      ╚══════╝╚═════╝  ╚═════╝ ╚══════╝╚══════╝      */
/*     ██████████████████████████████████████████╗     */
/*     ╚═════════════════════════════════════════╝     */

///
/// Target of a call edge. Direct callees are known at collection time
/// and are immutable. Indirect callees start out `Unresolved` and may
/// be narrowed to `Resolved` exactly once; no resolved edge is ever
/// rewritten again.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callee
{
    Direct(String),
    Resolved(String),
    Unresolved,
}

impl Callee
{
    pub fn name(&self) -> Option<&str>
    {
        match self
        {
            Callee::Direct(n)   => Some(n),
            Callee::Resolved(n) => Some(n),
            Callee::Unresolved  => None,
        }
    }
}

impl fmt::Display for Callee
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        match self
        {
            Callee::Direct(n)   => f.write_str(n),
            Callee::Resolved(n) => f.write_str(n),
            Callee::Unresolved  => f.write_str("[indirect]"),
        }
    }
}


/// An edge of the call graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallEdge
{
    pub module:   String,
    pub caller:   String,
    pub callee:   Callee,
    pub line:     u32,
    /// `Some` for indirect edges; carries the dispatch-site attributes
    /// the resolver matches on.
    pub dispatch: Option<Dispatch>,
}

impl CallEdge
{
    pub fn is_indirect(&self) -> bool
    {
        self.dispatch.is_some()
    }

    pub fn is_resolved(&self) -> bool
    {
        !matches!(self.callee, Callee::Unresolved)
    }

    /// The variable the dispatch reads from, if any.
    pub fn var_name(&self) -> Option<&str>
    {
        match self.dispatch.as_ref()?
        {
            Dispatch::LocalVar(v)                  => Some(v),
            Dispatch::GlobalVar(v)                 => Some(v),
            Dispatch::StructField { base_var, .. } => Some(base_var),
            _                                      => None,
        }
    }

    pub fn field_offset(&self) -> Option<usize>
    {
        match self.dispatch.as_ref()?
        {
            Dispatch::StructField { field_offset, .. } => Some(*field_offset),
            _                                          => None,
        }
    }

    pub fn arg_index(&self) -> Option<usize>
    {
        match self.dispatch.as_ref()?
        {
            Dispatch::Parameter(i) => Some(*i),
            _                      => None,
        }
    }
}


#[cfg(test)]
mod tests
{
    use super::*;

    fn edge(callee: Callee, dispatch: Option<Dispatch>) -> CallEdge
    {
        CallEdge
        {
            module:   "m.ll".to_string(),
            caller:   "f".to_string(),
            callee,
            line:     0,
            dispatch,
        }
    }

    #[test]
    fn unresolved_callee_displays_as_the_indirect_marker()
    {
        assert_eq!(Callee::Direct("foo".to_string()).to_string(), "foo");
        assert_eq!(Callee::Resolved("bar".to_string()).to_string(), "bar");
        assert_eq!(Callee::Unresolved.to_string(), "[indirect]");
    }

    #[test]
    fn callee_name_is_none_only_when_unresolved()
    {
        assert_eq!(Callee::Direct("foo".to_string()).name(), Some("foo"));
        assert_eq!(Callee::Resolved("bar".to_string()).name(), Some("bar"));
        assert_eq!(Callee::Unresolved.name(), None);
    }

    #[test]
    fn dispatch_attributes_lift_into_the_edge_accessors()
    {
        let local = edge(Callee::Unresolved, Some(Dispatch::LocalVar("fp".into())));
        assert_eq!(local.var_name(), Some("fp"));
        assert_eq!(local.field_offset(), None);
        assert_eq!(local.arg_index(), None);

        let global = edge(Callee::Unresolved, Some(Dispatch::GlobalVar("sfp".into())));
        assert_eq!(global.var_name(), Some("sfp"));

        let field = edge(
            Callee::Unresolved,
            Some(Dispatch::StructField {
                struct_type:  "struct.ops".into(),
                field_offset: 2,
                base_var:     "i_op".into(),
            }),
        );
        assert_eq!(field.var_name(), Some("i_op"));
        assert_eq!(field.field_offset(), Some(2));
        assert_eq!(field.arg_index(), None);

        let param = edge(Callee::Unresolved, Some(Dispatch::Parameter(1)));
        assert_eq!(param.arg_index(), Some(1));
        assert_eq!(param.var_name(), None);
        assert_eq!(param.field_offset(), None);
    }

    #[test]
    fn direct_edges_have_no_dispatch_attributes()
    {
        let direct = edge(Callee::Direct("g".into()), None);
        assert!(!direct.is_indirect());
        assert!(direct.is_resolved());
        assert_eq!(direct.var_name(), None);
        assert_eq!(direct.field_offset(), None);
        assert_eq!(direct.arg_index(), None);
    }
}
