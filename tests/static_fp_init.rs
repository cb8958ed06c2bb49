//! Static function pointer initialisers: a scalar global holding a
//! function, and a struct-typed global acting as a vtable.

mod common;

use call_graph_lib::{Callee, Dispatch, GLOBAL_SETTER};

const STATIC_FP_INIT: &str = r#"
%struct.inode_operations = type { void ()*, void ()* }
%struct.inode = type { %struct.inode_operations* }

@iops = internal global %struct.inode_operations { void ()* @foo, void ()* @bar }
@sfp = internal global void ()* @baz

define internal void @foo() {
entry:
  ret void
}

define internal void @bar() {
entry:
  ret void
}

define internal void @baz() {
entry:
  ret void
}

define internal void @test_func(%struct.inode* %inode) {
entry:
  %i_op_ptr = getelementptr inbounds %struct.inode, %struct.inode* %inode, i32 0, i32 0
  %i_op = load %struct.inode_operations*, %struct.inode_operations** %i_op_ptr
  %foo_ptr = getelementptr inbounds %struct.inode_operations, %struct.inode_operations* %i_op, i32 0, i32 0
  %foo_fp = load void ()*, void ()** %foo_ptr
  call void %foo_fp()
  %bar_ptr = getelementptr inbounds %struct.inode_operations, %struct.inode_operations* %i_op, i32 0, i32 1
  %bar_fp = load void ()*, void ()** %bar_ptr
  call void %bar_fp()
  ret void
}

define i32 @main() {
entry:
  %i = alloca %struct.inode
  %sfp_fp = load void ()*, void ()** @sfp
  call void @test_func(%struct.inode* %i)
  call void %sfp_fp()
  ret i32 0
}
"#;


#[test]
fn struct_initialiser_is_recorded_per_field_index()
{
    let state = common::analyze(&[("static.ll", STATIC_FP_INIT)]);

    let iops: Vec<_> = state
        .settings
        .iter()
        .filter(|s| s.var_name == "iops")
        .collect();
    assert_eq!(iops.len(), 2);
    assert!(iops.iter().all(|s| s.setter == GLOBAL_SETTER));
    assert!(iops.iter().all(|s| s.struct_type == "struct.inode_operations"));
    assert_eq!((iops[0].field_offset, iops[0].func_name.as_str()), (0, "foo"));
    assert_eq!((iops[1].field_offset, iops[1].func_name.as_str()), (1, "bar"));

    let sfp: Vec<_> = state
        .settings
        .iter()
        .filter(|s| s.var_name == "sfp")
        .collect();
    assert_eq!(sfp.len(), 1);
    assert_eq!(sfp[0].func_name, "baz");
    assert_eq!(sfp[0].struct_type, "");
    assert_eq!(sfp[0].field_offset, 0);
}

#[test]
fn vtable_calls_resolve_through_struct_fields()
{
    let state = common::analyze(&[("static.ll", STATIC_FP_INIT)]);

    let edges: Vec<_> = state
        .graph
        .module_edges("static.ll")
        .iter()
        .filter(|e| e.caller == "test_func")
        .collect();
    assert_eq!(edges.len(), 2);

    assert_eq!(edges[0].callee, Callee::Resolved("foo".into()));
    assert_eq!(edges[0].field_offset(), Some(0));
    assert!(matches!(
        edges[0].dispatch,
        Some(Dispatch::StructField { ref struct_type, .. })
            if struct_type == "struct.inode_operations"
    ));

    assert_eq!(edges[1].callee, Callee::Resolved("bar".into()));
    assert_eq!(edges[1].field_offset(), Some(1));
}

#[test]
fn scalar_global_call_resolves_through_the_variable()
{
    let state = common::analyze(&[("static.ll", STATIC_FP_INIT)]);

    let main_edges = state.graph.module_edges("static.ll");
    let main_edges: Vec<_> = main_edges.iter().filter(|e| e.caller == "main").collect();
    assert_eq!(main_edges.len(), 2);

    assert_eq!(main_edges[0].callee, Callee::Direct("test_func".into()));
    assert!(!main_edges[0].is_indirect());

    assert_eq!(main_edges[1].callee, Callee::Resolved("baz".into()));
    assert_eq!(main_edges[1].var_name(), Some("sfp"));
    assert!(matches!(
        main_edges[1].dispatch,
        Some(Dispatch::GlobalVar(ref v)) if v == "sfp"
    ));
}

#[test]
fn resolved_indirect_edges_carry_the_marker_in_the_report()
{
    let state = common::analyze(&[("static.ll", STATIC_FP_INIT)]);
    let report = state.report_string(false);

    assert!(report.contains("static.ll: test_func -> foo [line 0] [indirect]"));
    assert!(report.contains("static.ll: test_func -> bar [line 0] [indirect]"));
    assert!(report.contains("static.ll: main -> test_func [line 0]"));
    assert!(report.contains("static.ll: main -> baz [line 0] [indirect]"));
}
