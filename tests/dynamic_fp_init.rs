//! Function pointers assigned inside function bodies: branch-dependent
//! stores into a local fan out to every stored target, and identical
//! re-observations of a setting are dropped.

mod common;

use call_graph_lib::{Callee, Dispatch};

const DYNAMIC_FP_INIT: &str = r#"
define internal void @foo() {
entry:
  ret void
}

define internal void @bar() {
entry:
  ret void
}

define i32 @main(i32 %argc, i8** %argv) {
entry:
  %fp = alloca void ()*
  %cmp = icmp eq i32 %argc, 1
  br i1 %cmp, label %then, label %else

then:
  store void ()* @foo, void ()** %fp
  br label %done

else:
  store void ()* @bar, void ()** %fp
  br label %done

done:
  %call_fp = load void ()*, void ()** %fp
  call void %call_fp()
  ret i32 0
}
"#;

const REPEATED_STORE: &str = r#"
define internal void @g() {
entry:
  ret void
}

define void @f() {
entry:
  %fp = alloca void ()*
  store void ()* @g, void ()** %fp
  store void ()* @g, void ()** %fp
  %c = load void ()*, void ()** %fp
  call void %c()
  ret void
}
"#;

// the slot is an auto-numbered temporary; it has no value name at all
const UNNAMED_SLOT: &str = r#"
define internal void @g() {
entry:
  ret void
}

define void @f() {
  %1 = alloca void ()*
  store void ()* @g, void ()** %1
  %2 = load void ()*, void ()** %1
  call void %2()
  ret void
}
"#;


#[test]
fn branch_dependent_assignment_fans_out_lexicographically()
{
    let state = common::analyze(&[("dynamic.ll", DYNAMIC_FP_INIT)]);

    let edges = state.graph.module_edges("dynamic.ll");
    assert_eq!(edges.len(), 2);

    // one edge per stored target, `bar` before `foo`
    assert_eq!(edges[0].callee, Callee::Resolved("bar".into()));
    assert_eq!(edges[1].callee, Callee::Resolved("foo".into()));
    for edge in edges
    {
        assert_eq!(edge.caller, "main");
        assert_eq!(edge.var_name(), Some("fp"));
        assert!(matches!(edge.dispatch, Some(Dispatch::LocalVar(ref v)) if v == "fp"));
    }
}

#[test]
fn both_stores_are_recorded_as_settings()
{
    let state = common::analyze(&[("dynamic.ll", DYNAMIC_FP_INIT)]);

    let stored: Vec<&str> = state
        .settings
        .iter()
        .map(|s| s.func_name.as_str())
        .collect();
    assert_eq!(stored, ["foo", "bar"]);
    assert!(state.settings.iter().all(|s| s.setter == "main"));
    assert!(state.settings.iter().all(|s| s.var_name == "fp"));
}

#[test]
fn identical_settings_are_deduplicated()
{
    let state = common::analyze(&[("repeat.ll", REPEATED_STORE)]);

    assert_eq!(state.settings.len(), 1);

    let edges = state.graph.module_edges("repeat.ll");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].callee, Callee::Resolved("g".into()));
}

#[test]
fn assignment_to_an_unnamed_slot_still_resolves()
{
    let state = common::analyze(&[("unnamed.ll", UNNAMED_SLOT)]);

    // setting and dispatch must agree on the key for the nameless slot
    assert_eq!(state.settings.len(), 1);
    let edges = state.graph.module_edges("unnamed.ll");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].callee, Callee::Resolved("g".into()));
    assert_eq!(edges[0].var_name(), Some(state.settings[0].var_name.as_str()));
}
