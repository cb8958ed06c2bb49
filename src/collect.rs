//! Fact collection: a per-module scan over the globals and every
//! instruction of every defined function, appending records to the
//! four fact tables. The sub-passes are idempotent and independent of
//! each other; the only requirement is that all of them have run
//! before the edge builder does.

use log::debug;

use llvm_sys::prelude::LLVMValueRef;

use crate as c;
use crate::inp::LoadedModule;
use crate::ir;
use crate::state::State;


impl State
{
    ///
    /// Run every collection sub-pass over one module.
    ///
    /// Modified fields:
    /// - `protos`
    /// - `settings`
    /// - `arg_passes`
    /// - `sites`
    ///
    pub fn collect(&mut self, module: &LoadedModule)
    {
        debug!("[debug] collecting facts from module `{}`", module.name);

        self.collect_function_prototypes(module);
        self.collect_static_fp_settings(module);
        self.collect_dynamic_fp_settings(module);
        self.collect_fp_arg_passes(module);
        self.collect_call_sites(module);
    }


    /// Modified fields:
    /// - `protos`
    fn collect_function_prototypes(&mut self, module: &LoadedModule)
    {
        unsafe
        {
            for f in ir::iter_funcs(module.handle.raw())
            {
                if ir::is_declaration(f)
                {
                    continue;
                }

                let (return_type, param_types) = ir::function_signature(f);
                self.protos.push(c::FunctionProto {
                    module: module.name.clone(),
                    name: ir::value_name(f),
                    return_type,
                    param_types,
                    def_line: ir::debug_line(f),
                });
            }
        }
    }


    ///
    /// Function addresses placed into globals by constant initialisers:
    /// either the whole global is (a cast of) a function reference, or
    /// the global is a constant struct and some of its fields are.
    ///
    /// Modified fields:
    /// - `settings`
    /// - `seen_settings`
    ///
    fn collect_static_fp_settings(&mut self, module: &LoadedModule)
    {
        unsafe
        {
            for gv in ir::iter_globals(module.handle.raw())
            {
                let init = match ir::initializer(gv)
                {
                    Some(init) => init,
                    None       => continue,
                };

                let line = ir::debug_line(gv);
                let var_name = ir::value_name(gv);

                let direct = ir::strip_casts(init);
                if ir::is_function(direct)
                {
                    self.record_setting(c::FpSetting {
                        module:       module.name.clone(),
                        setter:       c::GLOBAL_SETTER.to_string(),
                        var_name,
                        struct_type:  String::new(),
                        field_offset: 0,
                        func_name:    ir::value_name(direct),
                        line,
                    });
                    continue;
                }

                if ir::is_constant_struct(init)
                {
                    let struct_type = ir::struct_type_name(ir::global_value_type(gv))
                        .unwrap_or_else(|| "unknown".to_string());

                    for i in 0..ir::num_operands(init)
                    {
                        let field = ir::strip_casts(ir::operand(init, i));
                        if !ir::is_function(field)
                        {
                            continue;
                        }
                        self.record_setting(c::FpSetting {
                            module:       module.name.clone(),
                            setter:       c::GLOBAL_SETTER.to_string(),
                            var_name:     var_name.clone(),
                            struct_type:  struct_type.clone(),
                            field_offset: i as usize,
                            func_name:    ir::value_name(field),
                            line,
                        });
                    }
                }
            }
        }
    }


    ///
    /// Function addresses stored into locations inside function bodies.
    ///
    /// Modified fields:
    /// - `settings`
    /// - `seen_settings`
    ///
    fn collect_dynamic_fp_settings(&mut self, module: &LoadedModule)
    {
        unsafe
        {
            for f in ir::iter_funcs(module.handle.raw())
            {
                if ir::is_declaration(f)
                {
                    continue;
                }
                let setter = ir::value_name(f);

                for bb in ir::iter_basic_blocks(f)
                {
                    for inst in ir::iter_instructions(bb)
                    {
                        if !ir::is_store(inst)
                        {
                            continue;
                        }

                        let val = ir::strip_casts(ir::store_value(inst));
                        if !ir::is_function(val)
                        {
                            continue;
                        }

                        let ptr = ir::strip_casts(ir::store_pointer(inst));
                        let var_name = ir::local_var_key(ptr);

                        let func_name = ir::value_name(val);
                        let line = ir::debug_line(inst);
                        debug!(
                            "[debug] dynamic function pointer assignment: `{}` -> `{}` in `{}` at line {}",
                            func_name, var_name, setter, line
                        );
                        self.record_setting(c::FpSetting {
                            module:       module.name.clone(),
                            setter:       setter.clone(),
                            var_name,
                            struct_type:  String::new(),
                            field_offset: 0,
                            func_name,
                            line,
                        });
                    }
                }
            }
        }
    }


    ///
    /// Function addresses handed to direct callees as call arguments.
    ///
    /// Modified fields:
    /// - `arg_passes`
    ///
    fn collect_fp_arg_passes(&mut self, module: &LoadedModule)
    {
        unsafe
        {
            for f in ir::iter_funcs(module.handle.raw())
            {
                if ir::is_declaration(f)
                {
                    continue;
                }
                let caller = ir::value_name(f);

                for bb in ir::iter_basic_blocks(f)
                {
                    for inst in ir::iter_instructions(bb)
                    {
                        if !ir::is_call(inst)
                        {
                            continue;
                        }

                        let called = ir::strip_casts(ir::called_operand(inst));
                        if !ir::is_function(called)
                        {
                            continue;
                        }
                        let callee = ir::value_name(called);
                        if callee.starts_with("llvm.")
                        {
                            continue;
                        }

                        let line = ir::debug_line(inst);
                        for i in 0..ir::num_call_args(inst)
                        {
                            let arg = ir::strip_casts(ir::call_arg(inst, i));
                            if !ir::is_function(arg)
                            {
                                continue;
                            }

                            let passed_func = ir::value_name(arg);
                            debug!(
                                "[debug] function pointer argument: `{}` passed to `{}` (arg {}) in `{}` at line {}",
                                passed_func, callee, i, caller, line
                            );
                            self.arg_passes.push(c::FpArgPass {
                                module:      module.name.clone(),
                                caller:      caller.clone(),
                                callee:      callee.clone(),
                                passed_func,
                                arg_index:   i as usize,
                                line,
                            });
                        }
                    }
                }
            }
        }
    }


    ///
    /// Every call instruction becomes a call site: direct when the
    /// called operand is (a cast of) a function reference, otherwise
    /// indirect with a classified dispatch.
    ///
    /// Modified fields:
    /// - `sites`
    ///
    fn collect_call_sites(&mut self, module: &LoadedModule)
    {
        unsafe
        {
            for f in ir::iter_funcs(module.handle.raw())
            {
                if ir::is_declaration(f)
                {
                    continue;
                }
                let caller = ir::value_name(f);

                for bb in ir::iter_basic_blocks(f)
                {
                    for inst in ir::iter_instructions(bb)
                    {
                        if !ir::is_call(inst)
                        {
                            continue;
                        }

                        let line = ir::debug_line(inst);
                        let called = ir::strip_casts(ir::called_operand(inst));

                        if ir::is_inline_asm(called)
                        {
                            continue;
                        }

                        if ir::is_function(called)
                        {
                            let callee = ir::value_name(called);
                            if callee.starts_with("llvm.")
                            {
                                // intrinsics are not program edges
                                continue;
                            }
                            self.sites.push(c::CallSite {
                                module: module.name.clone(),
                                caller: caller.clone(),
                                line,
                                target: c::CallTarget::Direct(callee),
                            });
                        }
                        else
                        {
                            let dispatch = classify_dispatch(f, called);
                            debug!(
                                "[debug] indirect call in `{}` at line {}: dispatch through {} ({})",
                                caller,
                                line,
                                dispatch,
                                ir::stringify_val(called)
                            );
                            self.sites.push(c::CallSite {
                                module: module.name.clone(),
                                caller: caller.clone(),
                                line,
                                target: c::CallTarget::Indirect(dispatch),
                            });
                        }
                    }
                }
            }
        }
    }
}


///
/// Work out how an indirect call obtains its target. The patterns are
/// tried in a fixed order; anything that fits none of them is left as
/// `Unknown` and the edge will stay unresolved.
///
unsafe fn classify_dispatch(func: LLVMValueRef, called: LLVMValueRef) -> c::Dispatch
{
    if ir::is_load(called)
    {
        let ptr = ir::strip_casts(ir::load_pointer(called));

        if ir::is_alloca(ptr)
        {
            return classify_alloca_load(func, ptr);
        }
        if ir::is_global(ptr)
        {
            return c::Dispatch::GlobalVar(ir::value_name(ptr));
        }
        if let Some((struct_type, field_offset, base_var)) = ir::gep_struct_field(ptr)
        {
            return c::Dispatch::StructField { struct_type, field_offset, base_var };
        }
    }

    if ir::is_global(called)
    {
        return c::Dispatch::GlobalVar(ir::value_name(called));
    }

    if let Some(i) = ir::param_index(called)
    {
        return c::Dispatch::Parameter(i);
    }

    if let Some((struct_type, field_offset, base_var)) = ir::gep_struct_field(called)
    {
        return c::Dispatch::StructField { struct_type, field_offset, base_var };
    }

    c::Dispatch::Unknown
}


///
/// A call through a load from a stack slot. The slot is an ordinary
/// local-variable sink when any store places a function constant in
/// it; a slot fed only by a store of one of the enclosing function's
/// parameters is that parameter's spill slot, and the call really
/// dispatches on the parameter.
///
unsafe fn classify_alloca_load(func: LLVMValueRef, alloca: LLVMValueRef) -> c::Dispatch
{
    let mut spilled_param = None;
    let mut has_function_store = false;

    for bb in ir::iter_basic_blocks(func)
    {
        for inst in ir::iter_instructions(bb)
        {
            if !ir::is_store(inst)
            {
                continue;
            }
            if ir::strip_casts(ir::store_pointer(inst)) != alloca
            {
                continue;
            }

            let val = ir::strip_casts(ir::store_value(inst));
            if ir::is_function(val)
            {
                has_function_store = true;
            }
            else if let Some(i) = ir::param_index(val)
            {
                if ir::param_parent(val) == func
                {
                    spilled_param = Some(i);
                }
            }
        }
    }

    if has_function_store
    {
        return c::Dispatch::LocalVar(ir::local_var_key(alloca));
    }
    if let Some(i) = spilled_param
    {
        return c::Dispatch::Parameter(i);
    }
    c::Dispatch::LocalVar(ir::local_var_key(alloca))
}
