//! Thin wrappers around `llvm-sys`: module parsing and the raw value
//! plumbing the fact collector walks over. Everything that touches an
//! `LLVMValueRef` lives either here or in the collector passes; the
//! rest of the crate only ever sees owned strings.

use std::ffi::{CStr, CString};
use std::ptr::null_mut;
use std::str;

use llvm_sys::core::*;
use llvm_sys::ir_reader::LLVMParseIRInContext;
use llvm_sys::prelude::{
    LLVMBasicBlockRef, LLVMContextRef, LLVMModuleRef, LLVMTypeRef, LLVMValueRef,
};
use llvm_sys::{LLVMOpcode, LLVMTypeKind};

use thiserror::Error;


///
/// Errors raised while turning bytes into an in-memory module.
///
#[derive(Error, Debug)]
pub enum IrError
{
        #[error("LLVM could not parse `{name}`: {msg}")]
        Parse { name: String, msg: String },
}


///
/// An owned LLVM module together with the context it was parsed in.
/// Each module gets a context of its own; both are disposed together
/// when the handle is dropped, at the end of the analysis run.
///
pub struct ModuleHandle
{
    ctx:    LLVMContextRef,
    module: LLVMModuleRef,
}

impl ModuleHandle
{
    pub fn raw(&self) -> LLVMModuleRef
    {
        self.module
    }
}

impl Drop for ModuleHandle
{
    fn drop(&mut self)
    {
        unsafe
        {
            LLVMDisposeModule(self.module);
            LLVMContextDispose(self.ctx);
        }
    }
}


/*     ██████╗  █████╗ ██████╗ ███████╗███████╗     */
/*     ██╔══██╗██╔══██╗██╔══██╗██╔════╝██╔════╝     */
/*     ██████╔╝███████║██████╔╝███████╗█████╗       */
/*     ██╔═══╝ ██╔══██║██╔══██╗╚════██║██╔══╝       */
/*     ██║     ██║  ██║██║  ██║███████║███████╗     */
/*     ╚═╝     ╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝╚══════╝     */

///
/// Parse one module from `bytes`, which may hold either textual IR or
/// bitcode. `name` is only used for error reporting and as the buffer
/// identifier.
///
pub fn parse(bytes: &[u8], name: &str) -> Result<ModuleHandle, IrError>
{
    unsafe
    {
        let ctx = LLVMContextCreate();

        let buf_name = CString::new(name).unwrap_or_default();
        let buf = LLVMCreateMemoryBufferWithMemoryRangeCopy(
            bytes.as_ptr() as _,
            bytes.len(),
            buf_name.as_ptr(),
        );

        let mut module = null_mut();
        let mut err_msg = null_mut();
        // LLVMParseIRInContext consumes the buffer, also on failure.
        let rc = LLVMParseIRInContext(ctx, buf, &mut module, &mut err_msg);
        if rc != 0
        {
            let msg = if err_msg.is_null()
            {
                "unknown parse error".to_string()
            }
            else
            {
                let m = CStr::from_ptr(err_msg).to_string_lossy().into_owned();
                LLVMDisposeMessage(err_msg);
                m
            };
            LLVMContextDispose(ctx);
            return Err(IrError::Parse { name: name.to_string(), msg });
        }

        Ok(ModuleHandle { ctx, module })
    }
}


pub unsafe fn stringify_val(v: LLVMValueRef) -> String
{
    let p = LLVMPrintValueToString(v);
    let s = CStr::from_ptr(p).to_string_lossy().trim().to_owned();
    LLVMDisposeMessage(p);
    s
}

pub unsafe fn stringify_ty(t: LLVMTypeRef) -> String
{
    let p = LLVMPrintTypeToString(t);
    let s = CStr::from_ptr(p).to_string_lossy().trim().to_owned();
    LLVMDisposeMessage(p);
    s
}

pub unsafe fn value_name(v: LLVMValueRef) -> String
{
    let mut len = 0;
    let p = LLVMGetValueName2(v, &mut len);
    if p.is_null()
    {
        return String::new();
    }
    str::from_utf8(std::slice::from_raw_parts(p as *const u8, len))
        .unwrap_or("")
        .to_owned()
}

///
/// Key identifying a storage location across the setting and dispatch
/// tables: the value's name, or the printed value when it has none
/// (auto-numbered temporaries carry no name through the C API). Both
/// sides of a variable match must go through this, or a nameless slot
/// could never equal itself.
///
pub unsafe fn local_var_key(v: LLVMValueRef) -> String
{
    let name = value_name(v);
    if name.is_empty()
    {
        stringify_val(v)
    }
    else
    {
        name
    }
}

pub unsafe fn iter_funcs(m: LLVMModuleRef) -> impl Iterator<Item = LLVMValueRef>
{
    let mut f = LLVMGetFirstFunction(m);
    std::iter::from_fn(move || {
        if f.is_null() {
            None
        } else {
            let f2 = f;
            f = LLVMGetNextFunction(f2);
            Some(f2)
        }
    })
}

pub unsafe fn iter_globals(m: LLVMModuleRef) -> impl Iterator<Item = LLVMValueRef>
{
    let mut g = LLVMGetFirstGlobal(m);
    std::iter::from_fn(move || {
        if g.is_null() {
            None
        } else {
            let g2 = g;
            g = LLVMGetNextGlobal(g2);
            Some(g2)
        }
    })
}

pub unsafe fn iter_basic_blocks(f: LLVMValueRef) -> impl Iterator<Item = LLVMBasicBlockRef>
{
    let mut bb = LLVMGetFirstBasicBlock(f);
    std::iter::from_fn(move || {
        if bb.is_null() {
            None
        } else {
            let bb2 = bb;
            bb = LLVMGetNextBasicBlock(bb2);
            Some(bb2)
        }
    })
}

pub unsafe fn iter_instructions(bb: LLVMBasicBlockRef) -> impl Iterator<Item = LLVMValueRef>
{
    let mut i = LLVMGetFirstInstruction(bb);
    std::iter::from_fn(move || {
        if i.is_null() {
            None
        } else {
            let i2 = i;
            i = LLVMGetNextInstruction(i2);
            Some(i2)
        }
    })
}


/*     ██╗   ██╗ █████╗ ██╗     ██╗   ██╗███████╗███████╗     */
/*     ██║   ██║██╔══██╗██║     ██║   ██║██╔════╝██╔════╝     */
/*     ██║   ██║███████║██║     ██║   ██║█████╗  ███████╗     */
/*     ╚██╗ ██╔╝██╔══██║██║     ██║   ██║██╔══╝  ╚════██║     */
/*      ╚████╔╝ ██║  ██║███████╗╚██████╔╝███████╗███████║     */
/*       ╚═══╝  ╚═╝  ╚═╝╚══════╝ ╚═════╝ ╚══════╝╚══════╝     */

pub unsafe fn is_declaration(f: LLVMValueRef) -> bool
{
    LLVMIsDeclaration(f) != 0
}

pub unsafe fn is_function(v: LLVMValueRef) -> bool
{
    !LLVMIsAFunction(v).is_null()
}

pub unsafe fn is_global(v: LLVMValueRef) -> bool
{
    !LLVMIsAGlobalVariable(v).is_null()
}

pub unsafe fn is_inline_asm(v: LLVMValueRef) -> bool
{
    !LLVMIsAInlineAsm(v).is_null()
}

pub unsafe fn is_call(v: LLVMValueRef) -> bool
{
    !LLVMIsACallInst(v).is_null()
}

pub unsafe fn is_store(v: LLVMValueRef) -> bool
{
    !LLVMIsAStoreInst(v).is_null()
}

pub unsafe fn is_load(v: LLVMValueRef) -> bool
{
    !LLVMIsALoadInst(v).is_null()
}

pub unsafe fn is_alloca(v: LLVMValueRef) -> bool
{
    !LLVMIsAAllocaInst(v).is_null()
}

pub unsafe fn is_constant_struct(v: LLVMValueRef) -> bool
{
    !LLVMIsAConstantStruct(v).is_null()
}

/// The initialiser of a global variable, if it has one.
pub unsafe fn initializer(gv: LLVMValueRef) -> Option<LLVMValueRef>
{
    let init = LLVMGetInitializer(gv);
    if init.is_null() { None } else { Some(init) }
}

/// A store's value operand.
pub unsafe fn store_value(st: LLVMValueRef) -> LLVMValueRef
{
    LLVMGetOperand(st, 0)
}

/// A store's pointer operand.
pub unsafe fn store_pointer(st: LLVMValueRef) -> LLVMValueRef
{
    LLVMGetOperand(st, 1)
}

/// A load's pointer operand.
pub unsafe fn load_pointer(ld: LLVMValueRef) -> LLVMValueRef
{
    LLVMGetOperand(ld, 0)
}

pub unsafe fn called_operand(call: LLVMValueRef) -> LLVMValueRef
{
    LLVMGetCalledValue(call)
}

pub unsafe fn num_call_args(call: LLVMValueRef) -> u32
{
    LLVMGetNumArgOperands(call)
}

/// The i-th argument of a call. Valid for `i < num_call_args(call)`;
/// the called operand itself is the last operand and never returned
/// through this.
pub unsafe fn call_arg(call: LLVMValueRef, i: u32) -> LLVMValueRef
{
    LLVMGetOperand(call, i)
}

pub unsafe fn num_operands(v: LLVMValueRef) -> u32
{
    LLVMGetNumOperands(v) as u32
}

pub unsafe fn operand(v: LLVMValueRef, i: u32) -> LLVMValueRef
{
    LLVMGetOperand(v, i)
}

/// Line number from debug metadata. Works for instructions, global
/// variables and functions; `0` when there is none.
pub unsafe fn debug_line(v: LLVMValueRef) -> u32
{
    LLVMGetDebugLocLine(v)
}


///
/// Strip casts until a non-cast value is reached. Handles both cast
/// instructions and cast constant expressions; a bitcast of a function
/// is still that function as far as the analysis is concerned.
///
pub unsafe fn strip_casts(mut v: LLVMValueRef) -> LLVMValueRef
{
    loop
    {
        if !LLVMIsAConstantExpr(v).is_null() && is_cast_opcode(LLVMGetConstOpcode(v))
        {
            v = LLVMGetOperand(v, 0);
        }
        else if !LLVMIsACastInst(v).is_null()
        {
            v = LLVMGetOperand(v, 0);
        }
        else
        {
            return v;
        }
    }
}

fn is_cast_opcode(op: LLVMOpcode) -> bool
{
    matches!(
        op,
        LLVMOpcode::LLVMBitCast
            | LLVMOpcode::LLVMAddrSpaceCast
            | LLVMOpcode::LLVMPtrToInt
            | LLVMOpcode::LLVMIntToPtr
            | LLVMOpcode::LLVMTrunc
            | LLVMOpcode::LLVMZExt
            | LLVMOpcode::LLVMSExt
    )
}


/// Index of `v` among the parameters of its parent function, or `None`
/// when `v` is not a parameter at all.
pub unsafe fn param_index(v: LLVMValueRef) -> Option<usize>
{
    if LLVMIsAArgument(v).is_null()
    {
        return None;
    }
    let parent = LLVMGetParamParent(v);
    let n = LLVMCountParams(parent);
    for i in 0..n
    {
        if LLVMGetParam(parent, i) == v
        {
            return Some(i as usize);
        }
    }
    None
}

/// Parent function of a parameter. Only meaningful when
/// `param_index(v)` is `Some`.
pub unsafe fn param_parent(v: LLVMValueRef) -> LLVMValueRef
{
    LLVMGetParamParent(v)
}


/// Return and parameter types of a function, rendered in LLVM's
/// canonical textual form.
pub unsafe fn function_signature(f: LLVMValueRef) -> (String, Vec<String>)
{
    let fnty = LLVMGlobalGetValueType(f);
    let ret = stringify_ty(LLVMGetReturnType(fnty));

    let n = LLVMCountParamTypes(fnty) as usize;
    let mut params = Vec::with_capacity(n);
    if n > 0
    {
        let mut tys: Vec<LLVMTypeRef> = vec![null_mut(); n];
        LLVMGetParamTypes(fnty, tys.as_mut_ptr());
        for t in tys
        {
            params.push(stringify_ty(t));
        }
    }
    (ret, params)
}

/// The value type of a global variable (what the global holds, not
/// the pointer to it).
pub unsafe fn global_value_type(gv: LLVMValueRef) -> LLVMTypeRef
{
    LLVMGlobalGetValueType(gv)
}

/// Name of a struct type; `"unknown"` for literal (unnamed) structs,
/// `None` when the type is not a struct at all.
pub unsafe fn struct_type_name(t: LLVMTypeRef) -> Option<String>
{
    if LLVMGetTypeKind(t) != LLVMTypeKind::LLVMStructTypeKind
    {
        return None;
    }
    let p = LLVMGetStructName(t);
    if p.is_null()
    {
        Some("unknown".to_string())
    }
    else
    {
        Some(CStr::from_ptr(p).to_string_lossy().into_owned())
    }
}


///
/// If `v` is a field-pointer computation into a named struct (a GEP
/// instruction or GEP constant expression), return the struct type
/// name, the field index and the name of the base value.
///
pub unsafe fn gep_struct_field(v: LLVMValueRef) -> Option<(String, usize, String)>
{
    let is_gep_inst = !LLVMIsAGetElementPtrInst(v).is_null();
    let is_gep_const = !LLVMIsAConstantExpr(v).is_null()
        && LLVMGetConstOpcode(v) == LLVMOpcode::LLVMGetElementPtr;
    if !is_gep_inst && !is_gep_const
    {
        return None;
    }

    let ty_name = struct_type_name(LLVMGetGEPSourceElementType(v))?;

    // base pointer plus at least two indices; the last one picks the field
    let n = LLVMGetNumOperands(v) as u32;
    if n < 3
    {
        return None;
    }
    let last = LLVMGetOperand(v, n - 1);
    if LLVMIsAConstantInt(last).is_null()
    {
        return None;
    }
    let field = LLVMConstIntGetZExtValue(last) as usize;

    let base = strip_casts(LLVMGetOperand(v, 0));
    Some((ty_name, field, value_name(base)))
}
