use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use log::{error, info};
use xmas_elf::ElfFile;

use thiserror::Error;

use crate::ir;



///
/// Errors which may occur when loading a module.
///
#[derive(Error, Debug)]
pub enum InputError
{
        #[error("std::fs::read() raised this error: {0:?}")]
        IoErr(#[from] io::Error),

        #[error("Not a valid ELF: {0}")]
        BadElf(String),

        #[error("Section {0} could not be found.")]
        CouldNotFindSection(String),

        #[error(transparent)]
        BadIr(#[from] ir::IrError),
}



///
/// One successfully loaded module: the origin path (used as the module
/// name throughout the analysis) and the owned IR handle. The loader
/// keeps ownership of the handle for the duration of the run; the fact
/// tables only ever copy strings out of it.
///
pub struct LoadedModule
{
    pub name:   String,
    pub handle: ir::ModuleHandle,
}


const ELF_MAGIC: &[u8; 4] = b"\x7fELF";


///
/// Load a single module from `path`. The file may contain textual IR,
/// bitcode, or an ELF image; for an ELF the bitcode is taken from its
/// `.llvmbc` section (the section the compiler embeds when asked to
/// keep the IR next to the machine code).
///
pub fn load_module(path: &Path) -> Result<LoadedModule, InputError>
{
    let name = path.display().to_string();
    let bytes = fs::read(path)?;

    let bc_bytes: Vec<u8> = if bytes.len() >= ELF_MAGIC.len() && &bytes[..ELF_MAGIC.len()] == ELF_MAGIC
    {
        let elf = ElfFile::new(&bytes).map_err(|s|
                    InputError::BadElf( s.to_string() ))?;

        let bc_sec_hdr = elf.find_section_by_name(".llvmbc")
            .ok_or_else(|| InputError::CouldNotFindSection(".llvmbc".to_string()))?;

        info!("ELF with .llvmbc section found: {:?}", path);
        bc_sec_hdr.raw_data(&elf).to_vec()
    }
    else
    {
        bytes
    };

    let handle = ir::parse(&bc_bytes, &name)?;
    Ok(LoadedModule { name, handle })
}


///
/// Load every path in `paths`, in order. Files that fail to load are
/// reported on standard error and skipped; the pipeline proceeds with
/// the successfully loaded subset.
///
pub fn load_modules(paths: &[PathBuf]) -> Vec<LoadedModule>
{
    let mut modules = Vec::with_capacity(paths.len());
    for path in paths
    {
        match load_module(path)
        {
            Ok(m)  => modules.push(m),
            Err(e) => error!("skipping {:?}: {}", path, e),
        }
    }
    modules
}
