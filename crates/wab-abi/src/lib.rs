//! WAB foreign module ABI
//! ======================
//!
//! The contract between a rendering host and a pluggable DSP module. A module
//! is a [`ModuleFactory`] that creates [`Processor`] instances; each instance
//! owns a [`LinearMemory`] through which the host exchanges audio, one
//! quantum-sized `f32` buffer per channel.
//!
//! Modules are either registered in-process or exported from a dynamic
//! library with [`declare_wab_module!`].

pub mod memory;
pub mod processor;
pub mod registry;

pub use memory::{LinearMemory, MemPtr, MemoryError, ALIGNMENT};
pub use processor::{InitContext, Processor};
pub use registry::{take_export, ModuleEntry, ModuleExport, ModuleFactory, ModuleSet};

/// Frames rendered per call to [`Processor::process`].
pub const QUANTUM_FRAMES: usize = 128;

/// Bumped whenever the layout of [`ModuleExport`] or the traits change.
pub const ABI_VERSION: u32 = 1;

/// Linear memory size used when a factory does not ask for more.
pub const DEFAULT_MEMORY_BYTES: usize = 1 << 20;

/// Name of the symbol generated by [`declare_wab_module!`].
pub const ENTRY_SYMBOL: &str = "wab_module_entrypoint";

/// Declare the entry point of a dynamic WAB module library.
///
/// Each argument is an expression evaluating to a [`ModuleFactory`].
///
/// ```ignore
/// wab_abi::declare_wab_module!(MyOscillator, MyEffect);
/// ```
#[macro_export]
macro_rules! declare_wab_module {
    ($($factory:expr),+ $(,)?) => {
        #[no_mangle]
        pub extern "C" fn wab_module_entrypoint() -> *mut $crate::ModuleExport {
            let mut modules = $crate::ModuleSet::new();
            $(modules.register($factory);)+
            ::std::boxed::Box::into_raw(::std::boxed::Box::new($crate::ModuleExport::new(modules)))
        }
    };
}
