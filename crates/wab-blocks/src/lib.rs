//! Stock WAB modules.
//!
//! Register them in-process with [`register_all`], or build this crate as a
//! `cdylib` and point a module source's `library` at it.

pub mod gain;
pub mod logue;
pub mod passthrough;

use wab_bridge::ModuleRegistry;

pub use gain::{GainModule, GAIN_ID, GAIN_PARAM};
pub use logue::{
    LogueFilterModule, LogueKind, LogueNode, LogueOscModule, LOGUE_FILTER_ID, LOGUE_OSC_ID,
};
pub use passthrough::{PassthroughModule, PASSTHROUGH_ID};

/// Adds every module of this crate to `registry`.
pub fn register_all(registry: &ModuleRegistry) {
    registry.register(PassthroughModule);
    registry.register(GainModule);
    registry.register(LogueOscModule);
    registry.register(LogueFilterModule);
}

wab_abi::declare_wab_module!(
    PassthroughModule,
    GainModule,
    LogueOscModule,
    LogueFilterModule
);


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_module() {
        let registry = ModuleRegistry::new();
        register_all(&registry);
        let mut ids = registry.ids();
        ids.sort();
        assert_eq!(
            ids,
            vec![LOGUE_FILTER_ID, LOGUE_OSC_ID, GAIN_ID, PASSTHROUGH_ID]
        );
    }

    #[test]
    fn entry_point_exports_every_module() {
        let export = unsafe { wab_abi::take_export(wab_module_entrypoint) }.expect("export");
        assert_eq!(export.abi_version(), wab_abi::ABI_VERSION);
        assert_eq!(export.modules().len(), 4);
        assert!(export.modules().find(LOGUE_OSC_ID).is_some());
    }
}
