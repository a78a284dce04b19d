use std::sync::Arc;

use crate::processor::Processor;
use crate::{ABI_VERSION, DEFAULT_MEMORY_BYTES};

/// Creates processors for one foreign module.
pub trait ModuleFactory: Send + Sync {
    fn id(&self) -> &str;

    /// Manifest text embedded in the module, if any.
    fn manifest(&self) -> Option<&str> {
        None
    }

    /// Size of the linear memory each instance receives.
    fn memory_bytes(&self) -> usize {
        DEFAULT_MEMORY_BYTES
    }

    /// Returns `None` when the module has no processor for `instance_type`.
    fn create(&self, instance_type: u32) -> Option<Box<dyn Processor>>;
}

#[derive(Default, Clone)]
pub struct ModuleSet {
    factories: Vec<Arc<dyn ModuleFactory>>,
}

impl ModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory. A factory with the same id replaces the previous one.
    pub fn register(&mut self, factory: impl ModuleFactory + 'static) -> &mut Self {
        self.register_shared(Arc::new(factory))
    }

    pub fn register_shared(&mut self, factory: Arc<dyn ModuleFactory>) -> &mut Self {
        self.factories.retain(|existing| existing.id() != factory.id());
        self.factories.push(factory);
        self
    }

    pub fn find(&self, id: &str) -> Option<Arc<dyn ModuleFactory>> {
        self.factories
            .iter()
            .find(|factory| factory.id() == id)
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ModuleFactory> {
        self.factories.iter().map(|factory| factory.as_ref())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Value returned by a dynamic library's entry point.
pub struct ModuleExport {
    abi_version: u32,
    modules: ModuleSet,
}

impl ModuleExport {
    pub fn new(modules: ModuleSet) -> Self {
        Self {
            abi_version: ABI_VERSION,
            modules,
        }
    }

    pub fn abi_version(&self) -> u32 {
        self.abi_version
    }

    pub fn modules(&self) -> &ModuleSet {
        &self.modules
    }

    pub fn into_modules(self) -> ModuleSet {
        self.modules
    }
}

/// Signature of [`ENTRY_SYMBOL`](crate::ENTRY_SYMBOL).
pub type ModuleEntry = unsafe extern "C" fn() -> *mut ModuleExport;

/// Calls a library entry point and takes ownership of the export.
///
/// # Safety
///
/// `entry` must come from a library built against this crate with the same
/// compiler, and must return either null or a pointer produced by
/// `Box::into_raw`.
pub unsafe fn take_export(entry: ModuleEntry) -> Option<Box<ModuleExport>> {
    let raw = entry();
    if raw.is_null() {
        None
    } else {
        Some(Box::from_raw(raw))
    }
}
