use std::path::PathBuf;
use std::sync::Arc;

use libloading::Library;
use serde::{Deserialize, Serialize};
use wab_abi::{InitContext, LinearMemory, MemPtr, MemoryError, ModuleFactory, Processor};

/// The text a control proxy fetches and ships in a "create" request.
///
/// Names a factory by id, optionally inside a dynamic library:
///
/// ```json
/// { "module": "logue.osc", "library": "target/release/libwab_blocks.so" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSource {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<PathBuf>,
}

impl ModuleSource {
    /// A factory registered with the host's [`ModuleRegistry`](crate::ModuleRegistry).
    pub fn registered(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            library: None,
        }
    }

    /// A factory exported by the dynamic library at `path`.
    pub fn library(path: impl Into<PathBuf>, module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            library: Some(path.into()),
        }
    }

    pub fn parse(code: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(code)
    }

    pub fn to_code(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A live foreign module instance: its processor and the linear memory it
/// owns.
pub struct ForeignModule {
    id: String,
    manifest: Option<String>,
    processor: Box<dyn Processor>,
    memory: LinearMemory,
    // Declared last so the processor is dropped before its code is unloaded.
    _library: Option<Arc<Library>>,
}

impl ForeignModule {
    /// Creates an uninitialised instance, or `None` if the factory has no
    /// processor for `instance_type`.
    pub fn instantiate(
        factory: &dyn ModuleFactory,
        instance_type: u32,
        library: Option<Arc<Library>>,
    ) -> Option<Self> {
        let processor = factory.create(instance_type)?;
        Some(Self {
            id: factory.id().to_owned(),
            manifest: factory.manifest().map(str::to_owned),
            processor,
            memory: LinearMemory::new(factory.memory_bytes()),
            _library: library,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn manifest(&self) -> Option<&str> {
        self.manifest.as_deref()
    }

    pub fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }

    pub fn init(&mut self, context: &InitContext<'_>) -> bool {
        self.processor.init(&mut self.memory, context)
    }

    #[inline]
    pub fn process(&mut self, inputs: &[MemPtr], outputs: &[MemPtr]) {
        self.processor.process(&mut self.memory, inputs, outputs);
    }

    pub fn set_param(&mut self, key: u32, value: f64) {
        self.processor.set_param(key, value);
    }

    /// Copies `data` into scratch memory, hands it to the processor and frees
    /// the scratch region again.
    pub fn push_binary(&mut self, verb: &str, prop: u32, data: &[u8]) -> Result<(), MemoryError> {
        let ptr = self.memory.allocate(data.len())?;
        if let Err(err) = self.memory.write_bytes(ptr, data) {
            let _ = self.memory.free(ptr);
            return Err(err);
        }
        self.processor
            .on_message(&mut self.memory, verb, prop, ptr, data.len());
        self.memory.free(ptr)
    }
}

impl std::fmt::Debug for ForeignModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignModule")
            .field("id", &self.id)
            .field("memory", &self.memory)
            .field("dynamic", &self._library.is_some())
            .finish_non_exhaustive()
    }
}
