//! Module lookup and off-render-thread instantiation.

use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use libloading::Library;
use parking_lot::RwLock;
use wab_abi::{
    take_export, InitContext, ModuleEntry, ModuleFactory, ModuleSet, ABI_VERSION, ENTRY_SYMBOL,
    QUANTUM_FRAMES,
};

use crate::bridge::BufferBridge;
use crate::config::BusTopology;
use crate::module::{ForeignModule, ModuleSource};

/// In-process modules a rendering host can instantiate by id.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<ModuleSet>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(self, factory: impl ModuleFactory + 'static) -> Self {
        self.register(factory);
        self
    }

    pub fn register(&self, factory: impl ModuleFactory + 'static) {
        tracing::debug!(module = factory.id(), "registered module");
        self.modules.write().register(factory);
    }

    pub fn find(&self, id: &str) -> Option<Arc<dyn ModuleFactory>> {
        self.modules.read().find(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        self.modules
            .read()
            .iter()
            .map(|factory| factory.id().to_owned())
            .collect()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.ids())
            .finish()
    }
}

/// A module that passed `init` together with its allocated buffers.
#[derive(Debug)]
pub struct LoadedModule {
    pub module: ForeignModule,
    pub bridge: BufferBridge,
}

pub(crate) type LoadOutcome = Result<Box<LoadedModule>, String>;

pub(crate) struct LoadJob {
    pub instance_type: u32,
    pub code: String,
}

/// Fixed parameters every instantiated module is initialised with.
#[derive(Debug, Clone)]
pub(crate) struct LoaderSettings {
    pub topology: BusTopology,
    pub sample_rate: f32,
    pub descriptor: String,
}

/// Worker thread that turns module source text into a [`LoadedModule`].
pub(crate) struct ModuleLoader {
    jobs: Option<Sender<LoadJob>>,
    outcomes: Receiver<LoadOutcome>,
    worker: Option<JoinHandle<()>>,
}

impl ModuleLoader {
    pub fn spawn(registry: Arc<ModuleRegistry>, settings: LoaderSettings) -> std::io::Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<LoadJob>(1);
        let (outcome_tx, outcome_rx) = crossbeam_channel::bounded(1);
        let worker = thread::Builder::new()
            .name("wab-module-loader".into())
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let outcome = instantiate(&registry, &settings, &job)
                        .map(Box::new)
                        .map_err(|err| {
                            tracing::warn!(
                                instance_type = job.instance_type,
                                error = %format!("{err:#}"),
                                "module load failed"
                            );
                            format!("{err:#}")
                        });
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
            })?;
        Ok(Self {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            worker: Some(worker),
        })
    }

    /// Queues a job without blocking. Returns `false` if the worker is busy
    /// or gone.
    pub fn submit(&self, job: LoadJob) -> bool {
        self.jobs
            .as_ref()
            .is_some_and(|jobs| jobs.try_send(job).is_ok())
    }

    #[inline]
    pub fn try_take(&self) -> Option<LoadOutcome> {
        self.outcomes.try_recv().ok()
    }
}

impl Drop for ModuleLoader {
    fn drop(&mut self) {
        self.jobs.take();
        // Never join: a busy worker finishes its job on its own thread, finds
        // the outcome channel closed and drops the result there.
        if let Some(worker) = self.worker.take() {
            if !worker.is_finished() {
                tracing::debug!("detaching busy module loader");
            }
        }
    }
}

fn instantiate(
    registry: &ModuleRegistry,
    settings: &LoaderSettings,
    job: &LoadJob,
) -> Result<LoadedModule> {
    let source = ModuleSource::parse(&job.code).context("invalid module source")?;
    // Declared before `factory` so the library outlives every factory and
    // processor it handed out, on the error paths as well.
    let opened = match &source.library {
        // SAFETY: the library is trusted to follow the wab-abi contract; it
        // stays loaded for as long as the returned module lives.
        Some(path) => Some(unsafe { open_library(path)? }),
        None => None,
    };
    let factory = match (&opened, &source.library) {
        (Some(opened), Some(path)) => opened
            .modules
            .find(&source.module)
            .ok_or_else(|| anyhow!("{path:?} does not export module {}", source.module))?,
        _ => registry
            .find(&source.module)
            .ok_or_else(|| anyhow!("unknown module {}", source.module))?,
    };
    let library = opened.as_ref().map(|opened| Arc::clone(&opened.library));

    let mut module = ForeignModule::instantiate(factory.as_ref(), job.instance_type, library)
        .ok_or_else(|| {
            anyhow!(
                "module {} has no instance type {}",
                source.module,
                job.instance_type
            )
        })?;
    let context = InitContext {
        quantum_frames: QUANTUM_FRAMES,
        sample_rate: settings.sample_rate,
        descriptor: &settings.descriptor,
    };
    if !module.init(&context) {
        bail!("module {} refused to initialise", source.module);
    }
    let bridge = BufferBridge::init(&settings.topology, module.memory_mut())
        .context("failed to allocate bridge buffers")?;
    Ok(LoadedModule { module, bridge })
}

/// Factories exported by a dynamic library. Fields drop in order, so the
/// factories go before the code they live in.
struct OpenedLibrary {
    modules: ModuleSet,
    library: Arc<Library>,
}

unsafe fn open_library(path: &Path) -> Result<OpenedLibrary> {
    let library = Library::new(path)
        .map_err(|err| anyhow!("failed to load module library {path:?}: {err}"))?;
    let export = {
        let entry = library
            .get::<ModuleEntry>(ENTRY_SYMBOL.as_bytes())
            .map_err(|err| anyhow!("missing entry symbol in {path:?}: {err}"))?;
        take_export(*entry).ok_or_else(|| anyhow!("{path:?} returned no module export"))?
    };
    if export.abi_version() != ABI_VERSION {
        let version = export.abi_version();
        // The export's layout under another ABI is unknown, so it is leaked
        // rather than dropped.
        std::mem::forget(export);
        bail!("{path:?} was built for module ABI {version} (host speaks {ABI_VERSION})");
    }
    Ok(OpenedLibrary {
        modules: (*export).into_modules(),
        library: Arc::new(library),
    })
}
