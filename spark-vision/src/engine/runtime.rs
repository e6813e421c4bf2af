use crate::config::RuntimeConfig;
use crate::engine::inference_engine::OnnxSession;
use anyhow::{bail, Result};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::env::consts;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

static IS_INIT: LazyLock<AtomicBool> = LazyLock::new(|| AtomicBool::new(false));

/// Process-wide handle on the ONNX runtime.
///
/// Only one handle may exist at a time. Every [`OnnxSession`] keeps a clone of
/// it, so the runtime cannot be shut down while a session is alive.
#[derive(Debug)]
pub struct Runtime {
    config: RuntimeConfig,
    library: Option<PathBuf>,
    committed: Mutex<bool>,
}

/// Bundled library location for the current platform, `./lib/onnxruntime_<arch>.<ext>`.
pub fn default_library_path() -> PathBuf {
    let name = match consts::OS {
        "windows" => "onnxruntime.dll".to_string(),
        os => {
            let arch = match consts::ARCH {
                "x86_64" => "amd64",
                "aarch64" => "arm64",
                other => other,
            };
            let ext = if os == "macos" { "dylib" } else { "so" };
            format!("onnxruntime_{arch}.{ext}")
        }
    };
    Path::new("lib").join(name)
}

impl Runtime {
    pub fn init(config: RuntimeConfig) -> Result<Arc<Self>> {
        if IS_INIT
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            bail!("onnx runtime is already initialised");
        }

        let library = match &config.library_path {
            Some(path) if !path.exists() => {
                IS_INIT.store(false, Ordering::SeqCst);
                bail!("onnx runtime library not found at {}", path.display());
            }
            Some(path) => Some(path.clone()),
            None => Some(default_library_path()).filter(|path| path.exists()),
        };

        info!(
            "Initialised onnx runtime (provider: {:?}, library: {})",
            config.provider,
            library
                .as_deref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "system default".to_string())
        );

        Ok(Arc::new(Self {
            config,
            library,
            committed: Mutex::new(false),
        }))
    }

    pub fn is_initialised() -> bool {
        IS_INIT.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Library the environment loads from; `None` leaves the lookup to ort.
    pub fn library_path(&self) -> Option<&Path> {
        self.library.as_deref()
    }

    /// Loads the library and creates the ort environment, once, before the first session.
    pub(crate) fn commit_environment(&self) -> Result<()> {
        let mut committed = self.committed.lock();
        if *committed {
            return Ok(());
        }

        let builder = match &self.library {
            Some(path) => ort::init_from(path.display().to_string()),
            None => ort::init(),
        };
        let created = builder.with_name("spark-vision").commit()?;
        debug!("Committed ort environment (new: {created})");

        *committed = true;
        Ok(())
    }

    pub fn session(self: &Arc<Self>, model: impl AsRef<Path>) -> Result<OnnxSession> {
        OnnxSession::new(Arc::clone(self), model)
    }

    pub fn live_sessions(self: &Arc<Self>) -> usize {
        Arc::strong_count(self) - 1
    }

    /// Releases the runtime. Fails, handing the runtime back, while any session still holds it.
    pub fn shutdown(self: Arc<Self>) -> std::result::Result<(), Arc<Self>> {
        match Arc::try_unwrap(self) {
            Ok(runtime) => {
                drop(runtime);
                info!("Shut down onnx runtime");
                Ok(())
            }
            Err(runtime) => {
                warn!(
                    "Refusing to shut down onnx runtime, {} session(s) still alive",
                    runtime.live_sessions()
                );
                Err(runtime)
            }
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        IS_INIT.store(false, Ordering::SeqCst);
    }
}
