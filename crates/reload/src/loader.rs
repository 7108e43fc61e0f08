//! Config loader with live reload
//!
//! ```text
//! LocationWatcher --events--> feed thread --()--> debounce::counted --burst--> reload thread
//!                                                                               |
//!                                        read, parse, merge defaults, validate -+-> publish + on_reload
//!                                                                               +-> on_error
//! ```
//!
//! With a zero debounce interval the reload thread consumes watcher events
//! directly.

use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use watcher::{debounce, LocationEvent, LocationWatcher};

use crate::error::{ReloadError, Result};
use crate::format::{merge, Format};
use crate::options::LoaderOptions;

type ReloadHook<T> = Box<dyn Fn(&T) + Send + Sync>;
type ErrorHook = Box<dyn Fn(&ReloadError) + Send + Sync>;
type Validator<T> = Box<dyn Fn(T) -> std::result::Result<T, String> + Send + Sync>;

/// Builder for a [`ConfigLoader`]
pub struct LoaderBuilder<T> {
    path: PathBuf,
    defaults: T,
    options: LoaderOptions,
    on_reload: Vec<ReloadHook<T>>,
    on_error: Vec<ErrorHook>,
    validators: Vec<Validator<T>>,
}

impl<T> LoaderBuilder<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Called with the new config after every reload, in registration order
    pub fn on_reload(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_reload.push(Box::new(hook));
        self
    }

    /// Called for every load, parse or validation failure
    pub fn on_error(mut self, hook: impl Fn(&ReloadError) + Send + Sync + 'static) -> Self {
        self.on_error.push(Box::new(hook));
        self
    }

    /// Check or rewrite a freshly loaded config before it is published
    ///
    /// Validators run in registration order, each receiving the output of
    /// the previous one. An `Err` rejects the load.
    pub fn validate(
        mut self,
        validator: impl Fn(T) -> std::result::Result<T, String> + Send + Sync + 'static,
    ) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn keep_last_valid(mut self, keep: bool) -> Self {
        self.options.keep_last_valid = keep;
        self
    }

    /// Coalesce change bursts; a zero interval reloads on every event
    pub fn debounce(mut self, interval: Duration, max_delay: Duration) -> Self {
        self.options.debounce_interval_ms = millis_rounded_up(interval);
        self.options.debounce_max_delay_ms = millis_rounded_up(max_delay);
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.options.format = Some(format);
        self
    }

    /// Replace every setting at once
    pub fn options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Load the file once and start watching it
    ///
    /// Only an unusable path, unserializable defaults or a watcher that
    /// cannot start fail here. A missing or broken file is reported to the
    /// error hooks and the defaults are used.
    pub fn build(self) -> Result<ConfigLoader<T>> {
        let path = watcher::resolve::absolutize(&self.path).map_err(|source| {
            ReloadError::Resolution {
                path: self.path.clone(),
                source,
            }
        })?;
        let defaults_tree = serde_json::to_value(&self.defaults).map_err(ReloadError::Defaults)?;
        let format = self.options.format.unwrap_or_else(|| Format::from_path(&path));

        let watcher = LocationWatcher::new(&path)?;

        let shared = Arc::new(Shared {
            path,
            format,
            strict: self.options.strict,
            keep_last_valid: self.options.keep_last_valid,
            current: RwLock::new(Arc::new(self.defaults.clone())),
            defaults: self.defaults,
            defaults_tree,
            on_reload: self.on_reload,
            on_error: self.on_error,
            validators: self.validators,
            reloading: Mutex::new(()),
        });

        match shared.load() {
            Ok(config) => *shared.current.write() = Arc::new(config),
            Err(e) => {
                warn!("Using default config: {e}");
                shared.report(&e);
            }
        }

        spawn_pipeline(
            Arc::clone(&shared),
            watcher.events().clone(),
            self.options.debounce_interval(),
            self.options.debounce_max_delay(),
        )?;

        info!("Loaded config {}", shared.path.display());

        Ok(ConfigLoader { shared, watcher })
    }
}

/// Typed configuration that follows its file on disk
///
/// The current value is swapped atomically; readers hold on to the `Arc`
/// they got for as long as they need a consistent view.
pub struct ConfigLoader<T> {
    shared: Arc<Shared<T>>,
    watcher: LocationWatcher,
}

impl<T> ConfigLoader<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn builder(path: impl AsRef<Path>, defaults: T) -> LoaderBuilder<T> {
        LoaderBuilder {
            path: path.as_ref().to_path_buf(),
            defaults,
            options: LoaderOptions::default(),
            on_reload: Vec::new(),
            on_error: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// Current config
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.shared.current.read())
    }

    pub fn defaults(&self) -> &T {
        &self.shared.defaults
    }

    /// Absolute path of the config file
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn format(&self) -> Format {
        self.shared.format
    }

    /// Reload immediately on the calling thread
    pub fn reload_now(&self) {
        self.shared.reload();
    }

    /// Stop following the file. Safe to call more than once.
    ///
    /// The last published config stays available through [`get`](Self::get).
    pub fn close(&self) {
        self.watcher.close();
    }
}

impl<T> std::fmt::Debug for ConfigLoader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("path", &self.shared.path)
            .field("format", &self.shared.format)
            .finish()
    }
}

/// State shared between the handle and the reload threads
struct Shared<T> {
    path: PathBuf,
    format: Format,
    strict: bool,
    keep_last_valid: bool,
    defaults: T,
    defaults_tree: Value,
    current: RwLock<Arc<T>>,
    on_reload: Vec<ReloadHook<T>>,
    on_error: Vec<ErrorHook>,
    validators: Vec<Validator<T>>,
    /// Serializes reloads so hooks never run concurrently
    reloading: Mutex<()>,
}

impl<T> Shared<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Read, parse, overlay on the defaults and validate
    fn load(&self) -> Result<T> {
        let text = fs::read_to_string(&self.path).map_err(|source| ReloadError::Read {
            path: self.path.clone(),
            source,
        })?;

        let overlay = self.format.parse(&text).map_err(|message| ReloadError::Parse {
            path: self.path.clone(),
            format: self.format,
            message,
        })?;

        let mut tree = self.defaults_tree.clone();
        merge(&mut tree, overlay);

        let mut unknown = Vec::new();
        let config: T = serde_ignored::deserialize(tree, |path| unknown.push(path.to_string()))
            .map_err(|e| ReloadError::Shape {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        if !unknown.is_empty() {
            if self.strict {
                return Err(ReloadError::UnknownKeys {
                    path: self.path.clone(),
                    keys: unknown,
                });
            }
            debug!("Ignoring unknown keys in {}: {unknown:?}", self.path.display());
        }

        self.validators
            .iter()
            .try_fold(config, |config, validate| validate(config))
            .map_err(ReloadError::Validation)
    }

    fn reload(&self) {
        let _guard = self.reloading.lock();

        let config = match self.load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Reload of {} failed: {e}", self.path.display());
                self.report(&e);
                if self.keep_last_valid {
                    return;
                }
                self.defaults.clone()
            }
        };

        let config = Arc::new(config);
        *self.current.write() = Arc::clone(&config);
        debug!("Published config from {}", self.path.display());

        for hook in &self.on_reload {
            hook(&config);
        }
    }

    fn report(&self, error: &ReloadError) {
        for hook in &self.on_error {
            hook(error);
        }
    }
}

/// Wire watcher events to reloads
///
/// Every thread ends on its own once the watcher closes: the event stream
/// disconnects, the debounce input drops, the stage flushes and closes its
/// output.
fn spawn_pipeline<T>(
    shared: Arc<Shared<T>>,
    events: Receiver<LocationEvent>,
    interval: Duration,
    max_delay: Duration,
) -> Result<()>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    if interval.is_zero() {
        spawn("pathwatch-reload", move || {
            for event in events.iter() {
                debug!("Config {event}, reloading");
                shared.reload();
            }
        })?;
        return Ok(());
    }

    let (input, bursts) = debounce::counted(interval, max_delay)?;

    spawn("pathwatch-reload-feed", move || {
        for event in events.iter() {
            debug!("Config {event}");
            if input.send(()).is_err() {
                break;
            }
        }
    })?;

    spawn("pathwatch-reload", move || {
        for count in bursts.iter() {
            debug!("Reloading after {count} change(s)");
            shared.reload();
        }
    })?;

    Ok(())
}

/// Whole milliseconds, never rounding a non-zero duration down to zero
fn millis_rounded_up(duration: Duration) -> u64 {
    let millis = duration.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

fn spawn(name: &str, f: impl FnOnce() + Send + 'static) -> Result<()> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map(|_| ())
        .map_err(ReloadError::Spawn)
}
