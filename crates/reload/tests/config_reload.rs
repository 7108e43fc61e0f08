//! Config loader behaviour against real files

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use reload::{ConfigLoader, Format, LoaderOptions, ReloadError};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Limits {
    connections: u32,
    burst: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Settings {
    name: String,
    port: u16,
    limits: Limits,
}

fn defaults() -> Settings {
    Settings {
        name: "defaultName".into(),
        port: 1234,
        limits: Limits {
            connections: 10,
            burst: 2,
        },
    }
}

struct Fixture {
    _dir: TempDir,
    path: PathBuf,
}

impl Fixture {
    fn new(file_name: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().canonicalize().unwrap().join(file_name);
        Self { _dir: dir, path }
    }

    fn write(&self, content: &str) {
        fs::write(&self.path, content).unwrap();
    }
}

/// Collects error messages from the loader's error hook
fn error_log() -> (Arc<Mutex<Vec<String>>>, impl Fn(&ReloadError) + Send + Sync + 'static) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    (log, move |e: &ReloadError| sink.lock().push(e.to_string()))
}

#[test]
fn test_missing_file_uses_defaults_and_reports() {
    let fixture = Fixture::new("a/b/c.yaml");
    let (errors, on_error) = error_log();

    let loader = ConfigLoader::builder(&fixture.path, defaults())
        .on_error(on_error)
        .build()
        .unwrap();

    assert_eq!(*loader.get(), defaults());
    assert_eq!(loader.defaults(), &defaults());
    assert_eq!(loader.path(), fixture.path.as_path());
    assert_eq!(errors.lock().len(), 1);
    assert!(errors.lock()[0].contains("Failed to read"));
}

#[test]
fn test_file_overrides_defaults_key_by_key() {
    let fixture = Fixture::new("settings.yaml");
    fixture.write("port: 8080\nlimits:\n  burst: 5\n");

    let loader = ConfigLoader::builder(&fixture.path, defaults()).build().unwrap();
    let settings = loader.get();

    assert_eq!(settings.name, "defaultName");
    assert_eq!(settings.port, 8080);
    assert_eq!(settings.limits, Limits { connections: 10, burst: 5 });
}

#[test]
fn test_toml_and_json_by_extension() {
    let toml = Fixture::new("settings.toml");
    toml.write("name = \"toml\"\n[limits]\nconnections = 99\n");
    let loader = ConfigLoader::builder(&toml.path, defaults()).build().unwrap();
    assert_eq!(loader.format(), Format::Toml);
    assert_eq!(loader.get().name, "toml");
    assert_eq!(loader.get().limits.connections, 99);

    let json = Fixture::new("settings.json");
    json.write(r#"{"name": "json", "port": 9000}"#);
    let loader = ConfigLoader::builder(&json.path, defaults()).build().unwrap();
    assert_eq!(loader.format(), Format::Json);
    assert_eq!(loader.get().name, "json");
    assert_eq!(loader.get().port, 9000);
}

#[test]
fn test_forced_format() {
    let fixture = Fixture::new("settings.conf");
    fixture.write(r#"{"port": 4321}"#);

    let loader = ConfigLoader::builder(&fixture.path, defaults())
        .format(Format::Json)
        .build()
        .unwrap();
    assert_eq!(loader.get().port, 4321);
}

#[test]
fn test_strict_mode_rejects_unknown_keys() {
    let fixture = Fixture::new("settings.yaml");
    fixture.write("port: 8080\nlimits:\n  burst: 5\n  jitter: 3\n");

    let lenient = ConfigLoader::builder(&fixture.path, defaults()).build().unwrap();
    assert_eq!(lenient.get().port, 8080);

    let (errors, on_error) = error_log();
    let strict = ConfigLoader::builder(&fixture.path, defaults())
        .strict(true)
        .on_error(on_error)
        .build()
        .unwrap();

    assert_eq!(*strict.get(), defaults());
    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("limits.jitter"), "{}", errors[0]);
}

#[test]
fn test_validator_rejects_and_transforms() {
    let fixture = Fixture::new("settings.yaml");
    fixture.write("port: 80\n");
    let (errors, on_error) = error_log();

    let loader = ConfigLoader::builder(&fixture.path, defaults())
        .validate(|settings: Settings| {
            if settings.port < 1024 {
                Err(format!("port {} is privileged", settings.port))
            } else {
                Ok(settings)
            }
        })
        .validate(|mut settings: Settings| {
            settings.name = settings.name.to_uppercase();
            Ok(settings)
        })
        .on_error(on_error)
        .build()
        .unwrap();

    assert_eq!(*loader.get(), defaults());
    assert_eq!(errors.lock().as_slice(), ["Config rejected: port 80 is privileged"]);

    fixture.write("port: 8080\nname: api\n");
    loader.reload_now();
    assert_eq!(loader.get().name, "API");
    assert_eq!(loader.get().port, 8080);
}

#[test]
fn test_failed_reload_restores_defaults() {
    let fixture = Fixture::new("settings.yaml");
    fixture.write("port: 8080\n");
    let reloads = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&reloads);

    let loader = ConfigLoader::builder(&fixture.path, defaults())
        .on_reload(move |settings: &Settings| seen.lock().push(settings.port))
        .build()
        .unwrap();
    assert_eq!(loader.get().port, 8080);

    fixture.write("port: [not a port\n");
    loader.reload_now();

    assert_eq!(*loader.get(), defaults());
    assert_eq!(reloads.lock().last(), Some(&1234));
}

#[test]
fn test_failed_reload_keeps_last_valid() {
    let fixture = Fixture::new("settings.yaml");
    fixture.write("port: 8080\n");
    let (errors, on_error) = error_log();
    let reloads = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&reloads);

    let loader = ConfigLoader::builder(&fixture.path, defaults())
        .keep_last_valid(true)
        .on_reload(move |_: &Settings| *seen.lock() += 1)
        .on_error(on_error)
        .build()
        .unwrap();

    fixture.write("port: [not a port\n");
    loader.reload_now();

    assert_eq!(loader.get().port, 8080);
    assert_eq!(*reloads.lock(), 0);
    assert_eq!(errors.lock().len(), 1);
}

#[test]
fn test_reload_hooks_run_in_registration_order() {
    let fixture = Fixture::new("settings.yaml");
    fixture.write("port: 8080\n");
    let order = Arc::new(Mutex::new(Vec::new()));
    let (first, second) = (Arc::clone(&order), Arc::clone(&order));

    let loader = ConfigLoader::builder(&fixture.path, defaults())
        .on_reload(move |_: &Settings| first.lock().push("first"))
        .on_reload(move |_: &Settings| second.lock().push("second"))
        .build()
        .unwrap();

    loader.reload_now();
    assert_eq!(order.lock().as_slice(), ["first", "second"]);
}

#[test]
fn test_file_changes_trigger_reload() {
    let fixture = Fixture::new("conf/settings.yaml");
    let (tx, rx) = crossbeam_channel::unbounded();

    let loader = ConfigLoader::builder(&fixture.path, defaults())
        .debounce(Duration::from_millis(50), Duration::from_millis(200))
        .on_reload(move |settings: &Settings| {
            let _ = tx.send(settings.port);
        })
        .build()
        .unwrap();
    thread::sleep(Duration::from_millis(150));

    fs::create_dir(fixture.path.parent().unwrap()).unwrap();
    fixture.write("port: 8080\n");
    let port = wait_for(&rx, |port| port == 8080);
    assert_eq!(port, 8080);
    assert_eq!(loader.get().port, 8080);

    fs::remove_file(&fixture.path).unwrap();
    wait_for(&rx, |port| port == 1234);
    assert_eq!(*loader.get(), defaults());

    loader.close();
    loader.close();
}

#[test]
fn test_atomic_save_triggers_reload() {
    let fixture = Fixture::new("app.yaml");
    fixture.write("port: 8080\n");
    let (tx, rx) = crossbeam_channel::unbounded();

    let loader = ConfigLoader::builder(&fixture.path, defaults())
        .debounce(Duration::from_millis(50), Duration::from_millis(200))
        .on_reload(move |settings: &Settings| {
            let _ = tx.send(settings.port);
        })
        .build()
        .unwrap();
    assert_eq!(loader.get().port, 8080);
    thread::sleep(Duration::from_millis(150));

    let staged = fixture.path.with_extension("yaml.tmp");
    fs::write(&staged, "port: 9090\n").unwrap();
    fs::rename(&staged, &fixture.path).unwrap();

    wait_for(&rx, |port| port == 9090);
    assert_eq!(loader.get().port, 9090);
}

#[test]
fn test_undebounced_reload() {
    let fixture = Fixture::new("settings.json");
    fixture.write(r#"{"port": 2000}"#);
    let (tx, rx) = crossbeam_channel::unbounded();

    let options = LoaderOptions {
        debounce_interval_ms: 0,
        ..LoaderOptions::default()
    };
    let loader = ConfigLoader::builder(&fixture.path, defaults())
        .options(options)
        .on_reload(move |settings: &Settings| {
            let _ = tx.send(settings.port);
        })
        .build()
        .unwrap();
    assert_eq!(loader.get().port, 2000);
    thread::sleep(Duration::from_millis(150));

    fixture.write(r#"{"port": 3000}"#);
    wait_for(&rx, |port| port == 3000);
    assert_eq!(loader.get().port, 3000);
}

fn wait_for(rx: &crossbeam_channel::Receiver<u16>, done: impl Fn(u16) -> bool) -> u16 {
    loop {
        match rx.recv_timeout(Duration::from_secs(3)) {
            Ok(port) if done(port) => return port,
            Ok(_) => continue,
            Err(e) => panic!("no reload observed: {e}"),
        }
    }
}
