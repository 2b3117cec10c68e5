// src/reload.rs
//! Shared analyzer handle and dev-only config hot reload.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use crate::analyze::Analyzer;
use crate::config::{dev_environment, env_flag, AnalyzerConfig, ENV_HOT_RELOAD};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A threadsafe handle whose analyzer can be swapped while requests are in flight.
/// Callers take a snapshot with [`AnalyzerHandle::current`]; a swap never changes an
/// analyzer that is already being used.
#[derive(Clone)]
pub struct AnalyzerHandle {
    inner: Arc<RwLock<Arc<Analyzer>>>,
}

impl AnalyzerHandle {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(analyzer))),
        }
    }

    pub fn current(&self) -> Arc<Analyzer> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, analyzer: Analyzer) {
        let next = Arc::new(analyzer);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Re-read config from `path` and swap in a reconfigured analyzer. The env
    /// threshold override applies as at startup. On error the running analyzer
    /// stays in place.
    pub fn reload_from(&self, path: &Path) -> anyhow::Result<()> {
        let mut config = AnalyzerConfig::from_toml_path(path)?;
        config.apply_env_threshold();
        let next = self.current().reconfigure(config);
        self.replace(next);
        Ok(())
    }
}

impl std::fmt::Debug for AnalyzerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerHandle").finish_non_exhaustive()
    }
}

/// REPLY_GATE_HOT_RELOAD=1 in a dev environment.
pub fn hot_reload_enabled() -> bool {
    env_flag(ENV_HOT_RELOAD) && dev_environment()
}

/// Poll `path` mtime and reload into `handle` when it moves forward.
pub fn start_hot_reload_thread(handle: AnalyzerHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }
    info!(path = %path.display(), "config hot reload enabled");

    thread::spawn(move || {
        let mut last_mtime: Option<SystemTime> = None;
        loop {
            if let Ok(mtime) = fs::metadata(&path).and_then(|m| m.modified()) {
                let changed = match last_mtime {
                    None => false,
                    Some(prev) => mtime > prev,
                };
                if changed {
                    match handle.reload_from(&path) {
                        Ok(()) => info!(path = %path.display(), "analyzer config reloaded"),
                        Err(e) => warn!(error = %e, "config reload failed, keeping previous analyzer"),
                    }
                }
                last_mtime = Some(mtime);
            }
            thread::sleep(POLL_INTERVAL);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_REPLY_THRESHOLD;

    fn temp_config(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("reply_gate_{}_{}.toml", name, std::process::id()));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn replace_does_not_touch_snapshots() {
        let handle = AnalyzerHandle::new(Analyzer::builder(AnalyzerConfig::default()).dev_log(false).build());
        let before = handle.current();
        let mut cfg = AnalyzerConfig::default();
        cfg.thresholds.reply = 0.2;
        handle.replace(Analyzer::builder(cfg).dev_log(false).build());
        assert!((before.config().thresholds.reply - 0.65).abs() < 1e-12);
        assert!((handle.current().config().thresholds.reply - 0.2).abs() < 1e-12);
    }

    #[serial_test::serial]
    #[test]
    fn reload_from_file_and_keep_on_error() {
        std::env::remove_var(ENV_REPLY_THRESHOLD);
        let handle = AnalyzerHandle::new(Analyzer::builder(AnalyzerConfig::default()).dev_log(false).build());
        let good = temp_config("good", "[thresholds]\nreply = 0.5\n");
        handle.reload_from(&good).unwrap();
        assert!((handle.current().config().thresholds.reply - 0.5).abs() < 1e-12);

        let bad = temp_config("bad", "[thresholds\nreply = ");
        assert!(handle.reload_from(&bad).is_err());
        assert!((handle.current().config().thresholds.reply - 0.5).abs() < 1e-12);

        let _ = fs::remove_file(good);
        let _ = fs::remove_file(bad);
    }

    #[serial_test::serial]
    #[test]
    fn reload_keeps_env_threshold_override() {
        std::env::set_var(ENV_REPLY_THRESHOLD, "0.4");
        let mut start = AnalyzerConfig::from_toml_str("[thresholds]\nreply = 0.5\n").unwrap();
        start.apply_env_threshold();
        let handle = AnalyzerHandle::new(Analyzer::builder(start).dev_log(false).build());
        assert!((handle.current().config().thresholds.reply - 0.4).abs() < 1e-12);

        let path = temp_config("env_override", "[thresholds]\nreply = 0.5\n");
        handle.reload_from(&path).unwrap();
        assert!((handle.current().config().thresholds.reply - 0.4).abs() < 1e-12);

        std::env::remove_var(ENV_REPLY_THRESHOLD);
        let _ = fs::remove_file(path);
    }
}
