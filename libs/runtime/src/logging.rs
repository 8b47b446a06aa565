use crate::config::{LoggingConfig, Section};
use std::{
    collections::HashMap,
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{level_filters::LevelFilter, Level};
use tracing_subscriber::{
    filter::{FilterFn, Targets},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// True if `target` is `prefix` itself or one of its `prefix::` children.
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target == prefix
        || (target.starts_with(prefix) && target[prefix.len()..].starts_with("::"))
}

/// Relative log paths live under `base_dir` (server.home_dir).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

type SharedRotate = Arc<Mutex<FileRotate<AppendTimestamp>>>;

fn open_rotating(log_path: &Path, section: &Section) -> std::io::Result<SharedRotate> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(FileLimit::MaxFiles(backups)),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(Arc::new(Mutex::new(rot)))
}

/// Writer handle that drops bytes when no file is routed for a target.
struct RoutedWriter(Option<SharedRotate>);

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.0 {
            Some(file) => file
                .lock()
                .map_err(|_| std::io::Error::other("log file lock poisoned"))?
                .write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.0 {
            Some(file) => file
                .lock()
                .map_err(|_| std::io::Error::other("log file lock poisoned"))?
                .flush(),
            None => Ok(()),
        }
    }
}

/// Routes records to per-subsystem files by target prefix, else the default file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<SharedRotate>,
    by_prefix: Vec<(String, SharedRotate)>,
}

impl FileRouter {
    fn resolve(&self, target: &str) -> Option<SharedRotate> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_prefix(target, prefix))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RoutedWriter(self.resolve(meta.target()))
    }
}

/// Split view over the logging map: the catch-all and the named subsystems.
struct Plan<'a> {
    default: Option<&'a Section>,
    subsystems: Vec<(&'a str, &'a Section)>,
}

impl<'a> Plan<'a> {
    fn from_config(cfg: &'a LoggingConfig) -> Self {
        let mut subsystems: Vec<(&str, &Section)> = cfg
            .iter()
            .filter(|(k, _)| k.as_str() != DEFAULT_SECTION)
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        // longest prefix first so nested subsystems win over their parents
        subsystems.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            default: cfg.get(DEFAULT_SECTION),
            subsystems,
        }
    }

    fn names(&self) -> Vec<String> {
        self.subsystems.iter().map(|(n, _)| n.to_string()).collect()
    }

    fn targets(&self, pick: impl Fn(&Section) -> Option<&str>) -> Targets {
        self.subsystems
            .iter()
            .fold(Targets::new().with_default(LevelFilter::OFF), |t, (name, s)| {
                match pick(s).and_then(parse_tracing_level) {
                    Some(level) => t.with_target(name.to_string(), LevelFilter::from_level(level)),
                    None => t,
                }
            })
    }

    fn file_router(&self, base_dir: &Path) -> FileRouter {
        let mut router = FileRouter::default();
        if let Some(section) = self.default {
            router.default = open_section_file(DEFAULT_SECTION, section, base_dir);
        }
        for (name, section) in &self.subsystems {
            if let Some(w) = open_section_file(name, section, base_dir) {
                router.by_prefix.push((name.to_string(), w));
            }
        }
        router
    }
}

fn open_section_file(name: &str, section: &Section, base_dir: &Path) -> Option<SharedRotate> {
    if section.file.trim().is_empty() {
        return None;
    }
    let path = resolve_log_path(&section.file, base_dir);
    match open_rotating(&path, section) {
        Ok(w) => Some(w),
        Err(e) => {
            eprintln!(
                "Failed to init log file for '{}': {} ({})",
                name,
                path.to_string_lossy(),
                e
            );
            None
        }
    }
}

/// Everything not claimed by a named subsystem, up to `max_level`.
fn unclaimed_filter(
    claimed: Vec<String>,
    max_level: Level,
) -> FilterFn<impl Fn(&tracing::Metadata<'_>) -> bool> {
    FilterFn::new(move |meta: &tracing::Metadata<'_>| {
        !claimed.iter().any(|c| matches_prefix(meta.target(), c)) && *meta.level() <= max_level
    })
}

/// Initialize logging from the `logging` config map.
/// Relative file paths are resolved against `base_dir` (usually server.home_dir).
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let plan = Plan::from_config(cfg);
    let ansi = std::io::stdout().is_terminal();
    let router = plan.file_router(base_dir);

    let console_named = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(plan.targets(|s| Some(s.console_level.as_str())));

    let console_default = plan
        .default
        .and_then(|s| parse_tracing_level(&s.console_level))
        .map(|level| {
            fmt::layer()
                .with_ansi(ansi)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_filter(unclaimed_filter(plan.names(), level))
        });

    let (file_named, file_default) = if router.is_empty() {
        (None, None)
    } else {
        let named = fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router.clone())
            .with_filter(plan.targets(|s| {
                (!s.file.trim().is_empty()).then_some(s.file_level.as_str())
            }));

        let default = plan
            .default
            .filter(|_| router.default.is_some())
            .and_then(|s| parse_tracing_level(&s.file_level))
            .map(|level| {
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_writer(router.clone())
                    .with_filter(unclaimed_filter(plan.names(), level))
            });
        (Some(named), default)
    };

    let _ = Registry::default()
        .with(console_named)
        .with(console_default)
        .with(file_named)
        .with(file_default)
        .try_init();
}

fn init_default_logging() {
    let _ = fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

/// Subsystem → resolved log file, as logging would open them. Used by `check`.
pub fn planned_log_files(cfg: &LoggingConfig, base_dir: &Path) -> HashMap<String, PathBuf> {
    cfg.iter()
        .filter(|(_, s)| !s.file.trim().is_empty())
        .map(|(name, s)| (name.clone(), resolve_log_path(&s.file, base_dir)))
        .collect()
}
