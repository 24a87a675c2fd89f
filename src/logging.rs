//! Structured logging (SPEC_FULL.md §4.9): a non-blocking, daily-rolling
//! file sink is always active; `--debug` additionally layers a filtered
//! stderr writer.
//!
//! Grounded in the original's `loguru` setup (`__init__.py`: daily
//! rotation, 3-day retention, a TRACE-level file sink, `logger.add(
//! sys.stderr, level="DEBUG")` under `--debug`) and rendered in the
//! teacher's idiom — `tracing` + `tracing-subscriber` are already teacher
//! dependencies (`server/src/main.rs`'s `tracing_subscriber::registry()`
//! setup) — plus `tracing-appender` for the rotation itself, which
//! `tracing-subscriber` alone doesn't provide.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log files older than this are pruned at startup (spec.md §7: "daily
/// rotation (3-day retention)").
const RETENTION: Duration = Duration::from_secs(3 * 24 * 60 * 60);

const LOG_FILE_PREFIX: &str = "tapper";

/// Initializes the global tracing subscriber. The returned [`WorkerGuard`]
/// must be kept alive for the process lifetime — dropping it flushes and
/// stops the non-blocking file writer.
pub fn init(log_dir: &Path, debug: bool) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    sweep_old_logs(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tapper=debug,info"));

    let registry = tracing_subscriber::registry().with(env_filter).with(file_layer);

    if debug {
        registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)).init();
    } else {
        registry.init();
    }

    Ok(guard)
}

/// Deletes log files under `log_dir` whose name carries the
/// `tapper.<date>` rolling-file stem and whose modification time is
/// older than [`RETENTION`]. `tracing-appender` rotates daily but never
/// prunes on its own, so this sweep runs once at startup.
fn sweep_old_logs(log_dir: &Path) -> anyhow::Result<()> {
    let now = SystemTime::now();

    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let Ok(file_name) = entry.file_name().into_string() else { continue };
        if !file_name.starts_with(LOG_FILE_PREFIX) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else { continue };
        let Ok(modified) = metadata.modified() else { continue };
        let Ok(age) = now.duration_since(modified) else { continue };

        if age > RETENTION {
            let _ = std::fs::remove_file(entry.path());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::UNIX_EPOCH;

    #[test]
    fn sweep_removes_only_stale_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("tapper.2020-01-01");
        let fresh = dir.path().join("tapper.2020-01-02");
        let unrelated = dir.path().join("other.log");
        fs::write(&stale, "old").unwrap();
        fs::write(&fresh, "new").unwrap();
        fs::write(&unrelated, "keep").unwrap();

        let ancient = UNIX_EPOCH + Duration::from_secs(1);
        filetime_touch(&stale, ancient);

        sweep_old_logs(dir.path()).unwrap();

        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
    }

    /// Minimal mtime setter so the retention test doesn't need a real
    /// filetime crate dependency just for one assertion.
    fn filetime_touch(path: &Path, time: SystemTime) {
        let file = std::fs::File::open(path).unwrap();
        let duration = time.duration_since(UNIX_EPOCH).unwrap();
        let times = std::fs::FileTimes::new().set_modified(UNIX_EPOCH + duration);
        file.set_times(times).unwrap();
    }
}
