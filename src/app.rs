//! Console reporting, progress logging, and shutdown helpers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use colored::Colorize;
use log::info;
use strum::IntoEnumIterator;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error_handling::{ErrorStats, ErrorType};
use crate::DomainResult;

fn mark(supported: bool) -> colored::ColoredString {
    if supported {
        "✅".green()
    } else {
        "❌".red()
    }
}

/// Prints the per-domain verdict line.
///
/// Inaccessible domains get a short note instead of a feature breakdown,
/// matching what their verdict actually established.
pub fn report_domain(result: &DomainResult) {
    if result.accessible {
        println!(
            "{}: ECH: {}, Kyber: {}",
            result.domain,
            mark(result.has_ech),
            mark(result.has_kyber)
        );
    } else {
        println!("{} {}", result.domain, "not accessible".red());
    }
}

/// Logs progress information about domain processing.
pub fn log_progress(
    start_time: std::time::Instant,
    completed: &Arc<AtomicUsize>,
    failed: &Arc<AtomicUsize>,
    total: usize,
) {
    let done = completed.load(Ordering::SeqCst) + failed.load(Ordering::SeqCst);
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let rate = if elapsed_secs > 0.0 {
        done as f64 / elapsed_secs
    } else {
        0.0
    };
    info!("Probed {done}/{total} domains in {elapsed_secs:.2}s (~{rate:.2} domains/sec)");
}

/// Prints non-zero error counters accumulated during the run.
pub fn print_error_statistics(error_stats: &ErrorStats) {
    let total = error_stats.total();
    if total == 0 {
        return;
    }
    info!("Error Counts ({} total):", total);
    for error_type in ErrorType::iter() {
        let count = error_stats.get_count(error_type);
        if count > 0 {
            info!("   {}: {}", error_type.as_str(), count);
        }
    }
}

/// Stops the background progress task and waits for it to finish.
pub async fn shutdown_gracefully(cancel: CancellationToken, logging_task: Option<JoinHandle<()>>) {
    cancel.cancel();
    if let Some(task) = logging_task {
        if let Err(e) = task.await {
            log::warn!("Progress logging task ended abnormally: {e:?}");
        }
    }
}
