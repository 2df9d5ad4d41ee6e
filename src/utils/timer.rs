//! Wall-clock timing of async operations.

use std::future::Future;
use std::time::{Duration, Instant};

/// Format an elapsed time as `HH:MM:SS.ss`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let hours = (secs / 3600.0).floor() as u64;
    let minutes = ((secs % 3600.0) / 60.0).floor() as u64;
    let seconds = secs % 60.0;
    format!("{:02}:{:02}:{:05.2}", hours, minutes, seconds)
}

/// Await `future` and log how long it took at info level
pub async fn wall_timer<F: Future>(label: &str, future: F) -> F::Output {
    let start = Instant::now();
    let output = future.await;
    tracing::info!("{} {}", label, format_elapsed(start.elapsed()));
    output
}
