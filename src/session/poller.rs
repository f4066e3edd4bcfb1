use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::{AcquisitionSession, SampleSource};
use crate::telemetry::Sample;

/// Nominal acquisition cadence.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Tick `session` against `source` every `interval` until `stop` resolves or
/// the session leaves the running state. The first tick fires immediately so
/// a run always gets a point near t=0 if the device has data.
pub async fn poll_until<S, F, C>(
    session: &mut AcquisitionSession,
    source: &mut S,
    interval: Duration,
    stop: F,
    mut on_sample: C,
) where
    S: SampleSource + ?Sized,
    F: Future<Output = ()>,
    C: FnMut(&Sample),
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                if !session.is_running() {
                    break;
                }
                if session.tick(source) {
                    if let Some(sample) = session.latest() {
                        on_sample(sample);
                    }
                }
            }
        }
    }
}
