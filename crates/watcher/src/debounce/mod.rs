//! Time-windowed coalescing of event bursts
//!
//! A stage owns one worker thread. Inputs are folded into an [`Accumulator`]
//! until the stream goes quiet for `interval`, or until `max_delay` has
//! passed since the first input of the burst. Then the aggregate is handed
//! to the output.
//!
//! Dropping every input [`Sender`] shuts the stage down: any pending
//! aggregate is flushed first, then the output disconnects.

mod accumulator;
mod timers;

pub use accumulator::{Accumulator, Counted, Grouped, Last, Signal};

use crossbeam_channel::{select, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, WatchError};
use timers::Timers;

/// Quiet period and upper bound for one burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Flush once no input arrived for this long
    pub interval: Duration,
    /// Flush at the latest this long after the first input (zero: unbounded)
    pub max_delay: Duration,
}

impl DebounceConfig {
    pub fn new(interval: Duration, max_delay: Duration) -> Self {
        Self {
            interval,
            max_delay,
        }
    }
}

/// Start a stage with an arbitrary accumulator
///
/// Both channels are rendezvous channels: a send on the input blocks until
/// the worker takes it, and the worker blocks until the consumer receives.
pub fn stage<A: Accumulator>(
    config: DebounceConfig,
) -> Result<(Sender<A::Item>, Receiver<A::Output>)> {
    let (input_tx, input_rx) = crossbeam_channel::bounded(0);
    let (output_tx, output_rx) = crossbeam_channel::bounded(0);

    thread::Builder::new()
        .name("pathwatch-debounce".into())
        .spawn(move || run::<A>(config, input_rx, output_tx))
        .map_err(WatchError::Spawn)?;

    Ok((input_tx, output_rx))
}

/// One `()` per burst
pub fn signal(interval: Duration, max_delay: Duration) -> Result<(Sender<()>, Receiver<()>)> {
    stage::<Signal>(DebounceConfig::new(interval, max_delay))
}

/// Every input of a burst, in arrival order
pub fn grouped<T: Send + 'static>(
    interval: Duration,
    max_delay: Duration,
) -> Result<(Sender<T>, Receiver<Vec<T>>)> {
    stage::<Grouped<T>>(DebounceConfig::new(interval, max_delay))
}

/// The latest input of each burst
pub fn last<T: Send + 'static>(
    interval: Duration,
    max_delay: Duration,
) -> Result<(Sender<T>, Receiver<T>)> {
    stage::<Last<T>>(DebounceConfig::new(interval, max_delay))
}

/// How many inputs each burst contained
pub fn counted(interval: Duration, max_delay: Duration) -> Result<(Sender<()>, Receiver<usize>)> {
    stage::<Counted>(DebounceConfig::new(interval, max_delay))
}

fn run<A: Accumulator>(config: DebounceConfig, input: Receiver<A::Item>, output: Sender<A::Output>) {
    let mut acc = A::default();
    let mut timers = Timers::new(config);

    loop {
        let interval = timers.interval();
        let max_delay = timers.max_delay();

        select! {
            recv(input) -> msg => match msg {
                Ok(item) => {
                    acc.add(item);
                    timers.restart_interval();
                    timers.arm_max_delay();
                }
                Err(_) => {
                    if let Some(aggregate) = acc.drain() {
                        let _ = output.send(aggregate);
                    }
                    debug!("Debounce input closed");
                    break;
                }
            },
            recv(interval) -> _ => {
                timers.clear();
                if !flush(&mut acc, &output) {
                    break;
                }
            },
            recv(max_delay) -> _ => {
                debug!("Debounce max delay reached");
                timers.clear();
                if !flush(&mut acc, &output) {
                    break;
                }
            },
        }
    }
}

/// Hand the pending aggregate over; false once nobody is listening
fn flush<A: Accumulator>(acc: &mut A, output: &Sender<A::Output>) -> bool {
    match acc.drain() {
        Some(aggregate) => output.send(aggregate).is_ok(),
        None => true,
    }
}
