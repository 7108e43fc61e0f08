//! Burst accumulators
//!
//! The debounce worker is the same for every output shape; what differs is
//! how inputs are folded together while a burst is in progress.

/// Folds the inputs of one burst into a single output
///
/// `Default` provides the empty starting state. After [`drain`](Self::drain)
/// the accumulator must be empty again.
pub trait Accumulator: Default + Send + 'static {
    type Item: Send + 'static;
    type Output: Send + 'static;

    fn add(&mut self, item: Self::Item);

    fn is_empty(&self) -> bool;

    /// Take the aggregate, leaving the accumulator empty
    ///
    /// Returns `None` when nothing was accumulated.
    fn drain(&mut self) -> Option<Self::Output>;
}

/// One `()` per burst
#[derive(Debug, Default)]
pub struct Signal {
    pending: bool,
}

impl Accumulator for Signal {
    type Item = ();
    type Output = ();

    fn add(&mut self, _item: ()) {
        self.pending = true;
    }

    fn is_empty(&self) -> bool {
        !self.pending
    }

    fn drain(&mut self) -> Option<()> {
        std::mem::take(&mut self.pending).then_some(())
    }
}

/// Every input of the burst, in arrival order
#[derive(Debug)]
pub struct Grouped<T> {
    items: Vec<T>,
}

impl<T> Default for Grouped<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Send + 'static> Accumulator for Grouped<T> {
    type Item = T;
    type Output = Vec<T>;

    fn add(&mut self, item: T) {
        self.items.push(item);
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn drain(&mut self) -> Option<Vec<T>> {
        if self.items.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.items))
        }
    }
}

/// The most recent input of the burst
#[derive(Debug)]
pub struct Last<T> {
    last: Option<T>,
}

impl<T> Default for Last<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T: Send + 'static> Accumulator for Last<T> {
    type Item = T;
    type Output = T;

    fn add(&mut self, item: T) {
        self.last = Some(item);
    }

    fn is_empty(&self) -> bool {
        self.last.is_none()
    }

    fn drain(&mut self) -> Option<T> {
        self.last.take()
    }
}

/// Number of inputs in the burst
#[derive(Debug, Default)]
pub struct Counted {
    count: usize,
}

impl Accumulator for Counted {
    type Item = ();
    type Output = usize;

    fn add(&mut self, _item: ()) {
        self.count += 1;
    }

    fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn drain(&mut self) -> Option<usize> {
        match std::mem::take(&mut self.count) {
            0 => None,
            count => Some(count),
        }
    }
}
