use crate::errors::SchedulerError;
use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

/// Handle that prevents a scheduled event from firing once cancelled.
///
/// Clones share the flag. Cancelling an event that already fired does nothing.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

struct Entry<E> {
    time: f64,
    seq: u64,
    token: CancellationToken,
    event: E,
}

impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: earliest time, then lowest sequence, wins
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<E> Eq for Entry<E> {}

/// Discrete-event queue driving one global simulated clock.
///
/// Events come out in nondecreasing time order; events scheduled for the
/// same instant come out in the order they were scheduled.
pub struct Scheduler<E> {
    now: f64,
    next_seq: u64,
    queue: BinaryHeap<Entry<E>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// Current simulated time, seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Pending entries, cancelled ones included.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Time of the earliest pending entry.
    pub fn next_time(&self) -> Option<f64> {
        self.queue.peek().map(|e| e.time)
    }

    /// Schedules `event` to fire `delay` seconds from now.
    pub fn schedule(&mut self, delay: f64, event: E) -> Result<CancellationToken, SchedulerError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SchedulerError::InvalidDelay(delay));
        }
        Ok(self.push(self.now + delay, event))
    }

    /// Schedules `event` at absolute time `time`, which must not lie in the past.
    pub fn schedule_at(
        &mut self,
        time: f64,
        event: E,
    ) -> Result<CancellationToken, SchedulerError> {
        if !time.is_finite() {
            return Err(SchedulerError::InvalidDelay(time));
        }
        if time < self.now {
            return Err(SchedulerError::InThePast { at: time, now: self.now });
        }
        Ok(self.push(time, event))
    }

    fn push(&mut self, time: f64, event: E) -> CancellationToken {
        let token = CancellationToken::default();
        self.queue.push(Entry {
            time,
            seq: self.next_seq,
            token: token.clone(),
            event,
        });
        self.next_seq += 1;
        token
    }

    /// Pops the next live event strictly before `horizon` and moves the clock to it.
    ///
    /// Cancelled entries are dropped on the way.
    pub fn pop_before(&mut self, horizon: f64) -> Option<(f64, E)> {
        while self.queue.peek().is_some_and(|e| e.time < horizon) {
            let entry = self.queue.pop()?;
            if entry.token.is_cancelled() {
                continue;
            }
            self.now = entry.time;
            return Some((entry.time, entry.event));
        }
        None
    }

    /// Moves the clock forward to `time`; never backwards.
    pub fn advance_to(&mut self, time: f64) {
        if time > self.now {
            self.now = time;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_time_order() {
        let mut s = Scheduler::new();
        s.schedule(3.0, "c").unwrap();
        s.schedule(1.0, "a").unwrap();
        s.schedule(2.0, "b").unwrap();

        let order: Vec<_> = std::iter::from_fn(|| s.pop_before(10.0)).collect();
        assert_eq!(order, vec![(1.0, "a"), (2.0, "b"), (3.0, "c")]);
        assert_eq!(s.now(), 3.0);
    }

    #[test]
    fn same_instant_is_fifo() {
        let mut s = Scheduler::new();
        for i in 0..100 {
            s.schedule(5.0, i).unwrap();
        }
        let order: Vec<_> = std::iter::from_fn(|| s.pop_before(10.0))
            .map(|(_, e)| e)
            .collect();
        assert_eq!(order, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn horizon_is_exclusive() {
        let mut s = Scheduler::new();
        s.schedule(1.0, "at-horizon").unwrap();
        assert!(s.pop_before(1.0).is_none());
        assert_eq!(s.len(), 1);
        assert_eq!(s.pop_before(1.5), Some((1.0, "at-horizon")));
    }

    #[test]
    fn cancelled_events_never_fire() {
        let mut s = Scheduler::new();
        let token = s.schedule(1.0, "dropped").unwrap();
        s.schedule(2.0, "kept").unwrap();
        token.cancel();
        assert!(token.is_cancelled());
        assert_eq!(s.pop_before(10.0), Some((2.0, "kept")));
        assert!(s.is_empty());
    }

    #[test]
    fn rejects_bad_times() {
        let mut s = Scheduler::new();
        assert!(matches!(
            s.schedule(-1.0, ()),
            Err(SchedulerError::InvalidDelay(_))
        ));
        assert!(s.schedule(f64::NAN, ()).is_err());

        s.schedule(2.0, ()).unwrap();
        s.pop_before(5.0);
        assert!(matches!(
            s.schedule_at(1.0, ()),
            Err(SchedulerError::InThePast { .. })
        ));
    }

    #[test]
    fn clock_only_moves_forward() {
        let mut s: Scheduler<()> = Scheduler::new();
        s.advance_to(4.0);
        s.advance_to(1.0);
        assert_eq!(s.now(), 4.0);
        assert_eq!(s.schedule(1.0, ()).map(|_| s.next_time()).unwrap(), Some(5.0));
    }
}
