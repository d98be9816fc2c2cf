use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};

use crate::{Clock, Formatter, Timestamp};

/// Handle to a background refresh thread.
///
/// The thread runs the tick callback on a fixed cadence until every handle
/// is dropped; dropping the last one lets the thread observe the dead weak
/// reference on its next wakeup and exit. A disabled ticker owns no thread
/// at all.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use relatime::Ticker;
///
/// let ticker = Ticker::spawn(Duration::from_millis(50), || {});
/// assert!(ticker.is_live());
/// drop(ticker); // the thread winds down on its own
/// ```
#[derive(Debug)]
pub struct Ticker {
    inner: Option<Arc<TickerInner>>,
}

#[derive(Debug)]
struct TickerInner {
    handle: OnceLock<thread::JoinHandle<()>>,
}

impl Ticker {
    /// Spawns a thread that runs `tick` every `every`.
    ///
    /// Ticks are scheduled against absolute targets from the spawn instant,
    /// so a slow callback or an oversleep skips the missed ticks instead of
    /// bunching them up. A zero interval spawns nothing and returns a
    /// disabled handle.
    pub fn spawn<F>(every: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        if every.is_zero() {
            return Self::disabled();
        }

        let inner = Arc::new(TickerInner {
            handle: OnceLock::new(),
        });
        let weak: Weak<TickerInner> = Arc::downgrade(&inner);

        let handle = thread::spawn(move || {
            let started = Instant::now();
            let mut due = every;
            loop {
                let target = started + due;
                thread::sleep(target.saturating_duration_since(Instant::now()));
                if weak.upgrade().is_none() {
                    break;
                }
                tick();
                // Realign past any ticks missed while sleeping or ticking.
                let elapsed = started.elapsed();
                while due <= elapsed {
                    due += every;
                }
            }
        });
        inner
            .handle
            .set(handle)
            .expect("failed to set ticker thread handle");

        Self { inner: Some(inner) }
    }

    /// A handle with no thread behind it.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Whether a refresh thread is (still) attached to this handle.
    pub fn is_live(&self) -> bool {
        self.inner.is_some()
    }
}

impl<C> Formatter<C>
where
    C: Clock + Clone + Send + 'static,
{
    /// Renders `then` once right away, then re-renders it on the config's
    /// refresh cadence, passing each phrase to `sink`.
    ///
    /// The returned [`Ticker`] owns the refresh thread: hold it for as long
    /// as the rendering should stay live. A `refresh_millis` of zero means
    /// the immediate render is all there is and the ticker comes back
    /// disabled.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::{Arc, Mutex};
    /// use relatime::{Config, Formatter, Timestamp};
    ///
    /// let config = Config::builder().refresh_millis(0).build();
    /// let formatter = Formatter::new(config);
    ///
    /// let seen = Arc::new(Mutex::new(Vec::new()));
    /// let sink = Arc::clone(&seen);
    /// let ticker = formatter.keep_updated(Timestamp::UNIX_EPOCH, move |phrase| {
    ///     sink.lock().unwrap().push(phrase);
    /// });
    ///
    /// assert!(!ticker.is_live());
    /// assert_eq!(seen.lock().unwrap().len(), 1);
    /// ```
    pub fn keep_updated<F>(&self, then: Timestamp, mut sink: F) -> Ticker
    where
        F: FnMut(String) + Send + 'static,
    {
        sink(self.format(then));
        let every = Duration::from_millis(self.config().refresh_millis);
        if every.is_zero() {
            return Ticker::disabled();
        }
        let formatter = self.clone();
        Ticker::spawn(every, move || sink(formatter.format(then)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct FixedClock(Timestamp);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            self.0
        }
    }

    #[test]
    fn ticks_fire_on_the_cadence() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let ticker = Ticker::spawn(Duration::from_millis(5), move || {
            seen.fetch_add(1, Ordering::Relaxed);
        });
        thread::sleep(Duration::from_millis(150));
        assert!(ticker.is_live());
        assert!(count.load(Ordering::Relaxed) >= 2);
    }

    #[test]
    fn dropping_the_handle_stops_the_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let ticker = Ticker::spawn(Duration::from_millis(5), move || {
            seen.fetch_add(1, Ordering::Relaxed);
        });
        thread::sleep(Duration::from_millis(40));
        drop(ticker);
        // Let any in-flight tick finish before freezing the count.
        thread::sleep(Duration::from_millis(20));
        let frozen = count.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::Relaxed), frozen);
    }

    #[test]
    fn zero_interval_spawns_nothing() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let ticker = Ticker::spawn(Duration::ZERO, move || {
            seen.fetch_add(1, Ordering::Relaxed);
        });
        assert!(!ticker.is_live());
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn keep_updated_renders_once_before_any_tick() {
        let config = Config::builder().refresh_millis(0).build();
        let clock = FixedClock(Timestamp::from_millis(1_316_169_030_000));
        let formatter = Formatter::with_clock(config, clock);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let then = Timestamp::from_millis(1_316_169_030_000 - 600_000);
        let ticker = formatter.keep_updated(then, move |phrase| {
            sink.lock().expect("sink lock").push(phrase);
        });

        assert!(!ticker.is_live());
        let seen = seen.lock().expect("sink lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], "this hour");
    }

    #[test]
    fn keep_updated_rerenders_on_the_cadence() {
        let config = Config::builder().refresh_millis(5).build();
        let clock = FixedClock(Timestamp::from_millis(1_316_169_030_000));
        let formatter = Formatter::with_clock(config, clock);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let then = Timestamp::from_millis(1_316_169_030_000 - 600_000);
        let ticker = formatter.keep_updated(then, move |phrase| {
            sink.lock().expect("sink lock").push(phrase);
        });

        thread::sleep(Duration::from_millis(150));
        assert!(ticker.is_live());
        let seen = seen.lock().expect("sink lock");
        assert!(seen.len() >= 2);
        assert!(seen.iter().all(|phrase| phrase == "this hour"));
    }
}
