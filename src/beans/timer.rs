//! Timing statistics bean.
//!
//! `Timer` records the duration of a measured block and exposes count,
//! min/max/avg/last time as read-only attributes plus a write-only `reset`.
//! The bookkeeping update runs under the bean lock; the measured work does
//! not, so concurrent measurements only serialize on the final update.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use lazy_static::lazy_static;

use crate::bean::{Bean, BeanCore};
use crate::bean_type::BeanType;
use crate::config::TimerConfig;
use crate::descriptor::ValueType;
use crate::error::{BeanError, BeanResult};
use crate::value::Value;

lazy_static! {
    pub static ref TIMER_TYPE: BeanType = BeanType::builder("Timer")
        .reader(
            "total_count",
            ValueType::Integer,
            "Number of times the measured block has run"
        )
        .reader(
            "count",
            ValueType::Integer,
            "Number of times the measured block has run since the last reset"
        )
        .reader(
            "max_time",
            ValueType::Float,
            "The maximum time (msec) for all the runs of the timed instruction"
        )
        .reader(
            "min_time",
            ValueType::Float,
            "The minimum time (msec) for all the runs of the timed instruction"
        )
        .reader(
            "last_time",
            ValueType::Float,
            "The time (msec) for the last run of the timed instruction"
        )
        .reader(
            "avg_time",
            ValueType::Float,
            "The average time (msec) for all runs of the timed instruction"
        )
        .writer(
            "reset",
            ValueType::Boolean,
            "Reset the times and counts to zero (Note that total_count and last_time are not reset)"
        )
        .build()
        .expect("Timer bean type declaration");
}

// min_time が未設定であることを示すビット列 (NaN)
const UNSET: u64 = u64::MAX;

/// f64 stored as bits so it can be read without the bean lock.
#[derive(Debug)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn unset() -> Self {
        Self(AtomicU64::new(UNSET))
    }

    fn load(&self) -> Option<f64> {
        match self.0.load(Ordering::Relaxed) {
            UNSET => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    fn get(&self) -> f64 {
        self.load().unwrap_or(0.0)
    }

    fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    fn clear(&self) {
        self.0.store(UNSET, Ordering::Relaxed);
    }
}

#[derive(Debug)]
pub struct Timer {
    core: BeanCore,
    total_count: AtomicU64,
    count: AtomicU64,
    min_time: AtomicF64,
    max_time: AtomicF64,
    sum_time: AtomicF64,
    last_time: AtomicF64,
    slow_threshold_ms: f64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self::with_config(&TimerConfig::default())
    }

    pub fn with_config(config: &TimerConfig) -> Self {
        Self {
            core: BeanCore::new(),
            total_count: AtomicU64::new(0),
            count: AtomicU64::new(0),
            min_time: AtomicF64::unset(),
            max_time: AtomicF64::new(0.0),
            sum_time: AtomicF64::new(0.0),
            last_time: AtomicF64::new(0.0),
            slow_threshold_ms: config.slow_threshold.as_secs_f64() * 1000.0,
        }
    }

    /// Runs `f` and records its wall-clock duration in milliseconds, also
    /// when `f` panics. Returns the duration.
    pub fn measure<T>(&self, f: impl FnOnce() -> T) -> f64 {
        self.measure_with(f).1
    }

    /// Like [`Timer::measure`] but keeps the result of `f`.
    pub fn measure_with<T>(&self, f: impl FnOnce() -> T) -> (T, f64) {
        let guard = MeasureGuard::start(self);
        let result = f();
        (result, guard.finish())
    }

    /// Awaits `future` and records how long it took. A future dropped before
    /// completion is recorded too.
    pub async fn measure_async<F: Future>(&self, future: F) -> (F::Output, f64) {
        let guard = MeasureGuard::start(self);
        let output = future.await;
        (output, guard.finish())
    }

    /// Records one measurement of `duration_ms`.
    pub fn record(&self, duration_ms: f64) {
        self.core.synchronize(|| {
            self.last_time.set(duration_ms);
            self.count.fetch_add(1, Ordering::Relaxed);
            self.total_count.fetch_add(1, Ordering::Relaxed);
            self.sum_time.set(self.sum_time.get() + duration_ms);
            match self.min_time.load() {
                Some(min) if min <= duration_ms => {}
                _ => self.min_time.set(duration_ms),
            }
            if duration_ms > self.max_time.get() {
                self.max_time.set(duration_ms);
            }
        });
        if self.slow_threshold_ms > 0.0 && duration_ms > self.slow_threshold_ms {
            tracing::warn!(
                "Timer measurement {:.1}ms exceeded threshold {:.1}ms",
                duration_ms,
                self.slow_threshold_ms
            );
        }
    }

    /// Clears count and the min/max/sum times. `total_count` and
    /// `last_time` are kept.
    pub fn reset(&self) {
        self.core.synchronize(|| {
            self.count.store(0, Ordering::Relaxed);
            self.min_time.clear();
            self.max_time.set(0.0);
            self.sum_time.set(0.0);
        });
    }

    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// 0.0 until the first measurement after construction or reset.
    pub fn min_time(&self) -> f64 {
        self.min_time.get()
    }

    pub fn max_time(&self) -> f64 {
        self.max_time.get()
    }

    pub fn last_time(&self) -> f64 {
        self.last_time.get()
    }

    /// Average of the measurements since the last reset.
    ///
    /// Read without the bean lock: under concurrent `record` calls the count
    /// and sum may come from different updates.
    pub fn avg_time(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        let sum = self.sum_time.get();
        if count == 0 {
            return 0.0;
        }
        sum / count as f64
    }
}

impl Bean for Timer {
    fn bean_type(&self) -> &BeanType {
        &TIMER_TYPE
    }

    fn bean_core(&self) -> &BeanCore {
        &self.core
    }

    fn read_attribute(&self, name: &str) -> Option<Value> {
        let value = match name {
            "total_count" => Value::from(self.total_count()),
            "count" => Value::from(self.count()),
            "max_time" => Value::from(self.max_time()),
            "min_time" => Value::from(self.min_time()),
            "last_time" => Value::from(self.last_time()),
            "avg_time" => Value::from(self.avg_time()),
            _ => return None,
        };
        Some(value)
    }

    fn write_attribute(&self, name: &str, value: &Value) -> BeanResult<()> {
        match name {
            "reset" => {
                let reset = value
                    .to_bool()
                    .ok_or_else(|| BeanError::invalid_value(name, ValueType::Boolean, value))?;
                if reset {
                    self.reset();
                }
                Ok(())
            }
            _ => Err(BeanError::NotWritable {
                name: name.to_string(),
            }),
        }
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total_count={} count={} min={:.1}ms max={:.1}ms avg={:.1}ms",
            self.total_count(),
            self.count(),
            self.min_time(),
            self.max_time(),
            self.avg_time()
        )
    }
}

/// Records the elapsed time when finished or dropped, whichever comes first.
struct MeasureGuard<'a> {
    timer: &'a Timer,
    start: Instant,
    recorded: bool,
}

impl<'a> MeasureGuard<'a> {
    fn start(timer: &'a Timer) -> Self {
        Self {
            timer,
            start: Instant::now(),
            recorded: false,
        }
    }

    fn finish(mut self) -> f64 {
        self.record()
    }

    fn record(&mut self) -> f64 {
        let elapsed = self.start.elapsed().as_secs_f64() * 1000.0;
        self.recorded = true;
        self.timer.record(elapsed);
        elapsed
    }
}

impl Drop for MeasureGuard<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            self.record();
        }
    }
}
