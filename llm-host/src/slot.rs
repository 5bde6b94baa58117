use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::errors::Result;

struct SlotState<T> {
    instance: Option<T>,
    last_used: Instant,
}

/// Lazily builds and holds one model instance. The model's weights, once
/// built, are never dropped by this slot; what gets evicted after
/// `idle_timeout` is the right to treat the existing instance as warm —
/// `with` rebuilds it transparently on the next call.
///
/// Holding `state`'s lock for the duration of `with` is what gives every
/// caller of this slot the "at most one outstanding op per model
/// context" guarantee the host promises; a panic inside `f` poisons the
/// lock rather than leaking a stuck context, which is an acceptable
/// failure mode for a process that's about to be restarted anyway.
pub struct ModelSlot<T> {
    state: Mutex<SlotState<T>>,
    loader: Box<dyn Fn() -> Result<T> + Send + Sync>,
    idle_timeout: Duration,
}

impl<T> ModelSlot<T> {
    pub fn new(idle_timeout: Duration, loader: impl Fn() -> Result<T> + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(SlotState { instance: None, last_used: Instant::now() }),
            loader: Box::new(loader),
            idle_timeout,
        }
    }

    /// Run `f` against a warm instance, building or rebuilding it first if
    /// necessary. Returns whatever `f` returns.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        let mut guard = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        let now = Instant::now();

        if guard.instance.is_some() && now.duration_since(guard.last_used) > self.idle_timeout {
            tracing::debug!("evicting idle model context");
            guard.instance = None;
        }

        if guard.instance.is_none() {
            let built = (self.loader)()?;
            guard.instance = Some(built);
        }

        guard.last_used = Instant::now();
        let result = f(guard.instance.as_mut().expect("instance just populated"));
        guard.last_used = Instant::now();
        result
    }

    /// `true` once a context has been built and is not yet idle-evicted.
    pub fn is_warm(&self) -> bool {
        let guard = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        guard.instance.is_some() && Instant::now().duration_since(guard.last_used) <= self.idle_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn builds_lazily_and_reuses_the_warm_instance() {
        let builds = Arc::new(AtomicUsize::new(0));
        let b = builds.clone();
        let slot: ModelSlot<u32> = ModelSlot::new(Duration::from_secs(300), move || {
            b.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        });

        assert_eq!(builds.load(Ordering::SeqCst), 0);
        slot.with(|v| Ok(*v)).unwrap();
        slot.with(|v| Ok(*v)).unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rebuilds_after_idle_timeout() {
        let builds = Arc::new(AtomicUsize::new(0));
        let b = builds.clone();
        let slot: ModelSlot<u32> = ModelSlot::new(Duration::from_millis(10), move || {
            b.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        });
        slot.with(|v| Ok(*v)).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        slot.with(|v| Ok(*v)).unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }
}
