use std::sync::{Mutex, MutexGuard, PoisonError};

static ENV: Mutex<()> = Mutex::new(());

/// Exclusive access to the process environment for config tests.
///
/// Every variable touched through the scope is put back, in reverse order,
/// before the lock is released.
pub(super) struct EnvScope {
    saved: Vec<(&'static str, Option<String>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvScope {
    pub(super) fn lock() -> Self {
        Self {
            saved: Vec::new(),
            _guard: ENV.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub(super) fn set(&mut self, key: &'static str, value: &str) -> &mut Self {
        self.save(key);
        // SAFETY: config tests only touch the environment through an
        // EnvScope, and at most one scope exists at a time.
        unsafe { std::env::set_var(key, value) };
        self
    }

    pub(super) fn unset(&mut self, key: &'static str) -> &mut Self {
        self.save(key);
        // SAFETY: as in `set`.
        unsafe { std::env::remove_var(key) };
        self
    }

    fn save(&mut self, key: &'static str) {
        if !self.saved.iter().any(|(saved, _)| *saved == key) {
            self.saved.push((key, std::env::var(key).ok()));
        }
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..).rev() {
            // SAFETY: the scope still holds the environment lock.
            unsafe {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
