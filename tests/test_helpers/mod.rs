//! Scoped environment overrides for integration tests.

use std::env;
use std::sync::{Mutex, MutexGuard, PoisonError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Sets `ATELIER_*` variables for its lifetime and restores the previous
/// values on drop. Holds a process-wide lock so overrides never overlap.
pub struct EnvOverrides {
    previous: Vec<(String, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvOverrides {
    /// Applies `changes`; a `None` value removes the variable.
    pub fn set(changes: &[(&str, Option<&str>)]) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = changes
            .iter()
            .map(|&(name, value)| {
                let before = env::var(name).ok();
                write_var(name, value);
                (name.to_owned(), before)
            })
            .collect();
        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for EnvOverrides {
    fn drop(&mut self) {
        for (name, value) in self.previous.drain(..).rev() {
            write_var(&name, value.as_deref());
        }
    }
}

fn write_var(name: &str, value: Option<&str>) {
    unsafe {
        // SAFETY: ENV_LOCK serializes environment mutation across tests.
        match value {
            Some(text) => env::set_var(name, text),
            None => env::remove_var(name),
        }
    }
}
