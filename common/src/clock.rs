//! [`Clock`] abstractions.

use std::sync::{Arc, RwLock};

use crate::DateTime;

/// Source of the current [`DateTime`].
pub trait Clock {
    /// Returns the current [`DateTime`].
    fn now(&self) -> DateTime;
}

/// [`Clock`] reading the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct System;

impl Clock for System {
    fn now(&self) -> DateTime {
        DateTime::now()
    }
}

/// [`Clock`] frozen at a manually controlled [`DateTime`].
///
/// Clones share the same moment, so moving one of them moves all of them.
#[derive(Clone, Debug)]
pub struct Fixed(Arc<RwLock<DateTime>>);

impl Fixed {
    /// Creates a new [`Fixed`] [`Clock`] stopped at the provided [`DateTime`].
    #[must_use]
    pub fn at(now: DateTime) -> Self {
        Self(Arc::new(RwLock::new(now)))
    }

    /// Moves this [`Fixed`] [`Clock`] to the provided [`DateTime`].
    pub fn set(&self, now: DateTime) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

impl Clock for Fixed {
    fn now(&self) -> DateTime {
        *self.0.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Clock as _, Fixed};
    use crate::DateTime;

    #[test]
    fn fixed_clock_is_shared_between_clones() {
        let start = DateTime::from_rfc3339("2024-05-01T07:00:00Z").unwrap();
        let clock = Fixed::at(start);
        let copy = clock.clone();

        copy.set(start + Duration::from_secs(60));

        assert_eq!(clock.now(), start + Duration::from_secs(60));
    }
}
