use core::cell::RefCell;
use critical_section::{CriticalSection, Mutex};

/// State shared between the main loop and the timer interrupts.
///
/// Every access runs inside a critical section, so an interrupt can never
/// observe a half written value. The closure passed to [`Shared::lock`]
/// should only copy or mutate fields; drawing or other slow work belongs
/// outside of it.
pub struct Shared<T> {
    inner: Mutex<RefCell<Option<T>>>,
}

impl<T> Shared<T> {
    /// Empty slot, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Publishes the value. Interrupts see it from the next access on.
    pub fn init(&self, value: T) {
        critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).replace(value);
        });
    }

    /// Runs `f` with interrupts masked.
    /// Returns `None` if the slot has not been initialized yet.
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        critical_section::with(|cs| self.lock_in(cs, f))
    }

    /// Same as [`Shared::lock`] for callers that already hold a critical section.
    pub fn lock_in<R>(&self, cs: CriticalSection<'_>, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.inner.borrow_ref_mut(cs).as_mut().map(f)
    }
}

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_before_init_is_none() {
        let slot: Shared<u8> = Shared::new();
        assert_eq!(slot.lock(|v| *v), None);
    }

    #[test]
    fn nested_locks_share_one_critical_section() {
        let a: Shared<u8> = Shared::new();
        let b: Shared<u8> = Shared::new();
        a.init(1);
        b.init(2);
        let sum = critical_section::with(|cs| {
            a.lock_in(cs, |x| {
                *x += 10;
                b.lock_in(cs, |y| *x + *y)
            })
        });
        assert_eq!(sum, Some(Some(13)));
        assert_eq!(a.lock(|x| *x), Some(11));
    }
}
