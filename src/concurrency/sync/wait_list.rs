//! The set of threads blocked on one lazy cell.
//!
//! A `WaitList` lives inside the cell's mutex, so it needs no locking of its
//! own. Each waiter registers the [`Unparker`] of its thread and receives a
//! [`WaitToken`] it uses to leave the list early (on interruption).

use crossbeam_utils::sync::Unparker;

/// Identifies one registration in a [`WaitList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitToken(u64);

struct Waiter {
    token: WaitToken,
    unparker: Unparker,
}

/// Threads waiting for a state change, in registration order.
pub struct WaitList {
    next: u64,
    waiters: Vec<Waiter>,
}

impl WaitList {
    /// Creates an empty list.
    pub const fn new() -> Self {
        Self {
            next: 0,
            waiters: Vec::new(),
        }
    }

    /// Adds a waiter, returning the token that identifies it.
    pub fn register(&mut self, unparker: Unparker) -> WaitToken {
        let token = WaitToken(self.next);
        self.next += 1;
        self.waiters.push(Waiter { token, unparker });
        token
    }

    /// Removes a waiter. Returns `false` if it was already woken and removed.
    pub fn deregister(&mut self, token: WaitToken) -> bool {
        match self.waiters.iter().position(|w| w.token == token) {
            Some(index) => {
                self.waiters.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Wakes and removes every waiter. Returns how many were woken.
    pub fn wake_all(&mut self) -> usize {
        let woken = self.waiters.len();
        for waiter in self.waiters.drain(..) {
            waiter.unparker.unpark();
        }
        woken
    }

    /// Number of registered waiters.
    #[inline]
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Returns `true` if nobody is waiting.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

impl Default for WaitList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_utils::sync::Parker;

    #[test]
    fn test_register_and_deregister() {
        let parker = Parker::new();
        let mut list = WaitList::new();
        let a = list.register(parker.unparker().clone());
        let b = list.register(parker.unparker().clone());
        assert_ne!(a, b);
        assert_eq!(list.len(), 2);

        assert!(list.deregister(a));
        assert!(!list.deregister(a));
        assert_eq!(list.len(), 1);

        assert_eq!(list.wake_all(), 1);
        assert!(list.is_empty());
        assert!(!list.deregister(b));
    }

    #[test]
    fn test_wake_all_unparks() {
        let parker = Parker::new();
        let mut list = WaitList::default();
        list.register(parker.unparker().clone());
        list.wake_all();
        // The pending unpark token makes this return immediately.
        parker.park();
    }
}
