use std::sync::{Mutex, PoisonError};

/// Counts one running operation on a piece of shared state. The count is
/// released on drop, so a cancelled future does not leave the state busy.
pub(crate) struct Busy<'a, S> {
    state: &'a Mutex<S>,
    counter: fn(&mut S) -> &mut usize,
}

impl<'a, S> Busy<'a, S> {
    pub(crate) fn enter(state: &'a Mutex<S>, counter: fn(&mut S) -> &mut usize) -> Self {
        {
            let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
            *counter(&mut guard) += 1;
        }
        Self { state, counter }
    }
}

impl<S> Drop for Busy<'_, S> {
    fn drop(&mut self) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let count = (self.counter)(&mut guard);
        *count = count.saturating_sub(1);
    }
}
