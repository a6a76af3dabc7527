use crate::errors::{Error, StoreStopped};
use crate::state::{reduce, AnimationState, Command};

/// Whether a [`Store`] accepts commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreStatus {
    Running,
    /// Rejects commands until restarted.
    Stopped,
    /// Rejects commands for good.
    Disposed,
}

/// Owns the [`AnimationState`]: every change goes through [`dispatch`](Self::dispatch).
#[derive(Debug)]
pub struct Store {
    state: AnimationState,
    status: StoreStatus,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            state: AnimationState::default(),
            status: StoreStatus::Running,
        }
    }

    /// Reduces the command into the state.
    ///
    /// # Errors
    /// * `StoreStopped`: the store does not accept commands (stopped or disposed).
    pub fn dispatch(&mut self, command: Command) -> Result<(), Error> {
        if self.status != StoreStatus::Running {
            return Err(StoreStopped);
        }
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, command);
        Ok(())
    }

    pub fn get_state(&self) -> &AnimationState {
        &self.state
    }
    pub fn get_status(&self) -> StoreStatus {
        self.status
    }

    pub fn stop(&mut self) {
        if self.status == StoreStatus::Running {
            self.status = StoreStatus::Stopped;
        }
    }

    /// Accepts commands again.
    ///
    /// # Errors
    /// * `StoreStopped`: the store was disposed.
    pub fn restart(&mut self) -> Result<(), Error> {
        match self.status {
            StoreStatus::Disposed => Err(StoreStopped),
            _ => {
                self.status = StoreStatus::Running;
                Ok(())
            }
        }
    }

    pub fn dispose(&mut self) {
        self.status = StoreStatus::Disposed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animations::Snippet;

    #[test]
    fn test_dispatch() {
        let mut store = Store::new();
        assert_eq!(store.get_status(), StoreStatus::Running);
        assert!(store.dispatch(Command::Load(Snippet::new("a"))).is_ok());
        assert_eq!(store.get_state().len(), 1);
    }

    #[test]
    fn test_stopped_store_rejects_commands() {
        let mut store = Store::new();
        store.stop();
        let result = store.dispatch(Command::Load(Snippet::new("a")));
        assert!(matches!(result, Err(Error::StoreStopped)));
        assert!(store.get_state().is_empty());

        assert!(store.restart().is_ok());
        assert!(store.dispatch(Command::Load(Snippet::new("a"))).is_ok());
        assert_eq!(store.get_state().len(), 1);
    }

    #[test]
    fn test_disposed_store_can_not_restart() {
        let mut store = Store::new();
        store.dispose();
        store.stop();
        assert_eq!(store.get_status(), StoreStatus::Disposed);
        assert!(store.restart().is_err());
        assert!(store.dispatch(Command::Clear).is_err());
    }
}
