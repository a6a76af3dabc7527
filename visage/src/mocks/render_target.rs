use std::fmt::{Display, Formatter};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::render::{RenderTarget, TransitionHandle, Tween};

/// A call received by a [`MockRenderTarget`].
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCall {
    ApplyAu {
        id: u32,
        value: f64,
        balance: Option<f64>,
    },
    SetMorph {
        name: String,
        value: f64,
    },
    TransitionAu {
        id: u32,
        value: f64,
        duration_ms: u64,
        balance: Option<f64>,
    },
    TransitionMorph {
        name: String,
        value: f64,
        duration_ms: u64,
    },
    SetViseme {
        index: usize,
        value: f64,
        jaw_scale: f64,
    },
    TransitionViseme {
        index: usize,
        value: f64,
        duration_ms: u64,
        jaw_scale: f64,
    },
    TransitionContinuum {
        neg: u32,
        pos: u32,
        value: f64,
        duration_ms: u64,
    },
    SnippetEnd {
        name: String,
    },
}

impl RenderCall {
    /// Indicates if the call is an animated transition.
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            RenderCall::TransitionAu { .. }
                | RenderCall::TransitionMorph { .. }
                | RenderCall::TransitionViseme { .. }
                | RenderCall::TransitionContinuum { .. }
        )
    }
}

/// How the handles of a [`MockRenderTarget`] complete.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandleMode {
    /// After the requested duration.
    #[default]
    Timed,
    /// Immediately.
    Instant,
    /// When the test calls [`MockRenderTarget::complete_all`].
    Manual,
}

/// Mock [`RenderTarget`] for testing purposes: records every call it receives.
#[derive(Clone, Debug, Default)]
pub struct MockRenderTarget {
    calls: Arc<Mutex<Vec<RenderCall>>>,
    pending: Arc<Mutex<Vec<TransitionHandle>>>,
    mode: HandleMode,
    continuum: bool,
}

impl MockRenderTarget {
    pub fn new(mode: HandleMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Declares support for continuum transitions.
    pub fn set_continuum(mut self, continuum: bool) -> Self {
        self.continuum = continuum;
        self
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    /// Only the animated transitions received.
    pub fn transitions(&self) -> Vec<RenderCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.is_transition())
            .cloned()
            .collect()
    }

    /// Names of the snippets reported as ended, in order.
    pub fn ended(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RenderCall::SnippetEnd { name } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// The handles (of manual mode) not completed yet.
    pub fn pending(&self) -> Vec<TransitionHandle> {
        self.pending
            .lock()
            .iter()
            .filter(|handle| !handle.is_done())
            .cloned()
            .collect()
    }

    /// Completes every pending handle (manual mode).
    pub fn complete_all(&self) {
        for handle in self.pending.lock().drain(..) {
            handle.complete();
        }
    }

    fn record(&self, call: RenderCall) {
        self.calls.lock().push(call);
    }

    fn handle(&self, duration_ms: u64) -> TransitionHandle {
        match self.mode {
            HandleMode::Timed => Tween::delay(duration_ms),
            HandleMode::Instant => TransitionHandle::completed(),
            HandleMode::Manual => {
                let handle = TransitionHandle::new();
                self.pending.lock().push(handle.clone());
                handle
            }
        }
    }
}

impl Display for MockRenderTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MockRenderTarget [mode={:?}, calls={}]",
            self.mode,
            self.calls.lock().len()
        )
    }
}

impl RenderTarget for MockRenderTarget {
    fn apply_au(&self, id: u32, value: f64, balance: Option<f64>) {
        self.record(RenderCall::ApplyAu { id, value, balance });
    }

    fn set_morph(&self, name: &str, value: f64) {
        self.record(RenderCall::SetMorph {
            name: name.to_string(),
            value,
        });
    }

    fn transition_au(
        &self,
        id: u32,
        value: f64,
        duration_ms: u64,
        balance: Option<f64>,
    ) -> TransitionHandle {
        self.record(RenderCall::TransitionAu {
            id,
            value,
            duration_ms,
            balance,
        });
        self.handle(duration_ms)
    }

    fn transition_morph(&self, name: &str, value: f64, duration_ms: u64) -> TransitionHandle {
        self.record(RenderCall::TransitionMorph {
            name: name.to_string(),
            value,
            duration_ms,
        });
        self.handle(duration_ms)
    }

    fn set_viseme(&self, index: usize, value: f64, jaw_scale: f64) {
        self.record(RenderCall::SetViseme {
            index,
            value,
            jaw_scale,
        });
    }

    fn transition_viseme(
        &self,
        index: usize,
        value: f64,
        duration_ms: u64,
        jaw_scale: f64,
    ) -> TransitionHandle {
        self.record(RenderCall::TransitionViseme {
            index,
            value,
            duration_ms,
            jaw_scale,
        });
        self.handle(duration_ms)
    }

    fn supports_continuum(&self) -> bool {
        self.continuum
    }

    fn transition_continuum(
        &self,
        neg: u32,
        pos: u32,
        value: f64,
        duration_ms: u64,
    ) -> TransitionHandle {
        self.record(RenderCall::TransitionContinuum {
            neg,
            pos,
            value,
            duration_ms,
        });
        self.handle(duration_ms)
    }

    fn on_snippet_end(&self, name: &str) {
        self.record(RenderCall::SnippetEnd {
            name: name.to_string(),
        });
    }
}
