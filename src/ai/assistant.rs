use std::sync::Mutex;

use super::{AiAction, GenerativeClient};
use crate::busy::Busy;

/// Message shown when an assist is requested on blank text.
pub const BLANK_INPUT_MESSAGE: &str = "Please enter some text to process";

/// Transient state read by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistantState {
    pub result: String,
    pub is_loading: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Default)]
struct Shared {
    result: String,
    error_message: Option<String>,
    requests_in_flight: usize,
}

/// View-model boundary for AI assists. Adapter failures end here as a
/// user-facing message; nothing propagates further.
pub struct Assistant {
    client: GenerativeClient,
    state: Mutex<Shared>,
}

impl Assistant {
    pub fn new(client: GenerativeClient) -> Self {
        Self {
            client,
            state: Mutex::new(Shared::default()),
        }
    }

    pub fn state(&self) -> AssistantState {
        let shared = self.state.lock().expect("assistant state poisoned");
        AssistantState {
            result: shared.result.clone(),
            is_loading: shared.requests_in_flight > 0,
            error_message: shared.error_message.clone(),
        }
    }

    /// Run `action` over `text`. Returns whether a result was produced.
    pub async fn perform(&self, action: AiAction, text: &str) -> bool {
        if text.trim().is_empty() {
            self.update(|state| state.error_message = Some(BLANK_INPUT_MESSAGE.to_string()));
            return false;
        }

        self.update(|state| {
            state.error_message = None;
            state.result.clear();
        });

        let busy = Busy::enter(&self.state, |state| &mut state.requests_in_flight);
        let outcome = self.client.run(action, text).await;
        drop(busy);

        self.update(|state| match outcome {
            Ok(result) => {
                state.result = result;
                true
            }
            Err(e) => {
                tracing::warn!("AI {} failed: {}", action, e);
                state.error_message = Some(format!("AI service error: {}", e));
                false
            }
        })
    }

    pub fn clear_result(&self) {
        self.update(|state| {
            state.result.clear();
            state.error_message = None;
        });
    }

    fn update<T>(&self, f: impl FnOnce(&mut Shared) -> T) -> T {
        let mut state = self.state.lock().expect("assistant state poisoned");
        f(&mut state)
    }
}
