//! Single-writer event loop around `EngineState`.
//!
//! Messages arrive over an mpsc channel and are applied to completion in
//! arrival order. Readers watch the latest state through a `watch` channel;
//! senders get one `DispatchOutcome` per message.

use crate::action::Action;
use crate::engine::EngineState;
use crate::error::ExplorerError;
use crate::ids::IdGenerator;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub enum Dispatch {
    /// User interaction, applied unconditionally
    Apply { action: Action },
    /// Server response computed against a known revision of the tree
    ApplyIfCurrent {
        expected_revision: u64,
        action: Action,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied { revision: u64 },
    Stale { expected: u64, current: u64 },
    Rejected { message: String },
}

pub async fn run_dispatcher(
    initial_state: EngineState,
    mut dispatch_receiver: mpsc::Receiver<Dispatch>,
    outcome_sender: mpsc::Sender<DispatchOutcome>,
    state_sender: watch::Sender<Arc<EngineState>>,
    ids: Box<dyn IdGenerator>,
    cancellation_token: CancellationToken,
) -> EngineState {
    let mut state = Arc::new(initial_state);
    state_sender.send_replace(Arc::clone(&state));

    loop {
        let dispatch = tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => {
                log::debug!("Dispatcher cancelled");
                break;
            }
            message = dispatch_receiver.recv() => match message {
                Some(dispatch) => dispatch,
                None => break,
            },
        };

        let result = match &dispatch {
            Dispatch::Apply { action } => state.apply_with(action, ids.as_ref()),
            Dispatch::ApplyIfCurrent {
                expected_revision,
                action,
            } => state.apply_if_current(*expected_revision, action, ids.as_ref()),
        };

        let outcome = match result {
            Ok(next) => {
                state = Arc::new(next);
                state_sender.send_replace(Arc::clone(&state));
                DispatchOutcome::Applied {
                    revision: state.revision,
                }
            }
            Err(ExplorerError::Stale { expected, current }) => {
                DispatchOutcome::Stale { expected, current }
            }
            Err(e) => {
                if e.is_structural() {
                    log::warn!("Dispatch rejected: {}", e);
                } else {
                    log::debug!("Dispatch rejected: {}", e);
                }
                DispatchOutcome::Rejected {
                    message: e.to_string(),
                }
            }
        };

        if outcome_sender.send(outcome).await.is_err() {
            // Nobody is listening for outcomes any more
            break;
        }
    }

    Arc::try_unwrap(state).unwrap_or_else(|shared| (*shared).clone())
}
