//! Per-account dispatch loop: authenticate → send → wait, as an explicit
//! state machine.
//!
//! The transition function is pure, so the retry budget and cursor math are
//! testable without timers; the async driver interprets states against the
//! collaborator, registry, ledger, and device store. Loops run as detached
//! tasks and terminal states clean up after themselves.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use drumbeat_core::traits::MessengerSession;
use drumbeat_core::types::SessionRecord;

use crate::engine::SessionEngine;

/// Login attempts per start, counting the first.
pub const AUTH_ATTEMPT_LIMIT: u32 = 2;
/// Fixed pause between a failed login and its retry.
pub const AUTH_RETRY_BACKOFF: Duration = Duration::from_secs(3);

/// Where a dispatch loop is between suspension points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// Logging in; `attempt` counts from 1.
    Authenticating { attempt: u32, start_cursor: usize },
    /// About to deliver `messages[cursor]`.
    Sending { cursor: usize },
    /// Cadence pause before `messages[cursor]` goes out.
    Waiting { cursor: usize },
}

/// What the driver observed at the current suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    AuthSucceeded,
    AuthFailed,
    /// The account vanished from the registry.
    Cancelled,
    SendSucceeded,
    SendFailed,
    WaitElapsed,
}

/// Terminal outcome of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Login failed past the retry budget. Registry and ledger cleaned up.
    AuthFailed,
    /// A send failed; sends are never retried. Registry and ledger cleaned up.
    SendFailed,
    /// Cancelled externally; the canceller already cleaned up.
    Cancelled,
    /// Another loop already owned the account; nothing was touched.
    AlreadyRunning,
}

/// One step of the machine: keep going in a new state, or exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Continue(LoopState),
    Exit(LoopExit),
}

/// Pure transition function. `sequence_len` is the message count; it must
/// be nonzero before `Sending`/`Waiting` are reachable.
pub fn next_state(state: &LoopState, event: LoopEvent, sequence_len: usize) -> Transition {
    match (state, event) {
        (LoopState::Authenticating { start_cursor, .. }, LoopEvent::AuthSucceeded) => {
            Transition::Continue(LoopState::Sending {
                cursor: *start_cursor,
            })
        }
        (
            LoopState::Authenticating {
                attempt,
                start_cursor,
            },
            LoopEvent::AuthFailed,
        ) => {
            if *attempt < AUTH_ATTEMPT_LIMIT {
                Transition::Continue(LoopState::Authenticating {
                    attempt: attempt + 1,
                    start_cursor: *start_cursor,
                })
            } else {
                Transition::Exit(LoopExit::AuthFailed)
            }
        }
        (LoopState::Sending { .. }, LoopEvent::Cancelled) => Transition::Exit(LoopExit::Cancelled),
        (LoopState::Sending { cursor }, LoopEvent::SendSucceeded) => {
            Transition::Continue(LoopState::Waiting {
                cursor: (cursor + 1) % sequence_len,
            })
        }
        (LoopState::Sending { .. }, LoopEvent::SendFailed) => Transition::Exit(LoopExit::SendFailed),
        (LoopState::Waiting { cursor }, LoopEvent::WaitElapsed) => {
            Transition::Continue(LoopState::Sending { cursor: *cursor })
        }
        // Events that do not apply to the current state leave it unchanged.
        (state, _) => Transition::Continue(state.clone()),
    }
}

/// Drive one account's loop to termination. Entry is idempotent: the
/// registry claim fails when a loop already owns the account.
pub(crate) async fn run(
    engine: Arc<SessionEngine>,
    mut record: SessionRecord,
    initial: LoopState,
    session: Option<Box<dyn MessengerSession>>,
) -> LoopExit {
    let account_id = record.account_id.clone();
    if !engine.registry().try_start(&account_id) {
        tracing::debug!("[{account_id}] loop already running, not starting another");
        return LoopExit::AlreadyRunning;
    }

    let cadence = Duration::from_secs(record.cadence_secs);
    let sequence_len = record.messages.len();
    let mut state = initial;
    let mut session = session;

    loop {
        let event = match &state {
            LoopState::Authenticating { attempt, .. } => {
                if *attempt > 1 {
                    tokio::time::sleep(AUTH_RETRY_BACKOFF).await;
                    tracing::info!(
                        "🔁 [{account_id}] retrying login ({attempt}/{AUTH_ATTEMPT_LIMIT})"
                    );
                }
                let profile = engine.devices().load();
                match engine
                    .messenger()
                    .authenticate(&record.credentials, &profile)
                    .await
                {
                    Ok(live) => {
                        engine.devices().save(&live.refreshed_profile());
                        tracing::info!("✅ [{account_id}] logged in");
                        session = Some(live);
                        LoopEvent::AuthSucceeded
                    }
                    Err(e) => {
                        tracing::warn!("❌ [{account_id}] login failed: {e}");
                        LoopEvent::AuthFailed
                    }
                }
            }
            LoopState::Sending { cursor } => {
                if !engine.registry().is_active(&account_id) {
                    LoopEvent::Cancelled
                } else if let Some(live) = &session {
                    let message = record.compose(*cursor);
                    match live.send(&record.target_id, &message).await {
                        Ok(()) => {
                            tracing::info!(
                                "✅ [{account_id}] sent to {}: {message}",
                                record.target_id
                            );
                            record.cursor = (cursor + 1) % sequence_len;
                            record.last_send_at = Some(Utc::now());
                            persist_progress(&engine, &record).await;
                            LoopEvent::SendSucceeded
                        }
                        Err(e) => {
                            tracing::warn!("❌ [{account_id}] send failed: {e}");
                            LoopEvent::SendFailed
                        }
                    }
                } else {
                    // Sending is only reachable after a successful login.
                    tracing::warn!("❌ [{account_id}] no live session in sending state");
                    LoopEvent::SendFailed
                }
            }
            LoopState::Waiting { .. } => {
                tokio::time::sleep(cadence).await;
                LoopEvent::WaitElapsed
            }
        };

        match next_state(&state, event, sequence_len) {
            Transition::Continue(next) => state = next,
            Transition::Exit(exit) => {
                finish(&engine, &account_id, exit).await;
                return exit;
            }
        }
    }
}

/// Full-record upsert after every successful send — the ledger stays
/// self-sufficient for resume. Failures are logged and swallowed.
async fn persist_progress(engine: &SessionEngine, record: &SessionRecord) {
    let patch = match serde_json::to_value(record) {
        Ok(patch) => patch,
        Err(e) => {
            tracing::warn!(
                "⚠️ [{}] failed to serialize progress: {e}",
                record.account_id
            );
            return;
        }
    };
    if let Err(e) = engine.ledger().upsert(&record.account_id, patch).await {
        tracing::warn!("⚠️ [{}] failed to persist progress: {e}", record.account_id);
    }
}

/// Terminal cleanup. Cancellation is silent — the canceller already
/// deregistered the account and pruned its record.
async fn finish(engine: &SessionEngine, account_id: &str, exit: LoopExit) {
    match exit {
        LoopExit::Cancelled => {
            tracing::info!("🛑 [{account_id}] loop cancelled");
        }
        LoopExit::AuthFailed => {
            remove_task(engine, account_id, "login failed twice").await;
        }
        LoopExit::SendFailed => {
            remove_task(engine, account_id, "send failed").await;
        }
        LoopExit::AlreadyRunning => {}
    }
}

async fn remove_task(engine: &SessionEngine, account_id: &str, reason: &str) {
    engine.registry().stop(account_id);
    if let Err(e) = engine.ledger().remove(account_id).await {
        tracing::warn!("⚠️ [{account_id}] failed to prune ledger record: {e}");
    }
    tracing::warn!("🛑 [{account_id}] task removed ({reason})");
}
