//! Crash recovery: replay the ledger at startup and hand each account's
//! fresh session to a dispatch loop at its persisted cursor.

use std::sync::Arc;
use std::time::Duration;

use drumbeat_core::traits::MessengerSession;
use drumbeat_core::types::SessionRecord;

use crate::dispatch::AUTH_RETRY_BACKOFF;
use crate::engine::SessionEngine;

/// Pause before each record so a large ledger does not stampede the
/// collaborator with simultaneous logins.
pub const RESUME_STAGGER: Duration = Duration::from_secs(2);

/// Resume every persisted session, in ledger order.
///
/// Each record gets one login plus one retry; records that stay
/// unauthenticatable (or fail validation) are pruned from the ledger so the
/// next startup does not retry them forever. Accounts already running are
/// left alone.
pub async fn resume_all(engine: Arc<SessionEngine>) {
    let records = engine.ledger().load_all().await;
    if records.is_empty() {
        tracing::info!("🔄 No sessions to resume");
        return;
    }
    tracing::info!("🔄 Resuming {} session(s) from ledger", records.len());

    for record in records {
        tokio::time::sleep(RESUME_STAGGER).await;

        let account_id = record.account_id.clone();
        if let Err(e) = record.validate() {
            tracing::warn!("⚠️ [{account_id}] dropping unusable ledger record: {e}");
            let _ = engine.ledger().remove(&account_id).await;
            continue;
        }
        if engine.is_active(&account_id) {
            tracing::debug!("[{account_id}] already running, skipping resume");
            continue;
        }

        let Some(session) = authenticate_with_retry(&engine, &record).await else {
            tracing::warn!("🛑 [{account_id}] resume failed, removing record");
            let _ = engine.ledger().remove(&account_id).await;
            continue;
        };
        engine.devices().save(&session.refreshed_profile());
        tracing::info!(
            "✅ [{account_id}] resumed at cursor {} of {}",
            record.start_cursor(),
            record.messages.len()
        );
        engine.spawn_resumed(record, session);
    }
}

/// One login, and on failure one retry after a fixed pause.
async fn authenticate_with_retry(
    engine: &Arc<SessionEngine>,
    record: &SessionRecord,
) -> Option<Box<dyn MessengerSession>> {
    for attempt in 1..=2u32 {
        let profile = engine.devices().load();
        match engine
            .messenger()
            .authenticate(&record.credentials, &profile)
            .await
        {
            Ok(session) => return Some(session),
            Err(e) => {
                tracing::warn!(
                    "❌ [{}] resume login attempt {attempt} failed: {e}",
                    record.account_id
                );
                if attempt == 1 {
                    tokio::time::sleep(AUTH_RETRY_BACKOFF).await;
                }
            }
        }
    }
    None
}
