//! The request lifecycle driver

use std::time::Instant;

use agentmart_catalog::Catalog;
use agentmart_connector::{AgentOutcome, ConnectorRouter};
use agentmart_types::{
    AccountId, AgentSlug, MartError, RequestId, RequestRecord, RequestStatus, ResponseRecord,
    Result, SessionId, Turn, TurnRole,
};
use agentmart_wallet::Wallet;
use tracing::{debug, error, info, warn};

use crate::store::{RequestStore, ResponseStore};

/// Drives each request through the status machine and applies the billing
/// contract
#[derive(Clone)]
pub struct Processor {
    catalog: Catalog,
    wallet: Wallet,
    router: ConnectorRouter,
    requests: RequestStore,
    responses: ResponseStore,
}

impl Processor {
    pub fn new(catalog: Catalog, wallet: Wallet, router: ConnectorRouter) -> Self {
        Self {
            catalog,
            wallet,
            router,
            requests: RequestStore::new(),
            responses: ResponseStore::new(),
        }
    }

    /// Submit a new request against an active listing
    ///
    /// The balance check here is read-only and best-effort: no hold is taken,
    /// so it does not guard against concurrent submissions spending the same
    /// funds. The wallet's conditional debit at completion time is the real
    /// guard. When the check fails, no record is created.
    pub async fn submit(
        &self,
        account: &AccountId,
        slug: &AgentSlug,
        input: serde_json::Value,
    ) -> Result<RequestRecord> {
        let listing = self.catalog.lookup(slug).await?;

        if !self
            .wallet
            .has_sufficient_balance(account, &listing.price)
            .await
        {
            let available = self.wallet.balance(account, listing.price.currency).await;
            debug!(account = %account, slug = %slug, "submission refused: insufficient balance");
            return Err(MartError::InsufficientBalance {
                account: account.to_string(),
                requested: listing.price.to_human(),
                available: available.to_human(),
            });
        }

        let record = RequestRecord::new(account.clone(), &listing, input);
        info!(
            request = %record.id,
            account = %account,
            slug = %slug,
            cost = %record.cost,
            "request submitted"
        );
        self.requests.upsert(record.clone()).await;
        Ok(record)
    }

    /// Process a pending request to its terminal status
    ///
    /// Calls the external system and records the outcome. Every path leaves
    /// the request terminal: a confirmed success becomes `Completed` (debited
    /// after the response is stored), and every failure - external error,
    /// malformed reply, or internal fault - becomes `Failed` with no debit.
    ///
    /// Calling this on an already-terminal request is rejected with
    /// `AlreadyTerminal`; it never double-debits and never overwrites the
    /// stored response.
    pub async fn process(&self, request_id: &RequestId) -> Result<ResponseRecord> {
        let mut record = self.requests.require(request_id).await?;

        if record.status.is_terminal() {
            return Err(MartError::AlreadyTerminal {
                request_id: request_id.to_string(),
                status: record.status,
            });
        }

        // Recorded before the external system is contacted
        record.transition(RequestStatus::Processing)?;
        self.requests.upsert(record.clone()).await;

        let started = Instant::now();
        let payload = Self::outbound_payload(&record);
        let listing = self.catalog.lookup(&record.slug).await;

        let outcome = match listing {
            Ok(listing) => match self.router.invoke(&listing, &payload).await {
                Ok(raw) => AgentOutcome::interpret(&raw),
                Err(e) => Err(e),
            },
            // Retired mid-flight; the snapshot keeps billing consistent but
            // there is no endpoint left to call
            Err(e) => Err(e),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(outcome) if outcome.success => {
                self.finish_completed(record, outcome.payload, duration_ms)
                    .await
            }
            Ok(outcome) => {
                let message = outcome
                    .error
                    .unwrap_or_else(|| "external system reported failure".to_string());
                self.finish_failed(record, message, duration_ms).await
            }
            Err(e) => {
                match &e {
                    MartError::ExternalService { .. } | MartError::MalformedReply { .. } => {
                        warn!(request = %record.id, error = %e, "external call failed");
                    }
                    _ => {
                        error!(request = %record.id, error = %e, "processing failed unexpectedly");
                    }
                }
                self.finish_failed(record, e.to_string(), duration_ms).await
            }
        }
    }

    /// Append a turn to a conversational session
    ///
    /// Finds the open-for-chat record for (account, slug, session) or creates
    /// one if absent (including when the previous record for the session has
    /// already gone terminal). Appending a turn is free; the cost snapshot is
    /// only charged when `process` is later called on the record.
    pub async fn append_turn(
        &self,
        session: &SessionId,
        account: &AccountId,
        slug: &AgentSlug,
        role: TurnRole,
        text: impl Into<String>,
    ) -> Result<RequestRecord> {
        let listing = self.catalog.lookup(slug).await?;
        if !listing.conversational {
            return Err(MartError::NotConversational {
                slug: slug.to_string(),
            });
        }

        let mut record = match self.requests.session_request(account, slug, session).await {
            Some(existing) if existing.open_for_chat() => existing,
            _ => {
                let record =
                    RequestRecord::new_session(account.clone(), &listing, session.clone());
                info!(
                    request = %record.id,
                    session = %session,
                    slug = %slug,
                    "chat session opened"
                );
                record
            }
        };

        record.append_turn(Turn::new(role, text));
        self.requests.upsert(record.clone()).await;
        Ok(record)
    }

    /// Get a request by ID
    pub async fn request(&self, id: &RequestId) -> Result<RequestRecord> {
        self.requests.require(id).await
    }

    /// Get the response for a terminal request
    pub async fn response_for(&self, request: &RequestId) -> Option<ResponseRecord> {
        self.responses.for_request(request).await
    }

    /// All requests owned by an account (oldest first)
    pub async fn requests_for_account(&self, account: &AccountId) -> Vec<RequestRecord> {
        self.requests.for_account(account).await
    }

    /// What gets carried to the external system
    ///
    /// Conversational requests send the ordered turn sequence; one-shot
    /// requests send their input payload.
    fn outbound_payload(record: &RequestRecord) -> serde_json::Value {
        if let Some(session) = &record.session {
            serde_json::json!({
                "session": session.to_string(),
                "turns": record.turns,
            })
        } else {
            record.input.clone()
        }
    }

    /// Success path: store the response, go terminal, then debit
    ///
    /// The debit happens strictly after the response is stored. A failed
    /// debit leaves the request Completed-but-undebited; that inconsistency
    /// is accepted and logged, favoring "never charge for a failed result"
    /// over exactly-once billing.
    async fn finish_completed(
        &self,
        mut record: RequestRecord,
        payload: serde_json::Value,
        duration_ms: u64,
    ) -> Result<ResponseRecord> {
        let response = ResponseRecord::success(record.id.clone(), payload, duration_ms);
        self.responses.insert(response.clone()).await?;

        record.transition(RequestStatus::Completed)?;
        self.requests.upsert(record.clone()).await;
        info!(request = %record.id, duration_ms, "request completed");

        let memo = format!("charge for agent '{}' (request {})", record.slug, record.id);
        if let Err(e) = self.wallet.debit(&record.account, record.cost, memo).await {
            warn!(
                request = %record.id,
                account = %record.account,
                cost = %record.cost,
                error = %e,
                "request completed but wallet debit failed; left undebited"
            );
        }

        Ok(response)
    }

    /// Failure path: store the failure response and go terminal, never debit
    async fn finish_failed(
        &self,
        mut record: RequestRecord,
        message: String,
        duration_ms: u64,
    ) -> Result<ResponseRecord> {
        let response = ResponseRecord::failure(record.id.clone(), message, duration_ms);
        self.responses.insert(response.clone()).await?;

        record.transition(RequestStatus::Failed)?;
        self.requests.upsert(record.clone()).await;
        info!(request = %record.id, duration_ms, "request failed");

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmart_connector::StaticConnector;
    use agentmart_types::{AgentListing, Amount, ConnectorKind, Currency};
    use serde_json::json;
    use std::sync::Arc;

    struct Fixture {
        processor: Processor,
        wallet: Wallet,
        connector: StaticConnector,
        account: AccountId,
        slug: AgentSlug,
    }

    /// One active static-connector listing priced at 5 USD, account funded
    /// with `balance` USD
    async fn fixture(balance: f64, conversational: bool) -> Fixture {
        let catalog = Catalog::new();
        let slug = AgentSlug::parse("summarizer").unwrap();
        let mut listing = AgentListing::new(slug.clone(), "Summarizer", Amount::usd(5.0))
            .with_connector(ConnectorKind::Static, None);
        if conversational {
            listing = listing.conversational();
        }
        catalog.publish(listing).await.unwrap();

        let connector = StaticConnector::new();
        connector
            .set_default_reply(json!({"success": true, "result": {"text": "done"}}))
            .await;

        let wallet = Wallet::new();
        let account = AccountId::new();
        if balance > 0.0 {
            wallet
                .credit(&account, Amount::usd(balance), "test funding")
                .await
                .unwrap();
        }

        let router = ConnectorRouter::new().with(Arc::new(connector.clone()));
        let processor = Processor::new(catalog, wallet.clone(), router);

        Fixture {
            processor,
            wallet,
            connector,
            account,
            slug,
        }
    }

    #[tokio::test]
    async fn test_submit_creates_pending_record_with_cost_snapshot() {
        let f = fixture(10.0, false).await;

        let record = f
            .processor
            .submit(&f.account, &f.slug, json!({"text": "long document"}))
            .await
            .unwrap();

        assert_eq!(record.status, RequestStatus::Pending);
        assert_eq!(record.cost, Amount::usd(5.0));
        assert!(record.completed_at.is_none());
        // Non-terminal: no response yet
        assert!(f.processor.response_for(&record.id).await.is_none());
    }

    #[tokio::test]
    async fn test_successful_completion_debits_once() {
        let f = fixture(10.0, false).await;
        let record = f
            .processor
            .submit(&f.account, &f.slug, json!({}))
            .await
            .unwrap();

        let response = f.processor.process(&record.id).await.unwrap();

        assert!(response.success);
        assert_eq!(response.payload, json!({"text": "done"}));

        let record = f.processor.request(&record.id).await.unwrap();
        assert_eq!(record.status, RequestStatus::Completed);
        assert!(record.completed_at.is_some());

        // Debited exactly once by record.cost
        assert_eq!(
            f.wallet.balance(&f.account, Currency::Usd).await,
            Amount::usd(5.0)
        );
        let debits: Vec<_> = f
            .wallet
            .account_entries(&f.account)
            .await
            .into_iter()
            .filter(|e| e.kind == agentmart_wallet::EntryKind::Debit)
            .collect();
        assert_eq!(debits.len(), 1);
        assert!(debits[0].memo.contains("summarizer"));
    }

    #[tokio::test]
    async fn test_insufficient_balance_creates_no_record() {
        let f = fixture(3.0, false).await;

        let err = f
            .processor
            .submit(&f.account, &f.slug, json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, MartError::InsufficientBalance { .. }));
        assert!(f.processor.requests_for_account(&f.account).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_slug() {
        let f = fixture(10.0, false).await;
        let missing = AgentSlug::parse("missing").unwrap();

        let err = f
            .processor
            .submit(&f.account, &missing, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MartError::AgentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_external_failure_no_debit() {
        let f = fixture(10.0, false).await;
        let record = f
            .processor
            .submit(&f.account, &f.slug, json!({}))
            .await
            .unwrap();

        f.connector.fail_with("upstream exploded").await;
        let response = f.processor.process(&record.id).await.unwrap();

        assert!(!response.success);
        assert!(response.error.as_deref().unwrap().contains("upstream exploded"));

        let record = f.processor.request(&record.id).await.unwrap();
        assert_eq!(record.status, RequestStatus::Failed);
        assert!(record.completed_at.is_some());

        // Wallet untouched on any failure path
        assert_eq!(
            f.wallet.balance(&f.account, Currency::Usd).await,
            Amount::usd(10.0)
        );
    }

    #[tokio::test]
    async fn test_malformed_reply_fails_without_debit() {
        let f = fixture(10.0, false).await;
        f.connector
            .set_default_reply(json!({"unexpected": "shape"}))
            .await;

        let record = f
            .processor
            .submit(&f.account, &f.slug, json!({}))
            .await
            .unwrap();
        let response = f.processor.process(&record.id).await.unwrap();

        assert!(!response.success);
        let record = f.processor.request(&record.id).await.unwrap();
        assert_eq!(record.status, RequestStatus::Failed);
        assert_eq!(
            f.wallet.balance(&f.account, Currency::Usd).await,
            Amount::usd(10.0)
        );
    }

    #[tokio::test]
    async fn test_reported_failure_records_error_message() {
        let f = fixture(10.0, false).await;
        f.connector
            .set_default_reply(json!({"success": false, "error": "model overloaded"}))
            .await;

        let record = f
            .processor
            .submit(&f.account, &f.slug, json!({}))
            .await
            .unwrap();
        let response = f.processor.process(&record.id).await.unwrap();

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("model overloaded"));
        assert_eq!(
            f.wallet.balance(&f.account, Currency::Usd).await,
            Amount::usd(10.0)
        );
    }

    #[tokio::test]
    async fn test_process_is_not_repeatable() {
        let f = fixture(10.0, false).await;
        let record = f
            .processor
            .submit(&f.account, &f.slug, json!({}))
            .await
            .unwrap();

        f.processor.process(&record.id).await.unwrap();
        let err = f.processor.process(&record.id).await.unwrap_err();

        assert!(matches!(err, MartError::AlreadyTerminal { .. }));
        // Still debited exactly once
        assert_eq!(
            f.wallet.balance(&f.account, Currency::Usd).await,
            Amount::usd(5.0)
        );
    }

    #[tokio::test]
    async fn test_terminal_iff_response_exists() {
        let f = fixture(10.0, false).await;
        let record = f
            .processor
            .submit(&f.account, &f.slug, json!({}))
            .await
            .unwrap();

        assert!(f.processor.response_for(&record.id).await.is_none());
        f.processor.process(&record.id).await.unwrap();

        let record = f.processor.request(&record.id).await.unwrap();
        assert!(record.status.is_terminal());
        assert!(f.processor.response_for(&record.id).await.is_some());
    }

    #[tokio::test]
    async fn test_completed_but_undebited_when_funds_drained() {
        let f = fixture(10.0, false).await;
        let record = f
            .processor
            .submit(&f.account, &f.slug, json!({}))
            .await
            .unwrap();

        // Drain the balance below the cost snapshot between submit and
        // process; the stale check surfaces as a debit failure, not a
        // negative balance
        f.wallet
            .debit(&f.account, Amount::usd(8.0), "concurrent spend")
            .await
            .unwrap();

        let response = f.processor.process(&record.id).await.unwrap();
        assert!(response.success);

        let record = f.processor.request(&record.id).await.unwrap();
        assert_eq!(record.status, RequestStatus::Completed);
        // Undebited: balance unchanged by the completion
        assert_eq!(
            f.wallet.balance(&f.account, Currency::Usd).await,
            Amount::usd(2.0)
        );
    }

    #[tokio::test]
    async fn test_two_turns_one_record() {
        let f = fixture(10.0, true).await;
        let session = SessionId::new();

        let first = f
            .processor
            .append_turn(&session, &f.account, &f.slug, TurnRole::User, "hello")
            .await
            .unwrap();
        let second = f
            .processor
            .append_turn(&session, &f.account, &f.slug, TurnRole::Agent, "hi there")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.turns.len(), 2);
        assert_eq!(second.turns[0].role, TurnRole::User);
        assert_eq!(second.turns[1].role, TurnRole::Agent);
        assert_eq!(f.processor.requests_for_account(&f.account).await.len(), 1);

        // Turn appension is free
        assert_eq!(
            f.wallet.balance(&f.account, Currency::Usd).await,
            Amount::usd(10.0)
        );
    }

    #[tokio::test]
    async fn test_chat_then_generate_debits_once() {
        let f = fixture(10.0, true).await;
        let session = SessionId::new();

        let record = f
            .processor
            .append_turn(&session, &f.account, &f.slug, TurnRole::User, "summarize this")
            .await
            .unwrap();
        let response = f.processor.process(&record.id).await.unwrap();

        assert!(response.success);
        assert_eq!(
            f.wallet.balance(&f.account, Currency::Usd).await,
            Amount::usd(5.0)
        );

        // The session is closed; the next turn opens a fresh record
        let next = f
            .processor
            .append_turn(&session, &f.account, &f.slug, TurnRole::User, "another round")
            .await
            .unwrap();
        assert_ne!(next.id, record.id);
        assert_eq!(next.turns.len(), 1);
    }

    #[tokio::test]
    async fn test_append_turn_non_conversational() {
        let f = fixture(10.0, false).await;

        let err = f
            .processor
            .append_turn(&SessionId::new(), &f.account, &f.slug, TurnRole::User, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, MartError::NotConversational { .. }));
    }

    #[tokio::test]
    async fn test_retired_mid_flight_fails_cleanly() {
        let f = fixture(10.0, false).await;
        let record = f
            .processor
            .submit(&f.account, &f.slug, json!({}))
            .await
            .unwrap();

        // Retire between submit and process
        let catalog_err = f.processor.catalog.retire(&f.slug).await;
        assert!(catalog_err.is_ok());

        let response = f.processor.process(&record.id).await.unwrap();
        assert!(!response.success);

        let record = f.processor.request(&record.id).await.unwrap();
        assert_eq!(record.status, RequestStatus::Failed);
        assert_eq!(
            f.wallet.balance(&f.account, Currency::Usd).await,
            Amount::usd(10.0)
        );
    }
}
