//! Request and response stores
//!
//! In-memory, thread-safe stores. Requests are never deleted by normal
//! operation (kept for audit and history); responses are written exactly once
//! at the terminal transition.

use std::collections::HashMap;
use std::sync::Arc;

use agentmart_types::{
    AccountId, AgentSlug, MartError, RequestId, RequestRecord, ResponseRecord, Result, SessionId,
};
use tokio::sync::RwLock;

/// Key of the session index: one open chat per (account, agent, session)
type SessionKey = (AccountId, AgentSlug, SessionId);

/// Store of request records with a secondary session index
#[derive(Clone, Default)]
pub struct RequestStore {
    requests: Arc<RwLock<HashMap<RequestId, RequestRecord>>>,
    sessions: Arc<RwLock<HashMap<SessionKey, RequestId>>>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a record, maintaining the session index
    pub async fn upsert(&self, record: RequestRecord) {
        if let Some(session) = record.session.clone() {
            let key = (record.account.clone(), record.slug.clone(), session);
            self.sessions.write().await.insert(key, record.id.clone());
        }
        self.requests
            .write()
            .await
            .insert(record.id.clone(), record);
    }

    /// Get a record by ID
    pub async fn get(&self, id: &RequestId) -> Option<RequestRecord> {
        self.requests.read().await.get(id).cloned()
    }

    /// Get a record by ID, failing with `RequestNotFound`
    pub async fn require(&self, id: &RequestId) -> Result<RequestRecord> {
        self.get(id).await.ok_or_else(|| MartError::RequestNotFound {
            request_id: id.to_string(),
        })
    }

    /// Look up the record a session currently points at
    pub async fn session_request(
        &self,
        account: &AccountId,
        slug: &AgentSlug,
        session: &SessionId,
    ) -> Option<RequestRecord> {
        let key = (account.clone(), slug.clone(), session.clone());
        let id = self.sessions.read().await.get(&key).cloned()?;
        self.get(&id).await
    }

    /// All records owned by an account (oldest first)
    pub async fn for_account(&self, account: &AccountId) -> Vec<RequestRecord> {
        let requests = self.requests.read().await;
        let mut records: Vec<_> = requests
            .values()
            .filter(|r| &r.account == account)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    /// Total number of records
    pub async fn count(&self) -> usize {
        self.requests.read().await.len()
    }
}

/// Store of response records, one per terminal request
#[derive(Clone, Default)]
pub struct ResponseStore {
    responses: Arc<RwLock<HashMap<RequestId, ResponseRecord>>>,
}

impl ResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the response for a request
    ///
    /// A second insert for the same request is an internal error; the
    /// processor's terminal guard should have refused the duplicate earlier.
    pub async fn insert(&self, response: ResponseRecord) -> Result<()> {
        let mut responses = self.responses.write().await;
        if responses.contains_key(&response.request) {
            return Err(MartError::internal(format!(
                "response already recorded for request {}",
                response.request
            )));
        }
        responses.insert(response.request.clone(), response);
        Ok(())
    }

    /// Get the response for a request
    pub async fn for_request(&self, request: &RequestId) -> Option<ResponseRecord> {
        self.responses.read().await.get(request).cloned()
    }

    /// Total number of responses
    pub async fn count(&self) -> usize {
        self.responses.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmart_types::{AgentListing, Amount};

    fn listing(slug: &str) -> AgentListing {
        AgentListing::new(AgentSlug::parse(slug).unwrap(), slug.to_string(), Amount::usd(1.0))
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = RequestStore::new();
        let record = RequestRecord::new(AccountId::new(), &listing("echo"), serde_json::json!({}));
        let id = record.id.clone();

        store.upsert(record).await;
        assert!(store.get(&id).await.is_some());
        assert!(store.require(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_require_missing() {
        let store = RequestStore::new();
        let err = store.require(&RequestId::new()).await.unwrap_err();
        assert!(matches!(err, MartError::RequestNotFound { .. }));
    }

    #[tokio::test]
    async fn test_session_index() {
        let store = RequestStore::new();
        let account = AccountId::new();
        let session = SessionId::new();
        let l = listing("chat-bot");

        let record = RequestRecord::new_session(account.clone(), &l, session.clone());
        let id = record.id.clone();
        store.upsert(record).await;

        let found = store
            .session_request(&account, &l.slug, &session)
            .await
            .unwrap();
        assert_eq!(found.id, id);

        // Different session misses
        assert!(store
            .session_request(&account, &l.slug, &SessionId::new())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_for_account_sorted() {
        let store = RequestStore::new();
        let account = AccountId::new();
        let l = listing("echo");

        let first = RequestRecord::new(account.clone(), &l, serde_json::json!({"n": 1}));
        let second = RequestRecord::new(account.clone(), &l, serde_json::json!({"n": 2}));
        store.upsert(second).await;
        store.upsert(first.clone()).await;

        let records = store.for_account(&account).await;
        assert_eq!(records.len(), 2);
        assert!(records[0].created_at <= records[1].created_at);
    }

    #[tokio::test]
    async fn test_response_insert_once() {
        let store = ResponseStore::new();
        let request = RequestId::new();

        store
            .insert(ResponseRecord::success(request.clone(), serde_json::json!({}), 5))
            .await
            .unwrap();

        let duplicate = store
            .insert(ResponseRecord::failure(request.clone(), "again", 5))
            .await;
        assert!(duplicate.is_err());
        assert!(store.for_request(&request).await.unwrap().success);
    }
}
