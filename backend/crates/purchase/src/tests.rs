//! Unit tests for purchase crate

#[cfg(test)]
mod fakes {
    //! In-memory implementations of the ports, enforcing the same
    //! uniqueness rules as the PostgreSQL schema.

    use std::collections::HashSet;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::Utc;
    use kernel::id::{CatalogItemId, TransactionId, UserId};

    use crate::domain::entities::{CatalogItem, NewTransaction, Transaction};
    use crate::domain::repository::{
        CatalogRepository, EntitlementGranter, LedgerInsert, PurchaseOutcome, PurchasePlan,
        PurchaseUnitOfWork, TransactionLedger,
    };
    use crate::domain::value_objects::PurchaseLineItem;
    use crate::domain::verifier::{ReceiptVerifier, VerifyError};
    use crate::error::PurchaseResult;

    #[derive(Default)]
    pub struct StoreState {
        pub catalog: Vec<CatalogItem>,
        pub transactions: Vec<Transaction>,
        pub entitlements: HashSet<(UserId, CatalogItemId)>,
    }

    #[derive(Clone, Default)]
    pub struct InMemoryStore {
        inner: Arc<Mutex<StoreState>>,
    }

    impl InMemoryStore {
        pub fn with_catalog(items: Vec<CatalogItem>) -> Self {
            let store = Self::default();
            store.inner.lock().unwrap().catalog = items;
            store
        }

        pub fn transaction_count(&self) -> usize {
            self.inner.lock().unwrap().transactions.len()
        }

        pub fn entitlement_count(&self) -> usize {
            self.inner.lock().unwrap().entitlements.len()
        }

        pub fn owns(&self, user_id: UserId, item_id: CatalogItemId) -> bool {
            self.inner
                .lock()
                .unwrap()
                .entitlements
                .contains(&(user_id, item_id))
        }

        pub fn seed_transaction(&self, new: &NewTransaction) {
            let mut state = self.inner.lock().unwrap();
            let row = materialize(new);
            state.transactions.push(row);
        }

        fn record_in(state: &mut StoreState, new: &NewTransaction) -> LedgerInsert {
            if let Some(existing) = state.transactions.iter().find(|t| {
                t.provider == new.provider
                    && t.provider_transaction_id == new.provider_transaction_id
            }) {
                return LedgerInsert {
                    created: false,
                    transaction: existing.clone(),
                };
            }
            let row = materialize(new);
            state.transactions.push(row.clone());
            LedgerInsert {
                created: true,
                transaction: row,
            }
        }

        fn grant_in(
            state: &mut StoreState,
            user_id: UserId,
            item_ids: &[CatalogItemId],
        ) -> Vec<CatalogItemId> {
            item_ids
                .iter()
                .copied()
                .filter(|id| state.entitlements.insert((user_id, *id)))
                .collect()
        }
    }

    fn materialize(new: &NewTransaction) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            user_id: new.user_id,
            provider: new.provider,
            provider_transaction_id: new.provider_transaction_id.clone(),
            amount_minor: new.amount_minor,
            currency: new.currency.clone(),
            status: new.status,
            kind: new.kind,
            direction: new.direction,
            metadata: new.metadata.clone(),
            created_at: Utc::now(),
        }
    }

    impl CatalogRepository for InMemoryStore {
        async fn find_by_product_ids(
            &self,
            product_ids: &[String],
        ) -> PurchaseResult<Vec<CatalogItem>> {
            let state = self.inner.lock().unwrap();
            Ok(state
                .catalog
                .iter()
                .filter(|item| product_ids.contains(&item.product_id))
                .cloned()
                .collect())
        }

        async fn find_by_ids(&self, ids: &[CatalogItemId]) -> PurchaseResult<Vec<CatalogItem>> {
            let state = self.inner.lock().unwrap();
            Ok(state
                .catalog
                .iter()
                .filter(|item| ids.contains(&item.id))
                .cloned()
                .collect())
        }
    }

    impl TransactionLedger for InMemoryStore {
        async fn record_if_new(&self, new: &NewTransaction) -> PurchaseResult<LedgerInsert> {
            let mut state = self.inner.lock().unwrap();
            Ok(Self::record_in(&mut state, new))
        }
    }

    impl EntitlementGranter for InMemoryStore {
        async fn grant_if_absent(
            &self,
            user_id: UserId,
            item_ids: &[CatalogItemId],
        ) -> PurchaseResult<Vec<CatalogItemId>> {
            let mut state = self.inner.lock().unwrap();
            Ok(Self::grant_in(&mut state, user_id, item_ids))
        }

        async fn owned_item_ids(&self, user_id: UserId) -> PurchaseResult<Vec<CatalogItemId>> {
            let state = self.inner.lock().unwrap();
            Ok(state
                .entitlements
                .iter()
                .filter(|(owner, _)| *owner == user_id)
                .map(|(_, item_id)| *item_id)
                .collect())
        }
    }

    impl PurchaseUnitOfWork for InMemoryStore {
        async fn commit_purchase(&self, plan: &PurchasePlan) -> PurchaseResult<PurchaseOutcome> {
            // One lock for the whole plan, mirroring one storage transaction
            let mut state = self.inner.lock().unwrap();

            let mut ledger = Vec::with_capacity(plan.lines.len());
            let mut requested = Vec::new();
            for line in &plan.lines {
                ledger.push(Self::record_in(&mut state, &line.transaction));
                if !requested.contains(&line.item_id) {
                    requested.push(line.item_id);
                }
            }

            let granted = Self::grant_in(&mut state, plan.user_id, &requested);
            let already_owned = requested
                .into_iter()
                .filter(|id| !granted.contains(id))
                .collect();

            Ok(PurchaseOutcome {
                ledger,
                granted,
                already_owned,
            })
        }
    }

    /// Verifier that replays a scripted sequence of results, repeating
    /// the last one, and counts calls.
    #[derive(Clone)]
    pub struct StubVerifier {
        script: Arc<Mutex<VecDeque<Result<Vec<PurchaseLineItem>, VerifyError>>>>,
        calls: Arc<AtomicU32>,
    }

    impl StubVerifier {
        pub fn scripted(
            results: Vec<Result<Vec<PurchaseLineItem>, VerifyError>>,
        ) -> Self {
            Self {
                script: Arc::new(Mutex::new(results.into())),
                calls: Arc::new(AtomicU32::new(0)),
            }
        }

        pub fn always(result: Result<Vec<PurchaseLineItem>, VerifyError>) -> Self {
            Self::scripted(vec![result])
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ReceiptVerifier for StubVerifier {
        async fn verify(
            &self,
            _raw_receipt: &[u8],
        ) -> Result<Vec<PurchaseLineItem>, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }
    }

    /// Verifier that sleeps before answering, for deadline tests
    pub struct SlowVerifier {
        pub delay: Duration,
        pub lines: Vec<PurchaseLineItem>,
    }

    impl ReceiptVerifier for SlowVerifier {
        async fn verify(
            &self,
            _raw_receipt: &[u8],
        ) -> Result<Vec<PurchaseLineItem>, VerifyError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.lines.clone())
        }
    }

    pub fn catalog_item(product_id: &str, title: &str) -> CatalogItem {
        CatalogItem {
            id: CatalogItemId::new(),
            product_id: product_id.to_string(),
            title: title.to_string(),
            price_minor: 999,
            currency: "USD".to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod services_tests {
    use super::fakes::catalog_item;
    use crate::domain::services::*;
    use crate::domain::value_objects::PurchaseLineItem;

    #[test]
    fn test_resolve_splits_known_and_unknown() {
        let catalog = vec![catalog_item("book.123", "Dune")];
        let lines = vec![
            PurchaseLineItem::new("book.123", "1000000000000001"),
            PurchaseLineItem::new("book.999", "1000000000000002"),
        ];

        let receipt = resolve_line_items(lines, &catalog);

        assert_eq!(receipt.resolved.len(), 1);
        assert_eq!(receipt.resolved[0].item.product_id, "book.123");
        assert_eq!(receipt.skipped_product_ids, vec!["book.999".to_string()]);
    }

    #[test]
    fn test_resolve_dedups_by_original_transaction_id() {
        let catalog = vec![catalog_item("book.123", "Dune")];
        let lines = vec![
            PurchaseLineItem::new("book.123", "1000000000000001"),
            PurchaseLineItem::new("book.123", "1000000000000001"),
        ];

        let receipt = resolve_line_items(lines, &catalog);

        assert_eq!(receipt.resolved.len(), 1);
        assert!(receipt.skipped_product_ids.is_empty());
    }

    #[test]
    fn test_resolve_keeps_distinct_transactions_of_same_product() {
        let catalog = vec![catalog_item("book.123", "Dune")];
        let lines = vec![
            PurchaseLineItem::new("book.123", "1000000000000001"),
            PurchaseLineItem::new("book.123", "1000000000000002"),
        ];

        let receipt = resolve_line_items(lines, &catalog);

        assert_eq!(receipt.resolved.len(), 2);
    }

    #[test]
    fn test_resolve_dedups_skipped_product_ids() {
        let lines = vec![
            PurchaseLineItem::new("book.999", "1000000000000001"),
            PurchaseLineItem::new("book.999", "1000000000000002"),
            PurchaseLineItem::new("book.777", "1000000000000003"),
        ];

        let receipt = resolve_line_items(lines, &[]);

        assert!(receipt.resolved.is_empty());
        assert_eq!(
            receipt.skipped_product_ids,
            vec!["book.999".to_string(), "book.777".to_string()]
        );
    }

    #[test]
    fn test_distinct_product_ids_first_seen_order() {
        let lines = vec![
            PurchaseLineItem::new("book.2", "a"),
            PurchaseLineItem::new("book.1", "b"),
            PurchaseLineItem::new("book.2", "c"),
        ];

        assert_eq!(
            distinct_product_ids(&lines),
            vec!["book.2".to_string(), "book.1".to_string()]
        );
    }
}

#[cfg(test)]
mod config_tests {
    use crate::application::config::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = PurchaseConfig::default();

        assert_eq!(config.apple_verify_url, APPLE_VERIFY_URL);
        assert_eq!(config.apple_sandbox_url, APPLE_SANDBOX_URL);
        assert!(config.apple_shared_secret.is_none());
        assert_eq!(config.verify_timeout, Duration::from_secs(10));
        assert_eq!(config.verify_retry_attempts, 2);
        assert_eq!(config.verify_retry_base_delay, Duration::from_millis(250));
        assert_eq!(config.call_deadline, Duration::from_secs(30));
    }

    #[test]
    fn test_with_random_secret() {
        let config1 = PurchaseConfig::with_random_secret();
        let config2 = PurchaseConfig::with_random_secret();

        assert_ne!(config1.api_token_secret, config2.api_token_secret);
        assert!(config1.api_token_secret.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_development_config() {
        let config = PurchaseConfig::development();

        assert_eq!(config.apple_verify_url, APPLE_SANDBOX_URL);
        assert!(config.api_token_secret.iter().any(|&b| b != 0));
    }
}

#[cfg(test)]
mod dto_tests {
    use super::fakes::catalog_item;
    use crate::application::verify_and_grant::PurchaseSummary;
    use crate::presentation::dto::*;

    #[test]
    fn test_verify_request_deserialization() {
        let json = r#"{"receipt_data":"bW9jaw=="}"#;
        let request: VerifyReceiptRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.receipt_data, "bW9jaw==");
    }

    #[test]
    fn test_summary_response_serialization() {
        let summary = PurchaseSummary {
            granted_items: vec![catalog_item("book.123", "Dune")],
            already_owned_items: vec![],
            skipped_unknown_product_ids: vec!["book.999".to_string()],
        };

        let response = PurchaseSummaryResponse::from_summary(&summary);
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains(r#""status":"success""#));
        assert!(json.contains(r#""product_id":"book.123""#));
        assert!(json.contains(r#""skipped_product_ids":["book.999"]"#));
        assert!(json.contains(r#""already_owned":[]"#));
        assert!(json.contains("1 book(s) added to your library"));
    }

    #[test]
    fn test_summary_message_already_owned() {
        let summary = PurchaseSummary {
            granted_items: vec![],
            already_owned_items: vec![catalog_item("book.123", "Dune")],
            skipped_unknown_product_ids: vec![],
        };

        let response = PurchaseSummaryResponse::from_summary(&summary);
        assert_eq!(response.message, "All purchased books are already in your library");
    }

    #[test]
    fn test_summary_message_nothing_resolved() {
        let summary = PurchaseSummary {
            granted_items: vec![],
            already_owned_items: vec![],
            skipped_unknown_product_ids: vec!["book.999".to_string()],
        };

        let response = PurchaseSummaryResponse::from_summary(&summary);
        assert_eq!(response.message, "No purchasable items found in receipt");
    }

    #[test]
    fn test_library_response_serialization() {
        let response = LibraryResponse::from_items(&[catalog_item("book.123", "Dune")]);
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains(r#""books":"#));
        assert!(json.contains(r#""title":"Dune""#));
    }
}

#[cfg(test)]
mod error_tests {
    use crate::error::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn test_error_into_response_status_codes() {
        let test_cases: Vec<(PurchaseError, StatusCode)> = vec![
            (
                PurchaseError::InvalidReceipt("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                PurchaseError::ProviderUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (PurchaseError::DeadlineExceeded, StatusCode::REQUEST_TIMEOUT),
            (PurchaseError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                PurchaseError::Internal("test".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected_status) in test_cases {
            let response = error.into_response();
            assert_eq!(
                response.status(),
                expected_status,
                "Error should return correct status code"
            );
        }
    }

    #[test]
    fn test_error_display() {
        assert!(
            PurchaseError::InvalidReceipt("no items".into())
                .to_string()
                .contains("Invalid receipt")
        );
        assert!(
            PurchaseError::DeadlineExceeded
                .to_string()
                .contains("Deadline")
        );
    }
}

#[cfg(test)]
mod token_tests {
    use kernel::id::UserId;

    use crate::presentation::middleware::{sign_user_token, verify_user_token};

    #[test]
    fn test_token_roundtrip() {
        let secret = [7u8; 32];
        let user_id = UserId::new();

        let token = sign_user_token(user_id, &secret);
        let verified = verify_user_token(&token, &secret);

        assert_eq!(verified, Some(user_id));
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let user_id = UserId::new();
        let token = sign_user_token(user_id, &[7u8; 32]);

        assert_eq!(verify_user_token(&token, &[8u8; 32]), None);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let secret = [7u8; 32];
        let token = sign_user_token(UserId::new(), &secret);

        let mut data = platform::crypto::from_base64(&token).unwrap();
        data[0] ^= 0x01;
        let tampered = platform::crypto::to_base64(&data);

        assert_eq!(verify_user_token(&tampered, &secret), None);
    }

    #[test]
    fn test_malformed_token_rejected() {
        let secret = [7u8; 32];

        assert_eq!(verify_user_token("", &secret), None);
        assert_eq!(verify_user_token("not base64!!!", &secret), None);
        assert_eq!(
            verify_user_token(&platform::crypto::to_base64(b"short"), &secret),
            None
        );
    }
}

#[cfg(test)]
mod use_case_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use kernel::id::UserId;
    use tokio::time::Instant;

    use super::fakes::{InMemoryStore, SlowVerifier, StubVerifier, catalog_item};
    use crate::application::config::PurchaseConfig;
    use crate::application::list_library::ListLibraryUseCase;
    use crate::application::verify_and_grant::{VerifyAndGrantUseCase, VerifyReceiptInput};
    use crate::domain::entities::NewTransaction;
    use crate::domain::value_objects::{Provider, PurchaseLineItem};
    use crate::domain::verifier::VerifyError;
    use crate::error::PurchaseError;

    fn test_config() -> PurchaseConfig {
        PurchaseConfig {
            verify_retry_attempts: 2,
            verify_retry_base_delay: Duration::from_millis(1),
            ..PurchaseConfig::default()
        }
    }

    fn use_case(
        verifier: StubVerifier,
        store: &InMemoryStore,
    ) -> VerifyAndGrantUseCase<StubVerifier, InMemoryStore, InMemoryStore> {
        VerifyAndGrantUseCase::new(
            Arc::new(verifier),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(test_config()),
        )
    }

    fn input(provider: Provider) -> VerifyReceiptInput {
        VerifyReceiptInput {
            raw_receipt: b"mock-receipt".to_vec(),
            provider,
            deadline: None,
        }
    }

    #[tokio::test]
    async fn test_known_and_unknown_products() {
        let dune = catalog_item("book.123", "Dune");
        let store = InMemoryStore::with_catalog(vec![dune.clone()]);
        let verifier = StubVerifier::always(Ok(vec![
            PurchaseLineItem::new("book.123", "1000000000000001"),
            PurchaseLineItem::new("book.999", "1000000000000002"),
        ]));
        let user_id = UserId::new();

        let summary = use_case(verifier, &store)
            .execute(input(Provider::Apple), user_id)
            .await
            .unwrap();

        assert_eq!(summary.granted_items.len(), 1);
        assert_eq!(summary.granted_items[0].title, "Dune");
        assert!(summary.already_owned_items.is_empty());
        assert_eq!(
            summary.skipped_unknown_product_ids,
            vec!["book.999".to_string()]
        );
        // The unknown line left no trace in storage
        assert_eq!(store.transaction_count(), 1);
        assert!(store.owns(user_id, dune.id));
    }

    #[tokio::test]
    async fn test_replayed_receipt_is_idempotent() {
        let dune = catalog_item("book.123", "Dune");
        let store = InMemoryStore::with_catalog(vec![dune.clone()]);
        let verifier = StubVerifier::always(Ok(vec![PurchaseLineItem::new(
            "book.123",
            "1000000000000001",
        )]));
        let user_id = UserId::new();
        let use_case = use_case(verifier, &store);

        let first = use_case
            .execute(input(Provider::Apple), user_id)
            .await
            .unwrap();
        let second = use_case
            .execute(input(Provider::Apple), user_id)
            .await
            .unwrap();

        assert_eq!(first.granted_items.len(), 1);
        assert!(second.granted_items.is_empty());
        assert_eq!(second.already_owned_items.len(), 1);
        assert_eq!(store.transaction_count(), 1);
        assert_eq!(store.entitlement_count(), 1);
    }

    #[tokio::test]
    async fn test_replay_heals_missing_grant() {
        // A previous call recorded the billing row but failed before
        // granting. Replaying the receipt must grant without re-billing.
        let dune = catalog_item("book.123", "Dune");
        let store = InMemoryStore::with_catalog(vec![dune.clone()]);
        let user_id = UserId::new();
        store.seed_transaction(&NewTransaction::purchase(
            user_id,
            Provider::Apple,
            "1000000000000001".to_string(),
            &dune,
        ));

        let verifier = StubVerifier::always(Ok(vec![PurchaseLineItem::new(
            "book.123",
            "1000000000000001",
        )]));

        let summary = use_case(verifier, &store)
            .execute(input(Provider::Apple), user_id)
            .await
            .unwrap();

        assert_eq!(summary.granted_items.len(), 1);
        assert_eq!(store.transaction_count(), 1);
        assert!(store.owns(user_id, dune.id));
    }

    #[tokio::test]
    async fn test_invalid_receipt_writes_nothing() {
        let store = InMemoryStore::with_catalog(vec![catalog_item("book.123", "Dune")]);
        let verifier =
            StubVerifier::always(Err(VerifyError::InvalidReceipt("rejected".to_string())));

        let result = use_case(verifier.clone(), &store)
            .execute(input(Provider::Apple), UserId::new())
            .await;

        assert!(matches!(result, Err(PurchaseError::InvalidReceipt(_))));
        // Invalid receipts are never retried
        assert_eq!(verifier.calls(), 1);
        assert_eq!(store.transaction_count(), 0);
        assert_eq!(store.entitlement_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_receipt_is_invalid() {
        let store = InMemoryStore::default();
        let verifier = StubVerifier::always(Ok(vec![]));

        let result = use_case(verifier, &store)
            .execute(input(Provider::Apple), UserId::new())
            .await;

        assert!(matches!(result, Err(PurchaseError::InvalidReceipt(_))));
    }

    #[tokio::test]
    async fn test_unknown_only_receipt_succeeds_without_writes() {
        let store = InMemoryStore::with_catalog(vec![catalog_item("book.123", "Dune")]);
        let verifier = StubVerifier::always(Ok(vec![PurchaseLineItem::new(
            "book.999",
            "1000000000000001",
        )]));

        let summary = use_case(verifier, &store)
            .execute(input(Provider::Apple), UserId::new())
            .await
            .unwrap();

        assert!(summary.granted_items.is_empty());
        assert_eq!(
            summary.skipped_unknown_product_ids,
            vec!["book.999".to_string()]
        );
        assert_eq!(store.transaction_count(), 0);
        assert_eq!(store.entitlement_count(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_retries_then_gives_up() {
        let store = InMemoryStore::default();
        let verifier = StubVerifier::always(Err(VerifyError::ProviderUnavailable(
            "connection refused".to_string(),
        )));

        let result = use_case(verifier.clone(), &store)
            .execute(input(Provider::Apple), UserId::new())
            .await;

        assert!(matches!(result, Err(PurchaseError::ProviderUnavailable(_))));
        // Initial attempt plus verify_retry_attempts retries
        assert_eq!(verifier.calls(), 3);
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let dune = catalog_item("book.123", "Dune");
        let store = InMemoryStore::with_catalog(vec![dune.clone()]);
        let verifier = StubVerifier::scripted(vec![
            Err(VerifyError::ProviderUnavailable("timeout".to_string())),
            Ok(vec![PurchaseLineItem::new("book.123", "1000000000000001")]),
        ]);
        let user_id = UserId::new();

        let summary = use_case(verifier.clone(), &store)
            .execute(input(Provider::Apple), user_id)
            .await
            .unwrap();

        assert_eq!(verifier.calls(), 2);
        assert_eq!(summary.granted_items.len(), 1);
        assert!(store.owns(user_id, dune.id));
    }

    #[tokio::test]
    async fn test_deadline_cuts_off_slow_verifier() {
        let store = InMemoryStore::with_catalog(vec![catalog_item("book.123", "Dune")]);
        let verifier = SlowVerifier {
            delay: Duration::from_millis(200),
            lines: vec![PurchaseLineItem::new("book.123", "1000000000000001")],
        };
        let use_case = VerifyAndGrantUseCase::new(
            Arc::new(verifier),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(test_config()),
        );

        let input = VerifyReceiptInput {
            raw_receipt: b"mock-receipt".to_vec(),
            provider: Provider::Apple,
            deadline: Some(Instant::now() + Duration::from_millis(10)),
        };

        let result = use_case.execute(input, UserId::new()).await;

        assert!(matches!(result, Err(PurchaseError::DeadlineExceeded)));
        assert_eq!(store.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_replays_grant_once() {
        let dune = catalog_item("book.123", "Dune");
        let store = InMemoryStore::with_catalog(vec![dune.clone()]);
        let user_id = UserId::new();
        let lines = vec![PurchaseLineItem::new("book.123", "1000000000000001")];

        let first = use_case(StubVerifier::always(Ok(lines.clone())), &store);
        let second = use_case(StubVerifier::always(Ok(lines)), &store);

        let (a, b) = tokio::join!(
            first.execute(input(Provider::Apple), user_id),
            second.execute(input(Provider::Apple), user_id),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        // Exactly one call wins the grant
        assert_eq!(a.granted_items.len() + b.granted_items.len(), 1);
        assert_eq!(store.transaction_count(), 1);
        assert_eq!(store.entitlement_count(), 1);
    }

    #[tokio::test]
    async fn test_list_library() {
        let dune = catalog_item("book.123", "Dune");
        let store = InMemoryStore::with_catalog(vec![dune.clone()]);
        let user_id = UserId::new();
        let verifier = StubVerifier::always(Ok(vec![PurchaseLineItem::new(
            "book.123",
            "1000000000000001",
        )]));
        use_case(verifier, &store)
            .execute(input(Provider::Apple), user_id)
            .await
            .unwrap();

        let library = ListLibraryUseCase::new(Arc::new(store.clone()), Arc::new(store.clone()));

        let books = library.execute(user_id).await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Dune");

        let empty = library.execute(UserId::new()).await.unwrap();
        assert!(empty.is_empty());
    }
}
