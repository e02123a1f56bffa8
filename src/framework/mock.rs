//! # Mock Framework
//!
//! Utilities for testing shard readers in isolation.
//!
//! Use [`MockShard`] to get a [`ShardClient`] backed by scripted responses instead
//! of a running [`ShardActor`](crate::framework::ShardActor). Helpers like
//! [`MockShard::expect_get`] queue the answers in order; [`MockShard::verify`]
//! asserts every expectation was consumed.

use crate::framework::{FrameworkError, ShardClient, ShardEntry, ShardRequest};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// Represents an expected request to the mock shard.
enum Expectation<E: ShardEntry> {
    Get {
        key: E::Key,
        response: Result<Option<E>, FrameworkError>,
    },
    Put {
        key: E::Key,
        response: Result<bool, FrameworkError>,
    },
}

type Expectations<E> = Arc<Mutex<VecDeque<Expectation<E>>>>;

/// A mock shard with expectation tracking for fluent testing.
///
/// # Example
/// ```ignore
/// let mut mock = MockShard::<StatusEntry>::new();
/// mock.expect_get(order_id).return_ok(Some(entry));
///
/// let client = mock.client();
/// // Use client in tests...
/// mock.verify(); // Ensures all expectations were met
/// ```
pub struct MockShard<E: ShardEntry> {
    client: ShardClient<E>,
    expectations: Expectations<E>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<E: ShardEntry> MockShard<E> {
    /// Creates a new mock shard with no expectations.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ShardRequest<E>>(100);
        let expectations: Expectations<E> = Arc::new(Mutex::new(VecDeque::new()));
        let pending = expectations.clone();

        // Spawn background task to answer requests
        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = pending.lock().pop_front();

                match (request, expectation) {
                    (ShardRequest::Get { key, respond_to }, Some(Expectation::Get { key: expected, response })) => {
                        assert_eq!(key, expected, "Get for unexpected key");
                        let _ = respond_to.send(response);
                    }
                    (ShardRequest::Put { key, respond_to, .. }, Some(Expectation::Put { key: expected, response })) => {
                        assert_eq!(key, expected, "Put for unexpected key");
                        let _ = respond_to.send(response);
                    }
                    _ => {
                        panic!("Unexpected request or expectation mismatch");
                    }
                }
            }
        });

        Self {
            client: ShardClient::new(sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ShardClient<E> {
        self.client.clone()
    }

    /// Expects a `get` operation.
    pub fn expect_get(&mut self, key: E::Key) -> GetExpectationBuilder<E> {
        GetExpectationBuilder {
            key,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a `put` operation.
    pub fn expect_put(&mut self, key: E::Key) -> PutExpectationBuilder<E> {
        PutExpectationBuilder {
            key,
            expectations: self.expectations.clone(),
        }
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = self.expectations.lock().len();
        if remaining != 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

impl<E: ShardEntry> Default for MockShard<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `get` expectations.
pub struct GetExpectationBuilder<E: ShardEntry> {
    key: E::Key,
    expectations: Expectations<E>,
}

impl<E: ShardEntry> GetExpectationBuilder<E> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: Option<E>) {
        self.expectations.lock().push_back(Expectation::Get {
            key: self.key,
            response: Ok(value),
        });
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        self.expectations.lock().push_back(Expectation::Get {
            key: self.key,
            response: Err(error),
        });
    }
}

/// Builder for `put` expectations.
pub struct PutExpectationBuilder<E: ShardEntry> {
    key: E::Key,
    expectations: Expectations<E>,
}

impl<E: ShardEntry> PutExpectationBuilder<E> {
    /// Sets the expectation to return whether the write was applied.
    pub fn return_ok(self, applied: bool) {
        self.expectations.lock().push_back(Expectation::Put {
            key: self.key,
            response: Ok(applied),
        });
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        self.expectations.lock().push_back(Expectation::Put {
            key: self.key,
            response: Err(error),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Offset;
    use crate::model::{OrderId, OrderStatus};
    use crate::store::StatusEntry;

    #[tokio::test]
    async fn test_mock_shard_with_expectations() {
        let id = OrderId::generate();
        let mut mock = MockShard::<StatusEntry>::new();

        mock.expect_put(id).return_ok(true);
        mock.expect_get(id).return_ok(Some(StatusEntry {
            status: OrderStatus::Shipped,
            offset: 4 as Offset,
        }));

        let client = mock.client();
        assert!(client.put(id, (OrderStatus::Shipped, 4)).await.unwrap());
        let entry = client.get(id).await.unwrap().unwrap();
        assert_eq!(entry.status, OrderStatus::Shipped);

        mock.verify();
    }

    #[tokio::test]
    async fn test_mock_shard_scripted_error() {
        let id = OrderId::generate();
        let mut mock = MockShard::<StatusEntry>::new();
        mock.expect_get(id).return_err(FrameworkError::ActorDropped);

        let result = mock.client().get(id).await;
        assert_eq!(result, Err(FrameworkError::ActorDropped));
        mock.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "Not all expectations were met")]
    async fn test_verify_fails_on_unused_expectation() {
        let mut mock = MockShard::<StatusEntry>::new();
        mock.expect_get(OrderId::generate()).return_ok(None);
        mock.verify();
    }
}
