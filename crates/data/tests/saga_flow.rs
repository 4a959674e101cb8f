//! End-to-end saga flows over the in-memory store and backends.

use std::sync::Arc;

use async_trait::async_trait;
use saga_data::{MemoryStore, MemoryTransaction};
use saga_execution::prelude::*;
use serde_json::{Value, json};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn orchestrator(store: MemoryStore) -> TransactionOrchestrator<MemoryStore> {
    TransactionOrchestrator::new(
        Arc::new(store),
        Arc::new(MemoryLockBackend::new()),
        Arc::new(MemoryResultCache::new()),
        Arc::new(MemoryPublisher::new()),
        OrchestratorConfig::default(),
    )
}

async fn seed_balance(store: &MemoryStore, amount: i64) {
    let mut tx = store.begin().await.expect("begin");
    tx.insert("balance", json!(amount));
    store.commit(tx).await.expect("commit");
}

/// Debits the cash balance, failing when funds are insufficient.
struct ReserveFunds {
    amount: i64,
}

#[async_trait]
impl SagaStep<MemoryTransaction> for ReserveFunds {
    fn name(&self) -> &str {
        "reserve_funds"
    }

    async fn execute(&self, tx: &mut MemoryTransaction) -> Result<Value, StoreError> {
        let balance = tx.get("balance").and_then(Value::as_i64).unwrap_or(0);
        if balance < self.amount {
            return Err(StoreError::Operation(anyhow::anyhow!(
                "insufficient funds: {balance} < {}",
                self.amount
            )));
        }
        tx.insert("balance", json!(balance - self.amount));
        Ok(json!({ "reserved": self.amount }))
    }
}

struct ReleaseFunds;

#[async_trait]
impl Compensation<MemoryTransaction> for ReleaseFunds {
    fn name(&self) -> &str {
        "release_funds"
    }

    async fn compensate(
        &self,
        output: &Value,
        tx: &mut MemoryTransaction,
    ) -> Result<(), StoreError> {
        let reserved = output["reserved"].as_i64().unwrap_or(0);
        let balance = tx.get("balance").and_then(Value::as_i64).unwrap_or(0);
        tx.insert("balance", json!(balance + reserved));
        Ok(())
    }
}

/// Records a filled trade under its order id.
struct RecordTrade {
    order: &'static str,
}

#[async_trait]
impl SagaStep<MemoryTransaction> for RecordTrade {
    fn name(&self) -> &str {
        "record_trade"
    }

    async fn execute(&self, tx: &mut MemoryTransaction) -> Result<Value, StoreError> {
        tx.insert(format!("trade:{}", self.order), json!({ "status": "filled" }));
        Ok(json!(self.order))
    }
}

struct CancelTrade;

#[async_trait]
impl Compensation<MemoryTransaction> for CancelTrade {
    fn name(&self) -> &str {
        "cancel_trade"
    }

    async fn compensate(
        &self,
        output: &Value,
        tx: &mut MemoryTransaction,
    ) -> Result<(), StoreError> {
        let order = output.as_str().unwrap_or_default();
        tx.remove(&format!("trade:{order}"));
        Ok(())
    }
}

struct RejectedStep;

#[async_trait]
impl SagaStep<MemoryTransaction> for RejectedStep {
    fn name(&self) -> &str {
        "update_portfolio"
    }

    async fn execute(&self, _tx: &mut MemoryTransaction) -> Result<Value, StoreError> {
        Err(StoreError::Operation(anyhow::anyhow!(
            "portfolio write rejected"
        )))
    }
}

struct NoopCompensation;

#[async_trait]
impl Compensation<MemoryTransaction> for NoopCompensation {
    fn name(&self) -> &str {
        "noop"
    }

    async fn compensate(
        &self,
        _output: &Value,
        _tx: &mut MemoryTransaction,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn successful_trade_saga_commits_every_step() {
    init_tracing();
    let store = MemoryStore::new();
    seed_balance(&store, 100).await;
    let orchestrator = orchestrator(store.clone());

    let steps: Vec<Box<dyn SagaStep<MemoryTransaction>>> = vec![
        Box::new(ReserveFunds { amount: 40 }),
        Box::new(RecordTrade { order: "ord-1" }),
    ];
    let compensations: Vec<Box<dyn Compensation<MemoryTransaction>>> =
        vec![Box::new(ReleaseFunds), Box::new(CancelTrade)];

    let results = orchestrator
        .execute_saga("wallet:abc", &steps, &compensations)
        .await
        .expect("saga succeeds");

    assert_eq!(results, vec![json!({ "reserved": 40 }), json!("ord-1")]);
    assert_eq!(store.get("balance").await, Some(json!(60)));
    assert_eq!(
        store.get("trade:ord-1").await,
        Some(json!({ "status": "filled" }))
    );
}

#[tokio::test]
async fn failed_saga_restores_balance_and_removes_trade() {
    init_tracing();
    let store = MemoryStore::new();
    seed_balance(&store, 100).await;
    let orchestrator = orchestrator(store.clone());

    let steps: Vec<Box<dyn SagaStep<MemoryTransaction>>> = vec![
        Box::new(ReserveFunds { amount: 40 }),
        Box::new(RecordTrade { order: "ord-2" }),
        Box::new(RejectedStep),
    ];
    let compensations: Vec<Box<dyn Compensation<MemoryTransaction>>> = vec![
        Box::new(ReleaseFunds),
        Box::new(CancelTrade),
        Box::new(NoopCompensation),
    ];

    let err = orchestrator
        .execute_saga("wallet:abc", &steps, &compensations)
        .await
        .expect_err("saga fails on the third step");

    match err {
        OrchestratorError::StepExecution {
            index,
            partial_results,
            source,
            ..
        } => {
            assert_eq!(index, 2);
            assert_eq!(partial_results.len(), 2);
            assert_eq!(source.to_string(), "portfolio write rejected");
        }
        other => panic!("expected StepExecution, got {other:?}"),
    }

    // Both committed steps were semantically reversed.
    assert_eq!(store.get("balance").await, Some(json!(100)));
    assert_eq!(store.get("trade:ord-2").await, None);
}

#[tokio::test]
async fn first_step_failure_leaves_store_untouched() {
    init_tracing();
    let store = MemoryStore::new();
    seed_balance(&store, 10).await;
    let orchestrator = orchestrator(store.clone());

    let steps: Vec<Box<dyn SagaStep<MemoryTransaction>>> = vec![
        Box::new(ReserveFunds { amount: 40 }),
        Box::new(RecordTrade { order: "ord-3" }),
    ];
    let compensations: Vec<Box<dyn Compensation<MemoryTransaction>>> =
        vec![Box::new(ReleaseFunds), Box::new(CancelTrade)];

    let err = orchestrator
        .execute_saga("wallet:abc", &steps, &compensations)
        .await
        .expect_err("insufficient funds");

    assert_eq!(err.failed_index(), Some(0));
    // The failing unit of work rolled back; nothing to compensate.
    assert_eq!(store.get("balance").await, Some(json!(10)));
    assert_eq!(store.get("trade:ord-3").await, None);
}

#[tokio::test]
async fn execute_transaction_commits_a_single_unit_of_work() {
    init_tracing();
    let store = MemoryStore::new();
    let orchestrator = orchestrator(store.clone());

    let result = orchestrator
        .execute_transaction(&RecordTrade { order: "ord-4" })
        .await
        .expect("transaction succeeds");

    assert_eq!(result, json!("ord-4"));
    assert_eq!(
        store.get("trade:ord-4").await,
        Some(json!({ "status": "filled" }))
    );
}

#[tokio::test]
async fn eventual_consistent_operation_notifies_subscribers() {
    init_tracing();
    let publisher = Arc::new(MemoryPublisher::new());
    let mut receiver = publisher.subscribe("wallet.scored").await;

    let orchestrator = TransactionOrchestrator::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryLockBackend::new()),
        Arc::new(MemoryResultCache::new()),
        publisher.clone(),
        OrchestratorConfig::default(),
    );

    let result: Result<Value, StoreError> = orchestrator
        .execute_eventual_consistent(
            || async { Ok(json!({ "wallet": "abc", "score": 87 })) },
            "wallet.scored",
            json!({ "source": "scoring-v2" }),
        )
        .await;

    assert_eq!(
        result.expect("operation succeeds")["score"],
        87,
        "result returned to the caller"
    );

    let envelope = receiver.recv().await.expect("envelope delivered");
    assert_eq!(envelope["event"], "wallet.scored");
    assert_eq!(envelope["data"]["score"], 87);
    assert_eq!(envelope["metadata"]["source"], "scoring-v2");
}
