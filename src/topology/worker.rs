//! Sequential consumer for one (stage, partition) pair.

use super::config::Stage;
use super::stages::RecordContext;
use super::PipelineError;
use crate::log::{LogRecord, Offset, OrderLog, PartitionId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Drives one stage over one partition.
///
/// Records are handled strictly one after another. For each record the worker
/// decodes it, runs the stage handler, appends every emitted record, and only
/// then commits `offset + 1` for its group.
///
/// Cancellation is only observed while waiting for the next record, so a
/// record that is already being processed always finishes and commits.
pub struct PartitionWorker {
    log: Arc<dyn OrderLog>,
    stage: Stage,
    partition: PartitionId,
    cancel: CancellationToken,
}

impl PartitionWorker {
    pub fn new(
        log: Arc<dyn OrderLog>,
        stage: Stage,
        partition: PartitionId,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            log,
            stage,
            partition,
            cancel,
        }
    }

    /// Runs until cancelled or a fatal error occurs.
    pub async fn run(self) -> Result<(), PipelineError> {
        let stage = self.stage.name();
        let partition = self.partition;
        let result = self.consume().await;
        if let Err(e) = &result {
            error!(stage, partition, error = %e, "Worker stopped on fatal error");
        }
        result
    }

    async fn consume(&self) -> Result<(), PipelineError> {
        let stage = self.stage.name();
        let group = self.stage.group.as_str();
        let input = self.stage.input.as_str();
        let partition = self.partition;

        let mut next = self.log.committed(group, input, partition).await?;
        info!(stage, partition, offset = next, "Worker started");

        loop {
            let record = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                record = self.log.poll(input, partition, next) => record?,
            };
            next = self.handle(record).await?;
            self.log.commit(group, input, partition, next).await?;
        }

        info!(stage, partition, offset = next, "Worker stopped");
        Ok(())
    }

    /// Processes one record and returns the offset to resume from.
    async fn handle(&self, record: LogRecord) -> Result<Offset, PipelineError> {
        let order = record.decode().map_err(|e| PipelineError::UnroutableRecord {
            topic: record.topic.clone(),
            partition: record.partition,
            offset: record.offset,
            reason: e.to_string(),
        })?;
        let ctx = RecordContext {
            partition: record.partition,
            offset: record.offset,
        };
        let emits = self.stage.handler.process(ctx, order).await?;
        for emit in &emits {
            let (partition, offset) = self.log.append(&emit.topic, &emit.order).await?;
            debug!(stage = self.stage.name(), order_id = %emit.order.id, topic = %emit.topic, partition, offset, status = %emit.order.status, "Emitted");
        }
        Ok(record.offset + 1)
    }
}
