//! Follow-up work that does not need to finish inside a request.

use async_trait::async_trait;
use refly_core::error::CoreResult;
use refly_events::{Job, JobHandler};

use crate::canvas::sync_canvas_entity_relations;
use crate::context::ServiceContext;

/// Queue `job`, or run it right away when the context has no queue.
pub async fn dispatch(ctx: &ServiceContext, job: Job) -> CoreResult<()> {
    match &ctx.jobs {
        Some(queue) => queue.enqueue(job).await,
        None => execute(ctx, job).await,
    }
}

pub async fn execute(ctx: &ServiceContext, job: Job) -> CoreResult<()> {
    match job {
        Job::DeleteObjects { keys } => {
            if keys.is_empty() {
                return Ok(());
            }
            ctx.storage.remove_objects(&keys).await?;
            tracing::info!(count = keys.len(), "Objects removed");
        }
        Job::SyncCanvasRelations { canvas_id } => {
            sync_canvas_entity_relations(ctx, &canvas_id).await?;
        }
    }
    Ok(())
}

/// Runs queued jobs against a service context.
pub struct ServiceJobHandler {
    ctx: ServiceContext,
}

impl ServiceJobHandler {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl JobHandler for ServiceJobHandler {
    async fn handle(&self, job: Job) -> CoreResult<()> {
        execute(&self.ctx, job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use refly_events::JobQueue;

    use crate::config::ServiceConfig;

    #[tokio::test]
    async fn inline_dispatch_removes_objects() {
        let ctx = ServiceContext::in_memory(ServiceConfig::default());
        ctx.storage
            .put_object("share/s-1.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();

        dispatch(&ctx, Job::DeleteObjects { keys: vec!["share/s-1.json".into()] })
            .await
            .unwrap();

        assert!(ctx.storage.stat_object("share/s-1.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn queued_dispatch_defers_work() {
        let (queue, mut receiver) = JobQueue::new(4);
        let ctx = ServiceContext::in_memory(ServiceConfig::default()).with_jobs(queue);

        dispatch(&ctx, Job::SyncCanvasRelations { canvas_id: "c-1".into() })
            .await
            .unwrap();

        assert_eq!(
            receiver.recv().await,
            Some(Job::SyncCanvasRelations { canvas_id: "c-1".into() })
        );
    }

    #[tokio::test]
    async fn sync_of_missing_canvas_is_a_no_op() {
        let ctx = ServiceContext::in_memory(ServiceConfig::default());
        let handler = ServiceJobHandler::new(ctx);
        handler
            .handle(Job::SyncCanvasRelations { canvas_id: "c-gone".into() })
            .await
            .unwrap();
    }
}
