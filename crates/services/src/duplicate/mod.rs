//! Entity duplicators and the fan-out that runs them for a whole canvas.

pub mod drive;
pub mod entities;

use std::collections::HashSet;

use refly_core::error::{CoreError, CoreResult};
use refly_core::remap::RemapTable;
use refly_core::types::EntityType;

use crate::context::ServiceContext;
use crate::limit::run_bounded;

pub use drive::{duplicate_drive_files, DriveFileRemap};
pub use entities::{
    duplicate_action_result, duplicate_code_artifact, duplicate_document, duplicate_resource,
};

/// Where duplicated entities land.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateTarget<'a> {
    /// New owner.
    pub uid: &'a str,
    pub canvas_id: Option<&'a str>,
    pub project_id: Option<&'a str>,
}

/// One entity that could not be duplicated.
#[derive(Debug, thiserror::Error)]
#[error("failed to duplicate {entity_type} {source_id}: {cause}")]
pub struct DuplicationError {
    pub entity_type: EntityType,
    pub source_id: String,
    #[source]
    pub cause: CoreError,
}

#[derive(Debug)]
pub struct EntityOutcome {
    pub entity_type: EntityType,
    pub source_id: String,
    /// The new entity ID on success.
    pub result: Result<String, DuplicationError>,
}

/// Per-entity results of a duplication fan-out: library entities in input
/// order, then skill responses.
#[derive(Debug, Default)]
pub struct DuplicationReport {
    pub outcomes: Vec<EntityOutcome>,
}

impl DuplicationReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DuplicationError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    /// Source IDs whose duplication failed.
    pub fn failed_ids(&self) -> HashSet<String> {
        self.failures().map(|e| e.source_id.clone()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Duplicate one entity into the ID pre-assigned for it.
pub async fn duplicate_entity(
    ctx: &ServiceContext,
    entity_type: EntityType,
    source_id: &str,
    new_id: &str,
    target: DuplicateTarget<'_>,
    remap: &RemapTable,
) -> CoreResult<()> {
    match entity_type {
        EntityType::Document => duplicate_document(ctx, source_id, new_id, target)
            .await
            .map(|_| ()),
        EntityType::Resource => duplicate_resource(ctx, source_id, new_id, target)
            .await
            .map(|_| ()),
        EntityType::CodeArtifact => duplicate_code_artifact(ctx, source_id, new_id, target)
            .await
            .map(|_| ()),
        EntityType::SkillResponse => duplicate_action_result(ctx, source_id, new_id, target, remap)
            .await
            .map(|_| ()),
        other => Err(CoreError::Params(format!(
            "{other} entities are not duplicated individually"
        ))),
    }
}

/// Duplicate every `(type, old id)` in `refs` whose new ID is already in
/// `remap`. Failures are collected, not propagated, so siblings still run.
///
/// Library entities run first. Skill responses embed the IDs of the entities
/// they reference, so they are copied afterwards against a table without the
/// library entities that failed.
pub async fn duplicate_entities(
    ctx: &ServiceContext,
    refs: &[(EntityType, String)],
    target: DuplicateTarget<'_>,
    remap: &RemapTable,
) -> DuplicationReport {
    let (library, results): (Vec<_>, Vec<_>) = refs
        .iter()
        .partition(|(entity_type, _)| *entity_type != EntityType::SkillResponse);

    let mut outcomes = duplicate_pass(ctx, &library, target, remap).await;
    let mut pruned = remap.clone();
    for outcome in outcomes.iter().filter(|o| o.result.is_err()) {
        pruned.remove(&outcome.source_id);
    }
    outcomes.extend(duplicate_pass(ctx, &results, target, &pruned).await);

    let report = DuplicationReport { outcomes };
    for failure in report.failures() {
        tracing::warn!(
            entity_type = %failure.entity_type,
            source_id = %failure.source_id,
            error = %failure.cause,
            "Entity duplication failed"
        );
    }
    report
}

async fn duplicate_pass(
    ctx: &ServiceContext,
    refs: &[&(EntityType, String)],
    target: DuplicateTarget<'_>,
    remap: &RemapTable,
) -> Vec<EntityOutcome> {
    let jobs = refs.iter().filter_map(|(entity_type, source_id)| {
        let new_id = remap.get(source_id)?.to_string();
        Some(async move {
            let result = duplicate_entity(ctx, *entity_type, source_id, &new_id, target, remap)
                .await
                .map(|()| new_id)
                .map_err(|cause| DuplicationError {
                    entity_type: *entity_type,
                    source_id: source_id.clone(),
                    cause,
                });
            EntityOutcome {
                entity_type: *entity_type,
                source_id: source_id.clone(),
                result,
            }
        })
    });
    run_bounded(ctx.config.duplicate_concurrency, jobs).await
}
