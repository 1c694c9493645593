//! Repositories for skill responses: `action_results`, `tool_call_results`
//! and `action_messages`.

use sqlx::PgPool;

use crate::models::action_result::{ActionMessage, ActionResult, ToolCall};

const RESULT_COLUMNS: &str = "result_id, version, uid, title, target_id, status, input, context, \
     tool_sets, actual_tools, history, created_at, updated_at, deleted_at";

const TOOL_CALL_COLUMNS: &str = "call_id, result_id, version, toolset_id, tool_name, step_name, \
     input, output, status, created_at";

const MESSAGE_COLUMNS: &str =
    "message_id, result_id, version, kind, content, tool_call_id, created_at";

pub struct ActionResultRepo;

impl ActionResultRepo {
    pub async fn create(pool: &PgPool, result: &ActionResult) -> Result<ActionResult, sqlx::Error> {
        let query = format!(
            "INSERT INTO action_results (result_id, version, uid, title, target_id, status, input, \
                context, tool_sets, actual_tools, history, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {RESULT_COLUMNS}"
        );
        sqlx::query_as::<_, ActionResult>(&query)
            .bind(&result.result_id)
            .bind(result.version)
            .bind(&result.uid)
            .bind(&result.title)
            .bind(&result.target_id)
            .bind(&result.status)
            .bind(&result.input)
            .bind(&result.context)
            .bind(&result.tool_sets)
            .bind(&result.actual_tools)
            .bind(&result.history)
            .bind(result.created_at)
            .bind(result.updated_at)
            .fetch_one(pool)
            .await
    }

    /// Find the highest version of a result.
    pub async fn find_latest(
        pool: &PgPool,
        result_id: &str,
    ) -> Result<Option<ActionResult>, sqlx::Error> {
        let query = format!(
            "SELECT {RESULT_COLUMNS} FROM action_results
             WHERE result_id = $1 ORDER BY version DESC LIMIT 1"
        );
        sqlx::query_as::<_, ActionResult>(&query)
            .bind(result_id)
            .fetch_optional(pool)
            .await
    }
}

pub struct ToolCallRepo;

impl ToolCallRepo {
    /// List tool calls of one result version in creation order.
    pub async fn list_for_result(
        pool: &PgPool,
        result_id: &str,
        version: i32,
    ) -> Result<Vec<ToolCall>, sqlx::Error> {
        let query = format!(
            "SELECT {TOOL_CALL_COLUMNS} FROM tool_call_results
             WHERE result_id = $1 AND version = $2 ORDER BY created_at, call_id"
        );
        sqlx::query_as::<_, ToolCall>(&query)
            .bind(result_id)
            .bind(version)
            .fetch_all(pool)
            .await
    }

    /// Insert a batch of tool calls in one transaction.
    pub async fn create_many(pool: &PgPool, calls: &[ToolCall]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for call in calls {
            sqlx::query(
                "INSERT INTO tool_call_results (call_id, result_id, version, toolset_id, \
                    tool_name, step_name, input, output, status, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(&call.call_id)
            .bind(&call.result_id)
            .bind(call.version)
            .bind(&call.toolset_id)
            .bind(&call.tool_name)
            .bind(&call.step_name)
            .bind(&call.input)
            .bind(&call.output)
            .bind(&call.status)
            .bind(call.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await
    }
}

pub struct ActionMessageRepo;

impl ActionMessageRepo {
    pub async fn list_for_result(
        pool: &PgPool,
        result_id: &str,
        version: i32,
    ) -> Result<Vec<ActionMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM action_messages
             WHERE result_id = $1 AND version = $2 ORDER BY created_at, message_id"
        );
        sqlx::query_as::<_, ActionMessage>(&query)
            .bind(result_id)
            .bind(version)
            .fetch_all(pool)
            .await
    }

    pub async fn create_many(pool: &PgPool, messages: &[ActionMessage]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for message in messages {
            sqlx::query(
                "INSERT INTO action_messages (message_id, result_id, version, kind, content, \
                    tool_call_id, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&message.message_id)
            .bind(&message.result_id)
            .bind(message.version)
            .bind(&message.kind)
            .bind(&message.content)
            .bind(&message.tool_call_id)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await
    }
}
