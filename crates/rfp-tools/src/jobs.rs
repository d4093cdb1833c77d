//! Jobs tool category: scheduling and inspecting background [`AgentJob`]s
//! (`spec.md` §4.4 "Jobs", §4.9 "Job queue").
//!
//! A job item's single GSI1 slot is spent on due-polling while the job is
//! queued (`DUE_JOBS_GSI1PK`/`due_jobs_gsi1sk`); re-pointing it at
//! `case_jobs_gsi1pk` once claimed, so case-scoped history listing takes
//! over, is the executor's responsibility, not this tool layer's — see
//! `rfp-executor`.

use crate::context::ToolContext;
use crate::registry::{ToolDef, ToolHandler};
use async_trait::async_trait;
use rfp_core::keys::{case_jobs_gsi1pk, due_jobs_gsi1sk, idempotency_pk, job_pk, DUE_JOBS_GSI1PK, IDEMPOTENCY_SK, JOB_PROFILE_SK};
use rfp_core::job::JobScope;
use rfp_core::{AgentJob, IdempotencyRecord};
use rfp_error::{ErrorCode, RfpError};
use rfp_store::{Condition, Item, ItemKey, QueryIndex, QueryRequest, ScanDirection, TransactItem};
use serde_json::{json, Value};

fn arg_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, RfpError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RfpError::new(ErrorCode::Internal, format!("missing required argument '{field}'")))
}

fn arg_limit(args: &Value, default: usize) -> usize {
    args.get("limit").and_then(Value::as_u64).map(|n| n as usize).unwrap_or(default).clamp(1, 100)
}

fn job_item(job: &AgentJob) -> Result<Item, RfpError> {
    Ok(Item {
        key: ItemKey::new(job_pk(&job.id), JOB_PROFILE_SK),
        gsi1pk: Some(DUE_JOBS_GSI1PK.to_string()),
        gsi1sk: Some(due_jobs_gsi1sk(job.due_at, &job.id)),
        attributes: serde_json::to_value(job).map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to serialize job: {e}")))?,
    })
}

async fn load_job(ctx: &ToolContext, job_id: &str) -> Result<AgentJob, RfpError> {
    let item = ctx
        .store
        .get(&ItemKey::new(job_pk(job_id), JOB_PROFILE_SK))
        .await?
        .ok_or_else(|| RfpError::new(ErrorCode::NotFound, format!("no job with id '{job_id}'")))?;
    serde_json::from_value(item.attributes).map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize job: {e}")))
}

/// Enqueues a background job, optionally deduplicated by a caller-supplied
/// idempotency key: a second call with the same key returns the job the
/// first call created instead of enqueuing a duplicate.
pub struct ScheduleJobTool;

#[async_trait]
impl ToolHandler for ScheduleJobTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "schedule_job",
            description: "Enqueue a background agent job, optionally deduplicated by an idempotency key.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "jobType": {"type": "string"},
                    "rfpId": {"type": "string"},
                    "env": {"type": "string"},
                    "payload": {"type": "object"},
                    "dueInSeconds": {"type": "integer", "minimum": 0},
                    "dependsOn": {"type": "array", "items": {"type": "string"}},
                    "idempotencyKey": {"type": "string"},
                    "requestedByUserSub": {"type": "string"}
                },
                "required": ["jobType"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let job_type = arg_str(&args, "jobType")?;
        let now = rfp_core::now();

        if let Some(idempotency_key) = args.get("idempotencyKey").and_then(Value::as_str) {
            let key_hash = rfp_receipt::sha256_hex(idempotency_key.as_bytes());
            if let Some(item) = ctx.store.get(&ItemKey::new(idempotency_pk(&key_hash), IDEMPOTENCY_SK)).await? {
                let record: IdempotencyRecord = serde_json::from_value(item.attributes)
                    .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize idempotency record: {e}")))?;
                let job = load_job(ctx, &record.job_id).await?;
                return Ok(json!({ "job": job, "deduplicated": true }));
            }
        }

        let scope = JobScope {
            rfp_id: args.get("rfpId").and_then(Value::as_str).map(str::to_string),
            env: args.get("env").and_then(Value::as_str).map(str::to_string),
        };
        let payload = args.get("payload").cloned().unwrap_or_else(|| json!({}));
        let due_at = now + chrono::Duration::seconds(args.get("dueInSeconds").and_then(Value::as_i64).unwrap_or(0));
        let id = rfp_core::sortable_id(now);

        let mut job = AgentJob::new(&id, job_type, scope, payload, due_at, now);
        if let Some(depends_on) = args.get("dependsOn").and_then(Value::as_array) {
            job.depends_on = depends_on.iter().filter_map(Value::as_str).map(str::to_string).collect();
        }
        job.requested_by_user_sub = args.get("requestedByUserSub").and_then(Value::as_str).map(str::to_string);

        let mut items = vec![TransactItem::Put { item: job_item(&job)?, condition: Some(Condition::NotExists) }];
        if let Some(idempotency_key) = args.get("idempotencyKey").and_then(Value::as_str) {
            let key_hash = rfp_receipt::sha256_hex(idempotency_key.as_bytes());
            let record = IdempotencyRecord { key_hash: key_hash.clone(), job_id: id.clone(), created_at: now };
            items.push(TransactItem::Put {
                item: Item {
                    key: ItemKey::new(idempotency_pk(&key_hash), IDEMPOTENCY_SK),
                    gsi1pk: None,
                    gsi1sk: None,
                    attributes: serde_json::to_value(&record).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?,
                },
                condition: Some(Condition::NotExists),
            });
        }
        ctx.store.transact(items).await?;

        tracing::info!(target: "rfp.jobs", job_id = %id, job_type, "job_scheduled");
        Ok(json!({ "job": job, "deduplicated": false }))
    }
}

pub struct AgentJobGetTool;

#[async_trait]
impl ToolHandler for AgentJobGetTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "agent_job_get",
            description: "Fetch one background job by id.",
            parameters_schema: json!({
                "type": "object",
                "properties": { "jobId": {"type": "string"} },
                "required": ["jobId"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let job_id = arg_str(&args, "jobId")?;
        let job = load_job(ctx, job_id).await?;
        Ok(serde_json::to_value(job).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?)
    }
}

/// Lists jobs scoped to a contracting case. Only finds jobs whose GSI1 slot
/// has been re-pointed at `case_jobs_gsi1pk` by the executor (i.e. jobs
/// that have left the queued state) — a freshly scheduled job is visible
/// here only after a worker claims it.
pub struct AgentJobListTool;

#[async_trait]
impl ToolHandler for AgentJobListTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "agent_job_list",
            description: "List background jobs scoped to a contracting case, most recent first.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "caseId": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100},
                    "continuationToken": {"type": "string"}
                },
                "required": ["caseId"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let case_id = arg_str(&args, "caseId")?;
        let limit = arg_limit(&args, 20);
        let continuation_token = args.get("continuationToken").and_then(Value::as_str).map(str::to_string);

        let page = ctx
            .store
            .query(QueryRequest {
                index: QueryIndex::Gsi1,
                partition_key: case_jobs_gsi1pk(case_id),
                sort_key_prefix: None,
                direction: ScanDirection::Backward,
                limit,
                continuation_token,
            })
            .await?;
        let jobs: Vec<AgentJob> = page
            .items
            .into_iter()
            .map(|item| serde_json::from_value(item.attributes).map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize job: {e}"))))
            .collect::<Result<_, _>>()?;
        Ok(json!({ "jobs": jobs, "continuationToken": page.continuation_token }))
    }
}

/// Lists queued jobs whose `due_at` has passed, ascending by due time so
/// the soonest-due job is returned first. Scans the `DUE_JOBS_GSI1PK`
/// partition and stops once it sees a job not yet due (the partition is
/// kept sorted by `due_at`, so everything after that point is also not
/// yet due).
pub struct AgentJobQueryDueTool;

#[async_trait]
impl ToolHandler for AgentJobQueryDueTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "agent_job_query_due",
            description: "List queued jobs that are due to run now, soonest first.",
            parameters_schema: json!({
                "type": "object",
                "properties": { "limit": {"type": "integer", "minimum": 1, "maximum": 100} }
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let limit = arg_limit(&args, 20);
        let now = rfp_core::now();

        let mut due = Vec::new();
        let mut continuation_token = None;
        loop {
            let page = ctx
                .store
                .query(QueryRequest {
                    index: QueryIndex::Gsi1,
                    partition_key: DUE_JOBS_GSI1PK.to_string(),
                    sort_key_prefix: None,
                    direction: ScanDirection::Forward,
                    limit: limit.max(20),
                    continuation_token,
                })
                .await?;
            let next_token = page.continuation_token;
            let mut saw_not_yet_due = false;

            for item in page.items {
                let job: AgentJob = serde_json::from_value(item.attributes)
                    .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize job: {e}")))?;
                if job.due_at > now {
                    saw_not_yet_due = true;
                    break;
                }
                if job.status == rfp_core::JobStatus::Queued {
                    due.push(job);
                }
                if due.len() >= limit {
                    break;
                }
            }

            if saw_not_yet_due || due.len() >= limit || next_token.is_none() {
                break;
            }
            continuation_token = next_token;
        }

        Ok(json!({ "jobs": due }))
    }
}
