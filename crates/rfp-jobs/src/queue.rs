//! Durable job queue: idempotent scheduling, due-polling, and the atomic
//! `queued -> running` claim (`spec.md` §4.9, §4.8).
//!
//! A job's single GSI1 slot is spent on due-polling (`DUE_JOBS_GSI1PK`)
//! while queued, and re-pointed at `case_jobs_gsi1pk` the moment a worker
//! claims it, so case-scoped history listing (`rfp-tools`'s
//! `agent_job_list`) only ever sees jobs that have left the queue. The
//! `rfp-tools::jobs::ScheduleJobTool` performs the same two-item
//! transactional write for agent-initiated scheduling; this repo is the
//! counterpart a worker process polls and claims against.

use chrono::{DateTime, Duration, Utc};
use rfp_core::job::JobScope;
use rfp_core::keys::{
    case_jobs_gsi1pk, due_jobs_gsi1sk, idempotency_pk, job_pk, DUE_JOBS_GSI1PK, IDEMPOTENCY_SK, JOB_PROFILE_SK,
};
use rfp_core::{AgentJob, IdempotencyRecord, JobStatus};
use rfp_error::{ErrorCode, RfpError};
use rfp_store::{Condition, Item, ItemKey, KeyValueStore, QueryIndex, QueryRequest, ScanDirection, TransactItem};
use serde_json::Value;
use std::sync::Arc;

/// Case id a job is grouped under once it leaves the queue. Jobs with no
/// bound RFP (e.g. a platform-wide maintenance sweep) group under a
/// synthetic `"GLOBAL"` case.
pub fn case_id_for_scope(scope: &JobScope) -> &str {
    scope.rfp_id.as_deref().unwrap_or("GLOBAL")
}

fn due_item(job: &AgentJob) -> Result<Item, RfpError> {
    Ok(Item {
        key: ItemKey::new(job_pk(&job.id), JOB_PROFILE_SK),
        gsi1pk: Some(DUE_JOBS_GSI1PK.to_string()),
        gsi1sk: Some(due_jobs_gsi1sk(job.due_at, &job.id)),
        attributes: serde_json::to_value(job).map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to serialize job: {e}")))?,
    })
}

fn case_scoped_item(job: &AgentJob) -> Result<Item, RfpError> {
    Ok(Item {
        key: ItemKey::new(job_pk(&job.id), JOB_PROFILE_SK),
        gsi1pk: Some(case_jobs_gsi1pk(case_id_for_scope(&job.scope))),
        gsi1sk: Some(format!("{}#{}", job.created_at.to_rfc3339(), job.id)),
        attributes: serde_json::to_value(job).map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to serialize job: {e}")))?,
    })
}

/// Durable queue of [`AgentJob`]s over the shared key-value table.
#[derive(Clone)]
pub struct JobQueueRepo {
    store: Arc<dyn KeyValueStore>,
}

impl JobQueueRepo {
    /// Construct a repo over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Enqueues a job, deduplicated by `idempotency_key` if given: a repeat
    /// call with the same key returns the job the first call created,
    /// `(job, true)`, instead of enqueuing a duplicate.
    pub async fn schedule(
        &self,
        job_type: impl Into<String>,
        scope: JobScope,
        payload: Value,
        due_at: DateTime<Utc>,
        depends_on: Vec<String>,
        requested_by_user_sub: Option<String>,
        idempotency_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(AgentJob, bool), RfpError> {
        if let Some(key) = idempotency_key {
            let key_hash = rfp_receipt::sha256_hex(key.as_bytes());
            if let Some(item) = self.store.get(&ItemKey::new(idempotency_pk(&key_hash), IDEMPOTENCY_SK)).await? {
                let record: IdempotencyRecord = serde_json::from_value(item.attributes)
                    .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize idempotency record: {e}")))?;
                let job = self.get(&record.job_id).await?;
                return Ok((job, true));
            }
        }

        let id = rfp_core::sortable_id(now);
        let mut job = AgentJob::new(&id, job_type, scope, payload, due_at, now);
        job.depends_on = depends_on;
        job.requested_by_user_sub = requested_by_user_sub;

        let mut items = vec![TransactItem::Put { item: due_item(&job)?, condition: Some(Condition::NotExists) }];
        if let Some(key) = idempotency_key {
            let key_hash = rfp_receipt::sha256_hex(key.as_bytes());
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
        self.store.transact(items).await?;

        tracing::info!(target: "rfp.jobs", job_id = %id, job_type = %job.job_type, "job_scheduled");
        Ok((job, false))
    }

    /// Fetch one job by id.
    pub async fn get(&self, job_id: &str) -> Result<AgentJob, RfpError> {
        let item = self
            .store
            .get(&ItemKey::new(job_pk(job_id), JOB_PROFILE_SK))
            .await?
            .ok_or_else(|| RfpError::new(ErrorCode::NotFound, format!("no job with id '{job_id}'")))?;
        serde_json::from_value(item.attributes).map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize job: {e}")))
    }

    /// Lists queued jobs due to run now, soonest-due first, stopping at the
    /// first not-yet-due row since `DUE_JOBS_GSI1PK` is `due_at`-ordered.
    pub async fn poll_due(&self, limit: usize, now: DateTime<Utc>) -> Result<Vec<AgentJob>, RfpError> {
        let mut due = Vec::new();
        let mut continuation_token = None;
        loop {
            let page = self
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
                if job.status == JobStatus::Queued && job.dependencies_satisfied_assuming_completed(&self.store).await.unwrap_or(true) {
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
        Ok(due)
    }

    /// Attempts to claim `job_id`: the atomic `queued -> running` transition,
    /// guarded by an `AttributeEquals` condition on `status` so two workers
    /// racing on the same due job cannot both win. Also re-points the job's
    /// GSI1 slot from the due-polling partition to its case-scoped one,
    /// since a running (or later, terminal) job no longer needs to be found
    /// by due-polling.
    ///
    /// Returns [`ErrorCode::Conflict`] if another worker claimed it first.
    pub async fn claim(&self, job_id: &str, now: DateTime<Utc>) -> Result<AgentJob, RfpError> {
        let job = self.get(job_id).await?;
        let running = job
            .try_mark_running(now)
            .ok_or_else(|| RfpError::new(ErrorCode::Conflict, format!("job '{job_id}' is not queued")))?;

        self.store
            .put(
                case_scoped_item(&running)?,
                Some(Condition::AttributeEquals { path: "status".to_string(), value: serde_json::json!("queued") }),
            )
            .await?;

        tracing::info!(target: "rfp.jobs", job_id, "job_claimed");
        Ok(running)
    }

    /// Writes progress for a running job.
    pub async fn update_progress(&self, job: &AgentJob, pct: u8, step: impl Into<String>, message: impl Into<String>, now: DateTime<Utc>) -> Result<AgentJob, RfpError> {
        let next = job.update_progress(pct, step, message, now);
        self.store.put(case_scoped_item(&next)?, None).await?;
        Ok(next)
    }

    /// Marks a job completed, storing its result.
    pub async fn complete(&self, job: &AgentJob, result: Value, now: DateTime<Utc>) -> Result<AgentJob, RfpError> {
        let next = job.complete(result, now);
        self.store.put(case_scoped_item(&next)?, None).await?;
        tracing::info!(target: "rfp.jobs", job_id = %next.id, "job_completed");
        Ok(next)
    }

    /// Marks a job failed with an error message.
    pub async fn fail(&self, job: &AgentJob, error: &str, now: DateTime<Utc>) -> Result<AgentJob, RfpError> {
        let next = job.fail(error, now);
        self.store.put(case_scoped_item(&next)?, None).await?;
        tracing::warn!(target: "rfp.jobs", job_id = %next.id, error, "job_failed");
        Ok(next)
    }

    /// Releases a job back to the queue for retry after a transient
    /// failure, re-pointing its GSI1 slot back to the due-polling partition
    /// with a backoff-adjusted `due_at`.
    pub async fn release_for_retry(&self, job: &AgentJob, backoff: Duration, now: DateTime<Utc>) -> Result<AgentJob, RfpError> {
        let mut next = job.clone();
        next.status = JobStatus::Queued;
        next.due_at = now + backoff;
        next.started_at = None;
        next.updated_at = now;
        self.store.put(due_item(&next)?, None).await?;
        tracing::info!(target: "rfp.jobs", job_id = %next.id, retry_due_at = %next.due_at, "job_released_for_retry");
        Ok(next)
    }

    /// Cancels a queued or running job.
    pub async fn cancel(&self, job_id: &str, now: DateTime<Utc>) -> Result<AgentJob, RfpError> {
        let job = self.get(job_id).await?;
        if job.status.is_terminal() {
            return Err(RfpError::new(ErrorCode::Conflict, format!("job '{job_id}' is already {:?}", job.status)));
        }
        let mut next = job;
        next.status = JobStatus::Cancelled;
        next.finished_at = Some(now);
        next.updated_at = now;
        self.store.put(case_scoped_item(&next)?, None).await?;
        Ok(next)
    }

    /// Lists jobs scoped to a case (`caseId`, typically an RFP id), most
    /// recent first.
    pub async fn list_for_case(&self, case_id: &str, limit: usize) -> Result<Vec<AgentJob>, RfpError> {
        let page = self
            .store
            .query(QueryRequest {
                index: QueryIndex::Gsi1,
                partition_key: case_jobs_gsi1pk(case_id),
                sort_key_prefix: None,
                direction: ScanDirection::Backward,
                limit,
                continuation_token: None,
            })
            .await?;
        page.items
            .into_iter()
            .map(|item| serde_json::from_value(item.attributes).map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize job: {e}"))))
            .collect()
    }
}

/// Extension used only by [`JobQueueRepo::poll_due`]; kept as a trait so a
/// job with no dependencies never pays for a lookup. A job with unmet
/// dependencies is treated as not-yet-due rather than surfaced as an error,
/// since the dependency may complete before the next poll.
trait DependencyCheck {
    async fn dependencies_satisfied_assuming_completed(&self, store: &Arc<dyn KeyValueStore>) -> Result<bool, RfpError>;
}

impl DependencyCheck for AgentJob {
    async fn dependencies_satisfied_assuming_completed(&self, store: &Arc<dyn KeyValueStore>) -> Result<bool, RfpError> {
        if self.depends_on.is_empty() {
            return Ok(true);
        }
        let mut statuses = std::collections::BTreeMap::new();
        for dep_id in &self.depends_on {
            let item = store.get(&ItemKey::new(job_pk(dep_id), JOB_PROFILE_SK)).await?;
            let Some(item) = item else { return Ok(false) };
            let dep: AgentJob = serde_json::from_value(item.attributes)
                .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize dependency job: {e}")))?;
            statuses.insert(dep_id.clone(), dep.status);
        }
        Ok(self.dependencies_satisfied(&statuses))
    }
}
