//! Retrieval-augmented planning context: looks up prior successful runs
//! of the same job type so the planner can imitate a working tool
//! sequence instead of guessing one from scratch (`spec.md` §4.8
//! "Retrieval-augmented planning").

use crate::plan::{SimilarJob, MAX_SIMILAR_JOBS};
use rfp_core::job::JobScope;
use rfp_core::memory::MemoryType;
use rfp_error::RfpError;
use rfp_memory::MemoryRepo;

/// Derives the memory scope id a job's procedural memories are filed
/// under: RFP-scoped jobs use `RFP#{id}`, otherwise the global scope.
pub fn scope_id_for_job(scope: &JobScope) -> String {
    match &scope.rfp_id {
        Some(rfp_id) => rfp_core::keys::rfp_scope(rfp_id),
        None => rfp_core::keys::GLOBAL_SCOPE.to_string(),
    }
}

/// Returns up to [`MAX_SIMILAR_JOBS`] procedural memories recorded for
/// prior runs of `job_type` in this scope, most recent first.
pub async fn similar_successful_jobs(memory: &MemoryRepo, scope: &JobScope, job_type: &str) -> Result<Vec<SimilarJob>, RfpError> {
    let scope_id = scope_id_for_job(scope);
    let candidates = memory.list_by_scope(&scope_id, MemoryType::Procedural, 20, rfp_core::now()).await?;

    let mut similar = Vec::new();
    for candidate in candidates {
        if similar.len() >= MAX_SIMILAR_JOBS {
            break;
        }
        let Some(recorded_type) = candidate.metadata.get("jobType").and_then(|v| v.as_str()) else {
            continue;
        };
        if recorded_type != job_type {
            continue;
        }
        let tool_sequence = candidate
            .metadata
            .get("toolSequence")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        similar.push(SimilarJob {
            job_type: recorded_type.to_string(),
            tool_sequence,
            outcome: candidate.summary.clone().unwrap_or_else(|| candidate.content.clone()),
        });
    }
    Ok(similar)
}

/// Records a completed job's tool sequence as a procedural memory, so
/// future runs of the same job type can retrieve it.
pub async fn record_successful_run(memory: &MemoryRepo, scope: &JobScope, job_type: &str, tool_sequence: Vec<String>, outcome: &str, now: chrono::DateTime<chrono::Utc>) -> Result<(), RfpError> {
    let scope_id = scope_id_for_job(scope);
    let mut metadata = std::collections::BTreeMap::new();
    metadata.insert("jobType".to_string(), serde_json::json!(job_type));
    metadata.insert("toolSequence".to_string(), serde_json::json!(tool_sequence));
    memory
        .create_memory(
            MemoryType::Procedural,
            &scope_id,
            outcome,
            vec![job_type.to_string()],
            metadata,
            rfp_core::MemoryProvenance { kind: "executor".to_string(), reference: None },
            Some(outcome.to_string()),
            now,
        )
        .await?;
    Ok(())
}
