//! Memory tool category: typed memory creation/retrieval, relationship
//! edges, and cached external-context lookups (`spec.md` §4.4 "Memory",
//! §4.10).

use crate::context::ToolContext;
use crate::registry::{ToolDef, ToolHandler};
use async_trait::async_trait;
use rfp_core::{MemoryProvenance, MemoryType, RelationshipType};
use rfp_error::{ErrorCode, RfpError};
use rfp_memory::ExternalSource;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn arg_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, RfpError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RfpError::new(ErrorCode::Internal, format!("missing required argument '{field}'")))
}

fn arg_memory_type(args: &Value, field: &str) -> Result<MemoryType, RfpError> {
    let raw = arg_str(args, field)?;
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|_| RfpError::new(ErrorCode::Internal, format!("invalid memory type '{raw}'")))
}

pub struct MemoryCreateTool;

#[async_trait]
impl ToolHandler for MemoryCreateTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "memory_create",
            description: "Create a typed memory (episodic, semantic, procedural, temporal_event, collaboration_context, external_context) in a scope.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "memoryType": {"type": "string"},
                    "scopeId": {"type": "string"},
                    "content": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "summary": {"type": "string"},
                    "provenanceKind": {"type": "string"},
                    "provenanceReference": {"type": "string"}
                },
                "required": ["memoryType", "scopeId", "content", "provenanceKind"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let memory_type = arg_memory_type(&args, "memoryType")?;
        let scope_id = arg_str(&args, "scopeId")?;
        let content = arg_str(&args, "content")?;
        let provenance = MemoryProvenance {
            kind: arg_str(&args, "provenanceKind")?.to_string(),
            reference: args.get("provenanceReference").and_then(Value::as_str).map(str::to_string),
        };
        let tags = args
            .get("tags")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        let summary = args.get("summary").and_then(Value::as_str).map(str::to_string);
        let now = rfp_core::now();

        let memory = ctx
            .memory
            .create_memory(memory_type, scope_id, content, tags, BTreeMap::new(), provenance, summary, now)
            .await?;
        Ok(serde_json::to_value(memory).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?)
    }
}

pub struct MemoryListByScopeTool;

#[async_trait]
impl ToolHandler for MemoryListByScopeTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "memory_list_by_scope",
            description: "List memories of one type in a scope, most recently created first.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "scopeId": {"type": "string"},
                    "memoryType": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100}
                },
                "required": ["scopeId", "memoryType"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let scope_id = arg_str(&args, "scopeId")?;
        let memory_type = arg_memory_type(&args, "memoryType")?;
        let limit = args.get("limit").and_then(Value::as_u64).map(|n| n as usize).unwrap_or(20).clamp(1, 100);
        let memories = ctx.memory.list_by_scope(scope_id, memory_type, limit, rfp_core::now()).await?;
        Ok(json!({ "memories": memories }))
    }
}

pub struct MemoryGetContextTool;

#[async_trait]
impl ToolHandler for MemoryGetContextTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "memory_get_context",
            description: "Retrieve the most relevant memories for a scope across one or more memory types, optionally scored against a query.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "scopeId": {"type": "string"},
                    "memoryTypes": {"type": "array", "items": {"type": "string"}},
                    "query": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100}
                },
                "required": ["scopeId", "memoryTypes"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let scope_id = arg_str(&args, "scopeId")?;
        let memory_types: Vec<MemoryType> = args
            .get("memoryTypes")
            .and_then(Value::as_array)
            .ok_or_else(|| RfpError::new(ErrorCode::Internal, "missing required argument 'memoryTypes'"))?
            .iter()
            .map(|v| serde_json::from_value(v.clone()).map_err(|_| RfpError::new(ErrorCode::Internal, "invalid memory type in 'memoryTypes'")))
            .collect::<Result<_, _>>()?;
        let query = args.get("query").and_then(Value::as_str);
        let limit = args.get("limit").and_then(Value::as_u64).map(|n| n as usize).unwrap_or(10).clamp(1, 100);
        let now = rfp_core::now();

        let memories = ctx.memory.get_memories_for_context(scope_id, &memory_types, query, limit, now).await?;
        Ok(json!({ "memories": memories }))
    }
}

pub struct RelationshipAddTool;

#[async_trait]
impl ToolHandler for RelationshipAddTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "relationship_add",
            description: "Link two existing memories with a directed (optionally bidirectional) relationship edge.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "scopeId": {"type": "string"},
                    "fromId": {"type": "string"},
                    "fromType": {"type": "string"},
                    "toId": {"type": "string"},
                    "toType": {"type": "string"},
                    "relationshipType": {"type": "string"},
                    "bidirectional": {"type": "boolean"}
                },
                "required": ["scopeId", "fromId", "fromType", "toId", "toType", "relationshipType"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let scope_id = arg_str(&args, "scopeId")?;
        let from_id = arg_str(&args, "fromId")?;
        let from_type = arg_memory_type(&args, "fromType")?;
        let to_id = arg_str(&args, "toId")?;
        let to_type = arg_memory_type(&args, "toType")?;
        let relationship_type: RelationshipType = serde_json::from_value(Value::String(arg_str(&args, "relationshipType")?.to_string()))
            .map_err(|_| RfpError::new(ErrorCode::Internal, "invalid relationshipType"))?;
        let bidirectional = args.get("bidirectional").and_then(Value::as_bool).unwrap_or(false);
        let now = rfp_core::now();

        let edge = ctx
            .relationships
            .add_relationship(&ctx.memory, scope_id, from_id, from_type, to_id, to_type, relationship_type, bidirectional, now)
            .await?;
        Ok(serde_json::to_value(edge).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?)
    }
}

pub struct RelationshipListFromTool;

#[async_trait]
impl ToolHandler for RelationshipListFromTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "relationship_list_from",
            description: "List outgoing relationship edges from a memory.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "fromId": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100}
                },
                "required": ["fromId"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let from_id = arg_str(&args, "fromId")?;
        let limit = args.get("limit").and_then(Value::as_u64).map(|n| n as usize).unwrap_or(20).clamp(1, 100);
        let edges = ctx.relationships.list_from(from_id, limit).await?;
        Ok(json!({ "relationships": edges }))
    }
}

fn parse_external_source(raw: &str) -> Result<ExternalSource, RfpError> {
    serde_json::from_value(Value::String(raw.to_lowercase()))
        .map_err(|_| RfpError::new(ErrorCode::Internal, format!("unknown external context source '{raw}'")))
}

/// Fetches external context (news/weather/research/geo), serving from the
/// TTL cache when possible, and optionally folds the result into a
/// retrievable memory.
pub struct ExternalContextFetchTool;

#[async_trait]
impl ToolHandler for ExternalContextFetchTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "external_context_fetch",
            description: "Fetch cached or fresh external context (news, weather, research, geo) for a query.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "source": {"type": "string", "enum": ["news", "weather", "research", "geo"]},
                    "query": {"type": "string"},
                    "params": {"type": "object"},
                    "rememberInScope": {"type": "string"}
                },
                "required": ["source", "query"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let source_raw = arg_str(&args, "source")?.to_string();
        let source = parse_external_source(&source_raw)?;
        let query = arg_str(&args, "query")?;
        let params = args.get("params").cloned().unwrap_or_else(|| json!({}));
        let now = rfp_core::now();

        let fetcher = ctx
            .external_fetcher(source)
            .ok_or_else(|| RfpError::new(ErrorCode::NotConfigured, format!("no fetcher registered for external context source '{source_raw}'")))?;
        let data = ctx.external_context.get_or_fetch(fetcher.as_ref(), source, query, &params, now).await?;

        if let Some(scope_id) = args.get("rememberInScope").and_then(Value::as_str) {
            let summary = data.to_string();
            ctx.external_context.remember_fetch(&ctx.memory, scope_id, source, &summary, now).await?;
        }

        Ok(json!({ "data": data }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_policy::{AllowlistConfig, PolicyEngine};
    use std::sync::Arc;

    fn ctx() -> ToolContext {
        ToolContext::new(
            rfp_store::InMemoryKeyValueStore::shared(),
            Arc::new(rfp_store::InMemoryObjectStore::new().unwrap()),
            PolicyEngine::new(&AllowlistConfig::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let ctx = ctx();
        MemoryCreateTool
            .call(&ctx, json!({"memoryType": "EPISODIC", "scopeId": "USER#u1", "content": "first turn", "provenanceKind": "slack"}))
            .await
            .unwrap();
        let listed = MemoryListByScopeTool.call(&ctx, json!({"scopeId": "USER#u1", "memoryType": "EPISODIC"})).await.unwrap();
        assert_eq!(listed["memories"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn external_context_fetch_fails_closed_without_a_fetcher() {
        let ctx = ctx();
        let err = ExternalContextFetchTool
            .call(&ctx, json!({"source": "weather", "query": "Austin, TX"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotConfigured);
    }
}
