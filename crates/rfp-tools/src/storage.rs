//! Storage tool category: direct reads against the key-value table and
//! object store, for ad-hoc introspection outside the typed repositories
//! (`spec.md` §4.4 "Storage", §9).

use crate::context::ToolContext;
use crate::registry::{ToolDef, ToolHandler};
use async_trait::async_trait;
use chrono::Duration;
use rfp_error::{ErrorCode, RfpError};
use rfp_store::{ItemKey, QueryIndex, QueryRequest, ScanDirection};
use serde_json::{json, Value};

fn arg_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, RfpError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RfpError::new(ErrorCode::Internal, format!("missing required argument '{field}'")))
}

fn arg_limit(args: &Value, default: usize) -> usize {
    args.get("limit").and_then(Value::as_u64).map(|n| n as usize).unwrap_or(default).clamp(1, 100)
}

pub struct DdbGetItemTool;

#[async_trait]
impl ToolHandler for DdbGetItemTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "ddb_get_item",
            description: "Point-read one row from the key-value table by (pk, sk).",
            parameters_schema: json!({
                "type": "object",
                "properties": { "pk": {"type": "string"}, "sk": {"type": "string"} },
                "required": ["pk", "sk"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let pk = arg_str(&args, "pk")?;
        let sk = arg_str(&args, "sk")?;
        match ctx.store.get(&ItemKey::new(pk, sk)).await? {
            Some(item) => Ok(json!({ "pk": item.key.pk, "sk": item.key.sk, "attributes": item.attributes })),
            None => Err(RfpError::new(ErrorCode::NotFound, format!("no item at ({pk}, {sk})"))),
        }
    }
}

fn query_result(items: Vec<rfp_store::Item>, continuation_token: Option<String>) -> Value {
    let rows: Vec<Value> = items
        .into_iter()
        .map(|item| json!({ "pk": item.key.pk, "sk": item.key.sk, "attributes": item.attributes }))
        .collect();
    json!({ "items": rows, "continuationToken": continuation_token })
}

pub struct DdbQueryPkTool;

#[async_trait]
impl ToolHandler for DdbQueryPkTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "ddb_query_pk",
            description: "Query the primary key by exact partition key, with an optional sort-key prefix filter.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "pk": {"type": "string"},
                    "skPrefix": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100},
                    "continuationToken": {"type": "string"},
                    "backward": {"type": "boolean"}
                },
                "required": ["pk"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let pk = arg_str(&args, "pk")?.to_string();
        let sort_key_prefix = args.get("skPrefix").and_then(Value::as_str).map(str::to_string);
        let limit = arg_limit(&args, 20);
        let continuation_token = args.get("continuationToken").and_then(Value::as_str).map(str::to_string);
        let direction = if args.get("backward").and_then(Value::as_bool).unwrap_or(false) {
            ScanDirection::Backward
        } else {
            ScanDirection::Forward
        };

        let page = ctx
            .store
            .query(QueryRequest { index: QueryIndex::Primary, partition_key: pk, sort_key_prefix, direction, limit, continuation_token })
            .await?;
        Ok(query_result(page.items, page.continuation_token))
    }
}

pub struct DdbQueryGsi1Tool;

#[async_trait]
impl ToolHandler for DdbQueryGsi1Tool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "ddb_query_gsi1",
            description: "Query the gsi1 secondary index by exact partition key, with an optional sort-key prefix filter.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "gsi1pk": {"type": "string"},
                    "skPrefix": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100},
                    "continuationToken": {"type": "string"},
                    "backward": {"type": "boolean"}
                },
                "required": ["gsi1pk"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let gsi1pk = arg_str(&args, "gsi1pk")?.to_string();
        let sort_key_prefix = args.get("skPrefix").and_then(Value::as_str).map(str::to_string);
        let limit = arg_limit(&args, 20);
        let continuation_token = args.get("continuationToken").and_then(Value::as_str).map(str::to_string);
        let direction = if args.get("backward").and_then(Value::as_bool).unwrap_or(false) {
            ScanDirection::Backward
        } else {
            ScanDirection::Forward
        };

        let page = ctx
            .store
            .query(QueryRequest { index: QueryIndex::Gsi1, partition_key: gsi1pk, sort_key_prefix, direction, limit, continuation_token })
            .await?;
        Ok(query_result(page.items, page.continuation_token))
    }
}

pub struct S3HeadObjectTool;

#[async_trait]
impl ToolHandler for S3HeadObjectTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "s3_head_object",
            description: "Fetch size and content type for an object key, without its bytes.",
            parameters_schema: json!({
                "type": "object",
                "properties": { "key": {"type": "string"} },
                "required": ["key"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let key = arg_str(&args, "key")?;
        let head = ctx.objects.head(key).await?;
        Ok(json!({ "key": head.key, "size": head.size, "contentType": head.content_type }))
    }
}

/// Reads an object's bytes as UTF-8 text, capped to keep tool output small.
/// Binary objects should be fetched via [`S3PresignGetTool`] instead.
pub struct S3GetObjectTextTool;

const MAX_TEXT_OBJECT_BYTES: u64 = 200_000;

#[async_trait]
impl ToolHandler for S3GetObjectTextTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "s3_get_object_text",
            description: "Read an object's contents as UTF-8 text (up to 200 KB).",
            parameters_schema: json!({
                "type": "object",
                "properties": { "key": {"type": "string"} },
                "required": ["key"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let key = arg_str(&args, "key")?;
        let bytes = ctx.objects.get_bytes(key, MAX_TEXT_OBJECT_BYTES).await?;
        let text = String::from_utf8(bytes).map_err(|e| RfpError::new(ErrorCode::ParseFailed, format!("object '{key}' is not valid UTF-8: {e}")))?;
        Ok(json!({ "key": key, "text": text }))
    }
}

pub struct S3PresignGetTool;

#[async_trait]
impl ToolHandler for S3PresignGetTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "s3_presign_get",
            description: "Mint a time-limited GET URL for an object (capped at 24h).",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "key": {"type": "string"},
                    "ttlSeconds": {"type": "integer", "minimum": 1}
                },
                "required": ["key"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let key = arg_str(&args, "key")?;
        let ttl_seconds = args.get("ttlSeconds").and_then(Value::as_i64).unwrap_or(3600);
        let url = ctx.objects.presign_get(key, Duration::seconds(ttl_seconds)).await?;
        Ok(json!({ "url": url }))
    }
}

pub struct S3PresignPutTool;

#[async_trait]
impl ToolHandler for S3PresignPutTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "s3_presign_put",
            description: "Mint a time-limited PUT URL for an object (capped at 1h).",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "key": {"type": "string"},
                    "contentType": {"type": "string"},
                    "ttlSeconds": {"type": "integer", "minimum": 1}
                },
                "required": ["key", "contentType"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let key = arg_str(&args, "key")?;
        let content_type = arg_str(&args, "contentType")?;
        let ttl_seconds = args.get("ttlSeconds").and_then(Value::as_i64).unwrap_or(900);
        let url = ctx.objects.presign_put(key, content_type, Duration::seconds(ttl_seconds)).await?;
        Ok(json!({ "url": url }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_policy::{AllowlistConfig, PolicyEngine};
    use rfp_store::{Condition, Item};
    use std::sync::Arc;

    fn ctx() -> ToolContext {
        ToolContext::new(
            rfp_store::InMemoryKeyValueStore::shared(),
            Arc::new(rfp_store::InMemoryObjectStore::new().unwrap()),
            PolicyEngine::new(&AllowlistConfig::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn get_item_reports_not_found_for_missing_row() {
        let ctx = ctx();
        let err = DdbGetItemTool.call(&ctx, json!({"pk": "RFP#1", "sk": "PROFILE"})).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn query_pk_returns_matching_rows() {
        let ctx = ctx();
        ctx.store
            .put(Item { key: ItemKey::new("RFP#1", "EVENT#1"), gsi1pk: None, gsi1sk: None, attributes: json!({"i": 1}) }, Some(Condition::NotExists))
            .await
            .unwrap();
        let result = DdbQueryPkTool.call(&ctx, json!({"pk": "RFP#1"})).await.unwrap();
        assert_eq!(result["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn s3_get_object_text_round_trips() {
        let ctx = ctx();
        ctx.objects.put_bytes("rfp/1/notes.txt", b"hello".to_vec(), "text/plain").await.unwrap();
        let result = S3GetObjectTextTool.call(&ctx, json!({"key": "rfp/1/notes.txt"})).await.unwrap();
        assert_eq!(result["text"], json!("hello"));
    }

    #[tokio::test]
    async fn s3_presign_get_rejects_ttl_over_cap() {
        let ctx = ctx();
        ctx.objects.put_bytes("rfp/1/doc.pdf", b"x".to_vec(), "application/pdf").await.unwrap();
        let err = S3PresignGetTool.call(&ctx, json!({"key": "rfp/1/doc.pdf", "ttlSeconds": 100_000})).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
    }
}
