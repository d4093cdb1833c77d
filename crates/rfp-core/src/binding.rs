//! Thread bindings: `(channelId, threadTs) → rfpId` (`spec.md` §3,
//! "ThreadBinding").

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A binding of a chat thread to an RFP, used to avoid asking "which RFP?"
/// on every message in a thread that already established context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThreadBinding {
    /// Chat channel id.
    pub channel_id: String,
    /// Chat thread timestamp (the platform's thread identifier).
    pub thread_ts: String,
    /// The RFP this thread is bound to.
    pub rfp_id: String,
    /// Who (or what) established the binding, e.g. a user sub or `"agent"`.
    pub bound_by: String,
    /// When the binding was established.
    pub bound_at: DateTime<Utc>,
}

impl ThreadBinding {
    /// Constructs a new binding.
    pub fn new(
        channel_id: impl Into<String>,
        thread_ts: impl Into<String>,
        rfp_id: impl Into<String>,
        bound_by: impl Into<String>,
        bound_at: DateTime<Utc>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            thread_ts: thread_ts.into(),
            rfp_id: rfp_id.into(),
            bound_by: bound_by.into(),
            bound_at,
        }
    }
}
