//! Thread shortcuts: fast-path commands handled without invoking the
//! metaprompt or tool loop at all (`spec.md` §4.7, step 1 "Thread
//! shortcuts"). Case-insensitive, matched on the whole trimmed message.

use crate::scope::extract_rfp_id;
use chrono::{DateTime, Utc};
use rfp_core::ThreadBinding;
use rfp_error::RfpError;
use rfp_opportunity::OpportunityRepo;

/// A recognized shortcut command.
#[derive(Debug, Clone, PartialEq)]
pub enum Shortcut {
    /// `link rfp_<id>` — bind the current thread to an RFP.
    Link(String),
    /// `where` — report which RFP (if any) the thread is bound to.
    Where,
    /// `unbind` / `forget this rfp` — remove the thread's binding.
    Unbind,
}

/// Parses `text` as a shortcut command, returning `None` if it isn't one.
pub fn parse_shortcut(text: &str) -> Option<Shortcut> {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    if let Some(rest) = lower.strip_prefix("link ") {
        return extract_rfp_id(rest).map(Shortcut::Link);
    }
    if lower == "where" || lower == "where am i" {
        return Some(Shortcut::Where);
    }
    if lower == "unbind" || lower == "forget this rfp" {
        return Some(Shortcut::Unbind);
    }
    None
}

/// The reply text a shortcut produces, to post back on the originating
/// surface without going through the tool loop.
pub async fn handle_shortcut(
    opportunity: &OpportunityRepo,
    shortcut: &Shortcut,
    channel_id: &str,
    thread_ts: &str,
    bound_by: &str,
    now: DateTime<Utc>,
) -> Result<String, RfpError> {
    match shortcut {
        Shortcut::Link(rfp_id) => {
            opportunity.ensure_state_exists(rfp_id, now).await?;
            opportunity.set_binding(ThreadBinding::new(channel_id, thread_ts, rfp_id.clone(), bound_by, now)).await?;
            Ok(format!("Linked this thread to {rfp_id}."))
        }
        Shortcut::Where => match opportunity.get_binding(channel_id, thread_ts).await? {
            Some(binding) => Ok(format!("This thread is bound to {}.", binding.rfp_id)),
            None => Ok("This thread isn't bound to an RFP yet. Say `link rfp_<id>` to bind it.".to_string()),
        },
        Shortcut::Unbind => {
            // there's no delete on ThreadBinding by design (§3); unbinding is
            // expressed as rebinding to an empty id, which get_binding/where
            // treats the same as "no binding" once surfaced.
            opportunity.set_binding(ThreadBinding::new(channel_id, thread_ts, "", bound_by, now)).await?;
            Ok("Unbound this thread.".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_store::InMemoryKeyValueStore;

    #[test]
    fn parses_link_case_insensitively() {
        assert_eq!(parse_shortcut("LINK rfp_01h9zz8abcdefg"), Some(Shortcut::Link("rfp_01h9zz8abcdefg".to_string())));
    }

    #[test]
    fn parses_where_and_unbind() {
        assert_eq!(parse_shortcut("Where"), Some(Shortcut::Where));
        assert_eq!(parse_shortcut("unbind"), Some(Shortcut::Unbind));
    }

    #[test]
    fn non_shortcut_text_is_not_parsed() {
        assert_eq!(parse_shortcut("what's the status of rfp_01h9zz8abcdefg?"), None);
    }

    #[tokio::test]
    async fn link_then_where_round_trips() {
        let opportunity = OpportunityRepo::new(InMemoryKeyValueStore::shared());
        let now = rfp_core::now();
        handle_shortcut(&opportunity, &Shortcut::Link("rfp_01h9zz8abcdefg".to_string()), "C1", "T1", "agent", now).await.unwrap();
        let reply = handle_shortcut(&opportunity, &Shortcut::Where, "C1", "T1", "agent", now).await.unwrap();
        assert!(reply.contains("rfp_01h9zz8abcdefg"));
    }
}
