//! Shared batching decision helper.
//!
//! Most provider batch APIs accept one subject/body and a list of
//! recipients, so merging messages into one call is only safe when the
//! content truly does not vary by recipient. Each backend builds its own
//! `can_batch` on top of this; the personalization-array backend uses a
//! deliberately weaker predicate because its payload carries per-recipient
//! fields.

use mailcast_core::OutboundMessage;

/// Returns `true` when the list has at least two messages and every message
/// matches the first in every field except the recipient address and
/// display name.
///
/// Single-message lists return `false`: there is nothing to merge, and the
/// serial path avoids the batch envelope entirely.
pub fn content_uniform(messages: &[OutboundMessage]) -> bool {
    match messages {
        [] | [_] => false,
        [first, rest @ ..] => rest.iter().all(|m| first.content_matches(m)),
    }
}
