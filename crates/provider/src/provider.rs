use std::collections::BTreeSet;

use async_trait::async_trait;
use mailcast_core::{OutboundMessage, SendResult, SuppressionReason, WebhookResult};

use crate::request::WebhookRequest;

/// Strongly-typed ESP backend trait with native `async fn`.
///
/// This trait is **not** object-safe because its async methods desugar to
/// opaque `impl Future` return types. For dynamic dispatch use
/// [`DynEspProvider`] — every `EspProvider` implements it through a blanket
/// implementation.
///
/// Implementations hold no mutable state between calls; concurrent callers
/// may share one instance freely. Retry scheduling, eligibility filtering
/// and webhook routing are all the caller's concern.
pub trait EspProvider: Send + Sync {
    /// Returns the unique name of this backend (e.g. `"smtp"`).
    fn name(&self) -> &str;

    /// Dispatch a batch of rendered messages.
    ///
    /// Never fails as a call: transport and API rejections are folded into
    /// the returned [`SendResult`] per message or per batch. The only
    /// fail-fast path is missing configuration, which yields an all-failed
    /// result without touching the network. A failure on one message must
    /// not abort the remaining messages in the same call.
    fn send_batch(
        &self,
        messages: &[OutboundMessage],
    ) -> impl std::future::Future<Output = SendResult> + Send;

    /// Cheap pre-flight gate: address syntax plus configuration readiness.
    /// Side-effect-free and not a deliverability guarantee.
    fn validate_from_address(&self, address: &str) -> bool;

    /// Verify and normalize an inbound provider webhook.
    ///
    /// A request that fails signature verification yields an empty result
    /// (and a warning log) rather than an error, so the HTTP layer can keep
    /// returning success — most ESPs disable an endpoint after repeated
    /// non-2xx responses.
    fn parse_webhook(&self, request: &WebhookRequest) -> WebhookResult;

    /// Push local suppression decisions to the provider's block list.
    ///
    /// Best-effort: failures are logged and swallowed. Local suppression
    /// state is authoritative; the provider-side list is a secondary
    /// defense layer.
    fn sync_suppressions(
        &self,
        addresses: &BTreeSet<String>,
        reason: SuppressionReason,
    ) -> impl std::future::Future<Output = ()> + Send;
}

/// Object-safe backend trait for use behind `Arc<dyn DynEspProvider>`.
///
/// Uses [`macro@async_trait`] to enable dynamic dispatch of async methods.
/// Implement [`EspProvider`] instead and rely on the blanket implementation.
#[async_trait]
pub trait DynEspProvider: Send + Sync {
    /// Returns the unique name of this backend.
    fn name(&self) -> &str;

    /// Dispatch a batch of rendered messages. See [`EspProvider::send_batch`].
    async fn send_batch(&self, messages: &[OutboundMessage]) -> SendResult;

    /// Cheap pre-flight gate. See [`EspProvider::validate_from_address`].
    fn validate_from_address(&self, address: &str) -> bool;

    /// Verify and normalize an inbound webhook. See [`EspProvider::parse_webhook`].
    fn parse_webhook(&self, request: &WebhookRequest) -> WebhookResult;

    /// Push suppressions to the provider. See [`EspProvider::sync_suppressions`].
    async fn sync_suppressions(&self, addresses: &BTreeSet<String>, reason: SuppressionReason);
}

/// Blanket implementation bridging the static and dynamic dispatch worlds.
#[async_trait]
impl<T: EspProvider + Sync> DynEspProvider for T {
    fn name(&self) -> &str {
        EspProvider::name(self)
    }

    async fn send_batch(&self, messages: &[OutboundMessage]) -> SendResult {
        EspProvider::send_batch(self, messages).await
    }

    fn validate_from_address(&self, address: &str) -> bool {
        EspProvider::validate_from_address(self, address)
    }

    fn parse_webhook(&self, request: &WebhookRequest) -> WebhookResult {
        EspProvider::parse_webhook(self, request)
    }

    async fn sync_suppressions(&self, addresses: &BTreeSet<String>, reason: SuppressionReason) {
        EspProvider::sync_suppressions(self, addresses, reason).await;
    }
}
