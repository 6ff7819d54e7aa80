//! Mirrors the billing provider's authoritative subscription state into the
//! users table. Handlers are last-write-wins field overwrites, so replayed
//! webhook deliveries are naturally idempotent; ordering is delegated to the
//! provider's retry semantics.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::{debug, info};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use pathway_core::Generator;

use crate::{Database, DatabaseError, PlanTier, PlatformContext, PrimaryKey, UserData};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum BillingError {
    /// The webhook signature header is missing, malformed, or wrong
    #[error("invalid webhook signature")]
    InvalidSignature,
    /// The webhook payload could not be interpreted
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),
    /// The billing provider could not be reached or rejected the request
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

#[derive(Debug, Error)]
#[error("billing provider request failed: {0}")]
pub struct GatewayError(pub String);

/// A pending checkout the user is redirected to.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Carried through the session as the client reference, so the webhook
    /// can find the user again
    pub user_id: PrimaryKey,
    pub customer_email: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// The provider's view of a subscription, reduced to the fields mirrored
/// into the users table.
#[derive(Debug, Clone)]
pub struct SubscriptionState {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

/// Represents a type that can talk to the billing provider's API
#[async_trait]
pub trait BillingGateway: Send + Sync + 'static {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;
    async fn subscription(&self, subscription_id: &str) -> Result<SubscriptionState, GatewayError>;
    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<SubscriptionState, GatewayError>;
}

/// The subscription fields a webhook event wants overwritten. `None` leaves
/// a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionPatch {
    pub plan: Option<PlanTier>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: Option<bool>,
}

impl SubscriptionPatch {
    /// The full mirror of a provider subscription, used after checkout and
    /// on explicit re-sync.
    pub fn from_subscription(state: &SubscriptionState) -> Self {
        Self {
            plan: Some(PlanTier::Premium),
            customer_id: Some(state.customer_id.clone()),
            subscription_id: Some(state.id.clone()),
            status: Some(state.status.clone()),
            current_period_end: state.current_period_end,
            cancel_at_period_end: Some(state.cancel_at_period_end),
        }
    }
}

/// Maps a webhook event type onto the patch it applies. Events that resolve
/// their user through the embedded subscription object go through here;
/// checkout completion is handled separately because it has to fetch the
/// subscription first.
pub fn subscription_patch(kind: &str, state: &SubscriptionState) -> Option<SubscriptionPatch> {
    match kind {
        "customer.subscription.updated" => Some(SubscriptionPatch {
            status: Some(state.status.clone()),
            current_period_end: state.current_period_end,
            cancel_at_period_end: Some(state.cancel_at_period_end),
            ..Default::default()
        }),
        "customer.subscription.deleted" => Some(SubscriptionPatch {
            plan: Some(PlanTier::Free),
            status: Some("canceled".to_string()),
            ..Default::default()
        }),
        "invoice.payment_succeeded" => Some(SubscriptionPatch {
            status: Some("active".to_string()),
            ..Default::default()
        }),
        "invoice.payment_failed" => Some(SubscriptionPatch {
            status: Some("past_due".to_string()),
            ..Default::default()
        }),
        _ => None,
    }
}

/// Verifies the provider's `t=<unix>,v1=<hex>` signature header against the
/// raw payload bytes. The signed message is `"{t}.{payload}"`.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str) -> Result<(), BillingError> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }

    let (timestamp, signature) = match (timestamp, signature) {
        (Some(t), Some(v)) => (t, v),
        _ => return Err(BillingError::InvalidSignature),
    };

    let expected = hex::decode(signature).map_err(|_| BillingError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| BillingError::InvalidSignature)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    mac.verify_slice(&expected)
        .map_err(|_| BillingError::InvalidSignature)
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    kind: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Shared secret the provider signs webhook payloads with
    pub webhook_secret: String,
    /// The price the checkout subscribes to
    pub price_id: String,
    /// Base for checkout success/cancel redirects
    pub public_app_url: String,
}

pub struct BillingManager<G, Db> {
    context: PlatformContext<G, Db>,
    config: BillingConfig,
}

impl<G, Db> BillingManager<G, Db>
where
    G: Generator,
    Db: Database,
{
    pub fn new(context: &PlatformContext<G, Db>, config: BillingConfig) -> Self {
        Self {
            context: context.clone(),
            config,
        }
    }

    /// Starts a checkout for the user. The returned URL is where the user
    /// completes payment; everything after that arrives via webhook.
    pub async fn create_checkout(&self, user_id: PrimaryKey) -> Result<CheckoutSession, BillingError> {
        let user = self.context.database.user_by_id(user_id).await?;

        let request = CheckoutRequest {
            user_id: user.id,
            customer_email: user.email,
            price_id: self.config.price_id.clone(),
            success_url: format!("{}/billing/success", self.config.public_app_url),
            cancel_url: format!("{}/billing/canceled", self.config.public_app_url),
        };

        let session = self
            .context
            .billing_gateway
            .create_checkout_session(request)
            .await?;

        Ok(session)
    }

    /// Verifies and applies one webhook delivery.
    pub async fn handle_webhook(&self, payload: &[u8], header: &str) -> Result<(), BillingError> {
        verify_signature(payload, header, &self.config.webhook_secret)?;

        let envelope: WebhookEnvelope = serde_json::from_slice(payload)
            .map_err(|e| BillingError::MalformedPayload(e.to_string()))?;

        match envelope.kind.as_str() {
            "checkout.session.completed" => self.apply_checkout(&envelope.data.object).await,
            "customer.subscription.updated" | "customer.subscription.deleted" => {
                let state = subscription_from_object(&envelope.data.object)?;
                self.apply_by_subscription(&envelope.kind, state).await
            }
            "invoice.payment_succeeded" | "invoice.payment_failed" => {
                let subscription_id = envelope
                    .data
                    .object
                    .get("subscription")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        BillingError::MalformedPayload("invoice without subscription".to_string())
                    })?;

                let state = self.context.billing_gateway.subscription(subscription_id).await?;
                self.apply_by_subscription(&envelope.kind, state).await
            }
            other => {
                // Acknowledged but irrelevant
                debug!("Ignoring webhook event {other}");
                Ok(())
            }
        }
    }

    /// Re-fetches the user's subscription from the provider and re-applies
    /// the full mirror.
    pub async fn sync_subscription(&self, user_id: PrimaryKey) -> Result<UserData, BillingError> {
        let user = self.context.database.user_by_id(user_id).await?;

        let subscription_id = user.subscription_id.ok_or_else(|| {
            BillingError::MalformedPayload("user has no subscription".to_string())
        })?;

        let state = self
            .context
            .billing_gateway
            .subscription(&subscription_id)
            .await?;

        let user = self
            .context
            .database
            .apply_subscription_patch(user_id, SubscriptionPatch::from_subscription(&state))
            .await?;

        Ok(user)
    }

    /// Flips cancel-at-period-end at the provider, then mirrors the result.
    pub async fn toggle_renewal(
        &self,
        user_id: PrimaryKey,
        cancel: bool,
    ) -> Result<UserData, BillingError> {
        let user = self.context.database.user_by_id(user_id).await?;

        let subscription_id = user.subscription_id.ok_or_else(|| {
            BillingError::MalformedPayload("user has no subscription".to_string())
        })?;

        let state = self
            .context
            .billing_gateway
            .set_cancel_at_period_end(&subscription_id, cancel)
            .await?;

        let user = self
            .context
            .database
            .apply_subscription_patch(user_id, SubscriptionPatch::from_subscription(&state))
            .await?;

        Ok(user)
    }

    async fn apply_checkout(&self, object: &serde_json::Value) -> Result<(), BillingError> {
        let user_id: PrimaryKey = object
            .get("client_reference_id")
            .and_then(|v| v.as_str())
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                BillingError::MalformedPayload("checkout without client reference".to_string())
            })?;

        let subscription_id = object
            .get("subscription")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                BillingError::MalformedPayload("checkout without subscription".to_string())
            })?;

        let state = self
            .context
            .billing_gateway
            .subscription(subscription_id)
            .await?;

        self.context
            .database
            .apply_subscription_patch(user_id, SubscriptionPatch::from_subscription(&state))
            .await?;

        info!("User {user_id} completed checkout");

        Ok(())
    }

    async fn apply_by_subscription(
        &self,
        kind: &str,
        state: SubscriptionState,
    ) -> Result<(), BillingError> {
        let user = self
            .context
            .database
            .user_by_subscription_id(&state.id)
            .await?;

        if let Some(patch) = subscription_patch(kind, &state) {
            self.context
                .database
                .apply_subscription_patch(user.id, patch)
                .await?;

            info!("Applied {kind} to user {}", user.id);
        }

        Ok(())
    }
}

/// Reads a [SubscriptionState] out of a webhook's embedded subscription
/// object.
fn subscription_from_object(object: &serde_json::Value) -> Result<SubscriptionState, BillingError> {
    #[derive(Deserialize)]
    struct SubscriptionObject {
        id: String,
        customer: String,
        status: String,
        current_period_end: Option<i64>,
        #[serde(default)]
        cancel_at_period_end: bool,
    }

    let object: SubscriptionObject = serde_json::from_value(object.clone())
        .map_err(|e| BillingError::MalformedPayload(e.to_string()))?;

    Ok(SubscriptionState {
        id: object.id,
        customer_id: object.customer,
        status: object.status,
        current_period_end: object
            .current_period_end
            .and_then(|t| DateTime::from_timestamp(t, 0)),
        cancel_at_period_end: object.cancel_at_period_end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], timestamp: &str, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);

        let digest = mac.finalize().into_bytes();
        format!("t={timestamp},v1={}", hex::encode(digest))
    }

    #[test]
    fn a_correctly_signed_payload_verifies() {
        let payload = br#"{"type": "invoice.payment_succeeded"}"#;
        let header = sign(payload, "1718000000", "whsec_test");

        assert!(verify_signature(payload, &header, "whsec_test").is_ok());
    }

    #[test]
    fn a_tampered_payload_is_rejected() {
        let payload = br#"{"type": "invoice.payment_succeeded"}"#;
        let header = sign(payload, "1718000000", "whsec_test");

        let tampered = br#"{"type": "customer.subscription.deleted"}"#;
        assert!(matches!(
            verify_signature(tampered, &header, "whsec_test"),
            Err(BillingError::InvalidSignature)
        ));
    }

    #[test]
    fn a_wrong_secret_is_rejected() {
        let payload = b"{}";
        let header = sign(payload, "1718000000", "whsec_test");

        assert!(verify_signature(payload, &header, "whsec_other").is_err());
    }

    #[test]
    fn malformed_headers_are_rejected() {
        for header in ["", "t=123", "v1=ab", "t=123,v1=not-hex"] {
            assert!(
                verify_signature(b"{}", header, "whsec_test").is_err(),
                "header {header:?} should not verify"
            );
        }
    }

    fn state(status: &str) -> SubscriptionState {
        SubscriptionState {
            id: "sub_123".to_string(),
            customer_id: "cus_123".to_string(),
            status: status.to_string(),
            current_period_end: DateTime::from_timestamp(1_750_000_000, 0),
            cancel_at_period_end: false,
        }
    }

    #[test]
    fn subscription_updates_refresh_status_and_period() {
        let patch = subscription_patch("customer.subscription.updated", &state("active")).unwrap();

        assert_eq!(patch.status.as_deref(), Some("active"));
        assert_eq!(patch.current_period_end, state("active").current_period_end);
        assert_eq!(patch.cancel_at_period_end, Some(false));
        assert_eq!(patch.plan, None);
    }

    #[test]
    fn subscription_deletion_reverts_to_free() {
        let patch = subscription_patch("customer.subscription.deleted", &state("active")).unwrap();

        assert_eq!(patch.plan, Some(PlanTier::Free));
        assert_eq!(patch.status.as_deref(), Some("canceled"));
    }

    #[test]
    fn invoice_outcomes_map_to_statuses() {
        let paid = subscription_patch("invoice.payment_succeeded", &state("active")).unwrap();
        assert_eq!(paid.status.as_deref(), Some("active"));

        let failed = subscription_patch("invoice.payment_failed", &state("active")).unwrap();
        assert_eq!(failed.status.as_deref(), Some("past_due"));
    }

    #[test]
    fn unknown_events_apply_nothing() {
        assert_eq!(subscription_patch("customer.created", &state("active")), None);
    }

    #[test]
    fn checkout_mirrors_the_full_subscription() {
        let patch = SubscriptionPatch::from_subscription(&state("trialing"));

        assert_eq!(patch.plan, Some(PlanTier::Premium));
        assert_eq!(patch.subscription_id.as_deref(), Some("sub_123"));
        assert_eq!(patch.customer_id.as_deref(), Some("cus_123"));
        assert_eq!(patch.status.as_deref(), Some("trialing"));
    }
}
