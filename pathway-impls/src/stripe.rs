use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use pathway_collab::{
    BillingGateway, CheckoutRequest, CheckoutSession, GatewayError, SubscriptionState,
};

const DEFAULT_BASE_URL: &str = "https://api.stripe.com/v1";

/// A [BillingGateway] implementation against the Stripe HTTP API.
/// Requests are form-encoded with bearer auth, the way the API expects.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: String,
    status: String,
    current_period_end: Option<i64>,
    #[serde(default)]
    cancel_at_period_end: bool,
}

impl From<SubscriptionObject> for SubscriptionState {
    fn from(object: SubscriptionObject) -> Self {
        Self {
            id: object.id,
            customer_id: object.customer,
            status: object.status,
            current_period_end: object
                .current_period_end
                .and_then(|t| DateTime::from_timestamp(t, 0)),
            cancel_at_period_end: object.cancel_at_period_end,
        }
    }
}

impl StripeGateway {
    pub fn new(secret_key: &str) -> Self {
        Self::with_base_url(secret_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(secret_key: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn parse<T>(&self, response: reqwest::Response) -> Result<T, GatewayError>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError(format!("{status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError(e.to_string()))
    }
}

#[async_trait]
impl BillingGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let user_id = request.user_id.to_string();

        let form = [
            ("mode", "subscription"),
            ("client_reference_id", &user_id),
            ("customer_email", &request.customer_email),
            ("line_items[0][price]", &request.price_id),
            ("line_items[0][quantity]", "1"),
            ("success_url", &request.success_url),
            ("cancel_url", &request.cancel_url),
        ];

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError(e.to_string()))?;

        let session: CheckoutSessionObject = self.parse(response).await?;

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn subscription(&self, subscription_id: &str) -> Result<SubscriptionState, GatewayError> {
        let response = self
            .client
            .get(format!("{}/subscriptions/{subscription_id}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError(e.to_string()))?;

        let object: SubscriptionObject = self.parse(response).await?;

        Ok(object.into())
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<SubscriptionState, GatewayError> {
        let form = [("cancel_at_period_end", if cancel { "true" } else { "false" })];

        let response = self
            .client
            .post(format!("{}/subscriptions/{subscription_id}", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError(e.to_string()))?;

        let object: SubscriptionObject = self.parse(response).await?;

        Ok(object.into())
    }
}
