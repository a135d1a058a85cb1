//! Notification subscription management

use aws_sdk_sns::Client;
use tracing::{info, warn};

use crate::error::{OpsError, map_sdk_error};

/// Confirmation state of a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionState {
    Confirmed(String),
    /// Has no usable ARN yet; cannot be removed through this interface
    /// and expires on its own if never confirmed
    PendingConfirmation,
}

#[derive(Debug, Clone)]
pub struct SubscriptionInfo {
    pub endpoint: String,
    pub protocol: String,
    pub state: SubscriptionState,
}

/// Result of an endpoint removal request
#[derive(Debug, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed { count: usize },
    /// Only pending-confirmation entries matched; nothing was removed
    Pending,
    NotFound,
}

/// Lists and removes topic subscriptions
pub struct SubscriptionManager {
    client: Client,
}

impl SubscriptionManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// List every subscription of the topic, walking all pages.
    pub async fn list_subscriptions(
        &self,
        topic_arn: &str,
    ) -> Result<Vec<SubscriptionInfo>, OpsError> {
        let mut subscriptions = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut req = self.client.list_subscriptions_by_topic().topic_arn(topic_arn);
            if let Some(ref token) = next_token {
                req = req.next_token(token);
            }
            let output = req
                .send()
                .await
                .map_err(|e| map_sdk_error("ListSubscriptionsByTopic", e))?;

            for sub in output.subscriptions() {
                let state = match sub.subscription_arn() {
                    Some(arn) if arn != "PendingConfirmation" => {
                        SubscriptionState::Confirmed(arn.to_string())
                    }
                    _ => SubscriptionState::PendingConfirmation,
                };
                subscriptions.push(SubscriptionInfo {
                    endpoint: sub.endpoint().unwrap_or_default().to_string(),
                    protocol: sub.protocol().unwrap_or_default().to_string(),
                    state,
                });
            }

            match output.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(subscriptions)
    }

    /// Unsubscribe every confirmed subscription for the endpoint.
    ///
    /// Pending-confirmation matches are reported, not treated as an
    /// error: they carry no usable ARN and expire on their own.
    pub async fn remove_endpoint(
        &self,
        topic_arn: &str,
        endpoint: &str,
    ) -> Result<RemovalOutcome, OpsError> {
        let matches: Vec<SubscriptionInfo> = self
            .list_subscriptions(topic_arn)
            .await?
            .into_iter()
            .filter(|s| s.endpoint == endpoint)
            .collect();

        if matches.is_empty() {
            return Ok(RemovalOutcome::NotFound);
        }

        let mut removed = 0;
        let mut pending = false;
        for subscription in matches {
            match subscription.state {
                SubscriptionState::Confirmed(arn) => {
                    self.client
                        .unsubscribe()
                        .subscription_arn(&arn)
                        .send()
                        .await
                        .map_err(|e| map_sdk_error("Unsubscribe", e))?;
                    info!(%endpoint, %arn, "Unsubscribed endpoint");
                    removed += 1;
                }
                SubscriptionState::PendingConfirmation => {
                    warn!(
                        %endpoint,
                        "Subscription is pending confirmation and cannot be removed through this interface"
                    );
                    pending = true;
                }
            }
        }

        if removed > 0 {
            Ok(RemovalOutcome::Removed { count: removed })
        } else if pending {
            Ok(RemovalOutcome::Pending)
        } else {
            Ok(RemovalOutcome::NotFound)
        }
    }
}
