//! Payment provider transfer notifications
//!
//! Notifications arrive wrapped in an SNS-style envelope whose `Message`
//! field is itself a JSON string:
//!
//! ```json
//! { "type": "Notification",
//!   "Message": "{\"notificationType\":\"transfers\",\"transfer\":{...}}" }
//! ```

use guardian_core::{Amount, Currency};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{PipelineError, PipelineResult};
use crate::ingest::{IngestReceipt, NewTransaction};
use crate::orchestrator::EvaluationOrchestrator;

const NOTIFICATION: &str = "Notification";
const TRANSFERS: &str = "transfers";
const UNKNOWN_DESTINATION: &str = "unknown";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "Message", default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Notification {
    notification_type: String,
    #[serde(default)]
    transfer: Option<Transfer>,
}

#[derive(Debug, Deserialize)]
struct Transfer {
    id: String,
    source: Source,
    #[serde(default)]
    destination: Option<Destination>,
    amount: Money,
}

#[derive(Debug, Deserialize)]
struct Source {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Destination {
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Money {
    amount: Value,
    currency: String,
}

/// A transfer pulled out of a notification
#[derive(Debug, Clone, PartialEq)]
pub struct TransferNotification {
    pub transfer_id: String,
    pub source_wallet_id: String,
    pub destination_address: String,
    pub amount: Amount,
    pub currency: Currency,
}

#[derive(Debug)]
pub enum WebhookOutcome {
    /// Acknowledged without action
    Ignored(String),
    /// Redelivery of a transfer that is already stored
    Duplicate { transaction_id: String },
    Ingested(IngestReceipt),
}

fn malformed(what: impl std::fmt::Display) -> PipelineError {
    PipelineError::MalformedWebhook(what.to_string())
}

/// Parse a webhook body. `Ok(None)` for notifications that are not transfers.
pub fn parse_notification(body: &str) -> PipelineResult<Option<TransferNotification>> {
    let envelope: Envelope = serde_json::from_str(body).map_err(malformed)?;
    if envelope.kind != NOTIFICATION {
        return Ok(None);
    }

    let message = envelope
        .message
        .ok_or_else(|| malformed("notification without Message"))?;
    let notification: Notification = serde_json::from_str(&message).map_err(malformed)?;
    if notification.notification_type != TRANSFERS {
        return Ok(None);
    }

    let transfer = notification
        .transfer
        .ok_or_else(|| malformed("transfers notification without transfer"))?;

    let amount_text = match &transfer.amount.amount {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(malformed(format!("unexpected amount {}", other))),
    };
    let amount: Amount = amount_text.parse().map_err(malformed)?;
    let currency: Currency = transfer.amount.currency.parse().map_err(malformed)?;

    let destination_address = transfer
        .destination
        .and_then(|d| d.address)
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| UNKNOWN_DESTINATION.to_string());

    Ok(Some(TransferNotification {
        transfer_id: transfer.id,
        source_wallet_id: transfer.source.id,
        destination_address,
        amount,
        currency,
    }))
}

impl EvaluationOrchestrator {
    /// Ingest and evaluate the transfer carried by a webhook body
    pub async fn handle_webhook(&self, body: &str) -> PipelineResult<WebhookOutcome> {
        let Some(transfer) = parse_notification(body)? else {
            return Ok(WebhookOutcome::Ignored("not a transfer notification".to_string()));
        };

        let Some(agent) = self.store.find_agent_by_wallet_id(&transfer.source_wallet_id)? else {
            tracing::info!(
                wallet_id = %transfer.source_wallet_id,
                transfer_id = %transfer.transfer_id,
                "Transfer from unmanaged wallet ignored"
            );
            return Ok(WebhookOutcome::Ignored(format!(
                "no agent owns wallet {}",
                transfer.source_wallet_id
            )));
        };

        // The provider wallet id stands in for the source address
        let receipt = self
            .ingest_transaction(NewTransaction {
                agent_id: agent.id,
                amount: transfer.amount,
                currency: transfer.currency,
                from_address: Some(transfer.source_wallet_id),
                to_address: transfer.destination_address,
                external_id: Some(transfer.transfer_id),
            })
            .await?;

        if receipt.duplicate {
            return Ok(WebhookOutcome::Duplicate {
                transaction_id: receipt.transaction_id,
            });
        }
        Ok(WebhookOutcome::Ingested(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn envelope(message: Value) -> String {
        json!({ "type": "Notification", "Message": message.to_string() }).to_string()
    }

    #[test]
    fn test_parse_transfer() {
        let body = envelope(json!({
            "notificationType": "transfers",
            "transfer": {
                "id": "tr-1",
                "source": { "type": "wallet", "id": "wallet-1" },
                "destination": { "type": "blockchain", "address": "0xdest" },
                "amount": { "amount": "2000.00", "currency": "USD" }
            }
        }));

        let transfer = parse_notification(&body).unwrap().unwrap();
        assert_eq!(transfer.transfer_id, "tr-1");
        assert_eq!(transfer.source_wallet_id, "wallet-1");
        assert_eq!(transfer.destination_address, "0xdest");
        assert_eq!(transfer.amount.value(), dec!(2000.00));
        assert_eq!(transfer.currency, Currency::Usd);
    }

    #[test]
    fn test_missing_destination_is_unknown() {
        let body = envelope(json!({
            "notificationType": "transfers",
            "transfer": {
                "id": "tr-2",
                "source": { "id": "wallet-1" },
                "amount": { "amount": 15, "currency": "USDC" }
            }
        }));

        let transfer = parse_notification(&body).unwrap().unwrap();
        assert_eq!(transfer.destination_address, "unknown");
        assert_eq!(transfer.amount.value(), dec!(15));
    }

    #[test]
    fn test_other_notifications_ignored() {
        let confirmation = json!({ "type": "SubscriptionConfirmation" }).to_string();
        assert!(parse_notification(&confirmation).unwrap().is_none());

        let payments = envelope(json!({ "notificationType": "payments" }));
        assert!(parse_notification(&payments).unwrap().is_none());
    }

    #[test]
    fn test_malformed_bodies_rejected() {
        assert!(matches!(
            parse_notification("not json"),
            Err(PipelineError::MalformedWebhook(_))
        ));

        let no_message = json!({ "type": "Notification" }).to_string();
        assert!(parse_notification(&no_message).is_err());

        let negative = envelope(json!({
            "notificationType": "transfers",
            "transfer": {
                "id": "tr-3",
                "source": { "id": "wallet-1" },
                "amount": { "amount": "-5", "currency": "USDC" }
            }
        }));
        assert!(parse_notification(&negative).is_err());
    }
}
