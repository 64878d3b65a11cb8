// レコードごとのメッセージ送信を検証器として扱うアダプター
// 送信結果（SID、状態）を派生情報として結果に載せる

use super::sender::{MessageChannel, MessageSender, SendError, SentMessage};
use crate::core::{Record, RecordValidator, ValidationResult, ValidatorError};
use crate::services::validators::PHONE_FIELD;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// 送信対象の経路
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sms,
    WhatsApp,
    /// WhatsApp、SMSの順に両方へ送る
    Both,
}

/// 両経路送信の総合状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Complete,
    Partial,
    Failed,
}

impl DeliveryStatus {
    pub fn from_outcomes(whatsapp_sent: bool, sms_sent: bool) -> Self {
        match (whatsapp_sent, sms_sent) {
            (true, true) => Self::Complete,
            (false, false) => Self::Failed,
            _ => Self::Partial,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

/// 送信用の番号（`1` 始まり11桁）
///
/// 10桁は国番号を補う。それ以外の桁数は送らない。
pub fn sending_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => Some(format!("1{digits}")),
        11 if digits.starts_with('1') => Some(digits),
        _ => None,
    }
}

/// 経路ごとの送信結果（失敗時はエラーメッセージ）
type ChannelOutcome = Result<SentMessage, String>;

/// 全員に同じ本文を送る
pub struct NotificationSender<S: MessageSender> {
    sender: Arc<S>,
    delivery: Delivery,
    message: String,
}

impl<S: MessageSender> NotificationSender<S> {
    pub fn new(sender: Arc<S>, delivery: Delivery, message: impl Into<String>) -> Self {
        Self {
            sender,
            delivery,
            message: message.into(),
        }
    }

    /// 宛先ごとの失敗は `Err(message)`、APIの拒否はチャンク失敗として返す
    async fn send_via(
        &self,
        channel: MessageChannel,
        to: &str,
        body: &str,
    ) -> Result<ChannelOutcome, ValidatorError> {
        match self.sender.send(channel, to, body).await {
            Ok(sent) => {
                info!(%channel, sid = %sent.sid, status = %sent.status, "message accepted");
                Ok(Ok(sent))
            }
            Err(SendError::Delivery(message)) => {
                debug!(%channel, %message, "message delivery failed");
                Ok(Err(message))
            }
            Err(rejected @ SendError::Rejected { .. }) => {
                Err(ValidatorError::service(anyhow::Error::new(rejected)))
            }
        }
    }
}

fn single_channel_result(
    record_index: usize,
    channel: MessageChannel,
    outcome: ChannelOutcome,
) -> ValidationResult {
    let result = match outcome {
        Ok(sent) => ValidationResult::valid(record_index)
            .with_field("sid", sent.sid)
            .with_field("status", sent.status),
        Err(message) => ValidationResult::invalid(
            record_index,
            format!("{} sending failed: {message}", channel.label()),
        )
        .with_field("status", "failed"),
    };
    result.with_field("channel", channel.as_str())
}

fn add_channel_fields(
    result: ValidationResult,
    channel: MessageChannel,
    outcome: &ChannelOutcome,
) -> ValidationResult {
    let prefix = channel.as_str();
    match outcome {
        Ok(sent) => result
            .with_field(format!("{prefix}_sid"), sent.sid.clone())
            .with_field(format!("{prefix}_status"), sent.status.clone()),
        Err(_) => result.with_field(format!("{prefix}_status"), "failed"),
    }
}

fn both_channels_result(
    record_index: usize,
    whatsapp: ChannelOutcome,
    sms: ChannelOutcome,
) -> ValidationResult {
    let status = DeliveryStatus::from_outcomes(whatsapp.is_ok(), sms.is_ok());

    // 少なくとも一方が届けば有効とする
    let result = match (&whatsapp, &sms) {
        (Err(whatsapp_error), Err(sms_error)) => ValidationResult::invalid(
            record_index,
            format!("WhatsApp sending failed: {whatsapp_error}; SMS sending failed: {sms_error}"),
        ),
        _ => ValidationResult::valid(record_index),
    };

    let result = add_channel_fields(result, MessageChannel::WhatsApp, &whatsapp);
    add_channel_fields(result, MessageChannel::Sms, &sms)
        .with_field("channel", "both")
        .with_field("status", status.as_str())
}

#[async_trait]
impl<S: MessageSender + 'static> RecordValidator for NotificationSender<S> {
    async fn validate(&self, record: &Record) -> Result<ValidationResult, ValidatorError> {
        let raw_phone = record
            .get(PHONE_FIELD)
            .ok_or_else(|| ValidatorError::record("No phone number provided"))?;
        let number = sending_number(raw_phone).ok_or_else(|| {
            ValidatorError::record(format!(
                "Phone validation failed: Invalid phone number format: {raw_phone}"
            ))
        })?;
        let to = format!("+{number}");
        let body = self.message.as_str();

        let result = match self.delivery {
            Delivery::Sms => single_channel_result(
                record.index,
                MessageChannel::Sms,
                self.send_via(MessageChannel::Sms, &to, body).await?,
            ),
            Delivery::WhatsApp => single_channel_result(
                record.index,
                MessageChannel::WhatsApp,
                self.send_via(MessageChannel::WhatsApp, &to, body).await?,
            ),
            Delivery::Both => {
                let whatsapp = self.send_via(MessageChannel::WhatsApp, &to, body).await?;
                let sms = self.send_via(MessageChannel::Sms, &to, body).await?;
                both_channels_result(record.index, whatsapp, sms)
            }
        };

        Ok(result.with_field("to", to))
    }
}
