// Twilio Messages APIによるSMS / WhatsApp送信

use async_trait::async_trait;
use mockall::automock;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// 送信経路
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageChannel {
    Sms,
    WhatsApp,
}

impl MessageChannel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::WhatsApp => "whatsapp",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Sms => "SMS",
            Self::WhatsApp => "WhatsApp",
        }
    }

    /// 宛先・送信元の表記（WhatsAppは `whatsapp:` を前置する）
    pub fn address(&self, number: &str) -> String {
        match self {
            Self::Sms => number.to_string(),
            Self::WhatsApp => format!("whatsapp:{number}"),
        }
    }
}

impl fmt::Display for MessageChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 受け付けられたメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SentMessage {
    pub sid: String,
    /// queued, sent など
    pub status: String,
}

#[derive(Error, Debug)]
pub enum SendError {
    /// 認証失敗など、以降の送信も同様に失敗するもの（チャンク全体を失敗させる）
    #[error("メッセージAPIがリクエストを拒否しました: HTTP {status} {message}")]
    Rejected { status: u16, message: String },

    /// 宛先不正や通信失敗など、その宛先だけの失敗
    #[error("{0}")]
    Delivery(String),
}

impl SendError {
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery(message.into())
    }
}

/// メッセージ送信サービス
#[automock]
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// `to` は `+` 付きの国際形式
    async fn send(
        &self,
        channel: MessageChannel,
        to: &str,
        body: &str,
    ) -> Result<SentMessage, SendError>;
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: String,
}

/// HTTPステータスから送信エラーを分類する
fn classify_failure(status: u16, body: &str) -> SendError {
    let detail = match serde_json::from_str::<TwilioErrorBody>(body) {
        Ok(TwilioErrorBody {
            code: Some(code),
            message,
        }) => format!("{code} {message}"),
        Ok(TwilioErrorBody { message, .. }) if !message.is_empty() => message,
        _ => body.to_string(),
    };

    match status {
        401 | 403 => SendError::Rejected {
            status,
            message: detail,
        },
        _ => SendError::delivery(format!("HTTP {status}: {detail}")),
    }
}

/// Twilio REST APIクライアント
pub struct TwilioSender {
    http_client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base: String,
}

impl TwilioSender {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            api_base: TWILIO_API_BASE.to_string(),
        })
    }

    /// 接続先を差し替える（プロキシやローカルのスタブ用）
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

#[async_trait]
impl MessageSender for TwilioSender {
    async fn send(
        &self,
        channel: MessageChannel,
        to: &str,
        body: &str,
    ) -> Result<SentMessage, SendError> {
        debug!(%channel, to = %to, "Sending message via Twilio");

        let form = [
            ("To", channel.address(to)),
            ("From", channel.address(&self.from_number)),
            ("Body", body.to_string()),
        ];
        let response = self
            .http_client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form[..])
            .send()
            .await
            .map_err(|e| SendError::delivery(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body));
        }

        response
            .json::<SentMessage>()
            .await
            .map_err(|e| SendError::delivery(format!("unreadable response: {e}")))
    }
}
