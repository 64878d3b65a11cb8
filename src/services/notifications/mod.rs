// 通知ドメイン
// 依頼者へのSMS / WhatsApp送信

pub mod notifier;
pub mod sender;

// 公開API
pub use notifier::{sending_number, Delivery, DeliveryStatus, NotificationSender};
pub use sender::{MessageChannel, MessageSender, SendError, SentMessage, TwilioSender};
