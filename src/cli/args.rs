use crate::core::OrderMode;
use crate::services::Delivery;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "request_validator")]
#[command(about = "Validate phone numbers, addresses and duplicate customers in request spreadsheets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate phone numbers (NANP format, carrier hint, fraud indicators)
    Phones {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Validate addresses with the Google Geocoding API
    Addresses {
        #[command(flatten)]
        run: RunArgs,

        /// Google Maps API key
        #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
        api_key: String,
    },

    /// Detect customers that already appear in the historical records
    Duplicates {
        #[command(flatten)]
        run: RunArgs,

        /// Historical records file (.csv, .json or .xlsx)
        #[arg(long)]
        history: PathBuf,

        /// Minimum address similarity (0.0-1.0) to count as a match
        #[arg(short, long, default_value = "0.8")]
        threshold: f64,
    },

    /// Send SMS and/or WhatsApp messages to each requester through Twilio
    Notify {
        #[command(flatten)]
        run: RunArgs,

        /// Delivery channel
        #[arg(long, value_enum, default_value = "sms")]
        channel: NotifyChannel,

        /// Message body sent to every recipient
        #[arg(short, long)]
        message: String,

        /// Twilio account SID
        #[arg(long, env = "TWILIO_ACCOUNT_SID")]
        account_sid: String,

        /// Twilio auth token
        #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
        auth_token: String,

        /// Sending phone number in E.164 format
        #[arg(long = "from", env = "TWILIO_PHONE_NUMBER")]
        from_number: String,
    },
}

/// Options shared by every validation command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Input file with customer requests (.csv, .json, .xlsx or .xls)
    pub input: PathBuf,

    /// Output file for results (.json or .csv)
    #[arg(short, long, default_value = "validation_results.json")]
    pub output: PathBuf,

    /// Force overwrite existing output file without warning
    #[arg(short, long)]
    pub force: bool,

    /// Number of concurrent workers (1-16)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=16))]
    pub workers: Option<u64>,

    /// Records per chunk (10-200)
    #[arg(long, value_parser = clap::value_parser!(u64).range(10..=200))]
    pub chunk_size: Option<u64>,

    /// Process chunks one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Result order
    #[arg(long, value_enum)]
    pub order: Option<ResultOrder>,

    /// Delay between external API calls within a chunk, in milliseconds
    #[arg(long)]
    pub api_delay_ms: Option<u64>,

    /// Fail a chunk that takes longer than this many seconds
    #[arg(long)]
    pub chunk_timeout_secs: Option<u64>,

    /// Pipeline configuration file (JSON); command-line flags take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultOrder {
    /// Same order as the input file
    Submission,
    /// Order in which chunks finished
    Completion,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyChannel {
    Sms,
    Whatsapp,
    /// WhatsApp and SMS
    Both,
}

impl From<NotifyChannel> for Delivery {
    fn from(channel: NotifyChannel) -> Self {
        match channel {
            NotifyChannel::Sms => Delivery::Sms,
            NotifyChannel::Whatsapp => Delivery::WhatsApp,
            NotifyChannel::Both => Delivery::Both,
        }
    }
}

impl From<ResultOrder> for OrderMode {
    fn from(order: ResultOrder) -> Self {
        match order {
            ResultOrder::Submission => OrderMode::Submission,
            ResultOrder::Completion => OrderMode::Completion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_phones_command() {
        let cli = Cli::try_parse_from([
            "request_validator",
            "phones",
            "requests.csv",
            "--workers",
            "4",
            "--chunk-size",
            "25",
            "--order",
            "completion",
        ])
        .unwrap();

        match cli.command {
            Commands::Phones { run } => {
                assert_eq!(run.input, PathBuf::from("requests.csv"));
                assert_eq!(run.output, PathBuf::from("validation_results.json"));
                assert_eq!(run.workers, Some(4));
                assert_eq!(run.chunk_size, Some(25));
                assert_eq!(run.order, Some(ResultOrder::Completion));
                assert!(!run.sequential);
            }
            _ => panic!("expected phones command"),
        }
    }

    #[test]
    fn test_worker_and_chunk_ranges_are_enforced() {
        assert!(Cli::try_parse_from(["request_validator", "phones", "in.csv", "-w", "17"]).is_err());
        assert!(Cli::try_parse_from(["request_validator", "phones", "in.csv", "-w", "0"]).is_err());
        assert!(
            Cli::try_parse_from(["request_validator", "phones", "in.csv", "--chunk-size", "5"])
                .is_err()
        );
    }

    #[test]
    fn test_parse_duplicates_command() {
        let cli = Cli::try_parse_from([
            "request_validator",
            "duplicates",
            "requests.csv",
            "--history",
            "sent.csv",
            "--threshold",
            "0.9",
        ])
        .unwrap();

        match cli.command {
            Commands::Duplicates {
                history, threshold, ..
            } => {
                assert_eq!(history, PathBuf::from("sent.csv"));
                assert_eq!(threshold, 0.9);
            }
            _ => panic!("expected duplicates command"),
        }
    }

    #[test]
    fn test_parse_addresses_command_with_explicit_key() {
        let cli = Cli::try_parse_from([
            "request_validator",
            "addresses",
            "requests.csv",
            "--api-key",
            "secret",
        ])
        .unwrap();

        match cli.command {
            Commands::Addresses { api_key, .. } => assert_eq!(api_key, "secret"),
            _ => panic!("expected addresses command"),
        }
    }

    #[test]
    fn test_parse_notify_command() {
        let cli = Cli::try_parse_from([
            "request_validator",
            "notify",
            "requests.xlsx",
            "--channel",
            "both",
            "--message",
            "Your book has shipped",
            "--account-sid",
            "AC123",
            "--auth-token",
            "secret",
            "--from",
            "+15005550006",
        ])
        .unwrap();

        match cli.command {
            Commands::Notify {
                run,
                channel,
                message,
                account_sid,
                from_number,
                ..
            } => {
                assert_eq!(run.input, PathBuf::from("requests.xlsx"));
                assert_eq!(Delivery::from(channel), Delivery::Both);
                assert_eq!(message, "Your book has shipped");
                assert_eq!(account_sid, "AC123");
                assert_eq!(from_number, "+15005550006");
            }
            _ => panic!("expected notify command"),
        }
    }

    #[test]
    fn test_result_order_conversion() {
        assert_eq!(OrderMode::from(ResultOrder::Submission), OrderMode::Submission);
        assert_eq!(OrderMode::from(ResultOrder::Completion), OrderMode::Completion);
    }
}
