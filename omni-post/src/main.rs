//! omni-post - Publish one post directly to a platform
//!
//! Bypasses approvals and the scheduler: the post goes straight to the
//! platform adapter and the receipt is printed.

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use libomnicast::credentials::{ConfigCredentials, CredentialProvider};
use libomnicast::{AdapterInfo, Config, NormalizedPost, OmnicastError, OmnicastService, Result};

#[derive(Parser, Debug)]
#[command(name = "omni-post")]
#[command(version)]
#[command(about = "Publish one post directly to a platform")]
#[command(long_about = "\
omni-post - Publish one post directly to a platform

DESCRIPTION:
    omni-post sends a single post to one platform right away, without
    approvals or scheduling. Use omni-send for queued posts.

COMMANDS:
    adapters    Show every platform and what it supports
    publish     Publish a post to one platform

USAGE EXAMPLES:
    # List platforms as JSON
    omni-post adapters --format json

    # Publish using credentials from the config file
    omni-post publish telegram \"Doors open at 9\"

    # Read text from stdin and pass credentials on the command line
    echo \"Doors open at 9\" | omni-post publish mastodon - \\
        --token access_token=$MASTODON_TOKEN \\
        --account instance_url=mastodon.social

CONFIGURATION:
    Configuration file: ~/.config/omnicast/config.toml

    [credentials.telegram]
    tokens = { bot_token = \"${TELEGRAM_BOT_TOKEN}\" }
    account = { chat_id = \"-100123\" }

    Override with environment variables:
        OMNICAST_CONFIG      - Path to config file
        OMNICAST_LOG_FORMAT  - text, json or pretty
        OMNICAST_LOG_LEVEL   - Log level (default: info)

EXIT CODES:
    0 - Success
    1 - Publishing failed (platform error, unsupported feature)
    2 - Missing credential or required field
    3 - Invalid input (unknown platform, bad flag value)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (overrides OMNICAST_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show every platform and what it supports
    Adapters {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Publish a post to one platform
    Publish {
        /// Platform id (see `omni-post adapters`)
        platform: String,

        /// Post text; `-` or omitted reads stdin
        text: Option<String>,

        /// Image URL to attach
        #[arg(long, value_name = "URL")]
        media: Option<String>,

        /// Link to attach
        #[arg(long, value_name = "URL")]
        link: Option<String>,

        /// Alt text for the image
        #[arg(long)]
        alt: Option<String>,

        /// Hashtag to append (repeatable, without `#`)
        #[arg(long = "hashtag", value_name = "TAG")]
        hashtags: Vec<String>,

        /// Credential token, e.g. bot_token=123:abc (repeatable)
        #[arg(long = "token", value_name = "KEY=VALUE")]
        tokens: Vec<String>,

        /// Account identifier, e.g. chat_id=-100 (repeatable)
        #[arg(long = "account", value_name = "KEY=VALUE")]
        accounts: Vec<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

impl Commands {
    fn format(&self) -> &str {
        match self {
            Commands::Adapters { format } | Commands::Publish { format, .. } => format,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    libomnicast::logging::init_default(cli.verbose);

    let json_errors = cli.command.format() == "json";
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        if json_errors {
            if let Ok(body) = serde_json::to_string(&e.to_body()) {
                println!("{}", body);
            }
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load_or_default()?,
    };

    match cli.command {
        Commands::Adapters { format } => {
            let format = OutputFormat::parse(&format)?;
            let service = OmnicastService::from_config(config)?;
            cmd_adapters(&service.list_adapters(), format)
        }
        Commands::Publish {
            platform,
            text,
            media,
            link,
            alt,
            hashtags,
            tokens,
            accounts,
            format,
        } => {
            let format = OutputFormat::parse(&format)?;
            let platform = platform.trim().to_lowercase();

            let mut post = NormalizedPost::new(read_text(text)?);
            post.media_url = media;
            post.link_url = link;
            post.alt = alt;
            post.hashtags = hashtags;

            // Config first so flags win on conflicts
            post = ConfigCredentials::new(&config)
                .credentials_for(&platform)
                .apply(post);
            for pair in &tokens {
                let (key, value) = parse_pair("--token", pair)?;
                post = post.with_token(key, value);
            }
            for pair in &accounts {
                let (key, value) = parse_pair("--account", pair)?;
                post = post.with_account(key, value);
            }

            tracing::debug!(platform = %platform, "Publishing directly");
            let service = OmnicastService::from_config(config)?;
            let receipt = service.publish_now(&platform, &post).await?;

            match format {
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "platform": platform,
                        "receipt": receipt,
                    });
                    println!("{}", json);
                }
                OutputFormat::Text => println!("{}: {}", platform, receipt),
            }
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(format: &str) -> Result<Self> {
        match format {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(OmnicastError::Validation(format!(
                "Invalid format '{}'. Must be 'text' or 'json'",
                other
            ))),
        }
    }
}

fn cmd_adapters(adapters: &[AdapterInfo], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(adapters)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for info in adapters {
                let caps = &info.capabilities;
                println!(
                    "{:<16} post={:<3} media={:<3} analytics={:<3} {}",
                    info.platform,
                    yes_no(caps.post),
                    yes_no(caps.media),
                    yes_no(caps.analytics),
                    caps.note
                );
            }
        }
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn read_text(text: Option<String>) -> Result<String> {
    match text.as_deref() {
        Some(text) if text != "-" => Ok(text.to_string()),
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| OmnicastError::Validation(format!("Failed to read stdin: {}", e)))?;
            Ok(buffer.trim_end().to_string())
        }
    }
}

/// Split `KEY=VALUE`; the value may itself contain `=`
fn parse_pair<'a>(flag: &str, pair: &'a str) -> Result<(&'a str, &'a str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(OmnicastError::Validation(format!(
            "{} expects KEY=VALUE, got '{}'",
            flag, pair
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair_keeps_equals_in_value() {
        assert_eq!(
            parse_pair("--token", "webhook_url=https://x/y?a=b").unwrap(),
            ("webhook_url", "https://x/y?a=b")
        );
    }

    #[test]
    fn test_parse_pair_rejects_missing_key() {
        assert!(parse_pair("--token", "=value").is_err());
        assert!(parse_pair("--account", "novalue").is_err());
    }

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::parse("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("xml").unwrap_err().exit_code(), 3);
    }
}
