//! Command Bot Example
//!
//! Sends every robot message kind from the command line and serves a small
//! set of outgoing-robot commands.
//!
//! Robot settings come from `dingbot.toml` / `dingbot.yaml` in the current
//! directory or from `DINGBOT_*` variables:
//!
//! ```bash
//! export DINGBOT_ROBOT__TOKENS='[xxxx]'
//! export DINGBOT_ROBOT__SECRET=SECxxxx
//! cargo run --package command-bot -- send text "deploy finished" --at-all
//! cargo run --package command-bot -- send card --title Release --text "v1.4" \
//!     --button "Notes=https://example.com/notes" --button "Diff=https://example.com/diff"
//!
//! export DINGBOT_OUTGOING__ENABLED=true
//! cargo run --package command-bot -- serve
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use dingbot::prelude::*;
use dingbot::runtime::RuntimeBuilder;
use time::OffsetDateTime;
use time::macros::format_description;

#[derive(Parser)]
#[command(name = "command-bot", version, about = "DingTalk group robot demo")]
struct Cli {
    /// Configuration file (default: search the current directory).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `production`.
    #[arg(short, long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message through the configured robot.
    Send {
        #[command(subcommand)]
        message: SendCommand,
    },
    /// Serve outgoing-robot commands until Ctrl+C.
    Serve,
}

#[derive(Args)]
struct Mentions {
    /// Phone numbers to @-mention.
    #[arg(long = "at-mobile")]
    at_mobiles: Vec<String>,

    /// @-mention everyone.
    #[arg(long)]
    at_all: bool,
}

impl Mentions {
    fn into_options(self) -> Vec<MessageOption> {
        let mut options = Vec::new();
        if !self.at_mobiles.is_empty() {
            options.push(with_at_mobiles(self.at_mobiles));
        }
        if self.at_all {
            options.push(with_at_all());
        }
        options
    }
}

#[derive(Subcommand)]
enum SendCommand {
    /// Plain text.
    Text {
        content: String,
        #[command(flatten)]
        mentions: Mentions,
    },
    /// Link card.
    Link {
        #[arg(long)]
        title: String,
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "")]
        pic_url: String,
        #[arg(long)]
        message_url: String,
    },
    /// Markdown body.
    Markdown {
        #[arg(long)]
        title: String,
        text: String,
        #[command(flatten)]
        mentions: Mentions,
    },
    /// Styled markdown lines given as `text=style` (styles: h1..h6, red, blue, green, gold, n).
    Report {
        #[arg(long)]
        title: String,
        #[arg(value_parser = parse_pair, required = true)]
        lines: Vec<(String, String)>,
        #[command(flatten)]
        mentions: Mentions,
    },
    /// Tappable reply links given as `label=reply`.
    Menu {
        #[arg(long)]
        title: String,
        #[arg(value_parser = parse_pair, required = true)]
        items: Vec<(String, String)>,
    },
    /// Action card with one button or a list of `title=url` buttons.
    Card {
        #[arg(long)]
        title: String,
        #[arg(long)]
        text: String,
        #[arg(long, requires = "single_url", conflicts_with = "buttons")]
        single_title: Option<String>,
        #[arg(long, requires = "single_title")]
        single_url: Option<String>,
        #[arg(long = "button", value_parser = parse_pair)]
        buttons: Vec<(String, String)>,
        /// Stack buttons vertically.
        #[arg(long)]
        vertical: bool,
    },
    /// Feed card from `title|url` or `title|url|picture` entries.
    Feed {
        #[arg(value_parser = parse_feed_link, required = true)]
        links: Vec<FeedCardLink>,
    },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))
}

fn parse_feed_link(s: &str) -> Result<FeedCardLink, String> {
    let mut parts = s.splitn(3, '|');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(title), Some(url), pic) => Ok(FeedCardLink::new(title, url, pic.unwrap_or(""))),
        _ => Err(format!("expected TITLE|URL[|PICTURE], got {s:?}")),
    }
}

// ============================================================================
// Outgoing commands
// ============================================================================

fn text_reply(content: impl Into<String>) -> Vec<u8> {
    Message::text(content).to_bytes().unwrap_or_default()
}

fn register_commands() {
    register_command("ping", |_| text_reply("pong"), 0, false);

    register_command("echo", |args| text_reply(args[0].clone()), 1, true);

    register_command(
        "time",
        |_| {
            let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
            let now = OffsetDateTime::now_utc()
                .format(format)
                .unwrap_or_else(|_| "unknown".to_string());
            text_reply(now)
        },
        0,
        false,
    );

    register_command(
        "help",
        |_| {
            let lines = DingMap::new()
                .with("Commands", MarkdownStyle::H3)
                .with("ping: $$ pong $$", MarkdownStyle::Blue)
                .with("echo <word>: repeat a word (mention required)", MarkdownStyle::Normal)
                .with("time: current UTC time", MarkdownStyle::Normal)
                .render_lines();
            Message::markdown_lines("help", &lines, [])
                .and_then(|m| m.to_bytes())
                .unwrap_or_default()
        },
        0,
        false,
    );
}

// ============================================================================
// Main Entry Point
// ============================================================================

async fn send(bot: &DingTalk, message: SendCommand) -> Result<()> {
    match message {
        SendCommand::Text { content, mentions } => {
            bot.send_text_message(content, mentions.into_options())
                .await?
        }
        SendCommand::Link {
            title,
            text,
            pic_url,
            message_url,
        } => {
            bot.send_link_message(title, text, pic_url, message_url)
                .await?
        }
        SendCommand::Markdown {
            title,
            text,
            mentions,
        } => {
            bot.send_markdown_message(title, text, mentions.into_options())
                .await?
        }
        SendCommand::Report {
            title,
            lines,
            mentions,
        } => {
            let map: DingMap = lines.into_iter().collect();
            bot.send_markdown_message_by_slice(title, &map.render_lines(), mentions.into_options())
                .await?
        }
        SendCommand::Menu { title, items } => {
            let map: DingMap = items.into_iter().collect();
            bot.send_dtmd_message(title, &map, []).await?
        }
        SendCommand::Card {
            title,
            text,
            single_title,
            single_url,
            buttons,
            vertical,
        } => {
            let mut options = Vec::new();
            match (single_title, single_url) {
                (Some(t), Some(u)) => {
                    options.push(with_card_single_title(t));
                    options.push(with_card_single_url(u));
                }
                _ if !buttons.is_empty() => {
                    let buttons = buttons
                        .into_iter()
                        .map(|(title, url)| ActionButton::new(title, url))
                        .collect();
                    options.push(with_card_btns(buttons));
                }
                _ => bail!("card needs --single-title/--single-url or at least one --button"),
            }
            if vertical {
                options.push(with_card_btn_vertical());
            }
            bot.send_action_card_message(title, text, options).await?
        }
        SendCommand::Feed { links } => bot.send_feed_card_message(links).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = RuntimeBuilder::new();
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile.clone());
    }
    let runtime = builder.build().context("failed to start runtime")?;

    match cli.command {
        Command::Send { message } => {
            let bot = runtime.client()?;
            send(&bot, message).await?;
            info!("Message sent");
        }
        Command::Serve => {
            if !runtime.config().outgoing.enabled {
                bail!("outgoing server is disabled; set outgoing.enabled = true");
            }
            register_commands();
            runtime.run().await?;
        }
    }

    Ok(())
}
