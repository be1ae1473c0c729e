mod chat;
mod commands;
mod config;
mod telegram;

use std::process::ExitCode;

use futures_lite::StreamExt;
use is_terminal::IsTerminal;
use macro_rules_attribute::apply;
use smol_macros::main;

use tagger_index::{JsonFile, Store};

use crate::chat::Chat;
use crate::commands::Dispatcher;
use crate::config::Config;

#[apply(main!)]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,isahc=error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = ?err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    let storage = match config.storage_path() {
        Ok(path) => JsonFile::new(path),
        Err(err) => {
            tracing::error!(error = ?err, "no storage location");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(path = %storage.path().display(), "using storage");

    let dispatcher = Dispatcher::new(
        config.strings.clone(),
        config.folding(),
        config.bot_name.clone(),
    );

    if let Some(telegram) = &config.telegram {
        let chat = match chat::telegram(&telegram.bot_token, telegram.chat_id) {
            Ok(chat) => chat,
            Err(e) => {
                tracing::error!("failed to create Telegram client: {e}");
                return ExitCode::FAILURE;
            }
        };
        tracing::info!(chat_id = ?telegram.chat_id, "using Telegram chat");
        run(&chat, &dispatcher, &storage).await;
    } else {
        let user = config.terminal_user();
        tracing::info!(user = %user, "using terminal chat");
        if std::io::stdin().is_terminal() {
            println!("{}\n", dispatcher.usage());
        }
        run(&chat::terminal(user), &dispatcher, &storage).await;
    }

    ExitCode::SUCCESS
}

/// Answer messages from `chat` one at a time until it disconnects.
async fn run<C: Chat, S: Store + ?Sized>(chat: &C, dispatcher: &Dispatcher, storage: &S) {
    let mut messages = chat.messages();
    while let Some(message) = messages.next().await {
        tracing::debug!(sender = %message.sender, body = %message.body, "message received");
        if let Some(reply) = dispatcher.handle(storage, &message.sender, &message.body) {
            chat.reply(&message, &reply).await;
        }
    }
    tracing::info!("chat closed");
}
