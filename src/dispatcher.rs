//! Routing of one inbound chat message to its command and back to one reply.

use std::sync::Arc;

use crate::config::BotConfig;
use crate::errors::CommandError;
use crate::field_classifier::parse_client_command;
use crate::models::{ClientRecord, Resolution, ResolutionFailure};
use crate::payment_parser::parse_payment_args;
use crate::payments::register_payment;
use crate::registry::ClientRegistry;
use crate::replies::{self, Verb};
use crate::resolver::resolve_client;
use crate::upsert::upsert_client;

/// Turns chat messages into registry operations.
///
/// Holds only immutable configuration and the registry handle, so one instance
/// is shared by every in-flight message.
pub struct Dispatcher {
    config: BotConfig,
    registry: Arc<dyn ClientRegistry>,
}

impl Dispatcher {
    pub fn new(config: BotConfig, registry: Arc<dyn ClientRegistry>) -> Self {
        Self { config, registry }
    }

    /// The reply for `text` received on `channel_id`, or `None` when the message
    /// is not meant for the bot (other channel, missing prefix).
    pub async fn handle(&self, text: &str, channel_id: &str) -> Option<String> {
        if let Some(scope) = &self.config.channel_scope {
            if scope != channel_id {
                tracing::debug!("Ignoring message from out-of-scope channel {}", channel_id);
                return None;
            }
        }

        let body = text.trim_start().strip_prefix(self.config.prefix.as_str())?;
        let body = body.trim();

        let (verb, rest) = match body.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (body, ""),
        };
        let verb = verb.to_lowercase();

        tracing::info!("Command '{}' from channel {}", verb, channel_id);

        let reply = match verb.as_str() {
            "pago" => self.payment(rest).await,
            "cliente" => self.client(rest).await,
            "consulta" => self.query(rest).await,
            "ayuda" | "help" => replies::help(&self.config.prefix, &self.config.payment_methods),
            other => {
                tracing::debug!("Unrecognized command '{}'", other);
                replies::unknown_command(&self.config.prefix)
            }
        };

        Some(reply)
    }

    /// Same as [`Dispatcher::handle`], run on its own task so a panic in one
    /// command is answered with the internal-error reply instead of taking the
    /// caller down.
    pub async fn handle_isolated(
        self: Arc<Self>,
        text: String,
        channel_id: String,
    ) -> Option<String> {
        let prefixed = text.trim_start().starts_with(self.config.prefix.as_str());

        match tokio::spawn(async move { self.handle(&text, &channel_id).await }).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Command task failed: {}", e);
                prefixed.then(|| replies::INTERNAL_ERROR.to_string())
            }
        }
    }

    async fn payment(&self, args: &str) -> String {
        let result = self.try_payment(args).await;
        self.render(result, Verb::Pago)
    }

    async fn try_payment(&self, args: &str) -> Result<String, CommandError> {
        let tokens: Vec<&str> = args.split_whitespace().collect();
        let intent = parse_payment_args(&tokens, &self.config.payment_methods)?;

        let client = self
            .resolve_one(&intent.identificador, self.config.payment_match_cap)
            .await?;

        let ack = register_payment(
            self.registry.as_ref(),
            &client,
            &intent,
            &self.config.provenance,
        )
        .await?;

        Ok(replies::payment_registered(&ack))
    }

    async fn client(&self, args: &str) -> String {
        let result = self.try_client(args).await;
        self.render(result, Verb::Cliente)
    }

    async fn try_client(&self, args: &str) -> Result<String, CommandError> {
        if args.is_empty() {
            return Err(CommandError::MissingArguments);
        }
        let draft = parse_client_command(args)?;
        let outcome = upsert_client(self.registry.as_ref(), &draft).await?;
        Ok(replies::upsert_summary(&outcome))
    }

    async fn query(&self, args: &str) -> String {
        let result = self.try_query(args).await;
        self.render(result, Verb::Consulta)
    }

    async fn try_query(&self, args: &str) -> Result<String, CommandError> {
        if args.is_empty() {
            return Err(CommandError::MissingArguments);
        }

        let client = match resolve_client(self.registry.as_ref(), args, self.config.query_match_cap)
            .await
        {
            Resolution::Multiple { candidates, total } => {
                let mut message = format!("🔍 {} clientes coinciden con '{}':\n", total, args);
                message.push_str(&replies::candidate_list(&candidates, total));
                return Ok(message);
            }
            other => single(other, args)?,
        };

        let history = match self.registry.list_payments(&client.id).await {
            Ok(history) => Some(history),
            Err(e) => {
                tracing::warn!("Payment history for {} unavailable: {}", client.id, e);
                None
            }
        };

        Ok(replies::client_card(&client, history.as_deref()))
    }

    async fn resolve_one(
        &self,
        identifier: &str,
        cap: usize,
    ) -> Result<ClientRecord, CommandError> {
        let resolution = resolve_client(self.registry.as_ref(), identifier, cap).await;
        single(resolution, identifier)
    }

    fn render(&self, result: Result<String, CommandError>, verb: Verb) -> String {
        match result {
            Ok(reply) => reply,
            Err(err) => {
                match &err {
                    CommandError::Transport(_) | CommandError::Protocol(_) => {
                        tracing::error!("{:?} command failed: {}", verb, err)
                    }
                    _ => tracing::warn!("{:?} command failed: {}", verb, err),
                }
                replies::error(&err, &self.config.prefix, verb)
            }
        }
    }
}

/// Exactly one record, or the error that explains why not.
fn single(resolution: Resolution, identifier: &str) -> Result<ClientRecord, CommandError> {
    match resolution {
        Resolution::Single(record) => Ok(record),
        Resolution::Multiple { candidates, total } => {
            Err(CommandError::Ambiguous { candidates, total })
        }
        Resolution::NotFound => Err(CommandError::NotFound(identifier.to_string())),
        Resolution::Failure(ResolutionFailure::Transport(msg)) => Err(CommandError::Transport(msg)),
        Resolution::Failure(ResolutionFailure::EmptyRegistry) => Err(CommandError::EmptyRegistry),
        Resolution::Failure(ResolutionFailure::Protocol(msg)) => Err(CommandError::Protocol(msg)),
    }
}
