//! The client registry as seen by the engine.
//!
//! The registry owns persistence and service state. The engine only lists
//! clients, creates/updates them and records payments through this trait; the
//! HTTP implementation lives in [`crate::registry_client`].

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

use crate::models::{
    ClientId, ClientRecord, ClientUpdate, EstadoServicio, NewClient, PaymentRecord,
    PaymentRequest,
};

/// How a registry call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No usable HTTP exchange happened (connect, timeout, broken body).
    Transport(String),
    /// The registry answered, but not in a shape with a success indicator.
    Protocol(String),
    /// The registry answered `success: false`; the message is meant for the user.
    Rejected(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Transport(msg) => write!(f, "Registry transport error: {}", msg),
            RegistryError::Protocol(msg) => write!(f, "Registry protocol error: {}", msg),
            RegistryError::Rejected(msg) => write!(f, "Registry rejected request: {}", msg),
        }
    }
}

impl std::error::Error for RegistryError {}

/// What the registry reports back about a recorded payment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentReceipt {
    /// Explicit reactivation flag, if the registry reports one.
    pub reactivated: Option<bool>,
    /// Service state after the payment, if the registry reports it.
    pub estado: Option<EstadoServicio>,
}

/// Common envelope of every registry response: `{"success": bool, "error": "..."}`
/// plus endpoint-specific fields. Decoded once here and turned into typed results.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    /// Success → body; `success: false` → `Rejected`; anything else → `Protocol`.
    pub fn into_result(self) -> Result<(T, Option<String>), RegistryError> {
        match self.success {
            Some(true) => Ok((self.body, self.message)),
            Some(false) => Err(RegistryError::Rejected(
                self.error
                    .unwrap_or_else(|| "El registro rechazó la operación".to_string()),
            )),
            None => Err(RegistryError::Protocol(
                "response has no success indicator".to_string(),
            )),
        }
    }
}

/// Operations the engine needs from the registry.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// The full roster, fresh on every call.
    async fn list_clients(&self) -> Result<Vec<ClientRecord>, RegistryError>;

    async fn create_client(&self, client: &NewClient) -> Result<(), RegistryError>;

    async fn update_client(
        &self,
        id: &ClientId,
        update: &ClientUpdate,
    ) -> Result<(), RegistryError>;

    async fn record_payment(
        &self,
        payment: &PaymentRequest,
    ) -> Result<PaymentReceipt, RegistryError>;

    /// Payment history of one client, newest first.
    async fn list_payments(&self, id: &ClientId) -> Result<Vec<PaymentRecord>, RegistryError>;
}
