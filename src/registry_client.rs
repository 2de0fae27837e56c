use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::models::{
    ClientId, ClientRecord, ClientUpdate, EstadoServicio, NewClient, PaymentRecord,
    PaymentRequest,
};
use crate::registry::{ClientRegistry, Envelope, PaymentReceipt, RegistryError};

/// HTTP client for the client registry (the web dashboard's JSON API).
#[derive(Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Records are kept as raw JSON so one malformed entry cannot sink the roster.
#[derive(Debug, Deserialize)]
struct RosterBody {
    #[serde(default)]
    clientes: Option<Vec<serde_json::Value>>,
}

/// Create and update only report success; anything they echo back is ignored.
#[derive(Debug, Deserialize)]
struct AckBody {}

#[derive(Debug, Deserialize)]
struct PaymentBody {
    #[serde(default, alias = "reactivated")]
    reactivado: Option<bool>,
    #[serde(default)]
    cliente: Option<ClientStateBody>,
    #[serde(default)]
    estado: Option<EstadoServicio>,
}

#[derive(Debug, Deserialize)]
struct ClientStateBody {
    #[serde(default)]
    estado: Option<EstadoServicio>,
}

#[derive(Debug, Deserialize)]
struct PaymentsBody {
    #[serde(default)]
    pagos: Option<Vec<PaymentRecord>>,
}

impl RegistryClient {
    /// Creates a new `RegistryClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the registry, without trailing `/api`.
    /// * `api_key` - Optional key sent as `X-API-Key`.
    /// * `timeout` - Per-request timeout.
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                RegistryError::Transport(format!("Failed to create registry client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        }
    }

    /// Sends the request and decodes the `{success, error}` envelope.
    ///
    /// Non-2xx responses are still decoded: the registry puts its user-facing
    /// message in `error` on 400/404/500 as well.
    async fn exchange<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<(T, Option<String>), RegistryError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RegistryError::Transport(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            RegistryError::Transport(format!("Failed to read {} response: {}", what, e))
        })?;

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            tracing::warn!(
                "Registry returned undecodable {} response ({}): {}",
                what,
                status,
                text.chars().take(200).collect::<String>()
            );
            RegistryError::Protocol(format!(
                "Registry returned {} with unexpected body: {}",
                status, e
            ))
        })?;

        let result = envelope.into_result();
        if let Err(ref e) = result {
            tracing::warn!("Registry {} failed with {}: {}", what, status, e);
        }
        result
    }
}

#[async_trait]
impl ClientRegistry for RegistryClient {
    async fn list_clients(&self) -> Result<Vec<ClientRecord>, RegistryError> {
        let url = self.url("/api/clientes");
        tracing::debug!("Fetching roster from registry: {}", url);

        let (body, _): (RosterBody, _) = self.exchange(self.client.get(&url), "roster").await?;
        let raw = body.clientes.ok_or_else(|| {
            RegistryError::Protocol("Roster response missing 'clientes'".to_string())
        })?;

        let clientes = decode_roster(raw);
        tracing::info!("Fetched {} client(s) from registry", clientes.len());
        Ok(clientes)
    }

    async fn create_client(&self, client: &NewClient) -> Result<(), RegistryError> {
        let url = self.url("/api/cliente");
        tracing::info!(
            "Creating client in registry: {} ({})",
            client.nombre,
            client.ip_address
        );

        let _: (AckBody, _) = self
            .exchange(self.client.post(&url).json(client), "create client")
            .await?;

        tracing::info!("✓ Client created: {}", client.ip_address);
        Ok(())
    }

    async fn update_client(
        &self,
        id: &ClientId,
        update: &ClientUpdate,
    ) -> Result<(), RegistryError> {
        let url = self.url(&format!("/api/cliente/{}", id));
        tracing::info!("Updating client {} in registry", id);

        let _: (AckBody, _) = self
            .exchange(self.client.put(&url).json(update), "update client")
            .await?;

        tracing::info!("✓ Client {} updated", id);
        Ok(())
    }

    async fn record_payment(
        &self,
        payment: &PaymentRequest,
    ) -> Result<PaymentReceipt, RegistryError> {
        let url = self.url("/api/pago");
        tracing::info!(
            "Recording payment of {} for client {}",
            payment.monto,
            payment.cliente_id
        );

        let (body, _): (PaymentBody, _) = self
            .exchange(self.client.post(&url).json(payment), "payment")
            .await?;

        tracing::info!("✓ Payment recorded for client {}", payment.cliente_id);
        Ok(PaymentReceipt {
            reactivated: body.reactivado,
            estado: body.cliente.and_then(|c| c.estado).or(body.estado),
        })
    }

    async fn list_payments(&self, id: &ClientId) -> Result<Vec<PaymentRecord>, RegistryError> {
        let url = self.url(&format!("/api/pagos/cliente/{}", id));
        tracing::debug!("Fetching payment history for client {}", id);

        let (body, _): (PaymentsBody, _) = self
            .exchange(self.client.get(&url), "payment history")
            .await?;

        Ok(body.pagos.unwrap_or_default())
    }
}

/// Decode each roster entry on its own, skipping the ones that do not fit.
fn decode_roster(raw: Vec<serde_json::Value>) -> Vec<ClientRecord> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<ClientRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping unreadable roster entry: {}", e);
                None
            }
        })
        .collect()
}
