//! In-memory client registry shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;

use isp_chat_intake::models::{
    ClientId, ClientRecord, ClientUpdate, EstadoServicio, NewClient, PaymentRecord,
    PaymentRequest,
};
use isp_chat_intake::registry::{ClientRegistry, PaymentReceipt, RegistryError};

#[derive(Default)]
pub struct InMemoryRegistry {
    pub clients: Mutex<Vec<ClientRecord>>,
    pub created: Mutex<Vec<NewClient>>,
    pub updates: Mutex<Vec<(ClientId, ClientUpdate)>>,
    pub payments: Mutex<Vec<PaymentRequest>>,
    pub history: Mutex<Vec<(ClientId, PaymentRecord)>>,
    /// Returned by every roster fetch when set.
    pub roster_error: Option<RegistryError>,
    /// Returned by create/update/payment when set.
    pub reject_with: Option<String>,
    pub history_unavailable: bool,
    pub panic_on_roster: bool,
}

impl InMemoryRegistry {
    pub fn with_clients(clients: Vec<ClientRecord>) -> Self {
        Self {
            clients: Mutex::new(clients),
            ..Default::default()
        }
    }

    pub fn payments(&self) -> Vec<PaymentRequest> {
        self.payments.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<NewClient> {
        self.created.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(ClientId, ClientUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn add_history(&self, id: &str, record: PaymentRecord) {
        self.history
            .lock()
            .unwrap()
            .push((ClientId::new(id), record));
    }

    fn check_rejection(&self) -> Result<(), RegistryError> {
        match &self.reject_with {
            Some(msg) => Err(RegistryError::Rejected(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClientRegistry for InMemoryRegistry {
    async fn list_clients(&self) -> Result<Vec<ClientRecord>, RegistryError> {
        if self.panic_on_roster {
            panic!("roster exploded");
        }
        if let Some(err) = &self.roster_error {
            return Err(err.clone());
        }
        Ok(self.clients.lock().unwrap().clone())
    }

    async fn create_client(&self, client: &NewClient) -> Result<(), RegistryError> {
        self.check_rejection()?;
        self.created.lock().unwrap().push(client.clone());
        Ok(())
    }

    async fn update_client(
        &self,
        id: &ClientId,
        update: &ClientUpdate,
    ) -> Result<(), RegistryError> {
        self.check_rejection()?;
        self.updates
            .lock()
            .unwrap()
            .push((id.clone(), update.clone()));
        Ok(())
    }

    async fn record_payment(
        &self,
        payment: &PaymentRequest,
    ) -> Result<PaymentReceipt, RegistryError> {
        self.check_rejection()?;
        self.payments.lock().unwrap().push(payment.clone());

        let mut clients = self.clients.lock().unwrap();
        let estado = clients
            .iter_mut()
            .find(|c| c.id == payment.cliente_id)
            .map(|client| {
                if client.estado.is_interrupted() {
                    client.estado = EstadoServicio::Activo;
                }
                client.estado
            });

        Ok(PaymentReceipt {
            reactivated: None,
            estado,
        })
    }

    async fn list_payments(&self, id: &ClientId) -> Result<Vec<PaymentRecord>, RegistryError> {
        if self.history_unavailable {
            return Err(RegistryError::Transport("history timed out".to_string()));
        }
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, _)| owner == id)
            .map(|(_, record)| record.clone())
            .collect())
    }
}

pub fn client(id: i64, nombre: &str, ip: &str, estado: &str) -> ClientRecord {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "nombre": nombre,
        "ip_address": ip,
        "plan": "Basico 7Mbps",
        "velocidad_download": "7M",
        "velocidad_upload": "7M",
        "dia_corte": 1,
        "precio_mensual": 150.0,
        "estado": estado,
    }))
    .unwrap()
}

pub fn roster() -> Vec<ClientRecord> {
    vec![
        client(1, "Juan Perez", "172.16.1.18", "activo"),
        client(2, "Juan Perez Lopez", "172.16.1.19", "suspendido"),
        client(3, "María García", "172.16.1.20", "cortado"),
    ]
}
