//! Create-or-update of a client, keyed on the exact IP address.

use bigdecimal::{BigDecimal, Zero};

use crate::errors::CommandError;
use crate::field_classifier::{effective_billing_day, effective_price};
use crate::models::{ClientDraft, ClientRecord, ClientUpdate, NewClient};
use crate::registry::ClientRegistry;
use crate::resolver::find_by_ip;

pub const DEFAULT_PLAN: &str = "Basico 7Mbps";
pub const DEFAULT_SPEED: &str = "7M";

/// One field whose stored value differs from what was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub before: String,
    pub after: String,
}

/// Result of a successful upsert.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Created {
        client: NewClient,
    },
    Updated {
        previous: ClientRecord,
        update: ClientUpdate,
        /// Empty when nothing changed.
        changes: Vec<FieldChange>,
    },
}

/// Create the client if its IP is unknown, otherwise update the existing record.
///
/// The roster is fetched once for the lookup; an empty roster just means the
/// client is new. Registry rejections come back with their message untouched.
pub async fn upsert_client(
    registry: &dyn ClientRegistry,
    draft: &ClientDraft,
) -> Result<UpsertOutcome, CommandError> {
    let roster = registry.list_clients().await?;

    match find_by_ip(&roster, &draft.ip_address) {
        Some(existing) => {
            let update = build_update(draft);
            tracing::info!(
                "Client {} already registered as {}, updating",
                draft.ip_address,
                existing.id
            );
            registry.update_client(&existing.id, &update).await?;

            let changes = diff(existing, &update);
            Ok(UpsertOutcome::Updated {
                previous: existing.clone(),
                update,
                changes,
            })
        }
        None => {
            let client = build_new_client(draft);
            tracing::info!("Client {} not registered, creating", draft.ip_address);
            registry.create_client(&client).await?;
            Ok(UpsertOutcome::Created { client })
        }
    }
}

/// Create payload with the documented defaults for anything not classified.
pub fn build_new_client(draft: &ClientDraft) -> NewClient {
    let fields = &draft.fields;
    NewClient {
        nombre: draft.nombre.clone(),
        ip_address: draft.ip_address.clone(),
        plan: plan_or_default(fields.plan.as_deref()),
        velocidad_download: speed_or_default(fields.velocidad_download.as_deref()),
        velocidad_upload: speed_or_default(fields.velocidad_upload.as_deref()),
        telefono: non_empty(fields.telefono.as_deref()),
        direccion: non_empty(fields.direccion.as_deref()),
        dia_corte: effective_billing_day(fields),
        precio_mensual: effective_price(fields),
    }
}

/// Update payload.
///
/// Name, plan, both speeds and billing day are always sent (defaults included);
/// phone and address only when classified; price only when above zero.
pub fn build_update(draft: &ClientDraft) -> ClientUpdate {
    let fields = &draft.fields;
    ClientUpdate {
        nombre: draft.nombre.clone(),
        plan: plan_or_default(fields.plan.as_deref()),
        velocidad_download: speed_or_default(fields.velocidad_download.as_deref()),
        velocidad_upload: speed_or_default(fields.velocidad_upload.as_deref()),
        dia_corte: effective_billing_day(fields),
        telefono: non_empty(fields.telefono.as_deref()),
        direccion: non_empty(fields.direccion.as_deref()),
        precio_mensual: fields.precio.clone().filter(|p| *p > BigDecimal::zero()),
    }
}

/// Fields of `update` whose value differs from `previous`.
pub fn diff(previous: &ClientRecord, update: &ClientUpdate) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    let mut text = |field: &'static str, before: &str, after: &str| {
        if before != after {
            changes.push(FieldChange {
                field,
                before: before.to_string(),
                after: after.to_string(),
            });
        }
    };

    text("nombre", &previous.nombre, &update.nombre);
    text("plan", &previous.plan, &update.plan);
    text(
        "velocidad_download",
        &previous.velocidad_download,
        &update.velocidad_download,
    );
    text(
        "velocidad_upload",
        &previous.velocidad_upload,
        &update.velocidad_upload,
    );
    if let Some(telefono) = &update.telefono {
        text(
            "telefono",
            previous.telefono.as_deref().unwrap_or(""),
            telefono,
        );
    }
    if let Some(direccion) = &update.direccion {
        text(
            "direccion",
            previous.direccion.as_deref().unwrap_or(""),
            direccion,
        );
    }

    if previous.dia_corte != i64::from(update.dia_corte) {
        changes.push(FieldChange {
            field: "dia_corte",
            before: previous.dia_corte.to_string(),
            after: update.dia_corte.to_string(),
        });
    }
    if let Some(precio) = &update.precio_mensual {
        if previous.precio_mensual != *precio {
            changes.push(FieldChange {
                field: "precio_mensual",
                before: previous.precio_mensual.with_scale(2).to_string(),
                after: precio.with_scale(2).to_string(),
            });
        }
    }

    changes
}

fn plan_or_default(plan: Option<&str>) -> String {
    non_empty(plan).unwrap_or_else(|| DEFAULT_PLAN.to_string())
}

fn speed_or_default(speed: Option<&str>) -> String {
    non_empty(speed).unwrap_or_else(|| DEFAULT_SPEED.to_string())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
