//! Payment registration for a resolved client.

use crate::errors::CommandError;
use crate::models::{ClientRecord, EstadoServicio, PaymentIntent, PaymentRequest};
use crate::registry::{ClientRegistry, PaymentReceipt};

/// What the agent is told after a payment went through.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentAck {
    pub client: ClientRecord,
    pub intent: PaymentIntent,
    /// The registry turned the client's service back on as part of the payment.
    pub reactivated: bool,
}

/// Submit `intent` for `client`, tagged with `provenance`.
///
/// Service state is never touched here; the registry reactivates suspended or cut
/// clients on its own and this only reports it.
pub async fn register_payment(
    registry: &dyn ClientRegistry,
    client: &ClientRecord,
    intent: &PaymentIntent,
    provenance: &str,
) -> Result<PaymentAck, CommandError> {
    let request = PaymentRequest {
        cliente_id: client.id.clone(),
        monto: intent.monto.clone(),
        metodo_pago: intent.metodo_pago,
        referencia: intent.referencia.clone(),
        registrado_por: provenance.to_string(),
    };

    let receipt = registry.record_payment(&request).await?;
    let reactivated = was_reactivated(client.estado, &receipt);

    if reactivated {
        tracing::info!("Client {} reactivated by payment", client.id);
    }

    Ok(PaymentAck {
        client: client.clone(),
        intent: intent.clone(),
        reactivated,
    })
}

/// An explicit flag wins; then a reported post-payment state; otherwise the
/// registry's automatic reactivation of interrupted clients is assumed.
pub fn was_reactivated(before: EstadoServicio, receipt: &PaymentReceipt) -> bool {
    if let Some(flag) = receipt.reactivated {
        return flag;
    }
    match receipt.estado {
        Some(after) => before.is_interrupted() && after == EstadoServicio::Activo,
        None => before.is_interrupted(),
    }
}
