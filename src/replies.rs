//! Every piece of text the bot sends back to an agent.

use crate::errors::CommandError;
use crate::models::{format_quetzales, ClientRecord, MetodoPago, PaymentRecord};
use crate::payments::PaymentAck;
use crate::upsert::UpsertOutcome;

/// How many history entries the `consulta` card shows.
pub const RECENT_PAYMENTS: usize = 3;

pub const GENERIC_CONNECTIVITY: &str =
    "❌ No se pudo conectar con el sistema de clientes. Intenta de nuevo en unos minutos.";
pub const INTERNAL_ERROR: &str = "❌ Error interno, intenta de nuevo.";

/// Commands whose usage line can be shown on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Pago,
    Cliente,
    Consulta,
}

pub fn help(prefix: &str, methods: &[MetodoPago]) -> String {
    let methods = methods
        .iter()
        .map(MetodoPago::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut message = String::new();
    message.push_str("📖 COMANDOS DISPONIBLES\n\n");
    message.push_str(&format!("💰 {}\n", usage(prefix, Verb::Pago)));
    message.push_str(&format!("   Métodos: {} (por defecto efectivo)\n", methods));
    message.push_str(&format!("   Ej: {}pago Juan Perez 200 transferencia ref:12345\n\n", prefix));
    message.push_str(&format!("👤 {}\n", usage(prefix, Verb::Cliente)));
    message.push_str("   Campos opcionales: plan, teléfono, dirección, día de corte, precio\n");
    message.push_str(&format!(
        "   Ej: {}cliente Juan Perez/172.16.1.50/32472792/Aldea Chinaha/15/200\n\n",
        prefix
    ));
    message.push_str(&format!("🔎 {}\n", usage(prefix, Verb::Consulta)));
    message.push_str(&format!("❓ {}ayuda\n", prefix));
    message
}

pub fn usage(prefix: &str, verb: Verb) -> String {
    match verb {
        Verb::Pago => format!("{}pago <nombre o IP> <monto> [método] [ref:<referencia>]", prefix),
        Verb::Cliente => format!(
            "{}cliente <nombre>/<IP>/[plan]/[teléfono]/[dirección]/[día]/[precio]",
            prefix
        ),
        Verb::Consulta => format!("{}consulta <nombre o IP>", prefix),
    }
}

pub fn unknown_command(prefix: &str) -> String {
    format!(
        "🤔 Comando no reconocido. Escribe {}ayuda para ver los comandos disponibles.",
        prefix
    )
}

/// The single reply for a failed command.
pub fn error(err: &CommandError, prefix: &str, verb: Verb) -> String {
    match err {
        CommandError::MissingArguments => {
            format!("⚠️ Faltan datos.\nUso: {}", usage(prefix, verb))
        }
        CommandError::InvalidFormat => format!(
            "⚠️ Formato inválido, separa los campos con '/'.\nUso: {}",
            usage(prefix, verb)
        ),
        CommandError::MissingField(field) => {
            format!("⚠️ Falta el campo obligatorio: {}.\nUso: {}", field, usage(prefix, verb))
        }
        CommandError::AmountNotFound => format!(
            "⚠️ No encontré un monto válido (mayor a 0).\nUso: {}",
            usage(prefix, verb)
        ),
        CommandError::NotFound(identifier) => {
            format!("🔍 No se encontró ningún cliente con '{}'.", identifier)
        }
        CommandError::Ambiguous { candidates, total } => {
            let mut message = format!(
                "🔍 Se encontraron {} clientes, sé más específico o usa la IP:\n",
                total
            );
            message.push_str(&candidate_list(candidates, *total));
            message
        }
        CommandError::Transport(_) => GENERIC_CONNECTIVITY.to_string(),
        CommandError::EmptyRegistry => {
            "📭 No hay clientes registrados en el sistema.".to_string()
        }
        CommandError::Protocol(_) => {
            "❌ El sistema de clientes respondió algo inesperado. Intenta de nuevo.".to_string()
        }
        CommandError::RegistryRejected(msg) => format!("❌ {}", msg),
    }
}

pub fn payment_registered(ack: &PaymentAck) -> String {
    let mut message = String::new();
    message.push_str("✅ PAGO REGISTRADO\n");
    message.push_str(&format!("Cliente: {}\n", ack.client.nombre));
    message.push_str(&format!("IP: {}\n", ack.client.ip_address));
    message.push_str(&format!("Monto: {}\n", format_quetzales(&ack.intent.monto)));
    message.push_str(&format!("Método: {}\n", ack.intent.metodo_pago));
    if let Some(referencia) = &ack.intent.referencia {
        message.push_str(&format!("Referencia: {}\n", referencia));
    }
    if ack.reactivated {
        message.push_str("🟢 Servicio reactivado\n");
    }
    message.trim_end().to_string()
}

pub fn upsert_summary(outcome: &UpsertOutcome) -> String {
    let mut message = String::new();

    match outcome {
        UpsertOutcome::Created { client } => {
            message.push_str("✅ CLIENTE CREADO\n");
            message.push_str(&format!("Nombre: {}\n", client.nombre));
            message.push_str(&format!("IP: {}\n", client.ip_address));
            message.push_str(&format!(
                "Plan: {} ({}/{})\n",
                client.plan, client.velocidad_download, client.velocidad_upload
            ));
            if let Some(telefono) = &client.telefono {
                message.push_str(&format!("Teléfono: {}\n", telefono));
            }
            if let Some(direccion) = &client.direccion {
                message.push_str(&format!("Dirección: {}\n", direccion));
            }
            message.push_str(&format!("Día de corte: {}\n", client.dia_corte));
            message.push_str(&format!(
                "Precio mensual: {}\n",
                format_quetzales(&client.precio_mensual)
            ));
        }
        UpsertOutcome::Updated {
            previous, changes, ..
        } => {
            message.push_str(&format!(
                "✅ CLIENTE ACTUALIZADO\n{} ({})\n",
                previous.nombre, previous.ip_address
            ));
            if changes.is_empty() {
                message.push_str("No se detectaron cambios.\n");
            } else {
                message.push_str("\n📝 CAMBIOS\n");
                for change in changes {
                    message.push_str(&format!(
                        "{}: {} → {}\n",
                        field_label(change.field),
                        display_or_dash(&change.before),
                        display_or_dash(&change.after)
                    ));
                }
            }
        }
    }

    message.trim_end().to_string()
}

/// Client card, followed by the most recent payments when there are any.
pub fn client_card(client: &ClientRecord, history: Option<&[PaymentRecord]>) -> String {
    let mut message = String::new();
    message.push_str(&format!("👤 {}\n", client.nombre));
    message.push_str(&format!("IP: {}\n", client.ip_address));
    message.push_str(&format!(
        "Plan: {} ({}/{})\n",
        client.plan, client.velocidad_download, client.velocidad_upload
    ));
    message.push_str(&format!("Estado: {}\n", client.estado));
    message.push_str(&format!(
        "Precio mensual: {}\n",
        format_quetzales(&client.precio_mensual)
    ));
    message.push_str(&format!(
        "Saldo pendiente: {}\n",
        format_quetzales(&client.saldo_pendiente)
    ));
    message.push_str(&format!("Día de corte: {}\n", client.dia_corte));
    if let Some(telefono) = non_blank(client.telefono.as_deref()) {
        message.push_str(&format!("Teléfono: {}\n", telefono));
    }
    if let Some(direccion) = non_blank(client.direccion.as_deref()) {
        message.push_str(&format!("Dirección: {}\n", direccion));
    }
    if let Some(fecha) = client.fecha_ultimo_pago {
        message.push_str(&format!("Último pago: {}\n", fecha.format("%d/%m/%Y")));
    }
    if let Some(fecha) = client.fecha_proximo_pago {
        message.push_str(&format!("Próximo pago: {}\n", fecha.format("%d/%m/%Y")));
    }

    if let Some(history) = history {
        if !history.is_empty() {
            message.push_str("\n💰 ÚLTIMOS PAGOS\n");
            for (i, pago) in history.iter().take(RECENT_PAYMENTS).enumerate() {
                message.push_str(&format!("{}. {}", i + 1, format_quetzales(&pago.monto)));
                if let Some(fecha) = &pago.fecha_pago {
                    message.push_str(&format!(" - {}", fecha));
                }
                if let Some(metodo) = &pago.metodo_pago {
                    message.push_str(&format!(" ({})", metodo));
                }
                message.push('\n');
            }
        }
    }

    message.trim_end().to_string()
}

/// Numbered candidates with their IPs, plus a note for the ones left out.
pub fn candidate_list(candidates: &[ClientRecord], total: usize) -> String {
    let mut message = String::new();
    for (i, candidate) in candidates.iter().enumerate() {
        message.push_str(&format!(
            "{}. {} - {}\n",
            i + 1,
            candidate.nombre,
            candidate.ip_address
        ));
    }
    if total > candidates.len() {
        message.push_str(&format!("... y {} más\n", total - candidates.len()));
    }
    message.trim_end().to_string()
}

fn field_label(field: &str) -> &str {
    match field {
        "nombre" => "Nombre",
        "plan" => "Plan",
        "velocidad_download" => "Bajada",
        "velocidad_upload" => "Subida",
        "telefono" => "Teléfono",
        "direccion" => "Dirección",
        "dia_corte" => "Día de corte",
        "precio_mensual" => "Precio mensual",
        other => other,
    }
}

/// The registry stores missing contact fields as `''`.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientId, PaymentIntent};
    use crate::upsert::FieldChange;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn client(id: &str, nombre: &str, ip: &str) -> ClientRecord {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "nombre": nombre,
            "ip_address": ip,
            "estado": "cortado",
            "precio_mensual": 150,
        }))
        .unwrap()
    }

    #[test]
    fn ambiguous_reply_lists_candidates_and_remainder() {
        let err = CommandError::Ambiguous {
            candidates: vec![
                client("1", "Juan Pérez", "172.16.1.18"),
                client("2", "Juan Pérez López", "172.16.1.19"),
            ],
            total: 4,
        };
        let reply = error(&err, "!", Verb::Pago);
        assert!(reply.contains("Se encontraron 4 clientes"));
        assert!(reply.contains("1. Juan Pérez - 172.16.1.18"));
        assert!(reply.contains("2. Juan Pérez López - 172.16.1.19"));
        assert!(reply.ends_with("... y 2 más"));
    }

    #[test]
    fn rejected_message_is_shown_verbatim() {
        let reply = error(
            &CommandError::RegistryRejected("Esta IP ya está registrada".into()),
            "!",
            Verb::Cliente,
        );
        assert_eq!(reply, "❌ Esta IP ya está registrada");
    }

    #[test]
    fn transport_details_are_not_leaked() {
        let reply = error(
            &CommandError::Transport("tcp connect error: 10.0.0.1:5000".into()),
            "!",
            Verb::Consulta,
        );
        assert_eq!(reply, GENERIC_CONNECTIVITY);
    }

    #[test]
    fn missing_arguments_shows_usage_for_the_verb() {
        let reply = error(&CommandError::MissingArguments, "!", Verb::Pago);
        assert!(reply.contains("!pago <nombre o IP> <monto>"));
    }

    #[test]
    fn payment_ack_mentions_reactivation() {
        let ack = PaymentAck {
            client: client("7", "Ana", "10.0.0.7"),
            intent: PaymentIntent {
                identificador: "Ana".into(),
                monto: BigDecimal::from_str("200").unwrap(),
                metodo_pago: MetodoPago::Transferencia,
                referencia: Some("12345".into()),
            },
            reactivated: true,
        };
        let reply = payment_registered(&ack);
        assert!(reply.contains("Monto: Q200.00"));
        assert!(reply.contains("Método: transferencia"));
        assert!(reply.contains("Referencia: 12345"));
        assert!(reply.contains("Servicio reactivado"));
    }

    #[test]
    fn update_without_changes() {
        let previous = client("7", "Ana", "10.0.0.7");
        let outcome = UpsertOutcome::Updated {
            previous,
            update: crate::models::ClientUpdate {
                nombre: "Ana".into(),
                plan: "Basico 7Mbps".into(),
                velocidad_download: "7M".into(),
                velocidad_upload: "7M".into(),
                dia_corte: 1,
                telefono: None,
                direccion: None,
                precio_mensual: None,
            },
            changes: vec![],
        };
        assert!(upsert_summary(&outcome).contains("No se detectaron cambios."));
    }

    #[test]
    fn update_lists_changes_with_labels() {
        let outcome = UpsertOutcome::Updated {
            previous: client("7", "Ana", "10.0.0.7"),
            update: crate::models::ClientUpdate {
                nombre: "Ana".into(),
                plan: "Basico 7Mbps".into(),
                velocidad_download: "7M".into(),
                velocidad_upload: "7M".into(),
                dia_corte: 1,
                telefono: Some("32472792".into()),
                direccion: None,
                precio_mensual: None,
            },
            changes: vec![FieldChange {
                field: "telefono",
                before: String::new(),
                after: "32472792".into(),
            }],
        };
        assert!(upsert_summary(&outcome).contains("Teléfono: - → 32472792"));
    }

    #[test]
    fn card_shows_at_most_three_payments() {
        let record = client("7", "Ana", "10.0.0.7");
        let history: Vec<PaymentRecord> = (1..=5)
            .map(|i| {
                serde_json::from_value(serde_json::json!({
                    "id": i,
                    "monto": 100 + i,
                    "fecha_pago": format!("2024-0{}-05", i),
                    "metodo_pago": "efectivo",
                }))
                .unwrap()
            })
            .collect();

        let card = client_card(&record, Some(&history));
        assert!(card.contains("Estado: cortado"));
        assert!(card.contains("Precio mensual: Q150.00"));
        assert!(card.contains("3. Q103.00 - 2024-03-05 (efectivo)"));
        assert!(!card.contains("4. "));
        assert_eq!(record.id, ClientId::new("7"));
    }

    #[test]
    fn card_skips_blank_contact_fields() {
        let record: ClientRecord = serde_json::from_value(serde_json::json!({
            "id": 8,
            "nombre": "Rosa",
            "ip_address": "10.0.0.8",
            "telefono": "",
            "direccion": "  ",
        }))
        .unwrap();

        let card = client_card(&record, None);
        assert!(!card.contains("Teléfono"));
        assert!(!card.contains("Dirección"));
    }

    #[test]
    fn help_uses_prefix_and_methods() {
        let text = help("/", &[MetodoPago::Efectivo, MetodoPago::Tarjeta]);
        assert!(text.contains("/pago"));
        assert!(text.contains("/consulta"));
        assert!(text.contains("Métodos: efectivo, tarjeta"));
    }
}
