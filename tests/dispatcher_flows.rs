/// Command flows through the dispatcher against an in-memory registry
mod common;

use bigdecimal::BigDecimal;
use std::str::FromStr;
use std::sync::Arc;

use common::{client, roster, InMemoryRegistry};
use isp_chat_intake::config::BotConfig;
use isp_chat_intake::dispatcher::Dispatcher;
use isp_chat_intake::models::{ClientId, MetodoPago, PaymentRecord};
use isp_chat_intake::registry::RegistryError;
use isp_chat_intake::replies::{GENERIC_CONNECTIVITY, INTERNAL_ERROR};

fn dispatcher(registry: Arc<InMemoryRegistry>) -> Dispatcher {
    Dispatcher::new(BotConfig::default(), registry)
}

fn seeded() -> Arc<InMemoryRegistry> {
    Arc::new(InMemoryRegistry::with_clients(roster()))
}

#[tokio::test]
async fn messages_without_prefix_are_ignored() {
    let registry = seeded();
    let bot = dispatcher(registry.clone());

    assert_eq!(bot.handle("pago Juan Perez 200", "502111").await, None);
    assert_eq!(bot.handle("hola", "502111").await, None);
    assert!(registry.payments().is_empty());
}

#[tokio::test]
async fn out_of_scope_channel_is_ignored() {
    let config = BotConfig {
        channel_scope: Some("grupo-cobros".to_string()),
        ..BotConfig::default()
    };
    let bot = Dispatcher::new(config, seeded());

    assert_eq!(bot.handle("!ayuda", "otro-grupo").await, None);
    assert!(bot.handle("!ayuda", "grupo-cobros").await.is_some());
}

#[tokio::test]
async fn unknown_verb_gets_fixed_reply() {
    let bot = dispatcher(seeded());
    let reply = bot.handle("!borrar Juan", "502111").await.unwrap();
    assert!(reply.contains("Comando no reconocido"));
}

#[tokio::test]
async fn verb_is_case_insensitive_and_help_has_both_spellings() {
    let bot = dispatcher(seeded());
    let ayuda = bot.handle("!AYUDA", "502111").await.unwrap();
    let help = bot.handle("!help", "502111").await.unwrap();
    assert_eq!(ayuda, help);
    assert!(ayuda.contains("!consulta"));
}

#[tokio::test]
async fn payment_by_exact_name() {
    let registry = seeded();
    let bot = dispatcher(registry.clone());

    let reply = bot
        .handle("!pago Juan Perez 200 transferencia ref:12345", "502111")
        .await
        .unwrap();

    assert!(reply.contains("PAGO REGISTRADO"), "{}", reply);
    assert!(!reply.contains("reactivado"));

    let payments = registry.payments();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].cliente_id, ClientId::new("1"));
    assert_eq!(payments[0].monto, BigDecimal::from_str("200").unwrap());
    assert_eq!(payments[0].metodo_pago, MetodoPago::Transferencia);
    assert_eq!(payments[0].referencia.as_deref(), Some("12345"));
    assert_eq!(payments[0].registrado_por, "whatsapp_bot");
}

#[tokio::test]
async fn payment_by_ip_reactivates_cut_client() {
    let registry = seeded();
    let bot = dispatcher(registry.clone());

    let reply = bot.handle("!pago 172.16.1.20 Q150", "502111").await.unwrap();

    assert!(reply.contains("María García"));
    assert!(reply.contains("Servicio reactivado"));
    assert_eq!(registry.payments()[0].metodo_pago, MetodoPago::Efectivo);
}

#[tokio::test]
async fn ambiguous_payment_lists_candidates_and_records_nothing() {
    let registry = seeded();
    let bot = dispatcher(registry.clone());

    let reply = bot.handle("!pago juan 100", "502111").await.unwrap();

    assert!(reply.contains("Se encontraron 2 clientes"));
    assert!(reply.contains("172.16.1.18"));
    assert!(reply.contains("172.16.1.19"));
    assert!(registry.payments().is_empty());
}

#[tokio::test]
async fn unknown_client_is_reported() {
    let registry = seeded();
    let reply = dispatcher(registry.clone())
        .handle("!pago Carlos 100", "502111")
        .await
        .unwrap();
    assert!(reply.contains("No se encontró ningún cliente con 'Carlos'"));
    assert!(registry.payments().is_empty());
}

#[tokio::test]
async fn unknown_ip_is_not_fuzzy_matched() {
    let reply = dispatcher(seeded())
        .handle("!pago 172.16.1.1 100", "502111")
        .await
        .unwrap();
    assert!(reply.contains("No se encontró"));
}

#[tokio::test]
async fn payment_usage_errors() {
    let bot = dispatcher(seeded());

    let reply = bot.handle("!pago Juan", "502111").await.unwrap();
    assert!(reply.contains("Faltan datos"));

    let reply = bot.handle("!pago Juan Perez", "502111").await.unwrap();
    assert!(reply.contains("No encontré un monto válido"));

    let reply = bot.handle("!pago Juan 0", "502111").await.unwrap();
    assert!(reply.contains("No encontré un monto válido"));
}

#[tokio::test]
async fn empty_registry_is_not_a_miss() {
    let registry = Arc::new(InMemoryRegistry::default());
    let reply = dispatcher(registry)
        .handle("!pago Juan 100", "502111")
        .await
        .unwrap();
    assert!(reply.contains("No hay clientes registrados"));
}

#[tokio::test]
async fn unreachable_registry_gets_generic_reply() {
    let registry = Arc::new(InMemoryRegistry {
        roster_error: Some(RegistryError::Transport("connection refused".to_string())),
        ..InMemoryRegistry::default()
    });
    let reply = dispatcher(registry)
        .handle("!consulta Juan", "502111")
        .await
        .unwrap();
    assert_eq!(reply, GENERIC_CONNECTIVITY);
}

#[tokio::test]
async fn payment_rejection_is_shown_verbatim() {
    let registry = Arc::new(InMemoryRegistry {
        reject_with: Some("Monto inválido".to_string()),
        ..InMemoryRegistry::with_clients(roster())
    });
    let reply = dispatcher(registry)
        .handle("!pago 172.16.1.18 100", "502111")
        .await
        .unwrap();
    assert_eq!(reply, "❌ Monto inválido");
}

#[tokio::test]
async fn new_ip_creates_client_with_defaults() {
    let registry = seeded();
    let bot = dispatcher(registry.clone());

    let reply = bot
        .handle(
            "!cliente Ana López/10.0.0.9/32472792/Aldea Chinaha/15/200",
            "502111",
        )
        .await
        .unwrap();

    assert!(reply.contains("CLIENTE CREADO"), "{}", reply);
    let created = registry.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].nombre, "Ana López");
    assert_eq!(created[0].ip_address, "10.0.0.9");
    assert_eq!(created[0].plan, "Basico 7Mbps");
    assert_eq!(created[0].telefono.as_deref(), Some("32472792"));
    assert_eq!(created[0].direccion.as_deref(), Some("Aldea Chinaha"));
    assert_eq!(created[0].dia_corte, 15);
    assert_eq!(created[0].precio_mensual, BigDecimal::from_str("200").unwrap());
    assert!(registry.updates().is_empty());
}

#[tokio::test]
async fn known_ip_updates_and_reports_changes() {
    let registry = seeded();
    let bot = dispatcher(registry.clone());

    let reply = bot
        .handle("!cliente Juan Perez/172.16.1.18/Premium 10 Mbps/175", "502111")
        .await
        .unwrap();

    assert!(reply.contains("CLIENTE ACTUALIZADO"), "{}", reply);
    assert!(reply.contains("Plan: Basico 7Mbps → Premium 10 Mbps"));
    assert!(reply.contains("Precio mensual: 150.00 → 175.00"));

    let updates = registry.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, ClientId::new("1"));
    assert_eq!(updates[0].1.velocidad_download, "10M");
    assert!(registry.created().is_empty());
}

#[tokio::test]
async fn identical_resubmission_reports_no_changes() {
    let registry = seeded();
    let reply = dispatcher(registry.clone())
        .handle("!cliente Juan Perez/172.16.1.18/150", "502111")
        .await
        .unwrap();

    assert!(reply.contains("No se detectaron cambios"), "{}", reply);
    assert_eq!(registry.updates().len(), 1);
}

#[tokio::test]
async fn client_command_validation() {
    let bot = dispatcher(seeded());

    let reply = bot.handle("!cliente", "502111").await.unwrap();
    assert!(reply.contains("Faltan datos"));

    let reply = bot.handle("!cliente Ana López", "502111").await.unwrap();
    assert!(reply.contains("Formato inválido"));

    let reply = bot.handle("!cliente Ana López/Aldea Chinaha", "502111").await.unwrap();
    assert!(reply.contains("Falta el campo obligatorio: ip"));
}

#[tokio::test]
async fn create_rejection_is_shown_verbatim() {
    let registry = Arc::new(InMemoryRegistry {
        reject_with: Some("Esta IP ya está registrada".to_string()),
        ..InMemoryRegistry::with_clients(roster())
    });
    let reply = dispatcher(registry)
        .handle("!cliente Ana/10.0.0.9", "502111")
        .await
        .unwrap();
    assert_eq!(reply, "❌ Esta IP ya está registrada");
}

#[tokio::test]
async fn query_shows_card_and_recent_payments() {
    let registry = seeded();
    // Newest first, as the registry orders history.
    for (i, fecha) in ["2024-04-05", "2024-03-05", "2024-02-05", "2024-01-05"]
        .iter()
        .enumerate()
    {
        let record: PaymentRecord = serde_json::from_value(serde_json::json!({
            "id": i,
            "monto": 150,
            "fecha_pago": fecha,
            "metodo_pago": "efectivo",
        }))
        .unwrap();
        registry.add_history("3", record);
    }

    let reply = dispatcher(registry)
        .handle("!consulta maria garcia", "502111")
        .await
        .unwrap();

    assert!(reply.contains("👤 María García"), "{}", reply);
    assert!(reply.contains("Estado: cortado"));
    assert!(reply.contains("ÚLTIMOS PAGOS"));
    assert!(reply.contains("1. Q150.00 - 2024-04-05"));
    assert!(reply.contains("3. Q150.00 - 2024-02-05"));
    assert!(!reply.contains("2024-01-05"));
}

#[tokio::test]
async fn query_degrades_when_history_fails() {
    let registry = Arc::new(InMemoryRegistry {
        history_unavailable: true,
        ..InMemoryRegistry::with_clients(roster())
    });
    let reply = dispatcher(registry)
        .handle("!consulta 172.16.1.18", "502111")
        .await
        .unwrap();

    assert!(reply.contains("👤 Juan Perez"));
    assert!(!reply.contains("ÚLTIMOS PAGOS"));
}

#[tokio::test]
async fn ambiguous_query_lists_candidates() {
    let mut clients = roster();
    for i in 0..12 {
        clients.push(client(
            100 + i,
            &format!("Pedro Juan {}", i),
            &format!("10.1.1.{}", i + 1),
            "activo",
        ));
    }
    let registry = Arc::new(InMemoryRegistry::with_clients(clients));

    let reply = dispatcher(registry)
        .handle("!consulta juan", "502111")
        .await
        .unwrap();

    assert!(reply.contains("14 clientes coinciden"), "{}", reply);
    assert!(reply.contains("10. "));
    assert!(!reply.contains("11. "));
    assert!(reply.contains("y 4 más"));
}

#[tokio::test]
async fn classified_ip_resolves_to_the_same_record() {
    use isp_chat_intake::core::parsing::parse_client_command;
    use isp_chat_intake::core::resolver::match_roster;
    use isp_chat_intake::models::Resolution;

    let draft = parse_client_command("Juan Perez/172.16.1.50/15").unwrap();
    let roster = vec![client(9, "Juan Perez", "172.16.1.50", "activo")];

    match match_roster(&draft.ip_address, &roster, 5) {
        Resolution::Single(record) => assert_eq!(record.id, ClientId::new("9")),
        other => panic!("expected Single, got {:?}", other),
    }
}

#[tokio::test]
async fn panicking_command_gets_internal_error_reply() {
    let registry = Arc::new(InMemoryRegistry {
        panic_on_roster: true,
        ..InMemoryRegistry::with_clients(roster())
    });
    let bot = Arc::new(dispatcher(registry));

    let reply = bot
        .clone()
        .handle_isolated("!pago Juan 100".to_string(), "502111".to_string())
        .await;
    assert_eq!(reply.as_deref(), Some(INTERNAL_ERROR));

    // Help never touches the registry.
    let reply = bot
        .handle_isolated("!ayuda".to_string(), "502111".to_string())
        .await;
    assert!(reply.unwrap().contains("COMANDOS"));
}
