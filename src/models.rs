use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Registry-assigned client identifier.
///
/// The registry hands out integers, but the engine treats the id as opaque text and
/// only turns it back into a number on the wire when it looks like one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ClientId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(numeric) => serializer.serialize_i64(numeric),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for ClientId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(ClientId(s)),
            serde_json::Value::Number(n) => Ok(ClientId(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "client id must be a string or number, got {}",
                other
            ))),
        }
    }
}

/// Service state of a client as kept by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstadoServicio {
    #[default]
    Activo,
    Suspendido,
    Cortado,
}

impl EstadoServicio {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoServicio::Activo => "activo",
            EstadoServicio::Suspendido => "suspendido",
            EstadoServicio::Cortado => "cortado",
        }
    }

    /// Whether the client currently has no service.
    pub fn is_interrupted(&self) -> bool {
        !matches!(self, EstadoServicio::Activo)
    }
}

impl fmt::Display for EstadoServicio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstadoServicio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            EstadoServicio::Activo,
            EstadoServicio::Suspendido,
            EstadoServicio::Cortado,
        ]
        .into_iter()
        .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown service state '{}'", s))
    }
}

/// Imported backups may carry `"Activo"` and the like, so case is ignored.
impl<'de> Deserialize<'de> for EstadoServicio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Accepted ways of paying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetodoPago {
    #[default]
    Efectivo,
    Transferencia,
    Deposito,
    Tarjeta,
}

impl MetodoPago {
    pub const ALL: [MetodoPago; 4] = [
        MetodoPago::Efectivo,
        MetodoPago::Transferencia,
        MetodoPago::Deposito,
        MetodoPago::Tarjeta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetodoPago::Efectivo => "efectivo",
            MetodoPago::Transferencia => "transferencia",
            MetodoPago::Deposito => "deposito",
            MetodoPago::Tarjeta => "tarjeta",
        }
    }
}

impl fmt::Display for MetodoPago {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetodoPago {
    type Err = String;

    /// Case-insensitive exact match against the method names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetodoPago::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown payment method '{}'", s))
    }
}

/// One client as listed by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: ClientId,
    pub nombre: String,
    pub ip_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub plan: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub velocidad_download: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub velocidad_upload: String,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default = "default_dia_corte", deserialize_with = "dia_corte_or_default")]
    pub dia_corte: i64,
    #[serde(
        default,
        deserialize_with = "money_or_zero",
        serialize_with = "decimal_as_number"
    )]
    pub precio_mensual: BigDecimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub estado: EstadoServicio,
    #[serde(
        default,
        deserialize_with = "money_or_zero",
        serialize_with = "decimal_as_number"
    )]
    pub saldo_pendiente: BigDecimal,
    #[serde(default)]
    pub fecha_ultimo_pago: Option<NaiveDate>,
    #[serde(default)]
    pub fecha_proximo_pago: Option<NaiveDate>,
}

/// A payment command after extraction, before the client is resolved.
///
/// The provenance tag is channel configuration rather than message content, so it
/// is not carried here; [`crate::payments::register_payment`] takes it alongside
/// the intent and stamps it on the [`PaymentRequest`] as `registrado_por`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    pub identificador: String,
    pub monto: BigDecimal,
    pub metodo_pago: MetodoPago,
    pub referencia: Option<String>,
}

/// Fields recognized in the optional segments of a client command.
///
/// Every field stays `None` unless some segment matched its rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedFields {
    pub ip: Option<String>,
    pub plan: Option<String>,
    pub velocidad_download: Option<String>,
    pub velocidad_upload: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub dia_corte: Option<u8>,
    pub precio: Option<BigDecimal>,
}

/// A validated client command: a name, an IP and whatever else was classified.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientDraft {
    pub nombre: String,
    pub ip_address: String,
    pub fields: ClassifiedFields,
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewClient {
    pub nombre: String,
    pub ip_address: String,
    pub plan: String,
    pub velocidad_download: String,
    pub velocidad_upload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
    pub dia_corte: u8,
    #[serde(serialize_with = "decimal_as_number")]
    pub precio_mensual: BigDecimal,
}

/// Body of an update request. Optional fields are left out of the payload entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientUpdate {
    pub nombre: String,
    pub plan: String,
    pub velocidad_download: String,
    pub velocidad_upload: String,
    pub dia_corte: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "optional_decimal_as_number"
    )]
    pub precio_mensual: Option<BigDecimal>,
}

/// Body of a payment request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    pub cliente_id: ClientId,
    #[serde(serialize_with = "decimal_as_number")]
    pub monto: BigDecimal,
    pub metodo_pago: MetodoPago,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referencia: Option<String>,
    pub registrado_por: String,
}

/// One entry of a client's payment history.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "money_or_zero")]
    pub monto: BigDecimal,
    #[serde(default)]
    pub fecha_pago: Option<String>,
    #[serde(default)]
    pub metodo_pago: Option<String>,
    #[serde(default)]
    pub referencia: Option<String>,
    #[serde(default)]
    pub mes_correspondiente: Option<String>,
}

/// Outcome of resolving a free-text identifier against the roster.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Single(ClientRecord),
    /// `candidates` is already capped; `total` is the full match count.
    Multiple {
        candidates: Vec<ClientRecord>,
        total: usize,
    },
    NotFound,
    Failure(ResolutionFailure),
}

/// Why a resolution could not even be attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    Transport(String),
    EmptyRegistry,
    Protocol(String),
}

fn default_dia_corte() -> i64 {
    1
}

/// Accepts a number or a numeric string; anything else falls back to day 1.
fn dia_corte_or_default<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let day = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(day.unwrap_or_else(default_dia_corte))
}

/// Money arrives as JSON floats. Going through the number's shortest text keeps
/// `199.99` as `199.99` instead of its binary expansion.
fn money_or_zero<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => return Ok(BigDecimal::default()),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "money must be a number or string, got {}",
                other
            )))
        }
    };
    BigDecimal::from_str(&text).map_err(serde::de::Error::custom)
}

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The registry parses money with `float()`, so send numbers rather than strings.
fn decimal_as_number<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    match value.to_f64() {
        Some(v) => serializer.serialize_f64(v),
        None => serializer.serialize_str(&value.to_string()),
    }
}

fn optional_decimal_as_number<S: Serializer>(
    value: &Option<BigDecimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => decimal_as_number(v, serializer),
        None => serializer.serialize_none(),
    }
}

/// Renders money the way agents write it: `Q200.00`.
pub fn format_quetzales(amount: &BigDecimal) -> String {
    format!("Q{}", amount.with_scale(2))
}
