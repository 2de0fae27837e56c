//! Classification of `cliente` command segments.
//!
//! ```text
//! cliente Juan Perez/172.16.1.50/32472792/Aldea Chinaha/15/200
//! ```
//!
//! The first segment is the name. Every other segment is typed by the first rule
//! it matches, in this order: IP, plan, phone, number, address. Numbers are split
//! between billing day and monthly price by [`apply_numeric`].

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::errors::CommandError;
use crate::models::{ClassifiedFields, ClientDraft};
use crate::normalize::{is_dotted_quad, normalize_text};

pub const SEGMENT_SEPARATOR: char = '/';

/// Checked against the normalized segment, so the accented spellings match too.
const PLAN_KEYWORDS: &[&str] = &["mbps", "basico", "estandar", "premium", "avanzado", "mega"];

const MIN_PHONE_DIGITS: usize = 8;
const MIN_PRICE: i64 = 50;
const MAX_BILLING_DAY: u8 = 28;
const DEFAULT_BILLING_DAY: u8 = 1;

static SPEED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*mbps").unwrap());
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

/// Split, classify and validate the text after the `cliente` verb.
///
/// # Errors
///
/// * `InvalidFormat` - fewer than two non-empty segments.
/// * `MissingField("nombre")` - the name segment is blank.
/// * `MissingField("ip")` - no segment was a dotted-quad.
pub fn parse_client_command(text: &str) -> Result<ClientDraft, CommandError> {
    let segments: Vec<&str> = text
        .split(SEGMENT_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.len() < 2 {
        return Err(CommandError::InvalidFormat);
    }

    let nombre = segments[0].to_string();
    if nombre.is_empty() {
        return Err(CommandError::MissingField("nombre"));
    }

    let fields = classify_segments(&segments[1..]);

    let ip_address = fields
        .ip
        .clone()
        .filter(|ip| !ip.is_empty())
        .ok_or(CommandError::MissingField("ip"))?;

    Ok(ClientDraft {
        nombre,
        ip_address,
        fields,
    })
}

/// Classify the optional segments (everything after the name).
///
/// Never fails; segments that match nothing are dropped.
pub fn classify_segments(segments: &[&str]) -> ClassifiedFields {
    let mut fields = ClassifiedFields::default();

    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        if is_dotted_quad(segment) {
            fields.ip = Some(segment.to_string());
        } else if is_plan(segment) {
            fields.plan = Some(segment.to_string());
            if let Some(caps) = SPEED_RE.captures(segment) {
                let speed = format!("{}M", &caps[1]);
                fields.velocidad_download = Some(speed.clone());
                fields.velocidad_upload = Some(speed);
            }
        } else if let Some(phone) = as_phone(segment) {
            fields.telefono = Some(phone);
        } else if NUMERIC_RE.is_match(segment) {
            if let Ok(value) = BigDecimal::from_str(segment) {
                apply_numeric(&mut fields, value);
            }
        } else if segment.chars().any(char::is_alphabetic) {
            fields.direccion = Some(match fields.direccion.take() {
                Some(existing) => format!("{}, {}", existing, segment),
                None => segment.to_string(),
            });
        } else {
            tracing::debug!("Dropping unclassified segment: {:?}", segment);
        }
    }

    fields
}

fn is_plan(segment: &str) -> bool {
    let normalized = normalize_text(segment);
    PLAN_KEYWORDS.iter().any(|kw| normalized.contains(kw))
}

fn as_phone(segment: &str) -> Option<String> {
    let trimmed = segment.strip_prefix('+').unwrap_or(segment);
    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if digits.len() >= MIN_PHONE_DIGITS && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

/// Assign a bare number to price or billing day.
///
/// * `value >= 50` always becomes the price.
/// * A `value` in `1..=28` becomes the billing day, truncated to a whole day,
///   only while the day is still at its default of 1 and no price has been set.
/// * Anything else is dropped.
///
/// This makes the outcome depend on order: `10/60` gives day 10 and price 60, but
/// `60/10` gives price 60 and leaves the day at 1, because the price was already
/// set when `10` arrived. A second small number is also dropped once the day has
/// moved off 1.
// TODO: accept explicit "dia:"/"precio:" markers so agents can avoid the order dependence.
fn apply_numeric(fields: &mut ClassifiedFields, value: BigDecimal) {
    if value >= BigDecimal::from(MIN_PRICE) {
        fields.precio = Some(value);
        return;
    }

    let day_untouched = fields.dia_corte.unwrap_or(DEFAULT_BILLING_DAY) == DEFAULT_BILLING_DAY;
    let price_unset = fields.precio.as_ref().map_or(true, |p| p.is_zero());

    if let Some(day) = as_billing_day(&value) {
        if day_untouched && price_unset {
            fields.dia_corte = Some(day);
            return;
        }
    }

    tracing::debug!("Dropping ambiguous numeric segment: {}", value);
}

fn as_billing_day(value: &BigDecimal) -> Option<u8> {
    if *value < BigDecimal::from(1) || *value > BigDecimal::from(MAX_BILLING_DAY) {
        return None;
    }
    value.with_scale(0).to_u8()
}

/// Billing day the registry should receive for these fields.
pub fn effective_billing_day(fields: &ClassifiedFields) -> u8 {
    fields.dia_corte.unwrap_or(DEFAULT_BILLING_DAY)
}

/// Monthly price the registry should receive for these fields.
pub fn effective_price(fields: &ClassifiedFields) -> BigDecimal {
    fields.precio.clone().unwrap_or_else(BigDecimal::zero)
}
