//! Extraction of amount, method and reference from `pago` arguments.
//!
//! Agents type the client first and the money last, but in whatever order they
//! like for the trailing bits:
//!
//! ```text
//! pago Juan Perez 200 transferencia ref:12345
//! pago 172.16.1.18 Q150
//! ```
//!
//! The tokens are scanned from the end towards the start. Reference and method
//! tokens are picked up as they are met; the first (rightmost) token that reads as
//! a positive amount ends the scan and everything before it is the client
//! identifier. A reference or method written *before* the amount is therefore
//! not extracted and stays in the identifier.

use bigdecimal::{BigDecimal, Zero};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::errors::CommandError;
use crate::models::{MetodoPago, PaymentIntent};

const REFERENCE_MARKER: &str = "ref:";

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

/// Parse the tokens that follow the `pago` verb.
///
/// `methods` is the configured set of accepted payment methods; anything else is
/// treated as an ordinary token.
///
/// # Errors
///
/// * `MissingArguments` - fewer than two tokens.
/// * `AmountNotFound` - no amount between the last token and index 1, or an empty identifier.
pub fn parse_payment_args(
    tokens: &[&str],
    methods: &[MetodoPago],
) -> Result<PaymentIntent, CommandError> {
    if tokens.len() < 2 {
        return Err(CommandError::MissingArguments);
    }

    let mut referencia: Option<String> = None;
    let mut metodo_pago: Option<MetodoPago> = None;
    let mut amount: Option<(usize, BigDecimal)> = None;

    // Index 0 always belongs to the identifier.
    for index in (1..tokens.len()).rev() {
        let token = tokens[index];

        if let Some(reference) = strip_reference(token) {
            referencia = Some(reference.to_string()).filter(|r| !r.is_empty());
            continue;
        }

        if let Some(method) = match_method(token, methods) {
            metodo_pago = Some(method);
            continue;
        }

        if let Some(monto) = parse_amount(token) {
            amount = Some((index, monto));
            break;
        }
    }

    let (amount_index, monto) = amount.ok_or(CommandError::AmountNotFound)?;

    let identificador = tokens[..amount_index].join(" ");
    if identificador.trim().is_empty() {
        return Err(CommandError::AmountNotFound);
    }

    Ok(PaymentIntent {
        identificador,
        monto,
        metodo_pago: metodo_pago.unwrap_or_default(),
        referencia,
    })
}

/// `ref:ABC` (any case) yields `ABC`.
fn strip_reference(token: &str) -> Option<&str> {
    let prefix = token.get(..REFERENCE_MARKER.len())?;
    if prefix.eq_ignore_ascii_case(REFERENCE_MARKER) {
        Some(&token[REFERENCE_MARKER.len()..])
    } else {
        None
    }
}

fn match_method(token: &str, methods: &[MetodoPago]) -> Option<MetodoPago> {
    MetodoPago::from_str(token)
        .ok()
        .filter(|method| methods.contains(method))
}

/// A positive decimal, optionally prefixed by a single `Q`/`q`.
pub fn parse_amount(token: &str) -> Option<BigDecimal> {
    let digits = token
        .strip_prefix('Q')
        .or_else(|| token.strip_prefix('q'))
        .unwrap_or(token);

    if !AMOUNT_RE.is_match(digits) {
        return None;
    }

    BigDecimal::from_str(digits)
        .ok()
        .filter(|value| *value > BigDecimal::zero())
}
