//! Resolution of a free-text client reference ("name or IP") against the roster.
//!
//! Matching is staged and stops at the first stage that produces anything:
//!
//! 1. dotted-quad → exact IP equality, nothing fuzzy;
//! 2. exact normalized name;
//! 3. normalized name contains the query, or the query contains the name;
//! 4. every word of the query appears in the name.
//!
//! The roster is fetched from the registry on every call. Registry failures are
//! reported as [`Resolution::Failure`] and never folded into `NotFound`.

use crate::models::{ClientRecord, Resolution, ResolutionFailure};
use crate::normalize::{is_dotted_quad, normalize_text};
use crate::registry::{ClientRegistry, RegistryError};

/// Fetch the roster and resolve `identifier` against it.
///
/// `cap` bounds how many candidates a `Multiple` carries; the caller picks it.
pub async fn resolve_client(
    registry: &dyn ClientRegistry,
    identifier: &str,
    cap: usize,
) -> Resolution {
    let roster = match registry.list_clients().await {
        Ok(roster) => roster,
        Err(RegistryError::Transport(msg)) => {
            tracing::error!("Registry unreachable while resolving '{}': {}", identifier, msg);
            return Resolution::Failure(ResolutionFailure::Transport(msg));
        }
        Err(RegistryError::Protocol(msg)) | Err(RegistryError::Rejected(msg)) => {
            tracing::error!("Unusable roster while resolving '{}': {}", identifier, msg);
            return Resolution::Failure(ResolutionFailure::Protocol(msg));
        }
    };

    if roster.is_empty() {
        tracing::warn!("Registry returned an empty roster");
        return Resolution::Failure(ResolutionFailure::EmptyRegistry);
    }

    let resolution = match_roster(identifier, &roster, cap);
    match &resolution {
        Resolution::Single(record) => {
            tracing::info!("Resolved '{}' to client {}", identifier, record.id)
        }
        Resolution::Multiple { total, .. } => {
            tracing::info!("'{}' matched {} clients", identifier, total)
        }
        Resolution::NotFound => tracing::info!("No client matches '{}'", identifier),
        Resolution::Failure(_) => {}
    }
    resolution
}

/// Resolve `identifier` against an already fetched roster.
pub fn match_roster(identifier: &str, roster: &[ClientRecord], cap: usize) -> Resolution {
    let identifier = identifier.trim();

    if is_dotted_quad(identifier) {
        return find_by_ip(roster, identifier)
            .cloned()
            .map_or(Resolution::NotFound, Resolution::Single);
    }

    let query = normalize_text(identifier);
    // A blank name would be a substring of every query.
    let names: Vec<(String, &ClientRecord)> = roster
        .iter()
        .map(|record| (normalize_text(&record.nombre), record))
        .filter(|(name, _)| !name.is_empty())
        .collect();

    if let Some((_, record)) = names.iter().find(|(name, _)| *name == query) {
        return Resolution::Single((*record).clone());
    }

    let partial: Vec<&ClientRecord> = names
        .iter()
        .filter(|(name, _)| name.contains(&query) || query.contains(name.as_str()))
        .map(|(_, record)| *record)
        .collect();
    if !partial.is_empty() {
        return settle(partial, cap);
    }

    let words: Vec<&str> = query.split_whitespace().collect();
    let by_words: Vec<&ClientRecord> = names
        .iter()
        .filter(|(name, _)| words.iter().all(|word| name.contains(word)))
        .map(|(_, record)| *record)
        .collect();

    settle(by_words, cap)
}

/// Exact IP equality; the roster holds each IP at most once.
pub fn find_by_ip<'a>(roster: &'a [ClientRecord], ip: &str) -> Option<&'a ClientRecord> {
    roster.iter().find(|record| record.ip_address == ip)
}

fn settle(matches: Vec<&ClientRecord>, cap: usize) -> Resolution {
    match matches.len() {
        0 => Resolution::NotFound,
        1 => Resolution::Single(matches[0].clone()),
        total => Resolution::Multiple {
            candidates: matches.into_iter().take(cap).cloned().collect(),
            total,
        },
    }
}
