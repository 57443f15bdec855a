//! Metrics for verification outcomes.
//!
//! Emitted through the `metrics` facade only; installing a recorder and
//! exporting is the host service's concern. The single label is bounded
//! to six values, so cardinality stays flat no matter the traffic.

use crate::auth::Claims;
use crate::errors::AuthError;

/// Counter: `auth_gate_decisions_total{outcome=...}`.
pub(crate) fn record_decision(outcome: &'static str) {
    metrics::counter!("auth_gate_decisions_total", "outcome" => outcome).increment(1);
}

/// Bounded outcome label for one verification result.
pub(crate) fn outcome_label(result: &Result<Claims, AuthError>) -> &'static str {
    match result {
        Ok(_) => "authorized",
        Err(AuthError::Denied(reason)) => reason.as_str(),
        Err(AuthError::ProviderUnavailable(_)) => "provider_unavailable",
    }
}
