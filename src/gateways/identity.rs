// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP identity resolver.
//!
//! Posts `{firstName, lastName, dob}` and expects the lookup service's
//! envelope:
//!
//! ```json
//! { "IDS": { "MRN": "...", "FIN": "...", "ZIP": "...", "ADDRESS": "...",
//!            "VALID": "true", "BAD_ADDS": [ { "BAD_ADD": "..." } ] } }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{
    GatewayError, IdentityQuery, IdentityResolution, IdentityResolver, ResolvedIdentity,
};
use crate::session::RecordIds;

#[derive(Debug, Deserialize)]
struct LookupEnvelope {
    #[serde(rename = "IDS")]
    ids: LookupIds,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LookupIds {
    #[serde(rename = "MRN")]
    mrn: Option<Value>,
    #[serde(rename = "FIN")]
    fin: Option<Value>,
    #[serde(rename = "ADDRESS")]
    address: Option<String>,
    #[serde(rename = "VALID")]
    valid: Option<Value>,
    #[serde(rename = "BAD_ADDS")]
    bad_adds: Vec<BadAddress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BadAddress {
    #[serde(rename = "BAD_ADD")]
    bad_add: Option<String>,
}

/// Identifiers arrive as strings or bare numbers depending on the source
/// system.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_valid_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn interpret(envelope: LookupEnvelope) -> Result<IdentityResolution, GatewayError> {
    let ids = envelope.ids;
    if !is_valid_flag(ids.valid.as_ref()) {
        return Ok(IdentityResolution::NotFound);
    }

    let mrn = scalar_text(ids.mrn.as_ref())
        .ok_or_else(|| GatewayError::InvalidResponse("valid identity without MRN".to_string()))?;
    let fin = scalar_text(ids.fin.as_ref())
        .ok_or_else(|| GatewayError::InvalidResponse("valid identity without FIN".to_string()))?;
    let correct_address = ids
        .address
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| {
            GatewayError::InvalidResponse("valid identity without address".to_string())
        })?;

    let decoy_addresses = ids
        .bad_adds
        .into_iter()
        .filter_map(|b| b.bad_add)
        .filter(|a| !a.trim().is_empty() && *a != correct_address)
        .collect();

    Ok(IdentityResolution::Resolved(ResolvedIdentity {
        record_ids: RecordIds { mrn, fin },
        correct_address,
        decoy_addresses,
    }))
}

#[derive(Debug, Clone)]
pub struct HttpIdentityResolver {
    endpoint: Url,
    http: Client,
}

impl HttpIdentityResolver {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { endpoint, http })
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(&self, query: &IdentityQuery) -> Result<IdentityResolution, GatewayError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(query)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let envelope: LookupEnvelope = response.json().await?;
        let resolution = interpret(envelope)?;
        debug!(
            found = matches!(resolution, IdentityResolution::Resolved(_)),
            "Identity lookup completed"
        );
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<IdentityResolution, GatewayError> {
        interpret(serde_json::from_value(body).expect("envelope parses"))
    }

    #[test]
    fn valid_lookup_yields_ids_address_and_decoys() {
        let resolution = parse(json!({
            "IDS": {
                "MRN": "123", "FIN": 456, "ZIP": "37920",
                "ADDRESS": "1 Main St", "VALID": "True",
                "BAD_ADDS": [ { "BAD_ADD": "2 Elm St" }, { "BAD_ADD": null }, { "BAD_ADD": "3 Oak Rd" } ]
            }
        }))
        .unwrap();

        let IdentityResolution::Resolved(found) = resolution else {
            panic!("expected a resolved identity");
        };
        assert_eq!(found.record_ids.mrn, "123");
        assert_eq!(found.record_ids.fin, "456");
        assert_eq!(found.correct_address, "1 Main St");
        assert_eq!(found.decoy_addresses, vec!["2 Elm St", "3 Oak Rd"]);
    }

    #[test]
    fn invalid_flag_means_not_found() {
        let resolution = parse(json!({ "IDS": { "VALID": "false" } })).unwrap();
        assert_eq!(resolution, IdentityResolution::NotFound);

        let resolution = parse(json!({ "IDS": {} })).unwrap();
        assert_eq!(resolution, IdentityResolution::NotFound);
    }

    #[test]
    fn valid_flag_without_ids_is_an_invalid_reply() {
        let result = parse(json!({
            "IDS": { "VALID": "true", "MRN": "1", "ADDRESS": "1 Main St" }
        }));
        assert!(matches!(result, Err(GatewayError::InvalidResponse(_))));
    }

    #[test]
    fn decoy_equal_to_correct_address_is_dropped() {
        let resolution = parse(json!({
            "IDS": {
                "VALID": true, "MRN": "1", "FIN": "2", "ADDRESS": "1 Main St",
                "BAD_ADDS": [ { "BAD_ADD": "1 Main St" }, { "BAD_ADD": "9 Pine Ct" } ]
            }
        }))
        .unwrap();
        let IdentityResolution::Resolved(found) = resolution else {
            panic!("expected a resolved identity");
        };
        assert_eq!(found.decoy_addresses, vec!["9 Pine Ct"]);
    }

    #[test]
    fn query_serializes_with_camel_case_fields() {
        let query = IdentityQuery {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            dob: "1815-12-10".into(),
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({ "firstName": "Ada", "lastName": "Lovelace", "dob": "1815-12-10" })
        );
    }
}
