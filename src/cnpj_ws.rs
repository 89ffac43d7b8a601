use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::CNPJ_PLACEHOLDER;
use crate::domain::{Cnpj, EnrichmentRecord};
use crate::error::EnrichError;

/// Registry lookup for a single identifier.
///
/// `Ok(None)` means the provider answered with anything but `200 OK`; transport
/// and decoding failures are errors.
pub trait LookupClient: Send + Sync {
    fn fetch(&self, cnpj: &Cnpj) -> Result<Option<EnrichmentRecord>, EnrichError>;
}

#[derive(Clone)]
pub struct CnpjWsHttpClient {
    client: Client,
    url_template: String,
}

impl CnpjWsHttpClient {
    pub fn new(url_template: &str, timeout: Option<Duration>) -> Result<Self, EnrichError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EnrichError::LookupHttp(err.to_string()))?;
        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    pub fn lookup_url(&self, cnpj: &Cnpj) -> String {
        build_url(&self.url_template, cnpj)
    }
}

impl LookupClient for CnpjWsHttpClient {
    fn fetch(&self, cnpj: &Cnpj) -> Result<Option<EnrichmentRecord>, EnrichError> {
        let url = self.lookup_url(cnpj);
        tracing::debug!(%url, "requesting registry entry");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| EnrichError::LookupHttp(err.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(%cnpj, status = status.as_u16(), "registry returned no data");
            return Ok(None);
        }

        let raw_json: Value = response
            .json()
            .map_err(|err| EnrichError::LookupDecode(err.to_string()))?;
        Ok(Some(extract_record(cnpj, &raw_json)))
    }
}

pub fn build_url(template: &str, cnpj: &Cnpj) -> String {
    template.replace(CNPJ_PLACEHOLDER, cnpj.as_str())
}

/// Maps a cnpj.ws response body into a record. Missing or non-string fields
/// become empty strings; the record is keyed by the requested identifier.
pub fn extract_record(cnpj: &Cnpj, raw_json: &Value) -> EnrichmentRecord {
    let establishment = raw_json.get("estabelecimento");

    let state_registration = establishment
        .and_then(|value| value.get("inscricoes_estaduais"))
        .and_then(|value| value.as_array())
        .and_then(|array| array.first())
        .map(|entry| text_field(Some(entry), "inscricao_estadual"))
        .unwrap_or_default();

    let state = establishment
        .and_then(|value| value.get("estado"))
        .map(|value| text_field(Some(value), "sigla"))
        .unwrap_or_default();

    EnrichmentRecord {
        cnpj: cnpj.as_str().to_string(),
        state_registration,
        legal_name: text_field(Some(raw_json), "razao_social"),
        alternate_name: text_field(Some(raw_json), "nome"),
        trade_name: text_field(establishment, "nome_fantasia"),
        street: text_field(establishment, "logradouro"),
        postal_code: text_field(establishment, "cep"),
        state,
    }
}

fn text_field(object: Option<&Value>, key: &str) -> String {
    object
        .and_then(|value| value.get(key))
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_API_URL;

    #[test]
    fn url_substitution() {
        let cnpj = Cnpj::normalized("11.222.333/0001-44");
        assert_eq!(
            build_url(DEFAULT_API_URL, &cnpj),
            "https://publica.cnpj.ws/cnpj/11222333000144"
        );
    }

    #[test]
    fn empty_body_yields_empty_fields() {
        let cnpj = Cnpj::normalized("11222333000144");
        let record = extract_record(&cnpj, &serde_json::json!({}));
        assert_eq!(record.cnpj, "11222333000144");
        assert!(record.legal_name.is_empty());
        assert!(record.state_registration.is_empty());
        assert!(record.state.is_empty());
    }
}
