// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use async_trait::async_trait;
use reqwest::Client;

use crate::api::{PersonaQuery, PersonaRecord};
use crate::errors::RegistryError;

/// Source of authoritative persona-to-signer bindings.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn query_persona(&self, query: &PersonaQuery) -> Result<PersonaRecord, RegistryError>;
}

#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    base_url: String,
    client: Client,
}

impl HttpRegistryClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn query_persona(&self, query: &PersonaQuery) -> Result<PersonaRecord, RegistryError> {
        let url = format!("{}/v1/persona/query", self.base_url);
        let resp = self.client.post(&url).json(query).send().await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RegistryError::Status(resp.status().as_u16()));
        }

        let record: PersonaRecord = resp.json().await
            .map_err(|e| RegistryError::Schema(e.to_string()))?;
        if record.persona != query.persona {
            return Err(RegistryError::Schema(format!(
                "asked for persona {:?}, got {:?}",
                query.persona, record.persona
            )));
        }
        record.validate()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use tessera_kernel::proof::MerkleProof;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn record(persona: &str, root_len: usize) -> PersonaRecord {
        PersonaRecord {
            persona: persona.to_string(),
            signers: vec![vec![7; 32]],
            expires_at: 60_000,
            version: 3,
            proof: MerkleProof::default(),
            root: vec![1; root_len],
        }
    }

    #[tokio::test]
    async fn test_query_roundtrip() {
        let router = Router::new().route(
            "/v1/persona/query",
            post(|Json(q): Json<PersonaQuery>| async move { Json(record(&q.persona, 32)) }),
        );
        let client = HttpRegistryClient::new(serve(router).await);
        assert!(!client.base_url().ends_with('/'));

        let got = client
            .query_persona(&PersonaQuery { persona: "alice".into(), timestamp: 1 })
            .await
            .unwrap();
        assert_eq!(got, record("alice", 32));
    }

    #[tokio::test]
    async fn test_invalid_response_rejected() {
        let router = Router::new().route(
            "/v1/persona/query",
            post(|| async { Json(record("alice", 5)) }),
        );
        let client = HttpRegistryClient::new(serve(router).await);
        let err = client
            .query_persona(&PersonaQuery { persona: "alice".into(), timestamp: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Schema(_)));

        let err = client
            .query_persona(&PersonaQuery { persona: "bob".into(), timestamp: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Schema(_)));
    }

    #[tokio::test]
    async fn test_error_status_surfaces() {
        let client = HttpRegistryClient::new(serve(Router::new()).await);
        let err = client
            .query_persona(&PersonaQuery { persona: "alice".into(), timestamp: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Status(404)));
    }
}
