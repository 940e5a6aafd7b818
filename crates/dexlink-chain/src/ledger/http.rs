use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use dexlink_core::{Account, AdapterConfig, Block, OutboundTransactionRecord, SortOrder};

use super::{LedgerError, LedgerQueryService};

#[derive(Serialize)]
struct InvokeRequest {
    procedure: String,
    data: Value,
}

#[derive(Deserialize)]
struct InvokeResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

/// Ledger Query Service reached over HTTP.
///
/// Every query is a `POST {endpoint}/invoke` naming a module procedure, e.g.
/// `ark:getOutboundTransactions`.
pub struct HttpLedgerService {
    client: reqwest::Client,
    endpoint: String,
    module_alias: String,
}

impl HttpLedgerService {
    pub fn new(config: &AdapterConfig) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(config.ledger.request_timeout())
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.ledger.endpoint.trim_end_matches('/').to_string(),
            module_alias: config.chain.module_alias.clone(),
        })
    }

    /// Fully qualified procedure name for an action.
    pub fn procedure(&self, action: &str) -> String {
        format!("{}:{}", self.module_alias, action)
    }

    async fn invoke<T: DeserializeOwned>(&self, action: &str, data: Value) -> Result<T, LedgerError> {
        let url = format!("{}/invoke", self.endpoint);
        let body = InvokeRequest {
            procedure: self.procedure(action),
            data,
        };
        tracing::trace!(procedure = %body.procedure, "invoking ledger procedure");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Service(format!("HTTP {}: {}", status, text)));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        decode_response(&bytes)
    }
}

/// Decode an `/invoke` response body.
fn decode_response<T: DeserializeOwned>(body: &[u8]) -> Result<T, LedgerError> {
    let parsed: InvokeResponse<T> =
        serde_json::from_slice(body).map_err(|e| LedgerError::Malformed(e.to_string()))?;
    match (parsed.result, parsed.error) {
        (_, Some(error)) => Err(LedgerError::Service(error)),
        (Some(result), None) => Ok(result),
        (None, None) => Err(LedgerError::Malformed(
            "response carries neither result nor error".into(),
        )),
    }
}

#[async_trait]
impl LedgerQueryService for HttpLedgerService {
    async fn get_account(&self, address: &str) -> Result<Account, LedgerError> {
        self.invoke("getAccount", json!({ "walletAddress": address }))
            .await
    }

    async fn get_block_at_height(&self, height: u64) -> Result<Block, LedgerError> {
        self.invoke("getBlockAtHeight", json!({ "height": height }))
            .await
    }

    async fn get_outbound_transactions(
        &self,
        address: &str,
        from_timestamp: u64,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<OutboundTransactionRecord>, LedgerError> {
        self.invoke(
            "getOutboundTransactions",
            json!({
                "walletAddress": address,
                "fromTimestamp": from_timestamp,
                "limit": limit,
                "order": order,
            }),
        )
        .await
    }

    async fn get_outbound_transactions_from_block(
        &self,
        address: &str,
        block_id: &str,
    ) -> Result<Vec<OutboundTransactionRecord>, LedgerError> {
        self.invoke(
            "getOutboundTransactionsFromBlock",
            json!({ "walletAddress": address, "blockId": block_id }),
        )
        .await
    }

    async fn get_blocks_between_heights(
        &self,
        from_height: u64,
        limit: usize,
    ) -> Result<Vec<Block>, LedgerError> {
        self.invoke(
            "getBlocksBetweenHeights",
            json!({ "fromHeight": from_height, "limit": limit }),
        )
        .await
    }
}
