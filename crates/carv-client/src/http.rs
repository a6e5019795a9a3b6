//! JSON-RPC over HTTP backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use carv_codec::{address_to_bytes, bytes_to_address};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::config::{Commitment, DirectoryConfig};
use crate::error::RpcError;
use crate::rpc::{AccountFilter, ProgramAccount, SolanaRpc};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Responses wrapped in `{ "context": ..., "value": ... }`.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct UiAccount {
    /// `[payload, encoding]`
    data: (String, String),
}

#[derive(Debug, Deserialize)]
struct KeyedUiAccount {
    pubkey: String,
    account: UiAccount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    err: Option<Value>,
    confirmation_status: Option<String>,
}

/// Talks to a Solana cluster over HTTP JSON-RPC.
#[derive(Clone, Debug)]
pub struct HttpRpc {
    client: Client,
    endpoint: Url,
    commitment: Commitment,
    request_id: Arc<AtomicU64>,
}

impl HttpRpc {
    pub fn new(endpoint: Url, commitment: Commitment, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            commitment,
            request_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn from_config(config: &DirectoryConfig) -> Result<Self, RpcError> {
        Self::new(
            config.rpc_url.clone(),
            config.commitment,
            config.request_timeout,
        )
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn send_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_request_id(),
            method,
            params,
        };
        tracing::trace!("request: {:?}", request);

        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(method, status = status.as_u16(), "rpc http failure");
            return Err(RpcError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        tracing::trace!("response: {:?}", body);

        let rpc_response: JsonRpcResponse<T> = serde_json::from_str(&body)
            .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(error) = rpc_response.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| RpcError::InvalidResponse(format!("{method}: missing result")))
    }

    fn commitment_config(&self) -> Value {
        json!({ "commitment": self.commitment.as_str() })
    }
}

fn decode_account_data(account: &UiAccount) -> Result<Vec<u8>, RpcError> {
    let (payload, encoding) = &account.data;
    if encoding != "base64" {
        return Err(RpcError::InvalidResponse(format!(
            "unexpected account encoding `{encoding}`"
        )));
    }
    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| RpcError::InvalidResponse(format!("account data: {e}")))
}

fn filter_to_json(filter: &AccountFilter) -> Value {
    match filter {
        AccountFilter::Memcmp { offset, bytes } => json!({
            "memcmp": { "offset": offset, "bytes": bs58::encode(bytes).into_string() }
        }),
        AccountFilter::DataSize(size) => json!({ "dataSize": size }),
    }
}

impl SolanaRpc for HttpRpc {
    async fn get_account(&self, address: &[u8; 32]) -> Result<Option<Vec<u8>>, RpcError> {
        let params = json!([
            bytes_to_address(address),
            { "encoding": "base64", "commitment": self.commitment.as_str() }
        ]);
        let response: WithContext<Option<UiAccount>> =
            self.send_request("getAccountInfo", params).await?;
        response.value.as_ref().map(decode_account_data).transpose()
    }

    async fn get_program_accounts(
        &self,
        program_id: &[u8; 32],
        filters: &[AccountFilter],
    ) -> Result<Vec<ProgramAccount>, RpcError> {
        let filters: Vec<Value> = filters.iter().map(filter_to_json).collect();
        let params = json!([
            bytes_to_address(program_id),
            {
                "encoding": "base64",
                "commitment": self.commitment.as_str(),
                "filters": filters,
            }
        ]);
        let accounts: Vec<KeyedUiAccount> =
            self.send_request("getProgramAccounts", params).await?;

        accounts
            .iter()
            .map(|keyed| {
                let pubkey = address_to_bytes(&keyed.pubkey)
                    .map_err(|e| RpcError::InvalidResponse(format!("pubkey: {e}")))?;
                Ok(ProgramAccount {
                    pubkey,
                    data: decode_account_data(&keyed.account)?,
                })
            })
            .collect()
    }

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let response: WithContext<BlockhashValue> = self
            .send_request("getLatestBlockhash", json!([self.commitment_config()]))
            .await?;
        address_to_bytes(&response.value.blockhash)
            .map_err(|e| RpcError::InvalidResponse(format!("blockhash: {e}")))
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        let params = json!([
            general_purpose::STANDARD.encode(wire),
            { "encoding": "base64", "preflightCommitment": self.commitment.as_str() }
        ]);
        let signature: String = self.send_request("sendTransaction", params).await?;
        tracing::debug!(%signature, "transaction submitted");
        Ok(signature)
    }

    async fn confirm_transaction(&self, signature: &str) -> Result<bool, RpcError> {
        let params = json!([[signature], { "searchTransactionHistory": false }]);
        let response: WithContext<Vec<Option<SignatureStatus>>> =
            self.send_request("getSignatureStatuses", params).await?;

        match response.value.into_iter().next().flatten() {
            None => Ok(false),
            Some(SignatureStatus { err: Some(err), .. }) => {
                Err(RpcError::TransactionFailed(err.to_string()))
            }
            Some(SignatureStatus {
                confirmation_status,
                ..
            }) => Ok(confirmation_status
                .as_deref()
                .is_some_and(|s| self.commitment.is_reached_by(s))),
        }
    }

    async fn get_balance(&self, address: &[u8; 32]) -> Result<u64, RpcError> {
        let params = json!([bytes_to_address(address), self.commitment_config()]);
        let response: WithContext<u64> = self.send_request("getBalance", params).await?;
        Ok(response.value)
    }
}
