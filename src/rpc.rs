//! JSON-RPC over HTTP chain client
//!
//! Signing and nonce management stay with the node's wallet: writes go
//! through `eth_sendTransaction` with the connected account as `from`.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes, B256};
use serde_json::{json, Value};

use crate::chain::{BlockInfo, ChainClient, Log, LogFilter, TransactionReceipt, TransactionRequest};
use crate::error::PiggyBankError;

/// Stateless per call; `reqwest::Client` is internally Arc-based.
#[derive(Debug)]
pub struct JsonRpcClient {
    http_client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Debug)]
enum RpcFailure {
    Transport(String),
    Rpc { code: i64, message: String },
}

impl RpcFailure {
    fn into_network(self) -> PiggyBankError {
        match self {
            Self::Transport(msg) => PiggyBankError::network(msg),
            Self::Rpc { code, message } => {
                PiggyBankError::network(format!("RPC error {}: {}", code, message))
            }
        }
    }

    fn into_transaction(self) -> PiggyBankError {
        match self {
            Self::Transport(msg) => PiggyBankError::network(msg),
            Self::Rpc { message, .. } => PiggyBankError::transaction(message),
        }
    }
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        log::debug!("RPC {} #{}", method, id);

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcFailure::Transport(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(RpcFailure::Transport(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| RpcFailure::Transport(format!("{} invalid response: {}", method, e)))?;

        parse_response(payload)
    }
}

fn parse_response(payload: Value) -> Result<Value, RpcFailure> {
    if let Some(error) = payload.get("error") {
        return Err(RpcFailure::Rpc {
            code: error["code"].as_i64().unwrap_or(0),
            message: error["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    Ok(payload.get("result").cloned().unwrap_or(Value::Null))
}

fn quantity(n: u64) -> String {
    format!("0x{:x}", n)
}

pub(crate) fn parse_quantity(value: &Value) -> Option<u64> {
    let s = value.as_str()?;
    u64::from_str_radix(s.strip_prefix("0x")?, 16).ok()
}

fn parse_bytes(value: &Value) -> Result<Bytes, PiggyBankError> {
    let s = value
        .as_str()
        .ok_or_else(|| PiggyBankError::network("expected hex data in RPC result"))?;
    let raw = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| PiggyBankError::network(format!("invalid hex in RPC result: {}", e)))?;
    Ok(Bytes::from(raw))
}

fn parse_b256(value: &Value) -> Option<B256> {
    value.as_str()?.parse().ok()
}

pub(crate) fn parse_receipt(value: &Value) -> Option<TransactionReceipt> {
    if value.is_null() {
        return None;
    }
    Some(TransactionReceipt {
        transaction_hash: parse_b256(&value["transactionHash"])?,
        success: parse_quantity(&value["status"]) == Some(1),
        block_number: parse_quantity(&value["blockNumber"]),
    })
}

pub(crate) fn parse_log(value: &Value) -> Option<Log> {
    let address = value["address"].as_str()?.parse().ok()?;
    let topics = value["topics"]
        .as_array()?
        .iter()
        .filter_map(parse_b256)
        .collect();
    let data = parse_bytes(&value["data"]).ok()?;
    Some(Log {
        address,
        topics,
        data,
        block_number: parse_quantity(&value["blockNumber"]),
        transaction_hash: parse_b256(&value["transactionHash"]),
        log_index: parse_quantity(&value["logIndex"]),
    })
}

impl ChainClient for JsonRpcClient {
    async fn call(
        &self,
        to: Address,
        from: Option<Address>,
        data: Bytes,
    ) -> Result<Bytes, PiggyBankError> {
        let mut call = json!({ "to": to, "data": data });
        if let Some(from) = from {
            call["from"] = json!(from);
        }
        let result = self
            .request("eth_call", json!([call, "latest"]))
            .await
            .map_err(RpcFailure::into_network)?;
        parse_bytes(&result)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, PiggyBankError> {
        let params = json!([{
            "from": tx.from,
            "to": tx.to,
            "value": tx.value,
            "data": tx.input,
        }]);
        let result = self
            .request("eth_sendTransaction", params)
            .await
            .map_err(RpcFailure::into_transaction)?;
        parse_b256(&result)
            .ok_or_else(|| PiggyBankError::transaction("wallet returned no transaction hash"))
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, PiggyBankError> {
        let result = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await
            .map_err(RpcFailure::into_network)?;
        Ok(parse_receipt(&result))
    }

    async fn logs(&self, filter: LogFilter) -> Result<Vec<Log>, PiggyBankError> {
        let params = json!([{
            "address": filter.address,
            "topics": [filter.event_topics],
            "fromBlock": quantity(filter.from_block),
            "toBlock": quantity(filter.to_block),
        }]);
        let result = self
            .request("eth_getLogs", params)
            .await
            .map_err(RpcFailure::into_network)?;
        let entries = result
            .as_array()
            .ok_or_else(|| PiggyBankError::network("eth_getLogs returned no array"))?;

        Ok(entries
            .iter()
            .filter_map(|entry| {
                let log = parse_log(entry);
                if log.is_none() {
                    log::warn!("Skipping malformed log entry: {}", entry);
                }
                log
            })
            .collect())
    }

    async fn block_number(&self) -> Result<u64, PiggyBankError> {
        let result = self
            .request("eth_blockNumber", json!([]))
            .await
            .map_err(RpcFailure::into_network)?;
        parse_quantity(&result).ok_or_else(|| PiggyBankError::network("invalid block number"))
    }

    async fn latest_block(&self) -> Result<BlockInfo, PiggyBankError> {
        let result = self
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await
            .map_err(RpcFailure::into_network)?;
        let number = parse_quantity(&result["number"]);
        let timestamp = parse_quantity(&result["timestamp"]);
        match (number, timestamp) {
            (Some(number), Some(timestamp)) => Ok(BlockInfo { number, timestamp }),
            _ => Err(PiggyBankError::network("latest block missing number or timestamp")),
        }
    }

    async fn chain_id(&self) -> Result<u64, PiggyBankError> {
        let result = self
            .request("eth_chainId", json!([]))
            .await
            .map_err(RpcFailure::into_network)?;
        parse_quantity(&result).ok_or_else(|| PiggyBankError::network("invalid chain id"))
    }

    async fn code(&self, address: Address) -> Result<Bytes, PiggyBankError> {
        let result = self
            .request("eth_getCode", json!([address, "latest"]))
            .await
            .map_err(RpcFailure::into_network)?;
        parse_bytes(&result)
    }
}
