use eyre::OptionExt;
use serde::Deserialize;

use crate::common::{address::Address, block::BlockContext, word::Word};

const MIN_BLOB_BASE_FEE: u64 = 1;
const BLOB_BASE_FEE_UPDATE_FRACTION: u64 = 3338477;

/// Minimal JSON-RPC client for assembling a `BlockContext` from a live
/// node. The engine itself never talks to the network; this is the
/// reference host-side acquisition path.
pub struct EthClient {
    http: reqwest::blocking::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    number: Word,
    timestamp: Word,
    #[serde(rename = "miner")]
    coinbase: Address,
    #[serde(rename = "baseFeePerGas", default)]
    base_fee: Word,
    #[serde(rename = "gasLimit")]
    gas_limit: Word,
    #[serde(rename = "mixHash")]
    prevrandao: Word,
    #[serde(rename = "excessBlobGas", default)]
    excess_blob_gas: Word,
}

impl EthClient {
    pub fn new(url: &str) -> eyre::Result<Self> {
        let http = reqwest::blocking::ClientBuilder::new().build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    /// Fetch the latest header and chain id, and derive the block context
    /// fields the engine exposes through the BLOCK* opcodes.
    pub fn latest_context(&self) -> eyre::Result<BlockContext> {
        let header = self.rpc(serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_getBlockByNumber",
            "params": ["latest", false],
            "id": 0
        }))?;
        let header: RawHeader = serde_json::from_value(header)?;

        let chain_id = self.rpc(serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_chainId",
            "params": [],
            "id": 0
        }))?;
        let chain_id = chain_id
            .as_str()
            .ok_or_eyre("chain id missing")
            .and_then(Word::from_hex)?;

        Ok(BlockContext {
            number: header.number,
            timestamp: header.timestamp,
            coinbase: header.coinbase,
            base_fee: header.base_fee,
            chain_id,
            gas_limit: header.gas_limit,
            prevrandao: header.prevrandao,
            blob_base_fee: blob_base_fee(header.excess_blob_gas.as_u64()),
            blob_hashes: Vec::new(),
        })
    }

    fn rpc(&self, body: serde_json::Value) -> eyre::Result<serde_json::Value> {
        let res = self.http.post(&self.url).json(&body).send()?;

        let status = res.status();
        if !status.is_success() {
            tracing::error!(code = status.as_u16(), "rpc call failed");
            eyre::bail!("rpc status {status}");
        }

        let response: serde_json::Value = res.json()?;
        if let Some(error) = response.get("error").filter(|error| !error.is_null()) {
            eyre::bail!("rpc error: '{error}'");
        }
        Ok(response["result"].clone())
    }
}

/// EIP-4844 blob base fee from the excess blob gas of the head block.
fn blob_base_fee(excess_blob_gas: u64) -> Word {
    Word::from(fake_exponential(
        MIN_BLOB_BASE_FEE,
        excess_blob_gas,
        BLOB_BASE_FEE_UPDATE_FRACTION,
    ))
}

fn fake_exponential(factor: u64, numerator: u64, denominator: u64) -> u64 {
    let mut i: u128 = 1;
    let mut output: u128 = 0;
    let mut accum: u128 = factor as u128 * denominator as u128;
    while accum > 0 && i < 10_000 {
        output += accum;
        accum = (accum * numerator as u128) / (denominator as u128 * i);
        i += 1;
    }
    (output / denominator as u128) as u64
}
