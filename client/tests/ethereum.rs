//! `EthereumSwapContract` against a minimal in-process JSON-RPC node.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ethers::abi::{encode, Token};
use ethers::providers::{Http, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TxHash, U256, U64};
use serde_json::{json, Value};
use swapkit_client::contract::ethereum::swap_contract_abi;
use swapkit_client::{
    ClientError, EthereumSwapContract, PendingSwap, SwapClient, SwapContract, TxEvent,
};
use swapkit_core::{
    CreateSwapParams, FailurePhase, GasOverrides, Operation, SwapCall, SwapIntent,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

type Handler = dyn Fn(&str, &Value) -> Option<Value> + Send + Sync;
type Calls = Arc<Mutex<Vec<(String, Value)>>>;

fn contract_address() -> Address {
    Address::repeat_byte(0x95)
}

fn node_account() -> Address {
    Address::repeat_byte(0xaa)
}

fn tx_hash() -> TxHash {
    TxHash::repeat_byte(0x77)
}

fn stored_intent() -> SwapIntent {
    let mut params = CreateSwapParams::new(Address::repeat_byte(0xcc));
    params.maker_value = U256::from(5_000u64);
    params.taker_value = U256::from(2_500u64);
    let mut intent = SwapIntent::proposal(node_account(), &params);
    intent.id = U256::from(7);
    intent
}

/// HTTP JSON-RPC endpoint answering from `handler`; `None` is a method error.
struct FakeNode {
    url: String,
    calls: Calls,
}

impl FakeNode {
    async fn start<H>(handler: H) -> Self
    where
        H: Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let calls: Calls = Default::default();
        let handler: Arc<Handler> = Arc::new(handler);

        let recorded = Arc::clone(&calls);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&handler), Arc::clone(&recorded)));
            }
        });
        Self { url, calls }
    }

    fn provider(&self) -> Provider<Http> {
        Provider::<Http>::try_from(self.url.as_str())
            .unwrap()
            .interval(Duration::from_millis(10))
    }

    fn methods(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    fn last_params(&self, method: &str) -> Value {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .unwrap_or_else(|| panic!("{method} was never called"))
    }
}

async fn serve(stream: TcpStream, handler: Arc<Handler>, calls: Calls) {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
            return;
        }
        let mut length = 0;
        loop {
            line.clear();
            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                return;
            }
            let header = line.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut body = vec![0u8; length];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }

        let request: Value = serde_json::from_slice(&body).unwrap();
        let method = request["method"].as_str().unwrap_or_default().to_string();
        let params = request["params"].clone();
        calls.lock().unwrap().push((method.clone(), params.clone()));

        let mut response = json!({ "jsonrpc": "2.0", "id": request["id"] });
        match handler(&method, &params) {
            Some(result) => response["result"] = result,
            None => {
                response["error"] = json!({ "code": -32601, "message": format!("{method} not supported") })
            }
        }
        let body = response.to_string();
        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n",
            body.len()
        );
        if write.write_all(head.as_bytes()).await.is_err()
            || write.write_all(body.as_bytes()).await.is_err()
        {
            return;
        }
    }
}

#[derive(Clone, Copy)]
enum Outcome {
    Success,
    Reverted,
    Dropped,
}

fn mined_tx(hash: &Value) -> Value {
    json!({
        "hash": hash,
        "nonce": "0x0",
        "blockHash": TxHash::repeat_byte(0xbb),
        "blockNumber": "0xa",
        "transactionIndex": "0x0",
        "from": node_account(),
        "to": contract_address(),
        "value": "0x0",
        "gasPrice": "0x3b9aca00",
        "gas": "0x1e8480",
        "input": "0x",
        "v": "0x1b",
        "r": "0x1",
        "s": "0x1"
    })
}

fn receipt(hash: &Value, status: &str) -> Value {
    json!({
        "transactionHash": hash,
        "transactionIndex": "0x0",
        "blockHash": TxHash::repeat_byte(0xbb),
        "blockNumber": "0xa",
        "from": node_account(),
        "to": contract_address(),
        "cumulativeGasUsed": "0x5208",
        "gasUsed": "0x5208",
        "contractAddress": null,
        "logs": [],
        "logsBloom": format!("0x{}", "0".repeat(512)),
        "status": status,
        "type": "0x0",
        "effectiveGasPrice": "0x3b9aca00"
    })
}

fn selector(name: &str) -> [u8; 4] {
    swap_contract_abi()
        .unwrap()
        .function(name)
        .unwrap()
        .short_signature()
}

fn eth_call(request: &Value) -> Option<Value> {
    let input = request["input"].as_str().or(request["data"].as_str())?;
    let input: Bytes = input.parse().ok()?;
    let output = match &input[..4] {
        s if s == selector("payment") => encode(&[
            Token::Bool(true),
            Token::Bool(false),
            Token::Uint(U256::from(1_000u64)),
            Token::Uint(U256::from(250u64)),
            Token::Uint(U256::from(10_000u64)),
        ]),
        s if s == selector("getSwapIntentByAddress") => encode(&[stored_intent().to_token()]),
        _ => return None,
    };
    Some(json!(Bytes::from(output)))
}

/// A node that mines every transaction with the given outcome.
fn chain(outcome: Outcome) -> impl Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static {
    move |method, params| match method {
        "eth_chainId" => Some(json!("0x4")),
        "eth_accounts" => Some(json!([node_account()])),
        "eth_gasPrice" => Some(json!("0x3b9aca00")),
        "eth_getTransactionCount" => Some(json!("0x0")),
        "eth_blockNumber" => Some(json!("0x14")),
        "eth_sendTransaction" | "eth_sendRawTransaction" => Some(json!(tx_hash())),
        "eth_getTransactionByHash" => match outcome {
            Outcome::Dropped => Some(Value::Null),
            _ => Some(mined_tx(&params[0])),
        },
        "eth_getTransactionReceipt" => match outcome {
            Outcome::Success => Some(receipt(&params[0], "0x1")),
            Outcome::Reverted => Some(receipt(&params[0], "0x0")),
            Outcome::Dropped => Some(Value::Null),
        },
        "eth_call" => eth_call(&params[0]),
        _ => None,
    }
}

async fn contract(node: &FakeNode, wallet: Option<LocalWallet>) -> EthereumSwapContract {
    EthereumSwapContract::connect(node.provider(), contract_address(), wallet)
        .await
        .unwrap()
}

fn pending() -> PendingSwap {
    PendingSwap {
        tx_hash: tx_hash(),
        operation: Operation::CancelSwap,
    }
}

#[tokio::test]
async fn reads_decode_contract_tuples() {
    let node = FakeNode::start(chain(Outcome::Success)).await;
    let contract = contract(&node, None).await;

    let payment = contract.payment().await.unwrap();
    assert!(payment.flag_flat_fee);
    assert!(!payment.flag_royalties);
    assert_eq!(payment.flat_fee, U256::from(1_000u64));
    assert_eq!(payment.bps, U256::from(250u64));
    assert_eq!(payment.scale_percent, U256::from(10_000u64));

    let intent = contract
        .swap_intent(node_account(), U256::from(7))
        .await
        .unwrap();
    assert_eq!(intent, stored_intent());

    assert_eq!(contract.sender().await.unwrap(), node_account());
}

#[tokio::test]
async fn failed_read_names_the_method() {
    let node = FakeNode::start(|method, params| match method {
        "eth_call" => None,
        other => chain(Outcome::Success)(other, params),
    })
    .await;
    let contract = contract(&node, None).await;

    let err = contract.reference_addresses().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::ContractRead {
            method: "referenceAddress",
            ..
        }
    ));
}

#[tokio::test]
async fn sender_requires_a_node_account() {
    let node = FakeNode::start(|method, params| match method {
        "eth_accounts" => Some(json!([])),
        other => chain(Outcome::Success)(other, params),
    })
    .await;
    let contract = contract(&node, None).await;
    assert!(matches!(contract.sender().await, Err(ClientError::NoAccount)));
}

#[tokio::test]
async fn submit_without_wallet_sends_through_node() {
    let node = FakeNode::start(chain(Outcome::Success)).await;
    let contract = contract(&node, None).await;

    let call = SwapCall::CancelSwapIntent {
        swap_id: U256::from(3),
    };
    let pending = contract
        .submit(&call, U256::from(42u64), GasOverrides::default())
        .await
        .unwrap();
    assert_eq!(pending.tx_hash, tx_hash());
    assert_eq!(pending.operation, Operation::CancelSwap);

    let tx = &node.last_params("eth_sendTransaction")[0];
    let from: Address = serde_json::from_value(tx["from"].clone()).unwrap();
    let to: Address = serde_json::from_value(tx["to"].clone()).unwrap();
    let value: U256 = serde_json::from_value(tx["value"].clone()).unwrap();
    let gas: U256 = serde_json::from_value(tx["gas"].clone()).unwrap();
    assert_eq!(from, node_account());
    assert_eq!(to, contract_address());
    assert_eq!(value, U256::from(42u64));
    assert_eq!(gas, U256::from(2_000_000u64));

    let data = tx["input"].as_str().or(tx["data"].as_str()).unwrap();
    let data: Bytes = data.parse().unwrap();
    assert_eq!(&data[..4], &selector("cancelSwapIntent")[..]);
    assert!(!node.methods().contains(&"eth_sendRawTransaction".to_string()));
}

#[tokio::test]
async fn submit_with_wallet_signs_locally() {
    let node = FakeNode::start(chain(Outcome::Success)).await;
    let wallet: LocalWallet = KEY.parse().unwrap();
    let signer = wallet.address();
    let contract = contract(&node, Some(wallet)).await;

    assert_eq!(contract.sender().await.unwrap(), signer);

    let call = SwapCall::EditCounterPart {
        swap_id: U256::from(3),
        taker: Address::repeat_byte(9),
    };
    let pending = contract
        .submit(&call, U256::zero(), GasOverrides::default())
        .await
        .unwrap();
    assert_eq!(pending.tx_hash, tx_hash());

    let methods = node.methods();
    assert!(methods.contains(&"eth_chainId".to_string()));
    assert!(methods.contains(&"eth_sendRawTransaction".to_string()));
    assert!(!methods.contains(&"eth_sendTransaction".to_string()));
    assert!(!methods.contains(&"eth_accounts".to_string()));
}

#[tokio::test]
async fn confirm_returns_mined_receipt() {
    let node = FakeNode::start(chain(Outcome::Success)).await;
    let contract = contract(&node, None).await;

    let receipt = contract.confirm(&pending(), 3).await.unwrap();
    assert_eq!(receipt.transaction_hash, tx_hash());
    assert_eq!(receipt.status, Some(U64::one()));
    assert_eq!(receipt.block_number, Some(U64::from(10)));
}

#[tokio::test]
async fn confirm_rejects_reverted_receipt() {
    let node = FakeNode::start(chain(Outcome::Reverted)).await;
    let contract = contract(&node, None).await;

    let err = contract.confirm(&pending(), 3).await.unwrap_err();
    assert!(matches!(err, ClientError::TxReverted(hash) if hash == tx_hash()));
}

#[tokio::test]
async fn confirm_reports_dropped_transaction() {
    let node = FakeNode::start(chain(Outcome::Dropped)).await;
    let contract = contract(&node, None).await;

    let err = contract.confirm(&pending(), 1).await.unwrap_err();
    assert!(matches!(err, ClientError::TxDropped(hash) if hash == tx_hash()));
}

#[tokio::test]
async fn reverted_write_emits_confirmation_error() {
    let node = FakeNode::start(chain(Outcome::Reverted)).await;
    let client = SwapClient::new(contract(&node, None).await);

    let log: Arc<Mutex<Vec<String>>> = Default::default();
    for name in [
        "cancelSwapTransactionCreated",
        "cancelSwapTransactionMined",
        "cancelSwapTransactionError",
    ] {
        let log = Arc::clone(&log);
        client
            .on(name, move |event| {
                let entry = match event {
                    TxEvent::Failed { phase, .. } => format!("{name}:{phase}"),
                    _ => name.to_string(),
                };
                log.lock().unwrap().push(entry);
            })
            .unwrap();
    }

    let err = client.cancel_swap(U256::from(3), None).await.unwrap_err();
    assert_eq!(err.phase(), Some(FailurePhase::Confirmation));
    assert_eq!(
        *log.lock().unwrap(),
        [
            "cancelSwapTransactionCreated",
            "cancelSwapTransactionError:confirmationError"
        ]
    );
}
