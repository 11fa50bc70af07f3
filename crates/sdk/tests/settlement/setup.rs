use std::{collections::HashMap, sync::Mutex, time::Duration};

use pmsettle_sdk::{
    config::PipelineConfig,
    instruction::{InstructionBundle, InstructionSpec},
    pipeline::{progress::ProgressEvent, submit::Wallet},
    pyth::{
        accumulator::{
            AccumulatorUpdateData, MerklePriceUpdate, PriceFeedMessage, Proof, MAJOR_VERSION,
        },
        Attestation, Identifier, PullOracle,
    },
    solana_utils::client::{LedgerClient, SendOptions, SimulationReport},
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    system_program,
    transaction::{TransactionError, VersionedTransaction},
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing_subscriber::EnvFilter;

/// Feed used by the fixtures.
pub const FEED: [u8; 32] = [0xe6; 32];

/// Resolution time used by the fixtures.
pub const END_TS: i64 = 1_700_000_000;

/// Slot of the price update account in the consume template.
pub const PRICE_UPDATE_INDEX: usize = 2;

/// Install a fmt subscriber for the current test.
pub fn init_tracing() -> impl Drop {
    let directives =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,pmsettle_sdk=debug".into());
    let filter = EnvFilter::builder().parse_lossy(directives);
    tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(filter)
            .finish(),
    )
}

/// Config used by the tests.
pub fn config() -> PipelineConfig {
    PipelineConfig::builder()
        .treasury_id(Some(0))
        .poll_interval(Duration::from_millis(1))
        .build()
}

/// How a mock submission fails.
#[derive(Debug, Clone)]
pub enum Failure {
    /// Processed with the given error.
    Failed(TransactionError),
    /// Never confirmed.
    Unconfirmed(&'static str),
}

#[derive(Debug, Default)]
struct LedgerState {
    blockhashes: usize,
    rent_queries: usize,
    simulations: usize,
    submitted: Vec<VersionedTransaction>,
    failures: HashMap<usize, Failure>,
}

/// In-memory ledger.
#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    /// Fail the `index`-th submission.
    pub fn fail_submission(self, index: usize, failure: Failure) -> Self {
        self.state.lock().unwrap().failures.insert(index, failure);
        self
    }

    /// Transactions submitted so far, including failed ones.
    pub fn submitted(&self) -> Vec<VersionedTransaction> {
        self.state.lock().unwrap().submitted.clone()
    }

    /// Number of simulations.
    pub fn simulations(&self) -> usize {
        self.state.lock().unwrap().simulations
    }

    /// Total number of calls.
    pub fn calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.blockhashes + state.rent_queries + state.simulations + state.submitted.len()
    }
}

impl LedgerClient for MockLedger {
    fn commitment(&self) -> CommitmentConfig {
        CommitmentConfig::confirmed()
    }

    async fn latest_blockhash(&self) -> pmsettle_sdk::solana_utils::Result<Hash> {
        self.state.lock().unwrap().blockhashes += 1;
        Ok(Hash::new_unique())
    }

    async fn rent_exempt_balance(&self, len: usize) -> pmsettle_sdk::solana_utils::Result<u64> {
        self.state.lock().unwrap().rent_queries += 1;
        Ok((len as u64 + 128) * 6_960)
    }

    async fn simulate(
        &self,
        _transaction: &VersionedTransaction,
    ) -> pmsettle_sdk::solana_utils::Result<SimulationReport> {
        self.state.lock().unwrap().simulations += 1;
        Ok(SimulationReport {
            units_consumed: Some(12_345),
            ..Default::default()
        })
    }

    async fn send_and_confirm(
        &self,
        transaction: &VersionedTransaction,
        _options: &SendOptions,
    ) -> pmsettle_sdk::solana_utils::Result<Signature> {
        let mut state = self.state.lock().unwrap();
        let index = state.submitted.len();
        state.submitted.push(transaction.clone());
        let signature = transaction.signatures[0];
        match state.failures.get(&index).cloned() {
            None => Ok(signature),
            Some(Failure::Failed(error)) => Err(
                pmsettle_sdk::SolanaUtilsError::TransactionFailed { signature, error },
            ),
            Some(Failure::Unconfirmed(reason)) => {
                Err(pmsettle_sdk::SolanaUtilsError::Unconfirmed { signature, reason })
            }
        }
    }
}

/// Behavior of a [`TestWallet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletMode {
    /// Sign normally.
    Sign,
    /// Return the transaction untouched.
    LeaveEmpty,
    /// Never answer.
    Hang,
}

/// Wallet holding a local keypair.
#[derive(Debug)]
pub struct TestWallet {
    keypair: Keypair,
    mode: WalletMode,
}

impl TestWallet {
    /// Create a wallet.
    pub fn new(mode: WalletMode) -> Self {
        Self {
            keypair: Keypair::new(),
            mode,
        }
    }
}

impl Wallet for TestWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(
        &self,
        mut transaction: VersionedTransaction,
    ) -> pmsettle_sdk::Result<VersionedTransaction> {
        match self.mode {
            WalletMode::Sign => {
                transaction.signatures[0] =
                    self.keypair.sign_message(&transaction.message.serialize());
            }
            WalletMode::LeaveEmpty => {}
            WalletMode::Hang => tokio::time::sleep(Duration::from_secs(3600)).await,
        }
        Ok(transaction)
    }
}

/// Wallet that can only tell its address.
#[derive(Debug)]
pub struct WatchOnlyWallet(pub Pubkey);

impl Wallet for WatchOnlyWallet {
    fn pubkey(&self) -> Pubkey {
        self.0
    }
}

/// Oracle serving a fixed attestation.
#[derive(Debug)]
pub struct MockOracle {
    vaa_len: usize,
    fetched: Mutex<Vec<(Identifier, i64)>>,
}

impl MockOracle {
    /// Serve an attestation whose VAA has `vaa_len` bytes.
    pub fn new(vaa_len: usize) -> Self {
        Self {
            vaa_len,
            fetched: Default::default(),
        }
    }

    /// Requests received.
    pub fn fetched(&self) -> Vec<(Identifier, i64)> {
        self.fetched.lock().unwrap().clone()
    }
}

impl PullOracle for MockOracle {
    async fn fetch_attestation(
        &self,
        feed_id: &Identifier,
        publish_time: i64,
    ) -> pmsettle_sdk::Result<Attestation> {
        self.fetched.lock().unwrap().push((*feed_id, publish_time));
        Ok(Attestation::new(
            *feed_id,
            publish_time,
            vec![accumulator_update(self.vaa_len)],
        ))
    }
}

/// Encode an accumulator update for [`FEED`] with a VAA of `vaa_len` bytes.
pub fn accumulator_update(vaa_len: usize) -> Vec<u8> {
    let mut vaa = vec![0xab; vaa_len];
    vaa[0] = 1;
    vaa[1..5].copy_from_slice(&4u32.to_be_bytes());
    let message = PriceFeedMessage {
        feed_id: FEED,
        price: 6_500_012_345_678,
        conf: 3_126_544,
        exponent: -8,
        publish_time: END_TS,
        prev_publish_time: END_TS - 1,
        ema_price: 6_499_912_345_678,
        ema_conf: 3_226_544,
    };
    AccumulatorUpdateData {
        major_version: MAJOR_VERSION,
        minor_version: 0,
        trailing: vec![],
        proof: Proof::WormholeMerkle {
            vaa,
            updates: vec![MerklePriceUpdate {
                message: message.to_bytes(),
                proof: vec![[3; 20], [4; 20]],
            }],
        },
    }
    .to_bytes()
    .unwrap()
}

/// Accounts of the consume template.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    /// Program.
    pub program: Pubkey,
    /// The market.
    pub market: Pubkey,
    /// Address in the price update slot before patching.
    pub placeholder: Pubkey,
}

impl Template {
    /// Create a template with fresh addresses.
    pub fn new() -> Self {
        Self {
            program: Pubkey::new_unique(),
            market: Pubkey::new_unique(),
            placeholder: Pubkey::new_unique(),
        }
    }

    /// The consume instruction as the server would describe it.
    ///
    /// The market, the placeholder and the system program are all wrongly flagged as signers.
    pub fn instruction(&self, user: &Pubkey) -> Instruction {
        Instruction::new_with_bytes(
            self.program,
            &[42, 1, 2, 3],
            vec![
                AccountMeta::new(*user, true),
                AccountMeta::new(self.market, true),
                AccountMeta::new_readonly(self.placeholder, true),
                AccountMeta::new_readonly(system_program::ID, true),
            ],
        )
    }

    /// A settlement bundle for `user`.
    pub fn bundle(&self, user: &Pubkey) -> InstructionBundle {
        InstructionBundle {
            ok: true,
            instructions: vec![InstructionSpec::from_instruction(&self.instruction(user))],
            price_update_index: Some(PRICE_UPDATE_INDEX),
            feed_id_hex: Some(hex::encode(FEED)),
            end_ts: Some(END_TS),
            market_id: Some(self.market.to_string()),
            error: None,
        }
    }
}

/// Progress channel.
pub fn progress() -> (
    UnboundedSender<ProgressEvent>,
    UnboundedReceiver<ProgressEvent>,
) {
    unbounded_channel()
}

/// Collect the events received so far.
pub fn drain(rx: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = vec![];
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Signature of the `index`-th submitted transaction.
pub fn signature_of(ledger: &MockLedger, index: usize) -> Signature {
    ledger.submitted()[index].signatures[0]
}

/// Returns whether `key` is a required signer of the transaction.
pub fn is_signer(transaction: &VersionedTransaction, key: &Pubkey) -> bool {
    let num_required = usize::from(transaction.message.header().num_required_signatures);
    transaction.message.static_account_keys()[..num_required].contains(key)
}
