use std::sync::Arc;

use pmsettle_solana_utils::{client::LedgerClient, compute_budget::ComputeBudget, AtomicGroup};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Keypair, signer::Signer};

use crate::{
    config::PipelineConfig,
    pyth::{
        accumulator::{guardian_set_index, AccumulatorUpdateData, MerklePriceUpdate},
        receiver::PythReceiver,
        wormhole::{encoded_vaa_space, Wormhole, VAA_SPLIT_INDEX},
        Attestation,
    },
};

use super::progress::StepId;

/// One transaction of a run.
#[derive(Debug, Clone)]
pub struct TransactionPhase {
    step: StepId,
    group: AtomicGroup,
}

impl TransactionPhase {
    /// Create a new phase.
    pub fn new(step: StepId, group: AtomicGroup) -> Self {
        Self { step, group }
    }

    /// Returns the step.
    pub fn step(&self) -> StepId {
        self.step
    }

    /// Returns the instruction group.
    pub fn group(&self) -> &AtomicGroup {
        &self.group
    }
}

/// The transactions posting an attestation.
#[derive(Debug, Clone)]
pub struct PostPlan {
    phases: Vec<TransactionPhase>,
    price_update: Pubkey,
    encoded_vaa: Pubkey,
}

impl PostPlan {
    /// Returns the ordered post phases.
    pub fn phases(&self) -> &[TransactionPhase] {
        &self.phases
    }

    /// The address the price update will be posted to.
    pub fn price_update(&self) -> &Pubkey {
        &self.price_update
    }

    /// The address of the encoded VAA account.
    pub fn encoded_vaa(&self) -> &Pubkey {
        &self.encoded_vaa
    }
}

/// Builds the transactions of a run.
#[derive(Debug)]
pub struct PhaseBuilder<'a, C> {
    client: &'a C,
    payer: Pubkey,
    wormhole: Wormhole,
    receiver: PythReceiver,
    treasury_id: Option<u8>,
    post_budget: ComputeBudget,
    single_budget: ComputeBudget,
    packet_limit: usize,
}

impl<'a, C> PhaseBuilder<'a, C> {
    /// Create a builder paying with `payer`.
    pub fn new(client: &'a C, payer: Pubkey, config: &PipelineConfig) -> Self {
        Self {
            client,
            payer,
            wormhole: Wormhole::new(config.wormhole_program_id.0, payer),
            receiver: PythReceiver::new(config.receiver_program_id.0, payer),
            treasury_id: config.treasury_id,
            post_budget: config.post_compute_budget(),
            single_budget: config.resolve_compute_budget(),
            packet_limit: config.packet_limit,
        }
    }

    /// Returns the payer.
    pub fn payer(&self) -> &Pubkey {
        &self.payer
    }

    /// Build a phase holding all the given instructions in one transaction.
    pub fn single_phase(
        &self,
        step: StepId,
        instructions: impl IntoIterator<Item = Instruction>,
    ) -> TransactionPhase {
        let mut group = AtomicGroup::with_instructions(&self.payer, instructions);
        *group.compute_budget_mut() = self.single_budget;
        self.check_size(step, &group);
        TransactionPhase::new(step, group)
    }

    /// Build the phase closing the accounts of the plan, returning their rent to the payer.
    ///
    /// Must run after the price update has been consumed.
    pub fn close_phase(&self, plan: &PostPlan) -> crate::Result<TransactionPhase> {
        let close_vaa = self.wormhole.close_encoded_vaa(plan.encoded_vaa())?;
        let reclaim = self.receiver.reclaim_rent(plan.price_update())?;
        Ok(self.single_phase(StepId::PostClose, [close_vaa, reclaim]))
    }

    fn post_group(&self) -> AtomicGroup {
        let mut group = AtomicGroup::new(&self.payer);
        *group.compute_budget_mut() = self.post_budget;
        group
    }

    fn size(&self, group: &AtomicGroup) -> usize {
        group.transaction_size()
    }

    fn check_size(&self, step: StepId, group: &AtomicGroup) {
        let size = self.size(group);
        if size > self.packet_limit {
            tracing::warn!(
                %step,
                size,
                limit = self.packet_limit,
                "transaction is likely too large to be accepted"
            );
        }
    }
}

impl<C: LedgerClient> PhaseBuilder<'_, C> {
    /// Build the post plan of the attestation.
    ///
    /// The attestation is parsed before any RPC call, so a malformed attestation
    /// never reaches the ledger.
    pub async fn build_post_plan(&self, attestation: &Attestation) -> crate::Result<PostPlan> {
        let (vaa, update) = select_update(attestation)?;
        let guardian_set_index = guardian_set_index(&vaa)?;

        let encoded_vaa = Arc::new(Keypair::new());
        let price_update = Arc::new(Keypair::new());
        let treasury_id = self.treasury_id.unwrap_or_else(rand::random);

        let lamports = self
            .client
            .rent_exempt_balance(encoded_vaa_space(vaa.len()))
            .await?;

        let [create, init] =
            self.wormhole
                .create_encoded_vaa(&encoded_vaa.pubkey(), lamports, vaa.len())?;
        let split = vaa.len().min(VAA_SPLIT_INDEX);
        let (head, tail) = vaa.split_at(split);
        let write_head = self
            .wormhole
            .write_encoded_vaa(&encoded_vaa.pubkey(), 0, head)?;
        let write_tail = if tail.is_empty() {
            None
        } else {
            Some(self.wormhole.write_encoded_vaa(
                &encoded_vaa.pubkey(),
                split as u32,
                tail,
            )?)
        };
        let verify = self
            .wormhole
            .verify_encoded_vaa_v1(&encoded_vaa.pubkey(), guardian_set_index)?;
        let post = self.receiver.post_update(
            &price_update.pubkey(),
            &encoded_vaa.pubkey(),
            &update,
            treasury_id,
        )?;

        let mut single = self.post_group();
        single
            .extend([create.clone(), init.clone(), write_head.clone()]
                .into_iter()
                .chain(write_tail.clone())
                .chain([verify.clone(), post.clone()]));
        single
            .add_owned_signer(encoded_vaa.clone())
            .add_owned_signer(price_update.clone());

        let phases = if self.size(&single) <= self.packet_limit {
            tracing::debug!(vaa_len = vaa.len(), "posting the attestation in one transaction");
            vec![TransactionPhase::new(StepId::PostWrite, single)]
        } else {
            tracing::debug!(
                vaa_len = vaa.len(),
                split,
                "splitting the attestation into two transactions"
            );
            let mut first = self.post_group();
            first.extend([create, init, write_head]);
            first.add_owned_signer(encoded_vaa.clone());
            self.check_size(StepId::PostInit, &first);

            let mut second = self.post_group();
            second.extend(write_tail.into_iter().chain([verify, post]));
            second.add_owned_signer(price_update.clone());
            self.check_size(StepId::PostWrite, &second);

            vec![
                TransactionPhase::new(StepId::PostInit, first),
                TransactionPhase::new(StepId::PostWrite, second),
            ]
        };

        Ok(PostPlan {
            phases,
            price_update: price_update.pubkey(),
            encoded_vaa: encoded_vaa.pubkey(),
        })
    }
}

fn select_update(attestation: &Attestation) -> crate::Result<(Vec<u8>, MerklePriceUpdate)> {
    let feed_id = attestation.feed_id();
    for data in attestation.data() {
        let data = AccumulatorUpdateData::try_from_slice(data)?;
        if let Some(update) = data.find_price_update(feed_id) {
            if let Ok(message) = update.price_feed_message() {
                tracing::debug!(
                    ?feed_id,
                    price = message.price,
                    conf = message.conf,
                    exponent = message.exponent,
                    publish_time = message.publish_time,
                    requested = attestation.publish_time(),
                    "selected price update"
                );
            }
            return Ok((data.vaa().to_vec(), update.clone()));
        }
    }
    Err(crate::Error::no_attestation_data(format!(
        "feed {feed_id:?} is not present in the attestation"
    )))
}
