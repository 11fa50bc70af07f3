use borsh::BorshSerialize;

use crate::pyth::{accumulator::MerklePriceUpdate, InstructionData};

#[derive(BorshSerialize)]
pub(super) struct PostUpdate {
    pub(super) merkle_price_update: MerklePriceUpdate,
    pub(super) treasury_id: u8,
}

impl InstructionData for PostUpdate {
    const DISCRIMINATOR: [u8; 8] = [133, 95, 207, 175, 11, 79, 118, 44];
}

#[derive(BorshSerialize)]
pub(super) struct ReclaimRent {}

impl InstructionData for ReclaimRent {
    const DISCRIMINATOR: [u8; 8] = [218, 200, 19, 197, 227, 89, 192, 22];
}
