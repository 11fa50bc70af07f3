use borsh::BorshSerialize;

use crate::pyth::InstructionData;

#[derive(BorshSerialize)]
pub(super) struct InitEncodedVaa {}

impl InstructionData for InitEncodedVaa {
    const DISCRIMINATOR: [u8; 8] = [209, 193, 173, 25, 91, 202, 181, 218];
}

#[derive(BorshSerialize)]
pub(super) struct WriteEncodedVaa {
    pub(super) index: u32,
    pub(super) data: Vec<u8>,
}

impl InstructionData for WriteEncodedVaa {
    const DISCRIMINATOR: [u8; 8] = [199, 208, 110, 177, 150, 76, 118, 42];
}

#[derive(BorshSerialize)]
pub(super) struct VerifyEncodedVaaV1 {}

impl InstructionData for VerifyEncodedVaaV1 {
    const DISCRIMINATOR: [u8; 8] = [103, 56, 177, 229, 240, 103, 68, 73];
}

#[derive(BorshSerialize)]
pub(super) struct CloseEncodedVaa {}

impl InstructionData for CloseEncodedVaa {
    const DISCRIMINATOR: [u8; 8] = [48, 221, 174, 198, 231, 7, 152, 38];
}
