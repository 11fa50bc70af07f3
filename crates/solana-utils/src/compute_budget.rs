use solana_sdk::{compute_budget::ComputeBudgetInstruction, instruction::Instruction};

/// Compute budget of one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudget {
    limit_units: u32,
    price_micro_lamports: u64,
}

impl Default for ComputeBudget {
    fn default() -> Self {
        Self {
            limit_units: Self::DEFAULT_LIMIT_UNITS,
            price_micro_lamports: 0,
        }
    }
}

impl ComputeBudget {
    /// Default compute unit limit.
    pub const DEFAULT_LIMIT_UNITS: u32 = 200_000;

    /// Set compute units limit.
    #[inline]
    pub fn with_limit(mut self, units: u32) -> Self {
        self.limit_units = units;
        self
    }

    /// Set compute unit price.
    #[inline]
    pub fn with_price(mut self, micro_lamports: u64) -> Self {
        self.price_micro_lamports = micro_lamports;
        self
    }

    /// Build compute budget instructions.
    ///
    /// The price instruction is omitted when the price is zero.
    pub fn compute_budget_instructions(&self) -> Vec<Instruction> {
        let mut ixs = vec![ComputeBudgetInstruction::set_compute_unit_limit(
            self.limit_units,
        )];
        if self.price_micro_lamports != 0 {
            ixs.push(ComputeBudgetInstruction::set_compute_unit_price(
                self.price_micro_lamports,
            ));
        }
        ixs
    }

    /// Get compute unit limit.
    pub fn limit(&self) -> u32 {
        self.limit_units
    }

    /// Get compute unit price in micro lamports.
    pub fn price(&self) -> u64 {
        self.price_micro_lamports
    }
}
