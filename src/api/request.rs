//! Request types for the tax engine API.
//!
//! `POST /calculate` takes an [`ItemInput`] as is; the types here cover the
//! other endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::compensation::{CompensationInput, TaxpayerRegime};
use crate::models::{Currency, Money, UfCode};
use crate::orchestrator::ItemInput;

/// Request body for `POST /calculate/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Items, processed in order.
    pub items: Vec<ItemInput>,
}

/// Request body for `POST /compensation`.
///
/// Amounts are plain decimals in a single currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationRequest {
    /// Calendar year of the assessment.
    pub year: i32,
    /// Accumulated legacy-system credits.
    pub old_credits: Decimal,
    /// Legacy-system debits.
    pub old_debits: Decimal,
    /// Accumulated new-system credits.
    pub new_credits: Decimal,
    /// New-system debits.
    pub new_debits: Decimal,
    /// Currency of every amount; defaults to BRL.
    #[serde(default)]
    pub currency: Currency,
    /// The taxpayer's state.
    pub uf: UfCode,
    /// The taxpayer's regime.
    pub regime: TaxpayerRegime,
}

impl From<CompensationRequest> for CompensationInput {
    fn from(req: CompensationRequest) -> Self {
        let money = |amount| Money::new(amount, req.currency);
        CompensationInput {
            year: req.year,
            old_credits: money(req.old_credits),
            old_debits: money(req.old_debits),
            new_credits: money(req.new_credits),
            new_debits: money(req.new_debits),
            uf: req.uf,
            regime: req.regime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compensation_request_defaults_to_brl() {
        let json = r#"{
            "year": 2026,
            "old_credits": "1000",
            "old_debits": "0",
            "new_credits": "0",
            "new_debits": "600",
            "uf": "SP",
            "regime": "presumed_profit"
        }"#;
        let req: CompensationRequest = serde_json::from_str(json).unwrap();
        let input: CompensationInput = req.into();

        assert_eq!(input.old_credits.currency(), Currency::Brl);
        assert_eq!(input.new_debits.amount(), Decimal::from(600));
        assert_eq!(input.regime, TaxpayerRegime::PresumedProfit);
    }

    #[test]
    fn test_compensation_request_rejects_unknown_uf() {
        let json = r#"{
            "year": 2026,
            "old_credits": "1", "old_debits": "0",
            "new_credits": "0", "new_debits": "0",
            "uf": "XX",
            "regime": "standard"
        }"#;
        assert!(serde_json::from_str::<CompensationRequest>(json).is_err());
    }
}
