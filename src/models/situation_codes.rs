//! Tax situation codes.
//!
//! Fiscal documents describe the treatment of each operation with a
//! numeric code:
//!
//! - [`LegacySituationCode`] - CST ICMS: one origin digit plus a two-digit
//!   taxation code ([`IcmsTaxation`]).
//! - [`SimplifiedSituationCode`] - CSOSN, used by Simples Nacional taxpayers.
//! - [`PisCofinsSituationCode`] - CST PIS/COFINS.
//! - [`NewSystemSituationCode`] - CST IBS/CBS.
//!
//! Codes parse from their textual form and serialize back to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

fn parse_digits(field: &str, value: &str, len: usize) -> EngineResult<u16> {
    let trimmed = value.trim();
    if trimmed.len() != len || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(EngineError::validation(
            field,
            format!("'{}' must have exactly {} digits", value, len),
        ));
    }
    trimmed
        .parse::<u16>()
        .map_err(|e| EngineError::validation(field, e.to_string()))
}

/// The taxation part of a CST ICMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IcmsTaxation {
    /// 00 - fully taxed.
    FullyTaxed,
    /// 10 - taxed, with ICMS charged by tax substitution.
    TaxedWithSubstitution,
    /// 20 - reduced calculation base.
    ReducedBase,
    /// 30 - exempt or not taxed, with substitution charged.
    ExemptWithSubstitution,
    /// 40 - exempt.
    Exempt,
    /// 41 - not taxed.
    NotTaxed,
    /// 50 - suspended.
    Suspended,
    /// 51 - deferred.
    Deferred,
    /// 60 - ICMS previously charged by substitution.
    ChargedBySubstitution,
    /// 70 - reduced base, with substitution charged.
    ReducedBaseWithSubstitution,
    /// 90 - other.
    Other,
}

impl IcmsTaxation {
    /// All eleven taxation codes.
    pub const ALL: [IcmsTaxation; 11] = [
        IcmsTaxation::FullyTaxed,
        IcmsTaxation::TaxedWithSubstitution,
        IcmsTaxation::ReducedBase,
        IcmsTaxation::ExemptWithSubstitution,
        IcmsTaxation::Exempt,
        IcmsTaxation::NotTaxed,
        IcmsTaxation::Suspended,
        IcmsTaxation::Deferred,
        IcmsTaxation::ChargedBySubstitution,
        IcmsTaxation::ReducedBaseWithSubstitution,
        IcmsTaxation::Other,
    ];

    /// The two-digit code.
    pub fn code(&self) -> u8 {
        match self {
            IcmsTaxation::FullyTaxed => 0,
            IcmsTaxation::TaxedWithSubstitution => 10,
            IcmsTaxation::ReducedBase => 20,
            IcmsTaxation::ExemptWithSubstitution => 30,
            IcmsTaxation::Exempt => 40,
            IcmsTaxation::NotTaxed => 41,
            IcmsTaxation::Suspended => 50,
            IcmsTaxation::Deferred => 51,
            IcmsTaxation::ChargedBySubstitution => 60,
            IcmsTaxation::ReducedBaseWithSubstitution => 70,
            IcmsTaxation::Other => 90,
        }
    }

    /// Looks up a taxation code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }
}

/// CST ICMS: origin digit (0-8) followed by the taxation code.
///
/// # Examples
///
/// ```
/// use brtax_engine::models::LegacySituationCode;
/// use std::str::FromStr;
///
/// let cst = LegacySituationCode::from_str("040").unwrap();
/// assert_eq!(cst.origin(), 0);
/// assert!(cst.is_exempt());
/// assert!(LegacySituationCode::from_str("945").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LegacySituationCode {
    origin: u8,
    taxation: IcmsTaxation,
}

impl LegacySituationCode {
    /// Builds a code from its parts.
    pub fn new(origin: u8, taxation: IcmsTaxation) -> EngineResult<Self> {
        if origin > 8 {
            return Err(EngineError::validation(
                "cst_icms",
                format!("origin {} must be between 0 and 8", origin),
            ));
        }
        Ok(Self { origin, taxation })
    }

    /// Product origin (0 = domestic, 1-8 = import variants).
    pub fn origin(&self) -> u8 {
        self.origin
    }

    /// The taxation code.
    pub fn taxation(&self) -> IcmsTaxation {
        self.taxation
    }

    /// No ICMS is due on the operation.
    pub fn is_exempt(&self) -> bool {
        matches!(
            self.taxation,
            IcmsTaxation::Exempt | IcmsTaxation::NotTaxed | IcmsTaxation::Suspended
        )
    }

    /// Substitution ICMS is collected on this operation.
    pub fn has_substitution(&self) -> bool {
        matches!(
            self.taxation,
            IcmsTaxation::TaxedWithSubstitution
                | IcmsTaxation::ExemptWithSubstitution
                | IcmsTaxation::ReducedBaseWithSubstitution
        )
    }

    /// The calculation base is reduced.
    pub fn has_reduction(&self) -> bool {
        matches!(
            self.taxation,
            IcmsTaxation::ReducedBase | IcmsTaxation::ReducedBaseWithSubstitution
        )
    }

    /// Payment is deferred to a later stage.
    pub fn is_deferred(&self) -> bool {
        self.taxation == IcmsTaxation::Deferred
    }

    /// The seller's own operation is taxed (as opposed to only substitution).
    pub fn taxes_own_operation(&self) -> bool {
        !self.is_exempt()
            && !self.is_deferred()
            && !matches!(
                self.taxation,
                IcmsTaxation::ExemptWithSubstitution | IcmsTaxation::ChargedBySubstitution
            )
    }
}

impl FromStr for LegacySituationCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_digits("cst_icms", s, 3)?;
        let origin = (value / 100) as u8;
        let code = (value % 100) as u8;
        let taxation = IcmsTaxation::from_code(code).ok_or_else(|| {
            EngineError::validation("cst_icms", format!("unknown taxation code {:02}", code))
        })?;
        Self::new(origin, taxation)
    }
}

impl TryFrom<String> for LegacySituationCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LegacySituationCode> for String {
    fn from(code: LegacySituationCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for LegacySituationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.origin, self.taxation.code())
    }
}

/// CSOSN: situation codes for Simples Nacional taxpayers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SimplifiedSituationCode {
    /// 101 - taxed, credit permitted.
    TaxedWithCredit,
    /// 102 - taxed, no credit.
    TaxedWithoutCredit,
    /// 103 - exempt for the gross revenue band.
    ExemptRevenueBand,
    /// 201 - credit permitted, with substitution.
    WithCreditAndSubstitution,
    /// 202 - no credit, with substitution.
    WithoutCreditWithSubstitution,
    /// 203 - exempt for the revenue band, with substitution.
    ExemptBandWithSubstitution,
    /// 300 - immune.
    Immune,
    /// 400 - not taxed.
    NotTaxed,
    /// 500 - ICMS previously charged by substitution.
    ChargedBySubstitution,
    /// 900 - other.
    Other,
}

impl SimplifiedSituationCode {
    /// All ten CSOSN values.
    pub const ALL: [SimplifiedSituationCode; 10] = [
        SimplifiedSituationCode::TaxedWithCredit,
        SimplifiedSituationCode::TaxedWithoutCredit,
        SimplifiedSituationCode::ExemptRevenueBand,
        SimplifiedSituationCode::WithCreditAndSubstitution,
        SimplifiedSituationCode::WithoutCreditWithSubstitution,
        SimplifiedSituationCode::ExemptBandWithSubstitution,
        SimplifiedSituationCode::Immune,
        SimplifiedSituationCode::NotTaxed,
        SimplifiedSituationCode::ChargedBySubstitution,
        SimplifiedSituationCode::Other,
    ];

    /// The three-digit code.
    pub fn code(&self) -> u16 {
        match self {
            SimplifiedSituationCode::TaxedWithCredit => 101,
            SimplifiedSituationCode::TaxedWithoutCredit => 102,
            SimplifiedSituationCode::ExemptRevenueBand => 103,
            SimplifiedSituationCode::WithCreditAndSubstitution => 201,
            SimplifiedSituationCode::WithoutCreditWithSubstitution => 202,
            SimplifiedSituationCode::ExemptBandWithSubstitution => 203,
            SimplifiedSituationCode::Immune => 300,
            SimplifiedSituationCode::NotTaxed => 400,
            SimplifiedSituationCode::ChargedBySubstitution => 500,
            SimplifiedSituationCode::Other => 900,
        }
    }

    /// No ICMS is due.
    pub fn is_exempt(&self) -> bool {
        matches!(
            self,
            SimplifiedSituationCode::ExemptRevenueBand
                | SimplifiedSituationCode::ExemptBandWithSubstitution
                | SimplifiedSituationCode::Immune
                | SimplifiedSituationCode::NotTaxed
        )
    }

    /// The buyer may take an ICMS credit.
    pub fn permits_credit(&self) -> bool {
        matches!(
            self,
            SimplifiedSituationCode::TaxedWithCredit
                | SimplifiedSituationCode::WithCreditAndSubstitution
                | SimplifiedSituationCode::Other
        )
    }

    /// Substitution ICMS is collected on this operation.
    pub fn has_substitution(&self) -> bool {
        matches!(
            self,
            SimplifiedSituationCode::WithCreditAndSubstitution
                | SimplifiedSituationCode::WithoutCreditWithSubstitution
                | SimplifiedSituationCode::ExemptBandWithSubstitution
        )
    }
}

impl FromStr for SimplifiedSituationCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_digits("csosn", s, 3)?;
        Self::ALL
            .into_iter()
            .find(|c| c.code() == value)
            .ok_or_else(|| EngineError::validation("csosn", format!("unknown CSOSN {}", value)))
    }
}

impl TryFrom<String> for SimplifiedSituationCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SimplifiedSituationCode> for String {
    fn from(code: SimplifiedSituationCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for SimplifiedSituationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

/// CST PIS/COFINS.
///
/// Codes 04 to 09 (monophasic, substitution, zero rate, exempt, no
/// incidence, suspension) carry no contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PisCofinsSituationCode(u8);

impl PisCofinsSituationCode {
    /// Codes that yield no contribution.
    pub const EXEMPTION_CODES: [u8; 6] = [4, 5, 6, 7, 8, 9];

    const VALID: [u8; 33] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 49, 50, 51, 52, 53, 54, 55, 56, 60, 61, 62, 63, 64, 65, 66,
        67, 70, 71, 72, 73, 74, 75, 98, 99,
    ];

    /// Builds a code from its numeric value.
    pub fn new(code: u8) -> EngineResult<Self> {
        if !Self::VALID.contains(&code) {
            return Err(EngineError::validation(
                "cst_pis_cofins",
                format!("unknown code {:02}", code),
            ));
        }
        Ok(Self(code))
    }

    /// The numeric value.
    pub fn code(&self) -> u8 {
        self.0
    }

    /// The code is in the exemption list.
    pub fn is_exempt(&self) -> bool {
        Self::EXEMPTION_CODES.contains(&self.0)
    }
}

impl FromStr for PisCofinsSituationCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(parse_digits("cst_pis_cofins", s, 2)? as u8)
    }
}

impl TryFrom<String> for PisCofinsSituationCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PisCofinsSituationCode> for String {
    fn from(code: PisCofinsSituationCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for PisCofinsSituationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// CST IBS/CBS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NewSystemSituationCode {
    /// 00 - normal taxation.
    Normal,
    /// 10 - suspended.
    Suspended,
    /// 20 - monophasic.
    Monophasic,
    /// 30 - deferred.
    Deferred,
    /// 40 - exempt.
    Exempt,
    /// 41 - non-incidence.
    NonIncidence,
    /// 50 - constitutional immunity.
    Immune,
    /// 60 - reduced base or rate.
    ReducedBase,
    /// 70 - presumed credit.
    PresumedCredit,
    /// 90 - other.
    Other,
}

impl NewSystemSituationCode {
    /// All ten values.
    pub const ALL: [NewSystemSituationCode; 10] = [
        NewSystemSituationCode::Normal,
        NewSystemSituationCode::Suspended,
        NewSystemSituationCode::Monophasic,
        NewSystemSituationCode::Deferred,
        NewSystemSituationCode::Exempt,
        NewSystemSituationCode::NonIncidence,
        NewSystemSituationCode::Immune,
        NewSystemSituationCode::ReducedBase,
        NewSystemSituationCode::PresumedCredit,
        NewSystemSituationCode::Other,
    ];

    /// The two-digit code.
    pub fn code(&self) -> u8 {
        match self {
            NewSystemSituationCode::Normal => 0,
            NewSystemSituationCode::Suspended => 10,
            NewSystemSituationCode::Monophasic => 20,
            NewSystemSituationCode::Deferred => 30,
            NewSystemSituationCode::Exempt => 40,
            NewSystemSituationCode::NonIncidence => 41,
            NewSystemSituationCode::Immune => 50,
            NewSystemSituationCode::ReducedBase => 60,
            NewSystemSituationCode::PresumedCredit => 70,
            NewSystemSituationCode::Other => 90,
        }
    }

    /// IBS and CBS values must be zero under this code.
    pub fn is_exempt(&self) -> bool {
        matches!(
            self,
            NewSystemSituationCode::Exempt
                | NewSystemSituationCode::NonIncidence
                | NewSystemSituationCode::Immune
        )
    }

    /// Payment is deferred.
    pub fn is_deferred(&self) -> bool {
        *self == NewSystemSituationCode::Deferred
    }

    /// Payment is suspended.
    pub fn is_suspended(&self) -> bool {
        *self == NewSystemSituationCode::Suspended
    }

    /// The base or rate is reduced.
    pub fn has_reduction(&self) -> bool {
        *self == NewSystemSituationCode::ReducedBase
    }

    /// A presumed credit applies.
    pub fn has_presumed_credit(&self) -> bool {
        *self == NewSystemSituationCode::PresumedCredit
    }
}

impl FromStr for NewSystemSituationCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_digits("cst_ibs_cbs", s, 2)? as u8;
        Self::ALL
            .into_iter()
            .find(|c| c.code() == value)
            .ok_or_else(|| {
                EngineError::validation("cst_ibs_cbs", format!("unknown code {:02}", value))
            })
    }
}

impl TryFrom<String> for NewSystemSituationCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NewSystemSituationCode> for String {
    fn from(code: NewSystemSituationCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for NewSystemSituationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.code())
    }
}
