//! Fiscal identifiers: UF, municipality, NCM, CFOP, service and
//! classification codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

fn all_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

/// IBGE code and abbreviation of each federative unit.
const FEDERATIVE_UNITS: [(u8, &str); 27] = [
    (11, "RO"),
    (12, "AC"),
    (13, "AM"),
    (14, "RR"),
    (15, "PA"),
    (16, "AP"),
    (17, "TO"),
    (21, "MA"),
    (22, "PI"),
    (23, "CE"),
    (24, "RN"),
    (25, "PB"),
    (26, "PE"),
    (27, "AL"),
    (28, "SE"),
    (29, "BA"),
    (31, "MG"),
    (32, "ES"),
    (33, "RJ"),
    (35, "SP"),
    (41, "PR"),
    (42, "SC"),
    (43, "RS"),
    (50, "MS"),
    (51, "MT"),
    (52, "GO"),
    (53, "DF"),
];

/// A Brazilian state (UF), identified by its two-digit IBGE code.
///
/// Parses either the numeric code (`"35"`) or the abbreviation (`"SP"`).
///
/// # Examples
///
/// ```
/// use brtax_engine::models::UfCode;
/// use std::str::FromStr;
///
/// let sp = UfCode::from_str("SP").unwrap();
/// assert_eq!(sp.code(), 35);
/// assert_eq!(sp, UfCode::from_str("35").unwrap());
/// assert!(UfCode::from_str("99").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UfCode(u8);

impl UfCode {
    /// Builds a UF from its IBGE code.
    pub fn new(code: u8) -> EngineResult<Self> {
        if FEDERATIVE_UNITS.iter().any(|(c, _)| *c == code) {
            Ok(Self(code))
        } else {
            Err(EngineError::validation(
                "uf",
                format!("{} is not an IBGE state code", code),
            ))
        }
    }

    /// The two-digit IBGE code.
    pub fn code(&self) -> u8 {
        self.0
    }

    /// The two-letter abbreviation.
    pub fn abbreviation(&self) -> &'static str {
        FEDERATIVE_UNITS
            .iter()
            .find(|(c, _)| *c == self.0)
            .map(|(_, abbr)| *abbr)
            .unwrap_or("??")
    }
}

impl FromStr for UfCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if all_digits(value, 2) {
            let code = value
                .parse::<u8>()
                .map_err(|e| EngineError::validation("uf", e.to_string()))?;
            return Self::new(code);
        }
        let upper = value.to_uppercase();
        FEDERATIVE_UNITS
            .iter()
            .find(|(_, abbr)| *abbr == upper)
            .map(|(c, _)| Self(*c))
            .ok_or_else(|| {
                EngineError::validation(
                    "uf",
                    format!("'{}' must be a 2-digit IBGE code or state abbreviation", s),
                )
            })
    }
}

impl TryFrom<String> for UfCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UfCode> for String {
    fn from(uf: UfCode) -> Self {
        uf.abbreviation().to_string()
    }
}

impl fmt::Display for UfCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

macro_rules! digit_code {
    ($(#[$meta:meta])* $name:ident, $field:literal, $len:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// The code as text.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s.trim();
                if !all_digits(value, $len) {
                    return Err(EngineError::validation(
                        $field,
                        format!("'{}' must have exactly {} digits", s, $len),
                    ));
                }
                Self::checked(value.to_string())
            }
        }

        impl TryFrom<String> for $name {
            type Error = EngineError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(code: $name) -> Self {
                code.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

digit_code!(
    /// IBGE municipality code (7 digits).
    MunicipalityCode,
    "municipality_code",
    7
);

impl MunicipalityCode {
    fn checked(value: String) -> EngineResult<Self> {
        Ok(Self(value))
    }

    /// The IBGE code of the state the municipality belongs to (first two digits).
    pub fn state_code(&self) -> u8 {
        self.0[..2].parse().unwrap_or(0)
    }
}

digit_code!(
    /// Mercosul common nomenclature code (8 digits).
    NcmCode,
    "ncm",
    8
);

impl NcmCode {
    fn checked(value: String) -> EngineResult<Self> {
        Ok(Self(value))
    }

    /// The first four digits (heading), e.g. `2203` for beer.
    pub fn heading(&self) -> u16 {
        self.0[..4].parse().unwrap_or(0)
    }

    /// The first two digits (chapter).
    pub fn chapter(&self) -> u8 {
        self.0[..2].parse().unwrap_or(0)
    }
}

digit_code!(
    /// Fiscal operation code (4 digits).
    ///
    /// The first digit gives the direction and scope: 1-3 inbound
    /// (intrastate, interstate, foreign), 5-7 outbound.
    CfopCode,
    "cfop",
    4
);

impl CfopCode {
    fn checked(value: String) -> EngineResult<Self> {
        match value.as_bytes()[0] {
            b'1' | b'2' | b'3' | b'5' | b'6' | b'7' => Ok(Self(value)),
            _ => Err(EngineError::validation(
                "cfop",
                format!("'{}' must start with 1, 2, 3, 5, 6 or 7", value),
            )),
        }
    }

    /// Entry of goods or services.
    pub fn is_inbound(&self) -> bool {
        matches!(self.0.as_bytes()[0], b'1' | b'2' | b'3')
    }

    /// Operation between different states.
    pub fn is_interstate(&self) -> bool {
        matches!(self.0.as_bytes()[0], b'2' | b'6')
    }

    /// Operation with a foreign counterpart.
    pub fn is_foreign(&self) -> bool {
        matches!(self.0.as_bytes()[0], b'3' | b'7')
    }
}

/// A service code from the municipal service list, formatted `NN.NN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceCode(String);

impl ServiceCode {
    /// The code as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The service group (digits before the dot).
    pub fn group(&self) -> u8 {
        self.0[..2].parse().unwrap_or(0)
    }
}

impl FromStr for ServiceCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let valid = value.len() == 5
            && value.as_bytes()[2] == b'.'
            && all_digits(&value[..2], 2)
            && all_digits(&value[3..], 2);
        if !valid {
            return Err(EngineError::validation(
                "service_code",
                format!("'{}' must match the pattern NN.NN", s),
            ));
        }
        Ok(Self(value.to_string()))
    }
}

impl TryFrom<String> for ServiceCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServiceCode> for String {
    fn from(code: ServiceCode) -> Self {
        code.0
    }
}

impl fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Legal treatment category selected by the first digit of a
/// [`TaxClassificationCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationCategory {
    /// 1 - full taxation.
    FullTaxation,
    /// 2 - reduced rate.
    ReducedRate,
    /// 3 - exemption.
    Exemption,
    /// 4 - immunity.
    Immunity,
    /// 5 - deferral.
    Deferral,
    /// 6 - suspension.
    Suspension,
    /// 7 - special regime.
    SpecialRegime,
    /// 8 - presumed credit.
    PresumedCredit,
    /// 9 - other.
    Other,
}

/// Tax classification code (cClassTrib): 5 digits, first digit 1-9.
///
/// # Examples
///
/// ```
/// use brtax_engine::models::{ClassificationCategory, TaxClassificationCode};
/// use std::str::FromStr;
///
/// let code = TaxClassificationCode::from_str("20001").unwrap();
/// assert_eq!(code.category(), ClassificationCategory::ReducedRate);
/// assert!(TaxClassificationCode::from_str("01234").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxClassificationCode(String);

impl TaxClassificationCode {
    /// The code as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The legal treatment category.
    pub fn category(&self) -> ClassificationCategory {
        match self.0.as_bytes()[0] {
            b'1' => ClassificationCategory::FullTaxation,
            b'2' => ClassificationCategory::ReducedRate,
            b'3' => ClassificationCategory::Exemption,
            b'4' => ClassificationCategory::Immunity,
            b'5' => ClassificationCategory::Deferral,
            b'6' => ClassificationCategory::Suspension,
            b'7' => ClassificationCategory::SpecialRegime,
            b'8' => ClassificationCategory::PresumedCredit,
            _ => ClassificationCategory::Other,
        }
    }
}

impl FromStr for TaxClassificationCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if !all_digits(value, 5) {
            return Err(EngineError::validation(
                "classification_code",
                format!("'{}' must have exactly 5 digits", s),
            ));
        }
        if value.starts_with('0') {
            return Err(EngineError::validation(
                "classification_code",
                format!("'{}' must start with a digit from 1 to 9", s),
            ));
        }
        Ok(Self(value.to_string()))
    }
}

impl TryFrom<String> for TaxClassificationCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaxClassificationCode> for String {
    fn from(code: TaxClassificationCode) -> Self {
        code.0
    }
}

impl fmt::Display for TaxClassificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
