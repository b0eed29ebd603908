//! The taxes the engine knows about.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the eight consumption taxes handled by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxKind {
    /// State tax on circulation of goods.
    Icms,
    /// Federal tax on industrialized products.
    Ipi,
    /// Federal social integration contribution.
    Pis,
    /// Federal social security financing contribution.
    Cofins,
    /// Municipal tax on services.
    Iss,
    /// Goods and services tax (state and municipal shares).
    Ibs,
    /// Federal goods and services contribution.
    Cbs,
    /// Selective tax.
    Is,
}

impl TaxKind {
    /// The five legacy taxes, in document order.
    pub const LEGACY: [TaxKind; 5] = [
        TaxKind::Icms,
        TaxKind::Ipi,
        TaxKind::Pis,
        TaxKind::Cofins,
        TaxKind::Iss,
    ];

    /// The three new-system taxes.
    pub const NEW_SYSTEM: [TaxKind; 3] = [TaxKind::Ibs, TaxKind::Cbs, TaxKind::Is];

    /// The upper-case acronym.
    pub fn name(&self) -> &'static str {
        match self {
            TaxKind::Icms => "ICMS",
            TaxKind::Ipi => "IPI",
            TaxKind::Pis => "PIS",
            TaxKind::Cofins => "COFINS",
            TaxKind::Iss => "ISS",
            TaxKind::Ibs => "IBS",
            TaxKind::Cbs => "CBS",
            TaxKind::Is => "IS",
        }
    }

    /// Returns true for ICMS, IPI, PIS, COFINS and ISS.
    pub fn is_legacy(&self) -> bool {
        Self::LEGACY.contains(self)
    }

    /// The new-system tax that replaces a legacy one.
    pub fn successor(&self) -> Option<TaxKind> {
        match self {
            TaxKind::Icms | TaxKind::Iss => Some(TaxKind::Ibs),
            TaxKind::Pis | TaxKind::Cofins => Some(TaxKind::Cbs),
            TaxKind::Ipi => Some(TaxKind::Is),
            TaxKind::Ibs | TaxKind::Cbs | TaxKind::Is => None,
        }
    }
}

impl fmt::Display for TaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
