//! Primary VIF tables for the quantities an electricity meter emits
//!
//! The EN 13757-3 primary VIF table is large; an OmniPower only ever
//! uses the energy rows (0x00..0x07, Wh) and the power rows
//! (0x28..0x2F, W). In both rows the low three bits select a decimal
//! scale. Everything else is left to the record walker to skip or
//! reject.

use core::fmt;

use serde::Serialize;

use crate::constants::MBUS_DIB_VIF_WITHOUT_EXTENSION;

/// Physical unit of a decoded value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    #[serde(rename = "Wh")]
    WattHour,
    #[serde(rename = "W")]
    Watt,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::WattHour => f.write_str("Wh"),
            Unit::Watt => f.write_str("W"),
        }
    }
}

/// Measured quantity and its flow direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityKind {
    /// Cumulative active energy drawn from the grid (A+)
    EnergyImport,
    /// Cumulative active energy fed into the grid (A-)
    EnergyExport,
    /// Instantaneous active power drawn from the grid (P+)
    PowerImport,
    /// Instantaneous active power fed into the grid (P-)
    PowerExport,
}

impl QuantityKind {
    /// Same quantity with the flow direction flipped, as selected by
    /// the backward flow VIFE.
    pub fn reversed(self) -> Self {
        match self {
            QuantityKind::EnergyImport => QuantityKind::EnergyExport,
            QuantityKind::EnergyExport => QuantityKind::EnergyImport,
            QuantityKind::PowerImport => QuantityKind::PowerExport,
            QuantityKind::PowerExport => QuantityKind::PowerImport,
        }
    }

    pub fn is_energy(self) -> bool {
        matches!(self, QuantityKind::EnergyImport | QuantityKind::EnergyExport)
    }
}

impl fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuantityKind::EnergyImport => "energy import",
            QuantityKind::EnergyExport => "energy export",
            QuantityKind::PowerImport => "power import",
            QuantityKind::PowerExport => "power export",
        };
        f.write_str(label)
    }
}

/// Interpretation of a recognized primary VIF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VifInfo {
    pub kind: QuantityKind,
    pub unit: Unit,
    /// Decimal exponent: the raw value times 10^scale is in `unit`
    pub scale: i8,
}

/// Looks up a primary VIF, ignoring the extension bit.
///
/// Returns `None` for codes outside the energy and power rows.
pub fn lookup_vif(vif: u8) -> Option<VifInfo> {
    let code = vif & MBUS_DIB_VIF_WITHOUT_EXTENSION;
    match code {
        // E000 0nnn: energy in 10^(nnn-3) Wh
        0x00..=0x07 => Some(VifInfo {
            kind: QuantityKind::EnergyImport,
            unit: Unit::WattHour,
            scale: (code & 0x07) as i8 - 3,
        }),
        // E010 1nnn: power in 10^(nnn-3) W
        0x28..=0x2F => Some(VifInfo {
            kind: QuantityKind::PowerImport,
            unit: Unit::Watt,
            scale: (code & 0x07) as i8 - 3,
        }),
        _ => None,
    }
}
