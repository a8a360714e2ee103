// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 CreditCore Contributors
//
// This file is part of CreditCore.
//
// CreditCore is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// CreditCore is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with CreditCore. If not, see <https://www.gnu.org/licenses/>.

//! Country and currency codes.
//!
//! The set of markets is closed: adding a country means adding a strategy,
//! a provider, and a migration for the `country_code` enum type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported country codes (ISO 3166-1 alpha-2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CountryCode {
    /// Spain
    Es,
    /// Portugal
    Pt,
    /// Italy
    It,
    /// Mexico
    Mx,
    /// Colombia
    Co,
    /// Brazil
    Br,
}

/// Supported currency codes (ISO 4217).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Euro (Spain, Portugal, Italy)
    Eur,
    /// Brazilian Real
    Brl,
    /// Mexican Peso
    Mxn,
    /// Colombian Peso
    Cop,
}

impl CountryCode {
    /// Every supported country, in registry order.
    pub const ALL: [CountryCode; 6] = [
        CountryCode::Es,
        CountryCode::Pt,
        CountryCode::It,
        CountryCode::Mx,
        CountryCode::Co,
        CountryCode::Br,
    ];

    /// The two-letter code as stored in the database enum.
    pub fn as_str(&self) -> &'static str {
        match self {
            CountryCode::Es => "ES",
            CountryCode::Pt => "PT",
            CountryCode::It => "IT",
            CountryCode::Mx => "MX",
            CountryCode::Co => "CO",
            CountryCode::Br => "BR",
        }
    }

    /// The canonical currency for applications in this country.
    ///
    /// The HTTP layer rejects a request whose `currency` differs from this,
    /// and infers it when the field is omitted.
    pub fn currency(&self) -> Currency {
        match self {
            CountryCode::Es | CountryCode::Pt | CountryCode::It => Currency::Eur,
            CountryCode::Mx => Currency::Mxn,
            CountryCode::Co => Currency::Cop,
            CountryCode::Br => Currency::Brl,
        }
    }

    /// Human-readable name of the identity document for this country.
    pub fn document_type(&self) -> &'static str {
        match self {
            CountryCode::Es => "DNI",
            CountryCode::Pt => "NIF",
            CountryCode::It => "Codice Fiscale",
            CountryCode::Mx => "CURP",
            CountryCode::Co => "Cédula",
            CountryCode::Br => "CPF",
        }
    }
}

impl Currency {
    /// The three-letter code as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Brl => "BRL",
            Currency::Mxn => "MXN",
            Currency::Cop => "COP",
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountryCode {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ES" => Ok(CountryCode::Es),
            "PT" => Ok(CountryCode::Pt),
            "IT" => Ok(CountryCode::It),
            "MX" => Ok(CountryCode::Mx),
            "CO" => Ok(CountryCode::Co),
            "BR" => Ok(CountryCode::Br),
            other => Err(UnknownCode(other.to_string())),
        }
    }
}

impl FromStr for Currency {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "BRL" => Ok(Currency::Brl),
            "MXN" => Ok(Currency::Mxn),
            "COP" => Ok(Currency::Cop),
            other => Err(UnknownCode(other.to_string())),
        }
    }
}

/// A code outside the closed country/currency sets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown code: {0}")]
pub struct UnknownCode(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_countries() {
        for country in CountryCode::ALL {
            assert_eq!(country.as_str().parse::<CountryCode>().unwrap(), country);
        }
    }

    #[test]
    fn test_currency_mapping() {
        assert_eq!(CountryCode::Es.currency(), Currency::Eur);
        assert_eq!(CountryCode::Pt.currency(), Currency::Eur);
        assert_eq!(CountryCode::It.currency(), Currency::Eur);
        assert_eq!(CountryCode::Br.currency(), Currency::Brl);
        assert_eq!(CountryCode::Mx.currency(), Currency::Mxn);
        assert_eq!(CountryCode::Co.currency(), Currency::Cop);
    }

    #[test]
    fn test_unknown_country_rejected() {
        assert!("AR".parse::<CountryCode>().is_err());
        assert!("".parse::<CountryCode>().is_err());
    }

    #[test]
    fn test_case_insensitive_parse() {
        assert_eq!("es".parse::<CountryCode>().unwrap(), CountryCode::Es);
        assert_eq!("eur".parse::<Currency>().unwrap(), Currency::Eur);
    }

    #[test]
    fn test_serde_uses_upper_codes() {
        let json = serde_json::to_string(&CountryCode::Es).unwrap();
        assert_eq!(json, "\"ES\"");
        let back: CountryCode = serde_json::from_str("\"BR\"").unwrap();
        assert_eq!(back, CountryCode::Br);
    }
}
