use serde::{Deserialize, Serialize};

#[allow(clippy::upper_case_acronyms)]
#[rustfmt::skip]
#[derive(Deserialize, Serialize, Debug, Clone, Hash, Eq, PartialEq)]
pub enum CurrencyDto { USD, CAD, EUR, GBP, Unknown }

impl std::fmt::Display for CurrencyDto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let o = match self {
            Self::USD => "USD",
            Self::CAD => "CAD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::Unknown => "Unknown",
        };
        f.write_str(o)
    }
}

impl From<&String> for CurrencyDto {
    fn from(value: &String) -> Self {
        match value.as_str() {
            "USD" => Self::USD,
            "CAD" => Self::CAD,
            "EUR" => Self::EUR,
            "GBP" => Self::GBP,
            _others => Self::Unknown,
        }
    }
}

impl CurrencyDto {
    /// Number of digits allowed in the fraction part of an amount value.
    /// The decimal places depend on the currency applied, due to the limit
    /// specified in 3rd-party payment processors such as Stripe
    pub fn amount_fraction_scale(&self) -> u32 {
        match self {
            Self::USD | Self::CAD | Self::EUR | Self::GBP => 2,
            Self::Unknown => 0,
        }
    }
}
