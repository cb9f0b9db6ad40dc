use std::fmt;

const BRAZIL_SUFFIX: &str = ".SA";

/// Display currency inferred from the ticker's exchange suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Brl,
    Usd,
}

impl Currency {
    pub fn for_ticker(ticker: &str) -> Self {
        if ticker.trim().to_ascii_uppercase().ends_with(BRAZIL_SUFFIX) {
            Currency::Brl
        } else {
            Currency::Usd
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Currency::Brl => "BRL",
            Currency::Usd => "USD",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Brl => "R$",
            Currency::Usd => "$",
        }
    }

    pub fn format(self, amount: f64) -> String {
        format!("{} {:.2}", self.symbol(), amount)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
