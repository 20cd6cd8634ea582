//! Cash/shares ledger for an all-in, all-out single instrument account.

/// At any bar the ledger is either fully in cash or fully in shares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ledger {
    pub cash: f64,
    pub shares: f64,
}

impl Ledger {
    pub fn new(initial_capital: f64) -> Self {
        Ledger {
            cash: initial_capital,
            shares: 0.0,
        }
    }

    /// Converts all cash into shares at `price`, paying `commission` on the
    /// cash spent. Returns `(shares_bought, cash_spent)`.
    pub fn buy_all(&mut self, price: f64, commission: f64) -> (f64, f64) {
        let spent = self.cash;
        let bought = spent * (1.0 - commission) / price;
        self.shares += bought;
        self.cash = 0.0;
        (bought, spent)
    }

    /// Converts all shares into cash at `price`, paying `commission` on the
    /// proceeds. Returns `(shares_sold, net_proceeds)`.
    pub fn sell_all(&mut self, price: f64, commission: f64) -> (f64, f64) {
        let sold = self.shares;
        let proceeds = sold * price * (1.0 - commission);
        self.cash += proceeds;
        self.shares = 0.0;
        (sold, proceeds)
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.shares * price
    }
}
