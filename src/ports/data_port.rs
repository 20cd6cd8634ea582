//! Price data access port trait.

use crate::domain::error::SigtestError;
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Loads the daily bars for `symbol`, restricted to the inclusive
    /// `[start_date, end_date]` range when bounds are given.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, SigtestError>;

    fn list_symbols(&self) -> Result<Vec<String>, SigtestError>;

    /// First date, last date and bar count for `symbol`, or `None` when the
    /// source holds no bars for it.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtestError> {
        match self.fetch_ohlcv(symbol, None, None) {
            Ok(series) => Ok(Some((series.first_date(), series.last_date(), series.len()))),
            Err(SigtestError::NoData { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
