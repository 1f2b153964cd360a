//! Token exchange metrics
//!
//! - `ultradns_token_exchanges_total` (counter): labels `grant`, `outcome`
//!
//! Without an installed recorder these calls are no-ops.

use crate::token::GrantType;

pub const TOKEN_EXCHANGES_TOTAL: &str = "ultradns_token_exchanges_total";

/// Record one token exchange attempt. `outcome` is `"success"` or an
/// `Error::kind()` label.
pub(crate) fn record_exchange(grant: GrantType, outcome: &'static str) {
    metrics::counter!(TOKEN_EXCHANGES_TOTAL, "grant" => grant.as_str(), "outcome" => outcome)
        .increment(1);
}
