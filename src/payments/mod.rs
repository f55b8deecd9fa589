//! Payment verification and the used-payment ledger.
//!
//! A payment check scans recent transactions to the payment wallet and
//! credits the first one that pays enough, inside the window, and has not
//! been credited before. Crediting is an atomic claim on the ledger. A paid
//! action then redeems the credited payment, also atomically, so a
//! transaction unlocks at most one paid action and only if it covers the fee.

pub mod ledger;
pub mod types;
pub mod verifier;

pub use ledger::{minimum_payment, redeem_payment, release_payment, PaidAction};
pub use types::{
    LedgerEntry, PaymentCheckRequest, PaymentCheckResponse, PaymentError, PaymentMatch,
    PaymentResult, RecentPaymentsQuery,
};
pub use verifier::{evaluate_transaction, Evaluation, PaymentCriteria, PaymentVerifier, SkipReason};
