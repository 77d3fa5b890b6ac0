//! Empirical physics used by the metabolism calculator.
//!
//! Every function here is pure and has no error path: inputs outside the
//! fitted ranges (or physically impossible ones, such as a temperature below
//! absolute zero) yield non-finite or meaningless numbers rather than errors.

pub mod gas_exchange;
pub mod oxygen;
pub mod seawater;

pub use gas_exchange::mass_transfer_coefficient;
pub use oxygen::{oxygen_saturation, MB_PER_ATM};
