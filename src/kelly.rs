//! Kelly criterion position sizing.
//!
//! For a binary bet with win probability `p` and win/loss payoff ratio `r`:
//!
//! ```text
//! f* = p - (1 - p) / r
//! ```
//!
//! `f*` is the growth-optimal fraction of bankroll to risk. A negative
//! result means the bet has non-positive edge and should not be taken.

/// Raw Kelly fraction.
///
/// Pure and unclamped: the caller clips negative results to zero before
/// sizing a real allocation. Domain is the caller's responsibility -
/// `win_probability` in [0, 1] and `win_loss_ratio` strictly positive.
pub fn kelly_fraction(win_probability: f64, win_loss_ratio: f64) -> f64 {
    win_probability - (1.0 - win_probability) / win_loss_ratio
}

/// Kelly fraction clipped at zero, usable directly as an allocation weight.
pub fn clipped_fraction(win_probability: f64, win_loss_ratio: f64) -> f64 {
    kelly_fraction(win_probability, win_loss_ratio).max(0.0)
}

/// Recommended amount to allocate out of `bankroll`.
pub fn recommended_stake(bankroll: f64, win_probability: f64, win_loss_ratio: f64) -> f64 {
    bankroll * clipped_fraction(win_probability, win_loss_ratio)
}
