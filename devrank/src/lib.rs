//! Region-based developer reputation ranking
//!
//! # Overview
//!
//! Given a region name, the library discovers GitHub users located there,
//! collects three categorized repository sets per user (owned projects,
//! organization projects they contribute to, external projects they opened
//! pull requests against), resolves each user's commit rank among a
//! repository's contributors, and folds everything into a scalar reputation
//! score: `followers + owned popularity + rank-weighted contributed
//! popularity`. Users whose repository score does not exceed the acceptance
//! threshold are rejected regardless of follower count, and organizations
//! are never scored. Accepted users' repositories are additionally folded
//! into a cross-user regional project ranking.
//!
//! All upstream access goes through the [`api::Client`] trait; the engine
//! issues calls strictly sequentially and streams completed users through a
//! channel.

pub mod api;
pub mod model;
pub mod region;
pub mod score;

#[cfg(feature = "engine")]
pub mod collector;
#[cfg(feature = "engine")]
pub mod engine;
#[cfg(feature = "engine")]
mod pace;
#[cfg(feature = "engine")]
pub mod rank;
