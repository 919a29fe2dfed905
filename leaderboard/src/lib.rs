//! Live leaderboard engine for endurance races.
//!
//! A [`core::poll_scheduler::PollScheduler`] polls a participant registry and a timing feed,
//! groups every participant into a race category, ranks each category and publishes the result
//! as an immutable [`post::ranked_view::RankedView`]. The published view can be exported as CSV
//! with [`post::export`].
pub mod core;
pub mod error;
pub mod interfaces;
pub mod post;
pub mod pre;

pub use crate::error::LeaderboardError;
