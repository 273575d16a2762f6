//! Strategy comparison for the household energy environment
//!
//! Replays the baseline heuristics and, when given one, a trained DQN agent
//! from the same starting state, then renders the runs as SVG figures.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compare;
pub mod plot;
pub mod strategy;

pub use compare::{compare_strategies, ComparisonReport, CostSummary, ExogenousTrace, StepRecord, StrategyRun};
pub use plot::{render_loss_history, render_report};
pub use strategy::{strategy_action, HouseholdAgent, Strategy};
