//! Scenario tests that exercise the model end to end.

mod fragment;
mod json;
mod replace;
mod resolve;
