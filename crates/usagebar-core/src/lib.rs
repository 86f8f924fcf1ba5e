//! Core library for usagebar.
//!
//! Fetches plan usage from the claude.ai organization API, classifies it into
//! a status icon state, and decides when to poll.

pub mod credentials;
pub mod presentation;
pub mod scheduler;
pub mod usage;

#[cfg(test)]
mod test_support;
