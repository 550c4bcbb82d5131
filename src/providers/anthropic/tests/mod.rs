//! Anthropic translator tests

mod responses;
