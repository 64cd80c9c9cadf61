//! Testing utilities for minisynapse sequences.
//!
//! This module provides:
//! - A builder for inbound message contexts
//! - Helpers for writing definition files
//! - Assertions over the outbound response

mod assertions;
mod fixtures;

pub use assertions::{
    assert_response_body, assert_response_header, assert_response_status,
    assert_response_untouched,
};
pub use fixtures::{write_definition, MessageContextBuilder};
