//! Property-based tests for detection and field resolution rules

mod collapse_rules;
mod field_chains;
