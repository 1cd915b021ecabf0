//! Property-based tests for ordering and stream grammar guarantees

mod ordering;
