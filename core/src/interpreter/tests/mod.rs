//! Engine tests
//!
//! Organized by area:
//! - `combinator_tests`: control flow over hand-built node trees
//! - `access_tests`: ranges, subscripts, promotion and operation calls
//! - `assign_tests`: plain, augmented, swapping and reversible assignment
//! - `method_tests`: method bodies, suspension and the body pool
//! - `coexpr_tests`: co-expression hand-off
//! - `scan_tests`: string scanning, list comprehension and binding
//! - `program_tests`: whole programs loaded from JSON

mod combinator_tests;
mod helpers;
mod program_tests;
