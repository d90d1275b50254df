//! Reactive detection rules: explicit `@name` mentions and the verdict of
//! the question classifier.

pub mod mention;
pub mod question;
