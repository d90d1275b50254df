//! Turn-taking policy: who may speak now, and how long to wait before
//! breaking a silence.

pub mod delay;
pub mod gate;
