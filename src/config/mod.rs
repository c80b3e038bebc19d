//! Configuration and constants
//!
//! - [`defaults`] - Default values used when settings leave a field unset

pub mod defaults;
