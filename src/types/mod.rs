//! Shared data structures for yield prediction and optimization
//!
//! - `process`: parameters, feature vectors, labeled training sets
//! - `optimization`: grid-search ranges and results
//! - `ml`: training reports and predictions
//! - `error`: error kinds shared by every model operation

mod process;
mod optimization;
mod ml;
mod error;

pub use process::*;
pub use optimization::*;
pub use ml::*;
pub use error::*;
