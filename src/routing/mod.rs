//! Routing Module
//!
//! Classifies intercepted requests into caching classes.

mod classifier;

pub use classifier::{RouteClass, RouteClassifier, RouteRules};
