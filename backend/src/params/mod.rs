//! Dashboard scenario parameters: their values, their observable store and
//! their translation into backend filters.

pub mod filters;
pub mod parameter;
pub mod store;

pub use filters::{translate, FilterSet, FilterTranslator, FilterValue};
pub use parameter::{ParameterKey, ParameterSnapshot, ParameterValue};
pub use store::{ParameterStore, SubscriptionId};
