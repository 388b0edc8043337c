//! Order domain
//!
//! - [`status`]: status state machine and transition table
//! - [`payment`]: payment plan validation and resolution
//! - [`selector`]: active / pending order selection
//! - [`filter`]: filter/sort engine for order lists
//! - [`money`]: decimal money helpers

pub mod filter;
pub mod model;
pub mod money;
pub mod payment;
pub mod selector;
pub mod status;
pub mod types;

// Re-exports
pub use filter::{OrderFilter, StatusFilter, filter_and_sort_orders};
pub use model::Order;
pub use payment::{PaymentError, PaymentStatus, ProofKind};
pub use status::{ActorSide, OrderStatus, TransitionError, transition_allowed};
pub use types::*;
