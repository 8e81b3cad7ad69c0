pub mod browser;
pub mod handler;
pub mod interfaces;
pub mod known_answer;
pub mod lookup;
pub mod message;
pub mod reconcile;
pub mod scheduler;
pub mod service_type;
pub mod transport;
