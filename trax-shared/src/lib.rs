pub mod location;
pub mod models;

pub use location::{Address, Location};
pub use models::jobs::{FanoutJob, NotificationJob};
