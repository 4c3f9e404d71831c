pub mod dispatch;
pub mod scheduler;

pub use dispatch::{
    DispatchContext, DispatchError, Dispatcher, MarketplaceDispatcher, WebhookDispatcher,
};
pub use scheduler::{FanoutError, FanoutScheduler};
