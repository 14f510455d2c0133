mod controller;
mod polling;

pub use controller::{
    ChangeCallback, LoadCallback, RefreshConfig, RefreshController, RefreshSnapshot,
    DEFAULT_INTERVAL,
};
pub use polling::PollingHandle;
