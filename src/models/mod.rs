mod config_tree;
mod device_models;
mod devices;
mod fetch_audit;
mod sites;
mod virtual_devices;

pub use config_tree::*;
pub use device_models::*;
pub use devices::*;
pub use fetch_audit::*;
pub use sites::*;
pub use virtual_devices::*;
