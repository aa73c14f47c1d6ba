//! Helpers shared by the height monitor binaries.

pub mod hex;
pub mod shutdown;

pub use hex::decode_hex_quantity;
pub use shutdown::{
    ShutdownSignal,
    spawn_shutdown_listener,
    wait_for_shutdown_signal,
};
