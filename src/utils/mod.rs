//! Process utilities.

mod signal;

pub use signal::setup_ctrl_c_handler;
