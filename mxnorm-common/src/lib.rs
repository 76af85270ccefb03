pub mod address;
pub mod logging;

pub use address::{Mailbox, extract_address, parse_address};
pub use tracing;
