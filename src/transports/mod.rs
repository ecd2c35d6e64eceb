//! Transport adapters — glue between a physical medium and the router.
//!
//! | Adapter  | Extracts a command from      | Responds via              |
//! |----------|------------------------------|---------------------------|
//! | `serial` | length-prefixed frames       | frames on the same line   |
//! | `i2c`    | fixed 32-byte packets        | the out-buffer register   |
//! | `ws`     | text data frames             | a frame to the same peer  |
//! | `http`   | the `/run?cmd=` parameter    | captured lines + sync ack |
//!
//! An adapter's whole job is: reconstruct one complete command string,
//! supply a sink writing back on the same medium. Unknown or malformed
//! input is dropped silently here and never reaches the router.

pub mod frame;
pub mod http;
pub mod i2c;
pub mod serial;
pub mod ws;
