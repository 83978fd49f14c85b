//! Application layer for the exchange.
//!
//! - **`client`** – Ports to the host GraphQL client and the pipeline stream
//!   types.
//! - **`messenger`** – The transport port.  Implementations live in
//!   `infrastructure::messenger`.
//! - **`exchange`** – The pipeline tap and its installation handshake.
//! - **`dispatch`** – Exhaustive routing of inspector commands.
//! - **`executor`** – Runs query text the inspector sends.
//! - **`status`** – The instrumentation status service and disconnect handle.
//!
//! **Dependency rule**: nothing in this layer imports `infrastructure`.

pub mod client;
pub mod dispatch;
pub mod exchange;
pub mod executor;
pub mod messenger;
pub mod status;
