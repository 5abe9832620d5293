//! # DuetKit Communication
//!
//! Talks to networked Duet printer controllers through an injected
//! transport gateway. Provides the Duet payload decoders, the heating
//! progress tracker, chunked file transfers, and the printer session that
//! keeps a coherent view of the printer while polls and commands race each
//! other over the network.

pub mod firmware;
pub mod heating;
pub mod session;
pub mod transfer;
pub mod transport;

pub use firmware::duet::{FactorKind, Request};
pub use heating::{classify, HeaterProgress, HeatingTracker};
pub use session::{AtxPowerOutcome, ClearFaultOutcome, PollFailure, PrinterSession};
pub use transfer::FileTransferCoordinator;
pub use transport::{send_with_deadline, NoOpTransport, Operation, Payload, Transport};
