//! The ticket core: allocation, duplicate detection, lifecycle, archiving

mod allocator;
mod guard;
mod lifecycle;
mod transcript;

pub use allocator::TicketAllocator;
pub use guard::DuplicateGuard;
pub use lifecycle::{ClosedTicket, OpenedTicket, TicketLifecycle};
pub use transcript::{Transcript, TranscriptArchiver};
