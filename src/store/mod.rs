pub mod feed;
pub mod identity;
pub mod repository;
pub mod summaries;
pub mod timeline;

pub use feed::ChangeFeedSubscriber;
pub use identity::IdentityStore;
pub use repository::MessageRepository;
pub use summaries::SummaryList;
pub use timeline::{EntryId, PendingId, Timeline, TimelineEntry};
