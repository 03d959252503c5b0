//! Cross-cutting services module
//!
//! Observability hooks shared by the high level scraper.

pub mod events;

pub use events::{
    ChallengeEvent, ChallengeStage, ErrorEvent, EventDispatcher, EventHandler, LoggingHandler,
    PostResponseEvent, ScraperEvent,
};
