//! Event system for the scraper.
//!
//! Provides hooks for logging and custom reactions around each step of a
//! DataDome challenge flow.

use chrono::{DateTime, Utc};
use http::Method;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::challenges::solvers::ChallengeType;

/// Structured post-response event.
#[derive(Debug, Clone)]
pub struct PostResponseEvent {
    pub url: Url,
    pub method: Method,
    pub status: u16,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
}

/// Step of the challenge flow that just completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStage {
    Detected,
    UrlBuilt,
    Solved,
    CookieMinted,
}

impl fmt::Display for ChallengeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChallengeStage::Detected => "detected",
            ChallengeStage::UrlBuilt => "url-built",
            ChallengeStage::Solved => "solved",
            ChallengeStage::CookieMinted => "cookie-minted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct ChallengeEvent {
    pub domain: String,
    pub stage: ChallengeStage,
    pub challenge_type: Option<ChallengeType>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub domain: String,
    pub error: String,
    pub ip_banned: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum ScraperEvent {
    PostResponse(PostResponseEvent),
    Challenge(ChallengeEvent),
    Error(ErrorEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &ScraperEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: ScraperEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &ScraperEvent) {
        match event {
            ScraperEvent::PostResponse(post) => {
                log::debug!(
                    "<- {} {} -> {} ({:.2}s)",
                    post.method,
                    post.url,
                    post.status,
                    post.latency.as_secs_f64()
                );
            }
            ScraperEvent::Challenge(challenge) => match challenge.challenge_type {
                Some(kind) => log::info!(
                    "challenge {} {} ({})",
                    challenge.domain,
                    challenge.stage,
                    kind
                ),
                None => log::info!("challenge {} {}", challenge.domain, challenge.stage),
            },
            ScraperEvent::Error(error) if error.ip_banned => {
                log::warn!("ip banned while solving {} -> {}", error.domain, error.error);
            }
            ScraperEvent::Error(error) => {
                log::warn!("challenge failed {} -> {}", error.domain, error.error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHandler(std::sync::Mutex<usize>);

    impl EventHandler for CountingHandler {
        fn handle(&self, _event: &ScraperEvent) {
            *self.0.lock().unwrap() += 1;
        }
    }

    #[test]
    fn dispatches_to_handlers() {
        let mut dispatcher = EventDispatcher::new();
        let counter = Arc::new(CountingHandler(std::sync::Mutex::new(0)));
        dispatcher.register_handler(counter.clone());
        dispatcher.register_handler(Arc::new(LoggingHandler));
        dispatcher.dispatch(ScraperEvent::Error(ErrorEvent {
            domain: "example.com".into(),
            error: "timeout".into(),
            ip_banned: false,
            timestamp: Utc::now(),
        }));
        dispatcher.dispatch(ScraperEvent::Challenge(ChallengeEvent {
            domain: "example.com".into(),
            stage: ChallengeStage::Solved,
            challenge_type: Some(ChallengeType::Geetest),
            timestamp: Utc::now(),
        }));
        assert_eq!(*counter.0.lock().unwrap(), 2);
    }

    #[test]
    fn stage_labels() {
        assert_eq!(ChallengeStage::CookieMinted.to_string(), "cookie-minted");
        assert_eq!(ChallengeStage::UrlBuilt.to_string(), "url-built");
    }
}
