//! Message Bus for drafting-run observability
//!
//! The MessageBus provides a pub/sub pattern for the drafting engine to
//! report step-level progress without coupling to whoever is watching (CLI
//! progress output, tests, a future chat front-end). It uses bounded
//! channels to prevent unbounded memory growth and supports both specific
//! event subscriptions and global "All" subscriptions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Channel buffer size for bounded channels
const CHANNEL_BUFFER_SIZE: usize = 100;

/// Event types that can be published on the message bus
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum EventType {
    /// A section was claimed and research started
    SectionStarted,
    /// All retrieval attempts for a section came back empty
    ResearchExhausted,
    /// A section draft was graded
    SectionGraded,
    /// The assembled proposal is complete
    ProposalFinalized,
    /// Subscribe to all event types
    All,
}

/// How a graded section left the writing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeDisposition {
    /// The draft met its brief
    Pass,
    /// The draft missed its brief; research will be retried
    Fail,
    /// The retry budget ran out; the last draft was accepted as-is
    Forced,
}

impl fmt::Display for GradeDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeDisposition::Pass => write!(f, "pass"),
            GradeDisposition::Fail => write!(f, "fail"),
            GradeDisposition::Forced => write!(f, "forced"),
        }
    }
}

/// Events that can be published on the message bus
#[derive(Debug, Clone)]
pub enum Event {
    /// Section claimed for research and writing
    SectionStarted { section: String },
    /// Retrieval found nothing relevant after all attempts
    ResearchExhausted { section: String, attempts: u32 },
    /// Section draft graded
    SectionGraded {
        section: String,
        disposition: GradeDisposition,
    },
    /// Proposal assembled
    ProposalFinalized { sections: usize, chars: usize },
}

impl Event {
    /// Get the event type for this event
    pub fn event_type(&self) -> EventType {
        match self {
            Event::SectionStarted { .. } => EventType::SectionStarted,
            Event::ResearchExhausted { .. } => EventType::ResearchExhausted,
            Event::SectionGraded { .. } => EventType::SectionGraded,
            Event::ProposalFinalized { .. } => EventType::ProposalFinalized,
        }
    }
}

/// Message bus for pub/sub communication
///
/// The MessageBus allows components to subscribe to specific event types
/// or all events, and publish events to all subscribers. It uses bounded
/// channels to prevent unbounded memory growth.
pub struct MessageBus {
    /// Map of event types to lists of subscribers
    /// Each subscriber gets a bounded channel with CHANNEL_BUFFER_SIZE capacity
    channels: Arc<Mutex<HashMap<EventType, Vec<mpsc::Sender<Event>>>>>,
}

impl MessageBus {
    /// Create a new MessageBus
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to a specific event type
    ///
    /// Returns a receiver that will receive events of the specified type.
    /// The channel is bounded with CHANNEL_BUFFER_SIZE capacity to prevent
    /// unbounded memory growth.
    ///
    /// # Arguments
    /// * `event_type` - The type of events to subscribe to, or EventType::All for all events
    pub async fn subscribe(&self, event_type: EventType) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let mut channels = self.channels.lock().await;
        channels.entry(event_type).or_default().push(tx);
        rx
    }

    /// Publish an event to all subscribers
    ///
    /// The event is sent to all subscribers of the specific event type,
    /// as well as all subscribers of EventType::All. If a subscriber's
    /// channel is full or closed, the send will fail silently.
    ///
    /// # Arguments
    /// * `event` - The event to publish
    pub async fn publish(&self, event: Event) {
        let channels = self.channels.lock().await;
        let event_type = event.event_type();

        // Send to specific event type subscribers
        if let Some(subscribers) = channels.get(&event_type) {
            for tx in subscribers {
                // Ignore send errors (subscriber may have dropped receiver)
                let _ = tx.send(event.clone()).await;
            }
        }

        // Also send to "All" subscribers
        if let Some(subscribers) = channels.get(&EventType::All) {
            for tx in subscribers {
                let _ = tx.send(event.clone()).await;
            }
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe(EventType::SectionStarted).await;

        let event = Event::SectionStarted {
            section: "Statement of Need".to_string(),
        };

        bus.publish(event.clone()).await;

        let received = rx.recv().await.unwrap();
        match received {
            Event::SectionStarted { section } => {
                assert_eq!(section, "Statement of Need");
            }
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = MessageBus::new();
        let mut rx1 = bus.subscribe(EventType::SectionGraded).await;
        let mut rx2 = bus.subscribe(EventType::SectionGraded).await;

        let event = Event::SectionGraded {
            section: "Budget Narrative".to_string(),
            disposition: GradeDisposition::Pass,
        };

        bus.publish(event.clone()).await;

        let received1 = rx1.recv().await.unwrap();
        let received2 = rx2.recv().await.unwrap();

        match (received1, received2) {
            (
                Event::SectionGraded { section: s1, .. },
                Event::SectionGraded { section: s2, .. },
            ) => {
                assert_eq!(s1, "Budget Narrative");
                assert_eq!(s2, "Budget Narrative");
            }
            _ => panic!("Wrong event types received"),
        }
    }

    #[tokio::test]
    async fn test_all_event_type() {
        let bus = MessageBus::new();
        let mut rx_all = bus.subscribe(EventType::All).await;
        let mut rx_specific = bus.subscribe(EventType::ResearchExhausted).await;

        let event = Event::ResearchExhausted {
            section: "Project Description".to_string(),
            attempts: 2,
        };

        bus.publish(event.clone()).await;

        let received_all = rx_all.recv().await.unwrap();
        let received_specific = rx_specific.recv().await.unwrap();

        match (received_all, received_specific) {
            (
                Event::ResearchExhausted { attempts: a1, .. },
                Event::ResearchExhausted { attempts: a2, .. },
            ) => {
                assert_eq!(a1, 2);
                assert_eq!(a2, 2);
            }
            _ => panic!("Wrong event types received"),
        }
    }

    #[tokio::test]
    async fn test_different_event_types() {
        let bus = MessageBus::new();
        let mut rx_started = bus.subscribe(EventType::SectionStarted).await;
        let mut rx_finalized = bus.subscribe(EventType::ProposalFinalized).await;

        bus.publish(Event::SectionStarted {
            section: "Goals".to_string(),
        })
        .await;

        bus.publish(Event::ProposalFinalized {
            sections: 5,
            chars: 12000,
        })
        .await;

        let received_started = rx_started.recv().await.unwrap();
        let received_finalized = rx_finalized.recv().await.unwrap();

        match received_started {
            Event::SectionStarted { section } => assert_eq!(section, "Goals"),
            _ => panic!("Wrong event type"),
        }

        match received_finalized {
            Event::ProposalFinalized { sections, .. } => assert_eq!(sections, 5),
            _ => panic!("Wrong event type"),
        }

        // Neither subscriber should have received the other's event
        assert!(rx_started.try_recv().is_err());
        assert!(rx_finalized.try_recv().is_err());
    }
}
