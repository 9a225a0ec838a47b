//! # Shared Bus - Publish/Subscribe Fan-Out
//!
//! Every component talks to every other component through this bus and
//! nothing else.
//!
//! ## Rules
//!
//! - The bus is an explicit object passed by `Arc`. There is no global, so
//!   several engines can coexist in one test binary.
//! - Publishing never waits on subscribers. Each subscriber receives its own
//!   clone of every event.
//! - A plain subscriber that falls `capacity` events behind skips the oldest
//!   and logs a warning with its running skip count. A lossless subscriber
//!   has its own unbounded queue, filtered on send, and never skips.
//! - A panicking subscriber task dies alone. Neither it nor a slow reader
//!   affects siblings or the publisher.
//! - Every `subscribe()` must be matched by an unsubscribe (explicit or by
//!   dropping the `Subscription`). Unsubscribing twice is a no-op.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Normalizer  │                    │    Engine    │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │ ─────────┘
//!                  │              │ ─────────→ UI / scene consumers
//!                  └──────────────┘  subscribe()
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{ChainVizEvent, EventFilter, EventKind, EventTopic, TransactionEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventSubscriber, Subscription, SubscriptionError, SubscriptionId};

/// Maximum events to buffer per plain subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

