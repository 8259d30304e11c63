//! `sa-sim` — session orchestrator for the situational-awareness core.
//!
//! A [`Session`] owns one [`MovementSimulator`][sa_mobility::MovementSimulator]
//! and one [`IncidentEngine`][sa_incident::IncidentEngine] and drives both:
//!
//! ```text
//! every movement tick (default 1 s):
//!   ① apply feed results that arrived since the last tick
//!   ② advance the clock and the simulator; observe the new position
//!   ③ publish a SessionSnapshot on the watch channel
//! every incident tick (default 30 s):
//!   ④ run the lifecycle over every incident past its dwell time
//! ```
//!
//! Two drivers share that logic:
//!
//! - [`Session::run`] — real time.  Two `tokio::time::interval`s, the
//!   operator command channel and the feed channel in one `select!` loop.
//! - [`Session::step`] / [`Session::run_ticks`] — simulated time.  One call
//!   is one movement tick; the incident tick fires on every Nth step.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use sa_sim::{NoopObserver, SessionBuilder, SessionConfig};
//!
//! let config = SessionConfig::load("session.toml")?;
//! let provider = config.route_provider();
//! let mut session = SessionBuilder::new(config, provider).build()?;
//! session.run_ticks(600, &mut NoopObserver).await;
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod observer;
pub mod session;


pub use builder::SessionBuilder;
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use observer::{NoopObserver, SessionObserver};
pub use session::{Session, SessionCommand, SessionSnapshot};
