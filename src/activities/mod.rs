//! The five independent periodic activities fanned out onto one
//! [`crate::device::Device`] (spec.md §2, §4.2–§4.6). Each module exposes
//! one or more blocking `run`/`run_*` functions meant to be spawned onto
//! their own OS thread by [`crate::supervisor`] and driven until the
//! shared [`crate::supervisor::ShutdownHandle`] is observed.

pub mod broker_link;
pub mod heartbeat;
pub mod request_processor;
pub mod tag_poller;
pub mod tamper_monitor;
