//! Executor independent synchronization between the radio driver and the
//! MAC task.
pub mod event_queue;
