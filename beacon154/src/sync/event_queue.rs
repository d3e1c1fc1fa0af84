//! Queue of radio events.
//!
//! The radio driver posts [`RadioEvent`]s from interrupt context, the MAC
//! task drains them. Access goes through a critical section so both sides
//! may run on different priorities. The queue is bounded: an event posted to
//! a full queue is dropped and [`EventQueue::post`] returns it back.
use core::cell::RefCell;
use core::future::poll_fn;
use core::task::{Poll, Waker};

use critical_section::Mutex;
use heapless::Deque;

use crate::phy::radio::RadioEvent;

/// Depth of the radio event queue.
pub const EVENT_QUEUE_DEPTH: usize = 8;

struct State {
    events: Deque<RadioEvent, EVENT_QUEUE_DEPTH>,
    waker: Option<Waker>,
}

pub struct EventQueue {
    state: Mutex<RefCell<State>>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                events: Deque::new(),
                waker: None,
            })),
        }
    }

    /// Post an event and wake the MAC task.
    pub fn post(&self, event: RadioEvent) -> Result<(), RadioEvent> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let result = state.events.push_back(event);
            if result.is_err() {
                error!("radio event queue full");
            }
            if let Some(waker) = state.waker.take() {
                waker.wake();
            }
            result
        })
    }

    /// Take the oldest event.
    pub fn pop(&self) -> Option<RadioEvent> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).events.pop_front())
    }

    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).events.is_empty())
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).events.len())
    }

    /// Wait until at least one event is queued.
    pub async fn wait(&self) {
        poll_fn(|cx| {
            critical_section::with(|cs| {
                let mut state = self.state.borrow_ref_mut(cs);
                if !state.events.is_empty() {
                    return Poll::Ready(());
                }

                let new_waker = cx.waker();
                state.waker = match state.waker.take() {
                    Some(mut waker) => {
                        if new_waker.will_wake(&waker) {
                            waker.clone_from(new_waker);
                            Some(waker)
                        } else {
                            // another task waits now, wake the previous one
                            waker.wake();
                            Some(new_waker.clone())
                        }
                    }
                    None => Some(new_waker.clone()),
                };
                Poll::Pending
            })
        })
        .await
    }
}
