// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::collections::HashMap;

/// A category of requests whose responses supersede each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Fetches that replace the whole list.
    List,
    /// Mutations and reloads of a single task.
    Task(i64),
}

/// Issued when a request starts; presented again when its response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub channel: Channel,
    pub seq: u64,
}

/// Remembers the latest request issued on each channel.
///
/// A response is applied only if its ticket is still the latest for its
/// channel; anything older lost the race and is dropped.
#[derive(Debug, Default)]
pub struct RequestLedger {
    next_seq: u64,
    latest: HashMap<Channel, u64>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, channel: Channel) -> Ticket {
        self.next_seq += 1;
        self.latest.insert(channel, self.next_seq);
        Ticket {
            channel,
            seq: self.next_seq,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.latest.get(&ticket.channel) == Some(&ticket.seq)
    }

    /// Invalidates every outstanding ticket on `channel`.
    pub fn retire(&mut self, channel: Channel) {
        self.next_seq += 1;
        self.latest.insert(channel, self.next_seq);
    }
}
