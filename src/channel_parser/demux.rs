// Streaming demultiplexer that splits Harmony-formatted model output into
// reasoning and final-answer channels.

use serde::Serialize;

use crate::channel_parser::markers::{ANALYSIS_OPEN, END, FINAL_OPEN, MAX_MARKER_LEN};

/// Logical output channel carried by a [`ChannelEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Channel {
    #[serde(rename = "reasoning")]
    Reasoning,
    #[serde(rename = "content")]
    Final,
}

/// Parser state between increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// Outside any segment; text seen here is never emitted.
    #[default]
    Waiting,
    Reasoning,
    Final,
}

impl ChannelState {
    /// The channel text is emitted on while in this state.
    pub fn channel(self) -> Option<Channel> {
        match self {
            ChannelState::Waiting => None,
            ChannelState::Reasoning => Some(Channel::Reasoning),
            ChannelState::Final => Some(Channel::Final),
        }
    }
}

/// A span of text classified into one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEvent {
    pub channel: Channel,
    pub text: String,
}

impl ChannelEvent {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Reasoning,
            text: text.into(),
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Final,
            text: text.into(),
        }
    }
}

type Transition = (&'static str, ChannelState);

const WAITING_TRANSITIONS: &[Transition] = &[
    (ANALYSIS_OPEN, ChannelState::Reasoning),
    (FINAL_OPEN, ChannelState::Final),
];

const REASONING_TRANSITIONS: &[Transition] = &[
    (END, ChannelState::Waiting),
    (FINAL_OPEN, ChannelState::Final),
];

const FINAL_TRANSITIONS: &[Transition] = &[(END, ChannelState::Waiting)];

/// Incremental channel parser for one generation.
///
/// Text is fed in arrival order. Marker literals may be split across any
/// number of increments; they are consumed exactly once and never appear in
/// the emitted events. While a channel is open, at most
/// `MAX_MARKER_LEN - 1` trailing characters are held back, since only those
/// can still turn out to be the start of a marker.
///
/// In the `Waiting` state the whole buffer is retained until an open marker
/// shows up. There is no cap on that growth.
#[derive(Debug, Clone, Default)]
pub struct ChannelDemultiplexer {
    state: ChannelState,
    buffer: String,
}

impl ChannelDemultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Text received but not yet emitted or discarded.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Consume one increment and return every event that can be decided.
    pub fn feed(&mut self, increment: &str) -> Vec<ChannelEvent> {
        self.buffer.push_str(increment);

        let mut events = Vec::new();
        while self.step(&mut events) {}
        events
    }

    /// Flush the remainder of an open channel. Unterminated `Waiting` text
    /// carries no signal and is dropped.
    pub fn finish(&mut self) -> Vec<ChannelEvent> {
        let remainder = std::mem::take(&mut self.buffer);
        let state = std::mem::take(&mut self.state);

        match state.channel() {
            Some(channel) if !remainder.is_empty() => vec![ChannelEvent {
                channel,
                text: remainder,
            }],
            _ => Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.state = ChannelState::Waiting;
        self.buffer.clear();
    }

    /// One scan of the buffer. Returns true when a marker was consumed and the
    /// remainder has to be scanned again in the new state.
    fn step(&mut self, events: &mut Vec<ChannelEvent>) -> bool {
        match self.state {
            ChannelState::Waiting => match earliest(&self.buffer, WAITING_TRANSITIONS) {
                Some((idx, marker, next)) => {
                    self.buffer.drain(..idx + marker.len());
                    self.state = next;
                    true
                }
                None => false,
            },
            ChannelState::Reasoning => {
                self.scan_open(Channel::Reasoning, REASONING_TRANSITIONS, events)
            }
            ChannelState::Final => self.scan_open(Channel::Final, FINAL_TRANSITIONS, events),
        }
    }

    fn scan_open(
        &mut self,
        channel: Channel,
        transitions: &[Transition],
        events: &mut Vec<ChannelEvent>,
    ) -> bool {
        if let Some((idx, marker, next)) = earliest(&self.buffer, transitions) {
            let rest = self.buffer.split_off(idx + marker.len());
            self.buffer.truncate(idx);
            let text = std::mem::replace(&mut self.buffer, rest);
            push_event(events, channel, text);

            if channel == Channel::Reasoning && next == ChannelState::Final {
                log::debug!("Final channel opened without closing the analysis channel");
            }
            self.state = next;
            return true;
        }

        let safe = safe_prefix_len(&self.buffer);
        if safe > 0 {
            let rest = self.buffer.split_off(safe);
            let text = std::mem::replace(&mut self.buffer, rest);
            push_event(events, channel, text);
        }
        false
    }
}

/// Find the marker that starts earliest in `buffer`.
fn earliest(
    buffer: &str,
    transitions: &[Transition],
) -> Option<(usize, &'static str, ChannelState)> {
    transitions
        .iter()
        .filter_map(|&(marker, next)| buffer.find(marker).map(|idx| (idx, marker, next)))
        .min_by_key(|&(idx, _, _)| idx)
}

/// Byte length of the prefix that cannot overlap a marker, keeping the last
/// `MAX_MARKER_LEN - 1` characters.
fn safe_prefix_len(buffer: &str) -> usize {
    let hold = MAX_MARKER_LEN - 1;
    buffer
        .char_indices()
        .rev()
        .nth(hold - 1)
        .map_or(0, |(idx, _)| idx)
}

fn push_event(events: &mut Vec<ChannelEvent>, channel: Channel, text: String) {
    if !text.is_empty() {
        events.push(ChannelEvent { channel, text });
    }
}
