pub mod demux;
pub mod markers;

pub use demux::{Channel, ChannelDemultiplexer, ChannelEvent, ChannelState};
pub use markers::{ANALYSIS_OPEN, END, FINAL_OPEN, MAX_MARKER_LEN};
