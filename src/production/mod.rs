mod flush_scheduler;
mod line_protocol;
mod listener;

pub use flush_scheduler::{FlushScheduler, FlushSchedulerHandle};
pub use line_protocol::{parse_datagram, parse_line, LineError, StatsdEvent};
pub use listener::StatsdListener;
