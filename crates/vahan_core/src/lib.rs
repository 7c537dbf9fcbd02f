//! Vahan core: session data, dropdown options and the pure scrape state machine.
mod flow;
mod options;
mod session;

pub use flow::{FlowError, ScrapeFlow, Stage, Step};
pub use options::{match_option, Axis, Selection, SelectionRequest, SelectOption};
pub use session::{focus_field_name, SessionState, VIEW_STATE_FIELD};
