//! Session review module.
//!
//! - `model`: log rows and derived sessions (`LogRow`, `Session`)
//! - `segmenter`: the time-gap heuristic (`SessionSegmenter`)
//! - `title`: generated session titles (`TitleGenerator`)

mod model;
mod segmenter;
mod title;

pub use model::{LogRow, Session};
pub use segmenter::{
    DEFAULT_GAP_MINUTES, PREVIEW_CHARS, SessionSegmenter, parse_clock_minutes, preview,
    rows_from_values,
};
pub use title::{TitleGenerator, save_session_title, session_messages};
