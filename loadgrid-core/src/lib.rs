//! Loadgrid core library - workload matrix engine for team planning

// Global invariants enforced in this crate:
// - The view is a pure function of (records, view state); no cached derived data
// - No global mutable state, no clocks outside explicit `today` arguments
// - Row and total order is explicit: first encounter, then a stable sort
// - Malformed individual records never abort a render
// - Identical input yields byte-for-byte identical output

pub mod calendar;
pub mod color;
pub mod config;
pub mod error;
pub mod html;
pub mod import;
pub mod pivot;
pub mod record;
pub mod report;
pub mod session;
pub mod view;

pub use calendar::CalendarKey;
pub use color::{ColorRamp, Rgb};
pub use config::ResolvedConfig;
pub use error::{LoadgridError, Result};
pub use pivot::PivotRow;
pub use record::LoadRecord;
pub use session::{Identity, Session};
pub use view::{MatrixView, ViewState};

use pivot::{IdIdentity, NameIdentity};

/// Render records with the grouping selected by `identity`
pub fn render_records(records: &[LoadRecord], state: &ViewState, identity: Identity) -> MatrixView {
    match identity {
        Identity::Name => view::render_view(records, state, &NameIdentity),
        Identity::Id => view::render_view(records, state, &IdIdentity),
    }
}
