//! Editing session - two-phase mutate/refresh protocol around the pure pipeline
//!
//! A mutation is submitted to a sink and stays pending until the caller
//! refreshes with the full, freshly fetched record set. Only one mutation may
//! be in flight at a time, so an edit cannot race the refresh of the previous
//! one.

use crate::calendar::CalendarKey;
use crate::error::{LoadgridError, Result};
use crate::record::LoadRecord;
use crate::view::{Filters, MatrixView, SortKey, ViewState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Largest load accepted for a single cell edit (days in a month)
pub const MAX_MONTHLY_LOAD: i64 = 31;

/// Change requested by the user, persisted by a [`MutationSink`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationRequest {
    /// Persist one cell of the matrix
    SetLoad {
        person_id: i64,
        subject_id: i64,
        month: CalendarKey,
        load: i64,
    },
    /// Persist the comment of a person/subject line
    SetComment {
        person_id: i64,
        subject_id: i64,
        comment: String,
    },
    /// Create an empty line for a person/subject pair
    AddLine { person_id: i64, subject_id: i64 },
}

impl MutationRequest {
    fn target(&self) -> (i64, i64) {
        match self {
            MutationRequest::SetLoad {
                person_id,
                subject_id,
                ..
            }
            | MutationRequest::SetComment {
                person_id,
                subject_id,
                ..
            }
            | MutationRequest::AddLine {
                person_id,
                subject_id,
            } => (*person_id, *subject_id),
        }
    }

    fn validate(&self) -> Result<()> {
        if let MutationRequest::SetLoad { load, .. } = self {
            if !(0..=MAX_MONTHLY_LOAD).contains(load) {
                return Err(LoadgridError::InvalidLoad {
                    load: *load,
                    max: MAX_MONTHLY_LOAD,
                });
            }
        }
        Ok(())
    }
}

/// Supplies the complete current record set
pub trait RecordSource {
    fn fetch(&mut self) -> anyhow::Result<Vec<LoadRecord>>;
}

/// Persists single mutations
pub trait MutationSink {
    fn submit(&mut self, request: &MutationRequest) -> anyhow::Result<()>;
}

/// Receipt for a submitted mutation awaiting refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    pub sequence: u64,
    pub request: MutationRequest,
}

/// How records collapse into rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    /// Name, firstname, subject name and comment
    #[default]
    Name,
    /// Person id, subject id and comment
    Id,
}

/// View parameters, visibility scope and the in-flight guard
#[derive(Debug, Clone)]
pub struct Session {
    state: ViewState,
    identity: Identity,
    scope: Option<HashSet<i64>>,
    pending: Option<PendingMutation>,
    sequence: u64,
}

impl Session {
    pub fn new(state: ViewState) -> Self {
        Session {
            state,
            identity: Identity::default(),
            scope: None,
            pending: None,
            sequence: 0,
        }
    }

    /// Only records of these person ids are shown
    pub fn with_scope(mut self, person_ids: impl IntoIterator<Item = i64>) -> Self {
        self.scope = Some(person_ids.into_iter().collect());
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn pending(&self) -> Option<&PendingMutation> {
        self.pending.as_ref()
    }

    pub fn request_sort(&mut self, key: SortKey) {
        self.state.sort = self.state.sort.request(key);
    }

    pub fn set_filters(&mut self, filters: Filters) {
        self.state.filters = filters;
    }

    pub fn set_range(&mut self, start: CalendarKey, end: CalendarKey) {
        self.state.start = start;
        self.state.end = end;
    }

    /// Phase one: validate and submit, then hold the mutation until refresh
    pub fn mutate<S: MutationSink>(
        &mut self,
        sink: &mut S,
        request: MutationRequest,
    ) -> Result<PendingMutation, anyhow::Error> {
        if let Some(pending) = &self.pending {
            let (person_id, subject_id) = pending.request.target();
            return Err(LoadgridError::MutationInFlight {
                person_id,
                subject_id,
            }
            .into());
        }
        request.validate()?;

        sink.submit(&request)?;

        self.sequence += 1;
        let pending = PendingMutation {
            sequence: self.sequence,
            request,
        };
        tracing::debug!(sequence = pending.sequence, "mutation submitted");
        self.pending = Some(pending.clone());
        Ok(pending)
    }

    /// Phase two: recompute the whole view from a fresh record set
    pub fn refresh(&mut self, records: &[LoadRecord]) -> MatrixView {
        if let Some(done) = self.pending.take() {
            tracing::debug!(sequence = done.sequence, "mutation settled by refresh");
        }

        let view = match &self.scope {
            Some(scope) => {
                let visible: Vec<LoadRecord> = records
                    .iter()
                    .filter(|r| scope.contains(&r.person_id))
                    .cloned()
                    .collect();
                self.render(&visible)
            }
            None => self.render(records),
        };
        tracing::info!(
            records = records.len(),
            rows = view.rows.len(),
            months = view.months.len(),
            "view refreshed"
        );
        view
    }

    /// Fetch from `source`, then refresh
    pub fn refresh_from<R: RecordSource>(&mut self, source: &mut R) -> anyhow::Result<MatrixView> {
        let records = source.fetch()?;
        Ok(self.refresh(&records))
    }

    fn render(&self, records: &[LoadRecord]) -> MatrixView {
        crate::render_records(records, &self.state, self.identity)
    }
}
