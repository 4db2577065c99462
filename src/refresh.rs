use serde::Serialize;
use uuid::Uuid;

use crate::aggregate;
use crate::error::StoreError;
use crate::models::{Capability, KpiSnapshot, NewResult, ResultGroup, Scope};
use crate::series::SeriesBuilder;
use crate::store::RecordStore;

/// Charts and KPIs computed together from one record snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub groups: Vec<ResultGroup>,
    pub kpis: KpiSnapshot,
}

impl DashboardView {
    pub fn is_empty(&self) -> bool {
        self.kpis.total_records == 0
    }
}

pub fn load_school_view(
    store: &impl RecordStore,
    builder: &SeriesBuilder,
    school_id: Uuid,
    reference_year: i32,
) -> Result<DashboardView, StoreError> {
    let records = store.list_results(school_id)?;
    Ok(DashboardView {
        groups: builder.build(&records),
        kpis: aggregate::summarize(&records, reference_year, Scope::SingleEntity),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

/// Holds the latest view; a refresh that finishes after a newer one is dropped.
#[derive(Debug, Default)]
pub struct RefreshState {
    issued: u64,
    applied: Option<RefreshTicket>,
    view: Option<DashboardView>,
}

impl RefreshState {
    pub fn begin(&mut self) -> RefreshTicket {
        self.issued += 1;
        RefreshTicket(self.issued)
    }

    pub fn apply(&mut self, ticket: RefreshTicket, view: DashboardView) -> bool {
        if self.applied.is_some_and(|applied| applied >= ticket) {
            tracing::debug!(ticket = ticket.0, "discarding stale refresh");
            return false;
        }
        self.applied = Some(ticket);
        self.view = Some(view);
        true
    }

    pub fn view(&self) -> Option<&DashboardView> {
        self.view.as_ref()
    }
}

/// Writes a new result, then re-fetches and recomputes the school's view.
pub fn add_result(
    store: &mut impl RecordStore,
    state: &mut RefreshState,
    builder: &SeriesBuilder,
    capability: Capability,
    fields: NewResult,
    reference_year: i32,
) -> Result<bool, StoreError> {
    if !capability.can_edit {
        tracing::warn!("rejected result creation without edit capability");
        return Err(StoreError::Forbidden("only an editor may add results"));
    }
    let school_id = fields.school_id;
    let created = store.create_result(fields)?;
    tracing::info!(id = %created.id, school = %school_id, "result created");
    refresh(&*store, state, builder, school_id, reference_year)
}

pub fn remove_result(
    store: &mut impl RecordStore,
    state: &mut RefreshState,
    builder: &SeriesBuilder,
    capability: Capability,
    school_id: Uuid,
    result_id: Uuid,
    reference_year: i32,
) -> Result<bool, StoreError> {
    if !capability.can_edit {
        tracing::warn!("rejected result deletion without edit capability");
        return Err(StoreError::Forbidden("only an editor may delete results"));
    }
    store.delete_result(result_id)?;
    tracing::info!(id = %result_id, school = %school_id, "result deleted");
    refresh(&*store, state, builder, school_id, reference_year)
}

pub fn refresh(
    store: &impl RecordStore,
    state: &mut RefreshState,
    builder: &SeriesBuilder,
    school_id: Uuid,
    reference_year: i32,
) -> Result<bool, StoreError> {
    let ticket = state.begin();
    let view = load_school_view(store, builder, school_id, reference_year)?;
    Ok(state.apply(ticket, view))
}
