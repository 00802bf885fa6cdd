use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use validator::Validate;

use crate::core::Ranker;
use crate::models::{SearchKey, SearchQuery, Trial, UserProfile};
use crate::services::{ProfileStore, StoreError, TrialApiError, TrialSearch};
use crate::session::review::{Direction, ReviewProgress, ReviewQueue};

/// Recoverable search failures, surfaced to the presentation layer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("{0}")]
    MissingPrecondition(String),

    #[error("No matching trials found")]
    EmptyResultSet,

    #[error("Failed to fetch trials: {0}")]
    TransportFailure(String),
}

impl From<TrialApiError> for SearchError {
    fn from(value: TrialApiError) -> Self {
        SearchError::TransportFailure(value.to_string())
    }
}

/// Lifecycle of the main search
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SearchStatus {
    #[default]
    Idle,
    Searching,
    Success,
    Error(SearchError),
}

/// What a profile change led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A search ran and produced this many ranked trials
    Ranked { count: usize },
    /// Fingerprint equals the last successful search
    Unchanged,
    /// Another search is still outstanding
    InFlight,
    /// The orchestrator was shut down; nothing was applied
    Discarded,
}

/// Result caps for the main and the supplementary queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub result_cap: usize,
    pub load_more_cap: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            result_cap: 20,
            load_more_cap: 40,
        }
    }
}

/// Publishable view of the session
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: SearchStatus,
    pub trials: Vec<Trial>,
    pub cursor: usize,
    pub current: Option<Trial>,
    pub accepted: Vec<Trial>,
    pub rejected: Vec<Trial>,
}

#[derive(Debug, Default)]
struct SessionState {
    status: SearchStatus,
    fingerprint: Option<SearchKey>,
    profile: Option<UserProfile>,
    ranked: Vec<Trial>,
    review: ReviewQueue,
}

/// Holds the in-flight flag for one outstanding search; clears it on drop,
/// including when the search future is dropped or unwinds.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Trial search orchestrator
///
/// Drives the fetch lifecycle for one user session:
/// - searches when the profile fingerprint changes, at most one at a time;
/// - ranks results through the [`Ranker`];
/// - tracks the review cursor and the accepted/rejected buckets;
/// - appends de-duplicated supplementary results on `load_more`.
///
/// Results that settle after `shutdown` are ignored.
pub struct TrialSearchOrchestrator<S, K> {
    search: S,
    store: K,
    ranker: Ranker,
    limits: SearchLimits,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
    active: AtomicBool,
}

impl<S, K> TrialSearchOrchestrator<S, K>
where
    S: TrialSearch,
    K: ProfileStore,
{
    pub fn new(search: S, store: K, ranker: Ranker, limits: SearchLimits) -> Self {
        Self {
            search,
            store,
            ranker,
            limits,
            state: Mutex::new(SessionState::default()),
            in_flight: AtomicBool::new(false),
            active: AtomicBool::new(true),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn is_searching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Tear down; responses that settle afterwards are dropped
    pub fn shutdown(&self) {
        self.active.store(false, Ordering::Release);
        tracing::debug!("Trial search session shut down");
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    /// React to a (possibly) changed profile
    ///
    /// Skips when the fingerprint matches the last successful search or a
    /// search is already in flight. Empty results leave the fingerprint
    /// untouched so the same profile is retried next time; transport
    /// failures keep the previous ranked list.
    pub async fn on_profile_changed(&self, profile: &UserProfile) -> Result<SearchOutcome, SearchError> {
        if !self.is_active() {
            return Ok(SearchOutcome::Discarded);
        }

        let key = profile.search_key();

        let _guard = {
            let mut state = self.state.lock().await;

            if state.fingerprint.as_ref() == Some(&key) {
                tracing::debug!("Profile fingerprint unchanged, skipping search");
                return Ok(SearchOutcome::Unchanged);
            }
            if self.is_searching() {
                tracing::debug!("Search already in flight, skipping");
                return Ok(SearchOutcome::InFlight);
            }
            if let Err(e) = check_preconditions(profile) {
                tracing::info!("Search not started: {}", e);
                state.status = SearchStatus::Error(e.clone());
                return Err(e);
            }

            let Some(guard) = InFlightGuard::acquire(&self.in_flight) else {
                return Ok(SearchOutcome::InFlight);
            };
            state.status = SearchStatus::Searching;
            guard
        };

        let condition = profile.primary_condition().unwrap_or_default();
        let query = SearchQuery::for_profile(profile, condition, self.limits.result_cap);

        tracing::info!("Searching trials for '{}' near '{}'", query.condition, query.city);

        let result = self
            .search
            .search(&query.condition, &query.city, &query.options)
            .await;

        if !self.is_active() {
            tracing::debug!("Discarding search response after shutdown");
            return Ok(SearchOutcome::Discarded);
        }

        let mut state = self.state.lock().await;
        match result {
            Err(e) => {
                tracing::error!("Trial search failed: {}", e);
                let err = SearchError::from(e);
                state.status = SearchStatus::Error(err.clone());
                Err(err)
            }
            Ok(trials) if trials.is_empty() => {
                tracing::warn!("Trial search for '{}' returned no results", query.condition);
                state.status = SearchStatus::Error(SearchError::EmptyResultSet);
                Err(SearchError::EmptyResultSet)
            }
            Ok(trials) => {
                let ranked = self.ranker.rank(&trials, profile);
                let count = ranked.len();

                state.ranked = ranked;
                state.review.reset();
                state.fingerprint = Some(key);
                state.profile = Some(profile.clone());
                state.status = SearchStatus::Success;

                tracing::info!("Ranked {} trials (from {} results)", count, trials.len());

                Ok(SearchOutcome::Ranked { count })
            }
        }
    }

    /// Run `on_profile_changed` with the profile saved in the store
    pub async fn refresh_from_store(&self) -> Result<SearchOutcome, SearchError> {
        let profile = match self.store.load_profile() {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                return Err(self
                    .precondition_failed("Create a health profile to start matching trials")
                    .await)
            }
            Err(e) => {
                tracing::warn!("Failed to read saved profile: {}", e);
                return Err(self
                    .precondition_failed(&format!("Saved profile could not be read: {}", e))
                    .await);
            }
        };

        self.on_profile_changed(&profile).await
    }

    async fn precondition_failed(&self, message: &str) -> SearchError {
        let err = SearchError::MissingPrecondition(message.to_string());
        if self.is_active() {
            self.state.lock().await.status = SearchStatus::Error(err.clone());
        }
        err
    }

    /// File the current trial and move to the next one
    ///
    /// Accepting adds the trial to the stored accepted list, which outlives
    /// the session buckets; a failed write is logged and does not undo the
    /// move.
    pub async fn advance(&self, direction: Direction) -> ReviewProgress {
        let mut state = self.state.lock().await;
        if !self.is_active() {
            return state.review.progress();
        }

        let SessionState { ranked, review, .. } = &mut *state;
        let progress = review.advance(ranked, direction);

        if progress.moved && direction == Direction::Accept {
            if let Some(trial) = review.accepted().last() {
                if let Err(e) = self.persist_accepted(trial) {
                    tracing::warn!("Failed to persist accepted trials: {}", e);
                }
            }
        }

        progress
    }

    fn persist_accepted(&self, trial: &Trial) -> Result<(), StoreError> {
        let mut stored = self.store.load_accepted_trials()?;
        if stored.iter().any(|t| t.id == trial.id) {
            return Ok(());
        }
        stored.push(trial.clone());
        self.store.save_accepted_trials(&stored)
    }

    /// Fetch more trials and append the unseen ones
    ///
    /// Queries the secondary condition once something has been accepted,
    /// otherwise the primary one. New trials are ranked among themselves and
    /// appended after the existing list without re-sorting it. Returns the
    /// number of trials added.
    pub async fn load_more(&self) -> Result<usize, SearchError> {
        if !self.is_active() {
            return Ok(0);
        }

        let (profile, condition, _guard) = {
            let state = self.state.lock().await;
            let Some(profile) = state.profile.clone() else {
                return Err(SearchError::MissingPrecondition(
                    "Run a search before loading more trials".to_string(),
                ));
            };
            let Some(guard) = InFlightGuard::acquire(&self.in_flight) else {
                tracing::debug!("Search already in flight, skipping load more");
                return Ok(0);
            };
            let condition = if state.review.accepted().is_empty() {
                profile.primary_condition()
            } else {
                profile.secondary_condition()
            };
            let Some(condition) = condition.map(str::to_string) else {
                return Err(SearchError::MissingPrecondition(
                    "Add at least one medical condition to your profile".to_string(),
                ));
            };
            (profile, condition, guard)
        };

        let query = SearchQuery::for_profile(&profile, &condition, self.limits.load_more_cap);

        tracing::info!("Loading more trials for '{}' near '{}'", query.condition, query.city);

        let result = self
            .search
            .search(&query.condition, &query.city, &query.options)
            .await;

        if !self.is_active() {
            return Ok(0);
        }

        let trials = result.map_err(|e| {
            tracing::error!("Load more failed: {}", e);
            SearchError::from(e)
        })?;

        let mut state = self.state.lock().await;
        let mut known: HashSet<String> = state.ranked.iter().map(|t| t.id.clone()).collect();
        let unseen: Vec<Trial> = trials
            .into_iter()
            .filter(|trial| known.insert(trial.id.clone()))
            .collect();

        let ranked = self.ranker.rank(&unseen, &profile);
        let added = ranked.len();
        state.ranked.extend(ranked);

        tracing::info!("Appended {} new trials ({} total)", added, state.ranked.len());

        Ok(added)
    }

    pub async fn status(&self) -> SearchStatus {
        self.state.lock().await.status.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            status: state.status.clone(),
            trials: state.ranked.clone(),
            cursor: state.review.cursor(),
            current: state.review.current(&state.ranked).cloned(),
            accepted: state.review.accepted().to_vec(),
            rejected: state.review.rejected().to_vec(),
        }
    }
}

/// Conditions and location must be present before searching
fn check_preconditions(profile: &UserProfile) -> Result<(), SearchError> {
    let Err(errors) = profile.validate() else {
        return Ok(());
    };

    let fields = errors.field_errors();
    let message = if fields.contains_key("conditions") {
        "Add at least one medical condition to your profile to search for trials".to_string()
    } else if fields.contains_key("location") {
        "Add your location to your profile to search for nearby trials".to_string()
    } else {
        errors.to_string()
    };

    Err(SearchError::MissingPrecondition(message))
}
