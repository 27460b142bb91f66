//! In-memory job status registry.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ttg_models::{JobId, JobStatusRecord};

/// Status records of all jobs started by this process.
///
/// One mutex guards the whole map. It is never held across an await, so
/// pollers and workers only ever contend for the duration of a clone.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, JobStatusRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, JobStatusRecord>> {
        // A panic while holding the lock cannot leave a record half-written.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, job_id: JobId, record: JobStatusRecord) {
        self.lock().insert(job_id, record);
    }

    /// Apply `f` to a job's record. Returns false for unknown jobs.
    pub fn update<F>(&self, job_id: &JobId, f: F) -> bool
    where
        F: FnOnce(&mut JobStatusRecord),
    {
        match self.lock().get_mut(job_id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, job_id: &JobId) -> Option<JobStatusRecord> {
        self.lock().get(job_id).cloned()
    }
}
