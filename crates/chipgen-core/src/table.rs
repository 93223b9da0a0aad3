//! Builds the ordered chip table from configured identifiers.

use std::collections::BTreeMap;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::chip::{AttributeField, ChipId, ChipRecord};
use crate::error::{ChipError, Result};
use crate::resolver::AttributeResolver;

/// Resolves every attribute of every chip into [`ChipRecord`]s.
///
/// The first failure aborts the build; no partial table is ever returned.
pub struct TableBuilder<R> {
    resolver: R,
    jobs: usize,
}

impl<R: AttributeResolver> TableBuilder<R> {
    /// Create a sequential builder.
    pub fn new(resolver: R) -> Self {
        TableBuilder { resolver, jobs: 1 }
    }

    /// Resolve up to `jobs` chips concurrently. Output order is unaffected.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// The underlying resolver.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Resolve one chip into a record.
    pub fn build_record(&self, chip: &ChipId) -> Result<ChipRecord> {
        let mut attributes = BTreeMap::new();
        for field in AttributeField::ALL {
            let value = self.resolver.resolve(chip, field)?;
            attributes.insert(field, value);
        }
        let record = ChipRecord::assemble(chip.clone(), attributes)?;
        tracing::debug!(%chip, tag = record.target_tag(), "resolved chip");
        Ok(record)
    }

    /// Resolve every chip, preserving input order and duplicates.
    pub fn build(&self, chips: &[ChipId]) -> Result<Vec<ChipRecord>> {
        let workers = self.jobs.min(chips.len());
        let records = if workers <= 1 {
            chips
                .iter()
                .map(|chip| self.build_record(chip))
                .collect::<Result<Vec<_>>>()?
        } else {
            self.build_concurrent(chips, workers)?
        };
        tracing::info!(chips = records.len(), "chip table resolved");
        Ok(records)
    }

    /// Resolve on a bounded rayon pool. Every chip is resolved and results
    /// are then scanned in input order, so the error returned is the one
    /// the sequential build would report.
    fn build_concurrent(&self, chips: &[ChipId], workers: usize) -> Result<Vec<ChipRecord>> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ChipError::WorkerPool {
                detail: e.to_string(),
            })?;

        let results: Vec<Result<ChipRecord>> = pool.install(|| {
            chips
                .par_iter()
                .map(|chip| self.build_record(chip))
                .collect()
        });

        results.into_iter().collect()
    }
}
