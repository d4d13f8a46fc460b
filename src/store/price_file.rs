use std::{
    collections::BTreeMap,
    fmt::Debug,
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{model::price::DynamicPriceRecord, prelude::*, store::PriceTable};

/// Daily price table persisted as a TOML file.
///
/// The whole table is kept in memory, and every upsert rewrites the file.
pub struct PriceFile {
    path: Option<PathBuf>,
    records: RwLock<BTreeMap<NaiveDate, DynamicPriceRecord>>,
}

#[derive(Default, Serialize, Deserialize)]
struct Document {
    #[serde(default, rename = "price")]
    records: Vec<DynamicPriceRecord>,
}

impl PriceFile {
    /// Open the table, starting empty when the file does not exist yet.
    #[instrument(name = "opening the price table…")]
    pub fn open<P: AsRef<Path> + Debug>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let document: Document = if path.is_file() {
            toml::from_slice(&fs::read(path)?)
                .with_context(|| format!("failed to parse `{}`", path.display()))?
        } else {
            Document::default()
        };
        info!(n_records = document.records.len(), "opened");
        Ok(Self {
            path: Some(path.to_path_buf()),
            records: RwLock::new(
                document.records.into_iter().map(|record| (record.date, record)).collect(),
            ),
        })
    }

    /// Table that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self { path: None, records: RwLock::default() }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn write_to(path: &Path, records: &BTreeMap<NaiveDate, DynamicPriceRecord>) -> Result {
        let document = Document { records: records.values().cloned().collect() };
        let temporary_path = path.with_extension("toml.tmp");
        fs::write(&temporary_path, toml::to_string(&document)?)
            .with_context(|| format!("failed to write `{}`", temporary_path.display()))?;
        fs::rename(&temporary_path, path)
            .with_context(|| format!("failed to replace `{}`", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl PriceTable for PriceFile {
    #[instrument(skip_all, fields(date = %record.date, source = %record.source))]
    async fn upsert(&self, record: DynamicPriceRecord) -> Result {
        let date = record.date;
        let mut records = self.records.write();
        let previous = records.insert(date, record);
        if let Some(path) = &self.path
            && let Err(error) = Self::write_to(path, &records)
        {
            // Keep the table in step with the file.
            match previous {
                Some(previous) => records.insert(date, previous),
                None => records.remove(&date),
            };
            return Err(error);
        }
        debug!(replaced = previous.is_some(), "upserted");
        Ok(())
    }

    async fn get(&self, date: NaiveDate) -> Result<Option<DynamicPriceRecord>> {
        Ok(self.records.read().get(&date).cloned())
    }

    async fn range(&self, dates: RangeInclusive<NaiveDate>) -> Result<Vec<DynamicPriceRecord>> {
        Ok(self.records.read().range(dates).map(|(_, record)| record.clone()).collect())
    }

    async fn latest(&self) -> Result<Option<DynamicPriceRecord>> {
        Ok(self.records.read().last_key_value().map(|(_, record)| record.clone()))
    }
}
