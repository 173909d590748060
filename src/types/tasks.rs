use super::DailyTotal;
use crate::database::StoreError;

/// Work items served by the database handler thread.
#[derive(Clone, Debug)]
pub enum StorageTask {
    Save {
        date_key: String,
        count: u64,
    },
    Load {
        date_key: String,
        response_sender: crossbeam_channel::Sender<Result<Option<u64>, StoreError>>,
    },
    History {
        limit: usize,
        response_sender: crossbeam_channel::Sender<Result<Vec<DailyTotal>, StoreError>>,
    },
}

impl StorageTask {
    pub fn name(&self) -> &'static str {
        match self {
            StorageTask::Save { .. } => "save",
            StorageTask::Load { .. } => "load",
            StorageTask::History { .. } => "history",
        }
    }
}
