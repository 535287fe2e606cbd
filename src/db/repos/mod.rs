mod events;
mod photos;
mod sessions;
mod users;

pub use events::*;
pub use photos::*;
pub use sessions::*;
pub use users::*;

/// Largest number of record ids the structured-record store accepts in one
/// batch delete call.
pub const MAX_RECORD_BATCH_SIZE: usize = 25;

/// Reject a batch that the backing store would refuse.
pub(crate) fn check_batch_size(size: usize) -> super::DbResult<()> {
    if size > MAX_RECORD_BATCH_SIZE {
        return Err(super::DbError::BatchTooLarge {
            size,
            max: MAX_RECORD_BATCH_SIZE,
        });
    }
    Ok(())
}
