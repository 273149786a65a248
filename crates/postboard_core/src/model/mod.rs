//! Message board records.
//!
//! | Table      | Record       |
//! |------------|--------------|
//! | `users`    | [`User`]     |
//! | `posts`    | [`Post`]     |
//! | `teams`    | [`Team`]     |
//! | `position` | [`Position`] |
//! | `comments` | [`Comment`]  |
//!
//! Only [`Post`] is searchable.

mod comment;
mod position;
mod post;
mod team;
mod user;

pub use comment::Comment;
pub use position::Position;
pub use post::Post;
pub use team::Team;
pub use user::{load_user, User};

use crate::database::Database;
use crate::entity::Record;
use crate::error::CoreResult;
use crate::transaction::Transaction;

/// Inserts a row named `name` for each missing name, in one transaction.
/// Returns the number inserted.
fn ensure_named<T, N, M>(db: &Database, names: &[&str], name_of: N, make: M) -> CoreResult<usize>
where
    T: Record,
    N: Fn(&T) -> &str,
    M: Fn(&str) -> T,
{
    let table = db.table::<T>();
    let existing: Vec<String> = table
        .scan_all()?
        .iter()
        .map(|row| name_of(row).to_string())
        .collect();

    db.transaction(|txn: &mut Transaction| {
        let mut inserted = 0;
        for &name in names {
            if existing.iter().any(|e| e.as_str() == name) {
                continue;
            }
            table.insert(txn, &mut make(name))?;
            inserted += 1;
        }
        Ok(inserted)
    })
}
