//! Unit of work: repositories bound to one open transaction.
//!
//! # Invariants
//! - Every repository handed out by one unit of work shares one transaction.
//! - Reads see prior writes of the same unit of work.

use crate::model::framework::{Entity, Record};
use crate::repo::entity_repo::SqliteEntityRepository;
use crate::repo::generic_repo::SqliteGenericRepository;
use crate::repo::record_repo::SqliteRecordRepository;
use rusqlite::Connection;

pub struct DomainUnitOfWork<'conn> {
    conn: &'conn Connection,
}

impl<'conn> DomainUnitOfWork<'conn> {
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Typed repository for entity kind `E`.
    pub fn get_for<E: Entity>(&self) -> SqliteEntityRepository<'conn, E> {
        SqliteEntityRepository::new(self.conn)
    }

    /// Keyed repository for record kind `R`.
    pub fn records<R: Record>(&self) -> SqliteRecordRepository<'conn, R> {
        SqliteRecordRepository::new(self.conn)
    }

    pub fn generic(&self) -> SqliteGenericRepository<'conn> {
        SqliteGenericRepository::new(self.conn)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &'conn Connection {
        self.conn
    }
}
