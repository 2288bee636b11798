use sqlx::PgConnection;

/// A borrowed database connection, either pulled from the pool or belonging to a transaction
pub trait ConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection;
}

/// Gives driven adapters access to external systems without the domain knowing what those
/// systems are. Domain logic only ever passes this through to driven ports.
pub trait ExternalConnectivity: Sync {
    type DbHandle<'cxn_borrow>: ConnectionHandle + Send
    where
        Self: 'cxn_borrow;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error>;
}
