mod backups;
mod leases;
mod operational_logs;
mod remote_files;
mod sites;

pub use backups::PostgresBackupRepo;
pub use leases::PostgresLeaseRepo;
pub use operational_logs::PostgresOperationalLogRepo;
pub use remote_files::PostgresRemoteFileRepo;
pub use sites::PostgresSiteRepo;
