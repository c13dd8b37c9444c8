mod backups;
mod common;
mod leases;
mod operational_logs;
mod remote_files;
mod sites;

pub use backups::SqliteBackupRepo;
pub use leases::SqliteLeaseRepo;
pub use operational_logs::SqliteOperationalLogRepo;
pub use remote_files::SqliteRemoteFileRepo;
pub use sites::SqliteSiteRepo;
