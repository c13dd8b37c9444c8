mod backups;
mod leases;
mod operational_logs;
mod remote_files;
mod sites;

pub use backups::*;
pub use leases::*;
pub use operational_logs::*;
pub use remote_files::*;
pub use sites::*;
