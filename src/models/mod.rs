mod backup;
mod operational_log;
mod remote_file;
mod site;

pub use backup::*;
pub use operational_log::*;
pub use remote_file::*;
pub use site::*;
