use serde::{Deserialize, Serialize};

/// Kinds of operational log rows subject to age-based retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    SiteUptimeLog,
    SiteRequestLog,
    SiteJobLog,
}

impl LogKind {
    pub const ALL: [LogKind; 3] = [
        LogKind::SiteUptimeLog,
        LogKind::SiteRequestLog,
        LogKind::SiteJobLog,
    ];

    /// Backing table. Fixed names, safe to interpolate into SQL.
    pub fn table(&self) -> &'static str {
        match self {
            LogKind::SiteUptimeLog => "site_uptime_logs",
            LogKind::SiteRequestLog => "site_request_logs",
            LogKind::SiteJobLog => "site_job_logs",
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::SiteUptimeLog => "site_uptime_log",
            LogKind::SiteRequestLog => "site_request_log",
            LogKind::SiteJobLog => "site_job_log",
        }
    }
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
