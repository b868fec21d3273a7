// Linux-specific helpers: aggregate CPU jiffies from /proc/stat for I/O-wait.

/// Aggregate CPU time counters from the first "cpu" line of /proc/stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CpuTimes {
    pub iowait: u64,
    pub total: u64,
}

/// Parse the aggregate "cpu ..." line. Fields: user nice system idle iowait irq softirq steal ...
pub(crate) fn parse_cpu_times(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if fields.len() < 5 {
        return None;
    }
    // guest and guest_nice are already counted in user and nice.
    let total = fields.iter().take(8).sum();
    Some(CpuTimes {
        iowait: fields[4],
        total,
    })
}

/// Percentage of CPU time spent waiting on I/O between two readings.
pub(crate) fn iowait_percent(prev: CpuTimes, now: CpuTimes) -> f64 {
    let total = now.total.saturating_sub(prev.total);
    if total == 0 {
        return 0.0;
    }
    let iowait = now.iowait.saturating_sub(prev.iowait);
    ((iowait as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}

/// Read /proc/stat. None when unreadable (non-Linux hosts).
pub(super) fn read_cpu_times_linux() -> Option<CpuTimes> {
    let content = std::fs::read_to_string("/proc/stat").ok()?;
    parse_cpu_times(&content)
}
