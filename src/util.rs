const PULSEBOARD_URL: &str = "PULSEBOARD_URL";

pub fn get_base_url() -> Option<String> {
    std::env::var(PULSEBOARD_URL)
        .ok()
        .filter(|url| !url.trim().is_empty())
}

const PULSEBOARD_INTERVAL_MS: &str = "PULSEBOARD_INTERVAL_MS";

pub fn get_interval_ms() -> Option<u64> {
    let interval_from_env = std::env::var(PULSEBOARD_INTERVAL_MS).ok()?;
    parse_interval(&interval_from_env)
}

fn parse_interval(raw: &str) -> Option<u64> {
    raw.trim().parse().ok().filter(|ms| *ms > 0)
}

const BYTES_PER_MIB: f64 = 1_048_576.0;

/// bytes/sec → MiB/s as charted by the dashboard
pub fn bytes_per_sec_to_mib(bytes_per_sec: f64) -> f64 {
    bytes_per_sec / BYTES_PER_MIB
}

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human readable size with 1024 steps, e.g. `1.5 GB`
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;

    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Human readable transfer rate, e.g. `2.0 MB/s`
pub fn format_speed(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0) as u64))
}
