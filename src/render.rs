//! Rendering collaborators
//!
//! [`render_snapshot`] is a pure formatter from a snapshot to display lines.
//! [`spawn_log_renderer`] subscribes to the dashboard events and writes them
//! to the log, which is the binary's only display.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::actors::messages::{DashboardEvent, Notification, NotificationLevel};
use crate::alerts::AlertSeverity;
use crate::dashboard::ChartData;
use crate::snapshot::{Section, Snapshot};
use crate::util::{format_bytes, format_speed};

/// Processes shown in the process list
pub const TOP_PROCESSES: usize = 5;

/// Format a snapshot as display lines, one per widget row
///
/// Failed sections render as a single "unavailable" line.
pub fn render_snapshot(snapshot: &Snapshot, charts: &ChartData) -> Vec<String> {
    let mut lines = Vec::new();

    if let Section::Ok(system) = &snapshot.system {
        let mut line = format!("host {}", system.hostname);
        if let Some(platform) = &system.platform {
            line.push_str(&format!(" ({platform})"));
        }
        if let Some(uptime) = &system.uptime {
            line.push_str(&format!(" up {uptime}"));
        }
        lines.push(line);
    }

    if let Section::Ok(cpu) = &snapshot.cpu {
        let mut line = format!("cpu {:.1}% {}c/{}t", cpu.usage, cpu.cores, cpu.threads);
        if let Some(temperature) = cpu.temperature {
            line.push_str(&format!(" {temperature:.0}°C"));
        }
        lines.push(line);
    }

    if let Section::Ok(memory) = &snapshot.memory {
        lines.push(format!(
            "memory {:.1}% ({} / {})",
            memory.percent,
            format_bytes(memory.used),
            format_bytes(memory.total)
        ));
    }

    if let Section::Ok(gpus) = &snapshot.gpu {
        for gpu in gpus {
            lines.push(format!(
                "gpu {} {:.0}% {:.0}°C {:.0}/{:.0} MB",
                gpu.name, gpu.utilization, gpu.temperature, gpu.memory_used, gpu.memory_total
            ));
        }
    }

    if let Section::Ok(network) = &snapshot.network {
        let interface = network
            .active_interface
            .as_ref()
            .map(|i| i.name.as_str())
            .unwrap_or("-");
        let download = charts.network_download.last().copied().unwrap_or_default();
        let upload = charts.network_upload.last().copied().unwrap_or_default();
        lines.push(format!(
            "network {interface} down {download:.2} MB/s up {upload:.2} MB/s"
        ));
    }

    if let Section::Ok(disk_io) = &snapshot.disk_io {
        lines.push(format!(
            "disk io read {} write {}",
            format_speed(disk_io.read_speed),
            format_speed(disk_io.write_speed)
        ));
    }

    if let Section::Ok(pools) = &snapshot.pools {
        for pool in pools {
            lines.push(format!(
                "pool {} {:.1}% ({} / {})",
                pool.name,
                pool.percent,
                format_bytes(pool.used),
                format_bytes(pool.total)
            ));
        }
    }

    if let Section::Ok(temperatures) = &snapshot.temperatures {
        for (sensor, value) in temperatures {
            lines.push(format!("temp {sensor} {value:.0}°C"));
        }
    }

    if let Section::Ok(processes) = &snapshot.processes {
        let mut top: Vec<_> = processes.iter().collect();
        top.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));

        for process in top.into_iter().take(TOP_PROCESSES) {
            lines.push(format!(
                "proc {} {} cpu {:.1}% mem {:.1}%",
                process.pid, process.name, process.cpu_percent, process.memory_percent
            ));
        }
    }

    for (endpoint, reason) in snapshot.failures() {
        lines.push(format!("{endpoint} unavailable: {reason}"));
    }

    lines
}

/// Spawn a task that writes dashboard events to the log until the channel closes
pub fn spawn_log_renderer(mut events: broadcast::Receiver<DashboardEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("log renderer lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("event channel closed, stopping log renderer");
                    break;
                }
            }
        }
    })
}

fn log_event(event: &DashboardEvent) {
    match event {
        DashboardEvent::Snapshot { snapshot, charts } => {
            for line in render_snapshot(snapshot, charts) {
                debug!(target: "pulseboard::render", "{line}");
            }
        }
        DashboardEvent::AlertRaised(alert) => match alert.severity {
            AlertSeverity::Error => error!("[{}] {}", alert.id, alert.message),
            AlertSeverity::Warning => warn!("[{}] {}", alert.id, alert.message),
        },
        DashboardEvent::AlertCleared { id, reason } => {
            info!("[{id}] cleared ({reason:?})");
        }
        DashboardEvent::Notification(Notification { level, message }) => match level {
            NotificationLevel::Error => error!("{message}"),
            NotificationLevel::Warning => warn!("{message}"),
            NotificationLevel::Info | NotificationLevel::Success => info!("{message}"),
        },
    }
}
