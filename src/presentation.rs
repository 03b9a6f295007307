//! Presentation formatting
//!
//! Pure mappings from backend enums to display badges, plus marker text.

use crate::backend::{LiveBus, OccupancyLevel, OperationalStatus};
use crate::map::{MarkerContent, MarkerKind};

/// Crowd badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub class: &'static str,
    pub label: &'static str,
}

/// Status badge with color and icon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    pub class: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub label: &'static str,
}

const NEUTRAL_BADGE: Badge = Badge {
    class: "badge-neutral",
    label: "—",
};

const NEUTRAL_STATUS: StatusBadge = StatusBadge {
    class: "status-unknown",
    color: "#9ca3af",
    icon: "•",
    label: "Unknown",
};

/// Badge for a known crowd level; `None` for a value this build doesn't know
pub fn lookup_occupancy_badge(level: OccupancyLevel) -> Option<Badge> {
    let badge = match level {
        OccupancyLevel::Low => Badge {
            class: "badge-low",
            label: "Low",
        },
        OccupancyLevel::Medium => Badge {
            class: "badge-medium",
            label: "Medium",
        },
        OccupancyLevel::High => Badge {
            class: "badge-high",
            label: "High",
        },
        OccupancyLevel::Unknown => return None,
    };
    Some(badge)
}

/// Badge for a known status; `None` for a value this build doesn't know
pub fn lookup_status_badge(status: OperationalStatus) -> Option<StatusBadge> {
    let badge = match status {
        OperationalStatus::Running => StatusBadge {
            class: "status-running",
            color: "#22c55e",
            icon: "▶",
            label: "Running",
        },
        OperationalStatus::Delayed => StatusBadge {
            class: "status-delayed",
            color: "#f59e0b",
            icon: "⏱",
            label: "Delayed",
        },
        OperationalStatus::Breakdown => StatusBadge {
            class: "status-breakdown",
            color: "#ef4444",
            icon: "⚠",
            label: "Breakdown",
        },
        OperationalStatus::Unknown => return None,
    };
    Some(badge)
}

/// Crowd badge for rendering. Values the backend invented since this build
/// get the neutral badge.
pub fn occupancy_badge(level: OccupancyLevel) -> Badge {
    lookup_occupancy_badge(level).unwrap_or_else(|| {
        tracing::warn!("Unrecognized occupancy level from backend, using neutral badge");
        NEUTRAL_BADGE
    })
}

/// Status badge for rendering, neutral for unrecognized values
pub fn status_badge(status: OperationalStatus) -> StatusBadge {
    lookup_status_badge(status).unwrap_or_else(|| {
        tracing::warn!("Unrecognized operational status from backend, using neutral badge");
        NEUTRAL_STATUS
    })
}

/// Marker content for a bus; `route_label` overrides the bus's own route id
pub fn bus_marker_content(bus: &LiveBus, route_label: Option<&str>) -> MarkerContent {
    let crowd = occupancy_badge(bus.occupancy);
    let status = status_badge(bus.status);

    let route = route_label.unwrap_or_else(|| bus.route_label());
    let mut popup = format!(
        "{} · {}\nSpeed: {:.0} km/h\nCrowd: {} ({} on board)\nStatus: {} {}",
        bus.bus_reg, route, bus.speed, crowd.label, bus.passenger_count, status.icon, status.label
    );
    if let Some(reason) = &bus.delay_reason {
        popup.push_str(&format!(" - {}", reason));
    }

    MarkerContent::new(MarkerKind::Bus, bus.bus_reg.clone(), popup)
}

/// "12 min", "1 h 05 min"
pub fn format_eta_minutes(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as u64;
    if total < 60 {
        format!("{} min", total)
    } else {
        format!("{} h {:02} min", total / 60, total % 60)
    }
}

/// "850 m", "12.4 km"
pub fn format_distance_km(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", (km * 1000.0).max(0.0))
    } else {
        format!("{:.1} km", km)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::bus;

    #[test]
    fn test_occupancy_badges_are_distinct() {
        let classes: Vec<_> = [OccupancyLevel::Low, OccupancyLevel::Medium, OccupancyLevel::High]
            .into_iter()
            .map(|l| occupancy_badge(l).class)
            .collect();
        assert_eq!(classes, vec!["badge-low", "badge-medium", "badge-high"]);
    }

    #[test]
    fn test_status_badges() {
        assert_eq!(status_badge(OperationalStatus::Running).color, "#22c55e");
        assert_eq!(status_badge(OperationalStatus::Delayed).class, "status-delayed");
        assert_eq!(status_badge(OperationalStatus::Breakdown).label, "Breakdown");
    }

    /// Fails the test on any value the lookup doesn't cover
    fn expect_badge<T>(badge: Option<T>, what: &str) -> T {
        match badge {
            Some(badge) => badge,
            None => panic!("unrecognized {}", what),
        }
    }

    #[test]
    fn test_lookup_covers_every_known_value() {
        for level in [OccupancyLevel::Low, OccupancyLevel::Medium, OccupancyLevel::High] {
            expect_badge(lookup_occupancy_badge(level), "occupancy level");
        }
        for status in [
            OperationalStatus::Running,
            OperationalStatus::Delayed,
            OperationalStatus::Breakdown,
        ] {
            expect_badge(lookup_status_badge(status), "operational status");
        }
    }

    #[test]
    #[should_panic(expected = "unrecognized operational status")]
    fn test_unknown_status_fails_loudly() {
        expect_badge(lookup_status_badge(OperationalStatus::Unknown), "operational status");
    }

    #[test]
    #[should_panic(expected = "unrecognized occupancy level")]
    fn test_unknown_occupancy_fails_loudly() {
        expect_badge(lookup_occupancy_badge(OccupancyLevel::Unknown), "occupancy level");
    }

    #[test]
    fn test_unknown_values_render_neutral() {
        assert_eq!(occupancy_badge(OccupancyLevel::Unknown), NEUTRAL_BADGE);
        assert_eq!(status_badge(OperationalStatus::Unknown), NEUTRAL_STATUS);

        let mut odd = bus("WB9", 22.57, 88.36);
        odd.status = OperationalStatus::Unknown;
        odd.occupancy = OccupancyLevel::Unknown;
        let content = bus_marker_content(&odd, None);
        assert!(content.popup.contains("Status: • Unknown"));
    }

    #[test]
    fn test_marker_content() {
        let mut delayed = bus("WB1", 22.57, 88.36);
        delayed.status = OperationalStatus::Delayed;
        delayed.delay_reason = Some("Waterlogging".into());

        let content = bus_marker_content(&delayed, Some("S12: Howrah Station → New Town"));
        assert_eq!(content.kind, MarkerKind::Bus);
        assert_eq!(content.label, "WB1");
        assert!(content.popup.contains("S12: Howrah Station → New Town"));
        assert!(content.popup.contains("Delayed - Waterlogging"));

        let content = bus_marker_content(&bus("WB2", 22.5, 88.3), None);
        assert!(content.popup.starts_with("WB2 · S12"));
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta_minutes(12.4), "12 min");
        assert_eq!(format_eta_minutes(65.0), "1 h 05 min");
        assert_eq!(format_eta_minutes(-3.0), "0 min");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance_km(0.85), "850 m");
        assert_eq!(format_distance_km(12.44), "12.4 km");
    }
}
