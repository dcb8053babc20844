//! 環境ダッシュボードの固定データ
//!
//! 外部データソースは持たない。表示用のモックのみ。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Severe,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub level: AlertLevel,
    pub category: &'static str,
    pub age: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Online,
    Synced,
    Offline,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "ONLINE",
            DeviceStatus::Synced => "SYNCED",
            DeviceStatus::Offline => "OFFLINE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IotDevice {
    pub name: &'static str,
    pub last_sync: &'static str,
    pub status: DeviceStatus,
}

/// (名称, 値)
pub const SOIL_MOISTURE: &[(&str, u32)] = &[("Moist", 65), ("Dry", 25), ("Critical", 10)];

/// (作物, 収量予測%)
pub const YIELD_FORECAST: &[(&str, u32)] = &[
    ("Maize", 85),
    ("Cassava", 65),
    ("Sorghum", 92),
    ("Tomato", 45),
];

/// オフライン時に同期待ちとなっているデータ件数
pub const QUEUED_DATA_POINTS: u32 = 12;

pub fn alerts() -> Vec<Alert> {
    vec![
        Alert {
            level: AlertLevel::Severe,
            category: "Severe Weather",
            age: "10m ago",
            message: "Drought warning issued for Zone B. Soil moisture critically low.",
        },
        Alert {
            level: AlertLevel::Warning,
            category: "Water Quality",
            age: "2h ago",
            message: "Borehole #4 flagged for high turbidity. Boil water advisory.",
        },
    ]
}

pub fn iot_devices() -> Vec<IotDevice> {
    vec![
        IotDevice { name: "Pump Station A", last_sync: "Just now", status: DeviceStatus::Online },
        IotDevice { name: "Soil Sensors", last_sync: "2m ago", status: DeviceStatus::Synced },
        IotDevice { name: "Weather Unit", last_sync: "4h ago", status: DeviceStatus::Offline },
    ]
}

/// 値の比率（%）。合計0なら全て0
pub fn shares(data: &[(&str, u32)]) -> Vec<f64> {
    let total: u32 = data.iter().map(|(_, v)| v).sum();
    data.iter()
        .map(|(_, v)| if total == 0 { 0.0 } else { *v as f64 * 100.0 / total as f64 })
        .collect()
}
