use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use airtouch::discovery::ConsoleInfo;
use airtouch::message::{Message, ZoneStatus, ZoneStatusData};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ConsoleOutput<'a> {
    name: &'a str,
    generation: String,
    host: String,
    console_id: &'a str,
    airtouch_id: &'a str,
}

impl<'a> From<&'a ConsoleInfo> for ConsoleOutput<'a> {
    fn from(info: &'a ConsoleInfo) -> Self {
        Self {
            name: &info.name,
            generation: info.generation.to_string(),
            host: info.host.to_string(),
            console_id: &info.console_id,
            airtouch_id: &info.airtouch_id,
        }
    }
}

pub fn print_consoles(consoles: &[ConsoleInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<ConsoleOutput<'_>> = consoles.iter().map(ConsoleOutput::from).collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "GENERATION", "HOST", "CONSOLE ID", "AIRTOUCH ID"]);
            for info in consoles {
                table.add_row(vec![
                    info.name.clone(),
                    info.generation.to_string(),
                    info.host.to_string(),
                    info.console_id.clone(),
                    info.airtouch_id.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for info in consoles {
                println!(
                    "{} ({}) at {} console_id={} airtouch_id={}",
                    info.name, info.generation, info.host, info.console_id, info.airtouch_id
                );
            }
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    console: &'a str,
    kind: &'static str,
    request: bool,
    timestamp: String,
    detail: String,
}

pub fn print_message(console: &str, message: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                console,
                kind: message.kind().name(),
                request: message.is_request(),
                timestamp: now_unix_seconds(),
                detail: format!("{message:?}"),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => match message {
            Message::ZoneStatus(ZoneStatus::Report(zones)) => println!("{}", zone_table(zones)),
            other => println!("{}: {other:?}", other.kind()),
        },
        OutputFormat::Pretty => {
            println!("[{console}] {}: {message:#?}", message.kind());
        }
    }
}

pub fn print_connection_lost(console: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "console": console,
                "kind": "connection-lost",
                "timestamp": now_unix_seconds(),
            })
        ),
        OutputFormat::Table | OutputFormat::Pretty => println!("[{console}] connection lost"),
    }
}

fn zone_table(zones: &[ZoneStatusData]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "ZONE", "POWER", "CONTROL", "DAMPER", "SET POINT", "TEMP", "SPILL", "BATTERY",
        ]);
    for zone in zones {
        table.add_row(vec![
            zone.zone_number.to_string(),
            format!("{:?}", zone.zone_power_state),
            format!("{:?}", zone.control_method),
            format!("{}%", zone.damper_percentage),
            celsius(zone.set_point),
            celsius(zone.temperature),
            if zone.spill_active { "yes" } else { "no" }.to_string(),
            format!("{:?}", zone.sensor_battery_status),
        ]);
    }
    table
}

fn celsius(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}°C"))
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use airtouch::message::{SensorBatteryStatus, ZoneControlMethod, ZonePowerState};

    use super::*;

    #[test]
    fn zone_table_shows_missing_readings_as_dash() {
        let table = zone_table(&[ZoneStatusData {
            zone_number: 3,
            zone_power_state: ZonePowerState::On,
            control_method: ZoneControlMethod::Damper,
            damper_percentage: 40,
            set_point: None,
            has_sensor: false,
            temperature: Some(21.5),
            spill_active: false,
            sensor_battery_status: SensorBatteryStatus::Normal,
        }])
        .to_string();
        assert!(table.contains("40%"));
        assert!(table.contains("21.5°C"));
        assert!(table.contains(" - "));
    }

    #[test]
    fn console_json_uses_generation_display() {
        let info = ConsoleInfo {
            generation: airtouch::frame::Generation::AirTouch5,
            host: std::net::Ipv4Addr::new(192, 168, 1, 50),
            console_id: "A1".into(),
            airtouch_id: "42".into(),
            name: "Upstairs".into(),
        };
        let value = serde_json::to_value(ConsoleOutput::from(&info)).unwrap();
        assert_eq!(value["host"], "192.168.1.50");
        assert_eq!(value["generation"], info.generation.to_string());
    }
}
