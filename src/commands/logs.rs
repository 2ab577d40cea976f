use crate::core::app_log::AppLog;
use chrono::{Local, TimeZone};

pub fn run(log: &AppLog, limit: u32, query: Option<String>) -> anyhow::Result<()> {
    let limit = limit.clamp(1, 5000) as usize;
    let records = log.read(limit, query).map_err(anyhow::Error::msg)?;

    println!("Log directory: {}", log.dir().display());
    for rec in records {
        let ts = Local
            .timestamp_millis_opt(rec.ts_ms)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| rec.ts_ms.to_string());
        match rec.data {
            Some(data) => println!("{} {:<5} {} {} {}", ts, rec.level, rec.scope, rec.message, data),
            None => println!("{} {:<5} {} {}", ts, rec.level, rec.scope, rec.message),
        }
    }
    Ok(())
}
