use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::Write,
    path::Path,
};

use lurker_client::api::{UserId, UserRecord};

/// Plain-text report: a header with the total, then one line per inactive
/// subscriber, with the resolved name when the lookup knew it.
pub fn write_report(
    path: &Path,
    inactive: &HashSet<UserId>,
    records: &[UserRecord],
) -> anyhow::Result<()> {
    let known: HashMap<UserId, &UserRecord> = records.iter().map(|r| (r.id, r)).collect();
    let mut ids: Vec<UserId> = inactive.iter().copied().collect();
    ids.sort();

    let mut out = File::create(path)?;
    writeln!(out, "Inactive subscribers: {}", ids.len())?;
    for id in ids {
        match known.get(&id) {
            Some(record) => {
                let screen = record
                    .screen_name
                    .as_deref()
                    .map(|s| format!(" ({s})"))
                    .unwrap_or_default();
                writeln!(
                    out,
                    "{id}\t{} {}{screen}",
                    record.first_name, record.last_name
                )?;
            }
            None => writeln!(out, "{id}")?,
        }
    }
    Ok(())
}
