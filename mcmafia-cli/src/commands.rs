//! Subcommand handlers
//!
//! Each handler writes human readable output to the given writer so the
//! binary can print to stdout and tests can capture it.

use crate::cli::Commands;
use crate::config::CliConfig;
use crate::error::CliError;
use crate::store::{read_member_file, FileMemberSource};
use chrono::SecondsFormat;
use comfy_table::{presets::UTF8_FULL, Table};
use mcmafia::{HierarchyService, InMemoryMemberSource, MemberId, MemberRecord, Ranking};
use serde_json::Value;
use std::io::Write;
use ulid::Ulid;

/// Payload field holding a member's display name
const NAME_FIELD: &str = "name";

/// Run one subcommand against the configured store
pub async fn run<W: Write>(
    command: Commands,
    config: &CliConfig,
    out: &mut W,
) -> Result<(), CliError> {
    let service = HierarchyService::new(FileMemberSource::new(&config.store, config.format));

    match command {
        Commands::List {
            group_of,
            organization,
            json,
        } => {
            let records = match (group_of, organization) {
                (Some(id), _) => service.members(&MemberId::from(id)).await?,
                (None, Some(name)) => service.organization(Some(name.as_str())).await?,
                (None, None) => service.source().load_all().await?,
            };
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
            } else {
                write_table(&records, out)?;
            }
        }
        Commands::Subordinates { id } => {
            let count = service.subordinates(&MemberId::from(id)).await?;
            writeln!(out, "{count}")?;
        }
        Commands::Level { id } => {
            let level = service.level(&MemberId::from(id)).await?;
            writeln!(out, "{level}")?;
        }
        Commands::Rank { first, second } => {
            let ranking = service
                .rank(&MemberId::from(first), &MemberId::from(second))
                .await?;
            match ranking {
                Ranking::Outranks { winner, loser } => {
                    writeln!(out, "{winner} outranks {loser}")?
                }
                Ranking::Tied(a, b) => writeln!(out, "{a} and {b} hold equal rank")?,
            }
        }
        Commands::Imprison { id } => {
            let record = service.imprison(&MemberId::from(id)).await?;
            writeln!(out, "Imprisoned {}", record.id)?;
        }
        Commands::Release { id } => {
            let record = service.release(&MemberId::from(id)).await?;
            match &record.parent {
                Some(parent) => writeln!(out, "Released {} under {}", record.id, parent)?,
                None => writeln!(out, "Released {} as the new boss", record.id)?,
            }
        }
        Commands::Draw { id, label, from } => {
            let label = label.as_deref().unwrap_or(&config.render_label);
            let id = MemberId::from(id);
            let text = match from {
                Some(path) => {
                    let records = read_member_file(&path, config.format).await?;
                    HierarchyService::new(InMemoryMemberSource::with_records(records))
                        .draw(&id, label)
                        .await?
                }
                None => service.draw(&id, label).await?,
            };
            write!(out, "{text}")?;
        }
        Commands::Import { file } => {
            let records = read_member_file(&file, config.format).await?;
            let saved = service.import(records).await?;
            writeln!(out, "Imported {} member(s)", saved.len())?;
        }
        Commands::Enlist {
            boss,
            name,
            started_at,
            fields,
        } => {
            let mut record =
                MemberRecord::new(Ulid::new().to_string()).with_field(NAME_FIELD, name);
            if let Some(started_at) = started_at {
                record = record.with_started_at(started_at);
            }
            for (key, value) in fields {
                record = record.with_field(key, field_value(value));
            }
            let record = service.enlist(&MemberId::from(boss), record).await?;
            writeln!(out, "{}", record.id)?;
        }
    }
    Ok(())
}

/// Interpret a `--field` value as JSON when it parses, otherwise as a string
fn field_value(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn write_table<W: Write>(records: &[MemberRecord], out: &mut W) -> Result<(), CliError> {
    if records.is_empty() {
        writeln!(out, "No members found.")?;
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Id", "Name", "Boss", "Subordinates", "Status", "Started"]);

    for record in records {
        let name = record
            .fields
            .get(NAME_FIELD)
            .and_then(Value::as_str)
            .unwrap_or("");
        let boss = record.parent.as_ref().map_or("", MemberId::as_str);
        let status = if record.incapacitated { "Jailed" } else { "Active" };
        let started = record
            .started_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();
        table.add_row(vec![
            record.id.as_str(),
            name,
            boss,
            &record.children.len().to_string(),
            status,
            &started,
        ]);
    }

    writeln!(out, "{table}")?;
    writeln!(out)?;
    writeln!(out, "{} member(s)", records.len())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_value_prefers_json() {
        assert_eq!(field_value("30".into()), json!(30));
        assert_eq!(field_value("true".into()), json!(true));
        assert_eq!(field_value("sicario".into()), json!("sicario"));
    }

    #[test]
    fn test_table_lists_status() {
        let records = vec![
            MemberRecord::new("boss").with_field(NAME_FIELD, "Pablo"),
            MemberRecord::new("ub").with_parent("boss").jailed(),
        ];
        let mut out = Vec::new();
        write_table(&records, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Pablo"));
        assert!(text.contains("Jailed"));
        assert!(text.contains("2 member(s)"));
    }

    #[test]
    fn test_empty_table() {
        let mut out = Vec::new();
        write_table(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No members found.\n");
    }
}
