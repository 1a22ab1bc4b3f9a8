//! Command handlers

use serde_json::{Map, Value};

use tracing::error;

use super::Command;
use crate::context::StorageContext;
use crate::domain::entity::EntityClass;
use crate::domain::DomainError;

/// Runs `command` and closes the storage afterwards.
///
/// A failing command is reported over a failing close; the close error is
/// only logged in that case.
pub async fn run(context: &StorageContext, command: Command) -> anyhow::Result<()> {
    let result = match command {
        Command::Stats => stats(context).await,
        Command::All { class } => all(context, class.as_deref()).await,
        Command::Show { class, id } => show(context, &class, &id).await,
    };

    if let Err(e) = context.storage().close().await {
        match &result {
            Ok(()) => return Err(e.into()),
            Err(_) => error!(error = %e, "Failed to close storage"),
        }
    }

    result
}

pub async fn stats(context: &StorageContext) -> anyhow::Result<()> {
    let storage = context.storage();
    let mut total = 0;

    for class in EntityClass::ALL {
        let count = storage.count(Some(class)).await?;
        total += count;
        println!("{:<8} {}", class.name(), count);
    }
    println!("{:<8} {}", "total", total);

    Ok(())
}

pub async fn all(context: &StorageContext, class: Option<&str>) -> anyhow::Result<()> {
    let storage = context.storage();
    let records = match class {
        Some(name) => storage.all_named(name).await?,
        None => storage.all(None).await?,
    };

    let mut keys: Vec<_> = records.keys().cloned().collect();
    keys.sort();

    let mut document = Map::with_capacity(keys.len());
    for key in keys {
        if let Some(record) = records.get(&key) {
            document.insert(key, record.to_dict()?);
        }
    }

    println!("{}", serde_json::to_string_pretty(&Value::Object(document))?);
    Ok(())
}

pub async fn show(context: &StorageContext, class: &str, id: &str) -> anyhow::Result<()> {
    let class = EntityClass::from_name(class)?;
    let record = context
        .storage()
        .get(class, id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("{} not found", class.storage_key(id))))?;

    println!("{}", serde_json::to_string_pretty(&record.to_dict()?)?);
    Ok(())
}
