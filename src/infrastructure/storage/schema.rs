//! SQL for the per-class tables

use crate::domain::entity::EntityClass;

pub fn create_table(class: EntityClass) -> String {
    let mut columns = vec![
        "id VARCHAR(60) PRIMARY KEY".to_string(),
        "created_at TIMESTAMPTZ NOT NULL".to_string(),
        "updated_at TIMESTAMPTZ NOT NULL".to_string(),
        "data JSONB NOT NULL".to_string(),
    ];

    // Checked at commit so a unit of work may stage children before parents
    for fk in class.foreign_keys() {
        columns.push(format!(
            "{} VARCHAR(60) NOT NULL REFERENCES {}(id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED",
            fk.column,
            fk.references.table_name()
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        class.table_name(),
        columns.join(",\n    ")
    )
}

pub fn drop_table(class: EntityClass) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", class.table_name())
}

pub fn select_all(class: EntityClass) -> String {
    format!(
        "SELECT id, created_at, updated_at, data FROM {}",
        class.table_name()
    )
}

/// Insert-or-update keyed on id; parameters are id, created_at, updated_at,
/// data, then one per foreign key
pub fn upsert(class: EntityClass) -> String {
    let mut columns = vec!["id", "created_at", "updated_at", "data"];
    columns.extend(class.foreign_keys().iter().map(|fk| fk.column));

    let placeholders: Vec<String> = (1..=columns.len()).map(|n| format!("${}", n)).collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|column| !matches!(**column, "id" | "created_at"))
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (id) DO UPDATE SET {}",
        class.table_name(),
        columns.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}

pub fn delete(class: EntityClass) -> String {
    format!("DELETE FROM {} WHERE id = $1", class.table_name())
}
