//! Utility functions for generating Firebird SQL.
//!
//! Table names come from the catalog, but they are still quoted so that
//! mixed-case or reserved names survive.

/// User tables only: no system relations (`RDB$SYSTEM_FLAG = 0`), no views.
pub const SQL_LIST_TABLES: &str = "SELECT TRIM(RDB$RELATION_NAME) FROM RDB$RELATIONS \
WHERE RDB$SYSTEM_FLAG = 0 AND RDB$VIEW_BLR IS NULL \
ORDER BY RDB$RELATION_NAME";

/// Name, storage type and scale of every column, in field-position order.
pub const SQL_GET_COLUMNS: &str = "SELECT TRIM(rf.RDB$FIELD_NAME), \
COALESCE(f.RDB$FIELD_TYPE, 0), COALESCE(f.RDB$FIELD_SCALE, 0) \
FROM RDB$RELATION_FIELDS rf \
LEFT JOIN RDB$FIELDS f ON f.RDB$FIELD_NAME = rf.RDB$FIELD_SOURCE \
WHERE rf.RDB$RELATION_NAME = ? \
ORDER BY rf.RDB$FIELD_POSITION";

// RDB$FIELDS.RDB$FIELD_TYPE codes.
const FIELD_SHORT: i64 = 7;
const FIELD_LONG: i64 = 8;
const FIELD_DATE: i64 = 12;
const FIELD_TIME: i64 = 13;
const FIELD_INT64: i64 = 16;
const FIELD_INT128: i64 = 26;

/// A column as described by the system catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub field_type: i64,
    pub scale: i64,
}

/// Wraps an identifier in double quotes, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn count_query(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_ident(table))
}

/// Selects one column. The wire client widens DATE and TIME to TIMESTAMP and
/// scaled integers to DOUBLE, so those are cast to text on the server to
/// keep their exact value.
pub fn column_expr(column: &ColumnSpec) -> String {
    let ident = quote_ident(&column.name);
    let cast = match column.field_type {
        FIELD_DATE | FIELD_TIME => Some("VARCHAR(24)"),
        FIELD_SHORT | FIELD_LONG | FIELD_INT64 | FIELD_INT128 if column.scale < 0 => {
            Some("VARCHAR(48)")
        }
        _ => None,
    };
    match cast {
        Some(target) => format!("CAST({} AS {}) AS {}", ident, target, ident),
        None => ident,
    }
}

/// Select list for a whole row; `*` when the catalog knows no columns.
pub fn select_list(columns: &[ColumnSpec]) -> String {
    if columns.is_empty() {
        return "*".to_string();
    }
    columns.iter().map(column_expr).collect::<Vec<_>>().join(", ")
}

pub fn select_all_query(table: &str, select: &str) -> String {
    format!("SELECT {} FROM {}", select, quote_ident(table))
}

/// `FIRST n SKIP m` page ordered by `RDB$DB_KEY`, the physical record key,
/// so that consecutive pages never skip or repeat a row.
pub fn page_query(table: &str, select: &str, first: u64, skip: u64) -> String {
    format!(
        "SELECT FIRST {} SKIP {} {} FROM {} ORDER BY RDB$DB_KEY",
        first,
        skip,
        select,
        quote_ident(table)
    )
}
