//! redb table definitions for the project record store.

use redb::TableDefinition;

/// Project records keyed by project id.
pub const PROJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("projects");
