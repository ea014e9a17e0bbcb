use crate::types::{RangeTable, ReferenceTable, StepTable};

pub const SCHEMA: &str = r#"
-- Users are addressed by their external uid in sharings
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uid TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    surname TEXT NOT NULL DEFAULT '',
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Tokens are auth credentials; non-admin tokens must belong to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of ID for fast lookup
    is_admin INTEGER NOT NULL DEFAULT 0,  -- admin tokens only access /api/v1/admin/* routes
    user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,            -- NULL = never
    last_used_at TEXT
);

CREATE TABLE IF NOT EXISTS research_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- relation is one of owner, member, invited
CREATE TABLE IF NOT EXISTS user_has_group (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    group_id INTEGER NOT NULL REFERENCES research_groups(id) ON DELETE CASCADE,
    relation TEXT NOT NULL CHECK (relation IN ('owner', 'member', 'invited')),
    addition_date TEXT,
    PRIMARY KEY (user_id, group_id)
);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS user_project (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, project_id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_user_has_group_group ON user_has_group(group_id);
CREATE INDEX IF NOT EXISTS idx_user_project_project ON user_project(project_id);
"#;

/// DDL for one step table and its two sharing tables.
fn step_table_schema(table: StepTable) -> String {
    let name = table.name();
    let user_sharing = table.user_sharing_table();
    let group_sharing = table.group_sharing_table();
    let parent_columns = if table.is_sample() {
        "project_id INTEGER REFERENCES projects(id)".to_string()
    } else {
        "sequence TEXT NOT NULL,\n    source_id INTEGER".to_string()
    };
    let parent_index = if table.is_sample() {
        "project_id"
    } else {
        "source_id"
    };

    format!(
        r#"
CREATE TABLE IF NOT EXISTS {name} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    {parent_columns},
    is_public INTEGER NOT NULL DEFAULT 0,
    fields TEXT NOT NULL DEFAULT '{{}}',
    created TEXT NOT NULL,
    updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS {user_sharing} (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    {name}_id INTEGER NOT NULL REFERENCES {name}(id) ON DELETE CASCADE,
    access_mode TEXT NOT NULL CHECK (access_mode IN ('read', 'readwrite')),
    PRIMARY KEY (user_id, {name}_id)
);

CREATE TABLE IF NOT EXISTS {group_sharing} (
    group_id INTEGER NOT NULL REFERENCES research_groups(id) ON DELETE CASCADE,
    {name}_id INTEGER NOT NULL REFERENCES {name}(id) ON DELETE CASCADE,
    access_mode TEXT NOT NULL CHECK (access_mode IN ('read', 'readwrite')),
    PRIMARY KEY (group_id, {name}_id)
);

CREATE INDEX IF NOT EXISTS idx_{name}_user ON {name}(user_id);
CREATE INDEX IF NOT EXISTS idx_{name}_parent ON {name}({parent_index});
CREATE INDEX IF NOT EXISTS idx_{user_sharing}_record ON {user_sharing}({name}_id);
CREATE INDEX IF NOT EXISTS idx_{group_sharing}_record ON {group_sharing}({name}_id);
"#
    )
}

fn range_table_schema(table: RangeTable) -> String {
    let name = table.name();
    format!(
        "CREATE TABLE IF NOT EXISTS {name} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL UNIQUE,
    vmin REAL NOT NULL,
    vmax REAL NOT NULL
);\n"
    )
}

fn reference_table_schema(table: ReferenceTable) -> String {
    let name = table.name();
    format!(
        "CREATE TABLE IF NOT EXISTS {name} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL UNIQUE
);\n"
    )
}

fn range_seeds(table: RangeTable) -> &'static [(&'static str, f64, f64)] {
    match table {
        RangeTable::Temperature => &[
            ("Psychrophilic", -20.0, 15.0),
            ("Mesophilic", 15.0, 45.0),
            ("Thermophilic", 45.0, 80.0),
            ("Hyperthermophilic", 80.0, 122.0),
        ],
        RangeTable::Ph => &[
            ("Acidophilic", 0.0, 5.5),
            ("Neutrophilic", 5.5, 8.5),
            ("Alkaliphilic", 8.5, 14.0),
        ],
        RangeTable::Salinity => &[
            ("Non halophilic", 0.0, 1.0),
            ("Slightly halophilic", 1.0, 3.0),
            ("Moderately halophilic", 3.0, 15.0),
            ("Extremely halophilic", 15.0, 35.0),
        ],
    }
}

fn reference_seeds(table: ReferenceTable) -> &'static [&'static str] {
    match table {
        ReferenceTable::Method => &["Shotgun", "Amplicon", "Culture"],
        ReferenceTable::Extraction => &["Commercial kit", "Phenol-chloroform", "CTAB"],
        ReferenceTable::Assembly => &["SPAdes", "MEGAHIT", "IDBA-UD", "Flye"],
        ReferenceTable::Sequencing => &["Illumina", "PacBio", "Oxford Nanopore", "Ion Torrent"],
        ReferenceTable::Binning => &["MetaBAT", "MaxBin", "CONCOCT"],
        ReferenceTable::Oxygen => &["Aerobic", "Anaerobic", "Facultative", "Microaerophilic"],
        ReferenceTable::Fraction => &["Cellular", "Viral", "Total"],
        ReferenceTable::Target => &["16S rRNA", "18S rRNA", "ITS", "Whole genome"],
        ReferenceTable::Hkgenes => &["recA", "gyrB", "rpoB", "dnaK"],
        ReferenceTable::Keywords | ReferenceTable::Publication => &[],
    }
}

/// Step, sharing and reference tables, plus the default reference rows.
/// Seeding is idempotent.
pub fn generated_schema() -> String {
    let mut sql = String::new();
    for table in StepTable::ALL {
        sql.push_str(&step_table_schema(table));
    }
    for table in RangeTable::ALL {
        sql.push_str(&range_table_schema(table));
        for (description, vmin, vmax) in range_seeds(table) {
            sql.push_str(&format!(
                "INSERT OR IGNORE INTO {} (description, vmin, vmax) VALUES ('{description}', {vmin:?}, {vmax:?});\n",
                table.name()
            ));
        }
    }
    for table in ReferenceTable::ALL {
        sql.push_str(&reference_table_schema(table));
        for description in reference_seeds(table) {
            sql.push_str(&format!(
                "INSERT OR IGNORE INTO {} (description) VALUES ('{description}');\n",
                table.name()
            ));
        }
    }
    sql
}
