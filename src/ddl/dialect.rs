//! SQL dialect detection and spelling.

use serde::{Deserialize, Serialize};

/// SQL dialect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Auto-detect from input; generic when generating
    #[default]
    Auto,
    /// Standard SQL
    Generic,
    /// PostgreSQL
    #[serde(alias = "postgres")]
    PostgreSQL,
    /// MySQL
    MySQL,
}

const RESERVED: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BY", "CASE", "CHECK", "COLUMN", "CONSTRAINT", "CREATE", "DEFAULT", "DELETE",
    "DESC", "DISTINCT", "DROP", "FROM", "FOREIGN", "GROUP", "HAVING", "IN", "INDEX", "INSERT", "INTO", "JOIN",
    "KEY", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "PRIMARY", "REFERENCES", "SELECT", "SET",
    "TABLE", "TO", "UNION", "UNIQUE", "UPDATE", "USER", "VALUES", "WHERE",
];

/// Dump headers settle the dialect outright.
const HEADERS: &[(&str, Dialect)] = &[
    ("postgresql database dump", Dialect::PostgreSQL),
    ("pg_dump", Dialect::PostgreSQL),
    ("-- postgres", Dialect::PostgreSQL),
    ("mysql dump", Dialect::MySQL),
    ("mysqldump", Dialect::MySQL),
    ("-- mysql", Dialect::MySQL),
];

/// Spellings only one dialect uses; each occurrence counts as a vote.
const MARKERS: &[(&str, Dialect)] = &[
    ("serial", Dialect::PostgreSQL),
    ("text[]", Dialect::PostgreSQL),
    ("::", Dialect::PostgreSQL),
    ("timestamptz", Dialect::PostgreSQL),
    ("jsonb", Dialect::PostgreSQL),
    ("auto_increment", Dialect::MySQL),
    ("tinyint", Dialect::MySQL),
    ("engine=", Dialect::MySQL),
    ("unsigned", Dialect::MySQL),
    ("`", Dialect::MySQL),
];

impl Dialect {
    const NAMED: [Dialect; 4] = [Self::Auto, Self::Generic, Self::PostgreSQL, Self::MySQL];

    /// Dialect by name, case-insensitive. `postgres` is accepted too.
    pub fn from_str(s: &str) -> Option<Self> {
        let name = s.to_ascii_lowercase();
        if name == "postgres" {
            return Some(Self::PostgreSQL);
        }
        Self::NAMED.into_iter().find(|d| d.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Generic => "generic",
            Self::PostgreSQL => "postgresql",
            Self::MySQL => "mysql",
        }
    }

    /// Guess the dialect a dump was written in. Ties and inputs with no
    /// dialect-specific spelling come out generic.
    pub fn detect(content: &str) -> Self {
        let lower = content.to_lowercase();
        if let Some((_, dialect)) = HEADERS.iter().find(|(h, _)| lower.contains(h)) {
            return *dialect;
        }

        let votes = |dialect: Dialect| -> usize {
            MARKERS
                .iter()
                .filter(|(_, d)| *d == dialect)
                .map(|(m, _)| lower.matches(m).count())
                .sum()
        };
        let (pg, my) = (votes(Self::PostgreSQL), votes(Self::MySQL));
        match pg.cmp(&my) {
            std::cmp::Ordering::Greater => Self::PostgreSQL,
            std::cmp::Ordering::Less => Self::MySQL,
            std::cmp::Ordering::Equal => Self::Generic,
        }
    }

    /// Resolve Auto to a concrete dialect.
    pub fn resolve(self, content: &str) -> Self {
        match self {
            Self::Auto => Self::detect(content),
            other => other,
        }
    }

    /// Concrete dialect for output; there is nothing to detect from.
    pub fn for_output(self) -> Self {
        match self {
            Self::Auto => Self::Generic,
            other => other,
        }
    }

    /// Quote an identifier when it is not a plain word or is reserved.
    pub fn quote_ident(self, name: &str) -> String {
        let plain = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        let reserved = RESERVED.contains(&name.to_ascii_uppercase().as_str());
        if plain && !reserved {
            return name.to_string();
        }
        match self {
            Self::MySQL => format!("`{}`", name.replace('`', "``")),
            _ => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Column definition used for a table with no columns.
    pub fn identity_column(self) -> &'static str {
        match self {
            Self::PostgreSQL => "SERIAL PRIMARY KEY",
            Self::MySQL => "INT AUTO_INCREMENT PRIMARY KEY",
            Self::Auto | Self::Generic => "INTEGER PRIMARY KEY",
        }
    }

    /// Type a column referencing the identity column gets.
    pub fn identity_reference_type(self) -> &'static str {
        match self {
            Self::MySQL => "INT",
            _ => "INTEGER",
        }
    }
}
