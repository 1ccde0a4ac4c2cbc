//! SQL dialect support.
//!
//! Different databases have slightly different SQL syntax. The [`Dialect`]
//! enum is the closed set of engines a connection can be tagged with; every
//! component that quotes identifiers, escapes strings or paginates asks the
//! connection's dialect.

use std::fmt;
use std::str::FromStr;

use crate::error::DbError;

/// A database dialect, identified by the driver tag of a DSN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// MySQL and MariaDB.
    #[default]
    Mysql,
    /// SQLite 3.
    Sqlite,
    /// PostgreSQL.
    Pgsql,
    /// Microsoft SQL Server.
    Sqlsrv,
}

impl Dialect {
    /// Returns the driver tag (`mysql`, `sqlite`, `pgsql`, `sqlsrv`).
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Pgsql => "pgsql",
            Self::Sqlsrv => "sqlsrv",
        }
    }

    /// Returns the identifier quote character.
    #[must_use]
    pub const fn identifier_quote(self) -> char {
        match self {
            Self::Mysql => '`',
            Self::Sqlite | Self::Pgsql | Self::Sqlsrv => '"',
        }
    }

    /// Whether a backslash escapes the next character inside string literals.
    #[must_use]
    pub const fn backslash_escapes(self) -> bool {
        matches!(self, Self::Mysql)
    }

    /// Quotes an identifier, doubling any embedded quote character.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        let q = self.identifier_quote();
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Quotes a string literal.
    ///
    /// MySQL escapes the same characters as `mysql_real_escape_string`; the
    /// other dialects double single quotes.
    #[must_use]
    pub fn quote_string(self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        if self.backslash_escapes() {
            for c in s.chars() {
                match c {
                    '\0' => out.push_str("\\0"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\\' => out.push_str("\\\\"),
                    '\'' => out.push_str("\\'"),
                    '"' => out.push_str("\\\""),
                    '\x1a' => out.push_str("\\Z"),
                    other => out.push(other),
                }
            }
        } else {
            out.push_str(&s.replace('\'', "''"));
        }
        out.push('\'');
        out
    }

    /// Returns the positional placeholder for the parameter at `index` (0-based).
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Mysql | Self::Sqlite => String::from("?"),
            Self::Pgsql => format!("${}", index + 1),
            Self::Sqlsrv => format!("@p{}", index + 1),
        }
    }

    /// Whether row limits are expressed with `TOP` / `OFFSET ... FETCH`.
    #[must_use]
    pub const fn uses_top_pagination(self) -> bool {
        matches!(self, Self::Sqlsrv)
    }

    /// The `LIMIT` value standing for "no limit", used when only an offset is set.
    #[must_use]
    pub const fn unbounded_limit(self) -> &'static str {
        match self {
            Self::Mysql => "18446744073709551615",
            Self::Sqlite => "-1",
            Self::Pgsql => "ALL",
            Self::Sqlsrv => "",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Dialect {
    type Err = DbError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "pgsql" | "postgres" | "postgresql" => Ok(Self::Pgsql),
            "sqlsrv" | "mssql" => Ok(Self::Sqlsrv),
            other => Err(DbError::Config(format!("unknown driver tag '{other}'"))),
        }
    }
}
