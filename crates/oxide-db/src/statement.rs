//! Token passes over prepared SQL text.
//!
//! Prepared SQL carries two kinds of tokens: the table-prefix macro
//! (`{{name}}`) and named parameters (`:name`). The two alphabets are
//! disjoint and both passes only look at code segments (see [`crate::scan`]),
//! so the output of one pass can never be read as a token by the other.

use serde_json::Value;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::scan::map_code;
use crate::value::{Params, ValuePreparer};

/// Opening token of the table-prefix macro.
pub const PREFIX_OPEN: &str = "{{";
/// Closing token of the table-prefix macro.
pub const PREFIX_CLOSE: &str = "}}";

/// Wraps a bare table name in the prefix macro.
#[must_use]
pub fn table_macro(name: &str) -> String {
    format!("{PREFIX_OPEN}{name}{PREFIX_CLOSE}")
}

/// Rewrites `{{` to `<quote><prefix>` and `}}` to `<quote>`.
#[must_use]
pub fn expand_prefix(sql: &str, dialect: Dialect, prefix: &str) -> String {
    let q = dialect.identifier_quote();
    let open = format!("{q}{prefix}");
    let close = q.to_string();
    map_code(sql, dialect, |code| {
        code.replace(PREFIX_OPEN, &open).replace(PREFIX_CLOSE, &close)
    })
}

fn keywords(sql: &str) -> impl Iterator<Item = String> + '_ {
    sql.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_uppercase)
}

/// First keyword of a statement, upper-cased.
#[must_use]
pub fn leading_keyword(sql: &str) -> String {
    keywords(sql).next().unwrap_or_default()
}

/// Whether a statement opens, ends or marks a transaction.
#[must_use]
pub fn is_transaction_control(sql: &str) -> bool {
    let mut words = keywords(sql);
    match words.next().as_deref() {
        Some("BEGIN" | "COMMIT" | "ROLLBACK" | "END" | "SAVEPOINT" | "RELEASE") => true,
        Some("START") => words.next().as_deref() == Some("TRANSACTION"),
        _ => false,
    }
}

const fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replaces every `:name` token for which `f` returns a replacement.
///
/// `::` (a cast) is never a token.
pub fn replace_tokens(
    sql: &str,
    dialect: Dialect,
    mut f: impl FnMut(&str) -> Option<String>,
) -> String {
    map_code(sql, dialect, |code| {
        let chars: Vec<char> = code.chars().collect();
        let mut out = String::with_capacity(code.len());
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let prev = if i == 0 { None } else { Some(chars[i - 1]) };
            let starts_token = c == ':'
                && prev != Some(':')
                && chars.get(i + 1).is_some_and(|&n| is_name_start(n));
            if !starts_token {
                out.push(c);
                i += 1;
                continue;
            }
            let mut end = i + 1;
            while end < chars.len() && is_name_char(chars[end]) {
                end += 1;
            }
            let name: String = chars[i + 1..end].iter().collect();
            match f(&name) {
                Some(replacement) => out.push_str(&replacement),
                None => {
                    out.push(':');
                    out.push_str(&name);
                }
            }
            i = end;
        }
        out
    })
}

/// Returns the names of the parameter tokens in `sql`, in order of appearance.
#[must_use]
pub fn named_tokens(sql: &str, dialect: Dialect) -> Vec<String> {
    let mut names = Vec::new();
    replace_tokens(sql, dialect, |name| {
        names.push(name.to_string());
        None
    });
    names
}

/// Keeps only the params whose token appears in `sql`.
#[must_use]
pub fn retain_used(sql: &str, dialect: Dialect, params: &Params) -> Params {
    let used = named_tokens(sql, dialect);
    params
        .iter()
        .filter(|(key, _)| used.iter().any(|name| name == *key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Inlines each param as a literal. Tokens without a value are left as-is.
pub fn substitute(sql: &str, preparer: ValuePreparer, params: &Params) -> Result<String> {
    let mut failure = None;
    let out = replace_tokens(sql, preparer.dialect(), |name| {
        let value = params.get(name)?;
        match preparer.prepare(value) {
            Ok(literal) => Some(literal),
            Err(e) => {
                failure.get_or_insert(e);
                None
            }
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(out),
    }
}

/// A statement with named tokens turned into positional placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// SQL with positional placeholders.
    pub sql: String,
    /// Values in placeholder order.
    pub values: Vec<Value>,
    /// Tokens that had no value.
    pub missing: Vec<String>,
}

/// Compiles named tokens into the dialect's positional placeholders.
#[must_use]
pub fn compile(sql: &str, dialect: Dialect, params: &Params) -> Compiled {
    let mut values = Vec::new();
    let mut missing = Vec::new();
    let sql = replace_tokens(sql, dialect, |name| match params.get(name) {
        Some(value) => {
            let placeholder = dialect.placeholder(values.len());
            values.push(value.clone());
            Some(placeholder)
        }
        None => {
            missing.push(name.to_string());
            None
        }
    });
    Compiled {
        sql,
        values,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::params;

    #[test]
    fn test_expand_prefix() {
        let sql = "SELECT * FROM {{users}} WHERE name = '{{literal}}'";
        assert_eq!(
            expand_prefix(sql, Dialect::Mysql, "app_"),
            "SELECT * FROM `app_users` WHERE name = '{{literal}}'"
        );
        assert_eq!(
            expand_prefix(sql, Dialect::Sqlite, ""),
            "SELECT * FROM \"users\" WHERE name = '{{literal}}'"
        );
    }

    #[test]
    fn test_expand_prefix_is_idempotent() {
        let once = expand_prefix("DELETE FROM {{posts}}", Dialect::Mysql, "app_");
        let twice = expand_prefix(&once, Dialect::Mysql, "app_");
        assert_eq!(once, twice);
        assert!(!once.contains(PREFIX_OPEN));
    }

    #[test]
    fn test_named_tokens_skip_literals_and_casts() {
        let sql = "SELECT a::int FROM t WHERE b = :b AND c = ':c' AND `:d` = :e";
        assert_eq!(named_tokens(sql, Dialect::Mysql), vec!["b", "e"]);
    }

    #[test]
    fn test_retain_used() {
        let params = params! { "id" => 1, "unused" => "x" };
        let kept = retain_used("SELECT * FROM t WHERE id = :id", Dialect::Sqlite, &params);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.get("id"), Some(&json!(1)));
    }

    #[test]
    fn test_substitute() {
        let preparer = ValuePreparer::new(Dialect::Sqlite);
        let params = params! { "name" => "O'Brien", "age" => 30 };
        let sql = substitute("name = :name AND age > :age AND x = :x", preparer, &params).unwrap();
        assert_eq!(sql, "name = 'O''Brien' AND age > 30 AND x = :x");
    }

    #[test]
    fn test_substitute_rejects_arrays() {
        let preparer = ValuePreparer::new(Dialect::Sqlite);
        let params = params! { "ids" => [1, 2] };
        assert!(substitute("id IN (:ids)", preparer, &params).is_err());
    }

    #[test]
    fn test_substituted_value_is_not_reexpanded() {
        let preparer = ValuePreparer::new(Dialect::Mysql);
        let params = params! { "a" => ":b", "b" => "boom" };
        let sql = substitute("x = :a", preparer, &params).unwrap();
        assert_eq!(sql, "x = ':b'");
    }

    #[test]
    fn test_transaction_control() {
        assert!(is_transaction_control("BEGIN"));
        assert!(is_transaction_control("  begin transaction;"));
        assert!(is_transaction_control("START TRANSACTION"));
        assert!(is_transaction_control("rollback to savepoint a"));
        assert!(is_transaction_control("COMMIT"));
        assert!(!is_transaction_control("START SLAVE"));
        assert!(!is_transaction_control("CREATE TRIGGER t AFTER INSERT ON a BEGIN SELECT 1; END"));
        assert!(!is_transaction_control("SELECT 'BEGIN'"));
        assert_eq!(leading_keyword("(select 1)"), "SELECT");
        assert_eq!(leading_keyword(""), "");
    }

    #[test]
    fn test_compile_positional() {
        let params = params! { "a" => 1, "b" => "two" };
        let compiled = compile("x = :a AND y = :b OR z = :a AND w = :c", Dialect::Pgsql, &params);
        assert_eq!(compiled.sql, "x = $1 AND y = $2 OR z = $3 AND w = :c");
        assert_eq!(compiled.values, vec![json!(1), json!("two"), json!(1)]);
        assert_eq!(compiled.missing, vec!["c"]);
    }
}
