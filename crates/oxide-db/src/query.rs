//! Fluent SELECT composition.
//!
//! A [`QueryBuilder`] is obtained from [`StatementExecutor::table`] and
//! renders to prepared SQL text. Every value a caller hands to a condition
//! or join is inlined through [`ValuePreparer`](crate::ValuePreparer); the
//! table-prefix macro is resolved in the final pass.
//!
//! ```ignore
//! let rows = executor
//!     .table("users AS u")
//!     .where_clause(params! { "u.active" => true }, &Params::new())?
//!     .order_by([("u.name", "desc")])
//!     .limit(10)
//!     .get()
//!     .await?;
//! ```

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::executor::StatementExecutor;
use crate::record::Record;
use crate::scan::{collapse_whitespace, map_code};
use crate::statement::{expand_prefix, substitute, table_macro};
use crate::value::Params;

/// Columns of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    /// Passed through verbatim.
    Raw(String),
    /// Column names, quoted per dialect.
    List(Vec<String>),
}

impl From<&str> for Columns {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for Columns {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<Vec<&str>> for Columns {
    fn from(list: Vec<&str>) -> Self {
        Self::List(list.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(list: [&str; N]) -> Self {
        Self::List(list.into_iter().map(String::from).collect())
    }
}

/// A WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A boolean expression; `:name` tokens are inlined from the params.
    Raw(String),
    /// Column to value, each rendered as `(<col> = <literal>)`.
    Columns(Params),
}

impl From<&str> for Condition {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for Condition {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<Params> for Condition {
    fn from(columns: Params) -> Self {
        Self::Columns(columns)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    Asc,
    /// Descending order (DESC)
    Desc,
}

impl OrderDirection {
    /// Parses `ASC` or `DESC`, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }

    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// An ORDER BY specification.
///
/// In [`Order::Pairs`], a pair whose value is `ASC` or `DESC` is
/// `(column, direction)`; any other pair names its column in the value and
/// sorts ascending, so `("0", "name")` orders by `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    /// Passed through verbatim.
    Raw(String),
    /// Key/value pairs.
    Pairs(Vec<(String, String)>),
}

impl From<&str> for Order {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<Vec<(&str, &str)>> for Order {
    fn from(pairs: Vec<(&str, &str)>) -> Self {
        Self::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Order {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self::from(pairs.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for Order {
    fn from(columns: [&str; N]) -> Self {
        Self::Pairs(
            columns
                .iter()
                .enumerate()
                .map(|(i, c)| (i.to_string(), c.to_string()))
                .collect(),
        )
    }
}

/// Kind of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// INNER JOIN
    Inner,
    /// LEFT JOIN
    Left,
    /// RIGHT JOIN
    Right,
}

impl JoinKind {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

#[derive(Debug, Clone)]
struct Join {
    kind: JoinKind,
    table: String,
    alias: Option<String>,
    on: String,
}

/// Fetched rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Rows<T> {
    /// Rows mapped onto the builder's target type.
    Typed(Vec<T>),
    /// Generic records; used whenever columns were selected or tables joined.
    Records(Vec<Record>),
}

/// One fetched row.
#[derive(Debug, Clone, PartialEq)]
pub enum Row<T> {
    /// A row mapped onto the builder's target type.
    Typed(T),
    /// A generic record.
    Record(Record),
}

impl<T> Rows<T> {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Typed(rows) => rows.len(),
            Self::Records(rows) => rows.len(),
        }
    }

    /// Whether no row was fetched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the first row.
    #[must_use]
    pub fn into_first(self) -> Option<Row<T>> {
        match self {
            Self::Typed(rows) => rows.into_iter().next().map(Row::Typed),
            Self::Records(rows) => rows.into_iter().next().map(Row::Record),
        }
    }
}

/// Splits `"real AS alias"`.
fn split_alias(table: &str) -> (String, Option<String>) {
    let parts: Vec<&str> = table.split_whitespace().collect();
    match parts.as_slice() {
        [real, kw, alias] if kw.eq_ignore_ascii_case("as") => {
            ((*real).to_string(), Some((*alias).to_string()))
        }
        _ => (table.trim().to_string(), None),
    }
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A SELECT under construction against one executor.
#[derive(Debug)]
pub struct QueryBuilder<'a, T = Record> {
    executor: &'a mut StatementExecutor,
    table: String,
    alias: Option<String>,
    columns: Option<Columns>,
    joins: Vec<Join>,
    and_conditions: Vec<String>,
    or_conditions: Vec<String>,
    order: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    target: PhantomData<fn() -> T>,
}

impl<'a, T: DeserializeOwned> QueryBuilder<'a, T> {
    /// Creates a builder; `table` may carry an alias as `"real AS alias"`.
    pub fn new(executor: &'a mut StatementExecutor, table: &str) -> Self {
        let (table, alias) = split_alias(table);
        Self {
            executor,
            table,
            alias,
            columns: None,
            joins: Vec::new(),
            and_conditions: Vec::new(),
            or_conditions: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            target: PhantomData,
        }
    }

    /// Sets the selected columns.
    #[must_use]
    pub fn select(mut self, columns: impl Into<Columns>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    /// Sets the alias of the main table.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Adds an INNER JOIN.
    pub fn inner_join(self, table: &str, on: &str, params: &Params) -> Result<Self> {
        self.join(JoinKind::Inner, table, on, params)
    }

    /// Adds a LEFT JOIN.
    pub fn left_join(self, table: &str, on: &str, params: &Params) -> Result<Self> {
        self.join(JoinKind::Left, table, on, params)
    }

    /// Adds a RIGHT JOIN.
    pub fn right_join(self, table: &str, on: &str, params: &Params) -> Result<Self> {
        self.join(JoinKind::Right, table, on, params)
    }

    fn join(mut self, kind: JoinKind, table: &str, on: &str, params: &Params) -> Result<Self> {
        let (table, alias) = split_alias(table);
        let on = substitute(on, self.executor.preparer(), params)?;
        self.joins.push(Join {
            kind,
            table,
            alias,
            on,
        });
        Ok(self)
    }

    /// Adds a condition to the AND group.
    pub fn where_clause(mut self, condition: impl Into<Condition>, params: &Params) -> Result<Self> {
        let rendered = self.render_condition(condition.into(), params)?;
        self.and_conditions.push(rendered);
        Ok(self)
    }

    /// Adds a condition to the OR group, which is appended after the AND group.
    pub fn or_where(mut self, condition: impl Into<Condition>, params: &Params) -> Result<Self> {
        let rendered = self.render_condition(condition.into(), params)?;
        self.or_conditions.push(rendered);
        Ok(self)
    }

    fn render_condition(&self, condition: Condition, params: &Params) -> Result<String> {
        let preparer = self.executor.preparer();
        match condition {
            Condition::Raw(expr) => Ok(format!("({})", substitute(&expr, preparer, params)?)),
            Condition::Columns(columns) => {
                let parts = columns
                    .iter()
                    .map(|(column, value)| -> Result<String> {
                        Ok(format!(
                            "({} = {})",
                            self.quote_column(column),
                            preparer.prepare(value)?
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(parts.join(" AND "))
            }
        }
    }

    /// Adds ORDER BY clauses.
    #[must_use]
    pub fn order_by(mut self, order: impl Into<Order>) -> Self {
        match order.into() {
            Order::Raw(raw) => self.order.push(raw),
            Order::Pairs(pairs) => {
                for (key, value) in pairs {
                    let (column, direction) = match OrderDirection::parse(&value) {
                        Some(direction) => (key, direction),
                        None => (value, OrderDirection::Asc),
                    };
                    let clause = format!("{} {}", self.quote_column(&column), direction.as_sql());
                    self.order.push(clause);
                }
            }
        }
        self
    }

    /// Limits the number of rows.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skips rows.
    #[must_use]
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Quotes a column reference; `*` and expressions are kept.
    fn quote_column(&self, column: &str) -> String {
        let column = column.trim();
        if column == "*" || !column.chars().all(|c| is_name_char(c) || c == '.' || c == '*') {
            return column.to_string();
        }
        match column.rsplit_once('.') {
            Some((_, "*")) => column.to_string(),
            Some((qualifier, name)) => {
                format!("{qualifier}.{}", self.executor.quote_identifier(name))
            }
            None => self.executor.quote_identifier(column),
        }
    }

    /// Whether rows can be mapped onto `T`.
    fn is_typed(&self) -> bool {
        self.columns.is_none() && self.joins.is_empty()
    }

    /// Renders the statement.
    #[must_use]
    pub fn raw_sql(&self) -> String {
        let dialect = self.executor.dialect();
        let top = dialect.uses_top_pagination() && self.order.is_empty() && self.offset.is_none();

        let mut sql = String::from("SELECT ");
        if let (true, Some(n)) = (top, self.limit) {
            sql.push_str(&format!("TOP {n} "));
        }
        match &self.columns {
            None => sql.push('*'),
            Some(Columns::Raw(raw)) => sql.push_str(raw),
            Some(Columns::List(list)) => {
                let quoted: Vec<String> = list.iter().map(|c| self.quote_column(c)).collect();
                sql.push_str(&quoted.join(", "));
            }
        }
        sql.push_str(" FROM ");
        sql.push_str(&table_macro(&self.table));
        if let Some(alias) = &self.alias {
            sql.push_str(&format!(" AS {}", dialect.quote_identifier(alias)));
        }

        for join in &self.joins {
            sql.push_str(&format!(" {} {}", join.kind.as_sql(), table_macro(&join.table)));
            if let Some(alias) = &join.alias {
                sql.push_str(&format!(" AS {}", dialect.quote_identifier(alias)));
            }
            sql.push_str(&format!(" ON {}", join.on));
        }

        if !self.and_conditions.is_empty() || !self.or_conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.and_conditions.join(" AND "));
            if !self.or_conditions.is_empty() {
                if !self.and_conditions.is_empty() {
                    sql.push_str(" OR ");
                }
                sql.push_str(&self.or_conditions.join(" OR "));
            }
        }

        if dialect.uses_top_pagination() {
            if !top && (self.limit.is_some() || self.offset.is_some()) {
                if self.order.is_empty() {
                    sql.push_str(" ORDER BY (SELECT NULL)");
                } else {
                    sql.push_str(&format!(" ORDER BY {}", self.order.join(", ")));
                }
                sql.push_str(&format!(" OFFSET {} ROWS", self.offset.unwrap_or(0)));
                if let Some(n) = self.limit {
                    sql.push_str(&format!(" FETCH NEXT {n} ROWS ONLY"));
                }
            } else if !self.order.is_empty() {
                sql.push_str(&format!(" ORDER BY {}", self.order.join(", ")));
            }
        } else {
            if !self.order.is_empty() {
                sql.push_str(&format!(" ORDER BY {}", self.order.join(", ")));
            }
            match (self.limit, self.offset) {
                (Some(n), Some(m)) => sql.push_str(&format!(" LIMIT {n} OFFSET {m}")),
                (Some(n), None) => sql.push_str(&format!(" LIMIT {n}")),
                (None, Some(m)) => {
                    sql.push_str(&format!(" LIMIT {} OFFSET {m}", dialect.unbounded_limit()));
                }
                (None, None) => {}
            }
        }

        let sql = self.rewrite_qualifiers(&sql);
        let sql = expand_prefix(&sql, dialect, self.executor.prefix());
        collapse_whitespace(&sql, dialect)
    }

    /// Rewrites `alias.` to the quoted alias and `table.` to the table macro.
    fn rewrite_qualifiers(&self, sql: &str) -> String {
        let dialect = self.executor.dialect();
        let aliases: Vec<&str> = self
            .alias
            .iter()
            .chain(self.joins.iter().filter_map(|j| j.alias.as_ref()))
            .map(String::as_str)
            .collect();
        let tables: Vec<&str> = std::iter::once(self.table.as_str())
            .chain(self.joins.iter().map(|j| j.table.as_str()))
            .collect();

        map_code(sql, dialect, |code| {
            let chars: Vec<char> = code.chars().collect();
            let mut out = String::with_capacity(code.len());
            let mut i = 0;
            while i < chars.len() {
                let prev = if i == 0 { None } else { Some(chars[i - 1]) };
                let starts_word = is_name_char(chars[i])
                    && !prev.is_some_and(|p| is_name_char(p) || p == '.' || p == ':');
                if !starts_word {
                    out.push(chars[i]);
                    i += 1;
                    continue;
                }
                let mut end = i;
                while end < chars.len() && is_name_char(chars[end]) {
                    end += 1;
                }
                let word: String = chars[i..end].iter().collect();
                let qualifies = chars.get(end) == Some(&'.');
                if qualifies && aliases.contains(&word.as_str()) {
                    out.push_str(&dialect.quote_identifier(&word));
                } else if qualifies && tables.contains(&word.as_str()) {
                    out.push_str(&table_macro(&word));
                } else {
                    out.push_str(&word);
                }
                i = end;
            }
            out
        })
    }

    /// Executes the query.
    ///
    /// Returns `Ok(None)` when execution fails; see
    /// [`StatementExecutor::last_error`].
    pub async fn get(self) -> Result<Option<Rows<T>>> {
        let sql = self.raw_sql();
        let typed = self.is_typed();
        let Some(result) = self.executor.exec(&sql, &Params::new()).await? else {
            return Ok(None);
        };
        if !typed {
            return Ok(Some(Rows::Records(result.rows)));
        }
        let rows = result
            .rows
            .into_iter()
            .map(Record::hydrate)
            .collect::<Result<Vec<T>>>()?;
        Ok(Some(Rows::Typed(rows)))
    }

    /// Executes the query with a limit of one and returns the first row.
    ///
    /// `Ok(None)` covers both an empty result and a failed execution.
    pub async fn first(self) -> Result<Option<Row<T>>> {
        let rows = self.limit(1).get().await?;
        Ok(rows.and_then(Rows::into_first))
    }
}
