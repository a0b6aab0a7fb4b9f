//! Table-scoped query description
//!
//! The ledger only ever needs `table(..).where(..).order_by(..).limit(..)`
//! shaped reads plus single-row inserts and filtered deletes. [`TableQuery`]
//! captures that shape once; SQL executors compile it with
//! [`TableQuery::to_select_sql`], the in-memory executor evaluates it directly
//! with [`TableQuery::apply`].

use std::cmp::Ordering;

use crate::backends::{DatabaseRow, DatabaseValue, SqlDialect};

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    GreaterThanOrEqual,
}

impl FilterOperator {
    fn as_sql(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "=",
            FilterOperator::GreaterThanOrEqual => ">=",
        }
    }
}

/// `column <op> value`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: DatabaseValue,
}

/// Sort direction of an ORDER BY term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// A read or delete scoped to one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub table: String,
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub orders: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl TableQuery {
    /// Start a query on `table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
        }
    }

    /// Restrict the selected columns; selects `*` when never called
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn where_eq(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            operator: FilterOperator::Equal,
            value: value.into(),
        });
        self
    }

    pub fn where_gte(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            operator: FilterOperator::GreaterThanOrEqual,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.orders.push(OrderBy {
            column: column.to_string(),
            direction: SortDirection::Asc,
        });
        self
    }

    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.orders.push(OrderBy {
            column: column.to_string(),
            direction: SortDirection::Desc,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compile to a SELECT statement plus bound parameters
    pub fn to_select_sql(&self, dialect: SqlDialect) -> (String, Vec<DatabaseValue>) {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };

        let mut sql = format!("select {} from {}", columns, self.table);
        let params = self.push_where(&mut sql, dialect);

        if !self.orders.is_empty() {
            let orders: Vec<String> = self
                .orders
                .iter()
                .map(|order| match order.direction {
                    SortDirection::Asc => format!("{} asc", order.column),
                    SortDirection::Desc => format!("{} desc", order.column),
                })
                .collect();
            sql.push_str(&format!(" order by {}", orders.join(", ")));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" limit {}", limit));
        }

        (sql, params)
    }

    /// Compile to a DELETE statement plus bound parameters. Ordering and limit
    /// are ignored.
    pub fn to_delete_sql(&self, dialect: SqlDialect) -> (String, Vec<DatabaseValue>) {
        let mut sql = format!("delete from {}", self.table);
        let params = self.push_where(&mut sql, dialect);
        (sql, params)
    }

    fn push_where(&self, sql: &mut String, dialect: SqlDialect) -> Vec<DatabaseValue> {
        if self.filters.is_empty() {
            return Vec::new();
        }

        let conditions: Vec<String> = self
            .filters
            .iter()
            .enumerate()
            .map(|(i, filter)| {
                format!(
                    "{} {} {}",
                    filter.column,
                    filter.operator.as_sql(),
                    dialect.parameter_placeholder(i)
                )
            })
            .collect();
        sql.push_str(&format!(" where {}", conditions.join(" and ")));

        self.filters.iter().map(|f| f.value.clone()).collect()
    }

    /// Whether a row satisfies every filter
    pub fn matches(&self, row: &DatabaseRow) -> bool {
        self.filters.iter().all(|filter| {
            let Some(value) = row.get(&filter.column) else {
                return false;
            };
            let ordering = compare_values(value, &filter.value);
            match filter.operator {
                FilterOperator::Equal => ordering == Ordering::Equal,
                FilterOperator::GreaterThanOrEqual => ordering != Ordering::Less,
            }
        })
    }

    /// Evaluate the query against rows held in memory: filter, sort, limit,
    /// then project the selected columns
    pub fn apply(&self, rows: &[DatabaseRow]) -> Vec<DatabaseRow> {
        let mut selected: Vec<DatabaseRow> =
            rows.iter().filter(|row| self.matches(row)).cloned().collect();

        selected.sort_by(|a, b| {
            for order in &self.orders {
                let ordering = match (a.get(&order.column), b.get(&order.column)) {
                    (Some(x), Some(y)) => compare_values(x, y),
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                let ordering = match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }

        if self.columns.is_empty() {
            return selected;
        }

        selected
            .into_iter()
            .map(|row| {
                self.columns.iter().fold(DatabaseRow::new(), |acc, column| {
                    match row.get(column) {
                        Some(value) => acc.with(column.clone(), value.clone()),
                        None => acc,
                    }
                })
            })
            .collect()
    }
}

/// Compile a single-row INSERT
pub fn insert_sql(
    dialect: SqlDialect,
    table: &str,
    values: &[(&str, DatabaseValue)],
) -> (String, Vec<DatabaseValue>) {
    let columns: Vec<&str> = values.iter().map(|(column, _)| *column).collect();
    let placeholders: Vec<String> = (0..values.len())
        .map(|i| dialect.parameter_placeholder(i))
        .collect();

    (
        format!(
            "insert into {} ({}) values ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        ),
        values.iter().map(|(_, value)| value.clone()).collect(),
    )
}

/// Total order over the values the ledger stores. Nulls sort first; values of
/// unrelated kinds compare by their JSON text.
pub(crate) fn compare_values(a: &DatabaseValue, b: &DatabaseValue) -> Ordering {
    match (a, b) {
        (DatabaseValue::Null, DatabaseValue::Null) => Ordering::Equal,
        (DatabaseValue::Null, _) => Ordering::Less,
        (_, DatabaseValue::Null) => Ordering::Greater,
        (DatabaseValue::String(x), DatabaseValue::String(y)) => x.cmp(y),
        (DatabaseValue::Bool(x), DatabaseValue::Bool(y)) => x.cmp(y),
        (DatabaseValue::Float64(x), DatabaseValue::Float64(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        _ => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.to_json().to_string().cmp(&b.to_json().to_string()),
        },
    }
}
