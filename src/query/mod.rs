//! Query parsing and execution
//!
//! ## SQL subset
//!
//! Supports the inference-benchmark workload:
//! - SELECT with plain columns, `*`, or scalar UDF calls over columns
//! - FROM a single registered table
//! - WHERE with AND-ed simple comparison predicates (>, <, =, >=, <=, !=)
//! - GROUP BY bare columns (deduplication; no aggregate functions)
//! - LIMIT
//!
//! Anything outside the subset is a parse error rather than a silent
//! misread.
//!
//! References:
//! - sqlparser-rs: <https://docs.rs/sqlparser>

mod executor;

pub use executor::QueryExecutor;

use sqlparser::ast::{
    BinaryOperator, Expr, FunctionArg, FunctionArgExpr, Query, Select, SelectItem, SetExpr,
    Statement, Value,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// One item of the SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Plain column reference, or `*`.
    Column {
        /// Column name (`*` selects everything)
        name: String,
        /// Output alias, if any
        alias: Option<String>,
    },
    /// Scalar UDF call over column arguments.
    FunctionCall {
        /// Registered function name
        name: String,
        /// Argument column names, in call order
        args: Vec<String>,
        /// Output alias, if any
        alias: Option<String>,
    },
}

/// Comparison operator in a WHERE predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `=`
    Eq,
    /// `!=` / `<>`
    NotEq,
}

impl CompareOp {
    /// Evaluate the comparison for any partially ordered value type.
    pub(crate) fn eval<T: PartialOrd>(self, left: &T, right: &T) -> bool {
        match self {
            Self::Gt => left > right,
            Self::GtEq => left >= right,
            Self::Lt => left < right,
            Self::LtEq => left <= right,
            Self::Eq => left == right,
            Self::NotEq => left != right,
        }
    }
}

/// One simple predicate: `column op literal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Filtered column
    pub column: String,
    /// Comparison operator
    pub op: CompareOp,
    /// Literal operand, kept as text until the column type is known
    pub value: String,
}

/// Parsed SQL query with extracted components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// SELECT list in declaration order
    pub projections: Vec<Projection>,
    /// Table name
    pub table: String,
    /// AND-ed WHERE predicates
    pub filters: Vec<Predicate>,
    /// GROUP BY columns (bare columns = row deduplication)
    pub group_by: Vec<String>,
    /// LIMIT count (optional)
    pub limit: Option<usize>,
}

/// Query parser
pub struct QueryEngine {
    dialect: GenericDialect,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine {
    /// Create a new query engine
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dialect: GenericDialect {},
        }
    }

    /// Parse SQL query into query plan
    ///
    /// # Errors
    /// Returns error if:
    /// - SQL syntax is invalid
    /// - Query uses unsupported features (JOINs, subqueries, aggregates)
    /// - Multiple statements provided
    ///
    /// # Example
    /// ```
    /// use rayo_db::query::QueryEngine;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let engine = QueryEngine::new();
    /// let plan = engine.parse("SELECT score(a, b) FROM listings WHERE a > 1")?;
    /// assert_eq!(plan.table, "listings");
    /// # Ok(())
    /// # }
    /// ```
    pub fn parse(&self, sql: &str) -> crate::Result<QueryPlan> {
        let statements = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| crate::Error::Parse(format!("{e}")))?;

        if statements.len() != 1 {
            return Err(crate::Error::Parse(
                "Only single statements supported".to_string(),
            ));
        }

        let stmt = &statements[0];
        let Statement::Query(query) = stmt else {
            return Err(crate::Error::Parse(
                "Only SELECT queries supported".to_string(),
            ));
        };

        Self::parse_select_query(query)
    }

    fn parse_select_query(query: &Query) -> crate::Result<QueryPlan> {
        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(crate::Error::Parse(
                "Only SELECT queries supported".to_string(),
            ));
        };

        let table = Self::extract_table_name(select)?;
        let projections = Self::extract_projections(&select.projection)?;
        let filters = select
            .selection
            .as_ref()
            .map_or_else(|| Ok(Vec::new()), Self::extract_predicates)?;
        let group_by = Self::extract_group_by(&select.group_by)?;
        let limit = Self::extract_limit(query.limit.as_ref());

        Ok(QueryPlan {
            projections,
            table,
            filters,
            group_by,
            limit,
        })
    }

    fn extract_table_name(select: &Select) -> crate::Result<String> {
        if select.from.is_empty() {
            return Err(crate::Error::Parse("Missing FROM clause".to_string()));
        }

        if select.from.len() > 1 {
            return Err(crate::Error::Parse(
                "Multiple tables not supported".to_string(),
            ));
        }

        let table_with_joins = &select.from[0];
        if !table_with_joins.joins.is_empty() {
            return Err(crate::Error::Parse("JOINs not supported".to_string()));
        }

        Ok(table_with_joins.relation.to_string())
    }

    fn extract_projections(projection: &[SelectItem]) -> crate::Result<Vec<Projection>> {
        let mut projections = Vec::new();

        for item in projection {
            match item {
                SelectItem::Wildcard(_) => projections.push(Projection::Column {
                    name: "*".to_string(),
                    alias: None,
                }),
                SelectItem::UnnamedExpr(expr) => {
                    projections.push(Self::projection_from_expr(expr, None)?);
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    projections.push(Self::projection_from_expr(expr, Some(alias.value.clone()))?);
                }
                SelectItem::QualifiedWildcard(..) => {
                    return Err(crate::Error::Parse(
                        "Qualified wildcards not supported".to_string(),
                    ))
                }
            }
        }

        Ok(projections)
    }

    fn projection_from_expr(expr: &Expr, alias: Option<String>) -> crate::Result<Projection> {
        match expr {
            Expr::Identifier(ident) => Ok(Projection::Column {
                name: ident.value.clone(),
                alias,
            }),
            Expr::Function(func) => {
                let name = func.name.to_string();
                let args = Self::extract_function_args(func)?;
                Ok(Projection::FunctionCall { name, args, alias })
            }
            other => Err(crate::Error::Parse(format!(
                "Unsupported projection expression: {other}"
            ))),
        }
    }

    /// UDF arguments must be bare column references; anything fancier is
    /// outside the subset.
    fn extract_function_args(func: &sqlparser::ast::Function) -> crate::Result<Vec<String>> {
        let sqlparser::ast::FunctionArguments::List(arg_list) = &func.args else {
            return Err(crate::Error::Parse(format!(
                "Function '{}' requires an argument list",
                func.name
            )));
        };

        let mut args = Vec::with_capacity(arg_list.args.len());
        for arg in &arg_list.args {
            let FunctionArg::Unnamed(FunctionArgExpr::Expr(Expr::Identifier(ident))) = arg else {
                return Err(crate::Error::Parse(format!(
                    "Function '{}' arguments must be column names, got {arg}",
                    func.name
                )));
            };
            args.push(ident.value.clone());
        }

        Ok(args)
    }

    /// Flatten an AND chain of simple comparisons into predicates.
    fn extract_predicates(expr: &Expr) -> crate::Result<Vec<Predicate>> {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                let mut predicates = Self::extract_predicates(left)?;
                predicates.extend(Self::extract_predicates(right)?);
                Ok(predicates)
            }
            Expr::BinaryOp { left, op, right } => {
                let op = Self::compare_op(op)?;
                let Expr::Identifier(ident) = left.as_ref() else {
                    return Err(crate::Error::Parse(format!(
                        "Predicate left side must be a column, got {left}"
                    )));
                };
                let value = Self::literal_text(right)?;
                Ok(vec![Predicate {
                    column: ident.value.clone(),
                    op,
                    value,
                }])
            }
            Expr::Nested(inner) => Self::extract_predicates(inner),
            other => Err(crate::Error::Parse(format!(
                "Unsupported WHERE expression: {other}"
            ))),
        }
    }

    fn compare_op(op: &BinaryOperator) -> crate::Result<CompareOp> {
        match op {
            BinaryOperator::Gt => Ok(CompareOp::Gt),
            BinaryOperator::GtEq => Ok(CompareOp::GtEq),
            BinaryOperator::Lt => Ok(CompareOp::Lt),
            BinaryOperator::LtEq => Ok(CompareOp::LtEq),
            BinaryOperator::Eq => Ok(CompareOp::Eq),
            BinaryOperator::NotEq => Ok(CompareOp::NotEq),
            other => Err(crate::Error::Parse(format!(
                "Unsupported comparison operator: {other}"
            ))),
        }
    }

    fn literal_text(expr: &Expr) -> crate::Result<String> {
        match expr {
            Expr::Value(Value::Number(n, _)) => Ok(n.clone()),
            Expr::Value(Value::SingleQuotedString(s)) => Ok(s.clone()),
            Expr::Value(Value::Boolean(b)) => Ok(b.to_string()),
            Expr::UnaryOp {
                op: sqlparser::ast::UnaryOperator::Minus,
                expr,
            } => {
                if let Expr::Value(Value::Number(n, _)) = expr.as_ref() {
                    Ok(format!("-{n}"))
                } else {
                    Err(crate::Error::Parse(format!(
                        "Unsupported literal: -{expr}"
                    )))
                }
            }
            other => Err(crate::Error::Parse(format!(
                "Predicate right side must be a literal, got {other}"
            ))),
        }
    }

    fn extract_group_by(group_by: &sqlparser::ast::GroupByExpr) -> crate::Result<Vec<String>> {
        match group_by {
            sqlparser::ast::GroupByExpr::All(_) => Err(crate::Error::Parse(
                "GROUP BY ALL not supported".to_string(),
            )),
            sqlparser::ast::GroupByExpr::Expressions(exprs, _) => {
                let mut columns = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    let Expr::Identifier(ident) = expr else {
                        return Err(crate::Error::Parse(format!(
                            "GROUP BY supports bare columns only, got {expr}"
                        )));
                    };
                    columns.push(ident.value.clone());
                }
                Ok(columns)
            }
        }
    }

    fn extract_limit(limit: Option<&Expr>) -> Option<usize> {
        limit.and_then(|expr| {
            if let Expr::Value(Value::Number(n, _)) = expr {
                n.parse().ok()
            } else {
                None
            }
        })
    }
}
