use std::collections::HashMap;

use sqlparser::ast::{
    Expr, Ident, ObjectName, Offset, OrderByExpr, Query, Select, SelectItem, SetExpr, Statement,
    TableAlias, TableFactor, TableWithJoins,
};

use crate::{
    catalog::Catalog,
    storage::TableSource,
    types::{
        error::{Error, Result},
        Column, DataType, OutputSchema,
    },
};

#[derive(Debug, Clone)]
pub struct PlanNode {
    pub output_schema: OutputSchema,
    pub node: Node,
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub expr: Expr,
    pub asc: bool,
    pub nulls_first: bool,
}

#[derive(Debug, Clone)]
pub enum Node {
    Scan {
        table_name: String,
        source: TableSource,
        filter: Option<Expr>,
    },
    Filter {
        filter: Expr,
        child: Box<PlanNode>,
    },
    Projection {
        exprs: Vec<Expr>,
        child: Box<PlanNode>,
    },
    Sort {
        keys: Vec<SortKey>,
        fetch: Option<u64>,
        child: Box<PlanNode>,
    },
    Limit {
        limit: Option<u64>,
        offset: u64,
        child: Box<PlanNode>,
    },
    Empty {},
}

pub struct Plan {
    pub root: PlanNode,
}

/// Plans visible as table names: common table expressions in scope.
type Scope = HashMap<String, PlanNode>;

pub struct Planner {}

impl Planner {
    pub fn new() -> Planner {
        Planner {}
    }

    pub fn build_statements(&self, statements: &[Statement], catalog: &Catalog) -> Result<Plan> {
        match statements {
            [statement] => self.build_statement(statement, catalog),
            [] => Err(Error::Planner("Empty statement".to_string())),
            _ => Err(Error::Planner(
                "Only one statement can be executed at a time".to_string(),
            )),
        }
    }

    fn build_statement(&self, statement: &Statement, catalog: &Catalog) -> Result<Plan> {
        match statement {
            Statement::Query(query) => Ok(Plan {
                root: self.build_query(query, catalog, &Scope::new())?,
            }),
            _ => Err(Error::Planner(
                "Only Query operations are supported".to_string(),
            )),
        }
    }

    fn build_query(&self, query: &Query, catalog: &Catalog, outer: &Scope) -> Result<PlanNode> {
        let Query {
            ref with,
            ref body,
            ref order_by,
            ref limit,
            ref offset,
            ..
        } = *query;

        // Build WITH
        let mut scope = outer.clone();
        if let Some(with) = with {
            if with.recursive {
                return Err(Error::Planner("Recursive CTEs are not supported".to_string()));
            }
            for cte in &with.cte_tables {
                let node = self.build_query(&cte.query, catalog, &scope)?;
                let node = Self::apply_alias(node, &cte.alias)?;
                tracing::debug!(name = %cte.alias.name.value, "planned common table expression");
                scope.insert(cte.alias.name.value.to_lowercase(), node);
            }
        }

        let node = match &**body {
            SetExpr::Select(select) => self.build_select(select, order_by, catalog, &scope)?,
            SetExpr::Query(inner) => {
                let node = self.build_query(inner, catalog, &scope)?;
                Self::build_sort_over_output(node, order_by)
            }
            _ => return Err(Error::Planner("Only SELECT is supported".to_string())),
        };

        // Build LIMIT / OFFSET
        let limit = limit.as_ref().map(Self::row_count).transpose()?;
        let offset = match offset {
            Some(Offset { value, .. }) => Self::row_count(value)?,
            None => 0,
        };
        if limit.is_none() && offset == 0 {
            return Ok(node);
        }
        Ok(PlanNode {
            output_schema: node.output_schema.clone(),
            node: Node::Limit {
                limit,
                offset,
                child: Box::new(node),
            },
        })
    }

    fn build_select(
        &self,
        select: &Select,
        order_by: &[OrderByExpr],
        catalog: &Catalog,
        scope: &Scope,
    ) -> Result<PlanNode> {
        let Select {
            distinct,
            from,
            projection,
            selection,
            group_by,
            having,
            ..
        } = select;

        if !group_by.is_empty() || having.is_some() {
            return Err(Error::Planner("Aggregation is not supported".to_string()));
        }
        if distinct.is_some() {
            return Err(Error::Planner("SELECT DISTINCT is not supported".to_string()));
        }

        // Build FROM
        let node = self.build_from_clause(from, catalog, scope)?;

        // Build WHERE
        let node = match selection {
            Some(filter) => PlanNode {
                output_schema: node.output_schema.clone(),
                node: Node::Filter {
                    filter: filter.clone(),
                    child: Box::new(node),
                },
            },
            None => node,
        };

        let (exprs, columns) = Self::expand_projection(projection, &node.output_schema)?;

        // Build ORDER BY, below the projection so it can see every input column
        let node = if order_by.is_empty() {
            node
        } else {
            let keys = order_by
                .iter()
                .map(|o| Self::build_sort_key(o, &exprs, &columns, &node.output_schema))
                .collect::<Result<Vec<SortKey>>>()?;
            PlanNode {
                output_schema: node.output_schema.clone(),
                node: Node::Sort {
                    keys,
                    fetch: None,
                    child: Box::new(node),
                },
            }
        };

        // Build PROJECTION
        Ok(PlanNode {
            output_schema: OutputSchema::new(columns),
            node: Node::Projection {
                exprs,
                child: Box::new(node),
            },
        })
    }

    fn build_sort_over_output(node: PlanNode, order_by: &[OrderByExpr]) -> PlanNode {
        if order_by.is_empty() {
            return node;
        }
        let keys = order_by
            .iter()
            .map(|o| SortKey {
                expr: o.expr.clone(),
                asc: o.asc.unwrap_or(true),
                nulls_first: o.nulls_first.unwrap_or(!o.asc.unwrap_or(true)),
            })
            .collect();
        PlanNode {
            output_schema: node.output_schema.clone(),
            node: Node::Sort {
                keys,
                fetch: None,
                child: Box::new(node),
            },
        }
    }

    /// Sort keys may name an input column, a projection alias or a 1-based
    /// projection position.
    fn build_sort_key(
        order: &OrderByExpr,
        exprs: &[Expr],
        columns: &[Column],
        input: &OutputSchema,
    ) -> Result<SortKey> {
        let expr = match &order.expr {
            Expr::Value(sqlparser::ast::Value::Number(n, _)) => {
                let position = n
                    .parse::<usize>()
                    .ok()
                    .filter(|p| *p >= 1 && *p <= exprs.len())
                    .ok_or_else(|| {
                        Error::Planner(format!("ORDER BY position {} is not in select list", n))
                    })?;
                exprs[position - 1].clone()
            }
            Expr::Identifier(ident) if !input.contains(None, &ident.value) => columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(&ident.value))
                .map(|i| exprs[i].clone())
                .unwrap_or_else(|| order.expr.clone()),
            expr => expr.clone(),
        };

        let asc = order.asc.unwrap_or(true);
        Ok(SortKey {
            expr,
            asc,
            nulls_first: order.nulls_first.unwrap_or(!asc),
        })
    }

    fn expand_projection(
        projection: &[SelectItem],
        input: &OutputSchema,
    ) -> Result<(Vec<Expr>, Vec<Column>)> {
        let mut exprs = Vec::new();
        let mut columns = Vec::new();

        for item in projection {
            match item {
                SelectItem::UnnamedExpr(expr) => {
                    columns.push(Self::derive_column(expr, None, input));
                    exprs.push(expr.clone());
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    columns.push(Self::derive_column(expr, Some(alias), input));
                    exprs.push(expr.clone());
                }
                SelectItem::Wildcard(_) => {
                    for column in &input.columns {
                        exprs.push(Self::column_reference(column));
                        columns.push(column.clone());
                    }
                }
                SelectItem::QualifiedWildcard(ObjectName(parts), _) => {
                    let relation = parts
                        .last()
                        .map(|p| p.value.clone())
                        .unwrap_or_default();
                    let mut found = false;
                    for column in input.columns.iter().filter(|c| {
                        c.relation
                            .as_deref()
                            .map_or(false, |r| r.eq_ignore_ascii_case(&relation))
                    }) {
                        exprs.push(Self::column_reference(column));
                        columns.push(column.clone());
                        found = true;
                    }
                    if !found {
                        return Err(Error::Planner(format!("Unknown relation '{}'", relation)));
                    }
                }
            }
        }

        Ok((exprs, columns))
    }

    fn column_reference(column: &Column) -> Expr {
        match &column.relation {
            Some(relation) => Expr::CompoundIdentifier(vec![
                Ident::new(relation.clone()),
                Ident::new(column.name.clone()),
            ]),
            None => Expr::Identifier(Ident::new(column.name.clone())),
        }
    }

    /// Output column for a projected expression. Plain column references keep
    /// their type; casts and typed literals announce theirs.
    fn derive_column(expr: &Expr, alias: Option<&Ident>, input: &OutputSchema) -> Column {
        let source = match expr {
            Expr::Identifier(ident) => input
                .resolve(None, &ident.value)
                .ok()
                .map(|i| input.columns[i].clone()),
            Expr::CompoundIdentifier(idents) if idents.len() == 2 => input
                .resolve(Some(&idents[0].value), &idents[1].value)
                .ok()
                .map(|i| input.columns[i].clone()),
            _ => None,
        };

        let data_type = match expr {
            Expr::Cast { data_type, .. } | Expr::TypedString { data_type, .. } => {
                DataType::from_sql(data_type).ok()
            }
            _ => source.as_ref().and_then(|c| c.data_type),
        };

        let name = match (alias, &source) {
            (Some(alias), _) => alias.value.clone(),
            (None, Some(column)) => column.name.clone(),
            (None, None) => expr.to_string(),
        };

        Column {
            name,
            relation: None,
            data_type,
        }
    }

    fn build_from_clause(
        &self,
        from: &[TableWithJoins],
        catalog: &Catalog,
        scope: &Scope,
    ) -> Result<PlanNode> {
        match from {
            [] => Ok(PlanNode {
                output_schema: OutputSchema::default(),
                node: Node::Empty {},
            }),
            [table] if table.joins.is_empty() => {
                self.build_table_factor(&table.relation, catalog, scope)
            }
            _ => Err(Error::Planner("Joins are not supported".to_string())),
        }
    }

    fn build_table_factor(
        &self,
        table: &TableFactor,
        catalog: &Catalog,
        scope: &Scope,
    ) -> Result<PlanNode> {
        match table {
            TableFactor::Table { name, alias, .. } => {
                let table_name = name.to_string();
                let node = match scope.get(&table_name.to_lowercase()) {
                    Some(cte) => cte.clone(),
                    None => {
                        let source = catalog.get(&table_name)?.clone();
                        PlanNode {
                            output_schema: source.schema.clone(),
                            node: Node::Scan {
                                table_name: table_name.clone(),
                                source,
                                filter: None,
                            },
                        }
                    }
                };

                match alias {
                    Some(alias) => Self::apply_alias(node, alias),
                    None => Ok(PlanNode {
                        output_schema: node.output_schema.with_relation(&table_name),
                        node: node.node,
                    }),
                }
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                let node = self.build_query(subquery, catalog, scope)?;
                match alias {
                    Some(alias) => Self::apply_alias(node, alias),
                    None => Ok(node),
                }
            }
            _ => Err(Error::Planner(format!("Unsupported table factor: {}", table))),
        }
    }

    /// Relabels a plan's output as seen through `AS name (col, ...)`.
    fn apply_alias(node: PlanNode, alias: &TableAlias) -> Result<PlanNode> {
        let mut schema = node.output_schema.with_relation(&alias.name.value);

        if !alias.columns.is_empty() {
            if alias.columns.len() != schema.len() {
                return Err(Error::Planner(format!(
                    "'{}' has {} columns but {} column aliases were given",
                    alias.name.value,
                    schema.len(),
                    alias.columns.len()
                )));
            }
            for (column, name) in schema.columns.iter_mut().zip(alias.columns.iter()) {
                column.name = name.value.clone();
            }
        }

        Ok(PlanNode {
            output_schema: schema,
            node: node.node,
        })
    }

    fn row_count(expr: &Expr) -> Result<u64> {
        match expr {
            Expr::Value(sqlparser::ast::Value::Number(n, _)) => n
                .parse::<u64>()
                .map_err(|_| Error::Planner(format!("Invalid row count: {}", n))),
            _ => Err(Error::Planner(format!(
                "LIMIT and OFFSET must be integer literals, got {}",
                expr
            ))),
        }
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}
