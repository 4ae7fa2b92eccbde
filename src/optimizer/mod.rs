use crate::planner::{Node, Plan, PlanNode};
use crate::types::error::Result;

pub struct Optimizer {}

impl Optimizer {
    pub fn new() -> Optimizer {
        Optimizer {}
    }

    pub fn optimize(&self, plan: Plan) -> Result<Plan> {
        tracing::debug!("optimizing plan");
        Ok(Plan {
            root: Self::rewrite(plan.root),
        })
    }

    fn rewrite(plan_node: PlanNode) -> PlanNode {
        let PlanNode {
            output_schema,
            node,
        } = plan_node;

        let node = match node {
            // push the predicate into the scan
            Node::Filter { filter, child } => match Self::rewrite(*child) {
                PlanNode {
                    output_schema: scan_schema,
                    node:
                        Node::Scan {
                            table_name,
                            source,
                            filter: None,
                        },
                } if scan_schema == output_schema => Node::Scan {
                    table_name,
                    source,
                    filter: Some(filter),
                },
                child => Node::Filter {
                    filter,
                    child: Box::new(child),
                },
            },
            // bound the sort by the rows the limit can ever emit
            Node::Limit {
                limit,
                offset,
                child,
            } => {
                let child = Self::rewrite(*child);
                let child = match limit {
                    Some(limit) => Self::push_fetch(child, limit.saturating_add(offset)),
                    None => child,
                };
                Node::Limit {
                    limit,
                    offset,
                    child: Box::new(child),
                }
            }
            Node::Projection { exprs, child } => Node::Projection {
                exprs,
                child: Box::new(Self::rewrite(*child)),
            },
            Node::Sort { keys, fetch, child } => Node::Sort {
                keys,
                fetch,
                child: Box::new(Self::rewrite(*child)),
            },
            node @ (Node::Scan { .. } | Node::Empty {}) => node,
        };

        PlanNode {
            output_schema,
            node,
        }
    }

    fn push_fetch(plan_node: PlanNode, rows: u64) -> PlanNode {
        let PlanNode {
            output_schema,
            node,
        } = plan_node;

        let node = match node {
            Node::Sort { keys, fetch, child } => Node::Sort {
                keys,
                fetch: Some(fetch.map_or(rows, |f| f.min(rows))),
                child,
            },
            // a projection is one row in, one row out
            Node::Projection { exprs, child } => Node::Projection {
                exprs,
                child: Box::new(Self::push_fetch(*child, rows)),
            },
            node => node,
        };

        PlanNode {
            output_schema,
            node,
        }
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}
