//! Cypher query builder for read operations.
//!
//! A query is assembled from a selector (by uid, by field equality, or every
//! node of a label), an optional ordering, an optional page clause, and a
//! projection that may nest along edges. Every caller-supplied value is bound
//! as a parameter (`$p0`, `$p1`, ...). Identifiers (fields, aliases) are
//! checked against `[A-Za-z_][A-Za-z0-9_]*` and never carry user data.
//!
//! Example output for the front-page listing:
//!
//! ```text
//! MATCH (n:Post)
//! WITH n ORDER BY n.date_published DESC SKIP $p0 LIMIT $p1
//! WITH n { .uid, .title, date_published: toString(n.date_published), author: COLLECT { ... }[0] } AS item
//! WITH collect(item) AS items
//! RETURN items, COUNT { MATCH (t:Post) } AS total
//! ```

use neo4rs::Query;

use inkgraph_core::{Pagination, Uid};

use crate::client::GraphError;
use crate::schema::Label;

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
}

/// A finished statement: Cypher text plus its bound parameters.
#[derive(Debug, Clone)]
pub struct CypherQuery {
    text: String,
    params: Vec<(String, ParamValue)>,
}

impl CypherQuery {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    /// Look up a bound parameter by name (without the `$`).
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Convert into a `neo4rs::Query` ready for execution.
    pub fn into_query(self) -> Query {
        let mut q = neo4rs::query(&self.text);
        for (name, value) in self.params {
            q = match value {
                ParamValue::Text(s) => q.param(&name, s),
                ParamValue::Int(i) => q.param(&name, i),
            };
        }
        q
    }
}

// ── Building blocks ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordering on a node property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    field: String,
    order: SortOrder,
}

impl Ordering {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Which way a relationship is walked from the current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// `(from)-[:REL]->(to)`
    Outgoing,
    /// `(from)<-[:REL]-(to)`: the reverse lookup of an outgoing edge.
    Incoming,
}

/// A typed hop from one node to neighbours carrying `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    rel_type: &'static str,
    direction: EdgeDirection,
    target: Label,
}

impl Edge {
    pub const fn outgoing(rel_type: &'static str, target: Label) -> Self {
        Self {
            rel_type,
            direction: EdgeDirection::Outgoing,
            target,
        }
    }

    pub const fn incoming(rel_type: &'static str, target: Label) -> Self {
        Self {
            rel_type,
            direction: EdgeDirection::Incoming,
            target,
        }
    }

    /// The same relationship walked the other way, landing on `target`.
    pub const fn reversed(self, target: Label) -> Self {
        let direction = match self.direction {
            EdgeDirection::Outgoing => EdgeDirection::Incoming,
            EdgeDirection::Incoming => EdgeDirection::Outgoing,
        };
        Self {
            rel_type: self.rel_type,
            direction,
            target,
        }
    }

    pub fn direction(&self) -> EdgeDirection {
        self.direction
    }

    fn pattern(&self, from: &str, to: &str) -> Result<String, GraphError> {
        let rel = ident(self.rel_type)?;
        let label = self.target.as_str();
        Ok(match self.direction {
            EdgeDirection::Outgoing => format!("({from})-[:{rel}]->({to}:{label})"),
            EdgeDirection::Incoming => format!("({from})<-[:{rel}]-({to}:{label})"),
        })
    }
}

/// How the root nodes are chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// The node with this uid.
    Uid(Uid),
    /// Nodes whose `field` equals `value`.
    Eq { field: String, value: String },
    /// Every node carrying the query's label.
    All,
}

impl Selector {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum Child {
    One {
        alias: String,
        edge: Edge,
        projection: Projection,
    },
    Many {
        alias: String,
        edge: Edge,
        projection: Projection,
        ordering: Option<Ordering>,
        pagination: Option<Pagination>,
    },
    Count {
        alias: String,
        edge: Edge,
    },
}

/// The fields returned for a node, possibly nesting along edges.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    fields: Vec<String>,
    timestamps: Vec<String>,
    children: Vec<Child>,
}

impl Projection {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            timestamps: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Temporal properties, returned as ISO-8601 strings.
    ///
    /// They are stored as native `DateTime` values so that ordering compares
    /// instants rather than text of varying length.
    pub fn timestamps<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.timestamps.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Embed the single neighbour reached over `edge` (or null) under `alias`.
    pub fn one(mut self, alias: impl Into<String>, edge: Edge, projection: Projection) -> Self {
        self.children.push(Child::One {
            alias: alias.into(),
            edge,
            projection,
        });
        self
    }

    /// Embed the list of neighbours reached over `edge` under `alias`,
    /// independently ordered and paginated.
    pub fn many(
        mut self,
        alias: impl Into<String>,
        edge: Edge,
        projection: Projection,
        ordering: Option<Ordering>,
        pagination: Option<Pagination>,
    ) -> Self {
        self.children.push(Child::Many {
            alias: alias.into(),
            edge,
            projection,
            ordering,
            pagination,
        });
        self
    }

    /// Embed the number of neighbours reached over `edge` under `alias`.
    pub fn count(mut self, alias: impl Into<String>, edge: Edge) -> Self {
        self.children.push(Child::Count {
            alias: alias.into(),
            edge,
        });
        self
    }
}

// ── Builder ──────────────────────────────────────────────────────

/// Root variable of every built query.
const ROOT: &str = "n";
/// Variable used by the root-adjacent count block.
const COUNT_VAR: &str = "t";

/// Assembles a single read statement.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    label: Option<Label>,
    selector: Selector,
    ordering: Option<Ordering>,
    pagination: Option<Pagination>,
    first_only: bool,
    projection: Projection,
    total: Option<String>,
}

impl QueryBuilder {
    /// Query nodes carrying `label`.
    pub fn new(label: Label, selector: Selector) -> Self {
        Self {
            label: Some(label),
            ..Self::any(selector)
        }
    }

    /// Query nodes of any label.
    pub fn any(selector: Selector) -> Self {
        Self {
            label: None,
            selector,
            ordering: None,
            pagination: None,
            first_only: false,
            projection: Projection::default(),
            total: None,
        }
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Keep only the first match. Without an explicit ordering the lowest uid wins.
    pub fn first_only(mut self) -> Self {
        self.first_only = true;
        self
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Collect matches into `items` and return the total number of nodes
    /// matching the selector under `alias`, in the same statement.
    pub fn with_total(mut self, alias: impl Into<String>) -> Self {
        self.total = Some(alias.into());
        self
    }

    pub fn build(self) -> Result<CypherQuery, GraphError> {
        let mut ctx = RenderContext::default();

        let selector_param = match &self.selector {
            Selector::Uid(uid) => Some(ctx.bind(ParamValue::Text(uid.0.clone()))),
            Selector::Eq { value, .. } => Some(ctx.bind(ParamValue::Text(value.clone()))),
            Selector::All => None,
        };
        if self.label.is_none() && selector_param.is_none() {
            return Err(GraphError::InvalidArgument(
                "an unlabelled query needs a uid or equality selector".to_string(),
            ));
        }

        let mut lines = vec![format!("MATCH {}", self.node_pattern(ROOT))];
        if let Some(cond) = self.condition(ROOT, selector_param.as_deref())? {
            lines.push(format!("WHERE {cond}"));
        }

        let ordering = match (&self.ordering, self.first_only) {
            (Some(o), _) => Some(o.clone()),
            (None, true) => Some(Ordering::asc("uid")),
            (None, false) => None,
        };
        let mut with = String::new();
        if let Some(o) = &ordering {
            with.push_str(&format!(" ORDER BY {}", order_clause(ROOT, o)?));
        }
        if let Some(p) = &self.pagination {
            with.push_str(&ctx.page_clause(p)?);
        } else if self.first_only {
            with.push_str(" LIMIT 1");
        }
        if !with.is_empty() {
            lines.push(format!("WITH {ROOT}{with}"));
        }

        let projected = render_projection(ROOT, &self.projection, &mut ctx)?;
        match &self.total {
            None => lines.push(format!("RETURN {projected} AS item")),
            Some(alias) => {
                let alias = ident(alias)?;
                let count_cond = self
                    .condition(COUNT_VAR, selector_param.as_deref())?
                    .map(|c| format!(" WHERE {c}"))
                    .unwrap_or_default();
                lines.push(format!("WITH {projected} AS item"));
                lines.push("WITH collect(item) AS items".to_string());
                lines.push(format!(
                    "RETURN items, COUNT {{ MATCH {}{count_cond} }} AS {alias}",
                    self.node_pattern(COUNT_VAR)
                ));
            }
        }

        Ok(CypherQuery {
            text: lines.join("\n"),
            params: ctx.params,
        })
    }

    fn node_pattern(&self, var: &str) -> String {
        match self.label {
            Some(label) => format!("({var}:{})", label.as_str()),
            None => format!("({var})"),
        }
    }

    fn condition(&self, var: &str, param: Option<&str>) -> Result<Option<String>, GraphError> {
        Ok(match (&self.selector, param) {
            (Selector::Uid(_), Some(p)) => Some(format!("{var}.uid = {p}")),
            (Selector::Eq { field, .. }, Some(p)) => Some(format!("{var}.{} = {p}", ident(field)?)),
            _ => None,
        })
    }
}

#[derive(Default)]
struct RenderContext {
    params: Vec<(String, ParamValue)>,
    next_var: usize,
}

impl RenderContext {
    /// Bind a value and return its placeholder, e.g. `$p3`.
    fn bind(&mut self, value: ParamValue) -> String {
        let name = format!("p{}", self.params.len());
        let placeholder = format!("${name}");
        self.params.push((name, value));
        placeholder
    }

    fn var(&mut self) -> String {
        let v = format!("v{}", self.next_var);
        self.next_var += 1;
        v
    }

    fn page_clause(&mut self, pagination: &Pagination) -> Result<String, GraphError> {
        let offset = to_param_int(pagination.offset())?;
        let first = to_param_int(pagination.first())?;
        let skip = self.bind(ParamValue::Int(offset));
        let limit = self.bind(ParamValue::Int(first));
        Ok(format!(" SKIP {skip} LIMIT {limit}"))
    }
}

fn render_projection(
    var: &str,
    projection: &Projection,
    ctx: &mut RenderContext,
) -> Result<String, GraphError> {
    let mut parts = Vec::with_capacity(
        projection.fields.len() + projection.timestamps.len() + projection.children.len(),
    );
    for field in &projection.fields {
        parts.push(format!(".{}", ident(field)?));
    }
    for field in &projection.timestamps {
        let field = ident(field)?;
        parts.push(format!("{field}: toString({var}.{field})"));
    }

    for child in &projection.children {
        match child {
            Child::One {
                alias,
                edge,
                projection,
            } => {
                let v = ctx.var();
                let pattern = edge.pattern(var, &v)?;
                let inner = render_projection(&v, projection, ctx)?;
                parts.push(format!(
                    "{}: COLLECT {{ MATCH {pattern} WITH {v} ORDER BY {v}.uid ASC LIMIT 1 RETURN {inner} AS value }}[0]",
                    ident(alias)?
                ));
            }
            Child::Many {
                alias,
                edge,
                projection,
                ordering,
                pagination,
            } => {
                let v = ctx.var();
                let pattern = edge.pattern(var, &v)?;
                let mut with = String::new();
                if let Some(o) = ordering {
                    with.push_str(&format!(" ORDER BY {}", order_clause(&v, o)?));
                }
                if let Some(p) = pagination {
                    with.push_str(&ctx.page_clause(p)?);
                }
                let inner = render_projection(&v, projection, ctx)?;
                parts.push(format!(
                    "{}: COLLECT {{ MATCH {pattern} WITH {v}{with} RETURN {inner} AS value }}",
                    ident(alias)?
                ));
            }
            Child::Count { alias, edge } => {
                let v = ctx.var();
                let pattern = edge.pattern(var, &v)?;
                parts.push(format!("{}: COUNT {{ MATCH {pattern} }}", ident(alias)?));
            }
        }
    }

    if parts.is_empty() {
        return Err(GraphError::InvalidArgument(
            "projection selects no fields".to_string(),
        ));
    }
    Ok(format!("{var} {{ {} }}", parts.join(", ")))
}

fn order_clause(var: &str, ordering: &Ordering) -> Result<String, GraphError> {
    Ok(format!(
        "{var}.{} {}",
        ident(&ordering.field)?,
        ordering.order.keyword()
    ))
}

fn to_param_int(value: u64) -> Result<i64, GraphError> {
    i64::try_from(value)
        .map_err(|_| GraphError::InvalidArgument(format!("{value} is out of range for a page clause")))
}

/// Accept only plain identifiers for labels, fields, relation types and aliases.
pub(crate) fn ident(name: &str) -> Result<&str, GraphError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(name)
    } else {
        Err(GraphError::InvalidArgument(format!(
            "{name:?} is not a valid identifier"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AUTHORED_BY;

    fn author_edge() -> Edge {
        Edge::outgoing(AUTHORED_BY, Label::User)
    }

    #[test]
    fn uid_lookup_binds_value_and_takes_lowest_uid() {
        let q = QueryBuilder::new(Label::Post, Selector::Uid(Uid::from("abc")))
            .first_only()
            .project(Projection::fields(["uid", "title"]))
            .build()
            .unwrap();

        assert_eq!(
            q.text(),
            "MATCH (n:Post)\n\
             WHERE n.uid = $p0\n\
             WITH n ORDER BY n.uid ASC LIMIT 1\n\
             RETURN n { .uid, .title } AS item"
        );
        assert_eq!(q.param("p0"), Some(&ParamValue::Text("abc".to_string())));
    }

    #[test]
    fn user_values_never_appear_in_text() {
        let hostile = "x\" }) DETACH DELETE n //";
        let q = QueryBuilder::new(Label::User, Selector::eq("username", hostile))
            .project(Projection::fields(["uid"]))
            .build()
            .unwrap();

        assert!(!q.text().contains(hostile));
        assert!(q.text().contains("WHERE n.username = $p0"));
        assert_eq!(q.param("p0"), Some(&ParamValue::Text(hostile.to_string())));
    }

    #[test]
    fn invalid_identifiers_are_rejected() {
        let bad_field = QueryBuilder::new(Label::User, Selector::eq("name) DELETE (m", "x"))
            .project(Projection::fields(["uid"]))
            .build();
        assert!(matches!(bad_field, Err(GraphError::InvalidArgument(_))));

        let bad_projection = QueryBuilder::new(Label::User, Selector::All)
            .project(Projection::fields(["uid", "1abc"]))
            .build();
        assert!(matches!(bad_projection, Err(GraphError::InvalidArgument(_))));

        let empty = QueryBuilder::new(Label::User, Selector::All).build();
        assert!(matches!(empty, Err(GraphError::InvalidArgument(_))));
    }

    #[test]
    fn unlabelled_query_needs_a_selector() {
        let q = QueryBuilder::any(Selector::All)
            .project(Projection::fields(["uid"]))
            .build();
        assert!(matches!(q, Err(GraphError::InvalidArgument(_))));

        let q = QueryBuilder::any(Selector::Uid(Uid::from("u1")))
            .project(Projection::fields(["uid"]))
            .build()
            .unwrap();
        assert!(q.text().starts_with("MATCH (n)\nWHERE n.uid = $p0"));
    }

    #[test]
    fn paginated_listing_counts_in_same_statement() {
        let pagination = Pagination::new(3, 5).unwrap();
        let q = QueryBuilder::new(Label::Post, Selector::All)
            .order_by(Ordering::desc("date_published"))
            .paginate(pagination)
            .project(Projection::fields(["uid", "title"]))
            .with_total("total")
            .build()
            .unwrap();

        assert_eq!(
            q.text(),
            "MATCH (n:Post)\n\
             WITH n ORDER BY n.date_published DESC SKIP $p0 LIMIT $p1\n\
             WITH n { .uid, .title } AS item\n\
             WITH collect(item) AS items\n\
             RETURN items, COUNT { MATCH (t:Post) } AS total"
        );
        assert_eq!(q.param("p0"), Some(&ParamValue::Int(10)));
        assert_eq!(q.param("p1"), Some(&ParamValue::Int(5)));
    }

    #[test]
    fn total_reuses_selector_parameter() {
        let q = QueryBuilder::new(Label::User, Selector::eq("email", "a@b.c"))
            .project(Projection::fields(["uid"]))
            .with_total("total")
            .build()
            .unwrap();
        assert!(q
            .text()
            .ends_with("COUNT { MATCH (t:User) WHERE t.email = $p0 } AS total"));
        assert_eq!(q.params().len(), 1);
    }

    #[test]
    fn nested_one_hop_projection() {
        let q = QueryBuilder::new(Label::Post, Selector::Uid(Uid::from("p1")))
            .project(
                Projection::fields(["uid"]).one("author", author_edge(), Projection::fields(["username"])),
            )
            .build()
            .unwrap();

        assert!(q.text().contains(
            "author: COLLECT { MATCH (n)-[:AUTHORED_BY]->(v0:User) WITH v0 ORDER BY v0.uid ASC LIMIT 1 RETURN v0 { .username } AS value }[0]"
        ));
    }

    #[test]
    fn reverse_traversal_is_paginated_and_counted() {
        let posts = author_edge().reversed(Label::Post);
        assert_eq!(posts.direction(), EdgeDirection::Incoming);

        let pagination = Pagination::new(2, 3).unwrap();
        let q = QueryBuilder::new(Label::User, Selector::Uid(Uid::from("u1")))
            .project(
                Projection::fields(["uid", "username"])
                    .many(
                        "pub_posts",
                        posts,
                        Projection::fields(["uid", "title"])
                            .one("author", author_edge(), Projection::fields(["uid"])),
                        Some(Ordering::desc("date_published")),
                        Some(pagination),
                    )
                    .count("total_posts", posts),
            )
            .build()
            .unwrap();

        let text = q.text();
        assert!(text.contains(
            "pub_posts: COLLECT { MATCH (n)<-[:AUTHORED_BY]-(v0:Post) WITH v0 ORDER BY v0.date_published DESC SKIP $p1 LIMIT $p2 RETURN v0 { .uid, .title, author: COLLECT { MATCH (v0)-[:AUTHORED_BY]->(v1:User)"
        ));
        assert!(text.contains("total_posts: COUNT { MATCH (n)<-[:AUTHORED_BY]-(v2:Post) }"));
        assert_eq!(q.param("p0"), Some(&ParamValue::Text("u1".to_string())));
        assert_eq!(q.param("p1"), Some(&ParamValue::Int(3)));
        assert_eq!(q.param("p2"), Some(&ParamValue::Int(3)));
    }

    #[test]
    fn timestamps_order_natively_and_project_as_text() {
        let q = QueryBuilder::new(Label::Post, Selector::All)
            .order_by(Ordering::desc("date_published"))
            .paginate(Pagination::new(1, 5).unwrap())
            .project(Projection::fields(["uid"]).timestamps(["date_published"]))
            .build()
            .unwrap();

        let text = q.text();
        assert!(text.contains("ORDER BY n.date_published DESC"));
        assert!(!text.contains("ORDER BY toString("));
        assert!(text.contains("n { .uid, date_published: toString(n.date_published) }"));

        let bad = QueryBuilder::new(Label::Post, Selector::All)
            .project(Projection::fields(["uid"]).timestamps(["x) RETURN 1 //"]))
            .build();
        assert!(matches!(bad, Err(GraphError::InvalidArgument(_))));
    }

    #[test]
    fn ident_accepts_plain_names_only() {
        assert!(ident("date_published").is_ok());
        assert!(ident("_x1").is_ok());
        assert!(ident("").is_err());
        assert!(ident("9lives").is_err());
        assert!(ident("a-b").is_err());
        assert!(ident("a b").is_err());
    }
}
