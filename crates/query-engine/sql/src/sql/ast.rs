//! Type definitions of a SQL AST representation.

/// Any statement root the renderer accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub select_list: Vec<Selector>,
    pub from: From,
    pub joins: Vec<Join>,
    pub where_: Where,
    pub order_by: OrderBy,
}

/// An INSERT statement. Assignments are ordered; `returning` names the
/// database-generated column to surface after the insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    pub table: TableName,
    pub assignments: Vec<(String, Parameter)>,
    pub returning: Option<String>,
}

/// An UPDATE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub table: TableName,
    pub assignments: Vec<(String, Parameter)>,
    pub where_: MutationFilter,
}

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub table: TableName,
    pub where_: MutationFilter,
}

/// The only filter shape mutations need: equality (one value) or an
/// IN-list (several values) over a single unqualified column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationFilter {
    pub column: String,
    pub values: Vec<Parameter>,
}

/// A FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct From {
    pub source: TableSource,
    pub alias: TableAlias,
}

/// What a table accessor reads from: a real table or a derived sub-select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    Table(TableName),
    Select(Box<Select>),
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub source: TableSource,
    pub alias: TableAlias,
    pub on: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

/// One item of a SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Column {
        column: ColumnReference,
        alias: Option<String>,
    },
    /// The literal `1`, for EXISTS sub-selects.
    One,
    /// `COUNT(*)`.
    CountStar,
}

/// A reference to a column, by table alias and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnReference {
    /// A column of a real table.
    TableColumn {
        table: TableAlias,
        name: String,
        kind: ColumnKind,
    },
    /// A column projected by a derived sub-select. `name` is the selector
    /// name inside the sub-select; `persisted` is the materialization name
    /// the outer scope must re-alias it to.
    SelectColumn {
        table: TableAlias,
        name: String,
        persisted: String,
    },
}

/// The semantic kind of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Id,
    Attribute,
    ForeignKey,
}

/// The stable identity of a column reference, usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ColumnKey(pub TableAlias, pub String);

impl ColumnReference {
    pub fn table_alias(&self) -> &TableAlias {
        match self {
            ColumnReference::TableColumn { table, .. }
            | ColumnReference::SelectColumn { table, .. } => table,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ColumnReference::TableColumn { name, .. }
            | ColumnReference::SelectColumn { name, .. } => name,
        }
    }

    /// The name the data-mapping layer expects this column to materialize
    /// under.
    pub fn persisted_name(&self) -> &str {
        match self {
            ColumnReference::TableColumn { name, .. } => name,
            ColumnReference::SelectColumn { persisted, .. } => persisted,
        }
    }

    pub fn key(&self) -> ColumnKey {
        ColumnKey(self.table_alias().clone(), self.name().to_string())
    }
}

impl Selector {
    /// The name this selector contributes to the result set.
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Selector::Column { column, alias } => {
                Some(alias.as_deref().unwrap_or_else(|| column.name()))
            }
            Selector::One | Selector::CountStar => None,
        }
    }
}

/// An optional WHERE clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Where(pub Option<Expression>);

/// A boolean-valued predicate tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Comparison {
        left: Operand,
        operator: ComparisonOperator,
        right: Operand,
    },
    /// n-ary AND / OR.
    Logical {
        operator: LogicalOperator,
        terms: Vec<Expression>,
    },
    Not(Box<Expression>),
    In {
        left: Operand,
        values: Vec<Operand>,
    },
    /// Text matching; wildcard wrapping and escaping are dialect concerns
    /// applied at render time, so the parameter holds the raw text.
    Like {
        column: ColumnReference,
        pattern: Parameter,
        kind: TextMatchKind,
    },
    Exists(Box<Select>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equals,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatchKind {
    Contains,
    StartsWith,
    EndsWith,
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Column(ColumnReference),
    Parameter(Parameter),
    /// The distinguished NULL literal; equality against it renders as `IS`.
    Null,
    /// A correlated COUNT sub-select used as a scalar value.
    Count(Box<Select>),
}

/// An ORDER BY clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub elements: Vec<OrderByElement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByElement {
    pub target: OrderByTarget,
    pub direction: OrderByDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderByTarget {
    Column(ColumnReference),
    /// A correlated COUNT sub-select ordering term.
    CountSelect(Box<Select>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

/// A named parameter and its value. Names are unique within one rendered
/// statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: ParameterName,
    pub value: serde_json::Value,
}

/// aliases that we give to table accessors: `t1`, `t2`, ...
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableAlias(pub String);

/// names that we give to parameters: `p0`, `p1`, ...
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterName(pub String);

/// A (possibly schema-qualified) database table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}
