//! Convert a SQL AST to a low-level SQL string.

use super::ast::*;
use super::dialect::{Dialect, LIKE_ESCAPE_CHARACTER};
use super::string::SQL;

/// Render any statement root for the given dialect.
pub fn statement_to_sql(statement: &Statement, dialect: Dialect) -> SQL {
    let mut sql = SQL::new(dialect);
    statement.to_sql(&mut sql);
    sql
}

pub fn select_to_sql(select: &Select, dialect: Dialect) -> SQL {
    let mut sql = SQL::new(dialect);
    select.to_sql(&mut sql);
    sql
}

impl Statement {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Statement::Select(select) => select.to_sql(sql),
            Statement::Insert(insert) => insert.to_sql(sql),
            Statement::Update(update) => update.to_sql(sql),
            Statement::Delete(delete) => delete.to_sql(sql),
        }
    }
}

impl Select {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("SELECT ");

        for (index, selector) in self.select_list.iter().enumerate() {
            selector.to_sql(sql);
            if index < (self.select_list.len() - 1) {
                sql.append_syntax(", ");
            }
        }

        sql.append_syntax(" ");
        self.from.to_sql(sql);

        for join in &self.joins {
            join.to_sql(sql);
        }

        self.where_.to_sql(sql);

        self.order_by.to_sql(sql);
    }
}

impl From {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("FROM ");
        self.source.to_sql(sql);
        sql.append_syntax(" AS ");
        sql.append_table_alias(&self.alias);
    }
}

impl TableSource {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            TableSource::Table(name) => name.to_sql(sql),
            TableSource::Select(select) => {
                sql.append_syntax("(");
                select.to_sql(sql);
                sql.append_syntax(")");
            }
        }
    }
}

impl Join {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self.kind {
            JoinKind::Inner => sql.append_syntax(" INNER JOIN "),
            JoinKind::LeftOuter => sql.append_syntax(" LEFT JOIN "),
        }
        self.source.to_sql(sql);
        sql.append_syntax(" AS ");
        sql.append_table_alias(&self.alias);
        sql.append_syntax(" ON ");
        self.on.to_sql(sql);
    }
}

impl Selector {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Selector::Column { column, alias } => {
                column.to_sql(sql);
                match alias {
                    Some(alias) if alias != column.name() => {
                        sql.append_syntax(" AS ");
                        sql.append_identifier(alias);
                    }
                    _ => {}
                }
            }
            Selector::One => sql.append_syntax("1"),
            Selector::CountStar => sql.append_syntax("COUNT(*)"),
        }
    }
}

impl ColumnReference {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_table_alias(self.table_alias());
        sql.append_syntax(".");
        sql.append_identifier(self.name());
    }
}

impl Where {
    pub fn to_sql(&self, sql: &mut SQL) {
        let Where(expression) = self;
        if let Some(expression) = expression {
            sql.append_syntax(" WHERE ");
            expression.to_sql(sql);
        }
    }
}

impl Expression {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Expression::Comparison {
                left,
                operator,
                right,
            } => {
                left.to_sql(sql);
                // SQL three-valued logic: equality against the NULL
                // literal must render as IS.
                let either_null = *left == Operand::Null || *right == Operand::Null;
                if *operator == ComparisonOperator::Equals && either_null {
                    sql.append_syntax(" IS ");
                } else {
                    operator.to_sql(sql);
                }
                right.to_sql(sql);
            }
            Expression::Logical { operator, terms } => {
                sql.append_syntax("(");
                for (index, term) in terms.iter().enumerate() {
                    term.to_sql(sql);
                    if index < (terms.len() - 1) {
                        operator.to_sql(sql);
                    }
                }
                sql.append_syntax(")");
            }
            Expression::Not(term) => {
                sql.append_syntax("NOT (");
                term.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::In { left, values } => {
                left.to_sql(sql);
                sql.append_syntax(" IN (");
                for (index, value) in values.iter().enumerate() {
                    value.to_sql(sql);
                    if index < (values.len() - 1) {
                        sql.append_syntax(", ");
                    }
                }
                sql.append_syntax(")");
            }
            Expression::Like {
                column,
                pattern,
                kind,
            } => {
                column.to_sql(sql);
                sql.append_syntax(" LIKE ");
                let raw = match &pattern.value {
                    serde_json::Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                let (wildcard_pattern, needs_escape) =
                    like_pattern(sql.dialect, &raw, *kind);
                sql.append_param_value(
                    &pattern.name,
                    serde_json::Value::String(wildcard_pattern),
                );
                if needs_escape {
                    let escape_clause = sql.dialect.like_escape_clause();
                    sql.append_syntax(escape_clause);
                }
            }
            Expression::Exists(select) => {
                sql.append_syntax("EXISTS (");
                select.to_sql(sql);
                sql.append_syntax(")");
            }
        }
    }
}

/// Escape wildcard characters in the raw text and wrap it according to the
/// match kind. Returns the final pattern and whether escaping took place.
fn like_pattern(dialect: Dialect, raw: &str, kind: TextMatchKind) -> (String, bool) {
    let specials = dialect.like_special_characters();
    let mut escaped = String::with_capacity(raw.len());
    let mut needs_escape = false;
    for character in raw.chars() {
        if character == LIKE_ESCAPE_CHARACTER || specials.contains(&character) {
            escaped.push(LIKE_ESCAPE_CHARACTER);
            needs_escape = true;
        }
        escaped.push(character);
    }
    let pattern = match kind {
        TextMatchKind::Contains => format!("%{escaped}%"),
        TextMatchKind::StartsWith => format!("{escaped}%"),
        TextMatchKind::EndsWith => format!("%{escaped}"),
    };
    (pattern, needs_escape)
}

impl ComparisonOperator {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            ComparisonOperator::Equals => sql.append_syntax(" = "),
            ComparisonOperator::GreaterThan => sql.append_syntax(" > "),
            ComparisonOperator::GreaterThanOrEqualTo => sql.append_syntax(" >= "),
            ComparisonOperator::LessThan => sql.append_syntax(" < "),
            ComparisonOperator::LessThanOrEqualTo => sql.append_syntax(" <= "),
        }
    }
}

impl LogicalOperator {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            LogicalOperator::And => sql.append_syntax(" AND "),
            LogicalOperator::Or => sql.append_syntax(" OR "),
        }
    }
}

impl Operand {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Operand::Column(column) => column.to_sql(sql),
            Operand::Parameter(param) => sql.append_param(param),
            Operand::Null => sql.append_syntax("NULL"),
            Operand::Count(select) => {
                sql.append_syntax("(");
                select.to_sql(sql);
                sql.append_syntax(")");
            }
        }
    }
}

impl OrderBy {
    pub fn to_sql(&self, sql: &mut SQL) {
        if !self.elements.is_empty() {
            sql.append_syntax(" ORDER BY ");
            for (index, element) in self.elements.iter().enumerate() {
                element.to_sql(sql);
                if index < (self.elements.len() - 1) {
                    sql.append_syntax(", ");
                }
            }
        }
    }
}

impl OrderByElement {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self.target {
            OrderByTarget::Column(column) => column.to_sql(sql),
            OrderByTarget::CountSelect(select) => {
                sql.append_syntax("(");
                select.to_sql(sql);
                sql.append_syntax(")");
            }
        }
        match self.direction {
            OrderByDirection::Asc => {}
            OrderByDirection::Desc => sql.append_syntax(" DESC"),
        }
    }
}

impl Insert {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("INSERT INTO ");
        self.table.to_sql(sql);
        if self.assignments.is_empty() {
            // Everything was database-generated.
            match sql.dialect {
                Dialect::MySql => sql.append_syntax(" () VALUES ()"),
                Dialect::PostgreSql | Dialect::SqlServer => {
                    sql.append_syntax(" DEFAULT VALUES");
                }
            }
        } else {
            sql.append_syntax(" (");
            for (index, (column, _)) in self.assignments.iter().enumerate() {
                sql.append_identifier(column);
                if index < (self.assignments.len() - 1) {
                    sql.append_syntax(", ");
                }
            }
            sql.append_syntax(") VALUES (");
            for (index, (_, param)) in self.assignments.iter().enumerate() {
                sql.append_param(param);
                if index < (self.assignments.len() - 1) {
                    sql.append_syntax(", ");
                }
            }
            sql.append_syntax(")");
        }
        if let Some(id_column) = &self.returning {
            if sql.dialect.supports_returning() {
                sql.append_syntax(" RETURNING ");
                sql.append_identifier(id_column);
            } else {
                let identity_query = sql.dialect.identity_query();
                sql.append_syntax(identity_query);
            }
        }
    }
}

impl Update {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("UPDATE ");
        self.table.to_sql(sql);
        sql.append_syntax(" SET ");
        for (index, (column, param)) in self.assignments.iter().enumerate() {
            sql.append_identifier(column);
            sql.append_syntax(" = ");
            sql.append_param(param);
            if index < (self.assignments.len() - 1) {
                sql.append_syntax(", ");
            }
        }
        self.where_.to_sql(sql);
    }
}

impl Delete {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("DELETE FROM ");
        self.table.to_sql(sql);
        self.where_.to_sql(sql);
    }
}

impl MutationFilter {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax(" WHERE ");
        sql.append_identifier(&self.column);
        if let [single] = self.values.as_slice() {
            sql.append_syntax(" = ");
            sql.append_param(single);
        } else {
            sql.append_syntax(" IN (");
            for (index, param) in self.values.iter().enumerate() {
                sql.append_param(param);
                if index < (self.values.len() - 1) {
                    sql.append_syntax(", ");
                }
            }
            sql.append_syntax(")");
        }
    }
}

impl TableName {
    pub fn to_sql(&self, sql: &mut SQL) {
        if let Some(schema) = &self.schema {
            sql.append_identifier(schema);
            sql.append_syntax(".");
        }
        sql.append_identifier(&self.name);
    }
}
