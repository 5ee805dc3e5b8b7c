use proptest::prelude::*;

use strata::config::{ResultSettings, TranslationSettings};
use strata::mapping::{EntityMapping, MappingModel};
use strata::query::{EntityQuery, Operand, Restriction};
use strata::results::InstantiatorRegistry;
use strata::sql::ast::SortOrder;
use strata::sql::{Dialect, SqlAstTranslator};
use strata::value::{JdbcType, SqlValue};

const DIALECTS: [Dialect; 5] = [
    Dialect::Postgres,
    Dialect::MySql,
    Dialect::TSql,
    Dialect::DuckDb,
    Dialect::Sqlite,
];

fn model() -> MappingModel {
    MappingModel::new().with_entity(
        EntityMapping::new("Order", "orders")
            .basic("status", "status", JdbcType::Varchar)
            .basic("total", "total", JdbcType::Double),
    )
}

/// In-list values, each either inlined as a bound value or passed as a
/// query parameter.
fn operands() -> impl Strategy<Value = Vec<(bool, i64)>> {
    proptest::collection::vec((any::<bool>(), any::<i64>()), 0..12)
}

proptest! {
    #[test]
    fn binders_match_markers_in_render_order(
        values in operands(),
        status in proptest::option::of("[A-Z]{1,8}"),
        limit in proptest::option::of(0u64..10_000),
        offset in proptest::option::of(0u64..10_000),
        ordered in any::<bool>(),
        dialect_index in 0usize..DIALECTS.len(),
    ) {
        let dialect = DIALECTS[dialect_index];

        let mut query = EntityQuery::from("Order", "o");
        let mut list = Vec::with_capacity(values.len());
        let mut expected = Vec::new();
        for (i, (as_parameter, value)) in values.iter().enumerate() {
            if *as_parameter {
                list.push(Operand::param(i + 1));
                query = query.bind(i + 1, *value);
            } else {
                list.push(Operand::from(*value));
            }
            expected.push(SqlValue::Int(*value));
        }
        query = query.filter(Restriction::in_list("id", list));
        if let Some(status) = &status {
            query = query.filter(Restriction::eq("status", status.as_str()));
            expected.push(SqlValue::from(status.as_str()));
        }
        if ordered {
            query = query.order_by("total", SortOrder::Ascending);
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        if let Some(offset) = offset {
            query = query.offset(offset);
        }

        let pages: Vec<SqlValue> = if dialect == Dialect::TSql {
            offset.into_iter().chain(limit).map(|v| SqlValue::Int(v as i64)).collect()
        } else {
            limit.into_iter().chain(offset).map(|v| SqlValue::Int(v as i64)).collect()
        };
        expected.extend(pages);

        let built = query
            .build(&model(), &ResultSettings::default(), &InstantiatorRegistry::new())
            .unwrap();
        let select = SqlAstTranslator::new(dialect, &TranslationSettings::default())
            .translate_select(&built.statement)
            .unwrap();

        prop_assert_eq!(select.sql.matches('?').count(), select.parameter_binders.len());
        prop_assert_eq!(select.bind(&built.bindings).unwrap(), expected);
    }

    #[test]
    fn identical_queries_render_identical_sql(
        values in proptest::collection::vec(any::<i64>(), 1..8),
        dialect_index in 0usize..DIALECTS.len(),
    ) {
        let dialect = DIALECTS[dialect_index];
        let render = |vs: &[i64]| {
            let query = EntityQuery::from("Order", "o")
                .filter(Restriction::in_list("id", vs.iter().copied()))
                .limit(10);
            let built = query
                .build(&model(), &ResultSettings::default(), &InstantiatorRegistry::new())
                .unwrap();
            SqlAstTranslator::new(dialect, &TranslationSettings::default())
                .translate_select(&built.statement)
                .unwrap()
                .sql
        };

        // values are bound, so only the list length shapes the text
        let reversed: Vec<i64> = values.iter().rev().copied().collect();
        prop_assert_eq!(render(&values), render(&reversed));
    }
}
