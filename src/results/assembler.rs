//! Domain result assemblers.

use crate::error::QueryResult;
use crate::value::DomainValue;

use super::initializer::{InitializerGraph, InitializerId, InitializerStates};
use super::instantiation::ResolvedInstantiation;
use super::row_reader::RowProcessingState;

/// Produces the value of one domain result from the current row.
#[derive(Debug, Clone, PartialEq)]
pub enum Assembler {
    /// A scalar read straight from the values array.
    Basic { position: usize },
    /// The instance resolved by an initializer.
    Initializer(InitializerId),
    DynamicInstantiation {
        strategy: ResolvedInstantiation,
        arguments: Vec<Assembler>,
    },
}

impl Assembler {
    pub fn assemble(
        &self,
        graph: &InitializerGraph,
        states: &mut InitializerStates,
        row: &mut RowProcessingState<'_, '_>,
    ) -> QueryResult<DomainValue> {
        match self {
            Assembler::Basic { position } => Ok(DomainValue::from(row.values.value(*position).clone())),
            Assembler::Initializer(id) => graph.resolve_instance(states, row, *id),
            Assembler::DynamicInstantiation {
                strategy,
                arguments,
            } => {
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(argument.assemble(graph, states, row)?);
                }
                Ok(strategy.instantiate(values))
            }
        }
    }
}
