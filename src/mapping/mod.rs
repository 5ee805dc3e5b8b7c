//! Mapping model - entities, their tables and attributes.
//!
//! The model is built once with the fluent [`EntityMapping`] builder and is
//! read-only afterwards. [`MappingModel::validate`] checks cross-entity
//! references so that graph construction can assume a consistent model.

mod entity;

pub use entity::{
    AttributeMapping, BasicAttribute, CollectionAttribute, EmbeddableInstantiation,
    EmbeddedAttribute, EntityMapping, FetchStyle, FetchTiming, IdentifierMapping, SecondaryTable,
    ToOneAttribute,
};

use std::collections::HashMap;

use crate::error::{TranslationError, TranslationResult};

#[derive(Debug, Clone, Default)]
pub struct MappingModel {
    entities: HashMap<String, EntityMapping>,
}

impl MappingModel {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entity(mut self, entity: EntityMapping) -> Self {
        self.add_entity(entity);
        self
    }

    pub fn add_entity(&mut self, entity: EntityMapping) {
        self.entities.insert(entity.name.clone(), entity);
    }

    pub fn find_entity(&self, name: &str) -> Option<&EntityMapping> {
        self.entities.get(name)
    }

    pub fn entity(&self, name: &str) -> TranslationResult<&EntityMapping> {
        self.find_entity(name)
            .ok_or_else(|| TranslationError::UnknownEntity(name.to_string()))
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityMapping> {
        self.entities.values()
    }

    /// Check that associations and secondary tables resolve.
    pub fn validate(&self) -> TranslationResult<()> {
        for entity in self.entities.values() {
            if entity.batch_size == Some(0) {
                return Err(TranslationError::InvalidMapping(format!(
                    "{} has a batch size of 0",
                    entity.name
                )));
            }
            self.validate_attributes(entity, &entity.attributes)?;
        }
        Ok(())
    }

    fn validate_attributes(&self, entity: &EntityMapping, attributes: &[AttributeMapping]) -> TranslationResult<()> {
        for attribute in attributes {
            match attribute {
                AttributeMapping::Basic(basic) => {
                    if let Some(table) = &basic.table {
                        if entity.secondary(table).is_none() {
                            return Err(TranslationError::InvalidMapping(format!(
                                "{}.{} is stored in undeclared secondary table {}",
                                entity.name, basic.name, table
                            )));
                        }
                    }
                }
                AttributeMapping::Embedded(embedded) => {
                    if embedded
                        .attributes
                        .iter()
                        .any(|a| matches!(a, AttributeMapping::Collection(_)))
                    {
                        return Err(TranslationError::InvalidMapping(format!(
                            "embeddable {}.{} cannot contain collections",
                            entity.name, embedded.name
                        )));
                    }
                    self.validate_attributes(entity, &embedded.attributes)?;
                }
                AttributeMapping::ToOne(to_one) => {
                    self.entity(&to_one.target)?;
                }
                AttributeMapping::Collection(collection) => {
                    let element = self.entity(&collection.element_entity)?;
                    match element.attribute(&collection.mapped_by) {
                        Some(AttributeMapping::ToOne(back)) if back.target == entity.name => {}
                        Some(_) => {
                            return Err(TranslationError::InvalidMapping(format!(
                                "{}.{} is mapped by {}.{}, which is not an association to {}",
                                entity.name,
                                collection.name,
                                element.name,
                                collection.mapped_by,
                                entity.name
                            )))
                        }
                        None => {
                            return Err(TranslationError::UnknownAttribute {
                                entity: element.name.clone(),
                                attribute: collection.mapped_by.clone(),
                            })
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
